use serde::{Deserialize, Serialize};
use std::{
    cell::RefCell,
    cmp::Ordering,
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};

///
/// EventState
/// Ephemeral, in-memory counters and simple timing totals for operations.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub perf: EventPerf,
    pub entities: BTreeMap<String, EntityCounters>,
    pub window_start_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            perf: EventPerf::default(),
            entities: BTreeMap::new(),
            window_start_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Persistence entrypoints
    pub persist_calls: u64,
    pub find_calls: u64,
    pub update_calls: u64,
    pub remove_calls: u64,
    pub refresh_calls: u64,
    pub slice_calls: u64,

    // Rows returned by the executor
    pub rows_loaded: u64,

    // Statements
    pub statements_dispatched: u64,
    pub statements_batched: u64,
    pub statements_discarded: u64,
    pub batches_flushed: u64,

    // Dirty checking
    pub change_sets_recorded: u64,
    pub counter_deltas: u64,
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntityCounters {
    pub persist_calls: u64,
    pub find_calls: u64,
    pub update_calls: u64,
    pub remove_calls: u64,
    pub refresh_calls: u64,
    pub slice_calls: u64,
    pub rows_loaded: u64,
    pub change_sets_recorded: u64,
}

///
/// EventPerf
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventPerf {
    // Wall-clock totals per operation, in microseconds
    pub read_micros_total: u128,
    pub write_micros_total: u128,

    // Maximum observed single-operation durations
    pub read_micros_max: u64,
    pub write_micros_max: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters and timings.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Accumulate a duration and track a max.
pub(crate) fn add_duration(total: &mut u128, max: &mut u64, delta: u64) {
    *total = total.saturating_add(u128::from(delta));
    if delta > *max {
        *max = delta;
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Ephemeral runtime counters since `window_start_ms`.
    pub counters: Option<EventState>,
    /// Per-entity counters and averages.
    pub entity_counters: Vec<EntitySummary>,
}

///
/// EntitySummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntitySummary {
    pub entity: String,
    pub find_calls: u64,
    pub slice_calls: u64,
    pub rows_loaded: u64,
    pub avg_rows_per_read: f64,
    pub update_calls: u64,
    pub change_sets_recorded: u64,
}

/// Build a report, optionally filtered by window start.
///
/// A `window_start_ms` later than the current window yields an empty
/// report.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub(crate) fn report_window_start(window_start_ms: Option<u64>) -> EventReport {
    let snap = with_state(Clone::clone);
    if window_start_ms.is_some_and(|start| start > snap.window_start_ms) {
        return EventReport::default();
    }

    let mut entity_counters: Vec<EntitySummary> = snap
        .entities
        .iter()
        .map(|(entity, ops)| {
            let reads = ops.find_calls.saturating_add(ops.slice_calls);
            let avg = if reads > 0 {
                ops.rows_loaded as f64 / reads as f64
            } else {
                0.0
            };

            EntitySummary {
                entity: entity.clone(),
                find_calls: ops.find_calls,
                slice_calls: ops.slice_calls,
                rows_loaded: ops.rows_loaded,
                avg_rows_per_read: avg,
                update_calls: ops.update_calls,
                change_sets_recorded: ops.change_sets_recorded,
            }
        })
        .collect();

    entity_counters.sort_by(|a, b| {
        match b
            .avg_rows_per_read
            .partial_cmp(&a.avg_rows_per_read)
            .unwrap_or(Ordering::Equal)
        {
            Ordering::Equal => match b.rows_loaded.cmp(&a.rows_loaded) {
                Ordering::Equal => a.entity.cmp(&b.entity),
                other => other,
            },
            other => other,
        }
    });

    EventReport {
        counters: Some(snap),
        entity_counters,
    }
}

///
/// TESTS
///

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn reset_all_clears_state() {
        with_state_mut(|m| {
            m.ops.find_calls = 3;
            m.ops.statements_batched = 2;
            m.perf.write_micros_max = 9;
            m.entities.insert(
                "alpha".to_string(),
                EntityCounters {
                    find_calls: 1,
                    ..Default::default()
                },
            );
        });

        reset_all();

        with_state(|m| {
            assert_eq!(m.ops.find_calls, 0);
            assert_eq!(m.ops.statements_batched, 0);
            assert_eq!(m.perf.write_micros_max, 0);
            assert!(m.entities.is_empty());
        });
    }

    #[test]
    fn report_sorts_entities_by_average_rows() {
        reset_all();
        with_state_mut(|m| {
            m.entities.insert(
                "alpha".to_string(),
                EntityCounters {
                    find_calls: 2,
                    rows_loaded: 6,
                    ..Default::default()
                },
            );
            m.entities.insert(
                "beta".to_string(),
                EntityCounters {
                    slice_calls: 1,
                    rows_loaded: 5,
                    ..Default::default()
                },
            );
            m.entities.insert(
                "gamma".to_string(),
                EntityCounters {
                    find_calls: 2,
                    rows_loaded: 6,
                    ..Default::default()
                },
            );
        });

        let report = report_window_start(None);
        let names: Vec<_> = report
            .entity_counters
            .iter()
            .map(|e| e.entity.as_str())
            .collect();

        assert_eq!(names, ["beta", "alpha", "gamma"]);
        assert_eq!(report.entity_counters[0].avg_rows_per_read, 5.0);
        assert_eq!(report.entity_counters[1].avg_rows_per_read, 3.0);
    }

    #[test]
    fn add_duration_tracks_total_and_max() {
        let (mut total, mut max) = (0u128, 0u64);

        add_duration(&mut total, &mut max, 7);
        add_duration(&mut total, &mut max, 3);

        assert_eq!(total, 10);
        assert_eq!(max, 7);
    }
}
