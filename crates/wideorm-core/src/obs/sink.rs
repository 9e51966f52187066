//! Metrics sink boundary.
//!
//! Persistence and proxy code MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
//!
//! This module is the only allowed bridge between execution logic
//! and the global metrics state.
use crate::{obs::metrics, proxy::ChangeType};
use std::{cell::RefCell, rc::Rc, time::Instant};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = RefCell::new(None);
}

///
/// OpKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpKind {
    Persist,
    Find,
    Update,
    Remove,
    Refresh,
    Slice,
}

impl OpKind {
    #[must_use]
    pub const fn is_read(self) -> bool {
        matches!(self, Self::Find | Self::Refresh | Self::Slice)
    }
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent<'a> {
    OpStart {
        kind: OpKind,
        entity: &'a str,
    },
    OpFinish {
        kind: OpKind,
        entity: &'a str,
        rows: u64,
        micros: u64,
    },
    StatementDispatched,
    StatementBatched,
    BatchFlushed {
        statements: u64,
    },
    BatchDiscarded {
        statements: u64,
    },
    ChangeRecorded {
        entity: &'a str,
        change: ChangeType,
    },
    CounterDelta {
        entity: &'a str,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent<'_>);
}

/// GlobalMetricsSink
/// Default process-local sink that writes into global metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        match event {
            MetricsEvent::OpStart { kind, entity } => {
                metrics::with_state_mut(|m| {
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    let (global, local) = match kind {
                        OpKind::Persist => (&mut m.ops.persist_calls, &mut entry.persist_calls),
                        OpKind::Find => (&mut m.ops.find_calls, &mut entry.find_calls),
                        OpKind::Update => (&mut m.ops.update_calls, &mut entry.update_calls),
                        OpKind::Remove => (&mut m.ops.remove_calls, &mut entry.remove_calls),
                        OpKind::Refresh => (&mut m.ops.refresh_calls, &mut entry.refresh_calls),
                        OpKind::Slice => (&mut m.ops.slice_calls, &mut entry.slice_calls),
                    };
                    *global = global.saturating_add(1);
                    *local = local.saturating_add(1);
                });
            }

            MetricsEvent::OpFinish {
                kind,
                entity,
                rows,
                micros,
            } => {
                metrics::with_state_mut(|m| {
                    if kind.is_read() {
                        m.ops.rows_loaded = m.ops.rows_loaded.saturating_add(rows);
                        metrics::add_duration(
                            &mut m.perf.read_micros_total,
                            &mut m.perf.read_micros_max,
                            micros,
                        );
                        let entry = m.entities.entry(entity.to_string()).or_default();
                        entry.rows_loaded = entry.rows_loaded.saturating_add(rows);
                    } else {
                        metrics::add_duration(
                            &mut m.perf.write_micros_total,
                            &mut m.perf.write_micros_max,
                            micros,
                        );
                    }
                });
            }

            MetricsEvent::StatementDispatched => {
                metrics::with_state_mut(|m| {
                    m.ops.statements_dispatched = m.ops.statements_dispatched.saturating_add(1);
                });
            }

            MetricsEvent::StatementBatched => {
                metrics::with_state_mut(|m| {
                    m.ops.statements_batched = m.ops.statements_batched.saturating_add(1);
                });
            }

            MetricsEvent::BatchFlushed { statements } => {
                metrics::with_state_mut(|m| {
                    m.ops.batches_flushed = m.ops.batches_flushed.saturating_add(1);
                    m.ops.statements_dispatched =
                        m.ops.statements_dispatched.saturating_add(statements);
                });
            }

            MetricsEvent::BatchDiscarded { statements } => {
                metrics::with_state_mut(|m| {
                    m.ops.statements_discarded =
                        m.ops.statements_discarded.saturating_add(statements);
                });
            }

            MetricsEvent::ChangeRecorded { entity, .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.change_sets_recorded = m.ops.change_sets_recorded.saturating_add(1);
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    entry.change_sets_recorded = entry.change_sets_recorded.saturating_add(1);
                });
            }

            MetricsEvent::CounterDelta { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.counter_deltas = m.ops.counter_deltas.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent<'_>) {
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());
    match sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state.
///
/// `window_start_ms` filters by window start (`EventState::window_start_ms`),
/// not by per-event timestamps.
#[must_use]
pub fn metrics_report(window_start_ms: Option<u64>) -> metrics::EventReport {
    metrics::report_window_start(window_start_ms)
}

/// Reset all metrics state (counters + perf).
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override on this thread.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

/// Span
/// RAII guard that emits start/finish metrics events for one persistence
/// operation. Ensures finish accounting happens even on early return.

pub(crate) struct Span {
    kind: OpKind,
    entity: String,
    start: Instant,
    rows: u64,
    finished: bool,
}

impl Span {
    #[must_use]
    pub(crate) fn new(kind: OpKind, entity: &str) -> Self {
        record(MetricsEvent::OpStart { kind, entity });

        Self {
            kind,
            entity: entity.to_string(),
            start: Instant::now(),
            rows: 0,
            finished: false,
        }
    }

    pub(crate) const fn set_rows(&mut self, rows: u64) {
        self.rows = rows;
    }

    fn finish_inner(&self) {
        let micros = u64::try_from(self.start.elapsed().as_micros()).unwrap_or(u64::MAX);

        record(MetricsEvent::OpFinish {
            kind: self.kind,
            entity: &self.entity,
            rows: self.rows,
            micros,
        });
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if !self.finished {
            self.finish_inner();
            self.finished = true;
        }
    }
}
