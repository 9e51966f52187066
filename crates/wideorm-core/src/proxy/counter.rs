use crate::{
    model::property::PropertyMetadata,
    obs::sink::{self, MetricsEvent},
};
use std::{collections::BTreeMap, sync::Arc};

///
/// CounterAccumulator
///
/// Counter values last loaded from the store plus increments pending
/// since. Counters are written as deltas only, so they never take part in
/// dirty checking. Deltas already buffered in a batch stay in flight until
/// the batch settles.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CounterAccumulator {
    loaded: BTreeMap<String, i64>,
    in_flight: BTreeMap<String, i64>,
    deltas: BTreeMap<String, i64>,
}

impl CounterAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn load(&mut self, property: &str, value: i64) {
        self.loaded.insert(property.to_string(), value);
    }

    /// Last loaded value plus in-flight and pending deltas; absent
    /// counters read as zero.
    #[must_use]
    pub fn value(&self, property: &str) -> i64 {
        let loaded = self.loaded.get(property).copied().unwrap_or_default();
        let in_flight = self.in_flight.get(property).copied().unwrap_or_default();

        loaded
            .saturating_add(in_flight)
            .saturating_add(self.delta(property))
    }

    #[must_use]
    pub fn delta(&self, property: &str) -> i64 {
        self.deltas.get(property).copied().unwrap_or_default()
    }

    pub(crate) fn add(&mut self, property: &str, delta: i64) {
        add_to(&mut self.deltas, property, delta);
    }

    /// Pending non-zero deltas, by property.
    pub fn pending(&self) -> impl Iterator<Item = (&str, i64)> {
        self.deltas.iter().map(|(name, delta)| (name.as_str(), *delta))
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.deltas.is_empty()
    }

    /// Fold pending deltas into the loaded values once they are written.
    pub(crate) fn commit(&mut self) {
        for (name, delta) in std::mem::take(&mut self.deltas) {
            let slot = self.loaded.entry(name).or_default();
            *slot = slot.saturating_add(delta);
        }
    }

    /// Move pending deltas in flight; they are returned so the caller can
    /// settle them later.
    pub(crate) fn stage(&mut self) -> BTreeMap<String, i64> {
        let staged = std::mem::take(&mut self.deltas);
        for (name, delta) in &staged {
            add_to(&mut self.in_flight, name, *delta);
        }

        staged
    }

    /// Settle in-flight deltas: fold them into the loaded values when
    /// written, or hand them back as pending when discarded.
    pub(crate) fn settle(&mut self, staged: &BTreeMap<String, i64>, written: bool) {
        for (name, delta) in staged {
            add_to(&mut self.in_flight, name, delta.saturating_neg());
            if written {
                let slot = self.loaded.entry(name.clone()).or_default();
                *slot = slot.saturating_add(*delta);
            } else {
                add_to(&mut self.deltas, name, *delta);
            }
        }
    }
}

fn add_to(deltas: &mut BTreeMap<String, i64>, property: &str, delta: i64) {
    let slot = deltas.entry(property.to_string()).or_default();
    *slot = slot.saturating_add(delta);
    if *slot == 0 {
        deltas.remove(property);
    }
}

///
/// CounterHandle
/// Increment/decrement access to one counter property of a proxy.
///

pub struct CounterHandle<'a> {
    property: Arc<PropertyMetadata>,
    counters: &'a mut CounterAccumulator,
}

impl<'a> CounterHandle<'a> {
    pub(crate) const fn new(
        property: Arc<PropertyMetadata>,
        counters: &'a mut CounterAccumulator,
    ) -> Self {
        Self { property, counters }
    }

    pub fn incr(&mut self) {
        self.incr_by(1);
    }

    pub fn decr(&mut self) {
        self.incr_by(-1);
    }

    pub fn decr_by(&mut self, delta: i64) {
        self.incr_by(delta.saturating_neg());
    }

    pub fn incr_by(&mut self, delta: i64) {
        if delta == 0 {
            return;
        }

        sink::record(MetricsEvent::CounterDelta {
            entity: self.property.entity(),
        });
        self.counters.add(self.property.name(), delta);
    }

    /// Current value as seen by this proxy, pending delta included.
    #[must_use]
    pub fn get(&self) -> i64 {
        self.counters.value(self.property.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_cancel_out() {
        let mut counters = CounterAccumulator::new();
        counters.add("hits", 2);
        counters.add("hits", -2);

        assert!(!counters.has_pending());
        assert_eq!(counters.value("hits"), 0);
    }

    #[test]
    fn commit_folds_deltas_into_loaded_values() {
        let mut counters = CounterAccumulator::new();
        counters.load("hits", 10);
        counters.add("hits", 3);

        assert_eq!(counters.value("hits"), 13);
        assert_eq!(counters.pending().collect::<Vec<_>>(), [("hits", 3)]);

        counters.commit();

        assert!(!counters.has_pending());
        assert_eq!(counters.value("hits"), 13);
    }

    #[test]
    fn discarded_deltas_come_back_as_pending() {
        let mut counters = CounterAccumulator::new();
        counters.load("hits", 10);
        counters.add("hits", 5);

        let staged = counters.stage();
        assert!(!counters.has_pending());
        assert_eq!(counters.value("hits"), 15);

        counters.add("hits", 1);
        counters.settle(&staged, false);

        assert_eq!(counters.pending().collect::<Vec<_>>(), [("hits", 6)]);
        assert_eq!(counters.value("hits"), 16);
    }

    #[test]
    fn written_deltas_are_folded_in() {
        let mut counters = CounterAccumulator::new();
        counters.add("hits", 5);

        let staged = counters.stage();
        counters.settle(&staged, true);

        assert!(!counters.has_pending());
        assert_eq!(counters.value("hits"), 5);
    }
}
