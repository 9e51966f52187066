use crate::{
    proxy::{change::Change, dirty::Tracker, unwrap},
    traits::FieldValue,
    value::Value,
};
use std::{
    collections::{BTreeSet, HashSet},
    hash::{BuildHasher, Hash},
};

/// Storage adapter for tracked sets.
pub trait SetStorage {
    type Item;

    fn insert(&mut self, value: Self::Item) -> bool;
    fn remove(&mut self, value: &Self::Item) -> bool;
    fn contains(&self, value: &Self::Item) -> bool;
    fn len(&self) -> usize;
    fn retain(&mut self, keep: impl FnMut(&Self::Item) -> bool);
    fn clear(&mut self);
    fn items(&self) -> impl Iterator<Item = &Self::Item>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Ord> SetStorage for BTreeSet<T> {
    type Item = T;

    fn insert(&mut self, value: T) -> bool {
        Self::insert(self, value)
    }

    fn remove(&mut self, value: &T) -> bool {
        Self::remove(self, value)
    }

    fn contains(&self, value: &T) -> bool {
        Self::contains(self, value)
    }

    fn len(&self) -> usize {
        Self::len(self)
    }

    fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        Self::retain(self, keep);
    }

    fn clear(&mut self) {
        Self::clear(self);
    }

    fn items(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }
}

impl<T, S> SetStorage for HashSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    type Item = T;

    fn insert(&mut self, value: T) -> bool {
        Self::insert(self, value)
    }

    fn remove(&mut self, value: &T) -> bool {
        Self::remove(self, value)
    }

    fn contains(&self, value: &T) -> bool {
        Self::contains(self, value)
    }

    fn len(&self) -> usize {
        Self::len(self)
    }

    fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        Self::retain(self, keep);
    }

    fn clear(&mut self) {
        Self::clear(self);
    }

    fn items(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }
}

///
/// TrackedSet
///
/// Decorator over a set-valued property backed by any [`SetStorage`].
///

pub struct TrackedSet<'a, S> {
    items: &'a mut S,
    tracker: Tracker<'a>,
}

impl<'a, S> TrackedSet<'a, S>
where
    S: SetStorage,
    S::Item: FieldValue,
{
    #[must_use]
    pub const fn new(items: &'a mut S, tracker: Tracker<'a>) -> Self {
        Self { items, tracker }
    }

    /// Always recorded, even when the value was already present.
    pub fn insert(&mut self, value: S::Item) -> bool {
        let raw = unwrap(&value);
        let added = self.items.insert(value);
        self.tracker.record(Change::AddToSet(BTreeSet::from([raw])));

        added
    }

    pub fn extend(&mut self, values: impl IntoIterator<Item = S::Item>) {
        let mut raw = BTreeSet::new();
        for value in values {
            raw.insert(unwrap(&value));
            self.items.insert(value);
        }
        if raw.is_empty() {
            return;
        }

        self.tracker.record(Change::AddToSet(raw));
    }

    pub fn remove(&mut self, value: &S::Item) -> bool {
        if !self.items.remove(value) {
            return false;
        }

        self.tracker
            .record(Change::RemoveFromSet(BTreeSet::from([unwrap(value)])));

        true
    }

    pub fn remove_all<'v>(&mut self, values: impl IntoIterator<Item = &'v S::Item>) -> bool
    where
        S::Item: 'v,
    {
        let mut removed = BTreeSet::new();
        for value in values {
            if self.items.remove(value) {
                removed.insert(unwrap(value));
            }
        }

        self.record_removed(removed)
    }

    pub fn retain_all(&mut self, keep: &[S::Item]) -> bool
    where
        S::Item: PartialEq,
    {
        let removed: BTreeSet<Value> = self
            .items
            .items()
            .filter(|item| !keep.contains(item))
            .map(unwrap)
            .collect();
        self.items.retain(|item| keep.contains(item));

        self.record_removed(removed)
    }

    fn record_removed(&mut self, removed: BTreeSet<Value>) -> bool {
        if removed.is_empty() {
            return false;
        }

        self.tracker.record(Change::RemoveFromSet(removed));

        true
    }

    pub fn clear(&mut self) {
        if self.items.is_empty() {
            return;
        }

        self.items.clear();
        self.tracker.record(Change::RemoveCollectionOrMap);
    }

    // read-only surface

    #[must_use]
    pub fn contains(&self, value: &S::Item) -> bool {
        self.items.contains(value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &S::Item> {
        self.items.items()
    }

    /// Detached copy; removing from it is not tracked.
    #[must_use]
    pub fn to_vec(&self) -> Vec<S::Item>
    where
        S::Item: Clone,
    {
        self.items.items().cloned().collect()
    }
}
