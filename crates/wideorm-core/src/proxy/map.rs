use crate::{
    proxy::{change::Change, dirty::Tracker, unwrap},
    traits::FieldValue,
};
use std::{
    collections::{BTreeMap, HashMap},
    hash::{BuildHasher, Hash},
};

/// Storage adapter for tracked maps.
pub trait MapStorage {
    type Key;
    type Value;

    fn insert(&mut self, key: Self::Key, value: Self::Value) -> Option<Self::Value>;
    fn remove(&mut self, key: &Self::Key) -> Option<Self::Value>;
    fn get(&self, key: &Self::Key) -> Option<&Self::Value>;
    fn len(&self) -> usize;
    fn clear(&mut self);
    fn entries(&self) -> impl Iterator<Item = (&Self::Key, &Self::Value)>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Ord, V> MapStorage for BTreeMap<K, V> {
    type Key = K;
    type Value = V;

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        Self::insert(self, key, value)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        Self::remove(self, key)
    }

    fn get(&self, key: &K) -> Option<&V> {
        Self::get(self, key)
    }

    fn len(&self) -> usize {
        Self::len(self)
    }

    fn clear(&mut self) {
        Self::clear(self);
    }

    fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        self.iter()
    }
}

impl<K, V, S> MapStorage for HashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Key = K;
    type Value = V;

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        Self::insert(self, key, value)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        Self::remove(self, key)
    }

    fn get(&self, key: &K) -> Option<&V> {
        Self::get(self, key)
    }

    fn len(&self) -> usize {
        Self::len(self)
    }

    fn clear(&mut self) {
        Self::clear(self);
    }

    fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        self.iter()
    }
}

///
/// TrackedMap
///
/// Decorator over a map-valued property backed by any [`MapStorage`].
///

pub struct TrackedMap<'a, M> {
    entries: &'a mut M,
    tracker: Tracker<'a>,
}

impl<'a, M> TrackedMap<'a, M>
where
    M: MapStorage,
    M::Key: FieldValue,
    M::Value: FieldValue,
{
    #[must_use]
    pub const fn new(entries: &'a mut M, tracker: Tracker<'a>) -> Self {
        Self { entries, tracker }
    }

    /// Put one entry; added and overwritten pairs are recorded alike.
    pub fn insert(&mut self, key: M::Key, value: M::Value) -> Option<M::Value> {
        let raw = BTreeMap::from([(unwrap(&key), unwrap(&value))]);
        let previous = self.entries.insert(key, value);
        self.tracker.record(Change::AddToMap(raw));

        previous
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = (M::Key, M::Value)>) {
        let mut raw = BTreeMap::new();
        for (key, value) in entries {
            raw.insert(unwrap(&key), unwrap(&value));
            self.entries.insert(key, value);
        }
        if raw.is_empty() {
            return;
        }

        self.tracker.record(Change::AddToMap(raw));
    }

    pub fn remove(&mut self, key: &M::Key) -> Option<M::Value> {
        let removed = self.entries.remove(key)?;
        self.tracker.record(Change::remove_from_map([unwrap(key)]));

        Some(removed)
    }

    pub fn clear(&mut self) {
        if self.entries.is_empty() {
            return;
        }

        self.entries.clear();
        self.tracker.record(Change::RemoveCollectionOrMap);
    }

    // read-only surface

    #[must_use]
    pub fn get(&self, key: &M::Key) -> Option<&M::Value> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &M::Key) -> bool {
        self.entries.get(key).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&M::Key, &M::Value)> {
        self.entries.entries()
    }

    /// Detached copy of the keys; removing from it is not tracked.
    #[must_use]
    pub fn key_set(&self) -> Vec<M::Key>
    where
        M::Key: Clone,
    {
        self.entries.entries().map(|(k, _)| k.clone()).collect()
    }

    /// Detached copy of the entries; setting values on it is not tracked.
    #[must_use]
    pub fn entry_set(&self) -> Vec<(M::Key, M::Value)>
    where
        M::Key: Clone,
        M::Value: Clone,
    {
        self.entries
            .entries()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
