use crate::{
    error::StateError,
    proxy::{TrackingMode, change::Change, dirty::Tracker, unwrap},
    traits::FieldValue,
    value::Value,
};
use std::{collections::BTreeSet, ops::Range};

///
/// TrackedList
///
/// Decorator over a list-valued property. Each mutation is applied to the
/// backing vector, then recorded. Index edits are recorded as such only
/// in update mode; in insert mode there is no persisted index space, so
/// they re-assign the whole column instead.
///

pub struct TrackedList<'a, T> {
    items: &'a mut Vec<T>,
    tracker: Tracker<'a>,
}

impl<'a, T> TrackedList<'a, T>
where
    T: FieldValue + PartialEq,
{
    #[must_use]
    pub const fn new(items: &'a mut Vec<T>, tracker: Tracker<'a>) -> Self {
        Self { items, tracker }
    }

    pub fn push(&mut self, value: T) {
        let raw = unwrap(&value);
        self.items.push(value);
        self.tracker.record(Change::AppendToList(vec![raw]));
    }

    pub fn extend(&mut self, values: impl IntoIterator<Item = T>) {
        let values: Vec<T> = values.into_iter().collect();
        if values.is_empty() {
            return;
        }

        let raw = values.iter().map(unwrap).collect();
        self.items.extend(values);
        self.tracker.record(Change::AppendToList(raw));
    }

    /// Positional insert. Head and tail inserts stay element-level; a
    /// middle insert re-assigns the column.
    pub fn insert(&mut self, index: usize, value: T) -> Result<(), StateError> {
        self.insert_all(index, vec![value])
    }

    pub fn insert_all(&mut self, index: usize, values: Vec<T>) -> Result<(), StateError> {
        let len = self.items.len();
        if index > len {
            return Err(self.out_of_bounds(index));
        }
        if values.is_empty() {
            return Ok(());
        }

        let raw: Vec<Value> = values.iter().map(unwrap).collect();
        let change = if index == len {
            Some(Change::AppendToList(raw))
        } else if index == 0 {
            Some(Change::PrependToList(raw))
        } else {
            None
        };

        self.items.splice(index..index, values);
        match change {
            Some(change) => self.tracker.record(change),
            None => self.tracker.overwrite(),
        }

        Ok(())
    }

    pub fn prepend(&mut self, value: T) {
        self.prepend_all(vec![value]);
    }

    pub fn prepend_all(&mut self, values: Vec<T>) {
        if values.is_empty() {
            return;
        }

        let raw = values.iter().map(unwrap).collect();
        self.items.splice(0..0, values);
        self.tracker.record(Change::PrependToList(raw));
    }

    /// Remove every element equal to `value`. Returns whether any was.
    pub fn remove_value(&mut self, value: &T) -> bool {
        if !self.items.contains(value) {
            return false;
        }

        self.items.retain(|item| item != value);
        self.tracker
            .record(Change::RemoveFromList(BTreeSet::from([unwrap(value)])));

        true
    }

    pub fn remove_all(&mut self, values: &[T]) -> bool {
        self.remove_where(|item| values.contains(item))
    }

    pub fn retain_all(&mut self, keep: &[T]) -> bool {
        self.remove_where(|item| !keep.contains(item))
    }

    fn remove_where(&mut self, doomed: impl Fn(&T) -> bool) -> bool {
        let removed: BTreeSet<Value> = self
            .items
            .iter()
            .filter(|item| doomed(item))
            .map(unwrap)
            .collect();
        if removed.is_empty() {
            return false;
        }

        self.items.retain(|item| !doomed(item));
        self.tracker.record(Change::RemoveFromList(removed));

        true
    }

    /// Replace the element at `index`, returning the previous one.
    pub fn set(&mut self, index: usize, value: T) -> Result<T, StateError> {
        if index >= self.items.len() {
            return Err(self.out_of_bounds(index));
        }

        let raw = unwrap(&value);
        let previous = std::mem::replace(&mut self.items[index], value);
        match self.tracker.mode() {
            TrackingMode::Update => self
                .tracker
                .record(Change::SetToListAtIndex { index, value: raw }),
            TrackingMode::Insert => self.tracker.overwrite(),
        }

        Ok(previous)
    }

    pub fn remove_at(&mut self, index: usize) -> Result<T, StateError> {
        if index >= self.items.len() {
            return Err(self.out_of_bounds(index));
        }

        let removed = self.items.remove(index);
        match self.tracker.mode() {
            TrackingMode::Update => self
                .tracker
                .record(Change::RemoveFromListAtIndex { index }),
            TrackingMode::Insert => self.tracker.overwrite(),
        }

        Ok(removed)
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
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.items.contains(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    fn out_of_bounds(&self, index: usize) -> StateError {
        StateError::IndexOutOfBounds {
            property: self.tracker.property().to_string(),
            index,
            len: self.items.len(),
        }
    }
}

impl<T: Clone> TrackedList<'_, T> {
    /// Detached copy of a range; edits to it are not tracked.
    #[must_use]
    pub fn sub_list(&self, range: Range<usize>) -> Vec<T> {
        self.items.get(range).map(<[T]>::to_vec).unwrap_or_default()
    }

    /// Detached copy of the whole list; edits to it are not tracked.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.items.clone()
    }
}
