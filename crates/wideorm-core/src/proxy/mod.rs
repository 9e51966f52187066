//! Change-tracking wrappers around live entities and their collections.

mod change;
mod counter;
mod dirty;
mod entity;
mod list;
mod map;
mod set;


use crate::{traits::FieldValue, value::Value};

// re-exports
pub use change::{Change, ChangeSet, ChangeType};
pub use counter::{CounterAccumulator, CounterHandle};
pub use dirty::{DirtyChecker, DirtyTable, Tracker};
pub use entity::EntityProxy;
pub use list::TrackedList;
pub use map::{MapStorage, TrackedMap};
pub use set::{SetStorage, TrackedSet};

///
/// TrackingMode
///
/// Fixed when a proxy is built. `Insert` covers entities with no persisted
/// state yet; `Update` covers entities loaded from or written to the store.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TrackingMode {
    Insert,
    Update,
}

/// Storable form of an element about to be recorded.
///
/// Proxied entities collapse to their target's value, so change payloads
/// never carry a wrapper.
pub fn unwrap<T: FieldValue + ?Sized>(value: &T) -> Value {
    value.to_value()
}
