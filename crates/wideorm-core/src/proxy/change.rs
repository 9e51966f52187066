use crate::{model::property::PropertyMetadata, value::Value};
use derive_more::Display;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

///
/// ChangeType
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ChangeType {
    #[display("APPEND_TO_LIST")]
    AppendToList,
    #[display("PREPEND_TO_LIST")]
    PrependToList,
    #[display("REMOVE_FROM_LIST")]
    RemoveFromList,
    #[display("SET_TO_LIST_AT_INDEX")]
    SetToListAtIndex,
    #[display("REMOVE_FROM_LIST_AT_INDEX")]
    RemoveFromListAtIndex,
    #[display("ADD_TO_SET")]
    AddToSet,
    #[display("REMOVE_FROM_SET")]
    RemoveFromSet,
    #[display("ADD_TO_MAP")]
    AddToMap,
    #[display("REMOVE_FROM_MAP")]
    RemoveFromMap,
    #[display("REMOVE_COLLECTION_OR_MAP")]
    RemoveCollectionOrMap,
}

///
/// Change
///
/// One structural edit with the payload needed to regenerate the minimal
/// store operation. Elements are already unwrapped to storable values.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Change {
    AppendToList(Vec<Value>),
    PrependToList(Vec<Value>),
    RemoveFromList(BTreeSet<Value>),
    SetToListAtIndex { index: usize, value: Value },
    RemoveFromListAtIndex { index: usize },
    AddToSet(BTreeSet<Value>),
    RemoveFromSet(BTreeSet<Value>),
    AddToMap(BTreeMap<Value, Value>),
    /// Removed keys, each paired with the `Null` marker.
    RemoveFromMap(BTreeMap<Value, Value>),
    RemoveCollectionOrMap,
}

impl Change {
    #[must_use]
    pub const fn change_type(&self) -> ChangeType {
        match self {
            Self::AppendToList(_) => ChangeType::AppendToList,
            Self::PrependToList(_) => ChangeType::PrependToList,
            Self::RemoveFromList(_) => ChangeType::RemoveFromList,
            Self::SetToListAtIndex { .. } => ChangeType::SetToListAtIndex,
            Self::RemoveFromListAtIndex { .. } => ChangeType::RemoveFromListAtIndex,
            Self::AddToSet(_) => ChangeType::AddToSet,
            Self::RemoveFromSet(_) => ChangeType::RemoveFromSet,
            Self::AddToMap(_) => ChangeType::AddToMap,
            Self::RemoveFromMap(_) => ChangeType::RemoveFromMap,
            Self::RemoveCollectionOrMap => ChangeType::RemoveCollectionOrMap,
        }
    }

    pub(crate) fn remove_from_map(keys: impl IntoIterator<Item = Value>) -> Self {
        Self::RemoveFromMap(keys.into_iter().map(|k| (k, Value::Null)).collect())
    }

    /// Rewrite every payload element, map keys included.
    pub(crate) fn try_map_values<E>(
        self,
        mut f: impl FnMut(Value) -> Result<Value, E>,
    ) -> Result<Self, E> {
        let change = match self {
            Self::AppendToList(items) => {
                Self::AppendToList(items.into_iter().map(&mut f).collect::<Result<_, _>>()?)
            }
            Self::PrependToList(items) => {
                Self::PrependToList(items.into_iter().map(&mut f).collect::<Result<_, _>>()?)
            }
            Self::RemoveFromList(items) => {
                Self::RemoveFromList(items.into_iter().map(&mut f).collect::<Result<_, _>>()?)
            }
            Self::SetToListAtIndex { index, value } => Self::SetToListAtIndex {
                index,
                value: f(value)?,
            },
            Self::AddToSet(items) => {
                Self::AddToSet(items.into_iter().map(&mut f).collect::<Result<_, _>>()?)
            }
            Self::RemoveFromSet(items) => {
                Self::RemoveFromSet(items.into_iter().map(&mut f).collect::<Result<_, _>>()?)
            }
            Self::AddToMap(entries) => Self::AddToMap(
                entries
                    .into_iter()
                    .map(|(k, v)| Ok::<_, E>((f(k)?, f(v)?)))
                    .collect::<Result<_, _>>()?,
            ),
            Self::RemoveFromMap(entries) => Self::RemoveFromMap(
                entries
                    .into_iter()
                    .map(|(k, v)| Ok::<_, E>((f(k)?, v)))
                    .collect::<Result<_, _>>()?,
            ),
            other @ (Self::RemoveFromListAtIndex { .. } | Self::RemoveCollectionOrMap) => other,
        };

        Ok(change)
    }

    /// Fold `next` into `self` when both are of the same coalescable type.
    ///
    /// Returns `next` back untouched when it cannot be merged. Index edits
    /// and whole-column deletes never merge.
    pub(crate) fn absorb(&mut self, next: Self) -> Option<Self> {
        match (self, next) {
            (Self::AppendToList(items), Self::AppendToList(more)) => items.extend(more),
            (Self::PrependToList(items), Self::PrependToList(mut more)) => {
                more.append(items);
                *items = more;
            }
            (Self::RemoveFromList(items), Self::RemoveFromList(more))
            | (Self::AddToSet(items), Self::AddToSet(more))
            | (Self::RemoveFromSet(items), Self::RemoveFromSet(more)) => items.extend(more),
            (Self::AddToMap(entries), Self::AddToMap(more))
            | (Self::RemoveFromMap(entries), Self::RemoveFromMap(more)) => entries.extend(more),
            (_, next) => return Some(next),
        }

        None
    }
}

///
/// ChangeSet
///

#[derive(Clone, Debug)]
pub struct ChangeSet {
    property: Arc<PropertyMetadata>,
    change: Change,
}

impl ChangeSet {
    #[must_use]
    pub const fn new(property: Arc<PropertyMetadata>, change: Change) -> Self {
        Self { property, change }
    }

    #[must_use]
    pub const fn property(&self) -> &Arc<PropertyMetadata> {
        &self.property
    }

    #[must_use]
    pub const fn change(&self) -> &Change {
        &self.change
    }

    #[must_use]
    pub const fn change_type(&self) -> ChangeType {
        self.change.change_type()
    }

    #[must_use]
    pub fn into_change(self) -> Change {
        self.change
    }
}

impl PartialEq for ChangeSet {
    fn eq(&self, other: &Self) -> bool {
        self.property.entity() == other.property.entity()
            && self.property.name() == other.property.name()
            && self.change == other.change
    }
}

impl Eq for ChangeSet {}
