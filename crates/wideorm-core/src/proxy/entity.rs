use crate::{
    context::{WriteOutcome, WriteTicket},
    error::StateError,
    interface::Row,
    model::{
        entity::EntityMetadata,
        key::IdMetadata,
        property::{CollectionKind, PropertyMetadata},
    },
    proxy::{
        TrackingMode,
        change::ChangeSet,
        counter::{CounterAccumulator, CounterHandle},
        dirty::{self, DirtyChecker, DirtyTable, Tracker},
        list::TrackedList,
        map::{MapStorage, TrackedMap},
        set::{SetStorage, TrackedSet},
    },
    traits::{Entity, FieldValue},
    value::Value,
};
use std::{collections::BTreeMap, sync::Arc};

///
/// EntityProxy
///
/// Explicit wrapper around a live, store-backed entity. Reads forward to
/// the target; writes go through the wrapper and land in the dirty table
/// keyed by property name. Counters live in a separate accumulator.
///
/// A compound id is exchanged with the target as a `Value::List` of its
/// components in key order.
///
/// Edits handed to a batch stay staged until the batch settles: a written
/// batch drops them, a discarded one puts them back in the dirty table.
///

#[derive(Debug)]
pub struct EntityProxy<E> {
    target: E,
    meta: Arc<EntityMetadata>,
    dirty: DirtyTable,
    counters: CounterAccumulator,
    staged: Vec<StagedEdits>,
    mode: TrackingMode,
}

#[derive(Debug)]
struct StagedEdits {
    ticket: Arc<WriteTicket>,
    dirty: DirtyTable,
    deltas: BTreeMap<String, i64>,
}

impl StagedEdits {
    fn unwritten(&self) -> bool {
        self.ticket.outcome() != WriteOutcome::Written
    }
}

impl<E: Entity> EntityProxy<E> {
    /// Wrap an entity as-is; the proxy starts clean.
    #[must_use]
    pub fn wrap(target: E, meta: Arc<EntityMetadata>, mode: TrackingMode) -> Self {
        let mut counters = CounterAccumulator::new();
        for property in meta.counter_properties() {
            if let Some(value) = target.get_value(property.name()).and_then(|v| v.as_big_int()) {
                counters.load(property.name(), value);
            }
        }

        Self {
            target,
            meta,
            dirty: DirtyTable::new(),
            counters,
            staged: Vec::new(),
            mode,
        }
    }

    /// Build a clean, update-mode proxy from a storage row.
    ///
    /// Eager non-counter properties are copied onto a fresh target;
    /// counters go to the accumulator only.
    pub fn from_row(meta: Arc<EntityMetadata>, row: &Row) -> Result<Self, StateError>
    where
        E: Default,
    {
        let (target, counters) = load_target(&meta, row)?;

        Ok(Self {
            target,
            meta,
            dirty: DirtyTable::new(),
            counters,
            staged: Vec::new(),
            mode: TrackingMode::Update,
        })
    }

    /// Replace the target with a freshly loaded row, dropping pending edits.
    pub(crate) fn reload(&mut self, row: &Row) -> Result<(), StateError>
    where
        E: Default,
    {
        let (target, counters) = load_target(&self.meta, row)?;
        self.target = target;
        self.counters = counters;
        self.dirty.clear();
        self.staged.clear();

        Ok(())
    }

    /// Fold the outcome of every settled batch back into the proxy.
    pub(crate) fn settle(&mut self) {
        // newest first, so restored edits end up in recording order
        for index in (0..self.staged.len()).rev() {
            let written = match self.staged[index].ticket.outcome() {
                WriteOutcome::Pending => continue,
                WriteOutcome::Written => true,
                WriteOutcome::Discarded => false,
            };
            let staged = self.staged.remove(index);

            self.counters.settle(&staged.deltas, written);
            if !written {
                tracing::debug!(
                    entity = %self.meta.name(),
                    properties = staged.dirty.len(),
                    "batch discarded; edits restored"
                );
                dirty::restore(staged.dirty, &mut self.dirty);
            }
        }
    }

    /// Hand the dirty table and pending counter deltas to a batch that
    /// settles through `ticket`.
    pub(crate) fn stage(&mut self, ticket: Arc<WriteTicket>) {
        let dirty = std::mem::take(&mut self.dirty);
        let deltas = self.counters.stage();

        match self
            .staged
            .iter_mut()
            .find(|staged| Arc::ptr_eq(&staged.ticket, &ticket))
        {
            Some(staged) => {
                let mut later = dirty;
                dirty::restore(std::mem::take(&mut staged.dirty), &mut later);
                staged.dirty = later;
                for (name, delta) in deltas {
                    let slot = staged.deltas.entry(name).or_default();
                    *slot = slot.saturating_add(delta);
                }
            }
            None => self.staged.push(StagedEdits {
                ticket,
                dirty,
                deltas,
            }),
        }
    }

    #[must_use]
    pub const fn meta(&self) -> &Arc<EntityMetadata> {
        &self.meta
    }

    #[must_use]
    pub const fn mode(&self) -> TrackingMode {
        self.mode
    }

    #[must_use]
    pub const fn target(&self) -> &E {
        &self.target
    }

    /// Release the wrapper; pending edits are dropped with it.
    #[must_use]
    pub fn into_target(self) -> E {
        self.target
    }

    /// Current value of a property; counters read through the accumulator.
    pub fn get(&self, property: &str) -> Result<Option<Value>, StateError> {
        if self.meta.is_id(property) {
            return Ok(self.target.get_value(property));
        }

        let meta = self.property(property)?;
        if meta.is_counter() {
            return Ok(Some(Value::BigInt(self.counters.value(property))));
        }

        Ok(self.target.get_value(property))
    }

    /// Assign a whole property value.
    ///
    /// Re-assigning an equal value records nothing.
    pub fn set(&mut self, property: &str, value: impl FieldValue) -> Result<(), StateError> {
        self.settle();
        let value = value.to_value();

        if self.meta.is_id(property) {
            if self.mode == TrackingMode::Update {
                return Err(StateError::IdReassign {
                    entity: self.meta.name().to_string(),
                    property: property.to_string(),
                });
            }

            return self.target.set_value(property, value);
        }

        let meta = self.property(property)?.clone();
        if meta.is_counter() {
            return Err(StateError::PropertyKind {
                property: property.to_string(),
                expected: "non-counter",
                actual: meta.kind().to_string(),
            });
        }

        let current = self.target.get_value(property).unwrap_or(Value::Null);
        if current == value {
            return Ok(());
        }

        self.target.set_value(property, value)?;
        Tracker::new(&mut self.dirty, meta, self.mode).overwrite();

        Ok(())
    }

    /// Tracked view of a list property, reached through a field accessor.
    pub fn tracked_list<T>(
        &mut self,
        property: &str,
        field: impl FnOnce(&mut E) -> &mut Vec<T>,
    ) -> Result<TrackedList<'_, T>, StateError>
    where
        T: FieldValue + PartialEq,
    {
        self.settle();
        let meta = self.collection(property, CollectionKind::List)?;
        let items = field(&mut self.target);

        Ok(TrackedList::new(
            items,
            Tracker::new(&mut self.dirty, meta, self.mode),
        ))
    }

    pub fn tracked_set<S>(
        &mut self,
        property: &str,
        field: impl FnOnce(&mut E) -> &mut S,
    ) -> Result<TrackedSet<'_, S>, StateError>
    where
        S: SetStorage,
        S::Item: FieldValue,
    {
        self.settle();
        let meta = self.collection(property, CollectionKind::Set)?;
        let items = field(&mut self.target);

        Ok(TrackedSet::new(
            items,
            Tracker::new(&mut self.dirty, meta, self.mode),
        ))
    }

    pub fn tracked_map<M>(
        &mut self,
        property: &str,
        field: impl FnOnce(&mut E) -> &mut M,
    ) -> Result<TrackedMap<'_, M>, StateError>
    where
        M: MapStorage,
        M::Key: FieldValue,
        M::Value: FieldValue,
    {
        self.settle();
        let meta = self.collection(property, CollectionKind::Map)?;
        let entries = field(&mut self.target);

        Ok(TrackedMap::new(
            entries,
            Tracker::new(&mut self.dirty, meta, self.mode),
        ))
    }

    pub fn counter(&mut self, property: &str) -> Result<CounterHandle<'_>, StateError> {
        self.settle();
        let meta = self.property(property)?.clone();
        if !meta.is_counter() {
            return Err(StateError::PropertyKind {
                property: property.to_string(),
                expected: "counter",
                actual: meta.kind().to_string(),
            });
        }

        Ok(CounterHandle::new(meta, &mut self.counters))
    }

    #[must_use]
    pub const fn counters(&self) -> &CounterAccumulator {
        &self.counters
    }

    pub(crate) const fn counters_mut(&mut self) -> &mut CounterAccumulator {
        &mut self.counters
    }

    /// Edits not yet known to be written, staged ones included.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
            || self
                .staged
                .iter()
                .any(|staged| staged.unwritten() && !staged.dirty.is_empty())
    }

    /// Counter deltas not yet known to be written, staged ones included.
    #[must_use]
    pub fn has_pending_counters(&self) -> bool {
        self.counters.has_pending()
            || self
                .staged
                .iter()
                .any(|staged| staged.unwritten() && !staged.deltas.is_empty())
    }

    /// Edits not yet handed to any statement.
    #[must_use]
    pub const fn dirty(&self) -> &DirtyTable {
        &self.dirty
    }

    /// Every recorded change-set, grouped by property.
    #[must_use]
    pub fn change_sets(&self) -> Vec<ChangeSet> {
        self.dirty
            .values()
            .flat_map(DirtyChecker::change_sets)
            .collect()
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    /// Primary key values in key order, read from the target.
    pub fn key_values(&self) -> Result<Vec<Value>, StateError> {
        let id = self.meta.id();
        let missing = || StateError::MissingKey {
            entity: self.meta.name().to_string(),
            column: id.name().to_string(),
        };
        let value = self.target.get_value(id.name()).ok_or_else(missing)?;

        match (id, value) {
            (IdMetadata::Simple(_), value) => Ok(vec![value]),
            (IdMetadata::Compound(_), Value::List(components)) => Ok(components),
            (IdMetadata::Compound(_), _) => Err(missing()),
        }
    }

    fn property(&self, name: &str) -> Result<&Arc<PropertyMetadata>, StateError> {
        self.meta
            .property(name)
            .ok_or_else(|| StateError::UnknownProperty {
                entity: self.meta.name().to_string(),
                property: name.to_string(),
            })
    }

    fn collection(
        &self,
        name: &str,
        expected: CollectionKind,
    ) -> Result<Arc<PropertyMetadata>, StateError> {
        let meta = self.property(name)?;
        if meta.kind().collection() != Some(expected) {
            return Err(StateError::PropertyKind {
                property: name.to_string(),
                expected: match expected {
                    CollectionKind::List => "list",
                    CollectionKind::Set => "set",
                    CollectionKind::Map => "map",
                },
                actual: meta.kind().to_string(),
            });
        }

        Ok(meta.clone())
    }
}

// Nested proxies are stored as their target's value.
impl<E: FieldValue> FieldValue for EntityProxy<E> {
    fn to_value(&self) -> Value {
        self.target.to_value()
    }

    fn from_value(_value: &Value) -> Option<Self> {
        None
    }
}

// Proxies compare by their stored value, so tracked collections of joined
// entities find elements regardless of wrapping.
impl<E: FieldValue> PartialEq for EntityProxy<E> {
    fn eq(&self, other: &Self) -> bool {
        self.to_value() == other.to_value()
    }
}

impl<E: FieldValue> Eq for EntityProxy<E> {}

impl<E: FieldValue> PartialOrd for EntityProxy<E> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<E: FieldValue> Ord for EntityProxy<E> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.to_value().cmp(&other.to_value())
    }
}

fn load_target<E>(meta: &EntityMetadata, row: &Row) -> Result<(E, CounterAccumulator), StateError>
where
    E: Entity + Default,
{
    let mut target = E::default();
    let column = |name: &str| row.get(name).filter(|v| !v.is_null()).cloned();

    let id = meta.id();
    let id_value = match id {
        IdMetadata::Simple(property) => column(property.name()),
        IdMetadata::Compound(_) => id
            .column_names()
            .into_iter()
            .map(column)
            .collect::<Option<Vec<_>>>()
            .map(Value::List),
    };
    let id_value = id_value.ok_or_else(|| StateError::MissingKey {
        entity: meta.name().to_string(),
        column: id.name().to_string(),
    })?;
    target.set_value(id.name(), id_value)?;

    for property in meta.eager_properties() {
        if let Some(value) = column(property.name()) {
            target.set_value(property.name(), value)?;
        }
    }

    let mut counters = CounterAccumulator::new();
    for property in meta.counter_properties() {
        if let Some(value) = column(property.name()).and_then(|v| v.as_big_int()) {
            counters.load(property.name(), value);
        }
    }

    Ok((target, counters))
}
