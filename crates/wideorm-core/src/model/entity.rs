use crate::{
    consistency::ConsistencyPair,
    model::{key::IdMetadata, property::PropertyMetadata},
};
use std::{collections::BTreeMap, sync::Arc};

///
/// EntityMetadata
///
/// Validated, immutable description of one mapped class. Built once at
/// bootstrap by [`EntityMetadata::build`] and shared through the
/// registry; the id property is kept apart from `properties`.
///

#[derive(Debug)]
pub struct EntityMetadata {
    pub(crate) name: String,
    pub(crate) table: String,
    pub(crate) id: IdMetadata,
    pub(crate) properties: BTreeMap<String, Arc<PropertyMetadata>>,
    pub(crate) consistency: ConsistencyPair,
    pub(crate) clustered_entity: bool,
    pub(crate) wide_row: bool,
    pub(crate) clustered_counter: bool,
}

impl EntityMetadata {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub const fn id(&self) -> &IdMetadata {
        &self.id
    }

    #[must_use]
    pub const fn consistency(&self) -> ConsistencyPair {
        self.consistency
    }

    #[must_use]
    pub const fn is_clustered_entity(&self) -> bool {
        self.clustered_entity
    }

    #[must_use]
    pub const fn is_wide_row(&self) -> bool {
        self.wide_row
    }

    #[must_use]
    pub const fn is_clustered_counter(&self) -> bool {
        self.clustered_counter
    }

    /// Non-id property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Arc<PropertyMetadata>> {
        self.properties.get(name)
    }

    #[must_use]
    pub fn is_id(&self, name: &str) -> bool {
        self.id.name() == name
    }

    pub fn properties(&self) -> impl Iterator<Item = &Arc<PropertyMetadata>> {
        self.properties.values()
    }

    /// Properties copied from a storage row when a proxy is built.
    pub fn eager_properties(&self) -> impl Iterator<Item = &Arc<PropertyMetadata>> {
        self.properties().filter(|p| p.kind().is_eager_value())
    }

    pub fn counter_properties(&self) -> impl Iterator<Item = &Arc<PropertyMetadata>> {
        self.properties().filter(|p| p.is_counter())
    }

    pub fn join_properties(&self) -> impl Iterator<Item = &Arc<PropertyMetadata>> {
        self.properties().filter(|p| p.join().is_some())
    }

    #[must_use]
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }
}
