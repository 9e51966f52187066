use crate::{
    consistency::AccessKind,
    error::StateError,
    model::{MappingError, entity::EntityMetadata},
    schema::EntitySchema,
    traits::EntityKind,
};
use std::{collections::BTreeMap, sync::Arc};

///
/// MetadataRegistry
///
/// Every mapped entity by name. Built single-threaded at bootstrap and
/// read-only afterwards.
///

#[derive(Clone, Debug, Default)]
pub struct MetadataRegistry {
    entities: BTreeMap<String, Arc<EntityMetadata>>,
}

impl MetadataRegistry {
    /// Build and link every entity.
    ///
    /// First pass compiles each schema; second pass resolves join
    /// targets, so join graphs may be cyclic.
    pub fn bootstrap(schemas: &[EntitySchema]) -> Result<Self, MappingError> {
        let mut entities = BTreeMap::new();

        for schema in schemas {
            let entity = EntityMetadata::build(schema)?;
            tracing::debug!(
                entity = %entity.name(),
                table = %entity.table(),
                properties = entity.property_count(),
                clustered = entity.is_clustered_entity(),
                "entity mapped"
            );

            if entities.contains_key(entity.name()) {
                return Err(MappingError::DuplicateEntity {
                    entity: entity.name().to_string(),
                });
            }
            entities.insert(entity.name().to_string(), Arc::new(entity));
        }

        let registry = Self { entities };
        registry.check_shared_tables()?;
        registry.link_joins()?;

        tracing::info!(entities = registry.len(), "metadata registry bootstrapped");

        Ok(registry)
    }

    // Declared levels seed one policy entry per table, so every entity
    // mapped to a table must agree on them.
    fn check_shared_tables(&self) -> Result<(), MappingError> {
        let mut owners: BTreeMap<&str, &Arc<EntityMetadata>> = BTreeMap::new();

        for entity in self.entities.values() {
            let first = *owners.entry(entity.table()).or_insert(entity);

            for access in [AccessKind::Read, AccessKind::Write] {
                if first.consistency().get(access) != entity.consistency().get(access) {
                    return Err(MappingError::TableConsistencyConflict {
                        table: entity.table().to_string(),
                        first: first.name().to_string(),
                        second: entity.name().to_string(),
                        access,
                    });
                }
            }
        }

        Ok(())
    }

    fn link_joins(&self) -> Result<(), MappingError> {
        for entity in self.entities.values() {
            for property in entity.join_properties() {
                let Some(join) = property.join() else {
                    continue;
                };
                let target =
                    self.entities
                        .get(join.target())
                        .ok_or_else(|| MappingError::UnknownJoinTarget {
                            entity: entity.name().to_string(),
                            property: property.name().to_string(),
                            target: join.target().to_string(),
                        })?;

                join.link(target);
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<EntityMetadata>> {
        self.entities.get(name)
    }

    /// Metadata for a name that must be mapped.
    pub fn require(&self, name: &str) -> Result<&Arc<EntityMetadata>, StateError> {
        self.get(name).ok_or_else(|| StateError::UnknownEntity {
            entity: name.to_string(),
        })
    }

    /// Metadata for a statically mapped type.
    pub fn of<E: EntityKind>(&self) -> Result<&Arc<EntityMetadata>, StateError> {
        self.require(E::ENTITY)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Arc<EntityMetadata>> {
        self.entities.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
