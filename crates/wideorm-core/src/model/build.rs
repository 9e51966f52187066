use crate::{
    consistency::{AccessKind, ConsistencyLevel, ConsistencyPair},
    model::{
        entity::EntityMetadata,
        key::{
            ClusteringComponents, ComponentShape, CompoundKeyMetadata, CompoundKeyProperties,
            IdMetadata, KeyComponent, PartitionComponents,
        },
        property::{CascadeType, JoinProperties, PropertyKind, PropertyMetadata},
    },
    schema::{CompoundKeySchema, ConsistencySchema, EntitySchema, IdSchema, KeyShape, PropertySchema},
    value::ValueKind,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};
use thiserror::Error as ThisError;

pub const MAX_NAME_LEN: usize = 64;

///
/// MappingError
///
/// Bootstrap-time mapping violations. Fatal: the registry is never built
/// when any entity fails.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[remain::sorted]
pub enum MappingError {
    #[error("property '{entity}.{property}' declares cascades but is not a join")]
    CascadeWithoutJoin { entity: String, property: String },

    #[error("compound key '{type_name}' on '{entity}' component orders must be exactly 1..={len}")]
    ComponentOrder {
        entity: String,
        type_name: String,
        len: usize,
    },

    #[error("compound key '{type_name}' on '{entity}' declares {found} component(s); at least 2 are required")]
    CompoundKeyArity {
        entity: String,
        type_name: String,
        found: usize,
    },

    #[error(
        "compound key '{type_name}' on '{entity}' resolves to {candidates} canonical accessor/constructor shape(s); exactly one is required"
    )]
    CompoundKeyShape {
        entity: String,
        type_name: String,
        candidates: usize,
    },

    #[error("counter property '{entity}.{property}' cannot declare consistency 'ANY' for {access}")]
    CounterConsistency {
        entity: String,
        property: String,
        access: AccessKind,
    },

    #[error("duplicate component '{component}' in compound key '{type_name}' on '{entity}'")]
    DuplicateComponent {
        entity: String,
        type_name: String,
        component: String,
    },

    #[error("entity '{entity}' is mapped more than once")]
    DuplicateEntity { entity: String },

    #[error("duplicate property or column name '{property}' on entity '{entity}'")]
    DuplicateProperty { entity: String, property: String },

    #[error("property '{entity}.{property}' is an embedded id outside of the id declaration")]
    EmbeddedIdOutsideId { entity: String, property: String },

    #[error("empty {what} name on entity '{entity}'")]
    EmptyName { entity: String, what: &'static str },

    #[error("id property '{entity}.{property}' must be a simple, non-collection value; found {kind}")]
    InvalidIdKind {
        entity: String,
        property: String,
        kind: String,
    },

    #[error(
        "compound key '{type_name}' on '{entity}' puts {partition} of {components} component(s) in the partition key"
    )]
    InvalidPartitionSplit {
        entity: String,
        type_name: String,
        partition: usize,
        components: usize,
    },

    #[error("entity '{entity}' declares no identifier")]
    MissingId { entity: String },

    #[error("join property '{entity}.{property}' declares no target entity")]
    MissingJoinTarget { entity: String, property: String },

    #[error("map-like property '{entity}.{property}' declares no key class")]
    MissingKeyKind { entity: String, property: String },

    #[error("{what} name '{name}' on '{entity}' exceeds max length {max}", max = MAX_NAME_LEN)]
    NameTooLong {
        entity: String,
        what: &'static str,
        name: String,
    },

    #[error("join property '{entity}.{property}' declares the remove cascade ({cascade})")]
    RemoveCascade {
        entity: String,
        property: String,
        cascade: CascadeType,
    },

    #[error(
        "entities '{first}' and '{second}' share table '{table}' but declare different {access} consistency"
    )]
    TableConsistencyConflict {
        table: String,
        first: String,
        second: String,
        access: AccessKind,
    },

    #[error("join property '{entity}.{property}' targets unknown entity '{target}'")]
    UnknownJoinTarget {
        entity: String,
        property: String,
        target: String,
    },
}

impl EntityMetadata {
    /// Compile one declarative description into validated metadata.
    ///
    /// Join back-references are left unlinked; the registry resolves them
    /// once every entity exists.
    pub fn build(schema: &EntitySchema) -> Result<Self, MappingError> {
        let entity = schema.name.as_str();
        validate_name(entity, "entity", entity)?;

        let id_schema = schema.id.as_ref().ok_or_else(|| MappingError::MissingId {
            entity: entity.to_string(),
        })?;
        let id = build_id(entity, id_schema)?;

        // every storage column name must be unique, id columns included
        let mut columns: BTreeSet<String> = id
            .column_names()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        columns.insert(id.name().to_string());

        let mut properties = BTreeMap::new();
        for property in &schema.properties {
            if property.kind == PropertyKind::EmbeddedId {
                return Err(MappingError::EmbeddedIdOutsideId {
                    entity: entity.to_string(),
                    property: property.name.clone(),
                });
            }

            let meta = build_property(entity, property)?;
            if !columns.insert(meta.name.clone()) {
                return Err(MappingError::DuplicateProperty {
                    entity: entity.to_string(),
                    property: meta.name,
                });
            }
            properties.insert(meta.name.clone(), Arc::new(meta));
        }

        let clustered_entity = id.clustering().is_some_and(|c| !c.is_empty());
        let clustered_counter = clustered_entity
            && !properties.is_empty()
            && properties.values().all(|p| p.is_counter());

        let table = schema.table.clone().unwrap_or_else(|| entity.to_string());
        validate_name(entity, "table", &table)?;

        Ok(Self {
            name: entity.to_string(),
            table,
            id,
            properties,
            consistency: pair(schema.consistency),
            clustered_entity,
            wide_row: schema.wide_row,
            clustered_counter,
        })
    }
}

fn build_id(entity: &str, schema: &IdSchema) -> Result<IdMetadata, MappingError> {
    match schema {
        IdSchema::Simple(property) => {
            if property.kind != PropertyKind::Simple || property.value_kind.is_collection() {
                return Err(MappingError::InvalidIdKind {
                    entity: entity.to_string(),
                    property: property.name.clone(),
                    kind: format!("{}<{}>", property.kind, property.value_kind),
                });
            }

            Ok(IdMetadata::Simple(Arc::new(build_property(entity, property)?)))
        }
        IdSchema::Compound { property, key } => {
            validate_name(entity, "property", property)?;

            let properties = build_compound_key(entity, key)?;
            let split = key.partition_components;
            if split == 0 || split > properties.len() {
                return Err(MappingError::InvalidPartitionSplit {
                    entity: entity.to_string(),
                    type_name: key.type_name.clone(),
                    partition: split,
                    components: properties.len(),
                });
            }

            let (partition, clustering) = properties.components().split_at(split);
            let part = |components: &[KeyComponent]| {
                CompoundKeyProperties::new(
                    properties.type_name().to_string(),
                    components.to_vec(),
                    properties.shape(),
                )
            };
            let partition = PartitionComponents::new(part(partition));
            let clustering = ClusteringComponents::new(part(clustering));

            let meta = PropertyMetadata {
                entity: entity.to_string(),
                name: property.clone(),
                kind: PropertyKind::EmbeddedId,
                key_kind: None,
                value_kind: ValueKind::Custom(key.type_name.clone()),
                consistency: ConsistencyPair::empty(),
                join: None,
                compound_key: Some(properties),
            };

            Ok(IdMetadata::Compound(CompoundKeyMetadata {
                property: Arc::new(meta),
                partition,
                clustering,
            }))
        }
    }
}

fn build_property(entity: &str, schema: &PropertySchema) -> Result<PropertyMetadata, MappingError> {
    let name = schema.name.as_str();
    validate_name(entity, "property", name)?;

    let consistency = pair(schema.consistency);
    if schema.kind.is_counter() {
        for access in [AccessKind::Read, AccessKind::Write] {
            if consistency.get(access) == Some(ConsistencyLevel::Any) {
                return Err(MappingError::CounterConsistency {
                    entity: entity.to_string(),
                    property: name.to_string(),
                    access,
                });
            }
        }
    }

    if schema.kind.is_map_like() && schema.key_kind.is_none() {
        return Err(MappingError::MissingKeyKind {
            entity: entity.to_string(),
            property: name.to_string(),
        });
    }

    let join = build_join(entity, schema)?;
    let compound_key = schema
        .compound_key
        .as_ref()
        .map(|key| build_compound_key(entity, key))
        .transpose()?;

    Ok(PropertyMetadata {
        entity: entity.to_string(),
        name: name.to_string(),
        kind: schema.kind,
        key_kind: schema.key_kind.clone(),
        value_kind: schema.value_kind.clone(),
        consistency,
        join,
        compound_key,
    })
}

fn build_join(entity: &str, schema: &PropertySchema) -> Result<Option<JoinProperties>, MappingError> {
    if !schema.kind.is_join() {
        if !schema.cascades.is_empty() || schema.join_target.is_some() {
            return Err(MappingError::CascadeWithoutJoin {
                entity: entity.to_string(),
                property: schema.name.clone(),
            });
        }

        return Ok(None);
    }

    let target = schema
        .join_target
        .clone()
        .ok_or_else(|| MappingError::MissingJoinTarget {
            entity: entity.to_string(),
            property: schema.name.clone(),
        })?;

    // ALL implies REMOVE
    if let Some(&cascade) = schema
        .cascades
        .iter()
        .find(|c| matches!(c, CascadeType::Remove | CascadeType::All))
    {
        return Err(MappingError::RemoveCascade {
            entity: entity.to_string(),
            property: schema.name.clone(),
            cascade,
        });
    }

    Ok(Some(JoinProperties::new(
        target,
        schema.cascades.iter().copied().collect(),
    )))
}

fn build_compound_key(
    entity: &str,
    schema: &CompoundKeySchema,
) -> Result<CompoundKeyProperties, MappingError> {
    let type_name = schema.type_name.as_str();
    let len = schema.components.len();

    if len < 2 {
        return Err(MappingError::CompoundKeyArity {
            entity: entity.to_string(),
            type_name: type_name.to_string(),
            found: len,
        });
    }

    let mut ordered: Vec<_> = schema.components.iter().collect();
    ordered.sort_by_key(|c| c.order);
    let orders_ok = ordered
        .iter()
        .zip(1u32..)
        .all(|(component, expected)| component.order == expected);
    if !orders_ok {
        return Err(MappingError::ComponentOrder {
            entity: entity.to_string(),
            type_name: type_name.to_string(),
            len,
        });
    }

    let mut seen = BTreeSet::new();
    for component in &ordered {
        validate_name(entity, "component", &component.name)?;
        if !seen.insert(component.name.as_str()) {
            return Err(MappingError::DuplicateComponent {
                entity: entity.to_string(),
                type_name: type_name.to_string(),
                component: component.name.clone(),
            });
        }
    }

    let shape = resolve_shape(entity, schema)?;
    let components = ordered
        .into_iter()
        .map(|c| KeyComponent::new(c.name.clone(), c.kind.clone()))
        .collect();

    Ok(CompoundKeyProperties::new(
        type_name.to_string(),
        components,
        shape,
    ))
}

// Accessors always qualify; a constructor only when it takes every component.
fn resolve_shape(entity: &str, schema: &CompoundKeySchema) -> Result<ComponentShape, MappingError> {
    let candidates: BTreeSet<_> = schema
        .shapes
        .iter()
        .filter_map(|shape| match *shape {
            KeyShape::Accessors => Some(ComponentShape::Accessors),
            KeyShape::Constructor { arity } if arity == schema.components.len() => {
                Some(ComponentShape::Constructor)
            }
            KeyShape::Constructor { .. } => None,
        })
        .collect();

    match (candidates.len(), candidates.first()) {
        (1, Some(&shape)) => Ok(shape),
        (count, _) => Err(MappingError::CompoundKeyShape {
            entity: entity.to_string(),
            type_name: schema.type_name.clone(),
            candidates: count,
        }),
    }
}

fn validate_name(entity: &str, what: &'static str, name: &str) -> Result<(), MappingError> {
    if name.is_empty() {
        return Err(MappingError::EmptyName {
            entity: entity.to_string(),
            what,
        });
    }
    if name.len() > MAX_NAME_LEN {
        return Err(MappingError::NameTooLong {
            entity: entity.to_string(),
            what,
            name: name.to_string(),
        });
    }

    Ok(())
}

const fn pair(schema: ConsistencySchema) -> ConsistencyPair {
    ConsistencyPair::new(schema.read, schema.write)
}
