use crate::{
    key::{ComponentRole, ValidationError, validate_clustering, validate_partition},
    model::property::PropertyMetadata,
    value::{Value, ValueKind},
};
use derive_more::Deref;
use std::sync::Arc;

///
/// KeyComponent
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyComponent {
    pub name: String,
    pub kind: ValueKind,
}

impl KeyComponent {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

///
/// ComponentShape
/// The single canonical way a compound key class exposes its components.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ComponentShape {
    Accessors,
    Constructor,
}

///
/// CompoundKeyProperties
///
/// Ordered component classes and names of a compound value. The first
/// component names the id; with more than one component the second is
/// the implicit ordering column.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompoundKeyProperties {
    type_name: String,
    components: Vec<KeyComponent>,
    shape: ComponentShape,
}

impl CompoundKeyProperties {
    #[must_use]
    pub const fn new(type_name: String, components: Vec<KeyComponent>, shape: ComponentShape) -> Self {
        Self {
            type_name,
            components,
            shape,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn components(&self) -> &[KeyComponent] {
        &self.components
    }

    #[must_use]
    pub const fn shape(&self) -> ComponentShape {
        self.shape
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|c| c.name.as_str())
    }

    #[must_use]
    pub fn id_component(&self) -> Option<&str> {
        self.components.first().map(|c| c.name.as_str())
    }

    #[must_use]
    pub fn ordering_component(&self) -> Option<&str> {
        if self.components.len() > 1 {
            self.components.get(1).map(|c| c.name.as_str())
        } else {
            None
        }
    }
}

///
/// PartitionComponents
///

#[derive(Clone, Debug, Deref, Eq, PartialEq)]
pub struct PartitionComponents(CompoundKeyProperties);

impl PartitionComponents {
    #[must_use]
    pub const fn new(properties: CompoundKeyProperties) -> Self {
        Self(properties)
    }

    /// Validate supplied partition values for a query on `entity`.
    pub fn validate(&self, entity: &str, values: &[Value]) -> Result<(), ValidationError> {
        validate_partition(entity, self.components(), values)
    }
}

///
/// ClusteringComponents
///

#[derive(Clone, Debug, Deref, Eq, PartialEq)]
pub struct ClusteringComponents(CompoundKeyProperties);

impl ClusteringComponents {
    #[must_use]
    pub const fn new(properties: CompoundKeyProperties) -> Self {
        Self(properties)
    }

    /// Validate a (possibly partial) clustering prefix for a query on `entity`.
    pub fn validate(&self, entity: &str, values: &[Value]) -> Result<(), ValidationError> {
        validate_clustering(entity, self.components(), values)
    }
}

///
/// CompoundKeyMetadata
///

#[derive(Clone, Debug)]
pub struct CompoundKeyMetadata {
    pub(crate) property: Arc<PropertyMetadata>,
    pub(crate) partition: PartitionComponents,
    pub(crate) clustering: ClusteringComponents,
}

impl CompoundKeyMetadata {
    #[must_use]
    pub const fn property(&self) -> &Arc<PropertyMetadata> {
        &self.property
    }

    #[must_use]
    pub const fn partition(&self) -> &PartitionComponents {
        &self.partition
    }

    #[must_use]
    pub const fn clustering(&self) -> &ClusteringComponents {
        &self.clustering
    }
}

///
/// IdMetadata
///

#[derive(Clone, Debug)]
pub enum IdMetadata {
    Simple(Arc<PropertyMetadata>),
    Compound(CompoundKeyMetadata),
}

impl IdMetadata {
    /// Name of the id property.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Simple(property) => property.name(),
            Self::Compound(key) => key.property.name(),
        }
    }

    #[must_use]
    pub const fn is_compound(&self) -> bool {
        matches!(self, Self::Compound(_))
    }

    /// Storage columns of the primary key, partition first.
    #[must_use]
    pub fn key_columns(&self) -> Vec<&KeyComponent> {
        match self {
            Self::Simple(_) => Vec::new(),
            Self::Compound(key) => key
                .partition
                .components()
                .iter()
                .chain(key.clustering.components())
                .collect(),
        }
    }

    /// Column names in key order; a simple id is its own single column.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        match self {
            Self::Simple(property) => vec![property.name()],
            Self::Compound(_) => self.key_columns().iter().map(|c| c.name.as_str()).collect(),
        }
    }

    #[must_use]
    pub const fn partition(&self) -> Option<&PartitionComponents> {
        match self {
            Self::Simple(_) => None,
            Self::Compound(key) => Some(&key.partition),
        }
    }

    #[must_use]
    pub const fn clustering(&self) -> Option<&ClusteringComponents> {
        match self {
            Self::Simple(_) => None,
            Self::Compound(key) => Some(&key.clustering),
        }
    }

    /// Validate a full primary key (every component bound).
    pub fn validate_full_key(&self, entity: &str, values: &[Value]) -> Result<(), ValidationError> {
        match self {
            Self::Simple(property) => {
                let component = KeyComponent::new(property.name(), property.value_kind().clone());
                validate_partition(entity, &[component], values)
            }
            Self::Compound(key) => {
                let expected = key.partition.len() + key.clustering.len();
                if values.len() != expected {
                    return Err(ValidationError::IncompleteKey {
                        expected,
                        found: values.len(),
                        entity: entity.to_string(),
                    });
                }

                let (partition, clustering) = values.split_at(key.partition.len());
                key.partition.validate(entity, partition)?;
                if clustering.is_empty() {
                    return Ok(());
                }
                if let Some(index) = clustering.iter().position(Value::is_null) {
                    return Err(ValidationError::NullComponent {
                        role: ComponentRole::Clustering,
                        position: index + 1,
                        entity: entity.to_string(),
                    });
                }

                key.clustering.validate(entity, clustering)
            }
        }
    }
}
