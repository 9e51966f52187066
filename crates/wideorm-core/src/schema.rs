//! Declarative mapping input.
//!
//! Plain data describing one mapped class. How it is produced (derive
//! macros, a config file, code generation) is outside the core; the
//! metadata builder only consumes it.

use crate::{
    consistency::ConsistencyLevel, model::property::CascadeType, model::property::PropertyKind,
    value::ValueKind,
};
use serde::{Deserialize, Serialize};

///
/// EntitySchema
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EntitySchema {
    /// Class label; used in diagnostics and registry lookups.
    pub name: String,

    /// Table name, defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    pub id: Option<IdSchema>,

    #[serde(default)]
    pub properties: Vec<PropertySchema>,

    #[serde(default)]
    pub consistency: ConsistencySchema,

    #[serde(default)]
    pub wide_row: bool,
}

impl EntitySchema {
    #[must_use]
    pub fn new(name: impl Into<String>, id: IdSchema) -> Self {
        Self {
            name: name.into(),
            table: None,
            id: Some(id),
            properties: Vec::new(),
            consistency: ConsistencySchema::default(),
            wide_row: false,
        }
    }

    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    #[must_use]
    pub fn property(mut self, property: PropertySchema) -> Self {
        self.properties.push(property);
        self
    }

    #[must_use]
    pub const fn consistency(mut self, consistency: ConsistencySchema) -> Self {
        self.consistency = consistency;
        self
    }

    #[must_use]
    pub const fn wide_row(mut self) -> Self {
        self.wide_row = true;
        self
    }
}

///
/// IdSchema
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum IdSchema {
    Simple(PropertySchema),
    Compound {
        property: String,
        key: CompoundKeySchema,
    },
}

///
/// PropertySchema
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PropertySchema {
    pub name: String,
    pub kind: PropertyKind,

    /// Key class for map-like kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_kind: Option<ValueKind>,

    pub value_kind: ValueKind,

    #[serde(default)]
    pub consistency: ConsistencySchema,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cascades: Vec<CascadeType>,

    /// Target entity for join kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_target: Option<String>,

    /// Present when the property value is itself a compound value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compound_key: Option<CompoundKeySchema>,
}

impl PropertySchema {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: PropertyKind, value_kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            key_kind: None,
            value_kind,
            consistency: ConsistencySchema::default(),
            cascades: Vec::new(),
            join_target: None,
            compound_key: None,
        }
    }

    #[must_use]
    pub fn simple(name: impl Into<String>, value_kind: ValueKind) -> Self {
        Self::new(name, PropertyKind::Simple, value_kind)
    }

    #[must_use]
    pub fn key_kind(mut self, key_kind: ValueKind) -> Self {
        self.key_kind = Some(key_kind);
        self
    }

    #[must_use]
    pub const fn consistency(mut self, consistency: ConsistencySchema) -> Self {
        self.consistency = consistency;
        self
    }

    #[must_use]
    pub fn join(mut self, target: impl Into<String>, cascades: &[CascadeType]) -> Self {
        self.join_target = Some(target.into());
        self.cascades = cascades.to_vec();
        self
    }

    #[must_use]
    pub fn compound_key(mut self, key: CompoundKeySchema) -> Self {
        self.compound_key = Some(key);
        self
    }
}

///
/// ConsistencySchema
/// Optional declared read/write levels.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ConsistencySchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<ConsistencyLevel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write: Option<ConsistencyLevel>,
}

impl ConsistencySchema {
    #[must_use]
    pub const fn new(read: Option<ConsistencyLevel>, write: Option<ConsistencyLevel>) -> Self {
        Self { read, write }
    }
}

///
/// CompoundKeySchema
///
/// Ordered components of a compound key class plus the ways the class
/// exposes them. Exactly one shape must be declared for the key to be
/// canonical.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CompoundKeySchema {
    pub type_name: String,
    pub components: Vec<ComponentSchema>,

    /// Number of leading components that form the partition key.
    #[serde(default = "default_partition_components")]
    pub partition_components: usize,

    pub shapes: Vec<KeyShape>,
}

const fn default_partition_components() -> usize {
    1
}

impl CompoundKeySchema {
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            components: Vec::new(),
            partition_components: default_partition_components(),
            shapes: Vec::new(),
        }
    }

    /// Append a component; its order is its 1-based position.
    #[must_use]
    pub fn component(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        let order = u32::try_from(self.components.len() + 1).unwrap_or(u32::MAX);
        self.components.push(ComponentSchema {
            name: name.into(),
            kind,
            order,
        });
        self
    }

    #[must_use]
    pub const fn partition_components(mut self, count: usize) -> Self {
        self.partition_components = count;
        self
    }

    #[must_use]
    pub fn shape(mut self, shape: KeyShape) -> Self {
        self.shapes.push(shape);
        self
    }
}

///
/// ComponentSchema
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ComponentSchema {
    pub name: String,
    pub kind: ValueKind,

    /// 1-based declared position.
    pub order: u32,
}

///
/// KeyShape
/// How a compound key class exposes its components.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum KeyShape {
    Accessors,
    Constructor { arity: usize },
}
