use crate::{error::StateError, value::Value};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

///
/// Entity
///
/// Capability surface of a mapped entity: read and write one property
/// as a storable value. Proxies forward through this trait; collection
/// properties are additionally reached through typed field accessors.
///

pub trait Entity {
    fn get_value(&self, property: &str) -> Option<Value>;

    fn set_value(&mut self, property: &str, value: Value) -> Result<(), StateError>;
}

///
/// EntityKind
///
/// A statically mapped entity type, resolved by name in the registry.
///

pub trait EntityKind: Entity + Default {
    const ENTITY: &'static str;
}

///
/// FieldValue
///
/// Conversion between Rust field types and storable values.
///

pub trait FieldValue {
    fn to_value(&self) -> Value;

    #[must_use]
    fn from_value(value: &Value) -> Option<Self>
    where
        Self: Sized;
}

impl FieldValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FieldValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl FieldValue for i32 {
    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl FieldValue for i64 {
    fn to_value(&self) -> Value {
        Value::BigInt(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_big_int()
    }
}

impl FieldValue for f64 {
    fn to_value(&self) -> Value {
        Value::Double(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl FieldValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_text().map(ToString::to_string)
    }
}

impl FieldValue for &str {
    fn to_value(&self) -> Value {
        Value::Text((*self).to_string())
    }

    fn from_value(_value: &Value) -> Option<Self> {
        None
    }
}

impl FieldValue for Uuid {
    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Uuid(v) => Some(*v),
            _ => None,
        }
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, FieldValue::to_value)
    }

    fn from_value(value: &Value) -> Option<Self> {
        if value.is_null() {
            return Some(None);
        }

        T::from_value(value).map(Some)
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(FieldValue::to_value).collect())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

impl<T: FieldValue + Ord> FieldValue for BTreeSet<T> {
    fn to_value(&self) -> Value {
        Value::Set(self.iter().map(FieldValue::to_value).collect())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Set(items) => items.iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

impl<K: FieldValue + Ord, V: FieldValue> FieldValue for BTreeMap<K, V> {
    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.to_value(), v.to_value()))
                .collect(),
        )
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Map(entries) => entries
                .iter()
                .map(|(k, v)| Some((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            _ => None,
        }
    }
}

///
/// Record
///
/// Dynamic entity backed by a property map; useful when the mapped class
/// is only known through its schema.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, property: &str, value: impl FieldValue) -> Self {
        self.values.insert(property.to_string(), value.to_value());
        self
    }

    #[must_use]
    pub const fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Backing list of a list-valued property; absent or non-list slots
    /// start out as an empty list.
    pub fn list_mut(&mut self, property: &str) -> &mut Vec<Value> {
        let slot = self.slot(property);
        if !matches!(slot, Value::List(_)) {
            *slot = Value::List(Vec::new());
        }
        let Value::List(items) = slot else {
            unreachable!("slot normalized to a list above")
        };

        items
    }

    /// Backing set of a set-valued property.
    pub fn set_mut(&mut self, property: &str) -> &mut BTreeSet<Value> {
        let slot = self.slot(property);
        if !matches!(slot, Value::Set(_)) {
            *slot = Value::Set(BTreeSet::new());
        }
        let Value::Set(items) = slot else {
            unreachable!("slot normalized to a set above")
        };

        items
    }

    /// Backing map of a map-valued property.
    pub fn map_mut(&mut self, property: &str) -> &mut BTreeMap<Value, Value> {
        let slot = self.slot(property);
        if !matches!(slot, Value::Map(_)) {
            *slot = Value::Map(BTreeMap::new());
        }
        let Value::Map(entries) = slot else {
            unreachable!("slot normalized to a map above")
        };

        entries
    }

    fn slot(&mut self, property: &str) -> &mut Value {
        self.values
            .entry(property.to_string())
            .or_insert(Value::Null)
    }
}

impl Entity for Record {
    fn get_value(&self, property: &str) -> Option<Value> {
        self.values.get(property).filter(|v| !v.is_null()).cloned()
    }

    fn set_value(&mut self, property: &str, value: Value) -> Result<(), StateError> {
        if value.is_null() {
            self.values.remove(property);
        } else {
            self.values.insert(property.to_string(), value);
        }

        Ok(())
    }
}

impl FieldValue for Record {
    fn to_value(&self) -> Value {
        Value::Map(
            self.values
                .iter()
                .map(|(k, v)| (Value::Text(k.clone()), v.clone()))
                .collect(),
        )
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Map(entries) => {
                let mut record = Self::new();
                for (k, v) in entries {
                    record.values.insert(k.as_text()?.to_string(), v.clone());
                }
                Some(record)
            }
            _ => None,
        }
    }
}
