//! Narrow seams to the collaborators the core does not implement: the
//! storage executor and the codec for non-native value classes.

use crate::{
    consistency::ConsistencyLevel,
    context::{Statement, StatementKind},
    value::{CustomValue, Value, ValueKind},
};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error as ThisError;

/// One storage row: column name → value. Absent columns are null.
pub type Row = BTreeMap<String, Value>;

///
/// StorageError
///
/// Failure reported by the executor. Transient-failure handling belongs
/// to the executor; the core only propagates it.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum StorageError {
    #[error("statement on '{table}' failed: {message}")]
    Statement { table: String, message: String },

    #[error("batch of {statements} statement(s) failed: {message}")]
    Batch { statements: usize, message: String },
}

///
/// CodecError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum CodecError {
    #[error("cannot encode value of '{type_name}': {message}")]
    Encode { type_name: String, message: String },

    #[error("cannot decode stored value as '{type_name}': {message}")]
    Decode { type_name: String, message: String },
}

///
/// PropertyRef
/// Address of one column of one row.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PropertyRef {
    pub table: String,
    pub key: Row,
    pub column: String,
}

///
/// StorageExecutor
///
/// Turns statement descriptions into wire calls. Any I/O model works
/// behind it; every call is synchronous relative to the core.
///

pub trait StorageExecutor: Send + Sync {
    fn execute(&self, statement: &Statement) -> Result<Vec<Row>, StorageError>;

    /// Dispatch statements as one unit, in order.
    fn execute_batch(&self, statements: &[Statement]) -> Result<(), StorageError>;

    fn bind_counter_increment(
        &self,
        property: &PropertyRef,
        delta: i64,
        consistency: ConsistencyLevel,
    ) -> Statement {
        Statement {
            table: property.table.clone(),
            key: property.key.clone(),
            kind: StatementKind::CounterIncrement {
                column: property.column.clone(),
                delta,
            },
            consistency,
        }
    }
}

///
/// ValueCodec
///
/// Storage form of values whose class is not a native column type.
///

pub trait ValueCodec: Send + Sync {
    fn encode(&self, value: &Value) -> Result<Value, CodecError>;

    fn decode(&self, stored: &Value, kind: &ValueKind) -> Result<Value, CodecError>;
}

///
/// JsonCodec
///
/// Stores custom values as their JSON text. Types registered as ordered
/// decode as comparable values.
///

#[derive(Clone, Debug, Default)]
pub struct JsonCodec {
    ordered: BTreeSet<String>,
}

impl JsonCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ordered(mut self, type_name: impl Into<String>) -> Self {
        self.ordered.insert(type_name.into());
        self
    }
}

impl ValueCodec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<Value, CodecError> {
        match value {
            Value::Custom(custom) => Ok(Value::Text(custom.payload().to_string())),
            other => Ok(other.clone()),
        }
    }

    fn decode(&self, stored: &Value, kind: &ValueKind) -> Result<Value, CodecError> {
        let ValueKind::Custom(type_name) = kind else {
            return Ok(stored.clone());
        };

        match stored {
            Value::Null => Ok(Value::Null),
            Value::Text(json) => {
                serde_json::from_str::<serde_json::Value>(json).map_err(|err| {
                    CodecError::Decode {
                        type_name: type_name.clone(),
                        message: err.to_string(),
                    }
                })?;

                Ok(Value::Custom(CustomValue::new(
                    type_name.clone(),
                    json.clone(),
                    self.ordered.contains(type_name),
                )))
            }
            other => Err(CodecError::Decode {
                type_name: type_name.clone(),
                message: format!("expected JSON text, found {}", other.type_name()),
            }),
        }
    }
}

/// Encode every custom value nested anywhere in `value`.
pub fn encode_deep(codec: &dyn ValueCodec, value: &Value) -> Result<Value, CodecError> {
    match value {
        Value::Custom(_) => codec.encode(value),
        Value::List(items) => items
            .iter()
            .map(|item| encode_deep(codec, item))
            .collect::<Result<_, _>>()
            .map(Value::List),
        Value::Set(items) => items
            .iter()
            .map(|item| encode_deep(codec, item))
            .collect::<Result<_, _>>()
            .map(Value::Set),
        Value::Map(entries) => entries
            .iter()
            .map(|(k, v)| Ok::<_, CodecError>((encode_deep(codec, k)?, encode_deep(codec, v)?)))
            .collect::<Result<_, _>>()
            .map(Value::Map),
        other => Ok(other.clone()),
    }
}

/// Decode a stored column whose elements (or map keys/values) may be of a
/// custom class.
pub fn decode_column(
    codec: &dyn ValueCodec,
    stored: &Value,
    key_kind: Option<&ValueKind>,
    value_kind: &ValueKind,
) -> Result<Value, CodecError> {
    let decode_key = |k: &Value| match key_kind {
        Some(kind) => codec.decode(k, kind),
        None => Ok(k.clone()),
    };

    match stored {
        Value::List(items) => items
            .iter()
            .map(|item| codec.decode(item, value_kind))
            .collect::<Result<_, _>>()
            .map(Value::List),
        Value::Set(items) => items
            .iter()
            .map(|item| codec.decode(item, value_kind))
            .collect::<Result<_, _>>()
            .map(Value::Set),
        Value::Map(entries) => entries
            .iter()
            .map(|(k, v)| Ok::<_, CodecError>((decode_key(k)?, codec.decode(v, value_kind)?)))
            .collect::<Result<_, _>>()
            .map(Value::Map),
        scalar => codec.decode(scalar, value_kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_codec_round_trips_custom_values() {
        let codec = JsonCodec::new().ordered("Point");
        let kind = ValueKind::Custom("Point".to_string());
        let value = Value::Custom(CustomValue::new("Point", "[1,2]", true));

        let stored = codec.encode(&value).unwrap();
        assert_eq!(stored, Value::Text("[1,2]".to_string()));

        let decoded = codec.decode(&stored, &kind).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn json_codec_rejects_malformed_payload() {
        let codec = JsonCodec::new();
        let kind = ValueKind::Custom("Point".to_string());

        let err = codec
            .decode(&Value::Text("{not json".to_string()), &kind)
            .unwrap_err();

        assert!(matches!(err, CodecError::Decode { ref type_name, .. } if type_name == "Point"));
    }

    #[test]
    fn native_values_pass_through() {
        let codec = JsonCodec::new();

        assert_eq!(
            codec.decode(&Value::Int(3), &ValueKind::Int).unwrap(),
            Value::Int(3)
        );
        assert_eq!(
            encode_deep(&codec, &Value::List(vec![Value::Bool(true)])).unwrap(),
            Value::List(vec![Value::Bool(true)])
        );
    }

    #[test]
    fn encode_deep_reaches_map_entries() {
        let codec = JsonCodec::new();
        let custom = Value::Custom(CustomValue::new("Tag", "\"a\"", false));
        let map = Value::Map(BTreeMap::from([(Value::Int(1), custom)]));

        let encoded = encode_deep(&codec, &map).unwrap();

        assert_eq!(
            encoded,
            Value::Map(BTreeMap::from([(
                Value::Int(1),
                Value::Text("\"a\"".to_string())
            )]))
        );
    }
}
