mod kind;


use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
    fmt,
};
use uuid::Uuid;

// re-exports
pub use kind::ValueKind;

///
/// Value
///
/// Storable runtime value of one column, key component, or collection
/// element. Totally ordered so it can key sets and maps.
///
/// Null → the column is absent (also used as the removal marker in map
/// change-sets).
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    BigInt(i64),
    Double(f64),
    Text(String),
    Uuid(Uuid),
    /// Milliseconds since the unix epoch.
    Timestamp(i64),
    Blob(Vec<u8>),
    List(Vec<Self>),
    Set(BTreeSet<Self>),
    Map(BTreeMap<Self, Self>),
    Custom(CustomValue),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Runtime kind of this value, `None` for `Null`.
    #[must_use]
    pub fn kind(&self) -> Option<ValueKind> {
        let kind = match self {
            Self::Null => return None,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::BigInt(_) => ValueKind::BigInt,
            Self::Double(_) => ValueKind::Double,
            Self::Text(_) => ValueKind::Text,
            Self::Uuid(_) => ValueKind::Uuid,
            Self::Timestamp(_) => ValueKind::Timestamp,
            Self::Blob(_) => ValueKind::Blob,
            Self::List(_) => ValueKind::List,
            Self::Set(_) => ValueKind::Set,
            Self::Map(_) => ValueKind::Map,
            Self::Custom(custom) => ValueKind::Custom(custom.type_name.clone()),
        };

        Some(kind)
    }

    /// Canonical name of the runtime type, as printed in validation errors.
    #[must_use]
    pub fn type_name(&self) -> String {
        self.kind()
            .map_or_else(|| "null".to_string(), |kind| kind.canonical_name().to_string())
    }

    /// Whether this value can take part in a clustering range comparison.
    #[must_use]
    pub const fn is_comparable(&self) -> bool {
        match self {
            Self::Custom(custom) => custom.ordered,
            Self::List(_) | Self::Set(_) | Self::Map(_) => false,
            _ => true,
        }
    }

    #[must_use]
    pub fn as_big_int(&self) -> Option<i64> {
        match self {
            Self::BigInt(v) => Some(*v),
            Self::Int(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    // variant rank used for cross-variant ordering
    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) => 2,
            Self::BigInt(_) => 3,
            Self::Double(_) => 4,
            Self::Text(_) => 5,
            Self::Uuid(_) => 6,
            Self::Timestamp(_) => 7,
            Self::Blob(_) => 8,
            Self::List(_) => 9,
            Self::Set(_) => 10,
            Self::Map(_) => 11,
            Self::Custom(_) => 12,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::BigInt(a), Self::BigInt(b)) | (Self::Timestamp(a), Self::Timestamp(b)) => {
                a.cmp(b)
            }
            (Self::Double(a), Self::Double(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Uuid(a), Self::Uuid(b)) => a.cmp(b),
            (Self::Blob(a), Self::Blob(b)) => a.cmp(b),
            (Self::List(a), Self::List(b)) => a.cmp(b),
            (Self::Set(a), Self::Set(b)) => a.cmp(b),
            (Self::Map(a), Self::Map(b)) => a.cmp(b),
            (Self::Custom(a), Self::Custom(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::BigInt(v) | Self::Timestamp(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Uuid(v) => write!(f, "{v}"),
            Self::Blob(bytes) => {
                f.write_str("0x")?;
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Self::List(items) => write_seq(f, "[", items.iter(), "]"),
            Self::Set(items) => write_seq(f, "{", items.iter(), "}"),
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Self::Custom(custom) => f.write_str(&custom.payload),
        }
    }
}

fn write_seq<'a>(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    items: impl Iterator<Item = &'a Value>,
    close: &str,
) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

///
/// CustomValue
///
/// Opaque value of a non-native class, carried as JSON text.
/// `ordered` marks types that implement a total order of their own.
///

#[derive(Clone, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct CustomValue {
    type_name: String,
    payload: String,
    ordered: bool,
}

impl CustomValue {
    pub fn new(type_name: impl Into<String>, payload: impl Into<String>, ordered: bool) -> Self {
        Self {
            type_name: type_name.into(),
            payload: payload.into(),
            ordered,
        }
    }

    /// Capture a serde-serializable value as its JSON payload.
    pub fn from_serde<T: Serialize>(
        type_name: impl Into<String>,
        value: &T,
        ordered: bool,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(type_name, serde_json::to_string(value)?, ordered))
    }

    /// Decode the JSON payload back into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        self.ordered
    }
}
