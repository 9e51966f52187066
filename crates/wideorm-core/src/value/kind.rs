use serde::{Deserialize, Serialize};
use std::fmt;

///
/// ValueKind
///
/// Declared class of a column, key component, or collection element.
/// Closed set; custom kinds are matched by their type name and stored
/// through the value codec.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[remain::sorted]
pub enum ValueKind {
    BigInt,
    Blob,
    Bool,
    Custom(String),
    Double,
    Int,
    List,
    Map,
    Set,
    Text,
    Timestamp,
    Uuid,
}

impl ValueKind {
    /// Canonical type name used verbatim in validation messages.
    #[must_use]
    pub fn canonical_name(&self) -> &str {
        match self {
            Self::BigInt => "i64",
            Self::Blob => "Vec<u8>",
            Self::Bool => "bool",
            Self::Custom(name) => name,
            Self::Double => "f64",
            Self::Int => "i32",
            Self::List => "List",
            Self::Map => "Map",
            Self::Set => "Set",
            Self::Text => "String",
            Self::Timestamp => "Timestamp",
            Self::Uuid => "uuid::Uuid",
        }
    }

    /// Whether every value of this kind already has a total order.
    ///
    /// Custom kinds never do; their values must declare one themselves.
    #[must_use]
    pub const fn is_naturally_ordered(&self) -> bool {
        !matches!(
            self,
            Self::Custom(_) | Self::List | Self::Map | Self::Set
        )
    }

    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self, Self::List | Self::Map | Self::Set)
    }

    #[must_use]
    pub const fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}
