//! Core runtime for wideorm: entity/property metadata, compound-key
//! validation, consistency resolution, change-tracking proxies and the
//! persistence/flush contexts that turn tracked changes into statements.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod consistency;
pub mod context;
pub mod error;
pub mod interface;
pub mod key;
pub mod model;
pub mod obs;
pub mod proxy;
pub mod schema;
pub mod session;
pub mod traits;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

pub use error::Error;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No executors, stores, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        consistency::{AccessKind, ConsistencyLevel, ConsistencyPair},
        model::{entity::EntityMetadata, property::PropertyKind, property::PropertyMetadata},
        proxy::{ChangeSet, ChangeType, EntityProxy, TrackingMode},
        traits::{Entity, EntityKind, FieldValue},
        value::{Value, ValueKind},
    };
}
