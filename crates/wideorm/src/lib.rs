//! ## Crate layout
//! - `core`: metadata model, key validation, consistency resolution,
//!   change-tracking proxies and persistence contexts.
//! - `config`: TOML configuration of the consistency policy.
//! - `error`: the stable public error type.
//!
//! `bootstrap` compiles the mapping declarations, applies configuration
//! and returns a ready [`Session`]. The `prelude` module carries what
//! application code needs to map entities and run operations.

pub use wideorm_config as config;
pub use wideorm_core as core;

pub mod error;

use std::sync::Arc;
use wideorm_config::MapperConfig;
use wideorm_core::{
    consistency::ConsistencyPolicy, interface::StorageExecutor, model::registry::MetadataRegistry,
    schema::EntitySchema, session::Session,
};

// re-exports
pub use error::{Error, ErrorKind, ErrorOrigin};

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the registry from `schemas`, seed the consistency policy from
/// entity declarations, then let `config` override defaults and tables.
pub fn bootstrap(
    config: &MapperConfig,
    schemas: &[EntitySchema],
    executor: Arc<dyn StorageExecutor>,
) -> Result<Session, Error> {
    let registry = MetadataRegistry::bootstrap(schemas).map_err(wideorm_core::Error::from)?;

    let defaults = &config.consistency;
    let mut policy =
        ConsistencyPolicy::from_registry(&registry, defaults.default_read, defaults.default_write);
    defaults.apply(&mut policy);

    tracing::info!(
        entities = registry.len(),
        tables = policy.tables().count(),
        default_read = %defaults.default_read,
        default_write = %defaults.default_write,
        "mapper ready"
    );

    Ok(Session::new(registry, policy, executor))
}

///
/// Prelude
///

pub mod prelude {
    pub use crate::{Error, ErrorKind, bootstrap, config::MapperConfig};
    pub use wideorm_core::{
        consistency::{AccessKind, ConsistencyLevel, ConsistencyPair},
        context::SliceRange,
        interface::{Row, StorageExecutor},
        model::property::{CascadeType, PropertyKind},
        proxy::{ChangeSet, ChangeType, EntityProxy, TrackingMode},
        schema::{CompoundKeySchema, EntitySchema, IdSchema, KeyShape, PropertySchema},
        session::{Batch, Managed, Session},
        traits::{Entity, EntityKind, FieldValue},
        value::{Value, ValueKind},
    };
}

///
/// TESTS
///
