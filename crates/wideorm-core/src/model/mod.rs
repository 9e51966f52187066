//! Runtime metadata model.
//!
//! Types in `model` are the validated, immutable description of every
//! mapped class. They are compiled once from the declarative `schema`
//! input at bootstrap and shared (`Arc`) by the resolver, the proxies and
//! the persistence contexts for the rest of the process.
//!
//! In general:
//! - `schema` describes *what was declared*
//! - `model` describes *what runs*

mod build;
pub mod entity;
pub mod key;
pub mod property;
pub mod registry;


pub use build::{MAX_NAME_LEN, MappingError};
