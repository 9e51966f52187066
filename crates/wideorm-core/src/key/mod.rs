//! Compound-key validation.
//!
//! Pure checks of supplied partition/clustering values against the
//! declared components of an entity's compound key.

mod error;

#[cfg(test)]
mod tests;

use crate::{model::key::KeyComponent, value::Value};
use derive_more::Display;

// re-exports
pub use error::ValidationError;

///
/// ComponentRole
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ComponentRole {
    #[display("partition key")]
    Partition,
    #[display("clustering key")]
    Clustering,
}

/// Validate supplied values for one key role.
pub fn validate(
    entity: &str,
    role: ComponentRole,
    components: &[KeyComponent],
    values: &[Value],
) -> Result<(), ValidationError> {
    match role {
        ComponentRole::Partition => validate_partition(entity, components, values),
        ComponentRole::Clustering => validate_clustering(entity, components, values),
    }
}

/// Partition values must all be present, non-null and of the declared class.
pub fn validate_partition(
    entity: &str,
    components: &[KeyComponent],
    values: &[Value],
) -> Result<(), ValidationError> {
    let role = ComponentRole::Partition;
    ensure_present(entity, role, values)?;

    if values.len() != components.len() {
        return Err(ValidationError::ComponentCount {
            role,
            expected: components.len(),
            entity: entity.to_string(),
        });
    }

    for (index, (component, value)) in components.iter().zip(values).enumerate() {
        if value.is_null() {
            return Err(ValidationError::NullComponent {
                role,
                position: index + 1,
                entity: entity.to_string(),
            });
        }
        check_type(entity, role, component, value)?;
    }

    Ok(())
}

/// Clustering values may be a prefix of the declared components, with
/// nulls allowed only as a trailing run. All-null input binds nothing and
/// is accepted as-is.
pub fn validate_clustering(
    entity: &str,
    components: &[KeyComponent],
    values: &[Value],
) -> Result<(), ValidationError> {
    let role = ComponentRole::Clustering;
    ensure_present(entity, role, values)?;

    if values.len() > components.len() {
        return Err(ValidationError::ComponentCount {
            role,
            expected: components.len(),
            entity: entity.to_string(),
        });
    }

    // partition-only query
    if values.iter().all(Value::is_null) {
        return Ok(());
    }

    if let Some(first_null) = values.iter().position(Value::is_null)
        && values[first_null..].iter().any(|v| !v.is_null())
    {
        return Err(ValidationError::ComponentGap {
            entity: entity.to_string(),
        });
    }

    for (component, value) in components.iter().zip(values) {
        if value.is_null() {
            break;
        }
        check_type(entity, role, component, value)?;

        if !component.kind.is_naturally_ordered() && !value.is_comparable() {
            return Err(ValidationError::NotComparable {
                type_name: value.type_name(),
                value: value.to_string(),
                entity: entity.to_string(),
            });
        }
    }

    Ok(())
}

fn ensure_present(entity: &str, role: ComponentRole, values: &[Value]) -> Result<(), ValidationError> {
    if values.is_empty() {
        return Err(ValidationError::MissingComponents {
            role,
            entity: entity.to_string(),
        });
    }

    Ok(())
}

fn check_type(
    entity: &str,
    role: ComponentRole,
    component: &KeyComponent,
    value: &Value,
) -> Result<(), ValidationError> {
    if value.kind().as_ref() == Some(&component.kind) {
        return Ok(());
    }

    Err(ValidationError::ComponentType {
        role,
        value: value.to_string(),
        actual: value.type_name(),
        expected: component.kind.canonical_name().to_string(),
        entity: entity.to_string(),
    })
}
