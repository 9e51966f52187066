use crate::key::ComponentRole;
use thiserror::Error as ThisError;

///
/// ValidationError
///
/// Call-time key component violations. Raised before any I/O and never
/// retried.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ValidationError {
    #[error(
        "There should be at least one {role} component provided for querying on entity '{entity}'"
    )]
    MissingComponents { role: ComponentRole, entity: String },

    #[error("{}", count_message(*.role, *.expected, .entity))]
    ComponentCount {
        role: ComponentRole,
        expected: usize,
        entity: String,
    },

    #[error(
        "The {role} component at position '{position}' should not be null for querying on entity '{entity}'"
    )]
    NullComponent {
        role: ComponentRole,
        position: usize,
        entity: String,
    },

    #[error(
        "The type '{actual}' of {role} component '{value}' for querying on entity '{entity}' is not valid. It should be '{expected}'"
    )]
    ComponentType {
        role: ComponentRole,
        value: String,
        actual: String,
        expected: String,
        entity: String,
    },

    #[error(
        "There should be no null value between two non-null components of clustering key for querying on entity '{entity}'"
    )]
    ComponentGap { entity: String },

    #[error(
        "The type '{type_name}' of clustering key component '{value}' for querying on entity '{entity}' should implement a total order"
    )]
    NotComparable {
        type_name: String,
        value: String,
        entity: String,
    },

    #[error(
        "There should be exactly '{expected}' primary key components for entity '{entity}', found '{found}'"
    )]
    IncompleteKey {
        expected: usize,
        found: usize,
        entity: String,
    },
}

fn count_message(role: ComponentRole, expected: usize, entity: &str) -> String {
    match role {
        ComponentRole::Partition => format!(
            "There should be exactly '{expected}' partition components for querying on entity '{entity}'"
        ),
        ComponentRole::Clustering => format!(
            "There should be at most '{expected}' clustering components for querying on entity '{entity}'"
        ),
    }
}
