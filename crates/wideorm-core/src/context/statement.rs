use crate::{consistency::ConsistencyLevel, interface::Row, proxy::Change, value::Value};
use derive_more::Display;

///
/// Statement
///
/// Storage-level operation built by the core and dispatched by the
/// executor. `key` binds the primary-key columns (only the partition
/// columns for a slice).
///

#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub table: String,
    pub key: Row,
    pub kind: StatementKind,
    pub consistency: ConsistencyLevel,
}

impl Statement {
    #[must_use]
    pub fn new(
        table: impl Into<String>,
        key: Row,
        kind: StatementKind,
        consistency: ConsistencyLevel,
    ) -> Self {
        Self {
            table: table.into(),
            key,
            kind,
            consistency,
        }
    }

    /// Reads return rows; everything else is a write.
    #[must_use]
    pub const fn is_read(&self) -> bool {
        matches!(
            self.kind,
            StatementKind::Select { .. } | StatementKind::Slice { .. }
        )
    }
}

///
/// StatementKind
///

#[derive(Clone, Debug, Display, PartialEq)]
pub enum StatementKind {
    /// Write a whole row.
    #[display("INSERT")]
    Insert { values: Row },

    /// Re-assign whole columns of an existing row.
    #[display("ASSIGN")]
    Assign { values: Row },

    /// Element-level edit of one collection column.
    #[display("COLLECTION {column}")]
    Collection { column: String, change: Change },

    #[display("DELETE")]
    Delete,

    /// Point read of the given columns; empty means every column.
    #[display("SELECT")]
    Select { columns: Vec<String> },

    /// Range read inside one partition, bounded by clustering prefixes.
    /// Empty bounds are open.
    #[display("SLICE")]
    Slice {
        from: Vec<Value>,
        to: Vec<Value>,
        limit: Option<usize>,
    },

    #[display("INCREMENT {column}")]
    CounterIncrement { column: String, delta: i64 },
}
