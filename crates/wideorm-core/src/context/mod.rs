//! Persistence and flush contexts: where tracked state becomes statements.

mod flush;
mod persistence;
mod statement;


// re-exports
pub use flush::{BatchGuard, FlushContext, WriteOutcome, WriteTicket};
pub use persistence::{ContextState, PersistenceContext, SliceRange};
pub use statement::{Statement, StatementKind};
