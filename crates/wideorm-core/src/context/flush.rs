use crate::{
    consistency::ConsistencyPair,
    context::Statement,
    error::StateError,
    interface::{Row, StorageError, StorageExecutor},
    obs::sink::{self, MetricsEvent},
};
use std::{
    ops::{Deref, DerefMut},
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
};

///
/// WriteOutcome
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteOutcome {
    Pending,
    Written,
    Discarded,
}

///
/// WriteTicket
///
/// Shared by every statement buffered between two releases of a batch
/// buffer. Settled once: written when the buffer is dispatched
/// successfully, discarded when it is dropped or its dispatch fails.
///

#[derive(Debug)]
pub struct WriteTicket {
    outcome: AtomicU8,
}

impl WriteTicket {
    const PENDING: u8 = 0;
    const WRITTEN: u8 = 1;
    const DISCARDED: u8 = 2;

    fn new() -> Arc<Self> {
        Arc::new(Self {
            outcome: AtomicU8::new(Self::PENDING),
        })
    }

    #[must_use]
    pub fn outcome(&self) -> WriteOutcome {
        match self.outcome.load(Ordering::Acquire) {
            Self::PENDING => WriteOutcome::Pending,
            Self::WRITTEN => WriteOutcome::Written,
            _ => WriteOutcome::Discarded,
        }
    }

    fn settle(&self, outcome: WriteOutcome) {
        let value = match outcome {
            WriteOutcome::Pending => return,
            WriteOutcome::Written => Self::WRITTEN,
            WriteOutcome::Discarded => Self::DISCARDED,
        };
        let _ = self.outcome.compare_exchange(
            Self::PENDING,
            value,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

///
/// FlushContext
///
/// Where write statements go once a persistence operation has built them.
/// Reads are never buffered.
///

pub enum FlushContext {
    /// Every write is dispatched as soon as it is pushed.
    Immediate { executor: Arc<dyn StorageExecutor> },

    /// Writes accumulate in order and are dispatched as one unit on flush.
    Batching {
        executor: Arc<dyn StorageExecutor>,
        pinned: ConsistencyPair,
        buffer: Vec<Statement>,
        ticket: Arc<WriteTicket>,
    },
}

impl FlushContext {
    #[must_use]
    pub fn immediate(executor: Arc<dyn StorageExecutor>) -> Self {
        Self::Immediate { executor }
    }

    #[must_use]
    pub fn batching(executor: Arc<dyn StorageExecutor>, pinned: ConsistencyPair) -> Self {
        Self::Batching {
            executor,
            pinned,
            buffer: Vec::new(),
            ticket: WriteTicket::new(),
        }
    }

    #[must_use]
    pub fn executor(&self) -> &Arc<dyn StorageExecutor> {
        match self {
            Self::Immediate { executor } | Self::Batching { executor, .. } => executor,
        }
    }

    #[must_use]
    pub const fn is_batching(&self) -> bool {
        matches!(self, Self::Batching { .. })
    }

    /// Levels fixed for the lifetime of this context.
    #[must_use]
    pub const fn pinned(&self) -> ConsistencyPair {
        match self {
            Self::Immediate { .. } => ConsistencyPair::empty(),
            Self::Batching { pinned, .. } => *pinned,
        }
    }

    /// Ticket settled with the statements buffered so far; `None` when
    /// writes are dispatched as they are pushed.
    #[must_use]
    pub fn ticket(&self) -> Option<Arc<WriteTicket>> {
        match self {
            Self::Immediate { .. } => None,
            Self::Batching { ticket, .. } => Some(ticket.clone()),
        }
    }

    /// Statements buffered and not yet flushed.
    #[must_use]
    pub fn pending(&self) -> &[Statement] {
        match self {
            Self::Immediate { .. } => &[],
            Self::Batching { buffer, .. } => buffer,
        }
    }

    pub fn push(&mut self, statement: Statement) -> Result<(), StorageError> {
        match self {
            Self::Immediate { executor } => {
                tracing::debug!(
                    table = %statement.table,
                    kind = %statement.kind,
                    consistency = %statement.consistency,
                    "dispatching statement"
                );
                sink::record(MetricsEvent::StatementDispatched);

                executor.execute(&statement).map(|_| ())
            }
            Self::Batching { buffer, .. } => {
                sink::record(MetricsEvent::StatementBatched);
                buffer.push(statement);

                Ok(())
            }
        }
    }

    /// Run a read right away, whatever the variant.
    pub fn query(&self, statement: &Statement) -> Result<Vec<Row>, StorageError> {
        tracing::debug!(
            table = %statement.table,
            kind = %statement.kind,
            consistency = %statement.consistency,
            "dispatching read"
        );
        sink::record(MetricsEvent::StatementDispatched);

        self.executor().execute(statement)
    }

    /// Dispatch the buffer as one unit; it is emptied whether or not the
    /// dispatch succeeds. Returns the number of statements sent.
    pub fn flush(&mut self) -> Result<usize, StorageError> {
        let Self::Batching {
            executor,
            buffer,
            ticket,
            ..
        } = self
        else {
            return Ok(0);
        };
        if buffer.is_empty() {
            return Ok(0);
        }

        let statements = std::mem::take(buffer);
        let count = statements.len();
        tracing::debug!(statements = count, "flushing batch");

        let settled = std::mem::replace(ticket, WriteTicket::new());

        match executor.execute_batch(&statements) {
            Ok(()) => {
                settled.settle(WriteOutcome::Written);
                sink::record(MetricsEvent::BatchFlushed {
                    statements: count as u64,
                });

                Ok(count)
            }
            Err(err) => {
                settled.settle(WriteOutcome::Discarded);
                sink::record(MetricsEvent::BatchDiscarded {
                    statements: count as u64,
                });

                Err(err)
            }
        }
    }

    /// Drop anything still buffered. Returns how many statements were lost.
    pub fn cleanup(&mut self) -> usize {
        let Self::Batching { buffer, ticket, .. } = self else {
            return 0;
        };

        let discarded = buffer.len();
        buffer.clear();
        if discarded > 0 {
            std::mem::replace(ticket, WriteTicket::new()).settle(WriteOutcome::Discarded);
            tracing::debug!(statements = discarded, "discarding pending batch");
            sink::record(MetricsEvent::BatchDiscarded {
                statements: discarded as u64,
            });
        }

        discarded
    }

    /// Refuse `operation` while a batch is open, before it does any I/O.
    pub const fn ensure_no_pending_batch(&self, operation: &'static str) -> Result<(), StateError> {
        if self.is_batching() {
            return Err(StateError::BatchPending { operation });
        }

        Ok(())
    }
}

///
/// BatchGuard
///
/// Owns a batching flush context and releases it exactly once: on
/// `finish`, or on drop when the holder bails out early. Releasing
/// discards whatever is still buffered.
///

pub struct BatchGuard {
    flush: FlushContext,
    released: bool,
}

impl BatchGuard {
    #[must_use]
    pub fn new(executor: Arc<dyn StorageExecutor>, pinned: ConsistencyPair) -> Self {
        tracing::debug!(
            read = ?pinned.read,
            write = ?pinned.write,
            "batch opened"
        );

        Self {
            flush: FlushContext::batching(executor, pinned),
            released: false,
        }
    }

    /// Flush the buffer, then release.
    pub fn finish(mut self) -> Result<usize, StorageError> {
        let flushed = self.flush.flush();
        self.release();

        flushed
    }

    fn release(&mut self) {
        if self.released {
            return;
        }

        self.flush.cleanup();
        self.released = true;
    }
}

impl Deref for BatchGuard {
    type Target = FlushContext;

    fn deref(&self) -> &Self::Target {
        &self.flush
    }
}

impl DerefMut for BatchGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.flush
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        self.release();
    }
}
