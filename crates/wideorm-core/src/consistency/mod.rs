//! Consistency levels, the per-table policy, and the layered resolver.

mod policy;
mod resolve;

#[cfg(test)]
mod tests;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error as ThisError;

// re-exports
pub use policy::ConsistencyPolicy;
pub use resolve::{ConsistencyTarget, ResolutionContext, resolve, resolve_read, resolve_write};

///
/// ConsistencyLevel
///
/// Replica acknowledgement requirement for one read or write.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsistencyLevel {
    Any,
    One,
    Two,
    Three,
    Quorum,
    LocalQuorum,
    EachQuorum,
    All,
    LocalOne,
    Serial,
    LocalSerial,
}

impl ConsistencyLevel {
    pub const ALL_LEVELS: [Self; 11] = [
        Self::Any,
        Self::One,
        Self::Two,
        Self::Three,
        Self::Quorum,
        Self::LocalQuorum,
        Self::EachQuorum,
        Self::All,
        Self::LocalOne,
        Self::Serial,
        Self::LocalSerial,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Any => "ANY",
            Self::One => "ONE",
            Self::Two => "TWO",
            Self::Three => "THREE",
            Self::Quorum => "QUORUM",
            Self::LocalQuorum => "LOCAL_QUORUM",
            Self::EachQuorum => "EACH_QUORUM",
            Self::All => "ALL",
            Self::LocalOne => "LOCAL_ONE",
            Self::Serial => "SERIAL",
            Self::LocalSerial => "LOCAL_SERIAL",
        }
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsistencyLevel {
    type Err = ConsistencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();

        Self::ALL_LEVELS
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConsistencyError::UnknownLevel {
                value: s.to_string(),
            })
    }
}

///
/// AccessKind
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum AccessKind {
    #[display("read")]
    Read,
    #[display("write")]
    Write,
}

///
/// ConsistencyPair
///
/// Optional read and write levels declared (or overridden) at one layer.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ConsistencyPair {
    pub read: Option<ConsistencyLevel>,
    pub write: Option<ConsistencyLevel>,
}

impl ConsistencyPair {
    #[must_use]
    pub const fn new(read: Option<ConsistencyLevel>, write: Option<ConsistencyLevel>) -> Self {
        Self { read, write }
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self::new(None, None)
    }

    #[must_use]
    pub const fn read(level: ConsistencyLevel) -> Self {
        Self::new(Some(level), None)
    }

    #[must_use]
    pub const fn write(level: ConsistencyLevel) -> Self {
        Self::new(None, Some(level))
    }

    #[must_use]
    pub const fn both(level: ConsistencyLevel) -> Self {
        Self::new(Some(level), Some(level))
    }

    #[must_use]
    pub const fn get(&self, kind: AccessKind) -> Option<ConsistencyLevel> {
        match kind {
            AccessKind::Read => self.read,
            AccessKind::Write => self.write,
        }
    }

    pub const fn set(&mut self, kind: AccessKind, level: Option<ConsistencyLevel>) {
        match kind {
            AccessKind::Read => self.read = level,
            AccessKind::Write => self.write = level,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.read.is_none() && self.write.is_none()
    }
}

///
/// ConsistencyError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ConsistencyError {
    #[error(
        "consistency level 'ANY' is not allowed for counter {access} on '{target}'; counter writes are not idempotent"
    )]
    AnyForCounter { target: String, access: AccessKind },

    #[error("unknown consistency level '{value}'")]
    UnknownLevel { value: String },
}
