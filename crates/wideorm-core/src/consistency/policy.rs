use crate::{
    consistency::{AccessKind, ConsistencyLevel, ConsistencyPair},
    model::registry::MetadataRegistry,
};
use std::collections::BTreeMap;

///
/// ConsistencyPolicy
///
/// Table name → (read, write) levels with a global default pair.
/// Populated once at bootstrap, then shared read-only through every
/// persistence context.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConsistencyPolicy {
    default_read: ConsistencyLevel,
    default_write: ConsistencyLevel,
    tables: BTreeMap<String, ConsistencyPair>,
}

impl ConsistencyPolicy {
    #[must_use]
    pub const fn new(default_read: ConsistencyLevel, default_write: ConsistencyLevel) -> Self {
        Self {
            default_read,
            default_write,
            tables: BTreeMap::new(),
        }
    }

    /// Seed a policy from every entity's declared levels.
    #[must_use]
    pub fn from_registry(
        registry: &MetadataRegistry,
        default_read: ConsistencyLevel,
        default_write: ConsistencyLevel,
    ) -> Self {
        let mut policy = Self::new(default_read, default_write);

        for entity in registry.entities() {
            let declared = entity.consistency();
            for kind in [AccessKind::Read, AccessKind::Write] {
                if let Some(level) = declared.get(kind) {
                    policy.set_level(entity.table(), kind, level);
                }
            }
        }

        policy
    }

    pub fn set_level(&mut self, table: &str, kind: AccessKind, level: ConsistencyLevel) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .set(kind, Some(level));
    }

    /// Effective level for a table, falling back to the global default.
    #[must_use]
    pub fn level(&self, table: &str, kind: AccessKind) -> ConsistencyLevel {
        self.table_level(table, kind)
            .unwrap_or_else(|| self.default_level(kind))
    }

    /// Explicit entry for a table, if one was set.
    #[must_use]
    pub fn table_level(&self, table: &str, kind: AccessKind) -> Option<ConsistencyLevel> {
        self.tables.get(table).and_then(|pair| pair.get(kind))
    }

    #[must_use]
    pub const fn default_level(&self, kind: AccessKind) -> ConsistencyLevel {
        match kind {
            AccessKind::Read => self.default_read,
            AccessKind::Write => self.default_write,
        }
    }

    pub const fn set_default(&mut self, kind: AccessKind, level: ConsistencyLevel) {
        match kind {
            AccessKind::Read => self.default_read = level,
            AccessKind::Write => self.default_write = level,
        }
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &ConsistencyPair)> {
        self.tables.iter().map(|(name, pair)| (name.as_str(), pair))
    }
}

impl Default for ConsistencyPolicy {
    fn default() -> Self {
        Self::new(ConsistencyLevel::One, ConsistencyLevel::One)
    }
}
