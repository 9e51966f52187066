use crate::{
    model::property::PropertyMetadata,
    obs::sink::{self, MetricsEvent},
    proxy::{
        TrackingMode,
        change::{Change, ChangeSet},
    },
};
use std::{collections::BTreeMap, sync::Arc};

///
/// DirtyChecker
///
/// Accumulated edits of one property touched this session. An overwrite
/// means the whole column is re-assigned from the target at flush time,
/// so it subsumes any element-level change recorded before or after.
///

#[derive(Clone, Debug)]
pub struct DirtyChecker {
    property: Arc<PropertyMetadata>,
    changes: Vec<Change>,
    overwrite: bool,
}

impl DirtyChecker {
    #[must_use]
    pub const fn new(property: Arc<PropertyMetadata>) -> Self {
        Self {
            property,
            changes: Vec::new(),
            overwrite: false,
        }
    }

    #[must_use]
    pub const fn property(&self) -> &Arc<PropertyMetadata> {
        &self.property
    }

    #[must_use]
    pub const fn is_overwrite(&self) -> bool {
        self.overwrite
    }

    #[must_use]
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Record one edit, coalescing with the previous one when possible.
    pub fn push(&mut self, change: Change) {
        if self.overwrite {
            return;
        }

        let leftover = match self.changes.last_mut() {
            Some(last) => last.absorb(change),
            None => Some(change),
        };
        if let Some(change) = leftover {
            self.changes.push(change);
        }
    }

    pub fn mark_overwrite(&mut self) {
        self.overwrite = true;
        self.changes.clear();
    }

    /// Replay `later` on top of this checker, as if its edits had been
    /// recorded here afterwards.
    #[must_use]
    pub fn then(mut self, later: Self) -> Self {
        if later.overwrite {
            return later;
        }
        for change in later.changes {
            self.push(change);
        }

        self
    }

    /// Change-sets in recording order.
    #[must_use]
    pub fn change_sets(&self) -> Vec<ChangeSet> {
        self.changes
            .iter()
            .map(|change| ChangeSet::new(self.property.clone(), change.clone()))
            .collect()
    }
}

///
/// DirtyTable
/// Property name → checker, one per property actually touched.
///

pub type DirtyTable = BTreeMap<String, DirtyChecker>;

/// Put `earlier` edits back in front of `live`, property by property.
pub(crate) fn restore(earlier: DirtyTable, live: &mut DirtyTable) {
    for (name, checker) in earlier {
        let merged = match live.remove(&name) {
            Some(later) => checker.then(later),
            None => checker,
        };
        live.insert(name, merged);
    }
}

///
/// Tracker
///
/// Write side of the dirty table for one property, handed to the tracked
/// collections. The checker is created on the first recorded change, so
/// untouched or no-op-only properties never appear in the table.
///

pub struct Tracker<'a> {
    dirty: &'a mut DirtyTable,
    property: Arc<PropertyMetadata>,
    mode: TrackingMode,
}

impl<'a> Tracker<'a> {
    #[must_use]
    pub const fn new(
        dirty: &'a mut DirtyTable,
        property: Arc<PropertyMetadata>,
        mode: TrackingMode,
    ) -> Self {
        Self {
            dirty,
            property,
            mode,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> TrackingMode {
        self.mode
    }

    #[must_use]
    pub fn property(&self) -> &str {
        self.property.name()
    }

    pub(crate) fn record(&mut self, change: Change) {
        tracing::trace!(
            entity = %self.property.entity(),
            property = %self.property.name(),
            change = %change.change_type(),
            "change recorded"
        );
        sink::record(MetricsEvent::ChangeRecorded {
            entity: self.property.entity(),
            change: change.change_type(),
        });

        self.checker().push(change);
    }

    pub(crate) fn overwrite(&mut self) {
        tracing::trace!(
            entity = %self.property.entity(),
            property = %self.property.name(),
            "column overwrite recorded"
        );

        self.checker().mark_overwrite();
    }

    fn checker(&mut self) -> &mut DirtyChecker {
        self.dirty
            .entry(self.property.name().to_string())
            .or_insert_with(|| DirtyChecker::new(self.property.clone()))
    }
}
