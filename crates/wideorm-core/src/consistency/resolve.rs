use crate::{
    consistency::{
        AccessKind, ConsistencyError, ConsistencyLevel, ConsistencyPair, ConsistencyPolicy,
    },
    model::{entity::EntityMetadata, property::PropertyMetadata},
};

///
/// ConsistencyTarget
/// What an operation reads or writes: a whole entity or one property of it.
///

#[derive(Clone, Copy, Debug)]
pub enum ConsistencyTarget<'a> {
    Entity(&'a EntityMetadata),
    Property {
        entity: &'a EntityMetadata,
        property: &'a PropertyMetadata,
    },
}

impl<'a> ConsistencyTarget<'a> {
    #[must_use]
    pub const fn entity(&self) -> &'a EntityMetadata {
        match self {
            Self::Entity(entity) | Self::Property { entity, .. } => entity,
        }
    }

    #[must_use]
    pub const fn property(&self) -> Option<&'a PropertyMetadata> {
        match self {
            Self::Entity(_) => None,
            Self::Property { property, .. } => Some(property),
        }
    }

    /// Counter operations may never resolve to `ANY`.
    #[must_use]
    pub const fn is_counter(&self) -> bool {
        match self {
            Self::Entity(entity) => entity.is_clustered_counter(),
            Self::Property { property, .. } => property.kind().is_counter(),
        }
    }

    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Entity(entity) => entity.name().to_string(),
            Self::Property { entity, property } => format!("{}.{}", entity.name(), property.name()),
        }
    }
}

///
/// ResolutionContext
///
/// Call-scoped layers that sit above declared metadata: a per-call
/// override and the level pinned by an enclosing batch.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ResolutionContext {
    pub call_override: ConsistencyPair,
    pub pinned: ConsistencyPair,
}

impl ResolutionContext {
    #[must_use]
    pub const fn new(call_override: ConsistencyPair, pinned: ConsistencyPair) -> Self {
        Self {
            call_override,
            pinned,
        }
    }
}

/// Resolve the effective level for one access.
///
/// First present of: per-call override, batch-pinned level, property
/// declaration, entity/table policy entry, entity declaration, global
/// default.
pub fn resolve(
    policy: &ConsistencyPolicy,
    target: ConsistencyTarget<'_>,
    ctx: &ResolutionContext,
    kind: AccessKind,
) -> Result<ConsistencyLevel, ConsistencyError> {
    let entity = target.entity();

    let level = ctx
        .call_override
        .get(kind)
        .or_else(|| ctx.pinned.get(kind))
        .or_else(|| target.property().and_then(|p| p.consistency().get(kind)))
        .or_else(|| policy.table_level(entity.table(), kind))
        .or_else(|| entity.consistency().get(kind))
        .unwrap_or_else(|| policy.default_level(kind));

    if level == ConsistencyLevel::Any && target.is_counter() {
        return Err(ConsistencyError::AnyForCounter {
            target: target.label(),
            access: kind,
        });
    }

    tracing::trace!(subject = %target.label(), access = %kind, %level, "consistency resolved");

    Ok(level)
}

pub fn resolve_read(
    policy: &ConsistencyPolicy,
    target: ConsistencyTarget<'_>,
    ctx: &ResolutionContext,
) -> Result<ConsistencyLevel, ConsistencyError> {
    resolve(policy, target, ctx, AccessKind::Read)
}

pub fn resolve_write(
    policy: &ConsistencyPolicy,
    target: ConsistencyTarget<'_>,
    ctx: &ResolutionContext,
) -> Result<ConsistencyLevel, ConsistencyError> {
    resolve(policy, target, ctx, AccessKind::Write)
}
