use crate::{
    consistency::ConsistencyPair,
    model::{entity::EntityMetadata, key::CompoundKeyProperties},
    value::ValueKind,
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    sync::{Arc, OnceLock, Weak},
};

///
/// PropertyKind
///
/// Closed set of property shapes. Laziness, proxy wrapping and counter
/// semantics all derive from the kind.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[remain::sorted]
pub enum PropertyKind {
    Counter,
    CounterWideMap,
    EmbeddedId,
    JoinList,
    JoinMap,
    JoinSet,
    JoinSimple,
    JoinWideMap,
    List,
    Map,
    Set,
    Simple,
    WideMap,
}

impl PropertyKind {
    /// Lazy properties are not copied from the row when a proxy is built.
    #[must_use]
    pub const fn is_lazy(self) -> bool {
        matches!(
            self,
            Self::Counter
                | Self::CounterWideMap
                | Self::WideMap
                | Self::JoinSimple
                | Self::JoinList
                | Self::JoinSet
                | Self::JoinMap
                | Self::JoinWideMap
        )
    }

    /// Kinds served by a dedicated wrapper rather than a loaded value.
    #[must_use]
    pub const fn is_proxy_type(self) -> bool {
        matches!(
            self,
            Self::Counter | Self::CounterWideMap | Self::WideMap | Self::JoinWideMap
        )
    }

    #[must_use]
    pub const fn is_counter(self) -> bool {
        matches!(self, Self::Counter | Self::CounterWideMap)
    }

    #[must_use]
    pub const fn is_join(self) -> bool {
        matches!(
            self,
            Self::JoinSimple | Self::JoinList | Self::JoinSet | Self::JoinMap | Self::JoinWideMap
        )
    }

    #[must_use]
    pub const fn is_wide_map(self) -> bool {
        matches!(
            self,
            Self::WideMap | Self::CounterWideMap | Self::JoinWideMap
        )
    }

    /// Kinds that need a declared key class.
    #[must_use]
    pub const fn is_map_like(self) -> bool {
        matches!(self, Self::Map | Self::JoinMap) || self.is_wide_map()
    }

    /// Tracked-collection shape, for kinds edited through decorators.
    #[must_use]
    pub const fn collection(self) -> Option<CollectionKind> {
        match self {
            Self::List | Self::JoinList => Some(CollectionKind::List),
            Self::Set | Self::JoinSet => Some(CollectionKind::Set),
            Self::Map | Self::JoinMap => Some(CollectionKind::Map),
            _ => None,
        }
    }

    /// Eager, non-counter kinds are copied between rows and targets.
    #[must_use]
    pub const fn is_eager_value(self) -> bool {
        !self.is_lazy() && !matches!(self, Self::EmbeddedId)
    }
}

///
/// CollectionKind
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum CollectionKind {
    #[display("list")]
    List,
    #[display("set")]
    Set,
    #[display("map")]
    Map,
}

///
/// CascadeType
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum CascadeType {
    All,
    Merge,
    Persist,
    Refresh,
    Remove,
}

///
/// JoinProperties
///
/// Cascade set and a weak back-reference to the joined entity. The
/// reference is resolved in the registry's second bootstrap pass, so
/// cyclic join graphs are fine.
///

#[derive(Clone, Debug)]
pub struct JoinProperties {
    target: String,
    cascades: BTreeSet<CascadeType>,
    entity: OnceLock<Weak<EntityMetadata>>,
}

impl JoinProperties {
    pub(crate) fn new(target: String, cascades: BTreeSet<CascadeType>) -> Self {
        Self {
            target,
            cascades,
            entity: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub const fn cascades(&self) -> &BTreeSet<CascadeType> {
        &self.cascades
    }

    #[must_use]
    pub fn cascades_on(&self, cascade: CascadeType) -> bool {
        self.cascades.contains(&cascade)
    }

    /// Joined entity metadata, once linked and still alive.
    #[must_use]
    pub fn entity(&self) -> Option<Arc<EntityMetadata>> {
        self.entity.get().and_then(Weak::upgrade)
    }

    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.entity.get().is_some()
    }

    pub(crate) fn link(&self, entity: &Arc<EntityMetadata>) {
        // first link wins; bootstrap links each join exactly once
        let _ = self.entity.set(Arc::downgrade(entity));
    }
}

///
/// PropertyMetadata
///

#[derive(Clone, Debug)]
pub struct PropertyMetadata {
    pub(crate) entity: String,
    pub(crate) name: String,
    pub(crate) kind: PropertyKind,
    pub(crate) key_kind: Option<ValueKind>,
    pub(crate) value_kind: ValueKind,
    pub(crate) consistency: ConsistencyPair,
    pub(crate) join: Option<JoinProperties>,
    pub(crate) compound_key: Option<CompoundKeyProperties>,
}

impl PropertyMetadata {
    /// Label of the owning entity.
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> PropertyKind {
        self.kind
    }

    #[must_use]
    pub const fn key_kind(&self) -> Option<&ValueKind> {
        self.key_kind.as_ref()
    }

    #[must_use]
    pub const fn value_kind(&self) -> &ValueKind {
        &self.value_kind
    }

    #[must_use]
    pub const fn consistency(&self) -> ConsistencyPair {
        self.consistency
    }

    #[must_use]
    pub const fn join(&self) -> Option<&JoinProperties> {
        self.join.as_ref()
    }

    #[must_use]
    pub const fn compound_key(&self) -> Option<&CompoundKeyProperties> {
        self.compound_key.as_ref()
    }

    #[must_use]
    pub const fn is_lazy(&self) -> bool {
        self.kind.is_lazy()
    }

    #[must_use]
    pub const fn is_counter(&self) -> bool {
        self.kind.is_counter()
    }

    /// Whether values of this property go through the value codec.
    #[must_use]
    pub const fn needs_codec(&self) -> bool {
        self.value_kind.is_custom()
    }
}
