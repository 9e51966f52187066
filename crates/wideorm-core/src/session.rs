//! Entry point tying the registry, the consistency policy, the executor
//! and the codec together.

use crate::{
    consistency::{ConsistencyPair, ConsistencyPolicy},
    context::{BatchGuard, FlushContext, PersistenceContext, SliceRange},
    error::{Error, StateError},
    interface::{JsonCodec, StorageExecutor, ValueCodec},
    model::{entity::EntityMetadata, registry::MetadataRegistry},
    proxy::EntityProxy,
    traits::EntityKind,
    value::Value,
};
use std::sync::Arc;

///
/// Managed
///
/// An entity handed to a dynamic entry point, either as a plain value or
/// already wrapped by a proxy.
///

#[derive(Debug)]
pub enum Managed<E> {
    Plain(E),
    Proxied(EntityProxy<E>),
}

///
/// Session
///
/// Cheap to clone; every operation runs in its own immediate persistence
/// context unless it goes through a [`Batch`].
///

#[derive(Clone)]
pub struct Session {
    registry: Arc<MetadataRegistry>,
    policy: Arc<ConsistencyPolicy>,
    executor: Arc<dyn StorageExecutor>,
    codec: Arc<dyn ValueCodec>,
    call_override: ConsistencyPair,
}

impl Session {
    #[must_use]
    pub fn new(
        registry: MetadataRegistry,
        policy: ConsistencyPolicy,
        executor: Arc<dyn StorageExecutor>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            policy: Arc::new(policy),
            executor,
            codec: Arc::new(JsonCodec::new()),
            call_override: ConsistencyPair::empty(),
        }
    }

    #[must_use]
    pub fn with_codec(mut self, codec: Arc<dyn ValueCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Copy of this session whose operations carry a per-call override.
    #[must_use]
    pub fn with_override(&self, call_override: ConsistencyPair) -> Self {
        Self {
            call_override,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn registry(&self) -> &MetadataRegistry {
        &self.registry
    }

    #[must_use]
    pub fn policy(&self) -> &ConsistencyPolicy {
        &self.policy
    }

    pub fn meta<E: EntityKind>(&self) -> Result<Arc<EntityMetadata>, StateError> {
        self.registry.of::<E>().cloned()
    }

    pub fn persist<E: EntityKind>(&self, entity: E) -> Result<EntityProxy<E>, Error> {
        let meta = self.meta::<E>()?;
        self.run(|ctx| ctx.persist(&meta, entity))
    }

    pub fn find<E: EntityKind>(&self, key: &[Value]) -> Result<Option<EntityProxy<E>>, Error> {
        let meta = self.meta::<E>()?;
        self.run(|ctx| ctx.find(&meta, key))
    }

    pub fn update<E: EntityKind>(&self, proxy: &mut EntityProxy<E>) -> Result<usize, Error> {
        ensure_kind(proxy)?;
        self.run(|ctx| ctx.update(proxy))
    }

    pub fn remove<E: EntityKind>(&self, proxy: &EntityProxy<E>) -> Result<(), Error> {
        ensure_kind(proxy)?;
        let key = proxy.key_values()?;
        self.remove_by_key::<E>(&key)
    }

    pub fn remove_by_key<E: EntityKind>(&self, key: &[Value]) -> Result<(), Error> {
        let meta = self.meta::<E>()?;
        self.run(|ctx| ctx.remove(&meta, key))
    }

    pub fn refresh<E: EntityKind>(&self, proxy: &mut EntityProxy<E>) -> Result<(), Error> {
        ensure_kind(proxy)?;
        self.run(|ctx| ctx.refresh(proxy))
    }

    pub fn slice<E: EntityKind>(&self, range: &SliceRange) -> Result<Vec<EntityProxy<E>>, Error> {
        let meta = self.meta::<E>()?;
        self.run(|ctx| ctx.slice(&meta, range))
    }

    /// Insert a plain entity or write back a proxied one.
    pub fn merge<E: EntityKind>(&self, entity: Managed<E>) -> Result<EntityProxy<E>, Error> {
        match entity {
            Managed::Plain(entity) => self.persist(entity),
            Managed::Proxied(mut proxy) => {
                self.update(&mut proxy)?;
                Ok(proxy)
            }
        }
    }

    /// `persist` for callers that may hold either form; a proxy is refused.
    pub fn persist_managed<E: EntityKind>(&self, entity: Managed<E>) -> Result<EntityProxy<E>, Error> {
        match entity {
            Managed::Plain(entity) => self.persist(entity),
            Managed::Proxied(proxy) => Err(StateError::AlreadyManaged {
                entity: proxy.meta().name().to_string(),
            }
            .into()),
        }
    }

    /// `refresh` for callers that may hold either form; a plain entity is
    /// refused.
    pub fn refresh_managed<E: EntityKind>(&self, entity: Managed<E>) -> Result<EntityProxy<E>, Error> {
        match entity {
            Managed::Plain(_) => Err(StateError::NotManaged {
                entity: E::ENTITY.to_string(),
            }
            .into()),
            Managed::Proxied(mut proxy) => {
                self.refresh(&mut proxy)?;
                Ok(proxy)
            }
        }
    }

    /// Open a batch; `pinned` levels hold for every statement in it.
    #[must_use]
    pub fn batch(&self, pinned: ConsistencyPair) -> Batch {
        Batch {
            session: self.clone(),
            guard: BatchGuard::new(self.executor.clone(), pinned),
        }
    }

    fn run<T>(
        &self,
        op: impl FnOnce(&mut PersistenceContext<'_>) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut flush = FlushContext::immediate(self.executor.clone());
        let mut ctx = PersistenceContext::new(&self.policy, self.codec.as_ref(), &mut flush)
            .with_override(self.call_override);

        let result = op(&mut ctx);
        let closed = ctx.close();
        let value = result?;
        closed?;

        Ok(value)
    }
}

///
/// Batch
///
/// Writes issued through a batch are buffered and sent as one unit by
/// `end`. Dropping a batch without ending it discards the buffer, and so
/// does any failed operation inside it. Proxies updated through a
/// discarded batch get their edits back.
///

pub struct Batch {
    session: Session,
    guard: BatchGuard,
}

impl Batch {
    /// Per-call override for later operations; pinned levels still win.
    #[must_use]
    pub fn with_override(mut self, call_override: ConsistencyPair) -> Self {
        self.session.call_override = call_override;
        self
    }

    /// Statements buffered so far.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.guard.pending().len()
    }

    pub fn persist<E: EntityKind>(&mut self, entity: E) -> Result<EntityProxy<E>, Error> {
        let meta = self.session.meta::<E>()?;
        self.run(|ctx| ctx.persist(&meta, entity))
    }

    pub fn find<E: EntityKind>(&mut self, key: &[Value]) -> Result<Option<EntityProxy<E>>, Error> {
        let meta = self.session.meta::<E>()?;
        self.run(|ctx| ctx.find(&meta, key))
    }

    pub fn update<E: EntityKind>(&mut self, proxy: &mut EntityProxy<E>) -> Result<usize, Error> {
        ensure_kind(proxy)?;
        self.run(|ctx| ctx.update(proxy))
    }

    pub fn remove<E: EntityKind>(&mut self, proxy: &EntityProxy<E>) -> Result<(), Error> {
        ensure_kind(proxy)?;
        let meta = self.session.meta::<E>()?;
        let key = proxy.key_values()?;
        self.run(|ctx| ctx.remove(&meta, &key))
    }

    pub fn refresh<E: EntityKind>(&mut self, proxy: &mut EntityProxy<E>) -> Result<(), Error> {
        ensure_kind(proxy)?;
        self.run(|ctx| ctx.refresh(proxy))
    }

    /// Always refused: wide-row reads do not run inside a batch.
    pub fn slice<E: EntityKind>(&mut self, range: &SliceRange) -> Result<Vec<EntityProxy<E>>, Error> {
        let meta = self.session.meta::<E>()?;
        self.run(|ctx| ctx.slice(&meta, range))
    }

    /// Send everything buffered and close the batch.
    pub fn end(self) -> Result<usize, Error> {
        Ok(self.guard.finish()?)
    }

    fn run<T>(
        &mut self,
        op: impl FnOnce(&mut PersistenceContext<'_>) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let session = &self.session;
        let mut ctx = PersistenceContext::new(&session.policy, session.codec.as_ref(), &mut self.guard)
            .with_override(session.call_override);

        op(&mut ctx)
    }
}

fn ensure_kind<E: EntityKind>(proxy: &EntityProxy<E>) -> Result<(), StateError> {
    let actual = proxy.meta().name();
    if actual != E::ENTITY {
        return Err(StateError::EntityMismatch {
            expected: E::ENTITY.to_string(),
            actual: actual.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        consistency::ConsistencyLevel,
        context::StatementKind,
        proxy::TrackingMode,
        test_support::{RecordingExecutor, Tweet, User, row_of, session},
    };
    use uuid::Uuid;

    fn user_key(id: i64) -> crate::interface::Row {
        row_of(&[("id", Value::BigInt(id))])
    }

    #[test]
    fn persist_then_find_round_trips() {
        let executor = RecordingExecutor::new();
        let session = session(executor.clone());

        let mut user = User::new(1, "ada");
        user.roles.insert("admin".to_string());
        session.persist(user).unwrap();

        let found = session.find::<User>(&[Value::BigInt(1)]).unwrap().unwrap();
        assert_eq!(found.target().name.as_deref(), Some("ada"));
        assert!(found.target().roles.contains("admin"));
        assert!(session.find::<User>(&[Value::BigInt(2)]).unwrap().is_none());
    }

    #[test]
    fn update_and_remove_go_through_the_proxy() {
        let executor = RecordingExecutor::new();
        let session = session(executor.clone());

        let mut proxy = session.persist(User::new(1, "ada")).unwrap();
        proxy.set("name", "bob".to_string()).unwrap();
        assert_eq!(session.update(&mut proxy).unwrap(), 1);
        assert_eq!(
            executor.row("users", &user_key(1)).unwrap().get("name"),
            Some(&Value::Text("bob".to_string()))
        );

        session.remove(&proxy).unwrap();
        assert!(executor.row("users", &user_key(1)).is_none());
        session.remove_by_key::<User>(&[Value::BigInt(1)]).unwrap();
    }

    #[test]
    fn merge_dispatches_on_the_managed_form() {
        let executor = RecordingExecutor::new();
        let session = session(executor.clone());

        let mut proxy = session.merge(Managed::Plain(User::new(1, "ada"))).unwrap();
        assert!(matches!(executor.writes()[0].kind, StatementKind::Insert { .. }));

        executor.clear_log();
        proxy.set("name", "bob".to_string()).unwrap();
        let proxy = session.merge(Managed::Proxied(proxy)).unwrap();

        assert!(!proxy.is_dirty());
        assert!(matches!(executor.writes()[0].kind, StatementKind::Assign { .. }));
    }

    #[test]
    fn managed_entry_points_check_the_form() {
        let executor = RecordingExecutor::new();
        let session = session(executor.clone());
        let proxy = session.persist(User::new(1, "ada")).unwrap();
        executor.clear_log();

        let err = session.persist_managed(Managed::Proxied(proxy)).unwrap_err();
        assert!(matches!(err, Error::State(StateError::AlreadyManaged { .. })));

        let err = session
            .refresh_managed(Managed::Plain(User::new(1, "ada")))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::State(StateError::NotManaged { ref entity }) if entity == "User"
        ));
        assert!(executor.statements().is_empty());
    }

    #[test]
    fn proxies_of_another_entity_are_refused() {
        let executor = RecordingExecutor::new();
        let session = session(executor.clone());
        let meta = session.meta::<Tweet>().unwrap();
        let mut proxy = EntityProxy::wrap(User::new(1, "ada"), meta, TrackingMode::Update);

        let err = session.update(&mut proxy).unwrap_err();

        assert!(matches!(
            err,
            Error::State(StateError::EntityMismatch { ref actual, .. }) if actual == "Tweet"
        ));
        assert!(executor.statements().is_empty());
    }

    #[test]
    fn per_call_override_applies_to_one_session_copy() {
        let executor = RecordingExecutor::new();
        let session = session(executor.clone());

        session
            .with_override(ConsistencyPair::read(ConsistencyLevel::LocalQuorum))
            .find::<User>(&[Value::BigInt(1)])
            .unwrap();
        session.find::<User>(&[Value::BigInt(1)]).unwrap();

        let levels: Vec<_> = executor
            .statements()
            .into_iter()
            .map(|s| s.consistency)
            .collect();
        assert_eq!(levels, [ConsistencyLevel::LocalQuorum, ConsistencyLevel::One]);
    }

    #[test]
    fn batch_pins_levels_and_ends_with_one_dispatch() {
        let executor = RecordingExecutor::new();
        let session = session(executor.clone());

        let mut batch = session
            .batch(ConsistencyPair::write(ConsistencyLevel::EachQuorum))
            .with_override(ConsistencyPair::write(ConsistencyLevel::One));
        batch.persist(User::new(1, "ada")).unwrap();
        let mut second = batch.persist(User::new(2, "lin")).unwrap();
        second.counter("visits").unwrap().incr();
        batch.update(&mut second).unwrap();
        assert_eq!(batch.pending(), 3);
        assert!(executor.statements().is_empty());

        assert_eq!(batch.end().unwrap(), 3);
        assert_eq!(executor.batch_sizes(), [3]);
        assert!(
            executor
                .statements()
                .iter()
                .all(|s| s.consistency == ConsistencyLevel::EachQuorum)
        );
    }

    #[test]
    fn dropped_batch_writes_nothing() {
        let executor = RecordingExecutor::new();
        let session = session(executor.clone());

        {
            let mut batch = session.batch(ConsistencyPair::empty());
            batch.persist(User::new(1, "ada")).unwrap();
        }

        assert!(executor.statements().is_empty());
        assert!(executor.row("users", &user_key(1)).is_none());
    }

    #[test]
    fn edits_survive_a_batch_that_never_ends() {
        let executor = RecordingExecutor::new();
        let session = session(executor.clone());
        let mut proxy = session.persist(User::new(1, "ada")).unwrap();

        proxy.set("name", "bob".to_string()).unwrap();
        {
            let mut batch = session.batch(ConsistencyPair::empty());
            assert_eq!(batch.update(&mut proxy).unwrap(), 1);
        }
        assert!(proxy.is_dirty());

        assert_eq!(session.update(&mut proxy).unwrap(), 1);
        let found = session.find::<User>(&[Value::BigInt(1)]).unwrap().unwrap();
        assert_eq!(found.target().name.as_deref(), Some("bob"));
        assert!(!proxy.is_dirty());
    }

    #[test]
    fn batch_refuses_slices() {
        let executor = RecordingExecutor::new();
        let session = session(executor.clone());
        let mut batch = session.batch(ConsistencyPair::empty());
        batch.persist(User::new(1, "ada")).unwrap();

        let range = SliceRange::partition(vec![Value::Uuid(Uuid::from_u128(7))]);
        let err = batch.slice::<Tweet>(&range).unwrap_err();

        assert!(matches!(
            err,
            Error::State(StateError::BatchPending { operation: "slice" })
        ));
        assert_eq!(batch.pending(), 1);
        assert_eq!(batch.end().unwrap(), 1);
    }

    #[test]
    fn refresh_picks_up_external_changes() {
        let executor = RecordingExecutor::new();
        let session = session(executor.clone());
        let mut proxy = session.persist(User::new(1, "ada")).unwrap();

        executor.seed("users", user_key(1), row_of(&[("name", Value::Text("eve".to_string()))]));
        session.refresh(&mut proxy).unwrap();
        assert_eq!(proxy.target().name.as_deref(), Some("eve"));

        let proxy = session.refresh_managed(Managed::Proxied(proxy)).unwrap();
        assert_eq!(proxy.target().name.as_deref(), Some("eve"));
    }
}
