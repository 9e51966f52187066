use crate::{
    consistency::{
        AccessKind, ConsistencyPair, ConsistencyPolicy, ConsistencyTarget, ResolutionContext,
        resolve_read, resolve_write,
    },
    context::{FlushContext, Statement, StatementKind},
    error::{Error, StaleStateError, StateError},
    interface::{CodecError, PropertyRef, Row, ValueCodec, decode_column, encode_deep},
    model::{entity::EntityMetadata, key::IdMetadata, property::PropertyMetadata},
    obs::sink::{OpKind, Span},
    proxy::{EntityProxy, TrackingMode},
    traits::Entity,
    value::{Value, ValueKind},
};
use derive_more::Display;
use std::sync::Arc;

///
/// ContextState
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ContextState {
    #[display("open")]
    Open,
    #[display("flushed")]
    Flushed,
    #[display("closed")]
    Closed,
}

///
/// SliceRange
///
/// Wide-row read inside one partition. Clustering bounds are prefixes of
/// the clustering key; an empty bound is open.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SliceRange {
    pub partition: Vec<Value>,
    pub from: Vec<Value>,
    pub to: Vec<Value>,
    pub limit: Option<usize>,
}

impl SliceRange {
    #[must_use]
    pub fn partition(partition: Vec<Value>) -> Self {
        Self {
            partition,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn from(mut self, from: Vec<Value>) -> Self {
        self.from = from;
        self
    }

    #[must_use]
    pub fn to(mut self, to: Vec<Value>) -> Self {
        self.to = to;
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

///
/// PersistenceContext
///
/// One unit of work over a flush context. Open until `close`; a failed
/// operation releases the flush context before the error is returned.
///

pub struct PersistenceContext<'a> {
    policy: &'a ConsistencyPolicy,
    codec: &'a dyn ValueCodec,
    flush: &'a mut FlushContext,
    call_override: ConsistencyPair,
    state: ContextState,
}

impl<'a> PersistenceContext<'a> {
    #[must_use]
    pub fn new(
        policy: &'a ConsistencyPolicy,
        codec: &'a dyn ValueCodec,
        flush: &'a mut FlushContext,
    ) -> Self {
        Self {
            policy,
            codec,
            flush,
            call_override: ConsistencyPair::empty(),
            state: ContextState::Open,
        }
    }

    /// Per-call levels for the operations run through this context.
    ///
    /// A level pinned by the flush context wins; the override is dropped
    /// for that access kind.
    #[must_use]
    pub fn with_override(mut self, call_override: ConsistencyPair) -> Self {
        self.set_override(call_override);
        self
    }

    pub fn set_override(&mut self, call_override: ConsistencyPair) {
        let pinned = self.flush.pinned();
        let mut effective = call_override;

        for kind in [AccessKind::Read, AccessKind::Write] {
            if let (Some(pinned), Some(requested)) = (pinned.get(kind), call_override.get(kind)) {
                if pinned != requested {
                    tracing::debug!(
                        access = %kind,
                        %requested,
                        %pinned,
                        "per-call consistency ignored; batch level is pinned"
                    );
                }
                effective.set(kind, None);
            }
        }

        self.call_override = effective;
    }

    #[must_use]
    pub const fn state(&self) -> ContextState {
        self.state
    }

    #[must_use]
    pub fn flush_context(&self) -> &FlushContext {
        &*self.flush
    }

    /// Write a new entity and hand it back wrapped for update tracking.
    ///
    /// A clustered-counter entity has no regular columns: only its
    /// non-zero counters are written, as increments.
    pub fn persist<E: Entity>(
        &mut self,
        meta: &Arc<EntityMetadata>,
        entity: E,
    ) -> Result<EntityProxy<E>, Error> {
        self.guarded(|ctx| {
            let _span = Span::new(OpKind::Persist, meta.name());
            let proxy = EntityProxy::wrap(entity, meta.clone(), TrackingMode::Update);
            let key = ctx.bound_key(meta, &proxy.key_values()?)?;
            let resolution = ctx.resolution();

            if !meta.is_clustered_counter() {
                let level =
                    resolve_write(ctx.policy, ConsistencyTarget::Entity(meta), &resolution)?;

                let mut values = Row::new();
                for property in meta.properties().filter(|p| !p.kind().is_proxy_type()) {
                    if let Some(value) = proxy.target().get_value(property.name()) {
                        values.insert(property.name().to_string(), encode_deep(ctx.codec, &value)?);
                    }
                }

                let insert = StatementKind::Insert { values };
                ctx.flush
                    .push(Statement::new(meta.table(), key.clone(), insert, level))?;
            }

            for property in meta.counter_properties() {
                let initial = proxy.counters().value(property.name());
                if initial != 0 {
                    let statement = ctx.increment(meta, property, &key, initial, &resolution)?;
                    ctx.flush.push(statement)?;
                }
            }

            Ok(proxy)
        })
    }

    /// Point read by full primary key.
    pub fn find<E: Entity + Default>(
        &mut self,
        meta: &Arc<EntityMetadata>,
        key: &[Value],
    ) -> Result<Option<EntityProxy<E>>, Error> {
        self.guarded(|ctx| {
            let mut span = Span::new(OpKind::Find, meta.name());
            let row = ctx.select(meta, key)?;
            span.set_rows(u64::from(row.is_some()));

            let proxy = row
                .map(|row| EntityProxy::from_row(meta.clone(), &row))
                .transpose()?;

            Ok(proxy)
        })
    }

    /// Turn a proxy's dirty table and pending counter deltas into
    /// statements. Returns the number of statements produced.
    ///
    /// Dispatched edits are cleared right away. Buffered ones stay staged
    /// on the proxy until the batch is written or discarded.
    pub fn update<E: Entity>(&mut self, proxy: &mut EntityProxy<E>) -> Result<usize, Error> {
        self.guarded(|ctx| {
            proxy.settle();
            let meta = proxy.meta().clone();
            let entity: &EntityMetadata = &meta;
            let _span = Span::new(OpKind::Update, entity.name());

            let key = ctx.bound_key(entity, &proxy.key_values()?)?;
            let resolution = ctx.resolution();
            let mut statements = Vec::new();

            for checker in proxy.dirty().values() {
                let property: &PropertyMetadata = checker.property();
                let target = ConsistencyTarget::Property { entity, property };
                let level = resolve_write(ctx.policy, target, &resolution)?;

                if checker.is_overwrite() {
                    let value = proxy
                        .target()
                        .get_value(property.name())
                        .unwrap_or(Value::Null);
                    let values = Row::from([(
                        property.name().to_string(),
                        encode_deep(ctx.codec, &value)?,
                    )]);
                    let assign = StatementKind::Assign { values };
                    statements.push(Statement::new(entity.table(), key.clone(), assign, level));

                    continue;
                }

                for change in checker.changes() {
                    let change = change
                        .clone()
                        .try_map_values(|value| encode_deep(ctx.codec, &value))?;
                    let kind = StatementKind::Collection {
                        column: property.name().to_string(),
                        change,
                    };
                    statements.push(Statement::new(entity.table(), key.clone(), kind, level));
                }
            }

            for (name, delta) in proxy.counters().pending() {
                let property = entity
                    .property(name)
                    .ok_or_else(|| StateError::UnknownProperty {
                        entity: entity.name().to_string(),
                        property: name.to_string(),
                    })?;
                statements.push(ctx.increment(entity, property, &key, delta, &resolution)?);
            }

            let count = statements.len();
            for statement in statements {
                ctx.flush.push(statement)?;
            }

            match ctx.flush.ticket() {
                Some(ticket) if count > 0 => proxy.stage(ticket),
                Some(_) => proxy.clear_dirty(),
                None => {
                    proxy.clear_dirty();
                    proxy.counters_mut().commit();
                }
            }

            Ok(count)
        })
    }

    pub fn remove(&mut self, meta: &Arc<EntityMetadata>, key: &[Value]) -> Result<(), Error> {
        self.guarded(|ctx| {
            let _span = Span::new(OpKind::Remove, meta.name());
            let key = ctx.bound_key(meta, key)?;
            let level = resolve_write(
                ctx.policy,
                ConsistencyTarget::Entity(meta),
                &ctx.resolution(),
            )?;

            ctx.flush.push(Statement::new(
                meta.table(),
                key,
                StatementKind::Delete,
                level,
            ))?;

            Ok(())
        })
    }

    /// Reload a managed entity from the store, dropping pending edits.
    pub fn refresh<E: Entity + Default>(&mut self, proxy: &mut EntityProxy<E>) -> Result<(), Error> {
        self.guarded(|ctx| {
            let meta = proxy.meta().clone();
            let mut span = Span::new(OpKind::Refresh, meta.name());
            let key = proxy.key_values()?;

            let Some(row) = ctx.select(&meta, &key)? else {
                return Err(StaleStateError {
                    entity: meta.name().to_string(),
                    key: Value::List(key).to_string(),
                }
                .into());
            };
            span.set_rows(1);
            proxy.reload(&row)?;

            Ok(())
        })
    }

    /// Wide-row read of one partition.
    ///
    /// Refused inside a batch before any validation or I/O; the batch is
    /// left untouched.
    pub fn slice<E: Entity + Default>(
        &mut self,
        meta: &Arc<EntityMetadata>,
        range: &SliceRange,
    ) -> Result<Vec<EntityProxy<E>>, Error> {
        self.ensure_open()?;
        self.flush.ensure_no_pending_batch("slice")?;

        self.guarded(|ctx| {
            let mut span = Span::new(OpKind::Slice, meta.name());
            let id = meta.id();
            let (Some(partition), Some(clustering)) = (id.partition(), id.clustering()) else {
                return Err(StateError::NotClustered {
                    entity: meta.name().to_string(),
                }
                .into());
            };
            if clustering.is_empty() {
                return Err(StateError::NotClustered {
                    entity: meta.name().to_string(),
                }
                .into());
            }

            partition.validate(meta.name(), &range.partition)?;
            for bound in [&range.from, &range.to] {
                if !bound.is_empty() {
                    clustering.validate(meta.name(), bound)?;
                }
            }

            let names = partition.names();
            let key = ctx.key_row(names, &range.partition)?;
            let encode = |bound: &[Value]| {
                bound
                    .iter()
                    .map(|value| encode_deep(ctx.codec, value))
                    .collect::<Result<Vec<_>, _>>()
            };
            let kind = StatementKind::Slice {
                from: encode(&range.from)?,
                to: encode(&range.to)?,
                limit: range.limit,
            };
            let level = resolve_read(ctx.policy, ConsistencyTarget::Entity(meta), &ctx.resolution())?;
            let rows = ctx
                .flush
                .query(&Statement::new(meta.table(), key, kind, level))?;
            span.set_rows(rows.len() as u64);

            rows.into_iter()
                .map(|row| {
                    let row = ctx.decode_row(meta, row)?;
                    Ok::<_, Error>(EntityProxy::from_row(meta.clone(), &row)?)
                })
                .collect()
        })
    }

    /// Dispatch anything buffered.
    pub fn flush(&mut self) -> Result<usize, Error> {
        self.guarded(|ctx| {
            let flushed = ctx.flush.flush()?;
            ctx.state = ContextState::Flushed;

            Ok(flushed)
        })
    }

    /// Flush, release the flush context and refuse further operations.
    /// Closing twice is a no-op.
    pub fn close(&mut self) -> Result<(), Error> {
        if self.state == ContextState::Closed {
            return Ok(());
        }

        let flushed = self.flush.flush();
        self.flush.cleanup();
        self.state = ContextState::Closed;

        flushed.map(|_| ()).map_err(Error::from)
    }

    // Every operation funnels through here so the flush context is
    // released on the error path.
    fn guarded<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        self.ensure_open()?;

        let result = op(self);
        if let Err(err) = &result {
            let discarded = self.flush.cleanup();
            tracing::debug!(error = %err, discarded, "operation failed; context cleaned up");
        }

        result
    }

    const fn ensure_open(&self) -> Result<(), StateError> {
        match self.state {
            ContextState::Closed => Err(StateError::ContextClosed { state: "closed" }),
            ContextState::Open | ContextState::Flushed => Ok(()),
        }
    }

    fn resolution(&self) -> ResolutionContext {
        ResolutionContext::new(self.call_override, self.flush.pinned())
    }

    fn select(&self, meta: &EntityMetadata, key: &[Value]) -> Result<Option<Row>, Error> {
        let key = self.bound_key(meta, key)?;
        let level = resolve_read(self.policy, ConsistencyTarget::Entity(meta), &self.resolution())?;
        let select = StatementKind::Select {
            columns: Vec::new(),
        };

        let rows = self
            .flush
            .query(&Statement::new(meta.table(), key, select, level))?;
        let row = rows
            .into_iter()
            .next()
            .map(|row| self.decode_row(meta, row))
            .transpose()?;

        Ok(row)
    }

    fn increment(
        &self,
        meta: &EntityMetadata,
        property: &PropertyMetadata,
        key: &Row,
        delta: i64,
        resolution: &ResolutionContext,
    ) -> Result<Statement, Error> {
        let target = ConsistencyTarget::Property {
            entity: meta,
            property,
        };
        let level = resolve_write(self.policy, target, resolution)?;
        let column = PropertyRef {
            table: meta.table().to_string(),
            key: key.clone(),
            column: property.name().to_string(),
        };

        Ok(self
            .flush
            .executor()
            .bind_counter_increment(&column, delta, level))
    }

    // full primary key, validated then bound to its columns
    fn bound_key(&self, meta: &EntityMetadata, values: &[Value]) -> Result<Row, Error> {
        meta.id().validate_full_key(meta.name(), values)?;

        Ok(self.key_row(meta.id().column_names(), values)?)
    }

    fn key_row<'n>(
        &self,
        names: impl IntoIterator<Item = &'n str>,
        values: &[Value],
    ) -> Result<Row, CodecError> {
        names
            .into_iter()
            .zip(values)
            .map(|(name, value)| Ok::<_, CodecError>((name.to_string(), encode_deep(self.codec, value)?)))
            .collect()
    }

    fn decode_row(&self, meta: &EntityMetadata, row: Row) -> Result<Row, CodecError> {
        row.into_iter()
            .map(|(column, stored)| {
                let value = if let Some(property) = meta.property(&column) {
                    decode_column(
                        self.codec,
                        &stored,
                        property.key_kind(),
                        property.value_kind(),
                    )?
                } else if let Some(kind) = key_kind(meta.id(), &column) {
                    self.codec.decode(&stored, kind)?
                } else {
                    stored
                };

                Ok::<_, CodecError>((column, value))
            })
            .collect()
    }
}

fn key_kind<'m>(id: &'m IdMetadata, column: &str) -> Option<&'m ValueKind> {
    match id {
        IdMetadata::Simple(property) => (property.name() == column).then(|| property.value_kind()),
        IdMetadata::Compound(_) => id
            .key_columns()
            .into_iter()
            .find(|component| component.name == column)
            .map(|component| &component.kind),
    }
}
