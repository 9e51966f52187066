//! Fixture schemas, a typed test entity and an in-memory executor.

use crate::{
    consistency::{ConsistencyLevel, ConsistencyPolicy},
    context::{Statement, StatementKind},
    error::StateError,
    interface::{Row, StorageError, StorageExecutor},
    model::{entity::EntityMetadata, property::CascadeType, property::PropertyKind, registry::MetadataRegistry},
    schema::{ConsistencySchema, CompoundKeySchema, EntitySchema, IdSchema, KeyShape, PropertySchema},
    session::Session,
    traits::{Entity, EntityKind, FieldValue},
    value::{Value, ValueKind},
};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex},
};

///
/// User
/// Simple id, every collection kind, a counter and a self-join.
///

pub(crate) fn user_schema() -> EntitySchema {
    EntitySchema::new(
        "User",
        IdSchema::Simple(PropertySchema::simple("id", ValueKind::BigInt)),
    )
    .table("users")
    .consistency(ConsistencySchema::new(None, Some(ConsistencyLevel::All)))
    .property(PropertySchema::simple("name", ValueKind::Text))
    .property(PropertySchema::new("tags", PropertyKind::List, ValueKind::Text))
    .property(PropertySchema::new("roles", PropertyKind::Set, ValueKind::Text))
    .property(
        PropertySchema::new("prefs", PropertyKind::Map, ValueKind::Text).key_kind(ValueKind::Text),
    )
    .property(PropertySchema::new(
        "visits",
        PropertyKind::Counter,
        ValueKind::BigInt,
    ))
    .property(
        PropertySchema::new("manager", PropertyKind::JoinSimple, ValueKind::BigInt)
            .join("User", &[CascadeType::Persist]),
    )
}

///
/// Tweet
/// Partition on the author, clustered by time then sequence.
///

pub(crate) fn tweet_schema() -> EntitySchema {
    let key = CompoundKeySchema::new("TweetKey")
        .component("author", ValueKind::Uuid)
        .component("created", ValueKind::Timestamp)
        .component("seq", ValueKind::Int)
        .shape(KeyShape::Accessors);

    EntitySchema::new(
        "Tweet",
        IdSchema::Compound {
            property: "key".to_string(),
            key,
        },
    )
    .table("tweets")
    .wide_row()
    .property(PropertySchema::simple("body", ValueKind::Text))
}

///
/// Clicks
/// Clustered counter entity: every property is a counter.
///

pub(crate) fn clicks_schema() -> EntitySchema {
    let key = CompoundKeySchema::new("ClickKey")
        .component("page", ValueKind::Text)
        .component("day", ValueKind::Timestamp)
        .shape(KeyShape::Constructor { arity: 2 });

    EntitySchema::new(
        "Clicks",
        IdSchema::Compound {
            property: "key".to_string(),
            key,
        },
    )
    .table("clicks")
    .property(PropertySchema::new(
        "hits",
        PropertyKind::Counter,
        ValueKind::BigInt,
    ))
}

pub(crate) fn registry() -> MetadataRegistry {
    MetadataRegistry::bootstrap(&[user_schema(), tweet_schema(), clicks_schema()])
        .expect("fixture schemas are valid")
}

pub(crate) fn meta(name: &str) -> Arc<EntityMetadata> {
    registry()
        .get(name)
        .cloned()
        .expect("fixture entity is registered")
}

pub(crate) fn row_of(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(column, value)| ((*column).to_string(), value.clone()))
        .collect()
}

pub(crate) fn session(executor: Arc<RecordingExecutor>) -> Session {
    let registry = registry();
    let policy = ConsistencyPolicy::new(ConsistencyLevel::One, ConsistencyLevel::Quorum);

    Session::new(registry, policy, executor)
}

///
/// User
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct User {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub tags: Vec<String>,
    pub roles: BTreeSet<String>,
    pub prefs: BTreeMap<String, String>,
    pub visits: i64,
    pub manager: Option<i64>,
}

impl User {
    pub(crate) fn new(id: i64, name: &str) -> Self {
        Self {
            id: Some(id),
            name: Some(name.to_string()),
            ..Self::default()
        }
    }
}

fn rejected(property: &str, value: &Value) -> StateError {
    StateError::PropertyRejected {
        property: property.to_string(),
        reason: format!("unexpected {}", value.type_name()),
    }
}

fn decode<T: FieldValue + Default>(property: &str, value: &Value) -> Result<T, StateError> {
    if value.is_null() {
        return Ok(T::default());
    }

    T::from_value(value).ok_or_else(|| rejected(property, value))
}

impl Entity for User {
    fn get_value(&self, property: &str) -> Option<Value> {
        let value = match property {
            "id" => self.id.to_value(),
            "name" => self.name.to_value(),
            "tags" => self.tags.to_value(),
            "roles" => self.roles.to_value(),
            "prefs" => self.prefs.to_value(),
            "visits" => self.visits.to_value(),
            "manager" => self.manager.to_value(),
            _ => return None,
        };

        (!value.is_null()).then_some(value)
    }

    fn set_value(&mut self, property: &str, value: Value) -> Result<(), StateError> {
        match property {
            "id" => self.id = decode(property, &value)?,
            "name" => self.name = decode(property, &value)?,
            "tags" => self.tags = decode(property, &value)?,
            "roles" => self.roles = decode(property, &value)?,
            "prefs" => self.prefs = decode(property, &value)?,
            "visits" => self.visits = decode(property, &value)?,
            "manager" => self.manager = decode(property, &value)?,
            _ => return Err(rejected(property, &value)),
        }

        Ok(())
    }
}

impl EntityKind for User {
    const ENTITY: &'static str = "User";
}

// A joined user is stored by its id.
impl FieldValue for User {
    fn to_value(&self) -> Value {
        self.id.to_value()
    }

    fn from_value(_value: &Value) -> Option<Self> {
        None
    }
}

///
/// Tweet
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Tweet {
    pub key: Vec<Value>,
    pub body: Option<String>,
}

impl Entity for Tweet {
    fn get_value(&self, property: &str) -> Option<Value> {
        match property {
            "key" if !self.key.is_empty() => Some(Value::List(self.key.clone())),
            "body" => self.body.clone().map(Value::Text),
            _ => None,
        }
    }

    fn set_value(&mut self, property: &str, value: Value) -> Result<(), StateError> {
        match property {
            "key" => self.key = decode(property, &value)?,
            "body" => self.body = decode(property, &value)?,
            _ => return Err(rejected(property, &value)),
        }

        Ok(())
    }
}

impl EntityKind for Tweet {
    const ENTITY: &'static str = "Tweet";
}

///
/// RecordingExecutor
///
/// In-memory table store that also logs every statement it receives.
/// Collection edits are logged but not applied.
///

#[derive(Debug, Default)]
pub(crate) struct RecordingExecutor {
    log: Mutex<Vec<Statement>>,
    batches: Mutex<Vec<usize>>,
    tables: Mutex<BTreeMap<String, BTreeMap<Row, Row>>>,
    fail_writes: Mutex<bool>,
}

impl RecordingExecutor {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn statements(&self) -> Vec<Statement> {
        self.log.lock().expect("log lock").clone()
    }

    pub(crate) fn writes(&self) -> Vec<Statement> {
        self.statements()
            .into_iter()
            .filter(|s| !s.is_read())
            .collect()
    }

    pub(crate) fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().expect("batch lock").clone()
    }

    pub(crate) fn clear_log(&self) {
        self.log.lock().expect("log lock").clear();
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().expect("fail lock") = fail;
    }

    /// Store a row directly, bypassing the log.
    pub(crate) fn seed(&self, table: &str, key: Row, values: Row) {
        let mut row = key.clone();
        row.extend(values);
        self.tables
            .lock()
            .expect("table lock")
            .entry(table.to_string())
            .or_default()
            .insert(key, row);
    }

    pub(crate) fn row(&self, table: &str, key: &Row) -> Option<Row> {
        self.tables
            .lock()
            .expect("table lock")
            .get(table)
            .and_then(|rows| rows.get(key))
            .cloned()
    }

    pub(crate) fn delete_row(&self, table: &str, key: &Row) {
        if let Some(rows) = self.tables.lock().expect("table lock").get_mut(table) {
            rows.remove(key);
        }
    }

    fn apply(&self, statement: &Statement) -> Vec<Row> {
        let mut tables = self.tables.lock().expect("table lock");
        let rows = tables.entry(statement.table.clone()).or_default();
        let key = statement.key.clone();

        match &statement.kind {
            StatementKind::Insert { values } | StatementKind::Assign { values } => {
                let row = rows.entry(key).or_insert_with(|| statement.key.clone());
                for (column, value) in values {
                    row.insert(column.clone(), value.clone());
                }
                Vec::new()
            }
            StatementKind::CounterIncrement { column, delta } => {
                let row = rows.entry(key).or_insert_with(|| statement.key.clone());
                let current = row.get(column).and_then(Value::as_big_int).unwrap_or(0);
                row.insert(column.clone(), Value::BigInt(current + delta));
                Vec::new()
            }
            StatementKind::Delete => {
                rows.remove(&key);
                Vec::new()
            }
            StatementKind::Select { .. } => rows.get(&key).cloned().into_iter().collect(),
            StatementKind::Slice { limit, .. } => rows
                .values()
                .filter(|row| {
                    statement
                        .key
                        .iter()
                        .all(|(column, value)| row.get(column) == Some(value))
                })
                .take(limit.unwrap_or(usize::MAX))
                .cloned()
                .collect(),
            StatementKind::Collection { .. } => Vec::new(),
        }
    }

    fn check_write(&self, statement: &Statement) -> Result<(), StorageError> {
        if !statement.is_read() && *self.fail_writes.lock().expect("fail lock") {
            return Err(StorageError::Statement {
                table: statement.table.clone(),
                message: "write refused".to_string(),
            });
        }

        Ok(())
    }
}

impl StorageExecutor for RecordingExecutor {
    fn execute(&self, statement: &Statement) -> Result<Vec<Row>, StorageError> {
        self.log.lock().expect("log lock").push(statement.clone());
        self.check_write(statement)?;

        Ok(self.apply(statement))
    }

    fn execute_batch(&self, statements: &[Statement]) -> Result<(), StorageError> {
        self.batches
            .lock()
            .expect("batch lock")
            .push(statements.len());
        self.log
            .lock()
            .expect("log lock")
            .extend(statements.iter().cloned());

        for statement in statements {
            self.check_write(statement)
                .map_err(|err| StorageError::Batch {
                    statements: statements.len(),
                    message: err.to_string(),
                })?;
        }
        for statement in statements {
            self.apply(statement);
        }

        Ok(())
    }
}
