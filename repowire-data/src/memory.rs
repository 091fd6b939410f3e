//! In-memory persistence engine.
//!
//! Rows live in a shared [`InMemoryStore`] keyed by table name. Queries are
//! evaluated directly from the [`QueryBuilder`]'s predicates with SQL
//! semantics for `NULL`; unordered results keep insertion order.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::criteria::Direction;
use crate::entity::EntityType;
use crate::error::DataError;
use crate::handle::EntityRepositoryHandle;
use crate::query::{Condition, QueryBuilder};
use crate::registry::ObjectManager;
use crate::value::{Row, Value};

/// Shared table storage. Cloning shares the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<DashMap<String, Vec<Row>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, table: &str, row: Row) {
        self.tables.entry(table.to_string()).or_default().push(row);
    }

    /// Append several rows at once.
    pub fn load(&self, table: &str, rows: impl IntoIterator<Item = Row>) {
        self.tables.entry(table.to_string()).or_default().extend(rows);
    }

    pub fn clear(&self, table: &str) {
        self.tables.remove(table);
    }

    /// Snapshot of a table's rows.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .get(table)
            .map(|rows| rows.value().clone())
            .unwrap_or_default()
    }

    pub fn len(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, |rows| rows.len())
    }
}

/// [`ObjectManager`] serving every entity from an [`InMemoryStore`].
#[derive(Debug, Clone)]
pub struct InMemoryManager {
    name: String,
    store: InMemoryStore,
}

impl InMemoryManager {
    pub fn new(name: &str, store: InMemoryStore) -> Self {
        Self {
            name: name.to_string(),
            store,
        }
    }

    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }
}

impl ObjectManager for InMemoryManager {
    fn name(&self) -> &str {
        &self.name
    }

    fn repository_for_type(
        &self,
        entity: &EntityType,
    ) -> Result<Arc<dyn EntityRepositoryHandle>, DataError> {
        Ok(Arc::new(InMemoryRepository {
            entity: *entity,
            store: self.store.clone(),
        }))
    }
}

pub struct InMemoryRepository {
    entity: EntityType,
    store: InMemoryStore,
}

impl InMemoryRepository {
    /// Rows satisfying every predicate of a builder whose fields are
    /// already resolved to columns.
    fn matching(&self, query: &QueryBuilder) -> Vec<Row> {
        self.store
            .rows(query.table())
            .into_iter()
            .filter(|row| {
                query
                    .conditions()
                    .iter()
                    .all(|cond| evaluate(cond, row, query))
            })
            .collect()
    }

    fn project(&self, row: &Row) -> Row {
        self.entity
            .columns
            .iter()
            .map(|col| (*col, row.value(col).clone()))
            .collect()
    }
}

#[async_trait]
impl EntityRepositoryHandle for InMemoryRepository {
    fn entity(&self) -> &EntityType {
        &self.entity
    }

    async fn fetch(&self, query: &QueryBuilder) -> Result<Vec<Row>, DataError> {
        let query = &query.resolve_fields(&self.entity)?;
        let mut rows = self.matching(query);
        if !query.order().is_empty() {
            // Vec::sort_by is stable, so ties keep insertion order.
            rows.sort_by(|a, b| {
                for (field, direction) in query.order() {
                    let name = query.field_name(field);
                    let ord = a
                        .value(name)
                        .compare(b.value(name))
                        .unwrap_or(Ordering::Equal);
                    let ord = match direction {
                        Direction::Asc => ord,
                        Direction::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let offset = query
            .offset_value()
            .map_or(0, |o| usize::try_from(o).unwrap_or(usize::MAX));
        let limit = query
            .limit_value()
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        let rows: Vec<Row> = rows
            .iter()
            .skip(offset)
            .take(limit)
            .map(|row| self.project(row))
            .collect();
        tracing::trace!(entity = self.entity.name, rows = rows.len(), "in-memory fetch");
        Ok(rows)
    }

    async fn count_query(&self, query: &QueryBuilder) -> Result<u64, DataError> {
        let query = query.resolve_fields(&self.entity)?;
        Ok(self.matching(&query).len() as u64)
    }
}

fn evaluate(cond: &Condition, row: &Row, query: &QueryBuilder) -> bool {
    let actual = row.value(query.field_name(cond.field()));
    match cond {
        Condition::Eq(_, v) => actual.sql_eq(v),
        Condition::NotEq(_, v) => !actual.is_null() && !v.is_null() && !actual.sql_eq(v),
        Condition::Like(_, pattern) => match actual {
            Value::Null | Value::List(_) => false,
            v => like(&v.to_string(), pattern),
        },
        Condition::Gt(_, v) => !v.is_null() && !actual.is_null() && actual.compare(v) == Some(Ordering::Greater),
        Condition::Lt(_, v) => !v.is_null() && !actual.is_null() && actual.compare(v) == Some(Ordering::Less),
        Condition::In(_, values) => values.iter().any(|v| actual.sql_eq(v)),
        Condition::IsNull(_) => actual.is_null(),
        Condition::IsNotNull(_) => !actual.is_null(),
    }
}

/// SQL `LIKE`: `%` matches any run, `_` one character. Case-sensitive.
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    // dp[j]: pattern[..i] matches text[..j]
    let mut dp = vec![false; text.len() + 1];
    dp[0] = true;
    for p in &pattern {
        let mut next = vec![false; text.len() + 1];
        match p {
            '%' => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen |= dp[j];
                    next[j] = seen;
                }
            }
            '_' => {
                for j in 1..=text.len() {
                    next[j] = dp[j - 1];
                }
            }
            c => {
                for j in 1..=text.len() {
                    next[j] = dp[j - 1] && text[j - 1] == *c;
                }
            }
        }
        dp = next;
    }
    dp[text.len()]
}
