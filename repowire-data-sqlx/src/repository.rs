use async_trait::async_trait;
use repowire_data::{
    DataError, Dialect, EntityRepositoryHandle, EntityType, IdentifierPolicy, QueryBuilder, Row,
    Value,
};
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Row as _};

use crate::error::SqlxErrorExt;

type AnyQuery<'q> = Query<'q, Any, AnyArguments<'q>>;

/// Engine repository rendering [`QueryBuilder`]s to SQL.
///
/// Every field is resolved to one of the entity's columns before rendering and
/// every identifier is quoted, so builder input never reaches the SQL text
/// unvalidated. Values are always bound parameters.
pub struct SqlxEntityRepository {
    entity: EntityType,
    pool: AnyPool,
    dialect: Dialect,
}

impl SqlxEntityRepository {
    pub fn new(entity: EntityType, pool: AnyPool, dialect: Dialect) -> Self {
        Self {
            entity,
            pool,
            dialect,
        }
    }

    fn prepare(&self, query: &QueryBuilder) -> Result<QueryBuilder, DataError> {
        Ok(query
            .resolve_fields(&self.entity)?
            .dialect(self.dialect)
            .identifier_policy(IdentifierPolicy::Quote))
    }
}

#[async_trait]
impl EntityRepositoryHandle for SqlxEntityRepository {
    fn entity(&self) -> &EntityType {
        &self.entity
    }

    async fn fetch(&self, query: &QueryBuilder) -> Result<Vec<Row>, DataError> {
        let (sql, params) = self.prepare(query)?.build_select(self.entity.columns)?;
        tracing::debug!(entity = self.entity.name, sql = %sql, "fetch");

        let rows = bind_all(sqlx::query(&sql), &params)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.into_data_error())?;
        rows.iter()
            .map(|row| decode_row(row, self.entity.columns))
            .collect()
    }

    async fn count_query(&self, query: &QueryBuilder) -> Result<u64, DataError> {
        let (sql, params) = self.prepare(query)?.build_count()?;
        tracing::debug!(entity = self.entity.name, sql = %sql, "count");

        let row = bind_all(sqlx::query(&sql), &params)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.into_data_error())?;
        let count: i64 = row.try_get(0usize).map_err(|e| e.into_data_error())?;
        u64::try_from(count).map_err(|_| DataError::Mapping(format!("negative row count {count}")))
    }
}

fn bind_all<'q>(mut query: AnyQuery<'q>, params: &[Value]) -> AnyQuery<'q> {
    for value in params {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(x) => query.bind(*x),
            Value::Text(s) => query.bind(s.clone()),
            // `QueryBuilder` never emits list parameters.
            Value::List(_) => query.bind(None::<String>),
        };
    }
    query
}

/// Read the selected columns, in select order, into a [`Row`].
fn decode_row(row: &AnyRow, columns: &[&str]) -> Result<Row, DataError> {
    columns
        .iter()
        .enumerate()
        .map(|(idx, column)| Ok((*column, decode_value(row, idx)?)))
        .collect::<Result<Vec<_>, DataError>>()
        .map(|pairs| pairs.into_iter().collect())
}

fn decode_value(row: &AnyRow, idx: usize) -> Result<Value, DataError> {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return Ok(v.map_or(Value::Null, Value::Int));
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return Ok(v.map_or(Value::Null, Value::Float));
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return Ok(v.map_or(Value::Null, Value::Text));
    }
    row.try_get::<Option<bool>, _>(idx)
        .map(|v| v.map_or(Value::Null, Value::Bool))
        .map_err(|e| e.into_data_error())
}
