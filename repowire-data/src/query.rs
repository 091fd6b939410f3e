use crate::criteria::{Criteria, Direction, OrderBy};
use crate::entity::EntityType;
use crate::value::Value;

/// Alias used for the root entity when a caller does not name one.
pub const DEFAULT_ALIAS: &str = "t0";

const MAX_SQL_ROWS: u64 = i64::MAX as u64;

/// A fluent query builder for SELECT queries over one entity table.
///
/// Builders are engine-neutral: the SQL engine renders them with
/// [`build_select`](Self::build_select), the in-memory engine evaluates
/// [`conditions`](Self::conditions) directly. Fields may be written bare
/// (`"name"`) or alias-qualified (`"u.name"`).
///
/// # Example
///
/// ```ignore
/// let q = QueryBuilder::new("users", "u")
///     .where_eq("u.email", "a@b.com")
///     .where_like("name", "%alice%")
///     .order_by("id", Direction::Asc)
///     .limit(10);
/// let (sql, params) = q.build_select(&["id", "name"])?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Generic SQL using `?` placeholders (default).
    #[default]
    Generic,
    /// SQLite-style `?` placeholders.
    Sqlite,
    /// MySQL-style `?` placeholders with backtick quoting.
    MySql,
    /// Postgres-style `$1, $2, ...` placeholders.
    Postgres,
}

impl Dialect {
    fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Generic | Dialect::Sqlite | Dialect::MySql => "?".to_string(),
        }
    }

    fn quote_char(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Generic | Dialect::Sqlite | Dialect::Postgres => '"',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentifierPolicy {
    /// Validate identifiers against a conservative pattern.
    #[default]
    Validate,
    /// Validate and quote identifiers using the dialect quoting style.
    Quote,
}

/// A single WHERE predicate. Predicates are joined with `AND`.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String, Value),
    NotEq(String, Value),
    Like(String, String),
    Gt(String, Value),
    Lt(String, Value),
    In(String, Vec<Value>),
    IsNull(String),
    IsNotNull(String),
}

impl Condition {
    pub fn field(&self) -> &str {
        match self {
            Condition::Eq(f, _)
            | Condition::NotEq(f, _)
            | Condition::Like(f, _)
            | Condition::Gt(f, _)
            | Condition::Lt(f, _)
            | Condition::In(f, _)
            | Condition::IsNull(f)
            | Condition::IsNotNull(f) => f,
        }
    }

    fn field_mut(&mut self) -> &mut String {
        match self {
            Condition::Eq(f, _)
            | Condition::NotEq(f, _)
            | Condition::Like(f, _)
            | Condition::Gt(f, _)
            | Condition::Lt(f, _)
            | Condition::In(f, _)
            | Condition::IsNull(f)
            | Condition::IsNotNull(f) => f,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
    alias: String,
    index_by: Option<String>,
    conditions: Vec<Condition>,
    order: Vec<(String, Direction)>,
    limit_val: Option<u64>,
    offset_val: Option<u64>,
    dialect: Dialect,
    identifier_policy: IdentifierPolicy,
}

impl QueryBuilder {
    pub fn new(table: &str, alias: &str) -> Self {
        Self {
            table: table.to_string(),
            alias: alias.to_string(),
            index_by: None,
            conditions: Vec::new(),
            order: Vec::new(),
            limit_val: None,
            offset_val: None,
            dialect: Dialect::Generic,
            identifier_policy: IdentifierPolicy::Validate,
        }
    }

    /// Builder scoped to an entity's table.
    pub fn for_entity(entity: &EntityType, alias: &str) -> Self {
        Self::new(entity.table, alias)
    }

    /// Set the SQL dialect (affects placeholder style and quoting).
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Configure identifier validation/quoting behavior.
    pub fn identifier_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.identifier_policy = policy;
        self
    }

    /// Key results of [`fetch_indexed`](crate::GenericRepository::fetch_indexed)
    /// by this field.
    pub fn index_by(mut self, field: &str) -> Self {
        self.index_by = Some(field.to_string());
        self
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(field.to_string(), value.into()));
        self
    }

    pub fn where_not_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::NotEq(field.to_string(), value.into()));
        self
    }

    pub fn where_like(mut self, field: &str, pattern: &str) -> Self {
        self.conditions
            .push(Condition::Like(field.to_string(), pattern.to_string()));
        self
    }

    pub fn where_gt(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Gt(field.to_string(), value.into()));
        self
    }

    pub fn where_lt(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Lt(field.to_string(), value.into()));
        self
    }

    pub fn where_in<V: Into<Value>>(mut self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.conditions.push(Condition::In(
            field.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn where_null(mut self, field: &str) -> Self {
        self.conditions.push(Condition::IsNull(field.to_string()));
        self
    }

    pub fn where_not_null(mut self, field: &str) -> Self {
        self.conditions.push(Condition::IsNotNull(field.to_string()));
        self
    }

    /// Translate an equality [`Criteria`] into predicates: `Null` becomes
    /// `IS NULL`, `List` becomes `IN`, anything else `=`.
    pub fn apply_criteria(mut self, criteria: &Criteria) -> Self {
        for (field, value) in criteria.iter() {
            let cond = match value {
                Value::Null => Condition::IsNull(field.to_string()),
                Value::List(items) => Condition::In(field.to_string(), items.clone()),
                v => Condition::Eq(field.to_string(), v.clone()),
            };
            self.conditions.push(cond);
        }
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order.push((field.to_string(), direction));
        self
    }

    pub fn apply_order(mut self, order: &OrderBy) -> Self {
        for (field, direction) in order.iter() {
            self.order.push((field.to_string(), direction));
        }
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit_val = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset_val = Some(offset);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn index_field(&self) -> Option<&str> {
        self.index_by.as_deref()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn order(&self) -> &[(String, Direction)] {
        &self.order
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit_val
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.offset_val
    }

    /// Strip this builder's alias from a qualified field (`"u.name"` → `"name"`).
    pub fn field_name<'a>(&self, field: &'a str) -> &'a str {
        field
            .strip_prefix(self.alias.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(field)
    }

    /// Resolve every referenced field (predicates, ordering, index) to the
    /// entity column storing it. Alias prefixes are kept.
    ///
    /// # Errors
    ///
    /// [`QueryError::UnknownField`] for a name that is neither a field nor a
    /// column of `entity`.
    pub fn resolve_fields(&self, entity: &EntityType) -> Result<Self, QueryError> {
        let mut resolved = self.clone();
        for cond in &mut resolved.conditions {
            let column = self.column_of(cond.field(), entity)?;
            *cond.field_mut() = column;
        }
        for (field, _) in &mut resolved.order {
            let column = self.column_of(field, entity)?;
            *field = column;
        }
        if let Some(field) = resolved.index_by.as_mut() {
            let column = self.column_of(field, entity)?;
            *field = column;
        }
        Ok(resolved)
    }

    fn column_of(&self, field: &str, entity: &EntityType) -> Result<String, QueryError> {
        let name = self.field_name(field);
        let column = entity
            .column_for(name)
            .ok_or_else(|| QueryError::UnknownField {
                entity: entity.name.to_string(),
                field: field.to_string(),
            })?;
        let prefix = &field[..field.len() - name.len()];
        Ok(format!("{prefix}{column}"))
    }

    /// Build a SELECT query with validated identifiers, returning
    /// `(sql, bind_values)`.
    ///
    /// Bare fields and selected columns are qualified with the alias.
    pub fn build_select(&self, columns: &[&str]) -> Result<(String, Vec<Value>), QueryError> {
        let from = self.format_from_checked()?;
        let columns = self.format_column_list_checked(columns)?;

        let mut sql = format!("SELECT {columns} FROM {from}");
        let mut params = Vec::new();
        let mut placeholder_idx = 1usize;
        self.append_where_checked(&mut sql, &mut params, &mut placeholder_idx)?;
        self.append_order_checked(&mut sql)?;
        self.append_limit_offset(&mut sql);
        Ok((sql, params))
    }

    /// Build a COUNT query with validated identifiers. Ordering and paging
    /// are ignored.
    pub fn build_count(&self) -> Result<(String, Vec<Value>), QueryError> {
        let from = self.format_from_checked()?;
        let mut sql = format!("SELECT COUNT(*) FROM {from}");
        let mut params = Vec::new();
        let mut placeholder_idx = 1usize;
        self.append_where_checked(&mut sql, &mut params, &mut placeholder_idx)?;
        Ok((sql, params))
    }

    fn format_from_checked(&self) -> Result<String, QueryError> {
        let table = self.format_identifier_checked(&self.table, false, "table")?;
        let alias = self.format_identifier_checked(&self.alias, false, "alias")?;
        Ok(format!("{table} {alias}"))
    }

    fn qualified(&self, field: &str) -> String {
        if field.contains('.') {
            field.to_string()
        } else {
            format!("{}.{field}", self.alias)
        }
    }

    fn format_column_checked(&self, field: &str) -> Result<String, QueryError> {
        self.format_identifier_checked(&self.qualified(field), false, "column")
    }

    fn append_where_checked(
        &self,
        sql: &mut String,
        params: &mut Vec<Value>,
        placeholder_idx: &mut usize,
    ) -> Result<(), QueryError> {
        if self.conditions.is_empty() {
            return Ok(());
        }
        sql.push_str(" WHERE ");
        let mut first = true;
        for cond in &self.conditions {
            if !first {
                sql.push_str(" AND ");
            }
            first = false;
            let col = self.format_column_checked(cond.field())?;
            match cond {
                Condition::Eq(_, val) => {
                    let placeholder = self.next_placeholder(placeholder_idx);
                    sql.push_str(&format!("{col} = {placeholder}"));
                    params.push(scalar(cond.field(), val)?);
                }
                Condition::NotEq(_, val) => {
                    let placeholder = self.next_placeholder(placeholder_idx);
                    sql.push_str(&format!("{col} != {placeholder}"));
                    params.push(scalar(cond.field(), val)?);
                }
                Condition::Like(_, pat) => {
                    let placeholder = self.next_placeholder(placeholder_idx);
                    sql.push_str(&format!("{col} LIKE {placeholder}"));
                    params.push(Value::Text(pat.clone()));
                }
                Condition::Gt(_, val) => {
                    let placeholder = self.next_placeholder(placeholder_idx);
                    sql.push_str(&format!("{col} > {placeholder}"));
                    params.push(scalar(cond.field(), val)?);
                }
                Condition::Lt(_, val) => {
                    let placeholder = self.next_placeholder(placeholder_idx);
                    sql.push_str(&format!("{col} < {placeholder}"));
                    params.push(scalar(cond.field(), val)?);
                }
                Condition::In(_, vals) if vals.is_empty() => {
                    // `IN ()` is not valid SQL; an empty set matches nothing.
                    sql.push_str("1 = 0");
                }
                Condition::In(_, vals) => {
                    let placeholders: Vec<_> = vals
                        .iter()
                        .map(|_| self.next_placeholder(placeholder_idx))
                        .collect();
                    sql.push_str(&format!("{col} IN ({})", placeholders.join(", ")));
                    for val in vals {
                        params.push(scalar(cond.field(), val)?);
                    }
                }
                Condition::IsNull(_) => {
                    sql.push_str(&format!("{col} IS NULL"));
                }
                Condition::IsNotNull(_) => {
                    sql.push_str(&format!("{col} IS NOT NULL"));
                }
            }
        }
        Ok(())
    }

    fn next_placeholder(&self, placeholder_idx: &mut usize) -> String {
        let placeholder = self.dialect.placeholder(*placeholder_idx);
        *placeholder_idx += 1;
        placeholder
    }

    fn append_order_checked(&self, sql: &mut String) -> Result<(), QueryError> {
        if self.order.is_empty() {
            return Ok(());
        }
        sql.push_str(" ORDER BY ");
        let mut clauses = Vec::with_capacity(self.order.len());
        for (field, direction) in &self.order {
            let col = self.format_column_checked(field)?;
            clauses.push(format!("{col} {}", direction.as_sql()));
        }
        sql.push_str(&clauses.join(", "));
        Ok(())
    }

    fn append_limit_offset(&self, sql: &mut String) {
        // SQL row counts are signed 64-bit.
        let limit_val = self.limit_val.map(|l| l.min(MAX_SQL_ROWS));
        let offset_val = self.offset_val.map(|o| o.min(MAX_SQL_ROWS));
        match (limit_val, offset_val) {
            (Some(limit), _) => sql.push_str(&format!(" LIMIT {limit}")),
            // SQLite and MySQL only accept OFFSET after a LIMIT.
            (None, Some(_)) => match self.dialect {
                Dialect::Postgres => {}
                Dialect::MySql => sql.push_str(" LIMIT 18446744073709551615"),
                Dialect::Generic | Dialect::Sqlite => sql.push_str(" LIMIT -1"),
            },
            (None, None) => {}
        }
        if let Some(offset) = offset_val {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }

    fn format_column_list_checked(&self, columns: &[&str]) -> Result<String, QueryError> {
        let mut out = Vec::with_capacity(columns.len());
        for col in columns {
            out.push(self.format_column_checked(col)?);
        }
        Ok(out.join(", "))
    }

    fn format_identifier_checked(
        &self,
        ident: &str,
        allow_star: bool,
        kind: &'static str,
    ) -> Result<String, QueryError> {
        if !is_valid_identifier(ident, allow_star) {
            return Err(QueryError::InvalidIdentifier {
                kind,
                ident: ident.to_string(),
            });
        }
        match self.identifier_policy {
            IdentifierPolicy::Quote => Ok(quote_identifier(ident, self.dialect, allow_star)),
            IdentifierPolicy::Validate => Ok(ident.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    InvalidIdentifier { kind: &'static str, ident: String },
    UnknownField { entity: String, field: String },
    IdentifierArity { entity: String, expected: usize, found: usize },
    InvalidArguments { method: String, expected: usize, found: usize },
    MissingIndexField,
    /// A value that cannot be bound as a single parameter (a nested list).
    UnsupportedValue { field: String },
    InvalidSortDirection { direction: String },
    /// `page * size` does not fit a row offset.
    PageOutOfRange { page: u64, size: u64 },
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::InvalidIdentifier { kind, ident } => {
                write!(f, "Invalid {kind} identifier: {ident}")
            }
            QueryError::UnknownField { entity, field } => {
                write!(f, "Entity '{entity}' has no field named '{field}'")
            }
            QueryError::IdentifierArity {
                entity,
                expected,
                found,
            } => write!(
                f,
                "Entity '{entity}' is identified by {expected} column(s), got {found} value(s)"
            ),
            QueryError::InvalidArguments {
                method,
                expected,
                found,
            } => write!(f, "'{method}' expects {expected} argument(s), got {found}"),
            QueryError::MissingIndexField => {
                f.write_str("Indexed fetch requires a query builder with an index field")
            }
            QueryError::UnsupportedValue { field } => {
                write!(f, "Field '{field}' cannot be compared with a list value")
            }
            QueryError::InvalidSortDirection { direction } => {
                write!(f, "Invalid sort direction '{direction}', expected 'asc' or 'desc'")
            }
            QueryError::PageOutOfRange { page, size } => {
                write!(f, "Page {page} of size {size} is out of range")
            }
        }
    }
}

impl std::error::Error for QueryError {}

fn scalar(field: &str, value: &Value) -> Result<Value, QueryError> {
    match value {
        Value::List(_) => Err(QueryError::UnsupportedValue {
            field: field.to_string(),
        }),
        v => Ok(v.clone()),
    }
}

pub(crate) fn is_valid_identifier(ident: &str, allow_star: bool) -> bool {
    if ident.is_empty() {
        return false;
    }
    let parts: Vec<&str> = ident.split('.').collect();
    for (idx, part) in parts.iter().enumerate() {
        if allow_star && *part == "*" {
            return idx + 1 == parts.len();
        }
        if !is_valid_segment(part) {
            return false;
        }
    }
    true
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote_identifier(ident: &str, dialect: Dialect, allow_star: bool) -> String {
    let quote = dialect.quote_char();
    let parts: Vec<&str> = ident.split('.').collect();
    let last_idx = parts.len().saturating_sub(1);
    parts
        .into_iter()
        .enumerate()
        .map(|(idx, part)| {
            if allow_star && part == "*" && idx == last_idx {
                part.to_string()
            } else {
                format!("{quote}{part}{quote}")
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}
