use crate::criteria::Criteria;
use crate::error::DataError;
use crate::query::{is_valid_identifier, QueryError};
use crate::value::{Row, Value};

/// Trait representing a persistent entity: its name, table, identifier
/// columns, column list and how to hydrate it from a result row.
///
/// Criteria, ordering and finder names refer to entity *fields*; rows and
/// SQL use *columns*. [`fields`](Self::fields) lists the field names in
/// column order and defaults to the column names.
///
/// Intended to be derived (`#[derive(Entity)]`) or implemented manually.
///
/// # Example
///
/// ```ignore
/// impl Entity for User {
///     fn entity_name() -> &'static str { "User" }
///     fn table_name() -> &'static str { "users" }
///     fn id_columns() -> &'static [&'static str] { &["id"] }
///     fn columns() -> &'static [&'static str] { &["id", "name"] }
///     fn from_row(row: &Row) -> Result<Self, DataError> {
///         Ok(User { id: row.get("id")?, name: row.get("name")? })
///     }
/// }
/// ```
pub trait Entity: Send + Sync + Unpin + Sized + 'static {
    fn entity_name() -> &'static str;
    fn table_name() -> &'static str;
    fn id_columns() -> &'static [&'static str];
    fn columns() -> &'static [&'static str];
    fn from_row(row: &Row) -> Result<Self, DataError>;

    /// Field names, parallel to [`columns`](Self::columns).
    fn fields() -> &'static [&'static str] {
        Self::columns()
    }

    fn metadata() -> EntityType {
        EntityType {
            name: Self::entity_name(),
            table: Self::table_name(),
            id_columns: Self::id_columns(),
            columns: Self::columns(),
            fields: Self::fields(),
        }
    }
}

/// Runtime descriptor of an entity type, the key registries and engines
/// work with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityType {
    pub name: &'static str,
    pub table: &'static str,
    pub id_columns: &'static [&'static str],
    pub columns: &'static [&'static str],
    /// Field names, `fields[i]` is stored in `columns[i]`.
    pub fields: &'static [&'static str],
}

impl EntityType {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }

    /// Column backing `name`. A field name wins over a column of the same
    /// name; a bare column name is accepted too.
    pub fn column_for(&self, name: &str) -> Option<&'static str> {
        self.fields
            .iter()
            .position(|f| *f == name)
            .and_then(|idx| self.columns.get(idx).copied())
            .or_else(|| self.columns.iter().copied().find(|c| *c == name))
    }

    /// Check the declaration is well-formed.
    ///
    /// # Errors
    ///
    /// `DataError::Configuration` naming the entity and the first problem
    /// found.
    pub fn validate(&self) -> Result<(), DataError> {
        let fail = |msg: String| {
            Err(DataError::configuration(format!(
                "entity '{}' is not a valid entity type: {msg}",
                self.name
            )))
        };

        if !is_valid_identifier(self.name, false) || self.name.contains('.') {
            return fail("entity name must be a plain identifier".into());
        }
        if !is_valid_identifier(self.table, false) {
            return fail(format!("invalid table name '{}'", self.table));
        }
        if self.columns.is_empty() {
            return fail("no columns declared".into());
        }
        for (idx, col) in self.columns.iter().enumerate() {
            if !is_valid_identifier(col, false) || col.contains('.') {
                return fail(format!("invalid column name '{col}'"));
            }
            if self.columns[..idx].contains(col) {
                return fail(format!("column '{col}' is declared twice"));
            }
        }
        if self.fields.len() != self.columns.len() {
            return fail(format!(
                "{} field(s) declared for {} column(s)",
                self.fields.len(),
                self.columns.len()
            ));
        }
        for (idx, field) in self.fields.iter().enumerate() {
            if !is_valid_identifier(field, false) || field.contains('.') {
                return fail(format!("invalid field name '{field}'"));
            }
            if self.fields[..idx].contains(field) {
                return fail(format!("field '{field}' is declared twice"));
            }
        }
        if self.id_columns.is_empty() {
            return fail("no identifier column declared".into());
        }
        if let Some(missing) = self.id_columns.iter().find(|c| !self.has_column(c)) {
            return fail(format!("identifier column '{missing}' is not a declared column"));
        }
        Ok(())
    }

    /// Criteria selecting a row by identifier. Composite identifiers are
    /// given as a `Value::List` in `id_columns` order.
    pub fn identifier_criteria(&self, id: &Value) -> Result<Criteria, QueryError> {
        let values: Vec<&Value> = match id {
            Value::List(items) => items.iter().collect(),
            single => vec![single],
        };
        if values.len() != self.id_columns.len() {
            return Err(QueryError::IdentifierArity {
                entity: self.name.to_string(),
                expected: self.id_columns.len(),
                found: values.len(),
            });
        }
        Ok(self
            .id_columns
            .iter()
            .zip(values)
            .map(|(col, v)| (*col, v.clone()))
            .collect())
    }
}
