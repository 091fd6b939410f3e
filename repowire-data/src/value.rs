use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// A single column value, identifier or criteria operand.
///
/// `List` only appears on the way in: as a criteria operand it means `IN`,
/// passed to `find` it is a composite identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the variant, used in mapping error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::List(_) => "list",
        }
    }

    /// SQL-style equality: `NULL` equals nothing, ints and floats compare
    /// numerically.
    pub fn sql_eq(&self, other: &Value) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        self.compare(other) == Some(Ordering::Equal)
    }

    /// Total-enough ordering for sorting result sets: `NULL` sorts first,
    /// numbers compare numerically, mismatched kinds are incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Int(b)) => Some(i64::from(*a).cmp(b)),
            (Value::Int(a), Value::Bool(b)) => Some(a.cmp(&i64::from(*b))),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )+
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

// ── Extraction ──────────────────────────────────────────────────────────────

/// Conversion from a column [`Value`] into an entity field type.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be read from a column value",
    label = "not a supported column type",
    note = "built-in types: integers, f32/f64, bool, String, Value, Option<T>. Implement `FromValue` for custom types."
)]
pub trait FromValue: Sized {
    fn from_value(value: &Value, column: &str) -> Result<Self, DataError>;
}

fn mismatch(value: &Value, column: &str, expected: &str) -> DataError {
    DataError::Mapping(format!(
        "column '{column}': expected {expected}, found {}",
        value.kind()
    ))
}

impl FromValue for Value {
    fn from_value(value: &Value, _column: &str) -> Result<Self, DataError> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value, column: &str) -> Result<Self, DataError> {
        match value {
            Value::Int(i) => Ok(*i),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Text(s) => s.parse().map_err(|_| mismatch(value, column, "i64")),
            _ => Err(mismatch(value, column, "i64")),
        }
    }
}

macro_rules! impl_from_value_int {
    ($($ty:ty),+) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value, column: &str) -> Result<Self, DataError> {
                    let i = i64::from_value(value, column)?;
                    <$ty>::try_from(i).map_err(|_| DataError::Mapping(format!(
                        "column '{column}': {i} is out of range for {}",
                        stringify!($ty)
                    )))
                }
            }
        )+
    };
}

impl_from_value_int!(i8, i16, i32, u8, u16, u32, u64, usize);

impl FromValue for f64 {
    fn from_value(value: &Value, column: &str) -> Result<Self, DataError> {
        match value {
            Value::Float(x) => Ok(*x),
            Value::Int(i) => Ok(*i as f64),
            Value::Text(s) => s.parse().map_err(|_| mismatch(value, column, "f64")),
            _ => Err(mismatch(value, column, "f64")),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value, column: &str) -> Result<Self, DataError> {
        f64::from_value(value, column).map(|x| x as f32)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value, column: &str) -> Result<Self, DataError> {
        match value {
            Value::Bool(b) => Ok(*b),
            // SQLite and MySQL store booleans as integers.
            Value::Int(0) => Ok(false),
            Value::Int(1) => Ok(true),
            Value::Text(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Ok(true),
                "false" | "f" | "0" => Ok(false),
                _ => Err(mismatch(value, column, "bool")),
            },
            _ => Err(mismatch(value, column, "bool")),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value, column: &str) -> Result<Self, DataError> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            Value::Int(_) | Value::Float(_) | Value::Bool(_) => Ok(value.to_string()),
            _ => Err(mismatch(value, column, "String")),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value, column: &str) -> Result<Self, DataError> {
        match value {
            Value::Null => Ok(None),
            v => T::from_value(v, column).map(Some),
        }
    }
}

// ── Row ─────────────────────────────────────────────────────────────────────

/// One result row: column name → value, in select order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    values: IndexMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert: `Row::new().with("id", 1).with("name", "a")`.
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: &str, value: impl Into<Value>) {
        self.values.insert(column.to_string(), value.into());
    }

    /// Raw value of a column; a missing column reads as `NULL`.
    pub fn value(&self, column: &str) -> &Value {
        const NULL: &Value = &Value::Null;
        self.values.get(column).unwrap_or(NULL)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    /// Read a column into a field type.
    ///
    /// # Errors
    ///
    /// `DataError::Mapping` if the column is absent or holds an incompatible
    /// value.
    pub fn get<T: FromValue>(&self, column: &str) -> Result<T, DataError> {
        let value = self.values.get(column).ok_or_else(|| {
            DataError::Mapping(format!("column '{column}' is missing from the result row"))
        })?;
        T::from_value(value, column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
