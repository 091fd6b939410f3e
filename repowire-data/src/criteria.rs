use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::value::Value;

/// Equality conjunction over entity fields, in insertion order.
///
/// A `Null` operand matches `IS NULL`, a `List` operand matches `IN (...)`.
/// An empty `Criteria` matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    fields: IndexMap<String, Value>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<Value>) {
        self.fields.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Criteria {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Direction::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Direction::Desc)
        } else {
            Err(format!("invalid sort direction '{s}', expected 'asc' or 'desc'"))
        }
    }
}

/// Ordered list of `field → direction` sort keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBy {
    keys: Vec<(String, Direction)>,
}

impl OrderBy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asc(field: &str) -> Self {
        Self::new().then(field, Direction::Asc)
    }

    pub fn desc(field: &str) -> Self {
        Self::new().then(field, Direction::Desc)
    }

    /// Append a sort key. A field already present keeps its position and
    /// takes the new direction.
    pub fn then(mut self, field: &str, direction: Direction) -> Self {
        match self.keys.iter_mut().find(|(f, _)| f == field) {
            Some(existing) => existing.1 = direction,
            None => self.keys.push((field.to_string(), direction)),
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Direction)> {
        self.keys.iter().map(|(f, d)| (f.as_str(), *d))
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
