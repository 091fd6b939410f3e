//! Convention-based finder names (`findByName`, `find_one_by_email`, ...).
//!
//! Parsing is restricted to the entity's declared fields (or their columns):
//! a name whose field part resolves to neither is not a finder.

use crate::entity::EntityType;
use crate::error::DataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinderKind {
    /// `findBy<Field>`: every matching row.
    FindBy,
    /// `findOneBy<Field>`: first matching row.
    FindOneBy,
    /// `countBy<Field>`: number of matching rows.
    CountBy,
}

const PREFIXES: &[(&str, FinderKind)] = &[
    ("findOneBy", FinderKind::FindOneBy),
    ("findBy", FinderKind::FindBy),
    ("countBy", FinderKind::CountBy),
    ("find_one_by_", FinderKind::FindOneBy),
    ("find_by_", FinderKind::FindBy),
    ("count_by_", FinderKind::CountBy),
];

/// A parsed finder call: what to do and which field to match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicFinder {
    pub kind: FinderKind,
    pub field: &'static str,
}

impl MagicFinder {
    /// Parse `method` against `entity`'s fields, then its columns.
    ///
    /// # Errors
    ///
    /// `DataError::MethodNotSupported` for an unknown prefix or field.
    pub fn parse(method: &str, entity: &EntityType) -> Result<Self, DataError> {
        let unsupported = || DataError::method_not_supported(entity.name, method);

        let (kind, rest) = PREFIXES
            .iter()
            .find_map(|(prefix, kind)| method.strip_prefix(prefix).map(|rest| (*kind, rest)))
            .ok_or_else(unsupported)?;
        if rest.is_empty() {
            return Err(unsupported());
        }

        let candidates = field_candidates(rest);
        let known = |names: &'static [&'static str]| {
            candidates
                .iter()
                .find_map(|candidate| names.iter().copied().find(|n| *n == candidate.as_str()))
        };
        let field = known(entity.fields)
            .or_else(|| known(entity.columns))
            .ok_or_else(unsupported)?;
        Ok(MagicFinder { kind, field })
    }
}

/// `EmailAddress` → `["email_address", "emailAddress", "EmailAddress"]`.
fn field_candidates(raw: &str) -> Vec<String> {
    let mut lower_first = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    if let Some(c) = chars.next() {
        lower_first.push(c.to_ascii_lowercase());
        lower_first.extend(chars);
    }
    vec![to_snake_case(raw), lower_first, raw.to_string()]
}

/// `EmailAddress` → `email_address`, `HTTPStatus` → `http_status`.
pub(crate) fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1);
            let word_start = match prev {
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                Some(p) => p != '_',
                None => false,
            };
            if word_start {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Result of a dynamic finder call.
#[derive(Debug, Clone, PartialEq)]
pub enum FinderOutput<R> {
    Many(Vec<R>),
    One(Option<R>),
    Count(u64),
}

impl<R> FinderOutput<R> {
    /// Convert every carried row, stopping at the first failure.
    pub fn try_map<T, E>(self, mut f: impl FnMut(R) -> Result<T, E>) -> Result<FinderOutput<T>, E> {
        Ok(match self {
            FinderOutput::Many(rows) => {
                FinderOutput::Many(rows.into_iter().map(&mut f).collect::<Result<_, _>>()?)
            }
            FinderOutput::One(row) => FinderOutput::One(row.map(f).transpose()?),
            FinderOutput::Count(n) => FinderOutput::Count(n),
        })
    }

    pub fn into_many(self) -> Option<Vec<R>> {
        match self {
            FinderOutput::Many(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn into_one(self) -> Option<Option<R>> {
        match self {
            FinderOutput::One(row) => Some(row),
            _ => None,
        }
    }

    pub fn count(&self) -> Option<u64> {
        match self {
            FinderOutput::Count(n) => Some(*n),
            _ => None,
        }
    }
}
