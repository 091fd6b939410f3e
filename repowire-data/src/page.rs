use serde::{Deserialize, Serialize};

use crate::criteria::{Direction, OrderBy};
use crate::error::DataError;
use crate::query::QueryError;

/// Pagination parameters, deserializable from query strings or config.
#[derive(Debug, Clone, Deserialize)]
pub struct Pageable {
    #[serde(default)]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub size: u64,
    /// `"field"` or `"field,desc"`; several keys separated by `;`.
    #[serde(default)]
    pub sort: Option<String>,
}

fn default_page_size() -> u64 {
    20
}

impl Default for Pageable {
    fn default() -> Self {
        Self {
            page: 0,
            size: default_page_size(),
            sort: None,
        }
    }
}

impl Pageable {
    pub fn new(page: u64, size: u64) -> Self {
        Self {
            page,
            size,
            sort: None,
        }
    }

    pub fn sorted(mut self, sort: &str) -> Self {
        self.sort = Some(sort.to_string());
        self
    }

    /// Row offset of the page's first element.
    ///
    /// # Errors
    ///
    /// [`QueryError::PageOutOfRange`] when `page * size` overflows.
    pub fn offset(&self) -> Result<u64, QueryError> {
        self.page
            .checked_mul(self.size)
            .ok_or(QueryError::PageOutOfRange {
                page: self.page,
                size: self.size,
            })
    }

    /// Parse `sort` into an ordering, `None` when unsorted.
    pub fn order_by(&self) -> Result<Option<OrderBy>, DataError> {
        let Some(sort) = self.sort.as_deref().filter(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };
        let mut order = OrderBy::new();
        for key in sort.split(';') {
            let mut parts = key.split(',').map(str::trim);
            let field = parts.next().unwrap_or_default();
            let direction = match parts.next() {
                Some(d) => d.parse::<Direction>().map_err(|_| {
                    DataError::Query(QueryError::InvalidSortDirection {
                        direction: d.to_string(),
                    })
                })?,
                None => Direction::Asc,
            };
            order = order.then(field, direction);
        }
        Ok(Some(order))
    }
}

/// A page of results with pagination metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, pageable: &Pageable, total_elements: u64) -> Self {
        let total_pages = if pageable.size == 0 {
            0
        } else {
            total_elements.div_ceil(pageable.size)
        };
        Self {
            content,
            page: pageable.page,
            size: pageable.size,
            total_elements,
            total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page.saturating_add(1) < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_math() {
        let pageable = Pageable::new(1, 20);
        assert_eq!(pageable.offset(), Ok(20));
        let page = Page::new(vec![1, 2, 3], &pageable, 41);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next());
        let empty: Page<i32> = Page::new(vec![], &Pageable::new(0, 0), 10);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn huge_pages_do_not_overflow() {
        let pageable = Pageable::new(u64::MAX / 2, 20);
        assert_eq!(
            pageable.offset(),
            Err(QueryError::PageOutOfRange {
                page: u64::MAX / 2,
                size: 20
            })
        );
        let last: Page<i32> = Page::new(vec![], &Pageable::new(u64::MAX, 1), u64::MAX);
        assert!(!last.has_next());
    }

    #[test]
    fn sort_parsing() {
        let order = Pageable::default().sorted("name,DESC;id").order_by().unwrap().unwrap();
        let keys: Vec<_> = order.iter().collect();
        assert_eq!(keys, vec![("name", Direction::Desc), ("id", Direction::Asc)]);
        assert!(Pageable::default().order_by().unwrap().is_none());
        assert!(matches!(
            Pageable::default().sorted("name,sideways").order_by(),
            Err(DataError::Query(QueryError::InvalidSortDirection { direction })) if direction == "sideways"
        ));
    }

    #[test]
    fn deserializes_with_defaults() {
        let p: Pageable = serde_json::from_str(r#"{"page": 2}"#).unwrap();
        assert_eq!((p.page, p.size, p.sort), (2, 20, None));
    }
}
