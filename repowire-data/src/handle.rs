use async_trait::async_trait;

use crate::criteria::{Criteria, OrderBy};
use crate::entity::EntityType;
use crate::error::DataError;
use crate::finder::{FinderKind, FinderOutput, MagicFinder};
use crate::query::{QueryBuilder, QueryError, DEFAULT_ALIAS};
use crate::value::{Row, Value};

/// An engine's per-entity repository, working on untyped [`Row`]s.
///
/// Engines implement [`fetch`](Self::fetch) and
/// [`count_query`](Self::count_query); every other operation has a default
/// built on [`QueryBuilder`] so criteria, ordering and finder dispatch are
/// translated the same way by every engine.
#[async_trait]
pub trait EntityRepositoryHandle: Send + Sync {
    fn entity(&self) -> &EntityType;

    fn create_query_builder(&self, alias: &str, index_by: Option<&str>) -> QueryBuilder {
        let qb = QueryBuilder::for_entity(self.entity(), alias);
        match index_by {
            Some(field) => qb.index_by(field),
            None => qb,
        }
    }

    /// Execute a builder, returning the entity's columns for every match.
    async fn fetch(&self, query: &QueryBuilder) -> Result<Vec<Row>, DataError>;

    /// Number of rows matching a builder's predicates.
    async fn count_query(&self, query: &QueryBuilder) -> Result<u64, DataError>;

    async fn find(&self, id: &Value) -> Result<Option<Row>, DataError> {
        let criteria = self.entity().identifier_criteria(id)?;
        self.find_one_by(&criteria, None).await
    }

    async fn find_all(&self) -> Result<Vec<Row>, DataError> {
        self.fetch(&self.create_query_builder(DEFAULT_ALIAS, None)).await
    }

    async fn find_by(
        &self,
        criteria: &Criteria,
        order_by: Option<&OrderBy>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<Row>, DataError> {
        let mut qb = self
            .create_query_builder(DEFAULT_ALIAS, None)
            .apply_criteria(criteria);
        if let Some(order) = order_by {
            qb = qb.apply_order(order);
        }
        if let Some(limit) = limit {
            qb = qb.limit(limit);
        }
        if let Some(offset) = offset {
            qb = qb.offset(offset);
        }
        self.fetch(&qb).await
    }

    async fn find_one_by(
        &self,
        criteria: &Criteria,
        order_by: Option<&OrderBy>,
    ) -> Result<Option<Row>, DataError> {
        let rows = self.find_by(criteria, order_by, Some(1), None).await?;
        Ok(rows.into_iter().next())
    }

    async fn count(&self, criteria: &Criteria) -> Result<u64, DataError> {
        let qb = self
            .create_query_builder(DEFAULT_ALIAS, None)
            .apply_criteria(criteria);
        self.count_query(&qb).await
    }

    /// Dynamic finder dispatch: `findBy<Field>`, `findOneBy<Field>`,
    /// `countBy<Field>` and their snake_case spellings, each taking exactly
    /// one argument.
    async fn call(&self, method: &str, args: &[Value]) -> Result<FinderOutput<Row>, DataError> {
        let finder = MagicFinder::parse(method, self.entity())?;
        let [value] = args else {
            return Err(QueryError::InvalidArguments {
                method: method.to_string(),
                expected: 1,
                found: args.len(),
            }
            .into());
        };
        let criteria = Criteria::new().with(finder.field, value.clone());
        match finder.kind {
            FinderKind::FindBy => Ok(FinderOutput::Many(
                self.find_by(&criteria, None, None, None).await?,
            )),
            FinderKind::FindOneBy => Ok(FinderOutput::One(self.find_one_by(&criteria, None).await?)),
            FinderKind::CountBy => Ok(FinderOutput::Count(self.count(&criteria).await?)),
        }
    }
}
