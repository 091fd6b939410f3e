use std::any::{type_name, TypeId};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexMap;
use repowire_core::{Bean, BeanContext, BeanError};

use crate::criteria::{Criteria, OrderBy};
use crate::entity::{Entity, EntityType};
use crate::error::DataError;
use crate::finder::FinderOutput;
use crate::handle::EntityRepositoryHandle;
use crate::page::{Page, Pageable};
use crate::query::{QueryBuilder, QueryError};
use crate::registry::{ObjectManager, SharedRegistry};
use crate::value::{Row, Value};

/// Read-only repository for one entity type.
///
/// Holds nothing but the entity descriptor and the shared registry: the
/// manager and the engine repository are looked up again on every
/// operation, so re-routing an entity in the registry takes effect on the
/// next call.
///
/// # Example
///
/// ```ignore
/// let users = GenericRepository::<User>::new(registry)?;
/// let alice = users.find(1).await?;
/// let admins = users
///     .find_by(&Criteria::new().with("role", "admin"), Some(&OrderBy::asc("name")), None, None)
///     .await?;
/// ```
pub struct GenericRepository<T: Entity> {
    entity: EntityType,
    registry: SharedRegistry,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for GenericRepository<T> {
    fn clone(&self) -> Self {
        Self {
            entity: self.entity,
            registry: Arc::clone(&self.registry),
            _marker: PhantomData,
        }
    }
}

impl<T: Entity> fmt::Debug for GenericRepository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericRepository")
            .field("entity", &self.entity.name)
            .field("table", &self.entity.table)
            .finish_non_exhaustive()
    }
}

impl<T: Entity> GenericRepository<T> {
    /// Bind a repository for `T` to the shared registry.
    ///
    /// # Errors
    ///
    /// `DataError::Configuration` if `T`'s declaration is malformed,
    /// whatever the registry contains.
    pub fn new(registry: SharedRegistry) -> Result<Self, DataError> {
        let entity = T::metadata();
        entity.validate()?;
        tracing::debug!(entity = entity.name, table = entity.table, "repository bound");
        Ok(Self {
            entity,
            registry,
            _marker: PhantomData,
        })
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity
    }

    pub fn entity_name(&self) -> &'static str {
        self.entity.name
    }

    pub fn table_name(&self) -> &'static str {
        self.entity.table
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// The manager currently responsible for the entity.
    pub fn resolve_manager(&self) -> Result<Arc<dyn ObjectManager>, DataError> {
        self.registry
            .manager_for_type(&self.entity)
            .ok_or_else(|| {
                DataError::configuration(format!(
                    "no object manager is registered for entity '{}'",
                    self.entity.name
                ))
            })
    }

    /// The engine repository for the entity, resolved afresh.
    pub fn resolve_repository(&self) -> Result<Arc<dyn EntityRepositoryHandle>, DataError> {
        let manager = self.resolve_manager()?;
        tracing::trace!(entity = self.entity.name, manager = manager.name(), "resolving repository");
        manager.repository_for_type(&self.entity)
    }

    fn handle(&self, operation: &'static str) -> Result<Arc<dyn EntityRepositoryHandle>, DataError> {
        let handle = self.resolve_repository()?;
        tracing::debug!(entity = self.entity.name, operation, "delegating");
        Ok(handle)
    }

    fn hydrate(rows: Vec<Row>) -> Result<Vec<T>, DataError> {
        rows.iter().map(T::from_row).collect()
    }

    /// A query builder scoped to the entity's table. `alias` and `index_by`
    /// are passed through untouched; the engine validates them on execution.
    pub fn create_query_builder(
        &self,
        alias: &str,
        index_by: Option<&str>,
    ) -> Result<QueryBuilder, DataError> {
        Ok(self
            .handle("create_query_builder")?
            .create_query_builder(alias, index_by))
    }

    /// Entity by identifier, `None` when absent. Composite identifiers are
    /// passed as a list in identifier-column order.
    pub fn find(
        &self,
        id: impl Into<Value>,
    ) -> impl Future<Output = Result<Option<T>, DataError>> + Send + '_ {
        let id = id.into();
        async move {
            let row = self.handle("find")?.find(&id).await?;
            row.as_ref().map(T::from_row).transpose()
        }
    }

    pub async fn find_all(&self) -> Result<Vec<T>, DataError> {
        let rows = self.handle("find_all")?.find_all().await?;
        Self::hydrate(rows)
    }

    /// Entities matching every `field = value` pair of `criteria`.
    pub async fn find_by(
        &self,
        criteria: &Criteria,
        order_by: Option<&OrderBy>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<T>, DataError> {
        let rows = self
            .handle("find_by")?
            .find_by(criteria, order_by, limit, offset)
            .await?;
        Self::hydrate(rows)
    }

    /// First entity matching `criteria` under `order_by`, `None` when
    /// nothing matches.
    pub async fn find_one_by(
        &self,
        criteria: &Criteria,
        order_by: Option<&OrderBy>,
    ) -> Result<Option<T>, DataError> {
        let row = self
            .handle("find_one_by")?
            .find_one_by(criteria, order_by)
            .await?;
        row.as_ref().map(T::from_row).transpose()
    }

    pub async fn count(&self, criteria: &Criteria) -> Result<u64, DataError> {
        self.handle("count")?.count(criteria).await
    }

    /// Forward a dynamic finder (`findByName`, `count_by_email`, ...) to the
    /// engine.
    pub async fn call(&self, method: &str, args: &[Value]) -> Result<FinderOutput<T>, DataError> {
        let output = self.handle("call")?.call(method, args).await?;
        output.try_map(|row| T::from_row(&row))
    }

    /// Execute a builder obtained from
    /// [`create_query_builder`](Self::create_query_builder).
    pub async fn fetch(&self, query: &QueryBuilder) -> Result<Vec<T>, DataError> {
        let rows = self.handle("fetch")?.fetch(query).await?;
        Self::hydrate(rows)
    }

    /// Execute a builder and key the results by its index field, in result
    /// order. Later rows replace earlier ones with the same key.
    pub async fn fetch_indexed(&self, query: &QueryBuilder) -> Result<IndexMap<String, T>, DataError> {
        let handle = self.handle("fetch_indexed")?;
        let field = query
            .index_field()
            .map(|f| query.field_name(f))
            .ok_or(QueryError::MissingIndexField)?;
        let rows = handle.fetch(query).await?;
        // Rows are keyed by column; the engine has already rejected unknown names.
        let column = self.entity.column_for(field).unwrap_or(field);
        let mut indexed = IndexMap::with_capacity(rows.len());
        for row in rows {
            let key = row.value(column).to_string();
            indexed.insert(key, T::from_row(&row)?);
        }
        Ok(indexed)
    }

    /// One page of entities matching `criteria`, sorted by `pageable.sort`.
    pub async fn find_by_paged(&self, criteria: &Criteria, pageable: &Pageable) -> Result<Page<T>, DataError> {
        let order = pageable.order_by()?;
        let offset = pageable.offset()?;
        let total = self.count(criteria).await?;
        let content = self
            .find_by(criteria, order.as_ref(), Some(pageable.size), Some(offset))
            .await?;
        Ok(Page::new(content, pageable, total))
    }
}

/// Surface shared by every declared repository.
///
/// Implementors only provide [`repository`](Self::repository); every
/// operation delegates to the wrapped [`GenericRepository`]. Usually derived:
///
/// ```ignore
/// #[derive(Clone, EntityRepository)]
/// pub struct UserRepository(GenericRepository<User>);
/// ```
pub trait EntityRepository: Send + Sync {
    type Entity: Entity;

    fn repository(&self) -> &GenericRepository<Self::Entity>;

    fn entity_name(&self) -> &'static str {
        self.repository().entity_name()
    }

    fn table_name(&self) -> &'static str {
        self.repository().table_name()
    }

    fn create_query_builder(
        &self,
        alias: &str,
        index_by: Option<&str>,
    ) -> Result<QueryBuilder, DataError> {
        self.repository().create_query_builder(alias, index_by)
    }

    fn find(
        &self,
        id: impl Into<Value>,
    ) -> impl Future<Output = Result<Option<Self::Entity>, DataError>> + Send {
        self.repository().find(id)
    }

    fn find_all(&self) -> impl Future<Output = Result<Vec<Self::Entity>, DataError>> + Send {
        self.repository().find_all()
    }

    fn find_by(
        &self,
        criteria: &Criteria,
        order_by: Option<&OrderBy>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> impl Future<Output = Result<Vec<Self::Entity>, DataError>> + Send {
        self.repository().find_by(criteria, order_by, limit, offset)
    }

    fn find_one_by(
        &self,
        criteria: &Criteria,
        order_by: Option<&OrderBy>,
    ) -> impl Future<Output = Result<Option<Self::Entity>, DataError>> + Send {
        self.repository().find_one_by(criteria, order_by)
    }

    fn count(&self, criteria: &Criteria) -> impl Future<Output = Result<u64, DataError>> + Send {
        self.repository().count(criteria)
    }

    fn call(
        &self,
        method: &str,
        args: &[Value],
    ) -> impl Future<Output = Result<FinderOutput<Self::Entity>, DataError>> + Send {
        self.repository().call(method, args)
    }

    fn fetch(
        &self,
        query: &QueryBuilder,
    ) -> impl Future<Output = Result<Vec<Self::Entity>, DataError>> + Send {
        self.repository().fetch(query)
    }

    fn fetch_indexed(
        &self,
        query: &QueryBuilder,
    ) -> impl Future<Output = Result<IndexMap<String, Self::Entity>, DataError>> + Send {
        self.repository().fetch_indexed(query)
    }

    fn find_by_paged(
        &self,
        criteria: &Criteria,
        pageable: &Pageable,
    ) -> impl Future<Output = Result<Page<Self::Entity>, DataError>> + Send {
        self.repository().find_by_paged(criteria, pageable)
    }
}

impl<T: Entity> EntityRepository for GenericRepository<T> {
    type Entity = T;

    fn repository(&self) -> &GenericRepository<T> {
        self
    }
}

impl<T: Entity> Bean for GenericRepository<T> {
    fn dependencies() -> Vec<(TypeId, &'static str)> {
        vec![(TypeId::of::<SharedRegistry>(), type_name::<SharedRegistry>())]
    }

    fn build(ctx: &BeanContext) -> Result<Self, BeanError> {
        let registry: SharedRegistry = ctx.get()?;
        Self::new(registry).map_err(BeanError::construction::<Self>)
    }
}
