use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use repowire_data::{DataError, Dialect, EntityRepositoryHandle, EntityType, ObjectManager};
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use crate::error::SqlxErrorExt;
use crate::repository::SqlxEntityRepository;
use crate::settings::ManagerSettings;

/// [`ObjectManager`] backed by an `sqlx::AnyPool`.
#[derive(Clone)]
pub struct SqlxManager {
    name: String,
    pool: AnyPool,
    dialect: Dialect,
}

impl fmt::Debug for SqlxManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlxManager")
            .field("name", &self.name)
            .field("dialect", &self.dialect)
            .finish_non_exhaustive()
    }
}

impl SqlxManager {
    /// Open a pool for `settings.url`. The SQL dialect follows the URL scheme.
    pub async fn connect(settings: &ManagerSettings) -> Result<Self, DataError> {
        sqlx::any::install_default_drivers();

        let mut options = AnyPoolOptions::new().max_connections(settings.connections.max(1));
        if settings.url.contains(":memory:") {
            // An in-memory SQLite database lives only as long as its one connection.
            options = options
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        }
        let pool = options
            .connect(&settings.url)
            .await
            .map_err(|e| e.into_data_error())?;

        tracing::info!(manager = %settings.name, dialect = ?dialect_for_url(&settings.url), "connected");
        Ok(Self::from_pool(&settings.name, pool, dialect_for_url(&settings.url)))
    }

    pub fn from_pool(name: &str, pool: AnyPool, dialect: Dialect) -> Self {
        Self {
            name: name.to_string(),
            pool,
            dialect,
        }
    }

    /// Get the underlying pool reference.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }
}

impl ObjectManager for SqlxManager {
    fn name(&self) -> &str {
        &self.name
    }

    fn repository_for_type(
        &self,
        entity: &EntityType,
    ) -> Result<Arc<dyn EntityRepositoryHandle>, DataError> {
        Ok(Arc::new(SqlxEntityRepository::new(
            *entity,
            self.pool.clone(),
            self.dialect,
        )))
    }
}

/// SQL dialect implied by a connection URL scheme.
pub fn dialect_for_url(url: &str) -> Dialect {
    let scheme = url.split(':').next().unwrap_or_default();
    match scheme {
        "postgres" | "postgresql" => Dialect::Postgres,
        "mysql" | "mariadb" => Dialect::MySql,
        "sqlite" => Dialect::Sqlite,
        _ => Dialect::Generic,
    }
}
