use std::sync::Arc;

use dashmap::DashMap;

use crate::entity::EntityType;
use crate::error::DataError;
use crate::handle::EntityRepositoryHandle;

/// Resolves the manager responsible for an entity type.
///
/// Consulted on every repository operation, so implementations may change
/// their answer at any time.
pub trait ManagerRegistry: Send + Sync {
    fn manager_for_type(&self, entity: &EntityType) -> Option<Arc<dyn ObjectManager>>;
}

/// A persistence engine instance (one connection pool, one store, ...).
pub trait ObjectManager: Send + Sync {
    fn name(&self) -> &str;

    fn repository_for_type(
        &self,
        entity: &EntityType,
    ) -> Result<Arc<dyn EntityRepositoryHandle>, DataError>;
}

/// The registry shared by every repository of the process.
pub type SharedRegistry = Arc<dyn ManagerRegistry>;

/// Default [`ManagerRegistry`]: named managers, per-entity routes and an
/// optional fallback manager.
///
/// Routes are keyed by entity name (case-insensitive) and can be changed
/// while repositories are in use.
#[derive(Default)]
pub struct ManagerRouter {
    managers: DashMap<String, Arc<dyn ObjectManager>>,
    routes: DashMap<String, String>,
    default_manager: Option<String>,
}

impl ManagerRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a manager under its own name.
    pub fn with_manager(self, manager: Arc<dyn ObjectManager>) -> Self {
        self.add_manager(manager);
        self
    }

    /// Manager used for entities without an explicit route.
    pub fn with_default(mut self, name: &str) -> Self {
        self.default_manager = Some(name.to_string());
        self
    }

    pub fn add_manager(&self, manager: Arc<dyn ObjectManager>) {
        tracing::debug!(manager = manager.name(), "registering object manager");
        self.managers.insert(manager.name().to_string(), manager);
    }

    /// Route an entity to a named manager, replacing any previous route.
    pub fn route(&self, entity_name: &str, manager: &str) {
        tracing::debug!(entity = entity_name, manager, "routing entity");
        self.routes
            .insert(entity_name.to_ascii_lowercase(), manager.to_string());
    }

    pub fn unroute(&self, entity_name: &str) {
        self.routes.remove(&entity_name.to_ascii_lowercase());
    }

    pub fn manager(&self, name: &str) -> Option<Arc<dyn ObjectManager>> {
        self.managers.get(name).map(|m| Arc::clone(m.value()))
    }

    pub fn manager_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.managers.iter().map(|m| m.key().clone()).collect();
        names.sort();
        names
    }

    pub fn default_manager(&self) -> Option<&str> {
        self.default_manager.as_deref()
    }
}

impl ManagerRegistry for ManagerRouter {
    fn manager_for_type(&self, entity: &EntityType) -> Option<Arc<dyn ObjectManager>> {
        let routed = self
            .routes
            .get(&entity.name.to_ascii_lowercase())
            .map(|r| r.value().clone());
        let name = routed.or_else(|| self.default_manager.clone())?;
        let manager = self.manager(&name);
        if manager.is_none() {
            tracing::warn!(entity = entity.name, manager = %name, "route points to an unknown manager");
        }
        manager
    }
}
