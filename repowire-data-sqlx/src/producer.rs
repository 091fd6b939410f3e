use std::any::{type_name, TypeId};
use std::sync::Arc;

use repowire_core::{BeanContext, BeanError, Producer, RepowireConfig};
use repowire_data::{DataError, ManagerRouter, SharedRegistry};

use crate::manager::SqlxManager;
use crate::settings::DataSettings;

/// Connect every configured manager and assemble a [`ManagerRouter`].
pub async fn connect_registry(settings: &DataSettings) -> Result<ManagerRouter, DataError> {
    let mut router = ManagerRouter::new();
    for manager in &settings.managers {
        router.add_manager(Arc::new(SqlxManager::connect(manager).await?));
    }
    if let Some(default) = &settings.default {
        router = router.with_default(default);
    }
    for (entity, manager) in &settings.routes {
        router.route(entity, manager);
    }
    Ok(router)
}

/// Produces the process-wide [`SharedRegistry`] from the `data` section of
/// [`RepowireConfig`].
///
/// ```ignore
/// let mut beans = BeanRegistry::new();
/// beans.provide(RepowireConfig::load("dev")?);
/// beans.register_producer::<SqlxRegistryProducer>();
/// beans.register::<UserRepository>();
/// let ctx = beans.resolve().await?;
/// ```
pub struct SqlxRegistryProducer;

impl Producer for SqlxRegistryProducer {
    type Output = SharedRegistry;

    fn dependencies() -> Vec<(TypeId, &'static str)> {
        vec![(TypeId::of::<RepowireConfig>(), type_name::<RepowireConfig>())]
    }

    async fn produce(ctx: &BeanContext) -> Result<SharedRegistry, BeanError> {
        let config: RepowireConfig = ctx.get()?;
        let settings = DataSettings::from_config(&config).map_err(BeanError::construction::<Self>)?;
        let router = connect_registry(&settings)
            .await
            .map_err(BeanError::construction::<Self>)?;
        Ok(Arc::new(router))
    }
}
