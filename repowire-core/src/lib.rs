pub mod beans;
pub mod config;
pub mod logging;
pub mod prelude;

pub use beans::{Bean, BeanContext, BeanError, BeanRegistry, Producer};
pub use config::{ConfigError, RepowireConfig};
pub use logging::{init_tracing, init_tracing_with};
