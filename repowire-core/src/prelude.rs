//! Re-exports of the most commonly used core types.

pub use crate::beans::{Bean, BeanContext, BeanError, BeanRegistry, Producer};
pub use crate::config::{ConfigError, RepowireConfig};
pub use crate::logging::init_tracing;
