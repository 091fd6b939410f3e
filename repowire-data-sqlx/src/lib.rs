//! # repowire-data-sqlx
//!
//! SQL engine for repowire repositories, built on `sqlx::AnyPool`.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SqlxManager`] | `ObjectManager` owning one connection pool |
//! | [`SqlxEntityRepository`] | Renders `QueryBuilder`s to quoted, parameterised SQL |
//! | [`DataSettings`] | The `data.*` configuration section |
//! | [`SqlxRegistryProducer`] | Bean producer building the `SharedRegistry` from config |
//! | [`SqlxErrorExt`] | `sqlx::Error` → `DataError` (`.into_data_error()`) |
//!
//! # Feature flags
//!
//! | Feature    | Driver |
//! |------------|--------|
//! | `sqlite`   | SQLite via `sqlx/sqlite` |
//! | `postgres` | PostgreSQL via `sqlx/postgres` |
//! | `mysql`    | MySQL via `sqlx/mysql` |
//!
//! The dialect (placeholders and identifier quoting) is picked from each
//! manager's URL scheme.

pub mod error;
pub mod manager;
pub mod producer;
pub mod repository;
pub mod settings;

pub use error::{SqlxErrorExt, SqlxResult};
pub use manager::{dialect_for_url, SqlxManager};
pub use producer::{connect_registry, SqlxRegistryProducer};
pub use repository::SqlxEntityRepository;
pub use settings::{DataSettings, ManagerSettings};

/// Re-exports of the most commonly used types from both `repowire-data` and this crate.
pub mod prelude {
    pub use crate::{SqlxErrorExt, SqlxManager, SqlxRegistryProducer};
    pub use repowire_data::prelude::*;
}
