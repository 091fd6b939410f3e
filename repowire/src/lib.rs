//! repowire: autowired, read-only entity repositories.
//!
//! A repository declares the entity it manages and gets `find`, `find_all`,
//! `find_by`, `find_one_by`, `count`, query builders and dynamic finders.
//! The persistence engine is looked up in the shared manager registry on
//! every call.
//!
//! ```ignore
//! use repowire::prelude::*;
//!
//! #[derive(Debug, Clone, Entity)]
//! #[entity(table = "users")]
//! pub struct User {
//!     #[id]
//!     pub id: i64,
//!     pub name: String,
//! }
//!
//! #[derive(Clone, EntityRepository)]
//! pub struct UserRepository(GenericRepository<User>);
//!
//! let users = UserRepository::new(registry)?;
//! let ada = users.find_one_by_name("ada").await?;
//! ```
//!
//! # Feature flags
//!
//! | Feature     | Default | Crate                         |
//! |-------------|---------|-------------------------------|
//! | `data-sqlx` | no      | `repowire-data-sqlx`          |
//! | `sqlite`    | no      | `repowire-data-sqlx/sqlite`   |
//! | `postgres`  | no      | `repowire-data-sqlx/postgres` |
//! | `mysql`     | no      | `repowire-data-sqlx/mysql`    |
//! | `full`      | no      | All of the above              |

// Lets generated code name `::repowire` from inside this package's tests.
extern crate self as repowire;

pub extern crate repowire_core;
pub extern crate repowire_data;
pub extern crate repowire_macros;

// Re-export everything from repowire-core at the top level for convenience.
pub use repowire_core::*;

pub use repowire_macros::{Entity, EntityRepository};

#[cfg(feature = "data-sqlx")]
pub use repowire_data_sqlx;

pub mod prelude {
    //! Everything needed to declare entities and repositories.
    pub use repowire_core::prelude::*;
    pub use repowire_data::prelude::*;
    pub use repowire_macros::{Entity, EntityRepository};

    #[cfg(feature = "data-sqlx")]
    pub use repowire_data_sqlx::{SqlxErrorExt, SqlxManager, SqlxRegistryProducer};
}
