//! # repowire-data
//!
//! Read-only entity repositories that resolve their persistence engine from
//! a shared [`ManagerRegistry`] on every call.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Entity`] / [`EntityType`] | Entity metadata and row hydration |
//! | [`GenericRepository`] | `find`, `find_all`, `find_by`, `find_one_by`, `count`, dynamic finders |
//! | [`EntityRepository`] | Trait implemented by declared repositories |
//! | [`QueryBuilder`] | Engine-neutral SELECT builder |
//! | [`ManagerRegistry`] / [`ObjectManager`] / [`EntityRepositoryHandle`] | Engine seams |
//! | [`ManagerRouter`] | Default registry with per-entity routes |
//! | [`InMemoryManager`] | In-memory engine |

pub mod criteria;
pub mod entity;
pub mod error;
pub mod finder;
pub mod handle;
pub mod memory;
pub mod page;
pub mod query;
pub mod registry;
pub mod repository;
pub mod value;

pub use criteria::{Criteria, Direction, OrderBy};
pub use entity::{Entity, EntityType};
pub use error::DataError;
pub use finder::{FinderKind, FinderOutput, MagicFinder};
pub use handle::EntityRepositoryHandle;
pub use memory::{InMemoryManager, InMemoryStore};
pub use page::{Page, Pageable};
pub use query::{Condition, Dialect, IdentifierPolicy, QueryBuilder, QueryError, DEFAULT_ALIAS};
pub use registry::{ManagerRegistry, ManagerRouter, ObjectManager, SharedRegistry};
pub use repository::{EntityRepository, GenericRepository};
pub use value::{FromValue, Row, Value};

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::{
        Criteria, DataError, Direction, Entity, EntityRepository, FinderOutput, GenericRepository,
        ManagerRouter, OrderBy, Page, Pageable, QueryBuilder, Row, SharedRegistry, Value,
    };
}

#[doc(hidden)]
pub mod __private {
    pub use repowire_core::{Bean, BeanContext, BeanError};
}
