#![allow(dead_code)]

use std::sync::Arc;

use repowire_data::{
    DataError, Entity, InMemoryManager, InMemoryStore, ManagerRouter, Row, SharedRegistry,
};

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
}

impl User {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

impl Entity for User {
    fn entity_name() -> &'static str {
        "User"
    }
    fn table_name() -> &'static str {
        "users"
    }
    fn id_columns() -> &'static [&'static str] {
        &["id"]
    }
    fn columns() -> &'static [&'static str] {
        &["id", "name"]
    }
    fn from_row(row: &Row) -> Result<Self, DataError> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    }
}

pub fn user_row(id: i64, name: &str) -> Row {
    Row::new().with("id", id).with("name", name)
}

/// Router with a single in-memory manager named `primary` as default.
pub fn memory_registry() -> (Arc<ManagerRouter>, InMemoryStore) {
    let store = InMemoryStore::new();
    let router = ManagerRouter::new()
        .with_manager(Arc::new(InMemoryManager::new("primary", store.clone())))
        .with_default("primary");
    (Arc::new(router), store)
}

pub fn shared(router: &Arc<ManagerRouter>) -> SharedRegistry {
    router.clone()
}
