extern crate proc_macro;
use proc_macro::TokenStream;

pub(crate) mod crate_path;
pub(crate) mod entity_derive;
pub(crate) mod repository_derive;

/// Derive macro implementing `Entity` for a struct with named fields.
///
/// # Attributes
///
/// | Attribute | Scope | Description |
/// |-----------|-------|-------------|
/// | `#[entity(table = "...", name = "...")]` | struct | Table (default: snake_case of the type) and entity name (default: the type name) |
/// | `#[id]` | field | Identifier column; several fields form a composite identifier. Defaults to a field named `id` |
/// | `#[column("...")]` | field | Column name when it differs from the field name |
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Clone, Entity)]
/// #[entity(table = "users")]
/// pub struct User {
///     #[id]
///     pub id: i64,
///     #[column("display_name")]
///     pub name: String,
/// }
///
/// // Generated: `UserFinders`, implemented for every repository of `User`.
/// let admins = users.find_by_name("ada").await?;
/// let total = users.count_by_name("ada").await?;
/// ```
///
/// # What is generated
///
/// - `impl Entity for User`: metadata plus `from_row`, reading each field
///   with `Row::get`.
/// - `trait UserFinders`: `find_by_<field>`, `find_one_by_<field>` and
///   `count_by_<field>` for every field, blanket-implemented for every
///   `EntityRepository<Entity = User>`.
#[proc_macro_derive(Entity, attributes(entity, id, column))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    entity_derive::expand(input)
}

/// Derive macro declaring a repository around a `GenericRepository<E>`.
///
/// The struct must have exactly one field, of type `GenericRepository<E>`,
/// and derive `Clone`.
///
/// # Example
///
/// ```ignore
/// #[derive(Clone, EntityRepository)]
/// pub struct UserRepository(GenericRepository<User>);
///
/// let users = UserRepository::new(registry)?;
/// let user = users.find(1).await?;
/// ```
///
/// # What is generated
///
/// - `impl EntityRepository for UserRepository` with `Entity = User`.
/// - `UserRepository::new(registry)`, failing with a configuration error
///   when `User` is malformed.
/// - `impl Bean for UserRepository`, built from the container's
///   `SharedRegistry`.
#[proc_macro_derive(EntityRepository)]
pub fn derive_entity_repository(input: TokenStream) -> TokenStream {
    repository_derive::expand(input)
}
