mod common;

use std::sync::Arc;

use common::{memory_registry, shared, user_row, User};
use repowire_data::{
    Criteria, DataError, Direction, Entity, EntityRepository, EntityRepositoryHandle, EntityType,
    FinderOutput, GenericRepository, InMemoryManager, InMemoryStore, ManagerRouter,
    ObjectManager, OrderBy, Pageable, QueryError, Row, Value,
};

async fn seeded_users() -> (GenericRepository<User>, InMemoryStore) {
    let (router, store) = memory_registry();
    store.load("users", [user_row(1, "a"), user_row(2, "b")]);
    let repo = GenericRepository::<User>::new(shared(&router)).unwrap();
    (repo, store)
}

#[tokio::test]
async fn user_scenario() {
    let (users, _) = seeded_users().await;

    assert_eq!(users.find(2).await.unwrap(), Some(User::new(2, "b")));
    assert_eq!(users.find(99).await.unwrap(), None);
    assert_eq!(
        users.find_all().await.unwrap(),
        vec![User::new(1, "a"), User::new(2, "b")]
    );
    assert_eq!(
        users
            .find_by(&Criteria::new().with("name", "a"), None, None, None)
            .await
            .unwrap(),
        vec![User::new(1, "a")]
    );
    assert_eq!(
        users
            .find_one_by(&Criteria::new().with("name", "z"), None)
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn find_by_empty_criteria_equals_find_all() {
    let (users, store) = seeded_users().await;
    store.insert("users", user_row(3, "c"));

    let all = users.find_all().await.unwrap();
    let by_nothing = users.find_by(&Criteria::new(), None, None, None).await.unwrap();
    assert_eq!(all, by_nothing);

    let order = OrderBy::desc("id");
    let paged = users
        .find_by(&Criteria::new(), Some(&order), Some(2), Some(1))
        .await
        .unwrap();
    assert_eq!(paged, vec![User::new(2, "b"), User::new(1, "a")]);
}

#[tokio::test]
async fn find_all_sees_rows_inserted_between_calls() {
    let (users, store) = seeded_users().await;
    assert_eq!(users.find_all().await.unwrap().len(), 2);
    store.insert("users", user_row(3, "c"));
    assert_eq!(users.find_all().await.unwrap().len(), 3);
    store.clear("users");
    assert!(users.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn find_one_by_returns_first_under_ordering() {
    let (router, store) = memory_registry();
    store.load(
        "users",
        [user_row(1, "same"), user_row(2, "same"), user_row(3, "same")],
    );
    let users = GenericRepository::<User>::new(shared(&router)).unwrap();
    let criteria = Criteria::new().with("name", "same");

    let first = users.find_one_by(&criteria, None).await.unwrap();
    assert_eq!(first, Some(User::new(1, "same")));

    let last = users
        .find_one_by(&criteria, Some(&OrderBy::new().then("id", Direction::Desc)))
        .await
        .unwrap();
    assert_eq!(last, Some(User::new(3, "same")));
}

#[tokio::test]
async fn criteria_support_null_and_in() {
    let (router, store) = memory_registry();
    store.load(
        "users",
        [
            user_row(1, "a"),
            Row::new().with("id", 2).with("name", Value::Null),
            user_row(3, "c"),
        ],
    );
    let users = GenericRepository::<User>::new(shared(&router)).unwrap();

    let ids = users
        .find_by(&Criteria::new().with("id", vec![1, 3]), None, None, None)
        .await
        .unwrap();
    assert_eq!(ids.len(), 2);

    assert_eq!(
        users.count(&Criteria::new().with("name", Value::Null)).await.unwrap(),
        1
    );
    // The unnamed row cannot hydrate into `User`.
    let err = users.find(2).await.unwrap_err();
    assert!(matches!(err, DataError::Mapping(_)), "{err}");
}

#[tokio::test]
async fn unknown_fields_are_query_errors() {
    let (users, _) = seeded_users().await;

    let err = users
        .find_by(&Criteria::new().with("age", 3), None, None, None)
        .await
        .unwrap_err();
    assert!(
        matches!(&err, DataError::Query(QueryError::UnknownField { field, .. }) if field == "age"),
        "{err}"
    );

    let err = users
        .find_one_by(&Criteria::new(), Some(&OrderBy::asc("created_at")))
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::Query(_)));
}

#[tokio::test]
async fn routing_is_resolved_on_every_call() {
    let primary = InMemoryStore::new();
    primary.insert("users", user_row(1, "from-primary"));
    let secondary = InMemoryStore::new();
    secondary.insert("users", user_row(1, "from-secondary"));

    let router = Arc::new(
        ManagerRouter::new()
            .with_manager(Arc::new(InMemoryManager::new("primary", primary)))
            .with_manager(Arc::new(InMemoryManager::new("secondary", secondary))),
    );
    router.route("User", "primary");
    let users = GenericRepository::<User>::new(shared(&router)).unwrap();

    assert_eq!(users.find(1).await.unwrap().unwrap().name, "from-primary");
    router.route("user", "secondary");
    assert_eq!(users.find(1).await.unwrap().unwrap().name, "from-secondary");
    assert_eq!(users.resolve_manager().unwrap().name(), "secondary");

    router.unroute("User");
    let err = users.find_all().await.unwrap_err();
    assert!(err.is_configuration(), "{err}");
}

#[tokio::test]
async fn route_to_unknown_manager_is_a_configuration_error() {
    let (router, _) = memory_registry();
    router.route("User", "missing");
    let users = GenericRepository::<User>::new(shared(&router)).unwrap();
    assert!(matches!(
        users.find(1).await.unwrap_err(),
        DataError::Configuration(msg) if msg.contains("User")
    ));
}

struct Misdeclared;

impl Entity for Misdeclared {
    fn entity_name() -> &'static str {
        "Misdeclared"
    }
    fn table_name() -> &'static str {
        "misdeclared"
    }
    fn id_columns() -> &'static [&'static str] {
        &["uuid"]
    }
    fn columns() -> &'static [&'static str] {
        &["id"]
    }
    fn from_row(_row: &Row) -> Result<Self, DataError> {
        Ok(Self)
    }
}

#[test]
fn misdeclared_entity_fails_whatever_the_registry() {
    let (router, _) = memory_registry();
    let empty = Arc::new(ManagerRouter::new());
    for registry in [shared(&router), shared(&empty)] {
        let err = GenericRepository::<Misdeclared>::new(registry).unwrap_err();
        assert!(
            matches!(&err, DataError::Configuration(msg) if msg.contains("Misdeclared")),
            "{err}"
        );
    }
}

#[tokio::test]
async fn magic_finders_match_explicit_calls() {
    let (users, store) = seeded_users().await;
    store.insert("users", user_row(3, "a"));

    let explicit = users
        .find_by(&Criteria::new().with("name", "a"), None, None, None)
        .await
        .unwrap();
    let magic = users.call("findByName", &[Value::from("a")]).await.unwrap();
    assert_eq!(magic, FinderOutput::Many(explicit));

    let one = users.call("find_one_by_id", &[Value::Int(2)]).await.unwrap();
    assert_eq!(one, FinderOutput::One(Some(User::new(2, "b"))));

    let count = users.call("countByName", &[Value::from("a")]).await.unwrap();
    assert_eq!(count.count(), Some(2));
}

#[tokio::test]
async fn unknown_magic_finder_is_not_supported() {
    let (users, _) = seeded_users().await;

    let err = users.call("findByAge", &[Value::Int(3)]).await.unwrap_err();
    assert!(
        matches!(&err, DataError::MethodNotSupported { entity, method } if entity == "User" && method == "findByAge"),
        "{err}"
    );
    assert!(matches!(
        users.call("explode", &[]).await.unwrap_err(),
        DataError::MethodNotSupported { .. }
    ));

    let err = users.call("findByName", &[]).await.unwrap_err();
    assert!(matches!(
        err,
        DataError::Query(QueryError::InvalidArguments { expected: 1, found: 0, .. })
    ));
}

#[tokio::test]
async fn query_builders_can_be_fetched_and_indexed() {
    let (users, store) = seeded_users().await;
    store.insert("users", user_row(3, "carol"));

    let qb = users
        .create_query_builder("u", Some("u.name"))
        .unwrap()
        .where_like("u.name", "c%")
        .order_by("id", Direction::Asc);
    assert_eq!(qb.table(), "users");
    assert_eq!(qb.alias(), "u");

    let indexed = users.fetch_indexed(&qb).await.unwrap();
    assert_eq!(indexed.keys().collect::<Vec<_>>(), vec!["carol"]);

    let by_id = users
        .fetch_indexed(&users.create_query_builder("u", Some("id")).unwrap())
        .await
        .unwrap();
    assert_eq!(by_id.get("2"), Some(&User::new(2, "b")));

    let unindexed = users.create_query_builder("u", None).unwrap();
    assert_eq!(users.fetch(&unindexed).await.unwrap().len(), 3);
    assert!(matches!(
        users.fetch_indexed(&unindexed).await.unwrap_err(),
        DataError::Query(QueryError::MissingIndexField)
    ));
}

#[tokio::test]
async fn create_query_builder_does_not_validate_alias() {
    let (users, _) = seeded_users().await;
    let qb = users.create_query_builder("not an alias", Some("nope")).unwrap();
    assert_eq!(qb.index_field(), Some("nope"));
    assert!(users.fetch(&qb).await.is_err());
}

#[tokio::test]
async fn paging_counts_and_sorts() {
    let (router, store) = memory_registry();
    store.load("users", (1..=5).map(|i| user_row(i, &format!("u{i}"))));
    let users = GenericRepository::<User>::new(shared(&router)).unwrap();

    let page = users
        .find_by_paged(&Criteria::new(), &Pageable::new(1, 2).sorted("id,desc"))
        .await
        .unwrap();
    assert_eq!(page.total_elements, 5);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.content, vec![User::new(3, "u3"), User::new(2, "u2")]);
}

#[tokio::test]
async fn paging_rejects_out_of_range_pages() {
    let (users, _) = seeded_users().await;

    let err = users
        .find_by_paged(&Criteria::new(), &Pageable::new(u64::MAX / 2, 20))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DataError::Query(QueryError::PageOutOfRange { size: 20, .. })
    ));

    let err = users
        .find_by_paged(&Criteria::new(), &Pageable::new(0, 2).sorted("id,upwards"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DataError::Query(QueryError::InvalidSortDirection { .. })
    ));
}

#[tokio::test]
async fn unbounded_limits_return_every_row() {
    let (users, _) = seeded_users().await;
    let all = users
        .find_by(&Criteria::new(), None, Some(u64::MAX), None)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    let none = users
        .find_by(&Criteria::new(), None, None, Some(u64::MAX))
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[derive(Debug, PartialEq)]
struct Account {
    id: i64,
    email: String,
}

impl Entity for Account {
    fn entity_name() -> &'static str {
        "Account"
    }
    fn table_name() -> &'static str {
        "accounts"
    }
    fn id_columns() -> &'static [&'static str] {
        &["id"]
    }
    fn columns() -> &'static [&'static str] {
        &["id", "email_address"]
    }
    fn fields() -> &'static [&'static str] {
        &["id", "email"]
    }
    fn from_row(row: &Row) -> Result<Self, DataError> {
        Ok(Self {
            id: row.get("id")?,
            email: row.get("email_address")?,
        })
    }
}

#[tokio::test]
async fn criteria_and_finders_use_field_names() {
    let (router, store) = memory_registry();
    store.load(
        "accounts",
        [
            Row::new().with("id", 1).with("email_address", "b@x"),
            Row::new().with("id", 2).with("email_address", "a@x"),
        ],
    );
    let accounts = GenericRepository::<Account>::new(shared(&router)).unwrap();

    let by_field = accounts
        .find_by(&Criteria::new().with("email", "a@x"), None, None, None)
        .await
        .unwrap();
    assert_eq!(by_field.iter().map(|a| a.id).collect::<Vec<_>>(), vec![2]);
    assert_eq!(
        accounts.call("findByEmail", &[Value::from("a@x")]).await.unwrap(),
        FinderOutput::Many(by_field)
    );
    // The storage column name still resolves.
    assert_eq!(
        accounts
            .count(&Criteria::new().with("email_address", "a@x"))
            .await
            .unwrap(),
        1
    );

    let sorted = accounts
        .find_by(&Criteria::new(), Some(&OrderBy::asc("email")), None, None)
        .await
        .unwrap();
    assert_eq!(sorted.iter().map(|a| a.id).collect::<Vec<_>>(), vec![2, 1]);

    let qb = accounts.create_query_builder("a", Some("a.email")).unwrap();
    let indexed = accounts.fetch_indexed(&qb).await.unwrap();
    assert_eq!(indexed.keys().collect::<Vec<_>>(), vec!["b@x", "a@x"]);
}

struct UnavailableManager;

impl ObjectManager for UnavailableManager {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn repository_for_type(
        &self,
        entity: &EntityType,
    ) -> Result<Arc<dyn EntityRepositoryHandle>, DataError> {
        Err(DataError::configuration(format!("{} is offline", entity.name)))
    }
}

#[tokio::test]
async fn operations_go_through_repository_resolution() {
    let router = Arc::new(
        ManagerRouter::new()
            .with_manager(Arc::new(UnavailableManager))
            .with_default("unavailable"),
    );
    let users = GenericRepository::<User>::new(shared(&router)).unwrap();

    let resolved = users.resolve_repository().err().unwrap().to_string();
    assert!(resolved.contains("User is offline"), "{resolved}");
    assert_eq!(users.find_all().await.unwrap_err().to_string(), resolved);
    assert_eq!(
        users.count(&Criteria::new()).await.unwrap_err().to_string(),
        resolved
    );
}

#[derive(Clone)]
struct UserRepository(GenericRepository<User>);

impl EntityRepository for UserRepository {
    type Entity = User;

    fn repository(&self) -> &GenericRepository<User> {
        &self.0
    }
}

#[tokio::test]
async fn declared_repositories_delegate() {
    let (users, _) = seeded_users().await;
    let declared = UserRepository(users);

    assert_eq!(declared.entity_name(), "User");
    assert_eq!(declared.table_name(), "users");
    assert_eq!(declared.find(1).await.unwrap(), Some(User::new(1, "a")));
    assert_eq!(declared.count(&Criteria::new()).await.unwrap(), 2);
    assert_eq!(
        declared.call("findOneByName", &[Value::from("b")]).await.unwrap(),
        FinderOutput::One(Some(User::new(2, "b")))
    );
}

#[tokio::test]
async fn repositories_are_shareable_across_tasks() {
    let (users, _) = seeded_users().await;
    let handles: Vec<_> = (1..=2)
        .map(|id| {
            let users = users.clone();
            tokio::spawn(async move { users.find(id).await })
        })
        .collect();
    for (handle, id) in handles.into_iter().zip(1..) {
        assert_eq!(handle.await.unwrap().unwrap().unwrap().id, id);
    }
}
