use blade_admin::{
    models::{self, Module, User},
    storage::{Filter, Lookup, Paginator, Store, StoreError},
};

// --- Setup Utilities ---

async fn store() -> Store {
    let store = Store::in_memory().await.expect("in-memory sqlite");
    models::migrate(&store).await.expect("schema");
    store
}

fn user(name: &str) -> User {
    User {
        name: name.to_string(),
        cn_name: name.to_uppercase(),
        password: "secret1".to_string(),
        email: format!("{name}@example.com"),
        enabled: true,
        ..User::default()
    }
}

fn root_module(name: &str) -> Module {
    Module {
        name: name.to_string(),
        cn_name: format!("{name}-cn"),
        level: 1,
        ..Module::default()
    }
}

// --- Paginator ---

#[test]
fn test_paginator_rounds_up_and_clamps() {
    let p = Paginator::new(25, 20, 1);
    assert_eq!(p.total_pages, 2);
    assert_eq!(p.window(), Some((20, 0)));

    let p = Paginator::new(25, 20, 5);
    assert_eq!(p.current_page, 2);
    assert_eq!(p.window(), Some((20, 20)));

    let p = Paginator::new(25, 20, 0);
    assert_eq!(p.current_page, 1);

    // Page sizes near the integer limit must not overflow.
    let p = Paginator::new(2, i64::MAX, 1);
    assert_eq!((p.current_page, p.total_pages), (1, 1));
    assert_eq!(p.window(), Some((i64::MAX, 0)));

    let p = Paginator::new(i64::MAX, i64::MAX - 1, i64::MAX);
    assert_eq!((p.current_page, p.total_pages), (2, 2));
    assert_eq!(p.window(), Some((i64::MAX - 1, i64::MAX - 1)));
}

#[test]
fn test_paginator_unpaginated_and_empty() {
    let p = Paginator::new(25, 0, 3);
    assert_eq!((p.current_page, p.total_pages), (1, 1));
    assert_eq!(p.window(), None);

    let p = Paginator::new(0, 10, 4);
    assert_eq!((p.current_page, p.total_pages), (1, 1));
    assert_eq!(p.window(), Some((10, 0)));
}

#[test]
fn test_lookup_prefers_non_zero_id() {
    assert_eq!(Lookup::new(7, "alice"), Lookup::Id(7));
    assert_eq!(Lookup::new(0, "alice"), Lookup::Name("alice".to_string()));
}

// --- CRUD ---

#[tokio::test]
async fn test_create_populates_generated_fields() {
    let store = store().await;

    let created = store.create(&user("alice")).await.unwrap();

    assert!(created.base.id > 0);
    assert_eq!(created.base.created_at, created.base.updated_at);
    assert!(created.base.deleted_at.is_none());
    assert_eq!(created.name, "alice");
    assert!(created.enabled);
}

#[tokio::test]
async fn test_create_duplicate_name_is_object_exists() {
    let store = store().await;
    store.create(&user("alice")).await.unwrap();

    let mut dup = user("alice");
    dup.email = "other@example.com".to_string();
    let err = store.create(&dup).await.unwrap_err();

    assert!(matches!(err, StoreError::ObjectExists), "got {err:?}");
}

#[tokio::test]
async fn test_get_by_id_and_by_name() {
    let store = store().await;
    let created = store.create(&user("alice")).await.unwrap();

    let by_id: User = store.get(created.base.id).await.unwrap();
    let by_name: User = store.get("alice").await.unwrap();

    assert_eq!(by_id.base.id, by_name.base.id);
    assert!(matches!(store.get::<User>("nobody").await, Err(StoreError::NotFound)));
    assert!(matches!(store.get::<User>(999).await, Err(StoreError::NotFound)));
}

#[tokio::test]
async fn test_update_writes_values_and_bumps_timestamp() {
    let store = store().await;
    let mut alice = store.create(&user("alice")).await.unwrap();

    alice.phone = "555-0100".to_string();
    let updated = store.update(alice.base.id, &alice).await.unwrap();

    assert_eq!(updated.phone, "555-0100");
    assert!(updated.base.updated_at >= updated.base.created_at);
    assert!(matches!(store.update(999, &alice).await, Err(StoreError::NotFound)));
}

#[tokio::test]
async fn test_update_into_taken_email_is_object_exists() {
    let store = store().await;
    store.create(&user("alice")).await.unwrap();
    let mut bob = store.create(&user("bob")).await.unwrap();

    bob.email = "alice@example.com".to_string();
    let err = store.update("bob", &bob).await.unwrap_err();

    assert!(matches!(err, StoreError::ObjectExists), "got {err:?}");
}

// --- Soft and hard delete ---

#[tokio::test]
async fn test_soft_delete_hides_row_but_keeps_it() {
    let store = store().await;
    let alice = store.create(&user("alice")).await.unwrap();

    store.delete::<User>("alice").await.unwrap();

    assert!(matches!(store.get::<User>("alice").await, Err(StoreError::NotFound)));
    let kept: User = store.get_unscoped(alice.base.id).await.unwrap();
    assert!(kept.base.deleted_at.is_some());
    assert!(!store.is_exist::<User>("alice").await);

    // Deleting twice reports the row as gone.
    assert!(matches!(store.delete::<User>("alice").await, Err(StoreError::NotFound)));
}

#[tokio::test]
async fn test_soft_deleted_name_can_be_reused() {
    let store = store().await;
    let first = store.create(&user("alice")).await.unwrap();
    store.delete::<User>(first.base.id).await.unwrap();

    let second = store.create(&user("alice")).await.unwrap();

    assert_ne!(first.base.id, second.base.id);
    let live: User = store.get("alice").await.unwrap();
    assert_eq!(live.base.id, second.base.id);
}

#[tokio::test]
async fn test_force_delete_removes_row_physically() {
    let store = store().await;
    let alice = store.create(&user("alice")).await.unwrap();
    store.delete::<User>(alice.base.id).await.unwrap();

    // Hard delete also reaches soft-deleted rows.
    store.force_delete::<User>(alice.base.id).await.unwrap();

    assert!(matches!(
        store.get_unscoped::<User>(alice.base.id).await,
        Err(StoreError::NotFound)
    ));
    assert!(matches!(
        store.force_delete::<User>(alice.base.id).await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn test_force_delete_all_is_one_batch() {
    let store = store().await;
    let a = store.create(&root_module("a")).await.unwrap();
    let b = store.create(&root_module("b")).await.unwrap();
    store.create(&root_module("c")).await.unwrap();

    let removed = store
        .force_delete_all::<Module>(&[a.base.id, b.base.id])
        .await
        .unwrap();

    assert_eq!(removed, 2);
    let (total, rest) = store.list::<Module>(-1, 1, &Filter::new()).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(rest[0].name, "c");
}

// --- List ---

#[tokio::test]
async fn test_list_paginates_and_clamps() {
    let store = store().await;
    for i in 0..25 {
        store.create(&user(&format!("user{i:02}"))).await.unwrap();
    }

    let (total, first) = store.list::<User>(20, 1, &Filter::new()).await.unwrap();
    assert_eq!(total, 25);
    assert_eq!(first.len(), 20);
    assert_eq!(first[0].name, "user00");

    let (total, clamped) = store.list::<User>(20, 5, &Filter::new()).await.unwrap();
    assert_eq!(total, 25);
    assert_eq!(clamped.len(), 5);
    assert_eq!(clamped[0].name, "user20");

    let (_, everything) = store.list::<User>(0, 3, &Filter::new()).await.unwrap();
    assert_eq!(everything.len(), 25);
}

#[tokio::test]
async fn test_list_skips_deleted_and_applies_filter() {
    let store = store().await;
    let root = store.create(&root_module("backend")).await.unwrap();
    for name in ["api", "worker", "cron"] {
        let child = Module {
            parent_id: root.base.id,
            level: 2,
            ..root_module(name)
        };
        store.create(&child).await.unwrap();
    }
    store.delete::<Module>("cron").await.unwrap();

    let filter = Filter::new().eq("parent_id", root.base.id);
    assert!(!filter.is_empty());
    let (total, children) = store.list::<Module>(-1, 1, &filter).await.unwrap();

    assert_eq!(total, 2);
    let names: Vec<_> = children.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["api", "worker"]);

    let (roots, _) = store
        .list::<Module>(-1, 1, &Filter::new().eq("level", 1))
        .await
        .unwrap();
    assert_eq!(roots, 1);
}

#[tokio::test]
async fn test_is_exist_never_raises() {
    let store = store().await;
    store.create(&user("alice")).await.unwrap();

    assert!(store.is_exist::<User>("alice").await);
    assert!(!store.is_exist::<User>("bob").await);
    assert!(!store.is_exist::<User>(Lookup::new(0, "")).await);
}

#[tokio::test]
async fn test_migrate_is_idempotent() {
    let store = store().await;
    models::migrate(&store).await.unwrap();
    assert!(store.list::<User>(-1, 1, &Filter::new()).await.unwrap().1.is_empty());
}
