mod common;

use admin_store::domain::api_resource::{ApiResource, ApiResourceRepository};
use admin_store::domain::client::{Client, ClientRepository};
use admin_store::domain::identity_resource::{IdentityResource, IdentityResourceRepository};
use admin_store::infrastructure::tables::{CLIENT_CLAIMS, CLIENT_REDIRECT_URIS, CLIENT_SECRETS, CLIENTS};
use common::*;
use ids_common::{NEW_ID, Pagination};
use ids_errors::RepositoryError;
use ids_ports::UnitOfWork;

#[tokio::test]
async fn test_client_a_scenario() {
    let db = TestDb::new().await;
    client_a_scenario(&db.clients()).await;
}

#[tokio::test]
async fn test_round_trip() {
    let db = TestDb::new().await;
    client_round_trip(&db.clients()).await;
}

#[tokio::test]
async fn test_update_replaces_children() {
    let db = TestDb::new().await;
    client_update_replaces_children(&db.clients()).await;
}

#[tokio::test]
async fn test_clone_excludes_secrets() {
    let db = TestDb::new().await;
    client_clone_excludes_secrets(&db.clients()).await;
}

#[tokio::test]
async fn test_uniqueness() {
    let db = TestDb::new().await;
    client_uniqueness(&db.clients()).await;
}

#[tokio::test]
async fn test_pagination() {
    let db = TestDb::new().await;
    client_pagination(&db.clients()).await;
}

#[tokio::test]
async fn test_child_operations() {
    let db = TestDb::new().await;
    client_child_operations(&db.clients()).await;
}

#[tokio::test]
async fn test_failed_update_restores_children() {
    let db = TestDb::new().await;
    client_failed_update_keeps_children(&db.clients()).await;
}

#[tokio::test]
async fn test_add_rolls_back_when_child_insert_affects_no_rows() {
    let db = TestDb::new().await;
    let repo = db.clients();
    db.context.inject_zero_rows(CLIENT_REDIRECT_URIS).await;

    let client = full_client(&unique("atomic"));
    let id = repo.add_client(&client).await.unwrap();

    assert_eq!(id, NEW_ID);
    let page = repo.get_clients("", Pagination::new(1, 10)).await.unwrap();
    assert_eq!(page.total, 0);
    assert!(!repo.client_id_exists(&client.client_id, None).await.unwrap());

    // 故障只触发一次
    let id = repo.add_client(&client).await.unwrap();
    assert_ne!(id, NEW_ID);
}

#[tokio::test]
async fn test_add_rolls_back_when_root_insert_affects_no_rows() {
    let db = TestDb::new().await;
    let repo = db.clients();
    db.context.inject_zero_rows(CLIENTS).await;

    let id = repo.add_client(&full_client(&unique("root"))).await.unwrap();

    assert_eq!(id, NEW_ID);
    assert_eq!(repo.get_clients("", Pagination::new(1, 10)).await.unwrap().total, 0);
}

#[tokio::test]
async fn test_update_rolls_back_when_child_insert_affects_no_rows() {
    let db = TestDb::new().await;
    let repo = db.clients();
    let id = repo.add_client(&full_client(&unique("keep"))).await.unwrap();
    let before = repo.get_client(id).await.unwrap().unwrap();

    let mut changed = before.clone();
    changed.client_name = Some("changed".to_string());
    changed.redirect_uris.clear();
    db.context.inject_zero_rows(CLIENT_CLAIMS).await;

    assert_eq!(repo.update_client(&changed).await.unwrap(), 0);

    let after = repo.get_client(id).await.unwrap().unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_update_missing_client_returns_zero() {
    let db = TestDb::new().await;
    let repo = db.clients();
    let mut client = full_client(&unique("ghost"));
    client.id = 42;

    assert_eq!(repo.update_client(&client).await.unwrap(), 0);
    assert!(repo.get_client(42).await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_client_id_is_conflict() {
    let db = TestDb::new().await;
    let repo = db.clients();
    let client = Client::new(unique("dup"), "Dup");
    repo.add_client(&client).await.unwrap();

    let err = repo.add_client(&client).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));
}

#[tokio::test]
async fn test_remove_cascades_to_children() {
    let db = TestDb::new().await;
    let repo = db.clients();
    let id = repo.add_client(&full_client(&unique("cascade"))).await.unwrap();
    let stored = repo.get_client(id).await.unwrap().unwrap();
    let secret_id = stored.client_secrets[0].id;

    assert_eq!(repo.remove_client(&stored).await.unwrap(), 1);

    assert!(repo.get_client_secret(secret_id).await.unwrap().is_none());
    assert_eq!(repo.get_client_claims(id, Pagination::new(1, 10)).await.unwrap().total, 0);
    assert_eq!(repo.remove_client(&stored).await.unwrap(), 0);
}

#[tokio::test]
async fn test_child_add_rolls_back_on_fault() {
    let db = TestDb::new().await;
    let repo = db.clients();
    let id = repo.add_client(&Client::new(unique("fault"), "Fault")).await.unwrap();
    let secret = full_client("x").client_secrets.remove(0);
    db.context.inject_zero_rows(CLIENT_SECRETS).await;

    assert_eq!(repo.add_client_secret(id, &secret).await.unwrap(), NEW_ID);
    assert_eq!(repo.get_client_secrets(id, Pagination::new(1, 10)).await.unwrap().total, 0);
}

#[tokio::test]
async fn test_invalid_pagination_is_rejected() {
    let db = TestDb::new().await;
    let repo = db.clients();

    let err = repo.get_clients("", Pagination::new(0, 10)).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Validation(_)));
    let err = repo.get_clients("", Pagination::new(1, 0)).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Validation(_)));
}

#[tokio::test]
async fn test_clients_without_name_sort_first() {
    let db = TestDb::new().await;
    let repo = db.clients();
    let mut unnamed = Client::new("zz-unnamed", "ignored");
    unnamed.client_name = None;
    repo.add_client(&Client::new("aa-named", "Alpha")).await.unwrap();
    repo.add_client(&unnamed).await.unwrap();

    let page = repo.get_clients("", Pagination::new(1, 10)).await.unwrap();
    let ids: Vec<&str> = page.items.iter().map(|c| c.client_id.as_str()).collect();
    assert_eq!(ids, vec!["zz-unnamed", "aa-named"]);
}

#[tokio::test]
async fn test_search_matches_client_id_or_name() {
    let db = TestDb::new().await;
    let repo = db.clients();
    repo.add_client(&Client::new("web-portal", "Customer Portal")).await.unwrap();
    repo.add_client(&Client::new("mobile", "Mobile App")).await.unwrap();

    assert_eq!(repo.get_clients("WEB", Pagination::new(1, 10)).await.unwrap().total, 1);
    assert_eq!(repo.get_clients(" app ", Pagination::new(1, 10)).await.unwrap().total, 1);
    assert_eq!(repo.get_clients("", Pagination::new(1, 10)).await.unwrap().total, 2);
}

#[tokio::test]
async fn test_get_client_id() {
    let db = TestDb::new().await;
    let repo = db.clients();
    let id = repo.add_client(&Client::new("spa", "Single Page App")).await.unwrap();

    let name = repo.get_client_id(id).await.unwrap().unwrap();
    assert_eq!(name.client_id, "spa");
    assert_eq!(name.client_name.as_deref(), Some("Single Page App"));
    assert!(repo.get_client_id(id + 1).await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_scopes_lists_identity_then_api_names() {
    let db = TestDb::new().await;
    let clients = db.clients();
    let identity = db.identity_resources();
    let apis = db.api_resources();

    identity.add_identity_resource(&IdentityResource::new("profile", "Profile")).await.unwrap();
    identity.add_identity_resource(&IdentityResource::new("openid", "OpenId")).await.unwrap();
    apis.add_api_resource(&ApiResource::new("orders", "Orders")).await.unwrap();
    apis.add_api_resource(&ApiResource::new("inventory", "Inventory")).await.unwrap();

    let all = clients.get_scopes("", 0).await.unwrap();
    assert_eq!(all, vec!["openid", "profile", "inventory", "orders"]);

    let limited = clients.get_scopes("", 1).await.unwrap();
    assert_eq!(limited, vec!["openid", "inventory"]);

    let filtered = clients.get_scopes("OR", 0).await.unwrap();
    assert_eq!(filtered, vec!["inventory", "orders"]);
}

#[tokio::test]
async fn test_catalog_lookups() {
    let db = TestDb::new().await;
    let repo = db.clients();

    assert!(repo.get_grant_types("", 0).contains(&"client_credentials".to_string()));
    assert_eq!(repo.get_grant_types("", 2).len(), 2);
    let claims = repo.get_standard_claims("name", 0);
    assert_eq!(claims.len(), 6);
    assert!(claims.iter().all(|c| c.contains("name")));
    assert_eq!(repo.get_access_token_types().len(), 2);
    assert_eq!(repo.get_hash_types().len(), 2);
    assert!(!repo.get_secret_types().is_empty());
}

#[tokio::test]
async fn test_changes_pending_until_saved() {
    let db = TestDb::with_auto_save_changes(false).await;
    let repo = db.clients();
    assert!(!repo.auto_save_changes());

    let id = repo.add_client(&full_client(&unique("pending"))).await.unwrap();
    let mut stored = repo.get_client(id).await.unwrap().unwrap();
    stored.description = Some("described".to_string());
    repo.update_client(&stored).await.unwrap();

    assert_eq!(db.context.pending_changes().await, 2);
    assert_eq!(repo.save_all_changes().await.unwrap(), 2);
    assert_eq!(db.context.pending_changes().await, 0);
    assert_eq!(
        repo.get_client(id).await.unwrap().unwrap().description.as_deref(),
        Some("described")
    );
}

#[tokio::test]
async fn test_discarded_changes_are_not_visible() {
    let db = TestDb::with_auto_save_changes(false).await;
    let repo = db.clients();

    let id = repo.add_client(&full_client(&unique("discard"))).await.unwrap();
    db.context.discard_changes().await.unwrap();

    assert!(repo.get_client(id).await.unwrap().is_none());
}
