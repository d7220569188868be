mod common;

use admin_store::domain::api_resource::{ApiResource, ApiResourceRepository, ApiScope};
use admin_store::infrastructure::tables::{API_SCOPE_CLAIMS, API_SCOPES};
use common::*;
use ids_common::{NEW_ID, Pagination};
use ids_errors::RepositoryError;

#[tokio::test]
async fn test_lifecycle() {
    let db = TestDb::new().await;
    api_resource_lifecycle(&db.api_resources()).await;
}

#[tokio::test]
async fn test_scope_operations() {
    let db = TestDb::new().await;
    api_scope_operations(&db.api_resources()).await;
}

#[tokio::test]
async fn test_add_rolls_back_when_scope_claims_affect_no_rows() {
    let db = TestDb::new().await;
    let repo = db.api_resources();
    db.context.inject_zero_rows(API_SCOPE_CLAIMS).await;

    let resource = sample_api_resource(&unique("atomic"));
    assert_eq!(repo.add_api_resource(&resource).await.unwrap(), NEW_ID);

    assert!(!repo.api_resource_name_exists(&resource.name, None).await.unwrap());
    assert!(!repo.api_scope_name_exists(&resource.scopes[0].name, None).await.unwrap());
    assert_eq!(repo.get_api_resources("", Pagination::new(1, 10)).await.unwrap().total, 0);
}

#[tokio::test]
async fn test_update_scope_rolls_back_on_fault() {
    let db = TestDb::new().await;
    let repo = db.api_resources();
    let id = repo.add_api_resource(&sample_api_resource(&unique("scoped"))).await.unwrap();
    let stored = repo.get_api_resource(id).await.unwrap().unwrap();
    let mut scope = stored.scopes[0].clone();
    scope.display_name = Some("changed".to_string());
    db.context.inject_zero_rows(API_SCOPES).await;

    assert_eq!(repo.update_api_scope(id, &scope).await.unwrap(), 0);

    let after = repo.get_api_scope(id, scope.id).await.unwrap().unwrap();
    assert_eq!(after, stored.scopes[0]);
}

#[tokio::test]
async fn test_update_scope_of_other_resource_returns_zero() {
    let db = TestDb::new().await;
    let repo = db.api_resources();
    let first = repo.add_api_resource(&sample_api_resource(&unique("first"))).await.unwrap();
    let second = repo.add_api_resource(&ApiResource::new(unique("second"), "Second")).await.unwrap();
    let scope = repo.get_api_resource(first).await.unwrap().unwrap().scopes.remove(0);

    assert_eq!(repo.update_api_scope(second, &scope).await.unwrap(), 0);
    assert!(repo.get_api_scope(second, scope.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_scope_names_are_unique_across_resources() {
    let db = TestDb::new().await;
    let repo = db.api_resources();
    let name = unique("shared");
    let first = ApiResource::new(unique("a"), "A").with_scope(ApiScope::new(&name));
    let second = ApiResource::new(unique("b"), "B").with_scope(ApiScope::new(&name));

    repo.add_api_resource(&first).await.unwrap();
    let err = repo.add_api_resource(&second).await.unwrap_err();

    assert!(matches!(err, RepositoryError::Conflict(_)));
}

#[tokio::test]
async fn test_resource_name_uniqueness() {
    let db = TestDb::new().await;
    let repo = db.api_resources();
    let resource = ApiResource::new(unique("named"), "Named");
    assert!(repo.can_insert_api_resource(&resource).await.unwrap());

    let id = repo.add_api_resource(&resource).await.unwrap();
    assert!(!repo.can_insert_api_resource(&resource).await.unwrap());

    let stored = repo.get_api_resource(id).await.unwrap().unwrap();
    assert!(repo.can_insert_api_resource(&stored).await.unwrap());
}

#[tokio::test]
async fn test_secret_operations() {
    let db = TestDb::new().await;
    let repo = db.api_resources();
    let id = repo.add_api_resource(&ApiResource::new(unique("secured"), "Secured")).await.unwrap();
    let secret = sample_api_resource("x").secrets.remove(0);

    let secret_id = repo.add_api_secret(id, &secret).await.unwrap();
    assert_ne!(secret_id, NEW_ID);
    let stored = repo.get_api_secret(secret_id).await.unwrap().unwrap();
    assert_eq!(stored.api_resource_id, id);
    assert_eq!(repo.get_api_secrets(id, Pagination::new(1, 10)).await.unwrap().total, 1);

    assert_eq!(repo.add_api_secret(i32::MAX, &secret).await.unwrap(), NEW_ID);

    assert_eq!(repo.delete_api_secret(&stored).await.unwrap(), 1);
    assert!(repo.get_api_secret(secret_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_is_sorted_by_name_without_children() {
    let db = TestDb::new().await;
    let repo = db.api_resources();
    for name in ["payments", "accounts", "ledger"] {
        repo.add_api_resource(&sample_api_resource(name)).await.unwrap();
    }

    let page = repo.get_api_resources("", Pagination::new(1, 2)).await.unwrap();
    let names: Vec<&str> = page.items.iter().map(|r| r.name.as_str()).collect();

    assert_eq!(page.total, 3);
    assert_eq!(names, vec!["accounts", "ledger"]);
    assert!(page.items.iter().all(|r| r.scopes.is_empty() && r.secrets.is_empty()));
}

#[tokio::test]
async fn test_scope_list_excludes_claims() {
    let db = TestDb::new().await;
    let repo = db.api_resources();
    let id = repo.add_api_resource(&sample_api_resource(&unique("claims"))).await.unwrap();

    let page = repo.get_api_scopes(id, Pagination::new(1, 10)).await.unwrap();

    assert_eq!(page.total, 2);
    assert!(page.items.iter().all(|s| s.user_claims.is_empty()));
}
