#![allow(dead_code)]

//! 测试夹具与两种后端共用的场景

use std::sync::Arc;

use admin_store::domain::api_resource::{ApiResource, ApiResourceRepository, ApiScope};
use admin_store::domain::catalog::Catalog;
use admin_store::domain::client::{Client, ClientRepository, CloneOptions};
use admin_store::domain::identity_resource::{IdentityResource, IdentityResourceRepository};
use admin_store::infrastructure::orm::{
    ConfigurationContext, OrmApiResourceRepository, OrmClientRepository, OrmIdentityResourceRepository,
    OrmLogRepository, OrmPersistedGrantRepository, connect,
};
use ids_common::{NEW_ID, Pagination};
use ids_errors::RepositoryError;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// 带随机后缀的唯一名称
pub fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

/// 临时 SQLite 文件上的数据上下文，随结构体一起删除
pub struct TestDb {
    pub context: Arc<ConfigurationContext>,
    _temp_file: NamedTempFile,
}

impl TestDb {
    pub async fn new() -> Self {
        Self::with_auto_save_changes(true).await
    }

    pub async fn with_auto_save_changes(auto_save_changes: bool) -> Self {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());
        let db = connect(&db_url, 1).await.expect("Failed to connect to test database");

        let context = Arc::new(ConfigurationContext::with_auto_save_changes(db, auto_save_changes));
        context.create_schema().await.expect("Failed to create schema");

        Self {
            context,
            _temp_file: temp_file,
        }
    }

    pub fn clients(&self) -> OrmClientRepository {
        OrmClientRepository::new(self.context.clone(), Arc::new(Catalog::standard()))
    }

    pub fn api_resources(&self) -> OrmApiResourceRepository {
        OrmApiResourceRepository::new(self.context.clone())
    }

    pub fn identity_resources(&self) -> OrmIdentityResourceRepository {
        OrmIdentityResourceRepository::new(self.context.clone())
    }

    pub fn persisted_grants(&self) -> OrmPersistedGrantRepository {
        OrmPersistedGrantRepository::new(self.context.clone())
    }

    pub fn logs(&self) -> OrmLogRepository {
        OrmLogRepository::new(self.context.clone())
    }
}

/// 每个子集合都有内容的 Client
pub fn full_client(client_id: &str) -> Client {
    Client::new(client_id, format!("{} name", client_id))
        .with_grant_type("authorization_code")
        .with_redirect_uri("https://app.example.com/callback")
        .with_post_logout_redirect_uri("https://app.example.com/signout")
        .with_scope("openid")
        .with_scope("profile")
        .with_secret("s3cr3t")
        .with_claim("role", "admin")
        .with_idp_restriction("Google")
        .with_cors_origin("https://app.example.com")
        .with_property("tier", "gold")
}

pub fn sample_api_resource(name: &str) -> ApiResource {
    ApiResource::new(name, format!("{} API", name))
        .with_claim("role")
        .with_secret("api-secret")
        .with_scope(ApiScope::new(format!("{}.read", name)).with_claim("email"))
        .with_scope(ApiScope::new(format!("{}.write", name)))
}

pub fn sample_identity_resource(name: &str) -> IdentityResource {
    IdentityResource::new(name, format!("{} resource", name))
        .with_claim("email")
        .with_claim("email_verified")
}

/// 插入、读取、全量替换、删除的完整流程
pub async fn client_a_scenario(repo: &dyn ClientRepository) {
    let client_id = unique("Client-A");
    let client = Client::new(&client_id, "Client A")
        .with_redirect_uri("https://a.example.com/cb1")
        .with_redirect_uri("https://a.example.com/cb2")
        .with_grant_type("client_credentials");

    // Insert
    let id = repo.add_client(&client).await.expect("Failed to add client");
    assert_ne!(id, NEW_ID);

    // Read
    let stored = repo
        .get_client(id)
        .await
        .expect("Failed to get client")
        .expect("Client not found");
    assert_eq!(stored.id, id);
    assert_eq!(stored.redirect_uris.len(), 2);
    assert_eq!(stored.allowed_grant_types.len(), 1);
    assert!(stored.redirect_uris.iter().all(|u| u.id != NEW_ID && u.client_id == id));
    assert_eq!(stored.allowed_grant_types[0].grant_type, "client_credentials");

    // Update with zero redirect uris
    let mut changed = stored.clone();
    changed.redirect_uris.clear();
    let affected = repo.update_client(&changed).await.expect("Failed to update client");
    assert_eq!(affected, 1);

    let updated = repo.get_client(id).await.unwrap().unwrap();
    assert!(updated.redirect_uris.is_empty());
    assert_eq!(updated.allowed_grant_types.len(), 1);

    // Delete
    let removed = repo.remove_client(&updated).await.expect("Failed to remove client");
    assert_eq!(removed, 1);
    assert!(repo.get_client(id).await.unwrap().is_none());
}

/// 根记录更新因唯一约束失败时，已删除的子集合随事务一起恢复
pub async fn client_failed_update_keeps_children(repo: &dyn ClientRepository) {
    let first = repo.add_client(&full_client(&unique("first"))).await.unwrap();
    let second_client_id = unique("second");
    repo.add_client(&full_client(&second_client_id)).await.unwrap();
    let before = repo.get_client(first).await.unwrap().unwrap();

    let mut changed = before.clone();
    changed.client_id = second_client_id;
    changed.redirect_uris.clear();
    changed.allowed_scopes.clear();

    let err = repo.update_client(&changed).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)), "{:?}", err);

    let after = repo.get_client(first).await.unwrap().unwrap();
    assert_eq!(after, before);
    assert_eq!(after.redirect_uris.len(), 1);
    assert_eq!(after.allowed_scopes.len(), 2);
    assert_eq!(after.client_secrets.len(), 1);
    assert_eq!(after.properties.len(), 1);
}

/// 每个子集合都原样读回
pub async fn client_round_trip(repo: &dyn ClientRepository) {
    let client = full_client(&unique("round-trip"));
    let id = repo.add_client(&client).await.unwrap();

    let mut stored = repo.get_client(id).await.unwrap().unwrap();
    stored.reset_identities();
    let mut expected = client.clone();
    expected.reset_identities();
    assert_eq!(stored, expected);
}

/// 更新后子集合与传入集合完全一致，不残留旧行
pub async fn client_update_replaces_children(repo: &dyn ClientRepository) {
    let client = full_client(&unique("replace"));
    let id = repo.add_client(&client).await.unwrap();
    let stored = repo.get_client(id).await.unwrap().unwrap();

    let mut changed = stored.clone().with_scope("email");
    changed.allowed_cors_origins.clear();
    changed.claims[0].value = "reader".to_string();
    changed.client_name = Some("renamed".to_string());
    assert_eq!(repo.update_client(&changed).await.unwrap(), 1);

    let updated = repo.get_client(id).await.unwrap().unwrap();
    let scopes: Vec<&str> = updated.allowed_scopes.iter().map(|s| s.scope.as_str()).collect();
    assert_eq!(scopes, vec!["openid", "profile", "email"]);
    assert!(updated.allowed_cors_origins.is_empty());
    assert_eq!(updated.claims.len(), 1);
    assert_eq!(updated.claims[0].value, "reader");
    assert_eq!(updated.client_name.as_deref(), Some("renamed"));
    assert_eq!(updated.client_secrets.len(), 1);
}

/// 克隆不复制密钥，并按开关排除子集合
pub async fn client_clone_excludes_secrets(repo: &dyn ClientRepository) {
    let source = full_client(&unique("source"));
    let source_id = repo.add_client(&source).await.unwrap();
    let mut stored = repo.get_client(source_id).await.unwrap().unwrap();
    stored.client_id = unique("copy");

    let options = CloneOptions {
        redirect_uris: false,
        properties: false,
        ..CloneOptions::all()
    };
    let copy_id = repo.clone_client(&stored, &options).await.expect("Failed to clone client");
    assert_ne!(copy_id, NEW_ID);
    assert_ne!(copy_id, source_id);

    let copy = repo.get_client(copy_id).await.unwrap().unwrap();
    assert!(copy.client_secrets.is_empty());
    assert!(copy.redirect_uris.is_empty());
    assert!(copy.properties.is_empty());
    assert_eq!(copy.allowed_scopes.len(), 2);
    assert_eq!(copy.allowed_grant_types.len(), 1);
    assert_eq!(copy.claims.len(), 1);
    assert!(copy.allowed_scopes.iter().all(|s| s.client_id == copy_id));

    let original = repo.get_client(source_id).await.unwrap().unwrap();
    assert_eq!(original.client_secrets.len(), 1);
    assert_eq!(original.redirect_uris.len(), 1);
}

/// 唯一性检查：新增、更新排除自身、克隆
pub async fn client_uniqueness(repo: &dyn ClientRepository) {
    let client_id = unique("unique");
    let id = repo.add_client(&Client::new(&client_id, "Unique")).await.unwrap();
    let stored = repo.get_client(id).await.unwrap().unwrap();

    assert!(repo.can_insert_client(&stored, false).await.unwrap());
    assert!(!repo.can_insert_client(&stored, true).await.unwrap());
    assert!(!repo.can_insert_client(&Client::new(&client_id, "Other"), false).await.unwrap());
    assert!(repo.can_insert_client(&Client::new(unique("free"), "Free"), false).await.unwrap());
}

/// 分页总数与页内容稳定
pub async fn client_pagination(repo: &dyn ClientRepository) {
    let tag = unique("page");
    for i in 0..5 {
        let client = Client::new(format!("{}-{}", tag, i), format!("{}-name-{}", tag, 4 - i));
        repo.add_client(&client).await.unwrap();
    }

    let first = repo.get_clients(&tag, Pagination::new(1, 2)).await.unwrap();
    let second = repo.get_clients(&tag, Pagination::new(2, 2)).await.unwrap();
    let last = repo.get_clients(&tag, Pagination::new(3, 2)).await.unwrap();

    assert_eq!(first.total, 5);
    assert_eq!(first.total_pages(), 3);
    assert_eq!(first.items.len(), 2);
    assert_eq!(last.items.len(), 1);

    let names: Vec<String> = first
        .items
        .iter()
        .chain(second.items.iter())
        .chain(last.items.iter())
        .filter_map(|c| c.client_name.clone())
        .collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    assert!(first.items.iter().all(|c| c.client_secrets.is_empty()));

    let again = repo.get_clients(&tag, Pagination::new(1, 2)).await.unwrap();
    assert_eq!(again.items, first.items);
}

/// 子集合级别的密钥 / 声明 / 属性操作
pub async fn client_child_operations(repo: &dyn ClientRepository) {
    let id = repo.add_client(&Client::new(unique("children"), "Children")).await.unwrap();
    let secret = full_client("x").client_secrets.remove(0);

    let secret_id = repo.add_client_secret(id, &secret).await.unwrap();
    assert_ne!(secret_id, NEW_ID);
    let stored = repo.get_client_secret(secret_id).await.unwrap().unwrap();
    assert_eq!(stored.client_id, id);
    assert_eq!(stored.value, "s3cr3t");

    let page = repo.get_client_secrets(id, Pagination::new(1, 10)).await.unwrap();
    assert_eq!(page.total, 1);

    assert_eq!(repo.add_client_secret(i32::MAX, &secret).await.unwrap(), NEW_ID);

    let claim = full_client("x").claims.remove(0);
    let claim_id = repo.add_client_claim(id, &claim).await.unwrap();
    assert_eq!(repo.get_client_claims(id, Pagination::new(1, 10)).await.unwrap().total, 1);
    let claim = repo.get_client_claim(claim_id).await.unwrap().unwrap();
    assert_eq!(repo.delete_client_claim(&claim).await.unwrap(), 1);
    assert!(repo.get_client_claim(claim_id).await.unwrap().is_none());

    let property = full_client("x").properties.remove(0);
    let property_id = repo.add_client_property(id, &property).await.unwrap();
    let property = repo.get_client_property(property_id).await.unwrap().unwrap();
    assert_eq!(property.key, "tier");
    assert_eq!(repo.delete_client_property(&property).await.unwrap(), 1);

    assert_eq!(repo.delete_client_secret(&stored).await.unwrap(), 1);
    assert_eq!(repo.delete_client_secret(&stored).await.unwrap(), 0);

    let client = repo.get_client(id).await.unwrap().unwrap();
    assert!(client.client_secrets.is_empty());
    assert!(client.claims.is_empty());
    assert!(client.properties.is_empty());
}

/// ApiResource 及其 scope 的完整流程
pub async fn api_resource_lifecycle(repo: &dyn ApiResourceRepository) {
    let name = unique("orders");
    let resource = sample_api_resource(&name);
    let id = repo.add_api_resource(&resource).await.expect("Failed to add api resource");
    assert_ne!(id, NEW_ID);

    let stored = repo.get_api_resource(id).await.unwrap().unwrap();
    assert_eq!(stored.user_claims.len(), 1);
    assert_eq!(stored.secrets.len(), 1);
    assert_eq!(stored.scopes.len(), 2);
    let read_scope = stored.scopes.iter().find(|s| s.name.ends_with(".read")).unwrap();
    assert_eq!(read_scope.user_claims.len(), 1);
    assert_eq!(read_scope.user_claims[0].api_scope_id, read_scope.id);
    assert_eq!(repo.get_api_resource_name(id).await.unwrap(), name);

    // Full replace
    let mut changed = stored.clone();
    changed.scopes.retain(|s| s.name.ends_with(".write"));
    changed.scopes[0].user_claims.push(Default::default());
    changed.scopes[0].user_claims[0].claim_type = "name".to_string();
    changed.secrets.clear();
    assert_eq!(repo.update_api_resource(&changed).await.unwrap(), 1);

    let updated = repo.get_api_resource(id).await.unwrap().unwrap();
    assert!(updated.secrets.is_empty());
    assert_eq!(updated.scopes.len(), 1);
    assert_eq!(updated.scopes[0].user_claims.len(), 1);
    assert_eq!(updated.scopes[0].user_claims[0].claim_type, "name");

    // Delete
    assert_eq!(repo.delete_api_resource(&updated).await.unwrap(), 1);
    assert!(repo.get_api_resource(id).await.unwrap().is_none());
    assert!(repo.get_api_resource_name(id).await.is_err());
    assert!(!repo.api_scope_name_exists(&format!("{}.write", name), None).await.unwrap());
}

/// scope 级别的新增、更新、删除
pub async fn api_scope_operations(repo: &dyn ApiResourceRepository) {
    let name = unique("billing");
    let id = repo.add_api_resource(&ApiResource::new(&name, "Billing")).await.unwrap();

    let scope = ApiScope::new(format!("{}.admin", name)).with_claim("role");
    assert!(repo.can_insert_api_scope(&scope).await.unwrap());
    let scope_id = repo.add_api_scope(id, &scope).await.unwrap();
    assert_ne!(scope_id, NEW_ID);
    assert!(!repo.can_insert_api_scope(&scope).await.unwrap());

    let mut stored = repo.get_api_scope(id, scope_id).await.unwrap().unwrap();
    assert_eq!(stored.api_resource_id, id);
    assert_eq!(stored.user_claims.len(), 1);
    assert!(repo.can_insert_api_scope(&stored).await.unwrap());

    stored.required = true;
    stored.user_claims.clear();
    assert_eq!(repo.update_api_scope(id, &stored).await.unwrap(), 1);
    let updated = repo.get_api_scope(id, scope_id).await.unwrap().unwrap();
    assert!(updated.required);
    assert!(updated.user_claims.is_empty());

    let page = repo.get_api_scopes(id, Pagination::new(1, 10)).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, scope_id);

    assert_eq!(repo.add_api_scope(i32::MAX, &ApiScope::new(unique("orphan"))).await.unwrap(), NEW_ID);

    assert_eq!(repo.delete_api_scope(&updated).await.unwrap(), 1);
    assert!(repo.get_api_scope(id, scope_id).await.unwrap().is_none());
}

/// IdentityResource 的完整流程
pub async fn identity_resource_lifecycle(repo: &dyn IdentityResourceRepository) {
    let name = unique("profile");
    let resource = sample_identity_resource(&name);
    assert!(repo.can_insert_identity_resource(&resource).await.unwrap());
    let id = repo.add_identity_resource(&resource).await.unwrap();
    assert_ne!(id, NEW_ID);
    assert!(!repo.can_insert_identity_resource(&resource).await.unwrap());

    let stored = repo.get_identity_resource(id).await.unwrap().unwrap();
    assert_eq!(stored.user_claims.len(), 2);
    assert!(stored.show_in_discovery_document);
    assert!(repo.can_insert_identity_resource(&stored).await.unwrap());

    let mut changed = stored.clone();
    changed.user_claims.truncate(1);
    changed.emphasize = true;
    assert_eq!(repo.update_identity_resource(&changed).await.unwrap(), 1);

    let updated = repo.get_identity_resource(id).await.unwrap().unwrap();
    assert_eq!(updated.user_claims.len(), 1);
    assert_eq!(updated.user_claims[0].claim_type, "email");
    assert!(updated.emphasize);

    assert_eq!(repo.delete_identity_resource(&updated).await.unwrap(), 1);
    assert!(repo.get_identity_resource(id).await.unwrap().is_none());
}
