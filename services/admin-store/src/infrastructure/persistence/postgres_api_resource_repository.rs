use async_trait::async_trait;
use ids_adapter_postgres::{ReadPlan, TransactionManager, map_sqlx_error};
use ids_common::{EntityId, NEW_ID, PagedResult, Pagination, contains_pattern};
use ids_errors::{RepoResult, RepositoryError};
use ids_ports::UnitOfWork;
use sqlx::{PgConnection, PgPool};
use tracing::debug;

use super::rows::{self, API_RESOURCE_COLUMNS, API_SCOPE_COLUMNS, decode_all};
use super::{commit, delete_children, insert_rows, page_bounds, roll_back, unsupported_save};
use crate::domain::api_resource::{ApiResource, ApiResourceRepository, ApiScope, ApiSecret};
use crate::infrastructure::db_metrics::QueryTimer;
use crate::infrastructure::tables::*;

const AGGREGATE: &str = "api_resource";

const SECRET_COLUMNS: &str = "id, api_resource_id, description, value, expiration, secret_type";

pub struct PostgresApiResourceRepository {
    pool: PgPool,
    tx_manager: TransactionManager,
}

impl PostgresApiResourceRepository {
    pub fn new(pool: PgPool) -> Self {
        let tx_manager = TransactionManager::new(pool.clone());
        Self { pool, tx_manager }
    }

    /// 读取计划：根、声明、密钥、scope、scope 声明
    fn read_plan(id: EntityId) -> ReadPlan<ApiResource> {
        ReadPlan::new(
            format!("SELECT {} FROM api_resources WHERE id = {}", API_RESOURCE_COLUMNS, id),
            rows::api_resource,
        )
        .child(
            "user_claims",
            format!(
                "SELECT id, api_resource_id, claim_type FROM api_resource_claims WHERE api_resource_id = {} ORDER BY id",
                id
            ),
            |a, r| {
                a.user_claims = decode_all(r, rows::api_resource_claim)?;
                Ok(())
            },
        )
        .child(
            "secrets",
            format!(
                "SELECT {} FROM api_secrets WHERE api_resource_id = {} ORDER BY id",
                SECRET_COLUMNS, id
            ),
            |a, r| {
                a.secrets = decode_all(r, rows::api_secret)?;
                Ok(())
            },
        )
        .child(
            "scopes",
            format!(
                "SELECT {} FROM api_scopes WHERE api_resource_id = {} ORDER BY id",
                API_SCOPE_COLUMNS, id
            ),
            |a, r| {
                a.scopes = decode_all(r, rows::api_scope)?;
                Ok(())
            },
        )
        .child(
            "scopes.user_claims",
            format!(
                r#"
                SELECT c.id, c.api_scope_id, c.claim_type
                FROM api_scope_claims c
                JOIN api_scopes s ON s.id = c.api_scope_id
                WHERE s.api_resource_id = {}
                ORDER BY c.id
                "#,
                id
            ),
            |a, r| {
                for claim in decode_all(r, rows::api_scope_claim)? {
                    if let Some(scope) = a.scopes.iter_mut().find(|s| s.id == claim.api_scope_id) {
                        scope.user_claims.push(claim);
                    }
                }
                Ok(())
            },
        )
    }

    fn scope_plan(api_resource_id: EntityId, scope_id: EntityId) -> ReadPlan<ApiScope> {
        ReadPlan::new(
            format!(
                "SELECT {} FROM api_scopes WHERE id = {} AND api_resource_id = {}",
                API_SCOPE_COLUMNS, scope_id, api_resource_id
            ),
            rows::api_scope,
        )
        .child(
            "user_claims",
            format!(
                "SELECT id, api_scope_id, claim_type FROM api_scope_claims WHERE api_scope_id = {} ORDER BY id",
                scope_id
            ),
            |s, r| {
                s.user_claims = decode_all(r, rows::api_scope_claim)?;
                Ok(())
            },
        )
    }

    /// 插入 scope 行；父记录不存在时返回 `0`
    async fn insert_scope(
        conn: &mut PgConnection,
        api_resource_id: EntityId,
        scope: &ApiScope,
    ) -> RepoResult<EntityId> {
        let id: Option<EntityId> = sqlx::query_scalar(
            r#"
            INSERT INTO api_scopes (api_resource_id, name, display_name, description, required, emphasize, show_in_discovery_document)
            SELECT $1, $2, $3, $4, $5, $6, $7
            WHERE EXISTS (SELECT 1 FROM api_resources WHERE id = $1)
            RETURNING id
            "#,
        )
        .bind(api_resource_id)
        .bind(&scope.name)
        .bind(&scope.display_name)
        .bind(&scope.description)
        .bind(scope.required)
        .bind(scope.emphasize)
        .bind(scope.show_in_discovery_document)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

        Ok(id.unwrap_or(NEW_ID))
    }

    async fn insert_scope_claims(conn: &mut PgConnection, scope_id: EntityId, scope: &ApiScope) -> RepoResult<bool> {
        insert_rows(conn, API_SCOPE_CLAIMS, "api_scope_id, claim_type", &scope.user_claims, |b, c| {
            b.push_bind(scope_id).push_bind(c.claim_type.clone());
        })
        .await
    }

    /// 按固定顺序写入子集合，返回影响行数为 0 的表
    async fn insert_children(
        conn: &mut PgConnection,
        id: EntityId,
        resource: &ApiResource,
    ) -> RepoResult<Option<&'static str>> {
        if !insert_rows(
            conn,
            API_RESOURCE_CLAIMS,
            "api_resource_id, claim_type",
            &resource.user_claims,
            |b, c| {
                b.push_bind(id).push_bind(c.claim_type.clone());
            },
        )
        .await?
        {
            return Ok(Some(API_RESOURCE_CLAIMS));
        }

        if !insert_rows(
            conn,
            API_SECRETS,
            "api_resource_id, description, value, expiration, secret_type",
            &resource.secrets,
            |b, s| {
                b.push_bind(id)
                    .push_bind(s.description.clone())
                    .push_bind(s.value.clone())
                    .push_bind(s.expiration)
                    .push_bind(s.secret_type.clone());
            },
        )
        .await?
        {
            return Ok(Some(API_SECRETS));
        }

        for scope in &resource.scopes {
            let scope_id = Self::insert_scope(conn, id, scope).await?;
            if scope_id == NEW_ID {
                return Ok(Some(API_SCOPES));
            }
            if !Self::insert_scope_claims(conn, scope_id, scope).await? {
                return Ok(Some(API_SCOPE_CLAIMS));
            }
        }

        Ok(None)
    }

    async fn delete_all_children(conn: &mut PgConnection, id: EntityId) -> RepoResult<()> {
        sqlx::query(
            "DELETE FROM api_scope_claims WHERE api_scope_id IN (SELECT id FROM api_scopes WHERE api_resource_id = $1)",
        )
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

        delete_children(
            conn,
            &[API_SCOPES, API_RESOURCE_CLAIMS, API_SECRETS],
            "api_resource_id",
            id,
        )
        .await
    }
}

#[async_trait]
impl UnitOfWork for PostgresApiResourceRepository {
    fn auto_save_changes(&self) -> bool {
        true
    }

    async fn save_all_changes(&self) -> RepoResult<usize> {
        Err(unsupported_save())
    }
}

#[async_trait]
impl ApiResourceRepository for PostgresApiResourceRepository {
    async fn get_api_resources(
        &self,
        search: &str,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<ApiResource>> {
        debug!(search, page = pagination.page, "Listing api resources");
        let (limit, offset) = page_bounds(&pagination)?;
        let pattern = contains_pattern(search);

        let records = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM api_resources
            WHERE name ILIKE $1 ESCAPE '\'
            ORDER BY name COLLATE "C", id
            LIMIT $2 OFFSET $3
            "#,
            API_RESOURCE_COLUMNS
        ))
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let total: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM api_resources WHERE name ILIKE $1 ESCAPE '\'"#)
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        let items = decode_all(&records, rows::api_resource).map_err(map_sqlx_error)?;
        Ok(PagedResult::new(items, total as u64, &pagination))
    }

    async fn get_api_resource(&self, id: EntityId) -> RepoResult<Option<ApiResource>> {
        debug!("Finding api resource by id: {}", id);
        let timer = QueryTimer::new(API_RESOURCES, "read_aggregate");

        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        let resource = Self::read_plan(id).fetch_optional(&mut conn).await?;

        timer.finish();
        Ok(resource)
    }

    async fn api_resource_name_exists(&self, name: &str, exclude: Option<EntityId>) -> RepoResult<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM api_resources WHERE name = $1 AND ($2::INTEGER IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn add_api_resource(&self, resource: &ApiResource) -> RepoResult<EntityId> {
        debug!(name = %resource.name, "Adding api resource");
        let mut tx = self.tx_manager.begin().await?;

        let id: Option<EntityId> = sqlx::query_scalar(
            "INSERT INTO api_resources (enabled, name, display_name, description) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(resource.enabled)
        .bind(&resource.name)
        .bind(&resource.display_name)
        .bind(&resource.description)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let id = id.unwrap_or(NEW_ID);
        if id == NEW_ID {
            roll_back(tx, AGGREGATE, API_RESOURCES).await?;
            return Ok(NEW_ID);
        }

        if let Some(table) = Self::insert_children(&mut tx, id, resource).await? {
            roll_back(tx, AGGREGATE, table).await?;
            return Ok(NEW_ID);
        }

        commit(tx, AGGREGATE).await?;
        Ok(id)
    }

    async fn update_api_resource(&self, resource: &ApiResource) -> RepoResult<u64> {
        debug!(id = resource.id, name = %resource.name, "Updating api resource");
        let mut tx = self.tx_manager.begin().await?;

        Self::delete_all_children(&mut tx, resource.id).await?;

        let affected = sqlx::query(
            "UPDATE api_resources SET enabled = $2, name = $3, display_name = $4, description = $5 WHERE id = $1",
        )
        .bind(resource.id)
        .bind(resource.enabled)
        .bind(&resource.name)
        .bind(&resource.display_name)
        .bind(&resource.description)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

        if affected == 0 {
            roll_back(tx, AGGREGATE, API_RESOURCES).await?;
            return Ok(0);
        }

        if let Some(table) = Self::insert_children(&mut tx, resource.id, resource).await? {
            roll_back(tx, AGGREGATE, table).await?;
            return Ok(0);
        }

        commit(tx, AGGREGATE).await?;
        Ok(affected)
    }

    async fn delete_api_resource(&self, resource: &ApiResource) -> RepoResult<u64> {
        debug!(id = resource.id, "Deleting api resource");
        let mut tx = self.tx_manager.begin().await?;

        Self::delete_all_children(&mut tx, resource.id).await?;

        let affected = sqlx::query("DELETE FROM api_resources WHERE id = $1")
            .bind(resource.id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

        commit(tx, AGGREGATE).await?;
        Ok(affected)
    }

    async fn get_api_resource_name(&self, id: EntityId) -> RepoResult<String> {
        let name: Option<String> = sqlx::query_scalar("SELECT name FROM api_resources WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        name.ok_or_else(|| RepositoryError::not_found(format!("Api resource {} not found", id)))
    }

    async fn get_api_scopes(
        &self,
        api_resource_id: EntityId,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<ApiScope>> {
        let (limit, offset) = page_bounds(&pagination)?;

        let records = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM api_scopes
            WHERE api_resource_id = $1
            ORDER BY name COLLATE "C", id
            LIMIT $2 OFFSET $3
            "#,
            API_SCOPE_COLUMNS
        ))
        .bind(api_resource_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM api_scopes WHERE api_resource_id = $1")
            .bind(api_resource_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let items = decode_all(&records, rows::api_scope).map_err(map_sqlx_error)?;
        Ok(PagedResult::new(items, total as u64, &pagination))
    }

    async fn get_api_scope(&self, api_resource_id: EntityId, scope_id: EntityId) -> RepoResult<Option<ApiScope>> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        Self::scope_plan(api_resource_id, scope_id)
            .fetch_optional(&mut conn)
            .await
    }

    async fn api_scope_name_exists(&self, name: &str, exclude: Option<EntityId>) -> RepoResult<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM api_scopes WHERE name = $1 AND ($2::INTEGER IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn add_api_scope(&self, api_resource_id: EntityId, scope: &ApiScope) -> RepoResult<EntityId> {
        debug!(api_resource_id, name = %scope.name, "Adding api scope");
        let mut tx = self.tx_manager.begin().await?;

        let scope_id = Self::insert_scope(&mut tx, api_resource_id, scope).await?;
        if scope_id == NEW_ID {
            roll_back(tx, AGGREGATE, API_SCOPES).await?;
            return Ok(NEW_ID);
        }

        if !Self::insert_scope_claims(&mut tx, scope_id, scope).await? {
            roll_back(tx, AGGREGATE, API_SCOPE_CLAIMS).await?;
            return Ok(NEW_ID);
        }

        commit(tx, AGGREGATE).await?;
        Ok(scope_id)
    }

    async fn update_api_scope(&self, api_resource_id: EntityId, scope: &ApiScope) -> RepoResult<u64> {
        debug!(api_resource_id, scope_id = scope.id, "Updating api scope");
        let mut tx = self.tx_manager.begin().await?;

        delete_children(&mut tx, &[API_SCOPE_CLAIMS], "api_scope_id", scope.id).await?;

        let affected = sqlx::query(
            r#"
            UPDATE api_scopes
            SET name = $3, display_name = $4, description = $5, required = $6, emphasize = $7,
                show_in_discovery_document = $8
            WHERE id = $1 AND api_resource_id = $2
            "#,
        )
        .bind(scope.id)
        .bind(api_resource_id)
        .bind(&scope.name)
        .bind(&scope.display_name)
        .bind(&scope.description)
        .bind(scope.required)
        .bind(scope.emphasize)
        .bind(scope.show_in_discovery_document)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

        if affected == 0 {
            roll_back(tx, AGGREGATE, API_SCOPES).await?;
            return Ok(0);
        }

        if !Self::insert_scope_claims(&mut tx, scope.id, scope).await? {
            roll_back(tx, AGGREGATE, API_SCOPE_CLAIMS).await?;
            return Ok(0);
        }

        commit(tx, AGGREGATE).await?;
        Ok(affected)
    }

    async fn delete_api_scope(&self, scope: &ApiScope) -> RepoResult<u64> {
        debug!(scope_id = scope.id, "Deleting api scope");
        let mut tx = self.tx_manager.begin().await?;

        delete_children(&mut tx, &[API_SCOPE_CLAIMS], "api_scope_id", scope.id).await?;

        let affected = sqlx::query("DELETE FROM api_scopes WHERE id = $1")
            .bind(scope.id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

        commit(tx, AGGREGATE).await?;
        Ok(affected)
    }

    async fn get_api_secrets(
        &self,
        api_resource_id: EntityId,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<ApiSecret>> {
        let (limit, offset) = page_bounds(&pagination)?;

        let records = sqlx::query(&format!(
            "SELECT {} FROM api_secrets WHERE api_resource_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
            SECRET_COLUMNS
        ))
        .bind(api_resource_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM api_secrets WHERE api_resource_id = $1")
            .bind(api_resource_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let items = decode_all(&records, rows::api_secret).map_err(map_sqlx_error)?;
        Ok(PagedResult::new(items, total as u64, &pagination))
    }

    async fn get_api_secret(&self, secret_id: EntityId) -> RepoResult<Option<ApiSecret>> {
        let row = sqlx::query(&format!("SELECT {} FROM api_secrets WHERE id = $1", SECRET_COLUMNS))
            .bind(secret_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(rows::api_secret).transpose().map_err(map_sqlx_error)
    }

    async fn add_api_secret(&self, api_resource_id: EntityId, secret: &ApiSecret) -> RepoResult<EntityId> {
        debug!(api_resource_id, "Adding api secret");
        let id: Option<EntityId> = sqlx::query_scalar(
            r#"
            INSERT INTO api_secrets (api_resource_id, description, value, expiration, secret_type)
            SELECT $1, $2, $3, $4, $5
            WHERE EXISTS (SELECT 1 FROM api_resources WHERE id = $1)
            RETURNING id
            "#,
        )
        .bind(api_resource_id)
        .bind(&secret.description)
        .bind(&secret.value)
        .bind(secret.expiration)
        .bind(&secret.secret_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(id.unwrap_or(NEW_ID))
    }

    async fn delete_api_secret(&self, secret: &ApiSecret) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM api_secrets WHERE id = $1")
            .bind(secret.id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}
