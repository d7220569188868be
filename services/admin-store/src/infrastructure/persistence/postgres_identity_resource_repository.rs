use async_trait::async_trait;
use ids_adapter_postgres::{ReadPlan, TransactionManager, map_sqlx_error};
use ids_common::{EntityId, NEW_ID, PagedResult, Pagination, contains_pattern};
use ids_errors::RepoResult;
use ids_ports::UnitOfWork;
use sqlx::{PgConnection, PgPool};
use tracing::debug;

use super::rows::{self, IDENTITY_RESOURCE_COLUMNS, decode_all};
use super::{commit, delete_children, insert_rows, page_bounds, roll_back, unsupported_save};
use crate::domain::identity_resource::{IdentityResource, IdentityResourceRepository};
use crate::infrastructure::db_metrics::QueryTimer;
use crate::infrastructure::tables::{IDENTITY_CLAIMS, IDENTITY_RESOURCES};

const AGGREGATE: &str = "identity_resource";

pub struct PostgresIdentityResourceRepository {
    pool: PgPool,
    tx_manager: TransactionManager,
}

impl PostgresIdentityResourceRepository {
    pub fn new(pool: PgPool) -> Self {
        let tx_manager = TransactionManager::new(pool.clone());
        Self { pool, tx_manager }
    }

    fn read_plan(id: EntityId) -> ReadPlan<IdentityResource> {
        ReadPlan::new(
            format!("SELECT {} FROM identity_resources WHERE id = {}", IDENTITY_RESOURCE_COLUMNS, id),
            rows::identity_resource,
        )
        .child(
            "user_claims",
            format!(
                "SELECT id, identity_resource_id, claim_type FROM identity_claims WHERE identity_resource_id = {} ORDER BY id",
                id
            ),
            |r, set| {
                r.user_claims = decode_all(set, rows::identity_claim)?;
                Ok(())
            },
        )
    }

    async fn insert_claims(conn: &mut PgConnection, id: EntityId, resource: &IdentityResource) -> RepoResult<bool> {
        insert_rows(
            conn,
            IDENTITY_CLAIMS,
            "identity_resource_id, claim_type",
            &resource.user_claims,
            |b, c| {
                b.push_bind(id).push_bind(c.claim_type.clone());
            },
        )
        .await
    }
}

#[async_trait]
impl UnitOfWork for PostgresIdentityResourceRepository {
    fn auto_save_changes(&self) -> bool {
        true
    }

    async fn save_all_changes(&self) -> RepoResult<usize> {
        Err(unsupported_save())
    }
}

#[async_trait]
impl IdentityResourceRepository for PostgresIdentityResourceRepository {
    async fn get_identity_resources(
        &self,
        search: &str,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<IdentityResource>> {
        debug!(search, page = pagination.page, "Listing identity resources");
        let (limit, offset) = page_bounds(&pagination)?;
        let pattern = contains_pattern(search);

        let records = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM identity_resources
            WHERE name ILIKE $1 ESCAPE '\'
            ORDER BY name COLLATE "C", id
            LIMIT $2 OFFSET $3
            "#,
            IDENTITY_RESOURCE_COLUMNS
        ))
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let total: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM identity_resources WHERE name ILIKE $1 ESCAPE '\'"#)
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        let items = decode_all(&records, rows::identity_resource).map_err(map_sqlx_error)?;
        Ok(PagedResult::new(items, total as u64, &pagination))
    }

    async fn get_identity_resource(&self, id: EntityId) -> RepoResult<Option<IdentityResource>> {
        debug!("Finding identity resource by id: {}", id);
        let timer = QueryTimer::new(IDENTITY_RESOURCES, "read_aggregate");

        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        let resource = Self::read_plan(id).fetch_optional(&mut conn).await?;

        timer.finish();
        Ok(resource)
    }

    async fn identity_resource_name_exists(&self, name: &str, exclude: Option<EntityId>) -> RepoResult<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM identity_resources WHERE name = $1 AND ($2::INTEGER IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn add_identity_resource(&self, resource: &IdentityResource) -> RepoResult<EntityId> {
        debug!(name = %resource.name, "Adding identity resource");
        let mut tx = self.tx_manager.begin().await?;

        let id: Option<EntityId> = sqlx::query_scalar(
            r#"
            INSERT INTO identity_resources (enabled, name, display_name, description, required, emphasize, show_in_discovery_document)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(resource.enabled)
        .bind(&resource.name)
        .bind(&resource.display_name)
        .bind(&resource.description)
        .bind(resource.required)
        .bind(resource.emphasize)
        .bind(resource.show_in_discovery_document)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let id = id.unwrap_or(NEW_ID);
        if id == NEW_ID {
            roll_back(tx, AGGREGATE, IDENTITY_RESOURCES).await?;
            return Ok(NEW_ID);
        }

        if !Self::insert_claims(&mut tx, id, resource).await? {
            roll_back(tx, AGGREGATE, IDENTITY_CLAIMS).await?;
            return Ok(NEW_ID);
        }

        commit(tx, AGGREGATE).await?;
        Ok(id)
    }

    async fn update_identity_resource(&self, resource: &IdentityResource) -> RepoResult<u64> {
        debug!(id = resource.id, name = %resource.name, "Updating identity resource");
        let mut tx = self.tx_manager.begin().await?;

        delete_children(&mut tx, &[IDENTITY_CLAIMS], "identity_resource_id", resource.id).await?;

        let affected = sqlx::query(
            r#"
            UPDATE identity_resources
            SET enabled = $2, name = $3, display_name = $4, description = $5, required = $6,
                emphasize = $7, show_in_discovery_document = $8
            WHERE id = $1
            "#,
        )
        .bind(resource.id)
        .bind(resource.enabled)
        .bind(&resource.name)
        .bind(&resource.display_name)
        .bind(&resource.description)
        .bind(resource.required)
        .bind(resource.emphasize)
        .bind(resource.show_in_discovery_document)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

        if affected == 0 {
            roll_back(tx, AGGREGATE, IDENTITY_RESOURCES).await?;
            return Ok(0);
        }

        if !Self::insert_claims(&mut tx, resource.id, resource).await? {
            roll_back(tx, AGGREGATE, IDENTITY_CLAIMS).await?;
            return Ok(0);
        }

        commit(tx, AGGREGATE).await?;
        Ok(affected)
    }

    async fn delete_identity_resource(&self, resource: &IdentityResource) -> RepoResult<u64> {
        debug!(id = resource.id, "Deleting identity resource");
        let mut tx = self.tx_manager.begin().await?;

        delete_children(&mut tx, &[IDENTITY_CLAIMS], "identity_resource_id", resource.id).await?;

        let affected = sqlx::query("DELETE FROM identity_resources WHERE id = $1")
            .bind(resource.id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

        commit(tx, AGGREGATE).await?;
        Ok(affected)
    }
}
