use std::sync::Arc;

use async_trait::async_trait;
use ids_adapter_postgres::{ReadPlan, TransactionManager, map_sqlx_error};
use ids_common::{EntityId, NEW_ID, PagedResult, Pagination, contains_pattern};
use ids_errors::RepoResult;
use ids_ports::UnitOfWork;
use sqlx::{PgConnection, PgPool};
use tracing::debug;

use super::rows::{self, CLIENT_COLUMNS, ClientRow, decode_all};
use super::{commit, delete_children, insert_rows, page_bounds, roll_back, unsupported_save};
use crate::domain::catalog::Catalog;
use crate::domain::client::{
    Client, ClientClaim, ClientName, ClientProperty, ClientRepository, ClientSecret,
};
use crate::infrastructure::db_metrics::QueryTimer;
use crate::infrastructure::tables::*;

const AGGREGATE: &str = "client";

const SECRET_COLUMNS: &str = "id, client_id, description, value, expiration, secret_type";
const CLAIM_COLUMNS: &str = "id, client_id, claim_type, value";
const PROPERTY_COLUMNS: &str = "id, client_id, key, value";

pub struct PostgresClientRepository {
    pool: PgPool,
    tx_manager: TransactionManager,
    catalog: Arc<Catalog>,
}

impl PostgresClientRepository {
    pub fn new(pool: PgPool, catalog: Arc<Catalog>) -> Self {
        let tx_manager = TransactionManager::new(pool.clone());
        Self {
            pool,
            tx_manager,
            catalog,
        }
    }

    /// 聚合读取计划：根记录之后依次为各子集合
    fn read_plan(id: EntityId) -> ReadPlan<Client> {
        let child = |columns: &str, table: &str| {
            format!("SELECT {} FROM {} WHERE client_id = {} ORDER BY id", columns, table, id)
        };

        ReadPlan::new(
            format!("SELECT {} FROM clients WHERE id = {}", CLIENT_COLUMNS, id),
            rows::client,
        )
        .child(
            "allowed_grant_types",
            child("id, client_id, grant_type", CLIENT_GRANT_TYPES),
            |c, r| {
                c.allowed_grant_types = decode_all(r, rows::client_grant_type)?;
                Ok(())
            },
        )
        .child(
            "redirect_uris",
            child("id, client_id, redirect_uri", CLIENT_REDIRECT_URIS),
            |c, r| {
                c.redirect_uris = decode_all(r, rows::client_redirect_uri)?;
                Ok(())
            },
        )
        .child(
            "post_logout_redirect_uris",
            child("id, client_id, post_logout_redirect_uri", CLIENT_POST_LOGOUT_REDIRECT_URIS),
            |c, r| {
                c.post_logout_redirect_uris = decode_all(r, rows::client_post_logout_redirect_uri)?;
                Ok(())
            },
        )
        .child(
            "allowed_scopes",
            child("id, client_id, scope", CLIENT_SCOPES),
            |c, r| {
                c.allowed_scopes = decode_all(r, rows::client_scope)?;
                Ok(())
            },
        )
        .child(
            "client_secrets",
            child(SECRET_COLUMNS, CLIENT_SECRETS),
            |c, r| {
                c.client_secrets = decode_all(r, rows::client_secret)?;
                Ok(())
            },
        )
        .child("claims", child(CLAIM_COLUMNS, CLIENT_CLAIMS), |c, r| {
            c.claims = decode_all(r, rows::client_claim)?;
            Ok(())
        })
        .child(
            "identity_provider_restrictions",
            child("id, client_id, provider", CLIENT_IDP_RESTRICTIONS),
            |c, r| {
                c.identity_provider_restrictions = decode_all(r, rows::client_idp_restriction)?;
                Ok(())
            },
        )
        .child(
            "allowed_cors_origins",
            child("id, client_id, origin", CLIENT_CORS_ORIGINS),
            |c, r| {
                c.allowed_cors_origins = decode_all(r, rows::client_cors_origin)?;
                Ok(())
            },
        )
        .child(
            "properties",
            child(PROPERTY_COLUMNS, CLIENT_PROPERTIES),
            |c, r| {
                c.properties = decode_all(r, rows::client_property)?;
                Ok(())
            },
        )
    }

    async fn insert_root(conn: &mut PgConnection, client: &Client) -> RepoResult<EntityId> {
        let id: Option<EntityId> = sqlx::query_scalar(
            r#"
            INSERT INTO clients (
                enabled, client_id, protocol_type, require_client_secret, client_name, description,
                client_uri, logo_uri, require_consent, allow_remember_consent,
                always_include_user_claims_in_id_token, require_pkce, allow_plain_text_pkce,
                allow_access_tokens_via_browser, front_channel_logout_uri,
                front_channel_logout_session_required, back_channel_logout_uri,
                back_channel_logout_session_required, allow_offline_access, identity_token_lifetime,
                access_token_lifetime, authorization_code_lifetime, consent_lifetime,
                absolute_refresh_token_lifetime, sliding_refresh_token_lifetime, refresh_token_usage,
                update_access_token_claims_on_refresh, refresh_token_expiration, access_token_type,
                enable_local_login, include_jwt_id, always_send_client_claims, client_claims_prefix,
                pair_wise_subject_salt
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31, $32, $33, $34)
            RETURNING id
            "#,
        )
        .bind(client.enabled)
        .bind(&client.client_id)
        .bind(&client.protocol_type)
        .bind(client.require_client_secret)
        .bind(&client.client_name)
        .bind(&client.description)
        .bind(&client.client_uri)
        .bind(&client.logo_uri)
        .bind(client.require_consent)
        .bind(client.allow_remember_consent)
        .bind(client.always_include_user_claims_in_id_token)
        .bind(client.require_pkce)
        .bind(client.allow_plain_text_pkce)
        .bind(client.allow_access_tokens_via_browser)
        .bind(&client.front_channel_logout_uri)
        .bind(client.front_channel_logout_session_required)
        .bind(&client.back_channel_logout_uri)
        .bind(client.back_channel_logout_session_required)
        .bind(client.allow_offline_access)
        .bind(client.identity_token_lifetime)
        .bind(client.access_token_lifetime)
        .bind(client.authorization_code_lifetime)
        .bind(client.consent_lifetime)
        .bind(client.absolute_refresh_token_lifetime)
        .bind(client.sliding_refresh_token_lifetime)
        .bind(client.refresh_token_usage as i32)
        .bind(client.update_access_token_claims_on_refresh)
        .bind(client.refresh_token_expiration as i32)
        .bind(client.access_token_type as i32)
        .bind(client.enable_local_login)
        .bind(client.include_jwt_id)
        .bind(client.always_send_client_claims)
        .bind(&client.client_claims_prefix)
        .bind(&client.pair_wise_subject_salt)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

        Ok(id.unwrap_or(NEW_ID))
    }

    async fn update_root(conn: &mut PgConnection, client: &Client) -> RepoResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE clients
            SET enabled = $2, client_id = $3, protocol_type = $4, require_client_secret = $5,
                client_name = $6, description = $7, client_uri = $8, logo_uri = $9,
                require_consent = $10, allow_remember_consent = $11,
                always_include_user_claims_in_id_token = $12, require_pkce = $13,
                allow_plain_text_pkce = $14, allow_access_tokens_via_browser = $15,
                front_channel_logout_uri = $16, front_channel_logout_session_required = $17,
                back_channel_logout_uri = $18, back_channel_logout_session_required = $19,
                allow_offline_access = $20, identity_token_lifetime = $21,
                access_token_lifetime = $22, authorization_code_lifetime = $23,
                consent_lifetime = $24, absolute_refresh_token_lifetime = $25,
                sliding_refresh_token_lifetime = $26, refresh_token_usage = $27,
                update_access_token_claims_on_refresh = $28, refresh_token_expiration = $29,
                access_token_type = $30, enable_local_login = $31, include_jwt_id = $32,
                always_send_client_claims = $33, client_claims_prefix = $34,
                pair_wise_subject_salt = $35
            WHERE id = $1
            "#,
        )
        .bind(client.id)
        .bind(client.enabled)
        .bind(&client.client_id)
        .bind(&client.protocol_type)
        .bind(client.require_client_secret)
        .bind(&client.client_name)
        .bind(&client.description)
        .bind(&client.client_uri)
        .bind(&client.logo_uri)
        .bind(client.require_consent)
        .bind(client.allow_remember_consent)
        .bind(client.always_include_user_claims_in_id_token)
        .bind(client.require_pkce)
        .bind(client.allow_plain_text_pkce)
        .bind(client.allow_access_tokens_via_browser)
        .bind(&client.front_channel_logout_uri)
        .bind(client.front_channel_logout_session_required)
        .bind(&client.back_channel_logout_uri)
        .bind(client.back_channel_logout_session_required)
        .bind(client.allow_offline_access)
        .bind(client.identity_token_lifetime)
        .bind(client.access_token_lifetime)
        .bind(client.authorization_code_lifetime)
        .bind(client.consent_lifetime)
        .bind(client.absolute_refresh_token_lifetime)
        .bind(client.sliding_refresh_token_lifetime)
        .bind(client.refresh_token_usage as i32)
        .bind(client.update_access_token_claims_on_refresh)
        .bind(client.refresh_token_expiration as i32)
        .bind(client.access_token_type as i32)
        .bind(client.enable_local_login)
        .bind(client.include_jwt_id)
        .bind(client.always_send_client_claims)
        .bind(&client.client_claims_prefix)
        .bind(&client.pair_wise_subject_salt)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    /// 按固定顺序写入全部子集合，返回影响行数为 0 的表
    async fn insert_children(
        conn: &mut PgConnection,
        id: EntityId,
        client: &Client,
    ) -> RepoResult<Option<&'static str>> {
        if !insert_rows(conn, CLIENT_SCOPES, "client_id, scope", &client.allowed_scopes, |b, s| {
            b.push_bind(id).push_bind(s.scope.clone());
        })
        .await?
        {
            return Ok(Some(CLIENT_SCOPES));
        }

        if !insert_rows(
            conn,
            CLIENT_GRANT_TYPES,
            "client_id, grant_type",
            &client.allowed_grant_types,
            |b, g| {
                b.push_bind(id).push_bind(g.grant_type.clone());
            },
        )
        .await?
        {
            return Ok(Some(CLIENT_GRANT_TYPES));
        }

        if !insert_rows(
            conn,
            CLIENT_REDIRECT_URIS,
            "client_id, redirect_uri",
            &client.redirect_uris,
            |b, u| {
                b.push_bind(id).push_bind(u.redirect_uri.clone());
            },
        )
        .await?
        {
            return Ok(Some(CLIENT_REDIRECT_URIS));
        }

        if !insert_rows(
            conn,
            CLIENT_CORS_ORIGINS,
            "client_id, origin",
            &client.allowed_cors_origins,
            |b, o| {
                b.push_bind(id).push_bind(o.origin.clone());
            },
        )
        .await?
        {
            return Ok(Some(CLIENT_CORS_ORIGINS));
        }

        if !insert_rows(
            conn,
            CLIENT_IDP_RESTRICTIONS,
            "client_id, provider",
            &client.identity_provider_restrictions,
            |b, p| {
                b.push_bind(id).push_bind(p.provider.clone());
            },
        )
        .await?
        {
            return Ok(Some(CLIENT_IDP_RESTRICTIONS));
        }

        if !insert_rows(
            conn,
            CLIENT_POST_LOGOUT_REDIRECT_URIS,
            "client_id, post_logout_redirect_uri",
            &client.post_logout_redirect_uris,
            |b, u| {
                b.push_bind(id).push_bind(u.post_logout_redirect_uri.clone());
            },
        )
        .await?
        {
            return Ok(Some(CLIENT_POST_LOGOUT_REDIRECT_URIS));
        }

        if !insert_rows(
            conn,
            CLIENT_SECRETS,
            "client_id, description, value, expiration, secret_type",
            &client.client_secrets,
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
            return Ok(Some(CLIENT_SECRETS));
        }

        if !insert_rows(
            conn,
            CLIENT_CLAIMS,
            "client_id, claim_type, value",
            &client.claims,
            |b, c| {
                b.push_bind(id)
                    .push_bind(c.claim_type.clone())
                    .push_bind(c.value.clone());
            },
        )
        .await?
        {
            return Ok(Some(CLIENT_CLAIMS));
        }

        if !insert_rows(
            conn,
            CLIENT_PROPERTIES,
            "client_id, key, value",
            &client.properties,
            |b, p| {
                b.push_bind(id).push_bind(p.key.clone()).push_bind(p.value.clone());
            },
        )
        .await?
        {
            return Ok(Some(CLIENT_PROPERTIES));
        }

        Ok(None)
    }

    async fn count_children(&self, table: &str, client_id: EntityId) -> RepoResult<u64> {
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE client_id = $1",
            table
        ))
        .bind(client_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(total as u64)
    }
}

#[async_trait]
impl UnitOfWork for PostgresClientRepository {
    fn auto_save_changes(&self) -> bool {
        true
    }

    async fn save_all_changes(&self) -> RepoResult<usize> {
        Err(unsupported_save())
    }
}

#[async_trait]
impl ClientRepository for PostgresClientRepository {
    fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    async fn get_client(&self, id: EntityId) -> RepoResult<Option<Client>> {
        debug!("Finding client by id: {}", id);
        let timer = QueryTimer::new(CLIENTS, "read_aggregate");

        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        let client = Self::read_plan(id).fetch_optional(&mut conn).await?;

        timer.finish();
        Ok(client)
    }

    async fn get_clients(&self, search: &str, pagination: Pagination) -> RepoResult<PagedResult<Client>> {
        debug!(search, page = pagination.page, "Listing clients");
        let (limit, offset) = page_bounds(&pagination)?;
        let pattern = contains_pattern(search);

        let rows = sqlx::query_as::<_, ClientRow>(&format!(
            r#"
            SELECT {}
            FROM clients
            WHERE client_id ILIKE $1 ESCAPE '\' OR client_name ILIKE $1 ESCAPE '\'
            ORDER BY client_name COLLATE "C" NULLS FIRST, id
            LIMIT $2 OFFSET $3
            "#,
            CLIENT_COLUMNS
        ))
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM clients
            WHERE client_id ILIKE $1 ESCAPE '\' OR client_name ILIKE $1 ESCAPE '\'
            "#,
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let items = rows
            .into_iter()
            .map(Client::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sqlx_error)?;
        Ok(PagedResult::new(items, total as u64, &pagination))
    }

    async fn get_client_id(&self, id: EntityId) -> RepoResult<Option<ClientName>> {
        let row: Option<(String, Option<String>)> =
            sqlx::query_as("SELECT client_id, client_name FROM clients WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(row.map(|(client_id, client_name)| ClientName {
            client_id,
            client_name,
        }))
    }

    async fn client_id_exists(&self, client_id: &str, exclude: Option<EntityId>) -> RepoResult<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM clients WHERE client_id = $1 AND ($2::INTEGER IS NULL OR id <> $2))",
        )
        .bind(client_id)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn add_client(&self, client: &Client) -> RepoResult<EntityId> {
        debug!(client_id = %client.client_id, "Adding client");
        let timer = QueryTimer::new(CLIENTS, "insert_aggregate");
        let mut tx = self.tx_manager.begin().await?;

        let id = Self::insert_root(&mut tx, client).await?;
        if id == NEW_ID {
            roll_back(tx, AGGREGATE, CLIENTS).await?;
            return Ok(NEW_ID);
        }

        if let Some(table) = Self::insert_children(&mut tx, id, client).await? {
            roll_back(tx, AGGREGATE, table).await?;
            return Ok(NEW_ID);
        }

        commit(tx, AGGREGATE).await?;
        timer.finish();
        Ok(id)
    }

    async fn update_client(&self, client: &Client) -> RepoResult<u64> {
        debug!(id = client.id, client_id = %client.client_id, "Updating client");
        let timer = QueryTimer::new(CLIENTS, "update_aggregate");
        let mut tx = self.tx_manager.begin().await?;

        delete_children(&mut tx, &CLIENT_CHILD_TABLES, "client_id", client.id).await?;

        let affected = Self::update_root(&mut tx, client).await?;
        if affected == 0 {
            roll_back(tx, AGGREGATE, CLIENTS).await?;
            return Ok(0);
        }

        if let Some(table) = Self::insert_children(&mut tx, client.id, client).await? {
            roll_back(tx, AGGREGATE, table).await?;
            return Ok(0);
        }

        commit(tx, AGGREGATE).await?;
        timer.finish();
        Ok(affected)
    }

    async fn remove_client(&self, client: &Client) -> RepoResult<u64> {
        debug!(id = client.id, "Removing client");
        let mut tx = self.tx_manager.begin().await?;

        delete_children(&mut tx, &CLIENT_CHILD_TABLES, "client_id", client.id).await?;

        let affected = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(client.id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

        commit(tx, AGGREGATE).await?;
        Ok(affected)
    }

    async fn get_scopes(&self, filter: &str, limit: usize) -> RepoResult<Vec<String>> {
        let pattern = contains_pattern(filter);
        let limit = (limit > 0).then_some(limit as i64);

        let mut names: Vec<String> = sqlx::query_scalar(
            r#"SELECT name FROM identity_resources WHERE name ILIKE $1 ESCAPE '\' ORDER BY name COLLATE "C" LIMIT $2"#,
        )
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let api_names: Vec<String> = sqlx::query_scalar(
            r#"SELECT name FROM api_resources WHERE name ILIKE $1 ESCAPE '\' ORDER BY name COLLATE "C" LIMIT $2"#,
        )
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        names.extend(api_names);
        Ok(names)
    }

    async fn get_client_secrets(
        &self,
        client_id: EntityId,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<ClientSecret>> {
        let (limit, offset) = page_bounds(&pagination)?;
        let records = sqlx::query(&format!(
            "SELECT {} FROM client_secrets WHERE client_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
            SECRET_COLUMNS
        ))
        .bind(client_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let items = decode_all(&records, rows::client_secret).map_err(map_sqlx_error)?;
        let total = self.count_children(CLIENT_SECRETS, client_id).await?;
        Ok(PagedResult::new(items, total, &pagination))
    }

    async fn get_client_secret(&self, secret_id: EntityId) -> RepoResult<Option<ClientSecret>> {
        let row = sqlx::query(&format!("SELECT {} FROM client_secrets WHERE id = $1", SECRET_COLUMNS))
            .bind(secret_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref()
            .map(rows::client_secret)
            .transpose()
            .map_err(map_sqlx_error)
    }

    async fn add_client_secret(&self, client_id: EntityId, secret: &ClientSecret) -> RepoResult<EntityId> {
        debug!(client_id, "Adding client secret");
        let id: Option<EntityId> = sqlx::query_scalar(
            r#"
            INSERT INTO client_secrets (client_id, description, value, expiration, secret_type)
            SELECT $1, $2, $3, $4, $5
            WHERE EXISTS (SELECT 1 FROM clients WHERE id = $1)
            RETURNING id
            "#,
        )
        .bind(client_id)
        .bind(&secret.description)
        .bind(&secret.value)
        .bind(secret.expiration)
        .bind(&secret.secret_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(id.unwrap_or(NEW_ID))
    }

    async fn delete_client_secret(&self, secret: &ClientSecret) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM client_secrets WHERE id = $1")
            .bind(secret.id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn get_client_claims(
        &self,
        client_id: EntityId,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<ClientClaim>> {
        let (limit, offset) = page_bounds(&pagination)?;
        let records = sqlx::query(&format!(
            "SELECT {} FROM client_claims WHERE client_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
            CLAIM_COLUMNS
        ))
        .bind(client_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let items = decode_all(&records, rows::client_claim).map_err(map_sqlx_error)?;
        let total = self.count_children(CLIENT_CLAIMS, client_id).await?;
        Ok(PagedResult::new(items, total, &pagination))
    }

    async fn get_client_claim(&self, claim_id: EntityId) -> RepoResult<Option<ClientClaim>> {
        let row = sqlx::query(&format!("SELECT {} FROM client_claims WHERE id = $1", CLAIM_COLUMNS))
            .bind(claim_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref()
            .map(rows::client_claim)
            .transpose()
            .map_err(map_sqlx_error)
    }

    async fn add_client_claim(&self, client_id: EntityId, claim: &ClientClaim) -> RepoResult<EntityId> {
        debug!(client_id, "Adding client claim");
        let id: Option<EntityId> = sqlx::query_scalar(
            r#"
            INSERT INTO client_claims (client_id, claim_type, value)
            SELECT $1, $2, $3
            WHERE EXISTS (SELECT 1 FROM clients WHERE id = $1)
            RETURNING id
            "#,
        )
        .bind(client_id)
        .bind(&claim.claim_type)
        .bind(&claim.value)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(id.unwrap_or(NEW_ID))
    }

    async fn delete_client_claim(&self, claim: &ClientClaim) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM client_claims WHERE id = $1")
            .bind(claim.id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn get_client_properties(
        &self,
        client_id: EntityId,
        pagination: Pagination,
    ) -> RepoResult<PagedResult<ClientProperty>> {
        let (limit, offset) = page_bounds(&pagination)?;
        let records = sqlx::query(&format!(
            "SELECT {} FROM client_properties WHERE client_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
            PROPERTY_COLUMNS
        ))
        .bind(client_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let items = decode_all(&records, rows::client_property).map_err(map_sqlx_error)?;
        let total = self.count_children(CLIENT_PROPERTIES, client_id).await?;
        Ok(PagedResult::new(items, total, &pagination))
    }

    async fn get_client_property(&self, property_id: EntityId) -> RepoResult<Option<ClientProperty>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM client_properties WHERE id = $1",
            PROPERTY_COLUMNS
        ))
        .bind(property_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref()
            .map(rows::client_property)
            .transpose()
            .map_err(map_sqlx_error)
    }

    async fn add_client_property(
        &self,
        client_id: EntityId,
        property: &ClientProperty,
    ) -> RepoResult<EntityId> {
        debug!(client_id, "Adding client property");
        let id: Option<EntityId> = sqlx::query_scalar(
            r#"
            INSERT INTO client_properties (client_id, key, value)
            SELECT $1, $2, $3
            WHERE EXISTS (SELECT 1 FROM clients WHERE id = $1)
            RETURNING id
            "#,
        )
        .bind(client_id)
        .bind(&property.key)
        .bind(&property.value)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(id.unwrap_or(NEW_ID))
    }

    async fn delete_client_property(&self, property: &ClientProperty) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM client_properties WHERE id = $1")
            .bind(property.id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}
