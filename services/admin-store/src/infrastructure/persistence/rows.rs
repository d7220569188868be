//! 行映射

use chrono::{DateTime, Utc};
use ids_common::EntityId;
use sqlx::Row;
use sqlx::postgres::PgRow;

use crate::domain::api_resource::{ApiResource, ApiResourceClaim, ApiScope, ApiScopeClaim, ApiSecret};
use crate::domain::client::{
    AccessTokenType, Client, ClientClaim, ClientCorsOrigin, ClientGrantType, ClientIdpRestriction,
    ClientPostLogoutRedirectUri, ClientProperty, ClientRedirectUri, ClientScope, ClientSecret,
    TokenExpiration, TokenUsage,
};
use crate::domain::identity_resource::{IdentityClaim, IdentityResource};
use crate::domain::log::LogEntry;
use crate::domain::persisted_grant::{PersistedGrant, PersistedGrantSubject};

pub(crate) type DecodeResult<T> = Result<T, sqlx::Error>;

pub(crate) const CLIENT_COLUMNS: &str = r#"
    id, enabled, client_id, protocol_type, require_client_secret, client_name, description,
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
"#;

pub(crate) const API_RESOURCE_COLUMNS: &str = "id, enabled, name, display_name, description";

pub(crate) const API_SCOPE_COLUMNS: &str =
    "id, api_resource_id, name, display_name, description, required, emphasize, show_in_discovery_document";

pub(crate) const IDENTITY_RESOURCE_COLUMNS: &str =
    "id, enabled, name, display_name, description, required, emphasize, show_in_discovery_document";

pub(crate) const PERSISTED_GRANT_COLUMNS: &str =
    "key, grant_type, subject_id, client_id, creation_time, expiration, data";

pub(crate) const LOG_COLUMNS: &str =
    "id, message, message_template, level, timestamp, exception, log_event, properties";

/// 把一个结果集解码为集合
pub(crate) fn decode_all<T>(rows: &[PgRow], decode: fn(&PgRow) -> DecodeResult<T>) -> DecodeResult<Vec<T>> {
    rows.iter().map(decode).collect()
}

#[derive(sqlx::FromRow)]
pub(crate) struct ClientRow {
    pub id: EntityId,
    pub enabled: bool,
    pub client_id: String,
    pub protocol_type: String,
    pub require_client_secret: bool,
    pub client_name: Option<String>,
    pub description: Option<String>,
    pub client_uri: Option<String>,
    pub logo_uri: Option<String>,
    pub require_consent: bool,
    pub allow_remember_consent: bool,
    pub always_include_user_claims_in_id_token: bool,
    pub require_pkce: bool,
    pub allow_plain_text_pkce: bool,
    pub allow_access_tokens_via_browser: bool,
    pub front_channel_logout_uri: Option<String>,
    pub front_channel_logout_session_required: bool,
    pub back_channel_logout_uri: Option<String>,
    pub back_channel_logout_session_required: bool,
    pub allow_offline_access: bool,
    pub identity_token_lifetime: i32,
    pub access_token_lifetime: i32,
    pub authorization_code_lifetime: i32,
    pub consent_lifetime: Option<i32>,
    pub absolute_refresh_token_lifetime: i32,
    pub sliding_refresh_token_lifetime: i32,
    pub refresh_token_usage: i32,
    pub update_access_token_claims_on_refresh: bool,
    pub refresh_token_expiration: i32,
    pub access_token_type: i32,
    pub enable_local_login: bool,
    pub include_jwt_id: bool,
    pub always_send_client_claims: bool,
    pub client_claims_prefix: Option<String>,
    pub pair_wise_subject_salt: Option<String>,
}

/// 未知的枚举整数作为行解码错误返回
fn decode_enum<T, E>(value: i32) -> DecodeResult<T>
where
    T: TryFrom<i32, Error = E>,
    E: std::error::Error + Send + Sync + 'static,
{
    T::try_from(value).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

impl TryFrom<ClientRow> for Client {
    type Error = sqlx::Error;

    fn try_from(row: ClientRow) -> DecodeResult<Self> {
        Ok(Self {
            id: row.id,
            enabled: row.enabled,
            client_id: row.client_id,
            protocol_type: row.protocol_type,
            require_client_secret: row.require_client_secret,
            client_name: row.client_name,
            description: row.description,
            client_uri: row.client_uri,
            logo_uri: row.logo_uri,
            require_consent: row.require_consent,
            allow_remember_consent: row.allow_remember_consent,
            always_include_user_claims_in_id_token: row.always_include_user_claims_in_id_token,
            require_pkce: row.require_pkce,
            allow_plain_text_pkce: row.allow_plain_text_pkce,
            allow_access_tokens_via_browser: row.allow_access_tokens_via_browser,
            front_channel_logout_uri: row.front_channel_logout_uri,
            front_channel_logout_session_required: row.front_channel_logout_session_required,
            back_channel_logout_uri: row.back_channel_logout_uri,
            back_channel_logout_session_required: row.back_channel_logout_session_required,
            allow_offline_access: row.allow_offline_access,
            identity_token_lifetime: row.identity_token_lifetime,
            access_token_lifetime: row.access_token_lifetime,
            authorization_code_lifetime: row.authorization_code_lifetime,
            consent_lifetime: row.consent_lifetime,
            absolute_refresh_token_lifetime: row.absolute_refresh_token_lifetime,
            sliding_refresh_token_lifetime: row.sliding_refresh_token_lifetime,
            refresh_token_usage: decode_enum::<TokenUsage, _>(row.refresh_token_usage)?,
            update_access_token_claims_on_refresh: row.update_access_token_claims_on_refresh,
            refresh_token_expiration: decode_enum::<TokenExpiration, _>(row.refresh_token_expiration)?,
            access_token_type: decode_enum::<AccessTokenType, _>(row.access_token_type)?,
            enable_local_login: row.enable_local_login,
            include_jwt_id: row.include_jwt_id,
            always_send_client_claims: row.always_send_client_claims,
            client_claims_prefix: row.client_claims_prefix,
            pair_wise_subject_salt: row.pair_wise_subject_salt,
            ..Default::default()
        })
    }
}

pub(crate) fn client(row: &PgRow) -> DecodeResult<Client> {
    <ClientRow as sqlx::FromRow<PgRow>>::from_row(row).and_then(Client::try_from)
}

pub(crate) fn client_scope(row: &PgRow) -> DecodeResult<ClientScope> {
    Ok(ClientScope {
        id: row.try_get("id")?,
        client_id: row.try_get("client_id")?,
        scope: row.try_get("scope")?,
    })
}

pub(crate) fn client_grant_type(row: &PgRow) -> DecodeResult<ClientGrantType> {
    Ok(ClientGrantType {
        id: row.try_get("id")?,
        client_id: row.try_get("client_id")?,
        grant_type: row.try_get("grant_type")?,
    })
}

pub(crate) fn client_redirect_uri(row: &PgRow) -> DecodeResult<ClientRedirectUri> {
    Ok(ClientRedirectUri {
        id: row.try_get("id")?,
        client_id: row.try_get("client_id")?,
        redirect_uri: row.try_get("redirect_uri")?,
    })
}

pub(crate) fn client_cors_origin(row: &PgRow) -> DecodeResult<ClientCorsOrigin> {
    Ok(ClientCorsOrigin {
        id: row.try_get("id")?,
        client_id: row.try_get("client_id")?,
        origin: row.try_get("origin")?,
    })
}

pub(crate) fn client_idp_restriction(row: &PgRow) -> DecodeResult<ClientIdpRestriction> {
    Ok(ClientIdpRestriction {
        id: row.try_get("id")?,
        client_id: row.try_get("client_id")?,
        provider: row.try_get("provider")?,
    })
}

pub(crate) fn client_post_logout_redirect_uri(row: &PgRow) -> DecodeResult<ClientPostLogoutRedirectUri> {
    Ok(ClientPostLogoutRedirectUri {
        id: row.try_get("id")?,
        client_id: row.try_get("client_id")?,
        post_logout_redirect_uri: row.try_get("post_logout_redirect_uri")?,
    })
}

pub(crate) fn client_secret(row: &PgRow) -> DecodeResult<ClientSecret> {
    Ok(ClientSecret {
        id: row.try_get("id")?,
        client_id: row.try_get("client_id")?,
        description: row.try_get("description")?,
        value: row.try_get("value")?,
        expiration: row.try_get::<Option<DateTime<Utc>>, _>("expiration")?,
        secret_type: row.try_get("secret_type")?,
    })
}

pub(crate) fn client_claim(row: &PgRow) -> DecodeResult<ClientClaim> {
    Ok(ClientClaim {
        id: row.try_get("id")?,
        client_id: row.try_get("client_id")?,
        claim_type: row.try_get("claim_type")?,
        value: row.try_get("value")?,
    })
}

pub(crate) fn client_property(row: &PgRow) -> DecodeResult<ClientProperty> {
    Ok(ClientProperty {
        id: row.try_get("id")?,
        client_id: row.try_get("client_id")?,
        key: row.try_get("key")?,
        value: row.try_get("value")?,
    })
}

pub(crate) fn api_resource(row: &PgRow) -> DecodeResult<ApiResource> {
    Ok(ApiResource {
        id: row.try_get("id")?,
        enabled: row.try_get("enabled")?,
        name: row.try_get("name")?,
        display_name: row.try_get("display_name")?,
        description: row.try_get("description")?,
        ..Default::default()
    })
}

pub(crate) fn api_resource_claim(row: &PgRow) -> DecodeResult<ApiResourceClaim> {
    Ok(ApiResourceClaim {
        id: row.try_get("id")?,
        api_resource_id: row.try_get("api_resource_id")?,
        claim_type: row.try_get("claim_type")?,
    })
}

pub(crate) fn api_secret(row: &PgRow) -> DecodeResult<ApiSecret> {
    Ok(ApiSecret {
        id: row.try_get("id")?,
        api_resource_id: row.try_get("api_resource_id")?,
        description: row.try_get("description")?,
        value: row.try_get("value")?,
        expiration: row.try_get::<Option<DateTime<Utc>>, _>("expiration")?,
        secret_type: row.try_get("secret_type")?,
    })
}

pub(crate) fn api_scope(row: &PgRow) -> DecodeResult<ApiScope> {
    Ok(ApiScope {
        id: row.try_get("id")?,
        api_resource_id: row.try_get("api_resource_id")?,
        name: row.try_get("name")?,
        display_name: row.try_get("display_name")?,
        description: row.try_get("description")?,
        required: row.try_get("required")?,
        emphasize: row.try_get("emphasize")?,
        show_in_discovery_document: row.try_get("show_in_discovery_document")?,
        user_claims: Vec::new(),
    })
}

pub(crate) fn api_scope_claim(row: &PgRow) -> DecodeResult<ApiScopeClaim> {
    Ok(ApiScopeClaim {
        id: row.try_get("id")?,
        api_scope_id: row.try_get("api_scope_id")?,
        claim_type: row.try_get("claim_type")?,
    })
}

pub(crate) fn identity_resource(row: &PgRow) -> DecodeResult<IdentityResource> {
    Ok(IdentityResource {
        id: row.try_get("id")?,
        enabled: row.try_get("enabled")?,
        name: row.try_get("name")?,
        display_name: row.try_get("display_name")?,
        description: row.try_get("description")?,
        required: row.try_get("required")?,
        emphasize: row.try_get("emphasize")?,
        show_in_discovery_document: row.try_get("show_in_discovery_document")?,
        user_claims: Vec::new(),
    })
}

pub(crate) fn identity_claim(row: &PgRow) -> DecodeResult<IdentityClaim> {
    Ok(IdentityClaim {
        id: row.try_get("id")?,
        identity_resource_id: row.try_get("identity_resource_id")?,
        claim_type: row.try_get("claim_type")?,
    })
}

pub(crate) fn persisted_grant(row: &PgRow) -> DecodeResult<PersistedGrant> {
    Ok(PersistedGrant {
        key: row.try_get("key")?,
        grant_type: row.try_get("grant_type")?,
        subject_id: row.try_get("subject_id")?,
        client_id: row.try_get("client_id")?,
        creation_time: row.try_get("creation_time")?,
        expiration: row.try_get::<Option<DateTime<Utc>>, _>("expiration")?,
        data: row.try_get("data")?,
    })
}

pub(crate) fn persisted_grant_subject(row: &PgRow) -> DecodeResult<PersistedGrantSubject> {
    Ok(PersistedGrantSubject {
        subject_id: row.try_get("subject_id")?,
        grant_count: row.try_get("grant_count")?,
    })
}

pub(crate) fn log_entry(row: &PgRow) -> DecodeResult<LogEntry> {
    Ok(LogEntry {
        id: row.try_get("id")?,
        message: row.try_get("message")?,
        message_template: row.try_get("message_template")?,
        level: row.try_get("level")?,
        timestamp: row.try_get("timestamp")?,
        exception: row.try_get("exception")?,
        log_event: row.try_get("log_event")?,
        properties: row.try_get("properties")?,
    })
}
