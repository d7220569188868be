//! 数据库结构迁移

use ids_adapter_postgres::Migration;

const CONFIGURATION_STORE: &str = r#"
CREATE TABLE IF NOT EXISTS clients (
    id SERIAL PRIMARY KEY,
    enabled BOOLEAN NOT NULL DEFAULT TRUE,
    client_id VARCHAR(200) NOT NULL,
    protocol_type VARCHAR(200) NOT NULL,
    require_client_secret BOOLEAN NOT NULL,
    client_name VARCHAR(200),
    description VARCHAR(1000),
    client_uri VARCHAR(2000),
    logo_uri VARCHAR(2000),
    require_consent BOOLEAN NOT NULL,
    allow_remember_consent BOOLEAN NOT NULL,
    always_include_user_claims_in_id_token BOOLEAN NOT NULL,
    require_pkce BOOLEAN NOT NULL,
    allow_plain_text_pkce BOOLEAN NOT NULL,
    allow_access_tokens_via_browser BOOLEAN NOT NULL,
    front_channel_logout_uri VARCHAR(2000),
    front_channel_logout_session_required BOOLEAN NOT NULL,
    back_channel_logout_uri VARCHAR(2000),
    back_channel_logout_session_required BOOLEAN NOT NULL,
    allow_offline_access BOOLEAN NOT NULL,
    identity_token_lifetime INTEGER NOT NULL,
    access_token_lifetime INTEGER NOT NULL,
    authorization_code_lifetime INTEGER NOT NULL,
    consent_lifetime INTEGER,
    absolute_refresh_token_lifetime INTEGER NOT NULL,
    sliding_refresh_token_lifetime INTEGER NOT NULL,
    refresh_token_usage INTEGER NOT NULL,
    update_access_token_claims_on_refresh BOOLEAN NOT NULL,
    refresh_token_expiration INTEGER NOT NULL,
    access_token_type INTEGER NOT NULL,
    enable_local_login BOOLEAN NOT NULL,
    include_jwt_id BOOLEAN NOT NULL,
    always_send_client_claims BOOLEAN NOT NULL,
    client_claims_prefix VARCHAR(200),
    pair_wise_subject_salt VARCHAR(200),
    CONSTRAINT uq_clients_client_id UNIQUE (client_id)
);

CREATE TABLE IF NOT EXISTS client_scopes (
    id SERIAL PRIMARY KEY,
    client_id INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    scope VARCHAR(200) NOT NULL
);

CREATE TABLE IF NOT EXISTS client_grant_types (
    id SERIAL PRIMARY KEY,
    client_id INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    grant_type VARCHAR(250) NOT NULL
);

CREATE TABLE IF NOT EXISTS client_redirect_uris (
    id SERIAL PRIMARY KEY,
    client_id INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    redirect_uri VARCHAR(2000) NOT NULL
);

CREATE TABLE IF NOT EXISTS client_cors_origins (
    id SERIAL PRIMARY KEY,
    client_id INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    origin VARCHAR(150) NOT NULL
);

CREATE TABLE IF NOT EXISTS client_idp_restrictions (
    id SERIAL PRIMARY KEY,
    client_id INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    provider VARCHAR(200) NOT NULL
);

CREATE TABLE IF NOT EXISTS client_post_logout_redirect_uris (
    id SERIAL PRIMARY KEY,
    client_id INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    post_logout_redirect_uri VARCHAR(2000) NOT NULL
);

CREATE TABLE IF NOT EXISTS client_secrets (
    id SERIAL PRIMARY KEY,
    client_id INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    description VARCHAR(2000),
    value VARCHAR(2000) NOT NULL,
    expiration TIMESTAMPTZ,
    secret_type VARCHAR(250) NOT NULL
);

CREATE TABLE IF NOT EXISTS client_claims (
    id SERIAL PRIMARY KEY,
    client_id INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    claim_type VARCHAR(250) NOT NULL,
    value VARCHAR(250) NOT NULL
);

CREATE TABLE IF NOT EXISTS client_properties (
    id SERIAL PRIMARY KEY,
    client_id INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    key VARCHAR(250) NOT NULL,
    value VARCHAR(2000) NOT NULL
);

CREATE TABLE IF NOT EXISTS api_resources (
    id SERIAL PRIMARY KEY,
    enabled BOOLEAN NOT NULL DEFAULT TRUE,
    name VARCHAR(200) NOT NULL,
    display_name VARCHAR(200),
    description VARCHAR(1000),
    CONSTRAINT uq_api_resources_name UNIQUE (name)
);

CREATE TABLE IF NOT EXISTS api_resource_claims (
    id SERIAL PRIMARY KEY,
    api_resource_id INTEGER NOT NULL REFERENCES api_resources(id) ON DELETE CASCADE,
    claim_type VARCHAR(200) NOT NULL
);

CREATE TABLE IF NOT EXISTS api_secrets (
    id SERIAL PRIMARY KEY,
    api_resource_id INTEGER NOT NULL REFERENCES api_resources(id) ON DELETE CASCADE,
    description VARCHAR(1000),
    value VARCHAR(2000) NOT NULL,
    expiration TIMESTAMPTZ,
    secret_type VARCHAR(250) NOT NULL
);

CREATE TABLE IF NOT EXISTS api_scopes (
    id SERIAL PRIMARY KEY,
    api_resource_id INTEGER NOT NULL REFERENCES api_resources(id) ON DELETE CASCADE,
    name VARCHAR(200) NOT NULL,
    display_name VARCHAR(200),
    description VARCHAR(1000),
    required BOOLEAN NOT NULL,
    emphasize BOOLEAN NOT NULL,
    show_in_discovery_document BOOLEAN NOT NULL,
    CONSTRAINT uq_api_scopes_name UNIQUE (name)
);

CREATE TABLE IF NOT EXISTS api_scope_claims (
    id SERIAL PRIMARY KEY,
    api_scope_id INTEGER NOT NULL REFERENCES api_scopes(id) ON DELETE CASCADE,
    claim_type VARCHAR(200) NOT NULL
);

CREATE TABLE IF NOT EXISTS identity_resources (
    id SERIAL PRIMARY KEY,
    enabled BOOLEAN NOT NULL DEFAULT TRUE,
    name VARCHAR(200) NOT NULL,
    display_name VARCHAR(200),
    description VARCHAR(1000),
    required BOOLEAN NOT NULL,
    emphasize BOOLEAN NOT NULL,
    show_in_discovery_document BOOLEAN NOT NULL,
    CONSTRAINT uq_identity_resources_name UNIQUE (name)
);

CREATE TABLE IF NOT EXISTS identity_claims (
    id SERIAL PRIMARY KEY,
    identity_resource_id INTEGER NOT NULL REFERENCES identity_resources(id) ON DELETE CASCADE,
    claim_type VARCHAR(200) NOT NULL
);
"#;

const OPERATIONAL_STORE: &str = r#"
CREATE TABLE IF NOT EXISTS persisted_grants (
    key VARCHAR(200) PRIMARY KEY,
    grant_type VARCHAR(50) NOT NULL,
    subject_id VARCHAR(200) NOT NULL,
    client_id VARCHAR(200) NOT NULL,
    creation_time TIMESTAMPTZ NOT NULL,
    expiration TIMESTAMPTZ,
    data TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_persisted_grants_subject ON persisted_grants (subject_id, client_id, grant_type);
"#;

const LOG_STORE: &str = r#"
CREATE TABLE IF NOT EXISTS logs (
    id BIGSERIAL PRIMARY KEY,
    message TEXT,
    message_template TEXT,
    level VARCHAR(128),
    timestamp TIMESTAMPTZ NOT NULL,
    exception TEXT,
    log_event TEXT,
    properties TEXT
);
"#;

/// 全部迁移，按版本递增
pub fn migrations() -> Vec<Migration> {
    vec![
        Migration::new(1, "create_configuration_store", CONFIGURATION_STORE),
        Migration::new(2, "create_operational_store", OPERATIONAL_STORE),
        Migration::new(3, "create_log_store", LOG_STORE),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::tables;

    #[test]
    fn test_versions_ascending() {
        let versions: Vec<i64> = migrations().iter().map(|m| m.version).collect();
        assert_eq!(versions, vec![1, 2, 3]);
    }

    #[test]
    fn test_every_client_child_table_cascades() {
        for table in tables::CLIENT_CHILD_TABLES {
            let create = format!("CREATE TABLE IF NOT EXISTS {} (", table);
            let start = CONFIGURATION_STORE.find(&create).unwrap();
            let body = &CONFIGURATION_STORE[start..];
            let end = body.find(");").unwrap();
            assert!(body[..end].contains("REFERENCES clients(id) ON DELETE CASCADE"), "{}", table);
        }
    }
}
