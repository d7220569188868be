//! 表名
//!
//! 两种后端共用，故障注入与日志字段也以表名标识子集合。

pub const CLIENTS: &str = "clients";
pub const CLIENT_SCOPES: &str = "client_scopes";
pub const CLIENT_GRANT_TYPES: &str = "client_grant_types";
pub const CLIENT_REDIRECT_URIS: &str = "client_redirect_uris";
pub const CLIENT_CORS_ORIGINS: &str = "client_cors_origins";
pub const CLIENT_IDP_RESTRICTIONS: &str = "client_idp_restrictions";
pub const CLIENT_POST_LOGOUT_REDIRECT_URIS: &str = "client_post_logout_redirect_uris";
pub const CLIENT_SECRETS: &str = "client_secrets";
pub const CLIENT_CLAIMS: &str = "client_claims";
pub const CLIENT_PROPERTIES: &str = "client_properties";

/// Client 子表，按写入顺序
pub const CLIENT_CHILD_TABLES: [&str; 9] = [
    CLIENT_SCOPES,
    CLIENT_GRANT_TYPES,
    CLIENT_REDIRECT_URIS,
    CLIENT_CORS_ORIGINS,
    CLIENT_IDP_RESTRICTIONS,
    CLIENT_POST_LOGOUT_REDIRECT_URIS,
    CLIENT_SECRETS,
    CLIENT_CLAIMS,
    CLIENT_PROPERTIES,
];

pub const API_RESOURCES: &str = "api_resources";
pub const API_RESOURCE_CLAIMS: &str = "api_resource_claims";
pub const API_SECRETS: &str = "api_secrets";
pub const API_SCOPES: &str = "api_scopes";
pub const API_SCOPE_CLAIMS: &str = "api_scope_claims";

pub const IDENTITY_RESOURCES: &str = "identity_resources";
pub const IDENTITY_CLAIMS: &str = "identity_claims";

pub const PERSISTED_GRANTS: &str = "persisted_grants";
pub const LOGS: &str = "logs";
