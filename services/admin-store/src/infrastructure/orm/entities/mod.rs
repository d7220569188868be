//! sea-orm 实体，与 PostgreSQL 迁移中的表一一对应

pub mod api_resource;
pub mod api_resource_claim;
pub mod api_scope;
pub mod api_scope_claim;
pub mod api_secret;
pub mod client;
pub mod client_claim;
pub mod client_cors_origin;
pub mod client_grant_type;
pub mod client_idp_restriction;
pub mod client_post_logout_redirect_uri;
pub mod client_property;
pub mod client_redirect_uri;
pub mod client_scope;
pub mod client_secret;
pub mod identity_claim;
pub mod identity_resource;
pub mod log;
pub mod persisted_grant;
