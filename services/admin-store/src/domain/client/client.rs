//! Client 聚合

use chrono::{DateTime, Utc};
use ids_common::{EntityId, NEW_ID};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::{reset_ids, stamp_owner};

/// 存储中的整数不对应任何枚举值
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: i32,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: i32) -> Self {
        Self { kind, value }
    }
}

/// 访问令牌类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessTokenType {
    #[default]
    Jwt = 0,
    Reference = 1,
}

impl AccessTokenType {
    pub const ALL: [AccessTokenType; 2] = [AccessTokenType::Jwt, AccessTokenType::Reference];
}

impl TryFrom<i32> for AccessTokenType {
    type Error = UnknownVariant;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Jwt),
            1 => Ok(Self::Reference),
            _ => Err(UnknownVariant::new("AccessTokenType", value)),
        }
    }
}

impl fmt::Display for AccessTokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jwt => write!(f, "Jwt"),
            Self::Reference => write!(f, "Reference"),
        }
    }
}

/// 刷新令牌过期方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenExpiration {
    Sliding = 0,
    #[default]
    Absolute = 1,
}

impl TokenExpiration {
    pub const ALL: [TokenExpiration; 2] = [TokenExpiration::Sliding, TokenExpiration::Absolute];
}

impl TryFrom<i32> for TokenExpiration {
    type Error = UnknownVariant;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Sliding),
            1 => Ok(Self::Absolute),
            _ => Err(UnknownVariant::new("TokenExpiration", value)),
        }
    }
}

impl fmt::Display for TokenExpiration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sliding => write!(f, "Sliding"),
            Self::Absolute => write!(f, "Absolute"),
        }
    }
}

/// 刷新令牌使用方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenUsage {
    ReUse = 0,
    #[default]
    OneTimeOnly = 1,
}

impl TokenUsage {
    pub const ALL: [TokenUsage; 2] = [TokenUsage::ReUse, TokenUsage::OneTimeOnly];
}

impl TryFrom<i32> for TokenUsage {
    type Error = UnknownVariant;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::ReUse),
            1 => Ok(Self::OneTimeOnly),
            _ => Err(UnknownVariant::new("TokenUsage", value)),
        }
    }
}

impl fmt::Display for TokenUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReUse => write!(f, "ReUse"),
            Self::OneTimeOnly => write!(f, "OneTimeOnly"),
        }
    }
}

/// 允许的授权类型
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientGrantType {
    pub id: EntityId,
    pub client_id: EntityId,
    pub grant_type: String,
}

/// 登录回调地址
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRedirectUri {
    pub id: EntityId,
    pub client_id: EntityId,
    pub redirect_uri: String,
}

/// 登出回调地址
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPostLogoutRedirectUri {
    pub id: EntityId,
    pub client_id: EntityId,
    pub post_logout_redirect_uri: String,
}

/// 允许的 scope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientScope {
    pub id: EntityId,
    pub client_id: EntityId,
    pub scope: String,
}

/// 客户端密钥
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSecret {
    pub id: EntityId,
    pub client_id: EntityId,
    pub description: Option<String>,
    pub value: String,
    pub expiration: Option<DateTime<Utc>>,
    pub secret_type: String,
}

impl Default for ClientSecret {
    fn default() -> Self {
        Self {
            id: NEW_ID,
            client_id: NEW_ID,
            description: None,
            value: String::new(),
            expiration: None,
            secret_type: "SharedSecret".to_string(),
        }
    }
}

/// 客户端声明
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientClaim {
    pub id: EntityId,
    pub client_id: EntityId,
    pub claim_type: String,
    pub value: String,
}

/// 外部身份提供者限制
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdpRestriction {
    pub id: EntityId,
    pub client_id: EntityId,
    pub provider: String,
}

/// 跨域来源
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCorsOrigin {
    pub id: EntityId,
    pub client_id: EntityId,
    pub origin: String,
}

/// 自定义属性
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientProperty {
    pub id: EntityId,
    pub client_id: EntityId,
    pub key: String,
    pub value: String,
}

crate::child_entry!(ClientGrantType, client_id);
crate::child_entry!(ClientRedirectUri, client_id);
crate::child_entry!(ClientPostLogoutRedirectUri, client_id);
crate::child_entry!(ClientScope, client_id);
crate::child_entry!(ClientSecret, client_id);
crate::child_entry!(ClientClaim, client_id);
crate::child_entry!(ClientIdpRestriction, client_id);
crate::child_entry!(ClientCorsOrigin, client_id);
crate::child_entry!(ClientProperty, client_id);

/// Client 标识与显示名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientName {
    pub client_id: String,
    pub client_name: Option<String>,
}

/// Client 聚合根
///
/// 子集合字段的声明顺序即写入顺序。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
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
    pub refresh_token_usage: TokenUsage,
    pub update_access_token_claims_on_refresh: bool,
    pub refresh_token_expiration: TokenExpiration,
    pub access_token_type: AccessTokenType,
    pub enable_local_login: bool,
    pub include_jwt_id: bool,
    pub always_send_client_claims: bool,
    pub client_claims_prefix: Option<String>,
    pub pair_wise_subject_salt: Option<String>,

    pub allowed_scopes: Vec<ClientScope>,
    pub allowed_grant_types: Vec<ClientGrantType>,
    pub redirect_uris: Vec<ClientRedirectUri>,
    pub allowed_cors_origins: Vec<ClientCorsOrigin>,
    pub identity_provider_restrictions: Vec<ClientIdpRestriction>,
    pub post_logout_redirect_uris: Vec<ClientPostLogoutRedirectUri>,
    pub client_secrets: Vec<ClientSecret>,
    pub claims: Vec<ClientClaim>,
    pub properties: Vec<ClientProperty>,
}

impl Default for Client {
    fn default() -> Self {
        Self {
            id: NEW_ID,
            enabled: true,
            client_id: String::new(),
            protocol_type: "oidc".to_string(),
            require_client_secret: true,
            client_name: None,
            description: None,
            client_uri: None,
            logo_uri: None,
            require_consent: true,
            allow_remember_consent: true,
            always_include_user_claims_in_id_token: false,
            require_pkce: false,
            allow_plain_text_pkce: false,
            allow_access_tokens_via_browser: false,
            front_channel_logout_uri: None,
            front_channel_logout_session_required: true,
            back_channel_logout_uri: None,
            back_channel_logout_session_required: true,
            allow_offline_access: false,
            identity_token_lifetime: 300,
            access_token_lifetime: 3600,
            authorization_code_lifetime: 300,
            consent_lifetime: None,
            absolute_refresh_token_lifetime: 2_592_000,
            sliding_refresh_token_lifetime: 1_296_000,
            refresh_token_usage: TokenUsage::OneTimeOnly,
            update_access_token_claims_on_refresh: false,
            refresh_token_expiration: TokenExpiration::Absolute,
            access_token_type: AccessTokenType::Jwt,
            enable_local_login: true,
            include_jwt_id: false,
            always_send_client_claims: false,
            client_claims_prefix: Some("client_".to_string()),
            pair_wise_subject_salt: None,
            allowed_scopes: Vec::new(),
            allowed_grant_types: Vec::new(),
            redirect_uris: Vec::new(),
            allowed_cors_origins: Vec::new(),
            identity_provider_restrictions: Vec::new(),
            post_logout_redirect_uris: Vec::new(),
            client_secrets: Vec::new(),
            claims: Vec::new(),
            properties: Vec::new(),
        }
    }
}

impl Client {
    pub fn new(client_id: impl Into<String>, client_name: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_name: Some(client_name.into()),
            ..Default::default()
        }
    }

    pub fn with_grant_type(mut self, grant_type: impl Into<String>) -> Self {
        self.allowed_grant_types.push(ClientGrantType {
            grant_type: grant_type.into(),
            ..Default::default()
        });
        self
    }

    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uris.push(ClientRedirectUri {
            redirect_uri: uri.into(),
            ..Default::default()
        });
        self
    }

    pub fn with_post_logout_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.post_logout_redirect_uris.push(ClientPostLogoutRedirectUri {
            post_logout_redirect_uri: uri.into(),
            ..Default::default()
        });
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.allowed_scopes.push(ClientScope {
            scope: scope.into(),
            ..Default::default()
        });
        self
    }

    pub fn with_secret(mut self, value: impl Into<String>) -> Self {
        self.client_secrets.push(ClientSecret {
            value: value.into(),
            ..Default::default()
        });
        self
    }

    pub fn with_claim(mut self, claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.push(ClientClaim {
            claim_type: claim_type.into(),
            value: value.into(),
            ..Default::default()
        });
        self
    }

    pub fn with_idp_restriction(mut self, provider: impl Into<String>) -> Self {
        self.identity_provider_restrictions.push(ClientIdpRestriction {
            provider: provider.into(),
            ..Default::default()
        });
        self
    }

    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_cors_origins.push(ClientCorsOrigin {
            origin: origin.into(),
            ..Default::default()
        });
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push(ClientProperty {
            key: key.into(),
            value: value.into(),
            ..Default::default()
        });
        self
    }

    /// 是否为尚未持久化的新实体
    pub fn is_new(&self) -> bool {
        self.id == NEW_ID
    }

    /// 清空根及所有子项的标识与外键
    pub fn reset_identities(&mut self) {
        self.id = NEW_ID;
        self.stamp_children(NEW_ID);
        reset_ids(&mut self.allowed_scopes);
        reset_ids(&mut self.allowed_grant_types);
        reset_ids(&mut self.redirect_uris);
        reset_ids(&mut self.allowed_cors_origins);
        reset_ids(&mut self.identity_provider_restrictions);
        reset_ids(&mut self.post_logout_redirect_uris);
        reset_ids(&mut self.client_secrets);
        reset_ids(&mut self.claims);
        reset_ids(&mut self.properties);
    }

    /// 把根标识写入根及所有子项外键
    pub fn stamp_children(&mut self, client_id: EntityId) {
        self.id = client_id;
        stamp_owner(&mut self.allowed_scopes, client_id);
        stamp_owner(&mut self.allowed_grant_types, client_id);
        stamp_owner(&mut self.redirect_uris, client_id);
        stamp_owner(&mut self.allowed_cors_origins, client_id);
        stamp_owner(&mut self.identity_provider_restrictions, client_id);
        stamp_owner(&mut self.post_logout_redirect_uris, client_id);
        stamp_owner(&mut self.client_secrets, client_id);
        stamp_owner(&mut self.claims, client_id);
        stamp_owner(&mut self.properties, client_id);
    }
}
