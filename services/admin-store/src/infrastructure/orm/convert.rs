//! 实体与领域模型之间的转换

use ids_common::EntityId;
use ids_errors::{RepoResult, RepositoryError};
use sea_orm::ActiveValue::Set;

use super::entities::*;
use crate::domain::api_resource::{ApiResource, ApiResourceClaim, ApiScope, ApiScopeClaim, ApiSecret};
use crate::domain::client::{
    AccessTokenType, Client, ClientClaim, ClientCorsOrigin, ClientGrantType, ClientIdpRestriction,
    ClientPostLogoutRedirectUri, ClientProperty, ClientRedirectUri, ClientScope, ClientSecret,
    TokenExpiration, TokenUsage,
};
use crate::domain::identity_resource::{IdentityClaim, IdentityResource};
use crate::domain::log::LogEntry;
use crate::domain::persisted_grant::PersistedGrant;

/// 可写入子表的条目，外键由调用方给出
pub(crate) trait ChildRow {
    type Active: sea_orm::ActiveModelTrait + Send + 'static;

    fn active(&self, owner: EntityId) -> Self::Active;
}

fn decode_enum<T, E>(value: i32) -> RepoResult<T>
where
    T: TryFrom<i32, Error = E>,
    E: std::fmt::Display,
{
    T::try_from(value).map_err(|e| RepositoryError::internal(format!("Failed to decode row: {}", e)))
}

impl TryFrom<client::Model> for Client {
    type Error = RepositoryError;

    fn try_from(m: client::Model) -> RepoResult<Self> {
        Ok(Client {
            id: m.id,
            enabled: m.enabled,
            client_id: m.client_id,
            protocol_type: m.protocol_type,
            require_client_secret: m.require_client_secret,
            client_name: m.client_name,
            description: m.description,
            client_uri: m.client_uri,
            logo_uri: m.logo_uri,
            require_consent: m.require_consent,
            allow_remember_consent: m.allow_remember_consent,
            always_include_user_claims_in_id_token: m.always_include_user_claims_in_id_token,
            require_pkce: m.require_pkce,
            allow_plain_text_pkce: m.allow_plain_text_pkce,
            allow_access_tokens_via_browser: m.allow_access_tokens_via_browser,
            front_channel_logout_uri: m.front_channel_logout_uri,
            front_channel_logout_session_required: m.front_channel_logout_session_required,
            back_channel_logout_uri: m.back_channel_logout_uri,
            back_channel_logout_session_required: m.back_channel_logout_session_required,
            allow_offline_access: m.allow_offline_access,
            identity_token_lifetime: m.identity_token_lifetime,
            access_token_lifetime: m.access_token_lifetime,
            authorization_code_lifetime: m.authorization_code_lifetime,
            consent_lifetime: m.consent_lifetime,
            absolute_refresh_token_lifetime: m.absolute_refresh_token_lifetime,
            sliding_refresh_token_lifetime: m.sliding_refresh_token_lifetime,
            refresh_token_usage: decode_enum::<TokenUsage, _>(m.refresh_token_usage)?,
            update_access_token_claims_on_refresh: m.update_access_token_claims_on_refresh,
            refresh_token_expiration: decode_enum::<TokenExpiration, _>(m.refresh_token_expiration)?,
            access_token_type: decode_enum::<AccessTokenType, _>(m.access_token_type)?,
            enable_local_login: m.enable_local_login,
            include_jwt_id: m.include_jwt_id,
            always_send_client_claims: m.always_send_client_claims,
            client_claims_prefix: m.client_claims_prefix,
            pair_wise_subject_salt: m.pair_wise_subject_salt,
            ..Default::default()
        })
    }
}

/// 根记录的全部列，标识由存储生成
pub(crate) fn client_active(c: &Client) -> client::ActiveModel {
    client::ActiveModel {
        enabled: Set(c.enabled),
        client_id: Set(c.client_id.clone()),
        protocol_type: Set(c.protocol_type.clone()),
        require_client_secret: Set(c.require_client_secret),
        client_name: Set(c.client_name.clone()),
        description: Set(c.description.clone()),
        client_uri: Set(c.client_uri.clone()),
        logo_uri: Set(c.logo_uri.clone()),
        require_consent: Set(c.require_consent),
        allow_remember_consent: Set(c.allow_remember_consent),
        always_include_user_claims_in_id_token: Set(c.always_include_user_claims_in_id_token),
        require_pkce: Set(c.require_pkce),
        allow_plain_text_pkce: Set(c.allow_plain_text_pkce),
        allow_access_tokens_via_browser: Set(c.allow_access_tokens_via_browser),
        front_channel_logout_uri: Set(c.front_channel_logout_uri.clone()),
        front_channel_logout_session_required: Set(c.front_channel_logout_session_required),
        back_channel_logout_uri: Set(c.back_channel_logout_uri.clone()),
        back_channel_logout_session_required: Set(c.back_channel_logout_session_required),
        allow_offline_access: Set(c.allow_offline_access),
        identity_token_lifetime: Set(c.identity_token_lifetime),
        access_token_lifetime: Set(c.access_token_lifetime),
        authorization_code_lifetime: Set(c.authorization_code_lifetime),
        consent_lifetime: Set(c.consent_lifetime),
        absolute_refresh_token_lifetime: Set(c.absolute_refresh_token_lifetime),
        sliding_refresh_token_lifetime: Set(c.sliding_refresh_token_lifetime),
        refresh_token_usage: Set(c.refresh_token_usage as i32),
        update_access_token_claims_on_refresh: Set(c.update_access_token_claims_on_refresh),
        refresh_token_expiration: Set(c.refresh_token_expiration as i32),
        access_token_type: Set(c.access_token_type as i32),
        enable_local_login: Set(c.enable_local_login),
        include_jwt_id: Set(c.include_jwt_id),
        always_send_client_claims: Set(c.always_send_client_claims),
        client_claims_prefix: Set(c.client_claims_prefix.clone()),
        pair_wise_subject_salt: Set(c.pair_wise_subject_salt.clone()),
        ..Default::default()
    }
}

impl From<client_scope::Model> for ClientScope {
    fn from(m: client_scope::Model) -> Self {
        Self {
            id: m.id,
            client_id: m.client_id,
            scope: m.scope,
        }
    }
}

impl ChildRow for ClientScope {
    type Active = client_scope::ActiveModel;

    fn active(&self, owner: EntityId) -> Self::Active {
        client_scope::ActiveModel {
            client_id: Set(owner),
            scope: Set(self.scope.clone()),
            ..Default::default()
        }
    }
}

impl From<client_grant_type::Model> for ClientGrantType {
    fn from(m: client_grant_type::Model) -> Self {
        Self {
            id: m.id,
            client_id: m.client_id,
            grant_type: m.grant_type,
        }
    }
}

impl ChildRow for ClientGrantType {
    type Active = client_grant_type::ActiveModel;

    fn active(&self, owner: EntityId) -> Self::Active {
        client_grant_type::ActiveModel {
            client_id: Set(owner),
            grant_type: Set(self.grant_type.clone()),
            ..Default::default()
        }
    }
}

impl From<client_redirect_uri::Model> for ClientRedirectUri {
    fn from(m: client_redirect_uri::Model) -> Self {
        Self {
            id: m.id,
            client_id: m.client_id,
            redirect_uri: m.redirect_uri,
        }
    }
}

impl ChildRow for ClientRedirectUri {
    type Active = client_redirect_uri::ActiveModel;

    fn active(&self, owner: EntityId) -> Self::Active {
        client_redirect_uri::ActiveModel {
            client_id: Set(owner),
            redirect_uri: Set(self.redirect_uri.clone()),
            ..Default::default()
        }
    }
}

impl From<client_cors_origin::Model> for ClientCorsOrigin {
    fn from(m: client_cors_origin::Model) -> Self {
        Self {
            id: m.id,
            client_id: m.client_id,
            origin: m.origin,
        }
    }
}

impl ChildRow for ClientCorsOrigin {
    type Active = client_cors_origin::ActiveModel;

    fn active(&self, owner: EntityId) -> Self::Active {
        client_cors_origin::ActiveModel {
            client_id: Set(owner),
            origin: Set(self.origin.clone()),
            ..Default::default()
        }
    }
}

impl From<client_idp_restriction::Model> for ClientIdpRestriction {
    fn from(m: client_idp_restriction::Model) -> Self {
        Self {
            id: m.id,
            client_id: m.client_id,
            provider: m.provider,
        }
    }
}

impl ChildRow for ClientIdpRestriction {
    type Active = client_idp_restriction::ActiveModel;

    fn active(&self, owner: EntityId) -> Self::Active {
        client_idp_restriction::ActiveModel {
            client_id: Set(owner),
            provider: Set(self.provider.clone()),
            ..Default::default()
        }
    }
}

impl From<client_post_logout_redirect_uri::Model> for ClientPostLogoutRedirectUri {
    fn from(m: client_post_logout_redirect_uri::Model) -> Self {
        Self {
            id: m.id,
            client_id: m.client_id,
            post_logout_redirect_uri: m.post_logout_redirect_uri,
        }
    }
}

impl ChildRow for ClientPostLogoutRedirectUri {
    type Active = client_post_logout_redirect_uri::ActiveModel;

    fn active(&self, owner: EntityId) -> Self::Active {
        client_post_logout_redirect_uri::ActiveModel {
            client_id: Set(owner),
            post_logout_redirect_uri: Set(self.post_logout_redirect_uri.clone()),
            ..Default::default()
        }
    }
}

impl From<client_secret::Model> for ClientSecret {
    fn from(m: client_secret::Model) -> Self {
        Self {
            id: m.id,
            client_id: m.client_id,
            description: m.description,
            value: m.value,
            expiration: m.expiration,
            secret_type: m.secret_type,
        }
    }
}

impl ChildRow for ClientSecret {
    type Active = client_secret::ActiveModel;

    fn active(&self, owner: EntityId) -> Self::Active {
        client_secret::ActiveModel {
            client_id: Set(owner),
            description: Set(self.description.clone()),
            value: Set(self.value.clone()),
            expiration: Set(self.expiration),
            secret_type: Set(self.secret_type.clone()),
            ..Default::default()
        }
    }
}

impl From<client_claim::Model> for ClientClaim {
    fn from(m: client_claim::Model) -> Self {
        Self {
            id: m.id,
            client_id: m.client_id,
            claim_type: m.claim_type,
            value: m.value,
        }
    }
}

impl ChildRow for ClientClaim {
    type Active = client_claim::ActiveModel;

    fn active(&self, owner: EntityId) -> Self::Active {
        client_claim::ActiveModel {
            client_id: Set(owner),
            claim_type: Set(self.claim_type.clone()),
            value: Set(self.value.clone()),
            ..Default::default()
        }
    }
}

impl From<client_property::Model> for ClientProperty {
    fn from(m: client_property::Model) -> Self {
        Self {
            id: m.id,
            client_id: m.client_id,
            key: m.key,
            value: m.value,
        }
    }
}

impl ChildRow for ClientProperty {
    type Active = client_property::ActiveModel;

    fn active(&self, owner: EntityId) -> Self::Active {
        client_property::ActiveModel {
            client_id: Set(owner),
            key: Set(self.key.clone()),
            value: Set(self.value.clone()),
            ..Default::default()
        }
    }
}

impl From<api_resource::Model> for ApiResource {
    fn from(m: api_resource::Model) -> Self {
        Self {
            id: m.id,
            enabled: m.enabled,
            name: m.name,
            display_name: m.display_name,
            description: m.description,
            ..Default::default()
        }
    }
}

pub(crate) fn api_resource_active(r: &ApiResource) -> api_resource::ActiveModel {
    api_resource::ActiveModel {
        enabled: Set(r.enabled),
        name: Set(r.name.clone()),
        display_name: Set(r.display_name.clone()),
        description: Set(r.description.clone()),
        ..Default::default()
    }
}

impl From<api_resource_claim::Model> for ApiResourceClaim {
    fn from(m: api_resource_claim::Model) -> Self {
        Self {
            id: m.id,
            api_resource_id: m.api_resource_id,
            claim_type: m.claim_type,
        }
    }
}

impl ChildRow for ApiResourceClaim {
    type Active = api_resource_claim::ActiveModel;

    fn active(&self, owner: EntityId) -> Self::Active {
        api_resource_claim::ActiveModel {
            api_resource_id: Set(owner),
            claim_type: Set(self.claim_type.clone()),
            ..Default::default()
        }
    }
}

impl From<api_secret::Model> for ApiSecret {
    fn from(m: api_secret::Model) -> Self {
        Self {
            id: m.id,
            api_resource_id: m.api_resource_id,
            description: m.description,
            value: m.value,
            expiration: m.expiration,
            secret_type: m.secret_type,
        }
    }
}

impl ChildRow for ApiSecret {
    type Active = api_secret::ActiveModel;

    fn active(&self, owner: EntityId) -> Self::Active {
        api_secret::ActiveModel {
            api_resource_id: Set(owner),
            description: Set(self.description.clone()),
            value: Set(self.value.clone()),
            expiration: Set(self.expiration),
            secret_type: Set(self.secret_type.clone()),
            ..Default::default()
        }
    }
}

/// scope 根记录，不含声明
impl From<api_scope::Model> for ApiScope {
    fn from(m: api_scope::Model) -> Self {
        Self {
            id: m.id,
            api_resource_id: m.api_resource_id,
            name: m.name,
            display_name: m.display_name,
            description: m.description,
            required: m.required,
            emphasize: m.emphasize,
            show_in_discovery_document: m.show_in_discovery_document,
            user_claims: Vec::new(),
        }
    }
}

impl ChildRow for ApiScope {
    type Active = api_scope::ActiveModel;

    fn active(&self, owner: EntityId) -> Self::Active {
        api_scope::ActiveModel {
            api_resource_id: Set(owner),
            name: Set(self.name.clone()),
            display_name: Set(self.display_name.clone()),
            description: Set(self.description.clone()),
            required: Set(self.required),
            emphasize: Set(self.emphasize),
            show_in_discovery_document: Set(self.show_in_discovery_document),
            ..Default::default()
        }
    }
}

impl From<api_scope_claim::Model> for ApiScopeClaim {
    fn from(m: api_scope_claim::Model) -> Self {
        Self {
            id: m.id,
            api_scope_id: m.api_scope_id,
            claim_type: m.claim_type,
        }
    }
}

impl ChildRow for ApiScopeClaim {
    type Active = api_scope_claim::ActiveModel;

    fn active(&self, owner: EntityId) -> Self::Active {
        api_scope_claim::ActiveModel {
            api_scope_id: Set(owner),
            claim_type: Set(self.claim_type.clone()),
            ..Default::default()
        }
    }
}

impl From<identity_resource::Model> for IdentityResource {
    fn from(m: identity_resource::Model) -> Self {
        Self {
            id: m.id,
            enabled: m.enabled,
            name: m.name,
            display_name: m.display_name,
            description: m.description,
            required: m.required,
            emphasize: m.emphasize,
            show_in_discovery_document: m.show_in_discovery_document,
            user_claims: Vec::new(),
        }
    }
}

pub(crate) fn identity_resource_active(r: &IdentityResource) -> identity_resource::ActiveModel {
    identity_resource::ActiveModel {
        enabled: Set(r.enabled),
        name: Set(r.name.clone()),
        display_name: Set(r.display_name.clone()),
        description: Set(r.description.clone()),
        required: Set(r.required),
        emphasize: Set(r.emphasize),
        show_in_discovery_document: Set(r.show_in_discovery_document),
        ..Default::default()
    }
}

impl From<identity_claim::Model> for IdentityClaim {
    fn from(m: identity_claim::Model) -> Self {
        Self {
            id: m.id,
            identity_resource_id: m.identity_resource_id,
            claim_type: m.claim_type,
        }
    }
}

impl ChildRow for IdentityClaim {
    type Active = identity_claim::ActiveModel;

    fn active(&self, owner: EntityId) -> Self::Active {
        identity_claim::ActiveModel {
            identity_resource_id: Set(owner),
            claim_type: Set(self.claim_type.clone()),
            ..Default::default()
        }
    }
}

impl From<persisted_grant::Model> for PersistedGrant {
    fn from(m: persisted_grant::Model) -> Self {
        Self {
            key: m.key,
            grant_type: m.grant_type,
            subject_id: m.subject_id,
            client_id: m.client_id,
            creation_time: m.creation_time,
            expiration: m.expiration,
            data: m.data,
        }
    }
}

pub(crate) fn persisted_grant_active(g: PersistedGrant) -> persisted_grant::ActiveModel {
    persisted_grant::ActiveModel {
        key: Set(g.key),
        grant_type: Set(g.grant_type),
        subject_id: Set(g.subject_id),
        client_id: Set(g.client_id),
        creation_time: Set(g.creation_time),
        expiration: Set(g.expiration),
        data: Set(g.data),
    }
}

impl From<log::Model> for LogEntry {
    fn from(m: log::Model) -> Self {
        Self {
            id: m.id,
            message: m.message,
            message_template: m.message_template,
            level: m.level,
            timestamp: m.timestamp,
            exception: m.exception,
            log_event: m.log_event,
            properties: m.properties,
        }
    }
}

pub(crate) fn log_active(e: LogEntry) -> log::ActiveModel {
    log::ActiveModel {
        message: Set(e.message),
        message_template: Set(e.message_template),
        level: Set(e.level),
        timestamp: Set(e.timestamp),
        exception: Set(e.exception),
        log_event: Set(e.log_event),
        properties: Set(e.properties),
        ..Default::default()
    }
}
