//! ApiResource 聚合
//!
//! ApiScope 本身也带有子集合（声明），读写时作为 ApiResource 的二级子项处理。

use chrono::{DateTime, Utc};
use ids_common::{EntityId, NEW_ID};
use serde::{Deserialize, Serialize};

use crate::domain::{reset_ids, stamp_owner};

/// ApiResource 声明
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResourceClaim {
    pub id: EntityId,
    pub api_resource_id: EntityId,
    pub claim_type: String,
}

/// ApiResource 密钥
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSecret {
    pub id: EntityId,
    pub api_resource_id: EntityId,
    pub description: Option<String>,
    pub value: String,
    pub expiration: Option<DateTime<Utc>>,
    pub secret_type: String,
}

impl Default for ApiSecret {
    fn default() -> Self {
        Self {
            id: NEW_ID,
            api_resource_id: NEW_ID,
            description: None,
            value: String::new(),
            expiration: None,
            secret_type: "SharedSecret".to_string(),
        }
    }
}

/// ApiScope 声明
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiScopeClaim {
    pub id: EntityId,
    pub api_scope_id: EntityId,
    pub claim_type: String,
}

/// ApiScope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiScope {
    pub id: EntityId,
    pub api_resource_id: EntityId,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub required: bool,
    pub emphasize: bool,
    pub show_in_discovery_document: bool,
    pub user_claims: Vec<ApiScopeClaim>,
}

crate::child_entry!(ApiResourceClaim, api_resource_id);
crate::child_entry!(ApiSecret, api_resource_id);
crate::child_entry!(ApiScopeClaim, api_scope_id);
crate::child_entry!(ApiScope, api_resource_id);

impl ApiScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            show_in_discovery_document: true,
            ..Default::default()
        }
    }

    pub fn with_claim(mut self, claim_type: impl Into<String>) -> Self {
        self.user_claims.push(ApiScopeClaim {
            claim_type: claim_type.into(),
            ..Default::default()
        });
        self
    }

    /// 写入自身标识及声明外键
    pub fn stamp_claims(&mut self, scope_id: EntityId) {
        self.id = scope_id;
        stamp_owner(&mut self.user_claims, scope_id);
    }
}

/// ApiResource 聚合根
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResource {
    pub id: EntityId,
    pub enabled: bool,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,

    pub user_claims: Vec<ApiResourceClaim>,
    pub secrets: Vec<ApiSecret>,
    pub scopes: Vec<ApiScope>,
}

impl Default for ApiResource {
    fn default() -> Self {
        Self {
            id: NEW_ID,
            enabled: true,
            name: String::new(),
            display_name: None,
            description: None,
            user_claims: Vec::new(),
            secrets: Vec::new(),
            scopes: Vec::new(),
        }
    }
}

impl ApiResource {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: Some(display_name.into()),
            ..Default::default()
        }
    }

    pub fn with_claim(mut self, claim_type: impl Into<String>) -> Self {
        self.user_claims.push(ApiResourceClaim {
            claim_type: claim_type.into(),
            ..Default::default()
        });
        self
    }

    pub fn with_secret(mut self, value: impl Into<String>) -> Self {
        self.secrets.push(ApiSecret {
            value: value.into(),
            ..Default::default()
        });
        self
    }

    pub fn with_scope(mut self, scope: ApiScope) -> Self {
        self.scopes.push(scope);
        self
    }

    /// 清空根、子项及 scope 声明的标识与外键
    pub fn reset_identities(&mut self) {
        self.id = NEW_ID;
        reset_ids(&mut self.user_claims);
        reset_ids(&mut self.secrets);
        for scope in &mut self.scopes {
            reset_ids(&mut scope.user_claims);
        }
        reset_ids(&mut self.scopes);
    }

    /// 把根标识写入根及子项外键
    pub fn stamp_children(&mut self, api_resource_id: EntityId) {
        self.id = api_resource_id;
        stamp_owner(&mut self.user_claims, api_resource_id);
        stamp_owner(&mut self.secrets, api_resource_id);
        stamp_owner(&mut self.scopes, api_resource_id);
    }
}
