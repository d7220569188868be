use ids_common::{EntityId, NEW_ID};
use serde::{Deserialize, Serialize};

use crate::domain::reset_ids;

/// IdentityResource 声明
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaim {
    pub id: EntityId,
    pub identity_resource_id: EntityId,
    pub claim_type: String,
}

crate::child_entry!(IdentityClaim, identity_resource_id);

/// IdentityResource 聚合根
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityResource {
    pub id: EntityId,
    pub enabled: bool,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub required: bool,
    pub emphasize: bool,
    pub show_in_discovery_document: bool,

    pub user_claims: Vec<IdentityClaim>,
}

impl Default for IdentityResource {
    fn default() -> Self {
        Self {
            id: NEW_ID,
            enabled: true,
            name: String::new(),
            display_name: None,
            description: None,
            required: false,
            emphasize: false,
            show_in_discovery_document: true,
            user_claims: Vec::new(),
        }
    }
}

impl IdentityResource {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: Some(display_name.into()),
            ..Default::default()
        }
    }

    pub fn with_claim(mut self, claim_type: impl Into<String>) -> Self {
        self.user_claims.push(IdentityClaim {
            claim_type: claim_type.into(),
            ..Default::default()
        });
        self
    }

    pub fn reset_identities(&mut self) {
        self.id = NEW_ID;
        reset_ids(&mut self.user_claims);
    }
}
