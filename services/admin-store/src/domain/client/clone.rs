//! Client 克隆
//!
//! 克隆得到的是一张全新的聚合：所有标识清零，密钥始终不复制，
//! 其余子集合按调用方给出的开关选择性保留。

use serde::{Deserialize, Serialize};

use super::client::Client;

/// 克隆时保留哪些子集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneOptions {
    pub cors_origins: bool,
    pub grant_types: bool,
    pub idp_restrictions: bool,
    pub post_logout_redirect_uris: bool,
    pub scopes: bool,
    pub redirect_uris: bool,
    pub claims: bool,
    pub properties: bool,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self::all()
    }
}

impl CloneOptions {
    /// 保留全部子集合（密钥除外）
    pub fn all() -> Self {
        Self {
            cors_origins: true,
            grant_types: true,
            idp_restrictions: true,
            post_logout_redirect_uris: true,
            scopes: true,
            redirect_uris: true,
            claims: true,
            properties: true,
        }
    }

    /// 只复制根记录
    pub fn none() -> Self {
        Self {
            cors_origins: false,
            grant_types: false,
            idp_restrictions: false,
            post_logout_redirect_uris: false,
            scopes: false,
            redirect_uris: false,
            claims: false,
            properties: false,
        }
    }
}

impl Client {
    /// 生成待插入的克隆副本，源聚合保持不变
    pub fn prepare_clone(&self, options: &CloneOptions) -> Client {
        let mut copy = self.clone();
        copy.reset_identities();
        copy.client_secrets.clear();

        if !options.cors_origins {
            copy.allowed_cors_origins.clear();
        }
        if !options.grant_types {
            copy.allowed_grant_types.clear();
        }
        if !options.idp_restrictions {
            copy.identity_provider_restrictions.clear();
        }
        if !options.post_logout_redirect_uris {
            copy.post_logout_redirect_uris.clear();
        }
        if !options.scopes {
            copy.allowed_scopes.clear();
        }
        if !options.redirect_uris {
            copy.redirect_uris.clear();
        }
        if !options.claims {
            copy.claims.clear();
        }
        if !options.properties {
            copy.properties.clear();
        }

        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ids_common::NEW_ID;

    fn source() -> Client {
        let mut client = Client::new("mvc", "MVC Client")
            .with_grant_type("hybrid")
            .with_redirect_uri("https://mvc/signin-oidc")
            .with_post_logout_redirect_uri("https://mvc/signout-callback-oidc")
            .with_scope("openid")
            .with_cors_origin("https://mvc")
            .with_idp_restriction("Google")
            .with_claim("role", "admin")
            .with_property("tier", "gold")
            .with_secret("s3cret");
        client.stamp_children(5);
        client.allowed_grant_types[0].id = 11;
        client.client_secrets[0].id = 12;
        client
    }

    #[test]
    fn test_secrets_never_cloned() {
        let copy = source().prepare_clone(&CloneOptions::all());
        assert!(copy.client_secrets.is_empty());
    }

    #[test]
    fn test_identities_cleared() {
        let copy = source().prepare_clone(&CloneOptions::all());
        assert_eq!(copy.id, NEW_ID);
        assert_eq!(copy.allowed_grant_types[0].id, NEW_ID);
        assert_eq!(copy.allowed_grant_types[0].client_id, NEW_ID);
        assert_eq!(copy.redirect_uris[0].client_id, NEW_ID);
    }

    #[test]
    fn test_selective_exclusion() {
        let options = CloneOptions {
            redirect_uris: false,
            claims: false,
            ..CloneOptions::all()
        };
        let copy = source().prepare_clone(&options);

        assert!(copy.redirect_uris.is_empty());
        assert!(copy.claims.is_empty());
        assert_eq!(copy.allowed_grant_types.len(), 1);
        assert_eq!(copy.properties.len(), 1);
        assert_eq!(copy.allowed_cors_origins.len(), 1);
    }

    #[test]
    fn test_none_keeps_only_root() {
        let src = source();
        let copy = src.prepare_clone(&CloneOptions::none());

        assert!(copy.allowed_scopes.is_empty());
        assert!(copy.redirect_uris.is_empty());
        assert!(copy.claims.is_empty());
        assert!(copy.properties.is_empty());
        assert_eq!(copy.client_id, src.client_id);
    }

    #[test]
    fn test_source_untouched() {
        let src = source();
        let before = src.clone();
        let _ = src.prepare_clone(&CloneOptions::none());
        assert_eq!(src, before);
    }
}
