//! 参考数据目录
//!
//! 进程启动时构建一次，之后只读，通过 `Arc<Catalog>` 注入仓储。

use ids_common::matches_filter;
use serde::{Deserialize, Serialize};

use super::client::{AccessTokenType, TokenExpiration, TokenUsage};

/// 下拉选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectItem {
    pub id: String,
    pub text: String,
}

impl SelectItem {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// 密钥哈希算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashType {
    Sha256 = 0,
    Sha512 = 1,
}

impl HashType {
    pub const ALL: [HashType; 2] = [HashType::Sha256, HashType::Sha512];

    pub fn name(&self) -> &'static str {
        match self {
            HashType::Sha256 => "Sha256",
            HashType::Sha512 => "Sha512",
        }
    }
}

/// 只读参考数据
#[derive(Debug, Clone)]
pub struct Catalog {
    grant_types: Vec<String>,
    standard_claims: Vec<String>,
    secret_types: Vec<String>,
    protocol_types: Vec<SelectItem>,
}

impl Catalog {
    pub fn new(
        grant_types: Vec<String>,
        standard_claims: Vec<String>,
        secret_types: Vec<String>,
        protocol_types: Vec<SelectItem>,
    ) -> Self {
        Self {
            grant_types,
            standard_claims,
            secret_types,
            protocol_types,
        }
    }

    /// IdentityServer 内置的授权类型、OIDC 标准声明与密钥类型
    pub fn standard() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        Self::new(
            owned(&[
                "implicit",
                "client_credentials",
                "authorization_code",
                "hybrid",
                "password",
                "urn:ietf:params:oauth:grant-type:device_code",
            ]),
            owned(&[
                "name",
                "given_name",
                "family_name",
                "middle_name",
                "nickname",
                "preferred_username",
                "profile",
                "picture",
                "website",
                "gender",
                "birthdate",
                "zoneinfo",
                "locale",
                "address",
                "updated_at",
            ]),
            owned(&[
                "SharedSecret",
                "X509Thumbprint",
                "X509Name",
                "X509CertificateBase64",
            ]),
            vec![SelectItem::new("oidc", "OpenID Connect")],
        )
    }

    /// 按子串过滤授权类型，`limit` 为 0 时不截断
    pub fn grant_types(&self, filter: &str, limit: usize) -> Vec<String> {
        filter_limit(&self.grant_types, filter, limit)
    }

    /// 按子串过滤标准声明，`limit` 为 0 时不截断
    pub fn standard_claims(&self, filter: &str, limit: usize) -> Vec<String> {
        filter_limit(&self.standard_claims, filter, limit)
    }

    pub fn secret_types(&self) -> Vec<SelectItem> {
        self.secret_types
            .iter()
            .map(|t| SelectItem::new(t.clone(), t.clone()))
            .collect()
    }

    pub fn protocol_types(&self) -> Vec<SelectItem> {
        self.protocol_types.clone()
    }

    pub fn access_token_types(&self) -> Vec<SelectItem> {
        AccessTokenType::ALL
            .iter()
            .map(|t| SelectItem::new((*t as i32).to_string(), t.to_string()))
            .collect()
    }

    pub fn token_expirations(&self) -> Vec<SelectItem> {
        TokenExpiration::ALL
            .iter()
            .map(|t| SelectItem::new((*t as i32).to_string(), t.to_string()))
            .collect()
    }

    pub fn token_usages(&self) -> Vec<SelectItem> {
        TokenUsage::ALL
            .iter()
            .map(|t| SelectItem::new((*t as i32).to_string(), t.to_string()))
            .collect()
    }

    pub fn hash_types(&self) -> Vec<SelectItem> {
        HashType::ALL
            .iter()
            .map(|t| SelectItem::new((*t as i32).to_string(), t.name()))
            .collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn filter_limit(items: &[String], filter: &str, limit: usize) -> Vec<String> {
    let matched = items.iter().filter(|item| matches_filter(item, filter)).cloned();
    if limit > 0 {
        matched.take(limit).collect()
    } else {
        matched.collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_types_filter() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.grant_types("", 0).len(), 6);
        assert_eq!(
            catalog.grant_types("code", 0),
            vec!["authorization_code", "urn:ietf:params:oauth:grant-type:device_code"]
        );
        assert_eq!(catalog.grant_types("", 2), vec!["implicit", "client_credentials"]);
    }

    #[test]
    fn test_standard_claims_filter() {
        let catalog = Catalog::standard();
        assert_eq!(
            catalog.standard_claims("name", 0),
            vec!["name", "given_name", "family_name", "middle_name", "nickname", "preferred_username"]
        );
        assert_eq!(catalog.standard_claims("NAME", 1), vec!["name"]);
        assert!(catalog.standard_claims("unknown", 0).is_empty());
    }

    #[test]
    fn test_select_lists() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.protocol_types(), vec![SelectItem::new("oidc", "OpenID Connect")]);
        assert_eq!(catalog.secret_types().len(), 4);
        assert_eq!(
            catalog.access_token_types(),
            vec![SelectItem::new("0", "Jwt"), SelectItem::new("1", "Reference")]
        );
        assert_eq!(catalog.token_usages()[1], SelectItem::new("1", "OneTimeOnly"));
        assert_eq!(catalog.token_expirations()[0], SelectItem::new("0", "Sliding"));
        assert_eq!(catalog.hash_types()[1], SelectItem::new("1", "Sha512"));
    }
}
