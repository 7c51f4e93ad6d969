//! Payment providers. Providers are descriptors only; no payment rail is
//! executed by the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spay_core::Pagination;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const PROVIDER_COLUMNS: &str = "id, name, name_slug, description, asynchrone_mode, pay_url, \
     pay_check_url, health_url, support_country, created_at, updated_at";

pub const PROVIDER_SEARCH_COLUMNS: &[&str] = &["name", "name_slug", "description"];

pub const PROVIDER_SORT_COLUMNS: &[&str] = &["name", "name_slug", "created_at", "updated_at"];

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Provider {
    pub id: Uuid,
    pub name: String,
    pub name_slug: String,
    pub description: String,
    pub asynchrone_mode: bool,
    pub pay_url: String,
    pub pay_check_url: String,
    pub health_url: String,
    /// Country codes the provider operates in
    pub support_country: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProviderDto {
    #[validate(length(min = 1))]
    pub name: String,
    pub description: Option<String>,
    pub asynchrone_mode: Option<bool>,
    #[validate(url)]
    pub pay_url: Option<String>,
    #[validate(url)]
    pub pay_check_url: Option<String>,
    #[validate(url)]
    pub health_url: Option<String>,
    pub support_country: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProviderResponse {
    pub provider: Provider,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProviderListResponse {
    pub providers: Vec<Provider>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_urls_are_validated() {
        let dto = CreateProviderDto {
            name: "Orange Money".to_string(),
            description: None,
            asynchrone_mode: Some(true),
            pay_url: Some("not a url".to_string()),
            pay_check_url: Some("https://api.orange.ci/check".to_string()),
            health_url: None,
            support_country: Some(vec!["civ".to_string()]),
        };
        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("pay_url"));
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_provider_name_required() {
        let dto = CreateProviderDto {
            name: String::new(),
            description: None,
            asynchrone_mode: None,
            pay_url: None,
            pay_check_url: None,
            health_url: None,
            support_country: None,
        };
        assert!(dto.validate().is_err());
    }
}
