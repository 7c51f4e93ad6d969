//! Shops and services, their permission records and DTOs.
//!
//! Shops and services share one table layout, so a single [`Resource`] type
//! serves both; the [`ResourceKind`] travels next to it wherever the
//! difference matters (table names, role tokens, JSON keys).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spay_core::Pagination;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::roles::{ResourceKind, ResourceRole};
use crate::users::User;

/// Column list of `shops` and `services`, in [`Resource`] field order.
pub const RESOURCE_COLUMNS: &str = "id, amount, current_amount, name, name_slug, description, \
     site_web, logo, country, client_id, client_key, created_at, updated_at";

/// Columns a resource list may be searched on.
pub const RESOURCE_SEARCH_COLUMNS: &[&str] =
    &["name", "name_slug", "description", "site_web", "country"];

/// Columns a resource list may be sorted on.
pub const RESOURCE_SORT_COLUMNS: &[&str] = &[
    "name",
    "name_slug",
    "country",
    "amount",
    "current_amount",
    "created_at",
    "updated_at",
];

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Resource {
    pub id: Uuid,
    pub amount: f64,
    pub current_amount: f64,
    pub name: String,
    pub name_slug: String,
    pub description: String,
    pub site_web: String,
    pub logo: String,
    pub country: String,
    #[serde(skip)]
    pub client_id: String,
    #[serde(skip)]
    pub client_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<Permission>,
}

/// The shop or service a permission record points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum ResourceRef {
    #[serde(rename = "shop_id")]
    Shop(Uuid),
    #[serde(rename = "service_id")]
    Service(Uuid),
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, id: Uuid) -> Self {
        match kind {
            ResourceKind::Shop => Self::Shop(id),
            ResourceKind::Service => Self::Service(id),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Shop(_) => ResourceKind::Shop,
            Self::Service(_) => ResourceKind::Service,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::Shop(id) | Self::Service(id) => *id,
        }
    }
}

/// A user's role on one shop or service.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Permission {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub resource: ResourceRef,
    pub role: ResourceRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(no_recursion)]
    pub user: Option<Box<User>>,
}

/// Raw permission row; the foreign key column is selected as `resource_id`.
///
/// The role stays a raw token until the kind is known.
#[derive(Debug, Clone, FromRow)]
pub struct PermissionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub resource_id: Uuid,
    pub role: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PermissionRow {
    /// `SELECT` list aliasing the kind-specific foreign key.
    pub fn columns(kind: ResourceKind) -> String {
        format!(
            "id, user_id, {} AS resource_id, role, created_at, updated_at",
            kind.fk_column()
        )
    }

    pub fn into_permission(self, kind: ResourceKind) -> Permission {
        Permission {
            id: self.id,
            user_id: self.user_id,
            resource: ResourceRef::new(kind, self.resource_id),
            role: ResourceRole::decode(kind, self.role.as_deref()),
            created_at: self.created_at,
            updated_at: self.updated_at,
            user: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateResourceDto {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(length(min = 1))]
    pub site_web: String,
    pub country: Option<String>,
    /// Create on behalf of this user (global MANAGER and above)
    pub auth_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateResourceDto {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    #[validate(length(min = 1))]
    pub site_web: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddPermissionDto {
    /// Local id or identity provider id of the user to add
    #[validate(length(min = 1))]
    pub user_id: String,
    /// 0: DEV, 1: MANAGER, 2: ADMIN
    #[validate(range(min = 0, max = 2))]
    pub role: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_key: String,
}

impl From<&Resource> for ClientCredentials {
    fn from(resource: &Resource) -> Self {
        Self {
            client_id: resource.client_id.clone(),
            client_key: resource.client_key.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ShopResponse {
    pub shop: Resource,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ShopListResponse {
    pub shops: Vec<Resource>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeleteShopResponse {
    pub shop: Resource,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServiceResponse {
    pub service: Resource,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServiceListResponse {
    pub services: Vec<Resource>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeleteServiceResponse {
    pub service: Resource,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PermissionListResponse {
    pub permissions: Vec<Permission>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PermissionResponse {
    pub permission: Permission,
}

/// `filter-shop` / `filter-service`: only resources the given user holds a
/// permission on.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ResourceFilter {
    #[serde(rename = "filter-shop", default)]
    #[param(rename = "filter-shop")]
    pub filter_shop: Option<String>,
    #[serde(rename = "filter-service", default)]
    #[param(rename = "filter-service")]
    pub filter_service: Option<String>,
}

impl ResourceFilter {
    pub fn user_filter(&self, kind: ResourceKind) -> Option<&str> {
        let value = match kind {
            ResourceKind::Shop => self.filter_shop.as_deref(),
            ResourceKind::Service => self.filter_service.as_deref(),
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }
}
