//! User entity and user management DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spay_core::Pagination;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::resources::Permission;
use crate::roles::{GlobalRole, ResourceKind};

/// Column list of `users`, in [`User`] field order.
pub const USER_COLUMNS: &str = "id, auth_id, first_name, last_name, phone_prefix, phone_number, \
     email, country, role, created_at, updated_at";

/// A local user, mirroring an identity held by the identity provider.
///
/// Permission lists are empty unless eager-loaded.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    /// Identity provider subject
    pub auth_id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_prefix: String,
    pub phone_number: String,
    pub email: String,
    pub country: String,
    pub role: GlobalRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub shop_permissions: Vec<Permission>,
    #[sqlx(skip)]
    pub service_permissions: Vec<Permission>,
}

impl User {
    /// Loaded permission records of one kind.
    pub fn permissions(&self, kind: ResourceKind) -> &[Permission] {
        match kind {
            ResourceKind::Shop => &self.shop_permissions,
            ResourceKind::Service => &self.service_permissions,
        }
    }

    pub fn permissions_mut(&mut self, kind: ResourceKind) -> &mut Vec<Permission> {
        match kind {
            ResourceKind::Shop => &mut self.shop_permissions,
            ResourceKind::Service => &mut self.service_permissions,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterUserDto {
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    /// Phone prefix, e.g. `225`
    #[validate(length(min = 1))]
    pub phone_prefix: String,
    #[validate(length(min = 1))]
    pub phone_number: String,
    #[validate(email)]
    pub email: Option<String>,
    /// Country code, e.g. `civ`
    pub country: Option<String>,
    #[validate(length(min = 4, max = 18))]
    pub password: String,
    #[validate(must_match(other = "password"))]
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginDto {
    /// Phone number, email or identity provider user id
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 4, max = 18))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserDto {
    #[validate(length(min = 1))]
    pub first_name: Option<String>,
    #[validate(length(min = 1))]
    pub last_name: Option<String>,
    #[validate(length(min = 1))]
    pub phone_prefix: Option<String>,
    #[validate(length(min = 1))]
    pub phone_number: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangeRoleDto {
    /// 0: MERCHANT, 1: MANAGER, 2: ADMIN
    #[validate(range(min = 0, max = 2))]
    pub role: i64,
    /// Identity provider id of the target user
    pub auth_id: Uuid,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChangeRoleResponse {
    pub user: User,
    /// New role token, e.g. `USER_MANAGER`
    pub new_role: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeleteUserResponse {
    pub user: User,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<User>,
    pub pagination: Pagination,
}

/// `filter-service`: only users holding a permission on that service.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserFilter {
    #[serde(rename = "filter-service", default)]
    #[param(rename = "filter-service")]
    pub filter_service: Option<String>,
}
