use std::collections::HashMap;

use sqlx::PgPool;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use validator::ValidateEmail;

use spay_auth::{IdentityProvider, IdpError, NewIdentity};
use spay_core::{AppError, ListParams, Pagination, order_by};
use spay_models::resources::{Permission, PermissionRow};
use spay_models::users::{
    AuthResponse, LoginDto, RegisterUserDto, USER_COLUMNS, UpdateUserDto,
};
use spay_models::{GlobalRole, ResourceKind, User};

use crate::utils::query::{FilterArg, ListFilter};

pub const USER_SEARCH_COLUMNS: &[&str] = &["last_name", "first_name", "email", "phone_number"];

pub const USER_SORT_COLUMNS: &[&str] = &[
    "first_name",
    "last_name",
    "email",
    "phone_number",
    "country",
    "created_at",
    "updated_at",
];

/// How a `{id}` path segment designates a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Me,
    Id(Uuid),
    Email(String),
    Phone(String),
}

impl UserRef {
    /// `me`, a UUID, an email or a phone number of at least 8 characters.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw == "me" {
            return Some(Self::Me);
        }
        if let Ok(id) = Uuid::parse_str(raw) {
            return Some(Self::Id(id));
        }
        if raw.validate_email() {
            return Some(Self::Email(raw.to_string()));
        }
        if raw.len() >= 8 {
            return Some(Self::Phone(raw.to_string()));
        }
        None
    }
}

fn unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

pub struct UserService;

impl UserService {
    /// Loads both permission sets of every user in `users`, one query per kind.
    #[instrument(skip(db, users), fields(users.count = users.len(), db.operation = "SELECT"))]
    pub async fn attach_permissions(db: &PgPool, users: &mut [User]) -> Result<(), AppError> {
        if users.is_empty() {
            return Ok(());
        }

        let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
        for kind in [ResourceKind::Shop, ResourceKind::Service] {
            let sql = format!(
                "SELECT {} FROM {} WHERE user_id = ANY($1) ORDER BY created_at",
                PermissionRow::columns(kind),
                kind.permission_table()
            );
            let rows = sqlx::query_as::<_, PermissionRow>(&sql)
                .bind(&ids)
                .fetch_all(db)
                .await?;

            let mut by_user: HashMap<Uuid, Vec<Permission>> = HashMap::new();
            for row in rows {
                let permission = row.into_permission(kind);
                by_user.entry(permission.user_id).or_default().push(permission);
            }
            for user in users.iter_mut() {
                *user.permissions_mut(kind) = by_user.remove(&user.id).unwrap_or_default();
            }
        }
        Ok(())
    }

    /// Loads both permission sets of `user`.
    pub async fn load_permissions(db: &PgPool, user: &mut User) -> Result<(), AppError> {
        Self::attach_permissions(db, std::slice::from_mut(user)).await
    }

    async fn find_one(db: &PgPool, condition: &str, value: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {condition} LIMIT 1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Database error fetching user");
                AppError::from(e)
            })?;

        match user {
            Some(mut user) => {
                Self::load_permissions(db, &mut user).await?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(db), fields(db.table = "users", db.operation = "SELECT"))]
    pub async fn find_by_auth_id(db: &PgPool, auth_id: &str) -> Result<Option<User>, AppError> {
        Self::find_one(db, "auth_id = $1", auth_id).await
    }

    /// Matches either the local id or the identity provider id.
    #[instrument(skip(db), fields(db.table = "users", db.operation = "SELECT"))]
    pub async fn find_by_any_id(db: &PgPool, id: &str) -> Result<Option<User>, AppError> {
        Self::find_one(db, "id::text = $1 OR auth_id = $1", id).await
    }

    #[instrument(skip(db), fields(db.table = "users", db.operation = "SELECT"))]
    pub async fn resolve(
        db: &PgPool,
        user_ref: &UserRef,
        caller_sub: &str,
    ) -> Result<Option<User>, AppError> {
        match user_ref {
            UserRef::Me => Self::find_by_auth_id(db, caller_sub).await,
            UserRef::Id(id) => Self::find_by_any_id(db, &id.to_string()).await,
            UserRef::Email(email) => Self::find_one(db, "lower(email) = lower($1)", email).await,
            UserRef::Phone(phone) => Self::find_one(db, "phone_number = $1", phone).await,
        }
    }

    /// Creates the identity at the provider, then the local row. The identity
    /// is removed again when the row cannot be written.
    #[instrument(skip(db, idp, dto), fields(db.table = "users", db.operation = "INSERT"))]
    pub async fn register(
        db: &PgPool,
        idp: &IdentityProvider,
        dto: RegisterUserDto,
    ) -> Result<AuthResponse, AppError> {
        let email = dto
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_lowercase);

        let identity = idp
            .register(&NewIdentity {
                first_name: dto.first_name.clone(),
                last_name: dto.last_name.clone(),
                phone_prefix: dto.phone_prefix.clone(),
                phone_number: dto.phone_number.clone(),
                email: email.clone(),
                password: dto.password.clone(),
            })
            .await
            .map_err(IdpError::into_app_error)?;

        let sql = format!(
            "INSERT INTO users (auth_id, first_name, last_name, phone_prefix, phone_number, email, country, role)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {USER_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, User>(&sql)
            .bind(&identity.auth_id)
            .bind(&dto.first_name)
            .bind(&dto.last_name)
            .bind(&dto.phone_prefix)
            .bind(&dto.phone_number)
            .bind(email.unwrap_or_default())
            .bind(dto.country.unwrap_or_default().to_lowercase())
            .bind(GlobalRole::Merchant)
            .fetch_one(db)
            .await;

        let user = match inserted {
            Ok(user) => user,
            Err(e) => {
                if let Err(rollback) = idp.delete_identity(&identity.auth_id).await {
                    warn!(auth_id = %identity.auth_id, error = %rollback, "Failed to roll back identity");
                }
                if unique_violation(&e) {
                    warn!(auth_id = %identity.auth_id, "User row already exists");
                    return Err(AppError::conflict(anyhow::anyhow!("user already exists")));
                }
                error!(error = %e, "Database error creating user");
                return Err(AppError::from(e));
            }
        };

        info!(user.id = %user.id, auth_id = %user.auth_id, "User registered");

        Ok(AuthResponse {
            user,
            token: identity.tokens.access_token,
            refresh_token: identity.tokens.refresh_token,
        })
    }

    #[instrument(skip(db, idp, dto), fields(db.table = "users", db.operation = "SELECT"))]
    pub async fn login(
        db: &PgPool,
        idp: &IdentityProvider,
        dto: LoginDto,
    ) -> Result<AuthResponse, AppError> {
        let identity = idp
            .login(dto.username.trim(), &dto.password)
            .await
            .map_err(IdpError::into_app_error)?;

        let user = Self::find_by_auth_id(db, &identity.auth_id)
            .await?
            .ok_or_else(|| {
                warn!(auth_id = %identity.auth_id, "Identity has no local user");
                AppError::unauthorized("user not recognized")
            })?;

        debug!(user.id = %user.id, "User logged in");

        Ok(AuthResponse {
            user,
            token: identity.tokens.access_token,
            refresh_token: identity.tokens.refresh_token,
        })
    }

    /// Lists users. `visible_services` restricts the result to members of
    /// those services; `filter_service` to members of a single service.
    #[instrument(skip(db, params, visible_services), fields(db.table = "users", db.operation = "SELECT"))]
    pub async fn list(
        db: &PgPool,
        params: &ListParams,
        visible_services: Option<Vec<Uuid>>,
        filter_service: Option<&str>,
    ) -> Result<(Vec<User>, Pagination), AppError> {
        let mut filter = ListFilter::new();
        filter.search(USER_SEARCH_COLUMNS, params.search());

        if let Some(services) = visible_services {
            filter.push(
                "id IN (SELECT user_id FROM service_permissions WHERE service_id = ANY($?))",
                FilterArg::Ids(services),
            );
        }
        if let Some(service) = filter_service {
            filter.push(
                "id IN (SELECT user_id FROM service_permissions WHERE service_id::text = $?)",
                FilterArg::Text(service.to_string()),
            );
        }

        let where_clause = filter.where_clause();
        let count_sql = format!("SELECT COUNT(*) FROM users{where_clause}");
        let count = filter
            .bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
            .fetch_one(db)
            .await?;

        let sorts = params.sorts_within(USER_SORT_COLUMNS);
        let data_sql = format!(
            "SELECT {USER_COLUMNS} FROM users{where_clause} ORDER BY {} LIMIT {} OFFSET {}",
            order_by(&sorts, "created_at DESC"),
            params.limit(),
            params.offset()
        );
        let mut users = filter
            .bind_as(sqlx::query_as::<_, User>(&data_sql))
            .fetch_all(db)
            .await?;

        Self::attach_permissions(db, &mut users).await?;

        debug!(count, returned = users.len(), "Users fetched");
        Ok((users, Pagination::new(count, params, sorts)))
    }

    #[instrument(skip(db, target, dto), fields(user.id = %target.id, db.table = "users", db.operation = "UPDATE"))]
    pub async fn update(db: &PgPool, target: &User, dto: UpdateUserDto) -> Result<User, AppError> {
        let sql = format!(
            "UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone_prefix = COALESCE($4, phone_prefix),
                phone_number = COALESCE($5, phone_number),
                email = COALESCE($6, email),
                country = COALESCE($7, country),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        );
        let mut user = sqlx::query_as::<_, User>(&sql)
            .bind(target.id)
            .bind(dto.first_name)
            .bind(dto.last_name)
            .bind(dto.phone_prefix)
            .bind(dto.phone_number)
            .bind(dto.email.map(|e| e.trim().to_lowercase()))
            .bind(dto.country.map(|c| c.to_lowercase()))
            .fetch_one(db)
            .await
            .map_err(|e| {
                if unique_violation(&e) {
                    return AppError::conflict(anyhow::anyhow!("duplicate data detected"));
                }
                error!(error = %e, "Database error updating user");
                AppError::from(e)
            })?;

        Self::load_permissions(db, &mut user).await?;
        info!(user.id = %user.id, "User updated");
        Ok(user)
    }

    #[instrument(skip(db, target), fields(user.id = %target.id, role = %role, db.table = "users", db.operation = "UPDATE"))]
    pub async fn change_role(db: &PgPool, target: &User, role: GlobalRole) -> Result<User, AppError> {
        let sql = format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let mut user = sqlx::query_as::<_, User>(&sql)
            .bind(target.id)
            .bind(role)
            .fetch_one(db)
            .await?;

        Self::load_permissions(db, &mut user).await?;
        info!(user.id = %user.id, "User role changed");
        Ok(user)
    }

    /// Deletes the local row (permissions cascade) and then the identity.
    #[instrument(skip(db, idp, target), fields(user.id = %target.id, db.table = "users", db.operation = "DELETE"))]
    pub async fn delete(
        db: &PgPool,
        idp: &IdentityProvider,
        target: &User,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(target.id)
            .execute(db)
            .await?;

        if let Err(e) = idp.delete_identity(&target.auth_id).await {
            warn!(auth_id = %target.auth_id, error = %e, "Failed to delete identity");
        }

        info!(user.id = %target.id, "User deleted");
        Ok(())
    }
}
