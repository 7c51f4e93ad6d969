//! Storage operations shared by shops and services.

use std::collections::HashMap;

use anyhow::anyhow;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use spay_core::{AppError, ListParams, Pagination, order_by};
use spay_models::credentials::generate_client_credentials;
use spay_models::resources::{
    CreateResourceDto, PermissionRow, RESOURCE_COLUMNS, RESOURCE_SEARCH_COLUMNS,
    RESOURCE_SORT_COLUMNS, UpdateResourceDto,
};
use spay_models::slug::slugify;
use spay_models::users::USER_COLUMNS;
use spay_models::{Permission, Resource, ResourceKind, ResourceRole, User};

use crate::utils::query::{FilterArg, ListFilter};

const PERMISSION_SORT_COLUMNS: &[&str] = &["role", "created_at", "updated_at"];

fn unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn already_exists(kind: ResourceKind) -> AppError {
    AppError::conflict(anyhow!("{} already exists", kind.singular()))
}

/// Alias-qualified permission columns, for joins.
fn permission_columns_of(kind: ResourceKind, alias: &str) -> String {
    format!(
        "{alias}.id, {alias}.user_id, {alias}.{} AS resource_id, {alias}.role, {alias}.created_at, {alias}.updated_at",
        kind.fk_column()
    )
}

pub struct ResourceService;

impl ResourceService {
    /// Attaches each permission's user.
    async fn attach_users(db: &PgPool, permissions: &mut [Permission]) -> Result<(), AppError> {
        if permissions.is_empty() {
            return Ok(());
        }

        let ids: Vec<Uuid> = permissions.iter().map(|p| p.user_id).collect();
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)");
        let users: HashMap<Uuid, User> = sqlx::query_as::<_, User>(&sql)
            .bind(ids)
            .fetch_all(db)
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect();

        for permission in permissions.iter_mut() {
            permission.user = users.get(&permission.user_id).cloned().map(Box::new);
        }
        Ok(())
    }

    /// Loads the permissions (with users) of every resource in `resources`.
    async fn attach_permissions(
        db: &PgPool,
        kind: ResourceKind,
        resources: &mut [Resource],
    ) -> Result<(), AppError> {
        if resources.is_empty() {
            return Ok(());
        }

        let ids: Vec<Uuid> = resources.iter().map(|r| r.id).collect();
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ANY($1) ORDER BY created_at",
            PermissionRow::columns(kind),
            kind.permission_table(),
            kind.fk_column()
        );
        let mut permissions: Vec<Permission> = sqlx::query_as::<_, PermissionRow>(&sql)
            .bind(ids)
            .fetch_all(db)
            .await?
            .into_iter()
            .map(|row| row.into_permission(kind))
            .collect();

        Self::attach_users(db, &mut permissions).await?;

        let mut by_resource: HashMap<Uuid, Vec<Permission>> = HashMap::new();
        for permission in permissions {
            by_resource
                .entry(permission.resource.id())
                .or_default()
                .push(permission);
        }
        for resource in resources.iter_mut() {
            resource.permissions = by_resource.remove(&resource.id).unwrap_or_default();
        }
        Ok(())
    }

    #[instrument(skip(db), fields(db.table = %kind.table(), db.operation = "SELECT"))]
    pub async fn find_by_id(
        db: &PgPool,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<Option<Resource>, AppError> {
        let sql = format!("SELECT {RESOURCE_COLUMNS} FROM {} WHERE id = $1", kind.table());
        let resource = sqlx::query_as::<_, Resource>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Database error fetching {}", kind.singular());
                AppError::from(e)
            })?;

        let Some(resource) = resource else {
            debug!("{} not found", kind.singular());
            return Ok(None);
        };

        let mut resources = [resource];
        Self::attach_permissions(db, kind, &mut resources).await?;
        let [resource] = resources;
        Ok(Some(resource))
    }

    /// Ids of `kind` resources the user designated by `user_ref` (local or
    /// identity provider id) holds a permission on.
    async fn ids_of_member(
        db: &PgPool,
        kind: ResourceKind,
        user_ref: &str,
    ) -> Result<Vec<Uuid>, AppError> {
        let sql = format!(
            "SELECT p.{fk} FROM {table} p JOIN users u ON u.id = p.user_id
             WHERE u.id::text = $1 OR u.auth_id = $1",
            fk = kind.fk_column(),
            table = kind.permission_table()
        );
        let ids = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(user_ref)
            .fetch_all(db)
            .await?;
        Ok(ids)
    }

    /// Lists resources. `visible` restricts to the given ids; `member` to the
    /// resources of one user.
    #[instrument(skip(db, params, visible), fields(db.table = %kind.table(), db.operation = "SELECT"))]
    pub async fn list(
        db: &PgPool,
        kind: ResourceKind,
        params: &ListParams,
        visible: Option<Vec<Uuid>>,
        member: Option<&str>,
    ) -> Result<(Vec<Resource>, Pagination), AppError> {
        let mut filter = ListFilter::new();
        filter.search(RESOURCE_SEARCH_COLUMNS, params.search());
        if let Some(ids) = visible {
            filter.ids("id", ids);
        }
        if let Some(user_ref) = member {
            let ids = Self::ids_of_member(db, kind, user_ref).await?;
            filter.push("id = ANY($?)", FilterArg::Ids(ids));
        }

        let where_clause = filter.where_clause();
        let count_sql = format!("SELECT COUNT(*) FROM {}{where_clause}", kind.table());
        let count = filter
            .bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
            .fetch_one(db)
            .await?;

        let sorts = params.sorts_within(RESOURCE_SORT_COLUMNS);
        let data_sql = format!(
            "SELECT {RESOURCE_COLUMNS} FROM {}{where_clause} ORDER BY {} LIMIT {} OFFSET {}",
            kind.table(),
            order_by(&sorts, "created_at DESC"),
            params.limit(),
            params.offset()
        );
        let mut resources = filter
            .bind_as(sqlx::query_as::<_, Resource>(&data_sql))
            .fetch_all(db)
            .await?;

        Self::attach_permissions(db, kind, &mut resources).await?;

        debug!(count, returned = resources.len(), "{} fetched", kind.plural());
        Ok((resources, Pagination::new(count, params, sorts)))
    }

    /// Inserts the resource and the owner's ADMIN permission atomically.
    #[instrument(skip(db, dto, owner), fields(owner.id = %owner.id, db.table = %kind.table(), db.operation = "INSERT"))]
    pub async fn create(
        db: &PgPool,
        kind: ResourceKind,
        dto: CreateResourceDto,
        owner: &User,
    ) -> Result<Resource, AppError> {
        let name = dto.name.trim().to_string();
        let slug = slugify(&name);
        let (client_id, client_key) = generate_client_credentials();

        let mut tx = db.begin().await?;

        let sql = format!(
            "INSERT INTO {} (name, name_slug, description, site_web, country, client_id, client_key)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {RESOURCE_COLUMNS}",
            kind.table()
        );
        let resource = sqlx::query_as::<_, Resource>(&sql)
            .bind(&name)
            .bind(&slug)
            .bind(&dto.description)
            .bind(&dto.site_web)
            .bind(dto.country.unwrap_or_default().to_lowercase())
            .bind(&client_id)
            .bind(&client_key)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if unique_violation(&e) {
                    warn!(slug = %slug, "{} slug already taken", kind.singular());
                    return already_exists(kind);
                }
                error!(error = %e, "Database error creating {}", kind.singular());
                AppError::from(e)
            })?;

        let sql = format!(
            "INSERT INTO {} (user_id, {}, role) VALUES ($1, $2, $3)",
            kind.permission_table(),
            kind.fk_column()
        );
        sqlx::query(&sql)
            .bind(owner.id)
            .bind(resource.id)
            .bind(ResourceRole::Admin.encode(kind))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(id = %resource.id, slug = %resource.name_slug, "{} created", kind.singular());

        Self::find_by_id(db, kind, resource.id)
            .await?
            .ok_or_else(|| AppError::internal(anyhow!("{} vanished after insert", kind.singular())))
    }

    /// Applies the provided fields; the slug follows the resulting name.
    #[instrument(skip(db, current, dto), fields(id = %current.id, db.table = %kind.table(), db.operation = "UPDATE"))]
    pub async fn update(
        db: &PgPool,
        kind: ResourceKind,
        current: &Resource,
        dto: UpdateResourceDto,
    ) -> Result<Resource, AppError> {
        let name = dto
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or_else(|| current.name.clone());
        let slug = slugify(&name);

        let sql = format!(
            "UPDATE {} SET
                name = $2,
                name_slug = $3,
                description = COALESCE($4, description),
                site_web = COALESCE($5, site_web),
                country = COALESCE($6, country),
                updated_at = NOW()
             WHERE id = $1",
            kind.table()
        );
        sqlx::query(&sql)
            .bind(current.id)
            .bind(&name)
            .bind(&slug)
            .bind(dto.description)
            .bind(dto.site_web)
            .bind(dto.country.map(|c| c.to_lowercase()))
            .execute(db)
            .await
            .map_err(|e| {
                if unique_violation(&e) {
                    return already_exists(kind);
                }
                error!(error = %e, "Database error updating {}", kind.singular());
                AppError::from(e)
            })?;

        info!(id = %current.id, "{} updated", kind.singular());

        Self::find_by_id(db, kind, current.id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("{} not found", kind.singular())))
    }

    /// Permission rows go with the resource through the foreign key cascade.
    #[instrument(skip(db), fields(db.table = %kind.table(), db.operation = "DELETE"))]
    pub async fn delete(db: &PgPool, kind: ResourceKind, id: Uuid) -> Result<(), AppError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
        let result = sqlx::query(&sql).bind(id).execute(db).await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("{} not found", kind.singular())));
        }

        info!(id = %id, "{} deleted", kind.singular());
        Ok(())
    }

    #[instrument(skip(db), fields(db.table = %kind.table(), db.operation = "UPDATE"))]
    pub async fn regenerate_client(
        db: &PgPool,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<Resource, AppError> {
        let (client_id, client_key) = generate_client_credentials();

        let sql = format!(
            "UPDATE {} SET client_id = $2, client_key = $3, updated_at = NOW()
             WHERE id = $1
             RETURNING {RESOURCE_COLUMNS}",
            kind.table()
        );
        let resource = sqlx::query_as::<_, Resource>(&sql)
            .bind(id)
            .bind(client_id)
            .bind(client_key)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("{} not found", kind.singular())))?;

        info!(id = %id, "{} client credentials regenerated", kind.singular());
        Ok(resource)
    }

    #[instrument(skip(db, params), fields(db.table = %kind.permission_table(), db.operation = "SELECT"))]
    pub async fn list_permissions(
        db: &PgPool,
        kind: ResourceKind,
        resource_id: Uuid,
        params: &ListParams,
    ) -> Result<(Vec<Permission>, Pagination), AppError> {
        let mut filter = ListFilter::new();
        filter.ids(&format!("p.{}", kind.fk_column()), vec![resource_id]);
        filter.search(
            &["u.first_name", "u.last_name", "u.email", "u.phone_number"],
            params.search(),
        );

        let from = format!(
            "{} p JOIN users u ON u.id = p.user_id",
            kind.permission_table()
        );
        let where_clause = filter.where_clause();

        let count_sql = format!("SELECT COUNT(*) FROM {from}{where_clause}");
        let count = filter
            .bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
            .fetch_one(db)
            .await?;

        let sorts = params.sorts_within(PERMISSION_SORT_COLUMNS);
        let qualified: Vec<String> = sorts.iter().map(|s| format!("p.{s}")).collect();
        let data_sql = format!(
            "SELECT {} FROM {from}{where_clause} ORDER BY {} LIMIT {} OFFSET {}",
            permission_columns_of(kind, "p"),
            order_by(&qualified, "p.created_at DESC"),
            params.limit(),
            params.offset()
        );
        let mut permissions: Vec<Permission> = filter
            .bind_as(sqlx::query_as::<_, PermissionRow>(&data_sql))
            .fetch_all(db)
            .await?
            .into_iter()
            .map(|row| row.into_permission(kind))
            .collect();

        Self::attach_users(db, &mut permissions).await?;
        Ok((permissions, Pagination::new(count, params, sorts)))
    }

    #[instrument(skip(db, target), fields(user.id = %target.id, db.table = %kind.permission_table(), db.operation = "INSERT"))]
    pub async fn add_permission(
        db: &PgPool,
        kind: ResourceKind,
        resource_id: Uuid,
        target: &User,
        role: ResourceRole,
    ) -> Result<Permission, AppError> {
        let sql = format!(
            "INSERT INTO {table} (user_id, {fk}, role) VALUES ($1, $2, $3)
             RETURNING id, user_id, {fk} AS resource_id, role, created_at, updated_at",
            table = kind.permission_table(),
            fk = kind.fk_column()
        );
        let row = sqlx::query_as::<_, PermissionRow>(&sql)
            .bind(target.id)
            .bind(resource_id)
            .bind(role.encode(kind))
            .fetch_one(db)
            .await
            .map_err(|e| {
                if unique_violation(&e) {
                    return AppError::conflict(anyhow!(
                        "user already added to this {}",
                        kind.singular()
                    ));
                }
                error!(error = %e, "Database error adding permission");
                AppError::from(e)
            })?;

        let mut permission = row.into_permission(kind);
        permission.user = Some(Box::new(target.clone()));

        info!(permission.id = %permission.id, "Permission added");
        Ok(permission)
    }
}
