//! Authorized operations shared by the shop and service controllers.
//!
//! Each function checks the caller against the permission evaluator, then
//! delegates to [`ResourceService`]. Controllers only wrap the results into
//! kind-specific response bodies.

use anyhow::anyhow;

use spay_core::{AppError, ListParams, Pagination};
use spay_models::access::{
    add_permission_required_role, delete_gate, is_grant, is_member, manager_gate,
    visible_resource_ids,
};
use spay_models::resources::{
    AddPermissionDto, ClientCredentials, CreateResourceDto, ResourceFilter, UpdateResourceDto,
};
use spay_models::{GlobalRole, Permission, Resource, ResourceKind, ResourceRole, User};

use crate::middleware::lookup::LoadedResource;
use crate::modules::resources::service::ResourceService;
use crate::modules::users::service::UserService;
use crate::state::AppState;

fn denied(action: &str, loaded: &LoadedResource) -> AppError {
    AppError::forbidden(format!(
        "you are not allowed to {action} this {}",
        loaded.kind.singular()
    ))
}

pub async fn list(
    state: &AppState,
    caller: &User,
    kind: ResourceKind,
    params: &ListParams,
    filter: &ResourceFilter,
) -> Result<(Vec<Resource>, Pagination), AppError> {
    let visible = visible_resource_ids(caller, kind);
    ResourceService::list(&state.db, kind, params, visible, filter.user_filter(kind)).await
}

/// Creates a resource owned by the caller, or by `dto.auth_id` when the caller
/// is a global MANAGER or above.
pub async fn create(
    state: &AppState,
    caller: &User,
    kind: ResourceKind,
    dto: CreateResourceDto,
) -> Result<Resource, AppError> {
    let delegate = dto
        .auth_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty() && *id != caller.auth_id);

    let owner = match delegate {
        Some(auth_id) if is_grant(caller, GlobalRole::Manager) => {
            UserService::find_by_any_id(&state.db, auth_id)
                .await?
                .ok_or_else(|| AppError::not_found(anyhow!("user does not exist")))?
        }
        Some(_) => {
            return Err(AppError::forbidden(format!(
                "you are not allowed to create a {} for another user",
                kind.singular()
            )));
        }
        None => caller.clone(),
    };

    ResourceService::create(&state.db, kind, dto, &owner).await
}

pub async fn update(
    state: &AppState,
    caller: &User,
    loaded: &LoadedResource,
    dto: UpdateResourceDto,
) -> Result<Resource, AppError> {
    if !manager_gate(caller, loaded.kind, loaded.resource.id) {
        return Err(denied("update", loaded));
    }
    ResourceService::update(&state.db, loaded.kind, &loaded.resource, dto).await
}

pub async fn delete(
    state: &AppState,
    caller: &User,
    loaded: &LoadedResource,
) -> Result<(), AppError> {
    let strict = state.authz.strict_delete_gate;
    if !delete_gate(caller, loaded.kind, loaded.resource.id, strict) {
        return Err(denied("delete", loaded));
    }
    ResourceService::delete(&state.db, loaded.kind, loaded.resource.id).await
}

pub fn show_client(caller: &User, loaded: &LoadedResource) -> Result<ClientCredentials, AppError> {
    if !manager_gate(caller, loaded.kind, loaded.resource.id) {
        return Err(denied("read the credentials of", loaded));
    }
    Ok(ClientCredentials::from(&loaded.resource))
}

pub async fn regenerate_client(
    state: &AppState,
    caller: &User,
    loaded: &LoadedResource,
) -> Result<ClientCredentials, AppError> {
    if !manager_gate(caller, loaded.kind, loaded.resource.id) {
        return Err(denied("regenerate the credentials of", loaded));
    }
    let resource =
        ResourceService::regenerate_client(&state.db, loaded.kind, loaded.resource.id).await?;
    Ok(ClientCredentials::from(&resource))
}

pub async fn list_permissions(
    state: &AppState,
    caller: &User,
    loaded: &LoadedResource,
    params: &ListParams,
) -> Result<(Vec<Permission>, Pagination), AppError> {
    if !is_member(caller, loaded.kind, loaded.resource.id, ResourceRole::Dev) {
        return Err(denied("list the members of", loaded));
    }
    ResourceService::list_permissions(&state.db, loaded.kind, loaded.resource.id, params).await
}

pub async fn add_permission(
    state: &AppState,
    caller: &User,
    loaded: &LoadedResource,
    dto: AddPermissionDto,
) -> Result<Permission, AppError> {
    let role = ResourceRole::from_ordinal(dto.role);
    let required = add_permission_required_role(role);
    if !is_member(caller, loaded.kind, loaded.resource.id, required) {
        return Err(denied("add members to", loaded));
    }

    let target = UserService::find_by_any_id(&state.db, dto.user_id.trim())
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("user does not exist")))?;

    ResourceService::add_permission(&state.db, loaded.kind, loaded.resource.id, &target, role)
        .await
}
