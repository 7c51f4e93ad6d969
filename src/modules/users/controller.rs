use anyhow::anyhow;
use axum::extract::{Query, State};
use tracing::instrument;

use spay_core::{ApiResponse, AppError, ErrorDetail, ListParams};
use spay_models::access::{can_update_profile, is_grant, manageable_service_ids};
use spay_models::users::{
    AuthResponse, ChangeRoleDto, ChangeRoleResponse, DeleteUserResponse, LoginDto,
    RegisterUserDto, UpdateUserDto, UserFilter, UserListResponse, UserResponse,
};
use spay_models::GlobalRole;

use crate::middleware::auth::CurrentUser;
use crate::middleware::lookup::LoadedUser;
use crate::modules::users::service::UserService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = RegisterUserDto,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 409, description = "User already exists", body = [ErrorDetail]),
        (status = 422, description = "Invalid form", body = [ErrorDetail]),
        (status = 502, description = "Identity provider unavailable", body = [ErrorDetail])
    ),
    tag = "Users"
)]
#[instrument(skip(state, dto))]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<RegisterUserDto>,
) -> Result<ApiResponse<AuthResponse>, AppError> {
    let response = UserService::register(&state.db, &state.idp, dto).await?;
    Ok(ApiResponse::created(response))
}

/// Log in with a phone number, email or identity provider id
#[utoipa::path(
    post,
    path = "/api/users/login",
    request_body = LoginDto,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = [ErrorDetail]),
        (status = 422, description = "Invalid form", body = [ErrorDetail])
    ),
    tag = "Users"
)]
#[instrument(skip(state, dto))]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<LoginDto>,
) -> Result<ApiResponse<AuthResponse>, AppError> {
    let response = UserService::login(&state.db, &state.idp, dto).await?;
    Ok(ApiResponse::ok(response))
}

/// List users
///
/// Merchants only see members of services they manage.
#[utoipa::path(
    get,
    path = "/api/users",
    params(ListParams, UserFilter),
    responses(
        (status = 200, description = "Paginated users", body = UserListResponse),
        (status = 401, description = "Unauthorized", body = [ErrorDetail])
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state, caller))]
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<UserFilter>,
) -> Result<ApiResponse<UserListResponse>, AppError> {
    let visible = manageable_service_ids(&caller);
    let filter_service = filter
        .filter_service
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let (users, pagination) =
        UserService::list(&state.db, &params, visible, filter_service).await?;
    Ok(ApiResponse::ok(UserListResponse { users, pagination }))
}

/// Get a user by `me`, id, email or phone number
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "`me`, user id, auth id, email or phone number")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 400, description = "Invalid user identifier", body = [ErrorDetail]),
        (status = 404, description = "User not found", body = [ErrorDetail])
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user(LoadedUser(user): LoadedUser) -> ApiResponse<UserResponse> {
    ApiResponse::ok(UserResponse { user })
}

/// Update a user profile
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "`me`, user id, auth id, email or phone number")),
    request_body = UpdateUserDto,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 403, description = "Not allowed to update this user", body = [ErrorDetail]),
        (status = 422, description = "Invalid form", body = [ErrorDetail])
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state, caller, target, dto))]
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    LoadedUser(target): LoadedUser,
    ValidatedJson(dto): ValidatedJson<UpdateUserDto>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    if !can_update_profile(&caller, &target) {
        return Err(AppError::forbidden("you can only update your own profile"));
    }

    let user = UserService::update(&state.db, &target, dto).await?;
    Ok(ApiResponse::ok(UserResponse { user }))
}

/// Delete a user (global ADMIN)
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "`me`, user id, auth id, email or phone number")),
    responses(
        (status = 200, description = "User deleted", body = DeleteUserResponse),
        (status = 403, description = "Caller is not ADMIN or target is ADMIN", body = [ErrorDetail])
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state, caller, target))]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    LoadedUser(target): LoadedUser,
) -> Result<ApiResponse<DeleteUserResponse>, AppError> {
    if !is_grant(&caller, GlobalRole::Admin) {
        return Err(AppError::forbidden("only administrators can delete users"));
    }
    if target.role == GlobalRole::Admin {
        return Err(AppError::forbidden("administrators cannot be deleted"));
    }

    UserService::delete(&state.db, &state.idp, &target).await?;
    Ok(ApiResponse::ok(DeleteUserResponse {
        user: target,
        deleted: true,
    }))
}

/// Change the global role of a user (global ADMIN)
#[utoipa::path(
    post,
    path = "/api/users/change-role",
    request_body = ChangeRoleDto,
    responses(
        (status = 200, description = "Role changed", body = ChangeRoleResponse),
        (status = 403, description = "Caller is not ADMIN or targets itself", body = [ErrorDetail]),
        (status = 404, description = "User not found", body = [ErrorDetail])
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state, caller, dto))]
pub async fn change_role(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ValidatedJson(dto): ValidatedJson<ChangeRoleDto>,
) -> Result<ApiResponse<ChangeRoleResponse>, AppError> {
    if !is_grant(&caller, GlobalRole::Admin) {
        return Err(AppError::forbidden("only administrators can change roles"));
    }

    let target = UserService::find_by_auth_id(&state.db, &dto.auth_id.to_string())
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("user not found")))?;

    if target.auth_id == caller.auth_id {
        return Err(AppError::forbidden("changing your own role is not allowed"));
    }

    let role = GlobalRole::from_ordinal(dto.role);
    let user = UserService::change_role(&state.db, &target, role).await?;
    Ok(ApiResponse::ok(ChangeRoleResponse {
        user,
        new_role: role.encode().to_string(),
    }))
}
