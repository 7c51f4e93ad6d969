use axum::extract::{Query, State};
use tracing::instrument;

use spay_core::{ApiResponse, AppError, ErrorDetail, ListParams};
use spay_models::GlobalRole;
use spay_models::access::is_grant;
use spay_models::providers::{CreateProviderDto, ProviderListResponse, ProviderResponse};

use crate::middleware::auth::CurrentUser;
use crate::modules::providers::service::ProviderService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/providers",
    params(ListParams),
    responses(
        (status = 200, description = "Paginated providers", body = ProviderListResponse),
        (status = 401, description = "Unauthorized", body = [ErrorDetail])
    ),
    security(("bearer_auth" = [])),
    tag = "Providers"
)]
#[instrument(skip(state, _caller))]
pub async fn list_providers(
    State(state): State<AppState>,
    CurrentUser(_caller): CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<ApiResponse<ProviderListResponse>, AppError> {
    let (providers, pagination) = ProviderService::list(&state.db, &params).await?;
    Ok(ApiResponse::ok(ProviderListResponse {
        providers,
        pagination,
    }))
}

/// Register a payment provider (global MANAGER)
#[utoipa::path(
    post,
    path = "/api/providers",
    request_body = CreateProviderDto,
    responses(
        (status = 201, description = "Provider created", body = ProviderResponse),
        (status = 403, description = "Caller is not MANAGER", body = [ErrorDetail]),
        (status = 409, description = "Provider already exists", body = [ErrorDetail])
    ),
    security(("bearer_auth" = [])),
    tag = "Providers"
)]
#[instrument(skip(state, caller, dto))]
pub async fn create_provider(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ValidatedJson(dto): ValidatedJson<CreateProviderDto>,
) -> Result<ApiResponse<ProviderResponse>, AppError> {
    if !is_grant(&caller, GlobalRole::Manager) {
        return Err(AppError::forbidden("only managers can register providers"));
    }

    let provider = ProviderService::create(&state.db, dto).await?;
    Ok(ApiResponse::created(ProviderResponse { provider }))
}
