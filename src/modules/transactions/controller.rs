use anyhow::anyhow;
use axum::extract::{Query, State};
use tracing::instrument;

use spay_core::{ApiResponse, AppError, ErrorDetail, ListParams};
use spay_models::access::{is_grant, is_member, visible_resource_ids};
use spay_models::transactions::{
    CreateTransactionDto, TransactionFilter, TransactionListResponse, TransactionResponse,
};
use spay_models::{GlobalRole, ResourceKind, ResourceRole};

use crate::middleware::auth::CurrentUser;
use crate::middleware::lookup::LoadedTransaction;
use crate::modules::providers::service::ProviderService;
use crate::modules::resources::service::ResourceService;
use crate::modules::transactions::service::TransactionService;
use crate::modules::users::service::UserService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// List transactions
///
/// Merchants only see transactions of services they are a member of.
#[utoipa::path(
    get,
    path = "/api/transactions",
    params(ListParams, TransactionFilter),
    responses(
        (status = 200, description = "Paginated transactions", body = TransactionListResponse),
        (status = 401, description = "Unauthorized", body = [ErrorDetail])
    ),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
#[instrument(skip(state, caller))]
pub async fn list_transactions(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<TransactionFilter>,
) -> Result<ApiResponse<TransactionListResponse>, AppError> {
    let visible = visible_resource_ids(&caller, ResourceKind::Service);
    let member = filter
        .filter_transaction
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let (transactions, pagination) =
        TransactionService::list(&state.db, &params, visible, member).await?;
    Ok(ApiResponse::ok(TransactionListResponse {
        transactions,
        pagination,
    }))
}

/// Record a transaction on a service
///
/// Global MANAGERs may act for another user through `auth_id`.
#[utoipa::path(
    post,
    path = "/api/transactions",
    request_body = CreateTransactionDto,
    responses(
        (status = 201, description = "Transaction recorded", body = TransactionResponse),
        (status = 403, description = "Not a member of the service", body = [ErrorDetail]),
        (status = 404, description = "Service, provider or user not found", body = [ErrorDetail]),
        (status = 409, description = "Transaction already exists", body = [ErrorDetail])
    ),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
#[instrument(skip(state, caller, dto))]
pub async fn create_transaction(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ValidatedJson(dto): ValidatedJson<CreateTransactionDto>,
) -> Result<ApiResponse<TransactionResponse>, AppError> {
    let delegate = dto
        .auth_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty() && *id != caller.auth_id);

    let actor = match delegate {
        Some(auth_id) if is_grant(&caller, GlobalRole::Manager) => {
            UserService::find_by_any_id(&state.db, auth_id)
                .await?
                .ok_or_else(|| AppError::not_found(anyhow!("user does not exist")))?
        }
        Some(_) => {
            return Err(AppError::forbidden(
                "you are not allowed to act for another user",
            ));
        }
        None => caller,
    };

    ResourceService::find_by_id(&state.db, ResourceKind::Service, dto.service_id)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("service not found")))?;
    ProviderService::find_by_id(&state.db, dto.provider_id)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("provider not found")))?;

    if !is_member(&actor, ResourceKind::Service, dto.service_id, ResourceRole::Dev) {
        return Err(AppError::forbidden(
            "you are not allowed to record transactions on this service",
        ));
    }

    let transaction = TransactionService::create(&state.db, dto).await?;
    Ok(ApiResponse::created(TransactionResponse { transaction }))
}

#[utoipa::path(
    get,
    path = "/api/transactions/{id}",
    params(("id" = Uuid, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction with provider and service", body = TransactionResponse),
        (status = 403, description = "Not a member of the service", body = [ErrorDetail]),
        (status = 404, description = "Transaction not found", body = [ErrorDetail])
    ),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
pub async fn get_transaction(
    CurrentUser(caller): CurrentUser,
    LoadedTransaction(transaction): LoadedTransaction,
) -> Result<ApiResponse<TransactionResponse>, AppError> {
    if !is_member(
        &caller,
        ResourceKind::Service,
        transaction.service_id,
        ResourceRole::Dev,
    ) {
        return Err(AppError::forbidden(
            "you are not allowed to read this transaction",
        ));
    }

    Ok(ApiResponse::ok(TransactionResponse { transaction }))
}
