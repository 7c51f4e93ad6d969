//! Resolves `{id}` path segments into typed request extensions.
//!
//! Each loader runs after [`require_auth`](super::auth::require_auth), loads
//! the entity with its relations and inserts it for the handler. Server-side
//! failures of the wrapped handler are reported with a generic message.

use anyhow::anyhow;
use axum::{
    extract::{FromRequestParts, Path, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use spay_auth::Claims;
use spay_core::AppError;
use spay_models::{Resource, ResourceKind, Transaction, User};
use uuid::Uuid;

use crate::middleware::envelope::mask_server_error;
use crate::modules::resources::service::ResourceService;
use crate::modules::transactions::service::TransactionService;
use crate::modules::users::service::{UserRef, UserService};
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct LoadedResource {
    pub kind: ResourceKind,
    pub resource: Resource,
}

#[derive(Debug, Clone)]
pub struct LoadedTransaction(pub Transaction);

#[derive(Debug, Clone)]
pub struct LoadedUser(pub User);

macro_rules! loaded_extractor {
    ($name:ident) => {
        impl<S> FromRequestParts<S> for $name
        where
            S: Send + Sync,
        {
            type Rejection = AppError;

            async fn from_request_parts(
                parts: &mut Parts,
                _state: &S,
            ) -> Result<Self, Self::Rejection> {
                parts.extensions.get::<$name>().cloned().ok_or_else(|| {
                    AppError::internal(anyhow!(concat!(stringify!($name), " missing")))
                })
            }
        }
    };
}

loaded_extractor!(LoadedResource);
loaded_extractor!(LoadedTransaction);
loaded_extractor!(LoadedUser);

fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::not_found(anyhow!("{what} not found")))
}

async fn load_resource(
    state: &AppState,
    kind: ResourceKind,
    raw_id: &str,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let id = parse_id(raw_id, kind.singular())?;
    let resource = ResourceService::find_by_id(&state.db, kind, id)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("{} not found", kind.singular())))?;

    req.extensions_mut().insert(LoadedResource { kind, resource });
    Ok(next.run(req).await)
}

pub async fn load_shop(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Request,
    next: Next,
) -> Response {
    mask_server_error(
        load_resource(&state, ResourceKind::Shop, &id, req, next)
            .await
            .into_response(),
    )
}

pub async fn load_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Request,
    next: Next,
) -> Response {
    mask_server_error(
        load_resource(&state, ResourceKind::Service, &id, req, next)
            .await
            .into_response(),
    )
}

pub async fn load_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Request,
    next: Next,
) -> Response {
    mask_server_error(resolve_transaction(&state, &id, req, next).await.into_response())
}

async fn resolve_transaction(
    state: &AppState,
    id: &str,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let id = parse_id(id, "transaction")?;
    let transaction = TransactionService::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("transaction not found")))?;

    req.extensions_mut().insert(LoadedTransaction(transaction));
    Ok(next.run(req).await)
}

pub async fn load_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Request,
    next: Next,
) -> Response {
    mask_server_error(resolve_user(&state, &id, req, next).await.into_response())
}

async fn resolve_user(
    state: &AppState,
    id: &str,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_ref = UserRef::parse(id)
        .ok_or_else(|| AppError::bad_request(anyhow!("invalid user identifier")))?;

    let sub = req
        .extensions()
        .get::<Claims>()
        .map(|claims| claims.sub.clone())
        .ok_or_else(|| AppError::unauthorized("missing credentials"))?;

    let user = UserService::resolve(&state.db, &user_ref, &sub)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("user not found")))?;

    req.extensions_mut().insert(LoadedUser(user));
    Ok(next.run(req).await)
}
