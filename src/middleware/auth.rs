use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use spay_auth::{Claims, IdpError};
use spay_core::AppError;
use spay_models::User;

use crate::modules::users::service::UserService;
use crate::state::AppState;

/// Extracts the token of an `Authorization: Bearer <token>` header value.
///
/// The value is split on the literal `Bearer`; anything but exactly two
/// segments, or an empty token, is rejected.
pub fn bearer_token(header_value: &str) -> Result<&str, AppError> {
    let segments: Vec<&str> = header_value.split("Bearer").collect();
    if segments.len() != 2 {
        return Err(AppError::unauthorized("malformed authorization header"));
    }

    let token = segments[1].trim();
    if token.is_empty() {
        return Err(AppError::unauthorized("empty bearer token"));
    }
    Ok(token)
}

/// Verifies the bearer token with the identity provider and attaches its
/// [`Claims`] to the request.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("missing authorization header"))?;

    let token = bearer_token(header_value)?;

    let claims = state.idp.verify_token(token).await.map_err(|e| {
        tracing::debug!(error = %e, "Token verification failed");
        match e {
            IdpError::Unavailable(_) | IdpError::Http(_) => e.into_app_error(),
            _ => AppError::unauthorized("invalid or expired token"),
        }
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Verified claims of the caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AppError::unauthorized("missing credentials"))
    }
}

/// The caller's local user with both permission sets loaded.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;

        UserService::find_by_auth_id(&state.db, &claims.sub)
            .await?
            .map(CurrentUser)
            .ok_or_else(|| AppError::unauthorized("user not recognized"))
    }
}
