use anyhow::anyhow;
use axum::http::{HeaderValue, Method};
use axum::{Router, middleware, routing::get};
use spay_core::AppError;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

use crate::docs::ApiDoc;
use crate::logging::logging_middleware;
use crate::middleware::envelope::envelope_middleware;
use crate::modules::health::health_check;
use crate::modules::providers::router::init_providers_router;
use crate::modules::services::router::init_services_router;
use crate::modules::shops::router::init_shops_router;
use crate::modules::transactions::router::init_transactions_router;
use crate::modules::users::router::init_users_router;
use crate::state::AppState;

async fn route_not_found() -> AppError {
    AppError::not_found(anyhow!("route not found"))
}

pub fn init_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/users", init_users_router(&state))
        .nest("/shops", init_shops_router(&state))
        .nest("/services", init_services_router(&state))
        .nest("/transactions", init_transactions_router(&state))
        .nest("/providers", init_providers_router(&state));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .route("/health", get(health_check))
        .nest("/api", api)
        .fallback(route_not_found)
        .with_state(state.clone())
        .layer(middleware::from_fn(envelope_middleware))
        .layer({
            let allowed_origins: Vec<HeaderValue> = state
                .cors_config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::ACCEPT,
                ])
                .allow_credentials(true)
        })
        .layer(middleware::from_fn(logging_middleware))
}
