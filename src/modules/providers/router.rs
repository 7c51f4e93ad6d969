use axum::{Router, middleware, routing::get};

use crate::middleware::auth::require_auth;
use crate::modules::providers::controller::{create_provider, list_providers};
use crate::state::AppState;

pub fn init_providers_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_providers).post(create_provider))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
