use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::middleware::auth::require_auth;
use crate::middleware::lookup::load_service;
use crate::modules::services::controller::{
    add_service_permission, create_service, delete_service, get_service,
    list_service_permissions, list_services, regenerate_service_client, show_service_client,
    update_service,
};
use crate::state::AppState;

pub fn init_services_router(state: &AppState) -> Router<AppState> {
    let by_id = Router::new()
        .route(
            "/{id}",
            get(get_service).put(update_service).delete(delete_service),
        )
        .route("/{id}/show-client", get(show_service_client))
        .route("/{id}/regenerate-client", post(regenerate_service_client))
        .route("/{id}/permissions", get(list_service_permissions))
        .route("/{id}/permissions/add", post(add_service_permission))
        .route_layer(middleware::from_fn_with_state(state.clone(), load_service));

    Router::new()
        .route("/", get(list_services).post(create_service))
        .merge(by_id)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
