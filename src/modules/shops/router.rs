use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::middleware::auth::require_auth;
use crate::middleware::lookup::load_shop;
use crate::modules::shops::controller::{
    add_shop_permission, create_shop, delete_shop, get_shop, list_shop_permissions, list_shops,
    regenerate_shop_client, show_shop_client, update_shop,
};
use crate::state::AppState;

pub fn init_shops_router(state: &AppState) -> Router<AppState> {
    let by_id = Router::new()
        .route("/{id}", get(get_shop).put(update_shop).delete(delete_shop))
        .route("/{id}/show-client", get(show_shop_client))
        .route("/{id}/regenerate-client", post(regenerate_shop_client))
        .route("/{id}/permissions", get(list_shop_permissions))
        .route("/{id}/permissions/add", post(add_shop_permission))
        .route_layer(middleware::from_fn_with_state(state.clone(), load_shop));

    Router::new()
        .route("/", get(list_shops).post(create_shop))
        .merge(by_id)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
