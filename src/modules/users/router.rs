use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::middleware::auth::require_auth;
use crate::middleware::lookup::load_user;
use crate::modules::users::controller::{
    change_role, delete_user, get_user, list_users, login, register, update_user,
};
use crate::state::AppState;

pub fn init_users_router(state: &AppState) -> Router<AppState> {
    let authenticated = Router::new()
        .route("/", get(list_users))
        .route("/change-role", post(change_role))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let by_id = Router::new()
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), load_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/", post(register))
        .route("/login", post(login))
        .merge(authenticated)
        .merge(by_id)
}
