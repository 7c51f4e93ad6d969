use axum::{Router, middleware, routing::get};

use crate::middleware::auth::require_auth;
use crate::middleware::lookup::load_transaction;
use crate::modules::transactions::controller::{
    create_transaction, get_transaction, list_transactions,
};
use crate::state::AppState;

pub fn init_transactions_router(state: &AppState) -> Router<AppState> {
    let by_id = Router::new()
        .route("/{id}", get(get_transaction))
        .route_layer(middleware::from_fn_with_state(state.clone(), load_transaction));

    Router::new()
        .route("/", get(list_transactions).post(create_transaction))
        .merge(by_id)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
