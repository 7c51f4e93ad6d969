//! Request middleware and extractors.
//!
//! - [`auth`]: bearer-token gate, [`AuthUser`](auth::AuthUser) and
//!   [`CurrentUser`](auth::CurrentUser)
//! - [`lookup`]: `{id}` resolution into typed extensions
//! - [`envelope`]: response envelope finalization
//!
//! Protected routes are layered as `require_auth` then, for `{id}` routes, the
//! matching loader:
//!
//! ```ignore
//! Router::new()
//!     .route("/{id}", get(get_shop))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), load_shop))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
//! ```

pub mod auth;
pub mod envelope;
pub mod lookup;
