//! # SPAY Config
//!
//! Configuration structures loaded from environment variables:
//!
//! - [`server`]: bind address and log directory
//! - [`database`]: PostgreSQL connection settings
//! - [`cors`]: CORS (Cross-Origin Resource Sharing) configuration
//! - [`idp`]: identity provider selection and credentials
//! - [`authz`]: authorization policy switches
//!
//! Every struct exposes `from_env()`. The `from_source` variants take a lookup
//! closure instead of reading the process environment, which keeps tests free
//! of global state.
//!
//! # Example
//!
//! ```ignore
//! use spay_config::{CorsConfig, DatabaseConfig, IdpConfig, ServerConfig};
//!
//! let server = ServerConfig::from_env();
//! let database = DatabaseConfig::from_env()?;
//! let idp = IdpConfig::from_env()?;
//! ```

pub mod authz;
pub mod cors;
pub mod database;
pub mod idp;
pub mod server;

pub use authz::AuthorizationConfig;
pub use cors::CorsConfig;
pub use database::DatabaseConfig;
pub use idp::{IdpConfig, IdpMode, KeycloakConfig, LocalIdpConfig};
pub use server::ServerConfig;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Reads `name` and parses it, falling back to `default` when unset or unparseable.
pub(crate) fn parse_or<T, F>(lookup: &F, name: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

pub(crate) fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[cfg(test)]
pub(crate) fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let owned: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name: &str| {
        owned
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }
}
