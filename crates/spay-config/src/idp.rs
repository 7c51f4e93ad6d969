//! Identity provider configuration.
//!
//! # Environment Variables
//!
//! | Variable                   | Default  | Used by  |
//! |----------------------------|----------|----------|
//! | `IDP_MODE`                 | `local`  | both     |
//! | `IDP_TIMEOUT_SECS`         | `10`     | keycloak |
//! | `KEYCLOAK_HOST`            | required | keycloak |
//! | `KEYCLOAK_REALM`           | required | keycloak |
//! | `KEYCLOAK_CLIENT_ID`       | required | keycloak |
//! | `KEYCLOAK_CLIENT_SECRET`   | required | keycloak |
//! | `LOCAL_JWT_SECRET`         | dev key  | local    |
//! | `LOCAL_JWT_ACCESS_EXPIRY`  | `3600`   | local    |
//! | `LOCAL_JWT_REFRESH_EXPIRY` | `604800` | local    |

use std::time::Duration;

use crate::{ConfigError, parse_or, process_env};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdpMode {
    Local,
    Keycloak,
}

#[derive(Clone, Debug)]
pub struct KeycloakConfig {
    pub host: String,
    pub realm: String,
    pub client_id: String,
    pub client_secret: String,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct LocalIdpConfig {
    pub secret: String,
    pub access_token_expiry: i64,
    pub refresh_token_expiry: i64,
}

#[derive(Clone, Debug)]
pub enum IdpConfig {
    Local(LocalIdpConfig),
    Keycloak(KeycloakConfig),
}

impl IdpConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(process_env)
    }

    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = match lookup("IDP_MODE").map(|m| m.trim().to_lowercase()) {
            None => IdpMode::Local,
            Some(m) if m.is_empty() || m == "local" => IdpMode::Local,
            Some(m) if m == "keycloak" => IdpMode::Keycloak,
            Some(m) => {
                return Err(ConfigError::Invalid {
                    name: "IDP_MODE",
                    value: m,
                });
            }
        };

        match mode {
            IdpMode::Local => Ok(Self::Local(LocalIdpConfig {
                secret: lookup("LOCAL_JWT_SECRET")
                    .unwrap_or_else(|| "spay-local-secret-change-in-production".to_string()),
                access_token_expiry: parse_or(&lookup, "LOCAL_JWT_ACCESS_EXPIRY", 3600),
                refresh_token_expiry: parse_or(&lookup, "LOCAL_JWT_REFRESH_EXPIRY", 604800),
            })),
            IdpMode::Keycloak => {
                let required = |name: &'static str| {
                    lookup(name)
                        .filter(|v| !v.trim().is_empty())
                        .ok_or(ConfigError::Missing(name))
                };

                Ok(Self::Keycloak(KeycloakConfig {
                    host: required("KEYCLOAK_HOST")?.trim_end_matches('/').to_string(),
                    realm: required("KEYCLOAK_REALM")?,
                    client_id: required("KEYCLOAK_CLIENT_ID")?,
                    client_secret: required("KEYCLOAK_CLIENT_SECRET")?,
                    timeout: Duration::from_secs(parse_or(&lookup, "IDP_TIMEOUT_SECS", 10)),
                }))
            }
        }
    }

    pub fn mode(&self) -> IdpMode {
        match self {
            Self::Local(_) => IdpMode::Local,
            Self::Keycloak(_) => IdpMode::Keycloak,
        }
    }
}
