use std::sync::Arc;

use spay_config::IdpConfig;
use sqlx::PgPool;

use crate::claims::{Claims, Identity, NewIdentity};
use crate::error::IdpError;
use crate::keycloak::KeycloakClient;
use crate::local::LocalIdp;

/// The identity provider the API delegates authentication to.
#[derive(Clone)]
pub enum IdentityProvider {
    Keycloak(Arc<KeycloakClient>),
    Local(LocalIdp),
}

impl IdentityProvider {
    pub fn from_config(config: &IdpConfig, db: PgPool) -> Result<Self, IdpError> {
        match config {
            IdpConfig::Keycloak(kc) => Ok(Self::Keycloak(Arc::new(KeycloakClient::new(kc.clone())?))),
            IdpConfig::Local(local) => Ok(Self::Local(LocalIdp::new(db, local.clone()))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Keycloak(_) => "keycloak",
            Self::Local(_) => "local",
        }
    }

    pub async fn verify_token(&self, token: &str) -> Result<Claims, IdpError> {
        match self {
            Self::Keycloak(kc) => kc.verify_token(token).await,
            Self::Local(local) => local.verify_token(token),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Identity, IdpError> {
        match self {
            Self::Keycloak(kc) => kc.login(username, password).await,
            Self::Local(local) => local.login(username, password).await,
        }
    }

    pub async fn register(&self, identity: &NewIdentity) -> Result<Identity, IdpError> {
        match self {
            Self::Keycloak(kc) => kc.register(identity).await,
            Self::Local(local) => local.register(identity).await,
        }
    }

    /// Removes an identity, used to roll back a registration whose local
    /// user row could not be written.
    pub async fn delete_identity(&self, auth_id: &str) -> Result<(), IdpError> {
        match self {
            Self::Keycloak(kc) => kc.delete_identity(auth_id).await,
            Self::Local(local) => local.delete_identity(auth_id).await,
        }
    }
}
