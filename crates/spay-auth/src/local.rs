//! Built-in identity provider backed by the `local_credentials` table.
//!
//! Used for development and tests, and for deployments without Keycloak.
//! Passwords are stored as bcrypt hashes; tokens are HS256 JWTs.

use spay_config::LocalIdpConfig;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::claims::{Claims, Identity, NewIdentity};
use crate::error::IdpError;
use crate::identifier::LoginIdentifier;
use crate::jwt::{issue_token_pair, verify_access_token};
use crate::password::{hash_password, verify_password};

#[derive(Clone)]
pub struct LocalIdp {
    db: PgPool,
    config: LocalIdpConfig,
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    auth_id: String,
    username: String,
    password_hash: String,
}

impl LocalIdp {
    pub fn new(db: PgPool, config: LocalIdpConfig) -> Self {
        Self { db, config }
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, IdpError> {
        verify_access_token(token, &self.config)
    }

    #[instrument(skip(self, password), fields(db.table = "local_credentials", db.operation = "SELECT"))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Identity, IdpError> {
        let identifier = LoginIdentifier::parse(username).ok_or(IdpError::UnknownUser)?;

        let row = match identifier {
            LoginIdentifier::Phone(phone) => {
                let bare = phone.trim_start_matches('+').to_string();
                sqlx::query_as::<_, CredentialRow>(
                    "SELECT auth_id, username, password_hash FROM local_credentials
                     WHERE username = $1 OR username = '+' || $1",
                )
                .bind(bare)
                .fetch_optional(&self.db)
                .await?
            }
            LoginIdentifier::Email(email) => {
                sqlx::query_as::<_, CredentialRow>(
                    "SELECT auth_id, username, password_hash FROM local_credentials
                     WHERE lower(email) = lower($1)",
                )
                .bind(email)
                .fetch_optional(&self.db)
                .await?
            }
            LoginIdentifier::AuthId(id) => {
                sqlx::query_as::<_, CredentialRow>(
                    "SELECT auth_id, username, password_hash FROM local_credentials
                     WHERE auth_id = $1",
                )
                .bind(id.to_string())
                .fetch_optional(&self.db)
                .await?
            }
        };

        let row = row.ok_or(IdpError::UnknownUser)?;

        if !verify_password(password, &row.password_hash)? {
            warn!(auth_id = %row.auth_id, "Local login rejected: wrong password");
            return Err(IdpError::InvalidCredentials);
        }

        debug!(auth_id = %row.auth_id, "Local login succeeded");
        Ok(Identity {
            tokens: issue_token_pair(&row.auth_id, &row.username, &self.config)?,
            auth_id: row.auth_id,
        })
    }

    #[instrument(skip(self, identity), fields(db.table = "local_credentials", db.operation = "INSERT"))]
    pub async fn register(&self, identity: &NewIdentity) -> Result<Identity, IdpError> {
        let username = identity.username();
        let email = identity
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty());

        if let Some(email) = email {
            let taken: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM local_credentials WHERE lower(email) = lower($1))",
            )
            .bind(email)
            .fetch_one(&self.db)
            .await?;
            if taken {
                return Err(IdpError::EmailTaken);
            }
        }

        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM local_credentials WHERE username = $1)")
                .bind(&username)
                .fetch_one(&self.db)
                .await?;
        if taken {
            return Err(IdpError::UsernameTaken);
        }

        let auth_id = Uuid::new_v4().to_string();
        let password_hash = hash_password(&identity.password)?;

        sqlx::query(
            "INSERT INTO local_credentials (auth_id, username, email, password_hash)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&auth_id)
        .bind(&username)
        .bind(email)
        .bind(password_hash)
        .execute(&self.db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                IdpError::IdentityExists
            }
            _ => IdpError::Database(e),
        })?;

        debug!(auth_id = %auth_id, "Local identity registered");
        Ok(Identity {
            tokens: issue_token_pair(&auth_id, &username, &self.config)?,
            auth_id,
        })
    }

    #[instrument(skip(self), fields(db.table = "local_credentials", db.operation = "DELETE"))]
    pub async fn delete_identity(&self, auth_id: &str) -> Result<(), IdpError> {
        sqlx::query("DELETE FROM local_credentials WHERE auth_id = $1")
            .bind(auth_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
