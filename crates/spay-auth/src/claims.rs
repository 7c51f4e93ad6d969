//! Verified bearer-token claims.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claim set of a verified access token.
///
/// `sub` is the identity provider's user id and matches `users.auth_id`.
/// Provider specific claims (`preferred_username`, `email`, `typ`, realm
/// roles...) are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// Subject: identity provider user id
    pub sub: String,
    /// Expiration timestamp (Unix seconds)
    pub exp: i64,
    /// Issued-at timestamp (Unix seconds)
    #[serde(default)]
    pub iat: i64,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Claims {
    pub fn claim_str(&self, name: &str) -> Option<&str> {
        self.extra.get(name).and_then(|v| v.as_str())
    }

    /// Token type as reported by the issuer (`Bearer` for access tokens).
    pub fn token_type(&self) -> Option<&str> {
        self.claim_str("typ")
    }
}

/// Access and refresh tokens returned by login and registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: Option<i64>,
}

/// An authenticated identity: the provider subject and its fresh tokens.
#[derive(Debug, Clone)]
pub struct Identity {
    pub auth_id: String,
    pub tokens: TokenPair,
}

/// Data needed to create an identity at the provider.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub first_name: String,
    pub last_name: String,
    pub phone_prefix: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub password: String,
}

impl NewIdentity {
    /// Login name registered at the provider: `+{prefix}{number}`.
    pub fn username(&self) -> String {
        format!(
            "+{}{}",
            self.phone_prefix.trim_start_matches('+'),
            self.phone_number
        )
    }
}
