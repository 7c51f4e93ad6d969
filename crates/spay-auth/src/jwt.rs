//! HS256 tokens issued by the built-in identity provider.
//!
//! Access tokens carry `typ = "Bearer"`, refresh tokens `typ = "Refresh"`,
//! mirroring what Keycloak puts in its own tokens. Only access tokens are
//! accepted by [`verify_access_token`].

use std::collections::HashMap;

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde_json::Value;
use spay_config::LocalIdpConfig;
use uuid::Uuid;

use crate::claims::{Claims, TokenPair};
use crate::error::IdpError;

pub const ACCESS_TOKEN_TYPE: &str = "Bearer";
pub const REFRESH_TOKEN_TYPE: &str = "Refresh";

fn create_token(
    auth_id: &str,
    username: &str,
    token_type: &str,
    lifetime: i64,
    config: &LocalIdpConfig,
) -> Result<String, IdpError> {
    let now = Utc::now().timestamp();

    let mut extra = HashMap::new();
    extra.insert("typ".to_string(), Value::String(token_type.to_string()));
    extra.insert(
        "preferred_username".to_string(),
        Value::String(username.to_string()),
    );
    extra.insert("jti".to_string(), Value::String(Uuid::new_v4().to_string()));

    let claims = Claims {
        sub: auth_id.to_string(),
        exp: now + lifetime,
        iat: now,
        extra,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| IdpError::Internal(format!("Failed to create token: {}", e)))
}

/// Issues a fresh access/refresh pair for `auth_id`.
pub fn issue_token_pair(
    auth_id: &str,
    username: &str,
    config: &LocalIdpConfig,
) -> Result<TokenPair, IdpError> {
    Ok(TokenPair {
        access_token: create_token(
            auth_id,
            username,
            ACCESS_TOKEN_TYPE,
            config.access_token_expiry,
            config,
        )?,
        refresh_token: create_token(
            auth_id,
            username,
            REFRESH_TOKEN_TYPE,
            config.refresh_token_expiry,
            config,
        )?,
        expires_in: Some(config.access_token_expiry),
    })
}

pub fn verify_access_token(token: &str, config: &LocalIdpConfig) -> Result<Claims, IdpError> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| IdpError::InvalidToken)?;

    if claims.token_type() != Some(ACCESS_TOKEN_TYPE) {
        return Err(IdpError::InvalidToken);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_config() -> LocalIdpConfig {
        LocalIdpConfig {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let config = get_test_config();
        let pair = issue_token_pair("auth-1", "+2250700000000", &config).unwrap();

        let claims = verify_access_token(&pair.access_token, &config).unwrap();
        assert_eq!(claims.sub, "auth-1");
        assert_eq!(claims.claim_str("preferred_username"), Some("+2250700000000"));
        assert_eq!(pair.expires_in, Some(3600));
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let config = get_test_config();
        let pair = issue_token_pair("auth-1", "user", &config).unwrap();
        assert!(matches!(
            verify_access_token(&pair.refresh_token, &config),
            Err(IdpError::InvalidToken)
        ));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let config = get_test_config();
        let pair = issue_token_pair("auth-1", "user", &config).unwrap();

        let other = LocalIdpConfig {
            secret: "another-secret-key-at-least-32-characters".to_string(),
            ..config
        };
        assert!(verify_access_token(&pair.access_token, &other).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let config = LocalIdpConfig {
            access_token_expiry: -3600,
            ..get_test_config()
        };
        let pair = issue_token_pair("auth-1", "user", &config).unwrap();
        assert!(verify_access_token(&pair.access_token, &config).is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(verify_access_token("not-a-token", &get_test_config()).is_err());
    }
}
