//! Keycloak REST client.
//!
//! Talks to the realm's OpenID Connect endpoints for token grants and JWKS,
//! and to the admin API (authenticated with a client-credentials token) to
//! look up, create and delete users. Every call is bounded by the configured
//! timeout; nothing is retried.
//!
//! Realm signing keys are cached for [`JWKS_TTL`] and refetched early when a
//! token names a `kid` the cache does not know.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{DecodingKey, Validation, decode, decode_header};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use spay_config::KeycloakConfig;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::claims::{Claims, Identity, NewIdentity, TokenPair};
use crate::error::IdpError;
use crate::identifier::LoginIdentifier;

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl From<TokenResponse> for TokenPair {
    fn from(token: TokenResponse) -> Self {
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token.unwrap_or_default(),
            expires_in: token.expires_in,
        }
    }
}

/// User representation of the admin API (subset).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, Vec<String>>,
}

#[derive(Serialize)]
struct CredentialRepresentation<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    value: &'a str,
    temporary: bool,
}

/// How long fetched realm keys are trusted.
pub const JWKS_TTL: Duration = Duration::from_secs(300);

/// Minimum gap between refetches caused by an unknown `kid`.
pub const JWKS_MIN_REFRESH: Duration = Duration::from_secs(10);

struct CachedJwks {
    keys: JwkSet,
    fetched_at: Instant,
}

enum KeyLookup {
    Hit(Jwk),
    Refetch,
    Unknown,
}

fn lookup_key(cache: Option<&CachedJwks>, kid: &str, now: Instant) -> KeyLookup {
    let Some(cache) = cache else {
        return KeyLookup::Refetch;
    };
    let age = now.saturating_duration_since(cache.fetched_at);
    if age >= JWKS_TTL {
        return KeyLookup::Refetch;
    }
    match cache.keys.find(kid) {
        Some(jwk) => KeyLookup::Hit(jwk.clone()),
        None if age >= JWKS_MIN_REFRESH => KeyLookup::Refetch,
        None => KeyLookup::Unknown,
    }
}

pub struct KeycloakClient {
    http: Client,
    config: KeycloakConfig,
    jwks: RwLock<Option<CachedJwks>>,
}

impl KeycloakClient {
    pub fn new(config: KeycloakConfig) -> Result<Self, IdpError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config,
            jwks: RwLock::new(None),
        })
    }

    fn realm_url(&self) -> String {
        format!("{}/realms/{}", self.config.host, self.config.realm)
    }

    fn admin_url(&self) -> String {
        format!("{}/admin/realms/{}", self.config.host, self.config.realm)
    }

    fn token_url(&self) -> String {
        format!("{}/protocol/openid-connect/token", self.realm_url())
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> Result<TokenResponse, IdpError> {
        let response = self.http.post(self.token_url()).form(params).send().await?;

        match response.status() {
            s if s.is_success() => Ok(response.json().await?),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                let body = response.text().await.unwrap_or_default();
                debug!(body = %body, "Keycloak token grant rejected");
                Err(IdpError::InvalidCredentials)
            }
            s => Err(IdpError::Unavailable(format!("token endpoint returned {}", s))),
        }
    }

    /// Service account token used for the admin API.
    async fn client_token(&self) -> Result<String, IdpError> {
        let token = self
            .request_token(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .await
            .map_err(|e| match e {
                IdpError::InvalidCredentials => {
                    IdpError::Unavailable("service account login rejected".to_string())
                }
                other => other,
            })?;
        Ok(token.access_token)
    }

    async fn password_grant(&self, username: &str, password: &str) -> Result<TokenPair, IdpError> {
        let token = self
            .request_token(&[
                ("grant_type", "password"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("username", username),
                ("password", password),
                ("scope", "openid"),
            ])
            .await?;
        Ok(token.into())
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, IdpError> {
        let response = self
            .http
            .get(format!("{}/protocol/openid-connect/certs", self.realm_url()))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(IdpError::Unavailable(format!(
                "certs endpoint returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    /// Realm key for `kid`, from the cache when it is fresh.
    async fn signing_key(&self, kid: &str) -> Result<Jwk, IdpError> {
        if let KeyLookup::Hit(jwk) = lookup_key(self.jwks.read().await.as_ref(), kid, Instant::now())
        {
            return Ok(jwk);
        }

        // Re-check under the write lock so concurrent misses fetch once.
        let mut cache = self.jwks.write().await;
        match lookup_key(cache.as_ref(), kid, Instant::now()) {
            KeyLookup::Hit(jwk) => return Ok(jwk),
            KeyLookup::Unknown => return Err(IdpError::InvalidToken),
            KeyLookup::Refetch => {}
        }

        let keys = self.fetch_jwks().await?;
        debug!(keys = keys.keys.len(), "Realm keys refreshed");
        let jwk = keys.find(kid).cloned();
        *cache = Some(CachedJwks {
            keys,
            fetched_at: Instant::now(),
        });
        jwk.ok_or(IdpError::InvalidToken)
    }

    /// Verifies an RS256 access token against the realm's published keys.
    #[instrument(skip(self, token))]
    pub async fn verify_token(&self, token: &str) -> Result<Claims, IdpError> {
        let header = decode_header(token).map_err(|_| IdpError::InvalidToken)?;
        let kid = header.kid.ok_or(IdpError::InvalidToken)?;

        let jwk = self.signing_key(&kid).await?;
        let key = DecodingKey::from_jwk(&jwk).map_err(|_| IdpError::InvalidToken)?;

        let mut validation = Validation::new(header.alg);
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<Claims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Keycloak token rejected");
                IdpError::InvalidToken
            })
    }

    async fn find_users(
        &self,
        admin_token: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<KeycloakUser>, IdpError> {
        let response = self
            .http
            .get(format!("{}/users", self.admin_url()))
            .bearer_auth(admin_token)
            .query(query)
            .query(&[("exact", "true")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IdpError::Unavailable(format!(
                "user search returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    async fn get_user(&self, admin_token: &str, id: &str) -> Result<KeycloakUser, IdpError> {
        let response = self
            .http
            .get(format!("{}/users/{}", self.admin_url(), id))
            .bearer_auth(admin_token)
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(response.json().await?),
            StatusCode::NOT_FOUND => Err(IdpError::UnknownUser),
            s => Err(IdpError::Unavailable(format!("user lookup returned {}", s))),
        }
    }

    /// Logs in with a phone number, an email or a Keycloak user id.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Identity, IdpError> {
        let identifier = LoginIdentifier::parse(username).ok_or(IdpError::UnknownUser)?;
        let admin_token = self.client_token().await?;

        let user = match identifier {
            LoginIdentifier::Phone(phone) => {
                let tokens = self.password_grant(&phone, password).await?;
                let user = self
                    .find_users(&admin_token, &[("username", phone.as_str())])
                    .await?
                    .into_iter()
                    .next()
                    .ok_or(IdpError::UnknownUser)?;
                let auth_id = user.id.ok_or(IdpError::UnknownUser)?;
                return Ok(Identity { auth_id, tokens });
            }
            LoginIdentifier::Email(email) => self
                .find_users(&admin_token, &[("email", email.as_str())])
                .await?
                .into_iter()
                .next()
                .ok_or(IdpError::UnknownUser)?,
            LoginIdentifier::AuthId(id) => self.get_user(&admin_token, &id.to_string()).await?,
        };

        let tokens = self.password_grant(&user.username, password).await?;
        let auth_id = user.id.ok_or(IdpError::UnknownUser)?;
        Ok(Identity { auth_id, tokens })
    }

    /// Creates the user, sets its password and logs it in.
    ///
    /// The Keycloak user is removed again if any step after creation fails.
    #[instrument(skip(self, identity))]
    pub async fn register(&self, identity: &NewIdentity) -> Result<Identity, IdpError> {
        let admin_token = self.client_token().await?;
        let username = identity.username();
        let email = identity
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty());

        if let Some(email) = email {
            if !self
                .find_users(&admin_token, &[("email", email)])
                .await?
                .is_empty()
            {
                return Err(IdpError::EmailTaken);
            }
        }

        if !self
            .find_users(&admin_token, &[("username", username.as_str())])
            .await?
            .is_empty()
        {
            return Err(IdpError::UsernameTaken);
        }

        let mut attributes = HashMap::new();
        attributes.insert(
            "prefix_phone_number".to_string(),
            vec![identity.phone_prefix.clone()],
        );
        attributes.insert("phone_number".to_string(), vec![identity.phone_number.clone()]);

        let new_user = KeycloakUser {
            id: None,
            username: username.clone(),
            email: email.map(str::to_string),
            first_name: Some(identity.first_name.clone()),
            last_name: Some(identity.last_name.clone()),
            enabled: true,
            attributes,
        };

        let response = self
            .http
            .post(format!("{}/users", self.admin_url()))
            .bearer_auth(&admin_token)
            .json(&new_user)
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED => {}
            StatusCode::CONFLICT => return Err(IdpError::IdentityExists),
            s => {
                error!(status = %s, "Keycloak user creation failed");
                return Err(IdpError::Unavailable(format!("user creation returned {}", s)));
            }
        }

        let location_id = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|loc| loc.rsplit('/').next())
            .map(str::to_string);

        let auth_id = match location_id {
            Some(id) => id,
            None => self
                .find_users(&admin_token, &[("username", username.as_str())])
                .await?
                .into_iter()
                .next()
                .and_then(|u| u.id)
                .ok_or_else(|| IdpError::Internal("created user not found".to_string()))?,
        };

        if let Err(e) = self.set_password(&admin_token, &auth_id, &identity.password).await {
            self.remove_user(&admin_token, &auth_id).await;
            return Err(e);
        }

        match self.password_grant(&username, &identity.password).await {
            Ok(tokens) => {
                info!(auth_id = %auth_id, "Keycloak user registered");
                Ok(Identity { auth_id, tokens })
            }
            Err(e) => {
                self.remove_user(&admin_token, &auth_id).await;
                Err(e)
            }
        }
    }

    async fn set_password(
        &self,
        admin_token: &str,
        auth_id: &str,
        password: &str,
    ) -> Result<(), IdpError> {
        let response = self
            .http
            .put(format!("{}/users/{}/reset-password", self.admin_url(), auth_id))
            .bearer_auth(admin_token)
            .json(&CredentialRepresentation {
                kind: "password",
                value: password,
                temporary: false,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IdpError::Unavailable(format!(
                "password reset returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Best-effort rollback of a half-created user.
    async fn remove_user(&self, admin_token: &str, auth_id: &str) {
        if let Err(e) = self.delete_user(admin_token, auth_id).await {
            warn!(auth_id = %auth_id, error = %e, "Failed to roll back Keycloak user");
        }
    }

    async fn delete_user(&self, admin_token: &str, auth_id: &str) -> Result<(), IdpError> {
        let response = self
            .http
            .delete(format!("{}/users/{}", self.admin_url(), auth_id))
            .bearer_auth(admin_token)
            .send()
            .await?;

        match response.status() {
            s if s.is_success() || s == StatusCode::NOT_FOUND => Ok(()),
            s => Err(IdpError::Unavailable(format!("user deletion returned {}", s))),
        }
    }

    #[instrument(skip(self))]
    pub async fn delete_identity(&self, auth_id: &str) -> Result<(), IdpError> {
        let admin_token = self.client_token().await?;
        self.delete_user(&admin_token, auth_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn client() -> KeycloakClient {
        KeycloakClient::new(KeycloakConfig {
            host: "https://auth.spay.africa".to_string(),
            realm: "spay".to_string(),
            client_id: "spay-api".to_string(),
            client_secret: "secret".to_string(),
            timeout: Duration::from_secs(10),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_urls() {
        let kc = client();
        assert_eq!(
            kc.token_url(),
            "https://auth.spay.africa/realms/spay/protocol/openid-connect/token"
        );
        assert_eq!(kc.admin_url(), "https://auth.spay.africa/admin/realms/spay");
    }

    #[test]
    fn test_user_representation_is_camel_case() {
        let user = KeycloakUser {
            username: "+2250700000000".to_string(),
            first_name: Some("Awa".to_string()),
            enabled: true,
            ..Default::default()
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["firstName"], "Awa");
        assert!(json.get("id").is_none());
    }

    #[tokio::test]
    async fn test_malformed_token_is_rejected_before_any_request() {
        let kc = client();
        assert!(matches!(
            kc.verify_token("not.a.jwt").await,
            Err(IdpError::InvalidToken)
        ));
    }

    fn cached(fetched_at: Instant) -> CachedJwks {
        let keys: JwkSet = serde_json::from_str(
            r#"{"keys":[{"kty":"RSA","kid":"realm-key","use":"sig","alg":"RS256","n":"sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1WlUzewbgBHod5pcM9H95GQRV3JDXboIRROSBigeC5yjU1hGzHHyXss8UDprecbAYxknTcQkhslANGRUZmdTOQ5qTRsLAt6BTYuyvVRdhS8exSZEy_c4gs_7svlJJQ4H9_NxsiIoLwAEk7-Q3UXERGYw_75IDrGA84-lA_-Ct4eTlXHBIY2EaV7t7LjJaynVJCpkv4LKjTTAumiGUIuQhrNhZLuF_RJLqHpM2kgWFLU7-VTdL1VbC2tejvcI2BlMkEpk1BzBZI0KQB0GaDWFLN-aEAw3vRw","e":"AQAB"}]}"#,
        )
        .unwrap();
        CachedJwks { keys, fetched_at }
    }

    #[test]
    fn test_fresh_cache_serves_known_kid() {
        let now = Instant::now();
        let cache = cached(now);
        let later = now + Duration::from_secs(60);
        assert!(matches!(
            lookup_key(Some(&cache), "realm-key", later),
            KeyLookup::Hit(jwk) if jwk.common.key_id.as_deref() == Some("realm-key")
        ));
    }

    #[test]
    fn test_empty_or_expired_cache_refetches() {
        let now = Instant::now();
        assert!(matches!(lookup_key(None, "realm-key", now), KeyLookup::Refetch));

        let cache = cached(now);
        assert!(matches!(
            lookup_key(Some(&cache), "realm-key", now + JWKS_TTL),
            KeyLookup::Refetch
        ));
    }

    #[test]
    fn test_unknown_kid_refetches_after_min_interval() {
        let now = Instant::now();
        let cache = cached(now);
        assert!(matches!(
            lookup_key(Some(&cache), "rotated-key", now + Duration::from_secs(1)),
            KeyLookup::Unknown
        ));
        assert!(matches!(
            lookup_key(Some(&cache), "rotated-key", now + JWKS_MIN_REFRESH),
            KeyLookup::Refetch
        ));
    }

    #[test]
    fn test_token_response_into_pair() {
        let json = r#"{"access_token":"a","expires_in":300,"token_type":"Bearer"}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        let pair: TokenPair = token.into();
        assert_eq!(pair.access_token, "a");
        assert!(pair.refresh_token.is_empty());
        assert_eq!(pair.expires_in, Some(300));
    }
}
