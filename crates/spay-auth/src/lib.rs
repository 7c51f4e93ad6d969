//! # SPAY Auth
//!
//! Authentication against an external identity provider.
//!
//! - [`claims`]: verified token claims and identity payloads
//! - [`provider`]: [`IdentityProvider`], the single entry point used by the API
//! - [`keycloak`]: Keycloak REST client (token grants, JWKS, admin API)
//! - [`local`]: built-in provider over the `local_credentials` table
//! - [`jwt`] and [`password`]: HS256 tokens and bcrypt hashing for the built-in provider
//!
//! # Example
//!
//! ```ignore
//! use spay_auth::IdentityProvider;
//! use spay_config::IdpConfig;
//!
//! let idp = IdentityProvider::from_config(&IdpConfig::from_env()?, pool.clone())?;
//! let claims = idp.verify_token(token).await?;
//! println!("subject: {}", claims.sub);
//! ```

pub mod claims;
pub mod error;
pub mod identifier;
pub mod jwt;
pub mod keycloak;
pub mod local;
pub mod password;
pub mod provider;

pub use claims::{Claims, Identity, NewIdentity, TokenPair};
pub use error::IdpError;
pub use identifier::LoginIdentifier;
pub use provider::IdentityProvider;
