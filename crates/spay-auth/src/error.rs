//! Identity provider failures.

use spay_core::AppError;

#[derive(Debug, thiserror::Error)]
pub enum IdpError {
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("user does not exist")]
    UnknownUser,
    #[error("email already used by another user")]
    EmailTaken,
    #[error("phone number already used by another user")]
    UsernameTaken,
    #[error("user already exists")]
    IdentityExists,
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
    #[error("identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("credential store error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Internal(String),
}

impl IdpError {
    /// Maps the failure onto the API error taxonomy.
    pub fn into_app_error(self) -> AppError {
        match self {
            Self::InvalidToken | Self::InvalidCredentials | Self::UnknownUser => {
                AppError::unauthorized(self.to_string())
            }
            Self::EmailTaken | Self::UsernameTaken | Self::IdentityExists => {
                AppError::conflict(self)
            }
            Self::Unavailable(_) | Self::Http(_) => AppError::upstream(self),
            Self::Database(_) | Self::Internal(_) => AppError::internal(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(IdpError::InvalidToken.into_app_error().status.as_u16(), 401);
        assert_eq!(IdpError::InvalidCredentials.into_app_error().status.as_u16(), 401);
        assert_eq!(IdpError::IdentityExists.into_app_error().status.as_u16(), 409);
        assert_eq!(
            IdpError::Unavailable("timeout".into()).into_app_error().status.as_u16(),
            502
        );
        assert_eq!(
            IdpError::Internal("boom".into()).into_app_error().status.as_u16(),
            500
        );
    }

    #[test]
    fn test_conflict_message_is_public() {
        let err = IdpError::EmailTaken.into_app_error();
        assert_eq!(err.public_message(), "email already used by another user");
    }
}
