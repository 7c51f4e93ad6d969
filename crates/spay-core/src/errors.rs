//! Application error type shared by every layer of the API.
//!
//! An [`AppError`] carries the HTTP status it maps to, the underlying
//! [`anyhow::Error`] and an optional list of [`ErrorDetail`] entries. Field-level
//! validation failures are collected into `details` (one entry per failing rule)
//! instead of being short-circuited on the first one.
//!
//! | Constructor        | Status | Meaning                                   |
//! |--------------------|--------|-------------------------------------------|
//! | `unauthorized`     | 401    | missing, malformed, invalid token         |
//! | `forbidden`        | 403    | authenticated but not allowed             |
//! | `not_found`        | 404    | lookup miss                               |
//! | `conflict`         | 409    | unique constraint violation               |
//! | `validation`       | 422    | one or more field rules failed            |
//! | `bad_request`      | 400    | malformed body or query                   |
//! | `upstream`         | 502    | identity provider failed or timed out     |
//! | `internal`         | 500    | anything else                             |

use anyhow::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::response::EnvelopeParts;

/// Message rendered in place of server-side error details.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// One entry of the `data` array of an error envelope.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ErrorDetail {
    /// HTTP status code of the failure, as a string
    pub code: String,
    /// Human readable message, or the snake_case field name for validation errors
    pub message: String,
    /// Extra data; the violated rule tag for validation errors
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: Error,
    pub details: Vec<ErrorDetail>,
}

impl AppError {
    pub fn new<E>(status: StatusCode, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self {
            status,
            error: err.into(),
            details: Vec::new(),
        }
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    pub fn not_found<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::NOT_FOUND, err)
    }

    pub fn bad_request<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::BAD_REQUEST, err)
    }

    pub fn unprocessable<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, err)
    }

    pub fn conflict<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::CONFLICT, err)
    }

    pub fn upstream<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::BAD_GATEWAY, err)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, anyhow::anyhow!(message.into()))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, anyhow::anyhow!(message.into()))
    }

    /// Builds a 422 carrying one detail per failing field rule.
    ///
    /// Details are sorted by field name so responses are stable.
    pub fn validation(errors: &ValidationErrors) -> Self {
        let mut details: Vec<ErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| ErrorDetail {
                    code: StatusCode::UNPROCESSABLE_ENTITY.as_u16().to_string(),
                    message: field.to_string(),
                    data: serde_json::Value::String(err.code.to_string()),
                })
            })
            .collect();
        details.sort_by(|a, b| a.message.cmp(&b.message));

        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            error: anyhow::anyhow!("invalid form"),
            details,
        }
    }

    pub fn with_details(mut self, details: Vec<ErrorDetail>) -> Self {
        self.details = details;
        self
    }

    /// Message exposed to clients. Server-side failures never leak their cause.
    pub fn public_message(&self) -> String {
        if self.status.is_server_error() {
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            self.error.to_string()
        }
    }

    pub fn envelope_parts(&self) -> EnvelopeParts {
        let message = self.public_message();
        let details = if self.details.is_empty() {
            vec![ErrorDetail {
                code: self.status.as_u16().to_string(),
                message: message.clone(),
                data: serde_json::Value::Null,
            }]
        } else {
            self.details.clone()
        };

        EnvelopeParts {
            status: self.status,
            message,
            is_error: true,
            data: serde_json::to_value(details).unwrap_or(serde_json::Value::Null),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.error, self.status)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status.as_u16(), error = ?self.error, "Request failed");
        }

        self.envelope_parts().into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        AppError::internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Form {
        #[validate(length(min = 4, max = 18))]
        password: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn test_status_per_constructor() {
        assert_eq!(AppError::unauthorized("x").status, StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden("x").status, StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::not_found(anyhow::anyhow!("x")).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::conflict(anyhow::anyhow!("x")).status,
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::upstream(anyhow::anyhow!("x")).status,
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_validation_collects_every_field() {
        let form = Form {
            password: "abc".to_string(),
            email: "not-an-email".to_string(),
        };
        let errors = form.validate().unwrap_err();
        let err = AppError::validation(&errors);

        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.details.len(), 2);
        assert_eq!(err.details[0].message, "email");
        assert_eq!(err.details[0].data, serde_json::json!("email"));
        assert_eq!(err.details[1].message, "password");
        assert_eq!(err.details[1].data, serde_json::json!("length"));
    }

    #[test]
    fn test_internal_errors_are_not_leaked() {
        let err = AppError::internal(anyhow::anyhow!("connection refused on 10.0.0.3"));
        assert_eq!(err.public_message(), INTERNAL_ERROR_MESSAGE);

        let parts = err.envelope_parts();
        assert!(parts.is_error);
        assert_eq!(parts.message, INTERNAL_ERROR_MESSAGE);
    }

    #[test]
    fn test_domain_message_is_kept() {
        let err = AppError::conflict(anyhow::anyhow!("shop already exists"));
        let parts = err.envelope_parts();
        assert_eq!(parts.message, "shop already exists");
        assert_eq!(parts.data[0]["code"], "409");
    }
}
