//! Uniform response envelope.
//!
//! Every response body, success or failure, has the shape
//!
//! ```json
//! {
//!   "url_path": "/api/shops",
//!   "status": 200,
//!   "message": "",
//!   "is_error": false,
//!   "data": { ... },
//!   "request_date": "2024-01-01T00:00:00Z",
//!   "time_elapsed": "1.2ms"
//! }
//! ```
//!
//! Handlers return [`ApiResponse`]; errors render through
//! [`AppError`](crate::AppError). Both produce a complete body on their own and
//! also stash an [`EnvelopeParts`] in the response extensions, so the HTTP
//! layer can re-render the envelope with the real request path and latency.

use std::time::Duration;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Serialized response body.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub url_path: String,
    pub status: u16,
    pub message: String,
    pub is_error: bool,
    pub data: T,
    pub request_date: DateTime<Utc>,
    pub time_elapsed: String,
}

/// Everything needed to render an [`Envelope`] once request metadata is known.
#[derive(Debug, Clone)]
pub struct EnvelopeParts {
    pub status: StatusCode,
    pub message: String,
    pub is_error: bool,
    pub data: serde_json::Value,
}

impl EnvelopeParts {
    pub fn render(&self, url_path: &str, elapsed: Duration) -> Response {
        let body = Envelope {
            url_path: url_path.to_string(),
            status: self.status.as_u16(),
            message: self.message.clone(),
            is_error: self.is_error,
            data: self.data.clone(),
            request_date: Utc::now(),
            time_elapsed: format!("{:?}", elapsed),
        };

        let mut response = (self.status, Json(body)).into_response();
        response.extensions_mut().insert(self.clone());
        response
    }
}

impl IntoResponse for EnvelopeParts {
    fn into_response(self) -> Response {
        self.render("", Duration::ZERO)
    }
}

/// Successful handler output wrapped in the envelope.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub status: StatusCode,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            message: String::new(),
            data,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            message: String::new(),
            data,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match serde_json::to_value(&self.data) {
            Ok(data) => EnvelopeParts {
                status: self.status,
                message: self.message,
                is_error: false,
                data,
            }
            .into_response(),
            Err(e) => crate::AppError::internal(e).into_response(),
        }
    }
}
