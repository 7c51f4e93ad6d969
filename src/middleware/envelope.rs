//! Finalizes the response envelope once request metadata is known.

use std::time::Instant;

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use spay_core::{AppError, EnvelopeParts};

/// Message shown in place of any server-side failure under a resource route.
pub const GENERIC_ERROR_MESSAGE: &str = "an error occurred";

/// Re-renders enveloped responses with the request path and elapsed time.
///
/// Responses without [`EnvelopeParts`] (docs, health) pass through untouched.
pub async fn envelope_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let url_path = req.uri().path().to_string();

    let response = next.run(req).await;

    let Some(parts) = response.extensions().get::<EnvelopeParts>().cloned() else {
        return response;
    };

    let mut rendered = parts.render(&url_path, start.elapsed());
    for (name, value) in response.headers() {
        if name != header::CONTENT_LENGTH && name != header::CONTENT_TYPE {
            rendered.headers_mut().insert(name.clone(), value.clone());
        }
    }
    rendered
}

/// Replaces the message of a server-side error response, keeping its status.
pub fn mask_server_error(response: Response) -> Response {
    if !response.status().is_server_error() {
        return response;
    }

    let Some(parts) = response.extensions().get::<EnvelopeParts>() else {
        return response;
    };

    let mut masked = AppError::new(parts.status, anyhow::anyhow!(GENERIC_ERROR_MESSAGE))
        .envelope_parts();
    // 5xx envelopes carry the generic internal message by default
    masked.message = GENERIC_ERROR_MESSAGE.to_string();
    if let Some(first) = masked.data.get_mut(0) {
        first["message"] = serde_json::Value::String(GENERIC_ERROR_MESSAGE.to_string());
    }
    masked.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_mask_keeps_status_and_replaces_message() {
        let response = AppError::internal(anyhow::anyhow!("pool timed out")).into_response();
        let masked = mask_server_error(response);

        assert_eq!(masked.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let parts = masked.extensions().get::<EnvelopeParts>().unwrap();
        assert_eq!(parts.message, GENERIC_ERROR_MESSAGE);
        assert_eq!(parts.data[0]["message"], GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_client_errors_pass_through() {
        let response = AppError::forbidden("not allowed").into_response();
        let masked = mask_server_error(response);

        let parts = masked.extensions().get::<EnvelopeParts>().unwrap();
        assert_eq!(parts.message, "not allowed");
    }
}
