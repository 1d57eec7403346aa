//! Error types for the relay.
//!
//! Request-time failures fall into two tiers: the upstream answered with a
//! non-200 status (mirrored back verbatim), or something failed locally
//! (reported as a 500). Configuration errors only happen at startup.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::translate::chat_types::ErrorBody;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RelayError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Upstream replied with something other than 200. `body` is the raw text.
    #[error("{body}")]
    Upstream { status: u16, body: String },

    #[error("Invalid request body: {message}")]
    InvalidRequest { message: String },

    #[error("Translation error: {message}")]
    Translation { message: String },

    #[error("HTTP error: {}", describe_http(.0))]
    Http(#[from] reqwest::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl RelayError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn upstream(status: u16, body: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            body: body.into(),
        }
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: msg.into(),
        }
    }

    pub fn translation(msg: impl Into<String>) -> Self {
        Self::Translation {
            message: msg.into(),
        }
    }

    /// Status code the caller sees for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::InvalidRequest { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text placed in the `detail` field of the error body.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Upstream { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            detail: self.detail(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;

/// reqwest's `Display` stops at the outermost layer ("error sending request");
/// the useful part (refused, timed out, DNS) lives in the source chain.
fn describe_http(err: &reqwest::Error) -> String {
    let mut parts = Vec::new();
    if err.is_timeout() {
        parts.push("upstream request timed out".to_string());
    }
    parts.push(err.to_string());
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let text = cause.to_string();
        if parts.last() != Some(&text) {
            parts.push(text);
        }
        source = cause.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_upstream_error_mirrors_status_and_body() {
        let resp = RelayError::upstream(429, "quota exceeded").into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = body_json(resp).await;
        assert_eq!(body, serde_json::json!({ "detail": "quota exceeded" }));
    }

    #[tokio::test]
    async fn test_local_error_is_500_with_description() {
        let resp = RelayError::translation("no candidates in upstream response").into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(
            body["detail"],
            "Translation error: no candidates in upstream response"
        );
    }

    #[test]
    fn test_invalid_request_is_422() {
        let err = RelayError::invalid_request("missing field `message`");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_bogus_upstream_status_falls_back_to_bad_gateway() {
        let err = RelayError::upstream(42, "");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }
}
