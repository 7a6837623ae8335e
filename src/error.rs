use serde_json::json;

/// Error type for everything the proxy can fail on outside the transforms.
///
/// Transform failures never produce one of these; malformed documents and
/// frames degrade to pass-through instead.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Request body too large (max {limit} bytes)")]
    PayloadTooLarge { limit: usize },
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl ProxyError {
    #[must_use]
    pub fn status(&self) -> http::StatusCode {
        match self {
            ProxyError::InvalidRequest(_) => http::StatusCode::BAD_REQUEST,
            ProxyError::PayloadTooLarge { .. } => http::StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::UpstreamUnavailable(_) => http::StatusCode::BAD_GATEWAY,
            ProxyError::Config(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ProxyError::InvalidRequest(_) | ProxyError::PayloadTooLarge { .. } => {
                "invalid_request_error"
            }
            ProxyError::UpstreamUnavailable(_) => "upstream_error",
            ProxyError::Config(_) => "server_error",
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ProxyError::Config(_) => "config_error",
            ProxyError::InvalidRequest(_) => "invalid_request",
            ProxyError::PayloadTooLarge { .. } => "payload_too_large",
            ProxyError::UpstreamUnavailable(_) => "upstream_unavailable",
        }
    }
}

/// OpenAI-shaped error payload, which is what chat clients of this proxy parse.
#[must_use]
pub fn error_payload(err: &ProxyError) -> serde_json::Value {
    json!({
        "error": {
            "message": err.to_string(),
            "type": err.error_type(),
            "code": err.error_code(),
        }
    })
}

impl axum::response::IntoResponse for ProxyError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), axum::Json(error_payload(&self))).into_response()
    }
}
