use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use skinscan_common::openai::OpenAiClientError;

use crate::reply::ReplyError;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Service unavailable. Please contact support.")]
    ServiceUnavailable,

    #[error("AI Gateway error: {0}")]
    Upstream(u16),

    #[error("AI Gateway request failed: {0}")]
    Transport(#[source] OpenAiClientError),

    #[error("No content in AI response")]
    EmptyReply,

    #[error(transparent)]
    Reply(#[from] ReplyError),
}

impl From<OpenAiClientError> for GatewayError {
    fn from(err: OpenAiClientError) -> Self {
        match err.status().map(|s| s.as_u16()) {
            Some(429) => GatewayError::RateLimited,
            Some(402) => GatewayError::ServiceUnavailable,
            Some(status) => GatewayError::Upstream(status),
            None => GatewayError::Transport(err),
        }
    }
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::ServiceUnavailable => StatusCode::PAYMENT_REQUIRED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
