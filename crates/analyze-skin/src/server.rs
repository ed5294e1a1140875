use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, Method,
    },
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use skinscan_common::model::ScanResult;
use skinscan_common::openai::OpenAiClient;

use crate::error::GatewayError;
use crate::prompt;
use crate::reply::{parse_model_reply, strip_data_url_prefix};

/// Shared, read-only handler state. Invocations never mutate it.
#[derive(Clone)]
pub struct AnalyzeState {
    openai: Arc<OpenAiClient>,
    model: Arc<str>,
}

impl AnalyzeState {
    pub fn new(openai: Arc<OpenAiClient>, model: &str) -> Self {
        Self {
            openai,
            model: Arc::from(model),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Base64 image, optionally prefixed with `data:image/<fmt>;base64,`.
    pub image: String,
}

pub fn router(state: AnalyzeState) -> Router {
    Router::new()
        .route("/", post(analyze_skin))
        .route("/analyze-skin", post(analyze_skin))
        .layer(cors())
        .with_state(state)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            CONTENT_TYPE,
        ])
}

async fn analyze_skin(
    State(state): State<AnalyzeState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<ScanResult>, GatewayError> {
    let Json(request) = payload.map_err(|e| {
        warn!(error = %e, "rejected analyze request body");
        GatewayError::InvalidRequest(e.body_text())
    })?;

    let image = strip_data_url_prefix(&request.image);
    let chat = prompt::build_request(&state.model, image);

    let response = state.openai.chat_completions(&chat).await.map_err(|e| {
        error!(error = %e, status = ?e.status(), "model request failed");
        GatewayError::from(e)
    })?;

    let content = response.first_content().ok_or(GatewayError::EmptyReply)?;

    let result = parse_model_reply(content).inspect_err(|e| {
        warn!(error = %e, detail = ?e, content, "model reply rejected");
    })?;

    info!(
        disease = %result.disease_name,
        confidence = result.confidence_score,
        severity = %result.severity,
        "analysis complete"
    );
    Ok(Json(result))
}
