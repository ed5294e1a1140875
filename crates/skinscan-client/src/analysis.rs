use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use skinscan_common::model::ScanResult;

use crate::session::Session;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("{0}")]
    RateLimited(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    Failed(String),

    #[error("analysis request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Client for the analysis gateway's `POST { image }` contract.
#[derive(Clone)]
pub struct AnalysisClient {
    url: String,
    anon_key: String,
    http: reqwest::Client,
}

impl AnalysisClient {
    pub fn new(url: &str, anon_key: &str, http: reqwest::Client) -> Self {
        Self {
            url: url.to_string(),
            anon_key: anon_key.to_string(),
            http,
        }
    }

    /// Submit one image (a data URL or bare base64) and wait for the assessment.
    pub async fn analyze(
        &self,
        session: &Session,
        image: &str,
    ) -> Result<ScanResult, AnalysisError> {
        let resp = self
            .http
            .post(&self.url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .json(&json!({ "image": image }))
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            let result: ScanResult = resp.json().await?;
            info!(
                disease = %result.disease_name,
                confidence = result.confidence_score,
                "analysis received"
            );
            return Ok(result);
        }

        let message = resp
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| format!("analysis failed with status {status}"));
        warn!(%status, message = %message, "analysis rejected");

        Err(match status {
            StatusCode::TOO_MANY_REQUESTS => AnalysisError::RateLimited(message),
            StatusCode::PAYMENT_REQUIRED => AnalysisError::ServiceUnavailable(message),
            _ => AnalysisError::Failed(message),
        })
    }
}
