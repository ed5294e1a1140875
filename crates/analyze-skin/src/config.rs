use skinscan_common::openai::OpenAiClientConfig;

use crate::error::GatewayError;
use crate::prompt::DEFAULT_MODEL;

/// Gateway configuration loaded explicitly from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Socket address to listen on, e.g. "0.0.0.0:8080".
    pub bind_addr: String,
    /// Model ID sent with every chat request.
    pub model: String,
    pub openai: OpenAiClientConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `AI_GATEWAY_API_KEY`: bearer key for the hosted model service
    ///
    /// Optional:
    /// - `AI_GATEWAY_BASE_URL`, `AI_TIMEOUT_SECS`, `AI_MAX_ERROR_BODY_BYTES`
    /// - `AI_MODEL`: model ID (default `google/gemini-2.5-flash`)
    /// - `GATEWAY_BIND`: listen address (default `0.0.0.0:8080`)
    pub fn from_env() -> Result<Self, GatewayError> {
        let openai = OpenAiClientConfig::from_env();
        if openai.api_key.is_none() {
            return Err(GatewayError::Config(
                "AI_GATEWAY_API_KEY environment variable is required".to_string(),
            ));
        }

        let model = std::env::var("AI_MODEL")
            .ok()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let bind_addr =
            std::env::var("GATEWAY_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        Ok(Self {
            bind_addr,
            model,
            openai,
        })
    }
}
