use crate::error::ClientError;

pub const DEFAULT_BUCKET: &str = "skin-scans";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Project URL of the hosted backend, e.g. "https://abc.supabase.co".
    pub backend_url: String,
    /// Public project key sent as `apikey` on every backend call.
    pub anon_key: String,
    /// Full URL of the analysis gateway.
    pub analyze_url: String,
    /// Object storage bucket holding uploaded images.
    pub bucket: String,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Required: `SKINSCAN_BACKEND_URL`, `SKINSCAN_ANON_KEY`.
    /// Optional: `SKINSCAN_ANALYZE_URL` (defaults to the backend's
    /// `functions/v1/analyze-skin`), `SKINSCAN_BUCKET` (defaults to `skin-scans`).
    pub fn from_env() -> Result<Self, ClientError> {
        let backend_url = required("SKINSCAN_BACKEND_URL")?;
        let anon_key = required("SKINSCAN_ANON_KEY")?;
        let analyze_url = std::env::var("SKINSCAN_ANALYZE_URL").ok();
        let bucket = std::env::var("SKINSCAN_BUCKET").ok();
        Ok(Self::new(&backend_url, &anon_key, analyze_url, bucket))
    }

    pub fn new(
        backend_url: &str,
        anon_key: &str,
        analyze_url: Option<String>,
        bucket: Option<String>,
    ) -> Self {
        let backend_url = backend_url.trim_end_matches('/').to_string();
        let analyze_url = analyze_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| format!("{backend_url}/functions/v1/analyze-skin"));
        let bucket = bucket
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BUCKET.to_string());
        Self {
            backend_url,
            anon_key: anon_key.to_string(),
            analyze_url,
            bucket,
        }
    }
}

fn required(key: &str) -> Result<String, ClientError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ClientError::Config(format!("{key} environment variable is required")))
}
