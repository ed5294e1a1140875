/// HTTP plumbing shared by the identity, storage, and table clients.
///
/// The hosted backend exposes three REST surfaces under one project URL:
/// `/auth/v1` (identity), `/storage/v1` (objects), and `/rest/v1` (tables).
/// Every request carries the project key in `apikey`; requests made on behalf
/// of a user carry that user's access token as the bearer, otherwise the
/// project key stands in.
use reqwest::{Method, RequestBuilder, Url};
use serde::Deserialize;
use tracing::warn;

use crate::config::ClientConfig;
use crate::error::BackendError;
use crate::session::{Session, SessionEvents};

const MAX_ERROR_BODY_BYTES: usize = 4 * 1024;

#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    anon_key: String,
    pub(crate) http: reqwest::Client,
    pub(crate) events: SessionEvents,
}

impl BackendClient {
    pub fn new(config: &ClientConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .user_agent("skinscan-client")
            .build()?;
        Ok(Self {
            base_url: config.backend_url.clone(),
            anon_key: config.anon_key.clone(),
            http,
            events: SessionEvents::new(),
        })
    }

    pub fn events(&self) -> &SessionEvents {
        &self.events
    }

    pub(crate) fn anon_key(&self) -> &str {
        &self.anon_key
    }

    /// Join path segments onto the project URL, percent-encoding each one.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| BackendError::Url(format!("{e}")))?;
        url.path_segments_mut()
            .map_err(|_| BackendError::Url(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments.iter().flat_map(|s| s.split('/')));
        Ok(url)
    }

    pub(crate) fn request(
        &self,
        method: Method,
        url: Url,
        session: Option<&Session>,
    ) -> RequestBuilder {
        let bearer = session.map_or(self.anon_key.as_str(), |s| s.access_token.as_str());
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    pub(crate) async fn send_json<T: for<'de> Deserialize<'de>>(
        builder: RequestBuilder,
    ) -> Result<T, BackendError> {
        let resp = builder.send().await?;
        if !resp.status().is_success() {
            return Err(to_api_error(resp).await);
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub(crate) async fn send_empty(builder: RequestBuilder) -> Result<(), BackendError> {
        let resp = builder.send().await?;
        if !resp.status().is_success() {
            return Err(to_api_error(resp).await);
        }
        Ok(())
    }
}

/// The three surfaces word their errors differently; take the first message found.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<serde_json::Value>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.message
            .or(self.msg)
            .or(self.error_description)
            .or_else(|| match self.error {
                Some(serde_json::Value::String(s)) => Some(s),
                _ => None,
            })
    }
}

async fn to_api_error(resp: reqwest::Response) -> BackendError {
    let status = resp.status();
    let body = match resp.bytes().await {
        Ok(mut b) => {
            if b.len() > MAX_ERROR_BODY_BYTES {
                b.truncate(MAX_ERROR_BODY_BYTES);
            }
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read backend error body");
            String::new()
        }
    };
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("backend returned {status}")
            } else {
                body
            }
        });
    warn!(%status, message = %message, "backend request failed");
    BackendError::Api { status, message }
}
