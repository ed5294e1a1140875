use reqwest::Method;
use tracing::info;

use crate::backend::BackendClient;
use crate::error::BackendError;
use crate::session::Session;

impl BackendClient {
    /// Store `bytes` at `key` in `bucket`. Existing objects are never overwritten.
    pub async fn upload_object(
        &self,
        session: &Session,
        bucket: &str,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), BackendError> {
        let url = self.url(&["storage", "v1", "object", bucket, key])?;
        let size = bytes.len();
        Self::send_empty(
            self.request(Method::POST, url, Some(session))
                .header("content-type", content_type)
                .header("x-upsert", "false")
                .body(bytes),
        )
        .await?;
        info!(bucket, key, size, "image uploaded");
        Ok(())
    }

    /// Public URL of an object; no request is made.
    pub fn public_url(&self, bucket: &str, key: &str) -> Result<String, BackendError> {
        Ok(self
            .url(&["storage", "v1", "object", "public", bucket, key])?
            .to_string())
    }
}
