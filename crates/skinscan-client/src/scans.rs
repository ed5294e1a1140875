//! One analysis end to end (upload, analyze, persist) and the history built from it.
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use skinscan_common::ids::{epoch_millis, new_record_id};
use skinscan_common::model::ScanRecord;

use crate::analysis::AnalysisClient;
use crate::backend::BackendClient;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::image_file::ImageFile;
use crate::session::Session;

#[derive(Clone)]
pub struct ScanService {
    backend: Arc<BackendClient>,
    analyzer: AnalysisClient,
    bucket: String,
}

impl ScanService {
    pub fn new(backend: Arc<BackendClient>, config: &ClientConfig) -> Self {
        let analyzer =
            AnalysisClient::new(&config.analyze_url, backend.anon_key(), backend.http.clone());
        Self {
            backend,
            analyzer,
            bucket: config.bucket.clone(),
        }
    }

    /// Upload the image, have it assessed, and save the result to history.
    ///
    /// Stops at the first failing step. An image that was uploaded before a
    /// later step failed is left in storage.
    #[instrument(skip_all, fields(user_id = %session.user.id, file = %image.name))]
    pub async fn analyze(
        &self,
        session: &Session,
        image: &ImageFile,
    ) -> Result<ScanRecord, ClientError> {
        let key = object_key(&session.user.id, epoch_millis(), &image.name);
        self.backend
            .upload_object(
                session,
                &self.bucket,
                &key,
                &image.content_type,
                image.bytes.clone(),
            )
            .await?;
        let image_url = self.backend.public_url(&self.bucket, &key)?;

        let result = self.analyzer.analyze(session, &image.to_data_url()).await?;

        let record = ScanRecord::new(
            new_record_id(),
            &session.user.id,
            &image_url,
            result,
            Utc::now(),
        );
        let stored = self.backend.insert_scan(session, &record).await?;
        info!(
            scan_id = %stored.id,
            severity = ?stored.result.severity_level(),
            "scan saved"
        );
        Ok(stored)
    }

    /// The user's scans, newest first.
    pub async fn history(&self, session: &Session) -> Result<Vec<ScanRecord>, ClientError> {
        Ok(self.backend.list_scans(session).await?)
    }

    pub async fn delete(&self, session: &Session, id: &str) -> Result<(), ClientError> {
        match self.backend.delete_scan(session, id).await? {
            0 => Err(ClientError::ScanNotFound(id.to_string())),
            _ => {
                info!(scan_id = id, "scan deleted");
                Ok(())
            }
        }
    }
}

fn object_key(user_id: &str, millis: u128, file_name: &str) -> String {
    format!("{user_id}/{millis}-{file_name}")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::analysis::AnalysisError;
    use crate::error::BackendError;
    use crate::testing::MockBackend;

    async fn setup(mock: &MockBackend) -> (ScanService, Session) {
        mock.add_account("ada@example.com", "pw", "u1");
        let backend = Arc::new(mock.client());
        let session = backend.sign_in("ada@example.com", "pw").await.unwrap();
        (ScanService::new(backend, &mock.config()), session)
    }

    fn photo() -> ImageFile {
        ImageFile::new("arm.png".into(), "image/png".into(), vec![0, 0, 0]).unwrap()
    }

    #[test]
    fn test_object_key_layout() {
        assert_eq!(object_key("u1", 1700, "a b.jpg"), "u1/1700-a b.jpg");
    }

    #[tokio::test]
    async fn test_analyze_uploads_analyzes_and_persists() {
        let mock = MockBackend::start().await;
        let (service, session) = setup(&mock).await;

        let record = service.analyze(&session, &photo()).await.unwrap();

        let keys = mock.object_keys();
        assert_eq!(keys.len(), 1);
        let key = &keys[0];
        assert!(key.starts_with("u1/"));
        assert!(key.ends_with("-arm.png"));
        let (content_type, bytes) = mock.object(key).unwrap();
        assert_eq!(content_type, "image/png");
        assert_eq!(bytes, vec![0, 0, 0]);

        assert_eq!(mock.analyzed_images(), vec!["data:image/png;base64,AAAA"]);

        assert_eq!(record.user_id, "u1");
        assert_eq!(record.id.len(), 32);
        assert_eq!(
            record.image_url,
            format!("{}/storage/v1/object/public/skin-scans/{key}", mock.base_url)
        );
        assert_eq!(record.result.disease_name, "Acne");
        assert_eq!(record.result.symptoms, vec!["redness"]);

        let rows = mock.scans();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["disease_name"], json!("Acne"));
        assert_eq!(rows[0]["confidence_score"], json!(80));
        assert_eq!(rows[0]["food_recommendations"], json!([]));
    }

    #[tokio::test]
    async fn test_upload_failure_stops_before_analysis() {
        let mock = MockBackend::start().await;
        let (service, session) = setup(&mock).await;
        mock.fail_uploads();

        let err = service.analyze(&session, &photo()).await.unwrap_err();
        assert!(matches!(err, ClientError::Backend(BackendError::Api { .. })));
        assert!(mock.analyzed_images().is_empty());
        assert!(mock.scans().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limited_analysis_saves_nothing() {
        let mock = MockBackend::start().await;
        let (service, session) = setup(&mock).await;
        mock.set_analysis(
            429,
            json!({"error": "Rate limit exceeded. Please try again later."}),
        );

        let err = service.analyze(&session, &photo()).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Analysis(AnalysisError::RateLimited(_))
        ));
        assert_eq!(mock.object_keys().len(), 1);
        assert!(mock.scans().is_empty());
    }

    #[tokio::test]
    async fn test_insert_failure_is_reported() {
        let mock = MockBackend::start().await;
        let (service, session) = setup(&mock).await;
        mock.fail_inserts();

        let err = service.analyze(&session, &photo()).await.unwrap_err();
        assert!(matches!(err, ClientError::Backend(_)));
        assert_eq!(mock.analyzed_images().len(), 1);
    }

    #[tokio::test]
    async fn test_history_and_delete() {
        let mock = MockBackend::start().await;
        let (service, session) = setup(&mock).await;

        let first = service.analyze(&session, &photo()).await.unwrap();
        let second = service.analyze(&session, &photo()).await.unwrap();

        let history = service.history(&session).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].created_at >= history[1].created_at);

        service.delete(&session, &first.id).await.unwrap();
        let history = service.history(&session).await.unwrap();
        let ids: Vec<&str> = history.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str()]);

        let err = service.delete(&session, &first.id).await.unwrap_err();
        assert!(matches!(err, ClientError::ScanNotFound(id) if id == first.id));
    }
}
