use reqwest::Method;

use skinscan_common::model::{Profile, ProfileUpdate, ScanRecord};

use crate::backend::BackendClient;
use crate::error::BackendError;
use crate::session::Session;

const SCANS: &str = "skin_scans";
const PROFILES: &str = "profiles";

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

impl BackendClient {
    /// Insert a scan row and return it as stored.
    pub async fn insert_scan(
        &self,
        session: &Session,
        record: &ScanRecord,
    ) -> Result<ScanRecord, BackendError> {
        let url = self.url(&["rest", "v1", SCANS])?;
        let mut rows: Vec<ScanRecord> = Self::send_json(
            self.request(Method::POST, url, Some(session))
                .header("prefer", "return=representation")
                .json(record),
        )
        .await?;
        Ok(rows.pop().unwrap_or_else(|| record.clone()))
    }

    /// The session user's scans, newest first.
    pub async fn list_scans(&self, session: &Session) -> Result<Vec<ScanRecord>, BackendError> {
        let url = self.url(&["rest", "v1", SCANS])?;
        Self::send_json(self.request(Method::GET, url, Some(session)).query(&[
            ("select", "*".to_string()),
            ("user_id", eq(&session.user.id)),
            ("order", "created_at.desc".to_string()),
        ]))
        .await
    }

    /// Delete one of the session user's scans. Returns how many rows went away.
    pub async fn delete_scan(&self, session: &Session, id: &str) -> Result<usize, BackendError> {
        let url = self.url(&["rest", "v1", SCANS])?;
        let removed: Vec<serde_json::Value> = Self::send_json(
            self.request(Method::DELETE, url, Some(session))
                .header("prefer", "return=representation")
                .query(&[("id", eq(id)), ("user_id", eq(&session.user.id))]),
        )
        .await?;
        Ok(removed.len())
    }

    pub async fn get_profile(&self, session: &Session) -> Result<Option<Profile>, BackendError> {
        let url = self.url(&["rest", "v1", PROFILES])?;
        let mut rows: Vec<Profile> = Self::send_json(
            self.request(Method::GET, url, Some(session))
                .query(&[("select", "*".to_string()), ("id", eq(&session.user.id))]),
        )
        .await?;
        Ok(rows.pop())
    }

    /// Write the profile fields; `None` when no row matched the session user.
    pub async fn update_profile(
        &self,
        session: &Session,
        update: &ProfileUpdate,
    ) -> Result<Option<Profile>, BackendError> {
        let url = self.url(&["rest", "v1", PROFILES])?;
        let mut rows: Vec<Profile> = Self::send_json(
            self.request(Method::PATCH, url, Some(session))
                .header("prefer", "return=representation")
                .query(&[("id", eq(&session.user.id))])
                .json(update),
        )
        .await?;
        Ok(rows.pop())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use skinscan_common::model::{ProfileUpdate, ScanRecord, ScanResult};

    use crate::testing::MockBackend;

    fn record(id: &str, user_id: &str, secs: i64) -> ScanRecord {
        ScanRecord::new(
            id.to_string(),
            user_id,
            "https://img/x.jpg",
            ScanResult {
                disease_name: "Acne".to_string(),
                confidence_score: 80,
                severity: "mild".to_string(),
                symptoms: vec![],
                recommendations: vec![],
                food_recommendations: vec![],
            },
            Utc.timestamp_opt(secs, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_scans_insert_list_delete() {
        let mock = MockBackend::start().await;
        mock.add_account("ada@example.com", "pw", "u1");
        let backend = mock.client();
        let session = backend.sign_in("ada@example.com", "pw").await.unwrap();

        backend.insert_scan(&session, &record("a", "u1", 1_000)).await.unwrap();
        backend.insert_scan(&session, &record("b", "u1", 2_000)).await.unwrap();
        mock.push_scan(serde_json::to_value(record("other", "u2", 3_000)).unwrap());

        let listed = backend.list_scans(&session).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);

        assert_eq!(backend.delete_scan(&session, "a").await.unwrap(), 1);
        assert_eq!(backend.delete_scan(&session, "other").await.unwrap(), 0);
        assert_eq!(mock.scans().len(), 2);
    }

    #[tokio::test]
    async fn test_list_tolerates_null_array_columns() {
        let mock = MockBackend::start().await;
        mock.add_account("ada@example.com", "pw", "u1");
        let backend = mock.client();
        let session = backend.sign_in("ada@example.com", "pw").await.unwrap();

        mock.push_scan(json!({
            "id": "legacy",
            "user_id": "u1",
            "image_url": "https://img/x.jpg",
            "disease_name": "Psoriasis",
            "confidence_score": 70,
            "severity": "moderate",
            "symptoms": ["scaling"],
            "recommendations": null,
            "food_recommendations": null,
            "created_at": "2025-01-02T03:04:05Z",
        }));

        let listed = backend.list_scans(&session).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].result.symptoms, vec!["scaling"]);
        assert!(listed[0].result.recommendations.is_empty());
        assert!(listed[0].result.food_recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_insert_failure_surfaces_message() {
        let mock = MockBackend::start().await;
        mock.add_account("ada@example.com", "pw", "u1");
        mock.fail_inserts();
        let backend = mock.client();
        let session = backend.sign_in("ada@example.com", "pw").await.unwrap();

        let err = backend
            .insert_scan(&session, &record("a", "u1", 1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("duplicate key"));
    }

    #[tokio::test]
    async fn test_profile_round_trip() {
        let mock = MockBackend::start().await;
        mock.add_account("ada@example.com", "pw", "u1");
        let backend = mock.client();
        let session = backend.sign_in("ada@example.com", "pw").await.unwrap();

        let before = backend.get_profile(&session).await.unwrap().unwrap();
        assert!(!before.is_complete());

        let after = backend
            .update_profile(&session, &ProfileUpdate::new("Ada", 36))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.age, Some(36));
        assert!(after.is_adult);
        assert_eq!(mock.profile("u1").unwrap()["full_name"], json!("Ada"));
    }
}
