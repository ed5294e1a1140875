//! In-process stand-in for the hosted backend and the analysis gateway, served
//! over real HTTP on a loopback port.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::backend::BackendClient;
use crate::config::ClientConfig;

#[derive(Default)]
struct MockState {
    accounts: HashMap<String, (String, String)>,
    metadata: HashMap<String, Value>,
    confirm_email: bool,
    objects: HashMap<String, (String, Vec<u8>)>,
    scans: Vec<Value>,
    profiles: HashMap<String, Value>,
    analysis: Option<(u16, Value)>,
    analyzed_images: Vec<String>,
    fail_uploads: bool,
    fail_inserts: bool,
}

type Shared = Arc<Mutex<MockState>>;

pub(crate) struct MockBackend {
    pub base_url: String,
    state: Shared,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state: Shared = Arc::default();
        let app = Router::new()
            .route("/auth/v1/signup", post(signup))
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/logout", post(logout))
            .route("/auth/v1/user", get(current_user))
            .route("/storage/v1/object/{bucket}/{*key}", post(upload))
            .route(
                "/rest/v1/skin_scans",
                get(list_scans).post(insert_scan).delete(delete_scans),
            )
            .route("/rest/v1/profiles", get(get_profiles).patch(patch_profiles))
            .route("/functions/v1/analyze-skin", post(analyze))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(&self.base_url, "anon-key", None, None)
    }

    pub fn client(&self) -> BackendClient {
        BackendClient::new(&self.config()).unwrap()
    }

    pub fn add_account(&self, email: &str, password: &str, user_id: &str) {
        let mut s = self.state.lock().unwrap();
        s.accounts
            .insert(email.to_string(), (password.to_string(), user_id.to_string()));
        s.profiles.insert(
            user_id.to_string(),
            json!({"id": user_id, "full_name": null, "age": null, "is_adult": false}),
        );
    }

    pub fn require_email_confirmation(&self) {
        self.state.lock().unwrap().confirm_email = true;
    }

    pub fn user_metadata(&self, user_id: &str) -> Value {
        self.state
            .lock()
            .unwrap()
            .metadata
            .get(user_id)
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn object(&self, key: &str) -> Option<(String, Vec<u8>)> {
        self.state.lock().unwrap().objects.get(key).cloned()
    }

    pub fn object_keys(&self) -> Vec<String> {
        self.state.lock().unwrap().objects.keys().cloned().collect()
    }

    pub fn scans(&self) -> Vec<Value> {
        self.state.lock().unwrap().scans.clone()
    }

    pub fn push_scan(&self, row: Value) {
        self.state.lock().unwrap().scans.push(row);
    }

    pub fn profile(&self, user_id: &str) -> Option<Value> {
        self.state.lock().unwrap().profiles.get(user_id).cloned()
    }

    pub fn remove_profile(&self, user_id: &str) {
        self.state.lock().unwrap().profiles.remove(user_id);
    }

    pub fn set_analysis(&self, status: u16, body: Value) {
        self.state.lock().unwrap().analysis = Some((status, body));
    }

    pub fn analyzed_images(&self) -> Vec<String> {
        self.state.lock().unwrap().analyzed_images.clone()
    }

    pub fn fail_uploads(&self) {
        self.state.lock().unwrap().fail_uploads = true;
    }

    pub fn fail_inserts(&self) {
        self.state.lock().unwrap().fail_inserts = true;
    }
}

fn token_for(user_id: &str) -> String {
    format!("token-{user_id}")
}

fn session_json(user_id: &str, email: &str) -> Value {
    json!({
        "access_token": token_for(user_id),
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": format!("refresh-{user_id}"),
        "user": {"id": user_id, "email": email},
    })
}

fn respond(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn bearer_user(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer token-")
        .map(str::to_string)
}

fn eq_filter<'a>(query: &'a HashMap<String, String>, column: &str) -> Option<&'a str> {
    query.get(column)?.strip_prefix("eq.")
}

async fn signup(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut s = state.lock().unwrap();
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default().to_string();
    if s.accounts.contains_key(&email) {
        return respond(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({"code": 422, "msg": "User already registered"}),
        );
    }
    let user_id = format!("user-{}", s.accounts.len() + 1);
    s.accounts.insert(email.clone(), (password, user_id.clone()));
    s.metadata.insert(user_id.clone(), body["data"].clone());
    s.profiles.insert(
        user_id.clone(),
        json!({"id": user_id, "full_name": body["data"]["full_name"], "age": null, "is_adult": false}),
    );
    if s.confirm_email {
        Json(json!({"id": user_id, "email": email})).into_response()
    } else {
        Json(session_json(&user_id, &email)).into_response()
    }
}

async fn token(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    assert_eq!(query.get("grant_type").map(String::as_str), Some("password"));
    let s = state.lock().unwrap();
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    match s.accounts.get(email) {
        Some((pw, user_id)) if pw == password => Json(session_json(user_id, email)).into_response(),
        _ => respond(
            StatusCode::BAD_REQUEST,
            json!({"error": "invalid_grant", "error_description": "Invalid login credentials"}),
        ),
    }
}

async fn logout(headers: HeaderMap) -> Response {
    match bearer_user(&headers) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => respond(StatusCode::UNAUTHORIZED, json!({"msg": "invalid JWT"})),
    }
}

async fn current_user(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let Some(user_id) = bearer_user(&headers) else {
        return respond(StatusCode::UNAUTHORIZED, json!({"msg": "invalid JWT"}));
    };
    let s = state.lock().unwrap();
    let email = s
        .accounts
        .iter()
        .find(|(_, (_, id))| *id == user_id)
        .map(|(email, _)| email.clone());
    Json(json!({"id": user_id, "email": email})).into_response()
}

async fn upload(
    State(state): State<Shared>,
    Path((bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut s = state.lock().unwrap();
    if s.fail_uploads || bearer_user(&headers).is_none() {
        return respond(
            StatusCode::BAD_REQUEST,
            json!({"statusCode": "403", "error": "Unauthorized", "message": "new row violates row-level security policy"}),
        );
    }
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    s.objects.insert(key.clone(), (content_type, body.to_vec()));
    Json(json!({"Key": format!("{bucket}/{key}")})).into_response()
}

async fn list_scans(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let Some(caller) = bearer_user(&headers) else {
        return respond(StatusCode::UNAUTHORIZED, json!({"message": "JWT expired"}));
    };
    let s = state.lock().unwrap();
    let wanted = eq_filter(&query, "user_id").unwrap_or(caller.as_str());
    let mut rows: Vec<Value> = s
        .scans
        .iter()
        .filter(|r| r["user_id"] == wanted && r["user_id"] == caller.as_str())
        .cloned()
        .collect();
    if query.get("order").map(String::as_str) == Some("created_at.desc") {
        rows.sort_by(|a, b| {
            b["created_at"]
                .as_str()
                .unwrap_or_default()
                .cmp(a["created_at"].as_str().unwrap_or_default())
        });
    }
    Json(Value::Array(rows)).into_response()
}

async fn insert_scan(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(row): Json<Value>,
) -> Response {
    let mut s = state.lock().unwrap();
    if s.fail_inserts {
        return respond(
            StatusCode::CONFLICT,
            json!({"code": "23505", "message": "duplicate key value violates unique constraint"}),
        );
    }
    if bearer_user(&headers).as_deref() != row["user_id"].as_str() {
        return respond(
            StatusCode::FORBIDDEN,
            json!({"code": "42501", "message": "new row violates row-level security policy"}),
        );
    }
    assert_eq!(
        headers.get("prefer").and_then(|v| v.to_str().ok()),
        Some("return=representation")
    );
    s.scans.push(row.clone());
    Json(json!([row])).into_response()
}

async fn delete_scans(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let Some(caller) = bearer_user(&headers) else {
        return respond(StatusCode::UNAUTHORIZED, json!({"message": "JWT expired"}));
    };
    let mut s = state.lock().unwrap();
    let id = eq_filter(&query, "id").unwrap_or_default().to_string();
    let (removed, kept): (Vec<Value>, Vec<Value>) = s
        .scans
        .drain(..)
        .partition(|r| r["id"] == id.as_str() && r["user_id"] == caller.as_str());
    s.scans = kept;
    Json(Value::Array(removed)).into_response()
}

async fn get_profiles(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let s = state.lock().unwrap();
    let rows: Vec<Value> = eq_filter(&query, "id")
        .and_then(|id| s.profiles.get(id))
        .cloned()
        .into_iter()
        .collect();
    Json(Value::Array(rows)).into_response()
}

async fn patch_profiles(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(patch): Json<Value>,
) -> Response {
    let mut s = state.lock().unwrap();
    let id = eq_filter(&query, "id").unwrap_or_default().to_string();
    if bearer_user(&headers).as_deref() != Some(id.as_str()) {
        return Json(json!([])).into_response();
    }
    let Some(profile) = s.profiles.get_mut(&id) else {
        return Json(json!([])).into_response();
    };
    if let (Some(target), Some(fields)) = (profile.as_object_mut(), patch.as_object()) {
        for (k, v) in fields {
            target.insert(k.clone(), v.clone());
        }
    }
    Json(json!([profile.clone()])).into_response()
}

async fn analyze(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut s = state.lock().unwrap();
    s.analyzed_images
        .push(body["image"].as_str().unwrap_or_default().to_string());
    let (status, reply) = s.analysis.clone().unwrap_or_else(|| {
        (
            200,
            json!({
                "disease_name": "Acne",
                "confidence_score": 80,
                "severity": "mild",
                "symptoms": ["redness"],
                "recommendations": [],
                "food_recommendations": []
            }),
        )
    });
    respond(
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        reply,
    )
}
