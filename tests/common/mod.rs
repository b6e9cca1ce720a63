//! Helpers shared by the integration tests
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::NamedTempFile;
use tower::ServiceExt;

use dynaqr::config::Config;
use dynaqr::model::{Role, User};
use dynaqr::route::create_app;
use dynaqr::state::AppState;
use dynaqr::store::{EmbeddedStore, RecordStore, Store};

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    _temp_db: NamedTempFile,
}

pub fn test_config() -> Config {
    Config {
        public_base_url: "https://tuqr.test".to_string(),
        session_secret: "integration-test-secret".to_string(),
        ..Config::default()
    }
}

/// Creates a test application backed by a temporary redb file
pub fn setup_test_app() -> TestApp {
    setup_test_app_with(test_config())
}

pub fn setup_test_app_with(config: Config) -> TestApp {
    setup_test_app_wrapping(config, |store| store)
}

/// Like [`setup_test_app_with`], with the temp redb store wrapped by `wrap`
pub fn setup_test_app_wrapping<S, F>(config: Config, wrap: F) -> TestApp
where
    S: RecordStore + 'static,
    F: FnOnce(EmbeddedStore) -> S,
{
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let store = EmbeddedStore::open(temp_db.path().to_str().unwrap())
        .expect("Failed to initialize test database");
    let state = AppState::new(config, Store::new(wrap(store)));

    TestApp {
        app: create_app(state.clone()),
        state,
        _temp_db: temp_db,
    }
}

impl TestApp {
    /// Stores a user directly; the password hash is a placeholder, so these
    /// users cannot log in and get their tokens from [`TestApp::token_for`]
    pub async fn seed_user(&self, id: u64, role: Role, qr_limit: u32) -> User {
        let user = User {
            id,
            email: format!("user{id}@example.com"),
            password_hash: "placeholder".to_string(),
            role,
            qr_limit,
            created_at: Utc::now(),
        };
        self.state.store.put(&user).await.expect("Failed to seed user");
        user
    }

    pub fn token_for(&self, user: &User) -> String {
        self.state.sessions.issue(user).expect("Failed to issue token").0
    }

    /// Seeds an admin and returns its token
    pub async fn admin_token(&self) -> String {
        let admin = self.seed_user(1, Role::Admin, 50).await;
        self.token_for(&admin)
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Creates a QR code through the API and returns its JSON
    pub async fn create_qr(&self, token: &str, body: Value) -> Value {
        let response = self.send("POST", "/api/qr", Some(token), Some(body)).await;
        assert_eq!(response.status(), 201, "QR creation failed");
        response_json(response.into_body()).await
    }

    pub async fn create_folder(&self, token: &str, name: &str) -> Value {
        let response = self
            .send(
                "POST",
                "/api/folders",
                Some(token),
                Some(serde_json::json!({ "name": name })),
            )
            .await;
        assert_eq!(response.status(), 201, "folder creation failed");
        response_json(response.into_body()).await
    }
}

/// Helper function to parse response body as JSON
pub async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

pub async fn response_text(body: Body) -> String {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}
