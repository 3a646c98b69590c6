//! Shared fixtures for the integration tests.
//!
//! Every test builds the full router over a fresh in-memory store, so tests
//! are independent and need no database.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use serde_json::Value;
use uuid::Uuid;

use app_template_api::app::create_app;
use app_template_api::config::{
    Config, DatabaseConfig, EmailConfig, LoggingConfig, SecurityConfig, ServerConfig, TokenConfig,
};
use domain::models::User;
use domain::services::RecordingEmailProvider;
use persistence::MemoryStore;
use shared::password::hash_password;

pub const PUBLIC_BASE_URL: &str = "https://app.example.com";
pub const TEST_PASSWORD: &str = "SecureP@ss123!";

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            public_base_url: PUBLIC_BASE_URL.to_string(),
        },
        database: DatabaseConfig {
            url: "memory://".to_string(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 10,
            idle_timeout_secs: 600,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            cors_origins: vec![],
            rate_limit_per_minute: 0, // Disable rate limiting for tests
            trust_forwarded_headers: false,
            hsts_enabled: false,
        },
        email: EmailConfig::default(),
        tokens: TokenConfig {
            max_issue_attempts: 16,
        },
    }
}

/// Router plus handles on its collaborators.
pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
    pub emails: Arc<RecordingEmailProvider>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_store(config, MemoryStore::seeded())
    }

    pub fn with_provider(config: Config, provider: RecordingEmailProvider) -> Self {
        Self::build(config, MemoryStore::seeded(), provider)
    }

    pub fn with_store(config: Config, store: MemoryStore) -> Self {
        Self::build(config, store, RecordingEmailProvider::new())
    }

    fn build(config: Config, store: MemoryStore, provider: RecordingEmailProvider) -> Self {
        let emails = Arc::new(provider);
        let router = create_app(config, Arc::new(store.clone()), emails.clone());
        Self {
            router,
            store,
            emails,
        }
    }

    /// Sends one request through a clone of the router.
    pub async fn send(&self, request: Request<Body>) -> Response {
        use tower::ServiceExt;

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// An active user with [`TEST_PASSWORD`] and generated name and address.
pub fn test_user() -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        email_address: SafeEmail().fake(),
        display_name: Name().fake(),
        password_hash: Some(hash_password(TEST_PASSWORD).expect("hashing succeeds")),
        is_active: true,
        email_verified: false,
        created_at: now,
        updated_at: now,
        last_login_at: None,
    }
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("valid request")
}

pub async fn parse_response_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}
