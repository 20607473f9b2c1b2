//! Shared harness for end-to-end tests: the real router over an in-memory
//! SQLite database, driven with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceExt;

use storefront::api::auth::hash_password;
use storefront::api::create_router;
use storefront::config::{AuthConfig, Config};
use storefront::db::UserRole;
use storefront::AppState;

pub const PASSWORD: &str = "secret123";

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

pub fn test_config() -> Config {
    Config {
        auth: AuthConfig {
            jwt_secret: "integration-test-secret".to_string(),
            ..AuthConfig::default()
        },
        ..Config::default()
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let db = storefront::db::init("sqlite::memory:", 1)
            .await
            .expect("in-memory database");
        let state = Arc::new(AppState::new(config, db));
        let router = create_router(state.clone());
        Self { router, state }
    }

    pub fn db(&self) -> &SqlitePool {
        &self.state.db
    }

    /// Insert a user directly, bypassing the admin API
    pub async fn insert_user(&self, username: &str, role: UserRole, status: bool) -> i64 {
        let hash = hash_password(PASSWORD).unwrap();
        sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, status, level_role, created_at, updated_at)
            VALUES (?, ?, ?, ?, '2026-01-01T00:00:00.000Z', '2026-01-01T00:00:00.000Z')
            "#,
        )
        .bind(username)
        .bind(hash)
        .bind(status)
        .bind(role.level())
        .execute(self.db())
        .await
        .unwrap()
        .last_insert_rowid()
    }

    pub async fn login(&self, username: &str, password: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await
    }

    pub async fn token_for(&self, username: &str) -> String {
        let response = self.login(username, PASSWORD).await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);
        response.data()["token"].as_str().unwrap().to_string()
    }

    /// Create a user with the given role and return `(id, token)`
    pub async fn user(&self, username: &str, role: UserRole) -> (i64, String) {
        let id = self.insert_user(username, role, true).await;
        let token = self.token_for(username).await;
        (id, token)
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        self.request_with_headers(method, path, token, body, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        TestResponse { status, body }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PUT, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, path, token, None).await
    }

    /// Create a website through the API and return its JSON
    pub async fn create_website(&self, token: &str, name: &str) -> Value {
        let response = self
            .post(
                "/api/websites",
                Some(token),
                json!({ "name": name, "url": "https://shop.example.com" }),
            )
            .await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "create website failed: {}",
            response.body
        );
        response.data().clone()
    }

    /// Create a product through the API and return its JSON
    pub async fn create_product(&self, token: &str, website_id: i64, name: &str) -> Value {
        let response = self
            .post(
                "/api/products",
                Some(token),
                json!({ "name": name, "websiteId": website_id, "price": 25000 }),
            )
            .await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "create product failed: {}",
            response.body
        );
        response.data().clone()
    }

    /// Insert an analytics event with a fixed timestamp
    pub async fn insert_event(
        &self,
        event_type: &str,
        website_id: i64,
        product_id: Option<i64>,
        visitor_ip: &str,
        created_at: &str,
    ) -> i64 {
        sqlx::query(
            r#"
            INSERT INTO analytics (event_type, website_id, product_id, visitor_ip, user_agent, referer, created_at, updated_at)
            VALUES (?, ?, ?, ?, 'test-agent', NULL, ?, ?)
            "#,
        )
        .bind(event_type)
        .bind(website_id)
        .bind(product_id)
        .bind(visitor_ip)
        .bind(created_at)
        .bind(created_at)
        .execute(self.db())
        .await
        .unwrap()
        .last_insert_rowid()
    }
}

pub fn id_of(value: &Value) -> i64 {
    value["id"].as_i64().expect("id field")
}
