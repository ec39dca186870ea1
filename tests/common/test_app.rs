//! Test application setup utilities
//!
//! Each [`TestApp`] runs against its own temporary SQLite file with the view
//! cache disabled, so tests never share state.

use axum::{body::Body, http::Request, Router};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use helpdesk::{
    build_router,
    config::{
        AppConfig, AuthConfig, BootstrapAdminConfig, CacheConfig, DatabaseConfig, LoggingConfig,
        SecurityConfig, ServerConfig,
    },
    db, AppState,
};

use super::fixtures::{ADMIN_EMAIL, ADMIN_PASSWORD, DEFAULT_PASSWORD};

/// Test application wrapper for integration testing
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Create a new test application with a fresh database
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Create a new test application with custom configuration
    pub async fn with_config(config: AppConfig) -> Self {
        let db = db::init_pool(&config.database)
            .await
            .expect("Failed to initialize test database");

        let state = AppState::new(config, db).expect("Failed to create application state");
        let router = build_router(state.clone());

        Self { router, state }
    }

    /// Provision the bootstrap administrator and log in as it
    pub async fn admin_token(&self) -> String {
        let admin = BootstrapAdminConfig {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
            first_name: "System".to_string(),
            last_name: "Administrator".to_string(),
        };
        self.state
            .employees()
            .ensure_admin(&admin)
            .await
            .expect("Failed to provision administrator");

        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Log in and return the access token
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post_json(
                "/api/v1/auth/login",
                json!({ "email": email, "password": password }),
            )
            .await;
        response.assert_ok();
        response.json::<Value>()["accessToken"]
            .as_str()
            .expect("login response carries an access token")
            .to_string()
    }

    /// Create an employee through the admin API; returns its id
    pub async fn create_employee(
        &self,
        admin_token: &str,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> i64 {
        let response = self
            .post_json_auth(
                "/api/v1/employees",
                json!({
                    "firstName": first_name,
                    "lastName": last_name,
                    "email": email,
                    "password": DEFAULT_PASSWORD,
                }),
                admin_token,
            )
            .await;
        response.assert_created();
        response.json::<Value>()["id"]
            .as_i64()
            .expect("employee response carries an id")
    }

    /// Create an employee and log in as them; returns (id, token)
    pub async fn employee_session(
        &self,
        admin_token: &str,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> (i64, String) {
        let id = self
            .create_employee(admin_token, first_name, last_name, email)
            .await;
        let token = self.login(email, DEFAULT_PASSWORD).await;
        (id, token)
    }

    /// File a ticket as the token's principal; returns its id
    pub async fn create_ticket(&self, token: &str, title: &str, body: &str) -> i64 {
        let response = self
            .post_json_auth(
                "/api/v1/tickets",
                json!({ "title": title, "body": body }),
                token,
            )
            .await;
        response.assert_created();
        response.json::<Value>()["id"]
            .as_i64()
            .expect("ticket response carries an id")
    }

    /// Make a GET request to the test application
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Self::builder("GET", uri).body(Body::empty()).unwrap())
            .await
    }

    /// Make a POST request with JSON body
    pub async fn post_json(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Self::json_request("POST", uri, body)).await
    }

    pub async fn get_auth(&self, uri: &str, token: &str) -> TestResponse {
        self.request_with_auth(Self::builder("GET", uri).body(Body::empty()).unwrap(), token)
            .await
    }

    pub async fn post_json_auth(&self, uri: &str, body: Value, token: &str) -> TestResponse {
        self.request_with_auth(Self::json_request("POST", uri, body), token)
            .await
    }

    pub async fn put_json_auth(&self, uri: &str, body: Value, token: &str) -> TestResponse {
        self.request_with_auth(Self::json_request("PUT", uri, body), token)
            .await
    }

    pub async fn delete_auth(&self, uri: &str, token: &str) -> TestResponse {
        self.request_with_auth(
            Self::builder("DELETE", uri).body(Body::empty()).unwrap(),
            token,
        )
        .await
    }

    fn builder(method: &str, uri: &str) -> axum::http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Self::builder(method, uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// Make a request with authentication
    pub async fn request_with_auth(&self, request: Request<Body>, token: &str) -> TestResponse {
        let (mut parts, body) = request.into_parts();
        parts.headers.insert(
            "Authorization",
            format!("Bearer {}", token).parse().unwrap(),
        );
        self.request(Request::from_parts(parts, body)).await
    }

    /// Make an arbitrary request
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");

        TestResponse { status, body }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: axum::http::StatusCode,
    pub body: bytes::Bytes,
}

impl TestResponse {
    /// Get the response body as a string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Parse the response body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse response as JSON")
    }

    /// Assert the response status
    pub fn assert_status(&self, expected: axum::http::StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    pub fn assert_ok(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::OK)
    }

    pub fn assert_created(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::CREATED)
    }

    pub fn assert_no_content(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::NO_CONTENT)
    }

    pub fn assert_bad_request(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::BAD_REQUEST)
    }

    pub fn assert_unauthorized(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::UNAUTHORIZED)
    }

    pub fn assert_forbidden(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::FORBIDDEN)
    }

    pub fn assert_not_found(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::NOT_FOUND)
    }

    pub fn assert_conflict(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::CONFLICT)
    }

    /// The `error` identifier of an error body
    pub fn error_type(&self) -> String {
        self.json::<Value>()["error"]
            .as_str()
            .unwrap_or_default()
            .to_string()
    }
}

/// Create a test configuration with a temporary SQLite database
pub fn test_config() -> AppConfig {
    // Use a unique temp file for each test to avoid conflicts
    let db_path = std::env::temp_dir().join(format!(
        "helpdesk_test_{}.db",
        Uuid::new_v4().to_string().replace('-', "")
    ));

    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            workers: 1,
        },
        database: DatabaseConfig {
            url: format!("sqlite://{}?mode=rwc", db_path.display()),
            max_connections: 1,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        },
        auth: AuthConfig {
            jwt_secret: "test_secret_key_that_is_at_least_32_bytes_long".to_string(),
            token_expiry_hours: 24,
            refresh_token_expiry_days: 7,
            allow_registration: true,
        },
        logging: LoggingConfig::default(),
        cache: CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        },
        security: SecurityConfig {
            field_encryption_key: "test_field_key_that_is_at_least_32_bytes_long".to_string(),
        },
        bootstrap_admin: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_app_creation() {
        let app = TestApp::new().await;
        assert!(!app.state.cache.is_enabled());
    }

    #[tokio::test]
    async fn test_response_json_parsing() {
        let app = TestApp::new().await;
        let response = app.get("/api/v1/health").await;
        let json: Value = response.json();
        assert!(json.get("status").is_some());
    }
}
