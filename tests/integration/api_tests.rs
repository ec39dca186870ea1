//! Health and authentication API tests

use serde_json::{json, Value};

use crate::common::{TestApp, ADMIN_EMAIL, ADMIN_PASSWORD, DEFAULT_PASSWORD};

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let app = TestApp::new().await;
    let response = app.get("/api/v1/health").await;

    response.assert_ok();

    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_detailed_health_endpoint() {
    let app = TestApp::new().await;
    let response = app.get("/api/v1/health/detailed").await;

    response.assert_ok();

    let json: Value = response.json();
    assert_eq!(json["components"]["database"]["status"], "healthy");
    assert_eq!(json["components"]["cache"]["status"], "disabled");
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = TestApp::new().await;

    let response = app.get("/api/v1/tickets").await;
    response.assert_unauthorized();

    let response = app.get_auth("/api/v1/tickets", "not-a-jwt").await;
    response.assert_unauthorized();
}

#[tokio::test]
async fn test_login_with_wrong_password_is_unauthorized() {
    let app = TestApp::new().await;
    app.admin_token().await;

    let response = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": ADMIN_EMAIL, "password": "wrong" }),
        )
        .await;
    response.assert_unauthorized();
    assert_eq!(response.error_type(), "unauthorized");
}

#[tokio::test]
async fn test_login_returns_tokens_and_employee() {
    let app = TestApp::new().await;
    app.admin_token().await;

    let response = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        )
        .await;
    response.assert_ok();

    let json: Value = response.json();
    assert_eq!(json["tokenType"], "Bearer");
    assert_eq!(json["expiresIn"], 24 * 3600);
    assert!(json["refreshToken"].as_str().is_some());
    assert_eq!(json["employee"]["email"], ADMIN_EMAIL);
    assert!(json["employee"].get("password").is_none());
    assert!(json["employee"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_me_reports_capabilities() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (_, employee) = app
        .employee_session(&admin, "Ana", "Cruz", "ana@x.com")
        .await;

    let json: Value = app.get_auth("/api/v1/auth/me", &admin).await.json();
    assert_eq!(json["email"], ADMIN_EMAIL);
    assert_eq!(json["capabilities"], json!(["ADMIN", "EMPLOYEE"]));

    let json: Value = app.get_auth("/api/v1/auth/me", &employee).await.json();
    assert_eq!(json["email"], "ana@x.com");
    assert_eq!(json["capabilities"], json!(["EMPLOYEE"]));
}

#[tokio::test]
async fn test_refresh_issues_new_access_token() {
    let app = TestApp::new().await;
    app.admin_token().await;

    let login: Value = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        )
        .await
        .json();

    let response = app
        .post_json(
            "/api/v1/auth/refresh",
            json!({ "refreshToken": login["refreshToken"] }),
        )
        .await;
    response.assert_ok();
    let access = response.json::<Value>()["accessToken"]
        .as_str()
        .unwrap()
        .to_string();

    app.get_auth("/api/v1/auth/me", &access).await.assert_ok();
}

#[tokio::test]
async fn test_access_token_cannot_be_used_to_refresh() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let response = app
        .post_json("/api/v1/auth/refresh", json!({ "refreshToken": admin }))
        .await;
    response.assert_unauthorized();
}

#[tokio::test]
async fn test_register_creates_employee_stamped_by_itself() {
    let app = TestApp::new().await;

    let response = app
        .post_json(
            "/api/v1/auth/register",
            json!({
                "firstName": "Ben",
                "lastName": "Ortiz",
                "email": "Ben@X.com",
                "password": DEFAULT_PASSWORD,
            }),
        )
        .await;
    response.assert_created();

    let json: Value = response.json();
    assert_eq!(json["email"], "ben@x.com");
    assert_eq!(json["createdBy"], "ben@x.com");
    assert_eq!(json["roles"][0]["name"], "EMPLOYEE");

    let token = app.login("ben@x.com", DEFAULT_PASSWORD).await;
    app.get_auth("/api/v1/employees/profile", &token)
        .await
        .assert_ok();
}

#[tokio::test]
async fn test_register_rejected_when_disabled() {
    let mut config = crate::common::test_config();
    config.auth.allow_registration = false;
    let app = TestApp::with_config(config).await;

    let response = app
        .post_json(
            "/api/v1/auth/register",
            json!({
                "firstName": "Ben",
                "lastName": "Ortiz",
                "email": "ben@x.com",
                "password": DEFAULT_PASSWORD,
            }),
        )
        .await;
    response.assert_forbidden();
}

#[tokio::test]
async fn test_token_of_deleted_employee_is_rejected() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (ana, token) = app
        .employee_session(&admin, "Ana", "Cruz", "ana@x.com")
        .await;

    app.delete_auth(&format!("/api/v1/employees/{}", ana), &admin)
        .await
        .assert_no_content();

    let response = app.get_auth("/api/v1/employees/profile", &token).await;
    response.assert_unauthorized();
}

#[tokio::test]
async fn test_employee_cannot_use_admin_operations() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (_, token) = app
        .employee_session(&admin, "Ana", "Cruz", "ana@x.com")
        .await;

    for uri in ["/api/v1/employees", "/api/v1/roles", "/api/v1/tickets"] {
        let response = app.get_auth(uri, &token).await;
        response.assert_forbidden();
        assert_eq!(response.error_type(), "forbidden");
    }
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let app = TestApp::new().await;
    app.admin_token().await;

    let login: Value = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        )
        .await
        .json();
    let refresh = login["refreshToken"].as_str().unwrap();

    app.get_auth("/api/v1/auth/me", refresh)
        .await
        .assert_unauthorized();
}
