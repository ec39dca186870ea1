//! Employee management and self-service tests

use serde_json::{json, Value};

use crate::common::{employee_payload, TestApp, DEFAULT_PASSWORD};

#[tokio::test]
async fn test_create_employee_and_reject_duplicate_email() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let response = app
        .post_json_auth(
            "/api/v1/employees",
            json!({ "firstName": "Ana", "lastName": "Cruz", "email": "ana@x.com", "password": "pw" }),
            &admin,
        )
        .await;
    response.assert_created();
    let json: Value = response.json();
    assert_eq!(json["age"], 0);
    assert_eq!(json["roles"].as_array().unwrap().len(), 1);
    assert_eq!(json["createdBy"], "admin@helpdesk.test");

    let response = app
        .post_json_auth(
            "/api/v1/employees",
            json!({ "firstName": "Ann", "lastName": "Other", "email": "ANA@x.com", "password": "pw" }),
            &admin,
        )
        .await;
    response.assert_conflict();
    assert_eq!(response.error_type(), "duplicate_key");
}

#[tokio::test]
async fn test_create_employee_requires_names() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let response = app
        .post_json_auth(
            "/api/v1/employees",
            json!({ "firstName": "", "lastName": "Cruz", "email": "ana@x.com", "password": "pw" }),
            &admin,
        )
        .await;
    response.assert_bad_request();
    assert_eq!(response.error_type(), "validation_error");

    let response = app
        .post_json_auth(
            "/api/v1/employees",
            json!({ "firstName": "   ", "lastName": "  ", "email": "ana@x.com", "password": "pw" }),
            &admin,
        )
        .await;
    response.assert_bad_request();
    assert!(response.text().contains("First name is required"));
}

#[tokio::test]
async fn test_blank_names_rejected_on_update_and_profile() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (ana, token) = app
        .employee_session(&admin, "Ana", "Cruz", "ana@x.com")
        .await;

    let response = app
        .put_json_auth(
            &format!("/api/v1/employees/{}", ana),
            json!({ "firstName": " ", "lastName": "Cruz", "email": "ana@x.com" }),
            &admin,
        )
        .await;
    response.assert_bad_request();

    let response = app
        .put_json_auth(
            "/api/v1/employees/profile",
            json!({ "firstName": "Ana", "lastName": "   " }),
            &token,
        )
        .await;
    response.assert_bad_request();

    let json: Value = app
        .get_auth("/api/v1/employees/profile", &token)
        .await
        .json();
    assert_eq!(json["firstName"], "Ana");
    assert_eq!(json["lastName"], "Cruz");
}

#[tokio::test]
async fn test_personal_fields_round_trip() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let response = app
        .post_json_auth(
            "/api/v1/employees",
            employee_payload("Ana", "Cruz", "ana@x.com"),
            &admin,
        )
        .await;
    response.assert_created();
    let id = response.json::<Value>()["id"].as_i64().unwrap();

    let json: Value = app
        .get_auth(&format!("/api/v1/employees/{}", id), &admin)
        .await
        .json();
    assert_eq!(json["firstName"], "Ana");
    assert_eq!(json["address"], "12 Harbour Road");
    assert_eq!(json["contactNumber"], "+1 555 0100");
    assert_eq!(json["birthday"], "1990-05-17");
    assert!(json["age"].as_u64().unwrap() >= 30);
}

#[tokio::test]
async fn test_get_unknown_employee_is_not_found() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let response = app.get_auth("/api/v1/employees/999", &admin).await;
    response.assert_not_found();
    assert_eq!(response.error_type(), "not_found");
}

#[tokio::test]
async fn test_list_employees_paginates_and_filters_names() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    for (first, email) in [("Ana", "ana@x.com"), ("Anabel", "anabel@x.com"), ("Ben", "ben@x.com")] {
        app.create_employee(&admin, first, "Cruz", email).await;
    }

    let json: Value = app
        .get_auth("/api/v1/employees?page=0&size=2", &admin)
        .await
        .json();
    // bootstrap administrator plus three
    assert_eq!(json["totalElements"], 4);
    assert_eq!(json["totalPages"], 2);
    assert_eq!(json["content"].as_array().unwrap().len(), 2);

    let json: Value = app
        .get_auth("/api/v1/employees?firstName=ana&size=1", &admin)
        .await
        .json();
    assert_eq!(json["totalElements"], 2);
    assert_eq!(json["content"].as_array().unwrap().len(), 1);
    assert_eq!(json["content"][0]["firstName"], "Ana");

    let response = app.get_auth("/api/v1/employees?size=0", &admin).await;
    response.assert_bad_request();
}

#[tokio::test]
async fn test_references_available_to_employees() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (_, token) = app
        .employee_session(&admin, "Ana", "Cruz", "ana@x.com")
        .await;

    let json: Vec<Value> = app
        .get_auth("/api/v1/employees/references", &token)
        .await
        .json();
    assert_eq!(json.len(), 2);
    assert_eq!(json[1]["fullName"], "Ana Cruz");
}

#[tokio::test]
async fn test_admin_update_changes_fields() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let id = app.create_employee(&admin, "Ana", "Cruz", "ana@x.com").await;

    let response = app
        .put_json_auth(
            &format!("/api/v1/employees/{}", id),
            json!({
                "firstName": "Ana Maria",
                "lastName": "Cruz",
                "email": "ana@x.com",
                "employmentStatus": "Active",
            }),
            &admin,
        )
        .await;
    response.assert_ok();
    let json: Value = response.json();
    assert_eq!(json["firstName"], "Ana Maria");
    assert_eq!(json["employmentStatus"], "Active");
    assert_eq!(json["updatedBy"], "admin@helpdesk.test");

    // Password unchanged
    app.login("ana@x.com", DEFAULT_PASSWORD).await;
}

#[tokio::test]
async fn test_admin_email_change_restamps_tickets() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (id, token) = app
        .employee_session(&admin, "Ana", "Cruz", "ana@x.com")
        .await;
    let ticket = app.create_ticket(&token, "Printer down", "Floor 3").await;

    app.put_json_auth(
        &format!("/api/v1/employees/{}", id),
        json!({ "firstName": "Ana", "lastName": "Cruz", "email": "ana.cruz@x.com" }),
        &admin,
    )
    .await
    .assert_ok();

    let json: Value = app
        .get_auth(&format!("/api/v1/tickets/{}", ticket), &admin)
        .await
        .json();
    assert_eq!(json["createdBy"], "ana.cruz@x.com");

    let token = app.login("ana.cruz@x.com", DEFAULT_PASSWORD).await;
    let relevant: Value = app
        .get_auth("/api/v1/employees/profile/filed", &token)
        .await
        .json();
    assert_eq!(relevant["totalElements"], 1);
}

#[tokio::test]
async fn test_delete_clears_assignee_and_frees_email() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (_, ana) = app
        .employee_session(&admin, "Ana", "Cruz", "ana@x.com")
        .await;
    let ben = app.create_employee(&admin, "Ben", "Ortiz", "ben@x.com").await;

    let ticket = app.create_ticket(&ana, "Printer down", "Floor 3").await;
    app.put_json_auth(
        &format!("/api/v1/tickets/{}/assign/{}", ticket, ben),
        json!({}),
        &admin,
    )
    .await
    .assert_ok();

    app.delete_auth(&format!("/api/v1/employees/{}", ben), &admin)
        .await
        .assert_no_content();

    let json: Value = app
        .get_auth(&format!("/api/v1/tickets/{}", ticket), &admin)
        .await
        .json();
    assert!(json["assignee"].is_null());
    assert_eq!(json["deleted"], false);

    app.get_auth(&format!("/api/v1/employees/{}", ben), &admin)
        .await
        .assert_not_found();

    // A deleted employee's email may be reused
    app.create_employee(&admin, "Ben", "Again", "ben@x.com").await;
}

#[tokio::test]
async fn test_assign_role_is_idempotent() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let id = app.create_employee(&admin, "Ana", "Cruz", "ana@x.com").await;

    let role: Value = app
        .post_json_auth("/api/v1/roles", json!({ "name": "AUDITOR" }), &admin)
        .await
        .json();
    let uri = format!("/api/v1/employees/{}/roles/{}", id, role["id"]);

    let first: Value = app.put_json_auth(&uri, json!({}), &admin).await.json();
    assert_eq!(first["roles"].as_array().unwrap().len(), 2);

    let second = app.put_json_auth(&uri, json!({}), &admin).await;
    second.assert_ok();
    assert_eq!(second.json::<Value>()["roles"], first["roles"]);

    app.put_json_auth(
        &format!("/api/v1/employees/{}/roles/999", id),
        json!({}),
        &admin,
    )
    .await
    .assert_not_found();
}

#[tokio::test]
async fn test_profile_update_keeps_roles() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (_, token) = app
        .employee_session(&admin, "Ana", "Cruz", "ana@x.com")
        .await;

    let response = app
        .put_json_auth(
            "/api/v1/employees/profile",
            json!({
                "firstName": "Ana",
                "lastName": "Cruz-Silva",
                "employmentStatus": "Terminated",
                "roleIds": [1],
            }),
            &token,
        )
        .await;
    response.assert_ok();
    let json: Value = response.json();
    assert_eq!(json["emailChanged"], false);
    assert!(json.get("message").is_none());
    assert_eq!(json["employee"]["lastName"], "Cruz-Silva");
    assert!(json["employee"]["employmentStatus"].is_null());
    assert_eq!(json["employee"]["roles"][0]["name"], "EMPLOYEE");
}

#[tokio::test]
async fn test_profile_email_change_restamps_tickets_and_requires_login() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (_, token) = app
        .employee_session(&admin, "Ana", "Cruz", "ana@x.com")
        .await;
    let ticket = app.create_ticket(&token, "Printer down", "Floor 3").await;

    let response = app
        .put_json_auth(
            "/api/v1/employees/profile",
            json!({ "firstName": "Ana", "lastName": "Cruz", "email": "ana.cruz@x.com" }),
            &token,
        )
        .await;
    response.assert_ok();
    let json: Value = response.json();
    assert_eq!(json["emailChanged"], true);
    assert_eq!(
        json["message"],
        "Email address updated. Please log in with your new email address."
    );

    app.get_auth("/api/v1/employees/profile", &token)
        .await
        .assert_unauthorized();

    let token = app.login("ana.cruz@x.com", DEFAULT_PASSWORD).await;
    let json: Value = app
        .get_auth(&format!("/api/v1/tickets/{}", ticket), &token)
        .await
        .json();
    assert_eq!(json["createdBy"], "ana.cruz@x.com");

    let relevant: Value = app
        .get_auth("/api/v1/employees/profile/filed", &token)
        .await
        .json();
    assert_eq!(relevant["totalElements"], 1);
}

#[tokio::test]
async fn test_profile_email_collision_is_duplicate() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.create_employee(&admin, "Ben", "Ortiz", "ben@x.com").await;
    let (_, token) = app
        .employee_session(&admin, "Ana", "Cruz", "ana@x.com")
        .await;

    let response = app
        .put_json_auth(
            "/api/v1/employees/profile",
            json!({ "firstName": "Ana", "lastName": "Cruz", "email": "ben@x.com" }),
            &token,
        )
        .await;
    response.assert_conflict();

    // Nothing changed
    app.get_auth("/api/v1/employees/profile", &token)
        .await
        .assert_ok();
}
