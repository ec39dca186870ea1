//! Ticket workflow tests

use serde_json::{json, Value};

use crate::common::{remark_payload, ticket_payload, TestApp};

/// Admin plus two employees (Ana files, Ben works); returns tokens and ids
struct Desk {
    app: TestApp,
    admin: String,
    ana: (i64, String),
    ben: (i64, String),
}

impl Desk {
    async fn new() -> Self {
        let app = TestApp::new().await;
        let admin = app.admin_token().await;
        let ana = app
            .employee_session(&admin, "Ana", "Cruz", "ana@x.com")
            .await;
        let ben = app
            .employee_session(&admin, "Ben", "Ortiz", "ben@x.com")
            .await;
        Self {
            app,
            admin,
            ana,
            ben,
        }
    }

    async fn assign(&self, ticket: i64, employee: i64) -> Value {
        let response = self
            .app
            .put_json_auth(
                &format!("/api/v1/tickets/{}/assign/{}", ticket, employee),
                json!({}),
                &self.admin,
            )
            .await;
        response.assert_ok();
        response.json()
    }
}

#[tokio::test]
async fn test_ticket_workflow_from_draft_to_resolved() {
    let desk = Desk::new().await;
    let app = &desk.app;
    let (ben_id, ben) = &desk.ben;
    let (_, ana) = &desk.ana;
    let (_, cy) = app
        .employee_session(&desk.admin, "Cy", "Lee", "cy@x.com")
        .await;

    let response = app
        .post_json_auth("/api/v1/tickets", ticket_payload("Printer down", "Floor 3"), ana)
        .await;
    response.assert_created();
    let created: Value = response.json();
    assert_eq!(created["status"], "DRAFT");
    assert!(created["assignee"].is_null());
    assert_eq!(created["createdBy"], "ana@x.com");
    let id = created["id"].as_i64().unwrap();

    let assigned = desk.assign(id, *ben_id).await;
    assert_eq!(assigned["status"], "FILED");
    assert_eq!(assigned["assignee"]["id"], *ben_id);
    assert_eq!(assigned["assignee"]["email"], "ben@x.com");

    let uri = format!("/api/v1/employees/profile/assigned/{}/remark", id);
    let response = app
        .put_json_auth(&uri, remark_payload("fixed", "resolved"), ben)
        .await;
    response.assert_ok();
    let remarked: Value = response.json();
    assert_eq!(remarked["status"], "RESOLVED");
    assert_eq!(remarked["remarks"], "fixed");
    assert_eq!(remarked["updatedBy"], "ben@x.com");
    assert_eq!(remarked["ticketNo"], created["ticketNo"]);

    let response = app
        .put_json_auth(&uri, remark_payload("fixed", "resolved"), &cy)
        .await;
    response.assert_forbidden();
    assert_eq!(response.error_type(), "not_authorized");
}

#[tokio::test]
async fn test_create_ignores_status_and_requires_text() {
    let desk = Desk::new().await;
    let app = &desk.app;
    let (_, ana) = &desk.ana;

    let response = app
        .post_json_auth(
            "/api/v1/tickets",
            json!({ "title": "Printer down", "body": "Floor 3", "status": "CLOSED" }),
            ana,
        )
        .await;
    response.assert_created();
    assert_eq!(response.json::<Value>()["status"], "DRAFT");

    let response = app
        .post_json_auth("/api/v1/tickets", json!({ "title": "No body" }), ana)
        .await;
    response.assert_bad_request();
    assert!(response.text().contains("Body is required"));
}

#[tokio::test]
async fn test_ticket_numbers_are_unique_and_stable() {
    let desk = Desk::new().await;
    let app = &desk.app;
    let (_, ana) = &desk.ana;

    let first = app.create_ticket(ana, "One", "First").await;
    let second = app.create_ticket(ana, "Two", "Second").await;

    let a: Value = app
        .get_auth(&format!("/api/v1/tickets/{}", first), ana)
        .await
        .json();
    let b: Value = app
        .get_auth(&format!("/api/v1/tickets/{}", second), ana)
        .await
        .json();
    assert_ne!(a["ticketNo"], b["ticketNo"]);

    let updated: Value = app
        .put_json_auth(
            &format!("/api/v1/tickets/{}", first),
            json!({ "title": "One, edited", "body": "First", "ticketNo": "HACKED" }),
            ana,
        )
        .await
        .json();
    assert_eq!(updated["title"], "One, edited");
    assert_eq!(updated["ticketNo"], a["ticketNo"]);
}

#[tokio::test]
async fn test_creator_may_edit_only_while_draft() {
    let desk = Desk::new().await;
    let app = &desk.app;
    let (ben_id, ben) = &desk.ben;
    let (_, ana) = &desk.ana;
    let id = app.create_ticket(ana, "Printer down", "Floor 3").await;
    let uri = format!("/api/v1/tickets/{}", id);

    // Someone else's draft
    let response = app
        .put_json_auth(&uri, json!({ "title": "Mine now", "body": "x" }), ben)
        .await;
    response.assert_forbidden();

    desk.assign(id, *ben_id).await;

    let response = app
        .put_json_auth(&uri, json!({ "title": "Too late", "body": "Floor 3" }), ana)
        .await;
    response.assert_forbidden();
    assert_eq!(response.error_type(), "not_authorized");

    // Admin updates are unrestricted; absent remarks are kept
    let response = app
        .put_json_auth(
            &uri,
            json!({ "title": "Printer down", "body": "Floor 3, room 12", "status": "inprogress" }),
            &desk.admin,
        )
        .await;
    response.assert_ok();
    let json: Value = response.json();
    assert_eq!(json["status"], "INPROGRESS");
    assert_eq!(json["body"], "Floor 3, room 12");
}

#[tokio::test]
async fn test_employee_sees_only_own_or_assigned_tickets() {
    let desk = Desk::new().await;
    let app = &desk.app;
    let (ben_id, ben) = &desk.ben;
    let (_, ana) = &desk.ana;
    let id = app.create_ticket(ana, "Printer down", "Floor 3").await;
    let uri = format!("/api/v1/tickets/{}", id);

    let response = app.get_auth(&uri, ben).await;
    response.assert_forbidden();
    assert!(response
        .text()
        .contains("You are not authorized to view this ticket."));

    desk.assign(id, *ben_id).await;
    app.get_auth(&uri, ben).await.assert_ok();
    app.get_auth(&uri, &desk.admin).await.assert_ok();
}

#[tokio::test]
async fn test_listing_paginates_with_exact_totals() {
    let desk = Desk::new().await;
    let app = &desk.app;
    let (_, ana) = &desk.ana;
    for n in 0..25 {
        app.create_ticket(ana, &format!("Ticket {}", n), "Body").await;
    }

    let mut seen = Vec::new();
    for page in 0..3 {
        let json: Value = app
            .get_auth(&format!("/api/v1/tickets?page={}&size=10", page), &desk.admin)
            .await
            .json();
        assert_eq!(json["totalElements"], 25);
        assert_eq!(json["totalPages"], 3);
        for ticket in json["content"].as_array().unwrap() {
            seen.push(ticket["id"].as_i64().unwrap());
        }
    }
    assert_eq!(seen.len(), 25);
    assert!(seen.windows(2).all(|w| w[0] < w[1]));

    let json: Value = app
        .get_auth("/api/v1/tickets?page=3&size=10", &desk.admin)
        .await
        .json();
    assert!(json["content"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_listing_filters() {
    let desk = Desk::new().await;
    let app = &desk.app;
    let (ben_id, _) = &desk.ben;
    let (_, ana) = &desk.ana;
    let printer = app.create_ticket(ana, "Printer down", "Floor 3").await;
    app.create_ticket(ana, "VPN flaky", "Remote office").await;
    desk.assign(printer, *ben_id).await;

    let json: Value = app
        .get_auth("/api/v1/tickets?title=printer", &desk.admin)
        .await
        .json();
    assert_eq!(json["totalElements"], 1);

    let json: Value = app
        .get_auth("/api/v1/tickets?status=filed", &desk.admin)
        .await
        .json();
    assert_eq!(json["totalElements"], 1);
    assert_eq!(json["content"][0]["id"], printer);

    let json: Value = app
        .get_auth("/api/v1/tickets?assignee=ortiz", &desk.admin)
        .await
        .json();
    assert_eq!(json["totalElements"], 1);

    let json: Value = app
        .get_auth("/api/v1/tickets?assignee=nobody", &desk.admin)
        .await
        .json();
    assert_eq!(json["totalElements"], 0);

    let json: Value = app
        .get_auth("/api/v1/tickets?createdBy=ana@x.com", &desk.admin)
        .await
        .json();
    assert_eq!(json["totalElements"], 2);
}

#[tokio::test]
async fn test_unknown_status_is_rejected() {
    let desk = Desk::new().await;
    let app = &desk.app;

    let response = app
        .get_auth("/api/v1/tickets?status=bogus", &desk.admin)
        .await;
    response.assert_bad_request();
    assert_eq!(response.error_type(), "invalid_status");

    let response = app
        .get_auth("/api/v1/tickets/status/bogus", &desk.admin)
        .await;
    response.assert_bad_request();
    assert_eq!(response.error_type(), "invalid_status");
}

#[tokio::test]
async fn test_relevant_and_assigned_listings() {
    let desk = Desk::new().await;
    let app = &desk.app;
    let (ben_id, ben) = &desk.ben;
    let (_, ana) = &desk.ana;
    let printer = app.create_ticket(ana, "Printer down", "Floor 3").await;
    app.create_ticket(ana, "VPN flaky", "Remote office").await;
    app.create_ticket(ben, "Laptop battery", "Swells").await;
    desk.assign(printer, *ben_id).await;

    let json: Value = app
        .get_auth("/api/v1/employees/profile/filed", ben)
        .await
        .json();
    // Ben's own ticket plus the one assigned to him
    assert_eq!(json["totalElements"], 2);

    let json: Value = app
        .get_auth("/api/v1/employees/profile/filed?title=vpn", ana)
        .await
        .json();
    assert_eq!(json["totalElements"], 1);

    let assigned: Vec<Value> = app
        .get_auth("/api/v1/employees/profile/assigned", ben)
        .await
        .json();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0]["id"], printer);

    let by_assignee: Vec<Value> = app
        .get_auth(&format!("/api/v1/tickets/assignee/{}", ben_id), &desk.admin)
        .await
        .json();
    assert_eq!(by_assignee.len(), 1);

    app.get_auth("/api/v1/tickets/assignee/999", &desk.admin)
        .await
        .assert_not_found();

    let drafts: Vec<Value> = app
        .get_auth("/api/v1/tickets/status/draft", &desk.admin)
        .await
        .json();
    assert_eq!(drafts.len(), 2);
}

#[tokio::test]
async fn test_counts_by_status() {
    let desk = Desk::new().await;
    let app = &desk.app;
    let (ben_id, ben) = &desk.ben;
    let (_, ana) = &desk.ana;
    let printer = app.create_ticket(ana, "Printer down", "Floor 3").await;
    app.create_ticket(ana, "VPN flaky", "Remote office").await;
    desk.assign(printer, *ben_id).await;

    let json: Value = app
        .get_auth("/api/v1/tickets/counts-by-status", ben)
        .await
        .json();
    assert_eq!(
        json,
        json!({ "DRAFT": 1, "FILED": 1, "INPROGRESS": 0, "RESOLVED": 0, "CLOSED": 0 })
    );

    let json: Value = app
        .get_auth("/api/v1/tickets/profile/ticket-counts", ana)
        .await
        .json();
    assert_eq!(json["CREATED_DRAFT"], 1);
    assert_eq!(json["CREATED_FILED"], 1);
    assert_eq!(json["ASSIGNED_FILED"], 0);

    let json: Value = app
        .get_auth("/api/v1/tickets/profile/ticket-counts", ben)
        .await
        .json();
    assert_eq!(json["CREATED_DRAFT"], 0);
    assert_eq!(json["ASSIGNED_FILED"], 1);
    assert_eq!(json.as_object().unwrap().len(), 10);
}

#[tokio::test]
async fn test_admin_remark_and_delete() {
    let desk = Desk::new().await;
    let app = &desk.app;
    let (_, ana) = &desk.ana;
    let id = app.create_ticket(ana, "Printer down", "Floor 3").await;
    let uri = format!("/api/v1/tickets/{}/remark", id);

    // Admin path is admin-only
    app.put_json_auth(&uri, remark_payload("x", "closed"), ana)
        .await
        .assert_forbidden();

    let response = app
        .put_json_auth(&uri, json!({ "remarks": "dup" }), &desk.admin)
        .await;
    response.assert_bad_request();

    let response = app
        .put_json_auth(&uri, remark_payload("duplicate", "closed"), &desk.admin)
        .await;
    response.assert_ok();
    assert_eq!(response.json::<Value>()["status"], "CLOSED");

    app.delete_auth(&format!("/api/v1/tickets/{}", id), &desk.admin)
        .await
        .assert_no_content();
    app.get_auth(&format!("/api/v1/tickets/{}", id), &desk.admin)
        .await
        .assert_not_found();

    let json: Value = app.get_auth("/api/v1/tickets", &desk.admin).await.json();
    assert_eq!(json["totalElements"], 0);
}

#[tokio::test]
async fn test_assign_requires_active_employee() {
    let desk = Desk::new().await;
    let app = &desk.app;
    let (_, ana) = &desk.ana;
    let id = app.create_ticket(ana, "Printer down", "Floor 3").await;

    let response = app
        .put_json_auth(
            &format!("/api/v1/tickets/{}/assign/999", id),
            json!({}),
            &desk.admin,
        )
        .await;
    response.assert_not_found();

    let response = app
        .put_json_auth("/api/v1/tickets/999/assign/1", json!({}), &desk.admin)
        .await;
    response.assert_not_found();
    assert!(response.text().contains("Ticket not found with id: 999"));
}
