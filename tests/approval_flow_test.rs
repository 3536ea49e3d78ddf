mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{data, TestApp};

async fn submit_request(app: &TestApp, token: &str, item_code: &str, quantity: i32) -> String {
    let (status, body) = app
        .post(
            "/api/v1/requests",
            token,
            json!({ "item_code": item_code, "quantity": quantity }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "submit failed: {body}");
    data(&body)["request_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn approval_is_refused_when_quantity_exceeds_stock() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;
    let member = app.login_member().await;

    // Office scissors have 5 on hand.
    let id = submit_request(&app, &member, "ITM003", 10).await;

    let (status, _) = app
        .post_empty(&format!("/api/v1/requests/{id}/approve"), &admin)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // The record stays pending and the stock is untouched.
    let (_, body) = app.get("/api/v1/requests", &admin).await;
    let pending: Vec<&str> = data(&body)
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["request_id"].as_str().unwrap())
        .collect();
    assert!(pending.contains(&id.as_str()));

    let (_, body) = app.get("/api/v1/inventory/ITM003", &admin).await;
    assert_eq!(data(&body)["current_stock"], 5);
}

#[tokio::test]
async fn approval_withdraws_stock_and_appends_to_the_audit_log() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;
    let member = app.login_member().await;

    let id = submit_request(&app, &member, "ITM003", 3).await;

    let (status, body) = app
        .post_empty(&format!("/api/v1/requests/{id}/approve"), &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["status"], "approved");

    let (_, body) = app.get("/api/v1/inventory/ITM003", &admin).await;
    assert_eq!(data(&body)["current_stock"], 2);

    let (_, body) = app
        .get("/api/v1/transactions?type=withdrawal", &admin)
        .await;
    let withdrawals = data(&body).as_array().unwrap();
    let recorded = withdrawals
        .iter()
        .find(|t| t["item_code"] == "ITM003")
        .expect("withdrawal transaction missing");
    assert_eq!(recorded["quantity"], 3);
    assert_eq!(recorded["manager"], "manager@relief.example");

    // Approved requests leave the pending queue.
    let (_, body) = app.get("/api/v1/requests", &admin).await;
    assert!(data(&body)
        .as_array()
        .unwrap()
        .iter()
        .all(|r| r["request_id"] != id.as_str()));
}

#[tokio::test]
async fn decisions_are_terminal_and_admin_only() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;
    let member = app.login_member().await;

    let id = submit_request(&app, &member, "ITM001", 2).await;

    // Members cannot decide.
    let (status, _) = app
        .post_empty(&format!("/api/v1/requests/{id}/approve"), &member)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post_empty(&format!("/api/v1/requests/{id}/reject"), &admin)
        .await;
    assert_eq!(status, StatusCode::OK);

    // A decided request cannot be decided again.
    let (status, _) = app
        .post_empty(&format!("/api/v1/requests/{id}/approve"), &admin)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rejection_emits_a_notification_to_the_requestor() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;
    let member = app.login_member().await;

    let id = submit_request(&app, &member, "ITM001", 2).await;
    app.post_empty(&format!("/api/v1/requests/{id}/reject"), &admin)
        .await;

    let (status, body) = app.get("/api/v1/notifications", &member).await;
    assert_eq!(status, StatusCode::OK);
    let inbox = data(&body).as_array().unwrap();
    assert!(inbox
        .iter()
        .any(|n| n["message"].as_str().unwrap().contains(&id) && n["type"] == "request_decision"));
}

#[tokio::test]
async fn requirement_lifecycle_approve_then_fulfill() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;
    let member = app.login_member().await;

    // Register a requirement the stock can cover (office scissors, 5 on hand).
    let (status, body) = app
        .post(
            "/api/v1/convoys/CONV001/requirements",
            &member,
            json!({
                "item_type": "Office scissors",
                "quantity": 3,
                "priority": "high"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "submit failed: {body}");
    let id = data(&body)["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post_empty(&format!("/api/v1/requirements/{id}/approve"), &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["status"], "approved");
    assert_eq!(data(&body)["approved_by"], "Amal Haddad");

    // Approval does not move stock.
    let (_, body) = app.get("/api/v1/inventory/ITM003", &admin).await;
    assert_eq!(data(&body)["current_stock"], 5);

    let (status, body) = app
        .post_empty(&format!("/api/v1/requirements/{id}/fulfill"), &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["status"], "fulfilled");

    let (_, body) = app.get("/api/v1/inventory/ITM003", &admin).await;
    assert_eq!(data(&body)["current_stock"], 2);
}

#[tokio::test]
async fn requirement_approval_respects_the_stock_guard() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;

    // Seeded REQ001 asks for 100 winter blankets; none are on hand.
    let (status, _) = app
        .post_empty("/api/v1/requirements/REQ001/approve", &admin)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, body) = app
        .get("/api/v1/requirements?status=pending", &admin)
        .await;
    assert!(data(&body)
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r["id"] == "REQ001"));
}

#[tokio::test]
async fn fulfilment_requires_prior_approval() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;
    let member = app.login_member().await;

    let (_, body) = app
        .post(
            "/api/v1/convoys/CONV001/requirements",
            &member,
            json!({
                "item_type": "Office scissors",
                "quantity": 2,
                "priority": "low"
            }),
        )
        .await;
    let id = data(&body)["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .post_empty(&format!("/api/v1/requirements/{id}/fulfill"), &admin)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn closed_convoys_refuse_new_requirements() {
    let app = TestApp::new().await;
    let member = app.login_member().await;

    // CONV002 is completed.
    let (status, _) = app
        .post(
            "/api/v1/convoys/CONV002/requirements",
            &member,
            json!({
                "item_type": "Ready meals",
                "quantity": 10,
                "priority": "medium"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rejection_records_the_reason_in_notes() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;

    let (status, body) = app
        .post(
            "/api/v1/requirements/REQ001/reject",
            &admin,
            json!({ "reason": "out of season" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["status"], "rejected");
    assert_eq!(data(&body)["notes"], "out of season");
}
