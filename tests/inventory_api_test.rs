mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{data, TestApp};

fn codes(body: &serde_json::Value) -> Vec<&str> {
    data(body)
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["item_code"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn filters_combine_and_honor_the_all_sentinel() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;

    let (_, body) = app.get("/api/v1/inventory", &admin).await;
    assert_eq!(codes(&body).len(), 4);

    // "all" is a no-op sentinel.
    let (_, body) = app
        .get("/api/v1/inventory?category=all&status=all", &admin)
        .await;
    assert_eq!(codes(&body).len(), 4);

    let (_, body) = app.get("/api/v1/inventory?search=notebook", &admin).await;
    assert_eq!(codes(&body), vec!["ITM001"]);

    let (_, body) = app
        .get("/api/v1/inventory?category=stationery", &admin)
        .await;
    assert_eq!(codes(&body), vec!["ITM001", "ITM002"]);

    // AND-combination narrows.
    let (_, body) = app
        .get("/api/v1/inventory?category=stationery&search=pens", &admin)
        .await;
    assert_eq!(codes(&body), vec!["ITM002"]);

    // Unknown status values are refused, not ignored.
    let (status, _) = app.get("/api/v1/inventory?status=plenty", &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn derived_status_drives_the_status_filter() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;

    let (_, body) = app.get("/api/v1/inventory?status=low", &admin).await;
    assert_eq!(codes(&body), vec!["ITM003"]);

    let (_, body) = app.get("/api/v1/inventory?status=out", &admin).await;
    assert_eq!(codes(&body), vec!["ITM004"]);

    let (_, body) = app.get("/api/v1/inventory/ITM003", &admin).await;
    assert_eq!(data(&body)["status"], "low");
}

#[tokio::test]
async fn low_stock_lists_items_at_or_below_threshold() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;

    let (_, body) = app.get("/api/v1/inventory/low-stock", &admin).await;
    assert_eq!(codes(&body), vec!["ITM003", "ITM004"]);
}

#[tokio::test]
async fn members_see_only_their_team_and_cannot_mutate() {
    let app = TestApp::new().await;
    let member = app.login_member().await;

    let (_, body) = app.get("/api/v1/inventory", &member).await;
    assert_eq!(codes(&body), vec!["ITM001", "ITM002", "ITM003"]);

    // Items outside the member's team read as missing.
    let (status, _) = app.get("/api/v1/inventory/ITM004", &member).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Mutation routes are manager-only.
    let (status, _) = app
        .post(
            "/api/v1/inventory",
            &member,
            json!({
                "item_name": "Tents",
                "storeroom": "Main storeroom",
                "branch": "Central branch",
                "team": "in_kind",
                "category": "shelter",
                "unit": "piece",
                "original_stock": 10,
                "current_stock": 10,
                "outside_storeroom": 0,
                "reorder_threshold": 2
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn create_enforces_the_stock_invariant() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;

    let (status, _) = app
        .post(
            "/api/v1/inventory",
            &admin,
            json!({
                "item_name": "Folding chairs",
                "storeroom": "Main storeroom",
                "branch": "Central branch",
                "team": "furniture",
                "category": "furniture",
                "unit": "piece",
                "original_stock": 10,
                "current_stock": 8,
                "outside_storeroom": 5,
                "reorder_threshold": 2
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/api/v1/inventory",
            &admin,
            json!({
                "item_name": "Folding chairs",
                "storeroom": "Main storeroom",
                "branch": "Central branch",
                "team": "furniture",
                "category": "furniture",
                "unit": "piece",
                "original_stock": 10,
                "current_stock": 5,
                "outside_storeroom": 5,
                "reorder_threshold": 2
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(data(&body)["item_code"], "ITM005");
}

#[tokio::test]
async fn withdraw_and_receive_move_stock_through_the_audit_log() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;

    // Overdraw is refused.
    let (status, _) = app
        .post(
            "/api/v1/inventory/ITM003/withdraw",
            &admin,
            json!({ "quantity": 10 }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = app
        .post(
            "/api/v1/inventory/ITM003/withdraw",
            &admin,
            json!({ "quantity": 2, "team_leader": "Omar Khalid" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["transaction_type"], "withdrawal");
    assert_eq!(data(&body)["team_leader"], "Omar Khalid");

    let (_, body) = app.get("/api/v1/inventory/ITM003", &admin).await;
    assert_eq!(data(&body)["current_stock"], 3);

    // A receipt that would exceed the original stock is refused.
    let (status, _) = app
        .post(
            "/api/v1/inventory/ITM003/receive",
            &admin,
            json!({ "quantity": 100 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/v1/inventory/ITM003/receive",
            &admin,
            json!({ "quantity": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/api/v1/inventory/ITM003", &admin).await;
    assert_eq!(data(&body)["current_stock"], 8);

    let (_, body) = app.get("/api/v1/transactions", &admin).await;
    let log = data(&body).as_array().unwrap();
    // Two seeded movements plus the two above.
    assert_eq!(log.len(), 4);
}

#[tokio::test]
async fn grid_cell_edits_respect_the_invariant() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;

    let (status, _) = app
        .patch(
            "/api/v1/inventory/ITM001/cells/current_stock",
            &admin,
            json!({ "value": "95" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .patch(
            "/api/v1/inventory/ITM001/cells/current_stock",
            &admin,
            json!({ "value": "60" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["current_stock"], 60);
    assert_eq!(data(&body)["status"], "available");
}
