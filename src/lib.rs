//! Relief API Library
//!
//! This crate provides the core functionality for the relief aid-distribution
//! backend: family registry, storeroom inventory, stock request approval, and
//! convoy planning over an in-memory store.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod errors;
pub mod events;
pub mod filters;
pub mod grid;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod notifications;
pub mod openapi;
pub mod services;
pub mod store;
pub mod tracing;

use std::sync::Arc;

use axum::{
    extract::State,
    response::Json,
    routing::{delete, get, patch, post, put},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

use crate::auth::AuthRouterExt;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: config::AppConfig,
    pub store: Arc<store::memory::InMemoryStore>,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
    pub auth: Arc<auth::AuthService>,
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

// Enhanced API routes function
pub fn api_v1_routes() -> Router<AppState> {
    // Families: visible to any logged-in user, scoped inside the service
    let families = Router::new()
        .route(
            "/families",
            get(handlers::families::list_families).put(handlers::families::submit_families),
        )
        .route(
            "/families/rows",
            post(handlers::families::add_family_row),
        )
        .route(
            "/families/rows/{index}",
            delete(handlers::families::delete_family_row),
        )
        .route(
            "/families/{code}/cells/{field}",
            patch(handlers::families::edit_family_cell),
        )
        .with_auth();

    // Inventory reads are scoped per role; mutation is manager-only
    let inventory_read = Router::new()
        .route("/inventory", get(handlers::inventory::list_inventory))
        .route(
            "/inventory/low-stock",
            get(handlers::inventory::get_low_stock_items),
        )
        .route(
            "/inventory/{code}",
            get(handlers::inventory::get_inventory_item),
        )
        .with_auth();

    let inventory_mutate = Router::new()
        .route(
            "/inventory",
            post(handlers::inventory::create_inventory_item),
        )
        .route(
            "/inventory/{code}",
            put(handlers::inventory::update_inventory_item)
                .delete(handlers::inventory::delete_inventory_item),
        )
        .route(
            "/inventory/{code}/cells/{field}",
            patch(handlers::inventory::edit_inventory_cell),
        )
        .route(
            "/inventory/{code}/withdraw",
            post(handlers::inventory::withdraw_stock),
        )
        .route(
            "/inventory/{code}/receive",
            post(handlers::inventory::receive_stock),
        )
        .require_admin();

    // Convoys: reads and requirement submission for members, decisions for
    // managers
    let convoys_read = Router::new()
        .route("/convoys", get(handlers::convoys::list_convoys))
        .route("/convoys/{id}", get(handlers::convoys::get_convoy))
        .route(
            "/convoys/{id}/requirements",
            get(handlers::convoys::list_convoy_requirements)
                .post(handlers::convoys::submit_requirement),
        )
        .route("/requirements", get(handlers::convoys::list_requirements))
        .with_auth();

    let convoys_admin = Router::new()
        .route("/convoys", post(handlers::convoys::create_convoy))
        .route(
            "/requirements/{id}/approve",
            post(handlers::convoys::approve_requirement),
        )
        .route(
            "/requirements/{id}/reject",
            post(handlers::convoys::reject_requirement),
        )
        .route(
            "/requirements/{id}/fulfill",
            post(handlers::convoys::fulfill_requirement),
        )
        .require_admin();

    // Stock requests: submission for members, decisions for managers
    let requests = Router::new()
        .route(
            "/requests",
            get(handlers::requests::list_pending_requests)
                .post(handlers::requests::submit_request),
        )
        .with_auth();

    let requests_admin = Router::new()
        .route(
            "/requests/{id}/approve",
            post(handlers::requests::approve_request),
        )
        .route(
            "/requests/{id}/reject",
            post(handlers::requests::reject_request),
        )
        .require_admin();

    let transactions = Router::new()
        .route(
            "/transactions",
            get(handlers::transactions::list_transactions),
        )
        .with_auth();

    let notifications = Router::new()
        .route(
            "/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route(
            "/notifications/{id}/read",
            post(handlers::notifications::mark_notification_read),
        )
        .with_auth();

    Router::new()
        // Status and health endpoints
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(families)
        .merge(inventory_read)
        .merge(inventory_mutate)
        .merge(convoys_read)
        .merge(convoys_admin)
        .merge(requests)
        .merge(requests_admin)
        .merge(transactions)
        .merge(notifications)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "relief-api",
        "timestamp": Utc::now().to_rfc3339(),
        "environment": std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let store_status = if state.store.ping() {
        "healthy"
    } else {
        "unhealthy"
    };

    let health_data = json!({
        "status": store_status,
        "checks": {
            "store": store_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

pub mod prelude {
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::filters::*;
    pub use crate::grid::*;
    pub use crate::models::*;
    // Note: services and models both export modules named `inventory`.
    // Import services under their own path to avoid ambiguous glob re-exports.
    pub use crate::store::*;
    pub use crate::tracing::*;
}
