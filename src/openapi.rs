use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Relief API",
        version = "0.1.0",
        description = r#"
# Relief Aid Distribution API

Backend for a charity aid-distribution operation: family registry, storeroom
inventory, stock request approval, transaction audit log, and relief convoy
planning.

## Authentication

Log in at `/auth/login` to receive a session token, then pass it as a bearer
token:

```
Authorization: Bearer <session-token>
```

Administrators (storeroom managers) see and mutate everything; committee
members are scoped to their own committee's rows.

## Error Handling

Failures use a consistent envelope with the request id for tracing:

```json
{
  "error": "Unprocessable Entity",
  "message": "Insufficient stock: requested 10, available 5",
  "request_id": "4f2c...",
  "timestamp": "2026-02-09T10:30:00Z"
}
```
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Session management"),
        (name = "families", description = "Family registry and editable grid"),
        (name = "inventory", description = "Storeroom inventory and stock movements"),
        (name = "convoys", description = "Relief convoy planning and requirements"),
        (name = "requests", description = "Stock request approval workflow"),
        (name = "transactions", description = "Stock movement audit log"),
        (name = "notifications", description = "User notifications")
    ),
    paths(
        crate::auth::login_handler,
        crate::auth::logout_handler,
        crate::auth::me_handler,
        crate::handlers::families::list_families,
        crate::handlers::families::add_family_row,
        crate::handlers::families::delete_family_row,
        crate::handlers::families::edit_family_cell,
        crate::handlers::families::submit_families,
        crate::handlers::inventory::list_inventory,
        crate::handlers::inventory::get_low_stock_items,
        crate::handlers::inventory::get_inventory_item,
        crate::handlers::inventory::create_inventory_item,
        crate::handlers::inventory::update_inventory_item,
        crate::handlers::inventory::delete_inventory_item,
        crate::handlers::inventory::edit_inventory_cell,
        crate::handlers::inventory::withdraw_stock,
        crate::handlers::inventory::receive_stock,
        crate::handlers::convoys::list_convoys,
        crate::handlers::convoys::create_convoy,
        crate::handlers::convoys::get_convoy,
        crate::handlers::convoys::list_convoy_requirements,
        crate::handlers::convoys::submit_requirement,
        crate::handlers::convoys::list_requirements,
        crate::handlers::convoys::approve_requirement,
        crate::handlers::convoys::reject_requirement,
        crate::handlers::convoys::fulfill_requirement,
        crate::handlers::requests::list_pending_requests,
        crate::handlers::requests::submit_request,
        crate::handlers::requests::approve_request,
        crate::handlers::requests::reject_request,
        crate::handlers::transactions::list_transactions,
        crate::handlers::notifications::list_notifications,
        crate::handlers::notifications::mark_notification_read,
    ),
    components(schemas(
        crate::auth::LoginCredentials,
        crate::auth::SessionResponse,
        crate::auth::User,
        crate::auth::Role,
        crate::errors::ErrorResponse,
        crate::models::Family,
        crate::models::FamilyField,
        crate::models::AidType,
        crate::models::Committee,
        crate::models::InventoryItem,
        crate::models::InventoryField,
        crate::models::StockStatus,
        crate::models::ConvoyEvent,
        crate::models::ConvoyStatus,
        crate::models::ConvoyRequirement,
        crate::models::RequirementStatus,
        crate::models::Priority,
        crate::models::PendingRequest,
        crate::models::RequestStatus,
        crate::models::Transaction,
        crate::models::TransactionType,
        crate::notifications::Notification,
        crate::notifications::NotificationType,
        crate::services::inventory::NewInventoryItem,
        crate::services::inventory::UpdateInventoryItem,
        crate::services::inventory::MovementCommand,
        crate::services::convoys::NewConvoy,
        crate::services::convoys::NewRequirement,
        crate::services::requests::NewStockRequest,
        crate::handlers::families::CellEdit,
        crate::handlers::families::BulkFamilies,
        crate::handlers::families::MergeOutcome,
        crate::handlers::inventory::InventoryRow,
        crate::handlers::convoys::ConvoyDetail,
        crate::handlers::convoys::RejectRequirement,
    ))
)]
pub struct ApiDoc;

/// Serves the OpenAPI document as JSON.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
