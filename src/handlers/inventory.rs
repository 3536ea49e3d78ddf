use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{parse_param, sentinel};
use crate::auth::CurrentUser;
use crate::errors::ServiceError;
use crate::filters::InventoryFilter;
use crate::models::{InventoryField, InventoryItem, StockStatus, Transaction};
use crate::services::inventory::{MovementCommand, NewInventoryItem, UpdateInventoryItem};
use crate::{ApiResponse, ApiResult, AppState};

use super::families::CellEdit;

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct InventoryQuery {
    /// Case-insensitive substring match on item code and name
    pub search: Option<String>,
    /// Category filter; "all" or absent disables it
    pub category: Option<String>,
    /// Storeroom filter; "all" or absent disables it
    pub storeroom: Option<String>,
    /// Derived status filter (out/low/medium/available); "all" disables it
    pub status: Option<String>,
}

fn filter_from_query(query: InventoryQuery) -> Result<InventoryFilter, ServiceError> {
    Ok(InventoryFilter {
        search: sentinel(query.search),
        category: sentinel(query.category),
        storeroom: sentinel(query.storeroom),
        status: parse_param("status", query.status)?,
    })
}

/// An inventory item as rendered by the API: the stored record plus its
/// derived stock status.
#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryRow {
    pub item_code: String,
    pub item_name: String,
    pub storeroom: String,
    pub branch: String,
    pub team: String,
    pub category: String,
    pub unit: String,
    pub original_stock: i32,
    pub current_stock: i32,
    pub outside_storeroom: i32,
    pub reorder_threshold: i32,
    pub status: StockStatus,
}

impl From<InventoryItem> for InventoryRow {
    fn from(item: InventoryItem) -> Self {
        let status = item.stock_status();
        Self {
            item_code: item.item_code,
            item_name: item.item_name,
            storeroom: item.storeroom,
            branch: item.branch,
            team: item.team,
            category: item.category,
            unit: item.unit,
            original_stock: item.original_stock,
            current_stock: item.current_stock,
            outside_storeroom: item.outside_storeroom,
            reorder_threshold: item.reorder_threshold,
            status,
        }
    }
}

/// List inventory items visible to the caller, filtered
#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    params(InventoryQuery),
    responses(
        (status = 200, description = "Inventory list returned"),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<InventoryQuery>,
) -> ApiResult<Vec<InventoryRow>> {
    let filter = filter_from_query(query)?;
    let items = state.services.inventory.list_items(&user, &filter).await?;
    Ok(Json(ApiResponse::success(
        items.into_iter().map(InventoryRow::from).collect(),
    )))
}

/// Items at or below their reorder threshold
#[utoipa::path(
    get,
    path = "/api/v1/inventory/low-stock",
    responses(
        (status = 200, description = "Low stock items returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_low_stock_items(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Vec<InventoryRow>> {
    let items = state.services.inventory.low_stock(&user).await?;
    Ok(Json(ApiResponse::success(
        items.into_iter().map(InventoryRow::from).collect(),
    )))
}

/// Get a specific inventory item
#[utoipa::path(
    get,
    path = "/api/v1/inventory/{code}",
    params(("code" = String, Path, description = "Item code")),
    responses(
        (status = 200, description = "Item returned", body = InventoryRow),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_inventory_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(code): Path<String>,
) -> ApiResult<InventoryRow> {
    let item = state.services.inventory.get_item(&user, &code).await?;
    Ok(Json(ApiResponse::success(InventoryRow::from(item))))
}

/// Create a new inventory item
#[utoipa::path(
    post,
    path = "/api/v1/inventory",
    request_body = NewInventoryItem,
    responses(
        (status = 201, description = "Item created", body = InventoryRow),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn create_inventory_item(
    State(state): State<AppState>,
    Json(payload): Json<NewInventoryItem>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state.services.inventory.create_item(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(InventoryRow::from(item))),
    ))
}

/// Update an inventory item
#[utoipa::path(
    put,
    path = "/api/v1/inventory/{code}",
    params(("code" = String, Path, description = "Item code")),
    request_body = UpdateInventoryItem,
    responses(
        (status = 200, description = "Item updated", body = InventoryRow),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn update_inventory_item(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(payload): Json<UpdateInventoryItem>,
) -> ApiResult<InventoryRow> {
    let item = state.services.inventory.update_item(&code, payload).await?;
    Ok(Json(ApiResponse::success(InventoryRow::from(item))))
}

/// Delete an inventory item
#[utoipa::path(
    delete,
    path = "/api/v1/inventory/{code}",
    params(("code" = String, Path, description = "Item code")),
    responses(
        (status = 200, description = "Item deleted", body = InventoryRow),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn delete_inventory_item(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<InventoryRow> {
    let removed = state.services.inventory.delete_item(&code).await?;
    Ok(Json(ApiResponse::success(InventoryRow::from(removed))))
}

/// Commit a single cell edit on an inventory item
#[utoipa::path(
    patch,
    path = "/api/v1/inventory/{code}/cells/{field}",
    params(
        ("code" = String, Path, description = "Item code"),
        ("field" = String, Path, description = "Column name, e.g. current_stock")
    ),
    request_body = CellEdit,
    responses(
        (status = 200, description = "Cell committed", body = InventoryRow),
        (status = 400, description = "Invalid field or value", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn edit_inventory_cell(
    State(state): State<AppState>,
    Path((code, field)): Path<(String, String)>,
    Json(payload): Json<CellEdit>,
) -> ApiResult<InventoryRow> {
    let field: InventoryField = field.parse().map_err(|_| {
        ServiceError::ValidationError(format!("unknown inventory column: {field}"))
    })?;
    let updated = state
        .services
        .inventory
        .edit_cell(&code, field, &payload.value)
        .await?;
    Ok(Json(ApiResponse::success(InventoryRow::from(updated))))
}

/// Withdraw stock from an item
#[utoipa::path(
    post,
    path = "/api/v1/inventory/{code}/withdraw",
    params(("code" = String, Path, description = "Item code")),
    request_body = MovementCommand,
    responses(
        (status = 200, description = "Stock withdrawn", body = Transaction),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn withdraw_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(code): Path<String>,
    Json(payload): Json<MovementCommand>,
) -> ApiResult<Transaction> {
    let txn = state
        .services
        .inventory
        .withdraw(&user, &code, payload)
        .await?;
    Ok(Json(ApiResponse::success(txn)))
}

/// Receive stock back into the storeroom
#[utoipa::path(
    post,
    path = "/api/v1/inventory/{code}/receive",
    params(("code" = String, Path, description = "Item code")),
    request_body = MovementCommand,
    responses(
        (status = 200, description = "Stock received", body = Transaction),
        (status = 400, description = "Receipt would exceed original stock", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn receive_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(code): Path<String>,
    Json(payload): Json<MovementCommand>,
) -> ApiResult<Transaction> {
    let txn = state
        .services
        .inventory
        .receive(&user, &code, payload)
        .await?;
    Ok(Json(ApiResponse::success(txn)))
}
