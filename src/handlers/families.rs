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
use crate::filters::FamilyFilter;
use crate::models::{Family, FamilyField};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct FamilyQuery {
    /// Case-insensitive substring match on code, name, guide, id, and phone
    pub search: Option<String>,
    /// Committee filter; "all" or absent disables it
    pub committee: Option<String>,
    /// Aid type filter; "all" or absent disables it
    pub aid_type: Option<String>,
    /// Exact (case-insensitive) area match
    pub area: Option<String>,
}

fn filter_from_query(query: FamilyQuery) -> Result<FamilyFilter, ServiceError> {
    Ok(FamilyFilter {
        search: sentinel(query.search),
        committee: parse_param("committee", query.committee)?,
        aid_type: parse_param("aid_type", query.aid_type)?,
        area: sentinel(query.area),
    })
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CellEdit {
    /// Raw edit-buffer contents; parsed according to the column's field kind
    pub value: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkFamilies {
    pub families: Vec<Family>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MergeOutcome {
    /// Number of rows replaced by the merge
    pub updated: usize,
}

/// List families visible to the caller, filtered
#[utoipa::path(
    get,
    path = "/api/v1/families",
    params(FamilyQuery),
    responses(
        (status = 200, description = "Family rows returned"),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "families"
)]
pub async fn list_families(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<FamilyQuery>,
) -> ApiResult<Vec<Family>> {
    let filter = filter_from_query(query)?;
    let rows = state.services.families.list_families(&user, &filter).await?;
    Ok(Json(ApiResponse::success(rows)))
}

/// Append a blank row with a freshly generated family code
#[utoipa::path(
    post,
    path = "/api/v1/families/rows",
    responses(
        (status = 201, description = "Row added", body = Family),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "families"
)]
pub async fn add_family_row(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ServiceError> {
    let family = state.services.families.add_row(&user).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(family))))
}

/// Delete the row at an index within the caller's visible subset
#[utoipa::path(
    delete,
    path = "/api/v1/families/rows/{index}",
    params(("index" = usize, Path, description = "Zero-based row index")),
    responses(
        (status = 200, description = "Row deleted", body = Family),
        (status = 404, description = "No row at that index", body = crate::errors::ErrorResponse)
    ),
    tag = "families"
)]
pub async fn delete_family_row(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(index): Path<usize>,
) -> ApiResult<Family> {
    let removed = state.services.families.delete_row(&user, index).await?;
    Ok(Json(ApiResponse::success(removed)))
}

/// Commit a single cell edit on a family row
#[utoipa::path(
    patch,
    path = "/api/v1/families/{code}/cells/{field}",
    params(
        ("code" = String, Path, description = "Family code"),
        ("field" = String, Path, description = "Column name, e.g. family_size")
    ),
    request_body = CellEdit,
    responses(
        (status = 200, description = "Cell committed", body = Family),
        (status = 400, description = "Invalid field or value", body = crate::errors::ErrorResponse),
        (status = 404, description = "Family not found", body = crate::errors::ErrorResponse)
    ),
    tag = "families"
)]
pub async fn edit_family_cell(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((code, field)): Path<(String, String)>,
    Json(payload): Json<CellEdit>,
) -> ApiResult<Family> {
    let field: FamilyField = field
        .parse()
        .map_err(|_| ServiceError::ValidationError(format!("unknown family column: {field}")))?;
    let updated = state
        .services
        .families
        .edit_cell(&user, &code, field, &payload.value)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

/// Submit a bulk update of the caller's visible subset
#[utoipa::path(
    put,
    path = "/api/v1/families",
    request_body = BulkFamilies,
    responses(
        (status = 200, description = "Rows merged", body = MergeOutcome),
        (status = 400, description = "Duplicate codes in submission", body = crate::errors::ErrorResponse)
    ),
    tag = "families"
)]
pub async fn submit_families(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<BulkFamilies>,
) -> ApiResult<MergeOutcome> {
    let updated = state
        .services
        .families
        .submit_rows(&user, payload.families)
        .await?;
    Ok(Json(ApiResponse::success(MergeOutcome { updated })))
}
