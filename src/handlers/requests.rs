use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use super::{parse_param, sentinel};
use crate::auth::CurrentUser;
use crate::errors::ServiceError;
use crate::filters::RequestFilter;
use crate::models::PendingRequest;
use crate::services::requests::NewStockRequest;
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct RequestQuery {
    /// Case-insensitive substring match on id, item, and branch
    pub search: Option<String>,
    /// Committee filter; "all" or absent disables it
    pub committee: Option<String>,
    /// Only urgent requests
    #[serde(default)]
    pub urgent_only: bool,
}

fn filter_from_query(query: RequestQuery) -> Result<RequestFilter, ServiceError> {
    Ok(RequestFilter {
        search: sentinel(query.search),
        committee: parse_param("committee", query.committee)?,
        urgent_only: query.urgent_only,
    })
}

/// Pending stock requests within the caller's scope
#[utoipa::path(
    get,
    path = "/api/v1/requests",
    params(RequestQuery),
    responses(
        (status = 200, description = "Pending requests returned"),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "requests"
)]
pub async fn list_pending_requests(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<RequestQuery>,
) -> ApiResult<Vec<PendingRequest>> {
    let filter = filter_from_query(query)?;
    let requests = state.services.requests.list_pending(&user, &filter).await?;
    Ok(Json(ApiResponse::success(requests)))
}

/// Submit a stock request
#[utoipa::path(
    post,
    path = "/api/v1/requests",
    request_body = NewStockRequest,
    responses(
        (status = 201, description = "Request submitted", body = PendingRequest),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "requests"
)]
pub async fn submit_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<NewStockRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let request = state.services.requests.submit(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(request))))
}

/// Approve a pending request, withdrawing its stock
#[utoipa::path(
    post,
    path = "/api/v1/requests/{id}/approve",
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request approved", body = PendingRequest),
        (status = 409, description = "Decision already in flight", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "requests"
)]
pub async fn approve_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<PendingRequest> {
    let request = state.services.requests.approve(&user, &id).await?;
    Ok(Json(ApiResponse::success(request)))
}

/// Reject a pending request
#[utoipa::path(
    post,
    path = "/api/v1/requests/{id}/reject",
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request rejected", body = PendingRequest),
        (status = 409, description = "Decision already in flight", body = crate::errors::ErrorResponse)
    ),
    tag = "requests"
)]
pub async fn reject_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<PendingRequest> {
    let request = state.services.requests.reject(&user, &id).await?;
    Ok(Json(ApiResponse::success(request)))
}
