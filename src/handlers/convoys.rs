use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::parse_param;
use crate::auth::CurrentUser;
use crate::errors::ServiceError;
use crate::filters::RequirementFilter;
use crate::models::{ConvoyEvent, ConvoyRequirement};
use crate::services::convoys::{NewConvoy, NewRequirement};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct RequirementQuery {
    /// Status filter; "all" or absent disables it
    pub status: Option<String>,
    /// Committee filter; "all" or absent disables it
    pub committee: Option<String>,
    /// Restrict to one convoy
    pub convoy_id: Option<String>,
}

fn filter_from_query(query: RequirementQuery) -> Result<RequirementFilter, ServiceError> {
    Ok(RequirementFilter {
        status: parse_param("status", query.status)?,
        committee: parse_param("committee", query.committee)?,
        convoy_id: super::sentinel(query.convoy_id),
    })
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConvoyDetail {
    #[serde(flatten)]
    pub convoy: ConvoyEvent,
    pub requirements: Vec<ConvoyRequirement>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectRequirement {
    /// Recorded into the requirement's notes
    pub reason: Option<String>,
}

/// List convoy events
#[utoipa::path(
    get,
    path = "/api/v1/convoys",
    responses(
        (status = 200, description = "Convoys returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "convoys"
)]
pub async fn list_convoys(State(state): State<AppState>) -> ApiResult<Vec<ConvoyEvent>> {
    let convoys = state.services.convoys.list_convoys().await?;
    Ok(Json(ApiResponse::success(convoys)))
}

/// Plan a new convoy
#[utoipa::path(
    post,
    path = "/api/v1/convoys",
    request_body = NewConvoy,
    responses(
        (status = 201, description = "Convoy created", body = ConvoyEvent),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "convoys"
)]
pub async fn create_convoy(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<NewConvoy>,
) -> Result<impl IntoResponse, ServiceError> {
    let convoy = state.services.convoys.create_convoy(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(convoy))))
}

/// A convoy with its requirements, scoped to the caller
#[utoipa::path(
    get,
    path = "/api/v1/convoys/{id}",
    params(("id" = String, Path, description = "Convoy id")),
    responses(
        (status = 200, description = "Convoy returned", body = ConvoyDetail),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "convoys"
)]
pub async fn get_convoy(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<ConvoyDetail> {
    let convoy = state.services.convoys.get_convoy(&id).await?;
    let requirements = state
        .services
        .convoys
        .requirements_for_convoy(&user, &id)
        .await?;
    Ok(Json(ApiResponse::success(ConvoyDetail {
        convoy,
        requirements,
    })))
}

/// Requirements of one convoy, scoped to the caller
#[utoipa::path(
    get,
    path = "/api/v1/convoys/{id}/requirements",
    params(("id" = String, Path, description = "Convoy id")),
    responses(
        (status = 200, description = "Requirements returned"),
        (status = 404, description = "Convoy not found", body = crate::errors::ErrorResponse)
    ),
    tag = "convoys"
)]
pub async fn list_convoy_requirements(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Vec<ConvoyRequirement>> {
    let requirements = state
        .services
        .convoys
        .requirements_for_convoy(&user, &id)
        .await?;
    Ok(Json(ApiResponse::success(requirements)))
}

/// Register a requirement against a convoy
#[utoipa::path(
    post,
    path = "/api/v1/convoys/{id}/requirements",
    params(("id" = String, Path, description = "Convoy id")),
    request_body = NewRequirement,
    responses(
        (status = 201, description = "Requirement submitted", body = ConvoyRequirement),
        (status = 400, description = "Validation failed or convoy closed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Convoy not found", body = crate::errors::ErrorResponse)
    ),
    tag = "convoys"
)]
pub async fn submit_requirement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<NewRequirement>,
) -> Result<impl IntoResponse, ServiceError> {
    let requirement = state
        .services
        .convoys
        .submit_requirement(&user, &id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(requirement))))
}

/// List requirements across convoys, scoped to the caller
#[utoipa::path(
    get,
    path = "/api/v1/requirements",
    params(RequirementQuery),
    responses(
        (status = 200, description = "Requirements returned"),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "convoys"
)]
pub async fn list_requirements(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<RequirementQuery>,
) -> ApiResult<Vec<ConvoyRequirement>> {
    let filter = filter_from_query(query)?;
    let requirements = state
        .services
        .convoys
        .list_requirements(&user, &filter)
        .await?;
    Ok(Json(ApiResponse::success(requirements)))
}

/// Approve a pending requirement (refused if stock is short)
#[utoipa::path(
    post,
    path = "/api/v1/requirements/{id}/approve",
    params(("id" = String, Path, description = "Requirement id")),
    responses(
        (status = 200, description = "Requirement approved", body = ConvoyRequirement),
        (status = 409, description = "Decision already in flight", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "convoys"
)]
pub async fn approve_requirement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<ConvoyRequirement> {
    let requirement = state
        .services
        .convoys
        .approve_requirement(&user, &id)
        .await?;
    Ok(Json(ApiResponse::success(requirement)))
}

/// Reject a pending requirement
#[utoipa::path(
    post,
    path = "/api/v1/requirements/{id}/reject",
    params(("id" = String, Path, description = "Requirement id")),
    request_body = RejectRequirement,
    responses(
        (status = 200, description = "Requirement rejected", body = ConvoyRequirement),
        (status = 409, description = "Decision already in flight", body = crate::errors::ErrorResponse)
    ),
    tag = "convoys"
)]
pub async fn reject_requirement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<RejectRequirement>,
) -> ApiResult<ConvoyRequirement> {
    let requirement = state
        .services
        .convoys
        .reject_requirement(&user, &id, payload.reason)
        .await?;
    Ok(Json(ApiResponse::success(requirement)))
}

/// Fulfil an approved requirement, withdrawing its stock
#[utoipa::path(
    post,
    path = "/api/v1/requirements/{id}/fulfill",
    params(("id" = String, Path, description = "Requirement id")),
    responses(
        (status = 200, description = "Requirement fulfilled", body = ConvoyRequirement),
        (status = 400, description = "Not approved yet", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "convoys"
)]
pub async fn fulfill_requirement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<ConvoyRequirement> {
    let requirement = state
        .services
        .convoys
        .fulfill_requirement(&user, &id)
        .await?;
    Ok(Json(ApiResponse::success(requirement)))
}
