use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use super::{parse_param, sentinel};
use crate::auth::CurrentUser;
use crate::errors::ServiceError;
use crate::filters::TransactionFilter;
use crate::models::Transaction;
use crate::store::TransactionRepository;
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct TransactionQuery {
    /// Case-insensitive substring match on id, item, and team
    pub search: Option<String>,
    /// Storeroom filter; "all" or absent disables it
    pub storeroom: Option<String>,
    /// Movement type (withdrawal/receipt); "all" or absent disables it
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
}

fn filter_from_query(query: TransactionQuery) -> Result<TransactionFilter, ServiceError> {
    Ok(TransactionFilter {
        search: sentinel(query.search),
        storeroom: sentinel(query.storeroom),
        transaction_type: parse_param("type", query.transaction_type)?,
    })
}

/// The stock movement audit log, filtered
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    params(TransactionQuery),
    responses(
        (status = 200, description = "Transactions returned"),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "transactions"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<TransactionQuery>,
) -> ApiResult<Vec<Transaction>> {
    let filter = filter_from_query(query)?;
    let transactions = TransactionRepository::list(state.store.as_ref())
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(ApiResponse::success(
        transactions
            .into_iter()
            .filter(|txn| filter.matches(txn))
            .collect(),
    )))
}
