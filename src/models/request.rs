use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::family::Committee;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn is_decided(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

/// A stock-withdrawal request awaiting a storeroom manager's decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PendingRequest {
    /// Unique, store-generated (`REQ` + zero-padded sequence).
    pub request_id: String,
    pub branch: String,
    pub committee: Committee,
    pub item_code: String,
    pub item_name: String,
    pub requested_quantity: i32,
    pub storeroom: String,
    pub date: DateTime<Utc>,
    /// Email of the member who submitted the request.
    pub requestor: String,
    pub is_urgent: bool,
    pub status: RequestStatus,
}
