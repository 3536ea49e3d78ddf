use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

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
pub enum TransactionType {
    Withdrawal,
    Receipt,
}

/// Immutable audit record of a completed stock movement. Appended by the
/// inventory service; never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Unique, store-generated (`TXN` + zero-padded sequence).
    pub transaction_id: String,
    pub storeroom: String,
    pub transaction_type: TransactionType,
    pub team: String,
    pub team_leader: String,
    pub item_code: String,
    pub item_name: String,
    pub date_time: DateTime<Utc>,
    /// Email of the manager who carried out the movement.
    pub manager: String,
    pub quantity: i32,
}
