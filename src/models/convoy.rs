use chrono::NaiveDate;
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
pub enum ConvoyStatus {
    Planning,
    Active,
    Completed,
    Cancelled,
}

impl ConvoyStatus {
    /// Requirements may only be submitted while the convoy is still being
    /// organized or is underway.
    pub fn accepts_requirements(self) -> bool {
        matches!(self, ConvoyStatus::Planning | ConvoyStatus::Active)
    }
}

/// A planned relief-distribution event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConvoyEvent {
    /// Unique, store-generated (`CONV` + zero-padded sequence).
    pub id: String,
    pub name: String,
    pub date: NaiveDate,
    pub location: String,
    pub status: ConvoyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub organizer: String,
    /// Committees participating in the convoy.
    pub committees: Vec<Committee>,
}

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
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

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
pub enum RequirementStatus {
    Pending,
    Approved,
    Rejected,
    Fulfilled,
}

impl RequirementStatus {
    /// `pending -> approved | rejected`, `approved -> fulfilled`. Nothing
    /// transitions back.
    pub fn can_transition_to(self, next: RequirementStatus) -> bool {
        matches!(
            (self, next),
            (RequirementStatus::Pending, RequirementStatus::Approved)
                | (RequirementStatus::Pending, RequirementStatus::Rejected)
                | (RequirementStatus::Approved, RequirementStatus::Fulfilled)
        )
    }
}

/// An itemized need a committee has registered against a convoy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConvoyRequirement {
    /// Unique, store-generated (`REQ` + zero-padded sequence).
    pub id: String,
    pub convoy_id: String,
    pub committee: Committee,
    /// Matched against inventory item names when the requirement is decided.
    pub item_type: String,
    pub quantity: i32,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: RequirementStatus,
    pub requested_by: String,
    pub request_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
