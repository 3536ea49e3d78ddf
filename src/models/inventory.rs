use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::grid::{FieldKind, FieldValue, GridError, GridRecord};

/// Derived stock band for an item, relative to its reorder threshold.
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
pub enum StockStatus {
    Out,
    Low,
    Medium,
    Available,
}

/// An inventory item held in a storeroom.
///
/// Intended invariant: `current_stock + outside_storeroom <= original_stock`.
/// Status is never stored; it is derived from the current stock via
/// [`stock_status`].
///
/// [`stock_status`]: InventoryItem::stock_status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InventoryItem {
    /// Unique, store-generated (`ITM` + zero-padded sequence).
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
}

impl InventoryItem {
    /// 0 is out; at or below the threshold is low; at or below twice the
    /// threshold is medium; anything above is available.
    pub fn stock_status(&self) -> StockStatus {
        if self.current_stock == 0 {
            StockStatus::Out
        } else if self.current_stock <= self.reorder_threshold {
            StockStatus::Low
        } else if self.current_stock <= self.reorder_threshold * 2 {
            StockStatus::Medium
        } else {
            StockStatus::Available
        }
    }

    pub fn stock_invariant_holds(&self) -> bool {
        self.current_stock + self.outside_storeroom <= self.original_stock
    }

    /// Flagged for replenishment: at or below the reorder threshold.
    pub fn needs_reorder(&self) -> bool {
        self.current_stock <= self.reorder_threshold
    }
}

/// Editable columns of the inventory grid.
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
pub enum InventoryField {
    ItemName,
    Storeroom,
    Branch,
    Team,
    Category,
    Unit,
    OriginalStock,
    CurrentStock,
    OutsideStoreroom,
    ReorderThreshold,
}

impl GridRecord for InventoryItem {
    type Field = InventoryField;

    fn field_kind(field: InventoryField) -> FieldKind {
        match field {
            InventoryField::OriginalStock
            | InventoryField::CurrentStock
            | InventoryField::OutsideStoreroom
            | InventoryField::ReorderThreshold => FieldKind::Integer { default: 1 },
            _ => FieldKind::Text,
        }
    }

    fn cell(&self, field: InventoryField) -> String {
        match field {
            InventoryField::ItemName => self.item_name.clone(),
            InventoryField::Storeroom => self.storeroom.clone(),
            InventoryField::Branch => self.branch.clone(),
            InventoryField::Team => self.team.clone(),
            InventoryField::Category => self.category.clone(),
            InventoryField::Unit => self.unit.clone(),
            InventoryField::OriginalStock => self.original_stock.to_string(),
            InventoryField::CurrentStock => self.current_stock.to_string(),
            InventoryField::OutsideStoreroom => self.outside_storeroom.to_string(),
            InventoryField::ReorderThreshold => self.reorder_threshold.to_string(),
        }
    }

    fn apply(&mut self, field: InventoryField, value: FieldValue) -> Result<(), GridError> {
        match (field, value) {
            (InventoryField::ItemName, FieldValue::Text(s)) => self.item_name = s,
            (InventoryField::Storeroom, FieldValue::Text(s)) => self.storeroom = s,
            (InventoryField::Branch, FieldValue::Text(s)) => self.branch = s,
            (InventoryField::Team, FieldValue::Text(s)) => self.team = s,
            (InventoryField::Category, FieldValue::Text(s)) => self.category = s,
            (InventoryField::Unit, FieldValue::Text(s)) => self.unit = s,
            (InventoryField::OriginalStock, FieldValue::Integer(n)) => {
                self.original_stock = clamp_stock(n)
            }
            (InventoryField::CurrentStock, FieldValue::Integer(n)) => {
                self.current_stock = clamp_stock(n)
            }
            (InventoryField::OutsideStoreroom, FieldValue::Integer(n)) => {
                self.outside_storeroom = clamp_stock(n)
            }
            (InventoryField::ReorderThreshold, FieldValue::Integer(n)) => {
                self.reorder_threshold = clamp_stock(n)
            }
            _ => unreachable!("field kind and value always agree"),
        }
        Ok(())
    }
}

fn clamp_stock(n: i64) -> i32 {
    n.clamp(0, i32::MAX as i64) as i32
}
