use serde::{Deserialize, Serialize};
use strum::VariantNames;
use utoipa::ToSchema;

use crate::grid::{FieldKind, FieldValue, GridError, GridRecord};

/// A committee owns a subset of family and inventory records; members can only
/// act within their own committee unless they are administrators.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Committee {
    InKind,
    Catering,
    Clothing,
    Furniture,
}

/// The kind of aid a family is registered for.
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
    strum::VariantNames,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AidType {
    WashingMachine,
    Refrigerator,
    Meals,
    Clothing,
    Appliances,
    Furniture,
    Foodstuffs,
}

/// A registered aid-recipient family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Family {
    /// Unique, store-generated (`FAM` + zero-padded sequence). Not editable:
    /// it is the merge key for bulk updates.
    pub family_code: String,
    pub area: String,
    pub guide: String,
    pub name: String,
    pub national_id: String,
    pub phone: String,
    pub family_size: u32,
    pub aid_type: Option<AidType>,
    pub committee: Option<Committee>,
}

impl Family {
    /// A fresh row as the add-row operation creates it: blank fields and a
    /// family size of 1.
    pub fn blank(family_code: impl Into<String>) -> Self {
        Self {
            family_code: family_code.into(),
            area: String::new(),
            guide: String::new(),
            name: String::new(),
            national_id: String::new(),
            phone: String::new(),
            family_size: 1,
            aid_type: None,
            committee: None,
        }
    }
}

/// Editable columns of the family grid.
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
pub enum FamilyField {
    Area,
    Guide,
    Name,
    NationalId,
    Phone,
    FamilySize,
    AidType,
    Committee,
}

impl GridRecord for Family {
    type Field = FamilyField;

    fn field_kind(field: FamilyField) -> FieldKind {
        match field {
            FamilyField::FamilySize => FieldKind::Integer { default: 1 },
            FamilyField::AidType => FieldKind::Choice(AidType::VARIANTS),
            FamilyField::Committee => FieldKind::Choice(Committee::VARIANTS),
            _ => FieldKind::Text,
        }
    }

    fn cell(&self, field: FamilyField) -> String {
        match field {
            FamilyField::Area => self.area.clone(),
            FamilyField::Guide => self.guide.clone(),
            FamilyField::Name => self.name.clone(),
            FamilyField::NationalId => self.national_id.clone(),
            FamilyField::Phone => self.phone.clone(),
            FamilyField::FamilySize => self.family_size.to_string(),
            FamilyField::AidType => self.aid_type.map(|a| a.to_string()).unwrap_or_default(),
            FamilyField::Committee => self.committee.map(|c| c.to_string()).unwrap_or_default(),
        }
    }

    fn apply(&mut self, field: FamilyField, value: FieldValue) -> Result<(), GridError> {
        match (field, value) {
            (FamilyField::Area, FieldValue::Text(s)) => self.area = s,
            (FamilyField::Guide, FieldValue::Text(s)) => self.guide = s,
            (FamilyField::Name, FieldValue::Text(s)) => self.name = s,
            (FamilyField::NationalId, FieldValue::Text(s)) => self.national_id = s,
            (FamilyField::Phone, FieldValue::Text(s)) => self.phone = s,
            (FamilyField::FamilySize, FieldValue::Integer(n)) => {
                // Family size is a positive integer.
                self.family_size = n.clamp(1, u32::MAX as i64) as u32;
            }
            (FamilyField::AidType, FieldValue::Text(s)) => {
                self.aid_type = parse_choice(&s)?;
            }
            (FamilyField::Committee, FieldValue::Text(s)) => {
                self.committee = parse_choice(&s)?;
            }
            _ => unreachable!("field kind and value always agree"),
        }
        Ok(())
    }
}

fn parse_choice<T: std::str::FromStr>(raw: &str) -> Result<Option<T>, GridError> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| GridError::InvalidChoice {
            value: raw.to_string(),
        })
}
