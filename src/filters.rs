//! Filter/search layer: pure predicates over full record collections.
//!
//! Free-text filters match by case-insensitive substring containment across
//! designated fields; categorical filters are equality checks where `None`
//! (the "all" sentinel) bypasses the predicate. Multiple filters combine with
//! logical AND. Filtering is recomputed eagerly per call and preserves the
//! input order; no memoization is needed at these data volumes.

use crate::models::{
    AidType, Committee, Family, InventoryItem, PendingRequest, RequirementStatus, StockStatus,
    Transaction, TransactionType,
};

/// Case-insensitive substring containment across any of `fields`.
/// An empty or whitespace needle matches everything.
pub fn text_matches(needle: &str, fields: &[&str]) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    fields
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// Categorical equality with the `all` sentinel: `None` matches everything.
pub fn category_matches<T: PartialEq>(selected: Option<&T>, actual: &T) -> bool {
    selected.map_or(true, |wanted| wanted == actual)
}

#[derive(Debug, Clone, Default)]
pub struct FamilyFilter {
    pub search: Option<String>,
    pub committee: Option<Committee>,
    pub aid_type: Option<AidType>,
    pub area: Option<String>,
}

impl FamilyFilter {
    pub fn matches(&self, family: &Family) -> bool {
        let search_ok = self.search.as_deref().map_or(true, |needle| {
            text_matches(
                needle,
                &[
                    &family.family_code,
                    &family.name,
                    &family.guide,
                    &family.national_id,
                    &family.phone,
                ],
            )
        });
        let committee_ok = family
            .committee
            .map_or(self.committee.is_none(), |c| {
                category_matches(self.committee.as_ref(), &c)
            });
        let aid_ok = family
            .aid_type
            .map_or(self.aid_type.is_none(), |a| {
                category_matches(self.aid_type.as_ref(), &a)
            });
        let area_ok = self
            .area
            .as_deref()
            .map_or(true, |area| family.area.eq_ignore_ascii_case(area));
        search_ok && committee_ok && aid_ok && area_ok
    }

    pub fn apply(&self, families: Vec<Family>) -> Vec<Family> {
        families.into_iter().filter(|f| self.matches(f)).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct InventoryFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub storeroom: Option<String>,
    pub status: Option<StockStatus>,
}

impl InventoryFilter {
    pub fn matches(&self, item: &InventoryItem) -> bool {
        let search_ok = self.search.as_deref().map_or(true, |needle| {
            text_matches(needle, &[&item.item_code, &item.item_name])
        });
        let category_ok = self
            .category
            .as_deref()
            .map_or(true, |c| item.category.eq_ignore_ascii_case(c));
        let storeroom_ok = self
            .storeroom
            .as_deref()
            .map_or(true, |s| item.storeroom.eq_ignore_ascii_case(s));
        let status_ok = category_matches(self.status.as_ref(), &item.stock_status());
        search_ok && category_ok && storeroom_ok && status_ok
    }

    pub fn apply(&self, items: Vec<InventoryItem>) -> Vec<InventoryItem> {
        items.into_iter().filter(|i| self.matches(i)).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequirementFilter {
    pub status: Option<RequirementStatus>,
    pub committee: Option<Committee>,
    pub convoy_id: Option<String>,
}

impl RequirementFilter {
    pub fn matches(&self, req: &crate::models::ConvoyRequirement) -> bool {
        category_matches(self.status.as_ref(), &req.status)
            && category_matches(self.committee.as_ref(), &req.committee)
            && self
                .convoy_id
                .as_deref()
                .map_or(true, |id| req.convoy_id == id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub search: Option<String>,
    pub committee: Option<Committee>,
    pub urgent_only: bool,
}

impl RequestFilter {
    pub fn matches(&self, req: &PendingRequest) -> bool {
        let search_ok = self.search.as_deref().map_or(true, |needle| {
            text_matches(
                needle,
                &[&req.request_id, &req.item_code, &req.item_name, &req.branch],
            )
        });
        search_ok
            && category_matches(self.committee.as_ref(), &req.committee)
            && (!self.urgent_only || req.is_urgent)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub search: Option<String>,
    pub storeroom: Option<String>,
    pub transaction_type: Option<TransactionType>,
}

impl TransactionFilter {
    pub fn matches(&self, txn: &Transaction) -> bool {
        let search_ok = self.search.as_deref().map_or(true, |needle| {
            text_matches(
                needle,
                &[&txn.transaction_id, &txn.item_code, &txn.item_name, &txn.team],
            )
        });
        search_ok
            && self
                .storeroom
                .as_deref()
                .map_or(true, |s| txn.storeroom.eq_ignore_ascii_case(s))
            && category_matches(self.transaction_type.as_ref(), &txn.transaction_type)
    }
}
