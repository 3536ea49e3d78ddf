//! In-memory store: the mock backend behind the repository traits.
//!
//! Collections are order-preserving `Vec`s behind `RwLock`s; every operation
//! first awaits the configured simulated latency (standing in for a real
//! backend round trip; tests run with zero). Record codes come from
//! per-prefix monotonic counters seeded from the highest suffix ever seen, so
//! a delete followed by an add can never regenerate a previously used code.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;

use super::{
    ConvoyRepository, FamilyRepository, InventoryRepository, RequestRepository,
    RequirementRepository, StoreError, TransactionRepository,
};
use crate::models::{
    ConvoyEvent, ConvoyRequirement, Family, InventoryItem, PendingRequest, Transaction,
};

/// A record addressable by its unique code.
trait Keyed {
    fn code(&self) -> &str;
}

impl Keyed for Family {
    fn code(&self) -> &str {
        &self.family_code
    }
}
impl Keyed for InventoryItem {
    fn code(&self) -> &str {
        &self.item_code
    }
}
impl Keyed for ConvoyEvent {
    fn code(&self) -> &str {
        &self.id
    }
}
impl Keyed for ConvoyRequirement {
    fn code(&self) -> &str {
        &self.id
    }
}
impl Keyed for PendingRequest {
    fn code(&self) -> &str {
        &self.request_id
    }
}
impl Keyed for Transaction {
    fn code(&self) -> &str {
        &self.transaction_id
    }
}

/// One order-preserving collection plus its code sequence.
struct Table<T> {
    prefix: &'static str,
    rows: RwLock<Vec<T>>,
    seq: AtomicU64,
}

impl<T: Keyed + Clone> Table<T> {
    fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            rows: RwLock::new(Vec::new()),
            seq: AtomicU64::new(0),
        }
    }

    fn list(&self) -> Vec<T> {
        self.rows.read().unwrap().clone()
    }

    fn get(&self, code: &str) -> Option<T> {
        self.rows
            .read()
            .unwrap()
            .iter()
            .find(|row| row.code() == code)
            .cloned()
    }

    fn insert(&self, row: T) -> Result<T, StoreError> {
        let mut rows = self.rows.write().unwrap();
        if rows.iter().any(|existing| existing.code() == row.code()) {
            return Err(StoreError::DuplicateCode(row.code().to_string()));
        }
        self.bump_seq(row.code());
        rows.push(row.clone());
        Ok(row)
    }

    fn update(&self, row: T) -> Result<T, StoreError> {
        let mut rows = self.rows.write().unwrap();
        match rows.iter_mut().find(|existing| existing.code() == row.code()) {
            Some(slot) => {
                *slot = row.clone();
                Ok(row)
            }
            None => Err(StoreError::NotFound(row.code().to_string())),
        }
    }

    fn remove(&self, code: &str) -> Result<T, StoreError> {
        let mut rows = self.rows.write().unwrap();
        let index = rows
            .iter()
            .position(|row| row.code() == code)
            .ok_or_else(|| StoreError::NotFound(code.to_string()))?;
        Ok(rows.remove(index))
    }

    fn replace_all(&self, new_rows: Vec<T>) {
        for row in &new_rows {
            self.bump_seq(row.code());
        }
        *self.rows.write().unwrap() = new_rows;
    }

    fn next_code(&self) -> String {
        let n = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}{:03}", self.prefix, n)
    }

    /// Keeps the sequence at or above any externally supplied suffix, so
    /// generated codes stay unique even after seeded or merged-in records.
    fn bump_seq(&self, code: &str) {
        if let Some(n) = code
            .strip_prefix(self.prefix)
            .and_then(|suffix| suffix.parse::<u64>().ok())
        {
            self.seq.fetch_max(n, Ordering::SeqCst);
        }
    }
}

/// The in-memory backend. Implements every repository trait.
pub struct InMemoryStore {
    latency: Duration,
    families: Table<Family>,
    items: Table<InventoryItem>,
    convoys: Table<ConvoyEvent>,
    requirements: Table<ConvoyRequirement>,
    requests: Table<PendingRequest>,
    transactions: Table<Transaction>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            families: Table::new("FAM"),
            items: Table::new("ITM"),
            convoys: Table::new("CONV"),
            requirements: Table::new("REQ"),
            requests: Table::new("REQ"),
            transactions: Table::new("TXN"),
        }
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    /// Liveness probe used by the health endpoint.
    pub fn ping(&self) -> bool {
        !self.families.rows.is_poisoned()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FamilyRepository for InMemoryStore {
    async fn list(&self) -> Result<Vec<Family>, StoreError> {
        self.simulate_latency().await;
        Ok(self.families.list())
    }

    async fn get(&self, code: &str) -> Result<Option<Family>, StoreError> {
        self.simulate_latency().await;
        Ok(self.families.get(code))
    }

    async fn insert(&self, family: Family) -> Result<Family, StoreError> {
        self.simulate_latency().await;
        self.families.insert(family)
    }

    async fn update(&self, family: Family) -> Result<Family, StoreError> {
        self.simulate_latency().await;
        self.families.update(family)
    }

    async fn remove(&self, code: &str) -> Result<Family, StoreError> {
        self.simulate_latency().await;
        self.families.remove(code)
    }

    async fn replace_all(&self, families: Vec<Family>) -> Result<(), StoreError> {
        self.simulate_latency().await;
        self.families.replace_all(families);
        Ok(())
    }

    async fn next_code(&self) -> Result<String, StoreError> {
        Ok(self.families.next_code())
    }
}

#[async_trait]
impl InventoryRepository for InMemoryStore {
    async fn list(&self) -> Result<Vec<InventoryItem>, StoreError> {
        self.simulate_latency().await;
        Ok(self.items.list())
    }

    async fn get(&self, code: &str) -> Result<Option<InventoryItem>, StoreError> {
        self.simulate_latency().await;
        Ok(self.items.get(code))
    }

    async fn insert(&self, item: InventoryItem) -> Result<InventoryItem, StoreError> {
        self.simulate_latency().await;
        self.items.insert(item)
    }

    async fn update(&self, item: InventoryItem) -> Result<InventoryItem, StoreError> {
        self.simulate_latency().await;
        self.items.update(item)
    }

    async fn remove(&self, code: &str) -> Result<InventoryItem, StoreError> {
        self.simulate_latency().await;
        self.items.remove(code)
    }

    async fn adjust_stock(&self, code: &str, delta: i32) -> Result<InventoryItem, StoreError> {
        self.simulate_latency().await;
        // Check and apply under one write lock so concurrent withdrawals
        // cannot both pass the sufficiency check.
        let mut rows = self.items.rows.write().unwrap();
        let item = rows
            .iter_mut()
            .find(|item| item.item_code == code)
            .ok_or_else(|| StoreError::NotFound(code.to_string()))?;
        let new_stock = item.current_stock + delta;
        if new_stock < 0 {
            return Err(StoreError::InsufficientStock {
                code: code.to_string(),
                requested: -delta,
                available: item.current_stock,
            });
        }
        item.current_stock = new_stock;
        Ok(item.clone())
    }

    async fn next_code(&self) -> Result<String, StoreError> {
        Ok(self.items.next_code())
    }
}

#[async_trait]
impl ConvoyRepository for InMemoryStore {
    async fn list(&self) -> Result<Vec<ConvoyEvent>, StoreError> {
        self.simulate_latency().await;
        Ok(self.convoys.list())
    }

    async fn get(&self, id: &str) -> Result<Option<ConvoyEvent>, StoreError> {
        self.simulate_latency().await;
        Ok(self.convoys.get(id))
    }

    async fn insert(&self, convoy: ConvoyEvent) -> Result<ConvoyEvent, StoreError> {
        self.simulate_latency().await;
        self.convoys.insert(convoy)
    }

    async fn next_code(&self) -> Result<String, StoreError> {
        Ok(self.convoys.next_code())
    }
}

#[async_trait]
impl RequirementRepository for InMemoryStore {
    async fn list(&self) -> Result<Vec<ConvoyRequirement>, StoreError> {
        self.simulate_latency().await;
        Ok(self.requirements.list())
    }

    async fn list_for_convoy(
        &self,
        convoy_id: &str,
    ) -> Result<Vec<ConvoyRequirement>, StoreError> {
        self.simulate_latency().await;
        Ok(self
            .requirements
            .list()
            .into_iter()
            .filter(|req| req.convoy_id == convoy_id)
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<ConvoyRequirement>, StoreError> {
        self.simulate_latency().await;
        Ok(self.requirements.get(id))
    }

    async fn insert(&self, req: ConvoyRequirement) -> Result<ConvoyRequirement, StoreError> {
        self.simulate_latency().await;
        self.requirements.insert(req)
    }

    async fn update(&self, req: ConvoyRequirement) -> Result<ConvoyRequirement, StoreError> {
        self.simulate_latency().await;
        self.requirements.update(req)
    }

    async fn next_code(&self) -> Result<String, StoreError> {
        Ok(self.requirements.next_code())
    }
}

#[async_trait]
impl RequestRepository for InMemoryStore {
    async fn list(&self) -> Result<Vec<PendingRequest>, StoreError> {
        self.simulate_latency().await;
        Ok(self.requests.list())
    }

    async fn get(&self, id: &str) -> Result<Option<PendingRequest>, StoreError> {
        self.simulate_latency().await;
        Ok(self.requests.get(id))
    }

    async fn insert(&self, request: PendingRequest) -> Result<PendingRequest, StoreError> {
        self.simulate_latency().await;
        self.requests.insert(request)
    }

    async fn update(&self, request: PendingRequest) -> Result<PendingRequest, StoreError> {
        self.simulate_latency().await;
        self.requests.update(request)
    }

    async fn next_code(&self) -> Result<String, StoreError> {
        Ok(self.requests.next_code())
    }
}

#[async_trait]
impl TransactionRepository for InMemoryStore {
    async fn list(&self) -> Result<Vec<Transaction>, StoreError> {
        self.simulate_latency().await;
        Ok(self.transactions.list())
    }

    async fn append(&self, txn: Transaction) -> Result<Transaction, StoreError> {
        self.simulate_latency().await;
        self.transactions.insert(txn)
    }

    async fn next_code(&self) -> Result<String, StoreError> {
        Ok(self.transactions.next_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn item(code: &str, current: i32) -> InventoryItem {
        InventoryItem {
            item_code: code.into(),
            item_name: "Blue ink pens".into(),
            storeroom: "Main storeroom".into(),
            branch: "Central branch".into(),
            team: "in_kind".into(),
            category: "stationery".into(),
            unit: "piece".into(),
            original_stock: 100,
            current_stock: current,
            outside_storeroom: 0,
            reorder_threshold: 10,
        }
    }

    #[tokio::test]
    async fn codes_stay_monotonic_after_deletions() {
        let store = InMemoryStore::new();
        let a = FamilyRepository::next_code(&store).await.unwrap();
        let b = FamilyRepository::next_code(&store).await.unwrap();
        assert_eq!(a, "FAM001");
        assert_eq!(b, "FAM002");

        FamilyRepository::insert(&store, Family::blank(&a)).await.unwrap();
        FamilyRepository::insert(&store, Family::blank(&b)).await.unwrap();
        FamilyRepository::remove(&store, &b).await.unwrap();

        // Deleting FAM002 must not let the store hand out FAM002 again.
        let c = FamilyRepository::next_code(&store).await.unwrap();
        assert_eq!(c, "FAM003");
    }

    #[tokio::test]
    async fn sequence_is_seeded_from_existing_codes() {
        let store = InMemoryStore::new();
        FamilyRepository::insert(&store, Family::blank("FAM007")).await.unwrap();
        let next = FamilyRepository::next_code(&store).await.unwrap();
        assert_eq!(next, "FAM008");
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_codes() {
        let store = InMemoryStore::new();
        FamilyRepository::insert(&store, Family::blank("FAM001")).await.unwrap();
        let err = FamilyRepository::insert(&store, Family::blank("FAM001"))
            .await
            .unwrap_err();
        assert_matches!(err, StoreError::DuplicateCode(code) if code == "FAM001");
    }

    #[tokio::test]
    async fn list_preserves_insertion_order() {
        let store = InMemoryStore::new();
        for code in ["FAM001", "FAM002", "FAM003"] {
            FamilyRepository::insert(&store, Family::blank(code)).await.unwrap();
        }
        FamilyRepository::remove(&store, "FAM001").await.unwrap();

        let codes: Vec<String> = FamilyRepository::list(&store)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.family_code)
            .collect();
        assert_eq!(codes, vec!["FAM002", "FAM003"]);
    }

    #[tokio::test]
    async fn adjust_stock_refuses_overdraw_and_leaves_record_untouched() {
        let store = InMemoryStore::new();
        InventoryRepository::insert(&store, item("ITM001", 5)).await.unwrap();

        let err = store.adjust_stock("ITM001", -10).await.unwrap_err();
        assert_matches!(
            err,
            StoreError::InsufficientStock {
                requested: 10,
                available: 5,
                ..
            }
        );
        let unchanged = InventoryRepository::get(&store, "ITM001").await.unwrap().unwrap();
        assert_eq!(unchanged.current_stock, 5);

        let updated = store.adjust_stock("ITM001", -3).await.unwrap();
        assert_eq!(updated.current_stock, 2);
        let receipt = store.adjust_stock("ITM001", 8).await.unwrap();
        assert_eq!(receipt.current_stock, 10);
    }

    #[tokio::test]
    async fn unknown_codes_are_not_found() {
        let store = InMemoryStore::new();
        assert!(FamilyRepository::get(&store, "FAM999").await.unwrap().is_none());
        assert_matches!(
            FamilyRepository::remove(&store, "FAM999").await.unwrap_err(),
            StoreError::NotFound(_)
        );
        assert_matches!(
            store.adjust_stock("ITM404", 1).await.unwrap_err(),
            StoreError::NotFound(_)
        );
    }
}
