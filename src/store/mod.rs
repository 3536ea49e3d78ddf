//! Repository layer.
//!
//! Every collection is reached through a trait so the in-memory store (the
//! only implementation in scope) can be swapped for a database-backed one
//! without touching the service layer. All operations address records by
//! their unique code; collection order is preserved across reads.

use async_trait::async_trait;
use thiserror::Error;

use crate::errors::ServiceError;
use crate::models::{
    ConvoyEvent, ConvoyRequirement, Family, InventoryItem, PendingRequest, Transaction,
};

pub mod memory;
pub mod seed;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("duplicate code: {0}")]
    DuplicateCode(String),
    #[error("insufficient stock for {code}: requested {requested}, available {available}")]
    InsufficientStock {
        code: String,
        requested: i32,
        available: i32,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => ServiceError::NotFound(msg),
            StoreError::DuplicateCode(code) => {
                ServiceError::ValidationError(format!("duplicate code: {code}"))
            }
            StoreError::InsufficientStock { .. } => {
                ServiceError::InsufficientStock(err.to_string())
            }
            StoreError::Unavailable(msg) => ServiceError::StoreError(msg),
        }
    }
}

#[async_trait]
pub trait FamilyRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Family>, StoreError>;
    async fn get(&self, code: &str) -> Result<Option<Family>, StoreError>;
    async fn insert(&self, family: Family) -> Result<Family, StoreError>;
    async fn update(&self, family: Family) -> Result<Family, StoreError>;
    async fn remove(&self, code: &str) -> Result<Family, StoreError>;
    /// Replaces the whole collection. Callers are responsible for having
    /// merged role-scoped subsets back into the full collection first.
    async fn replace_all(&self, families: Vec<Family>) -> Result<(), StoreError>;
    async fn next_code(&self) -> Result<String, StoreError>;
}

#[async_trait]
pub trait InventoryRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<InventoryItem>, StoreError>;
    async fn get(&self, code: &str) -> Result<Option<InventoryItem>, StoreError>;
    async fn insert(&self, item: InventoryItem) -> Result<InventoryItem, StoreError>;
    async fn update(&self, item: InventoryItem) -> Result<InventoryItem, StoreError>;
    async fn remove(&self, code: &str) -> Result<InventoryItem, StoreError>;
    /// Applies a stock delta atomically. A withdrawal that would take the
    /// current stock below zero is refused with
    /// [`StoreError::InsufficientStock`] and leaves the record untouched.
    async fn adjust_stock(&self, code: &str, delta: i32) -> Result<InventoryItem, StoreError>;
    async fn next_code(&self) -> Result<String, StoreError>;
}

#[async_trait]
pub trait ConvoyRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<ConvoyEvent>, StoreError>;
    async fn get(&self, id: &str) -> Result<Option<ConvoyEvent>, StoreError>;
    async fn insert(&self, convoy: ConvoyEvent) -> Result<ConvoyEvent, StoreError>;
    async fn next_code(&self) -> Result<String, StoreError>;
}

#[async_trait]
pub trait RequirementRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<ConvoyRequirement>, StoreError>;
    async fn list_for_convoy(&self, convoy_id: &str)
        -> Result<Vec<ConvoyRequirement>, StoreError>;
    async fn get(&self, id: &str) -> Result<Option<ConvoyRequirement>, StoreError>;
    async fn insert(&self, req: ConvoyRequirement) -> Result<ConvoyRequirement, StoreError>;
    async fn update(&self, req: ConvoyRequirement) -> Result<ConvoyRequirement, StoreError>;
    async fn next_code(&self) -> Result<String, StoreError>;
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<PendingRequest>, StoreError>;
    async fn get(&self, id: &str) -> Result<Option<PendingRequest>, StoreError>;
    async fn insert(&self, request: PendingRequest) -> Result<PendingRequest, StoreError>;
    async fn update(&self, request: PendingRequest) -> Result<PendingRequest, StoreError>;
    async fn next_code(&self) -> Result<String, StoreError>;
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Transaction>, StoreError>;
    /// The transaction log is append-only.
    async fn append(&self, txn: Transaction) -> Result<Transaction, StoreError>;
    async fn next_code(&self) -> Result<String, StoreError>;
}
