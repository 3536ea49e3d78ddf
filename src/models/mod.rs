pub mod convoy;
pub mod family;
pub mod inventory;
pub mod request;
pub mod transaction;

pub use convoy::{ConvoyEvent, ConvoyRequirement, ConvoyStatus, Priority, RequirementStatus};
pub use family::{AidType, Committee, Family, FamilyField};
pub use inventory::{InventoryField, InventoryItem, StockStatus};
pub use request::{PendingRequest, RequestStatus};
pub use transaction::{Transaction, TransactionType};
