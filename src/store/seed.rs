//! Demo dataset loaded at startup when `seed_demo_data` is enabled, mirroring
//! what a freshly provisioned operation looks like: two registered families,
//! a stocked main storeroom, one convoy in planning with open requirements,
//! and a short movement history.

use chrono::{Days, Duration, Utc};

use super::memory::InMemoryStore;
use super::{
    ConvoyRepository, FamilyRepository, InventoryRepository, RequestRepository,
    RequirementRepository, StoreError, TransactionRepository,
};
use crate::auth::{Role, User, UserAccount};
use crate::models::{
    AidType, Committee, ConvoyEvent, ConvoyRequirement, ConvoyStatus, Family, InventoryItem,
    PendingRequest, Priority, RequestStatus, RequirementStatus, Transaction, TransactionType,
};

pub const DEMO_PASSWORD: &str = "123456";

/// Demo login accounts: one storeroom manager, one committee member.
pub fn demo_accounts() -> Vec<UserAccount> {
    vec![
        UserAccount::new(
            User {
                email: "manager@relief.example".into(),
                name: "Amal Haddad".into(),
                role: Role::Administrator,
                storeroom: "STR001".into(),
                committee: None,
            },
            DEMO_PASSWORD,
        ),
        UserAccount::new(
            User {
                email: "member@relief.example".into(),
                name: "Farah Aziz".into(),
                role: Role::CommitteeMember,
                storeroom: "STR001".into(),
                committee: Some(Committee::InKind),
            },
            DEMO_PASSWORD,
        ),
    ]
}

pub fn demo_families() -> Vec<Family> {
    vec![
        Family {
            family_code: "FAM001".into(),
            area: "Northern district".into(),
            guide: "Ahmad Mansour".into(),
            name: "Salem family".into(),
            national_id: "1234567890".into(),
            phone: "0501234567".into(),
            family_size: 5,
            aid_type: Some(AidType::WashingMachine),
            committee: Some(Committee::InKind),
        },
        Family {
            family_code: "FAM002".into(),
            area: "Southern district".into(),
            guide: "Fatima Khalil".into(),
            name: "Zahrani family".into(),
            national_id: "9876543210".into(),
            phone: "0507654321".into(),
            family_size: 7,
            aid_type: Some(AidType::Meals),
            committee: Some(Committee::Catering),
        },
    ]
}

pub fn demo_inventory() -> Vec<InventoryItem> {
    vec![
        InventoryItem {
            item_code: "ITM001".into(),
            item_name: "A4 notebooks".into(),
            storeroom: "Main storeroom".into(),
            branch: "Central branch".into(),
            team: "in_kind".into(),
            category: "stationery".into(),
            unit: "piece".into(),
            original_stock: 100,
            current_stock: 50,
            outside_storeroom: 10,
            reorder_threshold: 20,
        },
        InventoryItem {
            item_code: "ITM002".into(),
            item_name: "Blue ink pens".into(),
            storeroom: "Main storeroom".into(),
            branch: "Central branch".into(),
            team: "in_kind".into(),
            category: "stationery".into(),
            unit: "piece".into(),
            original_stock: 150,
            current_stock: 100,
            outside_storeroom: 25,
            reorder_threshold: 30,
        },
        InventoryItem {
            item_code: "ITM003".into(),
            item_name: "Office scissors".into(),
            storeroom: "Main storeroom".into(),
            branch: "Central branch".into(),
            team: "in_kind".into(),
            category: "tools".into(),
            unit: "piece".into(),
            original_stock: 20,
            current_stock: 5,
            outside_storeroom: 2,
            reorder_threshold: 10,
        },
        InventoryItem {
            item_code: "ITM004".into(),
            item_name: "Winter blankets".into(),
            storeroom: "Branch storeroom".into(),
            branch: "Northern branch".into(),
            team: "clothing".into(),
            category: "textiles".into(),
            unit: "piece".into(),
            original_stock: 80,
            current_stock: 0,
            outside_storeroom: 60,
            reorder_threshold: 15,
        },
    ]
}

pub fn demo_convoys() -> Vec<ConvoyEvent> {
    let today = Utc::now().date_naive();
    vec![
        ConvoyEvent {
            id: "CONV001".into(),
            name: "Northern relief convoy".into(),
            date: today + Days::new(14),
            location: "Northern district".into(),
            status: ConvoyStatus::Planning,
            description: Some("Full relief convoy for the northern district".into()),
            organizer: "Ahmad Mansour".into(),
            committees: vec![Committee::InKind, Committee::Catering, Committee::Clothing],
        },
        ConvoyEvent {
            id: "CONV002".into(),
            name: "Ramadan charity convoy".into(),
            date: today - Days::new(30),
            location: "Southern district".into(),
            status: ConvoyStatus::Completed,
            description: Some("Seasonal food distribution".into()),
            organizer: "Fatima Khalil".into(),
            committees: vec![Committee::Catering, Committee::InKind],
        },
    ]
}

pub fn demo_requirements() -> Vec<ConvoyRequirement> {
    let today = Utc::now().date_naive();
    vec![
        ConvoyRequirement {
            id: "REQ001".into(),
            convoy_id: "CONV001".into(),
            committee: Committee::Clothing,
            item_type: "Winter blankets".into(),
            quantity: 100,
            priority: Priority::High,
            description: Some("Blankets for children and adults".into()),
            status: RequirementStatus::Pending,
            requested_by: "Clothing committee".into(),
            request_date: today - Days::new(2),
            approved_by: None,
            approval_date: None,
            notes: None,
        },
        ConvoyRequirement {
            id: "REQ002".into(),
            convoy_id: "CONV001".into(),
            committee: Committee::Catering,
            item_type: "Ready meals".into(),
            quantity: 200,
            priority: Priority::Urgent,
            description: Some("Hot meals ready for distribution".into()),
            status: RequirementStatus::Approved,
            requested_by: "Catering committee".into(),
            request_date: today - Days::new(4),
            approved_by: Some("Amal Haddad".into()),
            approval_date: Some(today - Days::new(3)),
            notes: None,
        },
    ]
}

pub fn demo_requests() -> Vec<PendingRequest> {
    let now = Utc::now();
    vec![
        PendingRequest {
            request_id: "REQ001".into(),
            branch: "Central branch".into(),
            committee: Committee::InKind,
            item_code: "ITM001".into(),
            item_name: "A4 notebooks".into(),
            requested_quantity: 20,
            storeroom: "Main storeroom".into(),
            date: now - Duration::hours(3),
            requestor: "member@relief.example".into(),
            is_urgent: false,
            status: RequestStatus::Pending,
        },
        PendingRequest {
            request_id: "REQ002".into(),
            branch: "Northern branch".into(),
            committee: Committee::Clothing,
            item_code: "ITM004".into(),
            item_name: "Winter blankets".into(),
            requested_quantity: 5,
            storeroom: "Branch storeroom".into(),
            date: now - Duration::hours(5),
            requestor: "member@relief.example".into(),
            is_urgent: true,
            status: RequestStatus::Pending,
        },
    ]
}

pub fn demo_transactions() -> Vec<Transaction> {
    let now = Utc::now();
    vec![
        Transaction {
            transaction_id: "TXN001".into(),
            storeroom: "Main storeroom".into(),
            transaction_type: TransactionType::Withdrawal,
            team: "in_kind".into(),
            team_leader: "Ahmad Mansour".into(),
            item_code: "ITM002".into(),
            item_name: "Blue ink pens".into(),
            date_time: now - Duration::hours(20),
            manager: "manager@relief.example".into(),
            quantity: 15,
        },
        Transaction {
            transaction_id: "TXN002".into(),
            storeroom: "Main storeroom".into(),
            transaction_type: TransactionType::Receipt,
            team: "in_kind".into(),
            team_leader: "Fatima Khalil".into(),
            item_code: "ITM001".into(),
            item_name: "A4 notebooks".into(),
            date_time: now - Duration::hours(26),
            manager: "manager@relief.example".into(),
            quantity: 20,
        },
    ]
}

/// Loads the full demo dataset into the store.
pub async fn seed_demo_data(store: &InMemoryStore) -> Result<(), StoreError> {
    for family in demo_families() {
        FamilyRepository::insert(store, family).await?;
    }
    for item in demo_inventory() {
        InventoryRepository::insert(store, item).await?;
    }
    for convoy in demo_convoys() {
        ConvoyRepository::insert(store, convoy).await?;
    }
    for requirement in demo_requirements() {
        RequirementRepository::insert(store, requirement).await?;
    }
    for request in demo_requests() {
        RequestRepository::insert(store, request).await?;
    }
    for txn in demo_transactions() {
        TransactionRepository::append(store, txn).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_data_seeds_cleanly() {
        let store = InMemoryStore::new();
        seed_demo_data(&store).await.unwrap();

        assert_eq!(FamilyRepository::list(&store).await.unwrap().len(), 2);
        assert_eq!(InventoryRepository::list(&store).await.unwrap().len(), 4);
        assert_eq!(ConvoyRepository::list(&store).await.unwrap().len(), 2);

        // Sequences continue past the seeded codes.
        assert_eq!(
            FamilyRepository::next_code(&store).await.unwrap(),
            "FAM003"
        );
        assert_eq!(
            InventoryRepository::next_code(&store).await.unwrap(),
            "ITM005"
        );
    }
}
