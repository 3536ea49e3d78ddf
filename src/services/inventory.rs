use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use slog::Logger;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::User;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::filters::InventoryFilter;
use crate::grid::GridSession;
use crate::models::{InventoryField, InventoryItem, Transaction, TransactionType};
use crate::notifications::{NotificationBuilder, NotificationService};
use crate::store::{InventoryRepository, StoreError, TransactionRepository};

/// Payload for creating an inventory item. The code is store-generated.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewInventoryItem {
    #[validate(length(min = 1))]
    pub item_name: String,
    #[validate(length(min = 1))]
    pub storeroom: String,
    pub branch: String,
    pub team: String,
    pub category: String,
    pub unit: String,
    #[validate(range(min = 0))]
    pub original_stock: i32,
    #[validate(range(min = 0))]
    pub current_stock: i32,
    #[validate(range(min = 0))]
    pub outside_storeroom: i32,
    #[validate(range(min = 0))]
    pub reorder_threshold: i32,
}

/// Partial update of an inventory item; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateInventoryItem {
    pub item_name: Option<String>,
    pub storeroom: Option<String>,
    pub branch: Option<String>,
    pub team: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub original_stock: Option<i32>,
    pub current_stock: Option<i32>,
    pub outside_storeroom: Option<i32>,
    pub reorder_threshold: Option<i32>,
}

/// A manual stock movement (withdrawal or receipt).
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct MovementCommand {
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Defaults to the item's own team when absent.
    pub team: Option<String>,
    pub team_leader: Option<String>,
}

/// Service for managing inventory: listings, item CRUD, cell edits, and the
/// stock movements that feed the transaction log.
#[derive(Clone)]
pub struct InventoryService {
    repo: Arc<dyn InventoryRepository>,
    transactions: Arc<dyn TransactionRepository>,
    event_sender: EventSender,
    notifier: Arc<dyn NotificationService>,
    logger: Logger,
}

/// Members see only items owned by their committee's team.
fn visible_items(user: &User, items: Vec<InventoryItem>) -> Vec<InventoryItem> {
    if user.is_admin() {
        return items;
    }
    match user.committee {
        Some(committee) => {
            let team = committee.to_string();
            items.into_iter().filter(|item| item.team == team).collect()
        }
        None => Vec::new(),
    }
}

fn check_stock_invariant(item: &InventoryItem) -> Result<(), ServiceError> {
    if item.stock_invariant_holds() {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(format!(
            "stock invariant violated for {}: current ({}) + outside ({}) exceeds original ({})",
            item.item_code, item.current_stock, item.outside_storeroom, item.original_stock
        )))
    }
}

impl InventoryService {
    pub fn new(
        repo: Arc<dyn InventoryRepository>,
        transactions: Arc<dyn TransactionRepository>,
        event_sender: EventSender,
        notifier: Arc<dyn NotificationService>,
        logger: Logger,
    ) -> Self {
        Self {
            repo,
            transactions,
            event_sender,
            notifier,
            logger,
        }
    }

    #[instrument(skip(self, user, filter), fields(user = %user.email))]
    pub async fn list_items(
        &self,
        user: &User,
        filter: &InventoryFilter,
    ) -> Result<Vec<InventoryItem>, ServiceError> {
        let items = self.repo.list().await?;
        Ok(filter.apply(visible_items(user, items)))
    }

    #[instrument(skip(self, user), fields(user = %user.email, code = %item_code))]
    pub async fn get_item(
        &self,
        user: &User,
        item_code: &str,
    ) -> Result<InventoryItem, ServiceError> {
        let items = visible_items(user, self.repo.list().await?);
        items
            .into_iter()
            .find(|item| item.item_code == item_code)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("inventory item {item_code} not found"))
            })
    }

    /// Items at or below their reorder threshold, within the caller's scope.
    #[instrument(skip(self, user), fields(user = %user.email))]
    pub async fn low_stock(&self, user: &User) -> Result<Vec<InventoryItem>, ServiceError> {
        let items = visible_items(user, self.repo.list().await?);
        Ok(items.into_iter().filter(|item| item.needs_reorder()).collect())
    }

    #[instrument(skip(self, payload))]
    pub async fn create_item(
        &self,
        payload: NewInventoryItem,
    ) -> Result<InventoryItem, ServiceError> {
        payload.validate()?;

        let item = InventoryItem {
            item_code: self.repo.next_code().await?,
            item_name: payload.item_name,
            storeroom: payload.storeroom,
            branch: payload.branch,
            team: payload.team,
            category: payload.category,
            unit: payload.unit,
            original_stock: payload.original_stock,
            current_stock: payload.current_stock,
            outside_storeroom: payload.outside_storeroom,
            reorder_threshold: payload.reorder_threshold,
        };
        check_stock_invariant(&item)?;

        let item = self.repo.insert(item).await?;
        slog::info!(self.logger, "inventory item created"; "code" => &item.item_code);
        self.event_sender
            .send(Event::InventoryItemCreated(item.item_code.clone()))
            .await
            .map_err(ServiceError::EventError)?;
        Ok(item)
    }

    #[instrument(skip(self, payload), fields(code = %item_code))]
    pub async fn update_item(
        &self,
        item_code: &str,
        payload: UpdateInventoryItem,
    ) -> Result<InventoryItem, ServiceError> {
        let mut item = self.repo.get(item_code).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("inventory item {item_code} not found"))
        })?;

        if let Some(item_name) = payload.item_name {
            item.item_name = item_name;
        }
        if let Some(storeroom) = payload.storeroom {
            item.storeroom = storeroom;
        }
        if let Some(branch) = payload.branch {
            item.branch = branch;
        }
        if let Some(team) = payload.team {
            item.team = team;
        }
        if let Some(category) = payload.category {
            item.category = category;
        }
        if let Some(unit) = payload.unit {
            item.unit = unit;
        }
        if let Some(original_stock) = payload.original_stock {
            item.original_stock = original_stock;
        }
        if let Some(current_stock) = payload.current_stock {
            item.current_stock = current_stock;
        }
        if let Some(outside_storeroom) = payload.outside_storeroom {
            item.outside_storeroom = outside_storeroom;
        }
        if let Some(reorder_threshold) = payload.reorder_threshold {
            item.reorder_threshold = reorder_threshold;
        }
        check_stock_invariant(&item)?;

        let item = self.repo.update(item).await?;
        self.event_sender
            .send(Event::InventoryItemUpdated(item.item_code.clone()))
            .await
            .map_err(ServiceError::EventError)?;
        Ok(item)
    }

    #[instrument(skip(self), fields(code = %item_code))]
    pub async fn delete_item(&self, item_code: &str) -> Result<InventoryItem, ServiceError> {
        let removed = self.repo.remove(item_code).await?;
        self.event_sender
            .send(Event::InventoryItemDeleted(removed.item_code.clone()))
            .await
            .map_err(ServiceError::EventError)?;
        Ok(removed)
    }

    /// Commits a single grid cell edit on an item; the stock invariant is
    /// re-checked before the row is persisted.
    #[instrument(skip(self, value), fields(code = %item_code, field = ?field))]
    pub async fn edit_cell(
        &self,
        item_code: &str,
        field: InventoryField,
        value: &str,
    ) -> Result<InventoryItem, ServiceError> {
        let rows = self.repo.list().await?;
        let index = rows
            .iter()
            .position(|item| item.item_code == item_code)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("inventory item {item_code} not found"))
            })?;

        let mut session = GridSession::new(rows);
        session.start_edit(index, field)?;
        session.set_buffer(value);
        session.commit_edit()?;

        let updated = session.into_rows().swap_remove(index);
        check_stock_invariant(&updated)?;

        let updated = self.repo.update(updated).await?;
        self.event_sender
            .send(Event::InventoryItemUpdated(updated.item_code.clone()))
            .await
            .map_err(ServiceError::EventError)?;
        Ok(updated)
    }

    /// Withdraws stock and appends the audit transaction. Refused when the
    /// requested quantity exceeds the current stock.
    #[instrument(skip(self, user, command), fields(user = %user.email, code = %item_code))]
    pub async fn withdraw(
        &self,
        user: &User,
        item_code: &str,
        command: MovementCommand,
    ) -> Result<Transaction, ServiceError> {
        command.validate()?;
        let updated = match self.repo.adjust_stock(item_code, -command.quantity).await {
            Ok(item) => item,
            Err(err @ StoreError::InsufficientStock { .. }) => {
                warn!(code = %item_code, "withdrawal refused: {err}");
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };

        let txn = self
            .record_movement(user, &updated, TransactionType::Withdrawal, command)
            .await?;
        self.event_sender
            .send(Event::StockWithdrawn {
                item_code: updated.item_code.clone(),
                quantity: txn.quantity,
                transaction_id: txn.transaction_id.clone(),
            })
            .await
            .map_err(ServiceError::EventError)?;

        if updated.needs_reorder() {
            self.flag_low_stock(user, &updated).await?;
        }
        Ok(txn)
    }

    /// Receives stock back into the storeroom. A receipt that would break the
    /// stock invariant is refused.
    #[instrument(skip(self, user, command), fields(user = %user.email, code = %item_code))]
    pub async fn receive(
        &self,
        user: &User,
        item_code: &str,
        command: MovementCommand,
    ) -> Result<Transaction, ServiceError> {
        command.validate()?;
        let item = self.repo.get(item_code).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("inventory item {item_code} not found"))
        })?;
        if item.current_stock + command.quantity + item.outside_storeroom > item.original_stock {
            return Err(ServiceError::ValidationError(format!(
                "receipt of {} would exceed the original stock of {}",
                command.quantity, item.item_code
            )));
        }

        let updated = self.repo.adjust_stock(item_code, command.quantity).await?;
        let txn = self
            .record_movement(user, &updated, TransactionType::Receipt, command)
            .await?;
        self.event_sender
            .send(Event::StockReceived {
                item_code: updated.item_code.clone(),
                quantity: txn.quantity,
                transaction_id: txn.transaction_id.clone(),
            })
            .await
            .map_err(ServiceError::EventError)?;
        Ok(txn)
    }

    async fn record_movement(
        &self,
        user: &User,
        item: &InventoryItem,
        transaction_type: TransactionType,
        command: MovementCommand,
    ) -> Result<Transaction, ServiceError> {
        let txn = Transaction {
            transaction_id: self.transactions.next_code().await?,
            storeroom: item.storeroom.clone(),
            transaction_type,
            team: command.team.unwrap_or_else(|| item.team.clone()),
            team_leader: command.team_leader.unwrap_or_else(|| user.name.clone()),
            item_code: item.item_code.clone(),
            item_name: item.item_name.clone(),
            date_time: Utc::now(),
            manager: user.email.clone(),
            quantity: command.quantity,
        };
        let txn = self.transactions.append(txn).await?;
        info!(transaction = %txn.transaction_id, "stock movement recorded");
        Ok(txn)
    }

    async fn flag_low_stock(
        &self,
        user: &User,
        item: &InventoryItem,
    ) -> Result<(), ServiceError> {
        slog::warn!(self.logger, "item below reorder threshold";
            "code" => &item.item_code, "current" => item.current_stock);
        self.event_sender
            .send(Event::LowStockDetected {
                item_code: item.item_code.clone(),
                current_stock: item.current_stock,
                reorder_threshold: item.reorder_threshold,
            })
            .await
            .map_err(ServiceError::EventError)?;
        self.notifier
            .send(NotificationBuilder::low_stock(
                &user.email,
                &item.item_name,
                item.current_stock,
            ))
            .await
            .map_err(|e| ServiceError::NotificationError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::events;
    use crate::logging::discard_logger;
    use crate::models::Committee;
    use crate::notifications::InMemoryNotificationService;
    use crate::store::memory::InMemoryStore;
    use crate::store::seed;

    fn admin() -> User {
        User {
            email: "manager@relief.example".into(),
            name: "Amal Haddad".into(),
            role: Role::Administrator,
            storeroom: "STR001".into(),
            committee: None,
        }
    }

    fn member() -> User {
        User {
            email: "member@relief.example".into(),
            name: "Farah Aziz".into(),
            role: Role::CommitteeMember,
            storeroom: "STR001".into(),
            committee: Some(Committee::InKind),
        }
    }

    async fn service() -> (InventoryService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        for item in seed::demo_inventory() {
            InventoryRepository::insert(store.as_ref(), item).await.unwrap();
        }
        let (event_sender, rx) = events::channel(64);
        tokio::spawn(events::process_events(rx));
        let svc = InventoryService::new(
            store.clone(),
            store.clone(),
            event_sender,
            Arc::new(InMemoryNotificationService::new()),
            discard_logger(),
        );
        (svc, store)
    }

    fn movement(quantity: i32) -> MovementCommand {
        MovementCommand {
            quantity,
            team: None,
            team_leader: None,
        }
    }

    #[tokio::test]
    async fn members_see_only_their_team_items() {
        let (svc, _) = service().await;
        let items = svc
            .list_items(&member(), &InventoryFilter::default())
            .await
            .unwrap();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|item| item.team == "in_kind"));
    }

    #[tokio::test]
    async fn create_rejects_stock_invariant_violations() {
        let (svc, _) = service().await;
        let err = svc
            .create_item(NewInventoryItem {
                item_name: "Folding chairs".into(),
                storeroom: "Main storeroom".into(),
                branch: "Central branch".into(),
                team: "furniture".into(),
                category: "furniture".into(),
                unit: "piece".into(),
                original_stock: 10,
                current_stock: 8,
                outside_storeroom: 5,
                reorder_threshold: 2,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn withdraw_refuses_overdraw_and_appends_nothing() {
        let (svc, store) = service().await;
        // ITM003 has 5 on hand.
        let err = svc
            .withdraw(&admin(), "ITM003", movement(10))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientStock(_)));
        assert!(TransactionRepository::list(store.as_ref())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn withdraw_decrements_stock_and_records_a_transaction() {
        let (svc, store) = service().await;
        let txn = svc.withdraw(&admin(), "ITM001", movement(3)).await.unwrap();
        assert_eq!(txn.transaction_type, TransactionType::Withdrawal);
        assert_eq!(txn.quantity, 3);
        assert_eq!(txn.item_code, "ITM001");

        let item = InventoryRepository::get(store.as_ref(), "ITM001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.current_stock, 47);
    }

    #[tokio::test]
    async fn receipt_cannot_exceed_original_stock() {
        let (svc, _) = service().await;
        // ITM001: original 100, current 50, outside 10.
        let err = svc
            .receive(&admin(), "ITM001", movement(41))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));

        let txn = svc.receive(&admin(), "ITM001", movement(40)).await.unwrap();
        assert_eq!(txn.transaction_type, TransactionType::Receipt);
    }

    #[tokio::test]
    async fn cell_edit_keeps_the_invariant() {
        let (svc, _) = service().await;
        let err = svc
            .edit_cell("ITM001", InventoryField::CurrentStock, "95")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));

        let updated = svc
            .edit_cell("ITM001", InventoryField::CurrentStock, "60")
            .await
            .unwrap();
        assert_eq!(updated.current_stock, 60);
    }
}
