use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use thiserror::Error;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// A user-facing notification record. The toasts of the departed UI become
/// rows a client can poll and mark as read.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    /// Email of the user the notification is addressed to.
    pub recipient: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Types of notifications
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    RequestDecision,
    RequirementDecision,
    InventoryAlert,
    FamilyUpdate,
    SystemMessage,
}

/// Notification service errors
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification not found: {0}")]
    NotFound(Uuid),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Trait for notification service operations
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), NotificationError>;
    async fn for_recipient(
        &self,
        recipient: &str,
        limit: usize,
    ) -> Result<Vec<Notification>, NotificationError>;
    async fn mark_as_read(&self, notification_id: Uuid) -> Result<(), NotificationError>;
}

/// In-memory notification service. Keeps the most recent notifications per
/// recipient, newest first on read.
#[derive(Default)]
pub struct InMemoryNotificationService {
    entries: RwLock<Vec<Notification>>,
}

const NOTIFICATION_HISTORY_LIMIT: usize = 1000;

impl InMemoryNotificationService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationService for InMemoryNotificationService {
    #[instrument(skip(self, notification), fields(id = %notification.id, recipient = %notification.recipient))]
    async fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        let mut entries = self.entries.write().unwrap();
        entries.push(notification);
        let overflow = entries.len().saturating_sub(NOTIFICATION_HISTORY_LIMIT);
        if overflow > 0 {
            entries.drain(..overflow);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn for_recipient(
        &self,
        recipient: &str,
        limit: usize,
    ) -> Result<Vec<Notification>, NotificationError> {
        let entries = self.entries.read().unwrap();
        Ok(entries
            .iter()
            .rev()
            .filter(|n| n.recipient == recipient)
            .take(limit)
            .cloned()
            .collect())
    }

    #[instrument(skip(self))]
    async fn mark_as_read(&self, notification_id: Uuid) -> Result<(), NotificationError> {
        let mut entries = self.entries.write().unwrap();
        let notification = entries
            .iter_mut()
            .find(|n| n.id == notification_id)
            .ok_or(NotificationError::NotFound(notification_id))?;
        notification.read = true;
        Ok(())
    }
}

/// Notification creation helpers
pub struct NotificationBuilder;

impl NotificationBuilder {
    fn build(recipient: &str, message: String, notification_type: NotificationType) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            recipient: recipient.to_string(),
            message,
            notification_type,
            read: false,
            created_at: Utc::now(),
        }
    }

    pub fn request_approved(recipient: &str, request_id: &str) -> Notification {
        Self::build(
            recipient,
            format!("Stock request {} was approved", request_id),
            NotificationType::RequestDecision,
        )
    }

    pub fn request_rejected(recipient: &str, request_id: &str) -> Notification {
        Self::build(
            recipient,
            format!("Stock request {} was rejected", request_id),
            NotificationType::RequestDecision,
        )
    }

    pub fn request_refused(recipient: &str, request_id: &str, reason: &str) -> Notification {
        Self::build(
            recipient,
            format!("Could not approve stock request {}: {}", request_id, reason),
            NotificationType::RequestDecision,
        )
    }

    pub fn requirement_decided(recipient: &str, requirement_id: &str, decision: &str) -> Notification {
        Self::build(
            recipient,
            format!("Convoy requirement {} was {}", requirement_id, decision),
            NotificationType::RequirementDecision,
        )
    }

    pub fn family_deleted(recipient: &str, family_code: &str) -> Notification {
        Self::build(
            recipient,
            format!("Family {} was removed from the registry", family_code),
            NotificationType::FamilyUpdate,
        )
    }

    pub fn low_stock(recipient: &str, item_name: &str, current_stock: i32) -> Notification {
        Self::build(
            recipient,
            format!(
                "Item {} is below its reorder threshold ({} remaining)",
                item_name, current_stock
            ),
            NotificationType::InventoryAlert,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notification_lifecycle() {
        let service = InMemoryNotificationService::new();
        let notification =
            NotificationBuilder::request_approved("member@relief.example", "REQ001");
        let id = notification.id;

        service.send(notification).await.unwrap();

        let inbox = service
            .for_recipient("member@relief.example", 10)
            .await
            .unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(!inbox[0].read);
        assert_eq!(inbox[0].notification_type, NotificationType::RequestDecision);

        service.mark_as_read(id).await.unwrap();
        let inbox = service
            .for_recipient("member@relief.example", 10)
            .await
            .unwrap();
        assert!(inbox[0].read);
    }

    #[tokio::test]
    async fn inbox_is_scoped_to_the_recipient_newest_first() {
        let service = InMemoryNotificationService::new();
        service
            .send(NotificationBuilder::request_approved("a@x", "REQ001"))
            .await
            .unwrap();
        service
            .send(NotificationBuilder::request_rejected("a@x", "REQ002"))
            .await
            .unwrap();
        service
            .send(NotificationBuilder::request_approved("b@x", "REQ003"))
            .await
            .unwrap();

        let inbox = service.for_recipient("a@x", 10).await.unwrap();
        assert_eq!(inbox.len(), 2);
        assert!(inbox[0].message.contains("REQ002"));
        assert!(inbox[1].message.contains("REQ001"));
    }

    #[tokio::test]
    async fn marking_unknown_notification_fails() {
        let service = InMemoryNotificationService::new();
        let err = service.mark_as_read(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, NotificationError::NotFound(_)));
    }
}
