use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

use crate::models::Committee;

/// Events emitted by the service layer after a successful mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Family events
    FamilyRegistered(String),
    FamilyDeleted(String),
    FamilyCellEdited {
        family_code: String,
        field: String,
    },
    FamiliesMerged {
        updated: usize,
        committee: Option<Committee>,
    },

    // Inventory events
    InventoryItemCreated(String),
    InventoryItemUpdated(String),
    InventoryItemDeleted(String),
    StockWithdrawn {
        item_code: String,
        quantity: i32,
        transaction_id: String,
    },
    StockReceived {
        item_code: String,
        quantity: i32,
        transaction_id: String,
    },
    LowStockDetected {
        item_code: String,
        current_stock: i32,
        reorder_threshold: i32,
    },

    // Stock request events
    RequestSubmitted(String),
    RequestApproved {
        request_id: String,
        transaction_id: String,
    },
    RequestRejected(String),

    // Convoy events
    ConvoyCreated(String),
    RequirementSubmitted(String),
    RequirementApproved {
        requirement_id: String,
        approved_by: String,
    },
    RequirementRejected(String),
    RequirementFulfilled {
        requirement_id: String,
        transaction_id: String,
    },

    // Generic event for custom messages
    Generic {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Builds a connected sender/receiver pair with the given channel capacity.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Background consumer: drains the event channel and logs each event. A real
/// deployment would fan these out to webhooks or a message queue here.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(event = ?event, "event processed");
    }
    info!("event channel closed, processor exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_flow_through_the_channel() {
        let (sender, mut rx) = channel(8);
        sender
            .send(Event::FamilyRegistered("FAM003".into()))
            .await
            .unwrap();
        sender
            .send(Event::StockWithdrawn {
                item_code: "ITM001".into(),
                quantity: 3,
                transaction_id: "TXN009".into(),
            })
            .await
            .unwrap();

        assert!(matches!(
            rx.recv().await,
            Some(Event::FamilyRegistered(code)) if code == "FAM003"
        ));
        assert!(matches!(
            rx.recv().await,
            Some(Event::StockWithdrawn { quantity: 3, .. })
        ));
    }

    #[tokio::test]
    async fn send_fails_once_the_receiver_is_gone() {
        let (sender, rx) = channel(1);
        drop(rx);
        assert!(sender
            .send(Event::Generic {
                message: "orphaned".into(),
                timestamp: Utc::now(),
            })
            .await
            .is_err());
    }
}
