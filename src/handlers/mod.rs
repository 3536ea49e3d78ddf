pub mod convoys;
pub mod families;
pub mod inventory;
pub mod notifications;
pub mod requests;
pub mod transactions;

use std::sync::Arc;

use slog::Logger;

use crate::events::EventSender;
use crate::notifications::{InMemoryNotificationService, NotificationService};
use crate::store::memory::InMemoryStore;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub families: Arc<crate::services::FamilyService>,
    pub inventory: Arc<crate::services::InventoryService>,
    pub convoys: Arc<crate::services::ConvoyService>,
    pub requests: Arc<crate::services::RequestService>,
    pub notifications: Arc<dyn NotificationService>,
}

impl AppServices {
    /// Builds the service container over a shared store, wiring a component
    /// logger into each service.
    pub fn new(store: Arc<InMemoryStore>, event_sender: EventSender, base_logger: Logger) -> Self {
        let notifications: Arc<dyn NotificationService> =
            Arc::new(InMemoryNotificationService::new());

        let families = Arc::new(crate::services::FamilyService::new(
            store.clone(),
            event_sender.clone(),
            notifications.clone(),
            base_logger.new(slog::o!("component" => "family_service")),
        ));
        let inventory = Arc::new(crate::services::InventoryService::new(
            store.clone(),
            store.clone(),
            event_sender.clone(),
            notifications.clone(),
            base_logger.new(slog::o!("component" => "inventory_service")),
        ));
        let convoys = Arc::new(crate::services::ConvoyService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            event_sender.clone(),
            notifications.clone(),
            base_logger.new(slog::o!("component" => "convoy_service")),
        ));
        let requests = Arc::new(crate::services::RequestService::new(
            store.clone(),
            store.clone(),
            store,
            event_sender,
            notifications.clone(),
            base_logger.new(slog::o!("component" => "request_service")),
        ));

        Self {
            families,
            inventory,
            convoys,
            requests,
            notifications,
        }
    }
}

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Collapses the categorical "all" sentinel (and empty strings) to `None`.
pub(crate) fn sentinel(raw: Option<String>) -> Option<String> {
    raw.filter(|value| !value.is_empty() && value != "all")
}

/// Parses an enumerated query parameter, honoring the "all" sentinel.
pub(crate) fn parse_param<T: std::str::FromStr>(
    name: &str,
    raw: Option<String>,
) -> Result<Option<T>, crate::errors::ServiceError> {
    match sentinel(raw) {
        None => Ok(None),
        Some(value) => value.parse::<T>().map(Some).map_err(|_| {
            crate::errors::ServiceError::ValidationError(format!("invalid {name}: {value}"))
        }),
    }
}
