use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use dashmap::DashSet;
use serde::Deserialize;
use slog::Logger;
use tracing::{instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::User;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::filters::RequirementFilter;
use crate::models::{
    Committee, ConvoyEvent, ConvoyRequirement, ConvoyStatus, Priority, RequirementStatus,
    Transaction, TransactionType,
};
use crate::notifications::{NotificationBuilder, NotificationService};
use crate::store::{
    ConvoyRepository, InventoryRepository, RequirementRepository, StoreError,
    TransactionRepository,
};

/// Payload for planning a new convoy.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewConvoy {
    #[validate(length(min = 1))]
    pub name: String,
    pub date: NaiveDate,
    #[validate(length(min = 1))]
    pub location: String,
    pub description: Option<String>,
    /// Defaults to the creating user's name.
    pub organizer: Option<String>,
    #[validate(length(min = 1))]
    pub committees: Vec<Committee>,
}

/// Payload for registering an itemized need against a convoy.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewRequirement {
    /// Required for administrators; members are pinned to their own committee.
    pub committee: Option<Committee>,
    #[validate(length(min = 1))]
    pub item_type: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub priority: Priority,
    pub description: Option<String>,
}

/// Service for relief-convoy planning: convoy events, their itemized
/// requirements, and the requirement decision state machine.
#[derive(Clone)]
pub struct ConvoyService {
    convoys: Arc<dyn ConvoyRepository>,
    requirements: Arc<dyn RequirementRepository>,
    inventory: Arc<dyn InventoryRepository>,
    transactions: Arc<dyn TransactionRepository>,
    in_flight: Arc<DashSet<String>>,
    event_sender: EventSender,
    notifier: Arc<dyn NotificationService>,
    logger: Logger,
}

impl ConvoyService {
    pub fn new(
        convoys: Arc<dyn ConvoyRepository>,
        requirements: Arc<dyn RequirementRepository>,
        inventory: Arc<dyn InventoryRepository>,
        transactions: Arc<dyn TransactionRepository>,
        event_sender: EventSender,
        notifier: Arc<dyn NotificationService>,
        logger: Logger,
    ) -> Self {
        Self {
            convoys,
            requirements,
            inventory,
            transactions,
            in_flight: Arc::new(DashSet::new()),
            event_sender,
            notifier,
            logger,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_convoys(&self) -> Result<Vec<ConvoyEvent>, ServiceError> {
        Ok(self.convoys.list().await?)
    }

    #[instrument(skip(self), fields(convoy = %convoy_id))]
    pub async fn get_convoy(&self, convoy_id: &str) -> Result<ConvoyEvent, ServiceError> {
        self.convoys
            .get(convoy_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("convoy {convoy_id} not found")))
    }

    #[instrument(skip(self, user, payload), fields(user = %user.email))]
    pub async fn create_convoy(
        &self,
        user: &User,
        payload: NewConvoy,
    ) -> Result<ConvoyEvent, ServiceError> {
        payload.validate()?;

        let convoy = ConvoyEvent {
            id: self.convoys.next_code().await?,
            name: payload.name,
            date: payload.date,
            location: payload.location,
            status: ConvoyStatus::Planning,
            description: payload.description,
            organizer: payload.organizer.unwrap_or_else(|| user.name.clone()),
            committees: payload.committees,
        };
        let convoy = self.convoys.insert(convoy).await?;

        slog::info!(self.logger, "convoy created"; "id" => &convoy.id);
        self.event_sender
            .send(Event::ConvoyCreated(convoy.id.clone()))
            .await
            .map_err(ServiceError::EventError)?;
        Ok(convoy)
    }

    /// Requirements within the caller's scope, filtered.
    #[instrument(skip(self, user, filter), fields(user = %user.email))]
    pub async fn list_requirements(
        &self,
        user: &User,
        filter: &RequirementFilter,
    ) -> Result<Vec<ConvoyRequirement>, ServiceError> {
        let requirements = self.requirements.list().await?;
        Ok(requirements
            .into_iter()
            .filter(|req| user.can_access_committee(req.committee))
            .filter(|req| filter.matches(req))
            .collect())
    }

    #[instrument(skip(self, user), fields(user = %user.email, convoy = %convoy_id))]
    pub async fn requirements_for_convoy(
        &self,
        user: &User,
        convoy_id: &str,
    ) -> Result<Vec<ConvoyRequirement>, ServiceError> {
        // Listing against a missing convoy is a 404, not an empty list.
        self.get_convoy(convoy_id).await?;
        let requirements = self.requirements.list_for_convoy(convoy_id).await?;
        Ok(requirements
            .into_iter()
            .filter(|req| user.can_access_committee(req.committee))
            .collect())
    }

    /// Registers a requirement against a convoy that is still accepting them.
    #[instrument(skip(self, user, payload), fields(user = %user.email, convoy = %convoy_id))]
    pub async fn submit_requirement(
        &self,
        user: &User,
        convoy_id: &str,
        payload: NewRequirement,
    ) -> Result<ConvoyRequirement, ServiceError> {
        payload.validate()?;

        let convoy = self.get_convoy(convoy_id).await?;
        if !convoy.status.accepts_requirements() {
            return Err(ServiceError::InvalidOperation(format!(
                "convoy {} is {} and no longer accepts requirements",
                convoy.id, convoy.status
            )));
        }

        let committee = if user.is_admin() {
            payload.committee.ok_or_else(|| {
                ServiceError::ValidationError("committee is required".to_string())
            })?
        } else {
            user.committee.ok_or_else(|| {
                ServiceError::Forbidden("no committee assigned to this member".to_string())
            })?
        };

        let requirement = ConvoyRequirement {
            id: self.requirements.next_code().await?,
            convoy_id: convoy.id.clone(),
            committee,
            item_type: payload.item_type,
            quantity: payload.quantity,
            priority: payload.priority,
            description: payload.description,
            status: RequirementStatus::Pending,
            requested_by: user.name.clone(),
            request_date: Utc::now().date_naive(),
            approved_by: None,
            approval_date: None,
            notes: None,
        };
        let requirement = self.requirements.insert(requirement).await?;

        slog::info!(self.logger, "requirement submitted";
            "id" => &requirement.id, "convoy" => &requirement.convoy_id);
        self.event_sender
            .send(Event::RequirementSubmitted(requirement.id.clone()))
            .await
            .map_err(ServiceError::EventError)?;
        Ok(requirement)
    }

    /// Approves a pending requirement. Refused when the requested quantity
    /// exceeds the available stock of the referenced item type; the record
    /// stays pending. Approval does not move stock; that happens at
    /// fulfilment.
    #[instrument(skip(self, user), fields(user = %user.email, requirement = %requirement_id))]
    pub async fn approve_requirement(
        &self,
        user: &User,
        requirement_id: &str,
    ) -> Result<ConvoyRequirement, ServiceError> {
        self.require_admin(user)?;
        let _guard = self.acquire_decision(requirement_id)?;

        let mut requirement = self
            .fetch_for_transition(requirement_id, RequirementStatus::Approved)
            .await?;

        let available = self.available_stock(&requirement.item_type).await?;
        if requirement.quantity > available {
            let reason = format!(
                "requested {}, available {}",
                requirement.quantity, available
            );
            warn!(requirement = %requirement_id, "approval refused: {reason}");
            self.notifier
                .send(NotificationBuilder::request_refused(
                    &user.email,
                    requirement_id,
                    &reason,
                ))
                .await
                .map_err(|e| ServiceError::NotificationError(e.to_string()))?;
            return Err(ServiceError::InsufficientStock(reason));
        }

        requirement.status = RequirementStatus::Approved;
        requirement.approved_by = Some(user.name.clone());
        requirement.approval_date = Some(Utc::now().date_naive());
        let requirement = self.requirements.update(requirement).await?;

        self.event_sender
            .send(Event::RequirementApproved {
                requirement_id: requirement.id.clone(),
                approved_by: user.name.clone(),
            })
            .await
            .map_err(ServiceError::EventError)?;
        self.notifier
            .send(NotificationBuilder::requirement_decided(
                &user.email,
                &requirement.id,
                "approved",
            ))
            .await
            .map_err(|e| ServiceError::NotificationError(e.to_string()))?;
        Ok(requirement)
    }

    /// Rejects a pending requirement. No stock guard.
    #[instrument(skip(self, user, reason), fields(user = %user.email, requirement = %requirement_id))]
    pub async fn reject_requirement(
        &self,
        user: &User,
        requirement_id: &str,
        reason: Option<String>,
    ) -> Result<ConvoyRequirement, ServiceError> {
        self.require_admin(user)?;
        let _guard = self.acquire_decision(requirement_id)?;

        let mut requirement = self
            .fetch_for_transition(requirement_id, RequirementStatus::Rejected)
            .await?;
        requirement.status = RequirementStatus::Rejected;
        requirement.notes = reason;
        let requirement = self.requirements.update(requirement).await?;

        self.event_sender
            .send(Event::RequirementRejected(requirement.id.clone()))
            .await
            .map_err(ServiceError::EventError)?;
        self.notifier
            .send(NotificationBuilder::requirement_decided(
                &user.email,
                &requirement.id,
                "rejected",
            ))
            .await
            .map_err(|e| ServiceError::NotificationError(e.to_string()))?;
        Ok(requirement)
    }

    /// Fulfils an approved requirement: withdraws the stock from the first
    /// matching item and appends the withdrawal transaction.
    #[instrument(skip(self, user), fields(user = %user.email, requirement = %requirement_id))]
    pub async fn fulfill_requirement(
        &self,
        user: &User,
        requirement_id: &str,
    ) -> Result<ConvoyRequirement, ServiceError> {
        self.require_admin(user)?;
        let _guard = self.acquire_decision(requirement_id)?;

        let mut requirement = self
            .fetch_for_transition(requirement_id, RequirementStatus::Fulfilled)
            .await?;

        let item = self
            .inventory
            .list()
            .await?
            .into_iter()
            .find(|item| item.item_name == requirement.item_type)
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "no inventory item matching '{}'",
                    requirement.item_type
                ))
            })?;

        let item = match self
            .inventory
            .adjust_stock(&item.item_code, -requirement.quantity)
            .await
        {
            Ok(item) => item,
            Err(err @ StoreError::InsufficientStock { .. }) => {
                warn!(requirement = %requirement_id, "fulfilment refused: {err}");
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };

        let txn = Transaction {
            transaction_id: self.transactions.next_code().await?,
            storeroom: item.storeroom.clone(),
            transaction_type: TransactionType::Withdrawal,
            team: requirement.committee.to_string(),
            team_leader: requirement.requested_by.clone(),
            item_code: item.item_code.clone(),
            item_name: item.item_name.clone(),
            date_time: Utc::now(),
            manager: user.email.clone(),
            quantity: requirement.quantity,
        };
        let txn = self.transactions.append(txn).await?;

        requirement.status = RequirementStatus::Fulfilled;
        let requirement = self.requirements.update(requirement).await?;

        slog::info!(self.logger, "requirement fulfilled";
            "id" => &requirement.id, "transaction" => &txn.transaction_id);
        self.event_sender
            .send(Event::RequirementFulfilled {
                requirement_id: requirement.id.clone(),
                transaction_id: txn.transaction_id.clone(),
            })
            .await
            .map_err(ServiceError::EventError)?;
        self.notifier
            .send(NotificationBuilder::requirement_decided(
                &user.email,
                &requirement.id,
                "fulfilled",
            ))
            .await
            .map_err(|e| ServiceError::NotificationError(e.to_string()))?;
        Ok(requirement)
    }

    /// Total current stock across items whose name matches the item type.
    async fn available_stock(&self, item_type: &str) -> Result<i32, ServiceError> {
        let items = self.inventory.list().await?;
        Ok(items
            .iter()
            .filter(|item| item.item_name == item_type)
            .map(|item| item.current_stock)
            .sum())
    }

    fn require_admin(&self, user: &User) -> Result<(), ServiceError> {
        if user.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "administrator role required".to_string(),
            ))
        }
    }

    fn acquire_decision(&self, requirement_id: &str) -> Result<DecisionGuard<'_>, ServiceError> {
        if !self.in_flight.insert(requirement_id.to_string()) {
            return Err(ServiceError::Conflict(format!(
                "a decision for {requirement_id} is already in flight"
            )));
        }
        Ok(DecisionGuard {
            set: &self.in_flight,
            key: requirement_id.to_string(),
        })
    }

    async fn fetch_for_transition(
        &self,
        requirement_id: &str,
        next: RequirementStatus,
    ) -> Result<ConvoyRequirement, ServiceError> {
        let requirement = self.requirements.get(requirement_id).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("requirement {requirement_id} not found"))
        })?;
        if !requirement.status.can_transition_to(next) {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot move requirement {} from '{}' to '{}'",
                requirement.id, requirement.status, next
            )));
        }
        Ok(requirement)
    }
}

struct DecisionGuard<'a> {
    set: &'a DashSet<String>,
    key: String,
}

impl Drop for DecisionGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.key);
    }
}
