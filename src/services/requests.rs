use std::sync::Arc;

use chrono::Utc;
use dashmap::DashSet;
use serde::Deserialize;
use slog::Logger;
use tracing::{instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::User;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::filters::RequestFilter;
use crate::models::{
    Committee, PendingRequest, RequestStatus, Transaction, TransactionType,
};
use crate::notifications::{NotificationBuilder, NotificationService};
use crate::store::{InventoryRepository, RequestRepository, StoreError, TransactionRepository};

/// Payload for submitting a stock request.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewStockRequest {
    #[validate(length(min = 1))]
    pub item_code: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Required for administrators; members are pinned to their own committee.
    pub committee: Option<Committee>,
    pub branch: Option<String>,
    #[serde(default)]
    pub is_urgent: bool,
}

/// Removes the in-flight marker when a decision completes, on every path.
struct InFlightGuard<'a> {
    set: &'a DashSet<String>,
    key: String,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a DashSet<String>, key: &str) -> Result<Self, ServiceError> {
        if !set.insert(key.to_string()) {
            return Err(ServiceError::Conflict(format!(
                "a decision for {key} is already in flight"
            )));
        }
        Ok(Self {
            set,
            key: key.to_string(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.key);
    }
}

/// Service for pending stock requests: submission and the approve/reject
/// decision flow, guarded against overdraw and duplicate submission.
#[derive(Clone)]
pub struct RequestService {
    requests: Arc<dyn RequestRepository>,
    inventory: Arc<dyn InventoryRepository>,
    transactions: Arc<dyn TransactionRepository>,
    in_flight: Arc<DashSet<String>>,
    event_sender: EventSender,
    notifier: Arc<dyn NotificationService>,
    logger: Logger,
}

impl RequestService {
    pub fn new(
        requests: Arc<dyn RequestRepository>,
        inventory: Arc<dyn InventoryRepository>,
        transactions: Arc<dyn TransactionRepository>,
        event_sender: EventSender,
        notifier: Arc<dyn NotificationService>,
        logger: Logger,
    ) -> Self {
        Self {
            requests,
            inventory,
            transactions,
            in_flight: Arc::new(DashSet::new()),
            event_sender,
            notifier,
            logger,
        }
    }

    /// Pending requests within the caller's scope, filtered.
    #[instrument(skip(self, user, filter), fields(user = %user.email))]
    pub async fn list_pending(
        &self,
        user: &User,
        filter: &RequestFilter,
    ) -> Result<Vec<PendingRequest>, ServiceError> {
        let requests = self.requests.list().await?;
        Ok(requests
            .into_iter()
            .filter(|req| req.status == RequestStatus::Pending)
            .filter(|req| user.can_access_committee(req.committee))
            .filter(|req| filter.matches(req))
            .collect())
    }

    /// Submits a new stock request against an existing inventory item.
    #[instrument(skip(self, user, payload), fields(user = %user.email))]
    pub async fn submit(
        &self,
        user: &User,
        payload: NewStockRequest,
    ) -> Result<PendingRequest, ServiceError> {
        payload.validate()?;

        let committee = if user.is_admin() {
            payload.committee.ok_or_else(|| {
                ServiceError::ValidationError("committee is required".to_string())
            })?
        } else {
            user.committee.ok_or_else(|| {
                ServiceError::Forbidden("no committee assigned to this member".to_string())
            })?
        };

        let item = self
            .inventory
            .get(&payload.item_code)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "inventory item {} not found",
                    payload.item_code
                ))
            })?;

        let request = PendingRequest {
            request_id: self.requests.next_code().await?,
            branch: payload.branch.unwrap_or_else(|| item.branch.clone()),
            committee,
            item_code: item.item_code.clone(),
            item_name: item.item_name.clone(),
            requested_quantity: payload.quantity,
            storeroom: item.storeroom.clone(),
            date: Utc::now(),
            requestor: user.email.clone(),
            is_urgent: payload.is_urgent,
            status: RequestStatus::Pending,
        };
        let request = self.requests.insert(request).await?;

        slog::info!(self.logger, "stock request submitted";
            "request" => &request.request_id, "item" => &request.item_code);
        self.event_sender
            .send(Event::RequestSubmitted(request.request_id.clone()))
            .await
            .map_err(ServiceError::EventError)?;
        Ok(request)
    }

    /// Approves a pending request: withdraws the stock, appends the audit
    /// transaction, and notifies the requestor. Refused without any state
    /// change when the requested quantity exceeds the current stock; the
    /// record stays pending.
    #[instrument(skip(self, user), fields(user = %user.email, request = %request_id))]
    pub async fn approve(
        &self,
        user: &User,
        request_id: &str,
    ) -> Result<PendingRequest, ServiceError> {
        if !user.is_admin() {
            return Err(ServiceError::Forbidden(
                "administrator role required".to_string(),
            ));
        }
        let _guard = InFlightGuard::acquire(&self.in_flight, request_id)?;

        let mut request = self.fetch_pending(request_id).await?;

        let item = match self
            .inventory
            .adjust_stock(&request.item_code, -request.requested_quantity)
            .await
        {
            Ok(item) => item,
            Err(err @ StoreError::InsufficientStock { .. }) => {
                warn!(request = %request_id, "approval refused: {err}");
                self.notifier
                    .send(NotificationBuilder::request_refused(
                        &user.email,
                        request_id,
                        &err.to_string(),
                    ))
                    .await
                    .map_err(|e| ServiceError::NotificationError(e.to_string()))?;
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };

        let txn = Transaction {
            transaction_id: self.transactions.next_code().await?,
            storeroom: request.storeroom.clone(),
            transaction_type: TransactionType::Withdrawal,
            team: request.committee.to_string(),
            team_leader: request.requestor.clone(),
            item_code: request.item_code.clone(),
            item_name: request.item_name.clone(),
            date_time: Utc::now(),
            manager: user.email.clone(),
            quantity: request.requested_quantity,
        };
        let txn = self.transactions.append(txn).await?;

        request.status = RequestStatus::Approved;
        let request = self.requests.update(request).await?;

        slog::info!(self.logger, "stock request approved";
            "request" => &request.request_id, "transaction" => &txn.transaction_id);
        self.event_sender
            .send(Event::RequestApproved {
                request_id: request.request_id.clone(),
                transaction_id: txn.transaction_id.clone(),
            })
            .await
            .map_err(ServiceError::EventError)?;
        self.notifier
            .send(NotificationBuilder::request_approved(
                &request.requestor,
                &request.request_id,
            ))
            .await
            .map_err(|e| ServiceError::NotificationError(e.to_string()))?;

        if item.needs_reorder() {
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
        }
        Ok(request)
    }

    /// Rejects a pending request. No guard beyond the state machine.
    #[instrument(skip(self, user), fields(user = %user.email, request = %request_id))]
    pub async fn reject(
        &self,
        user: &User,
        request_id: &str,
    ) -> Result<PendingRequest, ServiceError> {
        if !user.is_admin() {
            return Err(ServiceError::Forbidden(
                "administrator role required".to_string(),
            ));
        }
        let _guard = InFlightGuard::acquire(&self.in_flight, request_id)?;

        let mut request = self.fetch_pending(request_id).await?;
        request.status = RequestStatus::Rejected;
        let request = self.requests.update(request).await?;

        self.event_sender
            .send(Event::RequestRejected(request.request_id.clone()))
            .await
            .map_err(ServiceError::EventError)?;
        self.notifier
            .send(NotificationBuilder::request_rejected(
                &request.requestor,
                &request.request_id,
            ))
            .await
            .map_err(|e| ServiceError::NotificationError(e.to_string()))?;
        Ok(request)
    }

    async fn fetch_pending(&self, request_id: &str) -> Result<PendingRequest, ServiceError> {
        let request = self.requests.get(request_id).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("request {request_id} not found"))
        })?;
        if request.status.is_decided() {
            return Err(ServiceError::InvalidOperation(format!(
                "request {request_id} has already been decided"
            )));
        }
        Ok(request)
    }
}
