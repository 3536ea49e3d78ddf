use std::collections::HashSet;
use std::sync::Arc;

use slog::Logger;
use tracing::{info, instrument};

use crate::auth::User;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::filters::FamilyFilter;
use crate::grid::GridSession;
use crate::models::{Family, FamilyField};
use crate::notifications::{NotificationBuilder, NotificationService};
use crate::store::FamilyRepository;

/// Service for the family registry: the editable grid's row lifecycle, cell
/// commits, and role-scoped bulk merges.
#[derive(Clone)]
pub struct FamilyService {
    repo: Arc<dyn FamilyRepository>,
    event_sender: EventSender,
    notifier: Arc<dyn NotificationService>,
    logger: Logger,
}

/// The subset of the registry a user may see and mutate. A member with no
/// committee assigned sees nothing.
fn visible_rows(user: &User, rows: Vec<Family>) -> Vec<Family> {
    if user.is_admin() {
        return rows;
    }
    match user.committee {
        Some(committee) => rows
            .into_iter()
            .filter(|family| family.committee == Some(committee))
            .collect(),
        None => Vec::new(),
    }
}

impl FamilyService {
    pub fn new(
        repo: Arc<dyn FamilyRepository>,
        event_sender: EventSender,
        notifier: Arc<dyn NotificationService>,
        logger: Logger,
    ) -> Self {
        Self {
            repo,
            event_sender,
            notifier,
            logger,
        }
    }

    /// Lists the caller's visible rows, filtered. Order is preserved.
    #[instrument(skip(self, user, filter), fields(user = %user.email))]
    pub async fn list_families(
        &self,
        user: &User,
        filter: &FamilyFilter,
    ) -> Result<Vec<Family>, ServiceError> {
        let rows = self.repo.list().await?;
        Ok(filter.apply(visible_rows(user, rows)))
    }

    /// Appends a blank row with a freshly generated code. The new row does not
    /// enter edit mode. A member's row is stamped with their committee so it
    /// stays inside their visible scope.
    #[instrument(skip(self, user), fields(user = %user.email))]
    pub async fn add_row(&self, user: &User) -> Result<Family, ServiceError> {
        let code = self.repo.next_code().await?;
        let mut family = Family::blank(&code);
        if !user.is_admin() {
            family.committee = user.committee;
        }
        let family = self.repo.insert(family).await?;

        slog::info!(self.logger, "family row added"; "code" => &family.family_code);
        self.event_sender
            .send(Event::FamilyRegistered(family.family_code.clone()))
            .await
            .map_err(ServiceError::EventError)?;
        Ok(family)
    }

    /// Removes the row at `index` within the caller's visible subset. No
    /// confirmation step; a notification is emitted on success.
    #[instrument(skip(self, user), fields(user = %user.email, index))]
    pub async fn delete_row(&self, user: &User, index: usize) -> Result<Family, ServiceError> {
        let visible = visible_rows(user, self.repo.list().await?);
        let target = visible
            .get(index)
            .ok_or_else(|| ServiceError::NotFound(format!("no family row at index {index}")))?;
        let removed = self.repo.remove(&target.family_code).await?;

        self.notifier
            .send(NotificationBuilder::family_deleted(
                &user.email,
                &removed.family_code,
            ))
            .await
            .map_err(|e| ServiceError::NotificationError(e.to_string()))?;
        self.event_sender
            .send(Event::FamilyDeleted(removed.family_code.clone()))
            .await
            .map_err(ServiceError::EventError)?;
        Ok(removed)
    }

    /// Commits a single cell edit: the server counterpart of
    /// start-edit / commit-edit on the grid. Rows outside the caller's scope
    /// read as missing.
    #[instrument(skip(self, user, value), fields(user = %user.email, code = %family_code, field = ?field))]
    pub async fn edit_cell(
        &self,
        user: &User,
        family_code: &str,
        field: FamilyField,
        value: &str,
    ) -> Result<Family, ServiceError> {
        let rows = visible_rows(user, self.repo.list().await?);
        let index = rows
            .iter()
            .position(|family| family.family_code == family_code)
            .ok_or_else(|| ServiceError::NotFound(format!("family {family_code} not found")))?;

        let mut session = GridSession::new(rows);
        session.start_edit(index, field)?;
        session.set_buffer(value);
        session.commit_edit()?;

        let updated = session.into_rows().swap_remove(index);
        let updated = self.repo.update(updated).await?;

        self.event_sender
            .send(Event::FamilyCellEdited {
                family_code: updated.family_code.clone(),
                field: field.to_string(),
            })
            .await
            .map_err(ServiceError::EventError)?;
        Ok(updated)
    }

    /// Merges a bulk update of the caller's visible subset back into the full
    /// collection. An administrator replaces the whole collection; a member's
    /// submission replaces only rows of their committee, matched by code, and
    /// leaves every other row untouched.
    #[instrument(skip(self, user, rows), fields(user = %user.email, submitted = rows.len()))]
    pub async fn submit_rows(&self, user: &User, rows: Vec<Family>) -> Result<usize, ServiceError> {
        let mut seen = HashSet::new();
        for row in &rows {
            if !seen.insert(row.family_code.clone()) {
                return Err(ServiceError::ValidationError(format!(
                    "duplicate family code in submission: {}",
                    row.family_code
                )));
            }
        }

        let full = self.repo.list().await?;
        let (merged, updated) = if user.is_admin() {
            let updated = rows.len();
            (rows, updated)
        } else {
            let committee = user.committee.ok_or_else(|| {
                ServiceError::Forbidden("no committee assigned to this member".to_string())
            })?;
            let mut updated = 0;
            let merged = full
                .into_iter()
                .map(|family| {
                    if family.committee != Some(committee) {
                        return family;
                    }
                    match rows.iter().find(|r| r.family_code == family.family_code) {
                        Some(replacement) => {
                            updated += 1;
                            replacement.clone()
                        }
                        None => family,
                    }
                })
                .collect();
            (merged, updated)
        };

        self.repo.replace_all(merged).await?;
        info!(updated, "family bulk update merged");
        self.event_sender
            .send(Event::FamiliesMerged {
                updated,
                committee: user.committee,
            })
            .await
            .map_err(ServiceError::EventError)?;
        Ok(updated)
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

    fn member(committee: Committee) -> User {
        User {
            email: "member@relief.example".into(),
            name: "Farah Aziz".into(),
            role: Role::CommitteeMember,
            storeroom: "STR001".into(),
            committee: Some(committee),
        }
    }

    async fn service() -> (FamilyService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        for family in seed::demo_families() {
            FamilyRepository::insert(store.as_ref(), family).await.unwrap();
        }
        let (event_sender, rx) = events::channel(64);
        tokio::spawn(events::process_events(rx));
        let svc = FamilyService::new(
            store.clone(),
            event_sender,
            Arc::new(InMemoryNotificationService::new()),
            discard_logger(),
        );
        (svc, store)
    }

    #[tokio::test]
    async fn add_then_delete_matches_the_grid_scenario() {
        let (svc, _) = service().await;
        let user = admin();

        let added = svc.add_row(&user).await.unwrap();
        assert_eq!(added.family_code, "FAM003");
        assert_eq!(added.name, "");
        assert_eq!(added.family_size, 1);

        svc.delete_row(&user, 0).await.unwrap();
        let rows = svc
            .list_families(&user, &FamilyFilter::default())
            .await
            .unwrap();
        let codes: Vec<&str> = rows.iter().map(|f| f.family_code.as_str()).collect();
        assert_eq!(codes, vec!["FAM002", "FAM003"]);
    }

    #[tokio::test]
    async fn members_see_only_their_committee() {
        let (svc, _) = service().await;
        let rows = svc
            .list_families(&member(Committee::Catering), &FamilyFilter::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].family_code, "FAM002");
    }

    #[tokio::test]
    async fn member_added_rows_carry_their_committee() {
        let (svc, _) = service().await;
        let user = member(Committee::Catering);
        let added = svc.add_row(&user).await.unwrap();
        assert_eq!(added.committee, Some(Committee::Catering));

        // The new row is inside the member's own view.
        let rows = svc
            .list_families(&user, &FamilyFilter::default())
            .await
            .unwrap();
        assert!(rows.iter().any(|f| f.family_code == added.family_code));
    }

    #[tokio::test]
    async fn member_merge_leaves_other_committees_untouched() {
        let (svc, store) = service().await;
        let user = member(Committee::Catering);

        let mut visible = svc
            .list_families(&user, &FamilyFilter::default())
            .await
            .unwrap();
        visible[0].phone = "0500000000".into();
        // A row from another committee smuggled into the submission must be
        // ignored by the merge.
        let mut foreign = Family::blank("FAM001");
        foreign.name = "hijacked".into();
        visible.push(foreign);

        let updated = svc.submit_rows(&user, visible).await.unwrap();
        assert_eq!(updated, 1);

        let all = FamilyRepository::list(store.as_ref()).await.unwrap();
        assert_eq!(all[0], seed::demo_families()[0]);
        assert_eq!(all[1].phone, "0500000000");
    }

    #[tokio::test]
    async fn cell_edits_parse_per_field_kind() {
        let (svc, _) = service().await;
        let user = admin();

        let updated = svc
            .edit_cell(&user, "FAM001", FamilyField::FamilySize, "totally a number")
            .await
            .unwrap();
        assert_eq!(updated.family_size, 1);

        let updated = svc
            .edit_cell(&user, "FAM001", FamilyField::Committee, "furniture")
            .await
            .unwrap();
        assert_eq!(updated.committee, Some(Committee::Furniture));

        let err = svc
            .edit_cell(&user, "FAM001", FamilyField::Committee, "not a committee")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn hidden_rows_read_as_missing_for_members() {
        let (svc, _) = service().await;
        let err = svc
            .edit_cell(
                &member(Committee::Catering),
                "FAM001",
                FamilyField::Phone,
                "0509999999",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
