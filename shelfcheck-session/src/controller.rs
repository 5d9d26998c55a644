//! Session lifecycle controller
//!
//! Phases: `Idle → Initializing → Active → Completed` for a fresh session and
//! `Idle → Restoring → Active` after a reload. `Completed` is terminal; a new
//! session needs a new controller.
//!
//! Every failure the controller observes is also reported through the
//! [`Notifier`], so a host only has to render notices.

use serde::{Deserialize, Serialize};
use shelfcheck_common::models::{
    LibraryItem, ResolutionSettings, ResolutionType, ScannedItem, SessionConfig,
    SessionResponseData, SessionState,
};
use shelfcheck_common::{Error, NoticeLevel, Notifier, Result};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::analysis::resolution::{modal_for, setting_key};
use crate::analysis::status::analyze_lost;
use crate::analysis::{
    analyze_item_status, apply_resolution, check_item_statuses, compute_missing,
    problematic_statuses, resolve, transit_info, CallNumberTracker, Issue, IssueKind,
    ResolutionDecision,
};
use crate::client::{ItemResolver, SessionStarter};
use crate::export::{build_csv, CsvExport};
use crate::store::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    Initializing,
    Restoring,
    Active,
    Completed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Initializing => "initializing",
            SessionPhase::Restoring => "restoring",
            SessionPhase::Active => "active",
            SessionPhase::Completed => "completed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored { items: usize, marked_missing: usize },
    /// Nothing (or nothing unexpired) to restore; show the start form
    NoSession,
}

/// Confirmation workflow the host should open for a scanned item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRequest {
    pub barcode: String,
    pub modal: ResolutionType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    /// The recorded entry, after any auto-resolution
    pub item: ScannedItem,
    pub issues: Vec<Issue>,
    pub auto_resolved: Vec<IssueKind>,
    pub resolution_request: Option<ResolutionRequest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionOutcome {
    Resolved,
    Dismissed,
}

fn issue_label(kind: IssueKind) -> &'static str {
    match kind {
        IssueKind::Lost => "lost status",
        IssueKind::Withdrawn => "withdrawn status",
        IssueKind::Transit => "transit",
        IssueKind::ReturnClaim => "return claim",
        IssueKind::Overdue => "overdue status",
        IssueKind::Damaged => "damaged status",
        IssueKind::BranchMismatch => "branch mismatch",
        IssueKind::WaitingHold => "waiting hold",
    }
}

fn issue_for(resolution: ResolutionType) -> Option<IssueKind> {
    match resolution {
        ResolutionType::Lost => Some(IssueKind::Lost),
        ResolutionType::Withdrawn => Some(IssueKind::Withdrawn),
        ResolutionType::InTransit => Some(IssueKind::Transit),
        ResolutionType::ReturnClaim => Some(IssueKind::ReturnClaim),
        ResolutionType::CheckedOut => None,
    }
}

pub struct SessionController {
    store: Arc<SessionStore>,
    starter: Arc<dyn SessionStarter>,
    resolver: Arc<dyn ItemResolver>,
    notifier: Arc<dyn Notifier>,
    catalog_base: String,

    phase: SessionPhase,
    session: Option<SessionState>,
    /// Newest first
    items: Vec<ScannedItem>,
    marked_missing: Vec<String>,
    marked_missing_set: HashSet<String>,
    expected_barcodes: HashSet<String>,
    tracker: CallNumberTracker,
}

impl SessionController {
    pub fn new(
        store: Arc<SessionStore>,
        starter: Arc<dyn SessionStarter>,
        resolver: Arc<dyn ItemResolver>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            starter,
            resolver,
            notifier,
            catalog_base: String::new(),
            phase: SessionPhase::Idle,
            session: None,
            items: Vec::new(),
            marked_missing: Vec::new(),
            marked_missing_set: HashSet::new(),
            expected_barcodes: HashSet::new(),
            tracker: CallNumberTracker::new(),
        }
    }

    /// Origin used for catalogue links in exports
    pub fn with_catalog_base(mut self, base: impl Into<String>) -> Self {
        self.catalog_base = base.into();
        self
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    pub fn session(&self) -> Option<&SessionState> {
        self.session.as_ref()
    }

    /// Scanned items, newest first
    pub fn items(&self) -> &[ScannedItem] {
        &self.items
    }

    /// Marked-missing barcodes in the order they were marked
    pub fn marked_missing(&self) -> &[String] {
        &self.marked_missing
    }

    pub fn tracker(&self) -> &CallNumberTracker {
        &self.tracker
    }

    fn notify(&self, level: NoticeLevel, text: impl AsRef<str>) {
        self.notifier.notify(level, text.as_ref());
    }

    fn transition_to(&mut self, next: SessionPhase) {
        debug!(from = %self.phase, to = %next, "Session phase change");
        self.phase = next;
    }

    fn require_active(&self, operation: &str) -> Result<()> {
        if self.phase == SessionPhase::Active {
            Ok(())
        } else {
            Err(Error::InvalidState(format!(
                "cannot {} while the session is {}",
                operation, self.phase
            )))
        }
    }

    fn reset_memory(&mut self) {
        self.session = None;
        self.items.clear();
        self.marked_missing.clear();
        self.marked_missing_set.clear();
        self.expected_barcodes.clear();
        self.tracker = CallNumberTracker::new();
    }

    fn install(&mut self, state: SessionState, items: Vec<ScannedItem>, marked: Vec<String>) {
        self.expected_barcodes = state.expected().iter().map(|i| i.barcode.clone()).collect();
        self.tracker.recompute(items.iter().map(|s| &s.item));
        self.marked_missing_set = marked.iter().cloned().collect();
        self.marked_missing = marked;
        self.items = items;
        self.session = Some(state);
    }

    // ------------------------------------------------------------------
    // Start
    // ------------------------------------------------------------------

    /// Start a new session from the start-form configuration
    pub async fn initiate(&mut self, config: SessionConfig) -> Result<()> {
        if self.phase != SessionPhase::Idle {
            return Err(Error::InvalidState(format!(
                "cannot start a session while the session is {}",
                self.phase
            )));
        }
        config.validate()?;

        self.transition_to(SessionPhase::Initializing);
        let mut state = SessionState::new(config, self.store.now());

        if let Some(location) = state.config.shelving_location_name() {
            self.notify(
                NoticeLevel::Status,
                format!("Applying shelving location filter: {}", location),
            );
        }
        if state.config.compare_barcodes {
            self.notify(
                NoticeLevel::Status,
                "Expected barcodes comparison mode is ON. Generating expected barcodes list...",
            );
        } else {
            self.notify(
                NoticeLevel::Status,
                "Expected barcodes comparison mode is OFF. No expected barcodes list will be generated.",
            );
        }
        self.notify(NoticeLevel::Status, "Starting inventory session...");

        let data = match self.request_snapshot(&state.config).await {
            Ok(data) => data,
            Err(e) => {
                self.abort_initiate(&e).await;
                return Err(e);
            }
        };

        info!(
            session_id = %state.session_id,
            expected = data.expected_items.len(),
            fallback = data.fallback_expected_items.len(),
            total_records = data.total_records,
            "Inventory session started"
        );
        state.response_data = Some(data);

        if let Err(e) = self.store.save_session(&state).await {
            warn!(error = %e, "Failed to persist new session");
            self.notify(
                NoticeLevel::Error,
                format!(
                    "Error saving session data: {}. Try using fewer filters or a smaller item set.",
                    e
                ),
            );
        }
        if let Err(e) = self.store.save_items(&[]).await {
            warn!(error = %e, "Failed to persist empty item list");
        }

        self.install(state, Vec::new(), Vec::new());
        self.transition_to(SessionPhase::Active);
        self.announce_expected_list();
        Ok(())
    }

    async fn request_snapshot(&self, config: &SessionConfig) -> Result<SessionResponseData> {
        let raw = self.starter.start_session(config).await?;
        SessionResponseData::normalize(&raw)
    }

    async fn abort_initiate(&mut self, error: &Error) {
        warn!(error = %error, "Inventory session start failed");
        self.reset_memory();
        self.transition_to(SessionPhase::Idle);

        if let Err(e) = self.store.clear_session().await {
            warn!(error = %e, "Failed to clear partial session");
        }

        self.notify(
            NoticeLevel::Error,
            format!("Error starting inventory session: {}", error),
        );
        if matches!(error, Error::InvalidResponse(_)) {
            self.notify(
                NoticeLevel::Error,
                "There was a problem with the server response. Please try again or contact support.",
            );
        }
    }

    fn announce_expected_list(&self) {
        let Some(state) = &self.session else {
            return;
        };
        let config = &state.config;
        let ccode = config.ccode.as_deref().filter(|c| !c.is_empty());

        if config.compare_barcodes {
            let count = state.expected().len();
            if count > 0 {
                self.notify(
                    NoticeLevel::Status,
                    format!(
                        "Expected barcodes list contains {} items. Items not on this list will be flagged.",
                        count
                    ),
                );
                if let Some(ccode) = ccode {
                    self.notify(
                        NoticeLevel::Info,
                        format!("Expected barcodes list is filtered by collection code: {}", ccode),
                    );
                }
            } else if let Some(ccode) = ccode {
                self.notify(
                    NoticeLevel::Warning,
                    format!(
                        "Expected barcodes list is empty, possibly because of the collection code filter ({}). No items will be marked as unexpected.",
                        ccode
                    ),
                );
            } else {
                self.notify(
                    NoticeLevel::Warning,
                    "Expected barcodes list is empty. No items will be marked as unexpected.",
                );
            }
        } else {
            self.notify(
                NoticeLevel::Status,
                "Not comparing scanned items to an expected barcodes list. All scanned items will be accepted.",
            );
        }

        self.notify(
            NoticeLevel::Status,
            format!("Inventory session started with {} items", state.total_records()),
        );
    }

    // ------------------------------------------------------------------
    // Restore
    // ------------------------------------------------------------------

    /// Reload an unexpired persisted session
    pub async fn restore(&mut self) -> Result<RestoreOutcome> {
        if self.phase != SessionPhase::Idle {
            return Err(Error::InvalidState(format!(
                "cannot restore while the session is {}",
                self.phase
            )));
        }
        self.transition_to(SessionPhase::Restoring);

        match self.load_persisted().await {
            Ok(Some((state, items, marked))) => {
                let outcome = RestoreOutcome::Restored {
                    items: items.len(),
                    marked_missing: marked.len(),
                };
                info!(session_id = %state.session_id, ?outcome, "Session restored");
                self.install(state, items, marked);
                self.transition_to(SessionPhase::Active);
                self.notify(NoticeLevel::Status, "Session restored successfully");
                Ok(outcome)
            }
            Ok(None) => {
                debug!("No persisted session to restore");
                self.transition_to(SessionPhase::Idle);
                Ok(RestoreOutcome::NoSession)
            }
            Err(e) => {
                warn!(error = %e, "Session restore failed");
                self.reset_memory();
                self.transition_to(SessionPhase::Idle);
                self.notify(NoticeLevel::Error, format!("Error restoring session: {}", e));
                // Drop it so the next restore starts clean
                if let Err(clear_err) = self.store.clear_session().await {
                    warn!(error = %clear_err, "Failed to clear unreadable session");
                }
                Err(e)
            }
        }
    }

    /// Session, then scanned items, then marked-missing set
    async fn load_persisted(&self) -> Result<Option<(SessionState, Vec<ScannedItem>, Vec<String>)>> {
        let Some(state) = self.store.get_session().await? else {
            return Ok(None);
        };
        let items = self.store.get_items().await?.unwrap_or_default();
        let marked = self.store.get_marked_missing().await?;
        Ok(Some((state, items, marked)))
    }

    // ------------------------------------------------------------------
    // Scanning
    // ------------------------------------------------------------------

    /// Record a scanned item, classify it and dispatch its issues
    pub async fn record_scan(&mut self, item: LibraryItem) -> Result<ScanOutcome> {
        self.require_active("record a scan")?;
        let (compare, ignore_waiting_holds, settings, selected_statuses) = match &self.session {
            Some(state) => (
                state.config.compare_barcodes,
                state.config.ignore_waiting_holds,
                state.resolution_settings,
                state.config.selected_statuses.clone(),
            ),
            None => return Err(Error::InvalidState("no session loaded".to_string())),
        };

        let now = self.store.now();
        let mut scanned = ScannedItem::new(item, now);

        scanned.wrong_place = compare
            && !self.expected_barcodes.is_empty()
            && !self.expected_barcodes.contains(scanned.barcode());
        scanned.out_of_order = self
            .tracker
            .is_out_of_order(scanned.item.call_number_sort.as_deref());
        self.tracker.observe(&scanned.item);
        scanned.invalid_status = check_item_statuses(&scanned.item, &selected_statuses);

        if analyze_lost(&scanned.item).is_lost {
            scanned.was_lost = true;
            scanned.original_lost_status = scanned.item.lost_status.clone();
        }

        let analysis = analyze_item_status(&scanned.item, now, transit_info);
        let mut issues = problematic_statuses(&analysis);
        if ignore_waiting_holds {
            issues.retain(|issue| issue.kind != IssueKind::WaitingHold);
        }

        let (auto_resolved, mut request) = self
            .dispatch_issues(&mut scanned, &issues, &settings)
            .await;

        if request.is_none() && settings.enable_manual_resolution && analysis.checkout.is_checked_out {
            request = Some(ResolutionRequest {
                barcode: scanned.barcode().to_string(),
                modal: ResolutionType::CheckedOut,
            });
        }
        if let Some(req) = &request {
            scanned.pending_resolution = true;
            scanned.resolution_type = Some(req.modal);
        }

        info!(
            barcode = %scanned.barcode(),
            wrong_place = scanned.wrong_place,
            out_of_order = scanned.out_of_order,
            issues = issues.len(),
            pending = scanned.pending_resolution,
            "Item scanned"
        );

        let barcode = scanned.barcode().to_string();
        self.items.retain(|existing| existing.barcode() != barcode);
        self.items.insert(0, scanned.clone());
        self.persist_items().await;

        Ok(ScanOutcome {
            item: scanned,
            issues,
            auto_resolved,
            resolution_request: request,
        })
    }

    /// Auto-resolve what policy allows; return the first manual request
    async fn dispatch_issues(
        &self,
        scanned: &mut ScannedItem,
        issues: &[Issue],
        settings: &ResolutionSettings,
    ) -> (Vec<IssueKind>, Option<ResolutionRequest>) {
        let mut auto_resolved = Vec::new();
        let mut request = None;

        for issue in issues {
            match resolve(issue.kind, settings) {
                ResolutionDecision::AutoResolve => {
                    let Some(resolution) = modal_for(issue.kind) else {
                        continue;
                    };
                    debug!(
                        barcode = %scanned.barcode(),
                        issue = issue.kind.as_str(),
                        setting = setting_key(issue.kind),
                        "Auto-resolving"
                    );
                    match self.resolver.resolve_item(resolution, &scanned.item).await {
                        Ok(()) => {
                            apply_resolution(&mut scanned.item, issue.kind);
                            auto_resolved.push(issue.kind);
                            self.notify(
                                NoticeLevel::Success,
                                format!(
                                    "Automatically resolved {} for item {}",
                                    issue_label(issue.kind),
                                    scanned.barcode()
                                ),
                            );
                        }
                        Err(e) => {
                            warn!(barcode = %scanned.barcode(), issue = issue.kind.as_str(), error = %e, "Auto-resolution failed");
                            self.notify(
                                NoticeLevel::Error,
                                format!(
                                    "Failed to resolve {} for item {}: {}",
                                    issue_label(issue.kind),
                                    scanned.barcode(),
                                    e
                                ),
                            );
                        }
                    }
                }
                ResolutionDecision::Manual(modal) => {
                    if settings.enable_manual_resolution && request.is_none() {
                        request = Some(ResolutionRequest {
                            barcode: scanned.barcode().to_string(),
                            modal,
                        });
                    }
                }
                ResolutionDecision::Unhandled => {}
            }
        }

        (auto_resolved, request)
    }

    async fn persist_items(&self) {
        if let Err(e) = self.store.save_items(&self.items).await {
            warn!(error = %e, "Failed to persist scanned items");
            self.notify(NoticeLevel::Error, format!("Error saving scanned items: {}", e));
        }
    }

    /// Close the confirmation workflow opened for `barcode`
    pub async fn finish_resolution(&mut self, barcode: &str, outcome: ResolutionOutcome) -> Result<()> {
        self.require_active("finish a resolution")?;

        let entry = self
            .items
            .iter_mut()
            .find(|s| s.barcode() == barcode)
            .ok_or_else(|| Error::NotFound(format!("no scanned item with barcode {}", barcode)))?;

        if !entry.pending_resolution {
            return Err(Error::InvalidState(format!(
                "item {} has no pending resolution",
                barcode
            )));
        }
        entry.pending_resolution = false;

        if outcome == ResolutionOutcome::Resolved {
            if let Some(kind) = entry.resolution_type.and_then(issue_for) {
                apply_resolution(&mut entry.item, kind);
            }
        }
        debug!(barcode, ?outcome, "Resolution finished");

        self.persist_items().await;
        Ok(())
    }

    /// Staff confirmed the workflow: resolve server-side, then close it
    ///
    /// On failure the item stays pending so the confirmation can be retried.
    pub async fn confirm_resolution(&mut self, barcode: &str) -> Result<()> {
        self.require_active("confirm a resolution")?;

        let (resolution, item) = self
            .items
            .iter()
            .find(|s| s.barcode() == barcode && s.pending_resolution)
            .and_then(|s| s.resolution_type.map(|r| (r, s.item.clone())))
            .ok_or_else(|| {
                Error::NotFound(format!("no pending resolution for barcode {}", barcode))
            })?;

        if let Err(e) = self.resolver.resolve_item(resolution, &item).await {
            warn!(barcode, resolution = resolution.as_str(), error = %e, "Manual resolution failed");
            self.notify(
                NoticeLevel::Error,
                format!("Failed to resolve item {}: {}", barcode, e),
            );
            return Err(e);
        }

        self.finish_resolution(barcode, ResolutionOutcome::Resolved).await?;
        self.notify(
            NoticeLevel::Success,
            format!("Item {} resolved ({})", barcode, resolution.as_str()),
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Missing items
    // ------------------------------------------------------------------

    /// Flag one barcode as confirmed absent; false if it already was
    ///
    /// Nothing changes in memory unless the updated set was persisted.
    pub async fn mark_missing(&mut self, barcode: &str) -> Result<bool> {
        self.require_active("mark items missing")?;
        if self.marked_missing_set.contains(barcode) {
            return Ok(false);
        }
        self.commit_marked_missing(&[barcode]).await?;
        self.notify(
            NoticeLevel::Success,
            format!("Item {} marked as missing", barcode),
        );
        Ok(true)
    }

    /// Flag several barcodes at once; returns how many were new
    pub async fn mark_many_missing<S: AsRef<str>>(&mut self, barcodes: &[S]) -> Result<usize> {
        self.require_active("mark items missing")?;

        let mut fresh: Vec<&str> = Vec::new();
        for barcode in barcodes {
            let barcode = barcode.as_ref();
            if !self.marked_missing_set.contains(barcode) && !fresh.contains(&barcode) {
                fresh.push(barcode);
            }
        }
        if fresh.is_empty() {
            return Ok(0);
        }

        self.commit_marked_missing(&fresh).await?;
        self.notify(
            NoticeLevel::Success,
            format!("{} items marked as missing", fresh.len()),
        );
        Ok(fresh.len())
    }

    /// Persist the set extended by `fresh`, then adopt it
    async fn commit_marked_missing(&mut self, fresh: &[&str]) -> Result<()> {
        let mut updated = self.marked_missing.clone();
        updated.extend(fresh.iter().map(|b| b.to_string()));

        if let Err(e) = self.store.save_marked_missing(&updated).await {
            warn!(barcodes = ?fresh, error = %e, "Failed to persist marked-missing set");
            self.notify(
                NoticeLevel::Error,
                format!("Error marking item as missing: {}", e),
            );
            return Err(e);
        }

        self.marked_missing_set.extend(fresh.iter().map(|b| b.to_string()));
        self.marked_missing = updated;
        Ok(())
    }

    fn scanned_barcodes(&self) -> HashSet<String> {
        self.items.iter().map(|s| s.item.barcode.clone()).collect()
    }

    /// Expected items not yet scanned or marked missing
    pub fn missing_items(&self) -> Vec<&LibraryItem> {
        let Some(state) = &self.session else {
            return Vec::new();
        };
        let Some(data) = &state.response_data else {
            return Vec::new();
        };
        compute_missing(
            &data.expected_items,
            &data.fallback_expected_items,
            &self.scanned_barcodes(),
            &self.marked_missing_set,
            state.config.skip_flags(),
        )
    }

    pub fn missing_count(&self) -> usize {
        self.missing_items().len()
    }

    // ------------------------------------------------------------------
    // Report and completion
    // ------------------------------------------------------------------

    /// Render the reconciliation report
    pub fn export(&self, missing_only: bool) -> Result<CsvExport> {
        let expected = self.session.as_ref().map(SessionState::expected).unwrap_or(&[]);
        let export = build_csv(expected, &self.items, &self.catalog_base, missing_only)?;

        self.notify(
            NoticeLevel::Success,
            format!(
                "Exported {} items to CSV{}",
                export.row_count,
                if missing_only { " (missing items only)" } else { "" }
            ),
        );
        Ok(export)
    }

    /// Persist final state, run `reset`, then clear everything persisted
    ///
    /// On a persistence failure the error is reported and the session stays
    /// active; nothing is retried.
    pub async fn complete<F>(&mut self, reset: F) -> Result<()>
    where
        F: FnOnce(),
    {
        self.require_active("end the session")?;

        if let Err(e) = self.finalize(reset).await {
            warn!(error = %e, "Ending session failed");
            self.notify(NoticeLevel::Error, format!("Error ending session: {}", e));
            return Err(e);
        }

        self.reset_memory();
        self.transition_to(SessionPhase::Completed);
        self.notify(NoticeLevel::Status, "Inventory session ended");
        info!("Inventory session ended");
        Ok(())
    }

    async fn finalize<F: FnOnce()>(&self, reset: F) -> Result<()> {
        let state = self
            .session
            .as_ref()
            .ok_or_else(|| Error::InvalidState("no session loaded".to_string()))?;

        self.store.save_session(state).await?;
        self.store.save_items(&self.items).await?;
        if !self.marked_missing.is_empty() {
            self.store.save_marked_missing(&self.marked_missing).await?;
        }

        reset();
        self.store.clear_session().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryEngine;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use shelfcheck_common::notify::RecordingNotifier;

    struct CannedStarter(Value);

    #[async_trait]
    impl SessionStarter for CannedStarter {
        async fn start_session(&self, _config: &SessionConfig) -> Result<Value> {
            Ok(self.0.clone())
        }
    }

    struct AcceptAll;

    #[async_trait]
    impl ItemResolver for AcceptAll {
        async fn resolve_item(&self, _resolution: ResolutionType, _item: &LibraryItem) -> Result<()> {
            Ok(())
        }
    }

    fn controller(response: Value) -> (SessionController, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let store = Arc::new(SessionStore::new(Arc::new(MemoryEngine::new())));
        let controller = SessionController::new(
            store,
            Arc::new(CannedStarter(response)),
            Arc::new(AcceptAll),
            notifier.clone(),
        );
        (controller, notifier)
    }

    fn config() -> SessionConfig {
        SessionConfig {
            inventory_date: "2024-06-01".to_string(),
            compare_barcodes: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(SessionPhase::Idle.to_string(), "idle");
        assert_eq!(SessionPhase::Completed.to_string(), "completed");
    }

    #[tokio::test]
    async fn test_operations_rejected_before_start() {
        let (mut controller, _) = controller(json!({}));

        let err = controller
            .record_scan(LibraryItem {
                barcode: "1".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert!(matches!(controller.mark_missing("1").await, Err(Error::InvalidState(_))));
        assert!(matches!(controller.complete(|| {}).await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_second_initiate_rejected() {
        let (mut controller, _) = controller(json!({"location_data": [{"barcode": "A"}]}));
        controller.initiate(config()).await.unwrap();

        let err = controller.initiate(config()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert_eq!(controller.phase(), SessionPhase::Active);
    }

    #[tokio::test]
    async fn test_rescan_replaces_entry_and_moves_to_front() {
        let (mut controller, _) = controller(json!({"location_data": [{"barcode": "A"}, {"barcode": "B"}]}));
        controller.initiate(config()).await.unwrap();

        for barcode in ["A", "B", "A"] {
            controller
                .record_scan(LibraryItem {
                    barcode: barcode.to_string(),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let order: Vec<&str> = controller.items().iter().map(|s| s.barcode()).collect();
        assert_eq!(order, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_mark_missing_is_idempotent() {
        let (mut controller, notifier) = controller(json!({"location_data": [{"barcode": "A"}]}));
        controller.initiate(config()).await.unwrap();

        assert!(controller.mark_missing("A").await.unwrap());
        assert!(!controller.mark_missing("A").await.unwrap());
        assert_eq!(controller.marked_missing(), &["A".to_string()]);
        assert_eq!(controller.missing_count(), 0);
        assert_eq!(notifier.texts(NoticeLevel::Success), vec!["Item A marked as missing"]);
    }
}
