//! Per-item status classification and issue extraction
//!
//! Everything here is pure: an item (plus "now" and a transit classifier)
//! in, a judgment out. Nothing is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shelfcheck_common::models::LibraryItem;
use shelfcheck_common::time::parse_item_date;

use super::transit::TransitInfo;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutStatus {
    pub is_checked_out: bool,
    pub checkout_date: Option<String>,
    pub due_date: Option<String>,
    pub is_overdue: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LostStatus {
    pub is_lost: bool,
    pub lost_status: Option<String>,
    pub lost_date: Option<String>,
    pub lost_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawnStatus {
    pub is_withdrawn: bool,
    pub withdrawn_status: Option<String>,
    pub withdrawn_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamagedStatus {
    pub is_damaged: bool,
    pub damaged_status: Option<String>,
    pub damaged_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldStatus {
    pub has_hold: bool,
    pub is_waiting: bool,
    pub hold_details: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnClaimStatus {
    pub has_return_claim: bool,
    pub claim_details: Option<Value>,
    pub claims_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchStatus {
    pub has_branch_mismatch: bool,
    pub home_branch: Option<String>,
    pub holding_branch: Option<String>,
    pub needs_transfer: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restrictions {
    pub is_restricted: bool,
    pub restricted_status: Option<String>,
    pub not_for_loan: bool,
    pub not_for_loan_status: Option<String>,
}

/// Composite status record for one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusAnalysis {
    pub checkout: CheckoutStatus,
    pub lost: LostStatus,
    pub withdrawn: WithdrawnStatus,
    pub damaged: DamagedStatus,
    pub hold: HoldStatus,
    pub transit: TransitInfo,
    pub return_claim: ReturnClaimStatus,
    pub branch: BranchStatus,
    pub restrictions: Restrictions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Overdue,
    Lost,
    Withdrawn,
    Damaged,
    ReturnClaim,
    Transit,
    BranchMismatch,
    WaitingHold,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::Overdue => "overdue",
            IssueKind::Lost => "lost",
            IssueKind::Withdrawn => "withdrawn",
            IssueKind::Damaged => "damaged",
            IssueKind::ReturnClaim => "return_claim",
            IssueKind::Transit => "transit",
            IssueKind::BranchMismatch => "branch_mismatch",
            IssueKind::WaitingHold => "waiting_hold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn rank(&self) -> u8 {
        match self {
            Severity::High => 3,
            Severity::Medium => 2,
            Severity::Low => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
}

impl Issue {
    fn new(kind: IssueKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
        }
    }
}

/// Present and not the "no" code
fn is_set_code(code: Option<&str>) -> bool {
    code.is_some_and(|c| c != "0")
}

pub fn lost_description(code: &str) -> String {
    match code {
        "1" => "Lost".to_string(),
        "2" => "Long Overdue (Lost)".to_string(),
        "3" => "Lost and Paid For".to_string(),
        "4" => "Missing".to_string(),
        other => format!("Lost Status: {}", other),
    }
}

pub fn analyze_checkout(item: &LibraryItem, now: DateTime<Utc>) -> CheckoutStatus {
    let is_overdue = item
        .due_date
        .as_deref()
        .and_then(parse_item_date)
        .is_some_and(|due| due < now);

    CheckoutStatus {
        is_checked_out: item.checked_out_date.is_some(),
        checkout_date: item.checked_out_date.clone(),
        due_date: item.due_date.clone(),
        is_overdue,
    }
}

pub fn analyze_lost(item: &LibraryItem) -> LostStatus {
    let is_lost = is_set_code(item.lost_status.as_deref());
    LostStatus {
        is_lost,
        lost_status: item.lost_status.clone(),
        lost_date: item.lost_date.clone(),
        lost_description: item
            .lost_status
            .as_deref()
            .filter(|_| is_lost)
            .map(lost_description),
    }
}

pub fn analyze_withdrawn(item: &LibraryItem) -> WithdrawnStatus {
    WithdrawnStatus {
        is_withdrawn: item.withdrawn.as_deref() == Some("1"),
        withdrawn_status: item.withdrawn.clone(),
        withdrawn_date: item.withdrawn_date.clone(),
    }
}

pub fn analyze_damaged(item: &LibraryItem) -> DamagedStatus {
    DamagedStatus {
        is_damaged: is_set_code(item.damaged_status.as_deref()),
        damaged_status: item.damaged_status.clone(),
        damaged_date: item.damaged_date.clone(),
    }
}

pub fn analyze_hold(item: &LibraryItem) -> HoldStatus {
    HoldStatus {
        has_hold: item.first_hold.is_some(),
        is_waiting: item.waiting,
        hold_details: item.first_hold.clone(),
    }
}

pub fn analyze_return_claim(item: &LibraryItem) -> ReturnClaimStatus {
    ReturnClaimStatus {
        has_return_claim: item.return_claim.is_some(),
        claim_details: item.return_claim.clone(),
        claims_count: item.return_claims.as_ref().map_or(0, Vec::len),
    }
}

pub fn analyze_branch(item: &LibraryItem) -> BranchStatus {
    let has_branch_mismatch = item.has_branch_mismatch();
    BranchStatus {
        has_branch_mismatch,
        home_branch: item.home_branch.clone(),
        holding_branch: item.holding_branch.clone(),
        needs_transfer: has_branch_mismatch && item.checked_out_date.is_none(),
    }
}

pub fn analyze_restrictions(item: &LibraryItem) -> Restrictions {
    Restrictions {
        is_restricted: is_set_code(item.restricted_status.as_deref()),
        restricted_status: item.restricted_status.clone(),
        not_for_loan: is_set_code(item.not_for_loan_status.as_deref()),
        not_for_loan_status: item.not_for_loan_status.clone(),
    }
}

/// Compose every aspect, using `transit_fn` for the transit classification
pub fn analyze_item_status<F>(item: &LibraryItem, now: DateTime<Utc>, transit_fn: F) -> StatusAnalysis
where
    F: Fn(&LibraryItem) -> TransitInfo,
{
    StatusAnalysis {
        checkout: analyze_checkout(item, now),
        lost: analyze_lost(item),
        withdrawn: analyze_withdrawn(item),
        damaged: analyze_damaged(item),
        hold: analyze_hold(item),
        transit: transit_fn(item),
        return_claim: analyze_return_claim(item),
        branch: analyze_branch(item),
        restrictions: analyze_restrictions(item),
    }
}

/// Issues worth staff attention, most severe first
///
/// Sorting is stable, so issues of equal severity keep detection order.
pub fn problematic_statuses(analysis: &StatusAnalysis) -> Vec<Issue> {
    let mut issues = Vec::new();

    if analysis.checkout.is_overdue {
        issues.push(Issue::new(IssueKind::Overdue, Severity::High, "Item is overdue"));
    }
    if analysis.lost.is_lost {
        let message = analysis.lost.lost_description.clone().unwrap_or_default();
        issues.push(Issue::new(IssueKind::Lost, Severity::High, message));
    }
    if analysis.withdrawn.is_withdrawn {
        issues.push(Issue::new(IssueKind::Withdrawn, Severity::Medium, "Item is withdrawn"));
    }
    if analysis.damaged.is_damaged {
        issues.push(Issue::new(IssueKind::Damaged, Severity::Medium, "Item is damaged"));
    }
    if analysis.return_claim.has_return_claim {
        issues.push(Issue::new(
            IssueKind::ReturnClaim,
            Severity::High,
            "Item has unresolved return claim",
        ));
    }
    if analysis.transit.in_transit {
        issues.push(Issue::new(IssueKind::Transit, Severity::Low, "Item in transit"));
    }
    if analysis.branch.has_branch_mismatch && !analysis.checkout.is_checked_out {
        issues.push(Issue::new(
            IssueKind::BranchMismatch,
            Severity::Medium,
            "Item at wrong branch",
        ));
    }
    if analysis.hold.has_hold && analysis.hold.is_waiting {
        issues.push(Issue::new(
            IssueKind::WaitingHold,
            Severity::High,
            "Item has hold waiting for pickup",
        ));
    }

    issues.sort_by(|a, b| b.severity.rank().cmp(&a.severity.rank()));
    issues
}
