//! Issue-resolution policy

use shelfcheck_common::models::{LibraryItem, ResolutionSettings, ResolutionType};

use super::status::IssueKind;

/// What to do with one detected issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionDecision {
    /// Resolve through the item resolver without asking
    AutoResolve,
    /// Open the given confirmation workflow
    Manual(ResolutionType),
    /// No policy covers this issue
    Unhandled,
}

/// Settings key governing `kind`, if any
pub fn setting_key(kind: IssueKind) -> Option<&'static str> {
    match kind {
        IssueKind::Lost => Some("resolveLostItems"),
        IssueKind::Withdrawn => Some("resolveWithdrawnItems"),
        IssueKind::Transit => Some("resolveInTransitItems"),
        IssueKind::ReturnClaim => Some("resolveReturnClaims"),
        _ => None,
    }
}

pub fn modal_for(kind: IssueKind) -> Option<ResolutionType> {
    match kind {
        IssueKind::Lost => Some(ResolutionType::Lost),
        IssueKind::Withdrawn => Some(ResolutionType::Withdrawn),
        IssueKind::Transit => Some(ResolutionType::InTransit),
        IssueKind::ReturnClaim => Some(ResolutionType::ReturnClaim),
        _ => None,
    }
}

fn auto_enabled(kind: IssueKind, settings: &ResolutionSettings) -> Option<bool> {
    match kind {
        IssueKind::Lost => Some(settings.resolve_lost_items),
        IssueKind::Withdrawn => Some(settings.resolve_withdrawn_items),
        IssueKind::Transit => Some(settings.resolve_in_transit_items),
        IssueKind::ReturnClaim => Some(settings.resolve_return_claims),
        _ => None,
    }
}

pub fn resolve(kind: IssueKind, settings: &ResolutionSettings) -> ResolutionDecision {
    match (auto_enabled(kind, settings), modal_for(kind)) {
        (Some(true), _) => ResolutionDecision::AutoResolve,
        (Some(false), Some(modal)) => ResolutionDecision::Manual(modal),
        _ => ResolutionDecision::Unhandled,
    }
}

/// Reflect a successful server-side resolution in the local record
pub fn apply_resolution(item: &mut LibraryItem, kind: IssueKind) {
    match kind {
        IssueKind::Lost => item.lost_status = Some("0".to_string()),
        IssueKind::Withdrawn => item.withdrawn = Some("0".to_string()),
        IssueKind::Transit => {
            item.transfer = None;
            item.in_transit = false;
        }
        IssueKind::ReturnClaim => {
            item.return_claim = None;
            item.return_claims = None;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfcheck_common::models::TransferRecord;

    #[test]
    fn test_lost_without_auto_resolution_opens_lost_modal() {
        let settings = ResolutionSettings {
            resolve_lost_items: false,
            ..Default::default()
        };
        assert_eq!(
            resolve(IssueKind::Lost, &settings),
            ResolutionDecision::Manual(ResolutionType::Lost)
        );
    }

    #[test]
    fn test_enabled_settings_auto_resolve() {
        let settings = ResolutionSettings {
            enable_manual_resolution: true,
            resolve_lost_items: true,
            resolve_withdrawn_items: true,
            resolve_in_transit_items: true,
            resolve_return_claims: true,
        };
        for kind in [IssueKind::Lost, IssueKind::Withdrawn, IssueKind::Transit, IssueKind::ReturnClaim] {
            assert_eq!(resolve(kind, &settings), ResolutionDecision::AutoResolve);
        }
    }

    #[test]
    fn test_modal_discriminators() {
        let settings = ResolutionSettings::default();
        assert_eq!(
            resolve(IssueKind::Transit, &settings),
            ResolutionDecision::Manual(ResolutionType::InTransit)
        );
        assert_eq!(
            resolve(IssueKind::ReturnClaim, &settings),
            ResolutionDecision::Manual(ResolutionType::ReturnClaim)
        );
        assert_eq!(setting_key(IssueKind::Transit), Some("resolveInTransitItems"));
    }

    #[test]
    fn test_unmapped_issues_are_unhandled() {
        let settings = ResolutionSettings::default();
        for kind in [
            IssueKind::Overdue,
            IssueKind::Damaged,
            IssueKind::BranchMismatch,
            IssueKind::WaitingHold,
        ] {
            assert_eq!(resolve(kind, &settings), ResolutionDecision::Unhandled);
            assert_eq!(setting_key(kind), None);
        }
    }

    #[test]
    fn test_apply_resolution_clears_markers() {
        let mut item = LibraryItem {
            barcode: "1".to_string(),
            lost_status: Some("1".to_string()),
            withdrawn: Some("1".to_string()),
            in_transit: true,
            transfer: Some(TransferRecord::default()),
            return_claim: Some(serde_json::json!({"id": 1})),
            return_claims: Some(vec![serde_json::json!({"id": 1})]),
            ..Default::default()
        };

        apply_resolution(&mut item, IssueKind::Lost);
        apply_resolution(&mut item, IssueKind::Withdrawn);
        apply_resolution(&mut item, IssueKind::Transit);
        apply_resolution(&mut item, IssueKind::ReturnClaim);

        assert_eq!(item.lost_status.as_deref(), Some("0"));
        assert_eq!(item.withdrawn.as_deref(), Some("0"));
        assert!(!item.in_transit && item.transfer.is_none());
        assert!(item.return_claim.is_none() && item.return_claims.is_none());
    }
}
