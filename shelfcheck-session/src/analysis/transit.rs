//! Transit classification from branch-transfer records

use serde::{Deserialize, Serialize};
use shelfcheck_common::models::{LibraryItem, TransferRecord};

/// Semantic category of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitType {
    Hold,
    Return,
    Manual,
    Stockrotation,
    Collection,
    Recall,
    Lost,
    Cancelled,
    Other,
}

impl TransitType {
    /// Map a catalogue transfer reason; unknown reasons are [`TransitType::Other`]
    pub fn from_reason(reason: &str) -> Self {
        match reason {
            "Reserve" => TransitType::Hold,
            "ReturnToHome" | "ReturnToHolding" => TransitType::Return,
            "Manual" => TransitType::Manual,
            "StockrotationAdvance" | "StockrotationRepatriation" => TransitType::Stockrotation,
            "RotatingCollection" => TransitType::Collection,
            "Recall" => TransitType::Recall,
            "LostReserve" => TransitType::Lost,
            "CancelReserve" | "RecallCancellation" => TransitType::Cancelled,
            _ => TransitType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransitType::Hold => "hold",
            TransitType::Return => "return",
            TransitType::Manual => "manual",
            TransitType::Stockrotation => "stockrotation",
            TransitType::Collection => "collection",
            TransitType::Recall => "recall",
            TransitType::Lost => "lost",
            TransitType::Cancelled => "cancelled",
            TransitType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitInfo {
    pub in_transit: bool,
    pub transit_type: Option<TransitType>,
    pub is_hold_transit: bool,
    pub is_return_transit: bool,
    pub is_manual_transit: bool,
    pub is_stockrotation_transit: bool,
    pub is_collection_transit: bool,
    pub is_recall_transit: bool,
    pub from_branch: Option<String>,
    pub to_branch: Option<String>,
    pub date_sent: Option<String>,
}

/// Classify a transfer record. Absent record → not in transit.
pub fn classify(transfer: Option<&TransferRecord>) -> TransitInfo {
    let Some(record) = transfer else {
        return TransitInfo::default();
    };

    let kind = TransitType::from_reason(record.reason.as_deref().unwrap_or_default());
    TransitInfo {
        in_transit: true,
        transit_type: Some(kind),
        is_hold_transit: kind == TransitType::Hold,
        is_return_transit: kind == TransitType::Return,
        is_manual_transit: kind == TransitType::Manual,
        is_stockrotation_transit: kind == TransitType::Stockrotation,
        is_collection_transit: kind == TransitType::Collection,
        is_recall_transit: kind == TransitType::Recall,
        from_branch: record.from_branch.clone(),
        to_branch: record.to_branch.clone(),
        date_sent: record.date_sent.clone(),
    }
}

/// Transit classification of an item's current transfer record
pub fn transit_info(item: &LibraryItem) -> TransitInfo {
    classify(item.transfer.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(reason: &str) -> TransferRecord {
        TransferRecord {
            reason: Some(reason.to_string()),
            from_branch: Some("CPL".to_string()),
            to_branch: Some("MPL".to_string()),
            date_sent: Some("2024-05-01".to_string()),
        }
    }

    #[test]
    fn test_no_transfer_record() {
        let info = classify(None);
        assert!(!info.in_transit);
        assert_eq!(info.transit_type, None);
        assert!(info.from_branch.is_none() && info.to_branch.is_none() && info.date_sent.is_none());
    }

    #[test]
    fn test_reserve_is_hold_transit() {
        let info = classify(Some(&record("Reserve")));
        assert!(info.in_transit);
        assert!(info.is_hold_transit);
        assert!(!info.is_return_transit);
        assert_eq!(info.transit_type, Some(TransitType::Hold));
        assert_eq!(info.from_branch.as_deref(), Some("CPL"));
        assert_eq!(info.to_branch.as_deref(), Some("MPL"));
        assert_eq!(info.date_sent.as_deref(), Some("2024-05-01"));
    }

    #[test]
    fn test_reason_table() {
        let cases = [
            ("ReturnToHome", TransitType::Return),
            ("ReturnToHolding", TransitType::Return),
            ("Manual", TransitType::Manual),
            ("StockrotationAdvance", TransitType::Stockrotation),
            ("StockrotationRepatriation", TransitType::Stockrotation),
            ("RotatingCollection", TransitType::Collection),
            ("Recall", TransitType::Recall),
            ("LostReserve", TransitType::Lost),
            ("CancelReserve", TransitType::Cancelled),
            ("RecallCancellation", TransitType::Cancelled),
        ];
        for (reason, expected) in cases {
            assert_eq!(TransitType::from_reason(reason), expected, "reason {}", reason);
        }
    }

    #[test]
    fn test_unknown_and_missing_reasons_are_other() {
        for reason in ["", "reserve", "Teleport"] {
            assert_eq!(TransitType::from_reason(reason), TransitType::Other);
        }
        let info = classify(Some(&TransferRecord::default()));
        assert!(info.in_transit);
        assert_eq!(info.transit_type, Some(TransitType::Other));
        assert!(!info.is_hold_transit && !info.is_recall_transit);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&TransitType::Stockrotation).unwrap(), "\"stockrotation\"");
        assert_eq!(TransitType::Cancelled.as_str(), "cancelled");
    }
}
