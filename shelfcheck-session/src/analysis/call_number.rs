//! Shelf-order tracking and allowed-status checks

use shelfcheck_common::models::{InvalidStatus, LibraryItem};
use std::collections::BTreeMap;

/// Highest call-number sort key seen in this session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallNumberTracker {
    highest_sort: Option<String>,
    barcode: Option<String>,
    biblio_id: Option<String>,
}

impl CallNumberTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn highest_sort(&self) -> Option<&str> {
        self.highest_sort.as_deref()
    }

    /// Barcode of the item holding the highest sort key
    pub fn barcode(&self) -> Option<&str> {
        self.barcode.as_deref()
    }

    pub fn biblio_id(&self) -> Option<&str> {
        self.biblio_id.as_deref()
    }

    /// Out of order iff both keys are present and `sort` precedes the highest
    pub fn is_out_of_order(&self, sort: Option<&str>) -> bool {
        match (sort.filter(|s| !s.is_empty()), self.highest_sort.as_deref()) {
            (Some(current), Some(highest)) => current < highest,
            _ => false,
        }
    }

    /// Raise the high-water mark if `item` sorts above it
    pub fn observe(&mut self, item: &LibraryItem) {
        let Some(sort) = item.call_number_sort.as_deref().filter(|s| !s.is_empty()) else {
            return;
        };
        if self.highest_sort.as_deref().map_or(true, |highest| sort > highest) {
            self.highest_sort = Some(sort.to_string());
            self.barcode = Some(item.barcode.clone());
            self.biblio_id = item.biblio_id.clone();
        }
    }

    /// Rebuild from a full item list (after a restore)
    pub fn recompute<'a>(&mut self, items: impl IntoIterator<Item = &'a LibraryItem>) {
        *self = Self::default();
        for item in items {
            self.observe(item);
        }
    }
}

/// Status fields checked against the session's allowed values, in order
pub const STATUS_KEYS: [&str; 4] = [
    "items.itemlost",
    "items.notforloan",
    "items.withdrawn",
    "items.damaged",
];

/// First status value outside the allowed set, if any
///
/// An absent value reads as "0". A field with no allowed list accepts only "0".
pub fn check_item_statuses(
    item: &LibraryItem,
    selected_statuses: &BTreeMap<String, Vec<String>>,
) -> Option<InvalidStatus> {
    let values = [
        item.lost_status.as_deref(),
        item.not_for_loan_status.as_deref(),
        item.withdrawn.as_deref(),
        item.damaged_status.as_deref(),
    ];

    STATUS_KEYS.iter().zip(values).find_map(|(key, value)| {
        let value = value.unwrap_or("0");
        if value == "0" {
            return None;
        }
        let allowed = selected_statuses
            .get(*key)
            .is_some_and(|list| list.iter().any(|v| v == value));
        (!allowed).then(|| InvalidStatus {
            key: key.to_string(),
            value: value.to_string(),
        })
    })
}
