//! Session configuration, server snapshot and scanned-item models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::item::LibraryItem;
use crate::{Error, Result};

/// How detected issues are resolved for this session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolutionSettings {
    pub enable_manual_resolution: bool,
    pub resolve_lost_items: bool,
    pub resolve_withdrawn_items: bool,
    pub resolve_in_transit_items: bool,
    pub resolve_return_claims: bool,
}

impl Default for ResolutionSettings {
    fn default() -> Self {
        Self {
            enable_manual_resolution: true,
            resolve_lost_items: false,
            resolve_withdrawn_items: false,
            resolve_in_transit_items: false,
            resolve_return_claims: false,
        }
    }
}

/// Which expected items the missing-item check leaves out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipFlags {
    pub skip_checked_out: bool,
    pub skip_in_transit: bool,
    pub skip_branch_mismatch: bool,
}

/// Filters and options chosen on the start form. Immutable once a session starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    pub inventory_date: String,
    pub selected_library_id: Option<String>,
    pub shelving_location: Option<String>,
    /// Shelving location code → display name
    pub shelving_locations: BTreeMap<String, String>,
    pub ccode: Option<String>,
    pub selected_itypes: Vec<String>,
    pub min_location: Option<String>,
    pub max_location: Option<String>,
    pub date_last_seen: Option<String>,
    pub compare_barcodes: bool,
    pub skip_checked_out_items: bool,
    pub skip_in_transit_items: bool,
    pub skip_branch_mismatch_items: bool,
    pub ignore_waiting_holds: bool,
    /// Status field (`items.itemlost`, ...) → values accepted on the shelf
    pub selected_statuses: BTreeMap<String, Vec<String>>,
    pub alert_settings: Map<String, Value>,
    pub preview_settings: Map<String, Value>,
    pub resolution_settings: Option<ResolutionSettings>,
}

impl SessionConfig {
    /// Reject configurations the server would choke on
    pub fn validate(&self) -> Result<()> {
        let date = self.inventory_date.trim();
        if date.is_empty() {
            return Err(Error::Validation("inventory date is required".to_string()));
        }
        if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err()
            && crate::time::parse_item_date(date).is_none()
        {
            return Err(Error::Validation(format!(
                "inventory date '{}' is not a valid date",
                date
            )));
        }
        if let Some(seen) = self.date_last_seen.as_deref().filter(|s| !s.is_empty()) {
            if crate::time::parse_item_date(seen).is_none() {
                return Err(Error::Validation(format!(
                    "last-seen date '{}' is not a valid date",
                    seen
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.min_location.as_deref(), self.max_location.as_deref()) {
            if !min.is_empty() && !max.is_empty() && min > max {
                return Err(Error::Validation(format!(
                    "call number range is inverted: '{}' > '{}'",
                    min, max
                )));
            }
        }
        Ok(())
    }

    /// Resolution settings with defaults applied
    pub fn effective_resolution_settings(&self) -> ResolutionSettings {
        self.resolution_settings.unwrap_or_default()
    }

    pub fn skip_flags(&self) -> SkipFlags {
        SkipFlags {
            skip_checked_out: self.skip_checked_out_items,
            skip_in_transit: self.skip_in_transit_items,
            skip_branch_mismatch: self.skip_branch_mismatch_items,
        }
    }

    /// Display name of the shelving location filter, falling back to its code
    pub fn shelving_location_name(&self) -> Option<&str> {
        self.shelving_location.as_deref().map(|code| {
            self.shelving_locations
                .get(code)
                .map(String::as_str)
                .unwrap_or(code)
        })
    }
}

/// Snapshot reported by the server when a session starts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionResponseData {
    pub expected_items: Vec<LibraryItem>,
    pub fallback_expected_items: Vec<LibraryItem>,
    pub total_records: u64,
}

impl SessionResponseData {
    /// Normalize a start-session response body.
    ///
    /// Missing or non-array list fields become empty lists and a missing
    /// total becomes 0. An `{error}` body is an [`Error::Api`].
    pub fn normalize(raw: &Value) -> Result<Self> {
        let obj = match raw {
            Value::Null => return Err(Error::InvalidResponse("Empty response received".to_string())),
            Value::Object(obj) => obj,
            other => {
                return Err(Error::InvalidResponse(format!(
                    "expected a JSON object, got {}",
                    json_kind(other)
                )))
            }
        };

        if let Some(error) = obj.get("error").filter(|e| !e.is_null()) {
            let message = error
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(Error::Api(message));
        }

        let expected = list_field(obj, &["expectedItems", "location_data"]);
        let fallback = list_field(obj, &["fallbackExpectedItems", "right_place_list"]);
        let total_records = ["totalRecords", "total_records"]
            .iter()
            .find_map(|k| obj.get(*k))
            .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
            .unwrap_or(0);

        Ok(Self {
            expected_items: LibraryItem::from_json_list(expected),
            fallback_expected_items: LibraryItem::from_json_list(fallback),
            total_records,
        })
    }

    /// Primary expected list, or the fallback list when the primary is empty
    pub fn effective_expected(&self) -> &[LibraryItem] {
        if self.expected_items.is_empty() {
            &self.fallback_expected_items
        } else {
            &self.expected_items
        }
    }
}

fn list_field<'a>(obj: &'a Map<String, Value>, aliases: &[&str]) -> &'a [Value] {
    let found = aliases.iter().find_map(|k| obj.get(*k).map(|v| (*k, v)));
    match found {
        Some((_, Value::Array(items))) => items,
        Some((key, other)) => {
            tracing::warn!(field = key, kind = json_kind(other), "Invalid list in session response");
            &[]
        }
        None => {
            tracing::warn!(field = aliases[0], "List missing from session response");
            &[]
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Persisted session object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub session_id: Uuid,
    pub config: SessionConfig,
    pub resolution_settings: ResolutionSettings,
    #[serde(default)]
    pub response_data: Option<SessionResponseData>,
    pub started_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new(config: SessionConfig, started_at: DateTime<Utc>) -> Self {
        let resolution_settings = config.effective_resolution_settings();
        Self {
            session_id: Uuid::new_v4(),
            config,
            resolution_settings,
            response_data: None,
            started_at,
        }
    }

    /// Expected list used for missing detection and reconciliation
    pub fn expected(&self) -> &[LibraryItem] {
        self.response_data
            .as_ref()
            .map(SessionResponseData::effective_expected)
            .unwrap_or(&[])
    }

    pub fn total_records(&self) -> u64 {
        self.response_data.as_ref().map(|d| d.total_records).unwrap_or(0)
    }
}

/// Confirmation workflow a manual resolution opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionType {
    Lost,
    Withdrawn,
    #[serde(rename = "intransit")]
    InTransit,
    #[serde(rename = "returnclaim")]
    ReturnClaim,
    #[serde(rename = "checkedout")]
    CheckedOut,
}

impl ResolutionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionType::Lost => "lost",
            ResolutionType::Withdrawn => "withdrawn",
            ResolutionType::InTransit => "intransit",
            ResolutionType::ReturnClaim => "returnclaim",
            ResolutionType::CheckedOut => "checkedout",
        }
    }
}

/// Status field whose value is not accepted for this session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidStatus {
    pub key: String,
    pub value: String,
}

/// An item recorded by a scan event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedItem {
    pub item: LibraryItem,
    pub was_scanned: bool,
    #[serde(default)]
    pub was_lost: bool,
    #[serde(default)]
    pub wrong_place: bool,
    #[serde(default)]
    pub out_of_order: bool,
    #[serde(default)]
    pub invalid_status: Option<InvalidStatus>,
    #[serde(default)]
    pub pending_resolution: bool,
    #[serde(default)]
    pub resolution_type: Option<ResolutionType>,
    #[serde(default)]
    pub original_lost_status: Option<String>,
    pub scanned_at: DateTime<Utc>,
}

impl ScannedItem {
    pub fn new(item: LibraryItem, scanned_at: DateTime<Utc>) -> Self {
        Self {
            item,
            was_scanned: true,
            was_lost: false,
            wrong_place: false,
            out_of_order: false,
            invalid_status: None,
            pending_resolution: false,
            resolution_type: None,
            original_lost_status: None,
            scanned_at,
        }
    }

    pub fn barcode(&self) -> &str {
        &self.item.barcode
    }
}
