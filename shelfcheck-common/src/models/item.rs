//! Library item model and field-alias ingestion
//!
//! The catalogue reports items under two naming schemes (the inventory
//! report uses `barcode`/`itemnumber`/`homebranch`, the REST API uses
//! `external_id`/`item_id`/`home_library_id`). [`LibraryItem::from_json`]
//! resolves both through one alias table so everything downstream sees a
//! single schema.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Transfer record attached to an item that is moving between branches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferRecord {
    pub reason: Option<String>,
    pub from_branch: Option<String>,
    pub to_branch: Option<String>,
    pub date_sent: Option<String>,
}

/// Catalogue item in the internal schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryItem {
    pub barcode: String,
    pub item_id: Option<String>,
    pub biblio_id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub publication_year: Option<String>,
    pub publisher: Option<String>,
    pub isbn: Option<String>,
    pub pages: Option<String>,
    pub location: Option<String>,
    pub acquisition_date: Option<String>,
    pub last_seen_date: Option<String>,
    pub call_number: Option<String>,
    pub call_number_sort: Option<String>,
    /// Checkout marker reported by the inventory report
    pub checked_out: bool,
    pub checked_out_date: Option<String>,
    pub due_date: Option<String>,
    pub lost_status: Option<String>,
    pub lost_date: Option<String>,
    pub withdrawn: Option<String>,
    pub withdrawn_date: Option<String>,
    pub damaged_status: Option<String>,
    pub damaged_date: Option<String>,
    pub restricted_status: Option<String>,
    pub not_for_loan_status: Option<String>,
    pub first_hold: Option<Value>,
    pub waiting: bool,
    pub return_claim: Option<Value>,
    pub return_claims: Option<Vec<Value>>,
    pub home_branch: Option<String>,
    pub holding_branch: Option<String>,
    pub in_transit: bool,
    pub transfer: Option<TransferRecord>,
}

// Alias table: first non-empty value wins, in the listed order.
const BARCODE: &[&str] = &["barcode", "external_id"];
const ITEM_ID: &[&str] = &["itemnumber", "item_id"];
const BIBLIO_ID: &[&str] = &["biblionumber", "biblio_id"];
const LAST_SEEN: &[&str] = &["datelastseen", "last_seen_date"];
const HOME_BRANCH: &[&str] = &["homebranch", "home_library_id"];
const HOLDING_BRANCH: &[&str] = &["holdingbranch", "holding_library_id"];
const CALL_NUMBER: &[&str] = &["itemcallnumber", "callnumber", "call_number"];
const CALL_NUMBER_SORT: &[&str] = &["call_number_sort", "cn_sort"];
const LOST: &[&str] = &["lost_status", "itemlost"];
const DAMAGED: &[&str] = &["damaged_status", "damaged"];
const NOT_FOR_LOAN: &[&str] = &["not_for_loan_status", "notforloan"];
const RESTRICTED: &[&str] = &["restricted_status", "restricted"];
const ACQUISITION: &[&str] = &["acquisition_date", "dateaccessioned"];
const TRANSFER_FROM: &[&str] = &["frombranch", "from_library_id"];
const TRANSFER_TO: &[&str] = &["tobranch", "to_library_id"];
const TRANSFER_SENT: &[&str] = &["datesent", "date_sent"];

impl LibraryItem {
    /// Ingest a raw catalogue record (either naming scheme)
    pub fn from_json(raw: &Value) -> Result<Self> {
        let obj = raw
            .as_object()
            .ok_or_else(|| Error::Validation("item record is not a JSON object".to_string()))?;

        let barcode = first_scalar(obj, BARCODE)
            .ok_or_else(|| Error::Validation("item record has no barcode".to_string()))?;

        let biblio = obj.get("biblio").and_then(Value::as_object);
        let from_biblio = |field: &str| biblio.and_then(|b| first_scalar(b, &[field]));

        Ok(Self {
            barcode,
            item_id: first_scalar(obj, ITEM_ID),
            biblio_id: first_scalar(obj, BIBLIO_ID),
            title: first_scalar(obj, &["title"]).or_else(|| from_biblio("title")),
            author: first_scalar(obj, &["author"]).or_else(|| from_biblio("author")),
            publication_year: from_biblio("publication_year")
                .or_else(|| first_scalar(obj, &["publication_year", "copyrightdate"])),
            publisher: from_biblio("publisher").or_else(|| first_scalar(obj, &["publisher"])),
            isbn: from_biblio("isbn").or_else(|| first_scalar(obj, &["isbn"])),
            pages: from_biblio("pages").or_else(|| first_scalar(obj, &["pages"])),
            location: first_scalar(obj, &["location"]),
            acquisition_date: first_scalar(obj, ACQUISITION),
            last_seen_date: first_scalar(obj, LAST_SEEN),
            call_number: first_scalar(obj, CALL_NUMBER),
            call_number_sort: first_scalar(obj, CALL_NUMBER_SORT),
            checked_out: obj.get("checked_out").is_some_and(is_truthy),
            checked_out_date: first_scalar(obj, &["checked_out_date"]),
            due_date: first_scalar(obj, &["due_date"]),
            lost_status: first_scalar(obj, LOST),
            lost_date: first_scalar(obj, &["lost_date"]),
            withdrawn: first_scalar(obj, &["withdrawn"]),
            withdrawn_date: first_scalar(obj, &["withdrawn_date"]),
            damaged_status: first_scalar(obj, DAMAGED),
            damaged_date: first_scalar(obj, &["damaged_date"]),
            restricted_status: first_scalar(obj, RESTRICTED),
            not_for_loan_status: first_scalar(obj, NOT_FOR_LOAN),
            first_hold: truthy_value(obj, "first_hold"),
            waiting: obj.get("waiting").is_some_and(is_truthy),
            return_claim: truthy_value(obj, "return_claim"),
            return_claims: obj
                .get("return_claims")
                .and_then(Value::as_array)
                .cloned(),
            home_branch: first_scalar(obj, HOME_BRANCH),
            holding_branch: first_scalar(obj, HOLDING_BRANCH),
            in_transit: obj.get("in_transit").is_some_and(is_truthy),
            transfer: obj
                .get("transfer")
                .and_then(Value::as_object)
                .map(|t| TransferRecord {
                    reason: first_scalar(t, &["reason"]),
                    from_branch: first_scalar(t, TRANSFER_FROM),
                    to_branch: first_scalar(t, TRANSFER_TO),
                    date_sent: first_scalar(t, TRANSFER_SENT),
                }),
        })
    }

    /// Ingest a list of raw records, skipping entries without a barcode
    pub fn from_json_list(raw: &[Value]) -> Vec<Self> {
        raw.iter()
            .filter_map(|value| match Self::from_json(value) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unusable item record");
                    None
                }
            })
            .collect()
    }

    /// Checked out by either marker (flag or checkout date)
    pub fn has_checkout_marker(&self) -> bool {
        self.checked_out || self.checked_out_date.is_some()
    }

    /// Home branch differs from holding branch
    pub fn has_branch_mismatch(&self) -> bool {
        self.home_branch != self.holding_branch
    }
}

/// First alias holding a usable scalar, rendered as a string
fn first_scalar(obj: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|key| obj.get(*key).and_then(scalar_to_string))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        _ => None,
    }
}

fn truthy_value(obj: &Map<String, Value>, key: &str) -> Option<Value> {
    obj.get(key).filter(|v| is_truthy(v)).cloned()
}

/// Loose truthiness as the catalogue uses it: null, false, 0, "" and "0" are false
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inventory_report_schema() {
        let item = LibraryItem::from_json(&json!({
            "barcode": "39999000001",
            "itemnumber": 17,
            "biblionumber": 4,
            "title": "Dune",
            "homebranch": "CPL",
            "holdingbranch": "MPL",
            "datelastseen": "2024-01-02",
            "itemlost": 0
        }))
        .unwrap();

        assert_eq!(item.barcode, "39999000001");
        assert_eq!(item.item_id.as_deref(), Some("17"));
        assert_eq!(item.biblio_id.as_deref(), Some("4"));
        assert_eq!(item.title.as_deref(), Some("Dune"));
        assert_eq!(item.last_seen_date.as_deref(), Some("2024-01-02"));
        assert_eq!(item.lost_status.as_deref(), Some("0"));
        assert!(item.has_branch_mismatch());
    }

    #[test]
    fn test_rest_api_schema() {
        let item = LibraryItem::from_json(&json!({
            "external_id": "39999000002",
            "item_id": 18,
            "biblio_id": 5,
            "home_library_id": "CPL",
            "holding_library_id": "CPL",
            "last_seen_date": "2024-02-03",
            "biblio": {"title": "Emma", "author": "Austen", "isbn": "978-0"}
        }))
        .unwrap();

        assert_eq!(item.barcode, "39999000002");
        assert_eq!(item.item_id.as_deref(), Some("18"));
        assert_eq!(item.title.as_deref(), Some("Emma"));
        assert_eq!(item.author.as_deref(), Some("Austen"));
        assert_eq!(item.isbn.as_deref(), Some("978-0"));
        assert!(!item.has_branch_mismatch());
    }

    #[test]
    fn test_first_alias_wins_and_empty_strings_fall_through() {
        let item = LibraryItem::from_json(&json!({
            "barcode": "",
            "external_id": "B-1",
            "homebranch": "",
            "home_library_id": "FPL"
        }))
        .unwrap();
        assert_eq!(item.barcode, "B-1");
        assert_eq!(item.home_branch.as_deref(), Some("FPL"));
    }

    #[test]
    fn test_missing_barcode_is_rejected() {
        let err = LibraryItem::from_json(&json!({"itemnumber": 3})).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(LibraryItem::from_json(&json!("39999")).is_err());
    }

    #[test]
    fn test_truthiness_of_markers() {
        let item = LibraryItem::from_json(&json!({
            "barcode": "X",
            "checked_out": 0,
            "waiting": "1",
            "in_transit": true,
            "first_hold": null,
            "return_claim": {"id": 9}
        }))
        .unwrap();
        assert!(!item.checked_out);
        assert!(item.waiting);
        assert!(item.in_transit);
        assert!(item.first_hold.is_none());
        assert!(item.return_claim.is_some());
    }

    #[test]
    fn test_transfer_record_ingestion() {
        let item = LibraryItem::from_json(&json!({
            "barcode": "T",
            "transfer": {"reason": "Reserve", "frombranch": "CPL", "tobranch": "MPL", "datesent": "2024-05-01"}
        }))
        .unwrap();
        let transfer = item.transfer.unwrap();
        assert_eq!(transfer.reason.as_deref(), Some("Reserve"));
        assert_eq!(transfer.from_branch.as_deref(), Some("CPL"));
        assert_eq!(transfer.to_branch.as_deref(), Some("MPL"));
        assert_eq!(transfer.date_sent.as_deref(), Some("2024-05-01"));
    }

    #[test]
    fn test_from_json_list_skips_bad_records() {
        let items = LibraryItem::from_json_list(&[
            json!({"barcode": "A"}),
            json!({"title": "no barcode"}),
            json!(42),
            json!({"external_id": "B"}),
        ]);
        let barcodes: Vec<_> = items.iter().map(|i| i.barcode.as_str()).collect();
        assert_eq!(barcodes, vec!["A", "B"]);
    }

    #[test]
    fn test_internal_schema_round_trips() {
        let item = LibraryItem::from_json(&json!({
            "barcode": "R",
            "return_claims": [{"id": 1}, {"id": 2}],
            "due_date": "2024-01-01"
        }))
        .unwrap();
        let stored = serde_json::to_value(&item).unwrap();
        let back: LibraryItem = serde_json::from_value(stored).unwrap();
        assert_eq!(back, item);
    }
}
