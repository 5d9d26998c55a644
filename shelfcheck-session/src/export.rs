//! Reconciliation report (CSV)
//!
//! Rows are every expected item followed by every scanned item the expected
//! list does not know about. Field values prefer the expected record and
//! fall back to the scanned one; flags always come from the scan.

use csv::{QuoteStyle, WriterBuilder};
use shelfcheck_common::models::{LibraryItem, ScannedItem};
use shelfcheck_common::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::info;

pub const HEADERS: [&str; 20] = [
    "Barcode",
    "Item ID",
    "Biblio ID",
    "Title",
    "Author",
    "Publication Year",
    "Publisher",
    "ISBN",
    "Pages",
    "Location",
    "Acquisition Date",
    "Last Seen Date",
    "URL",
    "Was Lost",
    "Wrong Place",
    "Was Checked Out",
    "Scanned Out of Order",
    "Had Invalid \"Not for loan\" Status",
    "Scanned",
    "Status",
];

pub const INVENTORY_FILE_NAME: &str = "inventory.csv";
pub const MISSING_FILE_NAME: &str = "missing_items.csv";

const NOT_AVAILABLE: &str = "N/A";

/// Classification of one report row, first match wins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Missing,
    WrongPlace,
    OutOfOrder,
    InvalidStatus,
    WasLost,
    Ok,
}

impl RowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowStatus::Missing => "Missing",
            RowStatus::WrongPlace => "Wrong Place",
            RowStatus::OutOfOrder => "Out of Order",
            RowStatus::InvalidStatus => "Invalid Status",
            RowStatus::WasLost => "Was Lost",
            RowStatus::Ok => "OK",
        }
    }
}

/// An expected record, a scan, or both for the same barcode
#[derive(Debug, Clone, Copy)]
pub struct ReconciledRow<'a> {
    pub expected: Option<&'a LibraryItem>,
    pub scanned: Option<&'a ScannedItem>,
}

impl<'a> ReconciledRow<'a> {
    pub fn barcode(&self) -> &'a str {
        match (self.expected, self.scanned) {
            (Some(item), _) => &item.barcode,
            (None, Some(scan)) => scan.barcode(),
            (None, None) => "",
        }
    }

    /// Expected value of a field, else the scanned record's value
    fn field<F>(&self, get: F) -> Option<&'a str>
    where
        F: Fn(&'a LibraryItem) -> Option<&'a String>,
    {
        self.expected
            .and_then(&get)
            .or_else(|| self.scanned.and_then(|s| get(&s.item)))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    fn flag(&self, get: impl Fn(&ScannedItem) -> bool) -> bool {
        self.scanned.is_some_and(get)
    }

    pub fn was_scanned(&self) -> bool {
        self.flag(|s| s.was_scanned)
    }

    pub fn status(&self) -> RowStatus {
        if self.expected.is_some() && !self.was_scanned() {
            RowStatus::Missing
        } else if self.flag(|s| s.wrong_place) {
            RowStatus::WrongPlace
        } else if self.flag(|s| s.out_of_order) {
            RowStatus::OutOfOrder
        } else if self.flag(|s| s.invalid_status.is_some()) {
            RowStatus::InvalidStatus
        } else if self.flag(|s| s.was_lost) {
            RowStatus::WasLost
        } else {
            RowStatus::Ok
        }
    }

    fn record(&self, catalog_base: &str) -> Vec<String> {
        let text = |value: Option<&str>| value.unwrap_or(NOT_AVAILABLE).to_string();
        let yes_no = |b: bool| if b { "Yes" } else { "No" }.to_string();

        let biblio_id = self.field(|i| i.biblio_id.as_ref());
        let checked_out = self.field(|i| i.checked_out_date.as_ref()).is_some();

        vec![
            self.barcode().to_string(),
            text(self.field(|i| i.item_id.as_ref())),
            text(biblio_id),
            text(self.field(|i| i.title.as_ref())),
            text(self.field(|i| i.author.as_ref())),
            text(self.field(|i| i.publication_year.as_ref())),
            text(self.field(|i| i.publisher.as_ref())),
            text(self.field(|i| i.isbn.as_ref())),
            text(self.field(|i| i.pages.as_ref())),
            text(self.field(|i| i.location.as_ref())),
            text(self.field(|i| i.acquisition_date.as_ref())),
            text(self.field(|i| i.last_seen_date.as_ref())),
            detail_url(catalog_base, biblio_id),
            yes_no(self.flag(|s| s.was_lost)),
            yes_no(self.flag(|s| s.wrong_place)),
            yes_no(checked_out),
            yes_no(self.flag(|s| s.out_of_order)),
            yes_no(self.flag(|s| s.invalid_status.is_some())),
            if self.was_scanned() { "Yes" } else { "NOT SCANNED" }.to_string(),
            self.status().as_str().to_string(),
        ]
    }
}

pub fn detail_url(catalog_base: &str, biblio_id: Option<&str>) -> String {
    format!(
        "{}/cgi-bin/koha/catalogue/detail.pl?biblionumber={}",
        catalog_base.trim_end_matches('/'),
        biblio_id.unwrap_or_default()
    )
}

/// Merge expected and scanned sets into report rows
///
/// `scanned` is newest first; the newest scan of a barcode wins.
pub fn reconcile<'a>(
    expected: &'a [LibraryItem],
    scanned: &'a [ScannedItem],
    missing_only: bool,
) -> Vec<ReconciledRow<'a>> {
    let mut scans: HashMap<&str, &ScannedItem> = HashMap::with_capacity(scanned.len());
    for scan in scanned {
        scans.entry(scan.barcode()).or_insert(scan);
    }
    let expected_barcodes: HashSet<&str> = expected.iter().map(|i| i.barcode.as_str()).collect();

    let expected_rows = expected.iter().map(|item| ReconciledRow {
        expected: Some(item),
        scanned: scans.get(item.barcode.as_str()).copied(),
    });

    if missing_only {
        return expected_rows.filter(|row| row.scanned.is_none()).collect();
    }

    let mut seen_extra = HashSet::new();
    let extra_rows = scanned
        .iter()
        .filter(|scan| !expected_barcodes.contains(scan.barcode()))
        .filter(|scan| seen_extra.insert(scan.barcode()))
        .map(|scan| ReconciledRow {
            expected: None,
            scanned: Some(scan),
        });

    expected_rows.chain(extra_rows).collect()
}

/// Rendered report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: String,
    pub contents: String,
    pub row_count: usize,
}

impl CsvExport {
    /// Write into `dir` (created if needed); returns the file path
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.contents)?;
        info!(path = %path.display(), rows = self.row_count, "Wrote inventory report");
        Ok(path)
    }
}

pub fn build_csv(
    expected: &[LibraryItem],
    scanned: &[ScannedItem],
    catalog_base: &str,
    missing_only: bool,
) -> Result<CsvExport> {
    let rows = reconcile(expected, scanned, missing_only);

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());

    writer
        .write_record(HEADERS)
        .map_err(|e| Error::Csv(e.to_string()))?;
    for row in &rows {
        writer
            .write_record(row.record(catalog_base))
            .map_err(|e| Error::Csv(e.to_string()))?;
    }

    let bytes = writer.into_inner().map_err(|e| Error::Csv(e.to_string()))?;
    let contents = String::from_utf8(bytes).map_err(|e| Error::Csv(e.to_string()))?;

    Ok(CsvExport {
        file_name: if missing_only { MISSING_FILE_NAME } else { INVENTORY_FILE_NAME }.to_string(),
        contents,
        row_count: rows.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use shelfcheck_common::models::InvalidStatus;

    fn item(barcode: &str) -> LibraryItem {
        LibraryItem {
            barcode: barcode.to_string(),
            biblio_id: Some(format!("{}0", barcode)),
            ..Default::default()
        }
    }

    fn scan(item: LibraryItem) -> ScannedItem {
        ScannedItem::new(item, Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap())
    }

    #[test]
    fn test_rows_are_expected_then_unexpected_scans() {
        let expected = vec![item("1"), item("2")];
        let scanned = vec![scan(item("9")), scan(item("1"))];

        let rows = reconcile(&expected, &scanned, false);
        let barcodes: Vec<&str> = rows.iter().map(|r| r.barcode()).collect();
        assert_eq!(barcodes, vec!["1", "2", "9"]);
        assert_eq!(rows[0].status(), RowStatus::Ok);
        assert_eq!(rows[1].status(), RowStatus::Missing);
        assert_eq!(rows[2].status(), RowStatus::Ok);
    }

    #[test]
    fn test_missing_only_narrows() {
        let expected = vec![item("1"), item("2"), item("3")];
        let scanned = vec![scan(item("2")), scan(item("7"))];

        let all = reconcile(&expected, &scanned, false);
        let missing = reconcile(&expected, &scanned, true);
        assert_eq!(all.len(), 4);
        assert_eq!(missing.iter().map(|r| r.barcode()).collect::<Vec<_>>(), vec!["1", "3"]);
        assert!(missing.len() < all.len());
    }

    #[test]
    fn test_status_precedence() {
        let mut s = scan(item("5"));
        s.was_lost = true;
        s.invalid_status = Some(InvalidStatus {
            key: "items.damaged".to_string(),
            value: "1".to_string(),
        });
        s.out_of_order = true;
        s.wrong_place = true;

        let mut scanned = vec![s];
        let row = |scanned: &[ScannedItem]| reconcile(&[], scanned, false)[0].status();

        assert_eq!(row(&scanned), RowStatus::WrongPlace);
        scanned[0].wrong_place = false;
        assert_eq!(row(&scanned), RowStatus::OutOfOrder);
        scanned[0].out_of_order = false;
        assert_eq!(row(&scanned), RowStatus::InvalidStatus);
        scanned[0].invalid_status = None;
        assert_eq!(row(&scanned), RowStatus::WasLost);
        scanned[0].was_lost = false;
        assert_eq!(row(&scanned), RowStatus::Ok);
    }

    #[test]
    fn test_field_falls_back_to_scanned_value() {
        let mut expected = item("1");
        expected.title = None;
        let mut scanned_item = item("1");
        scanned_item.title = Some("Dune".to_string());
        scanned_item.checked_out_date = Some("2024-05-01".to_string());

        let expected = vec![expected];
        let scanned = vec![scan(scanned_item)];
        let record = reconcile(&expected, &scanned, false)[0].record("https://opac.example.org/");

        assert_eq!(record.len(), HEADERS.len());
        assert_eq!(record[3], "Dune");
        assert_eq!(record[4], "N/A");
        assert_eq!(
            record[12],
            "https://opac.example.org/cgi-bin/koha/catalogue/detail.pl?biblionumber=10"
        );
        assert_eq!(record[15], "Yes");
        assert_eq!(record[18], "Yes");
    }

    #[test]
    fn test_csv_is_fully_quoted() {
        let mut missing = item("2");
        missing.title = Some("Say \"hi\", world".to_string());
        let export = build_csv(&[missing], &[], "https://staff.example.org", true).unwrap();

        assert_eq!(export.file_name, "missing_items.csv");
        assert_eq!(export.row_count, 1);

        let lines: Vec<&str> = export.contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("\"Barcode\",\"Item ID\""));
        assert!(lines[0].contains("\"Had Invalid \"\"Not for loan\"\" Status\""));
        assert!(lines[1].starts_with("\"2\",\"N/A\",\"20\",\"Say \"\"hi\"\", world\""));
        assert!(lines[1].ends_with("\"NOT SCANNED\",\"Missing\""));
    }

    #[test]
    fn test_write_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let export = build_csv(&[item("1")], &[], "http://x", false).unwrap();
        let path = export.write_to_dir(&dir.path().join("exports")).unwrap();

        assert_eq!(path.file_name().unwrap(), "inventory.csv");
        assert_eq!(std::fs::read_to_string(path).unwrap(), export.contents);
    }
}
