//! Reconciliation report written from a live session

mod helpers;

use helpers::{config, item, response_with, FakeStarter, Harness};
use serde_json::json;
use shelfcheck_common::models::LibraryItem;
use shelfcheck_session::export::{HEADERS, INVENTORY_FILE_NAME};

fn read_rows(contents: &str) -> Vec<csv::StringRecord> {
    csv::Reader::from_reader(contents.as_bytes())
        .records()
        .map(|r| r.unwrap())
        .collect()
}

#[tokio::test]
async fn test_report_covers_expected_and_stray_scans() {
    let body = json!({
        "location_data": [
            {"barcode": "001", "biblionumber": 11, "title": "Dune"},
            {"barcode": "002", "biblionumber": 12, "title": "Emma"}
        ],
        "total_records": 2
    });
    let mut h = Harness::new(FakeStarter::returning(body));
    h.controller.initiate(config()).await.unwrap();

    h.controller
        .record_scan(LibraryItem {
            call_number_sort: Some("900".to_string()),
            ..item("001")
        })
        .await
        .unwrap();
    h.controller
        .record_scan(LibraryItem {
            title: Some("Stray".to_string()),
            ..item("777")
        })
        .await
        .unwrap();

    let export = h.controller.export(false).unwrap();
    assert_eq!(export.file_name, INVENTORY_FILE_NAME);

    let mut reader = csv::Reader::from_reader(export.contents.as_bytes());
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.iter().collect::<Vec<_>>(), HEADERS.to_vec());

    let rows = read_rows(&export.contents);
    assert_eq!(rows.len(), 3);

    let by_barcode = |barcode: &str| rows.iter().find(|r| &r[0] == barcode).unwrap().clone();
    assert_eq!(&by_barcode("001")[19], "OK");
    assert_eq!(
        &by_barcode("001")[12],
        "https://staff.example.org/cgi-bin/koha/catalogue/detail.pl?biblionumber=11"
    );
    assert_eq!(&by_barcode("002")[18], "NOT SCANNED");
    assert_eq!(&by_barcode("002")[19], "Missing");
    assert_eq!(&by_barcode("777")[3], "Stray");
    assert_eq!(&by_barcode("777")[14], "Yes");
    assert_eq!(&by_barcode("777")[19], "Wrong Place");
}

#[tokio::test]
async fn test_missing_only_report_written_to_disk() {
    let mut h = Harness::new(FakeStarter::returning(response_with(&["001", "002", "003"])));
    h.controller.initiate(config()).await.unwrap();
    h.controller.record_scan(item("002")).await.unwrap();

    let export = h.controller.export(true).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = export.write_to_dir(&dir.path().join("exports")).unwrap();

    assert!(path.ends_with("missing_items.csv"));
    let written = std::fs::read_to_string(&path).unwrap();
    let barcodes: Vec<String> = read_rows(&written).iter().map(|r| r[0].to_string()).collect();
    assert_eq!(barcodes, vec!["001", "003"]);
    assert!(written.lines().all(|line| line.starts_with('"')));
}
