//! Human-readable summary of the filters a session was started with

use shelfcheck_common::models::SessionConfig;

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn library_name(config: &SessionConfig) -> String {
    non_empty(config.selected_library_id.as_deref())
        .unwrap_or("All Libraries")
        .to_string()
}

pub fn shelving_location_name(config: &SessionConfig) -> String {
    non_empty(config.shelving_location.as_deref())
        .and(config.shelving_location_name())
        .unwrap_or("All Locations")
        .to_string()
}

pub fn collection_name(config: &SessionConfig) -> String {
    non_empty(config.ccode.as_deref())
        .unwrap_or("All Collections")
        .to_string()
}

pub fn item_types_text(config: &SessionConfig) -> String {
    match config.selected_itypes.as_slice() {
        [] => "All Item Types".to_string(),
        [only] => only.clone(),
        many => format!("{} selected", many.len()),
    }
}

pub fn call_number_range_text(config: &SessionConfig) -> String {
    match (
        non_empty(config.min_location.as_deref()),
        non_empty(config.max_location.as_deref()),
    ) {
        (None, None) => "All Call Numbers".to_string(),
        (Some(min), Some(max)) => format!("{} - {}", min, max),
        (Some(min), None) => format!("From: {}", min),
        (None, Some(max)) => format!("To: {}", max),
    }
}

pub fn has_skip_filters(config: &SessionConfig) -> bool {
    config.skip_checked_out_items
        || config.skip_in_transit_items
        || config.skip_branch_mismatch_items
        || config.ignore_waiting_holds
}

pub fn skip_filters_text(config: &SessionConfig) -> String {
    let mut filters = Vec::new();
    if config.skip_checked_out_items {
        filters.push("Checked out items");
    }
    if config.skip_in_transit_items {
        filters.push("In-transit items");
    }
    if config.skip_branch_mismatch_items {
        filters.push("Branch mismatch items");
    }
    if config.ignore_waiting_holds {
        filters.push("Items on hold");
    }
    filters.join(", ")
}

/// Label/value rows describing the active filters
pub fn summary(config: &SessionConfig) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("Library", library_name(config)),
        ("Shelving Location", shelving_location_name(config)),
        ("Collection", collection_name(config)),
        ("Item Types", item_types_text(config)),
        ("Call Number Range", call_number_range_text(config)),
    ];
    if let Some(seen) = non_empty(config.date_last_seen.as_deref()) {
        rows.push(("Last Seen Before", seen.to_string()));
    }
    if has_skip_filters(config) {
        rows.push(("Skipping", skip_filters_text(config)));
    }
    rows.push((
        "Compare Barcodes",
        if config.compare_barcodes { "ON" } else { "OFF" }.to_string(),
    ));
    rows
}

pub fn active_filter_count(config: &SessionConfig) -> usize {
    summary(config).len()
}
