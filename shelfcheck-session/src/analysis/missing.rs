//! Missing-item detection

use shelfcheck_common::models::{LibraryItem, SkipFlags};
use std::collections::HashSet;

/// Expected items not yet accounted for, in expected-list order
///
/// The fallback list is used only when the primary list is empty; the two
/// are never merged.
pub fn compute_missing<'a>(
    expected: &'a [LibraryItem],
    fallback_expected: &'a [LibraryItem],
    scanned: &HashSet<String>,
    marked_missing: &HashSet<String>,
    flags: SkipFlags,
) -> Vec<&'a LibraryItem> {
    let items = if expected.is_empty() {
        fallback_expected
    } else {
        expected
    };

    items
        .iter()
        .filter(|item| !scanned.contains(&item.barcode) && !marked_missing.contains(&item.barcode))
        .filter(|item| !(flags.skip_checked_out && item.has_checkout_marker()))
        .filter(|item| !(flags.skip_in_transit && item.in_transit))
        .filter(|item| !(flags.skip_branch_mismatch && item.has_branch_mismatch()))
        .collect()
}

pub fn missing_count(
    expected: &[LibraryItem],
    fallback_expected: &[LibraryItem],
    scanned: &HashSet<String>,
    marked_missing: &HashSet<String>,
    flags: SkipFlags,
) -> usize {
    compute_missing(expected, fallback_expected, scanned, marked_missing, flags).len()
}
