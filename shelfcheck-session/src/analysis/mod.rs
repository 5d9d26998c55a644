//! Pure item analysis: transit, status, resolution policy, missing-item
//! detection and shelf-order tracking

pub mod call_number;
pub mod missing;
pub mod resolution;
pub mod status;
pub mod transit;

pub use call_number::{check_item_statuses, CallNumberTracker};
pub use missing::{compute_missing, missing_count};
pub use resolution::{apply_resolution, resolve, ResolutionDecision};
pub use status::{analyze_item_status, problematic_statuses, Issue, IssueKind, Severity, StatusAnalysis};
pub use transit::{classify, transit_info, TransitInfo, TransitType};
