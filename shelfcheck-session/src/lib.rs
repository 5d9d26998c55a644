//! shelfcheck session engine
//!
//! Client-side engine for a physical shelf-inventory pass: starts a session
//! against the catalogue, records scans, flags misplaced or problematic items,
//! tracks missing items, persists everything locally so a reload resumes the
//! session, and renders the reconciliation report.

pub mod analysis;
pub mod client;
pub mod controller;
pub mod export;
pub mod filters;
pub mod store;

pub use controller::{
    ResolutionOutcome, ResolutionRequest, RestoreOutcome, ScanOutcome, SessionController,
    SessionPhase,
};
pub use store::SessionStore;
