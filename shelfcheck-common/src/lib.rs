//! # shelfcheck Common Library
//!
//! Shared code for the shelf inventory workspace including:
//! - Error type and result alias
//! - Configuration loading and root folder resolution
//! - Library item and session models (with field-alias ingestion)
//! - Notification channel used to report progress to staff
//! - Clock abstraction and date parsing
//! - SQLite initialisation for the high-capacity session store

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod time;

pub use error::{Error, Result};
pub use notify::{NoticeLevel, Notifier};
