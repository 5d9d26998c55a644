//! Domain models shared by the session engine

pub mod item;
pub mod session;

pub use item::{LibraryItem, TransferRecord};
pub use session::{
    InvalidStatus, ResolutionSettings, ResolutionType, ScannedItem, SessionConfig,
    SessionResponseData, SessionState, SkipFlags,
};
