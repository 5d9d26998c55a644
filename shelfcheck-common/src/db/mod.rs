//! Database initialisation for the high-capacity session store

pub mod init;

pub use init::*;
