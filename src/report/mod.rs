//! Report module - output tables, run summary and JSON export

pub mod artifacts;
pub mod run_export;
pub mod summary;

pub use artifacts::*;
pub use run_export::*;
pub use summary::*;
