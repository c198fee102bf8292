//! impactscout: Player Impact Scoring Library
//!
//! Role-relative impact scores for football players from FBref season
//! tables, and value efficiency against market valuations.
//!
//! Stages run in a fixed order for each season:
//! load -> clean -> normalize -> score -> compare.

pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod utils;

pub use error::{Error, Result};
