//! Run configuration: TOML settings and logging

pub mod logging;
pub mod settings;

pub use logging::{LogFormat, LoggingConfig};
pub use settings::Settings;
