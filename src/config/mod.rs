//! Configuration management for medialib.
//!
//! Supports configuration from:
//! - Command-line arguments (highest priority)
//! - Environment variables
//! - A JSON configuration file (lowest priority)

mod settings;

pub use settings::{Config, ScanConfig};
pub(crate) use settings::ser_duration;
