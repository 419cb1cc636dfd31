//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Top-level config structs (Config, ServerConfig, LogConfig)
//! - [`limits`]: Wire and queue limits read by the delivery path (LimitsConfig)
//! - [`validation`]: Startup sanity checks

mod limits;
mod types;
pub mod validation;

pub use limits::LimitsConfig;
pub use types::{Config, ConfigError, LogConfig, ServerConfig};
pub use validation::{ValidationError, validate};
