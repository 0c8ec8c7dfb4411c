//! Plugin Pull Core - Foundational Types
//!
//! This module provides the error type, plugin list parsing, and run
//! configuration shared by the runtime and the command-line tools.

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{
    PluginList, PluginSpec, RunConfig, DEFAULT_CONFIG_FILE, PLUGINS_DIR_NAME, TEMP_DIR_SUFFIX,
};
pub use error::{PullError, Result};
