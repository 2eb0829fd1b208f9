//! Configuration module for the bind broker client.
//!
//! Handles loading and validating client configuration from TOML files.

mod settings;

pub use settings::*;
