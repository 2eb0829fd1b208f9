//! Error types for the bind broker client.
//!
//! Provides a unified error handling system using thiserror.

mod types;

pub use types::*;
