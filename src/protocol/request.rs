//! Request types for the broker protocol.

use serde::{Deserialize, Serialize};

/// JSON-RPC version string sent with every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// The only method the broker understands.
pub const BIND_METHOD: &str = "bind";

/// An address the broker should bind and listen on.
///
/// Values are passed through verbatim. The broker is responsible for
/// rejecting malformed addresses or out-of-range ports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindAddress {
    /// IP to listen on (e.g. "0.0.0.0").
    pub address: String,
    /// Port to listen on (e.g. 8080).
    pub port: i64,
}

impl BindAddress {
    /// Create a new bind address.
    pub fn new(address: impl Into<String>, port: i64) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

impl std::fmt::Display for BindAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// A bind request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindRequest {
    /// Always "2.0".
    pub jsonrpc: String,

    /// Always "bind".
    pub method: String,

    /// The client identifier, reused for every call from the same client.
    pub id: String,

    /// Addresses to bind. The client sends exactly one per request.
    pub params: Vec<BindAddress>,
}

impl BindRequest {
    /// Create a bind request for a single address.
    pub fn new(id: impl Into<String>, address: BindAddress) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: BIND_METHOD.to_string(),
            id: id.into(),
            params: vec![address],
        }
    }
}
