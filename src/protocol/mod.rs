//! Wire protocol module.
//!
//! Defines the JSON-RPC envelopes exchanged with the bind broker.
//!
//! ## Wire Format
//!
//! The request is written as a single JSON document with no framing:
//! ```text
//! {"jsonrpc":"2.0","method":"bind","id":"<32 hex>","params":[{"address":"0.0.0.0","port":8080}]}
//! ```
//!
//! The response is a single JSON document received in one `recvmsg` call,
//! with the bound socket attached as `SCM_RIGHTS` ancillary data on success:
//! ```text
//! {"error":{"message":""}}
//! ```

mod request;
mod response;

pub use request::{BindAddress, BindRequest, BIND_METHOD, JSONRPC_VERSION};
pub use response::{BindResponse, RpcError};
