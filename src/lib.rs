//! Lumo Binder Library
//!
//! Client for a privileged bind broker. An unprivileged process asks the
//! broker, over a Unix socket, for a listening socket bound to an address it
//! could not bind itself. The broker replies with a JSON-RPC status and, on
//! success, passes the bound socket back as `SCM_RIGHTS` ancillary data.
//!
//! ```ignore
//! use lumo_binder::{BinderClient, BindAddress};
//!
//! let client = BinderClient::new("/run/lumo/binder.sock")?;
//! let listener = client.bind_listener(&BindAddress::new("0.0.0.0", 80)).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod socket;

pub use client::BinderClient;
pub use error::{BinderError, BinderResult, ProtocolErrorKind};
pub use protocol::BindAddress;
