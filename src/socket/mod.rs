//! Unix socket transport module.
//!
//! Handles the broker connection and the combined payload plus
//! `SCM_RIGHTS` receive.

mod ancillary;
mod connection;

pub use ancillary::{AncillaryData, ControlMessage};
pub use connection::{
    connect, recv_message, recv_with_rights, send_request, ReceiveLimits, ReceivedMessage,
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_CONTROL_SIZE, DEFAULT_MAX_RESPONSE_SIZE,
};
