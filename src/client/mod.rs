//! Bind broker client.
//!
//! A [`BinderClient`] is created once and then asked for bound listening
//! sockets. Each request runs an independent exchange on a fresh
//! connection; the only state shared between calls is the client
//! identifier.

mod binder;
mod exchange;
mod identifier;

pub use binder::BinderClient;
pub use identifier::{ClientId, RandomSource, SystemRandomSource, CLIENT_ID_BYTES};
