//! Per-exchange broker connection.
//!
//! Every bind opens its own connection, writes one request and performs one
//! combined receive. The stream is closed when the caller drops it.

use std::future::Future;
use std::io::{self, IoSliceMut};
use std::os::fd::{AsRawFd, RawFd};
use std::path::Path;
use std::time::Duration;

use nix::sys::socket::{recvmsg, MsgFlags};
use tokio::io::{AsyncWriteExt, Interest};
use tokio::net::UnixStream;
use tokio::time::timeout;
use tracing::trace;

use crate::error::BinderError;

use super::ancillary::{AncillaryData, ControlMessage};

/// How long to wait for the broker to accept a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Receive buffer size for the response payload.
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 256;

/// Receive buffer size for ancillary control data.
pub const DEFAULT_MAX_CONTROL_SIZE: usize = 256;

/// Buffer sizes for the combined receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveLimits {
    /// Maximum payload bytes read in the single receive.
    pub max_payload: usize,
    /// Maximum control data bytes read in the single receive.
    pub max_control: usize,
}

impl Default for ReceiveLimits {
    fn default() -> Self {
        Self {
            max_payload: DEFAULT_MAX_RESPONSE_SIZE,
            max_control: DEFAULT_MAX_CONTROL_SIZE,
        }
    }
}

/// A payload together with the control data that arrived on its boundary.
#[derive(Debug)]
pub struct ReceivedMessage {
    pub payload: Vec<u8>,
    pub ancillary: AncillaryData,
}

/// Connect to the broker socket, giving up after `connect_timeout`.
pub async fn connect(path: &Path, connect_timeout: Duration) -> Result<UnixStream, BinderError> {
    connect_within(path, connect_timeout, UnixStream::connect(path)).await
}

/// Drive `connecting` for at most `connect_timeout`, reporting failure
/// against `path`.
async fn connect_within<F>(
    path: &Path,
    connect_timeout: Duration,
    connecting: F,
) -> Result<UnixStream, BinderError>
where
    F: Future<Output = io::Result<UnixStream>>,
{
    let result = match timeout(connect_timeout, connecting).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("connect timed out after {}ms", connect_timeout.as_millis()),
        )),
    };

    result.map_err(|source| BinderError::Connect {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the whole request. A short write is an error.
pub async fn send_request(stream: &mut UnixStream, data: &[u8]) -> Result<(), BinderError> {
    stream.write_all(data).await.map_err(BinderError::Write)?;
    stream.flush().await.map_err(BinderError::Write)?;
    trace!(bytes = data.len(), "Request written");
    Ok(())
}

/// Receive the response payload and its ancillary data in one `recvmsg`.
///
/// The payload and control data must come from the same receive: the
/// descriptors are bound to the message boundary that carried them.
pub async fn recv_with_rights(
    stream: &UnixStream,
    limits: ReceiveLimits,
) -> Result<ReceivedMessage, BinderError> {
    let message = loop {
        stream.readable().await.map_err(BinderError::Read)?;
        match stream.try_io(Interest::READABLE, || {
            recv_message(stream.as_raw_fd(), limits)
        }) {
            Err(ref e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::Interrupted =>
            {
                continue
            }
            other => break other.map_err(BinderError::Read)?,
        }
    };

    if message.payload.is_empty() {
        return Err(BinderError::Read(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "broker closed the connection without replying",
        )));
    }

    trace!(
        bytes = message.payload.len(),
        control_messages = message.ancillary.len(),
        descriptors = message.ancillary.descriptor_count(),
        "Response received"
    );

    Ok(message)
}

/// One `recvmsg` on a raw socket descriptor.
///
/// Works on blocking and non-blocking sockets alike; a non-blocking socket
/// with nothing queued yields `WouldBlock`.
pub fn recv_message(fd: RawFd, limits: ReceiveLimits) -> io::Result<ReceivedMessage> {
    let mut payload = vec![0u8; limits.max_payload];
    // nix sizes the control buffer from the vector's capacity.
    let mut control: Vec<u8> = Vec::with_capacity(limits.max_control);

    let (bytes, truncated, messages) = {
        let mut iov = [IoSliceMut::new(&mut payload)];
        let msg = recvmsg::<()>(fd, &mut iov, Some(&mut control), recv_flags())?;
        let truncated = msg.flags.contains(MsgFlags::MSG_CTRUNC);

        // nix refuses to walk a truncated control buffer, so any descriptors
        // the kernel managed to install in it cannot be reached from here.
        let messages: Vec<ControlMessage> = if truncated {
            Vec::new()
        } else {
            msg.cmsgs()
                .map_err(io::Error::from)?
                .map(ControlMessage::from)
                .collect()
        };
        (msg.bytes, truncated, messages)
    };

    payload.truncate(bytes);
    Ok(ReceivedMessage {
        payload,
        ancillary: AncillaryData::new(messages, truncated),
    })
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn recv_flags() -> MsgFlags {
    MsgFlags::MSG_CMSG_CLOEXEC
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn recv_flags() -> MsgFlags {
    MsgFlags::empty()
}
