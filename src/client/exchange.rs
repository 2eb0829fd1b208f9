//! A single bind exchange with the broker.
//!
//! 1. encode the request
//! 2. connect
//! 3. write the request
//! 4. receive payload and control data together
//! 5. decode the payload, surfacing broker errors
//! 6-7. require exactly one control message carrying exactly one descriptor
//!
//! The connection lives only for the duration of [`run`] and is closed on
//! every return path.

use std::os::fd::{AsRawFd, OwnedFd};

use tracing::debug;

use crate::error::{BinderError, BinderResult};
use crate::protocol::{BindAddress, BindRequest, BindResponse};
use crate::socket::{connect, recv_with_rights, send_request, ReceivedMessage};

use super::BinderClient;

pub(crate) async fn run(client: &BinderClient, address: &BindAddress) -> BinderResult<OwnedFd> {
    let request = BindRequest::new(client.id().as_str(), address.clone());
    let data = serde_json::to_vec(&request).map_err(BinderError::Encode)?;

    debug!(
        socket = %client.socket_path().display(),
        address = %address,
        "Requesting bound socket from broker"
    );

    let received = {
        let mut stream = connect(client.socket_path(), client.connect_timeout()).await?;
        send_request(&mut stream, &data).await?;
        recv_with_rights(&stream, client.receive_limits()).await?
    };

    let fd = take_descriptor(received)?;
    debug!(fd = fd.as_raw_fd(), address = %address, "Received bound socket");
    Ok(fd)
}

/// Decode a received response and extract the bound socket.
///
/// A broker-reported error wins over any attached descriptors, which are
/// closed rather than returned.
fn take_descriptor(received: ReceivedMessage) -> BinderResult<OwnedFd> {
    let ReceivedMessage { payload, ancillary } = received;

    let response: BindResponse = serde_json::from_slice(&payload).map_err(BinderError::Decode)?;
    if let Some(message) = response.error_message() {
        return Err(BinderError::Broker {
            message: message.to_string(),
        });
    }

    ancillary
        .into_single_descriptor()
        .map_err(BinderError::from)
}
