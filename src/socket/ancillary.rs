//! Ancillary data received alongside a broker response.
//!
//! Descriptors are wrapped in [`OwnedFd`] as soon as they leave the kernel,
//! so anything that is not handed to the caller is closed on drop.

use std::os::fd::{FromRawFd, OwnedFd};

use nix::sys::socket::ControlMessageOwned;

use crate::error::ProtocolErrorKind;

/// A single control message received with a payload.
#[derive(Debug)]
pub enum ControlMessage {
    /// `SCM_RIGHTS`: descriptors installed in this process.
    Rights(Vec<OwnedFd>),
    /// Any other control message type.
    Other,
}

impl ControlMessage {
    /// Number of descriptors carried by this message.
    pub fn descriptor_count(&self) -> usize {
        match self {
            ControlMessage::Rights(fds) => fds.len(),
            ControlMessage::Other => 0,
        }
    }
}

impl From<ControlMessageOwned> for ControlMessage {
    fn from(cmsg: ControlMessageOwned) -> Self {
        match cmsg {
            ControlMessageOwned::ScmRights(fds) => ControlMessage::Rights(
                fds.into_iter()
                    // SAFETY: SCM_RIGHTS descriptors were just installed in this
                    // process by the kernel and nothing else refers to them.
                    .map(|fd| unsafe { OwnedFd::from_raw_fd(fd) })
                    .collect(),
            ),
            _ => ControlMessage::Other,
        }
    }
}

/// All control messages attached to one received payload.
#[derive(Debug, Default)]
pub struct AncillaryData {
    messages: Vec<ControlMessage>,
    truncated: bool,
}

impl AncillaryData {
    /// Create ancillary data from parsed control messages.
    ///
    /// `truncated` is set when the kernel reported `MSG_CTRUNC`.
    pub fn new(messages: Vec<ControlMessage>, truncated: bool) -> Self {
        Self {
            messages,
            truncated,
        }
    }

    /// Number of control messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether no control messages were received.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether the control buffer was too small for what the peer sent.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Total number of descriptors across all control messages.
    pub fn descriptor_count(&self) -> usize {
        self.messages.iter().map(ControlMessage::descriptor_count).sum()
    }

    /// Take the one descriptor a successful bind must carry.
    ///
    /// Exactly one control message carrying exactly one descriptor is
    /// accepted. Every other shape is rejected and all received descriptors
    /// are closed.
    pub fn into_single_descriptor(self) -> Result<OwnedFd, ProtocolErrorKind> {
        if self.truncated {
            return Err(ProtocolErrorKind::ControlDataTruncated);
        }

        let mut messages = self.messages;
        if messages.len() != 1 {
            return Err(ProtocolErrorKind::UnexpectedControlMessageCount {
                count: messages.len(),
            });
        }

        match messages.pop() {
            Some(ControlMessage::Rights(mut fds)) => match fds.len() {
                1 => fds
                    .pop()
                    .ok_or(ProtocolErrorKind::UnexpectedDescriptorCount { count: 0 }),
                count => Err(ProtocolErrorKind::UnexpectedDescriptorCount { count }),
            },
            _ => Err(ProtocolErrorKind::UnexpectedDescriptorCount { count: 0 }),
        }
    }
}
