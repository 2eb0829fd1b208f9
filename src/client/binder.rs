//! The bind broker client.

use std::net::TcpListener;
use std::os::fd::OwnedFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::BrokerConfig;
use crate::error::{BinderError, BinderResult};
use crate::protocol::BindAddress;
use crate::socket::{ReceiveLimits, DEFAULT_CONNECT_TIMEOUT};

use super::exchange;
use super::identifier::{ClientId, RandomSource, SystemRandomSource};

/// Client for a privileged bind broker listening on a Unix socket.
///
/// Safe to share between tasks: every [`bind`](Self::bind) opens its own
/// connection and only reads the client's fields.
#[derive(Debug, Clone)]
pub struct BinderClient {
    socket_path: PathBuf,
    id: ClientId,
    connect_timeout: Duration,
    limits: ReceiveLimits,
}

impl BinderClient {
    /// Create a client for the broker socket at `socket_path`.
    ///
    /// No I/O happens here; the socket is first touched by `bind`.
    pub fn new(socket_path: impl Into<PathBuf>) -> BinderResult<Self> {
        Self::with_random_source(socket_path, &SystemRandomSource::new())
    }

    /// Create a client drawing its identifier from `random`.
    pub fn with_random_source(
        socket_path: impl Into<PathBuf>,
        random: &dyn RandomSource,
    ) -> BinderResult<Self> {
        let socket_path = socket_path.into();
        if socket_path.as_os_str().is_empty() {
            return Err(BinderError::Config {
                message: "Broker socket path not set".to_string(),
            });
        }

        let id = ClientId::generate(random)?;

        Ok(Self {
            socket_path,
            id,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            limits: ReceiveLimits::default(),
        })
    }

    /// Create a client from the `[broker]` configuration section.
    pub fn from_config(config: &BrokerConfig) -> BinderResult<Self> {
        Ok(Self::new(&config.socket_path)?
            .with_connect_timeout(config.connect_timeout())
            .with_receive_limits(config.receive_limits()))
    }

    /// Override the connect timeout (10 seconds by default).
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Override the receive buffer sizes (256 bytes each by default).
    pub fn with_receive_limits(mut self, limits: ReceiveLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Path of the broker socket.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Identifier sent with every request from this client.
    pub fn id(&self) -> &ClientId {
        &self.id
    }

    /// Connect timeout for each exchange.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Receive buffer sizes for each exchange.
    pub fn receive_limits(&self) -> ReceiveLimits {
        self.limits
    }

    /// Ask the broker for a socket bound to `address`.
    ///
    /// On success the caller owns the returned descriptor. Failures are
    /// returned as-is; nothing is retried.
    pub async fn bind(&self, address: &BindAddress) -> BinderResult<OwnedFd> {
        exchange::run(self, address).await
    }

    /// Like [`bind`](Self::bind), returning the descriptor as a TCP listener.
    pub async fn bind_listener(&self, address: &BindAddress) -> BinderResult<TcpListener> {
        Ok(TcpListener::from(self.bind(address).await?))
    }

    /// Blocking variant of [`bind`](Self::bind) for callers without a runtime.
    ///
    /// Drives the exchange on a private current-thread runtime. Must not be
    /// called from inside an async context.
    pub fn bind_blocking(&self, address: &BindAddress) -> BinderResult<OwnedFd> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(BinderError::Runtime)?;
        runtime.block_on(self.bind(address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ZeroRandom;

    impl RandomSource for ZeroRandom {
        fn fill(&self, dest: &mut [u8]) -> Result<(), BinderError> {
            dest.fill(0);
            Ok(())
        }
    }

    #[test]
    fn test_empty_socket_path_rejected() {
        let err = BinderClient::new("").unwrap_err();
        assert!(matches!(err, BinderError::Config { .. }));
    }

    #[test]
    fn test_new_does_not_touch_socket() {
        let client = BinderClient::new("/nonexistent/broker.sock").unwrap();
        assert_eq!(client.socket_path(), Path::new("/nonexistent/broker.sock"));
        assert_eq!(client.connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(client.receive_limits(), ReceiveLimits::default());
    }

    #[test]
    fn test_injected_random_source() {
        let client = BinderClient::with_random_source("/tmp/broker.sock", &ZeroRandom).unwrap();
        assert_eq!(client.id().as_str(), "0".repeat(32));
    }

    #[test]
    fn test_clone_keeps_identifier() {
        let client = BinderClient::new("/tmp/broker.sock").unwrap();
        let copy = client.clone();
        assert_eq!(client.id(), copy.id());
    }

    #[test]
    fn test_from_config() {
        let config = BrokerConfig {
            socket_path: PathBuf::from("/run/test/binder.sock"),
            connect_timeout_seconds: 3,
            max_response_size: 512,
            max_control_size: 128,
        };

        let client = BinderClient::from_config(&config).unwrap();
        assert_eq!(client.socket_path(), Path::new("/run/test/binder.sock"));
        assert_eq!(client.connect_timeout(), Duration::from_secs(3));
        assert_eq!(client.receive_limits().max_payload, 512);
        assert_eq!(client.receive_limits().max_control, 128);
    }

    #[test]
    fn test_bind_blocking_reports_connect_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = BinderClient::new(dir.path().join("absent.sock")).unwrap();

        let err = client
            .bind_blocking(&BindAddress::new("127.0.0.1", 0))
            .unwrap_err();
        assert!(matches!(err, BinderError::Connect { .. }));
    }
}
