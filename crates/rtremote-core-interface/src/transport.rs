//! Byte-level transport capability

use async_trait::async_trait;
use thiserror::Error;

use crate::endpoint::Endpoint;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Unsupported transport scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Transport is closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Other(String),
}

/// Something the transport observed on its channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The underlying socket is connected
    Opened,
    /// One complete frame received from the peer
    Message(Vec<u8>),
    /// The channel was closed by either side
    Closed,
}

/// A message-oriented channel to a remote object host
///
/// A freshly constructed transport has not touched the network yet; whoever
/// negotiates a session over it is responsible for calling [`open`](Self::open)
/// and for draining [`next_event`](Self::next_event).
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to work across async boundaries.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// The endpoint this transport was built for
    fn endpoint(&self) -> &Endpoint;

    /// Open the network path (connect the socket)
    async fn open(&self) -> Result<(), TransportError>;

    /// Send one frame to the peer
    async fn send(&self, frame: Vec<u8>) -> Result<(), TransportError>;

    /// Wait for the next event, `None` once the event stream is exhausted
    async fn next_event(&self) -> Option<TransportEvent>;

    /// Close the channel
    async fn close(&self) -> Result<(), TransportError>;
}

/// Builds transports for endpoints
///
/// Construction must not block and must not perform network I/O. A malformed
/// or unsupported endpoint is reported here, before any negotiation starts.
pub trait TransportFactory: Send + Sync + 'static {
    fn new_transport(&self, endpoint: &Endpoint) -> Result<Box<dyn Transport>, TransportError>;
}
