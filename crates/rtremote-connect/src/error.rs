//! Error types for the rtremote-connect crate

use rtremote_core_interface::{NegotiationError, TransportError};
use thiserror::Error;

/// Why a connection attempt failed
///
/// The underlying cause is kept intact and reachable through
/// [`std::error::Error::source`].
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("Failed to construct transport for {endpoint}: {source}")]
    TransportConstruction {
        endpoint: String,
        #[source]
        source: TransportError,
    },

    #[error("Session negotiation with {endpoint} failed: {source}")]
    Negotiation {
        endpoint: String,
        #[source]
        source: NegotiationError,
    },
}

impl ConnectError {
    /// The endpoint the failed attempt targeted
    pub fn endpoint(&self) -> &str {
        match self {
            ConnectError::TransportConstruction { endpoint, .. }
            | ConnectError::Negotiation { endpoint, .. } => endpoint,
        }
    }

    /// Whether the attempt failed before any network activity
    pub fn is_transport_construction(&self) -> bool {
        matches!(self, ConnectError::TransportConstruction { .. })
    }
}
