//! Negotiated protocol sessions and the negotiator that produces them

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::endpoint::ObjectId;
use crate::transport::{Transport, TransportError};

#[derive(Error, Debug)]
pub enum NegotiationError {
    #[error("Transport failed during negotiation: {0}")]
    Transport(#[from] TransportError),

    #[error("Handshake rejected: {0}")]
    Rejected(String),

    #[error("Handshake timed out after {0:?}")]
    TimedOut(Duration),

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum InvocationError {
    #[error("Session is closed")]
    SessionClosed,

    #[error("No response within {0:?}")]
    TimedOut(Duration),

    #[error("Remote object '{object_id}' failed: {message}")]
    Remote { object_id: String, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Marshaling error: {0}")]
    Marshal(#[from] serde_json::Error),
}

/// Which side of the handshake a negotiator should play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Initiate the session: open the socket and drive the handshake
    Client,
    /// Accept an incoming session
    Server,
}

impl Role {
    /// Boolean view of the role, `true` for the accepting side
    pub fn is_server(self) -> bool {
        matches!(self, Role::Server)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Client => f.write_str("client"),
            Role::Server => f.write_str("server"),
        }
    }
}

/// What a proxy asks the remote object to do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallKind {
    Get { property: String },
    Set { property: String, value: Value },
    Invoke { method: String, args: Vec<Value> },
}

/// A single request addressed to a remote object
///
/// The session decides how this becomes bytes on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCall {
    pub object_id: ObjectId,
    #[serde(flatten)]
    pub kind: CallKind,
}

impl RemoteCall {
    pub fn get(object_id: ObjectId, property: impl Into<String>) -> Self {
        Self {
            object_id,
            kind: CallKind::Get {
                property: property.into(),
            },
        }
    }

    pub fn set(object_id: ObjectId, property: impl Into<String>, value: Value) -> Self {
        Self {
            object_id,
            kind: CallKind::Set {
                property: property.into(),
                value,
            },
        }
    }

    pub fn invoke(object_id: ObjectId, method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            object_id,
            kind: CallKind::Invoke {
                method: method.into(),
                args,
            },
        }
    }
}

/// A negotiated, ready protocol channel to a remote object host
///
/// Teardown belongs to the session (and the transport beneath it). Once
/// [`is_open`](Self::is_open) reports `false` every further invocation must
/// fail with [`InvocationError::SessionClosed`].
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync + 'static`; a session is shared by
/// its connection and every proxy minted from it.
#[async_trait]
pub trait Session: Send + Sync + 'static {
    /// Whether the session can still carry requests
    fn is_open(&self) -> bool;

    /// Marshal `call`, send it, and wait for the correlated response
    async fn invoke(&self, call: RemoteCall) -> Result<Value, InvocationError>;

    /// Tear the session down, failing any outstanding calls
    async fn close(&self) -> Result<(), TransportError>;
}

/// Turns a constructed transport into a ready session
///
/// The negotiator owns everything between "transport object exists" and
/// "session is ready": opening the socket, performing the handshake, and
/// wiring up inbound/outbound event handling. It resolves exactly once.
#[async_trait]
pub trait SessionNegotiator: Send + Sync + 'static {
    async fn negotiate(
        &self,
        transport: Box<dyn Transport>,
        role: Role,
    ) -> Result<Arc<dyn Session>, NegotiationError>;
}
