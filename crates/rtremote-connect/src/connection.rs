//! ClientConnection: owner of a negotiated session, mints proxies

use rtremote_core_interface::{Endpoint, ObjectId, Session, TransportError};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::proxy::ProxyObject;

/// Observable state of a `ClientConnection`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Session is negotiated and can carry requests
    Ready,
    /// Session has been torn down
    Closed,
}

impl ConnectionState {
    pub fn is_ready(self) -> bool {
        matches!(self, ConnectionState::Ready)
    }
}

/// A connection to a remote object host
///
/// Only a `Bootstrapper` creates these, and only after the session has been
/// negotiated, so a `ClientConnection` always starts out `Ready`. The held
/// session never changes. The connection is the session's only owner:
/// proxies it mints hold a weak reference, so dropping the connection
/// releases the session. Closing is driven by the session and its transport;
/// [`shutdown`](Self::shutdown) merely asks the session to do so.
pub struct ClientConnection {
    endpoint: Endpoint,
    session: Arc<dyn Session>,
}

impl ClientConnection {
    pub(crate) fn new(endpoint: Endpoint, session: Arc<dyn Session>) -> Self {
        Self { endpoint, session }
    }

    /// Mint a proxy for the remote object `object_id`
    ///
    /// Purely local: no request is sent and the id is not checked against
    /// the remote host. Calling this twice with the same id gives two
    /// independent proxies that behave identically.
    pub fn get_proxy_object(&self, object_id: impl Into<ObjectId>) -> ProxyObject {
        let object_id = object_id.into();
        debug!("Minting proxy for {} on {}", object_id, self.endpoint);
        ProxyObject::new(&self.session, object_id)
    }

    /// `Ready` while the session is open, `Closed` once it has been torn down
    pub fn state(&self) -> ConnectionState {
        if self.session.is_open() {
            ConnectionState::Ready
        } else {
            ConnectionState::Closed
        }
    }

    /// Endpoint this connection was bootstrapped from
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// The negotiated session, owned by this connection
    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    /// Whether `proxy` was minted from this connection's session
    pub fn owns(&self, proxy: &ProxyObject) -> bool {
        proxy.is_bound_to(&self.session)
    }

    /// Ask the session to tear itself down
    ///
    /// Proxies minted earlier fail with `SessionClosed` on their next call.
    pub async fn shutdown(self) -> Result<(), TransportError> {
        info!("Shutting down connection to {}", self.endpoint);
        self.session.close().await
    }
}

impl fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConnection")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state())
            .finish()
    }
}
