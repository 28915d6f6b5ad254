//! Bootstrapper: endpoint -> transport -> negotiated session -> ClientConnection

use rtremote_core_interface::{Endpoint, Role, SessionNegotiator, Transport, TransportFactory};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::connection::ClientConnection;
use crate::error::ConnectError;

/// Produces ready `ClientConnection`s from endpoint descriptors
///
/// Each call to [`connect`](Self::connect) makes exactly one connection
/// attempt. There is no retry and no shared state between attempts, so one
/// bootstrapper can serve any number of concurrent connects.
///
/// # Example
///
/// ```rust,no_run
/// use rtremote_connect::Bootstrapper;
/// use rtremote_core_interface::{SessionNegotiator, TransportFactory};
///
/// # async fn example(
/// #     transports: impl TransportFactory,
/// #     negotiator: impl SessionNegotiator,
/// # ) -> anyhow::Result<()> {
/// let bootstrapper = Bootstrapper::new(transports, negotiator);
///
/// let connection = bootstrapper.connect("ws://10.0.0.5:1234/").await?;
/// let proxy = connection.get_proxy_object("obj-42");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Bootstrapper {
    transports: Arc<dyn TransportFactory>,
    negotiator: Arc<dyn SessionNegotiator>,
}

impl Bootstrapper {
    pub fn new(transports: impl TransportFactory, negotiator: impl SessionNegotiator) -> Self {
        Self {
            transports: Arc::new(transports),
            negotiator: Arc::new(negotiator),
        }
    }

    /// Build from collaborators that are already shared elsewhere
    pub fn from_shared(
        transports: Arc<dyn TransportFactory>,
        negotiator: Arc<dyn SessionNegotiator>,
    ) -> Self {
        Self {
            transports,
            negotiator,
        }
    }

    /// Construct the transport for `endpoint` without touching the network
    ///
    /// A malformed or unsupported endpoint fails here, before the negotiator
    /// is ever involved. The returned attempt negotiates when finished.
    ///
    /// # Errors
    ///
    /// Returns `ConnectError::TransportConstruction` if the transport factory
    /// refuses the endpoint.
    pub fn begin(&self, endpoint: impl Into<Endpoint>) -> Result<ConnectAttempt<'_>, ConnectError> {
        ConnectAttempt::new(self.transports.as_ref(), self.negotiator.as_ref(), endpoint.into())
    }

    /// Connect to `endpoint` and return a ready connection
    ///
    /// This will:
    /// 1. Construct a transport bound to the endpoint
    /// 2. Negotiate a session over it in the client role
    /// 3. Wrap the negotiated session in a `ClientConnection`
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The endpoint is malformed or unsupported by the transport factory
    /// - The negotiator fails (socket error, rejected handshake, timeout)
    pub async fn connect(
        &self,
        endpoint: impl Into<Endpoint>,
    ) -> Result<ClientConnection, ConnectError> {
        self.begin(endpoint)?.finish().await
    }
}

impl fmt::Debug for Bootstrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bootstrapper").finish_non_exhaustive()
    }
}

/// One-off connect without keeping a `Bootstrapper` around
pub async fn connect<F, N>(
    transports: &F,
    negotiator: &N,
    endpoint: impl Into<Endpoint>,
) -> Result<ClientConnection, ConnectError>
where
    F: TransportFactory,
    N: SessionNegotiator,
{
    ConnectAttempt::new(transports, negotiator, endpoint.into())?
        .finish()
        .await
}

/// A connection attempt whose transport exists but whose session does not
///
/// This is the only place the "connecting" state lives. Finishing consumes
/// the attempt, so its negotiation resolves exactly once.
pub struct ConnectAttempt<'a> {
    endpoint: Endpoint,
    transport: Box<dyn Transport>,
    negotiator: &'a dyn SessionNegotiator,
}

impl<'a> ConnectAttempt<'a> {
    fn new(
        transports: &dyn TransportFactory,
        negotiator: &'a dyn SessionNegotiator,
        endpoint: Endpoint,
    ) -> Result<Self, ConnectError> {
        info!("Connecting to {}", endpoint);

        let transport = transports.new_transport(&endpoint).map_err(|e| {
            warn!("Cannot build transport for {}: {}", endpoint, e);
            ConnectError::TransportConstruction {
                endpoint: endpoint.to_string(),
                source: e,
            }
        })?;

        debug!("Transport constructed for {}", endpoint);

        Ok(Self {
            endpoint,
            transport,
            negotiator,
        })
    }

    /// Endpoint the transport was built for
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Negotiate the session in the client role and wrap it
    pub async fn finish(self) -> Result<ClientConnection, ConnectError> {
        let Self {
            endpoint,
            transport,
            negotiator,
        } = self;

        debug!("Negotiating session with {} as {}", endpoint, Role::Client);

        let session = negotiator
            .negotiate(transport, Role::Client)
            .await
            .map_err(|e| {
                warn!("Session negotiation with {} failed: {}", endpoint, e);
                ConnectError::Negotiation {
                    endpoint: endpoint.to_string(),
                    source: e,
                }
            })?;

        info!("Session established with {}", endpoint);

        Ok(ClientConnection::new(endpoint, session))
    }
}

impl fmt::Debug for ConnectAttempt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectAttempt")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
