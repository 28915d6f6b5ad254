/*!
 * rtremote - client access to objects hosted on a remote peer
 *
 * Connect to a remote object host and talk to its objects through proxies:
 * - Endpoint -> transport -> negotiated session, in one `connect` call
 * - Proxy objects minted locally, without a network round-trip
 * - Per-call request/response correlation with timeouts
 * - TOML configuration and structured logging via `tracing`
 *
 * The transport and protocol are pluggable; see `rtremote-core-interface`.
 */

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{LogLevel, RemoteConfig};
pub use error::{Result, RtRemoteError};
pub use logging::init_logging;
pub use rtremote_connect::{
    connect, Bootstrapper, ClientConnection, ConnectAttempt, ConnectError, ConnectionState,
    ProxyObject,
};
pub use rtremote_core_interface::{
    AsyncHandle, CallKind, CorrelationKey, Endpoint, InvocationError, NegotiationError, ObjectId,
    PendingCalls, RemoteCall, Role, Session, SessionNegotiator, Transport, TransportError,
    TransportEvent, TransportFactory,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
