//! rtremote Core Interface: collaborator contracts for remote object access
//!
//! This crate defines the capabilities that the client bootstrap layer
//! (`rtremote-connect`) consumes but does not implement itself.
//!
//! # Architecture
//!
//! Three collaborators sit below a client connection:
//!
//! 1. **Transport**: a byte-level channel bound to an [`Endpoint`], built by a
//!    [`TransportFactory`] without touching the network
//! 2. **Session**: the negotiated protocol channel produced by a
//!    [`SessionNegotiator`] from a transport and a [`Role`]
//! 3. **Remote calls**: [`RemoteCall`] descriptors that a [`Session`] marshals
//!    to the wire and correlates with their responses
//!
//! Session implementors can use [`PendingCalls`] to pair outgoing requests
//! with incoming responses.
//!
//! # Example
//!
//! ```rust,no_run
//! use rtremote_core_interface::{Endpoint, Role, SessionNegotiator, TransportFactory};
//!
//! async fn open<F, N>(factory: &F, negotiator: &N) -> anyhow::Result<()>
//! where
//!     F: TransportFactory,
//!     N: SessionNegotiator,
//! {
//!     let transport = factory.new_transport(&Endpoint::new("ws://10.0.0.5:1234/"))?;
//!     let session = negotiator.negotiate(transport, Role::Client).await?;
//!     assert!(session.is_open());
//!     Ok(())
//! }
//! ```

pub mod correlation;
pub mod endpoint;
pub mod session;
pub mod transport;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use correlation::{AsyncHandle, CorrelationKey, PendingCalls};
pub use endpoint::{Endpoint, ObjectId};
pub use session::{
    CallKind, InvocationError, NegotiationError, RemoteCall, Role, Session, SessionNegotiator,
};
pub use transport::{Transport, TransportError, TransportEvent, TransportFactory};
