//! rtremote Connect: client-side bootstrap for remote object access
//!
//! This crate turns an endpoint into a negotiated session and hands out
//! proxies for objects living on the remote host.
//!
//! # Architecture
//!
//! - **Bootstrapper**: builds a transport for an endpoint, negotiates a
//!   session over it in the client role, and yields a `ClientConnection`
//! - **ClientConnection**: owns the session and mints `ProxyObject`s
//! - **ProxyObject**: forwards property reads/writes and method calls for
//!   one remote object id through the shared session
//!
//! # Example
//!
//! ```rust,no_run
//! use rtremote_connect::Bootstrapper;
//! use rtremote_core_interface::{SessionNegotiator, TransportFactory};
//! use serde_json::json;
//!
//! async fn example(
//!     transports: impl TransportFactory,
//!     negotiator: impl SessionNegotiator,
//! ) -> anyhow::Result<()> {
//!     let bootstrapper = Bootstrapper::new(transports, negotiator);
//!     let connection = bootstrapper.connect("ws://10.0.0.5:1234/").await?;
//!
//!     let scene = connection.get_proxy_object("scene-root");
//!     scene.set("width", json!(1280)).await?;
//!     let result = scene.call("render", vec![]).await?;
//!     println!("render returned {}", result);
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
pub mod connection;
pub mod error;
pub mod proxy;

pub use bootstrap::{connect, Bootstrapper, ConnectAttempt};
pub use connection::{ClientConnection, ConnectionState};
pub use error::ConnectError;
pub use proxy::ProxyObject;
