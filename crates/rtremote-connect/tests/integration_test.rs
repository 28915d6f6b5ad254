//! Integration tests for rtremote-connect
//!
//! These drive the public API end to end against the in-memory doubles from
//! `rtremote-core-interface`, whose shared counters record every simulated
//! network operation.

use async_trait::async_trait;
use rtremote_connect::{connect, Bootstrapper, ConnectError, ConnectionState};
use rtremote_core_interface::mock::{IoCounters, MockNegotiator, MockTransportFactory};
use rtremote_core_interface::{
    InvocationError, NegotiationError, Role, Session, SessionNegotiator, Transport, TransportError,
};
use serde_json::json;
use std::error::Error as _;
use std::sync::Arc;

/// Fails the test if negotiation is ever requested
struct UnreachableNegotiator;

#[async_trait]
impl SessionNegotiator for UnreachableNegotiator {
    async fn negotiate(
        &self,
        _transport: Box<dyn Transport>,
        _role: Role,
    ) -> Result<Arc<dyn Session>, NegotiationError> {
        panic!("negotiator must not run when the transport cannot be built");
    }
}

#[tokio::test]
async fn test_connect_yields_the_negotiated_session() {
    let counters = IoCounters::new();
    let negotiator = MockNegotiator::accepting(Arc::clone(&counters));
    let bootstrapper = Bootstrapper::new(
        MockTransportFactory::new(Arc::clone(&counters)),
        negotiator.clone(),
    );

    let connection = bootstrapper.connect("ws://host:1234/").await.unwrap();

    let produced = negotiator.last_session().unwrap();
    assert!(std::ptr::addr_eq(
        Arc::as_ptr(connection.session()),
        Arc::as_ptr(&produced)
    ));
    assert_eq!(connection.state(), ConnectionState::Ready);
}

#[tokio::test]
async fn test_scenario_obj_42() {
    let counters = IoCounters::new();
    let negotiator = MockNegotiator::accepting(Arc::clone(&counters));
    let bootstrapper = Bootstrapper::new(
        MockTransportFactory::new(Arc::clone(&counters)),
        negotiator.clone(),
    );

    let connection = bootstrapper.connect("ws://host:1234/").await.unwrap();

    // Role recorded by the negotiator: client, i.e. "not the server side".
    let roles = negotiator.roles();
    assert_eq!(roles, vec![Role::Client]);
    assert!(!roles[0].is_server());

    let proxy = connection.get_proxy_object("obj-42");
    assert_eq!(proxy.object_id().as_str(), "obj-42");
    assert!(connection.owns(&proxy));
}

#[tokio::test]
async fn test_proxy_outliving_its_connection_reports_closed() {
    let counters = IoCounters::new();
    let bootstrapper = Bootstrapper::new(
        MockTransportFactory::new(Arc::clone(&counters)),
        MockNegotiator::accepting(Arc::clone(&counters)),
    );

    let connection = bootstrapper.connect("ws://host:1234/").await.unwrap();
    let proxy = connection.get_proxy_object("obj-42");
    drop(connection);
    let before = counters.snapshot();

    let err = proxy.call("ping", vec![]).await.unwrap_err();
    assert!(matches!(err, InvocationError::SessionClosed));
    assert!(!proxy.is_session_open());
    assert_eq!(counters.snapshot(), before);
}

#[tokio::test]
async fn test_scenario_handshake_timeout() {
    let counters = IoCounters::new();
    let bootstrapper = Bootstrapper::new(
        MockTransportFactory::new(Arc::clone(&counters)),
        MockNegotiator::rejecting(Arc::clone(&counters), "handshake timeout"),
    );

    let err = bootstrapper.connect("ws://host:1234/").await.unwrap_err();

    assert!(matches!(err, ConnectError::Negotiation { .. }));
    assert_eq!(err.endpoint(), "ws://host:1234/");
    assert_eq!(err.source().unwrap().to_string(), "handshake timeout");
}

#[tokio::test]
async fn test_transport_failure_skips_negotiation() {
    let counters = IoCounters::new();
    let bootstrapper = Bootstrapper::new(
        MockTransportFactory::new(Arc::clone(&counters)).with_schemes(&["ws"]),
        UnreachableNegotiator,
    );

    let err = bootstrapper.connect("tcp://host:1234").await.unwrap_err();

    assert!(err.is_transport_construction());
    assert!(matches!(
        err.source().and_then(|s| s.downcast_ref::<TransportError>()),
        Some(TransportError::UnsupportedScheme(scheme)) if scheme == "tcp"
    ));
    assert_eq!(counters.snapshot().transports_built, 0);
}

#[test]
fn test_transport_failure_rejects_on_first_poll() {
    let counters = IoCounters::new();
    let bootstrapper = Bootstrapper::new(
        MockTransportFactory::new(Arc::clone(&counters)),
        UnreachableNegotiator,
    );

    let mut attempt = tokio_test::task::spawn(bootstrapper.connect(""));
    let result = tokio_test::assert_ready!(attempt.poll());

    assert!(matches!(
        result,
        Err(ConnectError::TransportConstruction { .. })
    ));
}

#[tokio::test]
async fn test_distinct_ids_share_session() {
    let counters = IoCounters::new();
    let transports = MockTransportFactory::new(Arc::clone(&counters));
    let negotiator = MockNegotiator::accepting(Arc::clone(&counters));

    let connection = connect(&transports, &negotiator, "wss://host/").await.unwrap();

    let a = connection.get_proxy_object("a");
    let b = connection.get_proxy_object("b");

    assert!(a.shares_session_with(&b));
    assert_ne!(a.object_id(), b.object_id());
    assert_ne!(a, b);
}

#[tokio::test]
async fn test_same_id_twice_is_equivalent_and_io_free() {
    let counters = IoCounters::new();
    let bootstrapper = Bootstrapper::new(
        MockTransportFactory::new(Arc::clone(&counters)),
        MockNegotiator::accepting(Arc::clone(&counters)),
    );
    let connection = bootstrapper.connect("ws://host:1234/").await.unwrap();
    let before = counters.snapshot();

    let first = connection.get_proxy_object("obj-7");
    let second = connection.get_proxy_object("obj-7");

    assert_eq!(counters.snapshot(), before);
    assert_eq!(first, second);

    // Behaviourally equivalent: a write through one is visible through the other.
    first.set("label", json!("hello")).await.unwrap();
    assert_eq!(second.get("label").await.unwrap(), json!("hello"));
}

#[tokio::test]
async fn test_one_network_attempt_per_connect() {
    let counters = IoCounters::new();
    let bootstrapper = Bootstrapper::new(
        MockTransportFactory::new(Arc::clone(&counters)),
        MockNegotiator::rejecting(Arc::clone(&counters), "refused"),
    );

    assert!(bootstrapper.connect("ws://host:1234/").await.is_err());
    assert!(bootstrapper.connect("ws://host:1234/").await.is_err());

    let io = counters.snapshot();
    assert_eq!(io.transports_built, 2);
    assert_eq!(io.negotiations, 2);
    assert_eq!(io.opens, 2);
}

#[tokio::test]
async fn test_concurrent_connects_are_independent() {
    let counters = IoCounters::new();
    let negotiator = MockNegotiator::accepting(Arc::clone(&counters));
    let bootstrapper = Bootstrapper::new(
        MockTransportFactory::new(Arc::clone(&counters)),
        negotiator.clone(),
    );

    let endpoints = ["ws://a:1/", "ws://b:2/", "ws://c:3/"];
    let connections =
        futures::future::join_all(endpoints.iter().map(|e| bootstrapper.connect(*e))).await;

    let connections: Vec<_> = connections.into_iter().map(Result::unwrap).collect();
    assert_eq!(negotiator.sessions().len(), 3);

    let proxies: Vec<_> = connections
        .iter()
        .map(|c| c.get_proxy_object("shared-id"))
        .collect();
    assert!(!proxies[0].shares_session_with(&proxies[1]));
    assert!(!proxies[1].shares_session_with(&proxies[2]));

    connections[0].session().close().await.unwrap();
    assert_eq!(connections[0].state(), ConnectionState::Closed);
    assert_eq!(connections[1].state(), ConnectionState::Ready);
}

#[tokio::test]
async fn test_spawned_connect_is_send() {
    let counters = IoCounters::new();
    let bootstrapper = Bootstrapper::new(
        MockTransportFactory::new(Arc::clone(&counters)),
        MockNegotiator::accepting(Arc::clone(&counters)),
    );

    let handle = tokio::spawn(async move {
        let connection = bootstrapper.connect("ws://host:1234/").await?;
        let value = connection
            .get_proxy_object("obj-1")
            .call("ping", vec![])
            .await?;
        Ok::<_, anyhow::Error>(value)
    });

    let value = handle.await.unwrap().unwrap();
    assert_eq!(value["method"], json!("ping"));
}
