//! ProxyObject: local handle for an object living on the remote host

use rtremote_core_interface::{InvocationError, ObjectId, RemoteCall, Session};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;

/// A handle that forwards operations on one remote object
///
/// The proxy holds no network state of its own: it is the pair
/// (session, object id). The session is borrowed from the owning
/// `ClientConnection`, never co-owned, so a proxy can neither keep a
/// dropped connection alive nor close it. Cloning is cheap and clones are
/// interchangeable.
/// Turning a call into wire bytes and correlating the response is the
/// session's job.
///
/// # Example
///
/// ```rust,no_run
/// use rtremote_connect::ClientConnection;
/// use serde_json::json;
///
/// # async fn example(connection: &ClientConnection) -> anyhow::Result<()> {
/// let rect = connection.get_proxy_object("rect-1");
///
/// rect.set("x", json!(100)).await?;
/// let x = rect.get("x").await?;
/// rect.call("animateTo", vec![json!({"x": 200}), json!(0.5)]).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ProxyObject {
    session: Weak<dyn Session>,
    object_id: ObjectId,
}

impl ProxyObject {
    /// Bind `object_id` to an already negotiated session
    ///
    /// Only a weak reference is kept: the caller stays the session's owner,
    /// and once it lets go every call fails with `SessionClosed`. Usually
    /// reached through `ClientConnection::get_proxy_object`.
    pub fn new(session: &Arc<dyn Session>, object_id: ObjectId) -> Self {
        Self {
            session: Arc::downgrade(session),
            object_id,
        }
    }

    /// Id of the remote object this proxy addresses
    pub fn object_id(&self) -> &ObjectId {
        &self.object_id
    }

    /// Whether the session is still owned and open
    pub fn is_session_open(&self) -> bool {
        self.session.upgrade().is_some_and(|session| session.is_open())
    }

    /// Whether both proxies forward through the same session instance
    pub fn shares_session_with(&self, other: &ProxyObject) -> bool {
        Weak::ptr_eq(&self.session, &other.session)
    }

    pub(crate) fn is_bound_to(&self, session: &Arc<dyn Session>) -> bool {
        Weak::ptr_eq(&self.session, &Arc::downgrade(session))
    }

    /// Read a property of the remote object
    pub async fn get(&self, property: &str) -> Result<Value, InvocationError> {
        debug!("get {}.{}", self.object_id, property);
        self.forward(RemoteCall::get(self.object_id.clone(), property))
            .await
    }

    /// Write a property of the remote object
    pub async fn set(&self, property: &str, value: Value) -> Result<(), InvocationError> {
        debug!("set {}.{}", self.object_id, property);
        self.forward(RemoteCall::set(self.object_id.clone(), property, value))
            .await
            .map(|_| ())
    }

    /// Invoke a method on the remote object and return its result
    pub async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, InvocationError> {
        debug!("call {}.{}({} args)", self.object_id, method, args.len());
        self.forward(RemoteCall::invoke(self.object_id.clone(), method, args))
            .await
    }

    async fn forward(&self, call: RemoteCall) -> Result<Value, InvocationError> {
        // The strong reference lives only for the duration of this call.
        let Some(session) = self.session.upgrade() else {
            debug!("{}: owning connection dropped", self.object_id);
            return Err(InvocationError::SessionClosed);
        };
        if !session.is_open() {
            return Err(InvocationError::SessionClosed);
        }
        session.invoke(call).await
    }
}

impl PartialEq for ProxyObject {
    /// Same session, same id
    fn eq(&self, other: &Self) -> bool {
        self.object_id == other.object_id && self.shares_session_with(other)
    }
}

impl Eq for ProxyObject {}

impl fmt::Debug for ProxyObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyObject")
            .field("object_id", &self.object_id)
            .field("session_open", &self.is_session_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::Bootstrapper;
    use rtremote_core_interface::mock::{IoCounters, MockNegotiator, MockTransportFactory};
    use rtremote_core_interface::CallKind;
    use serde_json::json;

    async fn setup() -> (crate::ClientConnection, MockNegotiator, Arc<IoCounters>) {
        let counters = IoCounters::new();
        let negotiator = MockNegotiator::accepting(Arc::clone(&counters));
        let connection = Bootstrapper::new(
            MockTransportFactory::new(Arc::clone(&counters)),
            negotiator.clone(),
        )
        .connect("ws://host:1234/")
        .await
        .unwrap();
        (connection, negotiator, counters)
    }

    #[tokio::test]
    async fn test_set_then_get_forwards_through_session() {
        let (connection, negotiator, counters) = setup().await;
        let proxy = connection.get_proxy_object("rect-1");

        proxy.set("x", json!(100)).await.unwrap();
        assert_eq!(proxy.get("x").await.unwrap(), json!(100));
        assert_eq!(counters.snapshot().frames_sent, 2);

        let calls = negotiator.last_session().unwrap().calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.object_id == "rect-1"));
        assert!(matches!(&calls[1].kind, CallKind::Get { property } if property == "x"));
    }

    #[tokio::test]
    async fn test_call_returns_remote_result() {
        let (connection, _, _) = setup().await;
        let proxy = connection.get_proxy_object("obj-42");

        let result = proxy.call("add", vec![json!(1), json!(2)]).await.unwrap();
        assert_eq!(result["method"], json!("add"));
        assert_eq!(result["object_id"], json!("obj-42"));
        assert_eq!(result["args"], json!([1, 2]));
    }

    #[tokio::test]
    async fn test_remote_failure_surfaces_as_invocation_error() {
        let (connection, _, _) = setup().await;
        let proxy = connection.get_proxy_object("obj-42");

        let err = proxy.call("fail", vec![]).await.unwrap_err();
        assert!(matches!(err, InvocationError::Remote { ref object_id, .. } if object_id == "obj-42"));
    }

    #[tokio::test]
    async fn test_closed_session_fails_without_io() {
        let (connection, _, counters) = setup().await;
        let proxy = connection.get_proxy_object("obj-1");
        connection.session().close().await.unwrap();
        let before = counters.snapshot();

        assert!(matches!(
            proxy.get("anything").await,
            Err(InvocationError::SessionClosed)
        ));
        assert_eq!(counters.snapshot().frames_sent, before.frames_sent);
    }

    #[tokio::test]
    async fn test_dropped_connection_fails_calls_without_io() {
        let (connection, negotiator, counters) = setup().await;
        let proxy = connection.get_proxy_object("obj-1");
        let clone = proxy.clone();
        assert!(proxy.is_session_open());

        drop(connection);
        let before = counters.snapshot();

        assert!(!proxy.is_session_open());
        assert!(negotiator.last_session().is_none());
        assert!(matches!(
            proxy.call("add", vec![json!(1)]).await,
            Err(InvocationError::SessionClosed)
        ));
        assert!(matches!(
            clone.set("x", json!(1)).await,
            Err(InvocationError::SessionClosed)
        ));
        assert_eq!(counters.snapshot().frames_sent, before.frames_sent);
        assert_eq!(proxy, clone);
    }

    #[tokio::test]
    async fn test_proxies_do_not_hold_the_session() {
        let (connection, _, _) = setup().await;
        let before = Arc::strong_count(connection.session());

        let proxies: Vec<_> = (0..4)
            .map(|i| connection.get_proxy_object(format!("obj-{}", i)))
            .collect();

        assert_eq!(Arc::strong_count(connection.session()), before);
        assert!(proxies.iter().all(|p| connection.owns(p)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_call_times_out() {
        let (connection, negotiator, _) = setup().await;
        let session = negotiator.last_session().unwrap();
        session.silence("ghost");

        let proxy = connection.get_proxy_object("ghost");
        let err = proxy.get("anything").await.unwrap_err();

        assert!(matches!(err, InvocationError::TimedOut(_)));
        assert!(session.pending().is_empty());
    }

    #[tokio::test]
    async fn test_equality_is_session_and_id() {
        let (connection, _, _) = setup().await;
        let (other_connection, _, _) = setup().await;

        let a = connection.get_proxy_object("obj-1");
        let b = connection.get_proxy_object("obj-1");
        let c = connection.get_proxy_object("obj-2");
        let d = other_connection.get_proxy_object("obj-1");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn test_proxy_object_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProxyObject>();
    }
}
