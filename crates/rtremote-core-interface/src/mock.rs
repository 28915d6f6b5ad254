//! In-memory test doubles with I/O counters
//!
//! Everything here shares one [`IoCounters`] so a test can assert exactly
//! how much "network" activity an operation caused. The doubles behave like
//! a well-mannered remote host: the transport accepts `ws`, `wss` and `tcp`
//! endpoints, the negotiator opens the transport and waits for it to report
//! `Opened`, and the session answers every call on the spot unless told to
//! stay silent for an object.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use crate::correlation::PendingCalls;
use crate::endpoint::{Endpoint, ObjectId};
use crate::session::{
    CallKind, InvocationError, NegotiationError, RemoteCall, Role, Session, SessionNegotiator,
};
use crate::transport::{Transport, TransportError, TransportEvent, TransportFactory};

/// Shared tallies of simulated network activity
#[derive(Debug, Default)]
pub struct IoCounters {
    transports_built: AtomicUsize,
    opens: AtomicUsize,
    frames_sent: AtomicUsize,
    negotiations: AtomicUsize,
    closes: AtomicUsize,
}

/// Point-in-time copy of [`IoCounters`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoSnapshot {
    pub transports_built: usize,
    pub opens: usize,
    pub frames_sent: usize,
    pub negotiations: usize,
    pub closes: usize,
}

impl IoCounters {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> IoSnapshot {
        IoSnapshot {
            transports_built: self.transports_built.load(Ordering::SeqCst),
            opens: self.opens.load(Ordering::SeqCst),
            frames_sent: self.frames_sent.load(Ordering::SeqCst),
            negotiations: self.negotiations.load(Ordering::SeqCst),
            closes: self.closes.load(Ordering::SeqCst),
        }
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Transport
// ═══════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct MockTransportFactory {
    counters: Arc<IoCounters>,
    schemes: Vec<String>,
}

impl MockTransportFactory {
    pub fn new(counters: Arc<IoCounters>) -> Self {
        Self {
            counters,
            schemes: vec!["ws".to_string(), "wss".to_string(), "tcp".to_string()],
        }
    }

    /// Restrict the schemes this factory will build transports for
    pub fn with_schemes(mut self, schemes: &[&str]) -> Self {
        self.schemes = schemes.iter().map(|s| s.to_string()).collect();
        self
    }
}

impl TransportFactory for MockTransportFactory {
    fn new_transport(&self, endpoint: &Endpoint) -> Result<Box<dyn Transport>, TransportError> {
        let url = endpoint.parse_url()?;

        if !self.schemes.iter().any(|s| s == url.scheme()) {
            return Err(TransportError::UnsupportedScheme(url.scheme().to_string()));
        }

        IoCounters::bump(&self.counters.transports_built);
        Ok(Box::new(MockTransport::new(
            endpoint.clone(),
            Arc::clone(&self.counters),
        )))
    }
}

pub struct MockTransport {
    endpoint: Endpoint,
    counters: Arc<IoCounters>,
    open: AtomicBool,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<TransportEvent>>,
    sent: Mutex<Vec<Vec<u8>>>,
}

impl MockTransport {
    pub fn new(endpoint: Endpoint, counters: Arc<IoCounters>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            endpoint,
            counters,
            open: AtomicBool::new(false),
            events_tx,
            events_rx: tokio::sync::Mutex::new(events_rx),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Frames written so far
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn open(&self) -> Result<(), TransportError> {
        IoCounters::bump(&self.counters.opens);
        self.open.store(true, Ordering::SeqCst);
        let _ = self.events_tx.send(TransportEvent::Opened);
        Ok(())
    }

    async fn send(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        IoCounters::bump(&self.counters.frames_sent);
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(frame);
        }
        Ok(())
    }

    async fn next_event(&self) -> Option<TransportEvent> {
        self.events_rx.lock().await.recv().await
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.open.swap(false, Ordering::SeqCst) {
            IoCounters::bump(&self.counters.closes);
            let _ = self.events_tx.send(TransportEvent::Closed);
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Negotiator
// ═══════════════════════════════════════════════════════════════════════

/// How a [`MockNegotiator`] answers the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationBehavior {
    Accept,
    /// Fail with `NegotiationError::Other` carrying this message
    Reject(String),
}

#[derive(Clone)]
pub struct MockNegotiator {
    counters: Arc<IoCounters>,
    behavior: NegotiationBehavior,
    request_timeout: Duration,
    roles: Arc<Mutex<Vec<Role>>>,
    sessions: Arc<Mutex<Vec<Weak<MockSession>>>>,
}

impl MockNegotiator {
    pub fn accepting(counters: Arc<IoCounters>) -> Self {
        Self::with_behavior(counters, NegotiationBehavior::Accept)
    }

    pub fn rejecting(counters: Arc<IoCounters>, cause: impl Into<String>) -> Self {
        Self::with_behavior(counters, NegotiationBehavior::Reject(cause.into()))
    }

    pub fn with_behavior(counters: Arc<IoCounters>, behavior: NegotiationBehavior) -> Self {
        Self {
            counters,
            behavior,
            request_timeout: Duration::from_secs(1),
            roles: Arc::new(Mutex::new(Vec::new())),
            sessions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Default wait for calls on the sessions this negotiator produces
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Roles passed to every `negotiate` call, in order
    pub fn roles(&self) -> Vec<Role> {
        self.roles.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Sessions produced so far that are still alive, in order
    ///
    /// Only weak references are recorded, so the negotiator never keeps a
    /// dropped connection's session alive.
    pub fn sessions(&self) -> Vec<Arc<MockSession>> {
        self.sessions
            .lock()
            .map(|s| s.iter().filter_map(Weak::upgrade).collect())
            .unwrap_or_default()
    }

    pub fn last_session(&self) -> Option<Arc<MockSession>> {
        self.sessions().pop()
    }
}

#[async_trait]
impl SessionNegotiator for MockNegotiator {
    async fn negotiate(
        &self,
        transport: Box<dyn Transport>,
        role: Role,
    ) -> Result<Arc<dyn Session>, NegotiationError> {
        IoCounters::bump(&self.counters.negotiations);
        if let Ok(mut roles) = self.roles.lock() {
            roles.push(role);
        }

        transport.open().await?;
        match transport.next_event().await {
            Some(TransportEvent::Opened) => {}
            other => {
                return Err(NegotiationError::Rejected(format!(
                    "expected open event, got {:?}",
                    other
                )))
            }
        }

        if let NegotiationBehavior::Reject(cause) = &self.behavior {
            transport.close().await?;
            return Err(NegotiationError::Other(cause.clone()));
        }

        let session = Arc::new(MockSession::new(
            transport,
            PendingCalls::new(self.request_timeout),
        ));
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.push(Arc::downgrade(&session));
        }

        Ok(session as Arc<dyn Session>)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Session
// ═══════════════════════════════════════════════════════════════════════

/// A session backed by an in-memory object table
///
/// `Get` reads a property (`null` if unset), `Set` stores it, and `Invoke`
/// echoes the method and arguments back. An invocation of method `"fail"`
/// is answered with a remote error.
pub struct MockSession {
    transport: Box<dyn Transport>,
    pending: Arc<PendingCalls>,
    open: AtomicBool,
    calls: Mutex<Vec<RemoteCall>>,
    properties: Mutex<HashMap<(ObjectId, String), Value>>,
    silent: Mutex<HashSet<ObjectId>>,
}

impl MockSession {
    pub fn new(transport: Box<dyn Transport>, pending: Arc<PendingCalls>) -> Self {
        Self {
            transport,
            pending,
            open: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
            properties: Mutex::new(HashMap::new()),
            silent: Mutex::new(HashSet::new()),
        }
    }

    /// Calls received so far, in order
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Never answer calls addressed to `object_id`
    pub fn silence(&self, object_id: impl Into<ObjectId>) {
        if let Ok(mut silent) = self.silent.lock() {
            silent.insert(object_id.into());
        }
    }

    pub fn pending(&self) -> &Arc<PendingCalls> {
        &self.pending
    }

    fn answer(&self, call: &RemoteCall) -> Option<Result<Value, InvocationError>> {
        let silent = self
            .silent
            .lock()
            .map(|s| s.contains(&call.object_id))
            .unwrap_or(false);
        if silent {
            return None;
        }

        let mut properties = match self.properties.lock() {
            Ok(properties) => properties,
            Err(poisoned) => poisoned.into_inner(),
        };

        let outcome = match &call.kind {
            CallKind::Get { property } => Ok(properties
                .get(&(call.object_id.clone(), property.clone()))
                .cloned()
                .unwrap_or(Value::Null)),
            CallKind::Set { property, value } => {
                properties.insert((call.object_id.clone(), property.clone()), value.clone());
                Ok(Value::Null)
            }
            CallKind::Invoke { method, .. } if method == "fail" => Err(InvocationError::Remote {
                object_id: call.object_id.to_string(),
                message: "method failed".to_string(),
            }),
            CallKind::Invoke { method, args } => Ok(json!({
                "object_id": call.object_id,
                "method": method,
                "args": args,
            })),
        };

        Some(outcome)
    }
}

#[async_trait]
impl Session for MockSession {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn invoke(&self, call: RemoteCall) -> Result<Value, InvocationError> {
        if !self.is_open() {
            return Err(InvocationError::SessionClosed);
        }

        let handle = self.pending.register();
        let frame = serde_json::to_vec(&json!({
            "correlation_key": handle.key(),
            "call": &call,
        }))?;
        self.transport.send(frame).await?;

        debug!("Mock session received call for {}", call.object_id);
        let answer = self.answer(&call);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }

        if let Some(outcome) = answer {
            self.pending.complete(handle.key(), outcome);
        }

        handle.wait().await
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.open.swap(false, Ordering::SeqCst) {
            self.pending.fail_all();
            self.transport.close().await?;
        }
        Ok(())
    }
}
