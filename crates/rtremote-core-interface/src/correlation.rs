//! Request/response correlation for session implementations
//!
//! A session sends a request tagged with a [`CorrelationKey`] and parks the
//! caller on the matching [`AsyncHandle`]. Whoever reads responses off the
//! transport calls [`PendingCalls::complete`] with the key found in the
//! response, which wakes exactly that caller.
//!
//! # Example
//!
//! ```rust
//! use rtremote_core_interface::PendingCalls;
//! use serde_json::json;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pending = PendingCalls::new(Duration::from_secs(5));
//!
//! let handle = pending.register();
//! let key = handle.key();
//!
//! // ... send the request carrying `key`, then on the reader side:
//! pending.complete(key, Ok(json!("pong")));
//!
//! assert_eq!(handle.wait().await?, json!("pong"));
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::session::InvocationError;

type Outcome = Result<Value, InvocationError>;

/// Pairs an outgoing request with its response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationKey(u64);

impl CorrelationKey {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for CorrelationKey {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry of requests that are still waiting for a response
pub struct PendingCalls {
    next_key: AtomicU64,
    waiters: Mutex<HashMap<CorrelationKey, oneshot::Sender<Outcome>>>,
    default_timeout: Duration,
}

impl PendingCalls {
    /// Create an empty registry
    ///
    /// `default_timeout` applies to [`AsyncHandle::wait`] and to
    /// [`AsyncHandle::wait_for`] with a zero duration.
    pub fn new(default_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            next_key: AtomicU64::new(1),
            waiters: Mutex::new(HashMap::new()),
            default_timeout,
        })
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Allocate a fresh key and a slot for its response
    pub fn register(self: &Arc<Self>) -> AsyncHandle {
        let key = CorrelationKey(self.next_key.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();

        self.lock().insert(key, tx);
        debug!("Registered pending call {}", key);

        AsyncHandle {
            key,
            rx,
            registry: Arc::clone(self),
        }
    }

    /// Deliver the outcome for `key`
    ///
    /// Returns `false` if the key is unknown, already completed, or its
    /// handle has gone away.
    pub fn complete(&self, key: CorrelationKey, outcome: Outcome) -> bool {
        let Some(tx) = self.lock().remove(&key) else {
            debug!("Dropping response for unknown correlation key {}", key);
            return false;
        };

        tx.send(outcome).is_ok()
    }

    /// Resolve every outstanding call with `SessionClosed`
    pub fn fail_all(&self) -> usize {
        let drained: Vec<_> = self.lock().drain().collect();
        let count = drained.len();

        for (_, tx) in drained {
            let _ = tx.send(Err(InvocationError::SessionClosed));
        }

        if count > 0 {
            warn!("Failed {} pending call(s): session closed", count);
        }

        count
    }

    /// Number of calls still waiting for a response
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn forget(&self, key: CorrelationKey) {
        self.lock().remove(&key);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CorrelationKey, oneshot::Sender<Outcome>>> {
        // The map stays consistent even if a holder panicked mid-operation.
        self.waiters.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for PendingCalls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCalls")
            .field("pending", &self.len())
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

/// The caller's side of one pending request
///
/// Resolves at most once. Dropping the handle, or letting it time out,
/// removes its key from the registry so a late response is discarded.
pub struct AsyncHandle {
    key: CorrelationKey,
    rx: oneshot::Receiver<Outcome>,
    registry: Arc<PendingCalls>,
}

impl AsyncHandle {
    pub fn key(&self) -> CorrelationKey {
        self.key
    }

    /// Wait using the registry's default timeout
    pub async fn wait(self) -> Outcome {
        let timeout = self.registry.default_timeout;
        self.wait_for(timeout).await
    }

    /// Wait up to `timeout`; `Duration::ZERO` means the registry default
    pub async fn wait_for(mut self, timeout: Duration) -> Outcome {
        let timeout = if timeout.is_zero() {
            self.registry.default_timeout
        } else {
            timeout
        };

        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(outcome)) => outcome,
            // Sender dropped without an answer: the registry was torn down.
            Ok(Err(_)) => Err(InvocationError::SessionClosed),
            Err(_) => {
                debug!("Pending call {} timed out after {:?}", self.key, timeout);
                Err(InvocationError::TimedOut(timeout))
            }
        }
    }
}

impl Drop for AsyncHandle {
    fn drop(&mut self) {
        self.registry.forget(self.key);
    }
}

impl fmt::Debug for AsyncHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncHandle").field("key", &self.key).finish()
    }
}
