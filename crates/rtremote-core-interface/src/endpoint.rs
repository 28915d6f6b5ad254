//! Endpoint descriptors and remote object identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::transport::TransportError;

/// Address of a remote object host (e.g., `"ws://10.0.0.5:1234/"`)
///
/// The descriptor is opaque to the bootstrap layer. Whether it is acceptable
/// is decided by the [`TransportFactory`](crate::TransportFactory) it is
/// handed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Endpoint(String);

impl Endpoint {
    /// Create an endpoint from any string-like address
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The raw address
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URI scheme (the part before `://`), if there is one
    pub fn scheme(&self) -> Option<&str> {
        self.0
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .filter(|scheme| !scheme.is_empty())
    }

    /// Parse the address as a URL
    ///
    /// Transport factories use this to reject malformed addresses before any
    /// network activity.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::InvalidEndpoint` if the address is empty or
    /// not a valid URL.
    pub fn parse_url(&self) -> Result<Url, TransportError> {
        if self.0.trim().is_empty() {
            return Err(TransportError::InvalidEndpoint {
                endpoint: self.0.clone(),
                reason: "endpoint is empty".to_string(),
            });
        }

        Url::parse(&self.0).map_err(|e| TransportError::InvalidEndpoint {
            endpoint: self.0.clone(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Endpoint {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for Endpoint {
    fn from(address: String) -> Self {
        Self(address)
    }
}

impl From<&Endpoint> for Endpoint {
    fn from(endpoint: &Endpoint) -> Self {
        endpoint.clone()
    }
}

/// Identifier of an object in the remote host's namespace
///
/// Never validated locally: an unknown id only shows up as an error once a
/// call is forwarded through a proxy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ObjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&ObjectId> for ObjectId {
    fn from(id: &ObjectId) -> Self {
        id.clone()
    }
}

impl PartialEq<str> for ObjectId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ObjectId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
