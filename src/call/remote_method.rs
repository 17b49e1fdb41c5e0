//! Remote method identity.

use std::fmt;

/// The (service, method) identity of a call.
///
/// Set once during header parsing, then used for routing and reporting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteMethod {
    service: String,
    method: String,
}

impl RemoteMethod {
    /// Create a new remote method identity.
    pub fn new(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
        }
    }

    /// The service name.
    #[inline]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// The method name.
    #[inline]
    pub fn method(&self) -> &str {
        &self.method
    }
}

impl fmt::Display for RemoteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.service, self.method)
    }
}
