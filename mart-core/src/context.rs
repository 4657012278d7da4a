//! Request-scoped identity types.

use std::fmt;

/// Opaque reference to the authenticated user that owns a listing.
///
/// The value is whatever the auth layer injects; campus-mart never
/// interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct OwnerId(pub String);

impl OwnerId {
    pub fn new<S: Into<String>>(owner: S) -> Self {
        Self(owner.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Context carried with every catalog operation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub owner: OwnerId,
    pub request_id: String,
}

impl RequestContext {
    /// Context for `owner` with a freshly generated request id.
    pub fn new<S: Into<String>>(owner: S) -> Self {
        Self {
            owner: OwnerId::new(owner),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_request_id<S: Into<String>>(mut self, request_id: S) -> Self {
        self.request_id = request_id.into();
        self
    }
}
