use thiserror::Error;

use crate::store::StoreError;
use crate::types::ResourceKind;

/// Why a request against a credential or exporter failed
#[derive(Debug, Error)]
pub enum ResourceError {
    /// `problem` is "missing" or "invalid"
    #[error("{problem} tenant ID in request to {uri}")]
    Tenant { problem: &'static str, uri: String },

    #[error("Decoding {kind} input at index={index} failed: {message}")]
    Decode {
        kind: ResourceKind,
        index: usize,
        message: String,
    },

    #[error("{kind} '{name}' {detail}")]
    Shape {
        kind: ResourceKind,
        name: String,
        detail: String,
    },

    #[error("unsupported {kind} type: {found} (expected {expected})")]
    UnsupportedType {
        kind: ResourceKind,
        found: String,
        expected: &'static str,
    },

    #[error("{kind} '{name}' type cannot be updated (current={current}, updated={attempted})")]
    TypeChange {
        kind: ResourceKind,
        name: String,
        current: String,
        attempted: String,
    },

    #[error("Missing {kind} YAML data in request body")]
    EmptyBatch { kind: ResourceKind },

    #[error("{kind} not found: {tenant}/{name}")]
    NotFound {
        kind: ResourceKind,
        tenant: String,
        name: String,
    },

    /// `action` names the operation that failed, e.g. "Updating exporter foo"
    #[error("{action} failed: {source}")]
    Store {
        action: String,
        #[source]
        source: StoreError,
    },
}

impl ResourceError {
    pub fn shape(kind: ResourceKind, name: impl Into<String>, detail: impl Into<String>) -> Self {
        ResourceError::Shape {
            kind,
            name: name.into(),
            detail: detail.into(),
        }
    }

    pub fn store(action: impl Into<String>, source: StoreError) -> Self {
        ResourceError::Store {
            action: action.into(),
            source,
        }
    }

    /// True for errors caused by the request itself rather than the backend
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ResourceError::Store { .. })
    }
}
