// Validation and insert/update reconciliation for submitted resources

pub mod credential;
pub mod document;
pub mod error;
pub mod exporter;
pub mod reconcile;
pub mod service;

use serde::de::DeserializeOwned;

use crate::types::{ResourceKind, Timestamp};

pub use error::ResourceError;
pub use reconcile::{decode_batch, reconcile, Plan};
pub use service::{ResourceService, WriteSummary};

/// Request-scoped values shared by every record in one write batch
#[derive(Debug, Clone, Copy)]
pub struct BatchContext {
    pub now: Timestamp,
    pub max_depth: usize,
}

/// One decoded record from a write request body
pub trait Submission: DeserializeOwned + Send {
    const KIND: ResourceKind;

    type Insert;
    type Update;

    fn name(&self) -> &str;

    /// Submitted type; empty when the record omitted it
    fn submitted_type(&self) -> &str;

    /// Validate and build an insert for a name not yet stored
    fn into_insert(self, ctx: &BatchContext) -> Result<Self::Insert, ResourceError>;

    /// Validate and build an update for a stored resource of `current_type`
    fn into_update(self, current_type: &str, ctx: &BatchContext) -> Result<Self::Update, ResourceError>;
}
