// Tenant-scoped storage for credentials and exporters

pub mod graphql;
pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::resources::Submission;
use crate::types::ResourceKind;

pub use graphql::{GraphqlClient, GraphqlStore};
pub use memory::MemoryStore;
pub use models::{
    Credential, CredentialInsert, CredentialUpdate, Exporter, ExporterInsert, ExporterUpdate,
};
pub use postgres::PgStore;

/// Errors reported by a storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write (e.g. two requests
    /// racing to create the same name)
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    Backend(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Anything with a resource name
pub trait Named {
    fn name(&self) -> &str;
}

/// A stored resource kind and the write operations that produce it
pub trait Resource: Named + Send + Sync + 'static {
    const KIND: ResourceKind;

    type Insert: Named + Send + Sync;
    type Update: Named + Send + Sync;
    type Submission: Submission<Insert = Self::Insert, Update = Self::Update>;

    fn resource_type(&self) -> &str;
}

/// Store access for one resource kind. Every call is scoped to a tenant.
///
/// `get` and `delete` return `Ok(None)` for an absent name; `Err` is
/// reserved for genuine backend failures.
#[async_trait]
pub trait ResourceStore<R: Resource>: Send + Sync {
    async fn list(&self, tenant: &str) -> Result<Vec<R>, StoreError>;

    async fn get(&self, tenant: &str, name: &str) -> Result<Option<R>, StoreError>;

    /// Insert all records as one operation
    async fn insert(&self, tenant: &str, inserts: &[R::Insert]) -> Result<(), StoreError>;

    async fn update(&self, tenant: &str, update: &R::Update) -> Result<(), StoreError>;

    async fn delete(&self, tenant: &str, name: &str) -> Result<Option<R>, StoreError>;
}
