pub mod metrics;
pub mod response;
pub mod tenant;

pub use self::metrics::track_requests;
pub use response::YamlDocuments;
pub use tenant::{tenant_middleware, Tenant};
