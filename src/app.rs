use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::get,
    Router,
};
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, ConfigError, StoreTarget};
use crate::handlers::{self, credentials, exporters};
use crate::metrics::Metrics;
use crate::middleware::{tenant_middleware, track_requests};
use crate::resources::ResourceService;
use crate::store::{
    Credential, Exporter, GraphqlClient, GraphqlStore, MemoryStore, PgStore, ResourceStore,
    StoreError,
};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to initialize store: {0}")]
    Store(#[from] StoreError),
}

/// Shared handler state: one service per resource kind over the same store
#[derive(Clone)]
pub struct AppState {
    pub credentials: ResourceService<Credential>,
    pub exporters: ResourceService<Exporter>,
}

impl AppState {
    pub fn with_store<S>(store: Arc<S>, max_depth: usize) -> Self
    where
        S: ResourceStore<Credential> + ResourceStore<Exporter> + 'static,
    {
        Self {
            credentials: ResourceService::new(store.clone(), max_depth),
            exporters: ResourceService::new(store, max_depth),
        }
    }

    /// Build the configured store backend and wrap it in services
    pub async fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        let max_depth = config.document.max_depth;
        match config.store_target()? {
            StoreTarget::Graphql {
                endpoint,
                admin_secret,
                timeout,
            } => {
                tracing::info!("Using GraphQL store at {}", endpoint);
                let client = GraphqlClient::new(endpoint, admin_secret, timeout)?;
                Ok(Self::with_store(Arc::new(GraphqlStore::new(client)), max_depth))
            }
            StoreTarget::Postgres {
                database_url,
                max_connections,
            } => {
                tracing::info!("Using Postgres store");
                let store = PgStore::connect(&database_url, max_connections).await?;
                store.ensure_schema().await?;
                Ok(Self::with_store(Arc::new(store), max_depth))
            }
            StoreTarget::Memory => {
                tracing::warn!("Using in-memory store, data is lost on exit");
                Ok(Self::with_store(Arc::new(MemoryStore::new()), max_depth))
            }
        }
    }
}

pub fn app(state: AppState, metrics: Metrics, config: &AppConfig) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(api_routes())
        .with_state(state)
        .merge(metrics.routes())
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/credentials",
            get(credentials::list).post(credentials::write),
        )
        .route(
            "/api/v1/credentials/",
            get(credentials::list).post(credentials::write),
        )
        .route(
            "/api/v1/credentials/:name",
            get(credentials::get).delete(credentials::delete),
        )
        .route(
            "/api/v1/credentials/:name/",
            get(credentials::get).delete(credentials::delete),
        )
        .route(
            "/api/v1/exporters",
            get(exporters::list).post(exporters::write),
        )
        .route(
            "/api/v1/exporters/",
            get(exporters::list).post(exporters::write),
        )
        .route(
            "/api/v1/exporters/:name",
            get(exporters::get).delete(exporters::delete),
        )
        .route(
            "/api/v1/exporters/:name/",
            get(exporters::get).delete(exporters::delete),
        )
        // Only matched routes need a tenant; unknown paths stay 404
        .route_layer(middleware::from_fn(tenant_middleware))
        .route_layer(middleware::from_fn(track_requests))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    const TENANT: &str = "team-a";

    fn router() -> Router {
        let mut config = AppConfig::development();
        config.api.max_request_size_bytes = 4096;
        let state = AppState::with_store(Arc::new(MemoryStore::new()), config.document.max_depth);
        app(state, Metrics::detached(), &config)
    }

    fn request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("X-Scope-OrgID", TENANT)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, String) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    const AWS: &str = "name: prod\ntype: aws-key\nvalue:\n  AWS_ACCESS_KEY_ID: AKIA\n  AWS_SECRET_ACCESS_KEY: hunter2\n";

    #[tokio::test]
    async fn health_needs_no_tenant() {
        let router = router();
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, _) = send(&router, request).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_tenant_is_a_bad_request() {
        let router = router();
        let request = Request::builder()
            .uri("/api/v1/credentials")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "missing tenant ID in request to /api/v1/credentials\n");
    }

    #[tokio::test]
    async fn written_credentials_list_without_values() {
        let router = router();
        let (status, body) = send(&router, request("POST", "/api/v1/credentials", AWS)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert!(body.contains("inserted:\n- prod"), "{body}");

        let response = router
            .clone()
            .oneshot(request("GET", "/api/v1/credentials/", ""))
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/yaml"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("name: prod"), "{body}");
        assert!(body.contains("type: aws-key"), "{body}");
        assert!(!body.contains("hunter2"), "{body}");
        assert!(!body.contains("value"), "{body}");
    }

    #[tokio::test]
    async fn unknown_name_is_not_found() {
        let router = router();
        let (status, body) = send(&router, request("DELETE", "/api/v1/exporters/nope/", "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "exporter not found: team-a/nope\n");
    }

    #[tokio::test]
    async fn exporter_config_round_trips_as_a_tree() {
        let router = router();
        let body = "name: cw\ntype: cloudwatch\ncredential: prod\nconfig:\n  region: us-west-2\n  namespaces: [a, b]\n";
        let (status, _) = send(&router, request("POST", "/api/v1/exporters/", body)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&router, request("GET", "/api/v1/exporters/cw", "")).await;
        assert_eq!(status, StatusCode::OK);
        let doc: serde_yaml::Value = serde_yaml::from_str(&body).unwrap();
        assert_eq!(doc["credential"].as_str(), Some("prod"));
        assert_eq!(doc["config"]["region"].as_str(), Some("us-west-2"));
        assert_eq!(doc["config"]["namespaces"][1].as_str(), Some("b"));
    }

    #[tokio::test]
    async fn type_change_is_rejected_with_message() {
        let router = router();
        send(&router, request("POST", "/api/v1/credentials", AWS)).await;
        let change = "name: prod\ntype: gcp-service-account\nvalue: '{\"a\": 1}'\n";
        let (status, body) = send(&router, request("POST", "/api/v1/credentials", change)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            "credential 'prod' type cannot be updated (current=aws-key, updated=gcp-service-account)\n"
        );
    }

    #[tokio::test]
    async fn oversized_body_is_refused() {
        let router = router();
        let body = format!("name: big\ntype: cloudwatch\nconfig:\n  pad: {}\n", "x".repeat(8192));
        let (status, _) = send(&router, request("POST", "/api/v1/exporters", &body)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn metrics_need_no_tenant() {
        let router = router();
        let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
        assert!(content_type.to_str().unwrap().starts_with("text/plain"));
    }
}
