//! Prometheus exposition for request and error counters

use axum::{extract::State, http::header, response::IntoResponse, routing::get, Router};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub const REQUESTS_TOTAL: &str = "tenant_config_requests_total";
pub const ERRORS_TOTAL: &str = "tenant_config_errors_total";

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Handle used to render the current counters
#[derive(Clone)]
pub struct Metrics {
    handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide recorder. Fails if one is already installed.
    pub fn install() -> Result<Self, BuildError> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        metrics::describe_counter!(REQUESTS_TOTAL, "API requests by resource kind and method");
        metrics::describe_counter!(ERRORS_TOTAL, "API requests answered with an error status");
        Ok(Self { handle })
    }

    /// A handle backed by a recorder that is never installed, so it always
    /// renders empty. Lets several routers coexist in one process.
    pub fn detached() -> Self {
        Self {
            handle: PrometheusBuilder::new().build_recorder().handle(),
        }
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// `GET /metrics`, outside the tenant check
    pub fn routes(self) -> Router {
        Router::new()
            .route("/metrics", get(render))
            .with_state(self)
    }
}

async fn render(State(metrics): State<Metrics>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], metrics.render())
}
