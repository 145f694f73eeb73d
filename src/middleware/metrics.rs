use axum::{extract::Request, middleware::Next, response::Response};

use crate::metrics::{ERRORS_TOTAL, REQUESTS_TOTAL};
use crate::types::ResourceKind;

/// Count every routed API request, and the ones answered with an error,
/// per resource kind
pub async fn track_requests(request: Request, next: Next) -> Response {
    let kind = resource_kind(request.uri().path());
    let method = request.method().as_str().to_string();

    let response = next.run(request).await;
    let status = response.status();

    metrics::counter!(REQUESTS_TOTAL, "kind" => kind, "method" => method.clone()).increment(1);
    if status.is_client_error() || status.is_server_error() {
        metrics::counter!(
            ERRORS_TOTAL,
            "kind" => kind,
            "method" => method,
            "status" => status.as_u16().to_string()
        )
        .increment(1);
    }
    response
}

fn resource_kind(path: &str) -> &'static str {
    if path.starts_with("/api/v1/credentials") {
        ResourceKind::Credential.as_str()
    } else if path.starts_with("/api/v1/exporters") {
        ResourceKind::Exporter.as_str()
    } else {
        "unknown"
    }
}
