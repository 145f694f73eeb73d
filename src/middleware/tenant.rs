use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::resources::ResourceError;

pub static TENANT_HEADER: HeaderName = HeaderName::from_static("x-scope-orgid");

const MAX_TENANT_LENGTH: usize = 150;

/// Tenant identifier taken from `X-Scope-OrgID`, injected by middleware
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tenant(pub String);

impl Tenant {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Middleware that requires exactly one valid tenant header on the request
pub async fn tenant_middleware(mut request: Request, next: Next) -> Response {
    let uri = request.uri().to_string();
    match extract_tenant(request.headers(), &uri) {
        Ok(tenant) => {
            tracing::debug!("Tenant {} for {}", tenant.as_str(), uri);
            request.extensions_mut().insert(tenant);
            next.run(request).await
        }
        Err(err) => ApiError::from(err).into_response(),
    }
}

pub fn extract_tenant(headers: &HeaderMap, uri: &str) -> Result<Tenant, ResourceError> {
    let mut values = headers.get_all(&TENANT_HEADER).iter();
    let reject = |problem| ResourceError::Tenant {
        problem,
        uri: uri.to_string(),
    };

    let value = values.next().ok_or_else(|| reject("missing"))?;
    if values.next().is_some() {
        return Err(reject("invalid"));
    }

    let tenant = value
        .to_str()
        .map(str::trim)
        .map_err(|_| reject("invalid"))?;
    if !is_valid_tenant(tenant) {
        return Err(reject("invalid"));
    }
    Ok(Tenant(tenant.to_string()))
}

/// One non-empty ID; `|` joins several tenants and is refused
fn is_valid_tenant(tenant: &str) -> bool {
    if tenant.is_empty() || tenant.len() > MAX_TENANT_LENGTH || tenant == "." || tenant == ".." {
        return false;
    }
    tenant
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "!-_.*'()".contains(c))
}
