// handlers/credentials.rs - /api/v1/credentials handlers

use axum::extract::{Extension, Path, State};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{Tenant, YamlDocuments};
use crate::resources::credential::CredentialInfo;
use crate::resources::WriteSummary;

/// GET /api/v1/credentials - every credential of the tenant, without values
pub async fn list(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
) -> Result<YamlDocuments<CredentialInfo>, ApiError> {
    let credentials = state.credentials.list(tenant.as_str()).await?;
    Ok(YamlDocuments(credentials.into_iter().map(CredentialInfo::from).collect()))
}

/// POST /api/v1/credentials - insert or update a YAML stream of credentials
pub async fn write(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    body: String,
) -> Result<YamlDocuments<WriteSummary>, ApiError> {
    let summary = state.credentials.write(tenant.as_str(), &body).await?;
    tracing::info!(
        "Wrote credentials for tenant {}: {} inserted, {} updated",
        tenant.as_str(),
        summary.inserted.len(),
        summary.updated.len()
    );
    Ok(YamlDocuments::one(summary))
}

/// GET /api/v1/credentials/:name
pub async fn get(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    Path(name): Path<String>,
) -> Result<YamlDocuments<CredentialInfo>, ApiError> {
    let credential = state.credentials.get(tenant.as_str(), &name).await?;
    Ok(YamlDocuments::one(credential.into()))
}

/// DELETE /api/v1/credentials/:name - returns the deleted credential
pub async fn delete(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    Path(name): Path<String>,
) -> Result<YamlDocuments<CredentialInfo>, ApiError> {
    let credential = state.credentials.delete(tenant.as_str(), &name).await?;
    tracing::info!("Deleted credential {}/{}", tenant.as_str(), name);
    Ok(YamlDocuments::one(credential.into()))
}
