// handlers/exporters.rs - /api/v1/exporters handlers

use axum::extract::{Extension, Path, State};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{Tenant, YamlDocuments};
use crate::resources::exporter::ExporterInfo;
use crate::resources::WriteSummary;

/// GET /api/v1/exporters - every exporter of the tenant, config expanded
pub async fn list(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
) -> Result<YamlDocuments<ExporterInfo>, ApiError> {
    let exporters = state.exporters.list(tenant.as_str()).await?;
    Ok(YamlDocuments(exporters.into_iter().map(ExporterInfo::from).collect()))
}

/// POST /api/v1/exporters - insert or update a YAML stream of exporters
pub async fn write(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    body: String,
) -> Result<YamlDocuments<WriteSummary>, ApiError> {
    let summary = state.exporters.write(tenant.as_str(), &body).await?;
    tracing::info!(
        "Wrote exporters for tenant {}: {} inserted, {} updated",
        tenant.as_str(),
        summary.inserted.len(),
        summary.updated.len()
    );
    Ok(YamlDocuments::one(summary))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    Path(name): Path<String>,
) -> Result<YamlDocuments<ExporterInfo>, ApiError> {
    let exporter = state.exporters.get(tenant.as_str(), &name).await?;
    Ok(YamlDocuments::one(exporter.into()))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    Path(name): Path<String>,
) -> Result<YamlDocuments<ExporterInfo>, ApiError> {
    let exporter = state.exporters.delete(tenant.as_str(), &name).await?;
    tracing::info!("Deleted exporter {}/{}", tenant.as_str(), name);
    Ok(YamlDocuments::one(exporter.into()))
}
