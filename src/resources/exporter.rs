use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use serde_yaml::Value as Yaml;

use crate::resources::document::normalize;
use crate::resources::{BatchContext, ResourceError, Submission};
use crate::store::{Exporter, ExporterInsert, ExporterUpdate};
use crate::types::ResourceKind;

/// Key under which an unparseable stored config is passed back verbatim
pub const RAW_CONFIG_KEY: &str = "json";

/// Exporter record as submitted in a write request
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterSubmission {
    pub name: String,
    #[serde(rename = "type", default)]
    pub exporter_type: String,
    #[serde(default)]
    pub credential: Option<String>,
    pub config: Yaml,
}

impl ExporterSubmission {
    fn require_name(&self) -> Result<(), ResourceError> {
        if self.name.is_empty() {
            return Err(ResourceError::shape(ResourceKind::Exporter, "", "is missing a name"));
        }
        Ok(())
    }

    // TODO: check that a referenced credential exists and suits the exporter
    // type (cloudwatch needs aws-key, stackdriver needs gcp-service-account).
    fn credential_reference(&mut self) -> Option<String> {
        self.credential.take().filter(|name| !name.is_empty())
    }

    /// Encode the config map as JSON text
    fn encode_config(&self, max_depth: usize) -> Result<String, ResourceError> {
        if !self.config.is_mapping() {
            return Err(ResourceError::shape(
                ResourceKind::Exporter,
                &self.name,
                "config is invalid (must be YAML map)",
            ));
        }
        let json = normalize(&self.config, max_depth).map_err(|err| {
            ResourceError::shape(
                ResourceKind::Exporter,
                &self.name,
                format!("config could not be encoded as JSON: {err}"),
            )
        })?;
        Ok(json.to_string())
    }
}

impl Submission for ExporterSubmission {
    const KIND: ResourceKind = ResourceKind::Exporter;

    type Insert = ExporterInsert;
    type Update = ExporterUpdate;

    fn name(&self) -> &str {
        &self.name
    }

    fn submitted_type(&self) -> &str {
        &self.exporter_type
    }

    fn into_insert(mut self, ctx: &BatchContext) -> Result<ExporterInsert, ResourceError> {
        self.require_name()?;
        let config = self.encode_config(ctx.max_depth)?;
        if self.exporter_type.is_empty() {
            return Err(ResourceError::shape(
                ResourceKind::Exporter,
                &self.name,
                "is missing a type",
            ));
        }
        let credential = self.credential_reference();
        Ok(ExporterInsert {
            name: self.name,
            exporter_type: self.exporter_type,
            credential,
            config,
            created_at: ctx.now,
            updated_at: ctx.now,
        })
    }

    fn into_update(mut self, _current_type: &str, ctx: &BatchContext) -> Result<ExporterUpdate, ResourceError> {
        self.require_name()?;
        let config = self.encode_config(ctx.max_depth)?;
        let credential = self.credential_reference();
        Ok(ExporterUpdate {
            name: self.name,
            credential,
            config,
            updated_at: ctx.now,
        })
    }
}

/// Public view of an exporter with its config expanded back into a tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExporterInfo {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub exporter_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    pub config: Map<String, Json>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub created_at: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub updated_at: String,
}

impl From<Exporter> for ExporterInfo {
    fn from(exporter: Exporter) -> Self {
        let config = expand_config(&exporter.name, &exporter.config);
        Self {
            name: exporter.name,
            exporter_type: exporter.exporter_type,
            credential: exporter.credential.filter(|c| !c.is_empty()),
            config,
            created_at: exporter.created_at,
            updated_at: exporter.updated_at,
        }
    }
}

/// Parse stored config JSON. Anything that is not a JSON object is handed
/// back as-is under [`RAW_CONFIG_KEY`].
pub fn expand_config(name: &str, stored: &str) -> Map<String, Json> {
    match serde_json::from_str::<Map<String, Json>>(stored) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to decode JSON config for exporter {} (err: {}): {}", name, err, stored);
            let mut raw = Map::new();
            raw.insert(RAW_CONFIG_KEY.to_string(), Json::String(stored.to_string()));
            raw
        }
    }
}
