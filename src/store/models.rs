use serde::{Deserialize, Serialize};

use crate::resources::credential::CredentialSubmission;
use crate::resources::exporter::ExporterSubmission;
use crate::store::{Named, Resource};
use crate::types::{ResourceKind, Timestamp};

/// Stored credential as read back from the store. The secret value is
/// write-only and never part of this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub name: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialInsert {
    pub name: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    /// Normalized JSON payload
    pub value: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Name and type are frozen; only the value and timestamp change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialUpdate {
    pub name: String,
    pub value: String,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exporter {
    pub name: String,
    #[serde(rename = "type")]
    pub exporter_type: String,
    pub credential: Option<String>,
    /// JSON text as stored
    pub config: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExporterInsert {
    pub name: String,
    #[serde(rename = "type")]
    pub exporter_type: String,
    pub credential: Option<String>,
    pub config: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExporterUpdate {
    pub name: String,
    pub credential: Option<String>,
    pub config: String,
    pub updated_at: Timestamp,
}

impl Named for Credential {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for CredentialInsert {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for CredentialUpdate {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Exporter {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for ExporterInsert {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for ExporterUpdate {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Resource for Credential {
    const KIND: ResourceKind = ResourceKind::Credential;

    type Insert = CredentialInsert;
    type Update = CredentialUpdate;
    type Submission = CredentialSubmission;

    fn resource_type(&self) -> &str {
        &self.credential_type
    }
}

impl Resource for Exporter {
    const KIND: ResourceKind = ResourceKind::Exporter;

    type Insert = ExporterInsert;
    type Update = ExporterUpdate;
    type Submission = ExporterSubmission;

    fn resource_type(&self) -> &str {
        &self.exporter_type
    }
}
