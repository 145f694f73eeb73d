use serde::{Deserialize, Serialize};
use serde_yaml::Value as Yaml;
use std::str::FromStr;

use crate::resources::{BatchContext, ResourceError, Submission};
use crate::store::{Credential, CredentialInsert, CredentialUpdate};
use crate::types::ResourceKind;

const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";

/// Supported credential types. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialType {
    AwsKey,
    GcpServiceAccount,
}

impl CredentialType {
    pub const EXPECTED: &'static str = "aws-key or gcp-service-account";
}

impl FromStr for CredentialType {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aws-key" => Ok(CredentialType::AwsKey),
            "gcp-service-account" => Ok(CredentialType::GcpServiceAccount),
            other => Err(ResourceError::UnsupportedType {
                kind: ResourceKind::Credential,
                found: other.to_string(),
                expected: Self::EXPECTED,
            }),
        }
    }
}

#[derive(Serialize)]
struct AwsKeyValue<'a> {
    #[serde(rename = "AWS_ACCESS_KEY_ID")]
    access_key_id: &'a str,
    #[serde(rename = "AWS_SECRET_ACCESS_KEY")]
    secret_access_key: &'a str,
}

/// Check a credential value against the schema for `credential_type` and
/// return the JSON payload to store.
///
/// - `aws-key`: a YAML map with exactly the string fields
///   `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY`, re-encoded as a
///   two-field JSON object.
/// - `gcp-service-account`: a string holding a service-account key file,
///   which must be well-formed JSON and is returned unmodified.
pub fn validate_value(name: &str, credential_type: &str, value: &Yaml) -> Result<String, ResourceError> {
    match credential_type.parse::<CredentialType>()? {
        CredentialType::AwsKey => validate_aws_key(name, value),
        CredentialType::GcpServiceAccount => validate_gcp_service_account(name, value),
    }
}

fn validate_aws_key(name: &str, value: &Yaml) -> Result<String, ResourceError> {
    let invalid = |reason: &str| {
        ResourceError::shape(
            ResourceKind::Credential,
            name,
            format!(
                "value must contain YAML string fields: \
                 {AWS_ACCESS_KEY_ID} and {AWS_SECRET_ACCESS_KEY} ({reason})"
            ),
        )
    };

    let Yaml::Mapping(fields) = value else {
        return Err(invalid("expected a map"));
    };
    if fields.len() != 2 {
        return Err(invalid("wrong size"));
    }
    let (Some(key_id), Some(secret)) = (fields.get(AWS_ACCESS_KEY_ID), fields.get(AWS_SECRET_ACCESS_KEY)) else {
        return Err(invalid("missing fields"));
    };
    let (Some(key_id), Some(secret)) = (key_id.as_str(), secret.as_str()) else {
        return Err(invalid("non-string fields"));
    };

    serde_json::to_string(&AwsKeyValue {
        access_key_id: key_id,
        secret_access_key: secret,
    })
    .map_err(|_| invalid("failed to reserialize as JSON"))
}

fn validate_gcp_service_account(name: &str, value: &Yaml) -> Result<String, ResourceError> {
    let Yaml::String(payload) = value else {
        return Err(ResourceError::shape(
            ResourceKind::Credential,
            name,
            "value must be a JSON string",
        ));
    };
    if serde_json::from_str::<serde::de::IgnoredAny>(payload).is_err() {
        return Err(ResourceError::shape(
            ResourceKind::Credential,
            name,
            "value is not a valid JSON string",
        ));
    }
    Ok(payload.clone())
}

/// Credential record as submitted in a write request
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialSubmission {
    pub name: String,
    #[serde(rename = "type", default)]
    pub credential_type: String,
    /// Nested YAML or a payload string, depending on the type
    pub value: Yaml,
}

impl CredentialSubmission {
    fn require_name(&self) -> Result<(), ResourceError> {
        if self.name.is_empty() {
            return Err(ResourceError::shape(ResourceKind::Credential, "", "is missing a name"));
        }
        Ok(())
    }
}

impl Submission for CredentialSubmission {
    const KIND: ResourceKind = ResourceKind::Credential;

    type Insert = CredentialInsert;
    type Update = CredentialUpdate;

    fn name(&self) -> &str {
        &self.name
    }

    fn submitted_type(&self) -> &str {
        &self.credential_type
    }

    fn into_insert(self, ctx: &BatchContext) -> Result<CredentialInsert, ResourceError> {
        self.require_name()?;
        let value = validate_value(&self.name, &self.credential_type, &self.value)?;
        Ok(CredentialInsert {
            name: self.name,
            credential_type: self.credential_type,
            value,
            created_at: ctx.now,
            updated_at: ctx.now,
        })
    }

    fn into_update(self, current_type: &str, ctx: &BatchContext) -> Result<CredentialUpdate, ResourceError> {
        self.require_name()?;
        // An update may omit the type; the stored one decides the schema then.
        let schema = if self.credential_type.is_empty() {
            current_type
        } else {
            &self.credential_type
        };
        let value = validate_value(&self.name, schema, &self.value)?;
        Ok(CredentialUpdate {
            name: self.name,
            value,
            updated_at: ctx.now,
        })
    }
}

/// Public view of a credential. Carries no secret value, even if one were
/// ever to be returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialInfo {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub credential_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub created_at: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub updated_at: String,
}

impl From<Credential> for CredentialInfo {
    fn from(credential: Credential) -> Self {
        Self {
            name: credential.name,
            credential_type: credential.credential_type,
            created_at: credential.created_at,
            updated_at: credential.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;

    fn yaml(src: &str) -> Yaml {
        serde_yaml::from_str(src).unwrap()
    }

    fn is_shape(err: &ResourceError) -> bool {
        matches!(err, ResourceError::Shape { .. })
    }

    #[test]
    fn aws_key_is_reencoded_as_json() {
        let value = yaml("AWS_ACCESS_KEY_ID: A\nAWS_SECRET_ACCESS_KEY: B\n");
        let json = validate_value("c1", "aws-key", &value).unwrap();
        assert_eq!(json, r#"{"AWS_ACCESS_KEY_ID":"A","AWS_SECRET_ACCESS_KEY":"B"}"#);
    }

    #[test]
    fn aws_key_with_extra_field_is_rejected() {
        let value = yaml("AWS_ACCESS_KEY_ID: A\nAWS_SECRET_ACCESS_KEY: B\nAWS_REGION: C\n");
        let err = validate_value("c1", "aws-key", &value).unwrap_err();
        assert!(is_shape(&err));
        assert!(err.to_string().contains("wrong size"), "{err}");
        assert!(err.to_string().contains("'c1'"), "{err}");
    }

    #[test]
    fn aws_key_with_wrong_field_name_is_rejected() {
        let value = yaml("AWS_ACCESS_KEY_ID: A\nAWS_SECRET_KEY: B\n");
        let err = validate_value("c1", "aws-key", &value).unwrap_err();
        assert!(err.to_string().contains("missing fields"), "{err}");
    }

    #[test]
    fn aws_key_with_non_string_field_is_rejected() {
        let value = yaml("AWS_ACCESS_KEY_ID: 1234\nAWS_SECRET_ACCESS_KEY: B\n");
        let err = validate_value("c1", "aws-key", &value).unwrap_err();
        assert!(err.to_string().contains("non-string fields"), "{err}");
    }

    #[test]
    fn aws_key_as_string_is_rejected() {
        let value = yaml(r#""AWS_ACCESS_KEY_ID=A""#);
        let err = validate_value("c1", "aws-key", &value).unwrap_err();
        assert!(err.to_string().contains("expected a map"), "{err}");
    }

    #[test]
    fn gcp_payload_must_be_valid_json() {
        let err = validate_value("c2", "gcp-service-account", &Yaml::String("{not valid json".into())).unwrap_err();
        assert!(is_shape(&err));
    }

    #[test]
    fn gcp_payload_is_passed_through_unchanged() {
        let payload = "{\"a\":1}";
        let json = validate_value("c2", "gcp-service-account", &Yaml::String(payload.into())).unwrap();
        assert_eq!(json, payload);

        let spaced = "{ \"type\": \"service_account\",\n  \"project_id\": \"p\" }";
        let json = validate_value("c2", "gcp-service-account", &Yaml::String(spaced.into())).unwrap();
        assert_eq!(json, spaced);
    }

    #[test]
    fn gcp_payload_as_map_is_rejected() {
        let err = validate_value("c2", "gcp-service-account", &yaml("a: 1")).unwrap_err();
        assert!(err.to_string().contains("must be a JSON string"), "{err}");
    }

    #[test]
    fn unknown_type_is_unsupported() {
        let err = validate_value("c3", "azure-key", &Yaml::Null).unwrap_err();
        match err {
            ResourceError::UnsupportedType { found, .. } => assert_eq!(found, "azure-key"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn update_without_type_validates_against_stored_type() {
        let submission: CredentialSubmission = serde_yaml::from_str(
            "name: c1\nvalue:\n  AWS_ACCESS_KEY_ID: A\n  AWS_SECRET_ACCESS_KEY: B\n",
        )
        .unwrap();
        let ctx = BatchContext { now: Timestamp::now(), max_depth: 8 };
        let update = submission.into_update("aws-key", &ctx).unwrap();
        assert_eq!(update.name, "c1");
        assert_eq!(update.updated_at, ctx.now);
    }

    #[test]
    fn unknown_field_fails_to_decode() {
        let result = serde_yaml::from_str::<CredentialSubmission>("name: c1\ntype: aws-key\nvalue: x\nextra: 1\n");
        assert!(result.is_err());
    }

    #[test]
    fn info_never_carries_a_value() {
        let info = CredentialInfo::from(Credential {
            name: "c1".into(),
            credential_type: "aws-key".into(),
            created_at: "2021-01-01T00:00:00Z".into(),
            updated_at: "2021-01-01T00:00:00Z".into(),
        });
        let rendered = serde_yaml::to_string(&info).unwrap();
        assert!(!rendered.contains("value"));
        assert!(rendered.contains("type: aws-key"));
    }
}
