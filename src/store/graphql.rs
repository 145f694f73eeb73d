use async_trait::async_trait;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use crate::store::{
    Credential, CredentialInsert, CredentialUpdate, Exporter, ExporterInsert, ExporterUpdate,
    ResourceStore, StoreError,
};

const ADMIN_SECRET_HEADER: &str = "x-hasura-admin-secret";

/// Hasura error code for unique/foreign key violations
const CONSTRAINT_VIOLATION: &str = "constraint-violation";

/// Minimal GraphQL-over-HTTP client for the Hasura endpoint
#[derive(Clone)]
pub struct GraphqlClient {
    client: reqwest::Client,
    url: Url,
    admin_secret: String,
}

#[derive(Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
    #[serde(default)]
    extensions: Option<ErrorExtensions>,
}

#[derive(Debug, Deserialize)]
struct ErrorExtensions {
    code: Option<String>,
}

impl GraphqlClient {
    pub fn new(url: Url, admin_secret: String, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            admin_secret,
        })
    }

    /// Run one query or mutation and decode its `data` into `T`
    pub async fn execute<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T, StoreError> {
        let response = self
            .client
            .post(self.url.clone())
            .header(ADMIN_SECRET_HEADER, self.admin_secret.as_str())
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::Backend(format!("GraphQL endpoint returned {}: {}", status, body)));
        }
        parse_response(&body)
    }
}

fn parse_response<T: DeserializeOwned>(body: &str) -> Result<T, StoreError> {
    let response: GraphqlResponse<T> = serde_json::from_str(body)?;
    if !response.errors.is_empty() {
        return Err(classify(response.errors));
    }
    response
        .data
        .ok_or_else(|| StoreError::Backend("GraphQL response contained no data".to_string()))
}

fn classify(errors: Vec<GraphqlError>) -> StoreError {
    let conflict = errors.iter().any(|e| {
        e.extensions.as_ref().and_then(|x| x.code.as_deref()) == Some(CONSTRAINT_VIOLATION)
    });
    let message = errors
        .into_iter()
        .map(|e| e.message)
        .collect::<Vec<_>>()
        .join("; ");
    if conflict {
        StoreError::Conflict(message)
    } else {
        StoreError::Backend(message)
    }
}

/// Insert input row with the tenant column filled in
#[derive(Serialize)]
struct TenantRow<'a, T> {
    tenant: &'a str,
    #[serde(flatten)]
    row: &'a T,
}

fn tenant_rows<'a, T>(tenant: &'a str, rows: &'a [T]) -> Vec<TenantRow<'a, T>> {
    rows.iter().map(|row| TenantRow { tenant, row }).collect()
}

/// Accept `json`/`jsonb` columns either as a JSON string or as a tree
fn json_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        other => other.to_string(),
    })
}

#[derive(Deserialize)]
struct ExporterRow {
    name: String,
    #[serde(rename = "type")]
    exporter_type: String,
    credential: Option<String>,
    #[serde(deserialize_with = "json_text")]
    config: String,
    created_at: String,
    updated_at: String,
}

impl From<ExporterRow> for Exporter {
    fn from(row: ExporterRow) -> Self {
        Self {
            name: row.name,
            exporter_type: row.exporter_type,
            credential: row.credential,
            config: row.config,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const LIST_CREDENTIALS: &str = r#"
query ListCredentials($tenant: String!) {
  credential(where: {tenant: {_eq: $tenant}}) { name type created_at updated_at }
}"#;

const GET_CREDENTIAL: &str = r#"
query GetCredential($tenant: String!, $name: String!) {
  credential_by_pk(tenant: $tenant, name: $name) { name type created_at updated_at }
}"#;

const INSERT_CREDENTIALS: &str = r#"
mutation CreateCredentials($credentials: [credential_insert_input!]!) {
  insert_credential(objects: $credentials) { affected_rows }
}"#;

const UPDATE_CREDENTIAL: &str = r#"
mutation UpdateCredential($tenant: String!, $name: String!, $value: json!, $updated_at: timestamptz!) {
  update_credential(
    where: {tenant: {_eq: $tenant}, name: {_eq: $name}},
    _set: {value: $value, updated_at: $updated_at}
  ) { affected_rows }
}"#;

const DELETE_CREDENTIAL: &str = r#"
mutation DeleteCredential($tenant: String!, $name: String!) {
  delete_credential_by_pk(tenant: $tenant, name: $name) { name type created_at updated_at }
}"#;

const LIST_EXPORTERS: &str = r#"
query ListExporters($tenant: String!) {
  exporter(where: {tenant: {_eq: $tenant}}) { name type credential config created_at updated_at }
}"#;

const GET_EXPORTER: &str = r#"
query GetExporter($tenant: String!, $name: String!) {
  exporter_by_pk(tenant: $tenant, name: $name) { name type credential config created_at updated_at }
}"#;

const INSERT_EXPORTERS: &str = r#"
mutation CreateExporters($exporters: [exporter_insert_input!]!) {
  insert_exporter(objects: $exporters) { affected_rows }
}"#;

const UPDATE_EXPORTER: &str = r#"
mutation UpdateExporter($tenant: String!, $name: String!, $credential: String, $config: json!, $updated_at: timestamptz!) {
  update_exporter(
    where: {tenant: {_eq: $tenant}, name: {_eq: $name}},
    _set: {credential: $credential, config: $config, updated_at: $updated_at}
  ) { affected_rows }
}"#;

const DELETE_EXPORTER: &str = r#"
mutation DeleteExporter($tenant: String!, $name: String!) {
  delete_exporter_by_pk(tenant: $tenant, name: $name) { name type credential config created_at updated_at }
}"#;

#[derive(Deserialize)]
struct CredentialList {
    credential: Vec<Credential>,
}

#[derive(Deserialize)]
struct CredentialByPk {
    credential_by_pk: Option<Credential>,
}

#[derive(Deserialize)]
struct CredentialDeleted {
    delete_credential_by_pk: Option<Credential>,
}

#[derive(Deserialize)]
struct ExporterList {
    exporter: Vec<ExporterRow>,
}

#[derive(Deserialize)]
struct ExporterByPk {
    exporter_by_pk: Option<ExporterRow>,
}

#[derive(Deserialize)]
struct ExporterDeleted {
    delete_exporter_by_pk: Option<ExporterRow>,
}

/// Credential and exporter tables accessed through Hasura
#[derive(Clone)]
pub struct GraphqlStore {
    client: GraphqlClient,
}

impl GraphqlStore {
    pub fn new(client: GraphqlClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceStore<Credential> for GraphqlStore {
    async fn list(&self, tenant: &str) -> Result<Vec<Credential>, StoreError> {
        let data: CredentialList = self
            .client
            .execute(LIST_CREDENTIALS, json!({ "tenant": tenant }))
            .await?;
        Ok(data.credential)
    }

    async fn get(&self, tenant: &str, name: &str) -> Result<Option<Credential>, StoreError> {
        let data: CredentialByPk = self
            .client
            .execute(GET_CREDENTIAL, json!({ "tenant": tenant, "name": name }))
            .await?;
        Ok(data.credential_by_pk)
    }

    async fn insert(&self, tenant: &str, inserts: &[CredentialInsert]) -> Result<(), StoreError> {
        let variables = json!({ "credentials": tenant_rows(tenant, inserts) });
        self.client.execute::<IgnoredAny>(INSERT_CREDENTIALS, variables).await?;
        Ok(())
    }

    async fn update(&self, tenant: &str, update: &CredentialUpdate) -> Result<(), StoreError> {
        let variables = json!({
            "tenant": tenant,
            "name": update.name,
            "value": update.value,
            "updated_at": update.updated_at,
        });
        self.client.execute::<IgnoredAny>(UPDATE_CREDENTIAL, variables).await?;
        Ok(())
    }

    async fn delete(&self, tenant: &str, name: &str) -> Result<Option<Credential>, StoreError> {
        let data: CredentialDeleted = self
            .client
            .execute(DELETE_CREDENTIAL, json!({ "tenant": tenant, "name": name }))
            .await?;
        Ok(data.delete_credential_by_pk)
    }
}

#[async_trait]
impl ResourceStore<Exporter> for GraphqlStore {
    async fn list(&self, tenant: &str) -> Result<Vec<Exporter>, StoreError> {
        let data: ExporterList = self
            .client
            .execute(LIST_EXPORTERS, json!({ "tenant": tenant }))
            .await?;
        Ok(data.exporter.into_iter().map(Exporter::from).collect())
    }

    async fn get(&self, tenant: &str, name: &str) -> Result<Option<Exporter>, StoreError> {
        let data: ExporterByPk = self
            .client
            .execute(GET_EXPORTER, json!({ "tenant": tenant, "name": name }))
            .await?;
        Ok(data.exporter_by_pk.map(Exporter::from))
    }

    async fn insert(&self, tenant: &str, inserts: &[ExporterInsert]) -> Result<(), StoreError> {
        let variables = json!({ "exporters": tenant_rows(tenant, inserts) });
        self.client.execute::<IgnoredAny>(INSERT_EXPORTERS, variables).await?;
        Ok(())
    }

    async fn update(&self, tenant: &str, update: &ExporterUpdate) -> Result<(), StoreError> {
        let variables = json!({
            "tenant": tenant,
            "name": update.name,
            "credential": update.credential,
            "config": update.config,
            "updated_at": update.updated_at,
        });
        self.client.execute::<IgnoredAny>(UPDATE_EXPORTER, variables).await?;
        Ok(())
    }

    async fn delete(&self, tenant: &str, name: &str) -> Result<Option<Exporter>, StoreError> {
        let data: ExporterDeleted = self
            .client
            .execute(DELETE_EXPORTER, json!({ "tenant": tenant, "name": name }))
            .await?;
        Ok(data.delete_exporter_by_pk.map(Exporter::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;

    #[test]
    fn null_by_pk_result_is_not_an_error() {
        let data: CredentialByPk = parse_response(r#"{"data":{"credential_by_pk":null}}"#).unwrap();
        assert!(data.credential_by_pk.is_none());
    }

    #[test]
    fn constraint_violation_is_a_conflict() {
        let body = r#"{"errors":[{"message":"Uniqueness violation. duplicate key value violates unique constraint \"credential_pkey\"","extensions":{"path":"$.selectionSet.insert_credential.args.objects","code":"constraint-violation"}}]}"#;
        let err = parse_response::<IgnoredAny>(body).unwrap_err();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("Uniqueness violation"));
    }

    #[test]
    fn other_errors_keep_backend_message() {
        let body = r#"{"errors":[{"message":"field \"credential\" not found in type: 'query_root'","extensions":{"code":"validation-failed"}},{"message":"second"}]}"#;
        match parse_response::<IgnoredAny>(body).unwrap_err() {
            StoreError::Backend(message) => {
                assert_eq!(message, "field \"credential\" not found in type: 'query_root'; second")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn exporter_config_accepts_string_or_object() {
        let data: ExporterList = parse_response(
            r#"{"data":{"exporter":[
                {"name":"a","type":"cloudwatch","credential":null,"config":"{\"x\":1}","created_at":"t","updated_at":"t"},
                {"name":"b","type":"cloudwatch","credential":"c","config":{"x":1},"created_at":"t","updated_at":"t"}
            ]}}"#,
        )
        .unwrap();
        let exporters: Vec<Exporter> = data.exporter.into_iter().map(Exporter::from).collect();
        assert_eq!(exporters[0].config, r#"{"x":1}"#);
        assert_eq!(exporters[1].config, r#"{"x":1}"#);
        assert_eq!(exporters[1].credential.as_deref(), Some("c"));
    }

    #[test]
    fn insert_rows_carry_the_tenant() {
        let now = Timestamp::now();
        let inserts = [CredentialInsert {
            name: "c1".into(),
            credential_type: "aws-key".into(),
            value: "{}".into(),
            created_at: now,
            updated_at: now,
        }];
        let rows = serde_json::to_value(tenant_rows("t1", &inserts)).unwrap();
        assert_eq!(rows[0]["tenant"], "t1");
        assert_eq!(rows[0]["type"], "aws-key");
        assert_eq!(rows[0]["created_at"], now.to_string());
    }
}
