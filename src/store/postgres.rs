use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool, Postgres, QueryBuilder};
use tracing::info;

use crate::store::{
    Credential, CredentialInsert, CredentialUpdate, Exporter, ExporterInsert, ExporterUpdate,
    ResourceStore, StoreError,
};
use crate::types::Timestamp;

/// SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

const CREATE_CREDENTIAL_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS credential (
    tenant TEXT NOT NULL,
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    value TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (tenant, name)
)"#;

const CREATE_EXPORTER_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS exporter (
    tenant TEXT NOT NULL,
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    credential TEXT,
    config TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (tenant, name)
)"#;

#[derive(FromRow)]
struct CredentialRow {
    name: String,
    #[sqlx(rename = "type")]
    credential_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CredentialRow> for Credential {
    fn from(row: CredentialRow) -> Self {
        Self {
            name: row.name,
            credential_type: row.credential_type,
            created_at: Timestamp::from_datetime(row.created_at).to_string(),
            updated_at: Timestamp::from_datetime(row.updated_at).to_string(),
        }
    }
}

#[derive(FromRow)]
struct ExporterRow {
    name: String,
    #[sqlx(rename = "type")]
    exporter_type: String,
    credential: Option<String>,
    config: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ExporterRow> for Exporter {
    fn from(row: ExporterRow) -> Self {
        Self {
            name: row.name,
            exporter_type: row.exporter_type,
            credential: row.credential,
            config: row.config,
            created_at: Timestamp::from_datetime(row.created_at).to_string(),
            updated_at: Timestamp::from_datetime(row.updated_at).to_string(),
        }
    }
}

/// Map unique violations to `Conflict`, everything else passes through
fn store_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::Conflict(db.message().to_string());
        }
    }
    StoreError::Sqlx(err)
}

/// Credential and exporter tables in a directly connected Postgres database
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!("Created database pool (max_connections={})", max_connections);
        Ok(Self { pool })
    }

    /// Create the tables if they do not exist yet
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_CREDENTIAL_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_EXPORTER_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ResourceStore<Credential> for PgStore {
    async fn list(&self, tenant: &str) -> Result<Vec<Credential>, StoreError> {
        let rows: Vec<CredentialRow> = sqlx::query_as(
            "SELECT name, type, created_at, updated_at FROM credential WHERE tenant = $1 ORDER BY name",
        )
        .bind(tenant)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Credential::from).collect())
    }

    async fn get(&self, tenant: &str, name: &str) -> Result<Option<Credential>, StoreError> {
        let row: Option<CredentialRow> = sqlx::query_as(
            "SELECT name, type, created_at, updated_at FROM credential WHERE tenant = $1 AND name = $2",
        )
        .bind(tenant)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Credential::from))
    }

    async fn insert(&self, tenant: &str, inserts: &[CredentialInsert]) -> Result<(), StoreError> {
        if inserts.is_empty() {
            return Ok(());
        }
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO credential (tenant, name, type, value, created_at, updated_at) ",
        );
        builder.push_values(inserts, |mut row, insert| {
            row.push_bind(tenant.to_string())
                .push_bind(insert.name.clone())
                .push_bind(insert.credential_type.clone())
                .push_bind(insert.value.clone())
                .push_bind(insert.created_at.as_datetime())
                .push_bind(insert.updated_at.as_datetime());
        });
        builder.build().execute(&self.pool).await.map_err(store_error)?;
        Ok(())
    }

    async fn update(&self, tenant: &str, update: &CredentialUpdate) -> Result<(), StoreError> {
        sqlx::query("UPDATE credential SET value = $3, updated_at = $4 WHERE tenant = $1 AND name = $2")
            .bind(tenant)
            .bind(&update.name)
            .bind(&update.value)
            .bind(update.updated_at.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn delete(&self, tenant: &str, name: &str) -> Result<Option<Credential>, StoreError> {
        let row: Option<CredentialRow> = sqlx::query_as(
            "DELETE FROM credential WHERE tenant = $1 AND name = $2 RETURNING name, type, created_at, updated_at",
        )
        .bind(tenant)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Credential::from))
    }
}

#[async_trait]
impl ResourceStore<Exporter> for PgStore {
    async fn list(&self, tenant: &str) -> Result<Vec<Exporter>, StoreError> {
        let rows: Vec<ExporterRow> = sqlx::query_as(
            "SELECT name, type, credential, config, created_at, updated_at FROM exporter WHERE tenant = $1 ORDER BY name",
        )
        .bind(tenant)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Exporter::from).collect())
    }

    async fn get(&self, tenant: &str, name: &str) -> Result<Option<Exporter>, StoreError> {
        let row: Option<ExporterRow> = sqlx::query_as(
            "SELECT name, type, credential, config, created_at, updated_at FROM exporter WHERE tenant = $1 AND name = $2",
        )
        .bind(tenant)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Exporter::from))
    }

    async fn insert(&self, tenant: &str, inserts: &[ExporterInsert]) -> Result<(), StoreError> {
        if inserts.is_empty() {
            return Ok(());
        }
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO exporter (tenant, name, type, credential, config, created_at, updated_at) ",
        );
        builder.push_values(inserts, |mut row, insert| {
            row.push_bind(tenant.to_string())
                .push_bind(insert.name.clone())
                .push_bind(insert.exporter_type.clone())
                .push_bind(insert.credential.clone())
                .push_bind(insert.config.clone())
                .push_bind(insert.created_at.as_datetime())
                .push_bind(insert.updated_at.as_datetime());
        });
        builder.build().execute(&self.pool).await.map_err(store_error)?;
        Ok(())
    }

    async fn update(&self, tenant: &str, update: &ExporterUpdate) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE exporter SET credential = $3, config = $4, updated_at = $5 WHERE tenant = $1 AND name = $2",
        )
        .bind(tenant)
        .bind(&update.name)
        .bind(&update.credential)
        .bind(&update.config)
        .bind(update.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn delete(&self, tenant: &str, name: &str) -> Result<Option<Exporter>, StoreError> {
        let row: Option<ExporterRow> = sqlx::query_as(
            "DELETE FROM exporter WHERE tenant = $1 AND name = $2 RETURNING name, type, credential, config, created_at, updated_at",
        )
        .bind(tenant)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Exporter::from))
    }
}
