use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_GRAPHQL_ENDPOINT: &str = "http://localhost:8080/v1/graphql";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown STORE_BACKEND '{0}' (expected graphql, postgres or memory)")]
    UnknownBackend(String),

    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid GRAPHQL_ENDPOINT '{value}': {source}")]
    InvalidEndpoint {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub store: StoreConfig,
    pub api: ApiConfig,
    pub document: DocumentConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Graphql,
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "graphql" | "hasura" => Ok(StoreBackend::Graphql),
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(ConfigError::UnknownBackend(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub graphql_endpoint: Option<String>,
    #[serde(skip_serializing)]
    pub admin_secret: Option<String>,
    pub request_timeout_secs: u64,
    #[serde(skip_serializing)]
    pub database_url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Deepest sequence/map nesting accepted in submitted values
    pub max_depth: usize,
}

/// Resolved backend settings, checked for completeness
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreTarget {
    Graphql {
        endpoint: Url,
        admin_secret: String,
        timeout: Duration,
    },
    Postgres {
        database_url: String,
        max_connections: u32,
    },
    Memory,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(lookup)
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Store overrides
        if let Some(v) = lookup("STORE_BACKEND") {
            self.store.backend = v.parse()?;
        }
        if let Some(v) = lookup("GRAPHQL_ENDPOINT").filter(|v| !v.is_empty()) {
            self.store.graphql_endpoint = Some(v);
        }
        if let Some(v) = lookup("HASURA_GRAPHQL_ADMIN_SECRET").filter(|v| !v.is_empty()) {
            self.store.admin_secret = Some(v);
        }
        if let Some(v) = lookup("GRAPHQL_REQUEST_TIMEOUT_SECS") {
            self.store.request_timeout_secs = v.parse().unwrap_or(self.store.request_timeout_secs);
        }
        if let Some(v) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.store.database_url = Some(v);
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.store.max_connections = v.parse().unwrap_or(self.store.max_connections);
        }

        // API overrides
        if let Some(v) = lookup("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Document overrides
        if let Some(v) = lookup("DOCUMENT_MAX_DEPTH") {
            self.document.max_depth = v.parse().unwrap_or(self.document.max_depth);
        }

        Ok(self)
    }

    /// Check the selected backend has what it needs
    pub fn store_target(&self) -> Result<StoreTarget, ConfigError> {
        if self.document.max_depth == 0 {
            return Err(ConfigError::Invalid("DOCUMENT_MAX_DEPTH must be at least 1"));
        }

        match self.store.backend {
            StoreBackend::Graphql => {
                let raw = match &self.store.graphql_endpoint {
                    Some(endpoint) => endpoint.clone(),
                    None => {
                        tracing::warn!(
                            "Missing GRAPHQL_ENDPOINT, using default: {}",
                            DEFAULT_GRAPHQL_ENDPOINT
                        );
                        DEFAULT_GRAPHQL_ENDPOINT.to_string()
                    }
                };
                let endpoint = Url::parse(&raw).map_err(|source| ConfigError::InvalidEndpoint {
                    value: raw.clone(),
                    source,
                })?;
                let admin_secret = self
                    .store
                    .admin_secret
                    .clone()
                    .ok_or(ConfigError::Missing("HASURA_GRAPHQL_ADMIN_SECRET"))?;
                Ok(StoreTarget::Graphql {
                    endpoint,
                    admin_secret,
                    timeout: Duration::from_secs(self.store.request_timeout_secs),
                })
            }
            StoreBackend::Postgres => {
                let database_url = self
                    .store
                    .database_url
                    .clone()
                    .ok_or(ConfigError::Missing("DATABASE_URL"))?;
                if self.store.max_connections == 0 {
                    return Err(ConfigError::Invalid("DATABASE_MAX_CONNECTIONS must be at least 1"));
                }
                Ok(StoreTarget::Postgres {
                    database_url,
                    max_connections: self.store.max_connections,
                })
            }
            StoreBackend::Memory => Ok(StoreTarget::Memory),
        }
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            store: StoreConfig {
                backend: StoreBackend::Graphql,
                graphql_endpoint: None,
                admin_secret: None,
                request_timeout_secs: 30,
                database_url: None,
                max_connections: 10,
            },
            api: ApiConfig {
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            document: DocumentConfig { max_depth: 64 },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            store: StoreConfig {
                backend: StoreBackend::Graphql,
                graphql_endpoint: None,
                admin_secret: None,
                request_timeout_secs: 10,
                database_url: None,
                max_connections: 20,
            },
            api: ApiConfig {
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            document: DocumentConfig { max_depth: 48 },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            store: StoreConfig {
                backend: StoreBackend::Graphql,
                graphql_endpoint: None,
                admin_secret: None,
                request_timeout_secs: 5,
                database_url: None,
                max_connections: 50,
            },
            api: ApiConfig {
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            document: DocumentConfig { max_depth: 32 },
        }
    }
}
