use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;

use crate::store::{
    Credential, CredentialInsert, CredentialUpdate, Exporter, ExporterInsert, ExporterUpdate,
    Named, ResourceStore, StoreError,
};

type Key = (String, String);

#[derive(Debug, Clone)]
struct CredentialRow {
    credential: Credential,
    value: String,
}

/// Process-local store for development and tests. Enforces the same
/// `(tenant, name)` uniqueness as the real tables.
#[derive(Default)]
pub struct MemoryStore {
    credentials: RwLock<BTreeMap<Key, CredentialRow>>,
    exporters: RwLock<BTreeMap<Key, Exporter>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored secret payload, for assertions in tests
    #[cfg(test)]
    pub async fn credential_value(&self, tenant: &str, name: &str) -> Option<String> {
        self.credentials
            .read()
            .await
            .get(&key(tenant, name))
            .map(|row| row.value.clone())
    }
}

fn key(tenant: &str, name: &str) -> Key {
    (tenant.to_string(), name.to_string())
}

fn in_tenant<'a, V>(rows: &'a BTreeMap<Key, V>, tenant: &'a str) -> impl Iterator<Item = &'a V> + 'a {
    rows.iter()
        .filter(move |((t, _), _)| t == tenant)
        .map(|(_, row)| row)
}

/// Reject a batch that collides with stored rows or with itself
fn check_unique<V, I: Named>(rows: &BTreeMap<Key, V>, tenant: &str, inserts: &[I]) -> Result<(), StoreError> {
    let mut seen = HashSet::new();
    for insert in inserts {
        if rows.contains_key(&key(tenant, insert.name())) || !seen.insert(insert.name()) {
            return Err(StoreError::Conflict(format!(
                "duplicate key for tenant {} and name {}",
                tenant,
                insert.name()
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl ResourceStore<Credential> for MemoryStore {
    async fn list(&self, tenant: &str) -> Result<Vec<Credential>, StoreError> {
        let rows = self.credentials.read().await;
        Ok(in_tenant(&*rows, tenant).map(|row| row.credential.clone()).collect())
    }

    async fn get(&self, tenant: &str, name: &str) -> Result<Option<Credential>, StoreError> {
        let rows = self.credentials.read().await;
        Ok(rows.get(&key(tenant, name)).map(|row| row.credential.clone()))
    }

    async fn insert(&self, tenant: &str, inserts: &[CredentialInsert]) -> Result<(), StoreError> {
        let mut rows = self.credentials.write().await;
        check_unique(&*rows, tenant, inserts)?;
        for insert in inserts {
            rows.insert(
                key(tenant, &insert.name),
                CredentialRow {
                    credential: Credential {
                        name: insert.name.clone(),
                        credential_type: insert.credential_type.clone(),
                        created_at: insert.created_at.to_string(),
                        updated_at: insert.updated_at.to_string(),
                    },
                    value: insert.value.clone(),
                },
            );
        }
        Ok(())
    }

    async fn update(&self, tenant: &str, update: &CredentialUpdate) -> Result<(), StoreError> {
        let mut rows = self.credentials.write().await;
        // No matching row updates nothing, as with a filtered SQL UPDATE
        if let Some(row) = rows.get_mut(&key(tenant, &update.name)) {
            row.value = update.value.clone();
            row.credential.updated_at = update.updated_at.to_string();
        }
        Ok(())
    }

    async fn delete(&self, tenant: &str, name: &str) -> Result<Option<Credential>, StoreError> {
        let mut rows = self.credentials.write().await;
        Ok(rows.remove(&key(tenant, name)).map(|row| row.credential))
    }
}

#[async_trait]
impl ResourceStore<Exporter> for MemoryStore {
    async fn list(&self, tenant: &str) -> Result<Vec<Exporter>, StoreError> {
        let rows = self.exporters.read().await;
        Ok(in_tenant(&*rows, tenant).cloned().collect())
    }

    async fn get(&self, tenant: &str, name: &str) -> Result<Option<Exporter>, StoreError> {
        let rows = self.exporters.read().await;
        Ok(rows.get(&key(tenant, name)).cloned())
    }

    async fn insert(&self, tenant: &str, inserts: &[ExporterInsert]) -> Result<(), StoreError> {
        let mut rows = self.exporters.write().await;
        check_unique(&*rows, tenant, inserts)?;
        for insert in inserts {
            rows.insert(
                key(tenant, &insert.name),
                Exporter {
                    name: insert.name.clone(),
                    exporter_type: insert.exporter_type.clone(),
                    credential: insert.credential.clone(),
                    config: insert.config.clone(),
                    created_at: insert.created_at.to_string(),
                    updated_at: insert.updated_at.to_string(),
                },
            );
        }
        Ok(())
    }

    async fn update(&self, tenant: &str, update: &ExporterUpdate) -> Result<(), StoreError> {
        let mut rows = self.exporters.write().await;
        if let Some(row) = rows.get_mut(&key(tenant, &update.name)) {
            row.credential = update.credential.clone();
            row.config = update.config.clone();
            row.updated_at = update.updated_at.to_string();
        }
        Ok(())
    }

    async fn delete(&self, tenant: &str, name: &str) -> Result<Option<Exporter>, StoreError> {
        let mut rows = self.exporters.write().await;
        Ok(rows.remove(&key(tenant, name)))
    }
}
