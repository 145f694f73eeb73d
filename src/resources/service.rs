use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::resources::{decode_batch, reconcile, BatchContext, Plan, ResourceError};
use crate::store::{Named, Resource, ResourceStore};
use crate::types::Timestamp;

/// Names touched by a successful write
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub inserted: Vec<String>,
    pub updated: Vec<String>,
}

/// Request-level operations for one resource kind over an injected store
pub struct ResourceService<R: Resource> {
    store: Arc<dyn ResourceStore<R>>,
    max_depth: usize,
}

impl<R: Resource> Clone for ResourceService<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            max_depth: self.max_depth,
        }
    }
}

impl<R: Resource> ResourceService<R> {
    pub fn new(store: Arc<dyn ResourceStore<R>>, max_depth: usize) -> Self {
        Self { store, max_depth }
    }

    pub async fn list(&self, tenant: &str) -> Result<Vec<R>, ResourceError> {
        let resources = self
            .store
            .list(tenant)
            .await
            .map_err(|e| ResourceError::store(format!("Listing {}s for tenant {}", R::KIND, tenant), e))?;
        tracing::debug!("Listing {} {}s for tenant {}", resources.len(), R::KIND, tenant);
        Ok(resources)
    }

    pub async fn get(&self, tenant: &str, name: &str) -> Result<R, ResourceError> {
        tracing::debug!("Getting {}: {}/{}", R::KIND, tenant, name);
        self.store
            .get(tenant, name)
            .await
            .map_err(|e| ResourceError::store(format!("Getting {} {}", R::KIND, name), e))?
            .ok_or_else(|| self.not_found(tenant, name))
    }

    pub async fn delete(&self, tenant: &str, name: &str) -> Result<R, ResourceError> {
        tracing::debug!("Deleting {}: {}/{}", R::KIND, tenant, name);
        self.store
            .delete(tenant, name)
            .await
            .map_err(|e| ResourceError::store(format!("Deleting {} {}", R::KIND, name), e))?
            .ok_or_else(|| self.not_found(tenant, name))
    }

    /// Apply a YAML stream of records for `tenant`.
    ///
    /// The tenant's current resources are fetched once and every record is
    /// validated before anything is written. Inserts then go to the store
    /// as one call, followed by updates one at a time in submission order.
    /// A store failure stops the batch without undoing earlier writes.
    pub async fn write(&self, tenant: &str, body: &str) -> Result<WriteSummary, ResourceError> {
        let existing: HashMap<String, String> = self
            .list(tenant)
            .await?
            .into_iter()
            .map(|r| (r.name().to_string(), r.resource_type().to_string()))
            .collect();

        let ctx = BatchContext {
            now: Timestamp::now(),
            max_depth: self.max_depth,
        };
        let plan = reconcile(&existing, decode_batch::<R::Submission>(body), &ctx)?;

        tracing::debug!(
            "Writing {}s: {} insert, {} update",
            R::KIND,
            plan.inserts.len(),
            plan.updates.len()
        );
        self.commit(tenant, plan).await
    }

    async fn commit(&self, tenant: &str, plan: Plan<R::Insert, R::Update>) -> Result<WriteSummary, ResourceError> {
        let mut summary = WriteSummary::default();

        if !plan.inserts.is_empty() {
            self.store.insert(tenant, &plan.inserts).await.map_err(|e| {
                tracing::warn!("Insert: {} {}s failed: {}", plan.inserts.len(), R::KIND, e);
                ResourceError::store(format!("Creating {} {}s", plan.inserts.len(), R::KIND), e)
            })?;
            summary.inserted = plan.inserts.iter().map(|i| i.name().to_string()).collect();
        }

        for update in &plan.updates {
            self.store.update(tenant, update).await.map_err(|e| {
                tracing::warn!("Update: {} {} failed: {}", R::KIND, update.name(), e);
                ResourceError::store(format!("Updating {} {}", R::KIND, update.name()), e)
            })?;
            summary.updated.push(update.name().to_string());
        }

        Ok(summary)
    }

    fn not_found(&self, tenant: &str, name: &str) -> ResourceError {
        tracing::debug!("{} {}/{} not found", R::KIND, tenant, name);
        ResourceError::NotFound {
            kind: R::KIND,
            tenant: tenant.to_string(),
            name: name.to_string(),
        }
    }
}
