use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;

use contentstore_lib::record::now_millis;
use contentstore_lib::{collection, MutationError, Outcome, Record, ResourceName};
use serde_json::Value;
use tokio::sync::Mutex;

use super::metrics::metrics;
use super::store::{ResourceBackend, StoreError};

/// Resource-scoped JSON array persistence on top of a [`ResourceBackend`].
///
/// Reads never fail: missing, unreadable or malformed content is served as an
/// empty collection. Mutations re-read the whole collection, change it in
/// memory and write it back; mutations of the same resource are serialized,
/// different resources proceed independently.
pub struct ContentStore {
    backend: Arc<dyn ResourceBackend>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ContentStore {
    pub fn new(backend: Arc<dyn ResourceBackend>) -> Self {
        Self {
            backend,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend_kind(&self) -> &'static str {
        self.backend.kind()
    }

    pub async fn list_resources(&self) -> Result<Vec<String>, StoreError> {
        self.backend.list_resources().await
    }

    /// Load every record of a resource, or an empty list.
    pub async fn read(&self, resource: &ResourceName) -> Vec<Record> {
        let bytes = match self.backend.load(resource).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Vec::new(),
            Err(e) => {
                read_anomaly(resource, &e);
                return Vec::new();
            }
        };
        match serde_json::from_slice::<Vec<Record>>(&bytes) {
            Ok(records) => records,
            Err(e) => {
                read_anomaly(resource, &e);
                Vec::new()
            }
        }
    }

    /// Replace the whole collection, pretty-printed.
    pub async fn write(&self, resource: &ResourceName, records: &[Record]) -> Result<(), StoreError> {
        let content =
            serde_json::to_vec_pretty(records).map_err(|source| StoreError::Serialize {
                resource: resource.to_string(),
                source,
            })?;
        let start = Instant::now();
        self.backend.save(resource, &content).await?;
        metrics()
            .store_write_duration
            .with_label_values(&[self.backend.kind()])
            .observe(start.elapsed().as_secs_f64());
        Ok(())
    }

    /// Run one read-modify-write cycle under the resource's lock.
    ///
    /// Nothing is written when `f` fails.
    pub async fn mutate<T, F>(&self, resource: &ResourceName, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Vec<Record>) -> Result<T, MutationError>,
    {
        let lock = self.resource_lock(resource).await;
        let _guard = lock.lock().await;

        let mut records = self.read(resource).await;
        let result = f(&mut records)?;
        self.write(resource, &records).await?;
        Ok(result)
    }

    /// Append `fields` stamped with `createdAt`.
    pub async fn create(&self, resource: &ResourceName, fields: Record) -> Result<Outcome, StoreError> {
        let now = now_millis();
        let result = self
            .mutate(resource, |records| Ok(collection::create(records, fields, now)))
            .await;
        record_op(resource, "create", result)
    }

    /// Merge into the record with the same `id`, inserting it when absent.
    pub async fn update(&self, resource: &ResourceName, fields: Record) -> Result<Outcome, StoreError> {
        let now = now_millis();
        let result = self
            .mutate(resource, |records| collection::update(records, fields, now))
            .await;
        record_op(resource, "update", result)
    }

    /// Drop records whose `id` or `slug` equals `key`.
    pub async fn remove(&self, resource: &ResourceName, key: &Value) -> Result<Outcome, StoreError> {
        let result = self
            .mutate(resource, |records| Ok(collection::remove(records, key)))
            .await;
        record_op(resource, "remove", result)
    }

    /// Lock for one resource. Entries nobody holds are dropped on the way,
    /// so the table stays as small as the number of in-flight mutations.
    async fn resource_lock(&self, resource: &ResourceName) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(resource.to_string()).or_default().clone()
    }
}

fn read_anomaly(resource: &ResourceName, error: &dyn Display) {
    tracing::warn!(%resource, %error, "unreadable resource served as empty collection");
    metrics()
        .read_anomalies
        .with_label_values(&[resource.as_str()])
        .inc();
}

fn record_op(
    resource: &ResourceName,
    op: &str,
    result: Result<Outcome, StoreError>,
) -> Result<Outcome, StoreError> {
    let label = match &result {
        Ok(outcome) => {
            tracing::debug!(%resource, op, %outcome, "resource mutated");
            outcome.as_str()
        }
        Err(StoreError::Mutation(e)) => {
            tracing::debug!(%resource, op, error = %e, "mutation rejected");
            "rejected"
        }
        Err(e) => {
            tracing::error!(%resource, op, error = %e, "resource write failed");
            "error"
        }
    };
    metrics()
        .store_ops
        .with_label_values(&[resource.as_str(), op, label])
        .inc();
    result
}
