//! Persistence for patient and triage records.
//!
//! Both services talk to the store through the traits below; the concrete
//! backend is picked from [`Config`] at startup.

pub mod memory;
pub mod spanner;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, StoreBackend};
use crate::models::{Record, TriageKey};

pub use memory::{MemoryPatientStore, MemoryTriageStore};
pub use spanner::SpannerClient;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A conditional write found the key in the wrong state
    /// (present on create, absent on update or delete).
    #[error("conditional check failed")]
    ConditionFailed,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Patient records keyed by `dni`.
///
/// Create, update and delete are each a single conditional operation on one key.
#[async_trait]
pub trait PatientStore: Send + Sync {
    /// Insert `record` unless `dni` already exists.
    async fn create(&self, dni: &str, record: &Record) -> StoreResult<()>;

    async fn get(&self, dni: &str) -> StoreResult<Option<Record>>;

    /// Merge `changes` into an existing record and return the result.
    async fn update(&self, dni: &str, changes: &Record) -> StoreResult<Record>;

    /// Remove an existing record.
    async fn delete(&self, dni: &str) -> StoreResult<()>;

    async fn health_check(&self) -> StoreResult<()>;
}

/// Triage records keyed by (`dni`, `fechaHora`).
#[async_trait]
pub trait TriageStore: Send + Sync {
    /// Insert or overwrite the record at `key`.
    async fn put(&self, key: &TriageKey, record: &Record) -> StoreResult<()>;

    /// Keys recorded for `dni`, ascending by `fechaHora`.
    async fn list_keys(&self, dni: &str) -> StoreResult<Vec<TriageKey>>;

    async fn get(&self, key: &TriageKey) -> StoreResult<Option<Record>>;

    async fn health_check(&self) -> StoreResult<()>;
}

pub async fn patient_store_from_config(config: &Config) -> anyhow::Result<Arc<dyn PatientStore>> {
    match config.store_backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryPatientStore::default())),
        StoreBackend::Spanner => Ok(Arc::new(SpannerClient::from_config(config).await?)),
    }
}

pub async fn triage_store_from_config(config: &Config) -> anyhow::Result<Arc<dyn TriageStore>> {
    match config.store_backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryTriageStore::default())),
        StoreBackend::Spanner => Ok(Arc::new(SpannerClient::from_config(config).await?)),
    }
}
