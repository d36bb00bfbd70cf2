use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{PatientStore, StoreError, StoreResult, TriageStore};
use crate::models::{merge_patch, Record, TriageKey};

/// Process-local patient store; each write holds the lock for its whole check-and-set.
#[derive(Default)]
pub struct MemoryPatientStore {
    records: RwLock<HashMap<String, Record>>,
}

#[async_trait]
impl PatientStore for MemoryPatientStore {
    async fn create(&self, dni: &str, record: &Record) -> StoreResult<()> {
        let mut records = self.records.write();
        if records.contains_key(dni) {
            return Err(StoreError::ConditionFailed);
        }
        records.insert(dni.to_string(), record.clone());
        Ok(())
    }

    async fn get(&self, dni: &str) -> StoreResult<Option<Record>> {
        Ok(self.records.read().get(dni).cloned())
    }

    async fn update(&self, dni: &str, changes: &Record) -> StoreResult<Record> {
        let mut records = self.records.write();
        let stored = records.get_mut(dni).ok_or(StoreError::ConditionFailed)?;
        merge_patch(stored, changes);
        Ok(stored.clone())
    }

    async fn delete(&self, dni: &str) -> StoreResult<()> {
        self.records
            .write()
            .remove(dni)
            .map(|_| ())
            .ok_or(StoreError::ConditionFailed)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Process-local triage store ordered by (dni, fechaHora)
#[derive(Default)]
pub struct MemoryTriageStore {
    records: RwLock<BTreeMap<TriageKey, Record>>,
}

#[async_trait]
impl TriageStore for MemoryTriageStore {
    async fn put(&self, key: &TriageKey, record: &Record) -> StoreResult<()> {
        self.records.write().insert(key.clone(), record.clone());
        Ok(())
    }

    async fn list_keys(&self, dni: &str) -> StoreResult<Vec<TriageKey>> {
        let records = self.records.read();
        let start = TriageKey::new(dni, "");
        Ok(records
            .range(start..)
            .map(|(key, _)| key)
            .take_while(|key| key.dni == dni)
            .cloned()
            .collect())
    }

    async fn get(&self, key: &TriageKey) -> StoreResult<Option<Record>> {
        Ok(self.records.read().get(key).cloned())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
