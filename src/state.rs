use std::sync::Arc;

use crate::config::Config;
use crate::store::{self, PatientStore, TriageStore};
use crate::triage_lookup::{HttpTriageLookup, TriageLookup};

/// Shared state of the patient service
#[derive(Clone)]
pub struct PatientState {
    pub store: Arc<dyn PatientStore>,
    /// Absent when `TRIAJES_API_BASE` is not configured; deletion then fails.
    pub triage_lookup: Option<Arc<dyn TriageLookup>>,
}

impl PatientState {
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store = store::patient_store_from_config(config).await?;

        let triage_lookup = match &config.triajes_api_base {
            Some(base) => {
                let lookup = HttpTriageLookup::new(base.as_str(), config.triage_lookup_timeout)?;
                Some(Arc::new(lookup) as Arc<dyn TriageLookup>)
            }
            None => {
                tracing::warn!("TRIAJES_API_BASE is not set; patient deletion will be refused");
                None
            }
        };

        Ok(Self {
            store,
            triage_lookup,
        })
    }
}

/// Shared state of the triage service
#[derive(Clone)]
pub struct TriageState {
    pub store: Arc<dyn TriageStore>,
}

impl TriageState {
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            store: store::triage_store_from_config(config).await?,
        })
    }
}
