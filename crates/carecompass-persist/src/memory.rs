use async_trait::async_trait;
use carecompass_types::{PatientExport, Profile, Thread};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{PersistError, Result};
use crate::trait_client::PersistenceClient;

#[derive(Debug, Clone)]
struct PatientRecord {
    profile: Profile,
    threads: HashMap<String, Thread>,
}

impl PatientRecord {
    fn new(profile: Profile) -> Self {
        Self {
            profile,
            threads: HashMap::new(),
        }
    }
}

#[derive(Debug, Default)]
struct Records {
    // Insertion order of profiles, so listings are stable
    order: Vec<String>,
    by_id: HashMap<String, PatientRecord>,
}

/// Process-local store, for offline use and tests
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    records: RwLock<Records>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_profiles(profiles: Vec<Profile>) -> Result<Self> {
        let store = Self::new();
        for profile in &profiles {
            store.save_profile(profile).await?;
        }
        Ok(store)
    }

    async fn upsert_profile(&self, profile: Profile) {
        let mut guard = self.records.write().await;
        let records = &mut *guard;
        if let Some(record) = records.by_id.get_mut(&profile.id) {
            record.profile = profile;
            return;
        }
        records.order.push(profile.id.clone());
        records.by_id.insert(profile.id.clone(), PatientRecord::new(profile));
    }
}

fn newest_first(mut threads: Vec<Thread>) -> Vec<Thread> {
    threads.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    threads
}

#[async_trait]
impl PersistenceClient for InMemoryPersistence {
    async fn list_profiles(&self) -> Result<Vec<Profile>> {
        let records = self.records.read().await;
        Ok(records
            .order
            .iter()
            .filter_map(|id| records.by_id.get(id))
            .map(|record| record.profile.clone())
            .collect())
    }

    async fn save_profile(&self, profile: &Profile) -> Result<()> {
        if profile.id.is_empty() {
            return Err(PersistError::InvalidRecord("Patient ID required".to_string()));
        }
        tracing::debug!(patient_id = %profile.id, "saving profile in memory");
        self.upsert_profile(profile.clone()).await;
        Ok(())
    }

    async fn list_threads(&self, patient_id: &str) -> Result<Vec<Thread>> {
        let records = self.records.read().await;
        let threads = records
            .by_id
            .get(patient_id)
            .map(|record| record.threads.values().cloned().collect())
            .unwrap_or_default();
        Ok(newest_first(threads))
    }

    async fn save_thread(&self, patient_id: &str, thread: &Thread) -> Result<()> {
        if thread.id.is_empty() {
            return Err(PersistError::InvalidRecord("Chat ID required".to_string()));
        }

        let mut records = self.records.write().await;
        let record = records
            .by_id
            .get_mut(patient_id)
            .ok_or_else(|| PersistError::PatientNotFound(patient_id.to_string()))?;

        tracing::debug!(
            patient_id,
            thread_id = %thread.id,
            messages = thread.messages.len(),
            "saving thread in memory"
        );
        record.threads.insert(thread.id.clone(), thread.clone());
        Ok(())
    }

    async fn export_patient(&self, patient_id: &str) -> Result<PatientExport> {
        let records = self.records.read().await;
        let record = records
            .by_id
            .get(patient_id)
            .ok_or_else(|| PersistError::PatientNotFound(patient_id.to_string()))?;

        let chats = newest_first(record.threads.values().cloned().collect());
        Ok(PatientExport::new(record.profile.clone(), chats))
    }

    async fn import_patient(&self, bundle: &PatientExport) -> Result<()> {
        if bundle.patient.id.is_empty() {
            return Err(PersistError::InvalidRecord("Invalid import data structure".to_string()));
        }

        self.upsert_profile(bundle.patient.clone()).await;

        let mut records = self.records.write().await;
        if let Some(record) = records.by_id.get_mut(&bundle.patient.id) {
            for thread in &bundle.chats {
                record.threads.insert(thread.id.clone(), thread.clone());
            }
        }
        tracing::info!(
            patient_id = %bundle.patient.id,
            chats = bundle.chats.len(),
            "imported patient into memory"
        );
        Ok(())
    }
}
