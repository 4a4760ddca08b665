use async_trait::async_trait;
use carecompass_persist::{PersistenceClient, Result as PersistResult};
use carecompass_types::{PatientExport, Profile, Thread};
use reqwest::Method;

use crate::client::ApiClient;
use crate::error::Result;

impl ApiClient {
    /// `GET /patients`
    pub async fn list_patients(&self) -> Result<Vec<Profile>> {
        let patients: Vec<Profile> =
            Self::send_json(self.request(Method::GET, "/patients").await).await?;
        tracing::debug!(count = patients.len(), "fetched patients");
        Ok(patients)
    }

    /// `POST /patients`, create or replace by id
    pub async fn save_patient(&self, profile: &Profile) -> Result<()> {
        tracing::debug!(patient_id = %profile.id, "saving patient");
        Self::send_ack(self.request(Method::POST, "/patients").await.json(profile)).await
    }

    /// `GET /patients/{id}/chats`, newest first
    pub async fn list_patient_chats(&self, patient_id: &str) -> Result<Vec<Thread>> {
        let path = format!("/patients/{}/chats", patient_id);
        let threads: Vec<Thread> = Self::send_json(self.request(Method::GET, &path).await).await?;
        tracing::debug!(patient_id, count = threads.len(), "fetched chats");
        Ok(threads)
    }

    /// `POST /patients/{id}/chats`, create or replace by thread id
    pub async fn save_patient_chat(&self, patient_id: &str, thread: &Thread) -> Result<()> {
        let path = format!("/patients/{}/chats", patient_id);
        tracing::debug!(
            patient_id,
            thread_id = %thread.id,
            messages = thread.messages.len(),
            "saving chat"
        );
        Self::send_ack(self.request(Method::POST, &path).await.json(thread)).await
    }

    /// `GET /patients/{id}/export`
    pub async fn export_patient(&self, patient_id: &str) -> Result<PatientExport> {
        let path = format!("/patients/{}/export", patient_id);
        Self::send_json(self.request(Method::GET, &path).await).await
    }

    /// `POST /patients/import`
    pub async fn import_patient(&self, bundle: &PatientExport) -> Result<()> {
        tracing::info!(
            patient_id = %bundle.patient.id,
            chats = bundle.chats.len(),
            "importing patient"
        );
        Self::send_ack(self.request(Method::POST, "/patients/import").await.json(bundle)).await
    }
}

#[async_trait]
impl PersistenceClient for ApiClient {
    async fn list_profiles(&self) -> PersistResult<Vec<Profile>> {
        Ok(self.list_patients().await?)
    }

    async fn save_profile(&self, profile: &Profile) -> PersistResult<()> {
        Ok(self.save_patient(profile).await?)
    }

    async fn list_threads(&self, patient_id: &str) -> PersistResult<Vec<Thread>> {
        Ok(self.list_patient_chats(patient_id).await?)
    }

    async fn save_thread(&self, patient_id: &str, thread: &Thread) -> PersistResult<()> {
        Ok(self.save_patient_chat(patient_id, thread).await?)
    }

    async fn export_patient(&self, patient_id: &str) -> PersistResult<PatientExport> {
        Ok(ApiClient::export_patient(self, patient_id).await?)
    }

    async fn import_patient(&self, bundle: &PatientExport) -> PersistResult<()> {
        Ok(ApiClient::import_patient(self, bundle).await?)
    }
}
