use async_trait::async_trait;
use carecompass_types::{PatientExport, Profile, Thread};

use crate::error::Result;

/// Storage collaborator for profiles and their conversation threads
///
/// Callers apply changes to their local state first and save afterwards.
/// A failed save is returned, never swallowed.
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// All profiles visible to the current user
    async fn list_profiles(&self) -> Result<Vec<Profile>>;

    /// Create or replace a profile by id
    async fn save_profile(&self, profile: &Profile) -> Result<()>;

    /// Threads of a profile, newest first
    async fn list_threads(&self, patient_id: &str) -> Result<Vec<Thread>>;

    /// Create or replace a thread by id
    async fn save_thread(&self, patient_id: &str, thread: &Thread) -> Result<()>;

    async fn export_patient(&self, patient_id: &str) -> Result<PatientExport>;

    /// Overwrite the exported profile and upsert its threads
    async fn import_patient(&self, bundle: &PatientExport) -> Result<()>;
}
