use std::sync::Arc;

use carecompass_client::ChatTransport;
use carecompass_persist::PersistenceClient;
use carecompass_types::{
    remove_item, upsert_item, Doctor, LastUpdate, Medication, Profile, ProfileDraft,
    ProfilePatch, Vitals,
};

use crate::error::{ChatError, Result};
use crate::session::ChatSession;

/// All profiles of the signed-in user, plus a chat session for the current one
///
/// Profile edits are applied locally first and then persisted. A failed save
/// is returned to the caller with the local change already in place.
pub struct PatientWorkspace {
    transport: Arc<dyn ChatTransport>,
    persistence: Arc<dyn PersistenceClient>,
    profiles: Vec<Profile>,
    current: Option<String>,
    session: Option<ChatSession>,
}

impl PatientWorkspace {
    /// Fetch profiles and open the first one
    pub async fn load(
        transport: Arc<dyn ChatTransport>,
        persistence: Arc<dyn PersistenceClient>,
    ) -> Result<Self> {
        let profiles = persistence.list_profiles().await?;
        tracing::info!(profiles = profiles.len(), "loaded profiles");

        let first = profiles.first().map(|p| p.id.clone());
        let mut workspace = Self {
            transport,
            persistence,
            profiles,
            current: None,
            session: None,
        };
        if let Some(id) = first {
            workspace.switch_profile(&id).await?;
        }
        Ok(workspace)
    }

    /// No profile exists yet, so one has to be created first
    pub fn needs_setup(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn active_profile(&self) -> Option<&Profile> {
        let current = self.current.as_deref()?;
        self.profiles.iter().find(|p| p.id == current)
    }

    pub fn session(&self) -> Option<&ChatSession> {
        self.session.as_ref()
    }

    /// Make `id` current and load its threads into a fresh session
    pub async fn switch_profile(&mut self, id: &str) -> Result<()> {
        if !self.profiles.iter().any(|p| p.id == id) {
            return Err(ChatError::ProfileNotFound(id.to_string()));
        }

        let session = ChatSession::load(
            Arc::clone(&self.transport),
            Arc::clone(&self.persistence),
            id,
        )
        .await?;
        self.session = Some(session);
        self.current = Some(id.to_string());
        tracing::info!(patient_id = id, "switched profile");
        Ok(())
    }

    pub async fn create_profile(&mut self, draft: ProfileDraft) -> Result<Profile> {
        let profile = Profile::from_draft(draft);

        self.profiles.push(profile.clone());
        self.current = Some(profile.id.clone());
        self.session = Some(ChatSession::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.persistence),
            profile.id.clone(),
            Vec::new(),
        ));

        tracing::info!(patient_id = %profile.id, "created profile");
        self.persistence.save_profile(&profile).await?;
        Ok(profile)
    }

    pub async fn update_active_profile(&mut self, patch: ProfilePatch) -> Result<Profile> {
        let current = self.current.clone().ok_or(ChatError::NoActiveProfile)?;
        let slot = self
            .profiles
            .iter_mut()
            .find(|p| p.id == current)
            .ok_or(ChatError::ProfileNotFound(current))?;

        let updated = slot.apply(patch);
        *slot = updated.clone();

        self.persistence.save_profile(&updated).await?;
        Ok(updated)
    }

    /// Replace the vitals snapshot and stamp the update time
    pub async fn record_vitals(&mut self, vitals: Vitals) -> Result<Profile> {
        self.update_active_profile(ProfilePatch {
            vitals: Some(vitals),
            last_update: Some(LastUpdate::vitals()),
            ..Default::default()
        })
        .await
    }

    pub async fn save_doctor(&mut self, doctor: Doctor) -> Result<Profile> {
        let doctors = upsert_item(&self.require_active()?.doctors, doctor);
        self.update_active_profile(ProfilePatch {
            doctors: Some(doctors),
            ..Default::default()
        })
        .await
    }

    pub async fn remove_doctor(&mut self, doctor_id: &str) -> Result<Profile> {
        let doctors = remove_item(&self.require_active()?.doctors, doctor_id);
        self.update_active_profile(ProfilePatch {
            doctors: Some(doctors),
            ..Default::default()
        })
        .await
    }

    pub async fn save_medication(&mut self, medication: Medication) -> Result<Profile> {
        let medications = upsert_item(&self.require_active()?.medications_list, medication);
        self.update_active_profile(ProfilePatch {
            medications_list: Some(medications),
            ..Default::default()
        })
        .await
    }

    pub async fn remove_medication(&mut self, medication_id: &str) -> Result<Profile> {
        let medications = remove_item(&self.require_active()?.medications_list, medication_id);
        self.update_active_profile(ProfilePatch {
            medications_list: Some(medications),
            ..Default::default()
        })
        .await
    }

    fn require_active(&self) -> Result<&Profile> {
        self.active_profile().ok_or(ChatError::NoActiveProfile)
    }
}
