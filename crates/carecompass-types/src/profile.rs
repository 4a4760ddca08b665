use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::next_string_id;

/// Latest vitals snapshot. Flattened into the profile on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Vitals {
    pub height: String,
    pub weight: String,
    pub blood_pressure: String,
    pub heart_rate: String,
    pub other_vitals: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Insurance {
    #[serde(rename = "insuranceProvider")]
    pub provider: String,
    #[serde(rename = "insuranceId")]
    pub member_id: String,
    #[serde(rename = "groupId")]
    pub group_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub specialty: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Medication {
    pub id: String,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastUpdate {
    #[serde(rename = "type")]
    pub kind: String,
    pub time: DateTime<Utc>,
}

impl LastUpdate {
    pub fn vitals() -> Self {
        Self {
            kind: "vitals".to_string(),
            time: Utc::now(),
        }
    }
}

/// A patient record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub dob: String,
    #[serde(flatten)]
    pub insurance: Insurance,
    #[serde(flatten)]
    pub vitals: Vitals,
    pub conditions: Vec<String>,
    pub age: String,
    /// Free-text medication summary, kept in sync with `medications_list`
    pub medications: String,
    pub doctors: Vec<Doctor>,
    pub medications_list: Vec<Medication>,
    pub last_update: Option<LastUpdate>,
    /// Owner, stamped by the backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Fields collected by initial setup or the "add patient" form
#[derive(Debug, Clone, Default)]
pub struct ProfileDraft {
    pub name: String,
    pub dob: String,
    pub insurance: Insurance,
    pub vitals: Vitals,
}

impl ProfileDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Partial update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub dob: Option<String>,
    pub insurance: Option<Insurance>,
    pub vitals: Option<Vitals>,
    pub conditions: Option<Vec<String>>,
    pub age: Option<String>,
    pub medications: Option<String>,
    pub doctors: Option<Vec<Doctor>>,
    pub medications_list: Option<Vec<Medication>>,
    pub last_update: Option<LastUpdate>,
}

impl Profile {
    pub fn from_draft(draft: ProfileDraft) -> Self {
        Self {
            id: next_string_id(),
            name: draft.name,
            dob: draft.dob,
            insurance: draft.insurance,
            vitals: draft.vitals,
            ..Default::default()
        }
    }

    /// Returns a new profile with the patch applied.
    ///
    /// Replacing the medication list also rewrites the free-text
    /// `medications` summary as the comma-joined names.
    pub fn apply(&self, patch: ProfilePatch) -> Profile {
        let mut next = self.clone();

        if let Some(name) = patch.name {
            next.name = name;
        }
        if let Some(dob) = patch.dob {
            next.dob = dob;
        }
        if let Some(insurance) = patch.insurance {
            next.insurance = insurance;
        }
        if let Some(vitals) = patch.vitals {
            next.vitals = vitals;
        }
        if let Some(conditions) = patch.conditions {
            next.conditions = conditions;
        }
        if let Some(age) = patch.age {
            next.age = age;
        }
        if let Some(medications) = patch.medications {
            next.medications = medications;
        }
        if let Some(doctors) = patch.doctors {
            next.doctors = doctors;
        }
        if let Some(list) = patch.medications_list {
            next.medications = list
                .iter()
                .map(|m| m.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            next.medications_list = list;
        }
        if let Some(last_update) = patch.last_update {
            next.last_update = Some(last_update);
        }

        next
    }
}

/// Entries of the care team and medication lists, keyed by string id
pub trait CareItem: Clone {
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
}

impl CareItem for Doctor {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl CareItem for Medication {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// Insert or replace an item by id. An item with an empty id gets a fresh one
/// and is appended.
pub fn upsert_item<T: CareItem>(list: &[T], mut item: T) -> Vec<T> {
    if item.id().is_empty() {
        item.set_id(next_string_id());
    }

    let mut next = list.to_vec();
    match next.iter_mut().find(|existing| existing.id() == item.id()) {
        Some(existing) => *existing = item,
        None => next.push(item),
    }
    next
}

pub fn remove_item<T: CareItem>(list: &[T], id: &str) -> Vec<T> {
    list.iter().filter(|item| item.id() != id).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metformin() -> Medication {
        Medication {
            id: "m1".to_string(),
            name: "Metformin".to_string(),
            dosage: "500mg".to_string(),
            frequency: "Twice daily".to_string(),
        }
    }

    #[test]
    fn test_profile_flattens_vitals_and_insurance() {
        let mut profile = Profile::from_draft(ProfileDraft::new("Sarah"));
        profile.vitals.blood_pressure = "120/80".to_string();
        profile.insurance.provider = "Acme Health".to_string();

        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["bloodPressure"], "120/80");
        assert_eq!(value["insuranceProvider"], "Acme Health");
        assert_eq!(value["medicationsList"], json!([]));
        assert!(value.get("vitals").is_none());
        assert!(value.get("userId").is_none());
    }

    #[test]
    fn test_sparse_profile_deserializes_with_defaults() {
        let profile: Profile = serde_json::from_value(json!({
            "id": "1",
            "name": "Sarah",
            "lastUpdate": null,
            "userId": "u-1"
        }))
        .unwrap();

        assert_eq!(profile.name, "Sarah");
        assert!(profile.doctors.is_empty());
        assert_eq!(profile.vitals, Vitals::default());
        assert_eq!(profile.user_id.as_deref(), Some("u-1"));
    }

    #[test]
    fn test_apply_leaves_unpatched_fields() {
        let mut profile = Profile::from_draft(ProfileDraft::new("Sarah"));
        profile.dob = "1980-01-01".to_string();

        let patched = profile.apply(ProfilePatch {
            age: Some("44".to_string()),
            ..Default::default()
        });

        assert_eq!(patched.age, "44");
        assert_eq!(patched.dob, "1980-01-01");
        assert_eq!(profile.age, "");
    }

    #[test]
    fn test_medication_list_syncs_summary() {
        let profile = Profile::from_draft(ProfileDraft::new("Sarah"));
        let mut lisinopril = metformin();
        lisinopril.id = "m2".to_string();
        lisinopril.name = "Lisinopril".to_string();

        let patched = profile.apply(ProfilePatch {
            medications_list: Some(vec![metformin(), lisinopril]),
            ..Default::default()
        });

        assert_eq!(patched.medications, "Metformin, Lisinopril");
    }

    #[test]
    fn test_upsert_assigns_id_and_appends() {
        let list = vec![metformin()];
        let added = upsert_item(
            &list,
            Medication {
                name: "Atorvastatin".to_string(),
                ..Default::default()
            },
        );

        assert_eq!(added.len(), 2);
        assert!(!added[1].id.is_empty());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut other = metformin();
        other.id = "m2".to_string();
        let list = vec![metformin(), other];

        let mut edited = metformin();
        edited.dosage = "1000mg".to_string();
        let next = upsert_item(&list, edited);

        assert_eq!(next.len(), 2);
        assert_eq!(next[0].dosage, "1000mg");
        assert_eq!(next[1].id, "m2");
    }

    #[test]
    fn test_remove_item_by_id() {
        let list = vec![metformin()];
        assert!(remove_item(&list, "m1").is_empty());
        assert_eq!(remove_item(&list, "missing").len(), 1);
    }
}
