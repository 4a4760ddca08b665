use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::profile::Profile;
use crate::thread::Thread;

pub const EXPORT_VERSION: u32 = 1;

/// Portable bundle of one patient and all of their threads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientExport {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub exported_at: String,
    pub patient: Profile,
    #[serde(default)]
    pub chats: Vec<Thread>,
}

fn default_version() -> u32 {
    EXPORT_VERSION
}

impl PatientExport {
    pub fn new(patient: Profile, chats: Vec<Thread>) -> Self {
        Self {
            version: EXPORT_VERSION,
            exported_at: Utc::now().to_rfc3339(),
            patient,
            chats,
        }
    }
}
