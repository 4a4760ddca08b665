pub mod export;
pub mod files;
pub mod ids;
pub mod profile;
pub mod thread;

pub use export::PatientExport;
pub use files::{is_image_mime, StoredFile};
pub use ids::{next_id, next_string_id};
pub use profile::{
    remove_item, upsert_item, CareItem, Doctor, Insurance, LastUpdate, Medication, Profile,
    ProfileDraft, ProfilePatch, Vitals,
};
pub use thread::{AttachmentRef, DebugInfo, Message, Sender, Thread};
