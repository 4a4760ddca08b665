use serde::{Deserialize, Serialize};

/// Metadata of an uploaded attachment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub size: u64,
    pub path: String,
    pub uploaded_at: String,
}

impl StoredFile {
    pub fn is_image(&self) -> bool {
        is_image_mime(&self.mime_type)
    }
}

pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_file_from_upload_response() {
        let file: StoredFile = serde_json::from_str(
            r#"{"id":"17","name":"labs.pdf","type":"application/pdf","size":0,"path":"patients/1/labs.pdf","uploadedAt":"12.5"}"#,
        )
        .unwrap();

        assert_eq!(file.mime_type, "application/pdf");
        assert!(!file.is_image());
    }

    #[test]
    fn test_image_mime_detection() {
        assert!(is_image_mime("image/png"));
        assert!(!is_image_mime("application/pdf"));
    }
}
