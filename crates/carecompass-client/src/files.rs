use carecompass_types::StoredFile;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::Deserialize;

use crate::client::ApiClient;
use crate::error::{ClientError, Result};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: StoredFile,
}

#[derive(Debug, Deserialize)]
struct DownloadResponse {
    url: Option<String>,
}

impl ApiClient {
    /// `POST /patients/{id}/files` as multipart form data under the field `file`
    pub async fn upload_file(
        &self,
        patient_id: &str,
        file_name: impl Into<String>,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredFile> {
        let file_name = file_name.into();
        tracing::info!(patient_id, %file_name, size = bytes.len(), "uploading file");

        let part = Part::bytes(bytes).file_name(file_name).mime_str(mime_type)?;
        let form = Form::new().part("file", part);

        let path = format!("/patients/{}/files", patient_id);
        let response: UploadResponse =
            Self::send_json(self.request(Method::POST, &path).await.multipart(form)).await?;
        Ok(response.file)
    }

    /// `GET /patients/{id}/files`
    pub async fn list_files(&self, patient_id: &str) -> Result<Vec<StoredFile>> {
        let path = format!("/patients/{}/files", patient_id);
        Self::send_json(self.request(Method::GET, &path).await).await
    }

    /// Short-lived download link for a stored file
    pub async fn file_download_url(&self, patient_id: &str, file_id: &str) -> Result<String> {
        let path = format!("/files/{}/{}/download", patient_id, file_id);
        let response: DownloadResponse =
            Self::send_json(self.request(Method::GET, &path).await).await?;
        response
            .url
            .ok_or_else(|| ClientError::UnexpectedResponse("download response has no url".to_string()))
    }

    /// `DELETE /patients/{id}/files/{file_id}`
    pub async fn delete_file(&self, patient_id: &str, file_id: &str) -> Result<()> {
        let path = format!("/patients/{}/files/{}", patient_id, file_id);
        tracing::info!(patient_id, file_id, "deleting file");
        Self::send_ack(self.request(Method::DELETE, &path).await).await
    }
}
