// HTTP client for the CareCompass backend

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::abort::AbortSignal;
use crate::auth::{Anonymous, TokenProvider};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::streaming::{read_text_stream, StreamRead};
use crate::traits::{ChatReply, ChatRequest, ChatTransport};

/// Authenticated client (HTTP direct, no SDK)
///
/// Every request asks the [`TokenProvider`] for a fresh credential, so
/// rotated tokens are picked up without rebuilding the client.
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl ApiClient {
    /// Client that sends every request anonymously
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_token_provider(config, Arc::new(Anonymous))
    }

    pub fn with_token_provider(
        config: ClientConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.as_str());
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        let http_client = builder.build()?;

        let base_url = config.normalized_base_url().to_string();
        if base_url.is_empty() {
            return Err(ClientError::Config("base_url must not be empty".to_string()));
        }

        Ok(Self {
            http_client,
            base_url,
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request builder carrying the bearer credential when one is available
    pub(crate) async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http_client.request(method, self.url(path));
        match self.tokens.bearer_token().await {
            Some(token) => builder.bearer_auth(token),
            None => {
                tracing::debug!(path, "no credential available, sending anonymously");
                builder
            }
        }
    }

    /// Fail on any non-success status, keeping the response body for diagnostics
    pub(crate) async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = status.as_u16(), %body, "API request failed");
        Err(ClientError::Api {
            status: status.as_u16(),
            body,
        })
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
        let response = Self::check(builder.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    /// Send and discard the acknowledgement body
    pub(crate) async fn send_ack(builder: RequestBuilder) -> Result<()> {
        Self::check(builder.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for ApiClient {
    async fn stream_chat(
        &self,
        request: ChatRequest,
        abort: AbortSignal,
        on_update: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> ChatReply {
        if abort.is_aborted() {
            tracing::info!("chat request aborted before sending");
            return ChatReply::Aborted;
        }

        tracing::debug!(
            history = request.history.len(),
            has_image = request.image.is_some(),
            file_id = ?request.file_id,
            "sending chat request"
        );
        let builder = self.request(Method::POST, "/chat").await.json(&request);

        let sent = tokio::select! {
            biased;
            _ = abort.aborted() => {
                tracing::info!("chat request aborted while connecting");
                return ChatReply::Aborted;
            }
            sent = builder.send() => sent,
        };

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "chat request failed");
                return ChatReply::Fallback;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), %body, "chat API error");
            return ChatReply::Fallback;
        }

        match read_text_stream(response.bytes_stream(), &abort, on_update).await {
            Ok(StreamRead::Completed(text)) => {
                tracing::debug!(chars = text.len(), "chat stream completed");
                ChatReply::Completed(text)
            }
            Ok(StreamRead::Aborted(partial)) => {
                tracing::info!(chars = partial.len(), "chat stream aborted");
                ChatReply::Aborted
            }
            Err(e) => {
                tracing::error!(error = %e, "chat stream interrupted");
                ChatReply::Fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = ApiClient::new(ClientConfig::new("http://localhost:5000/api/")).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000/api");
        assert_eq!(client.url("/patients"), "http://localhost:5000/api/patients");
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let result = ApiClient::new(ClientConfig::new("/"));
        assert!(matches!(result, Err(ClientError::Config(_))));
    }
}
