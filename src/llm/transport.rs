//! HTTP transport to the content-generation service.

use super::wire::{decode_one_shot, endpoint, ContentBody};
use crate::config::ServiceConfig;
use crate::engine::{ByteStream, ContentTransport, GenerationRequest, OneShotResult};
use crate::error::{DeliveryError, DeliveryResult};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

pub struct HttpTransport {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpTransport {
    /// Only connecting is bounded in time; a stalled stream stays open.
    pub fn new(config: &ServiceConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()?;

        // A trailing slash keeps the base path when joining endpoints.
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            api_key: config.api_key.clone(),
        })
    }

    pub fn url_for(&self, request: &GenerationRequest) -> DeliveryResult<Url> {
        self.base_url
            .join(endpoint(request.mode))
            .map_err(|e| DeliveryError::transport(format!("Invalid service URL: {e}")))
    }

    fn post(&self, request: &GenerationRequest) -> DeliveryResult<RequestBuilder> {
        let mut builder = self
            .client
            .post(self.url_for(request)?)
            .json(&ContentBody::from_request(request));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        Ok(builder)
    }

    async fn send(&self, request: &GenerationRequest) -> Result<Response, String> {
        let response = self
            .post(request)
            .map_err(|e| e.to_string())?
            .send()
            .await
            .map_err(describe_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(describe_status(status.as_u16(), &error_text));
        }
        Ok(response)
    }
}

fn describe_send_error(e: reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout - the content service took too long to respond".to_string()
    } else if e.is_connect() {
        "Connection error - unable to reach the content service".to_string()
    } else {
        format!("Network error: {e}")
    }
}

fn describe_status(status: u16, error_text: &str) -> String {
    match status {
        401 => "Authentication failed - check your API key".to_string(),
        403 => "Access forbidden - insufficient permissions".to_string(),
        429 => "Rate limit exceeded - too many requests".to_string(),
        500..=599 => format!("Server error ({status}): {error_text}"),
        _ => format!("HTTP error {status}: {error_text}"),
    }
}

#[async_trait]
impl ContentTransport for HttpTransport {
    #[instrument(skip_all, fields(mode = %request.mode))]
    async fn open_stream(&self, request: &GenerationRequest) -> DeliveryResult<ByteStream> {
        let response = self.send(request).await.map_err(|e| {
            warn!(error = %e, "Failed to open content stream");
            DeliveryError::Transport(e)
        })?;
        debug!(status = %response.status(), "Content stream opened");

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| DeliveryError::transport(format!("Stream read failed: {e}"))))
            .boxed())
    }

    #[instrument(skip_all, fields(mode = %request.mode))]
    async fn fetch_one_shot(&self, request: &GenerationRequest) -> DeliveryResult<OneShotResult> {
        let response = self.send(request).await.map_err(|e| {
            warn!(error = %e, "One-shot request failed");
            DeliveryError::Generation(e)
        })?;
        let body = response
            .text()
            .await
            .map_err(|e| DeliveryError::generation(format!("Failed to read response: {e}")))?;

        let result = decode_one_shot(request.mode, &body).map_err(|e| {
            DeliveryError::generation(format!("Failed to parse response as JSON: {e}"))
        })?;
        if result.is_empty() {
            return Err(DeliveryError::generation("Service returned empty content"));
        }
        debug!(bytes = body.len(), "One-shot result received");
        Ok(result)
    }
}
