//! Shared traits.

use super::types::{GenerationRequest, OneShotResult, SourceChunk};
use crate::cache::VersionToken;
use crate::error::DeliveryResult;
use crate::personalization::PersonalizationSignature;
use bytes::Bytes;
use futures::stream::BoxStream;

/// Incrementally readable byte stream. Dropping it releases the reader.
pub type ByteStream = BoxStream<'static, DeliveryResult<Bytes>>;

/// Network client for the content-generation service.
#[async_trait::async_trait]
pub trait ContentTransport: Send + Sync {
    async fn open_stream(&self, request: &GenerationRequest) -> DeliveryResult<ByteStream>;

    async fn fetch_one_shot(&self, request: &GenerationRequest) -> DeliveryResult<OneShotResult>;
}

#[async_trait::async_trait]
pub trait PersonalizationProvider: Send + Sync {
    async fn signature(&self, owner_id: &str) -> anyhow::Result<PersonalizationSignature>;
}

#[async_trait::async_trait]
pub trait SourceMetadataProvider: Send + Sync {
    async fn version_token(&self, source_id: &str) -> anyhow::Result<VersionToken>;

    /// Passages of `source_id` relevant to the topic, in reading order.
    async fn material(
        &self,
        source_id: &str,
        topic_id: &str,
        subtopic_id: Option<&str>,
    ) -> anyhow::Result<Vec<SourceChunk>>;
}
