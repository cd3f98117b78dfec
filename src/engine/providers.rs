//! In-process source-material metadata.

use super::traits::SourceMetadataProvider;
use super::types::SourceChunk;
use crate::cache::VersionToken;
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Version tokens and passages keyed by source-material id.
#[derive(Default)]
pub struct SourceVersions {
    versions: RwLock<HashMap<String, VersionToken>>,
    material: RwLock<HashMap<String, Vec<SourceChunk>>>,
}

impl SourceVersions {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, source_id: impl Into<String>, version: VersionToken) {
        self.versions.write().await.insert(source_id.into(), version);
    }

    /// Marks the source as edited now and returns its new token.
    pub async fn touch(&self, source_id: impl Into<String>) -> VersionToken {
        let source_id = source_id.into();
        let version = VersionToken::new(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true));
        debug!(source_id = %source_id, version = %version, "Source material touched");
        self.set(source_id, version.clone()).await;
        version
    }

    /// Replaces the passages of `source_id`. Pair with [`Self::touch`] when the
    /// text itself changed, so cached content for the old text stops matching.
    pub async fn set_material(&self, source_id: impl Into<String>, chunks: Vec<SourceChunk>) {
        self.material.write().await.insert(source_id.into(), chunks);
    }
}

#[async_trait]
impl SourceMetadataProvider for SourceVersions {
    async fn version_token(&self, source_id: &str) -> anyhow::Result<VersionToken> {
        self.versions
            .read()
            .await
            .get(source_id)
            .cloned()
            .ok_or_else(|| anyhow!("no metadata for source material {source_id}"))
    }

    async fn material(
        &self,
        source_id: &str,
        _topic_id: &str,
        _subtopic_id: Option<&str>,
    ) -> anyhow::Result<Vec<SourceChunk>> {
        self.material
            .read()
            .await
            .get(source_id)
            .cloned()
            .ok_or_else(|| anyhow!("no passages for source material {source_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_sources_are_errors() {
        let versions = SourceVersions::new();
        assert!(versions.version_token("missing").await.is_err());
    }

    #[tokio::test]
    async fn material_is_returned_per_source() {
        let versions = SourceVersions::new();
        versions
            .set_material("doc", vec![SourceChunk::new("c1", "Ownership moves values.")])
            .await;
        let chunks = versions.material("doc", "ownership", None).await.unwrap();
        assert_eq!(chunks[0].content, "Ownership moves values.");
        assert!(versions.material("other", "ownership", None).await.is_err());
    }

    #[tokio::test]
    async fn touch_changes_the_token() {
        let versions = SourceVersions::new();
        versions.set("doc", VersionToken::new("v1")).await;
        let touched = versions.touch("doc").await;
        assert_ne!(touched, VersionToken::new("v1"));
        assert_eq!(versions.version_token("doc").await.unwrap(), touched);
    }
}
