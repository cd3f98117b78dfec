//! Per-view context: what a study view holds for its lifetime.
//!
//! Built when the view mounts, dropped when it unmounts. Dropping it cancels
//! any running session, so nothing from a dead view reaches the cache.

use crate::cache::ContentCache;
use crate::config::Config;
use crate::dispatch::ModeDispatcher;
use crate::engine::{
    ContentSubscription, ContentTransport, GenerationRequest, PersonalizationProvider,
    RenderedContent, SourceMetadataProvider, StreamOrchestrator,
};
use crate::llm::HttpTransport;
use crate::mode::ContentMode;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Collaborators a view needs besides configuration.
#[derive(Clone)]
pub struct ViewDeps {
    /// Shared across views; clones see the same entries.
    pub cache: ContentCache,
    pub transport: Arc<dyn ContentTransport>,
    pub personalization: Arc<dyn PersonalizationProvider>,
    pub sources: Arc<dyn SourceMetadataProvider>,
}

impl ViewDeps {
    /// Wires the HTTP transport and a fresh cache from `config`.
    pub fn from_config(
        config: &Config,
        personalization: Arc<dyn PersonalizationProvider>,
        sources: Arc<dyn SourceMetadataProvider>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            cache: ContentCache::new(&config.cache),
            transport: Arc::new(HttpTransport::new(&config.service)?),
            personalization,
            sources,
        })
    }
}

pub struct ViewContext {
    id: Uuid,
    owner_id: String,
    dispatcher: ModeDispatcher,
}

impl ViewContext {
    pub fn new(config: &Config, owner_id: impl Into<String>, deps: ViewDeps) -> Self {
        let orchestrator = StreamOrchestrator::new(
            deps.cache.clone(),
            deps.transport.clone(),
            deps.personalization,
            deps.sources,
            config.stream.max_line_bytes,
        );
        let dispatcher = ModeDispatcher::new(
            orchestrator,
            deps.transport,
            deps.cache,
            config.cache.cache_one_shot,
        );

        let id = Uuid::new_v4();
        let owner_id = owner_id.into();
        debug!(view = %id, "View context created");
        Self {
            id,
            owner_id,
            dispatcher,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Live content and error signal for `mode`. Cached content shows up
    /// immediately; otherwise generation starts.
    pub async fn request_content(
        &self,
        mode: ContentMode,
        source_id: &str,
        topic_id: &str,
        subtopic_id: Option<&str>,
    ) -> ContentSubscription {
        info!(view = %self.id, %mode, "Content requested");
        self.dispatcher
            .request(self.generation_request(mode, source_id, topic_id, subtopic_id))
            .await
    }

    /// Same as [`Self::request_content`] with the numeric mode codes views send.
    pub async fn request_content_by_code(
        &self,
        mode: u32,
        source_id: &str,
        topic_id: &str,
        subtopic_id: Option<&str>,
    ) -> Result<ContentSubscription, String> {
        let mode = ContentMode::from_u32(mode)?;
        Ok(self
            .request_content(mode, source_id, topic_id, subtopic_id)
            .await)
    }

    /// Clears the cached entry for these inputs, then generates again.
    pub async fn regenerate(
        &self,
        mode: ContentMode,
        source_id: &str,
        topic_id: &str,
        subtopic_id: Option<&str>,
    ) -> ContentSubscription {
        info!(view = %self.id, %mode, "Regeneration requested");
        self.dispatcher
            .regenerate(self.generation_request(mode, source_id, topic_id, subtopic_id))
            .await
    }

    /// Retry action behind the inline error.
    pub async fn retry(&self, mode: ContentMode) -> Option<ContentSubscription> {
        self.dispatcher.retry(mode).await
    }

    pub async fn cancel_current(&self) -> bool {
        self.dispatcher.cancel_current().await
    }

    pub fn subscribe(&self, mode: ContentMode) -> ContentSubscription {
        self.dispatcher.subscribe(mode)
    }

    pub fn snapshot(&self, mode: ContentMode) -> RenderedContent {
        self.dispatcher.snapshot(mode)
    }

    fn generation_request(
        &self,
        mode: ContentMode,
        source_id: &str,
        topic_id: &str,
        subtopic_id: Option<&str>,
    ) -> GenerationRequest {
        GenerationRequest::new(
            self.owner_id.clone(),
            mode,
            source_id,
            topic_id,
            subtopic_id.map(str::to_string),
        )
    }
}

impl Drop for ViewContext {
    fn drop(&mut self) {
        debug!(view = %self.id, "View context disposed");
    }
}
