//! Shared structs.

use crate::cache::CachedEntry;
use crate::error::ViewError;
use crate::mode::ContentMode;
use crate::stream::Citation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::watch;

/// What the view asks for: one mode of content over one piece of source material.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub owner_id: String,
    pub mode: ContentMode,
    pub source_id: String,
    pub topic_id: String,
    #[serde(default)]
    pub subtopic_id: Option<String>,
    /// Source text sent to the service. Filled in when the request is resolved.
    #[serde(default)]
    pub material: Vec<SourceChunk>,
}

/// One passage of source material, as the content service expects it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SourceChunk {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl SourceChunk {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }
}

impl GenerationRequest {
    pub fn new(
        owner_id: impl Into<String>,
        mode: ContentMode,
        source_id: impl Into<String>,
        topic_id: impl Into<String>,
        subtopic_id: Option<String>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            mode,
            source_id: source_id.into(),
            topic_id: topic_id.into(),
            subtopic_id,
            material: Vec::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Idle,
    Loading,
    Streaming,
    Ready,
    Failed,
    Cancelled,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentOrigin {
    Cache,
    Network,
}

/// Display representation shared by every mode.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RenderedContent {
    pub mode: ContentMode,
    pub body: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    pub status: ContentStatus,
    pub origin: Option<ContentOrigin>,
}

impl RenderedContent {
    pub fn idle(mode: ContentMode) -> Self {
        Self {
            mode,
            body: String::new(),
            citations: Vec::new(),
            status: ContentStatus::Idle,
            origin: None,
        }
    }

    pub fn loading(mode: ContentMode) -> Self {
        Self {
            status: ContentStatus::Loading,
            ..Self::idle(mode)
        }
    }

    pub fn from_cache(entry: CachedEntry) -> Self {
        Self {
            mode: entry.mode,
            body: entry.content,
            citations: entry.citations,
            status: ContentStatus::Ready,
            origin: Some(ContentOrigin::Cache),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == ContentStatus::Ready
    }
}

/// How a request was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A new session was started.
    Started,
    /// A session for the same inputs is already running; nothing changed.
    AlreadyRunning,
    /// A session for different inputs was cancelled and a new one started.
    Superseded,
}

/// Receivers handed to the view: live content and the inline error signal.
#[derive(Debug, Clone)]
pub struct ContentSubscription {
    pub outcome: RequestOutcome,
    pub content: watch::Receiver<RenderedContent>,
    pub errors: watch::Receiver<Option<ViewError>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    pub question: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Letter to option text, e.g. `"A" -> "Borrowing"`.
    #[serde(default)]
    pub options: Option<BTreeMap<String, String>>,
    pub answer: String,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

/// Structured result of a one-shot generation call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OneShotResult {
    Summary { text: String },
    Flashcards { cards: Vec<Flashcard> },
    Quiz { questions: Vec<QuizQuestion> },
}

impl OneShotResult {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Summary { text } => text.trim().is_empty(),
            Self::Flashcards { cards } => cards.is_empty(),
            Self::Quiz { questions } => questions.is_empty(),
        }
    }
}
