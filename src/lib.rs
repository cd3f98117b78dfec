//! Personalized streaming-content delivery and cache engine.
//!
//! A view builds a [`ViewContext`], asks it for content in one of the
//! [`ContentMode`]s and watches the returned receivers. Explanations stream
//! from the content service through the frame parser; summaries, flashcards
//! and quizzes come back in one response. Finished content is cached under a
//! fingerprint of owner, source, topic, mode, source version and
//! personalization signature.

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod llm;
pub mod logging;
pub mod mode;
pub mod personalization;
pub mod stream;
pub mod view;

pub use cache::{CachedEntry, ContentCache, ContentFingerprint, VersionToken};
pub use config::Config;
pub use engine::{
    ContentStatus, ContentSubscription, GenerationRequest, RenderedContent, RequestOutcome,
    StreamOrchestrator,
};
pub use error::{DeliveryError, ViewError};
pub use mode::ContentMode;
pub use personalization::{PersonalizationProfile, PersonalizationSignature, ProfileRegistry};
pub use view::{ViewContext, ViewDeps};
