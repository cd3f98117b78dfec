//! Public façade for the engine layer.

pub mod channels;
pub mod orchestrator;
pub mod providers;
pub mod session;
pub mod traits;
pub mod types;

pub use orchestrator::StreamOrchestrator;
pub use providers::SourceVersions;
pub use session::{ResolvedRequest, SessionPhase, StreamSession};
pub use traits::{ByteStream, ContentTransport, PersonalizationProvider, SourceMetadataProvider};
pub use types::{
    ContentOrigin, ContentStatus, ContentSubscription, Flashcard, GenerationRequest,
    OneShotResult, QuizQuestion, RenderedContent, RequestOutcome, SourceChunk,
};

#[cfg(test)]
pub(crate) mod testing;
