//! # Content service client
//!
//! HTTP side of the engine: posts generation requests to the AI service and
//! hands back either the raw event-stream bytes (explain mode) or a decoded
//! structured result (summary, flashcards, quiz).
//!
//! ```text
//! GenerationRequest → wire::ContentBody → POST {base_url}/content/<mode> → ByteStream | OneShotResult
//! ```

pub mod transport;
pub mod wire;

pub use transport::HttpTransport;
