//! One generation attempt: accumulator, dedup memory, parser, cancel handle.

use super::types::GenerationRequest;
use crate::cache::{CachedEntry, ContentFingerprint};
use crate::stream::{Citation, Frame, FrameParser};
use tokio_util::sync::CancellationToken;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    CacheCheck,
    Streaming,
    Completing,
    Failed,
    Cancelled,
}

impl SessionPhase {
    pub fn is_busy(self) -> bool {
        matches!(self, Self::CacheCheck | Self::Streaming | Self::Completing)
    }
}

/// What applying one frame did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEffect {
    Appended,
    Duplicate,
    Ignored,
    CitationsAttached,
    Finished,
    Failed(String),
}

/// Fingerprint plus whether the providers that produced it could be trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub request: GenerationRequest,
    pub fingerprint: ContentFingerprint,
    /// `false` when a provider failed and placeholder values were used.
    pub cacheable: bool,
}

pub struct StreamSession {
    pub id: u64,
    pub resolved: ResolvedRequest,
    cancel: CancellationToken,
    parser: FrameParser,
    accumulator: String,
    last_chunk: Option<String>,
    citations: Vec<Citation>,
    phase: SessionPhase,
    frames: usize,
    bytes: usize,
}

impl StreamSession {
    pub fn new(
        id: u64,
        resolved: ResolvedRequest,
        cancel: CancellationToken,
        max_line_bytes: usize,
    ) -> Self {
        Self {
            id,
            resolved,
            cancel,
            parser: FrameParser::with_max_line_bytes(max_line_bytes),
            accumulator: String::new(),
            last_chunk: None,
            citations: Vec::new(),
            phase: SessionPhase::Idle,
            frames: 0,
            bytes: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn enter(&mut self, phase: SessionPhase) {
        trace!(session = self.id, from = ?self.phase, to = ?phase, "Session transition");
        self.phase = phase;
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn content(&self) -> &str {
        &self.accumulator
    }

    pub fn citations(&self) -> &[Citation] {
        &self.citations
    }

    pub fn has_content(&self) -> bool {
        !self.accumulator.is_empty()
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Parses a raw chunk into frames. Partial lines stay buffered.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.bytes += chunk.len();
        let frames = self.parser.feed_bytes(chunk);
        self.frames += frames.len();
        frames
    }

    /// Appends `chunk` unless it repeats the immediately preceding one.
    /// Only the adjacent chunk is compared.
    pub fn push_content(&mut self, chunk: &str) -> FrameEffect {
        if chunk.is_empty() {
            return FrameEffect::Ignored;
        }
        if self.last_chunk.as_deref() == Some(chunk) {
            return FrameEffect::Duplicate;
        }
        self.accumulator.push_str(chunk);
        self.last_chunk = Some(chunk.to_string());
        FrameEffect::Appended
    }

    pub fn apply(&mut self, frame: Frame) -> FrameEffect {
        match frame {
            Frame::Content(chunk) => self.push_content(&chunk),
            Frame::Citations(citations) => {
                self.citations = citations;
                FrameEffect::CitationsAttached
            }
            Frame::Complete | Frame::Done => FrameEffect::Finished,
            Frame::Error(message) => FrameEffect::Failed(message),
        }
    }

    pub fn to_entry(&self) -> CachedEntry {
        CachedEntry::new(
            self.resolved.fingerprint.mode,
            self.accumulator.clone(),
            self.citations.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::VersionToken;
    use crate::mode::ContentMode;
    use crate::personalization::PersonalizationSignature;

    fn session() -> StreamSession {
        let request = GenerationRequest::new("u", ContentMode::Explain, "s", "t", None);
        let fingerprint = ContentFingerprint {
            owner_id: "u".into(),
            source_id: "s".into(),
            topic_id: "t".into(),
            subtopic_id: None,
            mode: ContentMode::Explain,
            version: VersionToken::new("v1"),
            signature: PersonalizationSignature::baseline(),
        };
        StreamSession::new(
            1,
            ResolvedRequest {
                request,
                fingerprint,
                cacheable: true,
            },
            CancellationToken::new(),
            1024,
        )
    }

    fn push_all(session: &mut StreamSession, chunks: &[&str]) {
        for chunk in chunks {
            session.apply(Frame::Content(chunk.to_string()));
        }
    }

    #[test]
    fn adjacent_duplicates_are_dropped() {
        let mut s = session();
        push_all(&mut s, &["A", "A", "B"]);
        assert_eq!(s.content(), "AB");
    }

    #[test]
    fn non_adjacent_duplicates_are_kept() {
        let mut s = session();
        push_all(&mut s, &["A", "B", "A"]);
        assert_eq!(s.content(), "ABA");
    }

    #[test]
    fn empty_chunks_do_not_reset_dedup() {
        let mut s = session();
        assert_eq!(s.apply(Frame::Content("A".into())), FrameEffect::Appended);
        assert_eq!(s.apply(Frame::Content(String::new())), FrameEffect::Ignored);
        assert_eq!(s.apply(Frame::Content("A".into())), FrameEffect::Duplicate);
        assert_eq!(s.content(), "A");
    }

    #[test]
    fn citations_leave_text_untouched() {
        let mut s = session();
        push_all(&mut s, &["Hello"]);
        let effect = s.apply(Frame::Citations(vec![Citation {
            title: Some("Chapter 4".into()),
            ..Default::default()
        }]));
        assert_eq!(effect, FrameEffect::CitationsAttached);
        assert_eq!(s.content(), "Hello");
        assert_eq!(s.citations().len(), 1);
    }

    #[test]
    fn terminal_frames() {
        let mut s = session();
        assert_eq!(s.apply(Frame::Complete), FrameEffect::Finished);
        assert_eq!(s.apply(Frame::Done), FrameEffect::Finished);
        assert_eq!(
            s.apply(Frame::Error("quota".into())),
            FrameEffect::Failed("quota".into())
        );
    }

    #[test]
    fn feed_counts_bytes_and_frames() {
        let mut s = session();
        let frames = s.feed(b"data: Hel");
        assert!(frames.is_empty());
        let frames = s.feed(b"lo\ndata: [DONE]\n");
        assert_eq!(frames, vec![Frame::Content("Hello".into()), Frame::Done]);
        assert_eq!(s.frames(), 2);
        assert_eq!(s.bytes(), 25);
    }

    #[test]
    fn busy_phases() {
        assert!(SessionPhase::Streaming.is_busy());
        assert!(SessionPhase::CacheCheck.is_busy());
        assert!(!SessionPhase::Idle.is_busy());
        assert!(!SessionPhase::Cancelled.is_busy());
    }
}
