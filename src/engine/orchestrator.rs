//! High-level coordinator: fingerprint → cache → network stream → cache.
//!
//! One orchestrator per view and mode. At most one session is active; a
//! request for the same inputs while busy is a no-op, a request for changed
//! inputs cancels the running session before the new one starts.

use super::channels::{Publisher, ViewChannels};
use super::session::{FrameEffect, ResolvedRequest, SessionPhase, StreamSession};
use super::traits::{ContentTransport, PersonalizationProvider, SourceMetadataProvider};
use super::types::{
    ContentOrigin, ContentStatus, ContentSubscription, GenerationRequest, RenderedContent,
    RequestOutcome,
};
use crate::cache::{ContentCache, ContentFingerprint, VersionToken};
use crate::error::{DeliveryError, DeliveryResult};
use crate::mode::ContentMode;
use crate::personalization::PersonalizationSignature;
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Placeholder version used when the metadata provider fails.
const UNKNOWN_VERSION: &str = "unknown";

pub struct StreamOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    cache: ContentCache,
    transport: Arc<dyn ContentTransport>,
    personalization: Arc<dyn PersonalizationProvider>,
    sources: Arc<dyn SourceMetadataProvider>,
    max_line_bytes: usize,
    channels: Arc<ViewChannels>,
    slot: Mutex<Slot>,
    /// Parent of every session token; cancelled on teardown.
    view_token: CancellationToken,
    next_id: AtomicU64,
}

#[derive(Default)]
struct Slot {
    active: Option<ActiveSession>,
    last_request: Option<GenerationRequest>,
}

struct ActiveSession {
    id: u64,
    fingerprint: ContentFingerprint,
    cancel: CancellationToken,
}

impl StreamOrchestrator {
    pub fn new(
        cache: ContentCache,
        transport: Arc<dyn ContentTransport>,
        personalization: Arc<dyn PersonalizationProvider>,
        sources: Arc<dyn SourceMetadataProvider>,
        max_line_bytes: usize,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                transport,
                personalization,
                sources,
                max_line_bytes,
                channels: ViewChannels::new(ContentMode::Explain),
                slot: Mutex::new(Slot::default()),
                view_token: CancellationToken::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn subscribe(&self) -> ContentSubscription {
        self.subscription(RequestOutcome::AlreadyRunning)
    }

    pub fn snapshot(&self) -> RenderedContent {
        self.inner.channels.snapshot()
    }

    pub async fn is_busy(&self) -> bool {
        self.inner.slot.lock().await.active.is_some()
    }

    /// Computes the fingerprint the orchestrator would use for `request`.
    pub async fn resolve(&self, request: &GenerationRequest) -> ResolvedRequest {
        self.inner.resolve(request).await
    }

    /// Starts (or joins) generation for `request`.
    #[instrument(skip_all, fields(source = %request.source_id, topic = %request.topic_id))]
    pub async fn request(&self, request: GenerationRequest) -> ContentSubscription {
        let resolved = self.inner.resolve(&request).await;
        let mut slot = self.inner.slot.lock().await;

        let outcome = match &slot.active {
            Some(active) if active.fingerprint == resolved.fingerprint => {
                debug!(session = active.id, "Request ignored, session already running");
                return self.subscription(RequestOutcome::AlreadyRunning);
            }
            Some(active) => {
                info!(session = active.id, "Inputs changed, cancelling running session");
                active.cancel.cancel();
                RequestOutcome::Superseded
            }
            None => RequestOutcome::Started,
        };

        self.inner.start(&mut slot, resolved);
        self.subscription(outcome)
    }

    /// Drops the cached entry for `request` and streams it again.
    #[instrument(skip_all, fields(source = %request.source_id, topic = %request.topic_id))]
    pub async fn regenerate(&self, request: GenerationRequest) -> ContentSubscription {
        let resolved = self.inner.resolve(&request).await;
        let mut slot = self.inner.slot.lock().await;

        let outcome = match slot.active.take() {
            Some(active) => {
                active.cancel.cancel();
                RequestOutcome::Superseded
            }
            None => RequestOutcome::Started,
        };
        // Cleared under the slot lock so a finishing session cannot refill it.
        if resolved.cacheable {
            self.inner.cache.clear(&resolved.fingerprint).await;
        }
        info!(key = %resolved.fingerprint.storage_key(), "Regenerating content");

        self.inner.start(&mut slot, resolved);
        self.subscription(outcome)
    }

    /// Re-issues the last request, e.g. from the view's retry action.
    pub async fn retry(&self) -> Option<ContentSubscription> {
        let last = self.inner.slot.lock().await.last_request.clone()?;
        Some(self.request(last).await)
    }

    /// Cancels the running session, if any. Nothing it produced is cached.
    pub async fn cancel_current(&self) -> bool {
        let mut slot = self.inner.slot.lock().await;
        let Some(active) = slot.active.take() else {
            return false;
        };
        active.cancel.cancel();
        info!(session = active.id, "Session cancelled");

        // Take the channels away from the cancelled session before marking it.
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.channels.claim(id);
        self.inner
            .channels
            .publisher(id)
            .set_status(ContentStatus::Cancelled);
        true
    }

    fn subscription(&self, outcome: RequestOutcome) -> ContentSubscription {
        let (content, errors) = self.inner.channels.subscribe();
        ContentSubscription {
            outcome,
            content,
            errors,
        }
    }
}

impl Drop for StreamOrchestrator {
    fn drop(&mut self) {
        self.inner.view_token.cancel();
    }
}

impl Inner {
    async fn resolve(&self, request: &GenerationRequest) -> ResolvedRequest {
        let mut cacheable = true;

        let signature = match self.personalization.signature(&request.owner_id).await {
            Ok(signature) => signature,
            Err(e) => {
                warn!(error = %e, "Personalization unavailable, session will not be cached");
                cacheable = false;
                PersonalizationSignature::baseline()
            }
        };
        let version = match self.sources.version_token(&request.source_id).await {
            Ok(version) => version,
            Err(e) => {
                warn!(error = %e, "Source version unavailable, session will not be cached");
                cacheable = false;
                VersionToken::new(UNKNOWN_VERSION)
            }
        };

        let mut request = request.clone();
        let material = self
            .sources
            .material(&request.source_id, &request.topic_id, request.subtopic_id.as_deref())
            .await;
        match material {
            Ok(material) => request.material = material,
            Err(e) => warn!(error = %e, "Source material unavailable, sending request as given"),
        }

        ResolvedRequest {
            fingerprint: ContentFingerprint {
                owner_id: request.owner_id.clone(),
                source_id: request.source_id.clone(),
                topic_id: request.topic_id.clone(),
                subtopic_id: request.subtopic_id.clone(),
                mode: request.mode,
                version,
                signature,
            },
            request,
            cacheable,
        }
    }

    /// Installs a new session in the slot and spawns it. Caller holds the lock.
    fn start(self: &Arc<Self>, slot: &mut Slot, resolved: ResolvedRequest) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = self.view_token.child_token();

        self.channels.claim(id);
        let publisher = self.channels.publisher(id);
        publisher.replace(RenderedContent::loading(resolved.request.mode));
        publisher.set_error(None);

        slot.last_request = Some(resolved.request.clone());
        slot.active = Some(ActiveSession {
            id,
            fingerprint: resolved.fingerprint.clone(),
            cancel: cancel.clone(),
        });

        debug!(session = id, key = %resolved.fingerprint.storage_key(), "Session started");
        let session = StreamSession::new(id, resolved, cancel, self.max_line_bytes);
        tokio::spawn(Arc::clone(self).run(session, publisher));
    }

    async fn run(self: Arc<Self>, mut session: StreamSession, publisher: Publisher) {
        session.enter(SessionPhase::CacheCheck);
        if session.resolved.cacheable {
            if let Some(entry) = self.cache.get(&session.resolved.fingerprint).await {
                info!(session = session.id, "Serving cached content");
                session.enter(SessionPhase::Idle);
                self.release(session.id).await;
                publisher.replace(RenderedContent::from_cache(entry));
                return;
            }
        }

        session.enter(SessionPhase::Streaming);
        match self.stream(&mut session, &publisher).await {
            Ok(()) => self.complete(session, &publisher).await,
            Err(e) if session.is_cancelled() || !e.is_user_visible() => {
                session.enter(SessionPhase::Cancelled);
                debug!(session = session.id, "Session aborted");
            }
            Err(e) => {
                session.enter(SessionPhase::Failed);
                warn!(session = session.id, error = %e, "Session failed");
                self.release(session.id).await;
                if let Some(view_error) = e.to_view_error() {
                    publisher.fail(view_error);
                }
            }
        }
    }

    /// Reads until a terminal frame, end of stream, failure or cancellation.
    /// The byte stream is dropped on every return.
    async fn stream(&self, session: &mut StreamSession, publisher: &Publisher) -> DeliveryResult<()> {
        let token = session.token().clone();
        let mut bytes = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(DeliveryError::Aborted),
            opened = self.transport.open_stream(&session.resolved.request) => opened?,
        };

        loop {
            if token.is_cancelled() {
                return Err(DeliveryError::Aborted);
            }
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(DeliveryError::Aborted),
                next = bytes.next() => next,
            };

            let chunk = match next {
                Some(chunk) => chunk?,
                None if session.has_content() => {
                    debug!(session = session.id, "Stream closed without terminal frame");
                    return Ok(());
                }
                None => {
                    return Err(DeliveryError::transport(
                        "stream closed before any content arrived",
                    ))
                }
            };

            for frame in session.feed(&chunk) {
                match session.apply(frame) {
                    FrameEffect::Appended => {
                        let body = session.content().to_string();
                        publisher.update(|state| {
                            state.body = body;
                            state.status = ContentStatus::Streaming;
                            state.origin = Some(ContentOrigin::Network);
                        });
                    }
                    FrameEffect::CitationsAttached => {
                        let citations = session.citations().to_vec();
                        publisher.update(|state| state.citations = citations);
                    }
                    FrameEffect::Finished => return Ok(()),
                    FrameEffect::Failed(message) => {
                        return Err(DeliveryError::Generation(message))
                    }
                    FrameEffect::Duplicate | FrameEffect::Ignored => {}
                }
            }
        }
    }

    /// Writes the result under the slot lock, so cancellation cannot interleave.
    async fn complete(&self, mut session: StreamSession, publisher: &Publisher) {
        session.enter(SessionPhase::Completing);
        let mut slot = self.slot.lock().await;

        let still_current = matches!(&slot.active, Some(active) if active.id == session.id);
        if !still_current || session.is_cancelled() {
            session.enter(SessionPhase::Cancelled);
            debug!(session = session.id, "Completed after cancellation, discarding");
            return;
        }

        if session.resolved.cacheable {
            self.cache
                .set(&session.resolved.fingerprint, session.to_entry())
                .await;
        }
        let body = session.content().to_string();
        let citations = session.citations().to_vec();
        publisher.update(|state| {
            state.body = body;
            state.citations = citations;
            state.status = ContentStatus::Ready;
            state.origin = Some(ContentOrigin::Network);
        });

        info!(
            session = session.id,
            bytes = session.bytes(),
            frames = session.frames(),
            chars = session.content().len(),
            "Session completed"
        );
        session.enter(SessionPhase::Idle);
        slot.active = None;
    }

    async fn release(&self, session: u64) {
        let mut slot = self.slot.lock().await;
        if matches!(&slot.active, Some(active) if active.id == session) {
            slot.active = None;
        }
    }
}
