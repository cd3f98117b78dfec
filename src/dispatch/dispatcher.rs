//! Routes requests by mode: streaming to the orchestrator, the rest one-shot.

use super::render::render;
use crate::cache::{CachedEntry, ContentCache, ContentFingerprint};
use crate::engine::channels::{Publisher, ViewChannels};
use crate::engine::{
    ContentOrigin, ContentStatus, ContentSubscription, ContentTransport, GenerationRequest,
    RenderedContent, RequestOutcome, ResolvedRequest, StreamOrchestrator,
};
use crate::mode::ContentMode;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub struct ModeDispatcher {
    orchestrator: StreamOrchestrator,
    one_shot: Arc<OneShotState>,
    view_token: CancellationToken,
}

struct OneShotState {
    transport: Arc<dyn ContentTransport>,
    cache: ContentCache,
    cache_results: bool,
    displays: HashMap<ContentMode, Arc<ViewChannels>>,
    in_flight: Mutex<HashMap<ContentMode, Attempt>>,
    last_requests: Mutex<HashMap<ContentMode, GenerationRequest>>,
    next_id: AtomicU64,
}

/// The one-shot call currently running for a mode.
struct Attempt {
    id: u64,
    fingerprint: ContentFingerprint,
    cancel: CancellationToken,
}

/// Clears the in-flight mark however the call ends, unless a newer call
/// already took the mode over.
struct InFlight {
    state: Arc<OneShotState>,
    mode: ContentMode,
    id: u64,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.state.in_flight.lock() {
            if in_flight.get(&self.mode).map(|a| a.id) == Some(self.id) {
                in_flight.remove(&self.mode);
            }
        }
    }
}

impl ModeDispatcher {
    pub fn new(
        orchestrator: StreamOrchestrator,
        transport: Arc<dyn ContentTransport>,
        cache: ContentCache,
        cache_results: bool,
    ) -> Self {
        let displays = ContentMode::ALL
            .iter()
            .filter(|mode| !mode.is_incremental())
            .map(|mode| (*mode, ViewChannels::new(*mode)))
            .collect();

        Self {
            orchestrator,
            one_shot: Arc::new(OneShotState {
                transport,
                cache,
                cache_results,
                displays,
                in_flight: Mutex::new(HashMap::new()),
                last_requests: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
            view_token: CancellationToken::new(),
        }
    }

    pub fn orchestrator(&self) -> &StreamOrchestrator {
        &self.orchestrator
    }

    /// Live receivers for `mode` without issuing a request.
    pub fn subscribe(&self, mode: ContentMode) -> ContentSubscription {
        match self.one_shot.displays.get(&mode) {
            Some(display) => subscription(display, RequestOutcome::AlreadyRunning),
            None => self.orchestrator.subscribe(),
        }
    }

    pub fn snapshot(&self, mode: ContentMode) -> RenderedContent {
        match self.one_shot.displays.get(&mode) {
            Some(display) => display.snapshot(),
            None => self.orchestrator.snapshot(),
        }
    }

    #[instrument(skip_all, fields(mode = %request.mode))]
    pub async fn request(&self, request: GenerationRequest) -> ContentSubscription {
        if request.mode.is_incremental() {
            return self.orchestrator.request(request).await;
        }
        self.run_one_shot(request, false).await
    }

    /// Clears the entry for `request` and generates it again.
    #[instrument(skip_all, fields(mode = %request.mode))]
    pub async fn regenerate(&self, request: GenerationRequest) -> ContentSubscription {
        if request.mode.is_incremental() {
            return self.orchestrator.regenerate(request).await;
        }
        self.run_one_shot(request, true).await
    }

    /// Re-issues the last request made for `mode`.
    pub async fn retry(&self, mode: ContentMode) -> Option<ContentSubscription> {
        if mode.is_incremental() {
            return self.orchestrator.retry().await;
        }
        let last = self.one_shot.last_requests.lock().ok()?.get(&mode).cloned()?;
        Some(self.run_one_shot(last, false).await)
    }

    /// Cancels the streaming session. One-shot calls run to completion.
    pub async fn cancel_current(&self) -> bool {
        self.orchestrator.cancel_current().await
    }

    async fn run_one_shot(&self, request: GenerationRequest, regenerate: bool) -> ContentSubscription {
        let state = &self.one_shot;
        let Some(display) = state.displays.get(&request.mode).cloned() else {
            return self.orchestrator.request(request).await;
        };

        let resolved = self.orchestrator.resolve(&request).await;
        let id = state.next_id.fetch_add(1, Ordering::Relaxed);
        let token = self.view_token.child_token();
        let outcome = {
            let Ok(mut in_flight) = state.in_flight.lock() else {
                return subscription(&display, RequestOutcome::AlreadyRunning);
            };
            let outcome = match in_flight.get(&request.mode) {
                Some(running) if running.fingerprint == resolved.fingerprint && !regenerate => {
                    debug!(attempt = running.id, "One-shot already in flight");
                    return subscription(&display, RequestOutcome::AlreadyRunning);
                }
                Some(running) => {
                    info!(attempt = running.id, "Inputs changed, abandoning running one-shot");
                    running.cancel.cancel();
                    RequestOutcome::Superseded
                }
                None => RequestOutcome::Started,
            };
            in_flight.insert(
                request.mode,
                Attempt {
                    id,
                    fingerprint: resolved.fingerprint.clone(),
                    cancel: token.clone(),
                },
            );
            outcome
        };
        let guard = InFlight {
            state: Arc::clone(state),
            mode: request.mode,
            id,
        };
        if let Ok(mut last) = state.last_requests.lock() {
            last.insert(request.mode, request.clone());
        }

        display.claim(id);
        let publisher = display.publisher(id);
        // The previous body stays visible until a new one replaces it.
        publisher.update(|content| {
            content.mode = request.mode;
            content.status = ContentStatus::Loading;
        });
        publisher.set_error(None);

        let use_cache = state.cache_results && resolved.cacheable;
        if use_cache && regenerate {
            state.cache.clear(&resolved.fingerprint).await;
        } else if use_cache {
            if let Some(entry) = state.cache.get(&resolved.fingerprint).await {
                info!("Serving cached one-shot content");
                drop(guard);
                publisher.replace(RenderedContent::from_cache(entry));
                return subscription(&display, outcome);
            }
        }

        tokio::spawn(Arc::clone(state).fetch(resolved, use_cache, publisher, token, guard));
        subscription(&display, outcome)
    }
}

impl Drop for ModeDispatcher {
    fn drop(&mut self) {
        self.view_token.cancel();
    }
}

impl OneShotState {
    async fn fetch(
        self: Arc<Self>,
        resolved: ResolvedRequest,
        use_cache: bool,
        publisher: Publisher,
        token: CancellationToken,
        guard: InFlight,
    ) {
        let mode = resolved.request.mode;
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(%mode, "One-shot abandoned");
                return;
            }
            result = self.transport.fetch_one_shot(&resolved.request) => result,
        };

        match result {
            Ok(result) => {
                let body = render(&result);
                if use_cache && !token.is_cancelled() {
                    self.cache
                        .set(
                            &resolved.fingerprint,
                            CachedEntry::new(mode, body.clone(), Vec::new()),
                        )
                        .await;
                }
                debug!(%mode, chars = body.len(), "One-shot content ready");
                drop(guard);
                publisher.replace(RenderedContent {
                    mode,
                    body,
                    citations: Vec::new(),
                    status: ContentStatus::Ready,
                    origin: Some(ContentOrigin::Network),
                });
            }
            Err(e) => {
                warn!(%mode, error = %e, "One-shot generation failed");
                drop(guard);
                if let Some(view_error) = e.to_view_error() {
                    publisher.fail(view_error);
                }
            }
        }
    }
}

fn subscription(display: &ViewChannels, outcome: RequestOutcome) -> ContentSubscription {
    let (content, errors) = display.subscribe();
    ContentSubscription {
        outcome,
        content,
        errors,
    }
}
