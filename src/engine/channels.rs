//! Per-view output channels.
//!
//! Every write names the session it comes from and lands only while that
//! session is still current. The check runs inside the watch channel's own
//! write lock, so a superseded session can never overwrite its successor.

use super::types::{ContentStatus, RenderedContent};
use crate::error::ViewError;
use crate::mode::ContentMode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

pub struct ViewChannels {
    content: watch::Sender<RenderedContent>,
    errors: watch::Sender<Option<ViewError>>,
    current: AtomicU64,
}

impl ViewChannels {
    pub fn new(mode: ContentMode) -> Arc<Self> {
        let (content, _) = watch::channel(RenderedContent::idle(mode));
        let (errors, _) = watch::channel(None);
        Arc::new(Self {
            content,
            errors,
            current: AtomicU64::new(0),
        })
    }

    pub fn subscribe(&self) -> (watch::Receiver<RenderedContent>, watch::Receiver<Option<ViewError>>) {
        (self.content.subscribe(), self.errors.subscribe())
    }

    pub fn snapshot(&self) -> RenderedContent {
        self.content.borrow().clone()
    }

    /// Makes `session` the only writer. Must be called before its first publish.
    pub fn claim(&self, session: u64) {
        self.current.store(session, Ordering::SeqCst);
    }

    pub fn is_current(&self, session: u64) -> bool {
        self.current.load(Ordering::SeqCst) == session
    }

    pub fn publisher(self: &Arc<Self>, session: u64) -> Publisher {
        Publisher {
            session,
            channels: Arc::clone(self),
        }
    }
}

/// Write handle bound to one session.
#[derive(Clone)]
pub struct Publisher {
    session: u64,
    channels: Arc<ViewChannels>,
}

impl Publisher {
    /// Applies `update` to the live content if this session is still current.
    pub fn update(&self, update: impl FnOnce(&mut RenderedContent)) -> bool {
        let channels = &self.channels;
        channels.content.send_if_modified(|state| {
            if !channels.is_current(self.session) {
                return false;
            }
            update(state);
            true
        })
    }

    pub fn replace(&self, content: RenderedContent) -> bool {
        self.update(|state| *state = content)
    }

    pub fn set_error(&self, error: Option<ViewError>) -> bool {
        let channels = &self.channels;
        channels.errors.send_if_modified(|state| {
            if !channels.is_current(self.session) {
                return false;
            }
            *state = error;
            true
        })
    }

    pub fn set_status(&self, status: ContentStatus) -> bool {
        self.update(|state| state.status = status)
    }

    /// Flips the status to failed and raises the inline error. The body stays.
    pub fn fail(&self, error: ViewError) -> bool {
        let shown = self.set_status(ContentStatus::Failed);
        self.set_error(Some(error)) && shown
    }
}
