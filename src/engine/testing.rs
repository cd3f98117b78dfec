//! In-test collaborators: a scriptable transport and fixed providers.

use super::traits::{ByteStream, ContentTransport, PersonalizationProvider};
use super::types::{GenerationRequest, OneShotResult};
use crate::error::{DeliveryError, DeliveryResult};
use crate::mode::ContentMode;
use crate::personalization::PersonalizationSignature;
use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;
use futures::channel::mpsc;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{watch, Notify};

pub type ChunkSender = mpsc::UnboundedSender<DeliveryResult<Bytes>>;

pub fn content_line(text: &str) -> Bytes {
    let event = serde_json::json!({ "type": "content", "content": text });
    Bytes::from(format!("data: {event}\n"))
}

pub fn error_line(message: &str) -> Bytes {
    let event = serde_json::json!({ "type": "error", "message": message });
    Bytes::from(format!("data: {event}\n"))
}

pub fn complete_line() -> Bytes {
    Bytes::from_static(b"data: {\"type\":\"complete\"}\n")
}

/// Every opened stream is a channel the test writes into.
#[derive(Default)]
pub struct FakeTransport {
    senders: Mutex<Vec<ChunkSender>>,
    opens: AtomicUsize,
    one_shot_calls: AtomicUsize,
    fail_open: Mutex<Option<DeliveryError>>,
    one_shot: Mutex<HashMap<ContentMode, DeliveryResult<OneShotResult>>>,
    hold_one_shot: Mutex<bool>,
    release: Notify,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn one_shot_calls(&self) -> usize {
        self.one_shot_calls.load(Ordering::SeqCst)
    }

    /// Sender for the `index`-th opened stream.
    pub fn sender(&self, index: usize) -> ChunkSender {
        self.senders.lock().unwrap()[index].clone()
    }

    pub fn send(&self, index: usize, chunk: Bytes) {
        let _ = self.sender(index).unbounded_send(Ok(chunk));
    }

    /// Ends the `index`-th stream without a terminal frame.
    pub fn close(&self, index: usize) {
        self.sender(index).close_channel();
    }

    pub fn fail_next_open(&self, error: DeliveryError) {
        *self.fail_open.lock().unwrap() = Some(error);
    }

    pub fn set_one_shot(&self, mode: ContentMode, result: DeliveryResult<OneShotResult>) {
        self.one_shot.lock().unwrap().insert(mode, result);
    }

    /// One-shot calls wait for [`Self::release_one_shot`] until cleared.
    pub fn hold_one_shot(&self, hold: bool) {
        *self.hold_one_shot.lock().unwrap() = hold;
    }

    pub fn release_one_shot(&self) {
        self.release.notify_one();
    }

    pub async fn wait_for_opens(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.opens() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("stream was never opened");
    }

    /// Waits until the session dropped its reader for the `index`-th stream.
    pub async fn wait_released(&self, index: usize) {
        let sender = self.sender(index);
        tokio::time::timeout(Duration::from_secs(2), async {
            while !sender.is_closed() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("reader was never released");
    }
}

#[async_trait]
impl ContentTransport for FakeTransport {
    async fn open_stream(&self, _request: &GenerationRequest) -> DeliveryResult<ByteStream> {
        if let Some(error) = self.fail_open.lock().unwrap().take() {
            return Err(error);
        }
        let (tx, rx) = mpsc::unbounded();
        self.senders.lock().unwrap().push(tx);
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(rx.boxed())
    }

    async fn fetch_one_shot(&self, request: &GenerationRequest) -> DeliveryResult<OneShotResult> {
        self.one_shot_calls.fetch_add(1, Ordering::SeqCst);
        let hold = *self.hold_one_shot.lock().unwrap();
        if hold {
            self.release.notified().await;
        }
        self.one_shot
            .lock()
            .unwrap()
            .get(&request.mode)
            .cloned()
            .unwrap_or_else(|| Err(DeliveryError::generation("no scripted result")))
    }
}

/// Signature provider whose answer the test can change.
pub struct FixedSignature(Mutex<Option<PersonalizationSignature>>);

impl FixedSignature {
    pub fn new(signature: &str) -> Self {
        Self(Mutex::new(Some(PersonalizationSignature::new(signature))))
    }

    pub fn failing() -> Self {
        Self(Mutex::new(None))
    }

    pub fn set(&self, signature: &str) {
        *self.0.lock().unwrap() = Some(PersonalizationSignature::new(signature));
    }
}

#[async_trait]
impl PersonalizationProvider for FixedSignature {
    async fn signature(&self, _owner_id: &str) -> anyhow::Result<PersonalizationSignature> {
        self.0
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("profile service unreachable"))
    }
}

/// Waits until `rx` holds a value matching `predicate`.
pub async fn wait_until<T: Clone>(
    rx: &mut watch::Receiver<T>,
    predicate: impl FnMut(&T) -> bool,
) -> T {
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for view state")
        .expect("channel closed")
        .clone()
}
