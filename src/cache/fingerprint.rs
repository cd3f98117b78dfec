//! Cache identity and cached payloads.

use crate::mode::ContentMode;
use crate::personalization::PersonalizationSignature;
use crate::stream::Citation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque source-material version, e.g. a last-modified stamp.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Composite identity of one unit of personalized content.
///
/// Equality is field-wise. Version and signature are part of identity, so an
/// edited document or a changed profile always misses.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentFingerprint {
    pub owner_id: String,
    pub source_id: String,
    pub topic_id: String,
    pub subtopic_id: Option<String>,
    pub mode: ContentMode,
    pub version: VersionToken,
    pub signature: PersonalizationSignature,
}

impl ContentFingerprint {
    /// Short digest used to correlate log lines without logging identities.
    pub fn storage_key(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        let mut field = |bytes: &[u8]| {
            hasher.update(&(bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        };
        field(self.owner_id.as_bytes());
        field(self.source_id.as_bytes());
        field(self.topic_id.as_bytes());
        match &self.subtopic_id {
            Some(subtopic) => {
                field(&[1]);
                field(subtopic.as_bytes());
            }
            None => field(&[0]),
        }
        field(self.mode.as_str().as_bytes());
        field(self.version.as_str().as_bytes());
        field(self.signature.as_str().as_bytes());
        hasher.finalize().to_hex().as_str()[..16].to_string()
    }
}

/// Rendered output stored for one fingerprint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CachedEntry {
    pub content: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    pub mode: ContentMode,
    pub created_at: DateTime<Utc>,
}

impl CachedEntry {
    pub fn new(mode: ContentMode, content: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            content: content.into(),
            citations,
            mode,
            created_at: Utc::now(),
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.content.len()
    }
}
