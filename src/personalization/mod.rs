//! Learner personalization profiles and the signature that keys cached content.
//!
//! Only the fields that change what the generator produces feed the
//! signature; cosmetic settings never invalidate cached content.

use crate::engine::traits::PersonalizationProvider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Proficiency {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl Proficiency {
    pub fn from_u32(proficiency: u32) -> Result<Self, String> {
        match proficiency {
            0 => Ok(Proficiency::Beginner),
            1 => Ok(Proficiency::Intermediate),
            2 => Ok(Proficiency::Advanced),
            3 => Ok(Proficiency::Expert),
            _ => Err("Invalid proficiency selected!".to_string()),
        }
    }
}

/// Persona data that shapes generated content.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct PersonalizationProfile {
    pub proficiency: Proficiency,
    pub professional_context: BTreeMap<String, Value>,
    pub learning_style: BTreeMap<String, Value>,
    pub content_preferences: BTreeMap<String, Value>,
    pub communication_tone: BTreeMap<String, Value>,
    pub personal_interests: BTreeMap<String, Value>,
}

impl PersonalizationProfile {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn signature(&self) -> PersonalizationSignature {
        // BTreeMap keys serialize sorted, so the encoding is canonical.
        let canonical = serde_json::json!({
            "proficiency": self.proficiency,
            "professional_context": self.professional_context,
            "learning_style": self.learning_style,
            "content_preferences": self.content_preferences,
            "communication_tone": self.communication_tone,
            "personal_interests": self.personal_interests,
        });
        PersonalizationSignature::digest(canonical.to_string().as_bytes())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct PersonalizationSignature(String);

impl PersonalizationSignature {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Signature of a learner without a stored profile.
    pub fn baseline() -> Self {
        Self("baseline".to_string())
    }

    fn digest(bytes: &[u8]) -> Self {
        let hex = blake3::hash(bytes).to_hex();
        Self(hex.as_str()[..16].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonalizationSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// In-process profile registry keyed by learner id.
#[derive(Default)]
pub struct ProfileRegistry {
    profiles: RwLock<HashMap<String, PersonalizationProfile>>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, owner_id: impl Into<String>, profile: PersonalizationProfile) {
        let owner_id = owner_id.into();
        debug!(owner_id = %owner_id, "Profile updated");
        self.profiles.write().await.insert(owner_id, profile);
    }

    pub async fn remove(&self, owner_id: &str) -> Option<PersonalizationProfile> {
        self.profiles.write().await.remove(owner_id)
    }

    pub async fn profile(&self, owner_id: &str) -> Option<PersonalizationProfile> {
        self.profiles.read().await.get(owner_id).cloned()
    }

    /// Registers the profile stored in a TOML file for `owner_id`.
    pub async fn load_toml_file(
        &self,
        owner_id: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> anyhow::Result<()> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let profile = PersonalizationProfile::from_toml_str(&raw)?;
        info!(path = %path.as_ref().display(), "Loaded personalization profile");
        self.insert(owner_id, profile).await;
        Ok(())
    }
}

#[async_trait]
impl PersonalizationProvider for ProfileRegistry {
    async fn signature(&self, owner_id: &str) -> anyhow::Result<PersonalizationSignature> {
        Ok(self
            .profiles
            .read()
            .await
            .get(owner_id)
            .map(PersonalizationProfile::signature)
            .unwrap_or_else(PersonalizationSignature::baseline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn visual_learner() -> PersonalizationProfile {
        let mut profile = PersonalizationProfile {
            proficiency: Proficiency::Intermediate,
            ..Default::default()
        };
        profile
            .learning_style
            .insert("primary".into(), Value::String("visual".into()));
        profile
            .personal_interests
            .insert("hobbies".into(), serde_json::json!(["chess", "cycling"]));
        profile
    }

    #[test]
    fn signature_is_stable_and_short() {
        let a = visual_learner().signature();
        let b = visual_learner().signature();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 16);
    }

    #[test]
    fn signature_tracks_every_relevant_field() {
        let base = visual_learner().signature();

        let mut changed = visual_learner();
        changed.proficiency = Proficiency::Expert;
        assert_ne!(changed.signature(), base);

        let mut changed = visual_learner();
        changed
            .communication_tone
            .insert("preferred_tone".into(), Value::String("formal".into()));
        assert_ne!(changed.signature(), base);
    }

    #[test]
    fn proficiency_from_u32() {
        assert_eq!(Proficiency::from_u32(2), Ok(Proficiency::Advanced));
        assert!(Proficiency::from_u32(9).is_err());
    }

    #[tokio::test]
    async fn registry_falls_back_to_baseline() {
        let registry = ProfileRegistry::new();
        assert_eq!(
            registry.signature("nobody").await.unwrap(),
            PersonalizationSignature::baseline()
        );

        registry.insert("ana", visual_learner()).await;
        assert_eq!(
            registry.signature("ana").await.unwrap(),
            visual_learner().signature()
        );
    }

    #[tokio::test]
    async fn registry_loads_toml_profiles() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "proficiency = \"advanced\"\n\n[learning_style]\npace = \"fast\"\n"
        )
        .unwrap();

        let registry = ProfileRegistry::new();
        registry.load_toml_file("ana", file.path()).await.unwrap();
        let profile = registry.profile("ana").await.unwrap();
        assert_eq!(profile.proficiency, Proficiency::Advanced);
        assert_eq!(profile.learning_style["pace"], Value::String("fast".into()));
    }
}
