//! Runtime configuration: service endpoint, cache limits, stream limits.
//!
//! Defaults are usable as-is for a local AI service. `.env` and environment
//! variables override them; a TOML file may be used instead.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub cache: CacheConfig,
    pub stream: StreamConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub connect_timeout_seconds: u64,
    pub user_agent: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub max_content_bytes: usize,
    pub cache_one_shot: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    pub max_line_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001/api/v1".to_string(),
            api_key: None,
            connect_timeout_seconds: 10,
            user_agent: format!("learnx/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 5000,
            max_content_bytes: 50_000,
            cache_one_shot: true,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: 1024 * 1024,
        }
    }
}

impl Config {
    /// Loads `.env` (if present) and applies `LEARNX_*` overrides to the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Config = toml::from_str(&raw)?;
        config.validate()?;
        debug!(path = %path.as_ref().display(), "Loaded config file");
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("LEARNX_AI_URL") {
            self.service.base_url = url;
        }
        if let Some(key) = lookup("LEARNX_AI_KEY") {
            self.service.api_key = Some(key).filter(|k| !k.is_empty());
        }
        if let Some(raw) = lookup("LEARNX_CONNECT_TIMEOUT") {
            self.service.connect_timeout_seconds = parse_number("LEARNX_CONNECT_TIMEOUT", &raw)?;
        }
        if let Some(raw) = lookup("LEARNX_CACHE_MAX_ENTRIES") {
            self.cache.max_entries = parse_number("LEARNX_CACHE_MAX_ENTRIES", &raw)?;
        }
        if let Some(raw) = lookup("LEARNX_CACHE_MAX_BYTES") {
            self.cache.max_content_bytes = parse_number("LEARNX_CACHE_MAX_BYTES", &raw)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.service.base_url).map_err(|e| ConfigError::InvalidValue {
            key: "service.base_url".to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                key: "service.base_url".to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        let non_zero = [
            ("cache.max_entries", self.cache.max_entries),
            ("cache.max_content_bytes", self.cache.max_content_bytes),
            ("stream.max_line_bytes", self.stream.max_line_bytes),
        ];
        for (key, value) in non_zero {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.max_entries, 5000);
        assert_eq!(config.cache.max_content_bytes, 50_000);
        assert!(config.cache.cache_one_shot);
    }

    #[test]
    fn overrides_replace_defaults() {
        let vars: HashMap<&str, &str> = [
            ("LEARNX_AI_URL", "https://ai.example.com/api"),
            ("LEARNX_AI_KEY", "secret"),
            ("LEARNX_CACHE_MAX_ENTRIES", " 12 "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.service.base_url, "https://ai.example.com/api");
        assert_eq!(config.service.api_key.as_deref(), Some("secret"));
        assert_eq!(config.cache.max_entries, 12);
        assert_eq!(config.cache.max_content_bytes, 50_000);
    }

    #[test]
    fn unparsable_override_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|key| (key == "LEARNX_CONNECT_TIMEOUT").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "LEARNX_CONNECT_TIMEOUT"));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.cache.max_entries = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.service.base_url = "ftp://files.example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_file_fills_missing_keys_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[service]\nbase_url = \"https://ai.internal:9000\"\n\n[cache]\nmax_entries = 64\n"
        )
        .unwrap();

        let config = Config::from_toml_file(file.path()).unwrap();
        assert_eq!(config.service.base_url, "https://ai.internal:9000");
        assert_eq!(config.service.connect_timeout_seconds, 10);
        assert_eq!(config.cache.max_entries, 64);
        assert_eq!(config.stream.max_line_bytes, 1024 * 1024);
    }
}
