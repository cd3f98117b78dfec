//! Error taxonomy for content delivery.
//!
//! Only [`DeliveryError::Transport`] and [`DeliveryError::Generation`] ever
//! reach a view. Frame and cache failures are absorbed where they happen, and
//! aborts are swallowed once the cancellation flag confirms them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("Generation failed: {0}")]
    Generation(String),
    #[error("Session aborted")]
    Aborted,
}

impl DeliveryError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::Aborted)
    }

    /// Projects the error onto what a view may show. `None` for aborts.
    pub fn to_view_error(&self) -> Option<ViewError> {
        match self {
            Self::Transport(message) => Some(ViewError {
                kind: ViewErrorKind::Transport,
                message: message.clone(),
                retryable: true,
            }),
            Self::Generation(message) => Some(ViewError {
                kind: ViewErrorKind::Generation,
                message: message.clone(),
                retryable: true,
            }),
            Self::Aborted => None,
        }
    }
}

pub type DeliveryResult<T> = Result<T, DeliveryError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameParseError {
    #[error("Malformed event object: {0}")]
    Malformed(String),
    #[error("Unknown event type: {0}")]
    UnknownType(String),
    #[error("Event '{kind}' is missing its payload")]
    MissingPayload { kind: &'static str },
    #[error("Line of {len} bytes exceeds the {max} byte limit")]
    LineTooLong { len: usize, max: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache storage unavailable: {0}")]
    Unavailable(String),
    #[error("Entry of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewErrorKind {
    Transport,
    Generation,
}

/// Inline error shown in place of the content area, with a retry action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewError {
    pub kind: ViewErrorKind,
    pub message: String,
    pub retryable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborts_never_reach_the_view() {
        assert!(!DeliveryError::Aborted.is_user_visible());
        assert!(DeliveryError::Aborted.to_view_error().is_none());
    }

    #[test]
    fn transport_and_generation_are_retryable() {
        let transport = DeliveryError::transport("reset").to_view_error().unwrap();
        assert_eq!(transport.kind, ViewErrorKind::Transport);
        assert!(transport.retryable);

        let generation = DeliveryError::generation("quota").to_view_error().unwrap();
        assert_eq!(generation.kind, ViewErrorKind::Generation);
        assert_eq!(generation.message, "quota");
    }
}
