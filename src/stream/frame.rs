//! Typed frames decoded from the generation event stream.

use crate::error::FrameParseError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One structured citation attached to generated content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Citation {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub excerpt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Content(String),
    Citations(Vec<Citation>),
    Complete,
    Error(String),
    /// The literal `[DONE]` line.
    Done,
}

impl Frame {
    /// Decodes one event object. Accepts both typed events (`{"type": ...}`)
    /// and the untyped `{"content": ...}` / `{"error": ...}` shapes.
    pub fn from_event_json(text: &str) -> Result<Self, FrameParseError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| FrameParseError::Malformed(e.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| FrameParseError::Malformed("event is not an object".to_string()))?;

        match object.get("type").and_then(Value::as_str) {
            Some("content") => string_payload(object, &["content", "data", "delta", "text"])
                .map(Frame::Content)
                .ok_or(FrameParseError::MissingPayload { kind: "content" }),
            Some("citations") => citations_payload(object).map(Frame::Citations),
            Some("complete") => Ok(Frame::Complete),
            Some("error") => Ok(Frame::Error(
                string_payload(object, &["error", "message", "data"])
                    .unwrap_or_else(|| "Content generation failed".to_string()),
            )),
            Some(other) => Err(FrameParseError::UnknownType(other.to_string())),
            None => untyped(object),
        }
    }
}

fn untyped(object: &Map<String, Value>) -> Result<Frame, FrameParseError> {
    if let Some(message) = object.get("error") {
        let message = message
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| message.to_string());
        return Ok(Frame::Error(message));
    }
    match object.get("content") {
        Some(Value::String(text)) => Ok(Frame::Content(text.clone())),
        Some(_) => Err(FrameParseError::MissingPayload { kind: "content" }),
        None => Err(FrameParseError::UnknownType("<untyped>".to_string())),
    }
}

fn string_payload(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn citations_payload(object: &Map<String, Value>) -> Result<Vec<Citation>, FrameParseError> {
    let raw = object
        .get("citations")
        .or_else(|| object.get("data"))
        .ok_or(FrameParseError::MissingPayload { kind: "citations" })?;
    serde_json::from_value(raw.clone()).map_err(|e| FrameParseError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_events_decode() {
        assert_eq!(
            Frame::from_event_json(r#"{"type":"content","content":"Hi"}"#).unwrap(),
            Frame::Content("Hi".into())
        );
        assert_eq!(
            Frame::from_event_json(r#"{"type":"content","data":"Hi"}"#).unwrap(),
            Frame::Content("Hi".into())
        );
        assert_eq!(
            Frame::from_event_json(r#"{"type":"complete"}"#).unwrap(),
            Frame::Complete
        );
        assert_eq!(
            Frame::from_event_json(r#"{"type":"error","message":"quota"}"#).unwrap(),
            Frame::Error("quota".into())
        );
    }

    #[test]
    fn citations_ignore_unknown_fields() {
        let frame = Frame::from_event_json(
            r#"{"type":"citations","citations":[{"id":"c1","title":"Ch. 2","page":14,"score":0.8}]}"#,
        )
        .unwrap();
        assert_eq!(
            frame,
            Frame::Citations(vec![Citation {
                id: Some("c1".into()),
                title: Some("Ch. 2".into()),
                page: Some(14),
                ..Default::default()
            }])
        );
    }

    #[test]
    fn untyped_producer_shapes() {
        assert_eq!(
            Frame::from_event_json(r#"{"content":"chunk"}"#).unwrap(),
            Frame::Content("chunk".into())
        );
        assert_eq!(
            Frame::from_event_json(r#"{"error":"model overloaded"}"#).unwrap(),
            Frame::Error("model overloaded".into())
        );
    }

    #[test]
    fn rejects_unknown_and_incomplete_events() {
        assert!(matches!(
            Frame::from_event_json(r#"{"type":"usage","tokens":3}"#),
            Err(FrameParseError::UnknownType(t)) if t == "usage"
        ));
        assert!(matches!(
            Frame::from_event_json(r#"{"type":"content","content":7}"#),
            Err(FrameParseError::MissingPayload { kind: "content" })
        ));
        assert!(Frame::from_event_json(r#"{"type":"content""#).is_err());
    }
}
