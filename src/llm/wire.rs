//! Request and response bodies exchanged with the content-generation service.

use crate::engine::{Flashcard, GenerationRequest, OneShotResult, QuizQuestion, SourceChunk};
use crate::mode::ContentMode;
use serde::{Deserialize, Serialize};

/// Request body shared by every endpoint. Explanations carry the passages
/// as `chunks`; the other modes take them joined into one `content` string.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ContentBody<'a> {
    pub user_id: &'a str,
    pub topic: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtopic: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<&'a [SourceChunk]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_type: Option<&'a str>,
}

impl<'a> ContentBody<'a> {
    pub fn from_request(request: &'a GenerationRequest) -> Self {
        let incremental = request.mode.is_incremental();
        Self {
            user_id: &request.owner_id,
            topic: &request.topic_id,
            subtopic: request.subtopic_id.as_deref(),
            chunks: incremental.then_some(request.material.as_slice()),
            content: (!incremental).then(|| joined_material(&request.material)),
            stream: incremental.then_some(true),
            quiz_type: (request.mode == ContentMode::Quiz).then_some("multiple_choice"),
        }
    }
}

fn joined_material(chunks: &[SourceChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.content.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Path below the service base URL for each mode.
pub fn endpoint(mode: ContentMode) -> &'static str {
    match mode {
        ContentMode::Explain => "content/explanation/stream",
        ContentMode::Summary => "content/summary",
        ContentMode::Flashcards => "content/flashcards",
        ContentMode::Quiz => "content/quiz",
    }
}

#[derive(Deserialize, Debug)]
pub struct SummaryResponse {
    pub content: String,
}

#[derive(Deserialize, Debug)]
pub struct FlashcardsResponse {
    #[serde(default)]
    pub flashcards: Vec<Flashcard>,
}

#[derive(Deserialize, Debug)]
pub struct QuizResponse {
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
}

/// Decodes a one-shot response body for `mode`.
pub fn decode_one_shot(mode: ContentMode, body: &str) -> Result<OneShotResult, serde_json::Error> {
    Ok(match mode {
        ContentMode::Summary | ContentMode::Explain => {
            let response: SummaryResponse = serde_json::from_str(body)?;
            OneShotResult::Summary {
                text: response.content,
            }
        }
        ContentMode::Flashcards => {
            let response: FlashcardsResponse = serde_json::from_str(body)?;
            OneShotResult::Flashcards {
                cards: response.flashcards,
            }
        }
        ContentMode::Quiz => {
            let response: QuizResponse = serde_json::from_str(body)?;
            OneShotResult::Quiz {
                questions: response.questions,
            }
        }
    })
}
