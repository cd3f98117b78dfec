//! Renders one-shot results into the same Markdown body streaming produces.

use crate::engine::{Flashcard, OneShotResult, QuizQuestion};
use std::fmt::Write;

pub fn render(result: &OneShotResult) -> String {
    match result {
        OneShotResult::Summary { text } => clean(text),
        OneShotResult::Flashcards { cards } => render_flashcards(cards),
        OneShotResult::Quiz { questions } => render_quiz(questions),
    }
}

/// Strips whitespace and code fences the generator sometimes wraps text in.
pub fn clean(raw: &str) -> String {
    raw.trim()
        .trim_start_matches("```markdown")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
        .to_string()
}

fn render_flashcards(cards: &[Flashcard]) -> String {
    let mut out = String::new();
    for (i, card) in cards.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(out, "### Card {}", i + 1);
        if let Some(difficulty) = &card.difficulty {
            let _ = write!(out, " ({difficulty})");
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "**Q:** {}", card.front.trim());
        let _ = writeln!(out, "**A:** {}", card.back.trim());
    }
    out
}

fn render_quiz(questions: &[QuizQuestion]) -> String {
    let mut out = String::new();
    for (i, q) in questions.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(out, "### Question {}", i + 1);
        if let Some(difficulty) = &q.difficulty {
            let _ = write!(out, " ({difficulty})");
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", q.question.trim());

        if let Some(options) = &q.options {
            let _ = writeln!(out);
            for (letter, text) in options {
                let _ = writeln!(out, "- **{letter}.** {text}");
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "**Answer:** {}", q.answer.trim());
        if let Some(explanation) = q.explanation.as_deref().filter(|e| !e.trim().is_empty()) {
            let _ = writeln!(out, "> {}", explanation.trim());
        }
    }
    out
}
