use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Content modes a study view can ask for.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    Explain,
    Summary,
    Flashcards,
    Quiz,
}

impl ContentMode {
    pub const ALL: [ContentMode; 4] = [
        ContentMode::Explain,
        ContentMode::Summary,
        ContentMode::Flashcards,
        ContentMode::Quiz,
    ];

    /// Incremental modes stream frames; the rest return one structured result.
    pub fn is_incremental(self) -> bool {
        matches!(self, ContentMode::Explain)
    }

    pub fn from_u32(mode: u32) -> Result<Self, String> {
        match mode {
            0 => Ok(ContentMode::Explain),
            1 => Ok(ContentMode::Summary),
            2 => Ok(ContentMode::Flashcards),
            3 => Ok(ContentMode::Quiz),
            _ => Err("Invalid mode selected!".to_string()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentMode::Explain => "explain",
            ContentMode::Summary => "summary",
            ContentMode::Flashcards => "flashcards",
            ContentMode::Quiz => "quiz",
        }
    }
}

impl fmt::Display for ContentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "explain" | "explanation" => Ok(ContentMode::Explain),
            "summary" | "summarize" => Ok(ContentMode::Summary),
            "flashcards" | "flashcard" => Ok(ContentMode::Flashcards),
            "quiz" => Ok(ContentMode::Quiz),
            other => Err(format!("Unknown content mode: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_explain_streams() {
        let streaming: Vec<_> = ContentMode::ALL
            .into_iter()
            .filter(|m| m.is_incremental())
            .collect();
        assert_eq!(streaming, vec![ContentMode::Explain]);
    }

    #[test]
    fn parses_names_and_codes() {
        assert_eq!("Explanation".parse::<ContentMode>(), Ok(ContentMode::Explain));
        assert_eq!(" quiz ".parse::<ContentMode>(), Ok(ContentMode::Quiz));
        assert!("podcast".parse::<ContentMode>().is_err());
        assert_eq!(ContentMode::from_u32(2), Ok(ContentMode::Flashcards));
        assert!(ContentMode::from_u32(7).is_err());
    }

    #[test]
    fn round_trips_through_display() {
        for mode in ContentMode::ALL {
            assert_eq!(mode.to_string().parse::<ContentMode>(), Ok(mode));
        }
    }
}
