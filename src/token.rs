//! Token representation for segmented Tibetan text.
//!
//! A Token is a word (or a syllable, or a stack, depending on the segmentation
//! mode) together with the span of the original input it was read from.

use serde::{Deserialize, Serialize};

/// How a token boundary was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Confidence {
    /// The token is a dictionary entry ending on a syllable boundary
    Dictionary,
    /// The token is an unknown span (syllable, stack or truncated run)
    #[default]
    Fallback,
}

impl Confidence {
    /// Convert to a string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Dictionary => "DICT",
            Confidence::Fallback => "UNKNOWN",
        }
    }
}

/// A single token from the segmentation process
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Token {
    /// The token text, lemmatized when lemmatization is enabled
    pub text: String,

    /// Starting byte offset in the original input
    pub start: usize,

    /// Ending byte offset (exclusive) in the original input
    pub end: usize,

    /// Whether the boundary comes from the dictionary
    pub confidence: Confidence,
}

impl Token {
    /// Create a token
    pub fn new(text: impl Into<String>, start: usize, end: usize, confidence: Confidence) -> Self {
        Token {
            text: text.into(),
            start,
            end,
            confidence,
        }
    }

    /// Length of the source span in bytes
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the source span is empty
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if this token was found in the dictionary
    pub fn is_known(&self) -> bool {
        self.confidence == Confidence::Dictionary
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)?;
        if self.confidence == Confidence::Fallback {
            write!(f, "/{}", self.confidence.as_str())?;
        }
        Ok(())
    }
}
