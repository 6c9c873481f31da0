//! Configuration of the segmenter and of the analysis pipeline.
//!
//! Configurations are plain values, passed explicitly to the components that
//! use them, and can be read from JSON:
//!
//! ```rust
//! use bo_wordseg::{AnalyzerConfig, SegmentMode};
//!
//! let config = AnalyzerConfig::from_json_str(
//!     r#"{ "segmenter": { "mode": "stack", "lemmatize": false } }"#,
//! ).unwrap();
//! assert_eq!(config.segmenter.mode, SegmentMode::Stack);
//! assert_eq!(config.segmenter.max_token_len, 255);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Longest token, in characters, the segmenter reads before closing it
pub const MAX_TOKEN_LEN: usize = 255;

/// How text is cut into tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentMode {
    /// Longest dictionary words, unknown syllables as fallback
    #[default]
    Word,
    /// One token per syllable
    Syllable,
    /// One token per syllable, ill-formed unknown syllables split into stacks
    Stack,
}

impl std::str::FromStr for SegmentMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "word" => Ok(SegmentMode::Word),
            "syllable" => Ok(SegmentMode::Syllable),
            "stack" => Ok(SegmentMode::Stack),
            other => Err(format!("unknown segmentation mode `{other}`")),
        }
    }
}

/// Segmenter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    pub mode: SegmentMode,
    /// Rewrite dictionary matches with their lemmatization command
    pub lemmatize: bool,
    /// Maximum token length in characters (at least 1)
    pub max_token_len: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        SegmenterConfig {
            mode: SegmentMode::Word,
            lemmatize: true,
            max_token_len: MAX_TOKEN_LEN,
        }
    }
}

impl SegmenterConfig {
    /// Maximum token length, clamped to at least one character
    pub fn token_cap(&self) -> usize {
        self.max_token_len.max(1)
    }
}

/// Token modifiers applied after segmentation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifierConfig {
    /// Remove affixed particles (འི, འོ, འམ...) from syllables
    pub strip_affixes: bool,
    /// Normalize the nominalizers བ/བོ to པ/པོ
    pub normalize_pa_ba: bool,
    /// Drop particles listed as stop words
    pub remove_stop_words: bool,
}

/// Settings of the whole analysis: character filters, segmenter, modifiers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub segmenter: SegmenterConfig,
    pub modifiers: ModifierConfig,
    /// Normalize Tibetan characters before segmentation
    pub normalize_chars: bool,
    /// Insert the tseks missing between merged Old Tibetan syllables
    pub split_merged_syllables: bool,
}

impl AnalyzerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("reading configuration {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.segmenter.mode, SegmentMode::Word);
        assert!(config.segmenter.lemmatize);
        assert_eq!(config.segmenter.max_token_len, MAX_TOKEN_LEN);
        assert!(!config.modifiers.strip_affixes);
        assert!(!config.normalize_chars);
    }

    #[test]
    fn test_partial_json() {
        let config = AnalyzerConfig::from_json_str(
            r#"{"normalize_chars": true, "modifiers": {"normalize_pa_ba": true}}"#,
        )
        .unwrap();
        assert!(config.normalize_chars);
        assert!(config.modifiers.normalize_pa_ba);
        assert!(!config.modifiers.strip_affixes);
        assert_eq!(config.segmenter, SegmenterConfig::default());
    }

    #[test]
    fn test_invalid_json() {
        let err = AnalyzerConfig::from_json_str(r#"{"segmenter": {"mode": "sentence"}}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_token_cap_is_clamped() {
        let config = SegmenterConfig {
            max_token_len: 0,
            ..Default::default()
        };
        assert_eq!(config.token_cap(), 1);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("Stack".parse::<SegmentMode>(), Ok(SegmentMode::Stack));
        assert!("sentence".parse::<SegmentMode>().is_err());
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analyzer.json");
        std::fs::write(&path, r#"{"segmenter": {"mode": "syllable"}}"#).unwrap();
        let config = AnalyzerConfig::from_path(&path).unwrap();
        assert_eq!(config.segmenter.mode, SegmentMode::Syllable);
    }
}
