//! Token post-processing and modification.
//!
//! This module provides filters applied to tokens after segmentation:
//! removing affixed particles, normalizing the nominalizers བ/བོ, and
//! dropping stop words. Modifiers only rewrite the token text; offsets
//! still point to the source span.

use std::collections::HashSet;
use std::io::BufRead;

use crate::char_categories::TSEK;
use crate::config::ModifierConfig;
use crate::error::Result;
use crate::lemma::ACHUNG;
use crate::token::Token;

/// Affixed particles, longest first, with the token length they require
const AFFIXES: [(&[&str], usize); 3] = [
    (&["འིའོ", "འིའམ", "འིའང", "འོའམ", "འོའང"], 4),
    (&["འིས"], 3),
    (&["འི", "འོ", "འམ", "འང"], 2),
];

fn is_vowel_sign(c: char) -> bool {
    ('\u{0F71}'..='\u{0F7D}').contains(&c) || c == '\u{0F80}'
}

fn is_bare_consonant(c: char) -> bool {
    ('\u{0F40}'..='\u{0F6C}').contains(&c)
}

/// Remove an affixed particle from a syllable.
///
/// Returns `None` when nothing is affixed. When the particle starts with འ
/// and what is left is a prefix and a root letter only (as in དགའི), the འ
/// belongs to the stem and is kept: དགའི gives དགའ but གའམ gives ག.
pub fn strip_affixed(text: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    let drop = AFFIXES
        .iter()
        .find(|(particles, n)| len > *n && particles.iter().any(|p| text.ends_with(p)))
        .map(|&(_, n)| n)
        .or_else(|| {
            if len <= 2 {
                return None;
            }
            let (prev, last) = (chars[len - 2], chars[len - 1]);
            match last {
                // ལེའུར, བཞིའ
                'ར' | ACHUNG if is_vowel_sign(prev) => Some(1),
                // ཀུནད
                'ད' if matches!(prev, 'ན' | 'ར' | 'ལ') => Some(1),
                _ => None,
            }
        })?;

    let stem = &chars[..len - drop];
    let mut stripped: String = stem.iter().collect();
    if drop > 1 && chars[len - drop] == ACHUNG && stem.len() == 2 && stem.iter().all(|&c| is_bare_consonant(c)) {
        stripped.push(ACHUNG);
    }
    Some(stripped)
}

/// Normalize the nominalizers: བ becomes པ and བོ becomes པོ
pub fn normalize_pa_ba(text: &str) -> Option<&'static str> {
    match text {
        "བ" => Some("པ"),
        "བོ" => Some("པོ"),
        _ => None,
    }
}

/// Particles dropped by default
const DEFAULT_STOP_WORDS: &[&str] = &[
    "གི", "ཀྱི", "གྱི", "ཡི", "གིས", "ཀྱིས", "གྱིས", "ཡིས", "ཀྱང", "ཡང", "འང", "སྟེ", "ཏེ", "མམ", "རམ",
    "སམ", "ཏམ", "ནོ", "ཏོ", "གིན", "ཀྱིན", "གྱིན", "ཅིང", "ཞིང", "ཤིང", "ཅིག", "ཞིག", "ཤིག", "ཅེས",
    "ཞེས", "ཏུ", "དུ", "སུ", "རུ",
];

/// A set of stop words
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopWords {
    words: HashSet<String>,
}

impl Default for StopWords {
    fn default() -> Self {
        StopWords::from_words(DEFAULT_STOP_WORDS.iter().copied())
    }
}

impl StopWords {
    /// An empty set
    pub fn empty() -> Self {
        StopWords { words: HashSet::new() }
    }

    pub fn from_words<'a>(words: impl IntoIterator<Item = &'a str>) -> Self {
        let mut set = StopWords::empty();
        for word in words {
            set.insert(word);
        }
        set
    }

    /// Parse a word list, one word per line. Lines starting with `#` are
    /// comments, a trailing tsek is ignored.
    pub fn parse(text: &str) -> Self {
        let mut set = StopWords::empty();
        for line in text.lines() {
            set.insert_line(line);
        }
        set
    }

    /// Read a word list in the format of [`StopWords::parse`]
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut set = StopWords::empty();
        for line in reader.lines() {
            set.insert_line(&line?);
        }
        log::debug!("loaded {} stop words", set.len());
        Ok(set)
    }

    fn insert_line(&mut self, line: &str) {
        let line = line.trim();
        if !line.starts_with('#') {
            self.insert(line);
        }
    }

    pub fn insert(&mut self, word: &str) {
        let word = word.trim_end_matches(TSEK);
        if !word.is_empty() {
            self.words.insert(word.to_string());
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Run the enabled modifiers on one token. `None` means the token is dropped.
pub fn modify_token(mut token: Token, config: &ModifierConfig, stop_words: &StopWords) -> Option<Token> {
    if config.strip_affixes {
        if let Some(stripped) = strip_affixed(&token.text) {
            token.text = stripped;
        }
    }
    if config.normalize_pa_ba {
        if let Some(normalized) = normalize_pa_ba(&token.text) {
            token.text = normalized.to_string();
        }
    }
    if config.remove_stop_words && stop_words.contains(&token.text) {
        return None;
    }
    Some(token)
}

/// Apply the enabled modifiers to a token list.
///
/// Affixes are stripped first, so that the other modifiers see the stem.
pub fn apply_modifiers(tokens: Vec<Token>, config: &ModifierConfig, stop_words: &StopWords) -> Vec<Token> {
    tokens
        .into_iter()
        .filter_map(|token| modify_token(token, config, stop_words))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Confidence;

    fn strip(text: &str) -> String {
        strip_affixed(text).unwrap_or_else(|| text.to_string())
    }

    #[test]
    fn test_strip_affixed() {
        assert_eq!(strip("དག"), "དག");
        assert_eq!(strip("གའམ"), "ག");
        assert_eq!(strip("གའིའོ"), "ག");
        assert_eq!(strip("དགའ"), "དགའ");
        assert_eq!(strip("དགའི"), "དགའ");
        assert_eq!(strip("དགའིས"), "དགའ");
        assert_eq!(strip("དགའིའོ"), "དགའ");
        assert_eq!(strip("ལེའུར"), "ལེའུ");
        assert_eq!(strip("བཞིའ"), "བཞི");
        assert_eq!(strip("ཀུནད"), "ཀུན");
        assert_eq!(strip("རྒྱལད"), "རྒྱལ");
    }

    #[test]
    fn test_strip_affixed_needs_a_stem() {
        assert_eq!(strip_affixed("འི"), None);
        assert_eq!(strip_affixed("འིས"), None);
        assert_eq!(strip_affixed("ནད"), None);
        assert_eq!(strip_affixed("ཀ"), None);
    }

    #[test]
    fn test_normalize_pa_ba() {
        assert_eq!(normalize_pa_ba("བ"), Some("པ"));
        assert_eq!(normalize_pa_ba("བོ"), Some("པོ"));
        assert_eq!(normalize_pa_ba("བོད"), None);
    }

    #[test]
    fn test_parse_stop_words() {
        let words = StopWords::parse("# particles\nགི་\n\n  ཀྱི\n#ཀྱང\n");
        assert_eq!(words.len(), 2);
        assert!(words.contains("གི"));
        assert!(words.contains("ཀྱི"));
        assert!(!words.contains("ཀྱང"));
        assert!(!words.contains("#ཀྱང"));
    }

    #[test]
    fn test_default_stop_words() {
        let words = StopWords::default();
        assert!(words.contains("ཀྱིས"));
        assert!(!words.contains("ཧ"));
    }

    #[test]
    fn test_apply_modifiers() {
        let tokens = vec![
            Token::new("གསལ", 0, 9, Confidence::Fallback),
            Token::new("བོའི", 9, 21, Confidence::Fallback),
            Token::new("ཀྱིས", 21, 33, Confidence::Fallback),
        ];
        let config = ModifierConfig {
            strip_affixes: true,
            normalize_pa_ba: true,
            remove_stop_words: true,
        };
        let tokens = apply_modifiers(tokens, &config, &StopWords::default());

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].text, "པོ");
        assert_eq!((tokens[1].start, tokens[1].end), (9, 21));
    }

    #[test]
    fn test_disabled_modifiers_keep_tokens() {
        let tokens = vec![Token::new("ཀྱིས", 0, 12, Confidence::Fallback)];
        let tokens = apply_modifiers(tokens, &ModifierConfig::default(), &StopWords::default());
        assert_eq!(tokens[0].text, "ཀྱིས");
    }
}
