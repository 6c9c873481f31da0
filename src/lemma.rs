//! Lemmatization commands attached to dictionary entries.
//!
//! Each accept state of the dictionary automaton points to a command string
//! produced when the dictionary was compiled. The strings are decoded once into
//! [`Command`] when the automaton is loaded and applied to matched tokens.
//!
//! | command        | effect                                   |
//! |----------------|------------------------------------------|
//! | `>A` `>B` `>C` | drop the last 1, 2 or 3 characters       |
//! | `>D`           | replace the last character with འ        |
//! | `/literal`     | replace the whole token with `literal`   |
//! | anything else  | keep the token as it is                  |

use std::borrow::Cow;
use std::sync::Arc;

use crate::token::{Confidence, Token};
use crate::trie::Trie;

/// The a-chung (འ), written back by the `>D` command
pub const ACHUNG: char = 'འ';

/// A decoded lemmatization command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Command {
    /// Drop the given number of trailing characters. A token with no more
    /// than that many characters is left unchanged.
    DropLast(usize),
    /// Replace the last character
    ReplaceLast(char),
    /// Replace the whole token
    ReplaceWhole(String),
    /// Leave the token unchanged
    #[default]
    Keep,
}

impl Command {
    /// Decode a raw command string. Unknown forms decode to [`Command::Keep`].
    pub fn parse(raw: &str) -> Self {
        match raw {
            ">A" => Command::DropLast(1),
            ">B" => Command::DropLast(2),
            ">C" => Command::DropLast(3),
            ">D" => Command::ReplaceLast(ACHUNG),
            _ => match raw.strip_prefix('/') {
                Some(literal) if !literal.is_empty() => Command::ReplaceWhole(literal.to_string()),
                _ => Command::Keep,
            },
        }
    }

    /// Rewrite a token text.
    ///
    /// Commands that would consume the whole token (or more) leave it untouched,
    /// so a broken dictionary can never produce an empty token.
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match self {
            Command::DropLast(n) => match drop_last(text, *n) {
                Some(kept) => Cow::Borrowed(kept),
                None => Cow::Borrowed(text),
            },
            Command::ReplaceLast(c) => match drop_last(text, 1) {
                Some(kept) => {
                    let mut replaced = String::with_capacity(kept.len() + c.len_utf8());
                    replaced.push_str(kept);
                    replaced.push(*c);
                    Cow::Owned(replaced)
                }
                // a single character is replaced as a whole
                None if text.chars().count() == 1 => Cow::Owned(c.to_string()),
                None => Cow::Borrowed(text),
            },
            Command::ReplaceWhole(literal) => Cow::Owned(literal.clone()),
            Command::Keep => Cow::Borrowed(text),
        }
    }
}

/// `text` without its last `n` characters, if at least one character remains
fn drop_last(text: &str, n: usize) -> Option<&str> {
    if n == 0 {
        return Some(text);
    }
    let (cut, _) = text.char_indices().rev().nth(n - 1)?;
    (cut > 0).then(|| &text[..cut])
}

/// Lemmatizer looking whole tokens up in a dictionary.
///
/// Unlike the word segmenter, which lemmatizes the longest match it found, this
/// only rewrites tokens that are exactly a dictionary surface form. It suits
/// syllable-level tokens.
pub struct SyllableLemmatizer {
    trie: Arc<Trie>,
}

impl SyllableLemmatizer {
    /// Create a lemmatizer over a shared dictionary
    pub fn new(trie: Arc<Trie>) -> Self {
        SyllableLemmatizer { trie }
    }

    /// Get the lemma of a text, if the dictionary knows it
    pub fn lemmatize<'a>(&self, text: &'a str) -> Option<Cow<'a, str>> {
        let idx = self.trie.lookup(text)?;
        Some(self.trie.command(idx).apply(text))
    }

    /// Lemmatize tokens in place. Tokens found in the dictionary become
    /// dictionary tokens, even when their command keeps them unchanged.
    pub fn apply(&self, tokens: &mut [Token]) {
        for token in tokens.iter_mut() {
            if let Some(lemma) = self.lemmatize(&token.text) {
                if lemma != token.text.as_str() {
                    token.text = lemma.into_owned();
                }
                token.confidence = Confidence::Dictionary;
            }
        }
    }
}
