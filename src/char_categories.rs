//! Character classification for Tibetan Unicode characters.
//!
//! This module decides which code points take part in words, which one separates
//! syllables, and whether a run of letters forms a single orthographic stack
//! (a base letter with its subjoined letters and vowel sign).
//!
//! Everything here is a pure, total function over `char`: anything outside the
//! Tibetan block simply classifies as [`ClusterClass::Other`].

/// Tsek (syllable separator ་)
pub const TSEK: char = '\u{0F0B}';

/// Visarga (ཿ), which always closes a syllable
pub const VISARGA: char = '\u{0F7F}';

/// Role of a character inside a stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClusterClass {
    /// A letter or digit that can start a stack
    Base,
    /// Sub-joined consonant, or the a-chung (ཱ) that stacks below like one
    SubCons,
    /// Vowel sign
    Vow,
    /// Mark written after the vowel (anusvara, visarga, candrabindu...)
    Mark,
    /// Tsek
    Tsek,
    /// Anything else
    #[default]
    Other,
}

impl ClusterClass {
    /// Check if this class can appear inside a word
    pub fn is_word_part(&self) -> bool {
        matches!(
            self,
            ClusterClass::Base | ClusterClass::SubCons | ClusterClass::Vow | ClusterClass::Mark
        )
    }
}

/// Check if a character is a Tibetan letter or digit.
///
/// Letters and signs are U+0F40..=U+0FBC, digits (including half digits)
/// U+0F20..=U+0F33, plus the syllable ༀ (U+0F00).
pub fn is_word_char(c: char) -> bool {
    ('\u{0F40}'..='\u{0FBC}').contains(&c) || ('\u{0F20}'..='\u{0F33}').contains(&c) || c == '\u{0F00}'
}

/// Check if a character is the syllable separator
pub fn is_boundary(c: char) -> bool {
    c == TSEK
}

/// Get the cluster class of a character
pub fn cluster_class(c: char) -> ClusterClass {
    match c {
        TSEK => ClusterClass::Tsek,
        '\u{0F00}' | '\u{0F20}'..='\u{0F33}' => ClusterClass::Base,
        // consonants, then the head marks (lce tsa can, mchu can, gru can...)
        '\u{0F40}'..='\u{0F6C}' | '\u{0F88}'..='\u{0F8C}' => ClusterClass::Base,
        '\u{0F71}' | '\u{0F8D}'..='\u{0F8F}' | '\u{0F90}'..='\u{0FBC}' => ClusterClass::SubCons,
        '\u{0F72}'..='\u{0F7D}' | '\u{0F80}' | '\u{0F81}' | '\u{0F84}' => ClusterClass::Vow,
        '\u{0F7E}' | '\u{0F7F}' | '\u{0F82}' | '\u{0F83}' | '\u{0F85}'..='\u{0F87}' => {
            ClusterClass::Mark
        }
        _ => ClusterClass::Other,
    }
}

/// Position inside the stack grammar `Base SubCons* Vow? Mark?`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StackState {
    Start,
    AfterBase,
    AfterVowel,
    AfterMark,
}

impl StackState {
    /// Feed one more character; `None` means the stack cannot be extended by it
    pub(crate) fn advance(self, c: char) -> Option<StackState> {
        use ClusterClass::*;
        match (self, cluster_class(c)) {
            (StackState::Start, Base) => Some(StackState::AfterBase),
            (StackState::AfterBase, SubCons) => Some(StackState::AfterBase),
            (StackState::AfterBase, Vow) => Some(StackState::AfterVowel),
            (StackState::AfterBase | StackState::AfterVowel, Mark) => Some(StackState::AfterMark),
            _ => None,
        }
    }

    /// Every state past `Start` closes a valid stack
    pub(crate) fn is_complete(self) -> bool {
        self != StackState::Start
    }
}

/// Check whether `buffer[start..start + len]` is exactly one well-formed stack.
///
/// Out-of-range windows and empty windows are not stacks.
pub fn is_well_formed_stack(buffer: &[char], start: usize, len: usize) -> bool {
    let Some(cluster) = start
        .checked_add(len)
        .and_then(|end| buffer.get(start..end))
    else {
        return false;
    };

    cluster
        .iter()
        .try_fold(StackState::Start, |state, &c| state.advance(c))
        .is_some_and(StackState::is_complete)
}
