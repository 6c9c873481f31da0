//! # bo-wordseg
//!
//! A Tibetan word segmenter written in Rust.
//!
//! Tibetan is written without spaces between words; syllables are separated by
//! a tsek (་). This library finds word boundaries by maximal matching against a
//! dictionary automaton, falls back to syllables (or stacks) for unknown text,
//! and can rewrite matched words into their lemma. Tokens carry the byte offsets
//! of the text they were read from, even when character filters changed it.
//!
//! ## Quick Start
//!
//! ```rust
//! use bo_wordseg::{Tokenizer, TrieBuilder};
//!
//! // Build a trie from dictionary lines: `<surface form> <command>`
//! let mut builder = TrieBuilder::new();
//! builder.add_lines("བཀྲ་ཤིས X\nབདེ་ལེགས X\nཐོབ་པར >A").unwrap();
//! let trie = builder.build();
//!
//! // Create tokenizer and tokenize text
//! let tokenizer = Tokenizer::new(trie);
//! let tokens = tokenizer.tokenize("བཀྲ་ཤིས་བདེ་ལེགས་ཐོབ་པར་ཤོག").unwrap();
//!
//! let words: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
//! assert_eq!(words, ["བཀྲ་ཤིས", "བདེ་ལེགས", "ཐོབ་པ", "ཤོག"]);
//! ```
//!
//! ## Streaming
//!
//! The segmenter pulls characters from any [`CharSource`], so large inputs can
//! be read through a [`ReaderSource`] without being loaded in memory:
//!
//! ```rust
//! use bo_wordseg::{ReaderSource, Tokenizer, Trie};
//!
//! let tokenizer = Tokenizer::new(Trie::new());
//! let input = "ཕུན་སུམ་ཚོགས།".as_bytes();
//! for token in tokenizer.segment(ReaderSource::new(input)) {
//!     let token = token.unwrap();
//!     println!("{}\t{}\t{}", token.text, token.start, token.end);
//! }
//! ```
//!
//! ## Compiled dictionaries
//!
//! Tries are written to disk with [`Trie::store`] and read back with
//! [`Trie::load`], which is much faster than compiling the dictionary lines
//! again. The `bo-wordseg build` command does the same from the command line.

pub mod analyzer;
pub mod char_categories;
pub mod char_filter;
pub mod config;
pub mod cursor;
pub mod error;
pub mod lemma;
pub mod modifiers;
pub mod stack;
pub mod token;
pub mod tokenizer;
pub mod trie;

// Re-export main types for convenience
pub use analyzer::Analyzer;
pub use char_categories::{cluster_class, is_boundary, is_well_formed_stack, is_word_char, ClusterClass, TSEK};
pub use char_filter::{CharMap, CharSource, FilteredText, MappingSource, MergedSyllableSplitter, OffsetMap, ReaderSource, StrSource};
pub use config::{AnalyzerConfig, ModifierConfig, SegmentMode, SegmenterConfig};
pub use cursor::Cursor;
pub use error::{Error, Result};
pub use lemma::{Command, SyllableLemmatizer};
pub use modifiers::{apply_modifiers, StopWords};
pub use stack::split_stacks;
pub use token::{Confidence, Token};
pub use tokenizer::{Segmenter, SegmenterState, Tokenizer};
pub use trie::{CommandIndex, Row, RowRef, Trie, TrieBuilder};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
