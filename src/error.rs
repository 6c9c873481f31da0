//! Error types for dictionary compilation and segmentation.
//!
//! Unknown or malformed lemmatization commands are not errors: they decode to
//! [`Command::Keep`](crate::lemma::Command::Keep) and the token passes through.

use thiserror::Error;

/// Errors raised by this crate
#[derive(Debug, Error)]
pub enum Error {
    /// A dictionary source line has no space between the form and its command
    #[error("malformed dictionary line {line_number}: `{line}` has no space between form and command")]
    MalformedLine {
        /// 1-based line number in the source
        line_number: usize,
        /// The offending line
        line: String,
    },

    /// Reading the input or a file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A compiled dictionary could not be encoded or decoded
    #[error("invalid compiled dictionary: {0}")]
    Artifact(#[from] bincode::Error),

    /// A compiled dictionary was written by an incompatible version
    #[error("compiled dictionary has format version {found}, expected {expected}")]
    IncompatibleArtifact {
        /// Version found in the artifact
        found: u32,
        /// Version this build reads
        expected: u32,
    },

    /// A rewrite pattern did not compile
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A configuration file could not be parsed
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type of this crate
pub type Result<T> = std::result::Result<T, Error>;
