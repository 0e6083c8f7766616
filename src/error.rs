// error.rs - Error types for spikeclass

use thiserror::Error;

/// What made a raw nucleotide string unusable
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceIssue {
    #[error("sequence is empty")]
    Empty,

    #[error("invalid nucleotide '{character}' at position {position}")]
    InvalidSymbol { character: char, position: usize },
}

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Invalid sequence: {0}")]
    InvalidSequence(#[from] SequenceIssue),

    #[error("Sequence of length {length} is too short to extract window {start}-{end}")]
    OutOfRange {
        length: usize,
        start: usize,
        end: usize,
    },

    #[error("Empty {which} sequence")]
    EmptySequence { which: &'static str },

    #[error("Invalid alignment: {0}")]
    InvalidAlignment(String),

    #[error("Signature table is empty")]
    EmptySignatureTable,

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Duplicate variant name in signature table: {0}")]
    DuplicateVariant(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cannot reconstruct sequence: {0}")]
    Reconstruction(String),

    #[error("FASTA error: {0}")]
    Fasta(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ClassifierError>;
