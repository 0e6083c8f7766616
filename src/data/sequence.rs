// sequence.rs - Nucleotide sequences and input normalization

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ClassifierError, Result, SequenceIssue};

/// First base of the spike (S) gene on the Wuhan-Hu-1 genome (1-based, inclusive)
pub const SPIKE_START: usize = 21563;
/// Last base of the spike (S) gene on the Wuhan-Hu-1 genome (1-based, inclusive)
pub const SPIKE_END: usize = 25384;

/// An immutable, normalized nucleotide sequence over {A, C, G, T, N}
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sequence {
    bases: Vec<u8>,
}

impl Sequence {
    /// Wrap bytes that are already normalized.
    ///
    /// Fails if any byte falls outside {A, C, G, T, N}; no cleaning is attempted.
    /// Unlike [`normalize`], an empty sequence is accepted here.
    pub fn from_normalized(bases: Vec<u8>) -> Result<Self> {
        if let Some(pos) = bases.iter().position(|b| !matches!(b, b'A' | b'C' | b'G' | b'T' | b'N')) {
            return Err(SequenceIssue::InvalidSymbol {
                character: bases[pos] as char,
                position: pos + 1,
            }
            .into());
        }
        Ok(Self { bases })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bases
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// Number of `N` symbols (ambiguous or unknown bases)
    pub fn ambiguous_count(&self) -> usize {
        self.bases.iter().filter(|&&b| b == b'N').count()
    }

    /// CRC32 of the normalized bases, used to recognize repeated submissions
    pub fn checksum(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.bases);
        hasher.finalize()
    }

    /// Extract a 1-based inclusive window
    pub fn window(&self, start: usize, end: usize) -> Result<Sequence> {
        if start == 0 || end < start || self.bases.len() < end {
            return Err(ClassifierError::OutOfRange {
                length: self.bases.len(),
                start,
                end,
            });
        }
        Ok(Self {
            bases: self.bases[start - 1..end].to_vec(),
        })
    }

    /// Excise the spike gene from a full-genome sequence
    pub fn spike_region(&self) -> Result<Sequence> {
        self.window(SPIKE_START, SPIKE_END)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Bases are always ASCII
        write!(f, "{}", String::from_utf8_lossy(&self.bases))
    }
}

/// How a raw submission relates to the spike-gene coordinate system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputMode {
    /// Input already is the spike gene
    Spike,
    /// Input is a full genome; the spike window is excised
    FullGenome,
    /// Treat input as a full genome when it reaches the end of the spike window
    Auto,
}

impl InputMode {
    /// Resolve the mode for a cleaned sequence of the given length
    pub fn is_full_genome(&self, cleaned_len: usize) -> bool {
        match self {
            InputMode::Spike => false,
            InputMode::FullGenome => true,
            InputMode::Auto => cleaned_len >= SPIKE_END,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            InputMode::Spike => "spike gene only",
            InputMode::FullGenome => "full genome (spike window excised)",
            InputMode::Auto => "auto-detect by length",
        }
    }
}

impl FromStr for InputMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "spike" | "s-gene" => Ok(InputMode::Spike),
            "full-genome" | "genome" | "full" => Ok(InputMode::FullGenome),
            "auto" => Ok(InputMode::Auto),
            _ => Err(format!("Invalid input mode: {}. Use: spike, full-genome, auto", s)),
        }
    }
}

/// Map one IUPAC nucleotide code onto the normalized alphabet.
///
/// Ambiguity codes collapse to `N`, RNA `U` reads as `T`.
fn normalize_symbol(c: u8) -> Option<u8> {
    match c.to_ascii_uppercase() {
        b @ (b'A' | b'C' | b'G' | b'T' | b'N') => Some(b),
        b'U' => Some(b'T'),
        b'R' | b'Y' | b'S' | b'W' | b'K' | b'M' | b'B' | b'D' | b'H' | b'V' => Some(b'N'),
        _ => None,
    }
}

/// Uppercase and validate a raw nucleotide string, dropping whitespace
fn clean(raw: &str) -> Result<Vec<u8>> {
    let mut bases = Vec::with_capacity(raw.len());
    for (i, c) in raw.chars().enumerate() {
        if c.is_ascii_whitespace() {
            continue;
        }
        let normalized = if c.is_ascii() { normalize_symbol(c as u8) } else { None };
        match normalized {
            Some(b) => bases.push(b),
            None => {
                return Err(SequenceIssue::InvalidSymbol {
                    character: c,
                    position: i + 1,
                }
                .into())
            }
        }
    }
    if bases.is_empty() {
        return Err(SequenceIssue::Empty.into());
    }
    Ok(bases)
}

/// Normalize a raw submission into a query sequence.
///
/// Positions in errors are 1-based character offsets into `raw`. With
/// `is_full_genome` the spike window [`SPIKE_START`, `SPIKE_END`] is excised
/// after cleaning.
pub fn normalize(raw: &str, is_full_genome: bool) -> Result<Sequence> {
    let sequence = Sequence { bases: clean(raw)? };
    if is_full_genome {
        sequence.spike_region()
    } else {
        Ok(sequence)
    }
}

/// Normalize with the genome/spike decision taken from an [`InputMode`]
pub fn normalize_with_mode(raw: &str, mode: InputMode) -> Result<Sequence> {
    let sequence = Sequence { bases: clean(raw)? };
    if mode.is_full_genome(sequence.len()) {
        log::debug!("Excising spike window from {} bp genome", sequence.len());
        sequence.spike_region()
    } else {
        Ok(sequence)
    }
}
