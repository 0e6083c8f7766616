// alignment.rs - Scoring configuration and global (Needleman-Wunsch) alignment

use serde::{Deserialize, Serialize};

use crate::data::Sequence;
use crate::error::{ClassifierError, Result};

/// Gap symbol used when rendering aligned strings
pub const GAP: u8 = b'-';

/// Scoring scheme for global alignment.
///
/// `mismatch_penalty` is added to the score (so it is zero or negative);
/// `gap_open` is a positive magnitude subtracted once per gap column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    pub match_score: i32,
    pub mismatch_penalty: i32,
    pub gap_open: i32,
    pub description: Option<String>,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            match_score: 1,
            mismatch_penalty: -1,
            gap_open: 2,
            description: Some("Default DNA alignment parameters".to_string()),
        }
    }
}

impl AlignmentConfig {
    /// Create configuration from mode string
    pub fn from_mode(mode: &str) -> std::result::Result<Self, String> {
        match mode {
            "dna" => Ok(Self {
                match_score: 1,
                mismatch_penalty: -1,
                gap_open: 2,
                description: Some("Standard DNA alignment".to_string()),
            }),
            "dna-strict" => Ok(Self {
                match_score: 2,
                mismatch_penalty: -2,
                gap_open: 5,
                description: Some("Strict DNA alignment (higher gap penalty)".to_string()),
            }),
            "dna-permissive" => Ok(Self {
                match_score: 2,
                mismatch_penalty: -1,
                gap_open: 1,
                description: Some("Permissive DNA alignment (cheap gaps)".to_string()),
            }),
            _ => Err(format!("Unknown alignment mode: {}", mode)),
        }
    }

    /// Create custom configuration
    pub fn custom(match_score: i32, mismatch_penalty: i32, gap_open: i32) -> Self {
        Self {
            match_score,
            mismatch_penalty,
            gap_open,
            description: Some("Custom alignment parameters".to_string()),
        }
    }

    /// Check that the scores describe a sensible global alignment.
    ///
    /// A single mismatch must score strictly better than the two gap columns
    /// that could replace it, otherwise every point mutation turns into an indel pair.
    pub fn validate(&self) -> Result<()> {
        if self.match_score <= 0 {
            return Err(ClassifierError::InvalidConfig(format!(
                "match_score must be positive, got {}",
                self.match_score
            )));
        }
        if self.mismatch_penalty > 0 {
            return Err(ClassifierError::InvalidConfig(format!(
                "mismatch_penalty must be zero or negative, got {}",
                self.mismatch_penalty
            )));
        }
        if self.gap_open <= 0 {
            return Err(ClassifierError::InvalidConfig(format!(
                "gap_open must be a positive penalty, got {}",
                self.gap_open
            )));
        }
        if i64::from(self.mismatch_penalty) <= -2 * i64::from(self.gap_open) {
            return Err(ClassifierError::InvalidConfig(format!(
                "mismatch_penalty {} is not better than two gaps ({}); substitutions would be split into indels",
                self.mismatch_penalty,
                -2 * i64::from(self.gap_open)
            )));
        }
        Ok(())
    }

    #[inline]
    fn substitution(&self, a: u8, b: u8) -> i64 {
        if a == b {
            i64::from(self.match_score)
        } else {
            i64::from(self.mismatch_penalty)
        }
    }
}

/// One column of an alignment: a reference symbol and a query symbol, either of which may be a gap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentColumn {
    pub reference: Option<u8>,
    pub query: Option<u8>,
}

impl AlignmentColumn {
    pub fn is_match(&self) -> bool {
        matches!((self.reference, self.query), (Some(r), Some(q)) if r == q)
    }

    pub fn is_gap(&self) -> bool {
        self.reference.is_none() || self.query.is_none()
    }
}

/// Summary statistics over an alignment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentStats {
    pub matches: usize,
    pub mismatches: usize,
    pub indel_events: usize,
    pub indel_bases: usize,
    pub alignment_length: usize,
    pub identity_percent: f64,
}

/// A global alignment of a query against a reference.
///
/// Never holds a column with gaps on both sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    columns: Vec<AlignmentColumn>,
    score: i64,
}

impl Alignment {
    /// Build an alignment from two gapped rows of equal length (`-` marks a gap)
    pub fn from_rows(reference_row: &str, query_row: &str, config: &AlignmentConfig) -> Result<Self> {
        let r = reference_row.as_bytes();
        let q = query_row.as_bytes();
        if r.len() != q.len() {
            return Err(ClassifierError::InvalidAlignment(format!(
                "aligned rows differ in length ({} vs {})",
                r.len(),
                q.len()
            )));
        }

        let mut columns = Vec::with_capacity(r.len());
        let mut score = 0;
        for (i, (&rb, &qb)) in r.iter().zip(q.iter()).enumerate() {
            let column = AlignmentColumn {
                reference: (rb != GAP).then(|| rb.to_ascii_uppercase()),
                query: (qb != GAP).then(|| qb.to_ascii_uppercase()),
            };
            score += match (column.reference, column.query) {
                (Some(a), Some(b)) => config.substitution(a, b),
                (None, None) => {
                    return Err(ClassifierError::InvalidAlignment(format!(
                        "aligned column {} is a gap on both rows",
                        i + 1
                    )))
                }
                _ => -i64::from(config.gap_open),
            };
            columns.push(column);
        }
        Ok(Self { columns, score })
    }

    pub fn columns(&self) -> &[AlignmentColumn] {
        &self.columns
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Reference row with `-` for gaps
    pub fn reference_aligned(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.reference.unwrap_or(GAP) as char)
            .collect()
    }

    /// Query row with `-` for gaps
    pub fn query_aligned(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.query.unwrap_or(GAP) as char)
            .collect()
    }

    /// Match line for display: `|` identical, `.` mismatch, space for gaps
    pub fn match_line(&self) -> String {
        self.columns
            .iter()
            .map(|c| {
                if c.is_match() {
                    '|'
                } else if c.is_gap() {
                    ' '
                } else {
                    '.'
                }
            })
            .collect()
    }

    /// Compute alignment statistics; runs of gap columns count as one indel event
    pub fn stats(&self) -> AlignmentStats {
        let mut matches = 0;
        let mut mismatches = 0;
        let mut indel_events = 0;
        let mut indel_bases = 0;
        let mut in_gap = false;

        for column in &self.columns {
            if column.is_gap() {
                if !in_gap {
                    indel_events += 1;
                    in_gap = true;
                }
                indel_bases += 1;
            } else {
                in_gap = false;
                if column.is_match() {
                    matches += 1;
                } else {
                    mismatches += 1;
                }
            }
        }

        let identity_percent = if self.columns.is_empty() {
            0.0
        } else {
            matches as f64 * 100.0 / self.columns.len() as f64
        };

        AlignmentStats {
            matches,
            mismatches,
            indel_events,
            indel_bases,
            alignment_length: self.columns.len(),
            identity_percent,
        }
    }
}

// Traceback moves, stored one byte per matrix cell
const DIAG: u8 = 0;
const UP: u8 = 1;
const LEFT: u8 = 2;

/// Globally align `query` against `reference`.
///
/// Scores are kept in two rolling rows; the traceback directions live in one
/// owned `(n+1) x (m+1)` byte matrix walked back from the bottom-right corner
/// by index. Equal-scoring moves are preferred in the order diagonal, up
/// (reference base against a query gap), left (query base against a reference gap).
pub fn align(reference: &Sequence, query: &Sequence, config: &AlignmentConfig) -> Result<Alignment> {
    if reference.is_empty() {
        return Err(ClassifierError::EmptySequence { which: "reference" });
    }
    if query.is_empty() {
        return Err(ClassifierError::EmptySequence { which: "query" });
    }

    let r = reference.as_bytes();
    let q = query.as_bytes();
    let n = r.len();
    let m = q.len();
    let width = m + 1;
    // Scores are i64: any i32 scheme times any sequence length fits
    let gap = i64::from(config.gap_open);

    let mut trace = vec![DIAG; (n + 1) * width];
    let mut prev: Vec<i64> = (0..=m).map(|j| -(j as i64) * gap).collect();
    let mut curr = vec![0i64; width];

    for j in 1..=m {
        trace[j] = LEFT;
    }

    for i in 1..=n {
        curr[0] = -(i as i64) * gap;
        trace[i * width] = UP;
        let rb = r[i - 1];

        for j in 1..=m {
            let diag = prev[j - 1] + config.substitution(rb, q[j - 1]);
            let up = prev[j] - gap;
            let left = curr[j - 1] - gap;

            let (best, dir) = if diag >= up && diag >= left {
                (diag, DIAG)
            } else if up >= left {
                (up, UP)
            } else {
                (left, LEFT)
            };
            curr[j] = best;
            trace[i * width + j] = dir;
        }

        std::mem::swap(&mut prev, &mut curr);
    }

    let score = prev[m];

    let mut columns = Vec::with_capacity(n.max(m) + n.min(m) / 8);
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        match trace[i * width + j] {
            DIAG => {
                columns.push(AlignmentColumn {
                    reference: Some(r[i - 1]),
                    query: Some(q[j - 1]),
                });
                i -= 1;
                j -= 1;
            }
            UP => {
                columns.push(AlignmentColumn {
                    reference: Some(r[i - 1]),
                    query: None,
                });
                i -= 1;
            }
            _ => {
                columns.push(AlignmentColumn {
                    reference: None,
                    query: Some(q[j - 1]),
                });
                j -= 1;
            }
        }
    }
    columns.reverse();

    log::debug!(
        "Aligned {} bp query against {} bp reference: score {}, {} columns",
        m,
        n,
        score,
        columns.len()
    );

    Ok(Alignment { columns, score })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::normalize;

    fn seq(s: &str) -> Sequence {
        normalize(s, false).unwrap()
    }

    fn align_default(r: &str, q: &str) -> Alignment {
        align(&seq(r), &seq(q), &AlignmentConfig::default()).unwrap()
    }

    #[test]
    fn test_self_alignment_is_gap_free() {
        let s = "ATGTTTGTTTTTCTTGTTTTATTGCCACTAGTCTCTAGTCAGTGTGTTAATCTTACAACCAGAACTCAATTACCCCCTGCATACACT";
        let aln = align_default(s, s);
        assert_eq!(aln.len(), s.len());
        assert!(aln.columns().iter().all(|c| c.is_match()));
        assert_eq!(aln.score(), s.len() as i64);
        assert_eq!(aln.reference_aligned(), s);
        assert_eq!(aln.query_aligned(), s);
    }

    #[test]
    fn test_substitution_preferred_over_indels() {
        let aln = align_default("ATGC", "ATGG");
        assert_eq!(aln.reference_aligned(), "ATGC");
        assert_eq!(aln.query_aligned(), "ATGG");
        assert_eq!(aln.score(), 2);
        assert_eq!(aln.match_line(), "|||.");
    }

    #[test]
    fn test_deletion_alignment() {
        let aln = align_default("ATGC", "ATC");
        assert_eq!(aln.reference_aligned(), "ATGC");
        assert_eq!(aln.query_aligned(), "AT-C");
        assert_eq!(aln.score(), 1);
    }

    #[test]
    fn test_insertion_alignment() {
        let aln = align_default("ATGC", "ATGAC");
        assert_eq!(aln.reference_aligned(), "ATG-C");
        assert_eq!(aln.query_aligned(), "ATGAC");
    }

    #[test]
    fn test_tie_break_prefers_diagonal_then_up() {
        // "AA" vs "A" scores -1 whichever A is paired; the diagonal move is
        // taken first from the bottom-right cell, so the trailing A pairs
        let aln = align_default("AA", "A");
        assert_eq!(aln.reference_aligned(), "AA");
        assert_eq!(aln.query_aligned(), "-A");

        let again = align_default("AA", "A");
        assert_eq!(aln, again);
    }

    #[test]
    fn test_alignment_invariants() {
        let cases = [
            ("ACGTACGTAC", "ACGTTACGAC"),
            ("AAAA", "TTTTTTTT"),
            ("GATTACA", "GCATGCT"),
            ("A", "ACGTACGT"),
            ("ACGTACGT", "T"),
        ];
        for (r, q) in cases {
            let aln = align_default(r, q);
            assert!(aln.len() >= r.len().max(q.len()));
            assert!(aln.columns().iter().all(|c| c.reference.is_some() || c.query.is_some()));
            assert_eq!(aln.reference_aligned().replace('-', ""), r);
            assert_eq!(aln.query_aligned().replace('-', ""), q);
        }
    }

    #[test]
    fn test_empty_sequences_rejected() {
        let full = seq("ACGT");
        let empty = Sequence::from_normalized(Vec::new()).unwrap();
        let config = AlignmentConfig::default();

        assert!(matches!(
            align(&empty, &full, &config),
            Err(ClassifierError::EmptySequence { which: "reference" })
        ));
        assert!(matches!(
            align(&full, &empty, &config),
            Err(ClassifierError::EmptySequence { which: "query" })
        ));
    }

    #[test]
    fn test_from_rows() {
        let config = AlignmentConfig::default();
        let aln = Alignment::from_rows("AT-C", "atgc", &config).unwrap();
        assert_eq!(aln.query_aligned(), "ATGC");
        assert_eq!(aln.score(), 1);
        assert_eq!(aln, Alignment::from_rows("AT-C", "ATGC", &config).unwrap());

        assert!(Alignment::from_rows("AT", "A", &config).is_err());
        assert!(Alignment::from_rows("A-", "A-", &config).is_err());

        // Same rows the aligner produces for this pair
        let computed = align(&seq("ATGC"), &seq("ATC"), &config).unwrap();
        let rebuilt = Alignment::from_rows(&computed.reference_aligned(), &computed.query_aligned(), &config).unwrap();
        assert_eq!(computed, rebuilt);
    }

    #[test]
    fn test_stats() {
        let aln = align_default("ATGCATGC", "ATGATGGC");
        let stats = aln.stats();
        assert_eq!(stats.alignment_length, aln.len());
        assert_eq!(
            stats.matches + stats.mismatches + stats.indel_bases,
            stats.alignment_length
        );

        let del = align_default("ATGC", "ATC").stats();
        assert_eq!(del.matches, 3);
        assert_eq!(del.indel_events, 1);
        assert_eq!(del.indel_bases, 1);
        assert!((del.identity_percent - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_config_presets_and_validation() {
        assert!(AlignmentConfig::default().validate().is_ok());
        for mode in ["dna", "dna-strict", "dna-permissive"] {
            let config = AlignmentConfig::from_mode(mode).unwrap();
            assert!(config.validate().is_ok(), "preset {} should validate", mode);
        }
        assert!(AlignmentConfig::from_mode("protein").is_err());

        assert!(AlignmentConfig::custom(0, -1, 2).validate().is_err());
        assert!(AlignmentConfig::custom(1, 1, 2).validate().is_err());
        assert!(AlignmentConfig::custom(1, -1, 0).validate().is_err());
        // A mismatch costing as much as two gaps is rejected
        assert!(AlignmentConfig::custom(1, -4, 2).validate().is_err());
        assert!(AlignmentConfig::custom(1, -3, 2).validate().is_ok());
    }

    #[test]
    fn test_large_penalties_do_not_overflow() {
        let gap_open = i32::MAX / 2;
        let config = AlignmentConfig::custom(1, -1, gap_open);
        assert!(config.validate().is_ok());
        // Extreme values are compared without overflowing
        assert!(AlignmentConfig::custom(1, i32::MIN, i32::MAX).validate().is_ok());
        assert!(AlignmentConfig::custom(1, i32::MIN, i32::MAX / 2 + 1).validate().is_err());

        let reference: String = "ACGTTGCAAT".repeat(240);
        let query = &reference[..2200];
        let aln = align(&seq(&reference), &seq(query), &config).unwrap();

        // Query is a prefix: 2200 matches, 200 trailing deletions
        assert_eq!(aln.len(), 2400);
        assert_eq!(aln.stats().matches, 2200);
        assert_eq!(aln.score(), 2200 - 200 * i64::from(gap_open));
        let rebuilt = Alignment::from_rows(&aln.reference_aligned(), &aln.query_aligned(), &config).unwrap();
        assert_eq!(rebuilt.score(), aln.score());
    }
}
