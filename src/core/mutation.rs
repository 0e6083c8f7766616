// mutation.rs - Mutation events extracted from an alignment

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::alignment::Alignment;
use crate::data::Sequence;
use crate::error::{ClassifierError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Substitution,
    Insertion,
    Deletion,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Substitution => "substitution",
            MutationKind::Insertion => "insertion",
            MutationKind::Deletion => "deletion",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single mutation event in reference coordinates.
///
/// `position` is 1-based on the ungapped reference. Substitutions and
/// deletions start at the first affected reference base; an insertion sits
/// after reference base `position` (0 = before the first base).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mutation {
    pub kind: MutationKind,
    pub position: usize,
    pub reference_bases: Option<String>,
    pub query_bases: Option<String>,
}

impl Mutation {
    pub fn substitution(position: usize, reference: u8, query: u8) -> Self {
        Self {
            kind: MutationKind::Substitution,
            position,
            reference_bases: Some((reference as char).to_string()),
            query_bases: Some((query as char).to_string()),
        }
    }

    pub fn insertion(position: usize, bases: &str) -> Self {
        Self {
            kind: MutationKind::Insertion,
            position,
            reference_bases: None,
            query_bases: Some(bases.to_string()),
        }
    }

    pub fn deletion(position: usize, bases: &str) -> Self {
        Self {
            kind: MutationKind::Deletion,
            position,
            reference_bases: Some(bases.to_string()),
            query_bases: None,
        }
    }

    /// Number of bases the event covers
    pub fn len(&self) -> usize {
        match self.kind {
            MutationKind::Deletion => self.reference_bases.as_ref().map_or(0, |b| b.len()),
            _ => self.query_bases.as_ref().map_or(0, |b| b.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Last reference base touched (for insertions, the anchor base)
    pub fn end_position(&self) -> usize {
        match self.kind {
            MutationKind::Deletion => self.position + self.len().saturating_sub(1),
            _ => self.position,
        }
    }

    /// HGVS-like notation: `C4G`, `3del`, `467_472del`, `3_4insAT`
    pub fn notation(&self) -> String {
        match self.kind {
            MutationKind::Substitution => format!(
                "{}{}{}",
                self.reference_bases.as_deref().unwrap_or("?"),
                self.position,
                self.query_bases.as_deref().unwrap_or("?")
            ),
            MutationKind::Deletion if self.len() > 1 => {
                format!("{}_{}del", self.position, self.end_position())
            }
            MutationKind::Deletion => format!("{}del", self.position),
            MutationKind::Insertion => format!(
                "{}_{}ins{}",
                self.position,
                self.position + 1,
                self.query_bases.as_deref().unwrap_or("")
            ),
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.notation())
    }
}

/// Per-kind mutation tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationCounts {
    pub substitutions: usize,
    pub insertions: usize,
    pub deletions: usize,
}

impl MutationCounts {
    pub fn from_mutations(mutations: &[Mutation]) -> Self {
        let mut counts = Self::default();
        for m in mutations {
            match m.kind {
                MutationKind::Substitution => counts.substitutions += 1,
                MutationKind::Insertion => counts.insertions += 1,
                MutationKind::Deletion => counts.deletions += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.substitutions + self.insertions + self.deletions
    }
}

/// Walk an alignment and emit its mutation events in ascending reference order.
///
/// Consecutive gap columns of the same kind are merged into one multi-base
/// insertion or deletion; a matching, substituted or opposite-gap column ends the run.
pub fn extract_mutations(alignment: &Alignment) -> Vec<Mutation> {
    let mut mutations: Vec<Mutation> = Vec::new();
    let mut ref_pos = 0usize;
    // Kind of the indel run the previous column belonged to, if any
    let mut open_run: Option<MutationKind> = None;

    for column in alignment.columns() {
        match (column.reference, column.query) {
            (Some(r), Some(q)) => {
                ref_pos += 1;
                open_run = None;
                if r != q {
                    mutations.push(Mutation::substitution(ref_pos, r, q));
                }
            }
            (Some(r), None) => {
                ref_pos += 1;
                match (open_run, mutations.last_mut()) {
                    (Some(MutationKind::Deletion), Some(last)) if last.end_position() + 1 == ref_pos => {
                        if let Some(bases) = last.reference_bases.as_mut() {
                            bases.push(r as char);
                        }
                    }
                    _ => mutations.push(Mutation::deletion(ref_pos, &(r as char).to_string())),
                }
                open_run = Some(MutationKind::Deletion);
            }
            (None, Some(q)) => {
                match (open_run, mutations.last_mut()) {
                    (Some(MutationKind::Insertion), Some(last)) if last.position == ref_pos => {
                        if let Some(bases) = last.query_bases.as_mut() {
                            bases.push(q as char);
                        }
                    }
                    _ => mutations.push(Mutation::insertion(ref_pos, &(q as char).to_string())),
                }
                open_run = Some(MutationKind::Insertion);
            }
            (None, None) => {}
        }
    }

    mutations
}

/// Rebuild a query from the reference and its mutation list.
///
/// Mutations must be in the order [`extract_mutations`] produces them.
pub fn apply_mutations(reference: &Sequence, mutations: &[Mutation]) -> Result<Sequence> {
    let r = reference.as_bytes();
    let mut out = Vec::with_capacity(r.len());
    // Number of reference bases already consumed
    let mut cursor = 0usize;

    for m in mutations {
        let (start, consumed) = match m.kind {
            MutationKind::Substitution | MutationKind::Deletion => {
                if m.position == 0 {
                    return Err(ClassifierError::Reconstruction(format!(
                        "{} at position 0",
                        m.notation()
                    )));
                }
                (m.position - 1, m.reference_bases.as_ref().map_or(0, |b| b.len()))
            }
            MutationKind::Insertion => (m.position, 0),
        };

        if start < cursor || start + consumed > r.len() {
            return Err(ClassifierError::Reconstruction(format!(
                "{} overlaps a previous event or lies outside the {} bp reference",
                m.notation(),
                r.len()
            )));
        }
        if let Some(expected) = m.reference_bases.as_deref() {
            if expected.as_bytes() != &r[start..start + consumed] {
                return Err(ClassifierError::Reconstruction(format!(
                    "{} expects reference bases {} but the reference has {}",
                    m.notation(),
                    expected,
                    String::from_utf8_lossy(&r[start..start + consumed])
                )));
            }
        }

        out.extend_from_slice(&r[cursor..start]);
        if let Some(bases) = m.query_bases.as_deref() {
            out.extend_from_slice(bases.as_bytes());
        }
        cursor = start + consumed;
    }

    out.extend_from_slice(&r[cursor..]);
    Sequence::from_normalized(out)
}
