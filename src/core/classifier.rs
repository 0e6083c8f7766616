// classifier.rs - Signature matching and variant selection

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::core::mutation::{Mutation, MutationKind};
use crate::error::{ClassifierError, Result};

/// The observable outcome of a mutation, as signatures describe it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SignatureChange {
    /// Reference base replaced by `alternate`
    Substitution { alternate: char },
    /// `length` reference bases removed
    Deletion { length: usize },
    /// `bases` inserted after the anchor position
    Insertion { bases: String },
}

/// A defining mutation of a variant: position plus resulting change.
///
/// Two mutations match when position and outcome are identical; the
/// reference base is not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignatureMutation {
    pub position: usize,
    pub change: SignatureChange,
}

impl SignatureMutation {
    pub fn substitution(position: usize, alternate: char) -> Self {
        Self {
            position,
            change: SignatureChange::Substitution {
                alternate: alternate.to_ascii_uppercase(),
            },
        }
    }

    pub fn deletion(position: usize, length: usize) -> Self {
        Self {
            position,
            change: SignatureChange::Deletion { length },
        }
    }

    pub fn insertion(position: usize, bases: &str) -> Self {
        Self {
            position,
            change: SignatureChange::Insertion {
                bases: bases.to_ascii_uppercase(),
            },
        }
    }

    pub fn kind(&self) -> MutationKind {
        match self.change {
            SignatureChange::Substitution { .. } => MutationKind::Substitution,
            SignatureChange::Deletion { .. } => MutationKind::Deletion,
            SignatureChange::Insertion { .. } => MutationKind::Insertion,
        }
    }

    /// Check the descriptor can occur at all
    pub fn validate(&self) -> Result<()> {
        let ok = match &self.change {
            SignatureChange::Substitution { alternate } => {
                self.position > 0 && matches!(alternate, 'A' | 'C' | 'G' | 'T')
            }
            SignatureChange::Deletion { length } => self.position > 0 && *length > 0,
            SignatureChange::Insertion { bases } => {
                !bases.is_empty() && bases.bytes().all(|b| matches!(b, b'A' | b'C' | b'G' | b'T'))
            }
        };
        if ok {
            Ok(())
        } else {
            Err(ClassifierError::InvalidSignature(format!(
                "invalid signature mutation {}",
                self
            )))
        }
    }
}

impl From<&Mutation> for SignatureMutation {
    fn from(m: &Mutation) -> Self {
        let change = match m.kind {
            MutationKind::Substitution => SignatureChange::Substitution {
                alternate: m
                    .query_bases
                    .as_deref()
                    .and_then(|b| b.chars().next())
                    .unwrap_or('N'),
            },
            MutationKind::Deletion => SignatureChange::Deletion { length: m.len() },
            MutationKind::Insertion => SignatureChange::Insertion {
                bases: m.query_bases.clone().unwrap_or_default(),
            },
        };
        Self {
            position: m.position,
            change,
        }
    }
}

impl fmt::Display for SignatureMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.change {
            SignatureChange::Substitution { alternate } => write!(f, "{}{}", self.position, alternate),
            SignatureChange::Deletion { length: 1 } => write!(f, "{}del", self.position),
            SignatureChange::Deletion { length } => {
                write!(f, "{}_{}del", self.position, self.position + length - 1)
            }
            SignatureChange::Insertion { bases } => {
                write!(f, "{}_{}ins{}", self.position, self.position + 1, bases)
            }
        }
    }
}

/// A named variant and the set of mutations that define it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSignature {
    name: String,
    mutations: BTreeSet<SignatureMutation>,
}

impl VariantSignature {
    /// Build a signature; duplicates collapse, an empty set is rejected
    pub fn new<I>(name: &str, mutations: I) -> Result<Self>
    where
        I: IntoIterator<Item = SignatureMutation>,
    {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClassifierError::InvalidSignature("variant name is empty".to_string()));
        }
        let mutations: BTreeSet<SignatureMutation> = mutations.into_iter().collect();
        if mutations.is_empty() {
            return Err(ClassifierError::InvalidSignature(format!(
                "variant '{}' has no defining mutations",
                name
            )));
        }
        for m in &mutations {
            m.validate()?;
        }
        Ok(Self {
            name: name.to_string(),
            mutations,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Defining mutations in ascending position order
    pub fn mutations(&self) -> impl Iterator<Item = &SignatureMutation> {
        self.mutations.iter()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

/// Read-only table of variant signatures, in a fixed order.
///
/// Built once and shared; nothing mutates it after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureTable {
    signatures: Vec<VariantSignature>,
}

impl SignatureTable {
    /// Build a table, rejecting repeated variant names (case-insensitive)
    pub fn new(signatures: Vec<VariantSignature>) -> Result<Self> {
        let mut seen = HashSet::new();
        for sig in &signatures {
            if !seen.insert(sig.name.to_lowercase()) {
                return Err(ClassifierError::DuplicateVariant(sig.name.clone()));
            }
        }
        Ok(Self { signatures })
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariantSignature> {
        self.signatures.iter()
    }

    pub fn get(&self, name: &str) -> Option<&VariantSignature> {
        self.signatures
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> Vec<&str> {
        self.signatures.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

/// Thresholds applied when selecting a variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Minimum fraction of a signature that must be observed (0.0-1.0)
    pub min_match_fraction: f64,
    /// Minimum absolute number of matched signature mutations
    pub min_matched_mutations: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_match_fraction: 0.5,
            min_matched_mutations: 1,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_match_fraction) {
            return Err(ClassifierError::InvalidConfig(format!(
                "min_match_fraction must be between 0.0 and 1.0, got {}",
                self.min_match_fraction
            )));
        }
        Ok(())
    }
}

/// How well the observed mutations cover one signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantScore {
    pub variant: String,
    pub matched: usize,
    pub total: usize,
    pub score: f64,
    pub matched_mutations: Vec<SignatureMutation>,
}

impl VariantScore {
    /// Compare fractions exactly (matched/total) without going through floats
    fn cmp_fraction(&self, other: &VariantScore) -> Ordering {
        (self.matched * other.total).cmp(&(other.matched * self.total))
    }
}

/// Why no variant was selected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum UnclassifiedReason {
    /// The query is identical to the reference
    NoMutations,
    /// The best signature stays below the configured thresholds
    BelowThreshold,
    /// Several signatures share the highest score
    Tie { variants: Vec<String> },
}

impl fmt::Display for UnclassifiedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnclassifiedReason::NoMutations => f.write_str("no mutations (reference-like)"),
            UnclassifiedReason::BelowThreshold => f.write_str("below threshold"),
            UnclassifiedReason::Tie { variants } => write!(f, "tie: {}", variants.join(" or ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Classification {
    Variant { name: String },
    Unclassified(UnclassifiedReason),
}

impl Classification {
    pub const UNCLASSIFIED: &'static str = "Unclassified";

    /// Selected variant name, or `"Unclassified"`
    pub fn variant_name(&self) -> &str {
        match self {
            Classification::Variant { name } => name,
            Classification::Unclassified(_) => Self::UNCLASSIFIED,
        }
    }

    pub fn is_classified(&self) -> bool {
        matches!(self, Classification::Variant { .. })
    }
}

/// Outcome of classifying one query.
///
/// `matched_mutation_count` and `total_signature_mutations` describe the
/// selected signature, or the top-ranked one (first in table order) when unclassified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub classification: Classification,
    pub matched_mutation_count: usize,
    pub total_signature_mutations: usize,
    pub score: f64,
    pub mutations: Vec<Mutation>,
    pub scores: Vec<VariantScore>,
}

impl ClassificationResult {
    pub fn variant_name(&self) -> &str {
        self.classification.variant_name()
    }
}

fn score_signature(signature: &VariantSignature, observed: &HashSet<SignatureMutation>) -> VariantScore {
    let matched_mutations: Vec<SignatureMutation> = signature
        .mutations()
        .filter(|m| observed.contains(*m))
        .cloned()
        .collect();
    let matched = matched_mutations.len();
    let total = signature.len();
    VariantScore {
        variant: signature.name().to_string(),
        matched,
        total,
        score: matched as f64 / total as f64,
        matched_mutations,
    }
}

/// Resolve signatures sharing the top score.
///
/// One candidate wins when it matched strictly more mutations than every other
/// and their matched sets are all contained in its own; otherwise `None`.
fn nested_leader<'a>(top: &[&'a VariantScore]) -> Option<&'a VariantScore> {
    let leader = *top.iter().max_by_key(|s| s.matched)?;
    let nested = top.iter().filter(|s| !std::ptr::eq(**s, leader)).all(|other| {
        other.matched < leader.matched
            && other
                .matched_mutations
                .iter()
                .all(|m| leader.matched_mutations.contains(m))
    });
    nested.then_some(leader)
}

/// Score every signature against the observed mutations and pick the best.
///
/// A signature is selected if its score is strictly higher than every other
/// signature's, or if among the signatures sharing the top score it matched
/// strictly more mutations and covers all of theirs, and it reaches both
/// configured thresholds. Any other tie at the top is reported, never broken.
pub fn classify(
    observed_mutations: &[Mutation],
    signatures: &SignatureTable,
    config: &ClassifierConfig,
) -> Result<ClassificationResult> {
    if signatures.is_empty() {
        return Err(ClassifierError::EmptySignatureTable);
    }

    let observed: HashSet<SignatureMutation> =
        observed_mutations.iter().map(SignatureMutation::from).collect();

    let scores: Vec<VariantScore> = signatures
        .iter()
        .map(|sig| score_signature(sig, &observed))
        .collect();

    // First maximum in table order; max_by would keep the last one
    let mut best = &scores[0];
    for candidate in &scores[1..] {
        if candidate.cmp_fraction(best) == Ordering::Greater {
            best = candidate;
        }
    }
    let top: Vec<&VariantScore> = scores
        .iter()
        .filter(|s| s.cmp_fraction(best) == Ordering::Equal)
        .collect();
    let leader = nested_leader(&top);
    if let Some(leader) = leader {
        best = leader;
    }

    let classification = if observed_mutations.is_empty() {
        Classification::Unclassified(UnclassifiedReason::NoMutations)
    } else if best.score < config.min_match_fraction || best.matched < config.min_matched_mutations {
        Classification::Unclassified(UnclassifiedReason::BelowThreshold)
    } else if leader.is_none() {
        Classification::Unclassified(UnclassifiedReason::Tie {
            variants: top.iter().map(|s| s.variant.clone()).collect(),
        })
    } else {
        Classification::Variant {
            name: best.variant.clone(),
        }
    };

    log::debug!(
        "Classified {} mutations as {} (best {} {}/{})",
        observed_mutations.len(),
        classification.variant_name(),
        best.variant,
        best.matched,
        best.total
    );

    Ok(ClassificationResult {
        classification,
        matched_mutation_count: best.matched,
        total_signature_mutations: best.total,
        score: best.score,
        mutations: observed_mutations.to_vec(),
        scores,
    })
}
