// engine.rs - Classification engine for single requests and batches

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use crate::core::alignment::{align, Alignment, AlignmentConfig, AlignmentStats};
use crate::core::classifier::{classify, ClassificationResult, ClassifierConfig, SignatureTable};
use crate::core::mutation::{extract_mutations, MutationCounts};
use crate::data::fasta::RawSample;
use crate::data::sequence::{normalize, InputMode, Sequence};
use crate::error::{ClassifierError, Result};

/// Everything derived from one normalized query sequence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceAnalysis {
    #[serde(skip)]
    pub alignment: Alignment,
    pub stats: AlignmentStats,
    pub counts: MutationCounts,
    pub result: ClassificationResult,
}

/// Per-sample report: input facts plus the analysis of its spike sequence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleReport {
    pub id: String,
    /// CRC32 of the normalized spike sequence
    pub checksum: u32,
    /// Cleaned input length, before any spike excision
    pub input_length: usize,
    pub full_genome: bool,
    pub query_length: usize,
    pub ambiguous_bases: usize,
    #[serde(flatten)]
    pub analysis: SequenceAnalysis,
}

impl SampleReport {
    pub fn variant_name(&self) -> &str {
        self.analysis.result.variant_name()
    }
}

/// A normalized submission waiting for analysis
struct Prepared {
    input_length: usize,
    full_genome: bool,
    sequence: Sequence,
    checksum: u32,
}

struct CacheEntry {
    sequence: Sequence,
    analysis: SequenceAnalysis,
}

/// Classification engine.
///
/// Reference and signature table are shared read-only; `analyze` takes `&self`
/// and can be called from many threads. Batches go through `analyze_batch`,
/// which reuses results for sequences already seen (keyed by CRC32).
pub struct VariantClassifier {
    reference: Arc<Sequence>,
    signatures: Arc<SignatureTable>,
    alignment_config: AlignmentConfig,
    classifier_config: ClassifierConfig,
    input_mode: InputMode,
    show_progress: bool,
    cache: HashMap<u32, CacheEntry>,
}

impl VariantClassifier {
    pub fn new(
        reference: Sequence,
        signatures: SignatureTable,
        alignment_config: AlignmentConfig,
        classifier_config: ClassifierConfig,
    ) -> Result<Self> {
        Self::with_shared(
            Arc::new(reference),
            Arc::new(signatures),
            alignment_config,
            classifier_config,
        )
    }

    pub fn with_shared(
        reference: Arc<Sequence>,
        signatures: Arc<SignatureTable>,
        alignment_config: AlignmentConfig,
        classifier_config: ClassifierConfig,
    ) -> Result<Self> {
        if reference.is_empty() {
            return Err(ClassifierError::EmptySequence { which: "reference" });
        }
        if signatures.is_empty() {
            return Err(ClassifierError::EmptySignatureTable);
        }
        alignment_config.validate()?;
        classifier_config.validate()?;

        Ok(Self {
            reference,
            signatures,
            alignment_config,
            classifier_config,
            input_mode: InputMode::Auto,
            show_progress: false,
            cache: HashMap::new(),
        })
    }

    pub fn with_input_mode(mut self, mode: InputMode) -> Self {
        self.input_mode = mode;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn reference(&self) -> &Sequence {
        &self.reference
    }

    pub fn signatures(&self) -> &SignatureTable {
        &self.signatures
    }

    pub fn alignment_config(&self) -> &AlignmentConfig {
        &self.alignment_config
    }

    pub fn classifier_config(&self) -> &ClassifierConfig {
        &self.classifier_config
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    /// Number of distinct sequences with a cached analysis
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Align, extract and classify an already normalized spike sequence
    pub fn analyze_sequence(&self, query: &Sequence) -> Result<SequenceAnalysis> {
        let alignment = align(&self.reference, query, &self.alignment_config)?;
        let mutations = extract_mutations(&alignment);
        let counts = MutationCounts::from_mutations(&mutations);
        let result = classify(&mutations, &self.signatures, &self.classifier_config)?;
        Ok(SequenceAnalysis {
            stats: alignment.stats(),
            alignment,
            counts,
            result,
        })
    }

    /// Full chain for one raw submission with an explicit genome flag
    pub fn classify_raw(&self, raw: &str, is_full_genome: bool) -> Result<SequenceAnalysis> {
        let query = normalize(raw, is_full_genome)?;
        self.analyze_sequence(&query)
    }

    fn prepare(&self, raw: &str) -> Result<Prepared> {
        let input_length = raw.chars().filter(|c| !c.is_ascii_whitespace()).count();
        let full_genome = self.input_mode.is_full_genome(input_length);
        let sequence = normalize(raw, full_genome)?;
        Ok(Prepared {
            input_length,
            full_genome,
            checksum: sequence.checksum(),
            sequence,
        })
    }

    fn report(id: &str, prepared: &Prepared, analysis: SequenceAnalysis) -> SampleReport {
        SampleReport {
            id: id.to_string(),
            checksum: prepared.checksum,
            input_length: prepared.input_length,
            full_genome: prepared.full_genome,
            query_length: prepared.sequence.len(),
            ambiguous_bases: prepared.sequence.ambiguous_count(),
            analysis,
        }
    }

    /// Classify one raw submission using the engine's input mode
    pub fn analyze(&self, id: &str, raw: &str) -> Result<SampleReport> {
        let prepared = self.prepare(raw)?;
        let analysis = self.analyze_sequence(&prepared.sequence)?;
        log::debug!("{}: {}", id, analysis.result.variant_name());
        Ok(Self::report(id, &prepared, analysis))
    }

    /// Cached analysis for `prepared`, if the stored sequence really is the same
    fn cached(&self, prepared: &Prepared) -> Option<&SequenceAnalysis> {
        self.cache
            .get(&prepared.checksum)
            .filter(|entry| entry.sequence == prepared.sequence)
            .map(|entry| &entry.analysis)
    }

    /// Classify a batch of samples in parallel.
    ///
    /// Returns one result per input sample, in input order. Identical
    /// normalized sequences are aligned once.
    pub fn analyze_batch(&mut self, samples: &[RawSample]) -> Vec<Result<SampleReport>> {
        let prepared: Vec<Result<Prepared>> = samples.iter().map(|s| self.prepare(&s.sequence)).collect();

        // Unique sequences not yet in the cache
        let mut seen = HashSet::new();
        let pending: Vec<&Prepared> = prepared
            .iter()
            .filter_map(|p| p.as_ref().ok())
            .filter(|p| self.cached(p).is_none() && seen.insert(p.checksum))
            .collect();

        let valid = prepared.iter().filter(|p| p.is_ok()).count();
        log::info!(
            "Batch of {} samples: {} valid, {} unique sequences to align, {} cached entries",
            samples.len(),
            valid,
            pending.len(),
            self.cache.len()
        );

        let pb = if self.show_progress && !pending.is_empty() {
            let pb = ProgressBar::new(pending.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {per_sec} ETA: {eta}")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        } else {
            ProgressBar::hidden()
        };

        let start = Instant::now();
        let engine = &*self;
        let computed: Vec<(u32, Sequence, SequenceAnalysis)> = pending
            .into_par_iter()
            .filter_map(|p| {
                let analysis = engine.analyze_sequence(&p.sequence);
                pb.inc(1);
                match analysis {
                    Ok(a) => Some((p.checksum, p.sequence.clone(), a)),
                    Err(e) => {
                        log::warn!("Analysis failed for sequence {:08x}: {}", p.checksum, e);
                        None
                    }
                }
            })
            .collect();
        pb.finish_and_clear();

        let computed_count = computed.len();
        for (checksum, sequence, analysis) in computed {
            self.cache.insert(checksum, CacheEntry { sequence, analysis });
        }
        log::info!(
            "Aligned {} sequences in {:.2}s",
            computed_count,
            start.elapsed().as_secs_f64()
        );

        samples
            .iter()
            .zip(prepared)
            .map(|(sample, prepared)| {
                let prepared = prepared?;
                let analysis = match self.cached(&prepared) {
                    Some(a) => a.clone(),
                    // CRC32 collision or failed analysis: run it directly
                    None => self.analyze_sequence(&prepared.sequence)?,
                };
                Ok(Self::report(&sample.id, &prepared, analysis))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::{Classification, SignatureMutation, UnclassifiedReason, VariantSignature};
    use crate::data::sequence::{SPIKE_END, SPIKE_START};
    use crate::error::SequenceIssue;

    const REFERENCE: &str = "ATGAAACCCGGGTTTAAACCCGGGTTT";
    const ALPHA_QUERY: &str = "ATGAAACGCGGGTTTAAACCCGGGTTT";
    const BETA_QUERY: &str = "ATGAAACCCGGGTTTCCCGGGTTT";

    fn engine() -> VariantClassifier {
        let signatures = SignatureTable::new(vec![
            VariantSignature::new("Alpha", vec![SignatureMutation::substitution(8, 'G')]).unwrap(),
            VariantSignature::new("Beta", vec![SignatureMutation::deletion(16, 3)]).unwrap(),
        ])
        .unwrap();
        VariantClassifier::new(
            normalize(REFERENCE, false).unwrap(),
            signatures,
            AlignmentConfig::default(),
            ClassifierConfig::default(),
        )
        .unwrap()
        .with_input_mode(InputMode::Spike)
    }

    fn sample(id: &str, sequence: &str) -> RawSample {
        RawSample {
            id: id.to_string(),
            sequence: sequence.to_string(),
        }
    }

    #[test]
    fn test_analyze_selects_variant() {
        let engine = engine();
        let report = engine.analyze("s1", ALPHA_QUERY).unwrap();
        assert_eq!(report.variant_name(), "Alpha");
        assert_eq!(report.input_length, REFERENCE.len());
        assert!(!report.full_genome);
        assert_eq!(report.analysis.counts.substitutions, 1);
        assert_eq!(report.analysis.stats.mismatches, 1);

        let report = engine.analyze("s2", BETA_QUERY).unwrap();
        assert_eq!(report.variant_name(), "Beta");
        assert_eq!(report.analysis.counts.deletions, 1);
    }

    #[test]
    fn test_analyze_reference_and_tie() {
        let engine = engine();
        let report = engine.analyze("wuhan", REFERENCE).unwrap();
        assert_eq!(
            report.analysis.result.classification,
            Classification::Unclassified(UnclassifiedReason::NoMutations)
        );

        // Carries both signatures completely
        let report = engine.analyze("both", "ATGAAACGCGGGTTTCCCGGGTTT").unwrap();
        assert!(matches!(
            report.analysis.result.classification,
            Classification::Unclassified(UnclassifiedReason::Tie { .. })
        ));
    }

    #[test]
    fn test_analyze_errors() {
        let engine = engine();
        assert!(matches!(
            engine.analyze("bad", "ATGX"),
            Err(ClassifierError::InvalidSequence(SequenceIssue::InvalidSymbol { character: 'X', position: 4 }))
        ));
        assert!(matches!(
            engine.classify_raw(ALPHA_QUERY, true),
            Err(ClassifierError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_auto_mode_excises_spike_window() {
        let mut genome = vec![b'C'; SPIKE_END + 10];
        genome[SPIKE_START - 1..SPIKE_START - 1 + ALPHA_QUERY.len()].copy_from_slice(ALPHA_QUERY.as_bytes());
        let raw = String::from_utf8(genome).unwrap();

        // Reference padded with the same tail so only the substitution differs
        let mut reference = REFERENCE.as_bytes().to_vec();
        reference.resize(SPIKE_END - SPIKE_START + 1, b'C');
        let signatures = SignatureTable::new(vec![
            VariantSignature::new("Alpha", vec![SignatureMutation::substitution(8, 'G')]).unwrap(),
        ])
        .unwrap();
        let engine = VariantClassifier::new(
            Sequence::from_normalized(reference).unwrap(),
            signatures,
            AlignmentConfig::default(),
            ClassifierConfig::default(),
        )
        .unwrap();

        let report = engine.analyze("genome", &raw).unwrap();
        assert!(report.full_genome);
        assert_eq!(report.input_length, SPIKE_END + 10);
        assert_eq!(report.query_length, SPIKE_END - SPIKE_START + 1);
        assert_eq!(report.variant_name(), "Alpha");
    }

    #[test]
    fn test_batch_matches_single_and_caches() {
        let mut engine = engine();
        let samples = vec![
            sample("a1", ALPHA_QUERY),
            sample("a2", &ALPHA_QUERY.to_lowercase()),
            sample("bad", "ATG!"),
            sample("b1", BETA_QUERY),
        ];

        let results = engine.analyze_batch(&samples);
        assert_eq!(results.len(), 4);
        assert_eq!(engine.cache_size(), 2);

        let a1 = results[0].as_ref().unwrap();
        let a2 = results[1].as_ref().unwrap();
        assert_eq!(a1.id, "a1");
        assert_eq!(a2.id, "a2");
        assert_eq!(a1.checksum, a2.checksum);
        assert_eq!(a1.analysis, a2.analysis);
        assert!(results[2].is_err());
        assert_eq!(results[3].as_ref().unwrap().variant_name(), "Beta");

        assert_eq!(a1, &engine.analyze("a1", ALPHA_QUERY).unwrap());

        // Second run is served from the cache
        let again = engine.analyze_batch(&samples[..1]);
        assert_eq!(again[0].as_ref().unwrap(), a1);
        assert_eq!(engine.cache_size(), 2);

        engine.clear_cache();
        assert_eq!(engine.cache_size(), 0);
    }

    #[test]
    fn test_analyze_is_shareable_across_threads() {
        let engine = engine();
        let queries = [ALPHA_QUERY, BETA_QUERY, REFERENCE, "ATGAAACGCGGGTTTCCCGGGTTT"];
        let serial: Vec<SampleReport> = queries
            .iter()
            .enumerate()
            .map(|(i, q)| engine.analyze(&format!("s{}", i), q).unwrap())
            .collect();

        let parallel: Vec<SampleReport> = (0..queries.len() * 16)
            .into_par_iter()
            .map(|k| {
                let i = k % queries.len();
                engine.analyze(&format!("s{}", i), queries[i]).unwrap()
            })
            .collect();

        for (k, report) in parallel.iter().enumerate() {
            assert_eq!(report, &serial[k % queries.len()]);
        }
    }

    #[test]
    fn test_construction_rejects_empty_inputs() {
        let empty_table = VariantClassifier::new(
            normalize(REFERENCE, false).unwrap(),
            SignatureTable::default(),
            AlignmentConfig::default(),
            ClassifierConfig::default(),
        );
        assert!(matches!(empty_table, Err(ClassifierError::EmptySignatureTable)));

        let signatures = SignatureTable::new(vec![
            VariantSignature::new("Alpha", vec![SignatureMutation::substitution(8, 'G')]).unwrap(),
        ])
        .unwrap();
        let empty_reference = VariantClassifier::new(
            Sequence::from_normalized(Vec::new()).unwrap(),
            signatures,
            AlignmentConfig::default(),
            ClassifierConfig::default(),
        );
        assert!(matches!(
            empty_reference,
            Err(ClassifierError::EmptySequence { which: "reference" })
        ));
    }
}
