// lib.rs - spikeclass library root

//! # spikeclass - SARS-CoV-2 spike-gene variant classifier
//!
//! This library identifies the lineage (Delta, Gamma, Omicron, or any
//! user-supplied variant) of a SARS-CoV-2 spike-gene sequence. The query is
//! globally aligned against the Wuhan-Hu-1 reference, the alignment is turned
//! into reference-relative mutation events, and those events are matched
//! against per-variant signature mutations.
//!
//! ## Features
//!
//! - **Needleman-Wunsch alignment**: deterministic tie-breaking, configurable scoring presets
//! - **Mutation extraction**: substitutions and coalesced multi-base insertions/deletions
//! - **Signature matching**: exact position + outcome matching, ties reported, never broken
//! - **Signature tables**: built-in Delta/Gamma/Omicron, TSV files, or derived from variant genomes
//! - **Batch processing**: parallel classification with a CRC32-keyed result cache
//! - **Multiple formats**: TSV, CSV and JSON reports, mutation tables, rendered alignments
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use spikeclass::prelude::*;
//!
//! let reference = load_reference(std::path::Path::new("wuhan.fasta"))?;
//! let engine = VariantClassifier::new(
//!     reference,
//!     builtin_signatures()?.clone(),
//!     AlignmentConfig::default(),
//!     ClassifierConfig::default(),
//! )?;
//!
//! let report = engine.analyze("sample_1", "ATGTTTGTTTTTCTTGTTTTATTGCCACTAGTC")?;
//! println!("{}: {}", report.id, report.variant_name());
//! # Ok::<(), spikeclass::ClassifierError>(())
//! ```

// Re-export all main modules
pub mod cli;
pub mod core;
pub mod data;
pub mod error;
pub mod output;

// Convenience prelude for common imports
pub mod prelude {
    pub use crate::cli::{validate_args, Args, ValidationResult};
    pub use crate::core::{align, apply_mutations, classify, extract_mutations};
    pub use crate::core::{Alignment, AlignmentConfig, AlignmentStats};
    pub use crate::core::{Classification, ClassificationResult, ClassifierConfig, UnclassifiedReason};
    pub use crate::core::{Mutation, MutationKind, SignatureMutation, SignatureTable, VariantSignature};
    pub use crate::core::{SampleReport, VariantClassifier};
    pub use crate::data::{builtin_signatures, load_reference, load_signature_table};
    pub use crate::data::{normalize, normalize_with_mode, InputMode, RawSample, Sequence};
    pub use crate::error::{ClassifierError, Result};
    pub use crate::output::{FailedSample, OutputFormat};
}

// Re-export main types at the root level for convenience
pub use cli::{Args, ValidationResult};
pub use core::{AlignmentConfig, ClassifierConfig, SignatureTable, VariantClassifier};
pub use data::{InputMode, Sequence};
pub use error::{ClassifierError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn get_info() -> String {
    format!(
        "spikeclass v{} - SARS-CoV-2 spike-gene variant classifier",
        VERSION
    )
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_info_mentions_version() {
        assert!(super::get_info().contains(super::VERSION));
    }

    /// Reference "ATGC", query "ATGG": one substitution, selected with score 1.0
    #[test]
    fn test_point_mutation_end_to_end() {
        let reference = normalize("ATGC", false).unwrap();
        let query = normalize("ATGG", false).unwrap();
        let alignment = align(&reference, &query, &AlignmentConfig::default()).unwrap();
        let mutations = extract_mutations(&alignment);
        assert_eq!(mutations, vec![Mutation::substitution(4, b'C', b'G')]);

        let table = SignatureTable::new(vec![
            VariantSignature::new("Test", vec![SignatureMutation::substitution(4, 'G')]).unwrap(),
        ])
        .unwrap();
        let result = classify(&mutations, &table, &ClassifierConfig::default()).unwrap();
        assert_eq!(result.variant_name(), "Test");
        assert_eq!(result.matched_mutation_count, 1);
        assert!((result.score - 1.0).abs() < f64::EPSILON);
    }

    /// Reference "ATGC", query "ATC": G deleted at 3, reconstruction restores the query
    #[test]
    fn test_deletion_round_trip() {
        let reference = normalize("ATGC", false).unwrap();
        let query = normalize("ATC", false).unwrap();
        let alignment = align(&reference, &query, &AlignmentConfig::default()).unwrap();
        let mutations = extract_mutations(&alignment);
        assert_eq!(mutations, vec![Mutation::deletion(3, "G")]);
        assert_eq!(apply_mutations(&reference, &mutations).unwrap(), query);
    }
}
