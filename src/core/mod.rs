// mod.rs - Core logic module

pub mod alignment;
pub mod classifier;
pub mod engine;
pub mod mutation;

// Re-export main types for convenience
pub use alignment::{align, Alignment, AlignmentColumn, AlignmentConfig, AlignmentStats};
pub use classifier::{
    classify, Classification, ClassificationResult, ClassifierConfig, SignatureChange,
    SignatureMutation, SignatureTable, UnclassifiedReason, VariantScore, VariantSignature,
};
pub use engine::{SampleReport, VariantClassifier};
pub use mutation::{apply_mutations, extract_mutations, Mutation, MutationCounts, MutationKind};
