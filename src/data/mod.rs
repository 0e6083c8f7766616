// mod.rs - Data structures and loaders module

pub mod fasta;
pub mod sequence;
pub mod signatures;

// Re-export main types for convenience
pub use fasta::{load_reference, read_samples, read_samples_from_file, RawSample};
pub use sequence::{normalize, normalize_with_mode, InputMode, Sequence, SPIKE_END, SPIKE_START};
pub use signatures::{
    builtin_signatures, derive_signature, derive_signature_table, load_signature_table,
    read_signature_table, write_signature_table,
};
