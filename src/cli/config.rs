// config.rs - Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{ClassifierError, Result};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    // Input/Output
    pub reference: Option<String>,
    pub input: Option<String>,
    pub output: Option<String>,
    pub mutations: Option<String>,
    pub alignments: Option<String>,

    // Signatures
    pub signatures: Option<String>,
    pub variant_references: Option<Vec<String>>,

    // Core settings
    pub input_mode: Option<String>,
    pub format: Option<String>,

    // Classification thresholds
    pub min_match_fraction: Option<f64>,
    pub min_matched_mutations: Option<usize>,

    // Alignment settings
    pub alignment_mode: Option<String>,
    pub match_score: Option<i32>,
    pub mismatch_penalty: Option<i32>,
    pub gap_open: Option<i32>,

    // Performance
    pub threads: Option<usize>,

    // Sample filtering
    pub include_samples: Option<String>,
    pub exclude_samples: Option<String>,

    // Flags
    pub no_progress: Option<bool>,
    pub dry_run: Option<bool>,
}

impl Config {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ClassifierError::InvalidConfig(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&content)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| ClassifierError::InvalidConfig(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)?;
        log::info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Generate a sample configuration file with comments
    pub fn generate_sample() -> String {
        r#"# spikeclass.toml - Configuration file for spikeclass
# Command line arguments will override these settings

# =============================================================================
# INPUT/OUTPUT
# =============================================================================

# Reference FASTA: spike gene, or full Wuhan-Hu-1 genome (spike window excised)
reference = "/path/to/wuhan.fasta"

# Samples to classify (FASTA, one record per sample)
input = "/path/to/samples.fasta"

# Output summary file
output = "classification.tsv"

# Optional per-mutation table and rendered alignments
# mutations = "mutations.tsv"
# alignments = "alignments.txt"

# =============================================================================
# SIGNATURES
# =============================================================================

# Signature table (TSV: variant, type, position, change); omit for built-in table
# signatures = "signatures.tsv"

# Or derive signatures from variant genomes, as NAME=PATH
# variant_references = ["Delta=/path/to/delta.fasta", "Omicron=/path/to/ba1.fasta"]

# =============================================================================
# CORE SETTINGS
# =============================================================================

# Input mode: spike, full-genome, auto
input_mode = "auto"

# Output format: tsv, csv, json
format = "tsv"

# =============================================================================
# CLASSIFICATION THRESHOLDS
# =============================================================================

# Minimum fraction of a signature that must be observed (0.0-1.0)
min_match_fraction = 0.5

# Minimum number of matched signature mutations
min_matched_mutations = 1

# =============================================================================
# ALIGNMENT SETTINGS
# =============================================================================

# Alignment mode: dna, dna-strict, dna-permissive
alignment_mode = "dna"

# Custom alignment scores (override the preset values)
# match_score = 1
# mismatch_penalty = -1
# gap_open = 2

# =============================================================================
# PERFORMANCE
# =============================================================================

# Number of threads (omit for auto-detection)
# threads = 8

# =============================================================================
# SAMPLE FILTERING
# =============================================================================

# Include only samples matching regex pattern
# include_samples = "^hCoV-19/Italy.*"

# Exclude samples matching regex pattern
# exclude_samples = "control.*"

# =============================================================================
# FLAGS
# =============================================================================

# Disable the progress bar
no_progress = false

# Validate inputs without classification (dry run)
dry_run = false
"#
        .to_string()
    }
}
