// merge.rs - Merge configuration file with CLI arguments

use crate::cli::{Args, Config};
use crate::error::Result;

impl Args {
    /// Merge with configuration from file
    /// CLI arguments take precedence over config file values
    pub fn merge_with_config(mut self, config: Config) -> Self {
        // Input/Output
        if self.reference.is_none() {
            self.reference = config.reference;
        }
        if self.input.is_none() {
            self.input = config.input;
        }
        if self.output.is_none() {
            self.output = config.output;
        }
        if self.mutations.is_none() {
            self.mutations = config.mutations;
        }
        if self.alignments.is_none() {
            self.alignments = config.alignments;
        }

        // Signatures
        if self.signatures.is_none() {
            self.signatures = config.signatures;
        }
        if self.variant_reference.is_empty() {
            self.variant_reference = config.variant_references.unwrap_or_default();
        }

        // Core settings (only override defaults, not explicit CLI values)
        if self.input_mode == "auto" {
            if let Some(mode) = config.input_mode {
                self.input_mode = mode;
            }
        }
        if self.format == "tsv" {
            if let Some(format) = config.format {
                self.format = format;
            }
        }

        // Classification thresholds
        if self.min_match_fraction.is_none() {
            self.min_match_fraction = config.min_match_fraction;
        }
        if self.min_matched_mutations.is_none() {
            self.min_matched_mutations = config.min_matched_mutations;
        }

        // Alignment settings (only override default "dna")
        if self.alignment_mode == "dna" {
            if let Some(mode) = config.alignment_mode {
                self.alignment_mode = mode;
            }
        }
        if self.match_score.is_none() {
            self.match_score = config.match_score;
        }
        if self.mismatch_penalty.is_none() {
            self.mismatch_penalty = config.mismatch_penalty;
        }
        if self.gap_open.is_none() {
            self.gap_open = config.gap_open;
        }

        // Performance
        if self.threads.is_none() {
            self.threads = config.threads;
        }

        // Sample filtering
        if self.include_samples.is_none() {
            self.include_samples = config.include_samples;
        }
        if self.exclude_samples.is_none() {
            self.exclude_samples = config.exclude_samples;
        }

        // Flags (CLI flags take precedence, config only sets if not explicitly set)
        if !self.no_progress && config.no_progress.unwrap_or(false) {
            self.no_progress = true;
        }
        if !self.dry_run && config.dry_run.unwrap_or(false) {
            self.dry_run = true;
        }

        self
    }

    /// Load configuration and merge with CLI args
    pub fn with_config_file(self, config_path: &str) -> Result<Self> {
        let config = Config::from_file(config_path)?;
        Ok(self.merge_with_config(config))
    }
}
