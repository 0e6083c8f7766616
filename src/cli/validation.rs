// validation.rs - Input validation utilities

use regex::Regex;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cli::args::Args;
use crate::core::{AlignmentConfig, ClassifierConfig};
use crate::data::InputMode;
use crate::error::{ClassifierError, Result};
use crate::output::OutputFormat;

pub struct ValidationResult {
    pub input_mode: InputMode,
    pub format: OutputFormat,
    pub alignment_config: AlignmentConfig,
    pub classifier_config: ClassifierConfig,
    pub variant_references: Vec<(String, PathBuf)>,
    pub sample_include_regex: Option<Regex>,
    pub sample_exclude_regex: Option<Regex>,
}

impl ValidationResult {
    /// Apply the include/exclude sample filters
    pub fn includes_sample(&self, sample_id: &str) -> bool {
        if let Some(re) = &self.sample_include_regex {
            if !re.is_match(sample_id) {
                return false;
            }
        }
        if let Some(re) = &self.sample_exclude_regex {
            if re.is_match(sample_id) {
                return false;
            }
        }
        true
    }
}

fn invalid(message: impl Into<String>) -> ClassifierError {
    ClassifierError::InvalidConfig(message.into())
}

/// Parse a `NAME=PATH` variant reference
pub fn parse_variant_reference(entry: &str) -> Result<(String, PathBuf)> {
    match entry.split_once('=') {
        Some((name, path)) if !name.trim().is_empty() && !path.trim().is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(path.trim())))
        }
        _ => Err(invalid(format!(
            "Invalid variant reference '{}'. Expected NAME=PATH",
            entry
        ))),
    }
}

/// Validate all command line arguments
pub fn validate_args(args: &Args) -> Result<ValidationResult> {
    // Required paths
    if args.reference.is_none() && !(args.list_signatures && args.variant_reference.is_empty()) {
        return Err(invalid("--reference is required"));
    }
    if !args.list_signatures {
        if args.input.is_none() {
            return Err(invalid("--input is required"));
        }
        if args.output.is_none() {
            return Err(invalid("--output is required"));
        }
    }
    if args.signatures.is_some() && !args.variant_reference.is_empty() {
        return Err(invalid("--signatures and --variant-reference are mutually exclusive"));
    }

    let input_mode = InputMode::from_str(&args.input_mode).map_err(invalid)?;
    let format = OutputFormat::from_str(&args.format).map_err(invalid)?;

    // Preset first, explicit scores override it
    let mut alignment_config = AlignmentConfig::from_mode(&args.alignment_mode).map_err(invalid)?;
    if args.match_score.is_some() || args.mismatch_penalty.is_some() || args.gap_open.is_some() {
        alignment_config = AlignmentConfig::custom(
            args.match_score.unwrap_or(alignment_config.match_score),
            args.mismatch_penalty.unwrap_or(alignment_config.mismatch_penalty),
            args.gap_open.unwrap_or(alignment_config.gap_open),
        );
    }
    alignment_config.validate()?;

    let defaults = ClassifierConfig::default();
    let classifier_config = ClassifierConfig {
        min_match_fraction: args.min_match_fraction.unwrap_or(defaults.min_match_fraction),
        min_matched_mutations: args.min_matched_mutations.unwrap_or(defaults.min_matched_mutations),
    };
    classifier_config.validate()?;

    if args.threads == Some(0) {
        return Err(invalid("--threads must be at least 1"));
    }

    let variant_references = args
        .variant_reference
        .iter()
        .map(|entry| parse_variant_reference(entry))
        .collect::<Result<Vec<_>>>()?;

    // Compile regex patterns
    let sample_include_regex = if let Some(pattern) = &args.include_samples {
        Some(Regex::new(pattern).map_err(|e| invalid(format!("Invalid include_samples regex: {}", e)))?)
    } else {
        None
    };

    let sample_exclude_regex = if let Some(pattern) = &args.exclude_samples {
        Some(Regex::new(pattern).map_err(|e| invalid(format!("Invalid exclude_samples regex: {}", e)))?)
    } else {
        None
    };

    Ok(ValidationResult {
        input_mode,
        format,
        alignment_config,
        classifier_config,
        variant_references,
        sample_include_regex,
        sample_exclude_regex,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use argh::FromArgs;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["--reference", "ref.fasta", "--input", "in.fasta", "--output", "out.tsv"];
        argv.extend_from_slice(extra);
        Args::from_args(&["spikeclass"], &argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let result = validate_args(&parse(&[])).unwrap();
        assert_eq!(result.input_mode, InputMode::Auto);
        assert_eq!(result.format, OutputFormat::Tsv);
        assert_eq!(result.alignment_config, AlignmentConfig::from_mode("dna").unwrap());
        assert_eq!(result.classifier_config, ClassifierConfig::default());
        assert!(result.variant_references.is_empty());
        assert!(result.includes_sample("anything"));
    }

    #[test]
    fn test_custom_scores_override_preset() {
        let result = validate_args(&parse(&["--alignment-mode", "dna-strict", "--gap-open", "3"])).unwrap();
        assert_eq!(result.alignment_config.match_score, 2);
        assert_eq!(result.alignment_config.mismatch_penalty, -2);
        assert_eq!(result.alignment_config.gap_open, 3);

        assert!(validate_args(&parse(&["--gap-open", "0"])).is_err());
        assert!(validate_args(&parse(&["--alignment-mode", "protein"])).is_err());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(validate_args(&parse(&["--input-mode", "plasmid"])).is_err());
        assert!(validate_args(&parse(&["--format", "xml"])).is_err());
        assert!(validate_args(&parse(&["--min-match-fraction", "1.5"])).is_err());
        assert!(validate_args(&parse(&["--threads", "0"])).is_err());
        assert!(validate_args(&parse(&["--include-samples", "("])).is_err());
        assert!(validate_args(&parse(&["--variant-reference", "Delta"])).is_err());
        assert!(validate_args(&parse(&["--signatures", "s.tsv", "--variant-reference", "D=d.fasta"])).is_err());

        let no_output = Args::from_args(&["spikeclass"], &["--reference", "r.fasta", "--input", "i.fasta"]).unwrap();
        assert!(validate_args(&no_output).is_err());
    }

    #[test]
    fn test_list_signatures_needs_no_paths() {
        let args = Args::from_args(&["spikeclass"], &["--list-signatures"]).unwrap();
        assert!(validate_args(&args).is_ok());

        // Deriving signatures still needs the reference
        let args = Args::from_args(&["spikeclass"], &["--list-signatures", "--variant-reference", "D=d.fasta"]).unwrap();
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_sample_filters_and_variant_references() {
        let result = validate_args(&parse(&[
            "--include-samples",
            "^hCoV",
            "--exclude-samples",
            "control",
            "--variant-reference",
            "Delta=genomes/delta.fasta",
            "--variant-reference",
            "Omicron = ba1.fasta",
        ]))
        .unwrap();
        assert!(result.includes_sample("hCoV-19/Italy/1"));
        assert!(!result.includes_sample("hCoV-19/control"));
        assert!(!result.includes_sample("sample_1"));
        assert_eq!(
            result.variant_references,
            vec![
                ("Delta".to_string(), PathBuf::from("genomes/delta.fasta")),
                ("Omicron".to_string(), PathBuf::from("ba1.fasta")),
            ]
        );
    }
}
