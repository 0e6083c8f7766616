// args.rs - Command line arguments definition

use argh::FromArgs;

#[derive(FromArgs)]
/// spikeclass - SARS-CoV-2 spike-gene variant classifier
pub struct Args {
    /// reference FASTA (spike gene or full Wuhan-Hu-1 genome)
    #[argh(option)]
    pub reference: Option<String>,

    /// FASTA file with the samples to classify
    #[argh(option)]
    pub input: Option<String>,

    /// output summary file
    #[argh(option)]
    pub output: Option<String>,

    /// signature table (TSV: variant, type, position, change); default: built-in Delta/Gamma/Omicron
    #[argh(option)]
    pub signatures: Option<String>,

    /// derive a signature from a variant genome, as NAME=PATH (repeatable)
    #[argh(option)]
    pub variant_reference: Vec<String>,

    /// input mode: spike, full-genome, auto (default: auto)
    #[argh(option, default = "String::from(\"auto\")")]
    pub input_mode: String,

    /// output format: tsv, csv, json (default: tsv)
    #[argh(option, default = "String::from(\"tsv\")")]
    pub format: String,

    /// write one row per observed mutation to this file
    #[argh(option)]
    pub mutations: Option<String>,

    /// write rendered alignments to this file
    #[argh(option)]
    pub alignments: Option<String>,

    /// minimum fraction of a signature that must be observed (0.0-1.0, default: 0.5)
    #[argh(option)]
    pub min_match_fraction: Option<f64>,

    /// minimum number of matched signature mutations (default: 1)
    #[argh(option)]
    pub min_matched_mutations: Option<usize>,

    /// alignment mode: dna, dna-strict, dna-permissive (default: dna)
    #[argh(option, default = "String::from(\"dna\")")]
    pub alignment_mode: String,

    /// custom match score (overrides the preset value)
    #[argh(option)]
    pub match_score: Option<i32>,

    /// custom mismatch penalty, zero or negative (overrides the preset value)
    #[argh(option)]
    pub mismatch_penalty: Option<i32>,

    /// custom gap penalty per gap column, positive (overrides the preset value)
    #[argh(option)]
    pub gap_open: Option<i32>,

    /// number of threads (default: auto-detect)
    #[argh(option)]
    pub threads: Option<usize>,

    /// include only samples matching regex pattern
    #[argh(option)]
    pub include_samples: Option<String>,

    /// exclude samples matching regex pattern
    #[argh(option)]
    pub exclude_samples: Option<String>,

    /// disable the progress bar
    #[argh(switch)]
    pub no_progress: bool,

    /// print the active signature table and exit
    #[argh(switch)]
    pub list_signatures: bool,

    /// validate inputs without classification (dry run)
    #[argh(switch)]
    pub dry_run: bool,

    /// path to TOML configuration file
    #[argh(option)]
    pub config: Option<String>,

    /// generate sample configuration file and exit
    #[argh(switch)]
    pub generate_config: bool,
}
