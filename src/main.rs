// main.rs - CLI entry point

use env_logger::Env;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use spikeclass::cli::Config;
use spikeclass::data::{derive_signature_table, read_samples_from_file, write_signature_table};
use spikeclass::output::{write_alignment_file, write_mutation_file, write_summary_file};
use spikeclass::prelude::*;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(e) = run_main() {
        eprintln!("❌ ERROR: {}", e);
        std::process::exit(1);
    }
}

/// Signature table from a TSV file, variant genomes, or the built-in table
fn resolve_signatures(
    args: &Args,
    validation: &ValidationResult,
    reference: Option<&Sequence>,
) -> Result<SignatureTable> {
    if let Some(path) = &args.signatures {
        println!("📋 Signatures: {}", path);
        return load_signature_table(Path::new(path));
    }
    if !validation.variant_references.is_empty() {
        let reference = reference.ok_or_else(|| {
            ClassifierError::InvalidConfig("--variant-reference requires --reference".to_string())
        })?;
        println!(
            "🧬 Deriving signatures from {} variant genomes...",
            validation.variant_references.len()
        );
        return derive_signature_table(reference, &validation.variant_references, &validation.alignment_config);
    }
    println!("📋 Signatures: built-in (Delta, Gamma, Omicron)");
    Ok(builtin_signatures()?.clone())
}

fn run_main() -> Result<()> {
    let mut args: Args = argh::from_env();
    let command_line = std::env::args().collect::<Vec<String>>().join(" ");

    // Handle generate config first
    if args.generate_config {
        let sample_config = Config::generate_sample();
        println!("{}", sample_config);
        println!("\n💡 Save this content to a .toml file and use --config /path/to/config.toml");
        return Ok(());
    }

    // Load configuration file if specified
    if let Some(config_path) = args.config.clone() {
        args = args.with_config_file(&config_path)?;
        println!("📄 Loaded configuration from: {}", config_path);
    }

    let validation = validate_args(&args)?;

    let reference = match &args.reference {
        Some(path) => Some(load_reference(Path::new(path))?),
        None => None,
    };
    let signatures = resolve_signatures(&args, &validation, reference.as_ref())?;

    if args.list_signatures {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        write_signature_table(&signatures, &mut handle)?;
        handle.flush()?;
        return Ok(());
    }

    println!("🚀 {}", spikeclass::get_info());

    // Configure thread pool
    if let Some(n) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .map_err(|e| ClassifierError::InvalidConfig(format!("Failed to configure thread pool: {}", e)))?;
        println!("🧵 Threads: {}", n);
    } else {
        let num_threads = rayon::current_num_threads();
        println!("🧵 Threads: {} (auto-detected)", num_threads);
    }

    let reference = reference.ok_or_else(|| ClassifierError::InvalidConfig("--reference is required".to_string()))?;
    println!("🧬 Reference spike: {} bp", reference.len());
    println!(
        "🎯 Variants: {} ({})",
        signatures.len(),
        signatures.names().join(", ")
    );
    println!(
        "⚙️  Alignment: match {} / mismatch {} / gap {}",
        validation.alignment_config.match_score,
        validation.alignment_config.mismatch_penalty,
        validation.alignment_config.gap_open
    );
    println!(
        "📏 Thresholds: min fraction {:.2}, min matched {}",
        validation.classifier_config.min_match_fraction,
        validation.classifier_config.min_matched_mutations
    );
    println!("📥 Input mode: {}", validation.input_mode.description());

    // Validated above unless --list-signatures
    let input = args
        .input
        .as_deref()
        .ok_or_else(|| ClassifierError::InvalidConfig("--input is required".to_string()))?;
    let output = args
        .output
        .as_deref()
        .ok_or_else(|| ClassifierError::InvalidConfig("--output is required".to_string()))?;

    let all_samples = read_samples_from_file(Path::new(input))?;
    let total = all_samples.len();
    let samples: Vec<RawSample> = all_samples
        .into_iter()
        .filter(|s| validation.includes_sample(&s.id))
        .collect();
    println!("📊 Samples: {} loaded, {} selected", total, samples.len());

    if args.dry_run {
        println!("✅ Dry run completed successfully");
        return Ok(());
    }

    let mut engine = VariantClassifier::with_shared(
        Arc::new(reference),
        Arc::new(signatures),
        validation.alignment_config.clone(),
        validation.classifier_config.clone(),
    )?
    .with_input_mode(validation.input_mode)
    .with_progress(!args.no_progress);

    println!("\n🔄 Classifying {} samples...", samples.len());
    let start = Instant::now();
    let results = engine.analyze_batch(&samples);

    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for (sample, result) in samples.iter().zip(results) {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                log::warn!("Skipping {}: {}", sample.id, e);
                failures.push(FailedSample {
                    id: sample.id.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
    println!(
        "✅ Classified {} samples in {:.2}s ({} unique sequences)",
        reports.len(),
        start.elapsed().as_secs_f64(),
        engine.cache_size()
    );

    for name in engine.signatures().names() {
        let count = reports.iter().filter(|r| r.variant_name() == name).count();
        println!("   🧫 {}: {}", name, count);
    }
    let unclassified = reports.iter().filter(|r| !r.analysis.result.classification.is_classified()).count();
    println!("   ❔ {}: {}", Classification::UNCLASSIFIED, unclassified);
    if !failures.is_empty() {
        println!("   ⚠️  Failed: {}", failures.len());
    }

    write_summary_file(Path::new(output), validation.format, &reports, &failures, &command_line)?;
    println!("📁 Summary written to: {}", output);

    if let Some(path) = &args.mutations {
        write_mutation_file(Path::new(path), validation.format.delimiter(), &reports, &command_line)?;
        println!("📁 Mutation table written to: {}", path);
    }

    if let Some(path) = &args.alignments {
        write_alignment_file(Path::new(path), &reports)?;
        println!("📁 Alignments written to: {}", path);
    }

    Ok(())
}
