// mod.rs - Output formatters module

use serde::Serialize;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use crate::core::alignment::Alignment;
use crate::core::classifier::{Classification, SignatureMutation};
use crate::core::engine::SampleReport;
use crate::error::Result;

/// Columns per block in rendered alignments
pub const ALIGNMENT_WIDTH: usize = 60;

/// Report format for the per-sample summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Tsv,
    Csv,
    Json,
}

impl OutputFormat {
    /// Field delimiter for the delimited formats (tab for JSON, unused)
    pub fn delimiter(&self) -> u8 {
        match self {
            OutputFormat::Csv => b',',
            OutputFormat::Tsv | OutputFormat::Json => b'\t',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Tsv => "tsv",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tsv" => Ok(OutputFormat::Tsv),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {}. Use: tsv, csv, json", s)),
        }
    }
}

/// A sample that could not be analyzed, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedSample {
    pub id: String,
    pub error: String,
}

/// Ensure parent directory exists before creating file
pub fn ensure_parent_dir(file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn create_output(file_path: &Path) -> Result<BufWriter<File>> {
    ensure_parent_dir(file_path)?;
    Ok(BufWriter::new(File::create(file_path)?))
}

fn generated_at() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn write_comment_header<W: Write>(writer: &mut W, command_line: &str) -> Result<()> {
    writeln!(writer, "# Command: {}", command_line)?;
    writeln!(writer, "# Generated: {}", generated_at())?;
    writeln!(writer, "# spikeclass v{}", crate::VERSION)?;
    Ok(())
}

fn reason_text(classification: &Classification) -> String {
    match classification {
        Classification::Variant { .. } => String::new(),
        Classification::Unclassified(reason) => reason.to_string(),
    }
}

/// Write the per-sample summary table (TSV or CSV) preceded by `#` header lines
pub fn write_summary_table<W: Write>(
    mut writer: W,
    reports: &[SampleReport],
    failures: &[FailedSample],
    delimiter: u8,
    command_line: &str,
) -> Result<()> {
    write_comment_header(&mut writer, command_line)?;

    let mut wtr = csv::WriterBuilder::new().delimiter(delimiter).from_writer(&mut writer);
    wtr.write_record([
        "sample",
        "input_length",
        "full_genome",
        "variant",
        "matched",
        "total",
        "score",
        "mutations",
        "substitutions",
        "insertions",
        "deletions",
        "identity_percent",
        "reason",
    ])?;

    for report in reports {
        let result = &report.analysis.result;
        let counts = &report.analysis.counts;
        wtr.write_record([
            report.id.clone(),
            report.input_length.to_string(),
            report.full_genome.to_string(),
            result.variant_name().to_string(),
            result.matched_mutation_count.to_string(),
            result.total_signature_mutations.to_string(),
            format!("{:.4}", result.score),
            counts.total().to_string(),
            counts.substitutions.to_string(),
            counts.insertions.to_string(),
            counts.deletions.to_string(),
            format!("{:.2}", report.analysis.stats.identity_percent),
            reason_text(&result.classification),
        ])?;
    }

    for failure in failures {
        let mut row = vec![String::new(); 13];
        row[0] = failure.id.clone();
        row[3] = "Error".to_string();
        row[12] = failure.error.clone();
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write one row per observed mutation per sample.
///
/// `in_signatures` lists the variants whose signatures contain the mutation.
pub fn write_mutation_table<W: Write>(
    mut writer: W,
    reports: &[SampleReport],
    delimiter: u8,
    command_line: &str,
) -> Result<()> {
    write_comment_header(&mut writer, command_line)?;

    let mut wtr = csv::WriterBuilder::new().delimiter(delimiter).from_writer(&mut writer);
    wtr.write_record([
        "sample",
        "type",
        "position",
        "end",
        "ref",
        "alt",
        "notation",
        "in_signatures",
    ])?;

    for report in reports {
        let result = &report.analysis.result;
        for m in &result.mutations {
            let key = SignatureMutation::from(m);
            let in_signatures: Vec<&str> = result
                .scores
                .iter()
                .filter(|s| s.matched_mutations.contains(&key))
                .map(|s| s.variant.as_str())
                .collect();
            wtr.write_record([
                report.id.clone(),
                m.kind.to_string(),
                m.position.to_string(),
                m.end_position().to_string(),
                m.reference_bases.clone().unwrap_or_default(),
                m.query_bases.clone().unwrap_or_default(),
                m.notation(),
                in_signatures.join(";"),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    command: &'a str,
    generated: String,
    version: &'a str,
    samples: &'a [SampleReport],
    failures: &'a [FailedSample],
}

/// Write full reports, including per-variant scores, as pretty JSON
pub fn write_json_report<W: Write>(
    mut writer: W,
    reports: &[SampleReport],
    failures: &[FailedSample],
    command_line: &str,
) -> Result<()> {
    let doc = JsonReport {
        command: command_line,
        generated: generated_at(),
        version: crate::VERSION,
        samples: reports,
        failures,
    };
    serde_json::to_writer_pretty(&mut writer, &doc)?;
    writeln!(writer)?;
    Ok(())
}

/// Render an alignment as blocks of reference / match line / query.
///
/// Coordinates at both ends of a row are ungapped 1-based positions.
pub fn render_alignment(alignment: &Alignment, width: usize) -> String {
    let reference = alignment.reference_aligned();
    let matches = alignment.match_line();
    let query = alignment.query_aligned();
    let width = width.max(1);

    let mut out = String::new();
    let mut ref_pos = 0usize;
    let mut query_pos = 0usize;

    for start in (0..alignment.len()).step_by(width) {
        let end = (start + width).min(alignment.len());
        let ref_chunk = &reference[start..end];
        let query_chunk = &query[start..end];

        let ref_start = ref_pos + 1;
        let query_start = query_pos + 1;
        ref_pos += ref_chunk.bytes().filter(|&b| b != b'-').count();
        query_pos += query_chunk.bytes().filter(|&b| b != b'-').count();

        out.push_str(&format!("Ref   {:>6} {} {}\n", ref_start, ref_chunk, ref_pos));
        out.push_str(&format!("             {}\n", &matches[start..end]));
        out.push_str(&format!("Query {:>6} {} {}\n\n", query_start, query_chunk, query_pos));
    }

    out
}

/// Write every sample's alignment, one block set per sample
pub fn write_alignments<W: Write>(mut writer: W, reports: &[SampleReport]) -> Result<()> {
    for report in reports {
        let stats = &report.analysis.stats;
        writeln!(
            writer,
            ">{} variant={} score={} identity={:.2}% mismatches={} indel_events={}",
            report.id,
            report.variant_name(),
            report.analysis.alignment.score(),
            stats.identity_percent,
            stats.mismatches,
            stats.indel_events
        )?;
        write!(writer, "{}", render_alignment(&report.analysis.alignment, ALIGNMENT_WIDTH))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the summary report to a file in the requested format
pub fn write_summary_file(
    file_path: &Path,
    format: OutputFormat,
    reports: &[SampleReport],
    failures: &[FailedSample],
    command_line: &str,
) -> Result<()> {
    let mut writer = create_output(file_path)?;
    match format {
        OutputFormat::Json => write_json_report(&mut writer, reports, failures, command_line)?,
        OutputFormat::Tsv | OutputFormat::Csv => {
            write_summary_table(&mut writer, reports, failures, format.delimiter(), command_line)?
        }
    }
    writer.flush()?;
    log::info!("Summary ({}) written to {}", format.as_str(), file_path.display());
    Ok(())
}

pub fn write_mutation_file(
    file_path: &Path,
    delimiter: u8,
    reports: &[SampleReport],
    command_line: &str,
) -> Result<()> {
    let mut writer = create_output(file_path)?;
    write_mutation_table(&mut writer, reports, delimiter, command_line)?;
    writer.flush()?;
    log::info!("Mutation table written to {}", file_path.display());
    Ok(())
}

pub fn write_alignment_file(file_path: &Path, reports: &[SampleReport]) -> Result<()> {
    let writer = create_output(file_path)?;
    write_alignments(writer, reports)?;
    log::info!("Alignments written to {}", file_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alignment::AlignmentConfig;
    use crate::core::classifier::{ClassifierConfig, SignatureTable, VariantSignature};
    use crate::core::engine::VariantClassifier;
    use crate::data::sequence::{normalize, InputMode};

    fn reports() -> Vec<SampleReport> {
        let signatures = SignatureTable::new(vec![
            VariantSignature::new("Alpha", vec![SignatureMutation::substitution(8, 'G')]).unwrap(),
            VariantSignature::new("Beta", vec![SignatureMutation::deletion(16, 3)]).unwrap(),
        ])
        .unwrap();
        let engine = VariantClassifier::new(
            normalize("ATGAAACCCGGGTTTAAACCCGGGTTT", false).unwrap(),
            signatures,
            AlignmentConfig::default(),
            ClassifierConfig::default(),
        )
        .unwrap()
        .with_input_mode(InputMode::Spike);
        vec![
            engine.analyze("alpha_1", "ATGAAACGCGGGTTTAAACCCGGGTTT").unwrap(),
            engine.analyze("wuhan", "ATGAAACCCGGGTTTAAACCCGGGTTT").unwrap(),
        ]
    }

    fn data_lines(text: &str) -> Vec<&str> {
        text.lines().filter(|l| !l.starts_with('#')).collect()
    }

    #[test]
    fn test_summary_tsv() {
        let failures = vec![FailedSample {
            id: "broken".to_string(),
            error: "invalid symbol".to_string(),
        }];
        let mut buffer = Vec::new();
        write_summary_table(&mut buffer, &reports(), &failures, b'\t', "spikeclass --test").unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.starts_with("# Command: spikeclass --test\n# Generated: "));
        let lines = data_lines(&text);
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("sample\tinput_length\tfull_genome\tvariant"));
        assert!(lines[1].starts_with("alpha_1\t27\tfalse\tAlpha\t1\t1\t1.0000\t1\t1\t0\t0\t"));
        assert!(lines[2].contains("\tUnclassified\t"));
        assert!(lines[2].ends_with("no mutations (reference-like)"));
        assert!(lines[3].starts_with("broken\t"));
        assert!(lines[3].contains("\tError\t"));
    }

    #[test]
    fn test_summary_csv_and_mutations() {
        let mut buffer = Vec::new();
        write_summary_table(&mut buffer, &reports(), &[], OutputFormat::Csv.delimiter(), "cmd").unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(data_lines(&text)[1].starts_with("alpha_1,27,false,Alpha,"));

        let mut buffer = Vec::new();
        write_mutation_table(&mut buffer, &reports(), b'\t', "cmd").unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines = data_lines(&text);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "alpha_1\tsubstitution\t8\t8\tC\tG\tC8G\tAlpha");
    }

    #[test]
    fn test_json_report() {
        let mut buffer = Vec::new();
        write_json_report(&mut buffer, &reports(), &[], "cmd").unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

        assert_eq!(value["command"], "cmd");
        let samples = value["samples"].as_array().unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0]["id"], "alpha_1");
        assert_eq!(samples[0]["result"]["classification"]["status"], "variant");
        assert_eq!(samples[0]["result"]["classification"]["name"], "Alpha");
        assert_eq!(samples[0]["result"]["scores"].as_array().unwrap().len(), 2);
        assert!(samples[0].get("alignment").is_none());
    }

    #[test]
    fn test_render_alignment_blocks() {
        let reference = "A".repeat(130);
        let mut query = reference.clone();
        query.replace_range(69..70, "-");
        let alignment = Alignment::from_rows(&reference, &query, &AlignmentConfig::default()).unwrap();

        let text = render_alignment(&alignment, ALIGNMENT_WIDTH);
        let rows: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
        assert_eq!(rows.len(), 9);
        assert!(rows[0].starts_with("Ref        1 "));
        assert!(rows[0].ends_with(" 60"));
        assert!(rows[5].starts_with("Query     61 "));
        assert!(rows[5].ends_with(" 119"));
        assert!(rows[8].ends_with(" 129"));
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("TSV".parse::<OutputFormat>().unwrap(), OutputFormat::Tsv);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_write_files_create_parent_dirs() {
        let dir = std::env::temp_dir().join(format!("spikeclass_out_{}", std::process::id()));
        let summary = dir.join("nested").join("summary.tsv");
        let alignments = dir.join("alignments.txt");

        let reports = reports();
        write_summary_file(&summary, OutputFormat::Tsv, &reports, &[], "cmd").unwrap();
        write_alignment_file(&alignments, &reports).unwrap();

        assert!(summary.exists());
        let text = std::fs::read_to_string(&alignments).unwrap();
        assert!(text.starts_with(">alpha_1 variant=Alpha"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
