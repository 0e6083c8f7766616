// fasta.rs - Reference and sample loading from FASTA files

use bio::io::fasta;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::data::sequence::{normalize_with_mode, InputMode, Sequence};
use crate::error::{ClassifierError, Result};

/// A raw submission as read from a FASTA record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSample {
    pub id: String,
    pub sequence: String,
}

/// Read every record of a FASTA stream
pub fn read_samples<R: Read>(reader: R, source: &str) -> Result<Vec<RawSample>> {
    let reader = fasta::Reader::new(BufReader::new(reader));
    let mut samples = Vec::new();

    for record_result in reader.records() {
        let record = record_result
            .map_err(|e| ClassifierError::Fasta(format!("Invalid FASTA record in {}: {}", source, e)))?;
        samples.push(RawSample {
            id: record.id().to_string(),
            sequence: String::from_utf8_lossy(record.seq()).into_owned(),
        });
    }

    Ok(samples)
}

/// Read every record of a FASTA file
pub fn read_samples_from_file(path: &Path) -> Result<Vec<RawSample>> {
    let file = File::open(path).map_err(|e| {
        ClassifierError::Fasta(format!("Failed to open FASTA file {}: {}", path.display(), e))
    })?;
    let samples = read_samples(file, &path.display().to_string())?;
    log::info!("Loaded {} records from {}", samples.len(), path.display());
    Ok(samples)
}

/// Read the first record of a FASTA file
pub fn read_first_record(path: &Path) -> Result<RawSample> {
    read_samples_from_file(path)?
        .into_iter()
        .next()
        .ok_or_else(|| ClassifierError::Fasta(format!("No FASTA records in {}", path.display())))
}

/// Load a reference spike sequence.
///
/// Full genomes have the spike window excised; shorter records are taken as
/// the spike gene itself.
pub fn load_reference(path: &Path) -> Result<Sequence> {
    let record = read_first_record(path)?;
    let reference = normalize_with_mode(&record.sequence, InputMode::Auto)?;
    log::info!(
        "Reference {} from {}: {} bp spike sequence",
        record.id,
        path.display(),
        reference.len()
    );
    Ok(reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sequence::{SPIKE_END, SPIKE_START};

    #[test]
    fn test_read_samples() {
        let data = b">s1 first sample\nACGT\nACGT\n>s2\nttga\n";
        let samples = read_samples(&data[..], "memory").unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].id, "s1");
        assert_eq!(samples[0].sequence, "ACGTACGT");
        assert_eq!(samples[1].sequence, "ttga");
    }

    #[test]
    fn test_load_reference_from_genome_file() {
        let mut genome = vec![b'C'; SPIKE_END + 50];
        for b in genome.iter_mut().take(SPIKE_END).skip(SPIKE_START - 1) {
            *b = b'A';
        }
        let path = std::env::temp_dir().join(format!("spikeclass_ref_{}.fasta", std::process::id()));
        let mut content = b">wuhan\n".to_vec();
        content.extend_from_slice(&genome);
        content.push(b'\n');
        std::fs::write(&path, content).unwrap();

        let reference = load_reference(&path).unwrap();
        assert_eq!(reference.len(), SPIKE_END - SPIKE_START + 1);
        assert!(reference.as_bytes().iter().all(|&b| b == b'A'));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join("spikeclass_does_not_exist.fasta");
        assert!(matches!(load_reference(&path), Err(ClassifierError::Fasta(_))));
    }
}
