// signatures.rs - Built-in, file-based and derived variant signature tables

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::core::alignment::{align, AlignmentConfig};
use crate::core::classifier::{SignatureChange, SignatureMutation, SignatureTable, VariantSignature};
use crate::core::mutation::{extract_mutations, MutationKind};
use crate::data::fasta::read_first_record;
use crate::data::sequence::{normalize_with_mode, InputMode, Sequence};
use crate::error::{ClassifierError, Result};

// Defining spike mutations, in spike-gene nucleotide coordinates
// (genome position - 21562). Indels use the genome coordinates in which they
// are usually reported; inside repeats the aligner may place them elsewhere.

const DELTA: &[(usize, SignatureChange)] = &[
    (56, SignatureChange::Substitution { alternate: 'G' }),   // T19R
    (425, SignatureChange::Substitution { alternate: 'A' }),  // G142D
    (467, SignatureChange::Deletion { length: 6 }),           // E156-F157 del
    (1355, SignatureChange::Substitution { alternate: 'G' }), // L452R
    (1433, SignatureChange::Substitution { alternate: 'A' }), // T478K
    (1841, SignatureChange::Substitution { alternate: 'G' }), // D614G
    (2042, SignatureChange::Substitution { alternate: 'G' }), // P681R
    (2848, SignatureChange::Substitution { alternate: 'A' }), // D950N
];

const GAMMA: &[(usize, SignatureChange)] = &[
    (52, SignatureChange::Substitution { alternate: 'T' }),   // L18F
    (59, SignatureChange::Substitution { alternate: 'A' }),   // T20N
    (76, SignatureChange::Substitution { alternate: 'T' }),   // P26S
    (412, SignatureChange::Substitution { alternate: 'T' }),  // D138Y
    (570, SignatureChange::Substitution { alternate: 'T' }),  // R190S
    (1250, SignatureChange::Substitution { alternate: 'C' }), // K417T
    (1450, SignatureChange::Substitution { alternate: 'A' }), // E484K
    (1501, SignatureChange::Substitution { alternate: 'T' }), // N501Y
    (1841, SignatureChange::Substitution { alternate: 'G' }), // D614G
    (1963, SignatureChange::Substitution { alternate: 'T' }), // H655Y
    (3080, SignatureChange::Substitution { alternate: 'T' }), // T1027I
    (3526, SignatureChange::Substitution { alternate: 'T' }), // V1176F
];

const OMICRON: &[(usize, SignatureChange)] = &[
    (200, SignatureChange::Substitution { alternate: 'T' }),  // A67V
    (203, SignatureChange::Deletion { length: 6 }),           // H69-V70 del
    (284, SignatureChange::Substitution { alternate: 'T' }),  // T95I
    (1016, SignatureChange::Substitution { alternate: 'A' }), // G339D
    (1117, SignatureChange::Substitution { alternate: 'C' }), // S373P
    (1124, SignatureChange::Substitution { alternate: 'T' }), // S375F
    (1251, SignatureChange::Substitution { alternate: 'T' }), // K417N
    (1320, SignatureChange::Substitution { alternate: 'G' }), // N440K
    (1336, SignatureChange::Substitution { alternate: 'A' }), // G446S
    (1430, SignatureChange::Substitution { alternate: 'A' }), // S477N
    (1433, SignatureChange::Substitution { alternate: 'A' }), // T478K
    (1451, SignatureChange::Substitution { alternate: 'C' }), // E484A
    (1478, SignatureChange::Substitution { alternate: 'G' }), // Q493R
    (1486, SignatureChange::Substitution { alternate: 'A' }), // G496S
    (1493, SignatureChange::Substitution { alternate: 'G' }), // Q498R
    (1501, SignatureChange::Substitution { alternate: 'T' }), // N501Y
    (1513, SignatureChange::Substitution { alternate: 'C' }), // Y505H
    (1640, SignatureChange::Substitution { alternate: 'A' }), // T547K
    (1841, SignatureChange::Substitution { alternate: 'G' }), // D614G
    (1963, SignatureChange::Substitution { alternate: 'T' }), // H655Y
    (2037, SignatureChange::Substitution { alternate: 'G' }), // N679K
    (2042, SignatureChange::Substitution { alternate: 'A' }), // P681H
    (2292, SignatureChange::Substitution { alternate: 'A' }), // N764K
    (2386, SignatureChange::Substitution { alternate: 'T' }), // D796Y
    (2568, SignatureChange::Substitution { alternate: 'A' }), // N856K
    (2862, SignatureChange::Substitution { alternate: 'T' }), // Q954H
    (2907, SignatureChange::Substitution { alternate: 'A' }), // N969K
    (2941, SignatureChange::Substitution { alternate: 'T' }), // L981F
];

fn build_signature(name: &str, entries: &[(usize, SignatureChange)]) -> Result<VariantSignature> {
    VariantSignature::new(
        name,
        entries.iter().map(|(position, change)| SignatureMutation {
            position: *position,
            change: change.clone(),
        }),
    )
}

fn build_builtin() -> Result<SignatureTable> {
    SignatureTable::new(vec![
        build_signature("Delta", DELTA)?,
        build_signature("Gamma", GAMMA)?,
        build_signature("Omicron", OMICRON)?,
    ])
}

/// The built-in Delta / Gamma / Omicron table, built on first use
pub fn builtin_signatures() -> Result<&'static SignatureTable> {
    static TABLE: OnceLock<SignatureTable> = OnceLock::new();
    if let Some(table) = TABLE.get() {
        return Ok(table);
    }
    let table = build_builtin()?;
    Ok(TABLE.get_or_init(|| table))
}

/// One row of a signature TSV file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SignatureRecord {
    variant: String,
    #[serde(rename = "type")]
    kind: MutationKind,
    position: usize,
    /// Alternate base, deleted length or inserted bases depending on `type`
    change: String,
}

impl SignatureRecord {
    fn to_mutation(&self, line: usize) -> Result<SignatureMutation> {
        let change = self.change.trim();
        let invalid = || {
            ClassifierError::InvalidSignature(format!(
                "line {}: invalid {} change '{}' for {}",
                line, self.kind, change, self.variant
            ))
        };
        let mutation = match self.kind {
            MutationKind::Substitution => {
                let mut chars = change.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => SignatureMutation::substitution(self.position, c),
                    _ => return Err(invalid()),
                }
            }
            MutationKind::Deletion => {
                let length = change.parse::<usize>().map_err(|_| invalid())?;
                SignatureMutation::deletion(self.position, length)
            }
            MutationKind::Insertion => SignatureMutation::insertion(self.position, change),
        };
        mutation.validate().map_err(|_| invalid())?;
        Ok(mutation)
    }

    fn from_mutation(variant: &str, m: &SignatureMutation) -> Self {
        let change = match &m.change {
            SignatureChange::Substitution { alternate } => alternate.to_string(),
            SignatureChange::Deletion { length } => length.to_string(),
            SignatureChange::Insertion { bases } => bases.clone(),
        };
        Self {
            variant: variant.to_string(),
            kind: m.kind(),
            position: m.position,
            change,
        }
    }
}

/// Read a tab-separated signature table.
///
/// Columns: `variant`, `type` (substitution | deletion | insertion),
/// `position`, `change`. Lines starting with `#` are ignored. Variants keep
/// the order of their first appearance.
pub fn read_signature_table<R: Read>(reader: R) -> Result<SignatureTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut grouped: Vec<(String, Vec<SignatureMutation>)> = Vec::new();
    for (i, row) in rdr.deserialize::<SignatureRecord>().enumerate() {
        let record = row?;
        let mutation = record.to_mutation(i + 2)?;
        match grouped
            .iter()
            .position(|(name, _)| name.eq_ignore_ascii_case(&record.variant))
        {
            Some(idx) => grouped[idx].1.push(mutation),
            None => grouped.push((record.variant.clone(), vec![mutation])),
        }
    }

    let signatures = grouped
        .into_iter()
        .map(|(name, muts)| VariantSignature::new(&name, muts))
        .collect::<Result<Vec<_>>>()?;
    SignatureTable::new(signatures)
}

pub fn load_signature_table(path: &Path) -> Result<SignatureTable> {
    let file = std::fs::File::open(path)?;
    let table = read_signature_table(file)?;
    log::info!(
        "Loaded {} signatures from {}: {}",
        table.len(),
        path.display(),
        table.names().join(", ")
    );
    Ok(table)
}

/// Write a signature table in the format [`read_signature_table`] accepts
pub fn write_signature_table<W: Write>(table: &SignatureTable, writer: W) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().delimiter(b'\t').from_writer(writer);
    for sig in table.iter() {
        for m in sig.mutations() {
            wtr.serialize(SignatureRecord::from_mutation(sig.name(), m))?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Derive a variant's signature from its own spike sequence, aligned against the reference
pub fn derive_signature(
    name: &str,
    reference: &Sequence,
    variant: &Sequence,
    config: &AlignmentConfig,
) -> Result<VariantSignature> {
    let alignment = align(reference, variant, config)?;
    let mutations = extract_mutations(&alignment);
    log::info!("Derived {} signature: {} mutations", name, mutations.len());
    VariantSignature::new(name, mutations.iter().map(SignatureMutation::from))
}

/// Build a table from `(name, FASTA path)` pairs of variant reference genomes
pub fn derive_signature_table(
    reference: &Sequence,
    variant_references: &[(String, PathBuf)],
    config: &AlignmentConfig,
) -> Result<SignatureTable> {
    let mut signatures = Vec::with_capacity(variant_references.len());
    for (name, path) in variant_references {
        let record = read_first_record(path)?;
        let variant = normalize_with_mode(&record.sequence, InputMode::Auto)?;
        signatures.push(derive_signature(name, reference, &variant, config)?);
    }
    SignatureTable::new(signatures)
}
