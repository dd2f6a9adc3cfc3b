/***
STEP'LTON: discrete-time simulation of polysome translation
    Copyright (C) 2026 Andrew T. Martens

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License, version 3,
    as published by the Free Software Foundation.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.

e-mail: steplton@logical.bio
***/

/* util.rs: reading gene sequences & parsing ramp windows. */

use anyhow::{Context, Result, bail};
use std::{fs::File, io::Read, path::Path};

use bio::io::fasta::{Reader, Record};
use csv::WriterBuilder;

use crate::rates::Window;

/// A gene as the simulation sees it: a label for reporting and a length in
/// codons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gene {
    pub label: String,
    pub num_codons: usize,
}

/// Returns `true` if the given sequence (ASCII‐encoded) is composed *exclusively*
/// of the letters A, T, G, C, or U (case‐insensitive).
fn looks_like_nucleotide_only(seq: &[u8]) -> bool {
    seq
        .iter()
        .all(
            |&b| matches!(
                b,
                b'A' |
                b'a' |
                b'T' |
                b't' |
                b'G' |
                b'g' |
                b'C' |
                b'c' |
                b'U' |
                b'u'
            )
        )
}

/// Read a gene from `path`. A file starting with '>' is treated as FASTA
/// (first record only; the record id is the label); anything else is a bare
/// nucleotide listing labeled after the file stem. Length is reported in
/// codons. The simulation cannot run without a gene length, so every failure
/// here is fatal to the request.
pub fn read_gene(path: &str, codon_size: usize) -> Result<Gene> {
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open gene file '{}'", path))?;

    let mut raw = String::new();
    file.read_to_string(&mut raw)
        .with_context(|| format!("Failed to read gene file '{}'", path))?;

    let (label, sequence) = if raw.trim_start().starts_with('>') {
        first_nucleotide_record(raw.as_bytes())?
    } else {
        let stem = Path::new(path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "gene".to_string());
        (stem, raw)
    };

    gene_from_sequence(label, &sequence, codon_size)
}

fn first_nucleotide_record(bytes: &[u8]) -> Result<(String, String)> {
    let fasta_reader = Reader::new(bytes);

    if let Some(next) = fasta_reader.records().next() {
        let record: Record = next.context("Error while reading the first FASTA record")?;
        let sequence = String::from_utf8(record.seq().to_vec())
            .context("Invalid UTF-8 found in sequence data")?;

        Ok((record.id().to_string(), sequence))
    } else {
        bail!("gene file contained no FASTA records")
    }
}

fn gene_from_sequence(label: String, sequence: &str, codon_size: usize) -> Result<Gene> {
    let residues: Vec<u8> = sequence
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    if !looks_like_nucleotide_only(&residues) {
        bail!(
            "gene '{}' contains non-nucleotide residues \
             (expected only A, T, G, C or U)",
            label
        );
    }

    let num_codons = residues.len() / codon_size;
    if num_codons == 0 {
        bail!("gene '{}' is shorter than one codon; nothing to simulate", label);
    }

    Ok(Gene { label, num_codons })
}

/* Parse a "start:critical" ramp window, both bounds in timesteps. */
pub fn parse_window(input: &str) -> Result<Window> {
    let fields: Vec<_> = input.split(':').collect();
    if fields.len() != 2 {
        bail!("expected a window of the form start:critical, got `{}`", input);
    }

    let start = fields[0]
        .trim()
        .parse::<u64>()
        .with_context(|| format!("invalid window start `{}`", fields[0]))?;
    let critical = fields[1]
        .trim()
        .parse::<u64>()
        .with_context(|| format!("invalid window end `{}`", fields[1]))?;

    if start > critical {
        bail!("window ends before it starts: {}:{}", start, critical);
    }

    Ok(Window { start, critical })
}

/// Write the run metadata next to the occupancy dataset. The downstream
/// histogram stage needs the codon count & transcript count to normalize.
pub fn write_gene_info<P: AsRef<Path>>(path: P, gene: &Gene, num_mRNA: u16) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path.as_ref())
        .with_context(|| format!("Failed to create '{}'", path.as_ref().display()))?;

    let num_codons = gene.num_codons.to_string();
    let num_mRNA = num_mRNA.to_string();

    writer.write_record(["target", "num_codons", "num_mRNA"])?;
    writer.write_record([gene.label.as_str(), num_codons.as_str(), num_mRNA.as_str()])?;
    writer.flush()?;

    Ok(())
}
