use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use rust_htslib::bam::Read;
use tracing::{info, warn};

use crate::config::SecramConfig;
use crate::genomics::{
    convert_record, load_fasta_reference, open_bam, AlignedRead, ReferenceDictionary,
    ReferenceSource,
};
use crate::store::index_path;
use crate::writer::{SecramWriter, WriteSummary};

/// Convert a coordinate-sorted BAM file into a SECRAM file plus `.secrai` index.
pub fn convert_bam(
    input: &Path,
    reference: &Path,
    output: &Path,
    master_key: &[u8],
    config: &SecramConfig,
) -> Result<WriteSummary> {
    let (mut reader, references) = open_bam(input)?;
    let sequences = load_fasta_reference(reference, &references)
        .with_context(|| format!("failed to load reference {}", reference.display()))?;
    info!(
        input = %input.display(),
        references = references.len(),
        "converting alignments"
    );
    let reads = reader.records().map(|record| {
        record
            .map(|record| convert_record(&record))
            .context("failed to read alignment record")
    });
    convert_reads(reads, references, sequences, output, master_key, config)
}

/// Write already converted reads to `output` and its index.
///
/// Rejected reads are logged and skipped; any other failure aborts the run.
pub fn convert_reads<I, S>(
    reads: I,
    references: ReferenceDictionary,
    reference: S,
    output: &Path,
    master_key: &[u8],
    config: &SecramConfig,
) -> Result<WriteSummary>
where
    I: IntoIterator<Item = Result<AlignedRead>>,
    S: ReferenceSource,
{
    let file = File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let mut writer = SecramWriter::new(BufWriter::new(file), references, reference, master_key, config)
        .context("failed to start SECRAM output")?;

    for read in reads {
        let read = read?;
        match writer.add_read(&read) {
            Ok(()) => {}
            Err(err) if !err.is_fatal() => {
                warn!(error = %err, "rejected read");
            }
            Err(err) => return Err(err).context("conversion aborted"),
        }
    }

    let (_, summary) = writer.finish().context("failed to finish SECRAM output")?;
    let index_file = index_path(output);
    summary
        .index
        .save(&index_file)
        .with_context(|| format!("failed to write index {}", index_file.display()))?;

    info!(
        output = %output.display(),
        records = summary.records,
        containers = summary.containers,
        reads = summary.reads.reads_added,
        unmapped = summary.reads.reads_unmapped,
        rejected = summary.reads.reads_rejected,
        peak_open = summary.peak_open_builders,
        "conversion finished"
    );
    Ok(summary)
}
