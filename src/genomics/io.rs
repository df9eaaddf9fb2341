use anyhow::{Context, Result};
use rust_htslib::bam::{self, record::Cigar, HeaderView, Read};
use std::path::Path;

use crate::genomics::{AlignedRead, CigarOp, CigarOpKind, ReferenceDictionary};

/// Build a reference dictionary from a BAM header's `@SQ` lines.
pub fn dictionary_from_header(header: &HeaderView) -> ReferenceDictionary {
    let mut dictionary = ReferenceDictionary::new();
    for tid in 0..header.target_count() {
        let name = String::from_utf8_lossy(header.tid2name(tid)).into_owned();
        let length = header.target_len(tid).unwrap_or(0);
        dictionary.push(name, length);
    }
    dictionary
}

/// Convert an htslib CIGAR element.
pub fn convert_cigar(op: &Cigar) -> CigarOp {
    match *op {
        Cigar::Match(len) => CigarOp::new(CigarOpKind::Match, len),
        Cigar::Equal(len) => CigarOp::new(CigarOpKind::SequenceMatch, len),
        Cigar::Diff(len) => CigarOp::new(CigarOpKind::SequenceMismatch, len),
        Cigar::Ins(len) => CigarOp::new(CigarOpKind::Insertion, len),
        Cigar::Del(len) => CigarOp::new(CigarOpKind::Deletion, len),
        Cigar::RefSkip(len) => CigarOp::new(CigarOpKind::Skip, len),
        Cigar::SoftClip(len) => CigarOp::new(CigarOpKind::SoftClip, len),
        Cigar::HardClip(len) => CigarOp::new(CigarOpKind::HardClip, len),
        Cigar::Pad(len) => CigarOp::new(CigarOpKind::Padding, len),
    }
}

/// Convert a BAM record into the pipeline's read representation.
///
/// Records without a reference id or position come back flagged as unmapped.
pub fn convert_record(record: &bam::Record) -> AlignedRead {
    let cigar = record.cigar().iter().map(convert_cigar).collect();
    let sequence = record.seq().as_bytes();
    let qualities = record.qual().to_vec();
    let tid = record.tid();
    let pos = record.pos();

    let read = AlignedRead::new(
        tid.max(0) as u32,
        pos.max(0) as u32,
        cigar,
        sequence,
        qualities,
    )
    .with_mapq(record.mapq())
    .with_reverse(record.is_reverse());

    if record.is_unmapped() || tid < 0 || pos < 0 {
        read.unmapped()
    } else {
        read
    }
}

/// Open a BAM file, returning its reader and reference dictionary.
///
/// The caller is responsible for iterating records in coordinate order.
pub fn open_bam<P: AsRef<Path>>(input_path: P) -> Result<(bam::Reader, ReferenceDictionary)> {
    let path = input_path.as_ref();
    let reader = bam::Reader::from_path(path)
        .with_context(|| format!("failed to open alignment file {}", path.display()))?;
    let dictionary = dictionary_from_header(reader.header());
    Ok((reader, dictionary))
}
