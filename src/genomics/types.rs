use std::sync::Arc;

use crate::genomics::AbsolutePosition;

/// CIGAR operation kinds describing how a read aligns to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CigarOpKind {
    /// Alignment match (`M`), base may or may not equal the reference.
    Match,
    /// Sequence match (`=`).
    SequenceMatch,
    /// Sequence mismatch (`X`).
    SequenceMismatch,
    /// Insertion relative to the reference (`I`).
    Insertion,
    /// Deletion relative to the reference (`D`).
    Deletion,
    /// Skipped reference region (`N`).
    Skip,
    /// Soft clipping (sequence present in read only, `S`).
    SoftClip,
    /// Hard clipping (trimmed sequence not present in read, `H`).
    HardClip,
    /// Silent deletion from padded reference (`P`).
    Padding,
}

impl CigarOpKind {
    /// Whether the operation consumes read bases (and quality scores).
    pub fn consumes_read(self) -> bool {
        matches!(
            self,
            CigarOpKind::Match
                | CigarOpKind::SequenceMatch
                | CigarOpKind::SequenceMismatch
                | CigarOpKind::Insertion
                | CigarOpKind::SoftClip
        )
    }

    /// Whether the operation advances the reference position.
    pub fn consumes_reference(self) -> bool {
        matches!(
            self,
            CigarOpKind::Match
                | CigarOpKind::SequenceMatch
                | CigarOpKind::SequenceMismatch
                | CigarOpKind::Deletion
                | CigarOpKind::Skip
        )
    }

    /// SAM character for the operation.
    pub fn symbol(self) -> char {
        match self {
            CigarOpKind::Match => 'M',
            CigarOpKind::SequenceMatch => '=',
            CigarOpKind::SequenceMismatch => 'X',
            CigarOpKind::Insertion => 'I',
            CigarOpKind::Deletion => 'D',
            CigarOpKind::Skip => 'N',
            CigarOpKind::SoftClip => 'S',
            CigarOpKind::HardClip => 'H',
            CigarOpKind::Padding => 'P',
        }
    }

    /// Parse a SAM operation character.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        Some(match symbol {
            'M' => CigarOpKind::Match,
            '=' => CigarOpKind::SequenceMatch,
            'X' => CigarOpKind::SequenceMismatch,
            'I' => CigarOpKind::Insertion,
            'D' => CigarOpKind::Deletion,
            'N' => CigarOpKind::Skip,
            'S' => CigarOpKind::SoftClip,
            'H' => CigarOpKind::HardClip,
            'P' => CigarOpKind::Padding,
            _ => return None,
        })
    }
}

/// CIGAR operation with length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    /// Operation kind.
    pub kind: CigarOpKind,
    /// Number of bases affected by the operation.
    pub len: u32,
}

impl CigarOp {
    /// Construct a new CIGAR operation.
    pub fn new(kind: CigarOpKind, len: u32) -> Self {
        Self { kind, len }
    }
}

/// Parse a compact CIGAR string such as `2M1I2M`.
///
/// Returns `None` on any syntax error. `*` parses as an empty operation list.
pub fn parse_cigar(cigar: &str) -> Option<Vec<CigarOp>> {
    if cigar == "*" {
        return Some(Vec::new());
    }
    let mut ops = Vec::new();
    let mut len: Option<u32> = None;
    for ch in cigar.chars() {
        if let Some(digit) = ch.to_digit(10) {
            len = Some(len.unwrap_or(0).checked_mul(10)?.checked_add(digit)?);
        } else {
            let kind = CigarOpKind::from_symbol(ch)?;
            ops.push(CigarOp::new(kind, len.take()?));
        }
    }
    if len.is_some() {
        return None;
    }
    Some(ops)
}

/// Aligned read with sequence and quality information.
#[derive(Debug, Clone)]
pub struct AlignedRead {
    /// Reference sequence identifier (index into the reference dictionary).
    pub reference_id: u32,
    /// 0-based leftmost reference coordinate.
    pub pos: u32,
    /// Mapping quality (Phred-scaled).
    pub mapq: u8,
    /// CIGAR describing the alignment.
    pub cigar: Vec<CigarOp>,
    /// Read sequence stored as uppercase ASCII.
    pub sequence: Arc<[u8]>,
    /// Per-base quality scores in Phred space.
    pub qualities: Arc<[u8]>,
    /// Whether the read maps to the reverse complement strand.
    pub is_reverse: bool,
    /// Whether the read is unmapped; unmapped reads carry no usable alignment.
    pub is_unmapped: bool,
}

impl AlignedRead {
    /// Construct a new mapped, forward-strand read.
    pub fn new(
        reference_id: u32,
        pos: u32,
        cigar: Vec<CigarOp>,
        sequence: impl Into<Arc<[u8]>>,
        qualities: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            reference_id,
            pos,
            mapq: 255,
            cigar,
            sequence: sequence.into(),
            qualities: qualities.into(),
            is_reverse: false,
            is_unmapped: false,
        }
    }

    /// Set the mapping quality.
    pub fn with_mapq(mut self, mapq: u8) -> Self {
        self.mapq = mapq;
        self
    }

    /// Set the strand.
    pub fn with_reverse(mut self, is_reverse: bool) -> Self {
        self.is_reverse = is_reverse;
        self
    }

    /// Mark the read as unmapped.
    pub fn unmapped(mut self) -> Self {
        self.is_unmapped = true;
        self
    }

    /// Read length inferred from the sequence.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Returns `true` when the read carries no bases.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Absolute position of the first aligned reference base.
    pub fn absolute_start(&self) -> AbsolutePosition {
        AbsolutePosition::new(self.reference_id, self.pos)
    }

    /// Number of reference bases covered by the alignment.
    pub fn reference_span(&self) -> u32 {
        self.cigar
            .iter()
            .filter(|op| op.kind.consumes_reference())
            .map(|op| op.len)
            .sum()
    }

    /// Number of read bases the CIGAR claims to consume.
    pub fn cigar_read_length(&self) -> u64 {
        self.cigar
            .iter()
            .filter(|op| op.kind.consumes_read())
            .map(|op| op.len as u64)
            .sum()
    }
}
