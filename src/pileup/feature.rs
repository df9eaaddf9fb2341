use crate::genomics::CigarOpKind;

/// 4-bit code identifying what a feature records at its position.
///
/// Insertions and clips that occur before the read's first reference-advancing
/// operation get a `Leading*` code so the read layout can be rebuilt from the
/// position alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FeatureCode {
    /// Base differing from the reference under an `M` operation.
    Substitution = 0,
    /// Base under an `=` operation that nonetheless differs from the reference.
    SequenceMatch = 1,
    /// Base under an `X` operation.
    SequenceMismatch = 2,
    /// Deleted reference base.
    Deletion = 3,
    /// Skipped reference base.
    Skip = 4,
    /// Insertion after the anchoring position.
    Insertion = 5,
    /// Trailing soft clip.
    SoftClip = 6,
    /// Trailing hard clip.
    HardClip = 7,
    /// Padding after the anchoring position.
    Padding = 8,
    /// Insertion before the first aligned base.
    LeadingInsertion = 9,
    /// Soft clip before the first aligned base.
    LeadingSoftClip = 10,
    /// Hard clip before the first aligned base.
    LeadingHardClip = 11,
    /// Padding before the first aligned base.
    LeadingPadding = 12,
}

impl FeatureCode {
    /// Width of a feature code in the bit stream.
    pub const BITS: u8 = 4;

    /// Code for a CIGAR operation; `leading` is only meaningful for operations
    /// that do not advance the reference.
    pub fn for_operation(kind: CigarOpKind, leading: bool) -> Self {
        match (kind, leading) {
            (CigarOpKind::Match, _) => FeatureCode::Substitution,
            (CigarOpKind::SequenceMatch, _) => FeatureCode::SequenceMatch,
            (CigarOpKind::SequenceMismatch, _) => FeatureCode::SequenceMismatch,
            (CigarOpKind::Deletion, _) => FeatureCode::Deletion,
            (CigarOpKind::Skip, _) => FeatureCode::Skip,
            (CigarOpKind::Insertion, false) => FeatureCode::Insertion,
            (CigarOpKind::SoftClip, false) => FeatureCode::SoftClip,
            (CigarOpKind::HardClip, false) => FeatureCode::HardClip,
            (CigarOpKind::Padding, false) => FeatureCode::Padding,
            (CigarOpKind::Insertion, true) => FeatureCode::LeadingInsertion,
            (CigarOpKind::SoftClip, true) => FeatureCode::LeadingSoftClip,
            (CigarOpKind::HardClip, true) => FeatureCode::LeadingHardClip,
            (CigarOpKind::Padding, true) => FeatureCode::LeadingPadding,
        }
    }

    /// Numeric code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Inverse of [`FeatureCode::code`].
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => FeatureCode::Substitution,
            1 => FeatureCode::SequenceMatch,
            2 => FeatureCode::SequenceMismatch,
            3 => FeatureCode::Deletion,
            4 => FeatureCode::Skip,
            5 => FeatureCode::Insertion,
            6 => FeatureCode::SoftClip,
            7 => FeatureCode::HardClip,
            8 => FeatureCode::Padding,
            9 => FeatureCode::LeadingInsertion,
            10 => FeatureCode::LeadingSoftClip,
            11 => FeatureCode::LeadingHardClip,
            12 => FeatureCode::LeadingPadding,
            _ => return None,
        })
    }

    /// CIGAR operation the feature was derived from.
    pub fn operation(self) -> CigarOpKind {
        match self {
            FeatureCode::Substitution => CigarOpKind::Match,
            FeatureCode::SequenceMatch => CigarOpKind::SequenceMatch,
            FeatureCode::SequenceMismatch => CigarOpKind::SequenceMismatch,
            FeatureCode::Deletion => CigarOpKind::Deletion,
            FeatureCode::Skip => CigarOpKind::Skip,
            FeatureCode::Insertion | FeatureCode::LeadingInsertion => CigarOpKind::Insertion,
            FeatureCode::SoftClip | FeatureCode::LeadingSoftClip => CigarOpKind::SoftClip,
            FeatureCode::HardClip | FeatureCode::LeadingHardClip => CigarOpKind::HardClip,
            FeatureCode::Padding | FeatureCode::LeadingPadding => CigarOpKind::Padding,
        }
    }

    /// Whether the feature occurs before the read's first aligned base.
    pub fn is_leading(self) -> bool {
        self.code() >= FeatureCode::LeadingInsertion.code()
    }

    /// Whether the feature stores read bases; their count equals the feature length.
    pub fn carries_bases(self) -> bool {
        self.operation().consumes_read()
    }
}

/// Deviation from the reference, or non-reference event, anchored at a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionFeature {
    /// Ordinal of the contributing read among the reads touching this position.
    pub coverage_index: u32,
    /// What the feature records.
    pub code: FeatureCode,
    /// Operation length (1 for per-position substitutions and deletions).
    pub length: u32,
    /// Read bases, empty unless [`FeatureCode::carries_bases`].
    pub bases: Vec<u8>,
}

impl PositionFeature {
    /// Construct a feature.
    pub fn new(coverage_index: u32, code: FeatureCode, length: u32, bases: Vec<u8>) -> Self {
        Self {
            coverage_index,
            code,
            length,
            bases,
        }
    }
}

/// Per-read metadata stored at the read's first aligned position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadHeader {
    /// Coverage index the read occupies at its start position.
    pub coverage_index: u32,
    /// Mapping quality.
    pub mapping_quality: u8,
    /// Reverse-strand flag.
    pub is_reverse: bool,
    /// Number of reference bases the alignment spans.
    pub reference_span: u32,
}
