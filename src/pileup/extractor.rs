use thiserror::Error;

use crate::genomics::{AbsolutePosition, AlignedRead, CigarOpKind, ReferenceError, ReferenceSource};
use crate::pileup::{BuilderMap, FeatureCode, PositionFeature, PositionRecordBuilder};

/// Errors produced while walking a read's alignment.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// CIGAR and read sequence disagree on the number of read bases.
    #[error("malformed alignment at {position}: CIGAR consumes {cigar} read bases, read has {sequence}")]
    ReadLengthMismatch {
        /// Alignment start of the offending read.
        position: AbsolutePosition,
        /// Read bases consumed by the CIGAR.
        cigar: u64,
        /// Bases present in the read.
        sequence: usize,
    },

    /// Quality array and read sequence differ in length.
    #[error("malformed alignment at {position}: {qualities} quality scores for {sequence} bases")]
    QualityLengthMismatch {
        /// Alignment start of the offending read.
        position: AbsolutePosition,
        /// Quality scores present.
        qualities: usize,
        /// Bases present in the read.
        sequence: usize,
    },

    /// Reference lookup failed; match/mismatch cannot be decided.
    #[error(transparent)]
    Reference(#[from] ReferenceError),
}

impl ExtractionError {
    /// Whether the read itself is at fault (as opposed to the reference).
    pub fn is_malformed(&self) -> bool {
        !matches!(self, ExtractionError::Reference(_))
    }
}

/// What a single read contributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// First position touched.
    pub start: AbsolutePosition,
    /// Last position touched.
    pub end: AbsolutePosition,
    /// Features emitted across all positions.
    pub features: usize,
    /// Quality scores consumed; equals the read length.
    pub qualities_consumed: usize,
}

/// Walks a read's CIGAR and routes position-anchored features into builders.
///
/// Reference-matching bases produce no feature; only their quality score is
/// kept.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new extractor.
    pub fn new() -> Self {
        Self
    }

    /// Check the read's internal consistency without touching any builder.
    pub fn validate(&self, read: &AlignedRead) -> Result<(), ExtractionError> {
        let position = read.absolute_start();
        let cigar = read.cigar_read_length();
        if cigar != read.len() as u64 {
            return Err(ExtractionError::ReadLengthMismatch {
                position,
                cigar,
                sequence: read.len(),
            });
        }
        if read.qualities.len() != read.len() {
            return Err(ExtractionError::QualityLengthMismatch {
                position,
                qualities: read.qualities.len(),
                sequence: read.len(),
            });
        }
        Ok(())
    }

    /// Add one read's features to `builders`.
    ///
    /// A malformed read is rejected before any builder is modified.
    pub fn extract<S: ReferenceSource + ?Sized>(
        &self,
        read: &AlignedRead,
        reference: &S,
        builders: &mut BuilderMap,
    ) -> Result<ExtractionSummary, ExtractionError> {
        self.validate(read)?;

        let start = read.absolute_start();
        builders
            .get_or_create(start, reference)?
            .add_read_header(read.mapq, read.is_reverse, read.reference_span());

        let mut walk = ReadWalk {
            builders,
            reference,
            position: start,
            pending: Vec::new(),
            starting: true,
            features: 0,
        };
        let mut cursor = 0usize;

        for op in read.cigar.iter().filter(|op| op.len > 0) {
            let len = op.len as usize;
            match op.kind {
                CigarOpKind::Insertion
                | CigarOpKind::SoftClip
                | CigarOpKind::HardClip
                | CigarOpKind::Padding => {
                    let code = FeatureCode::for_operation(op.kind, walk.starting);
                    let builder = walk.builders.get_or_create(walk.position, walk.reference)?;
                    let coverage_index = builder.coverage();
                    let bases = if op.kind.consumes_read() {
                        builder.push_qualities(&read.qualities[cursor..cursor + len]);
                        let bases = read.sequence[cursor..cursor + len].to_vec();
                        cursor += len;
                        bases
                    } else {
                        Vec::new()
                    };
                    walk.push(PositionFeature::new(coverage_index, code, op.len, bases));
                }
                CigarOpKind::Deletion | CigarOpKind::Skip => {
                    let code = FeatureCode::for_operation(op.kind, false);
                    for i in 0..len {
                        if !(walk.starting && i == 0) {
                            walk.advance()?;
                        }
                        let coverage_index = walk.current()?.coverage();
                        walk.push(PositionFeature::new(coverage_index, code, 1, Vec::new()));
                    }
                    walk.starting = false;
                }
                CigarOpKind::Match | CigarOpKind::SequenceMatch | CigarOpKind::SequenceMismatch => {
                    let code = FeatureCode::for_operation(op.kind, false);
                    for i in 0..len {
                        if !(walk.starting && i == 0) {
                            walk.advance()?;
                        }
                        let base = read.sequence[cursor];
                        let builder = walk.current()?;
                        let coverage_index = builder.coverage();
                        let differs = builder.reference_base() != base;
                        builder.push_quality(read.qualities[cursor]);
                        if differs {
                            walk.push(PositionFeature::new(coverage_index, code, 1, vec![base]));
                        }
                        cursor += 1;
                    }
                    walk.starting = false;
                }
            }
        }

        let end = walk.position;
        let features = walk.features;
        walk.builders.commit(end, walk.pending);
        debug_assert_eq!(cursor, read.qualities.len());

        Ok(ExtractionSummary {
            start,
            end,
            features,
            qualities_consumed: cursor,
        })
    }
}

/// Cursor state while one read is walked along the reference.
struct ReadWalk<'a, S: ?Sized> {
    builders: &'a mut BuilderMap,
    reference: &'a S,
    position: AbsolutePosition,
    pending: Vec<PositionFeature>,
    starting: bool,
    features: usize,
}

impl<S: ReferenceSource + ?Sized> ReadWalk<'_, S> {
    fn current(&mut self) -> Result<&mut PositionRecordBuilder, ReferenceError> {
        self.builders.get_or_create(self.position, self.reference)
    }

    fn push(&mut self, feature: PositionFeature) {
        self.features += 1;
        self.pending.push(feature);
    }

    /// Commit pending features to the current position and step right.
    fn advance(&mut self) -> Result<(), ReferenceError> {
        self.builders
            .commit(self.position, std::mem::take(&mut self.pending));
        self.position = self.position.next();
        self.builders.get_or_create(self.position, self.reference)?;
        Ok(())
    }
}
