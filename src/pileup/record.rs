use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::genomics::{AbsolutePosition, ReferenceError, ReferenceSource};
use crate::pileup::{PositionFeature, ReadHeader};

/// Closed pileup record for one reference position.
///
/// The position type is generic: records carry an [`AbsolutePosition`] while
/// they are being assembled and a ciphertext once sealed for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionRecord<P = AbsolutePosition> {
    /// Record key.
    pub position: P,
    /// Reference base at this position (uppercase ASCII).
    pub reference_base: u8,
    /// Number of reads that touched this position.
    pub coverage: u32,
    /// Headers of reads whose alignment starts here.
    pub read_headers: Vec<ReadHeader>,
    /// Features ordered by coverage index, then insertion order.
    pub features: Vec<PositionFeature>,
    /// Quality scores contributed by the covering reads.
    pub quality_scores: Vec<u8>,
}

impl<P> PositionRecord<P> {
    /// Replace the position key.
    pub fn map_position<Q>(self, f: impl FnOnce(P) -> Q) -> PositionRecord<Q> {
        PositionRecord {
            position: f(self.position),
            reference_base: self.reference_base,
            coverage: self.coverage,
            read_headers: self.read_headers,
            features: self.features,
            quality_scores: self.quality_scores,
        }
    }

    /// Replace the position key with a fallible conversion.
    pub fn try_map_position<Q, E>(
        self,
        f: impl FnOnce(P) -> Result<Q, E>,
    ) -> Result<PositionRecord<Q>, E> {
        Ok(PositionRecord {
            position: f(self.position)?,
            reference_base: self.reference_base,
            coverage: self.coverage,
            read_headers: self.read_headers,
            features: self.features,
            quality_scores: self.quality_scores,
        })
    }
}

/// Mutable record under construction.
#[derive(Debug, Clone)]
pub struct PositionRecordBuilder {
    position: AbsolutePosition,
    reference_base: u8,
    coverage: u32,
    read_headers: Vec<ReadHeader>,
    features: Vec<PositionFeature>,
    quality_scores: Vec<u8>,
}

impl PositionRecordBuilder {
    /// Open a builder; the reference base is fixed from here on.
    pub fn new(position: AbsolutePosition, reference_base: u8) -> Self {
        Self {
            position,
            reference_base,
            coverage: 0,
            read_headers: Vec::new(),
            features: Vec::new(),
            quality_scores: Vec::new(),
        }
    }

    /// Position of this builder.
    pub fn position(&self) -> AbsolutePosition {
        self.position
    }

    /// Reference base at this position.
    pub fn reference_base(&self) -> u8 {
        self.reference_base
    }

    /// Reads committed so far; also the coverage index of the next read.
    pub fn coverage(&self) -> u32 {
        self.coverage
    }

    /// Record the header of a read starting here.
    pub fn add_read_header(&mut self, mapping_quality: u8, is_reverse: bool, reference_span: u32) {
        self.read_headers.push(ReadHeader {
            coverage_index: self.coverage,
            mapping_quality,
            is_reverse,
            reference_span,
        });
    }

    /// Append one read's features and count the read.
    pub fn commit_read(&mut self, features: Vec<PositionFeature>) {
        debug_assert!(features.iter().all(|f| f.coverage_index == self.coverage));
        self.features.extend(features);
        self.coverage += 1;
    }

    /// Add a single quality score.
    pub fn push_quality(&mut self, quality: u8) {
        self.quality_scores.push(quality);
    }

    /// Add a run of quality scores.
    pub fn push_qualities(&mut self, qualities: &[u8]) {
        self.quality_scores.extend_from_slice(qualities);
    }

    /// Freeze into an immutable record.
    pub fn close(self) -> PositionRecord {
        PositionRecord {
            position: self.position,
            reference_base: self.reference_base,
            coverage: self.coverage,
            read_headers: self.read_headers,
            features: self.features,
            quality_scores: self.quality_scores,
        }
    }
}

/// Ordered map of open builders, owned by one assembler.
#[derive(Debug, Default)]
pub struct BuilderMap {
    builders: BTreeMap<AbsolutePosition, PositionRecordBuilder>,
    peak_open: usize,
}

impl BuilderMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder at `position`, opening it with the reference base if needed.
    pub fn get_or_create<S: ReferenceSource + ?Sized>(
        &mut self,
        position: AbsolutePosition,
        reference: &S,
    ) -> Result<&mut PositionRecordBuilder, ReferenceError> {
        let open = self.builders.len();
        match self.builders.entry(position) {
            Entry::Occupied(slot) => Ok(slot.into_mut()),
            Entry::Vacant(slot) => {
                let base = reference.base_at(position)?;
                self.peak_open = self.peak_open.max(open + 1);
                Ok(slot.insert(PositionRecordBuilder::new(position, base)))
            }
        }
    }

    /// Commit one read's pending features to the builder at `position`.
    pub fn commit(&mut self, position: AbsolutePosition, features: Vec<PositionFeature>) {
        if let Some(builder) = self.builders.get_mut(&position) {
            builder.commit_read(features);
        }
    }

    /// Close the smallest open builder if it lies strictly before `limit`.
    pub fn pop_before(&mut self, limit: AbsolutePosition) -> Option<PositionRecord> {
        match self.builders.first_key_value() {
            Some((&position, _)) if position < limit => {
                self.builders.pop_first().map(|(_, builder)| builder.close())
            }
            _ => None,
        }
    }

    /// Close every remaining builder in ascending order.
    pub fn drain(&mut self) -> Vec<PositionRecord> {
        std::mem::take(&mut self.builders)
            .into_values()
            .map(PositionRecordBuilder::close)
            .collect()
    }

    /// Number of open builders.
    pub fn len(&self) -> usize {
        self.builders.len()
    }

    /// Returns `true` when nothing is open.
    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// Largest number of builders open at once.
    pub fn peak_open(&self) -> usize {
        self.peak_open
    }
}
