use thiserror::Error;
use tracing::{debug, trace};

use crate::genomics::{AbsolutePosition, AlignedRead, ReferenceError, ReferenceSource};
use crate::pileup::{
    BuilderMap, ExtractionError, ExtractionSummary, FeatureExtractor, PositionRecord,
    PositionRecordBuilder,
};

/// Errors surfaced by the assembler.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// Read starts before the previously ingested read.
    #[error("read at {start} arrived after a read starting at {previous}; input must be coordinate sorted")]
    OutOfOrder {
        /// Start of the previously accepted read.
        previous: AbsolutePosition,
        /// Start of the rejected read.
        start: AbsolutePosition,
    },

    /// Feature extraction failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

impl AssemblyError {
    /// Whether the run has to stop; otherwise only the read was rejected.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AssemblyError::Extraction(ExtractionError::Reference(_)))
    }
}

/// Counters collected while assembling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    /// Reads whose features were added.
    pub reads_added: u64,
    /// Unmapped reads skipped without effect.
    pub reads_unmapped: u64,
    /// Reads rejected as malformed or out of order.
    pub reads_rejected: u64,
    /// Closed records handed out.
    pub records_emitted: u64,
}

/// Streams reads into per-position records with a low-water-mark flush.
///
/// Reads must arrive sorted by alignment start. After each read starting at
/// `S`, every open position strictly below `S` is closed: no later read can
/// reach back to it. Open builders therefore stay bounded by the span of
/// overlapping reads rather than the genome length.
#[derive(Debug)]
pub struct PositionRecordAssembler<S> {
    reference: S,
    builders: BuilderMap,
    extractor: FeatureExtractor,
    last_start: Option<AbsolutePosition>,
    check_order: bool,
    stats: AssemblyStats,
}

impl<S: ReferenceSource> PositionRecordAssembler<S> {
    /// Create an assembler over a reference source.
    pub fn new(reference: S) -> Self {
        Self {
            reference,
            builders: BuilderMap::new(),
            extractor: FeatureExtractor::new(),
            last_start: None,
            check_order: true,
            stats: AssemblyStats::default(),
        }
    }

    /// Enable or disable rejection of out-of-order reads.
    ///
    /// With the check disabled, unsorted input closes records early and
    /// produces incorrect output.
    pub fn with_order_check(mut self, enabled: bool) -> Self {
        self.check_order = enabled;
        self
    }

    /// Builder at `position`, opened with the reference base if needed.
    pub fn get_or_create(
        &mut self,
        position: AbsolutePosition,
    ) -> Result<&mut PositionRecordBuilder, ReferenceError> {
        self.builders.get_or_create(position, &self.reference)
    }

    /// Ingest one read and return the records it allowed to close, ascending.
    pub fn add_read(&mut self, read: &AlignedRead) -> Result<Vec<PositionRecord>, AssemblyError> {
        if read.is_unmapped {
            trace!("skipping unmapped read");
            self.stats.reads_unmapped += 1;
            return Ok(Vec::new());
        }

        let start = read.absolute_start();
        if self.check_order {
            if let Some(previous) = self.last_start.filter(|&previous| start < previous) {
                self.stats.reads_rejected += 1;
                return Err(AssemblyError::OutOfOrder { previous, start });
            }
        }

        let summary = match self
            .extractor
            .extract(read, &self.reference, &mut self.builders)
        {
            Ok(summary) => summary,
            Err(err) => {
                if err.is_malformed() {
                    self.stats.reads_rejected += 1;
                }
                return Err(err.into());
            }
        };
        self.trace_read(&summary);
        self.stats.reads_added += 1;
        self.last_start = Some(start);

        let mut closed = Vec::new();
        while let Some(record) = self.builders.pop_before(start) {
            closed.push(record);
        }
        self.stats.records_emitted += closed.len() as u64;
        Ok(closed)
    }

    /// Close every remaining builder, ascending.
    pub fn finish(&mut self) -> Vec<PositionRecord> {
        let remaining = self.builders.drain();
        self.stats.records_emitted += remaining.len() as u64;
        debug!(
            records = remaining.len(),
            peak_open = self.builders.peak_open(),
            "flushed remaining builders"
        );
        remaining
    }

    /// Number of builders currently open.
    pub fn open_builders(&self) -> usize {
        self.builders.len()
    }

    /// Largest number of builders that were open at once.
    pub fn peak_open_builders(&self) -> usize {
        self.builders.peak_open()
    }

    /// Counters so far.
    pub fn stats(&self) -> AssemblyStats {
        self.stats
    }

    fn trace_read(&self, summary: &ExtractionSummary) {
        trace!(
            start = %summary.start,
            end = %summary.end,
            features = summary.features,
            open = self.builders.len(),
            "read assembled"
        );
    }
}
