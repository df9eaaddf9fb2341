//! Columnar pileup construction.
//!
//! Reads are walked operation by operation ([`FeatureExtractor`]) and their
//! deviations from the reference are attached to per-position builders. The
//! [`PositionRecordAssembler`] owns those builders and closes them in
//! ascending position order once no later read can reach them.

mod assembler;
mod extractor;
mod feature;
mod record;

pub use assembler::{AssemblyError, AssemblyStats, PositionRecordAssembler};
pub use extractor::{ExtractionError, ExtractionSummary, FeatureExtractor};
pub use feature::{FeatureCode, PositionFeature, ReadHeader};
pub use record::{BuilderMap, PositionRecord, PositionRecordBuilder};
