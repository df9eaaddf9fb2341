//! Bit-level record serialization.
//!
//! Records are written as a sequence of columns, each with its own
//! [`ValueCodec`]. The layout carries no self-describing lengths beyond the
//! explicit counts, so every codec can report the exact number of bits a
//! value will take before anything is written; encode and decode both check
//! their bit count against that prediction.

mod bits;
mod record;
mod value;

pub use bits::{BitReader, BitWriter};
pub use record::{ColumnConfig, EncodedRecord, RecordCodec};
pub use value::ValueCodec;

use thiserror::Error;

/// Errors raised while encoding or decoding records.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Array decode was attempted without an element count.
    #[error("array codec needs an explicit element count")]
    LengthRequired,

    /// Value does not fit the column's codec.
    #[error("value {value} does not fit in {bits} bits")]
    ValueOutOfRange {
        /// Offending value.
        value: i128,
        /// Width available.
        bits: u8,
    },

    /// Codec width outside 0..=64.
    #[error("invalid codec width {0}")]
    InvalidWidth(u8),

    /// Stream ended before a value was complete.
    #[error("bit stream ended: needed {needed} bits, {available} available")]
    UnexpectedEnd {
        /// Bit offset that had to be reached.
        needed: u64,
        /// Bits in the stream.
        available: u64,
    },

    /// Predicted and actual bit (or element) counts disagree.
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Predicted or framed length.
        expected: u64,
        /// Length actually produced or consumed.
        actual: u64,
    },

    /// Base outside the 4-bit nucleotide alphabet.
    #[error("symbol {0:#04x} is not in the nucleotide alphabet")]
    UnsupportedSymbol(u8),

    /// Feature code outside the known table.
    #[error("unknown feature code {0}")]
    InvalidFeatureCode(u8),
}
