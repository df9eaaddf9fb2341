//! # SECRAM: encrypted columnar pileup storage
//!
//! Aligned reads are converted into one record per reference position that
//! stores only what differs from the reference, plus per-read headers and
//! quality scores. Record positions are encrypted with an order-preserving
//! cipher, so the stored file can be indexed and range-queried without
//! revealing plaintext coordinates.
//!
//! ## Pipeline
//!
//! 1. **Feature extraction**: walk each read's CIGAR against the reference
//! 2. **Assembly**: accumulate per-position builders, closing them behind a
//!    low-water mark as sorted reads stream in
//! 3. **Sealing**: encrypt the position, bit-pack the record, group records
//!    into indexed containers
//! 4. **Query**: encrypt the bounds, seek through the index, decode lazily
//!
//! ## Usage Example
//!
//! ```ignore
//! use secram::{QueryEngine, SecramConfig, SecramWriter};
//!
//! let mut writer = SecramWriter::new(file, references, reference, key, &SecramConfig::default())?;
//! for read in reads {
//!     writer.add_read(&read)?;
//! }
//! let (_, summary) = writer.finish()?;
//!
//! let mut engine = QueryEngine::open(file, summary.index, key)?;
//! for record in engine.query("chr1", 150, 170)? {
//!     println!("{:?}", record?);
//! }
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

pub mod codec; // Bit-level record serialization
pub mod config; // Writer settings
pub mod convert; // BAM conversion driver
pub mod crypto; // Order-preserving position cipher
pub mod genomics; // Reads, positions and reference lookup
pub mod pileup; // Per-position record assembly
pub mod query; // Range queries
pub mod render; // Text output
pub mod store; // Containers, header and index
pub mod writer; // Streaming file writer

pub use codec::{CodecError, ColumnConfig, EncodedRecord, RecordCodec, ValueCodec};
pub use config::{ConfigError, SecramConfig};
pub use convert::{convert_bam, convert_reads};
pub use crypto::{CipherError, Ciphertext, PositionCipher, Salt};
pub use genomics::{AbsolutePosition, AlignedRead, ReferenceSource};
pub use pileup::{PositionRecord, PositionRecordAssembler};
pub use query::{QueryEngine, QueryError, RecordIter};
pub use store::{PositionIndex, SecramHeader, StoreError};
pub use writer::{SecramWriter, WriteError, WriteSummary};
