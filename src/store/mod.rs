//! On-disk layout of a SECRAM file and its position index.
//!
//! A file is a [`SecramHeader`] followed by containers of encoded records.
//! The [`PositionIndex`] lives in a sidecar file and maps the encrypted first
//! position of each container to the container's byte offset.

mod container;
mod header;
mod index;

pub use container::{ContainerReader, ContainerWriter, RawRecord};
pub use header::{SecramHeader, FORMAT_VERSION};
pub use index::{index_path, IndexEntry, PositionIndex};

use std::io::{self, Read};

use thiserror::Error;

use crate::crypto::Ciphertext;

/// Errors raised by the container store and index.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// File does not start with the expected magic bytes.
    #[error("not a {kind} file: bad magic bytes")]
    BadMagic {
        /// What the file was expected to be.
        kind: &'static str,
    },

    /// Header written by an incompatible format version.
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),

    /// Serialization of header or index failed.
    #[error("failed to encode metadata: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// Deserialization of header or index failed.
    #[error("failed to decode metadata: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    /// Index entries must be strictly increasing.
    #[error("index entry {position} does not follow {previous}")]
    UnsortedIndex {
        /// Last entry in the index.
        previous: Ciphertext,
        /// Entry that was refused.
        position: Ciphertext,
    },

    /// Container framing is inconsistent.
    #[error("corrupt container at offset {offset}: {reason}")]
    CorruptContainer {
        /// Container offset.
        offset: u64,
        /// What was wrong.
        reason: String,
    },
}

/// Read exactly `len` bytes, growing the buffer only as data arrives.
///
/// Length prefixes come from the file itself, so a corrupt one must not size
/// an allocation up front.
pub(crate) fn read_prefixed<R: Read>(reader: &mut R, len: u64) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(len.min(1 << 16) as usize);
    reader.take(len).read_to_end(&mut bytes)?;
    if bytes.len() as u64 != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {len} bytes, found {}", bytes.len()),
        ));
    }
    Ok(bytes)
}
