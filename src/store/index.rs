use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::Ciphertext;
use crate::store::StoreError;

const MAGIC: &[u8; 8] = b"SECRAI01";

/// Sidecar index location for a SECRAM file: `<file>.secrai`.
pub fn index_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".secrai");
    PathBuf::from(name)
}

/// First encrypted position of a container and where the container starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Encrypted position of the container's first record.
    pub position: Ciphertext,
    /// Byte offset of the container in the SECRAM file.
    pub offset: u64,
}

/// Container index sorted by encrypted position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionIndex {
    entries: Vec<IndexEntry>,
}

impl PositionIndex {
    /// Empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; positions must strictly increase.
    pub fn push(&mut self, position: Ciphertext, offset: u64) -> Result<(), StoreError> {
        if let Some(last) = self.entries.last() {
            if position <= last.position {
                return Err(StoreError::UnsortedIndex {
                    previous: last.position,
                    position,
                });
            }
        }
        self.entries.push(IndexEntry { position, offset });
        Ok(())
    }

    /// Offset of the last container starting at or before `position`.
    ///
    /// `None` when `position` precedes every indexed container.
    pub fn offset_for(&self, position: Ciphertext) -> Option<u64> {
        let idx = self.entries.partition_point(|entry| entry.position <= position);
        idx.checked_sub(1).map(|idx| self.entries[idx].offset)
    }

    /// First entry, if any.
    pub fn first(&self) -> Option<&IndexEntry> {
        self.entries.first()
    }

    /// Entries in order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Number of containers indexed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` for an index with no containers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize with magic bytes.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), StoreError> {
        writer.write_all(MAGIC)?;
        bincode::serde::encode_into_std_write(self, writer, bincode::config::standard())?;
        Ok(())
    }

    /// Deserialize, checking magic and ordering.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, StoreError> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(StoreError::BadMagic { kind: "SECRAM index" });
        }
        let stored: PositionIndex =
            bincode::serde::decode_from_std_read(reader, bincode::config::standard())?;
        let mut index = PositionIndex::new();
        for entry in stored.entries {
            index.push(entry.position, entry.offset)?;
        }
        Ok(index)
    }

    /// Write to `path`.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Read from `path`.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        Self::read_from(&mut BufReader::new(File::open(path)?))
    }
}
