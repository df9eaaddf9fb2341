use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::codec::ColumnConfig;
use crate::crypto::Salt;
use crate::genomics::ReferenceDictionary;
use crate::store::{read_prefixed, StoreError};

const MAGIC: &[u8; 8] = b"SECRAM01";

/// Current header version.
pub const FORMAT_VERSION: u32 = 1;

/// Metadata stored at the start of every SECRAM file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecramHeader {
    /// Format version.
    pub version: u32,
    /// Salt for the position cipher session key.
    pub salt: Salt,
    /// Reference names and lengths, in id order.
    pub references: ReferenceDictionary,
    /// Column codecs the records were written with.
    pub columns: ColumnConfig,
}

impl SecramHeader {
    /// Header for a new file with a fresh salt.
    pub fn new(references: ReferenceDictionary, columns: ColumnConfig) -> Self {
        Self {
            version: FORMAT_VERSION,
            salt: Salt::generate(),
            references,
            columns,
        }
    }

    /// Write magic, length and body; returns the bytes written.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<u64, StoreError> {
        let body = bincode::serde::encode_to_vec(self, bincode::config::standard())?;
        writer.write_all(MAGIC)?;
        writer.write_all(&(body.len() as u32).to_le_bytes())?;
        writer.write_all(&body)?;
        Ok((MAGIC.len() + 4 + body.len()) as u64)
    }

    /// Read a header, leaving `reader` at the first container.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, StoreError> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(StoreError::BadMagic { kind: "SECRAM" });
        }
        let mut len = [0u8; 4];
        reader.read_exact(&mut len)?;
        let body = read_prefixed(reader, u32::from_le_bytes(len) as u64)?;
        let (header, _): (SecramHeader, usize) =
            bincode::serde::decode_from_slice(&body, bincode::config::standard())?;
        if header.version != FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion(header.version));
        }
        Ok(header)
    }
}
