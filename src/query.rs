use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::codec::{CodecError, RecordCodec};
use crate::crypto::{CipherError, Ciphertext, PositionCipher};
use crate::genomics::AbsolutePosition;
use crate::pileup::PositionRecord;
use crate::store::{index_path, ContainerReader, PositionIndex, SecramHeader, StoreError};

/// Errors raised while reading records back.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Reference name not present in the file header.
    #[error("reference '{0}' is not in the file header")]
    UnknownReference(String),

    /// Container or index access failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Stored record could not be decoded.
    #[error("failed to decode record: {0}")]
    Codec(#[from] CodecError),

    /// Stored position could not be decrypted.
    #[error(transparent)]
    Cipher(#[from] CipherError),
}

/// Range queries over a SECRAM file.
///
/// Query bounds are encrypted once; the index is searched and stored records
/// are compared entirely in ciphertext space. Only yielded records are
/// decrypted.
#[derive(Debug)]
pub struct QueryEngine<R> {
    header: SecramHeader,
    index: PositionIndex,
    cipher: PositionCipher,
    codec: RecordCodec,
    reader: ContainerReader<R>,
}

impl QueryEngine<BufReader<File>> {
    /// Open a file and its `.secrai` index.
    pub fn open_path(path: &Path, master_key: &[u8]) -> Result<Self, QueryError> {
        let index = PositionIndex::load(&index_path(path))?;
        let file = File::open(path).map_err(StoreError::from)?;
        Self::open(BufReader::new(file), index, master_key)
    }
}

impl<R: Read + Seek> QueryEngine<R> {
    /// Read the header from `reader` and start a cipher session from its salt.
    pub fn open(mut reader: R, index: PositionIndex, master_key: &[u8]) -> Result<Self, QueryError> {
        let header = SecramHeader::read_from(&mut reader)?;
        let cipher = PositionCipher::new(master_key, &header.salt)?;
        debug!(
            references = header.references.len(),
            containers = index.len(),
            "opened SECRAM file"
        );
        Ok(Self {
            codec: RecordCodec::new(header.columns),
            header,
            index,
            cipher,
            reader: ContainerReader::new(reader),
        })
    }

    /// File header.
    pub fn header(&self) -> &SecramHeader {
        &self.header
    }

    /// Container index.
    pub fn index(&self) -> &PositionIndex {
        &self.index
    }

    /// Records of `reference` between `start` and `end` (0-based, inclusive).
    pub fn query(
        &mut self,
        reference: &str,
        start: u32,
        end: u32,
    ) -> Result<RecordIter<'_, R>, QueryError> {
        let id = self
            .header
            .references
            .id_of(reference)
            .ok_or_else(|| QueryError::UnknownReference(reference.to_string()))?;
        self.query_range(AbsolutePosition::new(id, start), AbsolutePosition::new(id, end))
    }

    /// Records with `start <= position <= end`.
    pub fn query_range(
        &mut self,
        start: AbsolutePosition,
        end: AbsolutePosition,
    ) -> Result<RecordIter<'_, R>, QueryError> {
        if start > end {
            return Ok(self.iter(None, Ciphertext::from_raw(0), None));
        }
        let lower = self.cipher.encrypt(start);
        let upper = self.cipher.encrypt(end);
        self.query_encrypted(lower, upper)
    }

    /// Records whose encrypted position lies in `lower..=upper`.
    pub fn query_encrypted(
        &mut self,
        lower: Ciphertext,
        upper: Ciphertext,
    ) -> Result<RecordIter<'_, R>, QueryError> {
        if lower > upper {
            return Ok(self.iter(None, lower, Some(upper)));
        }
        let offset = self.index.offset_for(lower).or_else(|| {
            // the range starts before the first container but may still overlap it
            self.index
                .first()
                .filter(|entry| entry.position <= upper)
                .map(|entry| entry.offset)
        });
        Ok(self.iter(offset, lower, Some(upper)))
    }

    /// Every record in the file, in order.
    pub fn scan(&mut self) -> Result<RecordIter<'_, R>, QueryError> {
        let offset = self.index.first().map(|entry| entry.offset);
        Ok(self.iter(offset, Ciphertext::from_raw(0), None))
    }

    fn iter(
        &mut self,
        offset: Option<u64>,
        lower: Ciphertext,
        upper: Option<Ciphertext>,
    ) -> RecordIter<'_, R> {
        let mut done = offset.is_none();
        let mut pending = None;
        if let Some(offset) = offset {
            if let Err(err) = self.reader.seek(offset) {
                pending = Some(QueryError::from(err));
                done = true;
            }
        }
        RecordIter {
            reader: &mut self.reader,
            codec: &self.codec,
            cipher: &self.cipher,
            lower,
            upper,
            pending,
            done,
            decoded: 0,
        }
    }
}

/// Lazy iterator over decrypted records.
///
/// Stops at the first stored record beyond the upper bound without reading
/// further. Dropping it early only releases the borrow of the engine.
#[derive(Debug)]
pub struct RecordIter<'a, R> {
    reader: &'a mut ContainerReader<R>,
    codec: &'a RecordCodec,
    cipher: &'a PositionCipher,
    lower: Ciphertext,
    upper: Option<Ciphertext>,
    pending: Option<QueryError>,
    done: bool,
    decoded: u64,
}

impl<R> RecordIter<'_, R> {
    /// Stored records decoded so far, including skipped ones.
    pub fn records_decoded(&self) -> u64 {
        self.decoded
    }
}

impl<R: Read + Seek> Iterator for RecordIter<'_, R> {
    type Item = Result<PositionRecord, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending.take() {
            return Some(Err(err));
        }
        while !self.done {
            match self.step() {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => {}
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
        None
    }
}

impl<R: Read + Seek> RecordIter<'_, R> {
    /// Decode one stored record; `Ok(None)` when it was skipped or input ended.
    fn step(&mut self) -> Result<Option<PositionRecord>, QueryError> {
        let Some(raw) = self.reader.read_next()? else {
            self.done = true;
            return Ok(None);
        };
        self.decoded += 1;
        let sealed = self.codec.decode(&raw.bytes, raw.bit_len)?;
        if sealed.position < self.lower {
            return Ok(None);
        }
        if self.upper.is_some_and(|upper| sealed.position > upper) {
            self.done = true;
            return Ok(None);
        }
        let record = sealed.try_map_position(|position| self.cipher.decrypt(position))?;
        Ok(Some(record))
    }
}
