use std::io::{self, Read, Seek, SeekFrom, Write};

use tracing::trace;

use crate::codec::EncodedRecord;
use crate::store::{read_prefixed, PositionIndex, StoreError};

/// Container header: record count (u32 LE) and payload length (u64 LE).
const CONTAINER_HEADER_LEN: usize = 12;
/// Per-record prefix: payload length in bits (u32 LE).
const RECORD_PREFIX_LEN: usize = 4;

/// Encoded record as read back from a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Zero-padded payload.
    pub bytes: Vec<u8>,
    /// Meaningful bits in `bytes`.
    pub bit_len: u64,
}

/// Groups encoded records into containers and indexes their first position.
#[derive(Debug)]
pub struct ContainerWriter<W: Write> {
    inner: W,
    offset: u64,
    records_per_container: usize,
    pending: Vec<EncodedRecord>,
    index: PositionIndex,
    records_written: u64,
}

impl<W: Write> ContainerWriter<W> {
    /// Write containers to `inner`, whose current byte offset is `start_offset`.
    pub fn new(inner: W, start_offset: u64, records_per_container: usize) -> Self {
        let records_per_container = records_per_container.max(1);
        Self {
            inner,
            offset: start_offset,
            records_per_container,
            pending: Vec::with_capacity(records_per_container),
            index: PositionIndex::new(),
            records_written: 0,
        }
    }

    /// Queue one record; full containers are written immediately.
    pub fn append(&mut self, record: EncodedRecord) -> Result<(), StoreError> {
        self.pending.push(record);
        if self.pending.len() >= self.records_per_container {
            self.flush_container()?;
        }
        Ok(())
    }

    /// Containers written so far.
    pub fn containers_written(&self) -> usize {
        self.index.len()
    }

    /// Records written so far, excluding queued ones.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Write any partial container and return the sink and the index.
    pub fn finish(mut self) -> Result<(W, PositionIndex), StoreError> {
        self.flush_container()?;
        self.inner.flush()?;
        Ok((self.inner, self.index))
    }

    fn flush_container(&mut self) -> Result<(), StoreError> {
        let Some(first) = self.pending.first() else {
            return Ok(());
        };
        let container_offset = self.offset;
        self.index.push(first.position, container_offset)?;

        let payload: u64 = self
            .pending
            .iter()
            .map(|record| (RECORD_PREFIX_LEN + record.bytes.len()) as u64)
            .sum();
        self.inner
            .write_all(&(self.pending.len() as u32).to_le_bytes())?;
        self.inner.write_all(&payload.to_le_bytes())?;
        for record in self.pending.drain(..) {
            let bit_len = u32::try_from(record.bit_len).map_err(|_| StoreError::CorruptContainer {
                offset: container_offset,
                reason: format!("record of {} bits exceeds the framing limit", record.bit_len),
            })?;
            self.inner.write_all(&bit_len.to_le_bytes())?;
            self.inner.write_all(&record.bytes)?;
            self.records_written += 1;
        }
        self.offset += CONTAINER_HEADER_LEN as u64 + payload;
        trace!(
            offset = container_offset,
            containers = self.index.len(),
            "container written"
        );
        Ok(())
    }
}

/// Sequential reader over containers, positioned by byte offset.
#[derive(Debug)]
pub struct ContainerReader<R> {
    inner: R,
    container_offset: u64,
    remaining_records: u32,
    remaining_payload: u64,
}

impl<R: Read + Seek> ContainerReader<R> {
    /// Wrap a reader; call [`ContainerReader::seek`] before reading.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            container_offset: 0,
            remaining_records: 0,
            remaining_payload: 0,
        }
    }

    /// Move to the container starting at `offset`.
    pub fn seek(&mut self, offset: u64) -> Result<(), StoreError> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.container_offset = offset;
        self.remaining_records = 0;
        self.remaining_payload = 0;
        Ok(())
    }

    /// Next record, crossing container boundaries; `None` at end of file.
    pub fn read_next(&mut self) -> Result<Option<RawRecord>, StoreError> {
        if self.remaining_records == 0 {
            if self.remaining_payload != 0 {
                return Err(self.corrupt("payload longer than its records"));
            }
            if !self.read_container_header()? {
                return Ok(None);
            }
            if self.remaining_records == 0 {
                return Err(self.corrupt("empty container"));
            }
        }

        let mut prefix = [0u8; RECORD_PREFIX_LEN];
        self.inner.read_exact(&mut prefix)?;
        let bit_len = u32::from_le_bytes(prefix) as u64;
        let byte_len = bit_len.div_ceil(8);
        let consumed = RECORD_PREFIX_LEN as u64 + byte_len;
        if consumed > self.remaining_payload {
            return Err(self.corrupt("record overruns container payload"));
        }
        let bytes = read_prefixed(&mut self.inner, byte_len)?;

        self.remaining_records -= 1;
        self.remaining_payload -= consumed;
        Ok(Some(RawRecord { bytes, bit_len }))
    }

    /// Read the next container header; `false` on a clean end of file.
    fn read_container_header(&mut self) -> Result<bool, StoreError> {
        self.container_offset = self.inner.stream_position()?;
        let mut header = [0u8; CONTAINER_HEADER_LEN];
        let mut filled = 0;
        while filled < header.len() {
            match self.inner.read(&mut header[filled..]) {
                Ok(0) if filled == 0 => return Ok(false),
                Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }
        let (count, payload) = header.split_at(4);
        self.remaining_records = u32::from_le_bytes([count[0], count[1], count[2], count[3]]);
        let mut payload_bytes = [0u8; 8];
        payload_bytes.copy_from_slice(payload);
        self.remaining_payload = u64::from_le_bytes(payload_bytes);
        Ok(true)
    }

    fn corrupt(&self, reason: &str) -> StoreError {
        StoreError::CorruptContainer {
            offset: self.container_offset,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Ciphertext;
    use std::io::Cursor;

    fn record(position: u128, bytes: &[u8], bit_len: u64) -> EncodedRecord {
        EncodedRecord {
            position: Ciphertext::from_raw(position),
            bytes: bytes.to_vec(),
            bit_len,
        }
    }

    fn write(records: Vec<EncodedRecord>, per_container: usize) -> (Vec<u8>, PositionIndex) {
        let mut writer = ContainerWriter::new(Vec::new(), 0, per_container);
        for record in records {
            writer.append(record).unwrap();
        }
        writer.finish().unwrap()
    }

    #[test]
    fn containers_are_indexed_by_first_record() {
        let records = (0..5u8)
            .map(|i| record(10 * (i as u128 + 1), &[i, 0xF0], 12))
            .collect();
        let (bytes, index) = write(records, 2);
        assert_eq!(index.len(), 3);
        let positions: Vec<u128> = index.entries().iter().map(|e| e.position.value()).collect();
        assert_eq!(positions, vec![10, 30, 50]);
        assert_eq!(index.entries()[0].offset, 0);
        // two records of 4 + 2 bytes behind a 12-byte header
        assert_eq!(index.entries()[1].offset, 24);

        let mut reader = ContainerReader::new(Cursor::new(bytes));
        reader.seek(index.entries()[1].offset).unwrap();
        let mut seen = Vec::new();
        while let Some(raw) = reader.read_next().unwrap() {
            assert_eq!(raw.bit_len, 12);
            seen.push(raw.bytes[0]);
        }
        assert_eq!(seen, vec![2, 3, 4]);
    }

    #[test]
    fn start_offset_shifts_index() {
        let mut writer = ContainerWriter::new(Vec::new(), 100, 10);
        writer.append(record(1, &[0xAB], 8)).unwrap();
        assert_eq!(writer.containers_written(), 0);
        let (_, index) = writer.finish().unwrap();
        assert_eq!(index.entries()[0].offset, 100);
    }

    #[test]
    fn truncated_container_is_an_error() {
        let (mut bytes, _) = write(vec![record(1, &[1, 2, 3], 24)], 4);
        bytes.truncate(bytes.len() - 1);
        let mut reader = ContainerReader::new(Cursor::new(bytes));
        reader.seek(0).unwrap();
        assert!(reader.read_next().is_err());
    }

    #[test]
    fn empty_store_reads_nothing() {
        let (bytes, index) = write(Vec::new(), 4);
        assert!(index.is_empty());
        let mut reader = ContainerReader::new(Cursor::new(bytes));
        reader.seek(0).unwrap();
        assert!(reader.read_next().unwrap().is_none());
    }
}
