use std::io::Write;

use thiserror::Error;
use tracing::debug;

use crate::codec::{CodecError, RecordCodec};
use crate::config::{ConfigError, SecramConfig};
use crate::crypto::{CipherError, PositionCipher};
use crate::genomics::{AlignedRead, ReferenceDictionary, ReferenceSource};
use crate::pileup::{AssemblyError, AssemblyStats, PositionRecord, PositionRecordAssembler};
use crate::store::{ContainerWriter, PositionIndex, SecramHeader, StoreError};

/// Errors raised while writing a SECRAM file.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Read could not be assembled.
    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    /// Record could not be encoded.
    #[error("failed to encode record: {0}")]
    Codec(#[from] CodecError),

    /// Cipher could not be initialized.
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// Container or header output failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Writer settings are unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl WriteError {
    /// Whether the pipeline has to stop; otherwise only one read was dropped.
    pub fn is_fatal(&self) -> bool {
        match self {
            WriteError::Assembly(err) => err.is_fatal(),
            _ => true,
        }
    }
}

/// Outcome of a completed write.
#[derive(Debug, Clone)]
pub struct WriteSummary {
    /// Container index to persist beside the file.
    pub index: PositionIndex,
    /// Records written.
    pub records: u64,
    /// Containers written.
    pub containers: usize,
    /// Read counters from assembly.
    pub reads: AssemblyStats,
    /// Largest number of simultaneously open positions.
    pub peak_open_builders: usize,
}

/// Streams sorted reads into an encrypted SECRAM file.
///
/// Records are sealed as soon as the assembler closes them: the position is
/// encrypted, the record encoded, and the result queued into the current
/// container.
#[derive(Debug)]
pub struct SecramWriter<W: Write, S> {
    header: SecramHeader,
    assembler: PositionRecordAssembler<S>,
    cipher: PositionCipher,
    codec: RecordCodec,
    containers: ContainerWriter<W>,
    records: u64,
}

impl<W: Write, S: ReferenceSource> SecramWriter<W, S> {
    /// Write the file header to `sink` and prepare for reads.
    pub fn new(
        mut sink: W,
        references: ReferenceDictionary,
        reference: S,
        master_key: &[u8],
        config: &SecramConfig,
    ) -> Result<Self, WriteError> {
        config.validate()?;
        let header = SecramHeader::new(references, config.columns);
        let cipher = PositionCipher::new(master_key, &header.salt)?;
        let start = header.write_to(&mut sink)?;
        debug!(
            references = header.references.len(),
            header_bytes = start,
            "SECRAM header written"
        );
        Ok(Self {
            codec: RecordCodec::new(header.columns),
            header,
            assembler: PositionRecordAssembler::new(reference).with_order_check(config.check_order),
            cipher,
            containers: ContainerWriter::new(sink, start, config.records_per_container),
            records: 0,
        })
    }

    /// Header written at the start of the file.
    pub fn header(&self) -> &SecramHeader {
        &self.header
    }

    /// Ingest one read and store every record it closed.
    pub fn add_read(&mut self, read: &AlignedRead) -> Result<(), WriteError> {
        let closed = self.assembler.add_read(read)?;
        self.write_records(closed)
    }

    /// Flush the remaining records and containers.
    pub fn finish(mut self) -> Result<(W, WriteSummary), WriteError> {
        let remaining = self.assembler.finish();
        self.write_records(remaining)?;
        let reads = self.assembler.stats();
        let peak_open_builders = self.assembler.peak_open_builders();
        let (sink, index) = self.containers.finish()?;
        Ok((
            sink,
            WriteSummary {
                containers: index.len(),
                records: self.records,
                index,
                reads,
                peak_open_builders,
            },
        ))
    }

    fn write_records(&mut self, records: Vec<PositionRecord>) -> Result<(), WriteError> {
        for record in records {
            let sealed = record.map_position(|position| self.cipher.encrypt(position));
            let encoded = self.codec.encode(&sealed)?;
            self.containers.append(encoded)?;
            self.records += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{parse_cigar, InMemoryReference};

    fn writer(config: &SecramConfig) -> SecramWriter<Vec<u8>, InMemoryReference> {
        let mut reference = InMemoryReference::new();
        reference.push("chr1", b"ACGTACGTACGTACGT");
        let references = reference.dictionary();
        SecramWriter::new(Vec::new(), references, reference, b"key", config).unwrap()
    }

    fn read(pos: u32, cigar: &str, seq: &[u8]) -> AlignedRead {
        AlignedRead::new(0, pos, parse_cigar(cigar).unwrap(), seq.to_vec(), vec![30; seq.len()])
    }

    #[test]
    fn summary_counts_records_and_containers() {
        let config = SecramConfig::default().with_records_per_container(3);
        let mut writer = writer(&config);
        writer.add_read(&read(0, "4M", b"ACGT")).unwrap();
        writer.add_read(&read(2, "4M", b"GTAC")).unwrap();
        let (bytes, summary) = writer.finish().unwrap();
        assert_eq!(summary.records, 6);
        assert_eq!(summary.containers, 2);
        assert_eq!(summary.reads.reads_added, 2);
        assert!(bytes.starts_with(b"SECRAM01"));
    }

    #[test]
    fn rejected_read_is_not_fatal() {
        let mut writer = writer(&SecramConfig::default());
        writer.add_read(&read(5, "2M", b"GT")).unwrap();
        let err = writer.add_read(&read(1, "2M", b"CG")).unwrap_err();
        assert!(!err.is_fatal());
        let (_, summary) = writer.finish().unwrap();
        assert_eq!(summary.reads.reads_rejected, 1);
        assert_eq!(summary.records, 2);
    }

    #[test]
    fn empty_key_fails_up_front() {
        let mut reference = InMemoryReference::new();
        reference.push("chr1", b"ACGT");
        let references = reference.dictionary();
        let err = SecramWriter::new(Vec::new(), references, reference, b"", &SecramConfig::default())
            .unwrap_err();
        assert!(matches!(err, WriteError::Cipher(CipherError::EmptyKey)));
    }
}
