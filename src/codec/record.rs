use serde::{Deserialize, Serialize};

use crate::codec::{BitReader, BitWriter, CodecError, ValueCodec};
use crate::crypto::Ciphertext;
use crate::genomics::{decode_nucleotide, encode_nucleotide};
use crate::pileup::{FeatureCode, PositionFeature, PositionRecord, ReadHeader};

const POSITION_HIGH_BITS: u8 = 32;
const POSITION_LOW_BITS: u8 = 64;
const REFERENCE_BASE_BITS: u8 = 4;

/// Codec chosen for each record column.
///
/// The configuration is stored in the file header; a reader must decode with
/// the same columns the writer used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// Reads touching the position.
    pub coverage: ValueCodec,
    /// Number of read headers.
    pub header_count: ValueCodec,
    /// Mapping quality in a read header.
    pub mapping_quality: ValueCodec,
    /// Reference span in a read header.
    pub reference_span: ValueCodec,
    /// Number of features.
    pub feature_count: ValueCodec,
    /// Coverage index of a header or feature.
    pub coverage_index: ValueCodec,
    /// Feature length.
    pub feature_length: ValueCodec,
    /// Feature bases, as nucleotide codes.
    pub bases: ValueCodec,
    /// Number of quality scores.
    pub quality_count: ValueCodec,
    /// One quality score.
    pub quality: ValueCodec,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            coverage: ValueCodec::Beta { offset: 0, bits: 24 },
            header_count: ValueCodec::Beta { offset: 0, bits: 16 },
            mapping_quality: ValueCodec::Fixed { bits: 8 },
            reference_span: ValueCodec::Beta { offset: 0, bits: 32 },
            feature_count: ValueCodec::Beta { offset: 0, bits: 24 },
            coverage_index: ValueCodec::Beta { offset: 0, bits: 24 },
            feature_length: ValueCodec::Beta { offset: 0, bits: 32 },
            bases: ValueCodec::HalfByteArray,
            quality_count: ValueCodec::Beta { offset: 0, bits: 32 },
            quality: ValueCodec::Fixed { bits: 8 },
        }
    }
}

/// A record serialized for a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRecord {
    /// Encrypted key, kept alongside for indexing.
    pub position: Ciphertext,
    /// Zero-padded payload.
    pub bytes: Vec<u8>,
    /// Meaningful bits in `bytes`.
    pub bit_len: u64,
}

/// Encodes and decodes sealed records column by column.
#[derive(Debug, Clone, Default)]
pub struct RecordCodec {
    columns: ColumnConfig,
}

impl RecordCodec {
    /// Codec over the given columns.
    pub fn new(columns: ColumnConfig) -> Self {
        Self { columns }
    }

    /// Column configuration in use.
    pub fn columns(&self) -> &ColumnConfig {
        &self.columns
    }

    /// Exact encoded size of `record` in bits, without writing it.
    pub fn bit_len(&self, record: &PositionRecord<Ciphertext>) -> Result<u64, CodecError> {
        let c = &self.columns;
        let mut total = (POSITION_HIGH_BITS + POSITION_LOW_BITS + REFERENCE_BASE_BITS) as u64;
        nucleotide_code(record.reference_base)?;
        total += c.coverage.int_bits(record.coverage as i64)?;

        total += c.header_count.int_bits(record.read_headers.len() as i64)?;
        for header in &record.read_headers {
            total += c.coverage_index.int_bits(header.coverage_index as i64)?;
            total += c.mapping_quality.int_bits(header.mapping_quality as i64)?;
            total += 1;
            total += c.reference_span.int_bits(header.reference_span as i64)?;
        }

        total += c.feature_count.int_bits(record.features.len() as i64)?;
        for feature in &record.features {
            total += c.coverage_index.int_bits(feature.coverage_index as i64)?;
            total += FeatureCode::BITS as u64;
            total += c.feature_length.int_bits(feature.length as i64)?;
            check_base_count(feature)?;
            total += c.bases.symbols_bits(&nucleotide_codes(&feature.bases)?)?;
        }

        total += c.quality_count.int_bits(record.quality_scores.len() as i64)?;
        for &quality in &record.quality_scores {
            total += c.quality.int_bits(quality as i64)?;
        }
        Ok(total)
    }

    /// Serialize `record`.
    pub fn encode(&self, record: &PositionRecord<Ciphertext>) -> Result<EncodedRecord, CodecError> {
        let expected = self.bit_len(record)?;
        let c = &self.columns;
        let mut writer = BitWriter::new();

        let position = record.position.value();
        writer.write_bits((position >> POSITION_LOW_BITS) as u64, POSITION_HIGH_BITS)?;
        writer.write_bits(position as u64, POSITION_LOW_BITS)?;
        writer.write_bits(nucleotide_code(record.reference_base)? as u64, REFERENCE_BASE_BITS)?;
        c.coverage.write_int(&mut writer, record.coverage as i64)?;

        c.header_count
            .write_int(&mut writer, record.read_headers.len() as i64)?;
        for header in &record.read_headers {
            c.coverage_index
                .write_int(&mut writer, header.coverage_index as i64)?;
            c.mapping_quality
                .write_int(&mut writer, header.mapping_quality as i64)?;
            writer.write_bit(header.is_reverse);
            c.reference_span
                .write_int(&mut writer, header.reference_span as i64)?;
        }

        c.feature_count
            .write_int(&mut writer, record.features.len() as i64)?;
        for feature in &record.features {
            c.coverage_index
                .write_int(&mut writer, feature.coverage_index as i64)?;
            writer.write_bits(feature.code.code() as u64, FeatureCode::BITS)?;
            c.feature_length.write_int(&mut writer, feature.length as i64)?;
            c.bases
                .write_symbols(&mut writer, &nucleotide_codes(&feature.bases)?)?;
        }

        c.quality_count
            .write_int(&mut writer, record.quality_scores.len() as i64)?;
        for &quality in &record.quality_scores {
            c.quality.write_int(&mut writer, quality as i64)?;
        }

        let actual = writer.bit_len();
        if actual != expected {
            return Err(CodecError::LengthMismatch { expected, actual });
        }
        Ok(EncodedRecord {
            position: record.position,
            bytes: writer.into_bytes(),
            bit_len: actual,
        })
    }

    /// Parse a record framed as `bit_len` bits of `bytes`.
    pub fn decode(&self, bytes: &[u8], bit_len: u64) -> Result<PositionRecord<Ciphertext>, CodecError> {
        let c = &self.columns;
        let mut reader = BitReader::bounded(bytes, bit_len)?;

        let high = reader.read_bits(POSITION_HIGH_BITS)? as u128;
        let low = reader.read_bits(POSITION_LOW_BITS)? as u128;
        let position = Ciphertext::from_raw((high << POSITION_LOW_BITS) | low);
        let reference_base = decode_nucleotide(reader.read_bits(REFERENCE_BASE_BITS)? as u8);
        let coverage = read_u32(&c.coverage, &mut reader)?;

        let header_count = read_count(&c.header_count, &mut reader)?;
        let mut read_headers = Vec::with_capacity(header_count.min(1 << 16));
        for _ in 0..header_count {
            read_headers.push(ReadHeader {
                coverage_index: read_u32(&c.coverage_index, &mut reader)?,
                mapping_quality: read_u8(&c.mapping_quality, &mut reader)?,
                is_reverse: reader.read_bit()?,
                reference_span: read_u32(&c.reference_span, &mut reader)?,
            });
        }

        let feature_count = read_count(&c.feature_count, &mut reader)?;
        let mut features = Vec::with_capacity(feature_count.min(1 << 16));
        for _ in 0..feature_count {
            let coverage_index = read_u32(&c.coverage_index, &mut reader)?;
            let raw = reader.read_bits(FeatureCode::BITS)? as u8;
            let code = FeatureCode::from_code(raw).ok_or(CodecError::InvalidFeatureCode(raw))?;
            let length = read_u32(&c.feature_length, &mut reader)?;
            let bases = if code.carries_bases() {
                c.bases
                    .read_symbols(&mut reader, Some(length as usize))?
                    .into_iter()
                    .map(decode_nucleotide)
                    .collect()
            } else {
                Vec::new()
            };
            features.push(PositionFeature::new(coverage_index, code, length, bases));
        }

        let quality_count = read_count(&c.quality_count, &mut reader)?;
        let mut quality_scores = Vec::with_capacity(quality_count.min(1 << 20));
        for _ in 0..quality_count {
            quality_scores.push(read_u8(&c.quality, &mut reader)?);
        }

        if reader.position() != bit_len {
            return Err(CodecError::LengthMismatch {
                expected: bit_len,
                actual: reader.position(),
            });
        }
        Ok(PositionRecord {
            position,
            reference_base,
            coverage,
            read_headers,
            features,
            quality_scores,
        })
    }
}

fn nucleotide_code(base: u8) -> Result<u8, CodecError> {
    encode_nucleotide(base).ok_or(CodecError::UnsupportedSymbol(base))
}

fn nucleotide_codes(bases: &[u8]) -> Result<Vec<u8>, CodecError> {
    bases.iter().map(|&base| nucleotide_code(base)).collect()
}

fn check_base_count(feature: &PositionFeature) -> Result<(), CodecError> {
    let expected = if feature.code.carries_bases() {
        feature.length as u64
    } else {
        0
    };
    let actual = feature.bases.len() as u64;
    if expected != actual {
        return Err(CodecError::LengthMismatch { expected, actual });
    }
    Ok(())
}

fn read_u32(codec: &ValueCodec, reader: &mut BitReader<'_>) -> Result<u32, CodecError> {
    let value = codec.read_int(reader)?;
    u32::try_from(value).map_err(|_| CodecError::ValueOutOfRange {
        value: value as i128,
        bits: 32,
    })
}

fn read_u8(codec: &ValueCodec, reader: &mut BitReader<'_>) -> Result<u8, CodecError> {
    let value = codec.read_int(reader)?;
    u8::try_from(value).map_err(|_| CodecError::ValueOutOfRange {
        value: value as i128,
        bits: 8,
    })
}

fn read_count(codec: &ValueCodec, reader: &mut BitReader<'_>) -> Result<usize, CodecError> {
    read_u32(codec, reader).map(|count| count as usize)
}
