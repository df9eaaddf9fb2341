use serde::{Deserialize, Serialize};

use crate::codec::{BitReader, BitWriter, CodecError};

/// Value codecs available to a column.
///
/// Integer columns use [`ValueCodec::Fixed`] or [`ValueCodec::Beta`]; symbol
/// arrays encode each element with the same codec, [`ValueCodec::HalfByteArray`]
/// packing them four bits apiece. None of the codecs writes a length, so an
/// array's element count has to come from elsewhere in the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueCodec {
    /// Unsigned integer in exactly `bits` bits.
    Fixed {
        /// Width in bits (0..=64).
        bits: u8,
    },
    /// `value - offset` as an unsigned integer in `bits` bits.
    Beta {
        /// Subtracted before writing.
        offset: i64,
        /// Width in bits (0..=64).
        bits: u8,
    },
    /// Four bits per element.
    HalfByteArray,
}

impl ValueCodec {
    /// Narrowest beta codec covering `min..=max`.
    pub fn beta_covering(min: i64, max: i64) -> Self {
        let (low, high) = if min <= max { (min, max) } else { (max, min) };
        let span = (high as i128 - low as i128) as u64;
        ValueCodec::Beta {
            offset: low,
            bits: (64 - span.leading_zeros()) as u8,
        }
    }

    /// Bits used for one integer.
    pub fn width(&self) -> u8 {
        match *self {
            ValueCodec::Fixed { bits } | ValueCodec::Beta { bits, .. } => bits,
            ValueCodec::HalfByteArray => 4,
        }
    }

    fn offset(&self) -> i64 {
        match *self {
            ValueCodec::Beta { offset, .. } => offset,
            _ => 0,
        }
    }

    fn to_raw(&self, value: i64) -> Result<u64, CodecError> {
        let width = self.width();
        if width > 64 {
            return Err(CodecError::InvalidWidth(width));
        }
        let shifted = value as i128 - self.offset() as i128;
        let fits = if width == 64 {
            // full-width fixed columns carry raw bit patterns
            matches!(self, ValueCodec::Fixed { .. }) || (0..=u64::MAX as i128).contains(&shifted)
        } else {
            (0..(1i128 << width)).contains(&shifted)
        };
        if !fits {
            return Err(CodecError::ValueOutOfRange {
                value: value as i128,
                bits: width,
            });
        }
        Ok(if width == 64 && shifted < 0 {
            value as u64
        } else {
            shifted as u64
        })
    }

    /// Exact number of bits [`ValueCodec::write_int`] will emit.
    pub fn int_bits(&self, value: i64) -> Result<u64, CodecError> {
        self.to_raw(value)?;
        Ok(self.width() as u64)
    }

    /// Write one integer, returning the bits written.
    pub fn write_int(&self, writer: &mut BitWriter, value: i64) -> Result<u64, CodecError> {
        let raw = self.to_raw(value)?;
        writer.write_bits(raw, self.width())?;
        Ok(self.width() as u64)
    }

    /// Read one integer.
    pub fn read_int(&self, reader: &mut BitReader<'_>) -> Result<i64, CodecError> {
        let raw = reader.read_bits(self.width())?;
        Ok(match self {
            ValueCodec::Fixed { bits: 64 } => raw as i64,
            _ => (raw as i128 + self.offset() as i128) as i64,
        })
    }

    /// Exact number of bits [`ValueCodec::write_symbols`] will emit.
    pub fn symbols_bits(&self, symbols: &[u8]) -> Result<u64, CodecError> {
        for &symbol in symbols {
            self.to_raw(symbol as i64)?;
        }
        Ok(symbols.len() as u64 * self.width() as u64)
    }

    /// Write a symbol array without its length, returning the bits written.
    pub fn write_symbols(&self, writer: &mut BitWriter, symbols: &[u8]) -> Result<u64, CodecError> {
        let mut written = 0;
        for &symbol in symbols {
            written += self.write_int(writer, symbol as i64)?;
        }
        Ok(written)
    }

    /// Read a symbol array of `len` elements.
    ///
    /// The stream does not record array lengths; `None` fails with
    /// [`CodecError::LengthRequired`].
    pub fn read_symbols(
        &self,
        reader: &mut BitReader<'_>,
        len: Option<usize>,
    ) -> Result<Vec<u8>, CodecError> {
        let len = len.ok_or(CodecError::LengthRequired)?;
        let needed = (len as u64).saturating_mul(self.width() as u64);
        if needed > reader.remaining() {
            return Err(CodecError::UnexpectedEnd {
                needed: reader.position().saturating_add(needed),
                available: reader.position() + reader.remaining(),
            });
        }
        let mut symbols = Vec::with_capacity(len.min(1 << 20));
        for _ in 0..len {
            let value = self.read_int(reader)?;
            let symbol = u8::try_from(value).map_err(|_| CodecError::ValueOutOfRange {
                value: value as i128,
                bits: 8,
            })?;
            symbols.push(symbol);
        }
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 0, 0; "single value needs no bits")]
    #[test_case(0, 1, 1; "two values")]
    #[test_case(10, 17, 3; "offset range")]
    #[test_case(-4, 3, 3; "negative lower bound")]
    #[test_case(0, 255, 8; "byte")]
    fn beta_width_is_minimal(min: i64, max: i64, bits: u8) {
        let codec = ValueCodec::beta_covering(min, max);
        assert_eq!(codec.width(), bits);
        assert_eq!(codec.int_bits(min).unwrap(), bits as u64);
        assert_eq!(codec.int_bits(max).unwrap(), bits as u64);
        assert!(codec.int_bits(max + 1).is_err());
        assert!(codec.int_bits(min - 1).is_err());
    }

    #[test]
    fn beta_round_trips_shifted_values() {
        let codec = ValueCodec::beta_covering(-4, 3);
        let mut writer = BitWriter::new();
        for value in -4..=3 {
            codec.write_int(&mut writer, value).unwrap();
        }
        assert_eq!(writer.bit_len(), 8 * 3);
        let bytes = writer.into_bytes();
        let mut reader = BitReader::new(&bytes);
        let decoded: Vec<i64> = (0..8).map(|_| codec.read_int(&mut reader).unwrap()).collect();
        assert_eq!(decoded, (-4..=3).collect::<Vec<_>>());
    }

    #[test]
    fn full_width_fixed_keeps_bit_pattern() {
        let codec = ValueCodec::Fixed { bits: 64 };
        let mut writer = BitWriter::new();
        codec.write_int(&mut writer, -1).unwrap();
        let bytes = writer.into_bytes();
        assert_eq!(bytes, vec![0xFF; 8]);
        assert_eq!(codec.read_int(&mut BitReader::new(&bytes)).unwrap(), -1);
    }

    #[test]
    fn half_byte_array_packs_two_symbols_per_byte() {
        let codec = ValueCodec::HalfByteArray;
        let symbols = [1u8, 2, 4, 8, 15];
        assert_eq!(codec.symbols_bits(&symbols).unwrap(), 20);

        let mut writer = BitWriter::new();
        assert_eq!(codec.write_symbols(&mut writer, &symbols).unwrap(), 20);
        let bytes = writer.into_bytes();
        assert_eq!(bytes, vec![0x12, 0x48, 0xF0]);

        let mut reader = BitReader::new(&bytes);
        assert_eq!(codec.read_symbols(&mut reader, Some(5)).unwrap(), symbols);
    }

    #[test]
    fn symbol_arrays_need_a_length() {
        let bytes = [0u8; 4];
        let mut reader = BitReader::new(&bytes);
        assert!(matches!(
            ValueCodec::HalfByteArray.read_symbols(&mut reader, None),
            Err(CodecError::LengthRequired)
        ));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn symbol_length_beyond_the_stream_is_unexpected_end() {
        let bytes = [0u8; 2];
        let mut reader = BitReader::new(&bytes);
        reader.read_bits(4).unwrap();
        assert!(matches!(
            ValueCodec::HalfByteArray.read_symbols(&mut reader, Some(u32::MAX as usize)),
            Err(CodecError::UnexpectedEnd { available: 16, .. })
        ));
        assert_eq!(reader.position(), 4);
        assert_eq!(
            ValueCodec::HalfByteArray.read_symbols(&mut reader, Some(3)).unwrap(),
            vec![0, 0, 0]
        );
    }

    #[test]
    fn half_byte_rejects_wide_symbols() {
        assert!(matches!(
            ValueCodec::HalfByteArray.symbols_bits(&[16]),
            Err(CodecError::ValueOutOfRange { value: 16, bits: 4 })
        ));
    }
}
