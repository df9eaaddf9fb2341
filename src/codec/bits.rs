use bitvec::prelude::*;

use crate::codec::CodecError;

/// Append-only MSB-first bit stream.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    bits: BitVec<u8, Msb0>,
}

impl BitWriter {
    /// Empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the low `width` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u64, width: u8) -> Result<(), CodecError> {
        if width > 64 {
            return Err(CodecError::InvalidWidth(width));
        }
        if width < 64 && value >> width != 0 {
            return Err(CodecError::ValueOutOfRange {
                value: value as i128,
                bits: width,
            });
        }
        self.bits.reserve(width as usize);
        for shift in (0..width).rev() {
            self.bits.push((value >> shift) & 1 == 1);
        }
        Ok(())
    }

    /// Append a single flag bit.
    pub fn write_bit(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    /// Number of bits written so far.
    pub fn bit_len(&self) -> u64 {
        self.bits.len() as u64
    }

    /// Finish the stream, zero-padding the last byte.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.bits.set_uninitialized(false);
        self.bits.into_vec()
    }
}

/// MSB-first reader over a bounded bit slice.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bits: &'a BitSlice<u8, Msb0>,
    position: usize,
}

impl<'a> BitReader<'a> {
    /// Read from every bit of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bits: bytes.view_bits::<Msb0>(),
            position: 0,
        }
    }

    /// Read only the first `bit_len` bits of `bytes`.
    pub fn bounded(bytes: &'a [u8], bit_len: u64) -> Result<Self, CodecError> {
        let available = bytes.len() as u64 * 8;
        if bit_len > available {
            return Err(CodecError::UnexpectedEnd {
                needed: bit_len,
                available,
            });
        }
        Ok(Self {
            bits: &bytes.view_bits::<Msb0>()[..bit_len as usize],
            position: 0,
        })
    }

    /// Read `width` bits as an unsigned value.
    pub fn read_bits(&mut self, width: u8) -> Result<u64, CodecError> {
        if width > 64 {
            return Err(CodecError::InvalidWidth(width));
        }
        let end = self.position + width as usize;
        if end > self.bits.len() {
            return Err(CodecError::UnexpectedEnd {
                needed: end as u64,
                available: self.bits.len() as u64,
            });
        }
        let value = self.bits[self.position..end]
            .iter()
            .by_vals()
            .fold(0u64, |acc, bit| (acc << 1) | bit as u64);
        self.position = end;
        Ok(value)
    }

    /// Read a single flag bit.
    pub fn read_bit(&mut self) -> Result<bool, CodecError> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Bits consumed so far.
    pub fn position(&self) -> u64 {
        self.position as u64
    }

    /// Bits left before the bound.
    pub fn remaining(&self) -> u64 {
        (self.bits.len() - self.position) as u64
    }
}
