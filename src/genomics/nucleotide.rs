/// 4-bit nucleotide alphabet, indexed by code (the BAM sequence encoding).
pub const NUCLEOTIDE_ALPHABET: &[u8; 16] = b"=ACMGRSVTWYHKDBN";

/// Map an ASCII nucleotide (IUPAC, either case) to its 4-bit code.
pub fn encode_nucleotide(base: u8) -> Option<u8> {
    let code = match base.to_ascii_uppercase() {
        b'=' => 0,
        b'A' => 1,
        b'C' => 2,
        b'M' => 3,
        b'G' => 4,
        b'R' => 5,
        b'S' => 6,
        b'V' => 7,
        b'T' | b'U' => 8,
        b'W' => 9,
        b'Y' => 10,
        b'H' => 11,
        b'K' => 12,
        b'D' => 13,
        b'B' => 14,
        b'N' | b'.' => 15,
        _ => return None,
    };
    Some(code)
}

/// Map a 4-bit code back to its uppercase ASCII nucleotide.
pub fn decode_nucleotide(code: u8) -> u8 {
    NUCLEOTIDE_ALPHABET[(code & 0x0f) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphabet_codes_invert() {
        for (code, &base) in NUCLEOTIDE_ALPHABET.iter().enumerate() {
            assert_eq!(encode_nucleotide(base), Some(code as u8));
            assert_eq!(decode_nucleotide(code as u8), base);
        }
    }

    #[test]
    fn lowercase_and_uracil_fold() {
        assert_eq!(encode_nucleotide(b'a'), Some(1));
        assert_eq!(encode_nucleotide(b'u'), encode_nucleotide(b'T'));
        assert_eq!(encode_nucleotide(b'?'), None);
    }
}
