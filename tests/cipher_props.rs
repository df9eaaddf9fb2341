use proptest::prelude::*;
use secram::crypto::CIPHERTEXT_BITS;
use secram::genomics::AbsolutePosition;
use secram::{PositionCipher, Salt};

fn cipher(salt: [u8; 16]) -> PositionCipher {
    PositionCipher::new(b"property key", &Salt::from_bytes(salt)).expect("non-empty key")
}

proptest! {
    #[test]
    fn encryption_preserves_order(a in any::<u64>(), b in any::<u64>(), salt in any::<[u8; 16]>()) {
        prop_assume!(a != b);
        let cipher = cipher(salt);
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let enc_lo = cipher.encrypt(AbsolutePosition::from_raw(lo));
        let enc_hi = cipher.encrypt(AbsolutePosition::from_raw(hi));
        prop_assert!(enc_lo < enc_hi);
    }

    #[test]
    fn decryption_inverts_encryption(raw in any::<u64>(), salt in any::<[u8; 16]>()) {
        let cipher = cipher(salt);
        let position = AbsolutePosition::from_raw(raw);
        let encrypted = cipher.encrypt(position);
        prop_assert!(encrypted.value() >> CIPHERTEXT_BITS == 0);
        prop_assert_eq!(cipher.decrypt(encrypted).unwrap(), position);
    }

    #[test]
    fn neighbouring_offsets_stay_ordered(reference_id in 0u32..64, offset in 0u32..u32::MAX) {
        let cipher = cipher([3; 16]);
        let here = cipher.encrypt(AbsolutePosition::new(reference_id, offset));
        let next = cipher.encrypt(AbsolutePosition::new(reference_id, offset + 1));
        prop_assert!(here < next);
    }
}

#[test]
fn sessions_with_same_salt_agree() {
    let first = cipher([9; 16]);
    let second = cipher([9; 16]);
    for offset in (0..10_000).step_by(997) {
        let position = AbsolutePosition::new(2, offset);
        assert_eq!(first.encrypt(position), second.encrypt(position));
    }
}
