use std::fmt;

use crate::crypto::{CipherError, Ciphertext, Salt, CIPHERTEXT_BITS};
use crate::genomics::AbsolutePosition;

const SESSION_CONTEXT: &str = "secram 2024-01-01 position cipher session key";
const PLAINTEXT_BITS: u32 = 64;

/// Keyed, strictly increasing map from positions into a 96-bit space.
///
/// The map is a lazily sampled random monotone function. The plaintext
/// domain is halved recursively; at every tree node a keyed PRF decides how
/// much of the node's ciphertext range goes to the left half, always leaving
/// at least one ciphertext per plaintext on each side. A leaf owns a single
/// plaintext and picks one point of its range. Encryption and decryption
/// walk the same tree, so both are deterministic for a given key and salt.
pub struct PositionCipher {
    key: [u8; 32],
}

impl PositionCipher {
    /// Derive the session key from `master_key` and the file's salt.
    pub fn new(master_key: &[u8], salt: &Salt) -> Result<Self, CipherError> {
        if master_key.is_empty() {
            return Err(CipherError::EmptyKey);
        }
        let mut material = Vec::with_capacity(master_key.len() + salt.as_bytes().len());
        material.extend_from_slice(master_key);
        material.extend_from_slice(salt.as_bytes());
        Ok(Self {
            key: blake3::derive_key(SESSION_CONTEXT, &material),
        })
    }

    /// Encrypt a position.
    pub fn encrypt(&self, position: AbsolutePosition) -> Ciphertext {
        let plaintext = position.value() as u128;
        let mut node = Node::root();
        while node.domain_size > 1 {
            let split = self.split(&node);
            node = if plaintext < node.domain_lo + node.domain_size / 2 {
                node.left(split)
            } else {
                node.right(split)
            };
        }
        Ciphertext::from_raw(self.leaf_point(&node))
    }

    /// Recover the position behind a ciphertext produced by this key.
    pub fn decrypt(&self, ciphertext: Ciphertext) -> Result<AbsolutePosition, CipherError> {
        let value = ciphertext.value();
        if value >> CIPHERTEXT_BITS != 0 {
            return Err(CipherError::InvalidCiphertext(ciphertext));
        }
        let mut node = Node::root();
        while node.domain_size > 1 {
            let split = self.split(&node);
            node = if value < node.range_lo + split {
                node.left(split)
            } else {
                node.right(split)
            };
        }
        if self.leaf_point(&node) != value {
            return Err(CipherError::InvalidCiphertext(ciphertext));
        }
        Ok(AbsolutePosition::from_raw(node.domain_lo as u64))
    }

    /// Size of the left child's ciphertext range.
    fn split(&self, node: &Node) -> u128 {
        let left = node.domain_size / 2;
        let slack = node.range_size - node.domain_size;
        left + self.prf(node.depth, node.domain_lo) % (slack + 1)
    }

    fn leaf_point(&self, node: &Node) -> u128 {
        node.range_lo + self.prf(node.depth, node.domain_lo) % node.range_size
    }

    fn prf(&self, depth: u32, domain_lo: u128) -> u128 {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(&depth.to_le_bytes());
        hasher.update(&(domain_lo as u64).to_le_bytes());
        let mut out = [0u8; 16];
        hasher.finalize_xof().fill(&mut out);
        u128::from_le_bytes(out)
    }
}

impl fmt::Debug for PositionCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionCipher").finish_non_exhaustive()
    }
}

/// Subtree of the plaintext domain and the ciphertext range it maps into.
#[derive(Debug, Clone, Copy)]
struct Node {
    depth: u32,
    domain_lo: u128,
    domain_size: u128,
    range_lo: u128,
    range_size: u128,
}

impl Node {
    fn root() -> Self {
        Self {
            depth: 0,
            domain_lo: 0,
            domain_size: 1 << PLAINTEXT_BITS,
            range_lo: 0,
            range_size: 1 << CIPHERTEXT_BITS,
        }
    }

    fn left(self, split: u128) -> Self {
        Self {
            depth: self.depth + 1,
            domain_lo: self.domain_lo,
            domain_size: self.domain_size / 2,
            range_lo: self.range_lo,
            range_size: split,
        }
    }

    fn right(self, split: u128) -> Self {
        let half = self.domain_size / 2;
        Self {
            depth: self.depth + 1,
            domain_lo: self.domain_lo + half,
            domain_size: self.domain_size - half,
            range_lo: self.range_lo + split,
            range_size: self.range_size - split,
        }
    }
}
