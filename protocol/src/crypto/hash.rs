//! # Hashing Utilities
//!
//! The HashEngine of the ledger. Everything that gets an identity on-chain
//! (outputs, transactions, block headers, transaction sets) is named by a
//! SHA-256 [`Digest`] computed over its canonical encoding.
//!
//! - **`sha256`**: single SHA-256. Used for content hashes.
//! - **`double_sha256`**: `SHA-256(SHA-256(data))`. Used for address
//!   derivation, where length-extension resistance is cheap to have.
//! - **`merkle`**: a 16-ary commitment over an ordered list of digests.
//!
//! ## The Merkle layout
//!
//! This is not the binary Bitcoin tree. Leaves are padded up to the next
//! power of 16 (never fewer than 16), and each padding slot is filled by
//! XOR-chaining what came before it:
//!
//! ```text
//! pad[i] = pad[i - 1] XOR pad[i - n]      for n <= i < 16^k
//! ```
//!
//! where `n` is the number of real leaves. Then each run of 16 digests is
//! concatenated (512 bytes) and hashed into one parent, level by level,
//! until one digest remains. The empty list commits to the zero digest.
//!
//! Any implementation claiming wire compatibility must reproduce this
//! bit-for-bit; the golden vectors in the tests pin it down.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::ops::{BitXor, BitXorAssign};

use crate::config::{HASH_OUTPUT_LENGTH, MERKLE_FANOUT};

// ---------------------------------------------------------------------------
// Digest
// ---------------------------------------------------------------------------

/// A 32-byte SHA-256 output.
///
/// Value type: cheap to copy, totally ordered (so it works as a sled key
/// and in `BTreeMap`s), and XOR-able for the unspent-set checksum.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Digest(pub [u8; HASH_OUTPUT_LENGTH]);

impl Digest {
    /// The all-zero digest. Genesis parent hash, empty Merkle root, and the
    /// source-transaction of the genesis output.
    pub const ZERO: Digest = Digest([0u8; HASH_OUTPUT_LENGTH]);

    /// Wrap raw bytes.
    pub const fn new(bytes: [u8; HASH_OUTPUT_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Build a digest from a slice, which must be exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; HASH_OUTPUT_LENGTH] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut out = [0u8; HASH_OUTPUT_LENGTH];
        hex::decode_to_slice(s, &mut out)?;
        Ok(Self(out))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_OUTPUT_LENGTH]
    }

    pub fn as_bytes(&self) -> &[u8; HASH_OUTPUT_LENGTH] {
        &self.0
    }
}

impl BitXor for Digest {
    type Output = Digest;

    fn bitxor(mut self, rhs: Digest) -> Digest {
        self ^= rhs;
        self
    }
}

impl BitXorAssign for Digest {
    fn bitxor_assign(&mut self, rhs: Digest) {
        for (a, b) in self.0.iter_mut().zip(rhs.0.iter()) {
            *a ^= b;
        }
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Hash functions
// ---------------------------------------------------------------------------

/// SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Digest(hasher.finalize().into())
}

/// `SHA-256(SHA-256(data))`.
pub fn double_sha256(data: &[u8]) -> Digest {
    sha256(sha256(data).as_ref())
}

/// Hash several byte slices as if they were concatenated, without building
/// the concatenation.
pub fn sha256_multi(parts: &[&[u8]]) -> Digest {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    Digest(hasher.finalize().into())
}

/// XOR of every digest in the iterator. The empty set folds to zero.
pub fn xor_all<'a, I>(digests: I) -> Digest
where
    I: IntoIterator<Item = &'a Digest>,
{
    digests.into_iter().fold(Digest::ZERO, |acc, d| acc ^ *d)
}

// ---------------------------------------------------------------------------
// Merkle
// ---------------------------------------------------------------------------

/// 16-ary Merkle root over an ordered list of leaves.
///
/// Order-sensitive and deterministic. `merkle(&[])` is [`Digest::ZERO`].
pub fn merkle(leaves: &[Digest]) -> Digest {
    if leaves.is_empty() {
        return Digest::ZERO;
    }

    let n = leaves.len();
    let mut width = MERKLE_FANOUT;
    while width < n {
        width *= MERKLE_FANOUT;
    }

    let mut level: Vec<Digest> = Vec::with_capacity(width);
    level.extend_from_slice(leaves);
    for i in n..width {
        let chained = level[i - 1] ^ level[i - n];
        level.push(chained);
    }

    // width is a power of 16, so every level divides evenly.
    while level.len() > 1 {
        level = level
            .chunks(MERKLE_FANOUT)
            .map(|group| {
                let parts: Vec<&[u8]> = group.iter().map(|d| d.as_ref()).collect();
                sha256_multi(&parts)
            })
            .collect();
    }

    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(i: u8) -> Digest {
        sha256(&[i])
    }

    #[test]
    fn sha256_known_vector() {
        // SHA-256 of the empty string.
        assert_eq!(
            sha256(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn double_sha256_is_hash_of_hash() {
        let once = sha256(b"helio");
        assert_eq!(double_sha256(b"helio"), sha256(once.as_ref()));
        assert_ne!(double_sha256(b"helio"), once);
    }

    #[test]
    fn sha256_multi_matches_concatenation() {
        assert_eq!(sha256_multi(&[b"hello".as_slice(), b" world".as_slice()]), sha256(b"hello world"));
    }

    #[test]
    fn xor_is_self_inverse() {
        let a = leaf(1);
        let b = leaf(2);
        assert_eq!(a ^ b ^ b, a);
        assert_eq!(a ^ a, Digest::ZERO);
        assert_eq!(xor_all(&[a, b, a]), b);
        assert_eq!(xor_all(std::iter::empty()), Digest::ZERO);
    }

    #[test]
    fn hex_roundtrip() {
        let d = leaf(7);
        assert_eq!(Digest::from_hex(&d.to_hex()).unwrap(), d);
        assert!(Digest::from_hex("abcd").is_err());
    }

    #[test]
    fn merkle_empty_is_zero() {
        assert_eq!(merkle(&[]), Digest::ZERO);
    }

    #[test]
    fn merkle_single_leaf_golden() {
        // One leaf plus fifteen zero pads (x ^ x = 0), hashed once.
        assert_eq!(
            merkle(&[leaf(0)]).to_hex(),
            "937043eadebe25be5002a8128c745582ff94e00882a65b87220e0aa273f5d028"
        );
    }

    #[test]
    fn merkle_three_leaves_golden() {
        let leaves = [leaf(0), leaf(1), leaf(2)];
        assert_eq!(
            merkle(&leaves).to_hex(),
            "b2715aaac70261d392c3e2822d04f10b1a042808aab69e885451a91bbe9985a5"
        );
    }

    #[test]
    fn merkle_single_leaf_matches_manual_layout() {
        let l = leaf(9);
        let mut parts: Vec<&[u8]> = vec![l.as_ref()];
        let zero = Digest::ZERO;
        for _ in 1..16 {
            parts.push(zero.as_ref());
        }
        assert_eq!(merkle(&[l]), sha256_multi(&parts));
    }

    #[test]
    fn merkle_seventeen_leaves_uses_two_levels() {
        let leaves: Vec<Digest> = (0..17).map(leaf).collect();
        let root = merkle(&leaves);

        // Rebuild by hand: pad to 256, hash 16 groups, then hash the 16 parents.
        let mut padded = leaves.clone();
        for i in 17..256 {
            let d = padded[i - 1] ^ padded[i - 17];
            padded.push(d);
        }
        let parents: Vec<Digest> = padded
            .chunks(16)
            .map(|g| {
                let parts: Vec<&[u8]> = g.iter().map(|d| d.as_ref()).collect();
                sha256_multi(&parts)
            })
            .collect();
        let parts: Vec<&[u8]> = parents.iter().map(|d| d.as_ref()).collect();
        assert_eq!(root, sha256_multi(&parts));
    }

    #[test]
    fn merkle_order_sensitive() {
        let a = leaf(1);
        let b = leaf(2);
        assert_ne!(merkle(&[a, b]), merkle(&[b, a]));
    }

    #[test]
    fn merkle_deterministic() {
        let leaves: Vec<Digest> = (0..40).map(leaf).collect();
        assert_eq!(merkle(&leaves), merkle(&leaves));
    }
}
