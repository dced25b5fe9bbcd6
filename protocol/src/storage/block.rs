//! # Block Structure
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  BlockHeader                     (hashed)   │
//! │  ├── version: u32                           │
//! │  ├── time: u64          (seconds)           │
//! │  ├── bk_seq: u64        (genesis = 0)       │
//! │  ├── fee: u64                               │
//! │  ├── prev_hash: Digest  (zero for genesis)  │
//! │  ├── body_hash: Digest  (tx Merkle root)    │
//! │  └── ux_hash: Digest    (pool XOR after)    │
//! ├─────────────────────────────────────────────┤
//! │  BlockBody                                  │
//! │  └── transactions: Vec<Transaction>         │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The block hash is the hash of the header alone. The body is committed
//! through `body_hash`, and the publisher's signature (see [`SignedBlock`])
//! is over the block hash, so it lives outside the block.

use serde::{Deserialize, Serialize};

use crate::codec::{self, Decode, Encode, Reader};
use crate::crypto::hash::{merkle, sha256, Digest};
use crate::crypto::keys::Sig;
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// BlockHeader
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    /// Seconds. Strictly greater than the parent's.
    pub time: u64,
    /// Height in the chain. Parent's plus one.
    pub bk_seq: u64,
    /// Sum of the fees (coin-hours burned) of every transaction in the body.
    pub fee: u64,
    pub prev_hash: Digest,
    pub body_hash: Digest,
    /// XOR checksum of the unspent pool after this block is applied.
    pub ux_hash: Digest,
}

impl BlockHeader {
    /// `sha256(encode(header))`. This is the block's identity.
    pub fn hash(&self) -> Digest {
        sha256(&self.encode())
    }
}

// ---------------------------------------------------------------------------
// BlockBody / Block
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBody {
    pub transactions: Vec<Transaction>,
}

impl BlockBody {
    /// Merkle root over the transaction hashes, in body order.
    pub fn hash(&self) -> Digest {
        let leaves: Vec<Digest> = self.transactions.iter().map(|tx| tx.hash()).collect();
        merkle(&leaves)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub body: BlockBody,
}

impl Block {
    pub fn hash(&self) -> Digest {
        self.header.hash()
    }

    pub fn seq(&self) -> u64 {
        self.header.bk_seq
    }

    pub fn time(&self) -> u64 {
        self.header.time
    }

    pub fn prev_hash(&self) -> Digest {
        self.header.prev_hash
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.body.transactions
    }

    /// The graph edge this block contributes at its depth.
    pub fn hash_pair(&self) -> HashPair {
        HashPair {
            hash: self.hash(),
            pre_hash: self.header.prev_hash,
        }
    }
}

/// A block plus the publisher's signature over [`Block::hash`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBlock {
    pub block: Block,
    pub sig: Sig,
}

/// One edge in the block graph: a block and its parent.
///
/// BlockTree keeps an ordered list of these per depth, which is how several
/// competing blocks at one height are recorded side by side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashPair {
    pub hash: Digest,
    pub pre_hash: Digest,
}

// ---------------------------------------------------------------------------
// Canonical encoding
// ---------------------------------------------------------------------------

impl Encode for BlockHeader {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.version.encode_to(out);
        self.time.encode_to(out);
        self.bk_seq.encode_to(out);
        self.fee.encode_to(out);
        self.prev_hash.encode_to(out);
        self.body_hash.encode_to(out);
        self.ux_hash.encode_to(out);
    }
}

impl Decode for BlockHeader {
    fn decode_from(reader: &mut Reader<'_>) -> codec::Result<Self> {
        Ok(Self {
            version: u32::decode_from(reader)?,
            time: u64::decode_from(reader)?,
            bk_seq: u64::decode_from(reader)?,
            fee: u64::decode_from(reader)?,
            prev_hash: Digest::decode_from(reader)?,
            body_hash: Digest::decode_from(reader)?,
            ux_hash: Digest::decode_from(reader)?,
        })
    }
}

impl Encode for BlockBody {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.transactions.encode_to(out);
    }
}

impl Decode for BlockBody {
    fn decode_from(reader: &mut Reader<'_>) -> codec::Result<Self> {
        Ok(Self {
            transactions: Vec::decode_from(reader)?,
        })
    }
}

impl Encode for Block {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.header.encode_to(out);
        self.body.encode_to(out);
    }
}

impl Decode for Block {
    fn decode_from(reader: &mut Reader<'_>) -> codec::Result<Self> {
        Ok(Self {
            header: BlockHeader::decode_from(reader)?,
            body: BlockBody::decode_from(reader)?,
        })
    }
}

impl Encode for SignedBlock {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.block.encode_to(out);
        self.sig.encode_to(out);
    }
}

impl Decode for SignedBlock {
    fn decode_from(reader: &mut Reader<'_>) -> codec::Result<Self> {
        Ok(Self {
            block: Block::decode_from(reader)?,
            sig: Sig::decode_from(reader)?,
        })
    }
}

impl Encode for HashPair {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.hash.encode_to(out);
        self.pre_hash.encode_to(out);
    }
}

impl Decode for HashPair {
    fn decode_from(reader: &mut Reader<'_>) -> codec::Result<Self> {
        Ok(Self {
            hash: Digest::decode_from(reader)?,
            pre_hash: Digest::decode_from(reader)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::SecretKey;
    use crate::transaction::TransactionBuilder;

    fn header() -> BlockHeader {
        BlockHeader {
            version: 0,
            time: 1_700_000_000,
            bk_seq: 3,
            fee: 12,
            prev_hash: Digest::new([1; 32]),
            body_hash: Digest::new([2; 32]),
            ux_hash: Digest::new([3; 32]),
        }
    }

    #[test]
    fn header_encoding_is_fixed_width() {
        let bytes = header().encode();
        assert_eq!(bytes.len(), 4 + 8 * 3 + 32 * 3);
        assert_eq!(&bytes[..4], &[0, 0, 0, 0]);
        assert_eq!(&bytes[12..20], &3u64.to_le_bytes());
        assert_eq!(BlockHeader::decode(&bytes).unwrap(), header());
    }

    #[test]
    fn block_hash_is_header_hash() {
        let block = Block {
            header: header(),
            body: BlockBody::default(),
        };
        assert_eq!(block.hash(), sha256(&header().encode()));
    }

    #[test]
    fn block_hash_changes_with_any_header_field() {
        let base = header();
        let mut other = base.clone();
        other.fee += 1;
        assert_ne!(base.hash(), other.hash());
        let mut other = base.clone();
        other.ux_hash = Digest::ZERO;
        assert_ne!(base.hash(), other.hash());
    }

    #[test]
    fn empty_body_hash_is_zero() {
        assert_eq!(BlockBody::default().hash(), Digest::ZERO);
    }

    #[test]
    fn body_hash_is_merkle_of_tx_hashes() {
        let tx = TransactionBuilder::new()
            .push_output(SecretKey::generate().address(), 5, 0)
            .build_unsigned();
        let body = BlockBody {
            transactions: vec![tx.clone()],
        };
        assert_eq!(body.hash(), merkle(&[tx.hash()]));
    }

    #[test]
    fn signed_block_roundtrip() {
        let tx = TransactionBuilder::new()
            .push_input(Digest::new([9; 32]))
            .push_output(SecretKey::generate().address(), 5, 0)
            .sign_inputs(&[SecretKey::generate()])
            .unwrap();
        let sb = SignedBlock {
            block: Block {
                header: header(),
                body: BlockBody {
                    transactions: vec![tx],
                },
            },
            sig: Sig::new([4; 65]),
        };
        let bytes = sb.encode();
        assert_eq!(SignedBlock::decode(&bytes).unwrap(), sb);
        assert!(SignedBlock::decode(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn hash_pair_points_at_parent() {
        let block = Block {
            header: header(),
            body: BlockBody::default(),
        };
        let pair = block.hash_pair();
        assert_eq!(pair.hash, block.hash());
        assert_eq!(pair.pre_hash, Digest::new([1; 32]));
    }
}
