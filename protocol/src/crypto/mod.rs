//! # Cryptographic Primitives for Helio
//!
//! Everything the ledger needs to name things and to prove who owns them:
//!
//! - **SHA-256** for content hashes, the Merkle commitment, and addresses.
//! - **secp256k1 recoverable ECDSA** for input and block signatures.
//!
//! Nothing here is hand-rolled. `sha2` and `k256` do the work; this module
//! pins down the byte layouts the rest of the ledger relies on.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{double_sha256, merkle, sha256, xor_all, Digest};
pub use keys::{Address, KeyError, PubKey, SecretKey, Sig};
pub use signatures::{chk_sig, pubkey_from_sig, sign_hash, verify_signature, SigError};
