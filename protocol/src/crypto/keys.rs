//! # Keys, Signatures & Addresses
//!
//! secp256k1 key material for output owners and the block publisher.
//!
//! Signatures are *recoverable*: 64 bytes of `r || s` followed by a
//! recovery-id byte. That lets a verifier reconstruct the signer's public
//! key from `(hash, sig)` alone, so transactions carry no public keys and
//! ownership is checked by comparing the recovered key's address with the
//! address recorded on the spent output.
//!
//! ## Addresses
//!
//! ```text
//! key      = DoubleSHA256(compressed_pubkey)[..20]
//! address  = version || key
//! textual  = base58(version || key || SHA256(version || key)[..4])
//! ```
//!
//! Key bytes are never logged or printed by this crate.

use k256::ecdsa::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::hash::{double_sha256, sha256, Digest};
use crate::config::{
    ADDRESS_CHECKSUM_LENGTH, ADDRESS_KEY_LENGTH, ADDRESS_VERSION, PUBLIC_KEY_LENGTH,
    SECRET_KEY_LENGTH, SIGNATURE_LENGTH,
};

/// Errors that can occur while parsing key material or addresses.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid secret key")]
    InvalidSecretKey,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid signature encoding: expected {SIGNATURE_LENGTH} bytes")]
    InvalidSignature,

    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

// ---------------------------------------------------------------------------
// Fixed-size byte arrays through serde
// ---------------------------------------------------------------------------

/// serde helper for byte arrays longer than serde's built-in 32: hex in
/// human-readable formats, raw bytes otherwise.
pub(crate) mod fixed_bytes {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(bytes))
        } else {
            serializer.serialize_bytes(bytes)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let raw: Vec<u8> = if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            hex::decode(s).map_err(D::Error::custom)?
        } else {
            Vec::<u8>::deserialize(deserializer)?
        };
        let len = raw.len();
        raw.try_into()
            .map_err(|_| D::Error::custom(format!("expected {N} bytes, got {len}")))
    }
}

// ---------------------------------------------------------------------------
// SecretKey
// ---------------------------------------------------------------------------

/// A secp256k1 signing key.
///
/// Deliberately not `Serialize` and not `Debug`-printable in full: exporting
/// a secret should be an explicit `to_bytes()` call.
#[derive(Clone)]
pub struct SecretKey {
    inner: SigningKey,
}

impl SecretKey {
    /// Fresh key from the thread-local CSPRNG.
    pub fn generate() -> Self {
        Self {
            inner: SigningKey::random(&mut rand::thread_rng()),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != SECRET_KEY_LENGTH {
            return Err(KeyError::InvalidSecretKey);
        }
        let inner = SigningKey::from_slice(bytes).map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self { inner })
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s.trim()).map_err(|e| KeyError::Hex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> [u8; SECRET_KEY_LENGTH] {
        self.inner.to_bytes().into()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn public_key(&self) -> PubKey {
        PubKey::from_verifying_key(self.inner.verifying_key())
    }

    /// Shorthand for `self.public_key().address()`.
    pub fn address(&self) -> Address {
        self.public_key().address()
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

// ---------------------------------------------------------------------------
// PubKey
// ---------------------------------------------------------------------------

/// A compressed secp256k1 public key (33 bytes, SEC1).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PubKey(#[serde(with = "fixed_bytes")] [u8; PUBLIC_KEY_LENGTH]);

impl PubKey {
    /// Parse and validate a compressed point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let vk = VerifyingKey::from_sec1_bytes(bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self::from_verifying_key(&vk))
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s.trim()).map_err(|e| KeyError::Hex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub(crate) fn from_verifying_key(vk: &VerifyingKey) -> Self {
        let point = vk.to_encoded_point(true);
        let mut out = [0u8; PUBLIC_KEY_LENGTH];
        out.copy_from_slice(point.as_bytes());
        Self(out)
    }

    pub(crate) fn verifying_key(&self) -> Result<VerifyingKey, KeyError> {
        VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| KeyError::InvalidPublicKey)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Derive the owning address.
    pub fn address(&self) -> Address {
        let digest = double_sha256(&self.0);
        let mut key = [0u8; ADDRESS_KEY_LENGTH];
        key.copy_from_slice(&digest.0[..ADDRESS_KEY_LENGTH]);
        Address {
            version: ADDRESS_VERSION,
            key,
        }
    }
}

impl fmt::Debug for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PubKey({})", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Sig
// ---------------------------------------------------------------------------

/// Recoverable ECDSA signature: `r (32) || s (32) || recovery_id (1)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sig(#[serde(with = "fixed_bytes")] [u8; SIGNATURE_LENGTH]);

impl Sig {
    pub const fn new(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let arr: [u8; SIGNATURE_LENGTH] =
            bytes.try_into().map_err(|_| KeyError::InvalidSignature)?;
        Ok(Self(arr))
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s.trim()).map_err(|e| KeyError::Hex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The 64-byte `r || s` part.
    pub(crate) fn compact(&self) -> &[u8] {
        &self.0[..SIGNATURE_LENGTH - 1]
    }

    pub(crate) fn recovery_byte(&self) -> u8 {
        self.0[SIGNATURE_LENGTH - 1]
    }
}

impl Default for Sig {
    fn default() -> Self {
        Self([0u8; SIGNATURE_LENGTH])
    }
}

impl fmt::Debug for Sig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sig({})", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// The owner of an unspent output.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address {
    pub version: u8,
    pub key: [u8; ADDRESS_KEY_LENGTH],
}

impl Address {
    fn checksum(&self) -> [u8; ADDRESS_CHECKSUM_LENGTH] {
        let mut body = [0u8; 1 + ADDRESS_KEY_LENGTH];
        body[0] = self.version;
        body[1..].copy_from_slice(&self.key);
        let digest: Digest = sha256(&body);
        let mut out = [0u8; ADDRESS_CHECKSUM_LENGTH];
        out.copy_from_slice(&digest.0[..ADDRESS_CHECKSUM_LENGTH]);
        out
    }

    /// Base58 text form with a 4-byte checksum.
    pub fn to_base58(&self) -> String {
        let mut raw = Vec::with_capacity(1 + ADDRESS_KEY_LENGTH + ADDRESS_CHECKSUM_LENGTH);
        raw.push(self.version);
        raw.extend_from_slice(&self.key);
        raw.extend_from_slice(&self.checksum());
        bs58::encode(raw).into_string()
    }

    /// Parse the base58 form, checking length, version and checksum.
    pub fn from_base58(s: &str) -> Result<Self, KeyError> {
        let raw = bs58::decode(s.trim())
            .into_vec()
            .map_err(|e| KeyError::InvalidAddress(e.to_string()))?;
        if raw.len() != 1 + ADDRESS_KEY_LENGTH + ADDRESS_CHECKSUM_LENGTH {
            return Err(KeyError::InvalidAddress(format!(
                "expected {} bytes, got {}",
                1 + ADDRESS_KEY_LENGTH + ADDRESS_CHECKSUM_LENGTH,
                raw.len()
            )));
        }
        if raw[0] != ADDRESS_VERSION {
            return Err(KeyError::InvalidAddress(format!(
                "unknown version {}",
                raw[0]
            )));
        }
        let mut key = [0u8; ADDRESS_KEY_LENGTH];
        key.copy_from_slice(&raw[1..1 + ADDRESS_KEY_LENGTH]);
        let addr = Address {
            version: raw[0],
            key,
        };
        if addr.checksum()[..] != raw[1 + ADDRESS_KEY_LENGTH..] {
            return Err(KeyError::InvalidAddress("checksum mismatch".to_string()));
        }
        Ok(addr)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_base58())
    }
}

impl FromStr for Address {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}
