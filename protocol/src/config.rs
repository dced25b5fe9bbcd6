//! # Protocol Configuration & Constants
//!
//! Every number the ledger's consensus rules depend on lives here. Changing
//! any of the hashing or encoding constants changes every hash on the chain,
//! so treat them as frozen once a genesis block exists.
//!
//! Runtime knobs that an operator may legitimately tune (which publisher
//! key to trust, how much clock drift to tolerate) live in [`ChainConfig`].

use serde::{Deserialize, Serialize};

use crate::crypto::keys::{KeyError, PubKey};

// ---------------------------------------------------------------------------
// Hashing & Encoding
// ---------------------------------------------------------------------------

/// SHA-256 output length in bytes.
pub const HASH_OUTPUT_LENGTH: usize = 32;

/// Merkle fan-out. Each internal node commits to this many children.
pub const MERKLE_FANOUT: usize = 16;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Compressed secp256k1 public key length.
pub const PUBLIC_KEY_LENGTH: usize = 33;

/// secp256k1 secret key length.
pub const SECRET_KEY_LENGTH: usize = 32;

/// Recoverable signature: 64 bytes of `r || s` plus one recovery-id byte.
pub const SIGNATURE_LENGTH: usize = 65;

/// Length of the key part of an address (truncated double SHA-256).
pub const ADDRESS_KEY_LENGTH: usize = 20;

/// Length of the checksum appended to the base58 address form.
pub const ADDRESS_CHECKSUM_LENGTH: usize = 4;

/// Version byte stamped on every address this ledger creates.
pub const ADDRESS_VERSION: u8 = 0;

// ---------------------------------------------------------------------------
// Coin-hours
// ---------------------------------------------------------------------------

/// Seconds per accrued coin-hour period.
pub const SECONDS_PER_HOUR: u64 = 3_600;

/// One whole coin, in base units. A full coin held for one hour accrues one
/// coin-hour.
pub const COIN_HOUR_DIVISOR: u64 = 1_000_000;

// ---------------------------------------------------------------------------
// Block Rules
// ---------------------------------------------------------------------------

/// Current block header version.
pub const BLOCK_VERSION: u32 = 0;

/// Default tolerance for block timestamps ahead of the local clock, seconds.
pub const DEFAULT_MAX_FUTURE_DRIFT_SECS: u64 = 60;

// ---------------------------------------------------------------------------
// Storage Layout
// ---------------------------------------------------------------------------

/// sled tree: block hash -> block.
pub const TREE_BLOCKS: &str = "blocks";

/// sled tree: depth -> ordered list of hash pairs.
pub const TREE_GRAPH: &str = "tree";

/// sled tree: output hash -> unspent output.
pub const TREE_UNSPENT: &str = "unspent";

/// sled tree: chain metadata (head sequence).
pub const TREE_META: &str = "meta";

/// sled tree: block hash -> publisher signature.
pub const TREE_BLOCK_SIGS: &str = "block_sigs";

// ---------------------------------------------------------------------------
// ChainConfig
// ---------------------------------------------------------------------------

/// Operator-tunable settings for one [`crate::chain::Blockchain`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Hex-encoded compressed public key of the block publisher. When set,
    /// every executed block's signature must verify against it.
    #[serde(default)]
    pub publisher_key: Option<String>,

    /// Reject blocks whose `time` is further than this ahead of wall-clock.
    #[serde(default = "default_max_future_drift")]
    pub max_future_drift_secs: u64,
}

fn default_max_future_drift() -> u64 {
    DEFAULT_MAX_FUTURE_DRIFT_SECS
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            publisher_key: None,
            max_future_drift_secs: DEFAULT_MAX_FUTURE_DRIFT_SECS,
        }
    }
}

impl ChainConfig {
    /// A config that trusts `publisher` for block signatures.
    pub fn with_publisher(publisher: &PubKey) -> Self {
        Self {
            publisher_key: Some(publisher.to_hex()),
            ..Default::default()
        }
    }

    /// Parse the configured publisher key, if any.
    pub fn publisher(&self) -> Result<Option<PubKey>, KeyError> {
        self.publisher_key
            .as_deref()
            .map(PubKey::from_hex)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::SecretKey;

    #[test]
    fn test_tree_names_are_distinct() {
        let names = [
            TREE_BLOCKS,
            TREE_GRAPH,
            TREE_UNSPENT,
            TREE_META,
            TREE_BLOCK_SIGS,
        ];
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_crypto_parameter_sizes() {
        assert_eq!(HASH_OUTPUT_LENGTH, 32);
        assert_eq!(SIGNATURE_LENGTH, 65);
        assert_eq!(PUBLIC_KEY_LENGTH, 33);
        assert_eq!(MERKLE_FANOUT, 16);
    }

    #[test]
    fn default_config_has_no_publisher() {
        let cfg = ChainConfig::default();
        assert!(cfg.publisher().unwrap().is_none());
        assert_eq!(cfg.max_future_drift_secs, DEFAULT_MAX_FUTURE_DRIFT_SECS);
    }

    #[test]
    fn publisher_key_roundtrips_through_config() {
        let sk = SecretKey::generate();
        let cfg = ChainConfig::with_publisher(&sk.public_key());
        assert_eq!(cfg.publisher().unwrap(), Some(sk.public_key()));
    }

    #[test]
    fn bad_publisher_hex_is_an_error() {
        let cfg = ChainConfig {
            publisher_key: Some("zz".to_string()),
            ..Default::default()
        };
        assert!(cfg.publisher().is_err());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: ChainConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, ChainConfig::default());
    }
}
