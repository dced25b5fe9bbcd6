//! Core transaction types.
//!
//! ```text
//! Transaction
//! ├── head:    { hash: InnerHash, sigs: [Sig; len(inputs)] }
//! ├── inputs:  [Digest]            hashes of the UxOuts being spent
//! └── outputs: [{address, coins, hours}]
//! ```
//!
//! Two hashes matter. `inner_hash` covers inputs and outputs only and is
//! what the owners sign. `hash` covers everything, signatures included, and
//! becomes the `src_transaction` of every output the transaction creates.

use serde::{Deserialize, Serialize};

use super::ux::{AmountError, UxBody, UxHead, UxOut};
use crate::codec::{self, Decode, Encode, Reader};
use crate::crypto::hash::{sha256, sha256_multi, Digest};
use crate::crypto::keys::{Address, Sig};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHead {
    /// Must equal the recomputed inner hash. Never trusted as received.
    pub hash: Digest,
    /// `sigs[i]` authorizes spending `inputs[i]`.
    pub sigs: Vec<Sig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub address: Address,
    pub coins: u64,
    pub hours: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub head: TransactionHead,
    pub inputs: Vec<Digest>,
    pub outputs: Vec<TransactionOutput>,
}

impl Transaction {
    /// `sha256(encode(inputs) || encode(outputs))`.
    pub fn inner_hash(&self) -> Digest {
        sha256_multi(&[
            self.inputs.encode().as_slice(),
            self.outputs.encode().as_slice(),
        ])
    }

    /// Hash of the full canonical encoding, signatures included.
    pub fn hash(&self) -> Digest {
        sha256(&self.encode())
    }

    /// Stamp the header with the current inner hash.
    pub fn update_header(&mut self) {
        self.head.hash = self.inner_hash();
    }

    /// The bodies of the outputs this transaction creates, given the hash
    /// that becomes their `src_transaction`.
    pub fn output_bodies(&self, src_transaction: Digest) -> Vec<UxBody> {
        self.outputs
            .iter()
            .map(|o| UxBody {
                src_transaction,
                address: o.address,
                coins: o.coins,
                hours: o.hours,
            })
            .collect()
    }

    /// Materialize the created outputs as they would enter the unspent pool.
    pub fn created_outputs(&self, src_transaction: Digest, head: UxHead) -> Vec<UxOut> {
        self.output_bodies(src_transaction)
            .into_iter()
            .map(|body| UxOut { head, body })
            .collect()
    }

    pub fn output_coins(&self) -> Result<u64, AmountError> {
        self.outputs.iter().try_fold(0u64, |acc, o| {
            acc.checked_add(o.coins).ok_or(AmountError::CoinOverflow)
        })
    }

    pub fn output_hours(&self) -> Result<u64, AmountError> {
        self.outputs.iter().try_fold(0u64, |acc, o| {
            acc.checked_add(o.hours).ok_or(AmountError::HourOverflow)
        })
    }
}

// ---------------------------------------------------------------------------
// Canonical encoding
// ---------------------------------------------------------------------------

impl Encode for TransactionHead {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.hash.encode_to(out);
        self.sigs.encode_to(out);
    }
}

impl Decode for TransactionHead {
    fn decode_from(reader: &mut Reader<'_>) -> codec::Result<Self> {
        Ok(Self {
            hash: Digest::decode_from(reader)?,
            sigs: Vec::decode_from(reader)?,
        })
    }
}

impl Encode for TransactionOutput {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.address.encode_to(out);
        self.coins.encode_to(out);
        self.hours.encode_to(out);
    }
}

impl Decode for TransactionOutput {
    fn decode_from(reader: &mut Reader<'_>) -> codec::Result<Self> {
        Ok(Self {
            address: Address::decode_from(reader)?,
            coins: u64::decode_from(reader)?,
            hours: u64::decode_from(reader)?,
        })
    }
}

impl Encode for Transaction {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.head.encode_to(out);
        self.inputs.encode_to(out);
        self.outputs.encode_to(out);
    }
}

impl Decode for Transaction {
    fn decode_from(reader: &mut Reader<'_>) -> codec::Result<Self> {
        Ok(Self {
            head: TransactionHead::decode_from(reader)?,
            inputs: Vec::decode_from(reader)?,
            outputs: Vec::decode_from(reader)?,
        })
    }
}
