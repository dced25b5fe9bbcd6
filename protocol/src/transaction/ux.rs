//! Unspent outputs.
//!
//! A [`UxOut`] is split in two on purpose. The [`UxBody`] is what the
//! output *is*: where it came from, who owns it, how much it holds. Its
//! hash is the output's identity everywhere in the ledger. The [`UxHead`]
//! is bookkeeping about *when* it was created, which matters for coin-hour
//! accrual but must not change the identity, so it is never hashed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::{self, Decode, Encode, Reader};
use crate::config::{COIN_HOUR_DIVISOR, SECONDS_PER_HOUR};
use crate::crypto::hash::{sha256, Digest};
use crate::crypto::keys::Address;

/// Coin or coin-hour arithmetic left the `u64` range.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AmountError {
    #[error("coin amount overflow")]
    CoinOverflow,

    #[error("coin-hour amount overflow")]
    HourOverflow,
}

/// Creation metadata. Not part of the output's identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UxHead {
    /// Time of the block that created the output, in seconds.
    pub time: u64,
    pub bk_seq: u64,
}

/// The hashed payload of an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UxBody {
    /// Hash of the creating transaction; zero for the genesis output.
    pub src_transaction: Digest,
    pub address: Address,
    pub coins: u64,
    pub hours: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UxOut {
    pub head: UxHead,
    pub body: UxBody,
}

impl UxBody {
    pub fn hash(&self) -> Digest {
        sha256(&self.encode())
    }
}

impl UxOut {
    /// Identity of the output: `sha256(encode(body))`.
    pub fn hash(&self) -> Digest {
        self.body.hash()
    }

    /// Coin-hours held at time `now` (seconds).
    ///
    /// Accrual is in whole elapsed hours: `hours + floor(elapsed_hours *
    /// coins / 1_000_000)`. A `now` earlier than the creation time accrues
    /// nothing.
    pub fn coin_hours(&self, now: u64) -> Result<u64, AmountError> {
        if now <= self.head.time {
            return Ok(self.body.hours);
        }
        let elapsed_hours = (now - self.head.time) / SECONDS_PER_HOUR;
        let accrued = elapsed_hours
            .checked_mul(self.body.coins)
            .ok_or(AmountError::HourOverflow)?
            / COIN_HOUR_DIVISOR;
        self.body
            .hours
            .checked_add(accrued)
            .ok_or(AmountError::HourOverflow)
    }
}

/// Sum of coins over a list of outputs.
pub fn total_coins(uxs: &[UxOut]) -> Result<u64, AmountError> {
    uxs.iter().try_fold(0u64, |acc, ux| {
        acc.checked_add(ux.body.coins)
            .ok_or(AmountError::CoinOverflow)
    })
}

/// Sum of coin-hours at `now` over a list of outputs.
pub fn total_coin_hours(uxs: &[UxOut], now: u64) -> Result<u64, AmountError> {
    uxs.iter().try_fold(0u64, |acc, ux| {
        acc.checked_add(ux.coin_hours(now)?)
            .ok_or(AmountError::HourOverflow)
    })
}

// ---------------------------------------------------------------------------
// Canonical encoding
// ---------------------------------------------------------------------------

impl Encode for UxHead {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.time.encode_to(out);
        self.bk_seq.encode_to(out);
    }
}

impl Decode for UxHead {
    fn decode_from(reader: &mut Reader<'_>) -> codec::Result<Self> {
        Ok(Self {
            time: u64::decode_from(reader)?,
            bk_seq: u64::decode_from(reader)?,
        })
    }
}

impl Encode for UxBody {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.src_transaction.encode_to(out);
        self.address.encode_to(out);
        self.coins.encode_to(out);
        self.hours.encode_to(out);
    }
}

impl Decode for UxBody {
    fn decode_from(reader: &mut Reader<'_>) -> codec::Result<Self> {
        Ok(Self {
            src_transaction: Digest::decode_from(reader)?,
            address: Address::decode_from(reader)?,
            coins: u64::decode_from(reader)?,
            hours: u64::decode_from(reader)?,
        })
    }
}

impl Encode for UxOut {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.head.encode_to(out);
        self.body.encode_to(out);
    }
}

impl Decode for UxOut {
    fn decode_from(reader: &mut Reader<'_>) -> codec::Result<Self> {
        Ok(Self {
            head: UxHead::decode_from(reader)?,
            body: UxBody::decode_from(reader)?,
        })
    }
}
