// Bitcoin script interpreter core library.
//
// SPDX-License-Identifier: Apache-2.0
//
// Written in 2019-2024 by
//     Dr Maxim Orlovsky <orlovsky@lnp-bp.org>
//
// Copyright (C) 2019-2024 LNP/BP Standards Association. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use core::slice;
use std::fmt::{self, Debug, Display, Formatter, LowerHex};
use std::iter::Sum;
use std::num::ParseIntError;
use std::ops::{Div, Rem};
use std::str::FromStr;

use amplify::hex::{self, FromHex, ToHex};
use amplify::{ByteArray, Bytes32StrRev, Wrapper};

use crate::{
    hash_sha256d, ConsensusDecode, ConsensusDecodeError, ConsensusEncode, NonStandardValue,
    ScriptPubkey, SigScript, VarIntArray,
};

#[derive(Wrapper, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, From)]
#[wrapper(AsSlice)]
#[wrapper(BorrowSlice, Index, RangeOps, Debug, Hex, Display, FromStr)]
// all-zeros used in coinbase
pub struct Txid(#[from] #[from([u8; 32])] Bytes32StrRev);

impl From<Txid> for [u8; 32] {
    fn from(txid: Txid) -> Self { txid.to_byte_array() }
}

impl Txid {
    #[inline]
    pub const fn coinbase() -> Self { Self(Bytes32StrRev::zero()) }
    #[inline]
    pub fn is_coinbase(&self) -> bool { self.to_byte_array() == [0u8; 32] }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, From)]
#[display(inner)]
// 0xFFFFFFFF used in coinbase
pub struct Vout(u32);

impl Vout {
    pub const fn from_u32(u: u32) -> Self { Vout(u) }
    #[inline]
    pub const fn into_u32(self) -> u32 { self.0 }
    #[inline]
    pub const fn into_usize(self) -> usize { self.0 as usize }
    #[inline]
    pub const fn to_u32(&self) -> u32 { self.0 }
    #[inline]
    pub const fn to_usize(&self) -> usize { self.0 as usize }
}

impl FromStr for Vout {
    type Err = ParseIntError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> { s.parse().map(Self) }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
#[display("{txid}:{vout}")]
pub struct Outpoint {
    pub txid: Txid,
    pub vout: Vout,
}

impl Outpoint {
    #[inline]
    pub fn new(txid: Txid, vout: impl Into<Vout>) -> Self { Self { txid, vout: vout.into() } }

    #[inline]
    pub const fn coinbase() -> Self { Self { txid: Txid::coinbase(), vout: Vout::from_u32(0) } }

    #[inline]
    pub fn vout_u32(self) -> u32 { self.vout.into_u32() }

    #[inline]
    pub fn vout_usize(self) -> usize { self.vout.into_usize() }

    #[inline]
    pub fn is_coinbase(&self) -> bool { self.txid.is_coinbase() && self.vout.into_u32() == 0 }
}

#[derive(Clone, Eq, PartialEq, Debug, Display, From, Error)]
#[display(doc_comments)]
pub enum OutpointParseError {
    /// malformed string representation of outpoint '{0}' lacking txid and
    /// vout separator ':'.
    MalformedSeparator(String),

    /// malformed outpoint output number. Details: {0}
    #[from]
    InvalidVout(ParseIntError),

    /// malformed outpoint txid value. Details: {0}
    #[from]
    InvalidTxid(hex::Error),
}

impl FromStr for Outpoint {
    type Err = OutpointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid, vout) = s
            .split_once(':')
            .ok_or_else(|| OutpointParseError::MalformedSeparator(s.to_owned()))?;
        Ok(Outpoint::new(txid.parse()?, Vout::from_str(vout)?))
    }
}

/// The threshold (see [Bitcoin Core]) for deciding whether a lock time value
/// is a block height or a UNIX timestamp.
///
/// [Bitcoin Core]: https://github.com/bitcoin/bitcoin/blob/9ccaee1/src/script/script.h#L39
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct LockTime(u32);

impl LockTime {
    pub const ZERO: Self = Self(0);

    #[inline]
    pub const fn from_height(height: u32) -> Option<Self> {
        if height < LOCKTIME_THRESHOLD { Some(Self(height)) } else { None }
    }

    #[inline]
    pub const fn from_unix_timestamp(timestamp: u32) -> Option<Self> {
        if timestamp < LOCKTIME_THRESHOLD { None } else { Some(Self(timestamp)) }
    }

    #[inline]
    pub const fn from_consensus_u32(lock_time: u32) -> Self { LockTime(lock_time) }

    #[inline]
    pub const fn to_consensus_u32(&self) -> u32 { self.0 }

    #[inline]
    pub const fn into_consensus_u32(self) -> u32 { self.0 }

    #[inline]
    pub const fn is_height_based(self) -> bool { self.0 < LOCKTIME_THRESHOLD }

    #[inline]
    pub const fn is_time_based(self) -> bool { !self.is_height_based() }
}

/// `nSequence` value used both for opt-in replace-by-fee signalling and, when
/// `OP_CHECKSEQUENCEVERIFY` (BIP112) applies, for relative timelocks.
pub const SEQUENCE_FINAL: u32 = 0xFFFF_FFFF;
pub const SEQUENCE_LOCKTIME_DISABLE_FLAG: u32 = 1 << 31;
pub const SEQUENCE_LOCKTIME_TYPE_FLAG: u32 = 1 << 22;
pub const SEQUENCE_LOCKTIME_MASK: u32 = 0x0000_FFFF;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, From)]
pub struct SeqNo(u32);

impl SeqNo {
    pub const FINAL: Self = Self(SEQUENCE_FINAL);

    #[inline]
    pub const fn from_consensus_u32(seq: u32) -> Self { SeqNo(seq) }

    #[inline]
    pub const fn to_consensus_u32(&self) -> u32 { self.0 }

    #[inline]
    pub const fn is_final(self) -> bool { self.0 == SEQUENCE_FINAL }

    /// Whether relative-locktime semantics (BIP68/BIP112) apply to this
    /// input at all, i.e. bit 31 is clear.
    #[inline]
    pub const fn enables_relative_locktime(self) -> bool {
        self.0 & SEQUENCE_LOCKTIME_DISABLE_FLAG == 0
    }

    /// Whether the relative lock is time-based (bit 22 set) rather than
    /// height-based.
    #[inline]
    pub const fn is_time_locked(self) -> bool { self.0 & SEQUENCE_LOCKTIME_TYPE_FLAG != 0 }

    /// The masked relative-lock value (height count, or 512-second units).
    #[inline]
    pub const fn locktime_value(self) -> u32 { self.0 & SEQUENCE_LOCKTIME_MASK }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct TxIn {
    pub prev_output: Outpoint,
    pub sig_script: SigScript,
    pub sequence: SeqNo,
}

#[derive(
    Wrapper, WrapperMut, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, From, Default
)]
#[wrapper(Add, Sub, Mul, Div, FromStr)]
#[wrapper_mut(MathAssign)]
pub struct Sats(#[from] #[from(u32)] #[from(u16)] #[from(u8)] pub u64);

impl Sats {
    pub const ZERO: Self = Sats(0);
    #[allow(clippy::inconsistent_digit_grouping)]
    pub const BTC: Self = Sats(1_000_000_00);

    pub const fn from_btc(btc: u32) -> Self { Self(btc as u64 * Self::BTC.0) }
    pub fn from_sats(sats: impl Into<u64>) -> Self { Self(sats.into()) }

    pub const fn is_zero(&self) -> bool { self.0 == 0 }
    pub const fn sats(&self) -> u64 { self.0 }

    pub fn sats_i64(&self) -> i64 {
        i64::try_from(self.0).expect("amount of sats exceeds total bitcoin supply")
    }

    #[must_use]
    pub fn checked_add(&self, other: impl Into<Self>) -> Option<Self> {
        self.0.checked_add(other.into().0).map(Self)
    }
    #[must_use]
    pub fn checked_sub(&self, other: impl Into<Self>) -> Option<Self> {
        self.0.checked_sub(other.into().0).map(Self)
    }
}

impl PartialEq<u64> for Sats {
    fn eq(&self, other: &u64) -> bool { self.0.eq(other) }
}

impl Sum for Sats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Sats::ZERO, |sum, value| Sats(sum.0.saturating_add(value.0)))
    }
}

impl Div<usize> for Sats {
    type Output = Sats;
    fn div(self, rhs: usize) -> Self::Output { Sats(self.0 / rhs as u64) }
}

impl Rem<usize> for Sats {
    type Output = Sats;
    fn rem(self, rhs: usize) -> Self::Output { Sats(self.0 % rhs as u64) }
}

impl Display for Sats {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { Display::fmt(&self.0, f) }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct TxOut {
    pub value: Sats,
    pub script_pubkey: ScriptPubkey,
}

impl TxOut {
    pub fn new(script_pubkey: impl Into<ScriptPubkey>, value: impl Into<Sats>) -> Self {
        TxOut { script_pubkey: script_pubkey.into(), value: value.into() }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct TxVer(i32);

impl Default for TxVer {
    fn default() -> Self { TxVer(2) }
}

impl TxVer {
    pub const V1: Self = TxVer(1);
    pub const V2: Self = TxVer(2);

    #[inline]
    pub const fn from_consensus_i32(ver: i32) -> Self { TxVer(ver) }

    pub const fn try_from_standard(ver: i32) -> Result<Self, NonStandardValue<i32>> {
        let ver = TxVer::from_consensus_i32(ver);
        if !ver.is_standard() { Err(NonStandardValue::with(ver.0, "TxVer")) } else { Ok(ver) }
    }

    #[inline]
    pub const fn is_standard(self) -> bool { self.0 <= TxVer::V2.0 }

    #[inline]
    pub const fn to_consensus_i32(&self) -> i32 { self.0 }
}

/// A legacy (pre-segwit) Bitcoin transaction, the only wire shape this
/// interpreter's sighash construction needs to understand.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Display)]
#[display(LowerHex)]
pub struct Tx {
    pub version: TxVer,
    pub inputs: VarIntArray<TxIn>,
    pub outputs: VarIntArray<TxOut>,
    pub lock_time: LockTime,
}

impl LowerHex for Tx {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.consensus_serialize().to_hex())
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Display, Error, From)]
#[display(inner)]
pub enum TxParseError {
    #[from]
    Hex(hex::Error),
    #[from]
    Consensus(ConsensusDecodeError),
}

impl FromStr for Tx {
    type Err = TxParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let data = Vec::<u8>::from_hex(s)?;
        Tx::consensus_deserialize(data).map_err(TxParseError::from)
    }
}

impl Tx {
    #[inline]
    pub fn inputs(&self) -> slice::Iter<TxIn> { self.inputs.iter() }

    #[inline]
    pub fn outputs(&self) -> slice::Iter<TxOut> { self.outputs.iter() }

    pub fn txid(&self) -> Txid { Txid::from_byte_array(hash_sha256d(&self.consensus_serialize())) }

    /// Legacy (pre-`SIGHASH_FORKID`) signature hash, BIP143-incompatible:
    /// serializes a transaction copy with `script_code` substituted into the
    /// signed input and every other input's `sig_script` emptied, masks the
    /// outputs per `sighash_type.flag`, and double-SHA256s the result together
    /// with the trailing little-endian sighash-type word.
    ///
    /// When `sighash_type.fork_id` is set, instead computes the BIP143-style
    /// preimage (prevouts/sequence/outputs hashes plus the spent value),
    /// matching `SIGHASH_FORKID` as adopted by post-fork chains.
    pub fn signature_hash(
        &self,
        input_index: usize,
        script_code: &[u8],
        value: crate::Sats,
        sighash_type: crate::SighashType,
    ) -> [u8; 32] {
        if sighash_type.fork_id {
            self.signature_hash_fork_id(input_index, script_code, value, sighash_type)
        } else {
            self.signature_hash_legacy(input_index, script_code, sighash_type)
        }
    }

    fn signature_hash_legacy(
        &self,
        input_index: usize,
        script_code: &[u8],
        sighash_type: crate::SighashType,
    ) -> [u8; 32] {
        use crate::SighashFlag;

        if input_index >= self.inputs.len() {
            // Matches historical client behaviour: out-of-range input index
            // hashes to the constant "one" rather than panicking.
            let mut one = [0u8; 32];
            one[0] = 1;
            return one;
        }

        let anyone_can_pay = sighash_type.anyone_can_pay;
        let inputs: Vec<TxIn> = if anyone_can_pay {
            vec![TxIn {
                prev_output: self.inputs[input_index].prev_output,
                sig_script: crate::SigScript::from_unsafe(script_code.to_vec()),
                sequence: self.inputs[input_index].sequence,
            }]
        } else {
            self.inputs()
                .enumerate()
                .map(|(i, input)| TxIn {
                    prev_output: input.prev_output,
                    sig_script: if i == input_index {
                        crate::SigScript::from_unsafe(script_code.to_vec())
                    } else {
                        crate::SigScript::empty()
                    },
                    sequence: if i != input_index
                        && matches!(sighash_type.flag, SighashFlag::None | SighashFlag::Single)
                    {
                        SeqNo::from_consensus_u32(0)
                    } else {
                        input.sequence
                    },
                })
                .collect()
        };

        let outputs: Vec<TxOut> = match sighash_type.flag {
            SighashFlag::All => self.outputs.to_vec(),
            SighashFlag::None => Vec::new(),
            SighashFlag::Single => {
                if input_index >= self.outputs.len() {
                    let mut one = [0u8; 32];
                    one[0] = 1;
                    return one;
                }
                let mut outs: Vec<TxOut> =
                    (0..=input_index).map(|_| TxOut::new(ScriptPubkey::empty(), Sats::ZERO)).collect();
                outs[input_index] = self.outputs[input_index].clone();
                outs
            }
        };

        let shtx = Tx {
            version: self.version,
            inputs: VarIntArray::try_from(inputs).expect("bounded by original tx"),
            outputs: VarIntArray::try_from(outputs).expect("bounded by original tx"),
            lock_time: self.lock_time,
        };

        let mut preimage = shtx.consensus_serialize();
        preimage.extend_from_slice(&(sighash_type.into_consensus_u8() as u32).to_le_bytes());
        hash_sha256d(&preimage)
    }

    fn signature_hash_fork_id(
        &self,
        input_index: usize,
        script_code: &[u8],
        value: crate::Sats,
        sighash_type: crate::SighashType,
    ) -> [u8; 32] {
        use crate::SighashFlag;

        let input = &self.inputs[input_index];

        let hash_prevouts = if sighash_type.anyone_can_pay {
            [0u8; 32]
        } else {
            let mut buf = Vec::with_capacity(self.inputs.len() * 36);
            for inp in self.inputs() {
                inp.prev_output.txid.consensus_encode(&mut buf).expect("vec write");
                inp.prev_output.vout.consensus_encode(&mut buf).expect("vec write");
            }
            hash_sha256d(&buf)
        };

        let hash_sequence = if !sighash_type.anyone_can_pay
            && matches!(sighash_type.flag, SighashFlag::All)
        {
            let mut buf = Vec::with_capacity(self.inputs.len() * 4);
            for inp in self.inputs() {
                inp.sequence.consensus_encode(&mut buf).expect("vec write");
            }
            hash_sha256d(&buf)
        } else {
            [0u8; 32]
        };

        let hash_outputs = match sighash_type.flag {
            SighashFlag::All => {
                let mut buf = Vec::new();
                for out in self.outputs() {
                    out.consensus_encode(&mut buf).expect("vec write");
                }
                hash_sha256d(&buf)
            }
            SighashFlag::Single if input_index < self.outputs.len() => {
                let mut buf = Vec::new();
                self.outputs[input_index].consensus_encode(&mut buf).expect("vec write");
                hash_sha256d(&buf)
            }
            _ => [0u8; 32],
        };

        let mut preimage = Vec::new();
        self.version.consensus_encode(&mut preimage).expect("vec write");
        preimage.extend_from_slice(&hash_prevouts);
        preimage.extend_from_slice(&hash_sequence);
        input.prev_output.txid.consensus_encode(&mut preimage).expect("vec write");
        input.prev_output.vout.consensus_encode(&mut preimage).expect("vec write");
        crate::ScriptBytes::from_unsafe(script_code.to_vec())
            .consensus_encode(&mut preimage)
            .expect("vec write");
        value.consensus_encode(&mut preimage).expect("vec write");
        input.sequence.consensus_encode(&mut preimage).expect("vec write");
        preimage.extend_from_slice(&hash_outputs);
        self.lock_time.consensus_encode(&mut preimage).expect("vec write");
        preimage.extend_from_slice(&(sighash_type.into_consensus_u8() as u32).to_le_bytes());

        hash_sha256d(&preimage)
    }
}

impl crate::SighashContext for Tx {
    fn version(&self) -> i32 { self.version.to_consensus_i32() }
    fn locktime(&self) -> u32 { self.lock_time.to_consensus_u32() }
    fn input_sequence(&self, index: usize) -> u32 { self.inputs[index].sequence.to_consensus_u32() }
    fn signature_hash(
        &self,
        index: usize,
        value: i64,
        script_code: &[u8],
        sighash: u8,
    ) -> [u8; 32] {
        let sighash_type =
            crate::SighashType::from_standard_u8(sighash).unwrap_or(crate::SighashType::all());
        Tx::signature_hash(self, index, script_code, Sats(value as u64), sighash_type)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn txid_byteorder() {
        let hex = "ed9f6388c0360c1861d331a0388d5a54815dd720cc67fa783c348217a0e943ca";
        let from_str = Txid::from_str(hex).unwrap();
        let from_hex = Txid::from_hex(hex).unwrap();
        assert_eq!(from_str, from_hex);
        assert_eq!(from_str.to_string(), from_str.to_hex());
        assert_eq!(from_str.to_string(), hex);
        assert_eq!(format!("{from_str:x}"), hex);
        assert_eq!(from_str[0], 0xca);
    }

    #[test]
    fn sats_arithmetic() {
        assert_eq!(Sats(0).sats(), 0);
        assert_eq!(Sats(100_000_000), Sats::from_btc(1));
        assert_eq!(Sats(100_000_000).checked_add(Sats(1)).unwrap(), Sats(100_000_001));
        assert_eq!(Sats(1).checked_sub(Sats(2)), None);
    }

    #[test]
    fn nonsegwit_transaction_roundtrips() {
        let tx =
            "0100000001a15d57094aa7a21a28cb20b59aab8fc7d1149a3bdbcddba9c622e4f5f6a99ece010000006c49\
            3046022100f93bb0e7d8db7bd46e40132d1f8242026e045f03a0efe71bbb8e3f475e970d790221009337cd7\
            f1f929f00cc6ff01f03729b069a7c21b59b1736ddfee5db5946c5da8c0121033b9b137ee87d5a812d6f506e\
            fdd37f0affa7ffc310711c06c7f3e097c9447c52ffffffff0100e1f505000000001976a9140389035a9225b\
            3839e2bbf32d826a1e222031fd888ac00000000";
        let realtx = Tx::from_str(tx).unwrap();

        assert_eq!(&realtx.to_string(), tx);
        assert_eq!(&realtx.to_hex(), tx);
        assert_eq!(&format!("{realtx:x}"), tx);

        assert_eq!(realtx.version, TxVer::V1);
        assert_eq!(realtx.inputs.len(), 1);
        // In particular this one is easy to get backward -- in bitcoin hashes
        // are encoded as little-endian 256-bit numbers rather than as data
        // strings.
        assert_eq!(
            format!("{:x}", realtx.inputs[0].prev_output.txid),
            "ce9ea9f6f5e422c6a9dbcddb3b9a14d1c78fab9ab520cb281aa2a74a09575da1".to_string()
        );
        assert_eq!(realtx.inputs[0].prev_output.vout, Vout::from_u32(1));
        assert_eq!(realtx.outputs.len(), 1);
        assert_eq!(realtx.lock_time, LockTime::ZERO);
    }

    #[test]
    fn sequence_csv_fields() {
        let s = SeqNo::from_consensus_u32(0x00_40_01_00);
        assert!(s.enables_relative_locktime());
        assert!(s.is_time_locked());
        assert_eq!(s.locktime_value(), 0x0100);
        assert!(SeqNo::FINAL.is_final());
        assert!(!SeqNo::FINAL.enables_relative_locktime());
    }
}
