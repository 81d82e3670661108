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

use std::iter;

use secp256k1::ecdsa;

use crate::NonStandardValue;

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, Default)]
#[repr(u8)]
pub enum SighashFlag {
    /// 0x1: sign all outputs.
    #[default]
    All = 0x01,
    /// 0x2: sign no outputs --- anyone can choose the destination.
    None = 0x02,
    /// 0x3: sign the output whose index matches this input's index.
    Single = 0x03,
}

/// A sighash type byte, BSV-style: the low five bits carry the base flag,
/// bit 0x40 is `SIGHASH_FORKID`, bit 0x80 is `SIGHASH_ANYONECANPAY`.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, Default)]
pub struct SighashType {
    pub flag: SighashFlag,
    pub anyone_can_pay: bool,
    pub fork_id: bool,
}

impl SighashType {
    pub const fn all() -> Self {
        SighashType { flag: SighashFlag::All, anyone_can_pay: false, fork_id: false }
    }
    pub const fn none() -> Self {
        SighashType { flag: SighashFlag::None, anyone_can_pay: false, fork_id: false }
    }
    pub const fn single() -> Self {
        SighashType { flag: SighashFlag::Single, anyone_can_pay: false, fork_id: false }
    }

    pub const fn with_fork_id(mut self) -> Self {
        self.fork_id = true;
        self
    }

    pub const fn with_anyone_can_pay(mut self) -> Self {
        self.anyone_can_pay = true;
        self
    }

    /// Creates a [`SighashType`] from a raw `u8`, following standardness
    /// rules (unknown base-flag bits are rejected rather than silently
    /// coerced, unlike the legacy permissive `from_consensus` decoding some
    /// implementations retain for pre-BIP62 compatibility).
    pub fn from_standard_u8(n: u8) -> Result<SighashType, NonStandardValue<u32>> {
        let base = n & 0x1f;
        let flag = match base {
            0x01 => SighashFlag::All,
            0x02 => SighashFlag::None,
            0x03 => SighashFlag::Single,
            _ => return Err(NonStandardValue::with(n as u32, "SighashType")),
        };
        Ok(SighashType {
            flag,
            anyone_can_pay: n & 0x80 != 0,
            fork_id: n & 0x40 != 0,
        })
    }

    pub const fn into_consensus_u8(self) -> u8 {
        let flag = self.flag as u8;
        let fork_id = (self.fork_id as u8) << 6;
        let acp = (self.anyone_can_pay as u8) << 7;
        flag | fork_id | acp
    }

    pub const fn to_consensus_u8(self) -> u8 { self.into_consensus_u8() }
}

/// An ECDSA signature-related error.
#[derive(Clone, PartialEq, Eq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum SigError {
    /// non-standard sighash type.
    #[display(inner)]
    #[from]
    SighashType(NonStandardValue<u32>),

    /// empty signature.
    EmptySignature,

    /// invalid signature DER encoding.
    DerEncoding,
}

/// A legacy (pre-Schnorr) ECDSA signature together with its sighash byte, as
/// consumed directly off the stack by `OP_CHECKSIG`/`OP_CHECKMULTISIG`.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct LegacySig {
    pub sig: ecdsa::Signature,
    pub sighash_type: SighashType,
}

impl LegacySig {
    pub fn sighash_all(sig: ecdsa::Signature) -> LegacySig {
        LegacySig { sig, sighash_type: SighashType::all() }
    }

    /// Splits the trailing sighash byte from a raw DER-encoded stack item and
    /// decodes both halves. Assumes the DER bytes have already passed
    /// consensus/strict-encoding shape checks; this only performs the
    /// `secp256k1` parse.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SigError> {
        let (hash_ty, sig) = bytes.split_last().ok_or(SigError::EmptySignature)?;
        let sighash_type = SighashType::from_standard_u8(*hash_ty)?;
        let sig = ecdsa::Signature::from_der(sig).map_err(|_| SigError::DerEncoding)?;
        Ok(LegacySig { sig, sighash_type })
    }

    pub fn to_vec(self) -> Vec<u8> {
        self.sig
            .serialize_der()
            .iter()
            .copied()
            .chain(iter::once(self.sighash_type.into_consensus_u8()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sighash_type_roundtrips() {
        for base in [SighashFlag::All, SighashFlag::None, SighashFlag::Single] {
            for acp in [false, true] {
                for fork_id in [false, true] {
                    let ty = SighashType { flag: base, anyone_can_pay: acp, fork_id };
                    let byte = ty.into_consensus_u8();
                    let decoded = SighashType::from_standard_u8(byte).unwrap();
                    assert_eq!(decoded, ty);
                }
            }
        }
    }

    #[test]
    fn rejects_unknown_base_flag() {
        assert!(SighashType::from_standard_u8(0x00).is_err());
        assert!(SighashType::from_standard_u8(0x04).is_err());
    }
}
