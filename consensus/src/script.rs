// Bitcoin script interpreter core library.
//
// SPDX-License-Identifier: Apache-2.0
//
// Written in 2019-2023 by
//     Dr Maxim Orlovsky <orlovsky@lnp-bp.org>
//
// Copyright (C) 2019-2023 LNP/BP Standards Association. All rights reserved.
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

use amplify::confinement;
use amplify::confinement::Confined;

use crate::opcodes::*;
use crate::{VarInt, VarIntArray};

/// A curated subset of opcodes used when *building* scripts from this crate
/// (the standard output templates and push helpers below). The interpreter
/// dispatches on the raw opcode byte directly against the `opcodes` module
/// constants; this enum exists for the handful of opcodes this crate itself
/// ever needs to emit or name in a `Display` impl.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
pub enum OpCode {
    /// Push an empty array onto the stack.
    #[display("OP_PUSHBYTES0")]
    PushBytes0 = OP_PUSHBYTES_0 as isize,

    /// Push the next 32 bytes as an array onto the stack.
    #[display("OP_PUSHBYTES32")]
    PushBytes32 = OP_PUSHBYTES_32 as isize,

    /// Synonym for OP_RETURN.
    Reserved = OP_RESERVED as isize,

    /// Fail the script immediately.
    #[display("OP_RETURN")]
    Return = OP_RETURN as isize,

    /// Read the next byte as N; push the next N bytes as an array onto the
    /// stack.
    #[display("OP_PUSHDATA1")]
    PushData1 = OP_PUSHDATA1 as isize,
    /// Read the next 2 bytes as N; push the next N bytes as an array onto the
    /// stack.
    #[display("OP_PUSHDATA2")]
    PushData2 = OP_PUSHDATA2 as isize,
    /// Read the next 4 bytes as N; push the next N bytes as an array onto the
    /// stack.
    #[display("OP_PUSHDATA4")]
    PushData4 = OP_PUSHDATA4 as isize,

    /// Push the array `0x01` onto the stack.
    #[display("OP_PUSHNUM_1")]
    PushNum1 = OP_PUSHNUM_1 as isize,

    /// Duplicates the top stack item.
    #[display("OP_DUP")]
    Dup = OP_DUP as isize,

    /// Pushes 1 if the inputs are exactly equal, 0 otherwise.
    #[display("OP_EQUAL")]
    Equal = OP_EQUAL as isize,

    /// Returns success if the inputs are exactly equal, failure otherwise.
    #[display("OP_EQUALVERIFY")]
    EqualVerify = OP_EQUALVERIFY as isize,

    /// Pop the top stack item and push its RIPEMD160 hash.
    #[display("OP_RIPEMD160")]
    Ripemd160 = OP_RIPEMD160 as isize,

    /// Pop the top stack item and push its SHA1 hash.
    #[display("OP_SHA1")]
    Sha1 = OP_SHA1 as isize,

    /// Pop the top stack item and push its SHA256 hash.
    #[display("OP_SHA256")]
    Sha256 = OP_SHA256 as isize,

    /// Pop the top stack item and push its RIPEMD160(SHA256) hash.
    #[display("OP_HASH160")]
    Hash160 = OP_HASH160 as isize,

    /// Pop the top stack item and push its SHA256(SHA256) hash.
    #[display("OP_HASH256")]
    Hash256 = OP_HASH256 as isize,

    /// <https://en.bitcoin.it/wiki/OP_CHECKSIG> pushing 1/0 for success/failure.
    #[display("OP_CHECKSIG")]
    CheckSig = OP_CHECKSIG as isize,

    /// <https://en.bitcoin.it/wiki/OP_CHECKSIG> returning success/failure.
    #[display("OP_CHECKSIGVERIFY")]
    CheckSigVerify = OP_CHECKSIGVERIFY as isize,
}

/// A byte did not match any opcode this crate names in [`OpCode`]. This does
/// not mean the byte is invalid script: most opcodes dispatch directly off
/// the raw byte and never go through this enum.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display, Error)]
#[display("byte {0:#04x} has no named OpCode variant in this crate")]
pub struct InvalidOpcode(pub u8);

impl TryFrom<u8> for OpCode {
    type Error = InvalidOpcode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            OP_PUSHBYTES_0 => OpCode::PushBytes0,
            OP_PUSHBYTES_32 => OpCode::PushBytes32,
            OP_RESERVED => OpCode::Reserved,
            OP_RETURN => OpCode::Return,
            OP_PUSHDATA1 => OpCode::PushData1,
            OP_PUSHDATA2 => OpCode::PushData2,
            OP_PUSHDATA4 => OpCode::PushData4,
            OP_PUSHNUM_1 => OpCode::PushNum1,
            OP_DUP => OpCode::Dup,
            OP_EQUAL => OpCode::Equal,
            OP_EQUALVERIFY => OpCode::EqualVerify,
            OP_RIPEMD160 => OpCode::Ripemd160,
            OP_SHA1 => OpCode::Sha1,
            OP_SHA256 => OpCode::Sha256,
            OP_HASH160 => OpCode::Hash160,
            OP_HASH256 => OpCode::Hash256,
            OP_CHECKSIG => OpCode::CheckSig,
            OP_CHECKSIGVERIFY => OpCode::CheckSigVerify,
            _ => return Err(InvalidOpcode(value)),
        })
    }
}

#[derive(Wrapper, WrapperMut, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, From, Default)]
#[wrapper(Deref, AsSlice, Hex)]
#[wrapper_mut(DerefMut, AsSliceMut)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", transparent)
)]
pub struct SigScript(ScriptBytes);

impl TryFrom<Vec<u8>> for SigScript {
    type Error = confinement::Error;
    fn try_from(script_bytes: Vec<u8>) -> Result<Self, Self::Error> {
        ScriptBytes::try_from(script_bytes).map(Self)
    }
}

impl SigScript {
    #[inline]
    pub fn empty() -> Self { SigScript::default() }

    #[inline]
    pub fn new() -> Self { Self::default() }

    #[inline]
    pub fn from_script_bytes(bytes: ScriptBytes) -> Self { Self(bytes) }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self(ScriptBytes::from(Confined::with_capacity(capacity)))
    }

    /// Constructs script object assuming the script length is less than 4GB.
    /// Panics otherwise.
    #[inline]
    pub fn from_unsafe(script_bytes: Vec<u8>) -> Self {
        Self(ScriptBytes::from_unsafe(script_bytes))
    }

    #[inline]
    pub fn as_script_bytes(&self) -> &ScriptBytes { &self.0 }

    /// A `scriptSig` consumed by a P2SH output ends with a single push of
    /// the redeem script; this returns that trailing pushed item.
    pub fn last_pushdata(&self) -> Option<Vec<u8>> {
        let mut last = None;
        let mut pos = 0;
        let bytes = self.0.as_slice();
        while pos < bytes.len() {
            let (item, next) = read_push(bytes, pos)?;
            last = item;
            pos = next;
        }
        last
    }

    /// Whether every opcode in this script is a data push (BIP62 rule 2,
    /// enforced on `scriptSig` by the `PUSH_ONLY` policy flag).
    #[inline]
    pub fn is_push_only(&self) -> bool { self.0.is_push_only() }
}

#[derive(Wrapper, WrapperMut, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, From, Default)]
#[wrapper(Deref, AsSlice, Hex)]
#[wrapper_mut(DerefMut, AsSliceMut)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", transparent)
)]
pub struct ScriptPubkey(ScriptBytes);

impl TryFrom<Vec<u8>> for ScriptPubkey {
    type Error = confinement::Error;
    fn try_from(script_bytes: Vec<u8>) -> Result<Self, Self::Error> {
        ScriptBytes::try_from(script_bytes).map(Self)
    }
}

impl ScriptPubkey {
    #[inline]
    pub fn empty() -> Self { Self::default() }

    #[inline]
    pub fn new() -> Self { Self::default() }

    #[inline]
    pub fn from_script_bytes(bytes: ScriptBytes) -> Self { Self(bytes) }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self(ScriptBytes::from(Confined::with_capacity(capacity)))
    }

    /// Constructs script object assuming the script length is less than 4GB.
    /// Panics otherwise.
    #[inline]
    pub fn from_unsafe(script_bytes: Vec<u8>) -> Self {
        Self(ScriptBytes::from_unsafe(script_bytes))
    }

    pub fn p2pkh(hash: impl Into<[u8; 20]>) -> Self {
        let mut script = Self::with_capacity(25);
        script.push_opcode(OpCode::Dup);
        script.push_opcode(OpCode::Hash160);
        script.push_slice(&hash.into());
        script.push_opcode(OpCode::EqualVerify);
        script.push_opcode(OpCode::CheckSig);
        script
    }

    pub fn p2sh(hash: impl Into<[u8; 20]>) -> Self {
        let mut script = Self::with_capacity(23);
        script.push_opcode(OpCode::Hash160);
        script.push_slice(&hash.into());
        script.push_opcode(OpCode::Equal);
        script
    }

    pub fn op_return(data: &[u8]) -> Self {
        let mut script = Self::with_capacity(ScriptBytes::len_for_slice(data.len()) + 1);
        script.push_opcode(OpCode::Return);
        script.push_slice(data);
        script
    }

    /// Checks whether a script pubkey is a P2PKH output.
    #[inline]
    pub fn is_p2pkh(&self) -> bool {
        self.0.len() == 25 &&
            self.0[0] == OP_DUP &&
            self.0[1] == OP_HASH160 &&
            self.0[2] == OP_PUSHBYTES_20 &&
            self.0[23] == OP_EQUALVERIFY &&
            self.0[24] == OP_CHECKSIG
    }

    /// Checks whether a script pubkey matches the P2SH template
    /// (`OP_HASH160 <20 bytes> OP_EQUAL`). A match here means the redeem
    /// script carried in the matching input's `scriptSig` is itself
    /// evaluated as a second program, per BIP16.
    #[inline]
    pub fn is_p2sh(&self) -> bool {
        self.0.len() == 23 &&
            self.0[0] == OP_HASH160 &&
            self.0[1] == OP_PUSHBYTES_20 &&
            self.0[22] == OP_EQUAL
    }

    #[inline]
    pub fn is_op_return(&self) -> bool { self.0.len() > 0 && self.0[0] == OP_RETURN }

    /// Adds a single opcode to the script.
    #[inline]
    pub fn push_opcode(&mut self, op_code: OpCode) { self.0.push(op_code as u8) }

    #[inline]
    pub fn as_script_bytes(&self) -> &ScriptBytes { &self.0 }
}

#[derive(Wrapper, WrapperMut, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, From, Default)]
#[wrapper(Deref, AsSlice, Hex)]
#[wrapper_mut(DerefMut, AsSliceMut)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", transparent)
)]
pub struct RedeemScript(ScriptBytes);

impl TryFrom<Vec<u8>> for RedeemScript {
    type Error = confinement::Error;
    fn try_from(script_bytes: Vec<u8>) -> Result<Self, Self::Error> {
        ScriptBytes::try_from(script_bytes).map(Self)
    }
}

impl RedeemScript {
    #[inline]
    pub fn new() -> Self { Self::default() }

    #[inline]
    pub fn from_script_bytes(bytes: ScriptBytes) -> Self { Self(bytes) }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self(ScriptBytes::from(Confined::with_capacity(capacity)))
    }

    /// Constructs script object assuming the script length is less than 4GB.
    /// Panics otherwise.
    #[inline]
    pub fn from_unsafe(script_bytes: Vec<u8>) -> Self {
        Self(ScriptBytes::from_unsafe(script_bytes))
    }

    /// Adds a single opcode to the script.
    #[inline]
    pub fn push_opcode(&mut self, op_code: OpCode) { self.0.push(op_code as u8); }

    #[inline]
    pub fn as_script_bytes(&self) -> &ScriptBytes { &self.0 }

    /// A redeem script is evaluated as a `ScriptPubkey` once extracted from
    /// the spending `scriptSig` (BIP16), so P2SH recursion ("a redeem script
    /// that is itself a P2SH template") is detected the same way.
    #[inline]
    pub fn is_p2sh(&self) -> bool { ScriptPubkey::from(self.0.clone()).is_p2sh() }
}

#[derive(Wrapper, WrapperMut, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Default, Debug, From)]
#[wrapper(Deref, AsSlice, Hex)]
#[wrapper_mut(DerefMut, AsSliceMut)]
pub struct ScriptBytes(VarIntArray<u8>);

impl TryFrom<Vec<u8>> for ScriptBytes {
    type Error = confinement::Error;
    fn try_from(script_bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Confined::try_from(script_bytes).map(Self)
    }
}

impl ScriptBytes {
    /// Constructs script object assuming the script length is less than 4GB.
    /// Panics otherwise.
    #[inline]
    pub fn from_unsafe(script_bytes: Vec<u8>) -> Self {
        Self(Confined::try_from(script_bytes).expect("script exceeding 4GB"))
    }

    /// Adds instructions to push some arbitrary data onto the stack.
    ///
    /// ## Panics
    ///
    /// The method panics if `data` length is greater or equal to
    /// 0x100000000.
    pub fn push_slice(&mut self, data: &[u8]) {
        // Start with a PUSH opcode
        match data.len() as u64 {
            n if n < OP_PUSHDATA1 as u64 => {
                self.push(n as u8);
            }
            n if n < 0x100 => {
                self.push(OP_PUSHDATA1);
                self.push(n as u8);
            }
            n if n < 0x10000 => {
                self.push(OP_PUSHDATA2);
                self.push((n % 0x100) as u8);
                self.push((n / 0x100) as u8);
            }
            n if n < 0x100000000 => {
                self.push(OP_PUSHDATA4);
                self.push((n % 0x100) as u8);
                self.push(((n / 0x100) % 0x100) as u8);
                self.push(((n / 0x10000) % 0x100) as u8);
                self.push((n / 0x1000000) as u8);
            }
            _ => panic!("tried to put a 4bn+ sized object into a script!"),
        }
        // Then push the raw bytes
        self.extend(data);
    }

    #[inline]
    pub(crate) fn push(&mut self, data: u8) { self.0.push(data).expect("script exceeds 4GB") }

    #[inline]
    pub(crate) fn extend(&mut self, data: &[u8]) {
        self.0
            .extend(data.iter().copied())
            .expect("script exceeds 4GB")
    }

    /// Computes the sum of `len` and the lenght of an appropriate push
    /// opcode.
    pub fn len_for_slice(len: usize) -> usize {
        len + match len {
            0..=0x4b => 1,
            0x4c..=0xff => 2,
            0x100..=0xffff => 3,
            // we don't care about oversized, the other fn will panic anyway
            _ => 5,
        }
    }

    pub fn len_var_int(&self) -> VarInt { VarInt(self.len() as u64) }

    pub fn into_vec(self) -> Vec<u8> { self.0.into_inner() }

    pub(crate) fn as_var_int_array(&self) -> &VarIntArray<u8> { &self.0 }

    /// Whether every instruction in the script is a data push (`OP_0`
    /// through `OP_PUSHDATA4`, or a small-int push `OP_1`..`OP_16`/
    /// `OP_1NEGATE`). Used to enforce the `PUSH_ONLY` policy flag on
    /// `scriptSig`.
    pub fn is_push_only(&self) -> bool {
        let bytes = self.0.as_slice();
        let mut pos = 0;
        while pos < bytes.len() {
            let op = bytes[pos];
            match read_push(bytes, pos) {
                Some((_, next)) => pos = next,
                None if op >= OP_PUSHNUM_1 && op <= OP_PUSHNUM_16 || op == OP_PUSHNUM_NEG1 => {
                    pos += 1
                }
                None => return false,
            }
        }
        true
    }

    /// Removes every occurrence of `pattern` that appears as a complete push
    /// instruction's encoding (opcode plus any length prefix plus the pushed
    /// bytes), returning the result as a fresh byte vector. Matches are
    /// aligned to parsed push boundaries, never to an arbitrary byte offset,
    /// so a push whose encoded bytes merely contain `pattern` as a substring
    /// is left untouched. Used by legacy (pre-FORKID) signature hashing to
    /// strip the signature's own push out of the subscript before hashing.
    pub fn find_and_delete(&self, pattern: &[u8]) -> ScriptBytes {
        let bytes = self.0.as_slice();
        let mut out = Vec::with_capacity(bytes.len());
        let mut pos = 0;
        while pos < bytes.len() {
            match read_push(bytes, pos) {
                Some((_, next)) if bytes[pos..next] == *pattern => pos = next,
                Some((_, next)) => {
                    out.extend_from_slice(&bytes[pos..next]);
                    pos = next;
                }
                None => {
                    out.push(bytes[pos]);
                    pos += 1;
                }
            }
        }
        ScriptBytes::from_unsafe(out)
    }
}

/// Reads one push instruction starting at `pos`. Returns the pushed item
/// (`None` for a push of zero, i.e. `OP_0`) and the position right after it.
/// Returns `None` if `pos` is not the start of a push instruction, or the
/// push's declared length runs past the end of the script.
fn read_push(bytes: &[u8], pos: usize) -> Option<(Option<Vec<u8>>, usize)> {
    let op = *bytes.get(pos)?;
    let (len, header) = match op {
        OP_PUSHBYTES_0..=OP_PUSHBYTES_75 => (op as usize, 1),
        OP_PUSHDATA1 => (*bytes.get(pos + 1)? as usize, 2),
        OP_PUSHDATA2 => {
            let lo = *bytes.get(pos + 1)? as usize;
            let hi = *bytes.get(pos + 2)? as usize;
            (lo | (hi << 8), 3)
        }
        OP_PUSHDATA4 => {
            let b = [
                *bytes.get(pos + 1)?,
                *bytes.get(pos + 2)?,
                *bytes.get(pos + 3)?,
                *bytes.get(pos + 4)?,
            ];
            (u32::from_le_bytes(b) as usize, 5)
        }
        _ => return None,
    };
    let start = pos + header;
    let end = start.checked_add(len)?;
    if end > bytes.len() {
        return None;
    }
    let item = if len == 0 { None } else { Some(bytes[start..end].to_vec()) };
    Some((item, end))
}

#[cfg(feature = "serde")]
mod _serde {
    use amplify::hex::{FromHex, ToHex};
    use serde::{Deserialize, Serialize};
    use serde_crate::de::Error;
    use serde_crate::{Deserializer, Serializer};

    use super::*;

    impl Serialize for ScriptBytes {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where S: Serializer {
            if serializer.is_human_readable() {
                serializer.serialize_str(&self.to_hex())
            } else {
                serializer.serialize_bytes(self.as_slice())
            }
        }
    }

    impl<'de> Deserialize<'de> for ScriptBytes {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where D: Deserializer<'de> {
            if deserializer.is_human_readable() {
                String::deserialize(deserializer).and_then(|string| {
                    Self::from_hex(&string).map_err(|_| D::Error::custom("wrong hex data"))
                })
            } else {
                let bytes = Vec::<u8>::deserialize(deserializer)?;
                ScriptBytes::try_from(bytes)
                    .map_err(|_| D::Error::custom("invalid script length exceeding 4GB"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p2pkh_is_recognized() {
        let script = ScriptPubkey::p2pkh([7u8; 20]);
        assert!(script.is_p2pkh());
        assert!(!script.is_p2sh());
    }

    #[test]
    fn p2sh_is_recognized() {
        let script = ScriptPubkey::p2sh([9u8; 20]);
        assert!(script.is_p2sh());
        assert!(!script.is_p2pkh());
    }

    #[test]
    fn op_return_is_recognized() {
        let script = ScriptPubkey::op_return(b"hello");
        assert!(script.is_op_return());
    }

    #[test]
    fn push_only_detects_non_push() {
        let push_only = SigScript::from_unsafe(vec![0x01, 0xaa]);
        assert!(push_only.is_push_only());

        let with_op = SigScript::from_unsafe(vec![OP_DUP]);
        assert!(!with_op.is_push_only());
    }

    #[test]
    fn find_and_delete_strips_exact_match() {
        let script = ScriptBytes::from_unsafe(vec![0x01, 0xaa, OP_CHECKSIG, 0x01, 0xaa]);
        let stripped = script.find_and_delete(&[0x01, 0xaa]);
        assert_eq!(stripped.into_vec(), vec![OP_CHECKSIG]);
    }

    #[test]
    fn find_and_delete_ignores_unaligned_substring() {
        // The pattern `0xaa, OP_CHECKSIG` appears as a byte substring here,
        // but it straddles a push boundary rather than being a push's own
        // encoding, so it must survive untouched.
        let script = ScriptBytes::from_unsafe(vec![0x01, 0xaa, OP_CHECKSIG]);
        let stripped = script.find_and_delete(&[0xaa, OP_CHECKSIG]);
        assert_eq!(stripped.into_vec(), vec![0x01, 0xaa, OP_CHECKSIG]);
    }

    #[test]
    fn invalid_opcode_reports_byte() {
        let err = OpCode::try_from(OP_NOP).unwrap_err();
        assert_eq!(err.0, OP_NOP);
    }
}
