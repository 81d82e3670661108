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

// Version 1.0:
// TODO: Do a no-std feature

// Coding conventions
#![deny(
    non_upper_case_globals,
    non_camel_case_types,
    non_snake_case,
    unused_mut,
    unused_imports,
    dead_code,
    // TODO: Uncomment missing_docs
)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

#[macro_use]
extern crate amplify;
#[cfg(feature = "serde")]
#[macro_use]
extern crate serde_crate as serde;

extern crate core;
/// Re-export of `secp256k1` crate.
pub extern crate secp256k1;

pub mod opcodes;
mod script;
mod tx;
mod hashtypes;
mod sigtypes;
mod util;
mod coding;

pub use coding::{
    ByteStr, ConsensusDataError, ConsensusDecode, ConsensusDecodeError, ConsensusEncode, LenVarInt,
    VarInt, VarIntArray,
};
pub use hashtypes::{hash_hash160, hash_ripemd160, hash_sha1, hash_sha256, hash_sha256d, PubkeyHash, ScriptHash};
pub use script::{InvalidOpcode, OpCode, RedeemScript, ScriptBytes, ScriptPubkey, SigScript};
pub use sigtypes::{LegacySig, SigError, SighashFlag, SighashType};
pub use tx::{
    LockTime, Outpoint, OutpointParseError, Sats, SeqNo, Tx, TxIn, TxOut, TxParseError, TxVer,
    Txid, Vout, LOCKTIME_THRESHOLD, SEQUENCE_FINAL, SEQUENCE_LOCKTIME_DISABLE_FLAG,
    SEQUENCE_LOCKTIME_MASK, SEQUENCE_LOCKTIME_TYPE_FLAG,
};
pub use util::NonStandardValue;

/// The transaction-context surface an interpreter needs to verify a
/// signature and a locktime-checking opcode, expressed as a trait so a
/// caller can supply a data model other than [`Tx`] (e.g. one already
/// parsed by an external indexer) without this crate's concrete type
/// becoming part of the interpreter's dependency surface.
pub trait SighashContext {
    /// The transaction's nVersion field.
    fn version(&self) -> i32;
    /// The transaction's nLockTime field.
    fn locktime(&self) -> u32;
    /// The nSequence of the input at `index`.
    fn input_sequence(&self, index: usize) -> u32;
    /// The signature hash preimage digest for the input at `index`, signing
    /// `script_code` (the subscript, after `OP_CODESEPARATOR`/signature
    /// removal) at the given input `value` under the given raw `sighash`
    /// type byte.
    fn signature_hash(&self, index: usize, value: i64, script_code: &[u8], sighash: u8) -> [u8; 32];
}

pub const LIB_NAME_BITCOIN: &str = "Bitcoin";
