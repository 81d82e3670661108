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

//! A deterministic, stack-based, bounded-resource script interpreter: the
//! `svscript-consensus` crate supplies the opcode table, script byte
//! containers, transaction data model and sighash construction;
//! `svscript-interpreter` supplies the number codec, limited stack, script
//! iterator and opcode evaluation loop.
//!
//! This crate re-exports both so a caller depends on a single name.

#![deny(
    non_upper_case_globals,
    non_camel_case_types,
    non_snake_case,
    unused_mut,
    unused_imports,
    dead_code,
)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub extern crate svscript_consensus as consensus;
pub extern crate svscript_interpreter as interpreter;

pub use consensus::{
    LegacySig, LockTime, OpCode, Outpoint, RedeemScript, Sats, ScriptBytes, ScriptPubkey, SeqNo,
    SigError, SigScript, SighashContext, SighashFlag, SighashType, Tx, TxIn, TxOut, Txid, TxVer,
    Vout,
};
pub use interpreter::{
    evaluate_script, verify_script, InterpreterError, InterpreterFlags, InterpreterLimits,
    InterpreterPolicy, InterpreterState,
};
