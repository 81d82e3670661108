// Bitcoin script interpreter core library.
//
// SPDX-License-Identifier: Apache-2.0
//
// Written in 2024-2025 by
//     Dr Maxim Orlovsky <orlovsky@lnp-bp.org>
//
// Copyright (C) 2024-2025 LNP/BP Standards Association. All rights reserved.
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

//! Deterministic, stack-based, bounded-resource Bitcoin script interpreter.
//!
//! [`verify_script`] is the entry point a caller reaches for: it runs
//! `scriptSig`, `scriptPubkey`, and, for P2SH outputs, the embedded redeem
//! script, in the order consensus requires, and reports whether the spend is
//! authorized. [`evaluate_script`] runs a single script against an existing
//! [`InterpreterState`] and is exposed for callers building their own
//! composition (alternative redeem-script detection, fuzzing single
//! scripts, etc).

#![deny(non_upper_case_globals, non_camel_case_types, non_snake_case, unused_mut, unused_imports)]

#[macro_use]
extern crate amplify;

mod error;
mod flags;
mod iterator;
mod numbers;
mod ops;
mod policy;
mod sig;
mod stack;
mod state;

pub use error::InterpreterError;
pub use flags::InterpreterFlags;
pub use iterator::OpIterator;
pub use policy::{InterpreterLimits, InterpreterPolicy};
pub use stack::LimitedStack;
pub use state::{ConditionFrame, InterpreterState};

use svscript_consensus::{RedeemScript, ScriptPubkey, SigScript};

/// Runs `script` against `state`, opcode by opcode, until the script ends or
/// a terminal error or `OP_RETURN` stops it short.
///
/// Resets the per-script transient state (condition stack, op count,
/// `finished`) before running, per §"Lifecycles": the main and alt stacks
/// persist from whatever a previous call to this function left behind, so a
/// P2SH redeem script can consume what `scriptSig` pushed.
pub fn evaluate_script(state: &mut InterpreterState, script: &[u8]) -> Result<(), InterpreterError> {
    if script.len() as u64 > state.limits.script_size {
        return Err(InterpreterError::ScriptTooLarge);
    }
    state.reset_for_next_script();

    let mut iter = OpIterator::new(script);
    while let Some(step) = iter.next() {
        let (op, item) = step?;
        ops::dispatch(state, &mut iter, op, item)?;
        if state.finished {
            break;
        }
    }

    if !state.finished && !state.conditions_balanced() {
        return Err(InterpreterError::UnbalancedConditional);
    }
    Ok(())
}

/// Verifies that `script_sig` authorizes spending an output locked by
/// `script_pubkey`, running scriptSig then scriptPubkey (and, for a P2SH
/// output under the `P2SH` flag, the embedded redeem script) against one
/// shared [`InterpreterState`].
///
/// Returns `Ok(true)`/`Ok(false)` for a clean pass/fail of the script logic
/// itself; returns `Err` for a resource-limit or malformed-input violation
/// that aborts evaluation before a verdict can be reached.
pub fn verify_script(
    state: &mut InterpreterState,
    script_sig: &SigScript,
    script_pubkey: &ScriptPubkey,
) -> Result<bool, InterpreterError> {
    let sig_bytes = script_sig.as_script_bytes().clone().into_vec();

    if state.flags.contains(InterpreterFlags::PUSH_ONLY) && !script_sig.is_push_only() {
        return Err(InterpreterError::PushOnlyError);
    }

    evaluate_script(state, &sig_bytes)?;

    let is_p2sh = state.flags.contains(InterpreterFlags::P2SH) && script_pubkey.is_p2sh();
    let redeem_script = if is_p2sh {
        script_sig.last_pushdata().map(|bytes| RedeemScript::from_unsafe(bytes))
    } else {
        None
    };

    let pubkey_bytes = script_pubkey.as_script_bytes().clone().into_vec();
    evaluate_script(state, &pubkey_bytes)?;
    if !truthy_result(state)? {
        return Ok(false);
    }

    // The push-only requirement on a P2SH scriptSig is only enforced once
    // the pubkey script (the hash check) has actually passed: a scriptSig
    // that legitimately fails the hash comparison returns `Ok(false)` here,
    // never this error, regardless of its own push-only status.
    if is_p2sh && !script_sig.is_push_only() {
        return Err(InterpreterError::PushOnlyError);
    }

    if let Some(redeem) = redeem_script {
        let snapshot = state.main_stack.snapshot();
        // The redeem script replaces the top stack item (itself) with its
        // own evaluation; everything scriptSig pushed below it remains.
        let mut underlying = snapshot;
        underlying.pop();
        state.main_stack.restore(underlying);

        let redeem_bytes = redeem.as_script_bytes().clone().into_vec();
        evaluate_script(state, &redeem_bytes)?;
        if !truthy_result(state)? {
            return Ok(false);
        }
    }

    if state.flags.contains(InterpreterFlags::CLEANSTACK) && state.main_stack.len() != 1 {
        return Err(InterpreterError::CleanStackError);
    }

    Ok(true)
}

fn truthy_result(state: &InterpreterState) -> Result<bool, InterpreterError> {
    if state.main_stack.is_empty() {
        return Ok(false);
    }
    state.main_stack.truthiness_of_top()
}
