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

//! One opcode dispatch table, grouped into family modules purely for
//! readability; control flow, pushdata and op-count bookkeeping live here
//! since every other family depends on them.

mod bitwise;
mod crypto;
mod locktime;
mod numeric;
mod splice;
mod stack_ops;

use svscript_consensus::opcodes::*;

use crate::flags::InterpreterFlags;
use crate::iterator::OpIterator;
use crate::numbers::{cast_to_bool, minimal_push_opcode};
use crate::state::InterpreterState;
use crate::InterpreterError;

fn is_push_opcode(op: u8) -> bool {
    matches!(op, OP_PUSHBYTES_0..=OP_PUSHBYTES_75)
        || matches!(op, OP_PUSHDATA1 | OP_PUSHDATA2 | OP_PUSHDATA4)
        || op == OP_PUSHNUM_NEG1
        || matches!(op, OP_PUSHNUM_1..=OP_PUSHNUM_16)
}

fn dispatch_push(state: &mut InterpreterState, op: u8, item: Option<Vec<u8>>) -> Result<(), InterpreterError> {
    if !state.conditions_execute(op) {
        return Ok(());
    }
    let data = match op {
        OP_PUSHNUM_NEG1 => vec![0x81],
        OP_PUSHNUM_1..=OP_PUSHNUM_16 => vec![op - OP_PUSHNUM_1 + 1],
        _ => item.unwrap_or_default(),
    };
    if data.len() as u64 > state.limits.item_size {
        return Err(InterpreterError::InvalidPushSize);
    }
    if state.flags.contains(InterpreterFlags::MINIMAL_PUSH) && minimal_push_opcode(&data) != op {
        return Err(InterpreterError::MinimalEncodingError);
    }
    state.main_stack.push(data)?;
    state.check_combined_stack_size()
}

fn control_if(state: &mut InterpreterState, op: u8) -> Result<(), InterpreterError> {
    if !state.conditions_execute(op) {
        // A nested IF inside a dead branch still needs a frame pushed so the
        // matching ENDIF balances, but it never itself executes.
        state.push_condition(false);
        return Ok(());
    }
    let top = state.main_stack.pop()?;
    if state.flags.contains(InterpreterFlags::MINIMAL_IF) && !top.is_empty() && top != [1] {
        return Err(InterpreterError::MinimalIfError);
    }
    let truthy = cast_to_bool(&top);
    state.push_condition(if op == OP_IF { truthy } else { !truthy });
    Ok(())
}

fn control_return(state: &mut InterpreterState) -> Result<(), InterpreterError> {
    if !state.is_utxo_after_genesis {
        return Err(InterpreterError::OpReturnError);
    }
    // A top-level OP_RETURN ends the script cleanly. One inside a still-open
    // OP_IF/OP_NOTIF must not: the script keeps running (with every further
    // opcode's effects suppressed, bar another OP_RETURN) so a later
    // unbalanced conditional is still caught instead of being masked by an
    // early exit.
    if state.conditions_balanced() {
        state.finished = true;
    } else {
        state.non_top_level_return = true;
    }
    Ok(())
}

/// Executes one already-parsed `(opcode, pushed_item)` pair against `state`.
pub fn dispatch(
    state: &mut InterpreterState,
    iter: &mut OpIterator,
    op: u8,
    item: Option<Vec<u8>>,
) -> Result<(), InterpreterError> {
    if is_push_opcode(op) {
        return dispatch_push(state, op, item);
    }

    // Control-flow opcodes manage the condition stack themselves and so run
    // even inside a currently-false branch.
    match op {
        OP_IF | OP_NOTIF => return control_if(state, op),
        OP_ELSE => return state.flip_top_condition(),
        OP_ENDIF => return state.pop_condition(),
        OP_VERIF | OP_VERNOTIF => return Err(InterpreterError::InvalidOpcode),
        _ => {}
    }

    if !state.conditions_execute(op) {
        return Ok(());
    }

    // OP_RESERVED does not count toward the non-push op budget: it always
    // fails before any budget effect would matter, but the reference engine
    // this is aligned with rejects it prior to the counter bump.
    if op == OP_RESERVED {
        return Err(InterpreterError::InvalidOpcode);
    }
    state.bump_op_count()?;

    match op {
        OP_NOP => Ok(()),
        OP_VERIFY => {
            let top = state.main_stack.pop()?;
            if !cast_to_bool(&top) {
                return Err(InterpreterError::VerifyFailed);
            }
            Ok(())
        }
        OP_RETURN => control_return(state),
        OP_VER | OP_RESERVED1 | OP_RESERVED2 => Err(InterpreterError::InvalidOpcode),

        OP_TOALTSTACK | OP_FROMALTSTACK | OP_2DROP | OP_2DUP | OP_3DUP | OP_2OVER | OP_2ROT
        | OP_2SWAP | OP_IFDUP | OP_DEPTH | OP_DROP | OP_DUP | OP_NIP | OP_OVER | OP_PICK
        | OP_ROLL | OP_ROT | OP_SWAP | OP_TUCK => stack_ops::dispatch(state, op),

        OP_CAT | OP_SPLIT | OP_NUM2BIN | OP_BIN2NUM | OP_SIZE => splice::dispatch(state, op),

        OP_INVERT | OP_AND | OP_OR | OP_XOR | OP_EQUAL | OP_EQUALVERIFY | OP_LSHIFT | OP_RSHIFT => {
            bitwise::dispatch(state, op)
        }

        OP_1ADD | OP_1SUB | OP_2MUL | OP_2DIV | OP_NEGATE | OP_ABS | OP_NOT | OP_0NOTEQUAL
        | OP_ADD | OP_SUB | OP_MUL | OP_DIV | OP_MOD | OP_BOOLAND | OP_BOOLOR | OP_NUMEQUAL
        | OP_NUMEQUALVERIFY | OP_NUMNOTEQUAL | OP_LESSTHAN | OP_GREATERTHAN
        | OP_LESSTHANOREQUAL | OP_GREATERTHANOREQUAL | OP_MIN | OP_MAX | OP_WITHIN => {
            numeric::dispatch(state, op)
        }

        OP_RIPEMD160 | OP_SHA1 | OP_SHA256 | OP_HASH160 | OP_HASH256 | OP_CODESEPARATOR
        | OP_CHECKSIG | OP_CHECKSIGVERIFY | OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
            crypto::dispatch(state, iter, op)
        }

        OP_NOP1 | OP_CHECKLOCKTIMEVERIFY | OP_CHECKSEQUENCEVERIFY | OP_NOP4 | OP_NOP5
        | OP_NOP6 | OP_NOP7 | OP_NOP8 | OP_NOP9 | OP_NOP10 => locktime::dispatch(state, op),

        _ => Err(InterpreterError::InvalidOpcode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> InterpreterState<'static> {
        InterpreterState::new(
            crate::policy::InterpreterLimits::resolve(&crate::policy::InterpreterPolicy::default(), true, false),
            InterpreterFlags::empty(),
            true,
            None,
            0,
            0,
        )
    }

    #[test]
    fn if_else_endif_selects_branch() {
        let mut s = state();
        let script = [];
        let mut iter = OpIterator::new(&script);
        s.main_stack.push(vec![1]).unwrap();
        dispatch(&mut s, &mut iter, OP_IF, None).unwrap();
        dispatch(&mut s, &mut iter, OP_DUP, None).unwrap_err();
        // No items left to dup; just confirm the branch is active.
        assert!(s.conditions_execute(OP_NOP));
        dispatch(&mut s, &mut iter, OP_ELSE, None).unwrap();
        assert!(!s.conditions_execute(OP_NOP));
        dispatch(&mut s, &mut iter, OP_ENDIF, None).unwrap();
        assert!(s.conditions_balanced());
    }

    #[test]
    fn dead_branch_skips_opcode_execution() {
        let mut s = state();
        let script = [];
        let mut iter = OpIterator::new(&script);
        s.main_stack.push(Vec::new()).unwrap();
        dispatch(&mut s, &mut iter, OP_IF, None).unwrap();
        assert!(!s.conditions_execute(OP_NOP));
        // OP_VERIFY would normally pop and fail on an empty stack; inside a
        // dead branch it must be a no-op instead.
        dispatch(&mut s, &mut iter, OP_VERIFY, None).unwrap();
    }

    #[test]
    fn op_return_pre_genesis_errors() {
        let mut s = InterpreterState::new(
            crate::policy::InterpreterLimits::resolve(&crate::policy::InterpreterPolicy::default(), false, true),
            InterpreterFlags::empty(),
            false,
            None,
            0,
            0,
        );
        let script = [];
        let mut iter = OpIterator::new(&script);
        assert_eq!(
            dispatch(&mut s, &mut iter, OP_RETURN, None).unwrap_err(),
            InterpreterError::OpReturnError
        );
    }

    #[test]
    fn op_return_post_genesis_finishes_cleanly() {
        let mut s = state();
        let script = [];
        let mut iter = OpIterator::new(&script);
        dispatch(&mut s, &mut iter, OP_RETURN, None).unwrap();
        assert!(s.finished);
    }

    #[test]
    fn minimal_push_violation_is_rejected() {
        let mut s = InterpreterState::new(
            crate::policy::InterpreterLimits::resolve(&crate::policy::InterpreterPolicy::default(), true, false),
            InterpreterFlags::MINIMAL_PUSH,
            true,
            None,
            0,
            0,
        );
        // OP_PUSHBYTES_2 claiming to push a single byte that fits OP_1: not minimal.
        let err = dispatch_push(&mut s, 0x02, Some(vec![1])).unwrap_err();
        assert_eq!(err, InterpreterError::MinimalEncodingError);
    }
}
