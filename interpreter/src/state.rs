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

use svscript_consensus::opcodes::OP_RETURN;
use svscript_consensus::SighashContext;

use crate::flags::InterpreterFlags;
use crate::policy::InterpreterLimits;
use crate::stack::LimitedStack;
use crate::InterpreterError;

/// One entry of the condition stack, pushed by `OP_IF`/`OP_NOTIF` and popped
/// by `OP_ENDIF`. `execute` already folds in the branch's own condition and
/// is combined by AND across the whole stack (§4.4/§9: precomputed once per
/// step rather than scanned per-opcode).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ConditionFrame {
    pub execute: bool,
    pub seen_else: bool,
}

/// The per-evaluation context: stacks, condition stack, op budget, and the
/// transaction data signature/locktime opcodes need. One `InterpreterState`
/// is constructed per `verify_script` call and reused, unreset, across the
/// scriptSig/scriptPubkey/P2SH-redeem sequence for `main_stack`/`alt_stack`;
/// `evaluate_script` resets the condition stack, op count and `finished`
/// flag at the start of each script it runs.
pub struct InterpreterState<'a> {
    pub main_stack: LimitedStack,
    pub alt_stack: LimitedStack,
    pub flags: InterpreterFlags,
    pub limits: InterpreterLimits,
    pub is_utxo_after_genesis: bool,

    tx: Option<&'a dyn SighashContext>,
    input_index: usize,
    value: i64,

    conditions: Vec<ConditionFrame>,
    op_count: u64,
    pub finished: bool,
    pub non_top_level_return: bool,
}

impl<'a> InterpreterState<'a> {
    pub fn new(
        limits: InterpreterLimits,
        flags: InterpreterFlags,
        is_utxo_after_genesis: bool,
        tx: Option<&'a dyn SighashContext>,
        input_index: usize,
        value: i64,
    ) -> Self {
        let flags = flags.sanitize(is_utxo_after_genesis);
        let main_stack = LimitedStack::new(limits.stack_memory_usage as usize);
        let alt_stack = main_stack.make_child();
        InterpreterState {
            main_stack,
            alt_stack,
            flags,
            limits,
            is_utxo_after_genesis,
            tx,
            input_index,
            value,
            conditions: Vec::new(),
            op_count: 0,
            finished: false,
            non_top_level_return: false,
        }
    }

    /// Resets the per-script transient state (condition stack, op count,
    /// finished/return flags) ahead of evaluating the next script, while
    /// keeping `main_stack`/`alt_stack` so a P2SH redeem script can see
    /// what scriptSig and scriptPubkey left behind.
    pub fn reset_for_next_script(&mut self) {
        self.conditions.clear();
        self.op_count = 0;
        self.finished = false;
        self.non_top_level_return = false;
    }

    /// Whether the opcode `op` should take effect right now: every open
    /// condition frame must be on its live branch, and a non-top-level
    /// `OP_RETURN` seen earlier in this script suppresses every further
    /// opcode's effects except another `OP_RETURN` itself (so the script
    /// keeps running far enough for a later unbalanced `OP_IF` to still be
    /// caught, without actually doing anything else).
    pub fn conditions_execute(&self, op: u8) -> bool {
        self.conditions.iter().all(|f| f.execute) && (!self.non_top_level_return || op == OP_RETURN)
    }

    pub fn conditions_balanced(&self) -> bool { self.conditions.is_empty() }

    pub fn push_condition(&mut self, execute: bool) {
        self.conditions.push(ConditionFrame { execute, seen_else: false });
    }

    pub fn flip_top_condition(&mut self) -> Result<(), InterpreterError> {
        let top = self.conditions.last_mut().ok_or(InterpreterError::UnbalancedConditional)?;
        if top.seen_else && self.is_utxo_after_genesis {
            return Err(InterpreterError::UnbalancedConditional);
        }
        top.execute = !top.execute;
        top.seen_else = true;
        Ok(())
    }

    pub fn pop_condition(&mut self) -> Result<(), InterpreterError> {
        self.conditions.pop().map(|_| ()).ok_or(InterpreterError::UnbalancedConditional)
    }

    pub fn op_count(&self) -> u64 { self.op_count }

    /// Bumps the non-pushdata op counter and enforces `ops_per_script`.
    /// `OP_RESERVED` is a push-adjacent opcode and never reaches this call
    /// (see the design note on `OP_RESERVED` not counting toward op_count).
    pub fn bump_op_count(&mut self) -> Result<(), InterpreterError> {
        self.op_count += 1;
        if self.op_count > self.limits.ops_per_script {
            return Err(InterpreterError::TooManyOps);
        }
        Ok(())
    }

    /// Checks the pre-genesis combined main+alt item-count cap. Post-genesis
    /// the memory meter inside `LimitedStack` already enforces the
    /// equivalent limit on every push.
    pub fn check_combined_stack_size(&self) -> Result<(), InterpreterError> {
        if let Some(max) = self.limits.combined_stack_items {
            if (self.main_stack.len() + self.alt_stack.len()) as u64 > max {
                return Err(InterpreterError::StackSizeTooLarge);
            }
        }
        Ok(())
    }

    pub fn tx(&self) -> Option<&'a dyn SighashContext> { self.tx }

    pub fn input_index(&self) -> usize { self.input_index }

    pub fn value(&self) -> i64 { self.value }
}
