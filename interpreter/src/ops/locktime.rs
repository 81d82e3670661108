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

//! `OP_CHECKLOCKTIMEVERIFY`/`OP_CHECKSEQUENCEVERIFY` and the expansion NOPs
//! they replaced (`OP_NOP2`/`OP_NOP3`), plus the remaining reserved-for-
//! upgrade `OP_NOP1`/`OP_NOP4`-`OP_NOP10`.

use svscript_consensus::opcodes::*;
use svscript_consensus::{
    LockTime, SeqNo, SEQUENCE_LOCKTIME_DISABLE_FLAG, SEQUENCE_LOCKTIME_MASK,
    SEQUENCE_LOCKTIME_TYPE_FLAG,
};

use crate::flags::InterpreterFlags;
use crate::numbers::{to_number, ScriptNum};
use crate::state::InterpreterState;
use crate::InterpreterError;

fn upgradeable_nop(state: &InterpreterState) -> Result<(), InterpreterError> {
    if state.flags.contains(InterpreterFlags::REJECT_UPGRADEABLE_NOPS) {
        return Err(InterpreterError::UpgradeableNopError);
    }
    Ok(())
}

pub fn dispatch(state: &mut InterpreterState, op: u8) -> Result<(), InterpreterError> {
    match op {
        OP_CHECKLOCKTIMEVERIFY => check_locktime(state),
        OP_CHECKSEQUENCEVERIFY => check_sequence(state),
        OP_NOP1 | OP_NOP4 | OP_NOP5 | OP_NOP6 | OP_NOP7 | OP_NOP8 | OP_NOP9 | OP_NOP10 => {
            upgradeable_nop(state)
        }
        _ => unreachable!("caller only routes locktime/expansion-nop opcodes here"),
    }
}

fn check_locktime(state: &mut InterpreterState) -> Result<(), InterpreterError> {
    if !state.flags.contains(InterpreterFlags::CLTV) {
        return upgradeable_nop(state);
    }
    let raw = state.main_stack.get(-1)?.to_vec();
    let n = to_number(&raw, 5, state.flags.contains(InterpreterFlags::MINIMAL_PUSH))?;
    if n < ScriptNum::zero() {
        return Err(InterpreterError::LockTimeError);
    }
    let n = n.to_i64_saturating();
    if !(0..=u32::MAX as i64).contains(&n) {
        return Err(InterpreterError::LockTimeError);
    }
    let Some(tx) = state.tx() else { return Err(InterpreterError::LockTimeError) };
    let locktime = LockTime::from_consensus_u32(tx.locktime());
    let required = LockTime::from_consensus_u32(n as u32);
    if locktime.is_height_based() != required.is_height_based() {
        return Err(InterpreterError::LockTimeError);
    }
    if locktime.to_consensus_u32() < required.to_consensus_u32() {
        return Err(InterpreterError::LockTimeError);
    }
    if SeqNo::from_consensus_u32(tx.input_sequence(state.input_index())).is_final() {
        return Err(InterpreterError::LockTimeError);
    }
    Ok(())
}

fn check_sequence(state: &mut InterpreterState) -> Result<(), InterpreterError> {
    if !state.flags.contains(InterpreterFlags::CSV) {
        return upgradeable_nop(state);
    }
    let raw = state.main_stack.get(-1)?.to_vec();
    let n = to_number(&raw, 5, state.flags.contains(InterpreterFlags::MINIMAL_PUSH))?;
    if n < ScriptNum::zero() {
        return Err(InterpreterError::LockTimeError);
    }
    let n = n.to_i64_saturating();
    if !(0..=u32::MAX as i64).contains(&n) {
        return Err(InterpreterError::LockTimeError);
    }
    let required = n as u32;
    if required & SEQUENCE_LOCKTIME_DISABLE_FLAG != 0 {
        return Ok(());
    }
    let Some(tx) = state.tx() else { return Err(InterpreterError::LockTimeError) };
    if tx.version() < 2 {
        return Err(InterpreterError::LockTimeError);
    }
    let sequence = tx.input_sequence(state.input_index());
    if sequence & SEQUENCE_LOCKTIME_DISABLE_FLAG != 0 {
        return Err(InterpreterError::LockTimeError);
    }
    let same_unit = (sequence & SEQUENCE_LOCKTIME_TYPE_FLAG) == (required & SEQUENCE_LOCKTIME_TYPE_FLAG);
    if !same_unit {
        return Err(InterpreterError::LockTimeError);
    }
    if (sequence & SEQUENCE_LOCKTIME_MASK) < (required & SEQUENCE_LOCKTIME_MASK) {
        return Err(InterpreterError::LockTimeError);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cltv_without_flag_falls_back_to_upgradeable_nop() {
        let mut state = InterpreterState::new(
            crate::policy::InterpreterLimits::resolve(&crate::policy::InterpreterPolicy::default(), false, true),
            InterpreterFlags::empty(),
            false,
            None,
            0,
            0,
        );
        assert!(dispatch(&mut state, OP_CHECKLOCKTIMEVERIFY).is_ok());
    }

    #[test]
    fn cltv_with_reject_upgradeable_nops_errors() {
        let mut state = InterpreterState::new(
            crate::policy::InterpreterLimits::resolve(&crate::policy::InterpreterPolicy::default(), false, true),
            InterpreterFlags::REJECT_UPGRADEABLE_NOPS,
            false,
            None,
            0,
            0,
        );
        assert_eq!(
            dispatch(&mut state, OP_CHECKLOCKTIMEVERIFY).unwrap_err(),
            InterpreterError::UpgradeableNopError
        );
    }
}
