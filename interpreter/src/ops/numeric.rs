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

//! Arithmetic and comparison opcodes, operating on the sign-magnitude
//! integer encoding decoded by [`crate::numbers`].

use svscript_consensus::opcodes::*;

use crate::flags::InterpreterFlags;
use crate::numbers::{to_number, ScriptNum};
use crate::state::InterpreterState;
use crate::InterpreterError;

fn pop_number(state: &mut InterpreterState) -> Result<ScriptNum, InterpreterError> {
    let item = state.main_stack.pop()?;
    to_number(
        &item,
        state.limits.script_num_length as usize,
        state.flags.contains(InterpreterFlags::MINIMAL_PUSH),
    )
}

fn push_number(state: &mut InterpreterState, n: ScriptNum) -> Result<(), InterpreterError> {
    state.main_stack.push(n.to_item())
}

fn push_bool(state: &mut InterpreterState, b: bool) -> Result<(), InterpreterError> {
    state.main_stack.push(if b { vec![1] } else { Vec::new() })
}

pub fn dispatch(state: &mut InterpreterState, op: u8) -> Result<(), InterpreterError> {
    match op {
        OP_2MUL | OP_2DIV => Err(InterpreterError::DisabledOpcode),

        OP_1ADD => {
            let a = pop_number(state)?;
            push_number(state, a.add(&ScriptNum::from_i64(1)))
        }
        OP_1SUB => {
            let a = pop_number(state)?;
            push_number(state, a.sub(&ScriptNum::from_i64(1)))
        }
        OP_NEGATE => {
            let a = pop_number(state)?;
            push_number(state, a.negate())
        }
        OP_ABS => {
            let a = pop_number(state)?;
            push_number(state, a.abs())
        }
        OP_NOT => {
            let a = pop_number(state)?;
            push_bool(state, a.is_zero())
        }
        OP_0NOTEQUAL => {
            let a = pop_number(state)?;
            push_bool(state, !a.is_zero())
        }
        OP_ADD => {
            let b = pop_number(state)?;
            let a = pop_number(state)?;
            push_number(state, a.add(&b))
        }
        OP_SUB => {
            let b = pop_number(state)?;
            let a = pop_number(state)?;
            push_number(state, a.sub(&b))
        }
        OP_MUL => {
            let b = pop_number(state)?;
            let a = pop_number(state)?;
            push_number(state, a.mul(&b))
        }
        OP_DIV => {
            let b = pop_number(state)?;
            let a = pop_number(state)?;
            let (quotient, _) = a.div_rem(&b)?;
            push_number(state, quotient)
        }
        OP_MOD => {
            let b = pop_number(state)?;
            let a = pop_number(state)?;
            let (_, remainder) = a.div_rem(&b)?;
            push_number(state, remainder)
        }
        OP_BOOLAND => {
            let b = pop_number(state)?;
            let a = pop_number(state)?;
            push_bool(state, !a.is_zero() && !b.is_zero())
        }
        OP_BOOLOR => {
            let b = pop_number(state)?;
            let a = pop_number(state)?;
            push_bool(state, !a.is_zero() || !b.is_zero())
        }
        OP_NUMEQUAL => {
            let b = pop_number(state)?;
            let a = pop_number(state)?;
            push_bool(state, a == b)
        }
        OP_NUMEQUALVERIFY => {
            let b = pop_number(state)?;
            let a = pop_number(state)?;
            if a != b {
                return Err(InterpreterError::NumEqualVerifyFailed);
            }
            Ok(())
        }
        OP_NUMNOTEQUAL => {
            let b = pop_number(state)?;
            let a = pop_number(state)?;
            push_bool(state, a != b)
        }
        OP_LESSTHAN => {
            let b = pop_number(state)?;
            let a = pop_number(state)?;
            push_bool(state, a < b)
        }
        OP_GREATERTHAN => {
            let b = pop_number(state)?;
            let a = pop_number(state)?;
            push_bool(state, a > b)
        }
        OP_LESSTHANOREQUAL => {
            let b = pop_number(state)?;
            let a = pop_number(state)?;
            push_bool(state, a <= b)
        }
        OP_GREATERTHANOREQUAL => {
            let b = pop_number(state)?;
            let a = pop_number(state)?;
            push_bool(state, a >= b)
        }
        OP_MIN => {
            let b = pop_number(state)?;
            let a = pop_number(state)?;
            push_number(state, if a <= b { a } else { b })
        }
        OP_MAX => {
            let b = pop_number(state)?;
            let a = pop_number(state)?;
            push_number(state, if a >= b { a } else { b })
        }
        OP_WITHIN => {
            let max = pop_number(state)?;
            let min = pop_number(state)?;
            let x = pop_number(state)?;
            push_bool(state, x >= min && x < max)
        }
        _ => unreachable!("caller only routes numeric opcodes here"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> InterpreterState<'static> {
        InterpreterState::new(
            crate::policy::InterpreterLimits::resolve(&crate::policy::InterpreterPolicy::default(), true, false),
            crate::flags::InterpreterFlags::empty(),
            true,
            None,
            0,
            0,
        )
    }

    #[test]
    fn add_sums_operands() {
        let mut s = state();
        s.main_stack.push(ScriptNum::from_i64(2).to_item()).unwrap();
        s.main_stack.push(ScriptNum::from_i64(3).to_item()).unwrap();
        dispatch(&mut s, OP_ADD).unwrap();
        assert_eq!(s.main_stack.pop().unwrap(), ScriptNum::from_i64(5).to_item());
    }

    #[test]
    fn div_by_zero_errors() {
        let mut s = state();
        s.main_stack.push(ScriptNum::from_i64(4).to_item()).unwrap();
        s.main_stack.push(ScriptNum::from_i64(0).to_item()).unwrap();
        assert_eq!(dispatch(&mut s, OP_DIV).unwrap_err(), InterpreterError::DivisionByZero);
    }

    #[test]
    fn within_is_half_open() {
        let mut s = state();
        s.main_stack.push(ScriptNum::from_i64(5).to_item()).unwrap();
        s.main_stack.push(ScriptNum::from_i64(0).to_item()).unwrap();
        s.main_stack.push(ScriptNum::from_i64(5).to_item()).unwrap();
        dispatch(&mut s, OP_WITHIN).unwrap();
        assert_eq!(s.main_stack.pop().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn disabled_opcodes_always_error() {
        let mut s = state();
        assert_eq!(dispatch(&mut s, OP_2MUL).unwrap_err(), InterpreterError::DisabledOpcode);
    }

    #[test]
    fn add_handles_a_750_000_byte_operand() {
        let mut big = vec![0xffu8; 750_000];
        *big.last_mut().unwrap() = 0x7f;
        let mut s = state();
        s.main_stack.push(big).unwrap();
        s.main_stack.push(ScriptNum::from_i64(1).to_item()).unwrap();
        dispatch(&mut s, OP_ADD).unwrap();
        let sum = s.main_stack.pop().unwrap();
        assert!(ScriptNum::from_item(&sum) > ScriptNum::from_i64(0));
    }
}
