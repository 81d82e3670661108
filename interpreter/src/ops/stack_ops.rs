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

//! `OP_TOALTSTACK` through `OP_TUCK`: stack shuffling with no byte-content
//! interpretation.

use svscript_consensus::opcodes::*;

use crate::numbers::{cast_to_bool, int_to_item};
use crate::state::InterpreterState;
use crate::InterpreterError;

pub fn dispatch(state: &mut InterpreterState, op: u8) -> Result<(), InterpreterError> {
    match op {
        OP_TOALTSTACK => {
            let item = state.main_stack.pop()?;
            state.alt_stack.push(item)
        }
        OP_FROMALTSTACK => {
            let item = state.alt_stack.pop()?;
            state.main_stack.push(item)
        }
        OP_2DROP => {
            state.main_stack.pop()?;
            state.main_stack.pop()?;
            Ok(())
        }
        OP_2DUP => {
            let b = state.main_stack.get(-2)?.to_vec();
            let a = state.main_stack.get(-1)?.to_vec();
            state.main_stack.push(b)?;
            state.main_stack.push(a)
        }
        OP_3DUP => {
            let c = state.main_stack.get(-3)?.to_vec();
            let b = state.main_stack.get(-2)?.to_vec();
            let a = state.main_stack.get(-1)?.to_vec();
            state.main_stack.push(c)?;
            state.main_stack.push(b)?;
            state.main_stack.push(a)
        }
        OP_2OVER => {
            let d = state.main_stack.get(-4)?.to_vec();
            let c = state.main_stack.get(-3)?.to_vec();
            state.main_stack.push(d)?;
            state.main_stack.push(c)
        }
        OP_2ROT => {
            let item = state.main_stack.pop_at(-6)?;
            state.main_stack.push(item)?;
            let item = state.main_stack.pop_at(-6)?;
            state.main_stack.push(item)
        }
        OP_2SWAP => {
            let item = state.main_stack.pop_at(-4)?;
            state.main_stack.push(item)?;
            let item = state.main_stack.pop_at(-4)?;
            state.main_stack.push(item)
        }
        OP_IFDUP => {
            let top = state.main_stack.get(-1)?.to_vec();
            if cast_to_bool(&top) {
                state.main_stack.push(top)?;
            }
            Ok(())
        }
        OP_DEPTH => {
            let depth = int_to_item(state.main_stack.len() as i128);
            state.main_stack.push(depth)
        }
        OP_DROP => {
            state.main_stack.pop()?;
            Ok(())
        }
        OP_DUP => {
            let top = state.main_stack.get(-1)?.to_vec();
            state.main_stack.push(top)
        }
        OP_NIP => {
            state.main_stack.pop_at(-2)?;
            Ok(())
        }
        OP_OVER => {
            let item = state.main_stack.get(-2)?.to_vec();
            state.main_stack.push(item)
        }
        OP_PICK | OP_ROLL => {
            let raw = state.main_stack.pop()?;
            let n = crate::numbers::to_number(&raw, state.limits.script_num_length as usize, false)?;
            if n < crate::numbers::ScriptNum::zero() {
                return Err(InterpreterError::InvalidStackOperation);
            }
            let n = n.to_i64_saturating();
            let neg_index = -(n as isize) - 1;
            if op == OP_PICK {
                let item = state.main_stack.get(neg_index)?.to_vec();
                state.main_stack.push(item)
            } else {
                let item = state.main_stack.pop_at(neg_index)?;
                state.main_stack.push(item)
            }
        }
        OP_ROT => {
            let item = state.main_stack.pop_at(-3)?;
            state.main_stack.push(item)
        }
        OP_SWAP => {
            let item = state.main_stack.pop_at(-2)?;
            state.main_stack.push(item)
        }
        OP_TUCK => {
            let top = state.main_stack.get(-1)?.to_vec();
            state.main_stack.insert(-2, top)
        }
        _ => unreachable!("caller only routes stack opcodes here"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> InterpreterState<'static> {
        InterpreterState::new(
            crate::policy::InterpreterLimits::resolve(&crate::policy::InterpreterPolicy::default(), false, true),
            crate::flags::InterpreterFlags::empty(),
            false,
            None,
            0,
            0,
        )
    }

    #[test]
    fn dup_duplicates_top() {
        let mut s = state();
        s.main_stack.push(vec![1]).unwrap();
        dispatch(&mut s, OP_DUP).unwrap();
        assert_eq!(s.main_stack.len(), 2);
        assert_eq!(s.main_stack.get(-1).unwrap(), &[1]);
    }

    #[test]
    fn swap_exchanges_top_two() {
        let mut s = state();
        s.main_stack.push(vec![1]).unwrap();
        s.main_stack.push(vec![2]).unwrap();
        dispatch(&mut s, OP_SWAP).unwrap();
        assert_eq!(s.main_stack.get(-1).unwrap(), &[1]);
        assert_eq!(s.main_stack.get(-2).unwrap(), &[2]);
    }

    #[test]
    fn roll_moves_item_to_top() {
        let mut s = state();
        s.main_stack.push(vec![1]).unwrap();
        s.main_stack.push(vec![2]).unwrap();
        s.main_stack.push(vec![3]).unwrap();
        s.main_stack.push(int_to_item(2)).unwrap();
        dispatch(&mut s, OP_ROLL).unwrap();
        assert_eq!(s.main_stack.get(-1).unwrap(), &[1]);
        assert_eq!(s.main_stack.len(), 3);
    }
}
