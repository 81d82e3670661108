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

//! `OP_CAT`, `OP_SPLIT`, `OP_NUM2BIN`, `OP_BIN2NUM`, `OP_SIZE`: byte-string
//! manipulation re-enabled post-genesis.

use svscript_consensus::opcodes::*;

use crate::numbers::{int_to_item, to_number, ScriptNum};
use crate::state::InterpreterState;
use crate::InterpreterError;

pub fn dispatch(state: &mut InterpreterState, op: u8) -> Result<(), InterpreterError> {
    match op {
        OP_CAT => {
            let b = state.main_stack.pop()?;
            let a = state.main_stack.pop()?;
            let mut out = a;
            out.extend_from_slice(&b);
            if out.len() as u64 > state.limits.item_size {
                return Err(InterpreterError::InvalidPushSize);
            }
            state.main_stack.push(out)
        }
        OP_SPLIT => {
            let raw_n = state.main_stack.pop()?;
            let n = to_number(&raw_n, state.limits.script_num_length as usize, false)?;
            let a = state.main_stack.pop()?;
            if n < ScriptNum::zero() {
                return Err(InterpreterError::InvalidSplit);
            }
            let n = n.to_i64_saturating();
            if n < 0 || n as usize > a.len() {
                return Err(InterpreterError::InvalidSplit);
            }
            let (left, right) = a.split_at(n as usize);
            let left = left.to_vec();
            let right = right.to_vec();
            state.main_stack.push(left)?;
            state.main_stack.push(right)
        }
        OP_NUM2BIN => {
            let raw_size = state.main_stack.pop()?;
            let size = to_number(&raw_size, state.limits.script_num_length as usize, false)?;
            if size < ScriptNum::zero() {
                return Err(InterpreterError::InvalidPushSize);
            }
            let size = size.to_i64_saturating();
            if size < 0 || size as u64 > state.limits.item_size {
                return Err(InterpreterError::InvalidPushSize);
            }
            let raw_n = state.main_stack.pop()?;
            let n = to_number(&raw_n, state.limits.script_num_length as usize, false)?;
            let out = n.to_item_sized(size as usize)?;
            state.main_stack.push(out)
        }
        OP_BIN2NUM => {
            let raw = state.main_stack.pop()?;
            let n = to_number(&raw, raw.len(), false)?;
            let minimal = n.to_item();
            if minimal.len() as u64 > state.limits.script_num_length {
                return Err(InterpreterError::InvalidNumber);
            }
            state.main_stack.push(minimal)
        }
        OP_SIZE => {
            let top = state.main_stack.get(-1)?;
            let size = int_to_item(top.len() as i128);
            state.main_stack.push(size)
        }
        _ => unreachable!("caller only routes splice opcodes here"),
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
    fn split_partitions_item() {
        let mut s = state();
        s.main_stack.push(vec![1, 2, 3, 4]).unwrap();
        s.main_stack.push(int_to_item(2)).unwrap();
        dispatch(&mut s, OP_SPLIT).unwrap();
        assert_eq!(s.main_stack.pop().unwrap(), vec![3, 4]);
        assert_eq!(s.main_stack.pop().unwrap(), vec![1, 2]);
    }

    #[test]
    fn cat_concatenates() {
        let mut s = state();
        s.main_stack.push(vec![1, 2]).unwrap();
        s.main_stack.push(vec![3, 4]).unwrap();
        dispatch(&mut s, OP_CAT).unwrap();
        assert_eq!(s.main_stack.pop().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn num2bin_pads_to_size() {
        let mut s = state();
        s.main_stack.push(int_to_item(1)).unwrap();
        s.main_stack.push(int_to_item(4)).unwrap();
        dispatch(&mut s, OP_NUM2BIN).unwrap();
        assert_eq!(s.main_stack.pop().unwrap(), vec![1, 0, 0, 0]);
    }

    #[test]
    fn size_reports_length_without_consuming() {
        let mut s = state();
        s.main_stack.push(vec![1, 2, 3]).unwrap();
        dispatch(&mut s, OP_SIZE).unwrap();
        assert_eq!(s.main_stack.pop().unwrap(), int_to_item(3));
        assert_eq!(s.main_stack.pop().unwrap(), vec![1, 2, 3]);
    }
}
