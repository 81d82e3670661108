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

//! `OP_INVERT`/`OP_AND`/`OP_OR`/`OP_XOR`/`OP_EQUAL(VERIFY)`/`OP_LSHIFT`/
//! `OP_RSHIFT`.

use svscript_consensus::opcodes::*;

use crate::numbers::{to_number, ScriptNum};
use crate::state::InterpreterState;
use crate::InterpreterError;

fn binary_bitop(a: &[u8], b: &[u8], f: impl Fn(u8, u8) -> u8) -> Result<Vec<u8>, InterpreterError> {
    if a.len() != b.len() {
        return Err(InterpreterError::InvalidOperandSize);
    }
    Ok(a.iter().zip(b.iter()).map(|(&x, &y)| f(x, y)).collect())
}

pub fn dispatch(state: &mut InterpreterState, op: u8) -> Result<(), InterpreterError> {
    match op {
        OP_INVERT => {
            let a = state.main_stack.pop()?;
            let out: Vec<u8> = a.iter().map(|b| !b).collect();
            state.main_stack.push(out)
        }
        OP_AND => {
            let b = state.main_stack.pop()?;
            let a = state.main_stack.pop()?;
            let out = binary_bitop(&a, &b, |x, y| x & y)?;
            state.main_stack.push(out)
        }
        OP_OR => {
            let b = state.main_stack.pop()?;
            let a = state.main_stack.pop()?;
            let out = binary_bitop(&a, &b, |x, y| x | y)?;
            state.main_stack.push(out)
        }
        OP_XOR => {
            let b = state.main_stack.pop()?;
            let a = state.main_stack.pop()?;
            let out = binary_bitop(&a, &b, |x, y| x ^ y)?;
            state.main_stack.push(out)
        }
        OP_EQUAL => {
            let b = state.main_stack.pop()?;
            let a = state.main_stack.pop()?;
            state.main_stack.push(if a == b { vec![1] } else { Vec::new() })
        }
        OP_EQUALVERIFY => {
            let b = state.main_stack.pop()?;
            let a = state.main_stack.pop()?;
            if a != b {
                return Err(InterpreterError::EqualVerifyFailed);
            }
            Ok(())
        }
        OP_LSHIFT | OP_RSHIFT => {
            let raw_n = state.main_stack.pop()?;
            let n = to_number(&raw_n, state.limits.script_num_length as usize, false)?;
            if n < ScriptNum::zero() {
                return Err(InterpreterError::NegativeShiftCount);
            }
            let a = state.main_stack.pop()?;
            let n = n.to_i64_saturating().min(u32::MAX as i64) as u32;
            let out = shift_bytes(&a, n, op == OP_LSHIFT);
            state.main_stack.push(out)
        }
        _ => unreachable!("caller only routes bitwise opcodes here"),
    }
}

/// Shifts a big-endian-within-bit, byte-array-addressed bit string by `n`
/// bits, matching the reference bit ordering: bit 0 is the MSB of byte 0.
fn shift_bytes(data: &[u8], n: u32, left: bool) -> Vec<u8> {
    let total_bits = data.len() * 8;
    if n as usize >= total_bits {
        return vec![0u8; data.len()];
    }
    let mut bits: Vec<u8> = Vec::with_capacity(total_bits);
    for &byte in data {
        for i in (0..8).rev() {
            bits.push((byte >> i) & 1);
        }
    }
    let mut shifted = vec![0u8; total_bits];
    if left {
        shifted[..total_bits - n as usize].copy_from_slice(&bits[n as usize..]);
    } else {
        shifted[n as usize..].copy_from_slice(&bits[..total_bits - n as usize]);
    }
    let mut out = vec![0u8; data.len()];
    for (i, chunk) in shifted.chunks(8).enumerate() {
        let mut byte = 0u8;
        for &bit in chunk {
            byte = (byte << 1) | bit;
        }
        out[i] = byte;
    }
    out
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
    fn equal_compares_bytes() {
        let mut s = state();
        s.main_stack.push(vec![1, 2]).unwrap();
        s.main_stack.push(vec![1, 2]).unwrap();
        dispatch(&mut s, OP_EQUAL).unwrap();
        assert_eq!(s.main_stack.pop().unwrap(), vec![1]);
    }

    #[test]
    fn and_rejects_mismatched_lengths() {
        let mut s = state();
        s.main_stack.push(vec![1, 2]).unwrap();
        s.main_stack.push(vec![1]).unwrap();
        assert_eq!(dispatch(&mut s, OP_AND).unwrap_err(), InterpreterError::InvalidOperandSize);
    }

    #[test]
    fn lshift_shifts_bits_left() {
        assert_eq!(shift_bytes(&[0b0000_0001], 1, true), vec![0b0000_0010]);
        assert_eq!(shift_bytes(&[0b1000_0000], 1, false), vec![0b0100_0000]);
    }
}
