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

use std::cmp::Ordering;

use svscript_consensus::opcodes::{
    OP_PUSHBYTES_0, OP_PUSHBYTES_75, OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHDATA4,
    OP_PUSHNUM_1, OP_PUSHNUM_NEG1,
};

use crate::InterpreterError;

/// An arbitrary-precision sign-magnitude integer, the value a stack item
/// decodes to. Post-genesis, `script_num_length` can be 750,000 bytes, far
/// past what any fixed-width machine integer holds, so arithmetic opcodes
/// operate on this rather than on `i128`/`i64` directly.
///
/// `magnitude` is little-endian and canonical: no trailing (most
/// significant) zero byte, empty iff the value is zero. `negative` is
/// always `false` when the value is zero.
#[derive(Clone, Debug, Eq)]
pub struct ScriptNum {
    negative: bool,
    magnitude: Vec<u8>,
}

impl ScriptNum {
    pub fn zero() -> Self { ScriptNum { negative: false, magnitude: Vec::new() } }

    pub fn from_i128(n: i128) -> Self {
        if n == 0 {
            return Self::zero();
        }
        let negative = n < 0;
        let mut magnitude_int = n.unsigned_abs();
        let mut magnitude = Vec::new();
        while magnitude_int > 0 {
            magnitude.push((magnitude_int & 0xff) as u8);
            magnitude_int >>= 8;
        }
        ScriptNum { negative, magnitude }
    }

    pub fn from_i64(n: i64) -> Self { Self::from_i128(n as i128) }

    /// Decodes a stack item as sign-magnitude little-endian, sign bit in the
    /// MSB of the last byte. Does not bound the item's length; callers
    /// needing a length limit check it separately (see [`to_number`]).
    pub fn from_item(item: &[u8]) -> Self {
        let Some((&top, rest)) = item.split_last() else { return Self::zero() };
        let negative = top & 0x80 != 0;
        let mut magnitude = rest.to_vec();
        magnitude.push(top & 0x7f);
        let magnitude = mag_trim(magnitude);
        if magnitude.is_empty() {
            return Self::zero();
        }
        ScriptNum { negative, magnitude }
    }

    /// Encodes back to the minimal sign-magnitude item. Zero encodes to the
    /// empty item.
    pub fn to_item(&self) -> Vec<u8> {
        if self.magnitude.is_empty() {
            return Vec::new();
        }
        let mut out = self.magnitude.clone();
        if out.last().map(|b| b & 0x80 != 0).unwrap_or(false) {
            out.push(if self.negative { 0x80 } else { 0x00 });
        } else if self.negative {
            *out.last_mut().expect("magnitude is non-empty") |= 0x80;
        }
        out
    }

    /// Encodes into exactly `size` bytes (`OP_NUM2BIN`), padding with zero
    /// bytes and moving the sign bit to the final byte. Fails if the
    /// minimal encoding does not fit in `size` bytes.
    pub fn to_item_sized(&self, size: usize) -> Result<Vec<u8>, InterpreterError> {
        let minimal = self.to_item();
        if minimal.len() > size {
            return Err(InterpreterError::ImpossibleEncoding);
        }
        if minimal.is_empty() {
            return Ok(vec![0u8; size]);
        }
        let negative = minimal[minimal.len() - 1] & 0x80 != 0;
        let mut out = minimal.clone();
        *out.last_mut().expect("checked non-empty") &= 0x7f;
        out.resize(size, 0);
        if negative {
            out[size - 1] |= 0x80;
        }
        Ok(out)
    }

    pub fn is_zero(&self) -> bool { self.magnitude.is_empty() }

    pub fn negate(&self) -> Self {
        if self.is_zero() {
            return self.clone();
        }
        ScriptNum { negative: !self.negative, magnitude: self.magnitude.clone() }
    }

    pub fn abs(&self) -> Self { ScriptNum { negative: false, magnitude: self.magnitude.clone() } }

    pub fn add(&self, other: &Self) -> Self {
        if self.negative == other.negative {
            let magnitude = mag_add(&self.magnitude, &other.magnitude);
            let negative = self.negative && !magnitude.is_empty();
            ScriptNum { negative, magnitude }
        } else {
            match mag_cmp(&self.magnitude, &other.magnitude) {
                Ordering::Equal => Self::zero(),
                Ordering::Greater => {
                    ScriptNum { negative: self.negative, magnitude: mag_sub(&self.magnitude, &other.magnitude) }
                }
                Ordering::Less => {
                    ScriptNum { negative: other.negative, magnitude: mag_sub(&other.magnitude, &self.magnitude) }
                }
            }
        }
    }

    pub fn sub(&self, other: &Self) -> Self { self.add(&other.negate()) }

    pub fn mul(&self, other: &Self) -> Self {
        let magnitude = mag_mul(&self.magnitude, &other.magnitude);
        let negative = (self.negative != other.negative) && !magnitude.is_empty();
        ScriptNum { negative, magnitude }
    }

    /// Truncating division (quotient toward zero, remainder takes the
    /// dividend's sign), matching C-style integer division.
    pub fn div_rem(&self, other: &Self) -> Result<(Self, Self), InterpreterError> {
        if other.is_zero() {
            return Err(InterpreterError::DivisionByZero);
        }
        let (q_mag, r_mag) = mag_divmod(&self.magnitude, &other.magnitude);
        let quotient =
            ScriptNum { negative: (self.negative != other.negative) && !q_mag.is_empty(), magnitude: q_mag };
        let remainder = ScriptNum { negative: self.negative && !r_mag.is_empty(), magnitude: r_mag };
        Ok((quotient, remainder))
    }

    /// Collapses to `i64`, saturating rather than overflowing. Safe for the
    /// bounded contexts (stack indices, locktime values, multisig counts)
    /// that only ever decode small numbers but still route through the same
    /// arbitrary-precision codec as arithmetic opcodes; an out-of-range
    /// saturated value simply fails whatever range check the caller applies
    /// next.
    pub fn to_i64_saturating(&self) -> i64 {
        if self.magnitude.len() > 8 {
            return if self.negative { i64::MIN } else { i64::MAX };
        }
        let mut m: u64 = 0;
        for (i, &b) in self.magnitude.iter().enumerate() {
            m |= (b as u64) << (8 * i);
        }
        if self.negative {
            if m <= i64::MAX as u64 { -(m as i64) } else { i64::MIN }
        } else if m <= i64::MAX as u64 {
            m as i64
        } else {
            i64::MAX
        }
    }
}

impl PartialEq for ScriptNum {
    fn eq(&self, other: &Self) -> bool { self.cmp(other) == Ordering::Equal }
}

impl PartialOrd for ScriptNum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ScriptNum {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.is_zero() && other.is_zero() {
            return Ordering::Equal;
        }
        match (self.negative, other.negative) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => mag_cmp(&self.magnitude, &other.magnitude),
            (true, true) => mag_cmp(&other.magnitude, &self.magnitude),
        }
    }
}

fn mag_trim(mut v: Vec<u8>) -> Vec<u8> {
    while v.last() == Some(&0) {
        v.pop();
    }
    v
}

fn significant_len(v: &[u8]) -> usize {
    let mut n = v.len();
    while n > 0 && v[n - 1] == 0 {
        n -= 1;
    }
    n
}

fn mag_cmp(a: &[u8], b: &[u8]) -> Ordering {
    let (la, lb) = (significant_len(a), significant_len(b));
    if la != lb {
        return la.cmp(&lb);
    }
    for i in (0..la).rev() {
        if a[i] != b[i] {
            return a[i].cmp(&b[i]);
        }
    }
    Ordering::Equal
}

fn mag_add(a: &[u8], b: &[u8]) -> Vec<u8> {
    let len = a.len().max(b.len()) + 1;
    let mut out = Vec::with_capacity(len);
    let mut carry = 0u16;
    for i in 0..len {
        let x = *a.get(i).unwrap_or(&0) as u16;
        let y = *b.get(i).unwrap_or(&0) as u16;
        let sum = x + y + carry;
        out.push((sum & 0xff) as u8);
        carry = sum >> 8;
    }
    mag_trim(out)
}

/// Requires `a >= b` (magnitude order).
fn mag_sub(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(a.len());
    let mut borrow = 0i16;
    for i in 0..a.len() {
        let x = a[i] as i16;
        let y = *b.get(i).unwrap_or(&0) as i16;
        let mut diff = x - y - borrow;
        if diff < 0 {
            diff += 256;
            borrow = 1;
        } else {
            borrow = 0;
        }
        out.push(diff as u8);
    }
    mag_trim(out)
}

fn mag_mul(a: &[u8], b: &[u8]) -> Vec<u8> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0u8; a.len() + b.len()];
    for (i, &ai) in a.iter().enumerate() {
        let mut carry = 0u32;
        for (j, &bj) in b.iter().enumerate() {
            let idx = i + j;
            let prod = out[idx] as u32 + ai as u32 * bj as u32 + carry;
            out[idx] = (prod & 0xff) as u8;
            carry = prod >> 8;
        }
        let mut k = i + b.len();
        while carry > 0 {
            let sum = out[k] as u32 + carry;
            out[k] = (sum & 0xff) as u8;
            carry = sum >> 8;
            k += 1;
        }
    }
    mag_trim(out)
}

/// Binary long division on magnitudes. `b` must be non-zero.
fn mag_divmod(a: &[u8], b: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let bits = a.len() * 8;
    let mut remainder: Vec<u8> = Vec::new();
    let mut quotient = vec![0u8; a.len()];
    for bit_index in (0..bits).rev() {
        remainder = mag_shl1(&remainder);
        let byte_i = bit_index / 8;
        let bit_i = bit_index % 8;
        if (a[byte_i] >> bit_i) & 1 == 1 {
            if remainder.is_empty() {
                remainder.push(1);
            } else {
                remainder[0] |= 1;
            }
        }
        if mag_cmp(&remainder, b) != Ordering::Less {
            remainder = mag_sub(&remainder, b);
            quotient[byte_i] |= 1 << bit_i;
        }
    }
    (mag_trim(quotient), mag_trim(remainder))
}

fn mag_shl1(v: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(v.len() + 1);
    let mut carry = 0u8;
    for &b in v {
        out.push((b << 1) | carry);
        carry = b >> 7;
    }
    if carry != 0 {
        out.push(carry);
    }
    mag_trim(out)
}

/// Encodes an integer as a minimally-sized sign-magnitude little-endian
/// item. Zero encodes to the empty item. A thin convenience wrapper around
/// [`ScriptNum`] for callers that only ever construct small values (stack
/// depth, split offsets, and the like).
pub fn int_to_item(n: i128) -> Vec<u8> { ScriptNum::from_i128(n).to_item() }

/// An item fails to be minimally encoded iff it is nonempty, its top byte is
/// `0x00` or `0x80`, and either it is a single byte or the next-to-top byte's
/// own sign bit is clear (so the leading zero/sign byte was not needed to
/// disambiguate the magnitude from a negative encoding).
pub fn is_minimally_encoded(item: &[u8]) -> bool {
    let Some(&top) = item.last() else { return true };
    if top & 0x7f != 0 {
        return true;
    }
    if item.len() == 1 {
        return false;
    }
    item[item.len() - 2] & 0x80 != 0
}

/// Returns the single opcode byte `item` should have been pushed with, were
/// it pushed minimally: `OP_0`, `OP_1NEGATE`, `OP_1`..`OP_16`, or a direct
/// push / PUSHDATA1/2/4 opcode sized to `item`'s length.
pub fn minimal_push_opcode(item: &[u8]) -> u8 {
    if item.is_empty() {
        return OP_PUSHBYTES_0;
    }
    if item.len() == 1 {
        let v = item[0];
        if v == 0x81 {
            return OP_PUSHNUM_NEG1;
        }
        if (1..=16).contains(&v) {
            return OP_PUSHNUM_1 + (v - 1);
        }
    }
    match item.len() {
        n if n <= OP_PUSHBYTES_75 as usize => n as u8,
        n if n < 0x100 => OP_PUSHDATA1,
        n if n < 0x10000 => OP_PUSHDATA2,
        _ => OP_PUSHDATA4,
    }
}

/// Decodes an operand off the stack for an arithmetic/comparison opcode:
/// rejects items longer than `max_len` (`script_num_length`), and, if
/// `require_minimal`, rejects non-minimally-encoded items. The result is
/// arbitrary precision, since post-genesis `max_len` can be 750,000 bytes.
pub fn to_number(item: &[u8], max_len: usize, require_minimal: bool) -> Result<ScriptNum, InterpreterError> {
    if item.len() > max_len {
        return Err(InterpreterError::InvalidNumber);
    }
    if require_minimal && !is_minimally_encoded(item) {
        return Err(InterpreterError::MinimalEncodingError);
    }
    Ok(ScriptNum::from_item(item))
}

/// Bitcoin script truthiness: false iff every byte is zero, or the top byte
/// is `0x80` (negative zero) with every other byte zero.
pub fn cast_to_bool(item: &[u8]) -> bool {
    let Some((&last, rest)) = item.split_last() else { return false };
    if last != 0 && last != 0x80 {
        return true;
    }
    rest.iter().any(|&b| b != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use svscript_consensus::opcodes::OP_PUSHNUM_16;

    #[test]
    fn roundtrip_positive_and_negative() {
        for n in [0i128, 1, -1, 127, 128, -128, 255, 256, 32767, -32767, 1_000_000, -1_000_000] {
            let item = int_to_item(n);
            assert_eq!(ScriptNum::from_item(&item), ScriptNum::from_i128(n));
            assert!(is_minimally_encoded(&item));
        }
    }

    #[test]
    fn zero_is_empty_item() {
        assert!(int_to_item(0).is_empty());
        assert!(ScriptNum::from_item(&[]).is_zero());
    }

    #[test]
    fn non_minimal_trailing_zero_detected() {
        assert!(!is_minimally_encoded(&[0x01, 0x00]));
        assert!(is_minimally_encoded(&[0x01, 0x80]));
        assert!(is_minimally_encoded(&[0xff, 0x00]));
    }

    #[test]
    fn sized_encoding_pads_and_rejects_overflow() {
        let encoded = ScriptNum::from_i64(1).to_item_sized(4).unwrap();
        assert_eq!(encoded, vec![1, 0, 0, 0]);

        let negative = ScriptNum::from_i64(-1).to_item_sized(2).unwrap();
        assert_eq!(ScriptNum::from_item(&negative), ScriptNum::from_i64(-1));

        assert!(ScriptNum::from_i64(1000).to_item_sized(1).is_err());
    }

    #[test]
    fn cast_to_bool_rules() {
        assert!(!cast_to_bool(&[]));
        assert!(!cast_to_bool(&[0x00, 0x00]));
        assert!(!cast_to_bool(&[0x80]));
        assert!(!cast_to_bool(&[0x00, 0x80]));
        assert!(cast_to_bool(&[0x01]));
        assert!(cast_to_bool(&[0x00, 0x01]));
    }

    #[test]
    fn minimal_push_opcode_covers_small_ints() {
        assert_eq!(minimal_push_opcode(&[]), OP_PUSHBYTES_0);
        assert_eq!(minimal_push_opcode(&[1]), OP_PUSHNUM_1);
        assert_eq!(minimal_push_opcode(&[16]), OP_PUSHNUM_16);
        assert_eq!(minimal_push_opcode(&[0x81]), OP_PUSHNUM_NEG1);
        assert_eq!(minimal_push_opcode(&[2, 3]), 2);
    }

    #[test]
    fn add_matches_native_for_i128_range_operands() {
        let a = ScriptNum::from_i128(i128::MAX / 2);
        let b = ScriptNum::from_i64(1);
        assert_eq!(a.add(&b), ScriptNum::from_i128(i128::MAX / 2 + 1));
    }

    #[test]
    fn seven_hundred_fifty_thousand_byte_number_decodes_without_panicking() {
        let mut item = vec![0xffu8; 750_000];
        // Clear the sign bit on the top byte so this is read as positive.
        *item.last_mut().unwrap() = 0x7f;
        let n = ScriptNum::from_item(&item);
        assert!(!n.is_zero());
        assert_eq!(n.to_item().len(), 750_000);

        let one = ScriptNum::from_i64(1);
        let sum = n.add(&one);
        assert!(sum > n);
    }

    #[test]
    fn div_rem_truncates_toward_zero() {
        let a = ScriptNum::from_i64(-7);
        let b = ScriptNum::from_i64(2);
        let (q, r) = a.div_rem(&b).unwrap();
        assert_eq!(q, ScriptNum::from_i64(-3));
        assert_eq!(r, ScriptNum::from_i64(-1));
    }

    #[test]
    fn mul_of_large_magnitudes() {
        let a = ScriptNum::from_i64(123_456_789);
        let b = ScriptNum::from_i64(987_654_321);
        let product = a.mul(&b);
        assert_eq!(product, ScriptNum::from_i128(123_456_789i128 * 987_654_321i128));
    }
}
