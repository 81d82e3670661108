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

use svscript_consensus::opcodes::{
    OP_PUSHBYTES_0, OP_PUSHBYTES_75, OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHDATA4,
};

use crate::InterpreterError;

/// Walks a script byte slice, yielding `(opcode, pushed_item)` pairs and
/// tracking the position of the most recent `OP_CODESEPARATOR` so
/// `script_code()` can slice the subscript consumed by signature hashing.
pub struct OpIterator<'a> {
    script: &'a [u8],
    pos: usize,
    code_separator_pos: usize,
    truncated: bool,
}

impl<'a> OpIterator<'a> {
    pub fn new(script: &'a [u8]) -> Self {
        OpIterator { script, pos: 0, code_separator_pos: 0, truncated: false }
    }

    /// Records the current position as the start of the subscript, called
    /// when an `OP_CODESEPARATOR` executes.
    pub fn on_code_separator(&mut self) { self.code_separator_pos = self.pos; }

    /// Bytes from the last recorded `OP_CODESEPARATOR` (exclusive) through
    /// the end of the script. Initially the whole script.
    pub fn script_code(&self) -> &'a [u8] { &self.script[self.code_separator_pos..] }

    fn read_push(&mut self, op: u8) -> Result<Option<Vec<u8>>, InterpreterError> {
        let (len, header_len) = match op {
            OP_PUSHBYTES_0..=OP_PUSHBYTES_75 => (op as usize, 0),
            OP_PUSHDATA1 => {
                let n = *self.script.get(self.pos).ok_or(InterpreterError::TruncatedScriptError)?;
                (n as usize, 1)
            }
            OP_PUSHDATA2 => {
                let bytes = self
                    .script
                    .get(self.pos..self.pos + 2)
                    .ok_or(InterpreterError::TruncatedScriptError)?;
                (u16::from_le_bytes([bytes[0], bytes[1]]) as usize, 2)
            }
            OP_PUSHDATA4 => {
                let bytes = self
                    .script
                    .get(self.pos..self.pos + 4)
                    .ok_or(InterpreterError::TruncatedScriptError)?;
                (u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize, 4)
            }
            _ => unreachable!("caller only invokes read_push for push opcodes"),
        };
        self.pos += header_len;
        let end = self.pos.checked_add(len).ok_or(InterpreterError::TruncatedScriptError)?;
        let data = self.script.get(self.pos..end).ok_or(InterpreterError::TruncatedScriptError)?;
        self.pos = end;
        Ok(if len == 0 { None } else { Some(data.to_vec()) })
    }
}

impl<'a> Iterator for OpIterator<'a> {
    type Item = Result<(u8, Option<Vec<u8>>), InterpreterError>;

    /// On truncation, yields the error once and nothing further: the caller
    /// is expected to treat a truncated pushdata as a terminal parse error,
    /// but any conditionals left open by scripts evaluated so far still need
    /// reporting (`UnbalancedConditional`) rather than being masked by this
    /// iterator silently stopping.
    fn next(&mut self) -> Option<Self::Item> {
        if self.truncated || self.pos >= self.script.len() {
            return None;
        }
        let op = self.script[self.pos];
        self.pos += 1;
        let is_push = matches!(op, OP_PUSHBYTES_0..=OP_PUSHBYTES_75)
            || op == OP_PUSHDATA1
            || op == OP_PUSHDATA2
            || op == OP_PUSHDATA4;
        if !is_push {
            return Some(Ok((op, None)));
        }
        match self.read_push(op) {
            Ok(item) => Some(Ok((op, item))),
            Err(e) => {
                self.truncated = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svscript_consensus::opcodes::OP_DUP;

    #[test]
    fn yields_plain_opcodes() {
        let script = [OP_DUP, OP_DUP];
        let ops: Vec<_> = OpIterator::new(&script).collect::<Result<_, _>>().unwrap();
        assert_eq!(ops, vec![(OP_DUP, None), (OP_DUP, None)]);
    }

    #[test]
    fn yields_direct_push() {
        let script = [0x02, 0xaa, 0xbb];
        let ops: Vec<_> = OpIterator::new(&script).collect::<Result<_, _>>().unwrap();
        assert_eq!(ops, vec![(0x02, Some(vec![0xaa, 0xbb]))]);
    }

    #[test]
    fn truncated_pushdata_errors() {
        let script = [0x02, 0xaa];
        let mut it = OpIterator::new(&script);
        assert_eq!(it.next(), Some(Err(InterpreterError::TruncatedScriptError)));
        assert_eq!(it.next(), None);
    }

    #[test]
    fn script_code_starts_at_last_separator() {
        let script = [OP_DUP, OP_DUP, OP_DUP];
        let mut it = OpIterator::new(&script);
        it.next();
        it.on_code_separator();
        assert_eq!(it.script_code(), &[OP_DUP, OP_DUP]);
    }
}
