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

use std::cell::Cell;
use std::rc::Rc;

use crate::InterpreterError;

/// Per-item memory bookkeeping overhead charged on top of an item's byte
/// length, matching the reference implementation's accounting so two
/// engines agree bit-exactly on `StackSizeTooLarge`.
const ITEM_OVERHEAD: usize = 32;

/// A stack of byte-string items that shares a single memory-usage meter with
/// its alt-stack sibling (`make_child`). Both are checked against
/// `memory_limit` on every mutation that can grow usage.
#[derive(Clone, Debug)]
pub struct LimitedStack {
    items: Vec<Vec<u8>>,
    memory_used: Rc<Cell<usize>>,
    memory_limit: usize,
}

impl LimitedStack {
    pub fn new(memory_limit: usize) -> Self {
        LimitedStack { items: Vec::new(), memory_used: Rc::new(Cell::new(0)), memory_limit }
    }

    /// Returns a second, independent stack (the alt stack) sharing this
    /// stack's memory meter and limit.
    pub fn make_child(&self) -> Self {
        LimitedStack {
            items: Vec::new(),
            memory_used: Rc::clone(&self.memory_used),
            memory_limit: self.memory_limit,
        }
    }

    pub fn len(&self) -> usize { self.items.len() }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    fn item_cost(item: &[u8]) -> usize { item.len() + ITEM_OVERHEAD }

    fn charge(&self, added: usize) -> Result<(), InterpreterError> {
        let used = self.memory_used.get() + added;
        if used > self.memory_limit {
            return Err(InterpreterError::StackSizeTooLarge);
        }
        self.memory_used.set(used);
        Ok(())
    }

    fn refund(&self, removed: usize) { self.memory_used.set(self.memory_used.get() - removed); }

    pub fn push(&mut self, item: Vec<u8>) -> Result<(), InterpreterError> {
        self.charge(Self::item_cost(&item))?;
        self.items.push(item);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Vec<u8>, InterpreterError> {
        let item = self.items.pop().ok_or(InterpreterError::InvalidStackOperation)?;
        self.refund(Self::item_cost(&item));
        Ok(item)
    }

    /// Negative-from-top index, matching the reference implementation's
    /// `(-k)` addressing: `-1` is the top item.
    fn resolve(&self, neg_index: isize) -> Result<usize, InterpreterError> {
        if neg_index >= 0 {
            return Err(InterpreterError::InvalidStackOperation);
        }
        let offset = (-neg_index) as usize;
        self.items.len().checked_sub(offset).ok_or(InterpreterError::InvalidStackOperation)
    }

    pub fn get(&self, neg_index: isize) -> Result<&[u8], InterpreterError> {
        let i = self.resolve(neg_index)?;
        Ok(&self.items[i])
    }

    pub fn set(&mut self, neg_index: isize, item: Vec<u8>) -> Result<(), InterpreterError> {
        let i = self.resolve(neg_index)?;
        let old_cost = Self::item_cost(&self.items[i]);
        let new_cost = Self::item_cost(&item);
        if new_cost > old_cost {
            self.charge(new_cost - old_cost)?;
        } else {
            self.refund(old_cost - new_cost);
        }
        self.items[i] = item;
        Ok(())
    }

    pub fn pop_at(&mut self, neg_index: isize) -> Result<Vec<u8>, InterpreterError> {
        let i = self.resolve(neg_index)?;
        let item = self.items.remove(i);
        self.refund(Self::item_cost(&item));
        Ok(item)
    }

    pub fn insert(&mut self, neg_index: isize, item: Vec<u8>) -> Result<(), InterpreterError> {
        // Inserting at -1 means "before the current top", i.e. at len - 1.
        let offset = if neg_index >= 0 {
            return Err(InterpreterError::InvalidStackOperation);
        } else {
            (-neg_index) as usize
        };
        let i = self.items.len().checked_sub(offset).ok_or(InterpreterError::InvalidStackOperation)?;
        self.charge(Self::item_cost(&item))?;
        self.items.insert(i, item);
        Ok(())
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = Vec<u8>>) -> Result<(), InterpreterError> {
        for item in items {
            self.push(item)?;
        }
        Ok(())
    }

    pub fn truthiness_of_top(&self) -> Result<bool, InterpreterError> {
        Ok(crate::numbers::cast_to_bool(self.get(-1)?))
    }

    /// O(n) copy of the current items, used only between scriptSig and P2SH
    /// redeem-script evaluation. Does not duplicate the memory meter.
    pub fn snapshot(&self) -> Vec<Vec<u8>> { self.items.clone() }

    pub fn restore(&mut self, snapshot: Vec<Vec<u8>>) {
        let old_cost: usize = self.items.iter().map(|i| Self::item_cost(i)).sum();
        let new_cost: usize = snapshot.iter().map(|i| Self::item_cost(i)).sum();
        self.refund(old_cost);
        // Restoring a snapshot never grows the meter past what it held when
        // the snapshot was taken, so this cannot exceed memory_limit.
        self.memory_used.set(self.memory_used.get() + new_cost);
        self.items = snapshot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_roundtrips() {
        let mut stack = LimitedStack::new(1_000_000);
        stack.push(vec![1, 2, 3]).unwrap();
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.pop().unwrap(), vec![1, 2, 3]);
        assert!(stack.is_empty());
    }

    #[test]
    fn pop_empty_errors() {
        let mut stack = LimitedStack::new(1_000_000);
        assert_eq!(stack.pop().unwrap_err(), InterpreterError::InvalidStackOperation);
    }

    #[test]
    fn child_stack_shares_meter() {
        let mut main = LimitedStack::new(100);
        let mut alt = main.make_child();
        main.push(vec![0u8; 50]).unwrap();
        assert!(alt.push(vec![0u8; 50]).is_err());
    }

    #[test]
    fn snapshot_restore_roundtrips() {
        let mut stack = LimitedStack::new(1_000_000);
        stack.push(vec![1]).unwrap();
        let snap = stack.snapshot();
        stack.push(vec![2]).unwrap();
        stack.restore(snap);
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.get(-1).unwrap(), &[1]);
    }

    #[test]
    fn negative_index_addressing() {
        let mut stack = LimitedStack::new(1_000_000);
        stack.push(vec![1]).unwrap();
        stack.push(vec![2]).unwrap();
        stack.push(vec![3]).unwrap();
        assert_eq!(stack.get(-1).unwrap(), &[3]);
        assert_eq!(stack.get(-3).unwrap(), &[1]);
        assert!(stack.get(-4).is_err());
    }
}
