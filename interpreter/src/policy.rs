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

/// Miner-tunable caps applied when a post-genesis UTXO is evaluated outside
/// of full consensus validation (i.e. policy/standardness, not the
/// unbounded post-genesis consensus limits). Plain value object, no
/// config-file or environment layer: the caller constructs one directly,
/// the same way this crate's sibling `svscript-consensus::Sats`/`TxVer` are
/// plain value objects with no configuration surface of their own.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct InterpreterPolicy {
    pub max_script_size: u64,
    pub max_script_num_length: u64,
    pub max_stack_memory_usage: u64,
    pub max_ops_per_script: u64,
    pub max_pubkeys_per_multisig: u64,
}

impl Default for InterpreterPolicy {
    fn default() -> Self {
        InterpreterPolicy {
            max_script_size: 10_000_000,
            max_script_num_length: 750_000,
            max_stack_memory_usage: 100_000_000,
            max_ops_per_script: 500_000_000,
            max_pubkeys_per_multisig: 4_294_967_295,
        }
    }
}

/// The resolved set of resource caps for one evaluation, derived from
/// `(policy, is_genesis_enabled, is_utxo_after_genesis, is_consensus)` per
/// the three interacting rule regimes this interpreter enforces.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct InterpreterLimits {
    pub script_size: u64,
    pub script_num_length: u64,
    pub stack_memory_usage: u64,
    pub ops_per_script: u64,
    pub pubkeys_per_multisig: u64,
    pub item_size: u64,
    /// `None` once unlimited (post-genesis); pre-genesis caps the combined
    /// main+alt stack item count rather than their byte size.
    pub combined_stack_items: Option<u64>,
}

impl InterpreterLimits {
    pub fn resolve(policy: &InterpreterPolicy, is_utxo_after_genesis: bool, is_consensus: bool) -> Self {
        if !is_utxo_after_genesis {
            return InterpreterLimits {
                script_size: 10_000,
                script_num_length: 4,
                stack_memory_usage: u64::MAX,
                ops_per_script: 500,
                pubkeys_per_multisig: 20,
                item_size: 520,
                combined_stack_items: Some(1_000),
            };
        }
        if is_consensus {
            return InterpreterLimits {
                script_size: u32::MAX as u64,
                script_num_length: 750_000,
                stack_memory_usage: i64::MAX as u64,
                ops_per_script: u32::MAX as u64,
                pubkeys_per_multisig: u32::MAX as u64,
                item_size: u64::MAX,
                combined_stack_items: None,
            };
        }
        InterpreterLimits {
            script_size: policy.max_script_size,
            script_num_length: policy.max_script_num_length,
            stack_memory_usage: policy.max_stack_memory_usage,
            ops_per_script: policy.max_ops_per_script,
            pubkeys_per_multisig: policy.max_pubkeys_per_multisig,
            item_size: u64::MAX,
            combined_stack_items: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pre_genesis_limits_match_table() {
        let limits = InterpreterLimits::resolve(&InterpreterPolicy::default(), false, true);
        assert_eq!(limits.script_size, 10_000);
        assert_eq!(limits.script_num_length, 4);
        assert_eq!(limits.ops_per_script, 500);
        assert_eq!(limits.pubkeys_per_multisig, 20);
        assert_eq!(limits.item_size, 520);
        assert_eq!(limits.combined_stack_items, Some(1_000));
    }

    #[test]
    fn post_genesis_consensus_is_effectively_unbounded() {
        let limits = InterpreterLimits::resolve(&InterpreterPolicy::default(), true, true);
        assert_eq!(limits.script_num_length, 750_000);
        assert_eq!(limits.combined_stack_items, None);
    }

    #[test]
    fn post_genesis_policy_uses_caller_caps() {
        let policy = InterpreterPolicy { max_script_size: 500, ..InterpreterPolicy::default() };
        let limits = InterpreterLimits::resolve(&policy, true, false);
        assert_eq!(limits.script_size, 500);
    }
}
