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

//! Hashing and signature-checking opcodes.

use svscript_consensus::opcodes::*;
use svscript_consensus::{hash_hash160, hash_ripemd160, hash_sha1, hash_sha256, hash_sha256d, ScriptBytes};

use crate::flags::InterpreterFlags;
use crate::iterator::OpIterator;
use crate::numbers::{cast_to_bool, to_number, ScriptNum};
use crate::state::InterpreterState;
use crate::InterpreterError;

pub fn dispatch(
    state: &mut InterpreterState,
    iter: &mut OpIterator,
    op: u8,
) -> Result<(), InterpreterError> {
    match op {
        OP_RIPEMD160 => hash1(state, |d| hash_ripemd160(d).to_vec()),
        OP_SHA1 => hash1(state, |d| hash_sha1(d).to_vec()),
        OP_SHA256 => hash1(state, |d| hash_sha256(d).to_vec()),
        OP_HASH160 => hash1(state, |d| hash_hash160(d).to_vec()),
        OP_HASH256 => hash1(state, |d| hash_sha256d(d).to_vec()),
        OP_CODESEPARATOR => {
            iter.on_code_separator();
            Ok(())
        }
        OP_CHECKSIG => op_checksig(state, iter),
        OP_CHECKSIGVERIFY => {
            op_checksig(state, iter)?;
            verify_top(state, InterpreterError::CheckSigVerifyFailed)
        }
        OP_CHECKMULTISIG => op_checkmultisig(state, iter),
        OP_CHECKMULTISIGVERIFY => {
            op_checkmultisig(state, iter)?;
            verify_top(state, InterpreterError::CheckMultiSigVerifyFailed)
        }
        _ => unreachable!("caller only routes crypto opcodes here"),
    }
}

fn hash1(state: &mut InterpreterState, f: impl Fn(&[u8]) -> Vec<u8>) -> Result<(), InterpreterError> {
    let item = state.main_stack.pop()?;
    state.main_stack.push(f(&item))
}

fn verify_top(state: &mut InterpreterState, err: InterpreterError) -> Result<(), InterpreterError> {
    let top = state.main_stack.pop()?;
    if !cast_to_bool(&top) {
        return Err(err);
    }
    Ok(())
}

fn op_checksig(state: &mut InterpreterState, iter: &mut OpIterator) -> Result<(), InterpreterError> {
    let pubkey = state.main_stack.pop()?;
    let sig = state.main_stack.pop()?;
    let ok = check_signature(state, iter, &sig, &pubkey)?;
    state.main_stack.push(if ok { vec![1] } else { Vec::new() })
}

/// Verifies one signature against one public key, applying `STRICT_DER`/
/// `LOW_S`/`STRICT_ENCODING` up front. An empty signature, or the absence of
/// a transaction context to hash against, is a clean `false` rather than an
/// error. Does not enforce `NULLFAIL` — callers that try several sig/pubkey
/// pairings before settling on an outcome (`do_checkmultisig`) must judge
/// `NULLFAIL` against the final result, not every attempt along the way.
fn check_signature_raw(
    state: &mut InterpreterState,
    iter: &mut OpIterator,
    sig: &[u8],
    pubkey: &[u8],
) -> Result<bool, InterpreterError> {
    if sig.is_empty() {
        return Ok(false);
    }
    let Some(tx) = state.tx() else { return Ok(false) };

    let hashbyte = crate::sig::sighash_byte(sig)?;
    let mut script_code = iter.script_code().to_vec();
    if !state.flags.contains(InterpreterFlags::FORKID) {
        let mut pattern = ScriptBytes::from_unsafe(Vec::new());
        pattern.push_slice(sig);
        script_code = ScriptBytes::from_unsafe(script_code)
            .find_and_delete(pattern.as_slice())
            .into_vec();
    }
    let digest = tx.signature_hash(state.input_index(), state.value(), &script_code, hashbyte);

    crate::sig::verify_signature(sig, pubkey, &digest, state.flags)
}

/// Single-signature form used by `OP_CHECKSIG`/`OP_CHECKSIGVERIFY`: here the
/// attempt and the outcome are the same thing, so `NULLFAIL` applies
/// directly to the result.
fn check_signature(
    state: &mut InterpreterState,
    iter: &mut OpIterator,
    sig: &[u8],
    pubkey: &[u8],
) -> Result<bool, InterpreterError> {
    let ok = check_signature_raw(state, iter, sig, pubkey)?;
    if !ok && state.flags.contains(InterpreterFlags::NULLFAIL) {
        return Err(InterpreterError::NullFailError);
    }
    Ok(ok)
}

fn op_checkmultisig(state: &mut InterpreterState, iter: &mut OpIterator) -> Result<(), InterpreterError> {
    let ok = do_checkmultisig(state, iter)?;
    state.main_stack.push(if ok { vec![1] } else { Vec::new() })
}

fn do_checkmultisig(state: &mut InterpreterState, iter: &mut OpIterator) -> Result<bool, InterpreterError> {
    let max_len = state.limits.script_num_length as usize;
    let minimal = state.flags.contains(InterpreterFlags::MINIMAL_PUSH);

    let raw_count = state.main_stack.pop()?;
    let pubkey_count = to_number(&raw_count, max_len, minimal)?;
    if pubkey_count < ScriptNum::zero() {
        return Err(InterpreterError::InvalidPublicKeyCount);
    }
    let pubkey_count = pubkey_count.to_i64_saturating();
    if pubkey_count < 0 || pubkey_count as u64 > state.limits.pubkeys_per_multisig {
        return Err(InterpreterError::InvalidPublicKeyCount);
    }
    let pubkey_count = pubkey_count as usize;
    for _ in 0..pubkey_count {
        state.bump_op_count()?;
    }
    let mut pubkeys = Vec::with_capacity(pubkey_count);
    for _ in 0..pubkey_count {
        pubkeys.push(state.main_stack.pop()?);
    }
    pubkeys.reverse();

    let raw_sig_count = state.main_stack.pop()?;
    let sig_count = to_number(&raw_sig_count, max_len, minimal)?;
    if sig_count < ScriptNum::zero() {
        return Err(InterpreterError::InvalidSignatureCount);
    }
    let sig_count = sig_count.to_i64_saturating();
    if sig_count < 0 || sig_count as usize > pubkey_count {
        return Err(InterpreterError::InvalidSignatureCount);
    }
    let sig_count = sig_count as usize;
    let mut sigs = Vec::with_capacity(sig_count);
    for _ in 0..sig_count {
        sigs.push(state.main_stack.pop()?);
    }
    sigs.reverse();

    // The off-by-one dummy element consumed by every OP_CHECKMULTISIG call.
    let dummy = state.main_stack.pop()?;
    if state.flags.contains(InterpreterFlags::NULLDUMMY) && !dummy.is_empty() {
        return Err(InterpreterError::NullDummyError);
    }

    let mut sig_idx = 0;
    let mut pk_idx = 0;
    while sig_idx < sigs.len() && pubkey_count - pk_idx >= sigs.len() - sig_idx {
        if check_signature_raw(state, iter, &sigs[sig_idx], &pubkeys[pk_idx])? {
            sig_idx += 1;
        }
        pk_idx += 1;
    }
    let is_good = sig_idx == sigs.len();
    // NULLFAIL on a multisig only binds the final outcome: trying a
    // signature against a pubkey it doesn't match (normal whenever signers
    // skip a key) is not itself a failure. On overall failure, every sig
    // left unconsumed must be empty.
    if !is_good &&
        state.flags.contains(InterpreterFlags::NULLFAIL) &&
        sigs[sig_idx..].iter().any(|sig| !sig.is_empty())
    {
        return Err(InterpreterError::NullFailError);
    }
    Ok(is_good)
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
    fn hash160_matches_reference_composition() {
        let mut s = state();
        let script = [];
        let mut iter = OpIterator::new(&script);
        s.main_stack.push(b"abc".to_vec()).unwrap();
        dispatch(&mut s, &mut iter, OP_HASH160).unwrap();
        assert_eq!(s.main_stack.pop().unwrap(), hash_hash160(b"abc").to_vec());
    }

    #[test]
    fn checksig_with_no_tx_context_is_false_not_error() {
        let mut s = state();
        let script = [];
        let mut iter = OpIterator::new(&script);
        s.main_stack.push(vec![1, 2, 3]).unwrap();
        s.main_stack.push(vec![4, 5, 6]).unwrap();
        dispatch(&mut s, &mut iter, OP_CHECKSIG).unwrap();
        assert_eq!(s.main_stack.pop().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn checksig_with_empty_sig_is_false() {
        let mut s = state();
        let script = [];
        let mut iter = OpIterator::new(&script);
        s.main_stack.push(vec![4, 5, 6]).unwrap();
        s.main_stack.push(Vec::new()).unwrap();
        dispatch(&mut s, &mut iter, OP_CHECKSIG).unwrap();
        assert_eq!(s.main_stack.pop().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn checkmultisig_rejects_pubkey_count_over_limit() {
        let mut s = state();
        let script = [];
        let mut iter = OpIterator::new(&script);
        s.main_stack.push(crate::numbers::int_to_item(1_000_000)).unwrap();
        assert_eq!(
            dispatch(&mut s, &mut iter, OP_CHECKMULTISIG).unwrap_err(),
            InterpreterError::InvalidPublicKeyCount
        );
    }

    /// Legacy (non-FORKID) signature hashing must delete the signature's own
    /// *pushdata encoding* from `script_code`, not just its raw bytes -
    /// leaving the length-prefix byte behind would corrupt every subsequent
    /// subscript fed to `tx.signature_hash`.
    #[test]
    fn legacy_signature_check_deletes_sig_pushdata_not_bare_bytes() {
        use std::cell::RefCell;

        use svscript_consensus::SighashContext;

        struct CapturingTx {
            seen: RefCell<Vec<u8>>,
        }
        impl SighashContext for CapturingTx {
            fn version(&self) -> i32 { 2 }
            fn locktime(&self) -> u32 { 0 }
            fn input_sequence(&self, _index: usize) -> u32 { 0xFFFF_FFFF }
            fn signature_hash(
                &self,
                _index: usize,
                _value: i64,
                script_code: &[u8],
                _sighash: u8,
            ) -> [u8; 32] {
                *self.seen.borrow_mut() = script_code.to_vec();
                [0u8; 32]
            }
        }

        let mut sig = vec![0x30, 0x01, 0x00, 0x01];
        sig.push(0x01); // SIGHASH_ALL, no FORKID bit

        // script_code: push(sig) OP_CHECKSIG push(sig) OP_DROP
        let mut script = vec![sig.len() as u8];
        script.extend_from_slice(&sig);
        script.push(OP_CHECKSIG);
        script.push(sig.len() as u8);
        script.extend_from_slice(&sig);
        script.push(OP_DROP);

        let tx = CapturingTx { seen: RefCell::new(Vec::new()) };
        let mut s = InterpreterState::new(
            crate::policy::InterpreterLimits::resolve(&crate::policy::InterpreterPolicy::default(), true, false),
            crate::flags::InterpreterFlags::empty(),
            true,
            Some(&tx),
            0,
            0,
        );
        let mut iter = OpIterator::new(&script);
        let _ = check_signature_raw(&mut s, &mut iter, &sig, &[]);

        assert_eq!(*tx.seen.borrow(), vec![OP_CHECKSIG, OP_DROP]);
    }
}
