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

//! End-to-end `verify_script` scenarios spanning P2PKH, multisig, P2SH-style
//! flag interactions and post-genesis `OP_RETURN` behavior.

use secp256k1::{Message, Secp256k1, SecretKey};
use svscript_consensus::opcodes::*;
use svscript_consensus::{hash_hash160, ScriptPubkey, SigScript, SighashContext};
use svscript_interpreter::{InterpreterFlags, InterpreterLimits, InterpreterPolicy, InterpreterState};

/// A fixed, content-independent signature hash: exercising the opcode state
/// machine and signature plumbing does not require a real transaction
/// serialization, only a digest that is stable across the calls one
/// `verify_script` run makes.
struct FixedDigestTx;

impl SighashContext for FixedDigestTx {
    fn version(&self) -> i32 { 2 }
    fn locktime(&self) -> u32 { 0 }
    fn input_sequence(&self, _index: usize) -> u32 { 0xFFFF_FFFF }
    fn signature_hash(&self, _index: usize, _value: i64, _script_code: &[u8], _sighash: u8) -> [u8; 32] {
        svscript_consensus::hash_sha256(b"fixed test digest")
    }
}

fn push(data: &[u8]) -> Vec<u8> {
    assert!(data.len() <= 75);
    let mut out = vec![data.len() as u8];
    out.extend_from_slice(data);
    out
}

fn sign_fixed_digest(secret: &SecretKey) -> Vec<u8> {
    let secp = Secp256k1::signing_only();
    let digest = svscript_consensus::hash_sha256(b"fixed test digest");
    let message = Message::from_digest(digest);
    let sig = secp.sign_ecdsa(message, secret);
    let mut bytes = sig.serialize_der().to_vec();
    bytes.push(0x41); // SIGHASH_ALL | SIGHASH_FORKID
    bytes
}

fn base_limits() -> InterpreterLimits {
    InterpreterLimits::resolve(&InterpreterPolicy::default(), true, false)
}

#[test]
fn trivial_truth() {
    let script_sig = SigScript::from_unsafe(push(&[1]));
    let script_pubkey = ScriptPubkey::from_unsafe(Vec::new());
    let mut state = InterpreterState::new(base_limits(), InterpreterFlags::empty(), true, None, 0, 0);
    assert_eq!(svscript_interpreter::verify_script(&mut state, &script_sig, &script_pubkey), Ok(true));
}

#[test]
fn p2pkh_happy_path() {
    let secp = Secp256k1::new();
    let secret = SecretKey::from_slice(&[0x11; 32]).unwrap();
    let pubkey = secret.public_key(&secp).serialize().to_vec();
    let pubkey_hash = hash_hash160(&pubkey);

    let mut script_pubkey_bytes = vec![OP_DUP, OP_HASH160];
    script_pubkey_bytes.extend(push(&pubkey_hash));
    script_pubkey_bytes.push(OP_EQUALVERIFY);
    script_pubkey_bytes.push(OP_CHECKSIG);
    let script_pubkey = ScriptPubkey::from_unsafe(script_pubkey_bytes);

    let sig = sign_fixed_digest(&secret);
    let mut script_sig_bytes = push(&sig);
    script_sig_bytes.extend(push(&pubkey));
    let script_sig = SigScript::from_unsafe(script_sig_bytes);

    let tx = FixedDigestTx;
    let flags = InterpreterFlags::FORKID | InterpreterFlags::NULLFAIL;
    let mut state = InterpreterState::new(base_limits(), flags, true, Some(&tx), 0, 0);
    assert_eq!(svscript_interpreter::verify_script(&mut state, &script_sig, &script_pubkey), Ok(true));
}

#[test]
fn p2pkh_wrong_key_fails_equalverify() {
    let secp = Secp256k1::new();
    let secret = SecretKey::from_slice(&[0x11; 32]).unwrap();
    let wrong_secret = SecretKey::from_slice(&[0x22; 32]).unwrap();
    let pubkey = secret.public_key(&secp).serialize().to_vec();
    let wrong_pubkey = wrong_secret.public_key(&secp).serialize().to_vec();
    let pubkey_hash = hash_hash160(&pubkey);

    let mut script_pubkey_bytes = vec![OP_DUP, OP_HASH160];
    script_pubkey_bytes.extend(push(&pubkey_hash));
    script_pubkey_bytes.push(OP_EQUALVERIFY);
    script_pubkey_bytes.push(OP_CHECKSIG);
    let script_pubkey = ScriptPubkey::from_unsafe(script_pubkey_bytes);

    let sig = sign_fixed_digest(&wrong_secret);
    let mut script_sig_bytes = push(&sig);
    script_sig_bytes.extend(push(&wrong_pubkey));
    let script_sig = SigScript::from_unsafe(script_sig_bytes);

    let tx = FixedDigestTx;
    let mut state = InterpreterState::new(
        base_limits(),
        InterpreterFlags::FORKID,
        true,
        Some(&tx),
        0,
        0,
    );
    assert_eq!(
        svscript_interpreter::verify_script(&mut state, &script_sig, &script_pubkey),
        Err(svscript_interpreter::InterpreterError::EqualVerifyFailed)
    );
}

#[test]
fn multisig_nulldummy_violation() {
    let secp = Secp256k1::new();
    let s1 = SecretKey::from_slice(&[0x01; 32]).unwrap();
    let s2 = SecretKey::from_slice(&[0x02; 32]).unwrap();
    let s3 = SecretKey::from_slice(&[0x03; 32]).unwrap();
    let pk1 = s1.public_key(&secp).serialize().to_vec();
    let pk2 = s2.public_key(&secp).serialize().to_vec();
    let pk3 = s3.public_key(&secp).serialize().to_vec();

    let mut script_pubkey_bytes = vec![OP_PUSHNUM_2];
    script_pubkey_bytes.extend(push(&pk1));
    script_pubkey_bytes.extend(push(&pk2));
    script_pubkey_bytes.extend(push(&pk3));
    script_pubkey_bytes.push(OP_PUSHNUM_3);
    script_pubkey_bytes.push(OP_CHECKMULTISIG);
    let script_pubkey = ScriptPubkey::from_unsafe(script_pubkey_bytes);

    let sig1 = sign_fixed_digest(&s1);
    let sig2 = sign_fixed_digest(&s2);
    // NULLDUMMY requires the off-by-one dummy element to be empty; push a
    // non-empty byte instead.
    let mut script_sig_bytes = push(&[0x01]);
    script_sig_bytes.extend(push(&sig1));
    script_sig_bytes.extend(push(&sig2));
    let script_sig = SigScript::from_unsafe(script_sig_bytes);

    let tx = FixedDigestTx;
    let flags = InterpreterFlags::FORKID | InterpreterFlags::NULLDUMMY;
    let mut state = InterpreterState::new(base_limits(), flags, true, Some(&tx), 0, 0);
    assert_eq!(
        svscript_interpreter::verify_script(&mut state, &script_sig, &script_pubkey),
        Err(svscript_interpreter::InterpreterError::NullDummyError)
    );
}

#[test]
fn multisig_skipping_a_pubkey_does_not_trip_nullfail() {
    // 2-of-3 using signers 1 and 3: the greedy matcher tries sig1 against
    // pk1 (matches), then sig3 against pk2 (fails) before pk3 (matches).
    // That intermediate failed attempt is normal and must not raise
    // NullFailError even with NULLFAIL mandatory.
    let secp = Secp256k1::new();
    let s1 = SecretKey::from_slice(&[0x01; 32]).unwrap();
    let s2 = SecretKey::from_slice(&[0x02; 32]).unwrap();
    let s3 = SecretKey::from_slice(&[0x03; 32]).unwrap();
    let pk1 = s1.public_key(&secp).serialize().to_vec();
    let pk2 = s2.public_key(&secp).serialize().to_vec();
    let pk3 = s3.public_key(&secp).serialize().to_vec();

    let mut script_pubkey_bytes = vec![OP_PUSHNUM_2];
    script_pubkey_bytes.extend(push(&pk1));
    script_pubkey_bytes.extend(push(&pk2));
    script_pubkey_bytes.extend(push(&pk3));
    script_pubkey_bytes.push(OP_PUSHNUM_3);
    script_pubkey_bytes.push(OP_CHECKMULTISIG);
    let script_pubkey = ScriptPubkey::from_unsafe(script_pubkey_bytes);

    let sig1 = sign_fixed_digest(&s1);
    let sig3 = sign_fixed_digest(&s3);
    let mut script_sig_bytes = push(&[]);
    script_sig_bytes.extend(push(&sig1));
    script_sig_bytes.extend(push(&sig3));
    let script_sig = SigScript::from_unsafe(script_sig_bytes);

    let tx = FixedDigestTx;
    let flags = InterpreterFlags::FORKID | InterpreterFlags::NULLFAIL;
    let mut state = InterpreterState::new(base_limits(), flags, true, Some(&tx), 0, 0);
    assert_eq!(svscript_interpreter::verify_script(&mut state, &script_sig, &script_pubkey), Ok(true));
}

#[test]
fn op_return_after_genesis_halts_without_error() {
    let mut script_pubkey_bytes = push(&[1]);
    script_pubkey_bytes.push(OP_RETURN);
    // Bytes after OP_RETURN are never reached; OP_VER would be invalid if
    // they were.
    script_pubkey_bytes.push(OP_VER);
    let script_pubkey = ScriptPubkey::from_unsafe(script_pubkey_bytes);
    let script_sig = SigScript::from_unsafe(Vec::new());

    let mut state = InterpreterState::new(base_limits(), InterpreterFlags::empty(), true, None, 0, 0);
    assert_eq!(svscript_interpreter::verify_script(&mut state, &script_sig, &script_pubkey), Ok(true));
}

#[test]
fn non_top_level_op_return_does_not_mask_unbalanced_conditional() {
    // OP_1 OP_IF OP_RETURN OP_2, missing OP_ENDIF: the OP_RETURN is inside an
    // open OP_IF, so it must not terminate evaluation early - the script
    // keeps running far enough that the missing OP_ENDIF is still caught.
    let script_pubkey_bytes = vec![OP_PUSHNUM_1, OP_IF, OP_RETURN, OP_PUSHNUM_2];
    let script_pubkey = ScriptPubkey::from_unsafe(script_pubkey_bytes);
    let script_sig = SigScript::from_unsafe(Vec::new());

    let mut state = InterpreterState::new(base_limits(), InterpreterFlags::empty(), true, None, 0, 0);
    assert_eq!(
        svscript_interpreter::verify_script(&mut state, &script_sig, &script_pubkey),
        Err(svscript_interpreter::InterpreterError::UnbalancedConditional)
    );
}

#[test]
fn clean_stack_violation_is_rejected() {
    let script_sig = SigScript::from_unsafe({
        let mut b = push(&[1]);
        b.extend(push(&[1]));
        b
    });
    let script_pubkey = ScriptPubkey::from_unsafe(Vec::new());

    let mut state = InterpreterState::new(
        base_limits(),
        InterpreterFlags::CLEANSTACK | InterpreterFlags::P2SH,
        true,
        None,
        0,
        0,
    );
    assert_eq!(
        svscript_interpreter::verify_script(&mut state, &script_sig, &script_pubkey),
        Err(svscript_interpreter::InterpreterError::CleanStackError)
    );
}
