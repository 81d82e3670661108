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

//! Signature and public key validation for `OP_CHECKSIG`/`OP_CHECKMULTISIG`.
//!
//! Structural validation (DER shape, low-S, pubkey encoding) is performed by
//! hand against the byte grammar so the checks apply even when `STRICT_DER`
//! rejects a signature before it ever reaches `secp256k1`; the cryptographic
//! verification itself is delegated to `secp256k1`.

use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey};
use svscript_consensus::SighashType;

use crate::flags::InterpreterFlags;
use crate::InterpreterError;

/// Checks a raw signature blob's DER envelope against the canonical BIP66
/// grammar. Does not decode it; `secp256k1::ecdsa::Signature::from_der`
/// handles that separately once this passes.
pub fn is_strict_der(sig: &[u8]) -> bool {
    // Minimum: 0x30 len 0x02 len_r r... 0x02 len_s s...
    if sig.len() < 9 || sig.len() > 73 {
        return false;
    }
    if sig[0] != 0x30 || sig[1] as usize != sig.len() - 2 {
        return false;
    }
    let len_r = sig[3] as usize;
    if 5 + len_r >= sig.len() || sig[2] != 0x02 || len_r == 0 {
        return false;
    }
    let len_s_pos = 4 + len_r;
    if sig[len_s_pos] != 0x02 {
        return false;
    }
    let len_s = sig[len_s_pos + 1] as usize;
    if len_s == 0 || 6 + len_r + len_s != sig.len() {
        return false;
    }
    // Integers must not carry a sign bit they don't need, nor leading zeroes
    // beyond what clearing that bit requires.
    let r = &sig[4..4 + len_r];
    let s = &sig[len_s_pos + 2..len_s_pos + 2 + len_s];
    for part in [r, s] {
        if part[0] & 0x80 != 0 {
            return false;
        }
        if part.len() > 1 && part[0] == 0 && part[1] & 0x80 == 0 {
            return false;
        }
    }
    true
}

/// `secp256k1`'s curve order, halved, big-endian. A signature's `s` value
/// must not exceed this under BIP62 low-S.
const HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

fn is_low_s(sig: &Signature) -> bool {
    let compact = sig.serialize_compact();
    &compact[32..] <= &HALF_ORDER[..]
}

/// Checks a public key blob's byte shape: compressed (33 bytes, 0x02/0x03
/// prefix) or uncompressed (65 bytes, 0x04 prefix).
pub fn is_strict_pubkey_encoding(pk: &[u8]) -> bool {
    match pk.len() {
        33 => pk[0] == 0x02 || pk[0] == 0x03,
        65 => pk[0] == 0x04,
        _ => false,
    }
}

/// Splits a stack signature item into its DER bytes and raw sighash byte,
/// applying `STRICT_DER`/`LOW_S` structural checks per the active flags.
fn split_and_validate(raw: &[u8], flags: InterpreterFlags) -> Result<(Signature, u8), InterpreterError> {
    let (hashbyte, der) = raw.split_last().ok_or(InterpreterError::InvalidSignature)?;
    if flags.contains(InterpreterFlags::STRICT_DER) && !is_strict_der(der) {
        return Err(InterpreterError::InvalidSignature);
    }
    let sig = Signature::from_der(der).map_err(|_| InterpreterError::InvalidSignature)?;
    if flags.contains(InterpreterFlags::LOW_S) && !is_low_s(&sig) {
        return Err(InterpreterError::InvalidSignature);
    }
    Ok((sig, *hashbyte))
}

/// Verifies a `scriptSig`-supplied signature against a public key blob and a
/// precomputed sighash digest, enforcing `STRICT_ENCODING`/`STRICT_DER`/
/// `LOW_S` as configured. `sighash_ty` is returned so the caller can use it
/// to recompute the digest under that input's own script code.
pub fn verify_signature(
    raw_sig: &[u8],
    raw_pubkey: &[u8],
    digest: &[u8; 32],
    flags: InterpreterFlags,
) -> Result<bool, InterpreterError> {
    if flags.contains(InterpreterFlags::STRICT_ENCODING) && !is_strict_pubkey_encoding(raw_pubkey) {
        return Err(InterpreterError::InvalidPublicKeyEncoding);
    }
    let (sig, _hashbyte) = split_and_validate(raw_sig, flags)?;
    let pubkey = match PublicKey::from_slice(raw_pubkey) {
        Ok(pk) => pk,
        Err(_) => return Ok(false),
    };
    let message = Message::from_digest(*digest);
    Ok(sig.verify(message, &pubkey).is_ok())
}

/// Extracts the raw sighash type byte from a signature item without
/// performing full DER validation, used to compute the correct digest
/// before signature verification itself runs.
pub fn sighash_byte(raw_sig: &[u8]) -> Result<u8, InterpreterError> {
    raw_sig.last().copied().ok_or(InterpreterError::InvalidSignature)
}

pub fn decode_sighash_type(byte: u8) -> Result<SighashType, InterpreterError> {
    SighashType::from_standard_u8(byte).map_err(|_| InterpreterError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_der() {
        assert!(!is_strict_der(&[0x30, 0x00]));
    }

    #[test]
    fn rejects_bad_pubkey_length() {
        assert!(!is_strict_pubkey_encoding(&[0x02; 32]));
        assert!(!is_strict_pubkey_encoding(&[0x05; 33]));
    }

    #[test]
    fn accepts_compressed_pubkey_prefixes() {
        let mut pk = [0u8; 33];
        pk[0] = 0x02;
        assert!(is_strict_pubkey_encoding(&pk));
        pk[0] = 0x03;
        assert!(is_strict_pubkey_encoding(&pk));
    }

    #[test]
    fn sighash_byte_reads_trailing_byte() {
        assert_eq!(sighash_byte(&[1, 2, 3, 0x41]).unwrap(), 0x41);
        assert!(sighash_byte(&[]).is_err());
    }
}
