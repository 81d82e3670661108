// Bitcoin script interpreter core library.
//
// SPDX-License-Identifier: Apache-2.0
//
// Designed in 2019-2025 by Dr Maxim Orlovsky <orlovsky@lnp-bp.org>
// Written in 2024-2025 by Dr Maxim Orlovsky <orlovsky@lnp-bp.org>
//
// Copyright (C) 2019-2024 LNP/BP Standards Association, Switzerland.
// Copyright (C) 2024-2025 LNP/BP Labs, Institute for Distributed and Cognitive Systems (InDCS).
// Copyright (C) 2019-2025 Dr Maxim Orlovsky.
// All rights under the above copyrights are reserved.
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

use amplify::{Bytes20, Wrapper};
use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::RedeemScript;

/// `RIPEMD160(data)`.
pub fn hash_ripemd160(data: &[u8]) -> [u8; 20] { Ripemd160::digest(data).into() }

/// `SHA1(data)`. Only ever reached from `OP_SHA1`; SHA-1 is not used in any
/// address or commitment scheme this crate deals with.
pub fn hash_sha1(data: &[u8]) -> [u8; 20] { Sha1::digest(data).into() }

/// `SHA256(data)`.
pub fn hash_sha256(data: &[u8]) -> [u8; 32] { Sha256::digest(data).into() }

/// `SHA256(SHA256(data))`, used by `OP_HASH256` and legacy signature hashing.
pub fn hash_sha256d(data: &[u8]) -> [u8; 32] { Sha256::digest(Sha256::digest(data)).into() }

/// `RIPEMD160(SHA256(data))`, used by `OP_HASH160` and P2PKH/P2SH addressing.
pub fn hash_hash160(data: &[u8]) -> [u8; 20] { Ripemd160::digest(Sha256::digest(data)).into() }

#[derive(Wrapper, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, From)]
#[wrapper(Index, RangeOps, AsSlice, BorrowSlice, Hex, Display, FromStr)]
pub struct PubkeyHash(#[from] #[from([u8; 20])] pub Bytes20);

impl From<PubkeyHash> for [u8; 20] {
    fn from(value: PubkeyHash) -> Self { value.0.into_inner() }
}

impl From<&[u8]> for PubkeyHash {
    fn from(pk: &[u8]) -> Self { Self(hash_hash160(pk).into()) }
}

#[derive(Wrapper, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, From)]
#[wrapper(Index, RangeOps, AsSlice, BorrowSlice, Hex, Display, FromStr)]
pub struct ScriptHash(#[from] #[from([u8; 20])] pub Bytes20);

impl From<ScriptHash> for [u8; 20] {
    fn from(value: ScriptHash) -> Self { value.0.into_inner() }
}

impl From<&RedeemScript> for ScriptHash {
    fn from(redeem_script: &RedeemScript) -> Self { Self(hash_hash160(redeem_script.as_slice()).into()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash160_matches_composition() {
        let data = b"bitcoin script interpreter";
        assert_eq!(hash_hash160(data), hash_ripemd160(&hash_sha256(data)));
    }

    #[test]
    fn sha256d_matches_composition() {
        let data = b"bitcoin script interpreter";
        assert_eq!(hash_sha256d(data), hash_sha256(&hash_sha256(data)));
    }

    #[test]
    fn pubkey_hash_roundtrips_bytes() {
        let raw = [7u8; 20];
        let h = PubkeyHash::from(raw);
        let back: [u8; 20] = h.into();
        assert_eq!(raw, back);
    }
}
