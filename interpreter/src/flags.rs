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

use bitflags::bitflags;

bitflags! {
    /// Optional consensus/policy checks, wire-compatible with the reference
    /// bit assignment so a serialized flag set round-trips across engines.
    #[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
    pub struct InterpreterFlags: u32 {
        const MINIMAL_PUSH = 0x0001;
        const MINIMAL_IF = 0x0002;
        const STRICT_DER = 0x0004;
        const LOW_S = 0x0008;
        const STRICT_ENCODING = 0x0010;
        const NULLFAIL = 0x0020;
        const NULLDUMMY = 0x0040;
        const REJECT_UPGRADEABLE_NOPS = 0x0080;
        const FORKID = 0x0100;
        const CLTV = 0x0200;
        const CSV = 0x0400;
        const P2SH = 0x0800;
        const PUSH_ONLY = 0x1000;
        const CLEANSTACK = 0x2000;
    }
}

impl InterpreterFlags {
    /// Applies the cross-flag consistency rules: `FORKID` implies
    /// `STRICT_ENCODING`, `CLEANSTACK` requires `P2SH`, and a post-genesis
    /// UTXO clears the pre-genesis-only `{CLTV, CSV, P2SH}` bits (those
    /// checks are subsumed by post-genesis consensus rules elsewhere).
    pub fn sanitize(mut self, is_utxo_after_genesis: bool) -> Self {
        if is_utxo_after_genesis {
            self.remove(Self::CLTV | Self::CSV | Self::P2SH);
        }
        if self.contains(Self::FORKID) {
            self |= Self::STRICT_ENCODING;
        }
        if !self.contains(Self::P2SH) {
            self.remove(Self::CLEANSTACK);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forkid_implies_strict_encoding() {
        let flags = InterpreterFlags::FORKID.sanitize(false);
        assert!(flags.contains(InterpreterFlags::STRICT_ENCODING));
    }

    #[test]
    fn cleanstack_without_p2sh_is_cleared() {
        let flags = InterpreterFlags::CLEANSTACK.sanitize(false);
        assert!(!flags.contains(InterpreterFlags::CLEANSTACK));
    }

    #[test]
    fn post_genesis_clears_legacy_flags() {
        let flags = (InterpreterFlags::CLTV | InterpreterFlags::CSV | InterpreterFlags::P2SH)
            .sanitize(true);
        assert!(flags.is_empty());
    }
}
