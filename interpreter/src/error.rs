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

/// The closed set of ways script evaluation can fail. Every variant is
/// terminal: the first one raised aborts evaluation. An empty main stack or
/// a false top-of-stack at end-of-script are not represented here — the
/// orchestrator reports those as `Ok(false)`, never as an error.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum InterpreterError {
    /// script exceeds the configured size limit.
    ScriptTooLarge,

    /// script executed more non-push opcodes than the configured limit.
    TooManyOps,

    /// a pushed item exceeds the configured item size limit.
    InvalidPushSize,

    /// stack did not have enough items for the requested operation.
    InvalidStackOperation,

    /// combined stack size or memory usage exceeds the configured limit.
    StackSizeTooLarge,

    /// OP_2MUL/OP_2DIV were executed; both opcodes are permanently disabled.
    DisabledOpcode,

    /// opcode has no defined behavior, or OP_VERIF/OP_VERNOTIF was executed.
    InvalidOpcode,

    /// a push was not encoded with the shortest possible opcode, or a number
    /// was not minimally encoded, while the corresponding flag was set.
    MinimalEncodingError,

    /// OP_IF/OP_NOTIF saw a top-of-stack item that was not a minimally
    /// encoded boolean while MINIMAL_IF was set.
    MinimalIfError,

    /// a stray OP_ELSE/OP_ENDIF was seen, or an OP_IF was left unterminated.
    UnbalancedConditional,

    /// OP_VERIFY saw a false top-of-stack item.
    VerifyFailed,

    /// OP_EQUALVERIFY saw unequal operands.
    EqualVerifyFailed,

    /// OP_NUMEQUALVERIFY saw unequal operands.
    NumEqualVerifyFailed,

    /// OP_CHECKSIGVERIFY saw a failing signature.
    CheckSigVerifyFailed,

    /// OP_CHECKMULTISIGVERIFY saw a failing multisig.
    CheckMultiSigVerifyFailed,

    /// OP_RETURN was executed under pre-genesis rules.
    OpReturnError,

    /// a number's byte length exceeds the configured script_num_length.
    InvalidNumber,

    /// a bitwise binary operator's operands were not equal in length.
    InvalidOperandSize,

    /// OP_NUM2BIN's value does not fit in the requested byte length.
    ImpossibleEncoding,

    /// OP_SPLIT's position argument is out of range for the input.
    InvalidSplit,

    /// a shift opcode was executed with a negative count.
    NegativeShiftCount,

    /// OP_DIV or OP_MOD was executed with a zero divisor.
    DivisionByZero,

    /// a public key failed STRICT_ENCODING validation.
    InvalidPublicKeyEncoding,

    /// a signature failed DER, low-S, or sighash-type validation.
    InvalidSignature,

    /// NULLFAIL was set and a failing signature was not the empty item.
    NullFailError,

    /// NULLDUMMY was set and the multisig dummy was not the empty item.
    NullDummyError,

    /// OP_CHECKMULTISIG's public key count is out of range.
    InvalidPublicKeyCount,

    /// OP_CHECKMULTISIG's signature count is out of range.
    InvalidSignatureCount,

    /// an upgradeable NOP was executed while REJECT_UPGRADEABLE_NOPS was set.
    UpgradeableNopError,

    /// OP_CHECKLOCKTIMEVERIFY/OP_CHECKSEQUENCEVERIFY precondition violated.
    LockTimeError,

    /// a non-pushdata opcode appeared in scriptSig under PUSH_ONLY or P2SH.
    PushOnlyError,

    /// CLEANSTACK was set and more than one item remained after success.
    CleanStackError,

    /// a pushdata's declared length exceeds the remaining script bytes.
    TruncatedScriptError,
}
