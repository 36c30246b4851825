// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use crate::opcode::{Offset, PieceId, ScriptId};
use thiserror::Error;

/// Failures looking up symbols in, or assembling, a script module.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModuleError {
    #[error("Unknown entry point: {0}")]
    UnknownEntryPoint(String),
    #[error("Unknown piece: {0}")]
    UnknownPiece(String),
    #[error("Duplicate entry point: {0}")]
    DuplicateEntryPoint(String),
    #[error("Duplicate piece: {0}")]
    DuplicatePiece(String),
    #[error("Module declares {0} pieces, more than a piece id can address")]
    TooManyPieces(usize),
    #[error("Module declares {0} entry points, more than a script id can address")]
    TooManyScripts(usize),
    #[error("Entry point {0} was declared but never given a body")]
    UndefinedEntryPoint(String),
    #[error("Entry point {name} declares {params} parameters but only {locals} locals")]
    ParamsExceedLocals { name: String, params: u16, locals: u16 },
    #[error("Entry point {name} starts at {offset:?}, past the end of the code")]
    EntryOutOfRange { name: String, offset: Offset },
    #[error("Instruction at {at} jumps to {target:?}, past the end of the code")]
    JumpOutOfRange { at: usize, target: Offset },
    #[error("Instruction at {at} references undeclared script {script:?}")]
    ScriptOutOfRange { at: usize, script: ScriptId },
    #[error("Instruction at {at} references undeclared piece {piece:?}")]
    PieceOutOfRange { at: usize, piece: PieceId },
    #[error("Instruction at {at} references static slot {slot}, module has {count}")]
    StaticOutOfRange { at: usize, slot: u16, count: u16 },
    #[error("Instruction at {at} passes {argc} arguments to {name}, which has {locals} locals")]
    TooManyArguments {
        at: usize,
        name: String,
        argc: u8,
        locals: u16,
    },
    #[error("Instruction at {0} is not a jump and cannot be patched")]
    NotAJump(usize),
}
