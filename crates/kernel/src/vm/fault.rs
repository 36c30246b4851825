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

use armature_script::{PieceId, ScriptId};
use thiserror::Error;

/// What went wrong when a thread faulted.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    #[error("no instruction at this position")]
    UnknownOpcode,
    #[error("operand stack underflow")]
    StackUnderflow,
    #[error("slot {slot} out of range (size {size})")]
    OutOfRange { slot: usize, size: usize },
    #[error("arithmetic fault")]
    ArithmeticFault,
    #[error("stack overflow (limit {limit})")]
    StackOverflow { limit: usize },
    #[error("unknown piece {0:?}")]
    UnknownPiece(PieceId),
    #[error("unknown script {0:?}")]
    UnknownScript(ScriptId),
}

/// A fault, pinned to the instruction that raised it.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("{kind} at ip {ip}")]
pub struct ThreadFault {
    pub ip: usize,
    pub kind: FaultKind,
}

impl ThreadFault {
    pub fn new(ip: usize, kind: FaultKind) -> Self {
        Self { ip, kind }
    }
}
