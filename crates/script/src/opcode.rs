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

use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, IntoStaticStr};

/// An absolute position in a module's instruction vector.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Offset(pub u32);

impl Offset {
    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for Offset {
    fn from(value: usize) -> Self {
        Offset(value as u32)
    }
}

/// Stable index of a named piece in a module's piece table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PieceId(pub u16);

impl PieceId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a named entry point in a module's script table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptId(pub u16);

impl ScriptId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A degree of freedom a piece can be moved or rotated along.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumCount,
)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// The closed set of instructions understood by the interpreter.
///
/// Operands that the script author fixes at compile time (pieces, axes, scripts, slots, jump
/// targets, constants) are carried in the instruction; everything else travels on the thread's
/// operand stack.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
pub enum Op {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,

    // Comparison
    Lt,
    Le,
    Eq,
    Ne,
    Gt,
    Ge,

    // Control flow
    Jump(Offset),
    JumpIfZero(Offset),

    // Boolean logic
    LogicalAnd,
    LogicalOr,
    LogicalXor,
    LogicalNot,

    // Bitwise logic
    BitAnd,
    BitOr,
    BitXor,
    BitNot,

    // Piece control
    /// Pops target then speed.
    MoveObject { piece: PieceId, axis: Axis },
    /// Pops target.
    MoveObjectNow { piece: PieceId, axis: Axis },
    /// Pops target angle then angular speed.
    TurnObject { piece: PieceId, axis: Axis },
    /// Pops target angle.
    TurnObjectNow { piece: PieceId, axis: Axis },
    /// Pops angular speed then acceleration.
    SpinObject { piece: PieceId, axis: Axis },
    /// Pops deceleration.
    StopSpinObject { piece: PieceId, axis: Axis },
    /// Pops explosion kind.
    Explode(PieceId),
    /// Pops smoke kind.
    EmitSmoke(PieceId),
    ShowObject(PieceId),
    HideObject(PieceId),
    EnableShading(PieceId),
    DisableShading(PieceId),
    EnableCaching(PieceId),
    DisableCaching(PieceId),
    /// Pops piece index then unit.
    AttachUnit,
    /// Pops unit.
    DetachUnit,

    // Blocking
    WaitForMove { piece: PieceId, axis: Axis },
    WaitForTurn { piece: PieceId, axis: Axis },
    /// Pops a duration in milliseconds.
    Sleep,

    // Script dispatch
    CallScript { script: ScriptId, argc: u8 },
    StartScript { script: ScriptId, argc: u8 },
    ReturnFromScript,

    // Signalling
    /// Pops signal bits.
    SendSignal,
    /// Pops the new mask.
    SetSignalMask,

    // Variables
    CreateLocalVariable,
    PushConstant(i32),
    PushLocalVariable(u16),
    PopLocalVariable(u16),
    PushStaticVariable(u16),
    PopStaticVariable(u16),
    PopStack,

    // Unit telemetry
    /// Pops key, pushes value.
    GetUnitValue,
    /// Pops value then key.
    SetUnitValue,

    // Utility
    /// Pops upper then lower bound, pushes a value in the inclusive range.
    RandomNumber,
}

impl Op {
    /// The opcode's name, for logging.
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Jump target encoded in this instruction, if any.
    pub fn jump_target(&self) -> Option<Offset> {
        match self {
            Op::Jump(target) | Op::JumpIfZero(target) => Some(*target),
            _ => None,
        }
    }

    /// Piece referenced by this instruction's operands, if any.
    pub fn piece(&self) -> Option<PieceId> {
        match self {
            Op::MoveObject { piece, .. }
            | Op::MoveObjectNow { piece, .. }
            | Op::TurnObject { piece, .. }
            | Op::TurnObjectNow { piece, .. }
            | Op::SpinObject { piece, .. }
            | Op::StopSpinObject { piece, .. }
            | Op::WaitForMove { piece, .. }
            | Op::WaitForTurn { piece, .. }
            | Op::Explode(piece)
            | Op::EmitSmoke(piece)
            | Op::ShowObject(piece)
            | Op::HideObject(piece)
            | Op::EnableShading(piece)
            | Op::DisableShading(piece)
            | Op::EnableCaching(piece)
            | Op::DisableCaching(piece) => Some(*piece),
            _ => None,
        }
    }

    /// Script referenced by this instruction's operands, if any.
    pub fn script(&self) -> Option<ScriptId> {
        match self {
            Op::CallScript { script, .. } | Op::StartScript { script, .. } => Some(*script),
            _ => None,
        }
    }

    /// Static slot referenced by this instruction's operands, if any.
    pub fn static_slot(&self) -> Option<u16> {
        match self {
            Op::PushStaticVariable(slot) | Op::PopStaticVariable(slot) => Some(*slot),
            _ => None,
        }
    }
}
