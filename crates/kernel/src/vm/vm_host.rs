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

use armature_script::PieceId;

use crate::pieces::PieceSet;
use crate::vm::{ThreadFault, ThreadId, UnitId};

/// The narrow surface a running script reaches outside of its own environment through.
///
/// The interpreter owns no simulation state. Piece animation, visual effects, the per-unit value
/// registry and fault diagnostics all belong to whoever embeds it; the reference implementation
/// is the world's per-unit host, and tests substitute a recording mock.
pub trait ScriptHost {
    /// The unit whose scripts are currently running.
    fn unit(&self) -> UnitId;

    fn pieces(&self) -> &PieceSet;

    fn pieces_mut(&mut self) -> &mut PieceSet;

    /// Blow `piece` off the model. `kind` is passed through uninterpreted.
    fn explode(&mut self, piece: PieceId, kind: i32);

    fn emit_smoke(&mut self, piece: PieceId, kind: i32);

    /// Carry another unit (identified by the script's own value for it) on `piece`.
    fn attach_unit(&mut self, piece: PieceId, unit: i32);

    fn detach_unit(&mut self, unit: i32);

    /// Read from the unit's value registry. Unknown keys read as zero.
    fn unit_value(&self, key: i32) -> i32;

    fn set_unit_value(&mut self, key: i32, value: i32);

    /// A thread of this unit faulted and has been discarded.
    fn report_fault(&mut self, thread: ThreadId, fault: &ThreadFault);
}
