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

//! The compiled form of unit scripts: a closed instruction set, the symbol tables that name
//! pieces and entry points, and the module type every unit instance of a type shares.

pub use errors::ModuleError;
pub use module::{EntryPoint, Module, ModuleBuilder, ModuleDefinition};
pub use opcode::{Axis, Offset, Op, PieceId, ScriptId};
pub use units::{
    ANGULAR_SCALE, LINEAR_SCALE, angle_from_fixed, angle_to_fixed, linear_from_fixed,
    linear_to_fixed,
};

mod errors;
mod module;
mod opcode;
pub mod units;
