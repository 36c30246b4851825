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

//! Runtime for unit animation scripts: per-unit environments, cooperative threads, the
//! interpreter and its tick scheduler, plus a small reference world to drive them.

pub use crate::config::{Config, DivideByZero, OperandOrder, RuntimeConfig, SemanticsConfig};
pub use crate::pieces::{PieceSet, PieceState};
pub use crate::tasks::{TickReport, run_tick};
pub use crate::vm::{
    BlockReason, Environment, FaultKind, RunState, ScriptHost, StartError, Status, Thread,
    ThreadFault, ThreadId, Tick, UnitId,
};
pub use crate::world::{Diagnostic, Effect, World, WorldError};

pub mod config;
pub mod pieces;
pub mod tasks;
pub mod vm;
pub mod world;

pub mod testing;
