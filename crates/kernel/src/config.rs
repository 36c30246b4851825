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

//! Config is created by the embedding simulation (or the runner's CLI / config file layer) and
//! handed to every world and environment it creates.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub runtime: RuntimeConfig,
    pub semantics: SemanticsConfig,
}

/// Resource limits and timing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Deepest nesting of `call_script` frames a thread may reach.
    pub max_call_depth: usize,
    /// Largest operand stack a thread may grow.
    pub max_stack_size: usize,
    /// Instructions a thread may execute in one run before it is made to yield until the next
    /// tick.
    pub max_instructions_per_run: usize,
    /// Simulated time per tick, used to convert `sleep` durations into ticks.
    pub tick_duration_ms: u32,
    /// Seed for every environment's random source. Each unit mixes in its own id.
    pub seed: u64,
    /// How many fault reports the world retains.
    pub max_diagnostics: usize,
    /// How many undrained effects the world retains; the oldest are dropped first.
    pub max_pending_effects: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 64,
            max_stack_size: 1024,
            max_instructions_per_run: 100_000,
            tick_duration_ms: 33,
            seed: 0,
            max_diagnostics: 100,
            max_pending_effects: 10_000,
        }
    }
}

/// Interpreter behaviours that are not pinned down by the instruction set itself, selectable so
/// that runs can be validated against reference replays.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticsConfig {
    pub operand_order: OperandOrder,
    pub divide_by_zero: DivideByZero,
}

/// Which operand of a binary instruction sits on top of the stack.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperandOrder {
    /// `left` is pushed first, so `right` is popped first.
    #[default]
    RightOnTop,
    LeftOnTop,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DivideByZero {
    /// Fault the thread.
    #[default]
    Fault,
    /// Push zero and carry on.
    Zero,
}

impl RuntimeConfig {
    /// Number of ticks a `sleep` of `ms` milliseconds lasts. Never less than one, so that a sleep
    /// always yields to the next tick.
    pub fn sleep_ticks(&self, ms: i32) -> u64 {
        let ms = ms.max(0) as u64;
        let tick = u64::from(self.tick_duration_ms.max(1));
        ms.div_ceil(tick).max(1)
    }
}
