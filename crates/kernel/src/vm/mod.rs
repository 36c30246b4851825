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

use std::fmt::{Display, Formatter};

use armature_script::{Axis, PieceId};
use serde::{Deserialize, Serialize};

pub use environment::{Environment, StartError};
pub use execute::{ExecParams, run_thread};
pub use fault::{FaultKind, ThreadFault};
pub use frame::Frame;
pub use thread::{RunState, Thread};
pub use vm_host::ScriptHost;

pub mod environment;
pub(crate) mod execute;
pub mod fault;
pub mod frame;
pub mod thread;
pub mod vm_host;

/// Simulation time, in ticks since the world started.
pub type Tick = u64;

/// Identifies a thread within its environment. Allocated in increasing order, so ordering by id
/// is ordering by creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub u64);

impl Display for ThreadId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct UnitId(pub u32);

impl Display for UnitId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unit:{}", self.0)
    }
}

/// Why a thread gave up the rest of its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// Until the world reaches tick `until`.
    Sleep { until: Tick },
    /// Until the piece stops moving along `axis`.
    Move { piece: PieceId, axis: Axis },
    /// Until the piece finishes turning about `axis`.
    Turn { piece: PieceId, axis: Axis },
}

/// The outcome of one run of a thread, handed back to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The instruction budget ran out; the thread is still ready.
    Continuing,
    /// The thread is waiting on something and should be resumed once it clears.
    Blocked(BlockReason),
    /// The entry frame returned.
    Finished,
    /// The thread's own `send_signal` matched its mask.
    Killed { signal: u32 },
    Faulted(ThreadFault),
}

impl Status {
    /// Whether the thread should go back into its environment.
    pub fn is_live(&self) -> bool {
        matches!(self, Status::Continuing | Status::Blocked(_))
    }
}
