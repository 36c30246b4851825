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

use tracing::debug;

use crate::config::Config;
use crate::vm::environment::Environment;
use crate::vm::execute::{ExecParams, run_thread};
use crate::vm::vm_host::ScriptHost;
use crate::vm::{BlockReason, RunState, Status, ThreadFault, ThreadId, Tick};

/// What happened to an environment's threads during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Threads that executed at least one instruction.
    pub ran: Vec<ThreadId>,
    /// Threads still blocked at the end of the tick.
    pub blocked: Vec<ThreadId>,
    pub finished: Vec<ThreadId>,
    /// Threads terminated by a signal, whether raised by themselves or a sibling.
    pub killed: Vec<ThreadId>,
    pub faulted: Vec<(ThreadId, ThreadFault)>,
}

/// Whether the condition a thread blocked on has cleared by tick `now`.
fn is_cleared(reason: BlockReason, host: &dyn ScriptHost, now: Tick) -> bool {
    match reason {
        BlockReason::Sleep { until } => now >= until,
        BlockReason::Move { piece, axis } => !host.pieces().is_move_in_progress(piece, axis),
        BlockReason::Turn { piece, axis } => !host.pieces().is_turn_in_progress(piece, axis),
    }
}

/// Give every live thread of `environment` one turn, in creation order.
///
/// The set of threads is fixed at the start of the tick: anything started during the tick first
/// runs on the next one, and anything a signal kills before its turn comes up does not run at
/// all. A blocked thread whose condition has cleared is woken and runs in this same tick.
pub fn run_tick(
    host: &mut dyn ScriptHost,
    environment: &mut Environment,
    config: &Config,
    now: Tick,
) -> TickReport {
    let mut report = TickReport::default();
    let unit = environment.unit();
    let scheduled = environment.thread_ids();

    for &id in &scheduled {
        let Some(mut thread) = environment.take_thread(id) else {
            continue;
        };

        match thread.state() {
            RunState::Blocked(reason) => {
                if !is_cleared(reason, host, now) {
                    environment.restore_thread(thread);
                    report.blocked.push(id);
                    continue;
                }
                debug!(%unit, thread = %id, ?reason, "thread woken");
                thread.wake();
            }
            RunState::Ready => {}
            RunState::Finished | RunState::Faulted(_) => continue,
        }

        let status = {
            let mut exec = ExecParams {
                host: &mut *host,
                environment: &mut *environment,
                config,
                now,
            };
            run_thread(&mut exec, &mut thread)
        };
        report.ran.push(id);

        match status {
            Status::Continuing => environment.restore_thread(thread),
            Status::Blocked(reason) => {
                environment.restore_thread(thread);
                report.blocked.push(id);
                debug!(%unit, thread = %id, ?reason, "thread blocked");
            }
            Status::Finished => {
                debug!(%unit, thread = %id, "thread finished");
                report.finished.push(id);
            }
            Status::Killed { signal } => {
                debug!(%unit, thread = %id, signal, "thread killed by its own signal");
                report.killed.push(id);
            }
            Status::Faulted(fault) => report.faulted.push((id, fault)),
        }
    }

    // Anything scheduled that is neither accounted for nor still live went to a sibling's signal.
    for &id in &scheduled {
        let accounted = report.finished.contains(&id)
            || report.killed.contains(&id)
            || report.faulted.iter().any(|(f, _)| *f == id);
        if !accounted && environment.thread(id).is_none() {
            report.killed.push(id);
        }
    }
    report.blocked.retain(|id| environment.thread(*id).is_some());

    report
}
