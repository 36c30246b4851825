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

//! Helpers for driving the interpreter over hand-assembled modules without a world.

use armature_script::{Module, ModuleBuilder, Op};

use crate::config::Config;
use crate::tasks::{TickReport, run_tick};
use crate::testing::mock_host::MockHost;
use crate::vm::execute::{ExecParams, run_thread};
use crate::vm::{Environment, FaultKind, Status, ThreadId, Tick, UnitId};

/// A single environment, its host and a clock.
pub struct Harness {
    pub host: MockHost,
    pub environment: Environment,
    pub config: Config,
    pub now: Tick,
}

impl Harness {
    pub fn new(module: Module) -> Self {
        Self::with_config(module, Config::default())
    }

    pub fn with_config(module: Module, config: Config) -> Self {
        let host = MockHost::new(module.piece_count());
        let environment = Environment::new(module, UnitId(1), config.runtime.seed);
        Self {
            host,
            environment,
            config,
            now: 0,
        }
    }

    pub fn start(&mut self, name: &str, args: &[i32]) -> ThreadId {
        self.environment
            .start_script(name, args)
            .unwrap_or_else(|e| panic!("cannot start {name}: {e}"))
    }

    /// Run one thread directly, outside of the scheduler.
    pub fn run(&mut self, id: ThreadId) -> Status {
        let mut thread = self
            .environment
            .take_thread(id)
            .unwrap_or_else(|| panic!("no thread {id}"));
        let status = {
            let mut exec = ExecParams {
                host: &mut self.host,
                environment: &mut self.environment,
                config: &self.config,
                now: self.now,
            };
            run_thread(&mut exec, &mut thread)
        };
        if status.is_live() {
            self.environment.restore_thread(thread);
        }
        status
    }

    /// Schedule one tick, then advance piece animation.
    pub fn tick(&mut self) -> TickReport {
        let report = run_tick(
            &mut self.host,
            &mut self.environment,
            &self.config,
            self.now,
        );
        self.host.pieces.advance();
        self.now += 1;
        report
    }
}

/// Run `ops` as the body of a script and return whatever it leaves on top of the stack, or the
/// fault it raised.
pub fn eval_ops(ops: &[Op]) -> Result<i32, FaultKind> {
    eval_ops_with(ops, Config::default())
}

pub fn eval_ops_with(ops: &[Op], config: Config) -> Result<i32, FaultKind> {
    let mut b = ModuleBuilder::new();
    b.piece("base");
    b.static_slots(1);
    b.begin_script("Main", 0, 4);
    b.emit_all(ops.iter().copied());
    b.emit_all([Op::PopStaticVariable(0), Op::ReturnFromScript]);
    let module = b.build().unwrap_or_else(|e| panic!("bad test module: {e}"));

    let mut harness = Harness::with_config(module, config);
    let id = harness.start("Main", &[]);
    match harness.run(id) {
        Status::Finished => Ok(harness
            .environment
            .static_variable(0)
            .unwrap_or_else(|e| panic!("{e}"))),
        Status::Faulted(fault) => Err(fault.kind),
        other => panic!("script did not complete: {other:?}"),
    }
}
