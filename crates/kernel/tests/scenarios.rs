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

//! End-to-end scenarios run through the reference world.

use armature_kernel::{Config, FaultKind, ThreadFault, ThreadId, UnitId, World};
use armature_script::units::linear_to_fixed;
use armature_script::{Axis, Module, ModuleBuilder, Offset, Op};
use pretty_assertions::{assert_eq, assert_ne};
use strum::IntoEnumIterator;

/// `Create` adds 5 and 3 into static 0.
fn create_module() -> Module {
    let mut b = ModuleBuilder::new();
    b.static_slots(1);
    b.begin_script("Create", 0, 0);
    b.emit_all([
        Op::PushConstant(5),
        Op::PushConstant(3),
        Op::Add,
        Op::PopStaticVariable(0),
        Op::ReturnFromScript,
    ]);
    b.build().unwrap()
}

/// `Roll` appends a die roll to a running sum in static 0 every tick; `Aim` keeps moving a
/// piece to random targets.
fn dice_module() -> Module {
    let mut b = ModuleBuilder::new();
    let gun = b.piece("gun");
    b.static_slots(1);
    b.begin_script("Roll", 0, 0);
    b.emit_all([
        Op::PushStaticVariable(0),
        Op::PushConstant(1),
        Op::PushConstant(6),
        Op::RandomNumber,
        Op::Add,
        Op::PopStaticVariable(0),
        Op::PushConstant(0),
        Op::Sleep,
        Op::Jump(Offset(0)),
    ]);
    b.begin_script("Aim", 0, 0);
    let aim = b.position();
    b.emit_all([
        Op::PushConstant(linear_to_fixed(0.5)),
        Op::PushConstant(0),
        Op::PushConstant(linear_to_fixed(2.0)),
        Op::RandomNumber,
        Op::MoveObject {
            piece: gun,
            axis: Axis::X,
        },
        Op::WaitForMove {
            piece: gun,
            axis: Axis::X,
        },
        Op::Jump(aim),
    ]);
    b.build().unwrap()
}

/// `Listen(mask)` sets its mask and then idles; `Fire(signal)` broadcasts a signal.
fn signal_module() -> Module {
    let mut b = ModuleBuilder::new();
    b.begin_script("Listen", 1, 1);
    let idle = b.position();
    b.emit_all([
        Op::PushLocalVariable(0),
        Op::SetSignalMask,
        Op::PushConstant(1000),
        Op::Sleep,
    ]);
    b.emit(Op::Jump(Offset(idle.0 + 2)));
    b.begin_script("Fire", 1, 1);
    b.emit_all([
        Op::PushLocalVariable(0),
        Op::SendSignal,
        Op::ReturnFromScript,
    ]);
    b.build().unwrap()
}

#[test]
fn test_create_scenario() {
    let mut world = World::new(Config::default());
    let unit = world.spawn_unit(create_module());
    let thread = world.run_script(unit, "Create").unwrap();
    let reports = world.tick();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].1.finished, vec![thread]);
    assert_eq!(world.static_variable(unit, 0), Ok(8));
}

#[test]
fn test_replay_is_deterministic() {
    /// Per tick: the running sums, then every pending `(unit, piece, axis, target)`.
    type Trace = Vec<(Vec<i32>, Vec<(UnitId, &'static str, Axis, i32)>)>;

    fn run(seed: u64) -> Trace {
        let mut config = Config::default();
        config.runtime.seed = seed;
        let mut world = World::new(config);
        let units: Vec<UnitId> = (0..3).map(|_| world.spawn_unit(dice_module())).collect();
        for &unit in &units {
            world.run_script(unit, "Roll").unwrap();
            world.run_script(unit, "Aim").unwrap();
        }
        let mut trace = Trace::new();
        for _ in 0..20 {
            world.tick();
            let sums = units
                .iter()
                .map(|&u| world.static_variable(u, 0).unwrap())
                .collect();
            let mut targets = vec![];
            for &unit in &units {
                let gun = world.piece_state(unit, "gun").unwrap();
                for axis in Axis::iter() {
                    if let Some(op) = gun.moves[axis.index()] {
                        targets.push((unit, "gun", axis, op.target));
                    }
                }
            }
            trace.push((sums, targets));
        }
        trace
    }

    let first = run(7);
    assert_eq!(first, run(7));
    assert_eq!(first.len(), 20);
    assert!(first.iter().any(|(_, targets)| !targets.is_empty()));
    assert_ne!(first, run(8));
    let (last_sums, _) = &first[19];
    // Twenty rolls of 1..=6.
    assert!(last_sums.iter().all(|s| (20..=120).contains(s)));
    // Units draw from their own sequences.
    assert!(last_sums.windows(2).any(|w| w[0] != w[1]));
}

#[test]
fn test_signal_kills_only_matching_threads() {
    let mut world = World::new(Config::default());
    let unit = world.spawn_unit(signal_module());
    let a = world.run_script_with_args(unit, "Listen", &[0b001]).unwrap();
    let b = world.run_script_with_args(unit, "Listen", &[0b010]).unwrap();
    let c = world.run_script_with_args(unit, "Listen", &[0b110]).unwrap();
    world.tick();

    // Fired from inside a script: sibling threads die during the tick.
    let fire = world.run_script_with_args(unit, "Fire", &[0b010]).unwrap();
    let reports = world.tick();
    let report = &reports[0].1;
    assert_eq!(report.finished, vec![fire]);
    let mut killed = report.killed.clone();
    killed.sort();
    assert_eq!(killed, vec![b, c]);
    assert_eq!(world.unit(unit).unwrap().environment().thread_ids(), vec![a]);

    // Fired by the simulation.
    assert_eq!(world.send_signal(unit, 0b100), Ok(vec![]));
    assert_eq!(world.send_signal(unit, 0b011), Ok(vec![a]));
}

#[test]
fn test_fault_is_isolated() {
    let mut b = ModuleBuilder::new();
    b.static_slots(1);
    b.begin_script("Crash", 0, 0);
    b.emit_all([
        Op::PushConstant(1),
        Op::PushConstant(0),
        Op::Div,
        Op::ReturnFromScript,
    ]);
    b.begin_script("Count", 0, 0);
    b.emit_all([
        Op::PushStaticVariable(0),
        Op::PushConstant(1),
        Op::Add,
        Op::PopStaticVariable(0),
        Op::PushConstant(0),
        Op::Sleep,
        Op::Jump(Offset(4)),
    ]);
    let module = b.build().unwrap();

    let mut world = World::new(Config::default());
    let unit = world.spawn_unit(module.clone());
    let other = world.spawn_unit(module);
    let crash = world.run_script(unit, "Crash").unwrap();
    let count = world.run_script(unit, "Count").unwrap();
    world.run_script(other, "Count").unwrap();

    let reports = world.tick();
    assert_eq!(
        reports[0].1.faulted,
        vec![(crash, ThreadFault::new(2, FaultKind::ArithmeticFault))]
    );
    assert_eq!(world.static_variable(unit, 0), Ok(1));
    assert_eq!(world.static_variable(other, 0), Ok(1));
    assert_eq!(
        world.unit(unit).unwrap().environment().thread_ids(),
        vec![count]
    );

    let diagnostics: Vec<_> = world.diagnostics().collect();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].unit, unit);
    assert_eq!(diagnostics[0].thread, crash);
    assert_eq!(diagnostics[0].fault.ip, 2);
}

#[test]
fn test_started_threads_run_next_tick() {
    let mut b = ModuleBuilder::new();
    b.static_slots(2);
    let child = b.declare_script("Child", 0, 0);
    b.begin_script("Parent", 0, 0);
    b.emit_all([
        Op::StartScript {
            script: child,
            argc: 0,
        },
        Op::PushConstant(1),
        Op::PopStaticVariable(0),
        Op::ReturnFromScript,
    ]);
    b.define_script(child);
    b.emit_all([
        Op::PushConstant(1),
        Op::PopStaticVariable(1),
        Op::ReturnFromScript,
    ]);

    let mut world = World::new(Config::default());
    let unit = world.spawn_unit(b.build().unwrap());
    let parent = world.run_script(unit, "Parent").unwrap();

    let reports = world.tick();
    assert_eq!(reports[0].1.ran, vec![parent]);
    assert_eq!(world.static_variable(unit, 1), Ok(0));

    let reports = world.tick();
    assert_eq!(reports[0].1.ran, vec![ThreadId(parent.0 + 1)]);
    assert_eq!(world.static_variable(unit, 1), Ok(1));
}

#[test]
fn test_units_run_in_creation_order() {
    let mut world = World::new(Config::default());
    let first = world.spawn_unit(create_module());
    let second = world.spawn_unit(create_module());
    world.run_script(second, "Create").unwrap();
    world.run_script(first, "Create").unwrap();
    let order: Vec<UnitId> = world.tick().into_iter().map(|(u, _)| u).collect();
    assert_eq!(order, vec![first, second]);
}
