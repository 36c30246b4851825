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

//! A minimal reference simulation around the interpreter: units with their own environment,
//! pieces and value registry, advanced one tick at a time.

use std::collections::{BTreeMap, VecDeque};

use ahash::AHashMap;
use armature_script::{Axis, Module, ModuleError, PieceId};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::pieces::{PieceSet, PieceState};
use crate::tasks::{TickReport, run_tick};
use crate::vm::vm_host::ScriptHost;
use crate::vm::{Environment, FaultKind, StartError, ThreadFault, ThreadId, Tick, UnitId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("No such unit: {0}")]
    UnknownUnit(UnitId),
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error("Cannot start {name}: {fault}")]
    BadArguments { name: String, fault: FaultKind },
    #[error("Static slot {slot} out of range for {unit}")]
    StaticOutOfRange { unit: UnitId, slot: usize },
}

/// Something a script did to the world outside its own unit's state, for the embedding
/// simulation to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Explode {
        unit: UnitId,
        piece: PieceId,
        kind: i32,
    },
    EmitSmoke {
        unit: UnitId,
        piece: PieceId,
        kind: i32,
    },
    AttachUnit {
        unit: UnitId,
        piece: PieceId,
        passenger: i32,
    },
    DetachUnit {
        unit: UnitId,
        passenger: i32,
    },
}

/// A thread fault, as retained for later inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostic {
    pub tick: Tick,
    pub unit: UnitId,
    pub thread: ThreadId,
    pub fault: ThreadFault,
}

#[derive(Debug)]
pub struct Unit {
    environment: Environment,
    pieces: PieceSet,
    values: AHashMap<i32, i32>,
}

impl Unit {
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn pieces(&self) -> &PieceSet {
        &self.pieces
    }

    pub fn value(&self, key: i32) -> i32 {
        self.values.get(&key).copied().unwrap_or(0)
    }
}

/// The world's view of a single unit, handed to the interpreter while that unit's threads run.
struct UnitHost<'a> {
    unit: UnitId,
    now: Tick,
    pieces: &'a mut PieceSet,
    values: &'a mut AHashMap<i32, i32>,
    effects: &'a mut VecDeque<Effect>,
    diagnostics: &'a mut VecDeque<Diagnostic>,
    max_diagnostics: usize,
    max_pending_effects: usize,
}

impl UnitHost<'_> {
    fn record(&mut self, effect: Effect) {
        if self.max_pending_effects == 0 {
            return;
        }
        if self.effects.len() >= self.max_pending_effects {
            warn!(unit = %self.unit, "effect queue full, dropping oldest");
            while self.effects.len() >= self.max_pending_effects {
                self.effects.pop_front();
            }
        }
        self.effects.push_back(effect);
    }
}

impl ScriptHost for UnitHost<'_> {
    fn unit(&self) -> UnitId {
        self.unit
    }

    fn pieces(&self) -> &PieceSet {
        &*self.pieces
    }

    fn pieces_mut(&mut self) -> &mut PieceSet {
        &mut *self.pieces
    }

    fn explode(&mut self, piece: PieceId, kind: i32) {
        self.record(Effect::Explode {
            unit: self.unit,
            piece,
            kind,
        });
    }

    fn emit_smoke(&mut self, piece: PieceId, kind: i32) {
        self.record(Effect::EmitSmoke {
            unit: self.unit,
            piece,
            kind,
        });
    }

    fn attach_unit(&mut self, piece: PieceId, unit: i32) {
        self.record(Effect::AttachUnit {
            unit: self.unit,
            piece,
            passenger: unit,
        });
    }

    fn detach_unit(&mut self, unit: i32) {
        self.record(Effect::DetachUnit {
            unit: self.unit,
            passenger: unit,
        });
    }

    fn unit_value(&self, key: i32) -> i32 {
        self.values.get(&key).copied().unwrap_or(0)
    }

    fn set_unit_value(&mut self, key: i32, value: i32) {
        self.values.insert(key, value);
    }

    fn report_fault(&mut self, thread: ThreadId, fault: &ThreadFault) {
        if self.max_diagnostics == 0 {
            return;
        }
        while self.diagnostics.len() >= self.max_diagnostics {
            self.diagnostics.pop_front();
        }
        self.diagnostics.push_back(Diagnostic {
            tick: self.now,
            unit: self.unit,
            thread,
            fault: *fault,
        });
    }
}

pub struct World {
    config: Config,
    /// Live units, in creation order.
    units: BTreeMap<UnitId, Unit>,
    next_unit: u32,
    now: Tick,
    /// The most recent faults, oldest first.
    diagnostics: VecDeque<Diagnostic>,
    /// Effects not yet handed over by [`World::drain_effects`], oldest first.
    effects: VecDeque<Effect>,
}

impl World {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            units: BTreeMap::new(),
            next_unit: 1,
            now: 0,
            diagnostics: VecDeque::new(),
            effects: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The tick that the next call to [`World::tick`] will execute.
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Construct a unit running `module`. No script runs until the simulation asks for one.
    pub fn spawn_unit(&mut self, module: Module) -> UnitId {
        let id = UnitId(self.next_unit);
        self.next_unit += 1;
        let pieces = PieceSet::new(module.piece_count());
        let environment = Environment::new(module, id, self.config.runtime.seed);
        self.units.insert(
            id,
            Unit {
                environment,
                pieces,
                values: AHashMap::new(),
            },
        );
        info!(unit = %id, "unit spawned");
        id
    }

    /// Remove a unit, dropping its environment and every thread in it.
    pub fn destroy_unit(&mut self, unit: UnitId) -> Result<(), WorldError> {
        let removed = self
            .units
            .remove(&unit)
            .ok_or(WorldError::UnknownUnit(unit))?;
        info!(
            %unit,
            threads = removed.environment.live_thread_count(),
            "unit destroyed"
        );
        Ok(())
    }

    pub fn unit(&self, unit: UnitId) -> Result<&Unit, WorldError> {
        self.units.get(&unit).ok_or(WorldError::UnknownUnit(unit))
    }

    fn unit_mut(&mut self, unit: UnitId) -> Result<&mut Unit, WorldError> {
        self.units.get_mut(&unit).ok_or(WorldError::UnknownUnit(unit))
    }

    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.units.keys().copied().collect()
    }

    /// Start a thread at the named entry point. It first runs on the next tick.
    pub fn run_script(&mut self, unit: UnitId, name: &str) -> Result<ThreadId, WorldError> {
        self.run_script_with_args(unit, name, &[])
    }

    pub fn run_script_with_args(
        &mut self,
        unit: UnitId,
        name: &str,
        args: &[i32],
    ) -> Result<ThreadId, WorldError> {
        let target = self.unit_mut(unit)?;
        target
            .environment
            .start_script(name, args)
            .map_err(|e| match e {
                StartError::Module(e) => WorldError::Module(e),
                StartError::Thread(fault) => WorldError::BadArguments {
                    name: name.to_string(),
                    fault,
                },
            })
    }

    pub fn send_signal(&mut self, unit: UnitId, signal: u32) -> Result<Vec<ThreadId>, WorldError> {
        let target = self.unit_mut(unit)?;
        let killed = target.environment.send_signal(signal);
        debug!(%unit, signal, killed = killed.len(), "signal delivered");
        Ok(killed)
    }

    pub fn static_variable(&self, unit: UnitId, slot: usize) -> Result<i32, WorldError> {
        self.unit(unit)?
            .environment
            .static_variable(slot)
            .map_err(|_| WorldError::StaticOutOfRange { unit, slot })
    }

    fn piece_of(&self, unit: UnitId, piece: &str) -> Result<(&Unit, PieceId), WorldError> {
        let target = self.unit(unit)?;
        let id = target.environment.module().piece_index(piece)?;
        Ok((target, id))
    }

    pub fn is_piece_moving(
        &self,
        unit: UnitId,
        piece: &str,
        axis: Axis,
    ) -> Result<bool, WorldError> {
        let (target, id) = self.piece_of(unit, piece)?;
        Ok(target.pieces.is_move_in_progress(id, axis))
    }

    pub fn is_piece_turning(
        &self,
        unit: UnitId,
        piece: &str,
        axis: Axis,
    ) -> Result<bool, WorldError> {
        let (target, id) = self.piece_of(unit, piece)?;
        Ok(target.pieces.is_turn_in_progress(id, axis))
    }

    pub fn piece_state(&self, unit: UnitId, piece: &str) -> Result<&PieceState, WorldError> {
        let (target, id) = self.piece_of(unit, piece)?;
        target
            .pieces
            .piece(id)
            .ok_or_else(|| WorldError::Module(ModuleError::UnknownPiece(piece.to_string())))
    }

    /// Run one tick: every unit, in creation order, gives each of its threads one turn and then
    /// advances its piece animations.
    pub fn tick(&mut self) -> Vec<(UnitId, TickReport)> {
        let World {
            config,
            units,
            now,
            diagnostics,
            effects,
            ..
        } = self;

        let mut reports = Vec::with_capacity(units.len());
        for (&id, unit) in units.iter_mut() {
            let Unit {
                environment,
                pieces,
                values,
            } = unit;
            let mut host = UnitHost {
                unit: id,
                now: *now,
                pieces: &mut *pieces,
                values: &mut *values,
                effects: &mut *effects,
                diagnostics: &mut *diagnostics,
                max_diagnostics: config.runtime.max_diagnostics,
                max_pending_effects: config.runtime.max_pending_effects,
            };
            let report = run_tick(&mut host, environment, config, *now);
            pieces.advance();
            reports.push((id, report));
        }
        *now += 1;
        reports
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Hand over every effect recorded since the last call. Embedders are expected to drain
    /// once per tick; past `max_pending_effects` the oldest undrained effects are lost.
    pub fn drain_effects(&mut self) -> Vec<Effect> {
        self.effects.drain(..).collect()
    }
}
