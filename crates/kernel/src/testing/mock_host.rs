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

use ahash::AHashMap;
use armature_script::PieceId;

use crate::pieces::PieceSet;
use crate::vm::vm_host::ScriptHost;
use crate::vm::{ThreadFault, ThreadId, UnitId};

/// A host call that is otherwise invisible to the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Explode(PieceId, i32),
    EmitSmoke(PieceId, i32),
    AttachUnit(PieceId, i32),
    DetachUnit(i32),
}

/// Records everything scripts do to it, for assertions.
#[derive(Debug, Default)]
pub struct MockHost {
    pub unit: UnitId,
    pub pieces: PieceSet,
    pub values: AHashMap<i32, i32>,
    pub events: Vec<HostEvent>,
    pub faults: Vec<(ThreadId, ThreadFault)>,
}

impl MockHost {
    pub fn new(piece_count: usize) -> Self {
        Self {
            unit: UnitId(1),
            pieces: PieceSet::new(piece_count),
            ..Default::default()
        }
    }
}

impl ScriptHost for MockHost {
    fn unit(&self) -> UnitId {
        self.unit
    }

    fn pieces(&self) -> &PieceSet {
        &self.pieces
    }

    fn pieces_mut(&mut self) -> &mut PieceSet {
        &mut self.pieces
    }

    fn explode(&mut self, piece: PieceId, kind: i32) {
        self.events.push(HostEvent::Explode(piece, kind));
    }

    fn emit_smoke(&mut self, piece: PieceId, kind: i32) {
        self.events.push(HostEvent::EmitSmoke(piece, kind));
    }

    fn attach_unit(&mut self, piece: PieceId, unit: i32) {
        self.events.push(HostEvent::AttachUnit(piece, unit));
    }

    fn detach_unit(&mut self, unit: i32) {
        self.events.push(HostEvent::DetachUnit(unit));
    }

    fn unit_value(&self, key: i32) -> i32 {
        self.values.get(&key).copied().unwrap_or(0)
    }

    fn set_unit_value(&mut self, key: i32, value: i32) {
        self.values.insert(key, value);
    }

    fn report_fault(&mut self, thread: ThreadId, fault: &ThreadFault) {
        self.faults.push((thread, *fault));
    }
}
