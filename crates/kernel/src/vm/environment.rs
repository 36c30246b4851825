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

//! Per-unit runtime container: the unit's module, its static variables, its live threads and
//! its random source.
//!
//! Statics are plain owned storage. The scheduler only ever runs one thread of an environment
//! at a time, at instruction granularity, so sibling threads never observe a partial write. A
//! concurrent scheduler would have to add its own exclusion around this type.

use std::collections::BTreeMap;

use armature_script::{Module, ModuleError, ScriptId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::debug;

use crate::vm::fault::FaultKind;
use crate::vm::thread::Thread;
use crate::vm::{ThreadId, UnitId};

/// Spreads unit ids across the seed space so neighbouring units get unrelated sequences.
const SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Failure to start a thread at a named entry point.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StartError {
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error("cannot start thread: {0}")]
    Thread(#[from] FaultKind),
}

#[derive(Debug)]
pub struct Environment {
    module: Module,
    /// The owning unit. Never dereferenced here; used to label diagnostics.
    unit: UnitId,
    statics: Vec<i32>,
    /// Live threads in creation order.
    threads: BTreeMap<ThreadId, Thread>,
    next_thread_id: u64,
    rng: StdRng,
}

impl Environment {
    pub fn new(module: Module, unit: UnitId, seed: u64) -> Self {
        let statics = vec![0; module.static_slot_count()];
        let rng = StdRng::seed_from_u64(seed ^ u64::from(unit.0).wrapping_mul(SEED_MIX));
        Self {
            module,
            unit,
            statics,
            threads: BTreeMap::new(),
            next_thread_id: 1,
            rng,
        }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    /// Allocate a fresh, ready thread at the entry point of `script`, with `args` copied into its
    /// first locals.
    pub fn create_thread(
        &mut self,
        script: ScriptId,
        args: &[i32],
        signal_mask: u32,
    ) -> Result<ThreadId, FaultKind> {
        let entry = self
            .module
            .script(script)
            .ok_or(FaultKind::UnknownScript(script))?;
        if args.len() > entry.locals as usize {
            return Err(FaultKind::OutOfRange {
                slot: args.len(),
                size: entry.locals as usize,
            });
        }
        let id = ThreadId(self.next_thread_id);
        self.next_thread_id += 1;
        let thread = Thread::new(id, script, entry, args, signal_mask);
        debug!(unit = ?self.unit, thread = ?id, script = %entry.name, "thread created");
        self.threads.insert(id, thread);
        Ok(id)
    }

    /// Look up a named entry point and start a thread there with an empty signal mask.
    pub fn start_script(&mut self, name: &str, args: &[i32]) -> Result<ThreadId, StartError> {
        let script = self.module.entry_point(name)?;
        Ok(self.create_thread(script, args, 0)?)
    }

    /// Terminate every live thread whose mask intercepts `signal`. Returns the ids of the
    /// terminated threads, in creation order. A signal nobody listens for is a no-op.
    pub fn send_signal(&mut self, signal: u32) -> Vec<ThreadId> {
        let killed: Vec<ThreadId> = self
            .threads
            .values()
            .filter(|t| t.intercepts(signal))
            .map(Thread::id)
            .collect();
        for id in &killed {
            self.threads.remove(id);
            debug!(unit = ?self.unit, thread = ?id, signal, "thread killed by signal");
        }
        killed
    }

    pub fn static_variable(&self, slot: usize) -> Result<i32, FaultKind> {
        self.statics
            .get(slot)
            .copied()
            .ok_or(FaultKind::OutOfRange {
                slot,
                size: self.statics.len(),
            })
    }

    pub fn set_static_variable(&mut self, slot: usize, value: i32) -> Result<(), FaultKind> {
        let size = self.statics.len();
        let v = self
            .statics
            .get_mut(slot)
            .ok_or(FaultKind::OutOfRange { slot, size })?;
        *v = value;
        Ok(())
    }

    pub fn statics(&self) -> &[i32] {
        &self.statics
    }

    pub fn thread(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.get(&id)
    }

    pub fn thread_ids(&self) -> Vec<ThreadId> {
        self.threads.keys().copied().collect()
    }

    pub fn threads(&self) -> impl Iterator<Item = &Thread> {
        self.threads.values()
    }

    pub fn live_thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Detach a thread from the live table so it can run against `&mut self`.
    pub(crate) fn take_thread(&mut self, id: ThreadId) -> Option<Thread> {
        self.threads.remove(&id)
    }

    /// Put back a thread previously taken with [`Self::take_thread`].
    pub(crate) fn restore_thread(&mut self, thread: Thread) {
        self.threads.insert(thread.id(), thread);
    }

    /// Uniform value in `[low, high]`; swapped bounds are reordered.
    pub fn random_in(&mut self, low: i32, high: i32) -> i32 {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        self.rng.random_range(low..=high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armature_script::{ModuleBuilder, Op};

    fn module() -> Module {
        let mut b = ModuleBuilder::new();
        b.static_slots(2);
        b.begin_script("Idle", 0, 0);
        b.emit(Op::ReturnFromScript);
        b.begin_script("Walk", 2, 3);
        b.emit(Op::ReturnFromScript);
        b.build().unwrap()
    }

    #[test]
    fn test_statics_start_zeroed() {
        let mut env = Environment::new(module(), UnitId(1), 0);
        assert_eq!(env.statics(), &[0, 0]);
        env.set_static_variable(1, 12).unwrap();
        assert_eq!(env.static_variable(1), Ok(12));
        assert_eq!(
            env.static_variable(2),
            Err(FaultKind::OutOfRange { slot: 2, size: 2 })
        );
        assert_eq!(
            env.set_static_variable(5, 1),
            Err(FaultKind::OutOfRange { slot: 5, size: 2 })
        );
    }

    #[test]
    fn test_thread_ids_are_monotonic() {
        let mut env = Environment::new(module(), UnitId(1), 0);
        let a = env.start_script("Idle", &[]).unwrap();
        let b = env.start_script("Walk", &[1, 2]).unwrap();
        assert!(b > a);
        env.take_thread(a);
        let c = env.start_script("Idle", &[]).unwrap();
        assert!(c > b);
        assert_eq!(env.thread_ids(), vec![b, c]);
        assert_eq!(env.thread(b).unwrap().frames()[0].locals(), &[1, 2]);
    }

    #[test]
    fn test_thread_ids_outlast_u32() {
        let mut env = Environment::new(module(), UnitId(1), 0);
        env.next_thread_id = u64::from(u32::MAX);
        let a = env.start_script("Idle", &[]).unwrap();
        let b = env.start_script("Idle", &[]).unwrap();
        assert_eq!(a, ThreadId(u64::from(u32::MAX)));
        assert_eq!(b, ThreadId(1 << 32));
        assert_eq!(env.thread_ids(), vec![a, b]);
    }

    #[test]
    fn test_unknown_entry_point() {
        let mut env = Environment::new(module(), UnitId(1), 0);
        assert_eq!(
            env.start_script("Fly", &[]),
            Err(StartError::Module(ModuleError::UnknownEntryPoint(
                "Fly".to_string()
            )))
        );
        assert_eq!(
            env.start_script("Idle", &[1]),
            Err(StartError::Thread(FaultKind::OutOfRange { slot: 1, size: 0 }))
        );
        assert_eq!(
            env.create_thread(ScriptId(9), &[], 0),
            Err(FaultKind::UnknownScript(ScriptId(9)))
        );
    }

    #[test]
    fn test_signal_kills_only_matching_threads() {
        let mut env = Environment::new(module(), UnitId(1), 0);
        let idle = env.module().entry_point("Idle").unwrap();
        let a = env.create_thread(idle, &[], 0b0001).unwrap();
        let b = env.create_thread(idle, &[], 0b0110).unwrap();
        let c = env.create_thread(idle, &[], 0b0100).unwrap();

        assert_eq!(env.send_signal(0b1000), vec![]);
        assert_eq!(env.live_thread_count(), 3);

        assert_eq!(env.send_signal(0b0100), vec![b, c]);
        assert_eq!(env.thread_ids(), vec![a]);
        assert!(env.thread(a).unwrap().is_runnable());
    }

    #[test]
    fn test_random_is_reproducible_and_bounded() {
        let mut a = Environment::new(module(), UnitId(3), 42);
        let mut b = Environment::new(module(), UnitId(3), 42);
        let xs: Vec<i32> = (0..32).map(|_| a.random_in(10, 1)).collect();
        let ys: Vec<i32> = (0..32).map(|_| b.random_in(1, 10)).collect();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|x| (1..=10).contains(x)));
    }
}
