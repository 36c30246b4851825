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

use armature_script::{EntryPoint, ScriptId};

use crate::vm::fault::{FaultKind, ThreadFault};
use crate::vm::frame::Frame;
use crate::vm::{BlockReason, ThreadId};

/// Where a thread stands with respect to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Ready,
    Blocked(BlockReason),
    Finished,
    Faulted(ThreadFault),
}

/// One cooperative execution context: the explicit, resumable state of a script invocation.
///
/// A thread never shares its operand stack or frames. Everything it shares with its siblings
/// lives in the [`Environment`](crate::vm::environment::Environment).
#[derive(Debug, Clone)]
pub struct Thread {
    id: ThreadId,
    pub(crate) ip: usize,
    stack: Vec<i32>,
    frames: Vec<Frame>,
    signal_mask: u32,
    state: RunState,
}

impl Thread {
    pub(crate) fn new(
        id: ThreadId,
        script: ScriptId,
        entry: &EntryPoint,
        args: &[i32],
        signal_mask: u32,
    ) -> Self {
        let frame = Frame::new(
            script,
            None,
            entry.locals as usize,
            entry.params as usize,
            args,
        );
        Self {
            id,
            ip: entry.offset.as_usize(),
            stack: Vec::new(),
            frames: vec![frame],
            signal_mask,
            state: RunState::Ready,
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn stack(&self) -> &[i32] {
        &self.stack
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Number of frames on the call stack, the entry frame included.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn signal_mask(&self) -> u32 {
        self.signal_mask
    }

    pub(crate) fn set_signal_mask(&mut self, mask: u32) {
        self.signal_mask = mask;
    }

    /// Whether a broadcast of `signal` terminates this thread.
    #[inline]
    pub fn intercepts(&self, signal: u32) -> bool {
        self.signal_mask & signal != 0
    }

    #[inline]
    pub(crate) fn push(&mut self, value: i32, limit: usize) -> Result<(), FaultKind> {
        if self.stack.len() >= limit {
            return Err(FaultKind::StackOverflow { limit });
        }
        self.stack.push(value);
        Ok(())
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Result<i32, FaultKind> {
        self.stack.pop().ok_or(FaultKind::StackUnderflow)
    }

    /// Pop `count` values, returned in the order they were pushed.
    pub(crate) fn pop_n(&mut self, count: usize) -> Result<Vec<i32>, FaultKind> {
        if count > self.stack.len() {
            return Err(FaultKind::StackUnderflow);
        }
        let at = self.stack.len() - count;
        Ok(self.stack.split_off(at))
    }

    pub(crate) fn push_frame(&mut self, frame: Frame, limit: usize) -> Result<(), FaultKind> {
        if self.frames.len() >= limit {
            return Err(FaultKind::StackOverflow { limit });
        }
        self.frames.push(frame);
        Ok(())
    }

    pub(crate) fn pop_frame(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    #[inline]
    pub(crate) fn frame(&self) -> Result<&Frame, FaultKind> {
        self.frames.last().ok_or(FaultKind::StackUnderflow)
    }

    #[inline]
    pub(crate) fn frame_mut(&mut self) -> Result<&mut Frame, FaultKind> {
        self.frames.last_mut().ok_or(FaultKind::StackUnderflow)
    }

    pub(crate) fn block(&mut self, reason: BlockReason) {
        self.state = RunState::Blocked(reason);
    }

    pub(crate) fn wake(&mut self) {
        self.state = RunState::Ready;
    }

    pub(crate) fn finish(&mut self) {
        self.stack.clear();
        self.frames.clear();
        self.state = RunState::Finished;
    }

    pub(crate) fn fault(&mut self, fault: ThreadFault) {
        self.stack.clear();
        self.frames.clear();
        self.state = RunState::Faulted(fault);
    }

    pub fn is_runnable(&self) -> bool {
        matches!(self.state, RunState::Ready | RunState::Blocked(_))
    }
}
