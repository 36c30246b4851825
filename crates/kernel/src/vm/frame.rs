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

use armature_script::ScriptId;
use smallvec::SmallVec;

use crate::vm::fault::FaultKind;

/// Inline capacity for locals. Most unit scripts use a handful; larger frames spill to the heap.
const INLINE_LOCALS: usize = 8;

/// One activation of a script on a thread's call stack.
///
/// The local array is allocated at the callee's declared width when the frame is pushed and never
/// resized. Slots become addressable as they are claimed: parameters are claimed on entry, the
/// rest one at a time by `create_local_variable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub(crate) script: ScriptId,
    /// Where the caller resumes once this frame returns. `None` for a thread's entry frame.
    pub(crate) return_ip: Option<usize>,
    locals: SmallVec<[i32; INLINE_LOCALS]>,
    claimed: usize,
}

impl Frame {
    /// `params` slots are claimed up front, holding `args` in order and zero past the last one
    /// supplied.
    pub fn new(
        script: ScriptId,
        return_ip: Option<usize>,
        width: usize,
        params: usize,
        args: &[i32],
    ) -> Self {
        debug_assert!(args.len() <= width, "more arguments than locals");
        let mut locals: SmallVec<[i32; INLINE_LOCALS]> = smallvec::smallvec![0; width];
        let supplied = args.len().min(width);
        locals[..supplied].copy_from_slice(&args[..supplied]);
        let claimed = params.max(supplied).min(width);
        Self {
            script,
            return_ip,
            locals,
            claimed,
        }
    }

    pub fn script(&self) -> ScriptId {
        self.script
    }

    pub fn return_ip(&self) -> Option<usize> {
        self.return_ip
    }

    /// Fixed width of the local array.
    pub fn width(&self) -> usize {
        self.locals.len()
    }

    /// Number of locals claimed so far.
    pub fn claimed(&self) -> usize {
        self.claimed
    }

    /// Claim the next local slot, zeroed.
    pub fn create_local(&mut self) -> Result<usize, FaultKind> {
        if self.claimed >= self.locals.len() {
            return Err(FaultKind::OutOfRange {
                slot: self.claimed,
                size: self.locals.len(),
            });
        }
        let slot = self.claimed;
        self.locals[slot] = 0;
        self.claimed += 1;
        Ok(slot)
    }

    #[inline]
    pub fn local(&self, slot: usize) -> Result<i32, FaultKind> {
        if slot >= self.claimed {
            return Err(FaultKind::OutOfRange {
                slot,
                size: self.claimed,
            });
        }
        Ok(self.locals[slot])
    }

    #[inline]
    pub fn set_local(&mut self, slot: usize, value: i32) -> Result<(), FaultKind> {
        if slot >= self.claimed {
            return Err(FaultKind::OutOfRange {
                slot,
                size: self.claimed,
            });
        }
        self.locals[slot] = value;
        Ok(())
    }

    pub fn locals(&self) -> &[i32] {
        &self.locals[..self.claimed]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_are_claimed() {
        let frame = Frame::new(ScriptId(0), None, 4, 0, &[7, 9]);
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.claimed(), 2);
        assert_eq!(frame.locals(), &[7, 9]);
        assert_eq!(
            frame.local(2),
            Err(FaultKind::OutOfRange { slot: 2, size: 2 })
        );
    }

    #[test]
    fn test_missing_params_are_zero() {
        let frame = Frame::new(ScriptId(0), None, 3, 2, &[4]);
        assert_eq!(frame.locals(), &[4, 0]);
    }

    #[test]
    fn test_create_local_until_full() {
        let mut frame = Frame::new(ScriptId(0), Some(3), 2, 0, &[]);
        assert_eq!(frame.create_local(), Ok(0));
        frame.set_local(0, 42).unwrap();
        assert_eq!(frame.create_local(), Ok(1));
        assert_eq!(frame.local(0), Ok(42));
        assert_eq!(frame.local(1), Ok(0));
        assert_eq!(
            frame.create_local(),
            Err(FaultKind::OutOfRange { slot: 2, size: 2 })
        );
        assert_eq!(frame.width(), 2);
    }
}
