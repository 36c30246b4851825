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

use armature_script::units::angle_from_fixed;
use armature_script::{Op, PieceId};
use tracing::{trace, warn};

use crate::config::{Config, DivideByZero, OperandOrder};
use crate::vm::environment::Environment;
use crate::vm::fault::{FaultKind, ThreadFault};
use crate::vm::frame::Frame;
use crate::vm::thread::Thread;
use crate::vm::vm_host::ScriptHost;
use crate::vm::{BlockReason, Status, Tick};

/// Everything a thread can touch while it runs, besides itself.
pub struct ExecParams<'a> {
    pub host: &'a mut dyn ScriptHost,
    pub environment: &'a mut Environment,
    pub config: &'a Config,
    /// The tick being executed; `sleep` deadlines are computed from it.
    pub now: Tick,
}

/// Pop the two operands of a binary instruction as `(left, right)`.
#[inline]
fn pop_operands(thread: &mut Thread, order: OperandOrder) -> Result<(i32, i32), FaultKind> {
    let top = thread.pop()?;
    let below = thread.pop()?;
    Ok(match order {
        OperandOrder::RightOnTop => (below, top),
        OperandOrder::LeftOnTop => (top, below),
    })
}

macro_rules! binary_op {
    ( $thread:ident, $exec:ident, |$lhs:ident, $rhs:ident| $body:expr ) => {{
        let ($lhs, $rhs) = pop_operands($thread, $exec.config.semantics.operand_order)?;
        $thread.push($body, $exec.config.runtime.max_stack_size)?;
    }};
}

macro_rules! comparison_op {
    ( $thread:ident, $exec:ident, $op:tt ) => {
        binary_op!($thread, $exec, |lhs, rhs| (lhs $op rhs) as i32)
    };
}

macro_rules! logical_op {
    ( $thread:ident, $exec:ident, $op:tt ) => {
        binary_op!($thread, $exec, |lhs, rhs| ((lhs != 0) $op (rhs != 0)) as i32)
    };
}

/// A piece named by an instruction (or popped off the stack) must exist on both the module and
/// the host's piece set.
#[inline]
fn check_piece(exec: &ExecParams, piece: PieceId) -> Result<PieceId, FaultKind> {
    if piece.index() >= exec.environment.module().piece_count()
        || piece.index() >= exec.host.pieces().len()
    {
        return Err(FaultKind::UnknownPiece(piece));
    }
    Ok(piece)
}

fn piece_from_value(exec: &ExecParams, value: i32) -> Result<PieceId, FaultKind> {
    let piece = u16::try_from(value)
        .map(PieceId)
        .map_err(|_| FaultKind::UnknownPiece(PieceId(u16::MAX)))?;
    check_piece(exec, piece)
}

/// Run `thread` until it blocks, finishes, dies, faults or exhausts its instruction budget.
///
/// The thread must already be detached from `exec.environment`; it is up to the caller to put it
/// back if the returned status says it is still live.
pub fn run_thread(exec: &mut ExecParams, thread: &mut Thread) -> Status {
    let budget = exec.config.runtime.max_instructions_per_run;
    let mut executed = 0;
    while executed < budget {
        executed += 1;
        let ip = thread.ip;
        match step(exec, thread) {
            Ok(None) => continue,
            Ok(Some(status)) => {
                match status {
                    Status::Blocked(reason) => thread.block(reason),
                    Status::Finished | Status::Killed { .. } => thread.finish(),
                    Status::Continuing | Status::Faulted(_) => {}
                }
                return status;
            }
            Err(kind) => {
                let fault = ThreadFault::new(ip, kind);
                warn!(
                    unit = %exec.host.unit(),
                    thread = %thread.id(),
                    ip,
                    fault = %kind,
                    "thread faulted"
                );
                thread.fault(fault);
                exec.host.report_fault(thread.id(), &fault);
                return Status::Faulted(fault);
            }
        }
    }
    trace!(thread = %thread.id(), executed, "instruction budget exhausted");
    Status::Continuing
}

/// Fetch, decode and execute a single instruction. `Ok(None)` means carry on with the next one.
fn step(exec: &mut ExecParams, thread: &mut Thread) -> Result<Option<Status>, FaultKind> {
    let ip = thread.ip;
    let op = exec
        .environment
        .module()
        .instruction_at(ip)
        .ok_or(FaultKind::UnknownOpcode)?;
    thread.ip += 1;
    trace!(thread = %thread.id(), ip, op = op.name(), "dispatch");

    let stack_limit = exec.config.runtime.max_stack_size;
    match op {
        Op::Add => binary_op!(thread, exec, |lhs, rhs| lhs.wrapping_add(rhs)),
        Op::Sub => binary_op!(thread, exec, |lhs, rhs| lhs.wrapping_sub(rhs)),
        Op::Mul => binary_op!(thread, exec, |lhs, rhs| lhs.wrapping_mul(rhs)),
        Op::Div => {
            let (lhs, rhs) = pop_operands(thread, exec.config.semantics.operand_order)?;
            let result = if rhs == 0 {
                match exec.config.semantics.divide_by_zero {
                    DivideByZero::Fault => return Err(FaultKind::ArithmeticFault),
                    DivideByZero::Zero => 0,
                }
            } else {
                lhs.wrapping_div(rhs)
            };
            thread.push(result, stack_limit)?;
        }

        Op::Lt => comparison_op!(thread, exec, <),
        Op::Le => comparison_op!(thread, exec, <=),
        Op::Eq => comparison_op!(thread, exec, ==),
        Op::Ne => comparison_op!(thread, exec, !=),
        Op::Gt => comparison_op!(thread, exec, >),
        Op::Ge => comparison_op!(thread, exec, >=),

        Op::Jump(target) => thread.ip = target.as_usize(),
        Op::JumpIfZero(target) => {
            if thread.pop()? == 0 {
                thread.ip = target.as_usize();
            }
        }

        Op::LogicalAnd => logical_op!(thread, exec, &&),
        Op::LogicalOr => logical_op!(thread, exec, ||),
        Op::LogicalXor => logical_op!(thread, exec, ^),
        Op::LogicalNot => {
            let v = thread.pop()?;
            thread.push((v == 0) as i32, stack_limit)?;
        }

        Op::BitAnd => binary_op!(thread, exec, |lhs, rhs| lhs & rhs),
        Op::BitOr => binary_op!(thread, exec, |lhs, rhs| lhs | rhs),
        Op::BitXor => binary_op!(thread, exec, |lhs, rhs| lhs ^ rhs),
        Op::BitNot => {
            let v = thread.pop()?;
            thread.push(!v, stack_limit)?;
        }

        Op::MoveObject { piece, axis } => {
            let piece = check_piece(exec, piece)?;
            let target = thread.pop()?;
            let speed = thread.pop()?;
            exec.host.pieces_mut().move_to(piece, axis, target, speed);
        }
        Op::MoveObjectNow { piece, axis } => {
            let piece = check_piece(exec, piece)?;
            let target = thread.pop()?;
            exec.host.pieces_mut().move_now(piece, axis, target);
        }
        Op::TurnObject { piece, axis } => {
            let piece = check_piece(exec, piece)?;
            let target = thread.pop()?;
            let speed = thread.pop()?;
            exec.host.pieces_mut().turn_to(
                piece,
                axis,
                angle_from_fixed(target),
                angle_from_fixed(speed),
            );
        }
        Op::TurnObjectNow { piece, axis } => {
            let piece = check_piece(exec, piece)?;
            let target = thread.pop()?;
            exec.host
                .pieces_mut()
                .turn_now(piece, axis, angle_from_fixed(target));
        }
        Op::SpinObject { piece, axis } => {
            let piece = check_piece(exec, piece)?;
            let speed = thread.pop()?;
            let acceleration = thread.pop()?;
            exec.host.pieces_mut().spin(
                piece,
                axis,
                angle_from_fixed(speed),
                angle_from_fixed(acceleration),
            );
        }
        Op::StopSpinObject { piece, axis } => {
            let piece = check_piece(exec, piece)?;
            let deceleration = thread.pop()?;
            exec.host
                .pieces_mut()
                .stop_spin(piece, axis, angle_from_fixed(deceleration));
        }
        Op::Explode(piece) => {
            let piece = check_piece(exec, piece)?;
            let kind = thread.pop()?;
            exec.host.explode(piece, kind);
        }
        Op::EmitSmoke(piece) => {
            let piece = check_piece(exec, piece)?;
            let kind = thread.pop()?;
            exec.host.emit_smoke(piece, kind);
        }
        Op::ShowObject(piece) | Op::HideObject(piece) => {
            let piece = check_piece(exec, piece)?;
            exec.host
                .pieces_mut()
                .set_visible(piece, matches!(op, Op::ShowObject(_)));
        }
        Op::EnableShading(piece) | Op::DisableShading(piece) => {
            let piece = check_piece(exec, piece)?;
            exec.host
                .pieces_mut()
                .set_shaded(piece, matches!(op, Op::EnableShading(_)));
        }
        Op::EnableCaching(piece) | Op::DisableCaching(piece) => {
            let piece = check_piece(exec, piece)?;
            exec.host
                .pieces_mut()
                .set_cached(piece, matches!(op, Op::EnableCaching(_)));
        }
        Op::AttachUnit => {
            let piece = thread.pop()?;
            let unit = thread.pop()?;
            let piece = piece_from_value(exec, piece)?;
            exec.host.attach_unit(piece, unit);
        }
        Op::DetachUnit => {
            let unit = thread.pop()?;
            exec.host.detach_unit(unit);
        }

        Op::WaitForMove { piece, axis } => {
            let piece = check_piece(exec, piece)?;
            if exec.host.pieces().is_move_in_progress(piece, axis) {
                return Ok(Some(Status::Blocked(BlockReason::Move { piece, axis })));
            }
        }
        Op::WaitForTurn { piece, axis } => {
            let piece = check_piece(exec, piece)?;
            if exec.host.pieces().is_turn_in_progress(piece, axis) {
                return Ok(Some(Status::Blocked(BlockReason::Turn { piece, axis })));
            }
        }
        Op::Sleep => {
            let ms = thread.pop()?;
            let until = exec.now + exec.config.runtime.sleep_ticks(ms);
            return Ok(Some(Status::Blocked(BlockReason::Sleep { until })));
        }

        Op::CallScript { script, argc } => {
            let entry = exec
                .environment
                .module()
                .script(script)
                .ok_or(FaultKind::UnknownScript(script))?;
            let width = entry.locals as usize;
            let params = entry.params as usize;
            let offset = entry.offset.as_usize();
            let args = thread.pop_n(argc as usize)?;
            if args.len() > width {
                return Err(FaultKind::OutOfRange {
                    slot: args.len(),
                    size: width,
                });
            }
            let frame = Frame::new(script, Some(thread.ip), width, params, &args);
            thread.push_frame(frame, exec.config.runtime.max_call_depth)?;
            thread.ip = offset;
        }
        Op::StartScript { script, argc } => {
            let args = thread.pop_n(argc as usize)?;
            let started = exec
                .environment
                .create_thread(script, &args, thread.signal_mask())?;
            trace!(thread = %thread.id(), started = %started, "started script");
        }
        Op::ReturnFromScript => {
            let frame = thread.pop_frame().ok_or(FaultKind::StackUnderflow)?;
            match frame.return_ip() {
                Some(return_ip) => thread.ip = return_ip,
                None => return Ok(Some(Status::Finished)),
            }
        }

        Op::SendSignal => {
            let signal = thread.pop()? as u32;
            exec.environment.send_signal(signal);
            if thread.intercepts(signal) {
                return Ok(Some(Status::Killed { signal }));
            }
        }
        Op::SetSignalMask => {
            let mask = thread.pop()? as u32;
            thread.set_signal_mask(mask);
        }

        Op::CreateLocalVariable => {
            thread.frame_mut()?.create_local()?;
        }
        Op::PushConstant(v) => thread.push(v, stack_limit)?,
        Op::PushLocalVariable(slot) => {
            let v = thread.frame()?.local(slot as usize)?;
            thread.push(v, stack_limit)?;
        }
        Op::PopLocalVariable(slot) => {
            let v = thread.pop()?;
            thread.frame_mut()?.set_local(slot as usize, v)?;
        }
        Op::PushStaticVariable(slot) => {
            let v = exec.environment.static_variable(slot as usize)?;
            thread.push(v, stack_limit)?;
        }
        Op::PopStaticVariable(slot) => {
            let v = thread.pop()?;
            exec.environment.set_static_variable(slot as usize, v)?;
        }
        Op::PopStack => {
            thread.pop()?;
        }

        Op::GetUnitValue => {
            let key = thread.pop()?;
            let v = exec.host.unit_value(key);
            thread.push(v, stack_limit)?;
        }
        Op::SetUnitValue => {
            let value = thread.pop()?;
            let key = thread.pop()?;
            exec.host.set_unit_value(key, value);
        }

        Op::RandomNumber => {
            let upper = thread.pop()?;
            let lower = thread.pop()?;
            let v = exec.environment.random_in(lower, upper);
            thread.push(v, stack_limit)?;
        }
    }
    Ok(None)
}
