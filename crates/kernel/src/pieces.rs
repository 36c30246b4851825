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

//! Piece animation state: per (piece, axis) targets and speeds that the interpreter writes and
//! the simulation's per-tick integrator consumes. Nothing here runs scripts or blocks them;
//! threads that want to wait on a piece poll it through the scheduler.

use std::f32::consts::{PI, TAU};

use armature_script::units::linear_from_fixed;
use armature_script::{Axis, PieceId};
use strum::EnumCount;

/// A pending linear move toward `target`, at most `speed` per tick. Both are fixed point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOp {
    pub target: i32,
    pub speed: u32,
}

/// What is driving a piece's rotation on one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RotationOp {
    /// Turn along the shortest arc to `target`, at most `speed` radians per tick.
    Turn { target: f32, speed: f32 },
    /// Rotate continuously. `speed` ramps toward `target_speed` by `acceleration` each tick; a
    /// stopping spin ramps toward zero and ends there.
    Spin {
        speed: f32,
        target_speed: f32,
        acceleration: f32,
        stopping: bool,
    },
}

/// The animation state of a single piece.
#[derive(Debug, Clone, PartialEq)]
pub struct PieceState {
    /// Linear offsets in the operand stack's 16.16 fixed point.
    pub position: [i32; Axis::COUNT],
    /// Radians, normalized to `(-PI, PI]`.
    pub rotation: [f32; Axis::COUNT],
    pub moves: [Option<MoveOp>; Axis::COUNT],
    pub rotations: [Option<RotationOp>; Axis::COUNT],
    pub visible: bool,
    pub shaded: bool,
    pub cached: bool,
}

impl Default for PieceState {
    fn default() -> Self {
        Self {
            position: [0; Axis::COUNT],
            rotation: [0.0; Axis::COUNT],
            moves: [None; Axis::COUNT],
            rotations: [None; Axis::COUNT],
            visible: true,
            shaded: true,
            cached: true,
        }
    }
}

impl PieceState {
    /// Offset along `axis` in world units.
    pub fn world_position(&self, axis: Axis) -> f32 {
        linear_from_fixed(self.position[axis.index()])
    }
}

/// All pieces of one unit, indexed by [`PieceId`]. Operations on a piece the set does not have
/// are ignored; the interpreter validates piece ids against the module before calling in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PieceSet {
    pieces: Vec<PieceState>,
}

/// Wrap an angle into `(-PI, PI]`.
fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % TAU;
    if a <= -PI {
        a += TAU;
    } else if a > PI {
        a -= TAU;
    }
    a
}

/// Step a fixed-point `current` toward `target` by at most `step`. Exact, so every step with a
/// nonzero `step` makes progress.
fn approach_fixed(current: i32, target: i32, step: u32) -> i32 {
    let remaining = i64::from(target) - i64::from(current);
    if remaining.unsigned_abs() <= u64::from(step) {
        target
    } else if remaining > 0 {
        // Strictly between current and target, so it fits.
        (i64::from(current) + i64::from(step)) as i32
    } else {
        (i64::from(current) - i64::from(step)) as i32
    }
}

/// Step `current` toward `target` by at most `step`.
fn approach(current: f32, target: f32, step: f32) -> f32 {
    if (target - current).abs() <= step {
        target
    } else if target > current {
        current + step
    } else {
        current - step
    }
}

impl PieceSet {
    pub fn new(count: usize) -> Self {
        Self {
            pieces: vec![PieceState::default(); count],
        }
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn piece(&self, piece: PieceId) -> Option<&PieceState> {
        self.pieces.get(piece.index())
    }

    fn piece_mut(&mut self, piece: PieceId) -> Option<&mut PieceState> {
        self.pieces.get_mut(piece.index())
    }

    /// Offset in world units.
    pub fn position(&self, piece: PieceId, axis: Axis) -> Option<f32> {
        self.piece(piece).map(|p| p.world_position(axis))
    }

    /// Offset in fixed point.
    pub fn fixed_position(&self, piece: PieceId, axis: Axis) -> Option<i32> {
        self.piece(piece).map(|p| p.position[axis.index()])
    }

    pub fn rotation(&self, piece: PieceId, axis: Axis) -> Option<f32> {
        self.piece(piece).map(|p| p.rotation[axis.index()])
    }

    /// Start a smooth move. `target` and `speed` are fixed point; a zero speed snaps.
    pub fn move_to(&mut self, piece: PieceId, axis: Axis, target: i32, speed: i32) {
        let speed = speed.unsigned_abs();
        if speed == 0 {
            self.move_now(piece, axis, target);
            return;
        }
        if let Some(p) = self.piece_mut(piece) {
            p.moves[axis.index()] = Some(MoveOp { target, speed });
        }
    }

    pub fn move_now(&mut self, piece: PieceId, axis: Axis, value: i32) {
        if let Some(p) = self.piece_mut(piece) {
            p.position[axis.index()] = value;
            p.moves[axis.index()] = None;
        }
    }

    /// Start a smooth turn along the shortest arc. A zero speed snaps.
    pub fn turn_to(&mut self, piece: PieceId, axis: Axis, target: f32, speed: f32) {
        let speed = speed.abs();
        if speed == 0.0 {
            self.turn_now(piece, axis, target);
            return;
        }
        if let Some(p) = self.piece_mut(piece) {
            p.rotations[axis.index()] = Some(RotationOp::Turn {
                target: normalize_angle(target),
                speed,
            });
        }
    }

    pub fn turn_now(&mut self, piece: PieceId, axis: Axis, angle: f32) {
        if let Some(p) = self.piece_mut(piece) {
            p.rotation[axis.index()] = normalize_angle(angle);
            p.rotations[axis.index()] = None;
        }
    }

    /// Begin continuous rotation. With zero acceleration the piece reaches `speed` at once.
    pub fn spin(&mut self, piece: PieceId, axis: Axis, speed: f32, acceleration: f32) {
        let Some(p) = self.piece_mut(piece) else {
            return;
        };
        let acceleration = acceleration.abs();
        let current = match p.rotations[axis.index()] {
            Some(RotationOp::Spin { speed, .. }) => speed,
            _ => 0.0,
        };
        let current = if acceleration == 0.0 { speed } else { current };
        p.rotations[axis.index()] = Some(RotationOp::Spin {
            speed: current,
            target_speed: speed,
            acceleration,
            stopping: false,
        });
    }

    /// Wind a spin down. With zero deceleration it stops at once. Has no effect on a piece that
    /// is not spinning on that axis.
    pub fn stop_spin(&mut self, piece: PieceId, axis: Axis, deceleration: f32) {
        let Some(p) = self.piece_mut(piece) else {
            return;
        };
        let slot = &mut p.rotations[axis.index()];
        let Some(RotationOp::Spin { speed, .. }) = *slot else {
            return;
        };
        let deceleration = deceleration.abs();
        if deceleration == 0.0 {
            *slot = None;
            return;
        }
        *slot = Some(RotationOp::Spin {
            speed,
            target_speed: 0.0,
            acceleration: deceleration,
            stopping: true,
        });
    }

    pub fn set_visible(&mut self, piece: PieceId, visible: bool) {
        if let Some(p) = self.piece_mut(piece) {
            p.visible = visible;
        }
    }

    pub fn set_shaded(&mut self, piece: PieceId, shaded: bool) {
        if let Some(p) = self.piece_mut(piece) {
            p.shaded = shaded;
        }
    }

    pub fn set_cached(&mut self, piece: PieceId, cached: bool) {
        if let Some(p) = self.piece_mut(piece) {
            p.cached = cached;
        }
    }

    pub fn is_move_in_progress(&self, piece: PieceId, axis: Axis) -> bool {
        self.piece(piece)
            .is_some_and(|p| p.moves[axis.index()].is_some())
    }

    /// Only turns count; a spin never "arrives".
    pub fn is_turn_in_progress(&self, piece: PieceId, axis: Axis) -> bool {
        self.piece(piece).is_some_and(|p| {
            matches!(p.rotations[axis.index()], Some(RotationOp::Turn { .. }))
        })
    }

    pub fn is_spinning(&self, piece: PieceId, axis: Axis) -> bool {
        self.piece(piece).is_some_and(|p| {
            matches!(p.rotations[axis.index()], Some(RotationOp::Spin { .. }))
        })
    }

    /// Advance every pending move, turn and spin by one tick.
    pub fn advance(&mut self) {
        for p in &mut self.pieces {
            for axis in 0..Axis::COUNT {
                if let Some(op) = p.moves[axis] {
                    let next = approach_fixed(p.position[axis], op.target, op.speed);
                    p.position[axis] = next;
                    if next == op.target {
                        p.moves[axis] = None;
                    }
                }

                match p.rotations[axis] {
                    None => {}
                    Some(RotationOp::Turn { target, speed }) => {
                        let delta = normalize_angle(target - p.rotation[axis]);
                        if delta.abs() <= speed {
                            p.rotation[axis] = target;
                            p.rotations[axis] = None;
                        } else {
                            p.rotation[axis] =
                                normalize_angle(p.rotation[axis] + speed.copysign(delta));
                        }
                    }
                    Some(RotationOp::Spin {
                        speed,
                        target_speed,
                        acceleration,
                        stopping,
                    }) => {
                        let speed = if acceleration == 0.0 {
                            target_speed
                        } else {
                            approach(speed, target_speed, acceleration)
                        };
                        p.rotation[axis] = normalize_angle(p.rotation[axis] + speed);
                        p.rotations[axis] = if stopping && speed == 0.0 {
                            None
                        } else {
                            Some(RotationOp::Spin {
                                speed,
                                target_speed,
                                acceleration,
                                stopping,
                            })
                        };
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armature_script::units::linear_to_fixed;

    const P1: PieceId = PieceId(0);

    fn fx(units: f32) -> i32 {
        linear_to_fixed(units)
    }

    #[test]
    fn test_move_takes_distance_over_speed_ticks() {
        let mut pieces = PieceSet::new(1);
        pieces.move_to(P1, Axis::Y, fx(10.0), fx(1.0));

        let mut last = 0.0;
        for tick in 0..20 {
            assert_eq!(pieces.is_move_in_progress(P1, Axis::Y), tick < 10, "tick {tick}");
            pieces.advance();
            let y = pieces.position(P1, Axis::Y).unwrap();
            assert!(y >= last && y - last <= 1.0);
            last = y;
        }
        assert_eq!(last, 10.0);
    }

    #[test]
    fn test_move_clamps_on_arrival() {
        let mut pieces = PieceSet::new(1);
        pieces.move_to(P1, Axis::X, fx(-2.5), fx(1.0));
        pieces.advance();
        pieces.advance();
        assert_eq!(pieces.position(P1, Axis::X), Some(-2.0));
        pieces.advance();
        assert_eq!(pieces.position(P1, Axis::X), Some(-2.5));
        assert!(!pieces.is_move_in_progress(P1, Axis::X));
    }

    #[test]
    fn test_move_now_cancels_pending_move() {
        let mut pieces = PieceSet::new(1);
        pieces.move_to(P1, Axis::Y, fx(10.0), fx(1.0));
        pieces.advance();
        pieces.move_now(P1, Axis::Y, fx(4.0));
        assert!(!pieces.is_move_in_progress(P1, Axis::Y));
        assert_eq!(pieces.position(P1, Axis::Y), Some(4.0));
        pieces.advance();
        assert_eq!(pieces.position(P1, Axis::Y), Some(4.0));
    }

    #[test]
    fn test_zero_speed_snaps() {
        let mut pieces = PieceSet::new(1);
        pieces.move_to(P1, Axis::Z, fx(3.0), 0);
        assert_eq!(pieces.position(P1, Axis::Z), Some(3.0));
        assert!(!pieces.is_move_in_progress(P1, Axis::Z));
    }

    #[test]
    fn test_slow_move_far_from_origin_arrives() {
        let mut pieces = PieceSet::new(1);
        pieces.move_now(P1, Axis::X, fx(1000.0));
        pieces.move_to(P1, Axis::X, fx(1001.0), 1);

        for _ in 0..65535 {
            pieces.advance();
        }
        assert!(pieces.is_move_in_progress(P1, Axis::X));
        assert_eq!(pieces.fixed_position(P1, Axis::X), Some(fx(1001.0) - 1));
        pieces.advance();
        assert!(!pieces.is_move_in_progress(P1, Axis::X));
        assert_eq!(pieces.position(P1, Axis::X), Some(1001.0));
    }

    #[test]
    fn test_move_across_full_range() {
        let mut pieces = PieceSet::new(1);
        pieces.move_now(P1, Axis::Z, i32::MIN);
        pieces.move_to(P1, Axis::Z, i32::MAX, i32::MIN);
        pieces.advance();
        assert_eq!(pieces.fixed_position(P1, Axis::Z), Some(0));
        pieces.advance();
        assert_eq!(pieces.fixed_position(P1, Axis::Z), Some(i32::MAX));
        assert!(!pieces.is_move_in_progress(P1, Axis::Z));
    }

    #[test]
    fn test_turn_takes_shortest_arc() {
        let mut pieces = PieceSet::new(1);
        pieces.turn_now(P1, Axis::Y, PI * 0.9);
        pieces.turn_to(P1, Axis::Y, -PI * 0.9, 0.1);
        pieces.advance();
        // Going through PI is 0.2PI away; the long way would decrease the angle.
        let r = pieces.rotation(P1, Axis::Y).unwrap();
        assert!(r > PI * 0.9 || r < -PI * 0.9, "went the long way: {r}");
        for _ in 0..10 {
            pieces.advance();
        }
        assert!(!pieces.is_turn_in_progress(P1, Axis::Y));
        assert!((pieces.rotation(P1, Axis::Y).unwrap() + PI * 0.9).abs() < 1e-5);
    }

    #[test]
    fn test_spin_accelerates_and_stops() {
        let mut pieces = PieceSet::new(1);
        pieces.spin(P1, Axis::Y, 0.3, 0.1);
        pieces.advance();
        pieces.advance();
        pieces.advance();
        assert!(pieces.is_spinning(P1, Axis::Y));
        assert!(!pieces.is_turn_in_progress(P1, Axis::Y));
        let Some(RotationOp::Spin { speed, .. }) = pieces.piece(P1).unwrap().rotations[1] else {
            panic!("not spinning");
        };
        assert!((speed - 0.3).abs() < 1e-6);

        pieces.stop_spin(P1, Axis::Y, 0.15);
        pieces.advance();
        assert!(pieces.is_spinning(P1, Axis::Y));
        pieces.advance();
        assert!(!pieces.is_spinning(P1, Axis::Y));
    }

    #[test]
    fn test_unknown_piece_is_ignored() {
        let mut pieces = PieceSet::new(1);
        pieces.move_to(PieceId(5), Axis::X, fx(1.0), fx(1.0));
        assert!(!pieces.is_move_in_progress(PieceId(5), Axis::X));
        assert_eq!(pieces.position(PieceId(5), Axis::X), None);
    }

    #[test]
    fn test_flags() {
        let mut pieces = PieceSet::new(1);
        pieces.set_visible(P1, false);
        pieces.set_shaded(P1, false);
        pieces.set_cached(P1, false);
        let p = pieces.piece(P1).unwrap();
        assert!(!p.visible && !p.shaded && !p.cached);
    }
}
