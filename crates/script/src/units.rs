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

//! Fixed-point conventions for values that travel on the operand stack.
//!
//! Linear quantities are scaled by 65536 per world unit. Angles use 65536 units per full turn.
//! Speeds are per tick.

use std::f32::consts::TAU;

pub const LINEAR_SCALE: f32 = 65536.0;
pub const ANGULAR_SCALE: f32 = 65536.0;

#[inline]
pub fn linear_from_fixed(value: i32) -> f32 {
    value as f32 / LINEAR_SCALE
}

#[inline]
pub fn linear_to_fixed(value: f32) -> i32 {
    (value * LINEAR_SCALE).round() as i32
}

/// Angle in radians.
#[inline]
pub fn angle_from_fixed(value: i32) -> f32 {
    value as f32 * TAU / ANGULAR_SCALE
}

#[inline]
pub fn angle_to_fixed(radians: f32) -> i32 {
    (radians * ANGULAR_SCALE / TAU).round() as i32
}
