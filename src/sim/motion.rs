//! Grid-aligned block motion
//!
//! Each axis of a block runs its own small state machine:
//! - Idling: at rest on a grid center
//! - Starting: accelerating for a fixed time after a push
//! - Coasting: constant velocity (only while frictionless)
//! - Stopping: decelerating so the block lands exactly on a grid center

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::coord::Pixel;
use super::direction::Direction;
use super::position::Position;
use crate::closest_grid_center_pixel;
use crate::consts::{DISTANCE_EPSILON, PIXEL_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MoveState {
    #[default]
    Idling,
    Starting,
    Coasting,
    Stopping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MoveSign {
    #[default]
    Zero,
    Positive,
    Negative,
}

impl MoveSign {
    pub fn from_vel(vel: f32) -> MoveSign {
        if vel > 0.0 {
            MoveSign::Positive
        } else if vel < 0.0 {
            MoveSign::Negative
        } else {
            MoveSign::Zero
        }
    }

    /// Sign of motion toward `direction` along its axis
    pub fn from_direction(direction: Direction) -> MoveSign {
        if direction.sign() > 0.0 { MoveSign::Positive } else { MoveSign::Negative }
    }

    pub fn flipped(self) -> MoveSign {
        match self {
            MoveSign::Zero => MoveSign::Zero,
            MoveSign::Positive => MoveSign::Negative,
            MoveSign::Negative => MoveSign::Positive,
        }
    }

    pub fn as_f32(self) -> f32 {
        match self {
            MoveSign::Zero => 0.0,
            MoveSign::Positive => 1.0,
            MoveSign::Negative => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Move {
    pub state: MoveState,
    pub sign: MoveSign,
    /// Remaining acceleration time while starting
    pub time_left: f32,
}

impl Move {
    pub fn reset(&mut self) {
        *self = Move::default();
    }

    pub fn flip_sign(&mut self) {
        self.sign = self.sign.flipped();
    }

    pub fn is_moving(&self) -> bool {
        self.state != MoveState::Idling
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub fn of(direction: Direction) -> Axis {
        if direction.is_horizontal() { Axis::X } else { Axis::Y }
    }

    pub fn other(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }

    pub fn get(self, v: Vec2) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
        }
    }

    pub fn set(self, v: &mut Vec2, value: f32) {
        match self {
            Axis::X => v.x = value,
            Axis::Y => v.y = value,
        }
    }

    pub fn get_pixel(self, p: Pixel) -> i16 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
        }
    }

    pub fn set_pixel(self, p: &mut Pixel, value: i16) {
        match self {
            Axis::X => p.x = value,
            Axis::Y => p.y = value,
        }
    }
}

/// Kinematic state of both axes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GridMotion {
    pub pos_delta: Vec2,
    pub prev_vel: Vec2,
    pub vel: Vec2,
    pub accel: Vec2,
    /// Velocity a starting block accelerates toward
    pub coast_vel: Vec2,
    /// Velocity a stopping block decelerates toward
    pub target_vel: Vec2,
    pub started_on_pixel: Pixel,
    pub stop_on_pixel: Pixel,
}

/// One axis of a [`GridMotion`], copied out so it can be simulated in isolation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisMotion {
    pub pos_delta: f32,
    pub prev_vel: f32,
    pub vel: f32,
    pub accel: f32,
    pub coast_vel: f32,
    pub target_vel: f32,
    pub started_on_pixel: i16,
    pub stop_on_pixel: i16,
}

impl GridMotion {
    pub fn component(&self, axis: Axis) -> AxisMotion {
        AxisMotion {
            pos_delta: axis.get(self.pos_delta),
            prev_vel: axis.get(self.prev_vel),
            vel: axis.get(self.vel),
            accel: axis.get(self.accel),
            coast_vel: axis.get(self.coast_vel),
            target_vel: axis.get(self.target_vel),
            started_on_pixel: axis.get_pixel(self.started_on_pixel),
            stop_on_pixel: axis.get_pixel(self.stop_on_pixel),
        }
    }

    pub fn set_component(&mut self, axis: Axis, c: AxisMotion) {
        axis.set(&mut self.pos_delta, c.pos_delta);
        axis.set(&mut self.prev_vel, c.prev_vel);
        axis.set(&mut self.vel, c.vel);
        axis.set(&mut self.accel, c.accel);
        axis.set(&mut self.coast_vel, c.coast_vel);
        axis.set(&mut self.target_vel, c.target_vel);
        axis.set_pixel(&mut self.started_on_pixel, c.started_on_pixel);
        axis.set_pixel(&mut self.stop_on_pixel, c.stop_on_pixel);
    }

    /// Integrate both axes over `dt` with constant acceleration
    pub fn integrate(&mut self, dt: f32) {
        self.prev_vel = self.vel;
        self.pos_delta = Vec2::new(
            calc_position_motion(self.vel.x, self.accel.x, dt),
            calc_position_motion(self.vel.y, self.accel.y, dt),
        );
        self.vel = Vec2::new(
            calc_velocity_motion(self.vel.x, self.accel.x, dt),
            calc_velocity_motion(self.vel.y, self.accel.y, dt),
        );
    }

    /// Moving (not just drifting) toward `direction`
    pub fn moving_in_direction(&self, direction: Direction) -> bool {
        let vel = Axis::of(direction).get(self.vel);
        vel * direction.sign() > 0.0
    }
}

/// Result of solving for a constant deceleration to a stop
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DecelToStop {
    pub accel: f32,
    pub time: f32,
}

// pf = pi + 0.5 * (vf + vi) * t with vf = 0
pub fn calc_decel_to_stop(initial_pos: f32, final_pos: f32, initial_vel: f32) -> DecelToStop {
    if initial_vel == 0.0 {
        return DecelToStop::default();
    }
    let time = (final_pos - initial_pos) / (0.5 * initial_vel);
    let accel = if time != 0.0 { -initial_vel / time } else { 0.0 };
    DecelToStop { accel, time }
}

/// Acceleration that covers `distance` from rest in `time`
pub fn calc_accel_from_stop(distance: f32, time: f32) -> f32 {
    distance / (0.5 * time * time)
}

pub fn calc_position_motion(v: f32, a: f32, dt: f32) -> f32 {
    v * dt + 0.5 * a * dt * dt
}

pub fn calc_velocity_motion(v: f32, a: f32, dt: f32) -> f32 {
    v + a * dt
}

/// Signed acceleration a move state implies
pub fn calc_accel_component_move(mv: Move, accel: f32) -> f32 {
    match (mv.state, mv.sign) {
        (MoveState::Starting, MoveSign::Positive) => accel,
        (MoveState::Starting, MoveSign::Negative) => -accel,
        (MoveState::Stopping, MoveSign::Positive) => -accel,
        (MoveState::Stopping, MoveSign::Negative) => accel,
        _ => 0.0,
    }
}

/// Next grid center in the direction of travel, in world units
///
/// `pos` is the block center along the axis; a block sitting exactly on a
/// center keeps that center as its goal.
pub fn find_next_grid_center(grid_width: i16, pos: f32, vel: f32) -> f32 {
    let pixel = (pos / PIXEL_SIZE).floor() as i16;
    let mut goal = closest_grid_center_pixel(grid_width, pixel);
    let goal_pos = goal as f32 * PIXEL_SIZE;
    if vel > 0.0 && goal_pos < pos - DISTANCE_EPSILON {
        goal += grid_width;
    } else if vel < 0.0 && goal_pos > pos + DISTANCE_EPSILON {
        goal -= grid_width;
    }
    goal as f32 * PIXEL_SIZE
}

/// Time to reach the next grid center at constant `vel`
pub fn calc_coast_motion_time_left(grid_width: i16, pos: f32, vel: f32) -> f32 {
    if vel == 0.0 {
        return 0.0;
    }
    (find_next_grid_center(grid_width, pos, vel) - pos) / vel
}

/// Deceleration that lands the block on a grid center ahead of it
///
/// Faster blocks travel extra cells: one per multiple of `normal_velocity`
/// beyond the first.
pub fn begin_stopping_grid_aligned_motion(grid_width: i16, motion: &AxisMotion, pos: f32, normal_velocity: f32) -> f32 {
    let final_pos = pos + motion.pos_delta;
    let positive = motion.vel >= 0.0;
    let cell = grid_width as f32 * PIXEL_SIZE;

    let pixel = (final_pos / PIXEL_SIZE).floor() as i16;
    let mut goal = closest_grid_center_pixel(grid_width, pixel) as f32 * PIXEL_SIZE;
    if positive && goal <= final_pos + DISTANCE_EPSILON {
        goal += cell;
    } else if !positive && goal >= final_pos - DISTANCE_EPSILON {
        goal -= cell;
    }

    if normal_velocity > 0.0 {
        let extra_cells = ((motion.vel.abs() / normal_velocity).round() - 1.0).max(0.0);
        goal += if positive { cell * extra_cells } else { -cell * extra_cells };
    }

    calc_decel_to_stop(final_pos, goal, motion.vel).accel
}

/// Advance one axis' move state after its kinematics were integrated over `dt`
///
/// `pos` is the block center along the axis before this step's delta.
/// `coast` is whether the block may keep sliding (it is on ice).
pub fn update_motion_grid_aligned(
    grid_width: i16,
    mv: &mut Move,
    motion: &mut AxisMotion,
    coast: bool,
    dt: f32,
    pos: f32,
    normal_velocity: f32,
) {
    match mv.state {
        MoveState::Idling => {}
        MoveState::Coasting => {
            if !coast {
                motion.accel = begin_stopping_grid_aligned_motion(grid_width, motion, pos, normal_velocity);
                motion.target_vel = 0.0;
                mv.state = MoveState::Stopping;
            }
        }
        MoveState::Starting => {
            let saved_time_left = mv.time_left;
            mv.time_left -= dt;
            if mv.time_left > 0.0 {
                return;
            }

            let dt_leftover = dt - saved_time_left.max(0.0);

            // simulate up to the moment acceleration ends
            let mut sim = *motion;
            sim.pos_delta = calc_position_motion(sim.prev_vel, sim.accel, saved_time_left.max(0.0));
            sim.vel = calc_velocity_motion(sim.prev_vel, sim.accel, saved_time_left.max(0.0));

            let mut new_accel = 0.0;
            mv.state = MoveState::Coasting;
            mv.time_left = 0.0;

            if coast {
                if sim.coast_vel.abs() > sim.vel.abs() && sim.accel != 0.0 {
                    mv.state = MoveState::Starting;
                    mv.time_left = ((sim.coast_vel - sim.vel) / sim.accel).abs();
                    new_accel = sim.accel;
                }
            } else {
                new_accel = begin_stopping_grid_aligned_motion(grid_width, &sim, pos, normal_velocity);
                sim.target_vel = 0.0;
                mv.state = MoveState::Stopping;
            }

            // and the rest of the step with the new acceleration
            sim.accel = new_accel;
            sim.pos_delta += calc_position_motion(sim.vel, sim.accel, dt_leftover);
            sim.vel = calc_velocity_motion(sim.vel, sim.accel, dt_leftover);

            motion.pos_delta = sim.pos_delta;
            motion.vel = sim.vel;
            motion.accel = sim.accel;
            motion.target_vel = sim.target_vel;
        }
        MoveState::Stopping => {
            let target = motion.target_vel;
            let crossed = (motion.prev_vel >= target && motion.vel <= target)
                || (motion.prev_vel <= target && motion.vel >= target);
            if !crossed {
                return;
            }

            if target == 0.0 {
                mv.state = MoveState::Idling;
                mv.sign = MoveSign::Zero;
                let landing = ((pos + motion.pos_delta) / PIXEL_SIZE).floor() as i16;
                motion.stop_on_pixel = closest_grid_center_pixel(grid_width, landing);
                motion.pos_delta = motion.stop_on_pixel as f32 * PIXEL_SIZE - pos;
            } else {
                mv.state = MoveState::Coasting;
            }
            motion.accel = 0.0;
            motion.vel = target;
            motion.target_vel = 0.0;
            mv.time_left = 0.0;
        }
    }
}

/// Eight-way heading between two positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveDirection {
    Left,
    Up,
    Right,
    Down,
    LeftUp,
    RightUp,
    LeftDown,
    RightDown,
}

/// Heading from `a` to `b`, diagonal when both axes differ by about the same amount
pub fn move_direction_between(a: Position, b: Position) -> Option<MoveDirection> {
    let diff = b - a;
    if diff.x.abs() < DISTANCE_EPSILON && diff.y.abs() < DISTANCE_EPSILON {
        return None;
    }

    let horizontal = if diff.x > 0.0 { MoveDirection::Right } else { MoveDirection::Left };
    let vertical = if diff.y > 0.0 { MoveDirection::Up } else { MoveDirection::Down };

    if (diff.x.abs() - diff.y.abs()).abs() < PIXEL_SIZE {
        return Some(match (horizontal, vertical) {
            (MoveDirection::Right, MoveDirection::Up) => MoveDirection::RightUp,
            (MoveDirection::Right, _) => MoveDirection::RightDown,
            (_, MoveDirection::Up) => MoveDirection::LeftUp,
            _ => MoveDirection::LeftDown,
        });
    }

    Some(if diff.x.abs() > diff.y.abs() { horizontal } else { vertical })
}
