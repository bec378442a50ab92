//! Movable blocks

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::coord::{Coord, Pixel, Rect};
use super::direction::Direction;
use super::motion::{Axis, GridMotion, Move, MoveState, calc_accel_from_stop};
use super::position::Position;
use super::quad_tree::Spatial;
use crate::consts::*;

/// Footprint of a block within its tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlockCut {
    #[default]
    Whole,
    LeftHalf,
    RightHalf,
    TopHalf,
    BottomHalf,
    TopLeftQuarter,
    TopRightQuarter,
    BottomLeftQuarter,
    BottomRightQuarter,
}

impl BlockCut {
    pub fn width(self) -> i16 {
        match self {
            BlockCut::Whole | BlockCut::TopHalf | BlockCut::BottomHalf => TILE_SIZE_IN_PIXELS,
            _ => HALF_TILE_SIZE_IN_PIXELS,
        }
    }

    pub fn height(self) -> i16 {
        match self {
            BlockCut::Whole | BlockCut::LeftHalf | BlockCut::RightHalf => TILE_SIZE_IN_PIXELS,
            _ => HALF_TILE_SIZE_IN_PIXELS,
        }
    }

    pub fn mass(self) -> i32 {
        self.width() as i32 * self.height() as i32
    }

    pub fn lowest_dimension(self) -> i16 {
        self.width().min(self.height())
    }

    pub fn rotate_clockwise(self, times: u8) -> BlockCut {
        (0..times % 4).fold(self, |cut, _| match cut {
            BlockCut::Whole => BlockCut::Whole,
            BlockCut::LeftHalf => BlockCut::TopHalf,
            BlockCut::TopHalf => BlockCut::RightHalf,
            BlockCut::RightHalf => BlockCut::BottomHalf,
            BlockCut::BottomHalf => BlockCut::LeftHalf,
            BlockCut::TopLeftQuarter => BlockCut::TopRightQuarter,
            BlockCut::TopRightQuarter => BlockCut::BottomRightQuarter,
            BlockCut::BottomRightQuarter => BlockCut::BottomLeftQuarter,
            BlockCut::BottomLeftQuarter => BlockCut::TopLeftQuarter,
        })
    }

    /// Velocity a normal push settles at: half a grid cell of acceleration over `push_time`
    pub fn normal_pushed_velocity(self, force: f32, push_time: f32) -> f32 {
        self.push_accel(force, push_time) * push_time
    }

    pub fn push_accel(self, force: f32, push_time: f32) -> f32 {
        let half_cell = self.lowest_dimension() as f32 * PIXEL_SIZE * 0.5;
        calc_accel_from_stop(half_cell, push_time) * force
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Element {
    #[default]
    None,
    Fire,
    Ice,
    /// Coated in ice without being made of it
    OnlyIced,
}

impl Element {
    /// Element left on `self` after touching `other`
    pub fn transition(self, other: Element) -> Element {
        use Element::*;
        match (self, other) {
            (None, Fire) => Fire,
            (None, Ice) => Ice,
            (None, _) => None,
            (Fire, Ice) => None,
            (Fire, _) => Fire,
            (Ice, Fire) => None,
            (Ice, _) => Ice,
            (OnlyIced, Ice) => Ice,
            (OnlyIced, Fire) => Fire,
            (OnlyIced, _) => None,
        }
    }

    /// Frictionless to stand on
    pub fn is_icy(self) -> bool {
        matches!(self, Element::Ice | Element::OnlyIced)
    }
}

/// How momentum received on an axis this step combines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlockMomentum {
    #[default]
    None,
    Sum,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Block {
    /// Bottom-left corner of the footprint
    pub pos: Position,
    pub motion: GridMotion,
    pub horizontal_move: Move,
    pub vertical_move: Move,
    pub element: Element,
    /// Next block in this block's entanglement cycle
    pub entangle_index: Option<usize>,
    /// Quarter turns clockwise relative to its entangled partners
    pub rotation: u8,
    pub cut: BlockCut,
    pub held_up: bool,
    pub horizontal_momentum: BlockMomentum,
    pub vertical_momentum: BlockMomentum,
    pub impact_momentum: Vec2,
    pub kickback_momentum: Vec2,
    pub stopped_by_player_horizontal: bool,
    pub stopped_by_player_vertical: bool,
    pub successfully_moved: bool,
}

impl Default for Block {
    fn default() -> Self {
        Self {
            pos: Position::default(),
            motion: GridMotion::default(),
            horizontal_move: Move::default(),
            vertical_move: Move::default(),
            element: Element::None,
            entangle_index: None,
            rotation: 0,
            cut: BlockCut::Whole,
            held_up: false,
            horizontal_momentum: BlockMomentum::None,
            vertical_momentum: BlockMomentum::None,
            impact_momentum: Vec2::ZERO,
            kickback_momentum: Vec2::ZERO,
            stopped_by_player_horizontal: false,
            stopped_by_player_vertical: false,
            successfully_moved: false,
        }
    }
}

impl Spatial for Block {
    fn bounds(&self) -> Rect {
        self.rect()
    }
}

impl Block {
    /// Whole block resting on the floor of `coord`
    pub fn at(coord: Coord) -> Self {
        Self {
            pos: Position::from_pixel(coord.to_pixel(), 0),
            ..Default::default()
        }
    }

    pub fn width(&self) -> i16 {
        self.cut.width()
    }

    pub fn height(&self) -> i16 {
        self.cut.height()
    }

    pub fn mass(&self) -> i32 {
        self.cut.mass()
    }

    /// Inclusive pixel rectangle of the footprint
    pub fn rect(&self) -> Rect {
        let p = self.pos.pixel;
        Rect::new(p.x, p.y, p.x + self.width() - 1, p.y + self.height() - 1)
    }

    pub fn center_pixel(&self) -> Pixel {
        self.pos.pixel + Pixel::new(self.width() / 2, self.height() / 2)
    }

    /// Exact center in world units
    pub fn center(&self) -> Vec2 {
        self.pos.to_vec() + Vec2::new(self.width() as f32, self.height() as f32) * PIXEL_SIZE * 0.5
    }

    pub fn coord(&self) -> Coord {
        self.center_pixel().to_coord()
    }

    /// Height of the block's top surface
    pub fn top(&self) -> i8 {
        self.pos.z + HEIGHT_INTERVAL - 1
    }

    pub fn grid_width(&self) -> i16 {
        self.cut.lowest_dimension()
    }

    pub fn axis_move(&self, axis: Axis) -> &Move {
        match axis {
            Axis::X => &self.horizontal_move,
            Axis::Y => &self.vertical_move,
        }
    }

    pub fn axis_move_mut(&mut self, axis: Axis) -> &mut Move {
        match axis {
            Axis::X => &mut self.horizontal_move,
            Axis::Y => &mut self.vertical_move,
        }
    }

    /// Whether the block is moving (not stopping) toward `direction`
    pub fn moving_in_direction(&self, direction: Direction) -> bool {
        let mv = self.axis_move(Axis::of(direction));
        matches!(mv.state, MoveState::Starting | MoveState::Coasting) && self.motion.moving_in_direction(direction)
    }

    pub fn is_moving(&self) -> bool {
        self.horizontal_move.is_moving() || self.vertical_move.is_moving()
    }

    pub fn stop_axis(&mut self, axis: Axis) {
        self.axis_move_mut(axis).reset();
        axis.set(&mut self.motion.pos_delta, 0.0);
        axis.set(&mut self.motion.vel, 0.0);
        axis.set(&mut self.motion.prev_vel, 0.0);
        axis.set(&mut self.motion.accel, 0.0);
        axis.set(&mut self.motion.coast_vel, 0.0);
        axis.set(&mut self.motion.target_vel, 0.0);
    }

    /// Carry the move states along with a quarter turn clockwise of the velocity
    pub fn rotate_moves_clockwise(&mut self, rotations: u8) {
        match rotations % 4 {
            1 => {
                std::mem::swap(&mut self.horizontal_move, &mut self.vertical_move);
                self.vertical_move.flip_sign();
            }
            2 => {
                self.horizontal_move.flip_sign();
                self.vertical_move.flip_sign();
            }
            3 => {
                std::mem::swap(&mut self.horizontal_move, &mut self.vertical_move);
                self.horizontal_move.flip_sign();
            }
            _ => {}
        }
    }

    pub fn stop_horizontally(&mut self) {
        self.stop_axis(Axis::X);
    }

    pub fn stop_vertically(&mut self) {
        self.stop_axis(Axis::Y);
    }

    /// Record momentum received on an axis this step
    pub fn add_momentum(&mut self, axis: Axis, kind: BlockMomentum, momentum: f32) {
        let slot = match axis {
            Axis::X => &mut self.horizontal_momentum,
            Axis::Y => &mut self.vertical_momentum,
        };
        match kind {
            BlockMomentum::Sum => {
                if *slot != BlockMomentum::Stop {
                    *slot = BlockMomentum::Sum;
                    let current = axis.get(self.impact_momentum);
                    axis.set(&mut self.impact_momentum, current + momentum);
                }
            }
            BlockMomentum::Stop => {
                *slot = BlockMomentum::Stop;
                axis.set(&mut self.impact_momentum, 0.0);
            }
            BlockMomentum::None => {}
        }
    }

    /// Record momentum the block keeps after knocking into something
    pub fn add_kickback(&mut self, axis: Axis, momentum: f32) {
        let current = axis.get(self.kickback_momentum);
        axis.set(&mut self.kickback_momentum, current + momentum);
    }

    pub fn clear_momentum(&mut self) {
        self.horizontal_momentum = BlockMomentum::None;
        self.vertical_momentum = BlockMomentum::None;
        self.impact_momentum = Vec2::ZERO;
        self.kickback_momentum = Vec2::ZERO;
    }
}

/// Heights overlap closely enough for two blocks to touch side to side
pub fn blocks_at_collidable_height(a_z: i8, b_z: i8) -> bool {
    let a_top = a_z as i16 + HEIGHT_INTERVAL as i16 - 1;
    let b_top = b_z as i16 + HEIGHT_INTERVAL as i16 - 1;
    (a_z as i16) <= b_top && (b_z as i16) <= a_top
}

/// Clockwise quarter turns from `b`'s frame to `a`'s frame
pub fn blocks_rotations_between(a: &Block, b: &Block) -> u8 {
    Direction::rotations_between(Direction::from_index(a.rotation as usize), Direction::from_index(b.rotation as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::motion::MoveSign;

    #[test]
    fn test_cut_dimensions_and_mass() {
        assert_eq!(BlockCut::Whole.mass(), 256);
        assert_eq!(BlockCut::LeftHalf.width(), 8);
        assert_eq!(BlockCut::LeftHalf.height(), 16);
        assert_eq!(BlockCut::TopRightQuarter.mass(), 64);
        assert_eq!(BlockCut::BottomHalf.lowest_dimension(), 8);
    }

    #[test]
    fn test_cut_rotation_cycles() {
        assert_eq!(BlockCut::LeftHalf.rotate_clockwise(1), BlockCut::TopHalf);
        assert_eq!(BlockCut::LeftHalf.rotate_clockwise(4), BlockCut::LeftHalf);
        assert_eq!(BlockCut::BottomLeftQuarter.rotate_clockwise(2), BlockCut::TopRightQuarter);
        assert_eq!(BlockCut::Whole.rotate_clockwise(3), BlockCut::Whole);
    }

    #[test]
    fn test_element_transitions() {
        assert_eq!(Element::Fire.transition(Element::Ice), Element::None);
        assert_eq!(Element::None.transition(Element::Ice), Element::Ice);
        assert_eq!(Element::OnlyIced.transition(Element::None), Element::None);
        assert!(Element::OnlyIced.is_icy());
    }

    #[test]
    fn test_collidable_height() {
        assert!(blocks_at_collidable_height(0, 0));
        assert!(blocks_at_collidable_height(0, HEIGHT_INTERVAL - 1));
        assert!(!blocks_at_collidable_height(0, HEIGHT_INTERVAL));
    }

    #[test]
    fn test_block_geometry() {
        let block = Block::at(Coord::new(2, 3));
        assert_eq!(block.rect(), Rect::new(32, 48, 47, 63));
        assert_eq!(block.coord(), Coord::new(2, 3));
        assert_eq!(block.center_pixel(), Pixel::new(40, 56));
    }

    #[test]
    fn test_stop_axis_clears_motion() {
        let mut block = Block::at(Coord::new(0, 0));
        block.motion.vel = Vec2::new(1.0, 2.0);
        block.horizontal_move.state = MoveState::Coasting;
        block.stop_horizontally();
        assert_eq!(block.motion.vel, Vec2::new(0.0, 2.0));
        assert_eq!(block.horizontal_move.state, MoveState::Idling);
    }

    #[test]
    fn test_moves_follow_quarter_turns() {
        let mut block = Block::default();
        block.horizontal_move = Move { state: MoveState::Coasting, sign: MoveSign::Positive, time_left: 0.0 };

        block.rotate_moves_clockwise(1);
        assert_eq!(block.horizontal_move.state, MoveState::Idling);
        assert_eq!(block.vertical_move.state, MoveState::Coasting);
        assert_eq!(block.vertical_move.sign, MoveSign::Negative);

        block.rotate_moves_clockwise(3);
        assert_eq!(block.horizontal_move.sign, MoveSign::Positive);
        assert_eq!(block.vertical_move.sign, MoveSign::Zero);

        block.rotate_moves_clockwise(2);
        assert_eq!(block.horizontal_move.sign, MoveSign::Negative);
        assert_eq!(block.horizontal_move.state, MoveState::Coasting);
    }

    #[test]
    fn test_stop_momentum_wins_over_sum() {
        let mut block = Block::default();
        block.add_momentum(Axis::X, BlockMomentum::Sum, 3.0);
        block.add_momentum(Axis::X, BlockMomentum::Stop, 0.0);
        block.add_momentum(Axis::X, BlockMomentum::Sum, 5.0);
        assert_eq!(block.horizontal_momentum, BlockMomentum::Stop);
        assert_eq!(block.impact_momentum.x, 0.0);
    }

    #[test]
    fn test_clear_momentum_resets_both_accumulators() {
        let mut block = Block::default();
        block.add_momentum(Axis::Y, BlockMomentum::Sum, -2.0);
        block.add_kickback(Axis::Y, 1.5);
        block.add_kickback(Axis::Y, 0.5);
        assert_eq!(block.vertical_momentum, BlockMomentum::Sum);
        assert_eq!(block.kickback_momentum, Vec2::new(0.0, 2.0));

        block.clear_momentum();
        assert_eq!(block.vertical_momentum, BlockMomentum::None);
        assert_eq!(block.impact_momentum, Vec2::ZERO);
        assert_eq!(block.kickback_momentum, Vec2::ZERO);
    }
}
