//! The player avatar

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::coord::Coord;
use super::direction::{DIRECTION_COUNT, Direction};
use super::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Player {
    /// Center of the player's collision circle
    pub pos: Position,
    pub pos_delta: Vec2,
    pub vel: Vec2,
    pub accel: Vec2,
    pub face: Direction,
    /// How long the player has been leaning on `pushing_block`
    pub push_time: f32,
    pub pushing_block: Option<usize>,
    pub pushing_block_dir: Option<Direction>,
    /// Portal rotations between the player and the block it pushes
    pub pushing_block_rotation: u8,
    /// Portal rotations accumulated since each movement key went down
    pub move_rotation: [u8; DIRECTION_COUNT],
    pub squished: bool,
    pub stopping_block_from: Option<Direction>,
    pub has_bow: bool,
    /// How long the bow has been drawn
    pub bow_draw_time: f32,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            pos: Position::default(),
            pos_delta: Vec2::ZERO,
            vel: Vec2::ZERO,
            accel: Vec2::ZERO,
            face: Direction::Down,
            push_time: 0.0,
            pushing_block: None,
            pushing_block_dir: None,
            pushing_block_rotation: 0,
            move_rotation: [0; DIRECTION_COUNT],
            squished: false,
            stopping_block_from: None,
            has_bow: false,
            bow_draw_time: 0.0,
        }
    }
}

impl Player {
    /// Player standing in the middle of `coord`
    pub fn at(coord: Coord) -> Self {
        Self {
            pos: Position::tile_center(coord, 0),
            ..Default::default()
        }
    }

    pub fn coord(&self) -> Coord {
        self.pos.to_coord()
    }

    /// Drop any push in progress
    pub fn stop_pushing(&mut self) {
        self.pushing_block = None;
        self.pushing_block_dir = None;
        self.pushing_block_rotation = 0;
        self.push_time = 0.0;
    }

    /// Moving with a velocity component toward `direction`
    pub fn moving_toward(&self, direction: Direction) -> bool {
        self.vel.dot(direction.to_vec()) > 0.0
    }

    /// Portal rotations collected while travelling `direction`
    pub fn rotation_for(&self, direction: Direction) -> u8 {
        self.move_rotation[direction.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_starts_centered() {
        let player = Player::at(Coord::new(3, 2));
        assert_eq!(player.coord(), Coord::new(3, 2));
        assert_eq!(player.pos.pixel.x, 56);
        assert_eq!(player.face, Direction::Down);
    }

    #[test]
    fn test_moving_toward() {
        let player = Player { vel: Vec2::new(0.2, 0.0), ..Default::default() };
        assert!(player.moving_toward(Direction::Right));
        assert!(!player.moving_toward(Direction::Left));
        assert!(!player.moving_toward(Direction::Up));
    }
}
