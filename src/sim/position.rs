//! Sub-pixel positions
//!
//! A position is a whole pixel plus a fractional remainder in world units.
//! The remainder is kept in `[0, PIXEL_SIZE)` so two equal positions always
//! compare equal field by field.

use std::ops::{Add, AddAssign, Sub};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::coord::{Coord, Pixel};
use crate::consts::*;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub pixel: Pixel,
    /// Height above the floor in pixels
    pub z: i8,
    pub decimal: Vec2,
}

impl Position {
    pub fn new(pixel: Pixel, z: i8, decimal: Vec2) -> Self {
        let mut pos = Self { pixel, z, decimal };
        pos.canonicalize();
        pos
    }

    pub fn from_pixel(pixel: Pixel, z: i8) -> Self {
        Self { pixel, z, decimal: Vec2::ZERO }
    }

    /// Position at the exact center of a tile
    pub fn tile_center(coord: Coord, z: i8) -> Self {
        Self::from_pixel(coord.center_pixel(), z)
    }

    /// Fold whole pixels out of the decimal part
    pub fn canonicalize(&mut self) {
        let carry_x = (self.decimal.x / PIXEL_SIZE).floor();
        let carry_y = (self.decimal.y / PIXEL_SIZE).floor();
        self.pixel.x += carry_x as i16;
        self.pixel.y += carry_y as i16;
        self.decimal.x -= carry_x * PIXEL_SIZE;
        self.decimal.y -= carry_y * PIXEL_SIZE;
        // float error can land exactly on the upper bound
        if self.decimal.x >= PIXEL_SIZE {
            self.pixel.x += 1;
            self.decimal.x = 0.0;
        } else if self.decimal.x < 0.0 {
            self.decimal.x = 0.0;
        }
        if self.decimal.y >= PIXEL_SIZE {
            self.pixel.y += 1;
            self.decimal.y = 0.0;
        } else if self.decimal.y < 0.0 {
            self.decimal.y = 0.0;
        }
    }

    /// World units from the origin
    pub fn to_vec(&self) -> Vec2 {
        Vec2::new(
            self.pixel.x as f32 * PIXEL_SIZE + self.decimal.x,
            self.pixel.y as f32 * PIXEL_SIZE + self.decimal.y,
        )
    }

    pub fn from_vec(v: Vec2, z: i8) -> Self {
        Self::new(Pixel::default(), z, v)
    }

    pub fn to_coord(&self) -> Coord {
        self.pixel.to_coord()
    }

    /// Pixel nearest to the exact position, per axis
    pub fn closest_pixel(&self) -> Pixel {
        let round = |p: i16, d: f32| if d >= PIXEL_SIZE * 0.5 { p + 1 } else { p };
        Pixel::new(round(self.pixel.x, self.decimal.x), round(self.pixel.y, self.decimal.y))
    }

    /// Distance in world units
    pub fn distance(&self, other: &Position) -> f32 {
        (self.to_vec() - other.to_vec()).length()
    }
}

impl Add<Vec2> for Position {
    type Output = Position;
    fn add(self, rhs: Vec2) -> Position {
        Position::new(self.pixel, self.z, self.decimal + rhs)
    }
}

impl AddAssign<Vec2> for Position {
    fn add_assign(&mut self, rhs: Vec2) {
        *self = *self + rhs;
    }
}

impl Sub<Vec2> for Position {
    type Output = Position;
    fn sub(self, rhs: Vec2) -> Position {
        Position::new(self.pixel, self.z, self.decimal - rhs)
    }
}

impl Add for Position {
    type Output = Position;
    fn add(self, rhs: Position) -> Position {
        Position::new(self.pixel + rhs.pixel, self.z.saturating_add(rhs.z), self.decimal + rhs.decimal)
    }
}

/// Difference in world units
impl Sub for Position {
    type Output = Vec2;
    fn sub(self, rhs: Position) -> Vec2 {
        let pixels = self.pixel - rhs.pixel;
        Vec2::new(pixels.x as f32 * PIXEL_SIZE, pixels.y as f32 * PIXEL_SIZE)
            + (self.decimal - rhs.decimal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_carries_pixels() {
        let pos = Position::new(Pixel::new(10, 10), 0, Vec2::new(PIXEL_SIZE * 2.5, -PIXEL_SIZE * 0.5));
        assert_eq!(pos.pixel, Pixel::new(12, 9));
        assert!(pos.decimal.x >= 0.0 && pos.decimal.x < PIXEL_SIZE);
        assert!(pos.decimal.y >= 0.0 && pos.decimal.y < PIXEL_SIZE);
        assert!((pos.decimal.x - PIXEL_SIZE * 0.5).abs() < 0.000_01);
    }

    #[test]
    fn test_position_difference() {
        let a = Position::tile_center(Coord::new(2, 0), 0);
        let b = Position::tile_center(Coord::new(1, 0), 0);
        assert!(((a - b).x - TILE_SIZE).abs() < 0.0001);
        assert_eq!((a - b).y, 0.0);
    }

    #[test]
    fn test_add_vec_matches_to_vec() {
        let start = Position::from_pixel(Pixel::new(40, 8), 0);
        let moved = start + Vec2::new(TILE_SIZE, -HALF_TILE_SIZE);
        assert_eq!(moved.closest_pixel(), Pixel::new(56, 0));
    }
}
