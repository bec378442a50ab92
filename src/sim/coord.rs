//! Integer tile coordinates, pixels and inclusive rectangles

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use super::direction::Direction;
use crate::consts::{HALF_TILE_SIZE_IN_PIXELS, TILE_SIZE_IN_PIXELS};

/// Tile address on the map grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: i16,
    pub y: i16,
}

impl Coord {
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    /// Neighbor `distance` tiles away in `direction`
    pub fn moved(self, direction: Direction, distance: i16) -> Coord {
        match direction {
            Direction::Left => Coord::new(self.x - distance, self.y),
            Direction::Up => Coord::new(self.x, self.y + distance),
            Direction::Right => Coord::new(self.x + distance, self.y),
            Direction::Down => Coord::new(self.x, self.y - distance),
        }
    }

    pub fn step(self, direction: Direction) -> Coord {
        self.moved(direction, 1)
    }

    /// Bottom-left pixel of the tile
    pub fn to_pixel(self) -> Pixel {
        Pixel::new(self.x * TILE_SIZE_IN_PIXELS, self.y * TILE_SIZE_IN_PIXELS)
    }

    pub fn center_pixel(self) -> Pixel {
        self.to_pixel() + Pixel::new(HALF_TILE_SIZE_IN_PIXELS, HALF_TILE_SIZE_IN_PIXELS)
    }

    /// The tile as a pixel rectangle
    pub fn pixel_rect(self) -> Rect {
        let p = self.to_pixel();
        Rect::new(p.x, p.y, p.x + TILE_SIZE_IN_PIXELS - 1, p.y + TILE_SIZE_IN_PIXELS - 1)
    }

    /// Single-point rectangle in coordinate space
    pub fn as_rect(self) -> Rect {
        Rect::new(self.x, self.y, self.x, self.y)
    }

    /// The eight neighbors, starting at the left and going clockwise
    pub fn surrounding(self) -> [Coord; 8] {
        [
            Coord::new(self.x - 1, self.y),
            Coord::new(self.x - 1, self.y + 1),
            Coord::new(self.x, self.y + 1),
            Coord::new(self.x + 1, self.y + 1),
            Coord::new(self.x + 1, self.y),
            Coord::new(self.x + 1, self.y - 1),
            Coord::new(self.x, self.y - 1),
            Coord::new(self.x - 1, self.y - 1),
        ]
    }

    /// Chebyshev distance
    pub fn distance(self, other: Coord) -> i16 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

impl Add for Coord {
    type Output = Coord;
    fn add(self, rhs: Coord) -> Coord {
        Coord::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Coord {
    type Output = Coord;
    fn sub(self, rhs: Coord) -> Coord {
        Coord::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Add<Direction> for Coord {
    type Output = Coord;
    fn add(self, rhs: Direction) -> Coord {
        self.step(rhs)
    }
}

/// Dominant direction pointing from `a` toward `b`, None when equal
pub fn direction_between(a: Coord, b: Coord) -> Option<Direction> {
    if a == b {
        return None;
    }
    let diff = a - b;
    if diff.x.abs() > diff.y.abs() {
        return Some(if diff.x > 0 { Direction::Left } else { Direction::Right });
    }
    Some(if diff.y > 0 { Direction::Down } else { Direction::Up })
}

/// Pixel address in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pixel {
    pub x: i16,
    pub y: i16,
}

impl Pixel {
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    pub fn to_coord(self) -> Coord {
        Coord::new(self.x.div_euclid(TILE_SIZE_IN_PIXELS), self.y.div_euclid(TILE_SIZE_IN_PIXELS))
    }

    pub fn rotate_quadrants_clockwise(mut self, rotations: u8) -> Pixel {
        for _ in 0..rotations % 4 {
            self = Pixel::new(self.y, -self.x);
        }
        self
    }

    pub fn rotate_quadrants_counter_clockwise(mut self, rotations: u8) -> Pixel {
        for _ in 0..rotations % 4 {
            self = Pixel::new(-self.y, self.x);
        }
        self
    }
}

impl Add for Pixel {
    type Output = Pixel;
    fn add(self, rhs: Pixel) -> Pixel {
        Pixel::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Pixel {
    type Output = Pixel;
    fn sub(self, rhs: Pixel) -> Pixel {
        Pixel::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Axis aligned rectangle with inclusive bounds on every side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i16,
    pub bottom: i16,
    pub right: i16,
    pub top: i16,
}

impl Rect {
    pub const fn new(left: i16, bottom: i16, right: i16, top: i16) -> Self {
        Self { left, bottom, right, top }
    }

    pub fn contains(&self, x: i16, y: i16) -> bool {
        x >= self.left && x <= self.right && y >= self.bottom && y <= self.top
    }

    pub fn contains_pixel(&self, pixel: Pixel) -> bool {
        self.contains(pixel.x, pixel.y)
    }

    /// Any shared point, edges included
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left <= other.right
            && self.right >= other.left
            && self.bottom <= other.top
            && self.top >= other.bottom
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.left.min(other.left),
            self.bottom.min(other.bottom),
            self.right.max(other.right),
            self.top.max(other.top),
        )
    }

    pub fn center(&self) -> Pixel {
        Pixel::new(
            self.left + (self.right - self.left) / 2,
            self.bottom + (self.top - self.bottom) / 2,
        )
    }

    pub fn width(&self) -> i16 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> i16 {
        self.top - self.bottom + 1
    }

    /// Grow every side by `amount`
    pub fn expand(&self, amount: i16) -> Rect {
        Rect::new(self.left - amount, self.bottom - amount, self.right + amount, self.top + amount)
    }
}

/// Whether any corner or the center of `a` lies in `b`
///
/// Also catches rectangles that share an edge line and overlap along it,
/// which the corner test alone misses when `a` spans past `b` on both ends.
pub fn rect_in_rect(a: &Rect, b: &Rect) -> bool {
    let corners = [
        (a.left, a.bottom),
        (a.left, a.top),
        (a.right, a.bottom),
        (a.right, a.top),
    ];
    if corners.iter().any(|&(x, y)| b.contains(x, y)) {
        return true;
    }
    let center = a.center();
    if b.contains_pixel(center) {
        return true;
    }
    if a.left == b.left && a.bottom <= b.top && a.top >= b.bottom {
        return true;
    }
    a.top == b.top && a.left <= b.right && a.right >= b.left
}
