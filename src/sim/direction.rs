//! Cardinal directions, direction masks and quarter-turn rotation

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// One of the four grid directions, in clockwise order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Left = 0,
    Up = 1,
    Right = 2,
    Down = 3,
}

pub const DIRECTION_COUNT: usize = 4;

impl Direction {
    pub const ALL: [Direction; DIRECTION_COUNT] =
        [Direction::Left, Direction::Up, Direction::Right, Direction::Down];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn from_index(index: usize) -> Direction {
        Self::ALL[index % DIRECTION_COUNT]
    }

    #[inline]
    pub fn opposite(self) -> Direction {
        Self::from_index(self.index() + 2)
    }

    #[inline]
    pub fn rotate_clockwise(self, times: u8) -> Direction {
        Self::from_index(self.index() + times as usize)
    }

    #[inline]
    pub fn rotate_counter_clockwise(self, times: u8) -> Direction {
        Self::from_index(self.index() + 4 * 3 - (times as usize % 4))
    }

    /// Clockwise quarter turns that take `b` onto `a`
    pub fn rotations_between(a: Direction, b: Direction) -> u8 {
        let (a, b) = (a as u8, b as u8);
        if a < b { a + 4 - b } else { a - b }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }

    pub fn is_vertical(self) -> bool {
        !self.is_horizontal()
    }

    /// +1 for right/up, -1 for left/down
    pub fn sign(self) -> f32 {
        match self {
            Direction::Right | Direction::Up => 1.0,
            Direction::Left | Direction::Down => -1.0,
        }
    }

    pub fn to_vec(self) -> Vec2 {
        match self {
            Direction::Left => Vec2::new(-1.0, 0.0),
            Direction::Up => Vec2::new(0.0, 1.0),
            Direction::Right => Vec2::new(1.0, 0.0),
            Direction::Down => Vec2::new(0.0, -1.0),
        }
    }

    pub fn mask(self) -> DirectionMask {
        DirectionMask(1 << self as u8)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Left => "LEFT",
            Direction::Up => "UP",
            Direction::Right => "RIGHT",
            Direction::Down => "DOWN",
        }
    }
}

/// Quarter turns a portal applies when going from a portal facing `a` to one facing `b`
pub fn portal_rotations_between(a: Direction, b: Direction) -> u8 {
    if a == b {
        2
    } else if a == b.opposite() {
        0
    } else {
        Direction::rotations_between(a, b)
    }
}

/// Rotate a vector by quarter turns clockwise: (x, y) -> (y, -x)
pub fn vec_rotate_quadrants_clockwise(mut v: Vec2, rotations: u8) -> Vec2 {
    for _ in 0..rotations % 4 {
        v = Vec2::new(v.y, -v.x);
    }
    v
}

pub fn vec_rotate_quadrants_counter_clockwise(mut v: Vec2, rotations: u8) -> Vec2 {
    for _ in 0..rotations % 4 {
        v = Vec2::new(-v.y, v.x);
    }
    v
}

/// Set of directions packed into four bits (left = 1, up = 2, right = 4, down = 8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DirectionMask(pub u8);

impl DirectionMask {
    pub const NONE: DirectionMask = DirectionMask(0);
    pub const ALL: DirectionMask = DirectionMask(0b1111);

    pub fn contains(self, direction: Direction) -> bool {
        self.0 & direction.mask().0 != 0
    }

    pub fn with(self, direction: Direction) -> DirectionMask {
        DirectionMask(self.0 | direction.mask().0)
    }

    pub fn without(self, direction: Direction) -> DirectionMask {
        DirectionMask(self.0 & !direction.mask().0)
    }

    pub fn is_empty(self) -> bool {
        self.0 & 0b1111 == 0
    }

    pub fn count(self) -> u32 {
        (self.0 & 0b1111).count_ones()
    }

    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |d| self.contains(*d))
    }

    pub fn rotate_clockwise(self, times: u8) -> DirectionMask {
        self.iter()
            .fold(DirectionMask::NONE, |mask, d| mask.with(d.rotate_clockwise(times)))
    }

    pub fn flip_horizontal(self) -> DirectionMask {
        self.iter().fold(DirectionMask::NONE, |mask, d| {
            mask.with(if d.is_horizontal() { d.opposite() } else { d })
        })
    }

    pub fn flip_vertical(self) -> DirectionMask {
        self.iter().fold(DirectionMask::NONE, |mask, d| {
            mask.with(if d.is_vertical() { d.opposite() } else { d })
        })
    }

    /// First set direction, checked up, down, left, right
    pub fn first(self) -> Option<Direction> {
        [Direction::Up, Direction::Down, Direction::Left, Direction::Right]
            .into_iter()
            .find(|d| self.contains(*d))
    }

    /// Directions a vector points toward, per axis sign
    pub fn from_vec(v: Vec2) -> DirectionMask {
        let mut mask = DirectionMask::NONE;
        if v.x > 0.0 {
            mask = mask.with(Direction::Right);
        } else if v.x < 0.0 {
            mask = mask.with(Direction::Left);
        }
        if v.y > 0.0 {
            mask = mask.with(Direction::Up);
        } else if v.y < 0.0 {
            mask = mask.with(Direction::Down);
        }
        mask
    }
}

impl From<Direction> for DirectionMask {
    fn from(direction: Direction) -> Self {
        direction.mask()
    }
}
