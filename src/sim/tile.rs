//! Tiles and the tile map
//!
//! Tile state is structured instead of packed into one flag word: which
//! sides carry wire, whether that wire is powered, and, for the three
//! segment wire clusters, which way the cluster faces and which segments
//! are present and on.

use serde::{Deserialize, Serialize};

use super::coord::Coord;
use super::direction::{Direction, DirectionMask};
use crate::consts::{BASE_LIGHT, MAX_MAP_DIM};

/// One of the three segments of a wire cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterSegment {
    Left,
    Mid,
    Right,
}

/// Three wire segments that drive a single output in `facing`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCluster {
    pub facing: Direction,
    /// None when the segment is absent, otherwise whether it is on
    pub left: Option<bool>,
    pub mid: Option<bool>,
    pub right: Option<bool>,
}

impl WireCluster {
    pub fn new(facing: Direction) -> Self {
        Self {
            facing,
            left: Some(false),
            mid: Some(false),
            right: Some(false),
        }
    }

    /// Every present segment is on
    pub fn all_on(&self) -> bool {
        [self.left, self.mid, self.right]
            .iter()
            .all(|segment| segment.is_none_or(|on| on))
    }

    /// Segment fed by a signal travelling in `travel`, if any
    pub fn segment_for(&self, travel: Direction) -> Option<ClusterSegment> {
        use Direction::*;
        let segment = match (self.facing, travel) {
            (Left, Left) | (Right, Right) | (Down, Down) | (Up, Up) => ClusterSegment::Mid,
            (Left, Up) | (Right, Down) | (Down, Left) | (Up, Right) => ClusterSegment::Left,
            (Left, Down) | (Right, Up) | (Down, Right) | (Up, Left) => ClusterSegment::Right,
            _ => return None,
        };
        Some(segment)
    }

    /// Flip a segment; false when it is absent
    pub fn toggle(&mut self, segment: ClusterSegment) -> bool {
        let slot = match segment {
            ClusterSegment::Left => &mut self.left,
            ClusterSegment::Mid => &mut self.mid,
            ClusterSegment::Right => &mut self.right,
        };
        match slot {
            Some(on) => {
                *on = !*on;
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TileFlags {
    pub solid: bool,
    pub iced: bool,
    pub checkpoint: bool,
    pub reset_immune: bool,
    /// Sides this tile's wire connects to
    pub wires: DirectionMask,
    /// Whether the wire carries power
    pub wire_on: bool,
    pub cluster: Option<WireCluster>,
}

impl TileFlags {
    pub fn toggle_wire(&mut self) {
        self.wire_on = !self.wire_on;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Visual tile id
    pub id: u8,
    pub light: u8,
    #[serde(default)]
    pub flags: TileFlags,
}

impl Default for Tile {
    fn default() -> Self {
        Self {
            id: 0,
            light: BASE_LIGHT,
            flags: TileFlags::default(),
        }
    }
}

impl Tile {
    pub fn is_solid(&self) -> bool {
        self.flags.solid
    }

    pub fn solid(id: u8) -> Self {
        Self {
            id,
            flags: TileFlags { solid: true, ..Default::default() },
            ..Default::default()
        }
    }

    pub fn wire(wires: DirectionMask, on: bool) -> Self {
        Self {
            flags: TileFlags { wires, wire_on: on, ..Default::default() },
            ..Default::default()
        }
    }
}

/// Row-major tile grid, row 0 at the bottom
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileMap {
    pub width: i16,
    pub height: i16,
    pub tiles: Vec<Tile>,
}

impl TileMap {
    pub fn new(width: i16, height: i16) -> Self {
        let width = width.clamp(0, MAX_MAP_DIM);
        let height = height.clamp(0, MAX_MAP_DIM);
        Self {
            width,
            height,
            tiles: vec![Tile::default(); width as usize * height as usize],
        }
    }

    /// Problem with the dimensions of a map read from outside, if any
    pub fn check_dims(&self) -> Result<(), String> {
        if !(0..=MAX_MAP_DIM).contains(&self.width) || !(0..=MAX_MAP_DIM).contains(&self.height) {
            return Err(format!(
                "map is {}x{} tiles, at most {MAX_MAP_DIM} tiles a side are supported",
                self.width, self.height
            ));
        }
        let expected = self.width as usize * self.height as usize;
        if self.tiles.len() != expected {
            return Err(format!("map has {} tiles, expected {expected}", self.tiles.len()));
        }
        Ok(())
    }

    pub fn in_bounds(&self, coord: Coord) -> bool {
        coord.x >= 0 && coord.y >= 0 && coord.x < self.width && coord.y < self.height
    }

    fn index(&self, coord: Coord) -> Option<usize> {
        self.in_bounds(coord)
            .then(|| coord.y as usize * self.width as usize + coord.x as usize)
    }

    pub fn get(&self, coord: Coord) -> Option<&Tile> {
        self.index(coord).and_then(|i| self.tiles.get(i))
    }

    pub fn get_mut(&mut self, coord: Coord) -> Option<&mut Tile> {
        self.index(coord).and_then(|i| self.tiles.get_mut(i))
    }

    /// Solid tile at `coord`; outside the map counts as solid
    pub fn is_solid(&self, coord: Coord) -> bool {
        self.get(coord).is_none_or(Tile::is_solid)
    }

    pub fn is_iced(&self, coord: Coord) -> bool {
        self.get(coord).is_some_and(|t| t.flags.iced)
    }

    pub fn set_iced(&mut self, coord: Coord, iced: bool) {
        if let Some(tile) = self.get_mut(coord) {
            tile.flags.iced = iced;
        }
    }

    pub fn reset_light(&mut self) {
        for tile in &mut self.tiles {
            tile.light = BASE_LIGHT;
        }
    }

    /// Every coordinate, bottom row first
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Coord::new(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_map_is_empty() {
        let map = TileMap::default();
        assert_eq!(map, TileMap::new(0, 0));
        assert!(map.get(Coord::new(0, 0)).is_none());
        assert!(map.is_solid(Coord::new(0, 0)));
    }

    #[test]
    fn test_map_size_stays_pixel_addressable() {
        let map = TileMap::new(5000, 3);
        assert_eq!(map.width, MAX_MAP_DIM);
        assert!(map.check_dims().is_ok());
        let far = Coord::new(MAX_MAP_DIM, MAX_MAP_DIM);
        assert!(far.pixel_rect().right > far.to_pixel().x);

        let mut wide = TileMap::new(2, 2);
        wide.width = MAX_MAP_DIM + 1;
        assert!(wide.check_dims().is_err());
        let mut short = TileMap::new(2, 2);
        short.tiles.pop();
        assert!(short.check_dims().is_err());
    }

    #[test]
    fn test_out_of_bounds_is_none_and_solid() {
        let map = TileMap::new(4, 3);
        assert!(map.get(Coord::new(4, 0)).is_none());
        assert!(map.get(Coord::new(-1, 0)).is_none());
        assert!(map.is_solid(Coord::new(0, 3)));
        assert!(!map.is_solid(Coord::new(3, 2)));
    }

    #[test]
    fn test_cluster_segments_follow_facing() {
        let cluster = WireCluster::new(Direction::Left);
        assert_eq!(cluster.segment_for(Direction::Left), Some(ClusterSegment::Mid));
        assert_eq!(cluster.segment_for(Direction::Up), Some(ClusterSegment::Left));
        assert_eq!(cluster.segment_for(Direction::Down), Some(ClusterSegment::Right));
        assert_eq!(cluster.segment_for(Direction::Right), None);

        let cluster = WireCluster::new(Direction::Up);
        assert_eq!(cluster.segment_for(Direction::Right), Some(ClusterSegment::Left));
        assert_eq!(cluster.segment_for(Direction::Down), None);
    }

    #[test]
    fn test_cluster_all_on_ignores_absent_segments() {
        let mut cluster = WireCluster {
            facing: Direction::Right,
            left: None,
            mid: Some(false),
            right: Some(true),
        };
        assert!(!cluster.all_on());
        assert!(cluster.toggle(ClusterSegment::Mid));
        assert!(cluster.all_on());
        assert!(!cluster.toggle(ClusterSegment::Left));
    }
}
