//! World state
//!
//! The world owns the tile map, the players, the blocks and the
//! interactives, plus a quad tree over each of the two movable/keyed
//! collections. Map files are parsed elsewhere; they hand over a
//! [`MapData`] which the world copies in and indexes.

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::arrow::Arrow;
use super::block::Block;
use super::coord::{Coord, Pixel, Rect};
use super::interactive::Interactive;
use super::light::update_lighting;
use super::player::Player;
use super::quad_tree::QuadTree;
use super::tile::TileMap;
use super::undo::UndoHistory;
use crate::settings::SimConfig;

/// Populated world contents as supplied by a map loader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapData {
    pub tilemap: TileMap,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub interactives: Vec<Interactive>,
    #[serde(default)]
    pub players: Vec<Player>,
}

impl MapData {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let map: MapData = serde_json::from_str(json)?;
        map.tilemap.check_dims().map_err(<serde_json::Error as serde::de::Error>::custom)?;
        Ok(map)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Read and parse a map file
    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json).map_err(std::io::Error::other)
    }
}

#[derive(Debug, Clone, Default)]
pub struct World {
    pub tilemap: TileMap,
    pub players: Vec<Player>,
    pub blocks: Vec<Block>,
    pub interactives: Vec<Interactive>,
    pub arrows: Vec<Arrow>,
    pub block_qt: QuadTree,
    pub interactive_qt: QuadTree,
    pub config: SimConfig,
    pub undo: UndoHistory,
}

impl World {
    pub fn new(map: &MapData, config: SimConfig) -> Self {
        let mut world = Self {
            config,
            ..Default::default()
        };
        world.reset_map(map);
        world
    }

    /// Replace the whole world with a fresh copy of `map`
    pub fn reset_map(&mut self, map: &MapData) {
        self.tilemap = map.tilemap.clone();
        self.blocks = map.blocks.clone();
        self.interactives = map.interactives.clone();
        self.players = map.players.clone();
        self.arrows.clear();

        let block_count = self.blocks.len();
        for (i, block) in self.blocks.iter_mut().enumerate() {
            let Some(partner) = block.entangle_index else {
                continue;
            };
            if partner >= block_count || partner == i {
                log::warn!("Block {i} entangled with invalid block {partner}, dropping entanglement");
                block.entangle_index = None;
            }
        }

        let mut seen = std::collections::BTreeSet::new();
        self.interactives.retain(|interactive| {
            let fresh = seen.insert(interactive.coord);
            if !fresh {
                log::warn!("Dropping second interactive at {:?}", interactive.coord);
            }
            fresh
        });

        self.rebuild_indices();
        update_lighting(self);
        self.undo.reset(self.snapshot());
        log::info!(
            "Map reset: {}x{} tiles, {} blocks, {} interactives, {} players",
            self.tilemap.width,
            self.tilemap.height,
            self.blocks.len(),
            self.interactives.len(),
            self.players.len()
        );
    }

    /// Reset to the `number`th map of a loaded set; false when out of range
    pub fn load_map_number(&mut self, maps: &[MapData], number: usize) -> bool {
        match maps.get(number) {
            Some(map) => {
                log::info!("Loading map {number}");
                self.reset_map(map);
                true
            }
            None => {
                log::warn!("Map {number} not found ({} available)", maps.len());
                false
            }
        }
    }

    pub fn rebuild_indices(&mut self) {
        self.rebuild_block_index();
        self.interactive_qt = QuadTree::build(&self.interactives);
    }

    pub fn rebuild_block_index(&mut self) {
        self.block_qt = QuadTree::build(&self.blocks);
    }

    pub fn interactive_index_at(&self, coord: Coord) -> Option<usize> {
        self.interactive_qt.find_at(&self.interactives, coord.x, coord.y)
    }

    pub fn interactive_at(&self, coord: Coord) -> Option<&Interactive> {
        self.interactive_index_at(coord).and_then(|i| self.interactives.get(i))
    }

    pub fn interactive_at_mut(&mut self, coord: Coord) -> Option<&mut Interactive> {
        self.interactive_index_at(coord).and_then(|i| self.interactives.get_mut(i))
    }

    /// Interactives whose coordinate falls in the inclusive coordinate rectangle
    pub fn interactives_in(&self, coords: &Rect) -> Vec<usize> {
        let mut found = self.interactive_qt.find_in(&self.interactives, coords);
        found.sort_unstable();
        found
    }

    /// Blocks overlapping a pixel rectangle, lowest index first
    pub fn blocks_in(&self, rect: &Rect) -> Vec<usize> {
        let mut found = self.block_qt.find_in(&self.blocks, rect);
        found.sort_unstable();
        found
    }

    pub fn block_at_pixel(&self, pixel: Pixel) -> Option<usize> {
        self.block_qt.find_at(&self.blocks, pixel.x, pixel.y)
    }

    pub fn describe_block(&self, index: usize) -> String {
        let Some(block) = self.blocks.get(index) else {
            return format!("block {index}: none");
        };
        let mut out = String::new();
        let _ = writeln!(out, "block {index}: coord {:?} cut {:?} element {:?}", block.coord(), block.cut, block.element);
        let _ = writeln!(out, "  pos {:?} z {} decimal {:?}", block.pos.pixel, block.pos.z, block.pos.decimal);
        let _ = writeln!(
            out,
            "  vel {:?} accel {:?} coast {:?} delta {:?}",
            block.motion.vel, block.motion.accel, block.motion.coast_vel, block.motion.pos_delta
        );
        let _ = writeln!(out, "  horizontal {:?}", block.horizontal_move);
        let _ = writeln!(out, "  vertical {:?}", block.vertical_move);
        let _ = write!(out, "  rotation {} entangled with {:?}", block.rotation, block.entangle_index);
        out
    }

    pub fn describe_player(&self, index: usize) -> String {
        let Some(player) = self.players.get(index) else {
            return format!("player {index}: none");
        };
        let mut out = String::new();
        let _ = writeln!(out, "player {index}: coord {:?} face {}", player.coord(), player.face.as_str());
        let _ = writeln!(out, "  pos {:?} z {} decimal {:?}", player.pos.pixel, player.pos.z, player.pos.decimal);
        let _ = writeln!(out, "  vel {:?} delta {:?}", player.vel, player.pos_delta);
        let _ = write!(
            out,
            "  pushing {:?} {:?} rotation {} push time {:.3}",
            player.pushing_block,
            player.pushing_block_dir.map(|d| d.as_str()),
            player.pushing_block_rotation,
            player.push_time
        );
        out
    }

    pub fn describe_coord(&self, coord: Coord) -> String {
        let mut out = format!("coord {:?}", coord);
        match self.tilemap.get(coord) {
            Some(tile) => {
                let _ = write!(out, "\n  tile id {} light {} flags {:?}", tile.id, tile.light, tile.flags);
            }
            None => out.push_str("\n  outside the map"),
        }
        if let Some(interactive) = self.interactive_at(coord) {
            let _ = write!(out, "\n  {}: {:?}", interactive.name(), interactive.kind);
        }
        for index in self.blocks_in(&coord.pixel_rect()) {
            let _ = write!(out, "\n  block {index} at z {}", self.blocks[index].pos.z);
        }
        out
    }
}
