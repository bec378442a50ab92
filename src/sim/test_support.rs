//! Compact world construction for tests

use super::block::Block;
use super::coord::Coord;
use super::direction::{Direction, DirectionMask};
use super::interactive::{Interactive, InteractiveKind};
use super::player::Player;
use super::tile::{Tile, TileMap};
use super::world::{MapData, World};
use crate::settings::SimConfig;

#[derive(Debug, Clone)]
pub struct WorldBuilder {
    map: MapData,
    config: SimConfig,
}

impl WorldBuilder {
    pub fn new(width: i16, height: i16) -> Self {
        Self {
            map: MapData {
                tilemap: TileMap::new(width, height),
                blocks: Vec::new(),
                interactives: Vec::new(),
                players: Vec::new(),
            },
            config: SimConfig::default(),
        }
    }

    pub fn tile_with(mut self, coord: Coord, edit: impl FnOnce(&mut Tile)) -> Self {
        if let Some(tile) = self.map.tilemap.get_mut(coord) {
            edit(tile);
        }
        self
    }

    pub fn solid(self, coord: Coord) -> Self {
        self.tile_with(coord, |t| t.flags.solid = true)
    }

    /// Solid tiles all around the edge of the map
    pub fn walled(mut self) -> Self {
        let (w, h) = (self.map.tilemap.width, self.map.tilemap.height);
        for coord in self.map.tilemap.coords().collect::<Vec<_>>() {
            if coord.x == 0 || coord.y == 0 || coord.x == w - 1 || coord.y == h - 1 {
                self = self.solid(coord);
            }
        }
        self
    }

    pub fn iced(self, coord: Coord) -> Self {
        self.tile_with(coord, |t| t.flags.iced = true)
    }

    pub fn wire(self, coord: Coord, wires: DirectionMask, on: bool) -> Self {
        self.tile_with(coord, |t| {
            t.flags.wires = wires;
            t.flags.wire_on = on;
        })
    }

    pub fn block(self, coord: Coord) -> Self {
        self.block_with(coord, |_| {})
    }

    pub fn block_with(mut self, coord: Coord, edit: impl FnOnce(&mut Block)) -> Self {
        let mut block = Block::at(coord);
        edit(&mut block);
        self.map.blocks.push(block);
        self
    }

    pub fn interactive(mut self, interactive: Interactive) -> Self {
        self.map.interactives.push(interactive);
        self
    }

    pub fn portal(self, coord: Coord, face: Direction, on: bool) -> Self {
        self.interactive(Interactive::portal(coord, face, on))
    }

    pub fn lever(self, coord: Coord) -> Self {
        self.interactive(Interactive::new(coord, InteractiveKind::Lever))
    }

    pub fn wire_cross(self, coord: Coord, mask: DirectionMask, on: bool) -> Self {
        self.interactive(Interactive::new(coord, InteractiveKind::WireCross { mask, on }))
    }

    pub fn player(self, coord: Coord) -> Self {
        self.player_with(coord, |_| {})
    }

    pub fn player_with(mut self, coord: Coord, edit: impl FnOnce(&mut Player)) -> Self {
        let mut player = Player::at(coord);
        edit(&mut player);
        self.map.players.push(player);
        self
    }

    pub fn config(mut self, edit: impl FnOnce(&mut SimConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    pub fn map(&self) -> &MapData {
        &self.map
    }

    pub fn build(self) -> World {
        World::new(&self.map, self.config)
    }
}
