//! Spatial queries about blocks: what they touch, stand on and carry

use std::collections::BTreeSet;

use super::block::{Block, BlockCut, blocks_at_collidable_height};
use super::collision::{UnitRect, circle_overlaps_rect};
use super::coord::{Coord, Pixel, Rect};
use super::direction::{Direction, portal_rotations_between};
use super::interactive::InteractiveKind;
use super::portal_exit::find_portal_exits;
use super::world::World;
use crate::consts::*;

/// A block found against another, possibly seen through a portal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgainstResult {
    pub index: usize,
    /// Quarter turns clockwise the push direction picks up on the way
    pub rotations_through_portal: u8,
}

/// The one-pixel strip just outside `rect` on side `direction`
pub fn adjacent_strip(rect: &Rect, direction: Direction) -> Rect {
    match direction {
        Direction::Left => Rect::new(rect.left - 1, rect.bottom, rect.left - 1, rect.top),
        Direction::Right => Rect::new(rect.right + 1, rect.bottom, rect.right + 1, rect.top),
        Direction::Up => Rect::new(rect.left, rect.top + 1, rect.right, rect.top + 1),
        Direction::Down => Rect::new(rect.left, rect.bottom - 1, rect.right, rect.bottom - 1),
    }
}

/// `rect` moved `distance` pixels toward `direction`
pub fn shifted_rect(rect: &Rect, direction: Direction, distance: i16) -> Rect {
    let (dx, dy) = match direction {
        Direction::Left => (-distance, 0),
        Direction::Right => (distance, 0),
        Direction::Up => (0, distance),
        Direction::Down => (0, -distance),
    };
    Rect::new(rect.left + dx, rect.bottom + dy, rect.right + dx, rect.top + dy)
}

/// Tile coordinates a pixel rectangle touches
pub fn coords_in_rect(rect: &Rect) -> Vec<Coord> {
    let min = Pixel::new(rect.left, rect.bottom).to_coord();
    let max = Pixel::new(rect.right, rect.top).to_coord();
    (min.y..=max.y)
        .flat_map(|y| (min.x..=max.x).map(move |x| Coord::new(x, y)))
        .collect()
}

/// Footprint of a `cut` block centered on `center`
pub fn rect_centered_on(center: Pixel, cut: BlockCut) -> Rect {
    let left = center.x - cut.width() / 2;
    let bottom = center.y - cut.height() / 2;
    Rect::new(left, bottom, left + cut.width() - 1, bottom + cut.height() - 1)
}

fn blocks_touching(world: &World, rect: &Rect, z: i8, skip: usize) -> Option<usize> {
    world
        .blocks_in(rect)
        .into_iter()
        .find(|&i| i != skip && blocks_at_collidable_height(world.blocks[i].pos.z, z))
}

/// Block directly against `index` on side `direction`, looking through active portals
pub fn block_against_another_block(world: &World, index: usize, direction: Direction) -> Option<AgainstResult> {
    let block = world.blocks.get(index)?;
    let rect = block.rect();
    let strip = adjacent_strip(&rect, direction);

    if let Some(found) = blocks_touching(world, &strip, block.pos.z, index) {
        return Some(AgainstResult { index: found, rotations_through_portal: 0 });
    }

    for coord in coords_in_rect(&strip) {
        let Some(interactive) = world.interactive_at(coord) else {
            continue;
        };
        if !interactive.is_active_portal() || interactive.portal_face() != Some(direction) {
            continue;
        }
        let face = direction;
        let exits = find_portal_exits(world, coord);
        for (exit_face, exit) in exits.iter() {
            if exit == coord {
                continue;
            }
            let rotations = portal_rotations_between(face, exit_face);
            let offset = (block.center_pixel() - coord.center_pixel()).rotate_quadrants_clockwise(rotations);
            let center = exit.step(exit_face.opposite()).center_pixel() + offset;
            let copy = rect_centered_on(center, block.cut.rotate_clockwise(rotations));
            let rotated = direction.rotate_clockwise(rotations);
            let strip = adjacent_strip(&copy, rotated);
            // a block seeing its own back through a portal loop moves with itself
            if let Some(found) = blocks_touching(world, &strip, block.pos.z, index) {
                return Some(AgainstResult { index: found, rotations_through_portal: rotations });
            }
        }
    }
    None
}

/// Block diagonally ahead when moving `direction` while drifting `drift`
pub fn block_against_diagonal(world: &World, index: usize, direction: Direction, drift: Direction) -> Option<usize> {
    let block = world.blocks.get(index)?;
    let rect = block.rect();
    let corner = adjacent_strip(&adjacent_strip(&rect, direction), drift);
    let pixel = match (direction.is_horizontal(), drift) {
        (true, Direction::Up) => Pixel::new(corner.left, corner.top),
        (true, _) => Pixel::new(corner.left, corner.bottom),
        (false, Direction::Right) => Pixel::new(corner.right, corner.bottom),
        (false, _) => Pixel::new(corner.left, corner.bottom),
    };
    let probe = Rect::new(pixel.x, pixel.y, pixel.x, pixel.y);
    blocks_touching(world, &probe, block.pos.z, index)
}

pub fn block_against_solid_tile(world: &World, index: usize, direction: Direction) -> Option<Coord> {
    let block = world.blocks.get(index)?;
    let strip = adjacent_strip(&block.rect(), direction);
    coords_in_rect(&strip).into_iter().find(|&c| world.tilemap.is_solid(c))
}

/// Solid interactive against `index`, judged at the block's height
pub fn block_against_solid_interactive(world: &World, index: usize, direction: Direction) -> Option<usize> {
    let block = world.blocks.get(index)?;
    let strip = adjacent_strip(&block.rect(), direction);
    coords_in_rect(&strip).into_iter().find_map(|c| {
        let i = world.interactive_index_at(c)?;
        world.interactives[i].is_solid_at_height(block.pos.z).then_some(i)
    })
}

/// Player standing in the space the block would move into
pub fn block_against_player(world: &World, index: usize, direction: Direction) -> Option<usize> {
    let block = world.blocks.get(index)?;
    let ahead = shifted_rect(&block.rect(), direction, block.grid_width());
    let area = UnitRect::from_pixels(&ahead);
    let radius = world.config.player_radius;
    world.players.iter().position(|player| {
        player_at_block_height(player.pos.z, block.pos.z) && circle_overlaps_rect(player.pos.to_vec(), radius, &area)
    })
}

/// A player at `player_z` can collide with a block at `block_z`
pub fn player_at_block_height(player_z: i8, block_z: i8) -> bool {
    let (p, b) = (player_z as i16, block_z as i16);
    let h = HEIGHT_INTERVAL as i16;
    b > p - h && b < p + 2 * h
}

fn block_at_height_over(world: &World, rect: &Rect, z: i16, skip: usize) -> Option<usize> {
    world
        .blocks_in(rect)
        .into_iter()
        .find(|&i| i != skip && world.blocks[i].pos.z as i16 == z)
}

pub fn block_held_down_by_another_block(world: &World, index: usize) -> Option<usize> {
    let block = world.blocks.get(index)?;
    block_at_height_over(world, &block.rect(), block.pos.z as i16 + HEIGHT_INTERVAL as i16, index)
}

pub fn block_held_up_by_another_block(world: &World, index: usize) -> Option<usize> {
    let block = world.blocks.get(index)?;
    if block.pos.z <= 0 {
        return None;
    }
    block_at_height_over(world, &block.rect(), block.pos.z as i16 - HEIGHT_INTERVAL as i16, index)
}

/// Raised popup the block rests on
pub fn block_held_up_by_popup(world: &World, index: usize) -> Option<usize> {
    let block = world.blocks.get(index)?;
    coords_in_rect(&block.rect()).into_iter().find_map(|c| {
        let i = world.interactive_index_at(c)?;
        match world.interactives[i].kind {
            InteractiveKind::Popup { lift, .. } if lift.ticks > 1 && lift.ticks as i16 - 1 == block.pos.z as i16 => Some(i),
            _ => None,
        }
    })
}

/// Whatever the block stands on is frictionless
pub fn block_on_ice(world: &World, index: usize) -> bool {
    let Some(block) = world.blocks.get(index) else {
        return false;
    };
    if let Some(below) = block_held_up_by_another_block(world, index) {
        return world.blocks[below].element.is_icy();
    }
    if let Some(popup) = block_held_up_by_popup(world, index) {
        return matches!(world.interactives[popup].kind, InteractiveKind::Popup { iced: true, .. });
    }
    if block.pos.z != 0 {
        return false;
    }
    coords_in_rect(&block.rect()).into_iter().any(|c| {
        let interactive_iced = world.interactive_at(c).is_some_and(|i| match i.kind {
            InteractiveKind::Pit { iced, .. } => iced,
            InteractiveKind::PressurePlate { iced_under, .. } => iced_under,
            InteractiveKind::Popup { iced, .. } => iced,
            _ => false,
        });
        interactive_iced || world.tilemap.is_iced(c)
    })
}

/// Nothing below the block holds it up
pub fn block_on_air(world: &World, index: usize) -> bool {
    let Some(block) = world.blocks.get(index) else {
        return false;
    };
    block.pos.z > 0 && block_held_up_by_another_block(world, index).is_none() && block_held_up_by_popup(world, index).is_none()
}

/// Other members of the entanglement cycle starting after `index`
pub fn entangled_partners(blocks: &[Block], index: usize) -> Vec<usize> {
    let mut partners = Vec::new();
    let mut visited = BTreeSet::from([index]);
    let mut next = blocks.get(index).and_then(|b| b.entangle_index);
    while let Some(i) = next {
        if !visited.insert(i) {
            break;
        }
        let Some(block) = blocks.get(i) else {
            break;
        };
        partners.push(i);
        next = block.entangle_index;
    }
    partners
}

pub fn blocks_are_entangled(blocks: &[Block], a: usize, b: usize) -> bool {
    a != b && entangled_partners(blocks, a).contains(&b)
}

/// Players standing on top of the block
pub fn players_on_block(world: &World, index: usize) -> Vec<usize> {
    let Some(block) = world.blocks.get(index) else {
        return Vec::new();
    };
    let top = block.pos.z as i16 + HEIGHT_INTERVAL as i16;
    let rect = block.rect();
    (0..world.players.len())
        .filter(|&p| {
            let player = &world.players[p];
            player.pos.z as i16 == top && rect.contains_pixel(player.pos.pixel)
        })
        .collect()
}
