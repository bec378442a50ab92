//! Portal exit discovery and teleportation
//!
//! Portals are linked by wire. Starting from the wires touching a portal,
//! the search follows wire tiles and wire crosses until it reaches other
//! portals, recording each one under the direction it faces. The starting
//! portal is found again through its own wire and is included.

use std::collections::BTreeSet;

use glam::Vec2;

use super::coord::{Coord, direction_between};
use super::direction::{DIRECTION_COUNT, Direction, portal_rotations_between, vec_rotate_quadrants_clockwise};
use super::interactive::{Interactive, InteractiveKind};
use super::position::Position;
use super::world::World;

/// Portals reachable over wire, grouped by the direction each faces
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortalExits {
    pub directions: [Vec<Coord>; DIRECTION_COUNT],
}

impl PortalExits {
    fn add(&mut self, face: Direction, coord: Coord) {
        let coords = &mut self.directions[face.index()];
        if !coords.contains(&coord) {
            coords.push(coord);
        }
    }

    /// Every exit as (facing, coordinate)
    pub fn iter(&self) -> impl Iterator<Item = (Direction, Coord)> + '_ {
        Direction::ALL
            .into_iter()
            .flat_map(move |d| self.directions[d.index()].iter().map(move |&c| (d, c)))
    }

    pub fn count(&self) -> usize {
        self.directions.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

fn is_acceptable_portal(interactive: Option<&Interactive>, require_on: bool, from_on_wire: bool) -> bool {
    let Some(interactive) = interactive else {
        return false;
    };
    if require_on {
        return interactive.is_active_portal();
    }
    match interactive.kind {
        InteractiveKind::Portal { on: true, wants_to_turn_off, .. } => from_on_wire || wants_to_turn_off,
        _ => false,
    }
}

/// Active portals wired to the active portal at `coord`
pub fn find_portal_exits(world: &World, coord: Coord) -> PortalExits {
    find_portal_exits_with(world, coord, true)
}

/// Portals wired to the portal at `coord`
///
/// With `require_on` only powered wires and active portals count; without
/// it the search walks unpowered wire too, which is how a portal that is
/// switching off still finds its partners.
pub fn find_portal_exits_with(world: &World, coord: Coord, require_on: bool) -> PortalExits {
    let mut exits = PortalExits::default();
    if !is_acceptable_portal(world.interactive_at(coord), require_on, true) {
        return exits;
    }

    // (coordinate, side we arrived from, whether we arrived over powered wire)
    let mut pending: Vec<(Coord, Option<Direction>, bool)> = Vec::new();
    for d in Direction::ALL {
        let adjacent = coord.step(d);
        let Some(tile) = world.tilemap.get(adjacent) else {
            continue;
        };
        if require_on && !tile.flags.wire_on {
            continue;
        }
        if tile.flags.wires.contains(d.opposite()) {
            pending.push((adjacent, None, tile.flags.wire_on));
        }
    }

    let mut visited: BTreeSet<(Coord, Option<Direction>)> = BTreeSet::new();
    while let Some((current, from, from_on_wire)) = pending.pop() {
        if !visited.insert((current, from)) {
            continue;
        }

        let interactive = world.interactive_at(current);
        if is_acceptable_portal(interactive, require_on, from_on_wire) {
            if let Some(face) = interactive.and_then(Interactive::portal_face) {
                exits.add(face, current);
            }
            continue;
        }

        if let Some(InteractiveKind::WireCross { mask, on }) = interactive.map(|i| i.kind) {
            let connected = from.is_some_and(|f| mask.contains(f));
            if connected && (on || !require_on) {
                for d in mask.iter().filter(|&d| Some(d) != from) {
                    pending.push((current.step(d), Some(d.opposite()), on));
                }
            }
            continue;
        }

        let Some(tile) = world.tilemap.get(current) else {
            continue;
        };
        let wire_on = tile.flags.wire_on;
        if require_on && !wire_on {
            continue;
        }
        for d in tile.flags.wires.iter().filter(|&d| Some(d) != from) {
            pending.push((current.step(d), Some(d.opposite()), wire_on));
        }
    }

    exits
}

/// The portal at `coord` leads somewhere other than back to itself
pub fn portal_has_destination(world: &World, coord: Coord) -> bool {
    find_portal_exits(world, coord)
        .iter()
        .any(|(_, exit)| exit != coord && world.interactive_at(exit).is_some_and(Interactive::is_active_portal))
}

/// One way out of a portal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeleportResult {
    pub pos: Position,
    pub delta: Vec2,
    /// Quarter turns clockwise applied to the object
    pub rotations: u8,
    pub src_portal: Coord,
    pub dst_portal: Coord,
}

/// Map a position that just moved from `premove` into `postmove` through the portal there
///
/// The object has to be travelling in the direction the portal faces. Its
/// offset from the portal's center and its movement delta are turned by the
/// rotation between the two portals, and it comes out one tile past each
/// destination portal on the side opposite that portal's facing.
pub fn teleport_position_across_portal(
    world: &World,
    pos: Position,
    delta: Vec2,
    premove: Coord,
    postmove: Coord,
) -> Vec<TeleportResult> {
    if premove == postmove {
        return Vec::new();
    }
    let Some(interactive) = world.interactive_at(postmove) else {
        return Vec::new();
    };
    if !interactive.is_active_portal() {
        return Vec::new();
    }
    let Some(face) = interactive.portal_face() else {
        return Vec::new();
    };
    if direction_between(postmove, premove).map(Direction::opposite) != Some(face) {
        return Vec::new();
    }

    let offset = pos - Position::tile_center(postmove, pos.z);
    find_portal_exits(world, postmove)
        .iter()
        .filter(|&(_, exit)| exit != postmove)
        .map(|(exit_face, exit)| {
            let rotations = portal_rotations_between(face, exit_face);
            let rotated_offset = vec_rotate_quadrants_clockwise(offset, rotations);
            TeleportResult {
                pos: Position::tile_center(exit.step(exit_face.opposite()), pos.z) + rotated_offset,
                delta: vec_rotate_quadrants_clockwise(delta, rotations),
                rotations,
                src_portal: postmove,
                dst_portal: exit,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::direction::DirectionMask;
    use crate::sim::test_support::WorldBuilder;
    use crate::consts::PIXEL_SIZE;

    /// Two active portals joined by a powered wire running along row 0
    fn linked_portals(a_face: Direction, b_face: Direction) -> World {
        let horizontal = DirectionMask::NONE.with(Direction::Left).with(Direction::Right);
        let mut builder = WorldBuilder::new(8, 4)
            .portal(Coord::new(1, 1), a_face, true)
            .portal(Coord::new(6, 1), b_face, true)
            .wire(Coord::new(1, 0), DirectionMask::NONE.with(Direction::Up).with(Direction::Right), true)
            .wire(Coord::new(6, 0), DirectionMask::NONE.with(Direction::Up).with(Direction::Left), true);
        for x in 2..6 {
            builder = builder.wire(Coord::new(x, 0), horizontal, true);
        }
        builder.build()
    }

    #[test]
    fn test_exits_include_source_and_partner() {
        let world = linked_portals(Direction::Right, Direction::Up);
        let exits = find_portal_exits(&world, Coord::new(1, 1));
        assert_eq!(exits.directions[Direction::Right.index()], vec![Coord::new(1, 1)]);
        assert_eq!(exits.directions[Direction::Up.index()], vec![Coord::new(6, 1)]);
        assert_eq!(exits.count(), 2);
        assert!(portal_has_destination(&world, Coord::new(1, 1)));
    }

    #[test]
    fn test_unpowered_wire_only_found_without_require_on() {
        let mut world = linked_portals(Direction::Right, Direction::Up);
        for x in 1..7 {
            if let Some(tile) = world.tilemap.get_mut(Coord::new(x, 0)) {
                tile.flags.wire_on = false;
            }
        }
        assert!(find_portal_exits(&world, Coord::new(1, 1)).is_empty());
        let exits = find_portal_exits_with(&world, Coord::new(1, 1), false);
        assert!(exits.is_empty(), "unpowered wire does not reach portals that stay on");
    }

    #[test]
    fn test_wire_cross_needs_matching_side() {
        let world = WorldBuilder::new(6, 3)
            .portal(Coord::new(1, 1), Direction::Left, true)
            .portal(Coord::new(4, 1), Direction::Left, true)
            .wire(Coord::new(1, 0), DirectionMask::NONE.with(Direction::Up).with(Direction::Right), true)
            .wire_cross(Coord::new(2, 0), DirectionMask::NONE.with(Direction::Up).with(Direction::Down), true)
            .wire(Coord::new(3, 0), DirectionMask::NONE.with(Direction::Left).with(Direction::Right), true)
            .wire(Coord::new(4, 0), DirectionMask::NONE.with(Direction::Left).with(Direction::Up), true)
            .build();
        let exits = find_portal_exits(&world, Coord::new(1, 1));
        assert_eq!(exits.count(), 1);
        assert_eq!(exits.directions[Direction::Left.index()], vec![Coord::new(1, 1)]);
    }

    #[test]
    fn test_wire_loop_terminates() {
        let all = DirectionMask::ALL;
        let mut builder = WorldBuilder::new(5, 5).portal(Coord::new(2, 2), Direction::Up, true);
        for c in Coord::new(2, 2).surrounding() {
            builder = builder.wire(c, all, true);
        }
        let world = builder.build();
        let exits = find_portal_exits(&world, Coord::new(2, 2));
        assert_eq!(exits.count(), 1);
    }

    #[test]
    fn test_teleport_requires_entering_along_face() {
        let world = linked_portals(Direction::Right, Direction::Up);
        let pos = Position::tile_center(Coord::new(1, 1), 0);
        let results = teleport_position_across_portal(&world, pos, Vec2::new(0.01, 0.0), Coord::new(0, 1), Coord::new(1, 1));
        assert_eq!(results.len(), 1);
        let result = results[0];
        assert_eq!(result.rotations, 1);
        assert_eq!(result.pos.to_coord(), Coord::new(6, 0));
        assert!((result.delta - Vec2::new(0.0, -0.01)).length() < 1e-6);

        let wrong_way = teleport_position_across_portal(&world, pos, Vec2::ZERO, Coord::new(2, 1), Coord::new(1, 1));
        assert!(wrong_way.is_empty());
    }

    #[test]
    fn test_teleport_round_trip_restores_offset_and_delta() {
        let world = linked_portals(Direction::Right, Direction::Up);
        let src = Coord::new(1, 1);
        let offset = Vec2::new(2.0 * PIXEL_SIZE, -3.0 * PIXEL_SIZE);
        let delta = Vec2::new(0.02, 0.005);
        let pos = Position::tile_center(src, 0) + offset;

        let there = teleport_position_across_portal(&world, pos, delta, Coord::new(0, 1), src)[0];
        let dst = there.dst_portal;
        let dst_face = Direction::Up;
        let came_out_offset = there.pos - Position::tile_center(dst.step(dst_face.opposite()), 0);

        // walk back in through the destination portal
        let reentry = Position::tile_center(dst, 0) + came_out_offset;
        let back = teleport_position_across_portal(&world, reentry, there.delta, dst.step(dst_face.opposite()), dst)
            .into_iter()
            .find(|r| r.dst_portal == src);
        let back = back.expect("path back to the source portal");
        let restored_offset = back.pos - Position::tile_center(src.step(Direction::Right.opposite()), 0);

        assert_eq!((there.rotations + back.rotations) % 4, 0);
        assert!((restored_offset - offset).length() < PIXEL_SIZE * 0.01);
        assert!((back.delta - delta).length() < 1e-6);
    }
}
