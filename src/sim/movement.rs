//! Player movement through the world
//!
//! A player's proposed move for one step is clipped against, in order:
//! - blocks around the player, including blocks seen through active portals
//! - solid tiles
//! - solid interactives and the open corners of pits
//! - other players, which only stop the player from closing in
//!
//! Blocks sliding into the player are dealt with here too: a pinned player
//! either stops the block or is squished by it, a free player shoves the
//! block toward the next grid center.

use glam::Vec2;

use super::block::Block;
use super::collision::{position_collide_with_rect, position_slide_against_rect, slide_against_rect};
use super::coord::{Coord, Rect};
use super::direction::{Direction, portal_rotations_between, vec_rotate_quadrants_counter_clockwise};
use super::event::SimEvent;
use super::interactive::InteractiveKind;
use super::momentum::{allowed_to_push, get_block_stack_mass};
use super::motion::{Axis, MoveState, calc_coast_motion_time_left, calc_decel_to_stop, find_next_grid_center};
use super::player::Player;
use super::portal_exit::find_portal_exits;
use super::position::Position;
use super::query::{block_on_ice, player_at_block_height, rect_centered_on};
use super::world::World;
use crate::consts::{HALF_TILE_SIZE_IN_PIXELS, PIXEL_SIZE};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovePlayerResult {
    pub collided: bool,
    /// A block squished the player; the level has to restart
    pub resetting: bool,
    pub pos_delta: Vec2,
    pub pushing_block: Option<usize>,
    pub pushing_block_dir: Option<Direction>,
    pub pushing_block_rotation: u8,
    pub events: Vec<SimEvent>,
}

/// A block the player's move runs into, as seen from the player's side
#[derive(Debug, Clone, Copy)]
struct BlockContact {
    index: usize,
    rect: Rect,
    z: i8,
    /// Quarter turns clockwise from the player's frame to the block's
    rotations: u8,
    correction: f32,
    /// Side of the player the block is on, from the unclipped move
    block_dir: Direction,
}

fn window_around(center: Coord) -> Rect {
    Rect::new(center.x - 1, center.y - 1, center.x + 1, center.y + 1)
}

fn window_pixels(window: &Rect) -> Rect {
    Coord::new(window.left, window.bottom)
        .pixel_rect()
        .union(&Coord::new(window.right, window.top).pixel_rect())
}

/// Blocks in the player's 3x3 window plus copies of blocks waiting on the far side of portals in it
fn gather_block_contacts(world: &World, player: &Player, delta: Vec2, window: &Rect) -> Vec<BlockContact> {
    let radius = world.config.player_radius;
    let mut candidates: Vec<(usize, Rect, u8)> = world
        .blocks_in(&window_pixels(window))
        .into_iter()
        .map(|i| (i, world.blocks[i].rect(), 0))
        .collect();

    for portal_index in world.interactives_in(window) {
        let portal = &world.interactives[portal_index];
        let Some(face) = portal.portal_face().filter(|_| portal.is_active_portal()) else {
            continue;
        };
        let here = portal.coord;
        for (src_face, src) in find_portal_exits(world, here).iter() {
            if src == here {
                continue;
            }
            let rotations = portal_rotations_between(face, src_face);
            let open = src.step(src_face.opposite());
            for i in world.blocks_in(&open.pixel_rect()) {
                let block = &world.blocks[i];
                let offset = (block.center_pixel() - open.center_pixel()).rotate_quadrants_counter_clockwise(rotations);
                let cut = block.cut.rotate_clockwise(4 - rotations % 4);
                candidates.push((i, rect_centered_on(here.center_pixel() + offset, cut), rotations));
            }
        }
    }

    let mut contacts: Vec<BlockContact> = candidates
        .into_iter()
        .filter_map(|(index, rect, rotations)| {
            let z = world.blocks[index].pos.z;
            if !player_at_block_height(player.pos.z, z) {
                return None;
            }
            let hit = position_collide_with_rect(player.pos, &rect, radius, delta);
            let side = hit.hit_side()?;
            Some(BlockContact {
                index,
                rect,
                z,
                rotations,
                correction: (hit.delta - delta).length(),
                block_dir: side.opposite(),
            })
        })
        .collect();
    // smallest correction first, higher blocks first on ties
    contacts.sort_by(|a, b| a.correction.total_cmp(&b.correction).then(b.z.cmp(&a.z)));
    contacts
}

/// Something solid right behind the player on side `toward` that would not give way
///
/// `closing` is how fast the block `pusher` is moving toward the player.
fn player_pinned(world: &World, player: &Player, toward: Direction, pusher: usize, closing: f32) -> bool {
    let radius = world.config.player_radius;
    let center = player.pos.to_vec();
    let ahead = toward.to_vec();
    let across = Vec2::new(ahead.y, ahead.x) * radius * 0.5;
    let probe = center + ahead * (radius + PIXEL_SIZE);

    [probe + across, probe - across].into_iter().any(|point| {
        let pixel = Position::from_vec(point, player.pos.z).pixel;
        let coord = pixel.to_coord();
        if world.tilemap.is_solid(coord) {
            return true;
        }
        if world.interactive_at(coord).is_some_and(|i| i.is_solid_at_height(player.pos.z)) {
            return true;
        }
        world
            .blocks_in(&Rect::new(pixel.x, pixel.y, pixel.x, pixel.y))
            .into_iter()
            .filter(|&i| i != pusher && player_at_block_height(player.pos.z, world.blocks[i].pos.z))
            .any(|i| world.blocks[i].motion.vel.dot(ahead) < closing)
    })
}

/// Begin stopping a block sliding on ice at the next grid center along `axis`
///
/// Blocks that are not on ice, not moving along `axis` or already stopping
/// are left alone. Returns whether the block started stopping.
pub fn slow_block_toward_gridlock(world: &mut World, index: usize, axis: Axis) -> bool {
    if !block_on_ice(world, index) {
        return false;
    }
    let radius = world.config.player_radius;
    let Some(block) = world.blocks.get_mut(index) else {
        return false;
    };
    let vel = axis.get(block.motion.vel);
    if vel == 0.0 || block.axis_move(axis).state == MoveState::Stopping {
        return false;
    }

    let center = axis.get(block.center());
    let grid = block.grid_width();
    let mut goal = find_next_grid_center(grid, center, vel);
    // too close to stop in time, go one more cell
    if calc_coast_motion_time_left(grid, center, vel) * vel.abs() <= radius {
        goal += grid as f32 * PIXEL_SIZE * vel.signum();
    }
    let decel = calc_decel_to_stop(center, goal, vel);

    let mv = block.axis_move_mut(axis);
    mv.state = MoveState::Stopping;
    mv.time_left = 0.0;
    axis.set(&mut block.motion.accel, decel.accel);
    axis.set(&mut block.motion.target_vel, 0.0);
    match axis {
        Axis::X => block.stopped_by_player_horizontal = true,
        Axis::Y => block.stopped_by_player_vertical = true,
    }
    log::debug!("Block {index} slowing toward the grid on {axis:?}");
    true
}

/// Stop `block` on `axis` and back it off one pixel toward `away`
fn stop_block_against_player(block: &mut Block, axis: Axis, away: Direction) {
    block.stop_axis(axis);
    let pixel = axis.get_pixel(block.pos.pixel) + away.sign() as i16;
    axis.set_pixel(&mut block.pos.pixel, pixel);
    axis.set(&mut block.pos.decimal, 0.0);
}

/// Quarter tiles of a pit, bottom-left first
fn pit_quadrants(coord: Coord) -> [Rect; 4] {
    let r = coord.pixel_rect();
    let h = HALF_TILE_SIZE_IN_PIXELS;
    [
        Rect::new(r.left, r.bottom, r.left + h - 1, r.bottom + h - 1),
        Rect::new(r.left + h, r.bottom, r.right, r.bottom + h - 1),
        Rect::new(r.left, r.bottom + h, r.left + h - 1, r.top),
        Rect::new(r.left + h, r.bottom + h, r.right, r.top),
    ]
}

/// Quarters of the pit at `coord` with no fallen block to walk on
fn open_pit_quadrants(world: &World, coord: Coord) -> Vec<Rect> {
    pit_quadrants(coord)
        .into_iter()
        .filter(|quadrant| {
            let center = quadrant.center();
            !world
                .blocks_in(quadrant)
                .into_iter()
                .any(|i| world.blocks[i].pos.z < 0 && world.blocks[i].rect().contains_pixel(center))
        })
        .collect()
}

/// Resolve one step of movement for player `player_index` wanting to move `delta`
///
/// Blocks that slide into the player are stopped or slowed here, so the
/// world is mutated; the player's own position is left to the caller,
/// which applies the returned `pos_delta`.
pub fn move_player_through_world(world: &mut World, player_index: usize, delta: Vec2) -> MovePlayerResult {
    let mut result = MovePlayerResult { pos_delta: delta, ..Default::default() };
    let Some(player) = world.players.get(player_index).copied() else {
        log::warn!("Moving missing player {player_index}");
        return result;
    };
    let radius = world.config.player_radius;
    let threshold = world.config.squish_momentum_threshold;
    let window = window_around((player.pos + delta).to_coord());

    let contacts = gather_block_contacts(world, &player, delta, &window);
    let mut push_candidates: Vec<(usize, Direction, u8)> = Vec::new();
    if player.moving_toward(player.face) {
        for contact in contacts.iter().filter(|c| c.block_dir == player.face) {
            if !push_candidates.iter().any(|&(i, _, _)| i == contact.index) {
                push_candidates.push((contact.index, player.face.rotate_clockwise(contact.rotations), contact.rotations));
            }
        }
    }

    for contact in contacts {
        let hit = position_collide_with_rect(player.pos, &contact.rect, radius, result.pos_delta);
        let Some(side) = hit.hit_side() else {
            continue;
        };
        result.collided = true;
        let block_dir = side.opposite();
        let Some(block) = world.blocks.get(contact.index).copied() else {
            continue;
        };

        let vel = vec_rotate_quadrants_counter_clockwise(block.motion.vel, contact.rotations);
        let closing = -vel.dot(block_dir.to_vec());
        if closing > 0.0 {
            let block_axis = Axis::of(block_dir.rotate_clockwise(contact.rotations));
            let away = block_dir.rotate_clockwise(contact.rotations);
            let player_axis = Axis::of(block_dir);

            if player_pinned(world, &player, block_dir.opposite(), contact.index, closing) {
                let momentum = get_block_stack_mass(world, contact.index) as f32 * closing;
                if momentum > threshold {
                    log::info!("Block {} squishes player {player_index} (momentum {momentum:.1})", contact.index);
                    result.resetting = true;
                    result.events.push(SimEvent::BlockSquishesPlayer { block: contact.index, player: player_index });
                } else if let Some(block) = world.blocks.get_mut(contact.index) {
                    stop_block_against_player(block, block_axis, away);
                    result.events.push(SimEvent::BlockStopped { block: contact.index, direction: away.opposite() });
                }
                player_axis.set(&mut result.pos_delta, 0.0);
            } else {
                result.pos_delta = hit.delta;
                if let Some(p) = world.players.get_mut(player_index) {
                    p.stopping_block_from = Some(block_dir);
                }
                let coasting = block.axis_move(block_axis).state == MoveState::Coasting;
                if slow_block_toward_gridlock(world, contact.index, block_axis) && coasting {
                    result.events.push(SimEvent::PlayerStopsCoastingBlock { block: contact.index });
                }
                if let Some(partner) = block.entangle_index {
                    let same_axis = world
                        .blocks
                        .get(partner)
                        .is_some_and(|p| (p.rotation + block.rotation) % 2 == 0);
                    let partner_axis = if same_axis { block_axis } else { block_axis.other() };
                    slow_block_toward_gridlock(world, partner, partner_axis);
                }
            }
        } else {
            result.pos_delta = hit.delta;
        }
    }

    match push_candidates.as_slice() {
        [(index, direction, rotations)] => {
            if allowed_to_push(world, *index, *direction, None).push {
                result.pushing_block = Some(*index);
                result.pushing_block_dir = Some(*direction);
                result.pushing_block_rotation = *rotations;
            }
        }
        [] => {}
        _ => log::debug!("Player {player_index} leans on {} blocks at once, not pushing", push_candidates.len()),
    }

    for y in window.bottom..=window.top {
        for x in window.left..=window.right {
            let coord = Coord::new(x, y);
            if !world.tilemap.is_solid(coord) {
                continue;
            }
            let hit = position_slide_against_rect(player.pos, coord, radius, result.pos_delta);
            if hit.hit {
                result.collided = true;
                result.pos_delta = hit.delta;
            }
        }
    }

    for index in world.interactives_in(&window) {
        let interactive = &world.interactives[index];
        let coord = interactive.coord;
        if interactive.is_solid_at_height(player.pos.z) {
            let hit = position_slide_against_rect(player.pos, coord, radius, result.pos_delta);
            if hit.hit {
                result.collided = true;
                result.pos_delta = hit.delta;
            }
        } else if matches!(interactive.kind, InteractiveKind::Pit { .. }) && player.pos.z == 0 {
            for quadrant in open_pit_quadrants(world, coord) {
                let hit = slide_against_rect(player.pos, &quadrant, radius, result.pos_delta);
                if hit.hit {
                    result.collided = true;
                    result.pos_delta = hit.delta;
                }
            }
        }
    }

    for (i, other) in world.players.iter().enumerate() {
        if i == player_index || other.pos.z != player.pos.z {
            continue;
        }
        let gap = other.pos.to_vec() - (player.pos.to_vec() + result.pos_delta);
        let distance = gap.length();
        if distance >= radius * 2.0 || distance <= f32::EPSILON {
            continue;
        }
        let toward = gap / distance;
        let approach = result.pos_delta.dot(toward);
        if approach > 0.0 {
            result.pos_delta -= toward * approach;
            result.collided = true;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::TILE_SIZE;
    use crate::sim::block::BlockCut;
    use crate::sim::coord::Pixel;
    use crate::sim::interactive::Interactive;
    use crate::sim::motion::MoveSign;
    use crate::sim::test_support::WorldBuilder;

    fn walking(face: Direction) -> impl FnOnce(&mut Player) {
        move |p| {
            p.face = face;
            p.vel = face.to_vec() * 0.25;
        }
    }

    #[test]
    fn test_walking_into_block_starts_push() {
        let mut world = WorldBuilder::new(6, 3)
            .block(Coord::new(2, 1))
            .player_with(Coord::new(1, 1), |p| {
                walking(Direction::Right)(p);
                p.pos = Position::from_pixel(Pixel::new(28, 24), 0);
            })
            .build();
        let delta = Vec2::new(PIXEL_SIZE, 0.0);
        let result = move_player_through_world(&mut world, 0, delta);
        assert!(result.collided);
        assert!(result.pos_delta.x < delta.x);
        assert_eq!(result.pushing_block, Some(0));
        assert_eq!(result.pushing_block_dir, Some(Direction::Right));
        assert_eq!(result.pushing_block_rotation, 0);
    }

    #[test]
    fn test_no_push_when_facing_away() {
        let mut world = WorldBuilder::new(6, 3)
            .block(Coord::new(2, 1))
            .player_with(Coord::new(1, 1), |p| {
                walking(Direction::Up)(p);
                p.pos = Position::from_pixel(Pixel::new(29, 24), 0);
            })
            .build();
        let result = move_player_through_world(&mut world, 0, Vec2::new(0.0, PIXEL_SIZE));
        assert!(result.collided);
        assert_eq!(result.pushing_block, None);
    }

    #[test]
    fn test_two_blocks_at_once_are_not_pushed() {
        let mut world = WorldBuilder::new(6, 4)
            .block(Coord::new(2, 1))
            .block(Coord::new(2, 2))
            .player_with(Coord::new(1, 1), |p| {
                walking(Direction::Right)(p);
                p.pos = Position::from_pixel(Pixel::new(29, 32), 0);
            })
            .build();
        let result = move_player_through_world(&mut world, 0, Vec2::new(PIXEL_SIZE, 0.0));
        assert!(result.collided);
        assert_eq!(result.pushing_block, None);
    }

    #[test]
    fn test_wall_clips_move() {
        let mut world = WorldBuilder::new(4, 3)
            .solid(Coord::new(2, 1))
            .player_with(Coord::new(1, 1), |p| p.pos = Position::from_pixel(Pixel::new(27, 24), 0))
            .build();
        let result = move_player_through_world(&mut world, 0, Vec2::new(TILE_SIZE * 0.25, PIXEL_SIZE));
        assert!(result.collided);
        assert!((result.pos_delta.x - 1.5 * PIXEL_SIZE).abs() < 1e-5);
        assert_eq!(result.pos_delta.y, PIXEL_SIZE);
    }

    #[test]
    fn test_open_pit_blocks_until_filled() {
        let pit = Interactive::new(Coord::new(2, 1), InteractiveKind::Pit { id: 0, iced: false });
        let start = |p: &mut Player| p.pos = Position::from_pixel(Pixel::new(27, 24), 0);
        let delta = Vec2::new(TILE_SIZE * 0.25, 0.0);

        let mut world = WorldBuilder::new(5, 3).interactive(pit).player_with(Coord::new(1, 1), start).build();
        let result = move_player_through_world(&mut world, 0, delta);
        assert!(result.collided);
        assert!(result.pos_delta.x < delta.x);

        let mut world = WorldBuilder::new(5, 3)
            .interactive(pit)
            .block_with(Coord::new(2, 1), |b| b.pos.z = -crate::consts::HEIGHT_INTERVAL)
            .player_with(Coord::new(1, 1), start)
            .build();
        let result = move_player_through_world(&mut world, 0, delta);
        assert!(!result.collided);
        assert_eq!(result.pos_delta, delta);
    }

    #[test]
    fn test_partly_filled_pit_leaves_open_corners() {
        let world = WorldBuilder::new(5, 3)
            .interactive(Interactive::new(Coord::new(2, 1), InteractiveKind::Pit { id: 0, iced: false }))
            .block_with(Coord::new(2, 1), |b| {
                b.pos.z = -crate::consts::HEIGHT_INTERVAL;
                b.cut = BlockCut::LeftHalf;
            })
            .build();
        let open = open_pit_quadrants(&world, Coord::new(2, 1));
        assert_eq!(open.len(), 2);
        assert!(open.iter().all(|q| q.left == 40));
    }

    /// Player against the wall at x=16 with a block coasting left into it
    fn pinned_world(vel: f32) -> World {
        WorldBuilder::new(6, 3)
            .solid(Coord::new(0, 1))
            .iced(Coord::new(1, 1))
            .iced(Coord::new(2, 1))
            .block_with(Coord::new(1, 1), |b| {
                b.pos.pixel = Pixel::new(23, 16);
                b.motion.vel = Vec2::new(vel, 0.0);
                b.horizontal_move.state = MoveState::Coasting;
                b.horizontal_move.sign = MoveSign::Negative;
            })
            .player_with(Coord::new(1, 1), |p| p.pos = Position::from_pixel(Pixel::new(20, 24), 0))
            .build()
    }

    #[test]
    fn test_pinned_player_stops_slow_block() {
        let mut world = pinned_world(-0.2);
        let result = move_player_through_world(&mut world, 0, Vec2::ZERO);
        assert!(!result.resetting);
        assert!(result.events.contains(&SimEvent::BlockStopped { block: 0, direction: Direction::Left }));
        assert_eq!(world.blocks[0].motion.vel.x, 0.0);
        assert_eq!(world.blocks[0].horizontal_move.state, MoveState::Idling);
        assert_eq!(world.blocks[0].pos.pixel.x, 24);
    }

    #[test]
    fn test_pinned_player_squished_by_fast_block() {
        let mut world = pinned_world(-0.5);
        let result = move_player_through_world(&mut world, 0, Vec2::ZERO);
        assert!(result.resetting);
        assert!(result.events.contains(&SimEvent::BlockSquishesPlayer { block: 0, player: 0 }));
    }

    #[test]
    fn test_free_player_shoved_and_block_slowed() {
        let mut world = WorldBuilder::new(8, 3)
            .iced(Coord::new(2, 1))
            .iced(Coord::new(3, 1))
            .iced(Coord::new(4, 1))
            .block_with(Coord::new(3, 1), |b| {
                b.pos.pixel = Pixel::new(43, 16);
                b.motion.vel = Vec2::new(-0.2, 0.0);
                b.horizontal_move.state = MoveState::Coasting;
                b.horizontal_move.sign = MoveSign::Negative;
            })
            .player_with(Coord::new(2, 1), |p| p.pos = Position::from_pixel(Pixel::new(40, 24), 0))
            .build();
        let result = move_player_through_world(&mut world, 0, Vec2::ZERO);
        assert!(!result.resetting);
        assert!(result.pos_delta.x < 0.0);
        assert_eq!(world.blocks[0].horizontal_move.state, MoveState::Stopping);
        assert!(world.blocks[0].motion.accel.x > 0.0);
        assert_eq!(world.players[0].stopping_block_from, Some(Direction::Right));
        assert!(result.events.contains(&SimEvent::PlayerStopsCoastingBlock { block: 0 }));
    }

    #[test]
    fn test_gridlock_needs_ice() {
        let mut world = WorldBuilder::new(6, 3)
            .block_with(Coord::new(2, 1), |b| {
                b.motion.vel = Vec2::new(0.2, 0.0);
                b.horizontal_move.state = MoveState::Coasting;
            })
            .build();
        assert!(!slow_block_toward_gridlock(&mut world, 0, Axis::X));
        world.tilemap.set_iced(Coord::new(2, 1), true);
        assert!(slow_block_toward_gridlock(&mut world, 0, Axis::X));
        assert!(!slow_block_toward_gridlock(&mut world, 0, Axis::X));
        assert!(!slow_block_toward_gridlock(&mut world, 0, Axis::Y));
    }

    #[test]
    fn test_gridlock_skips_a_center_too_close_to_stop_at() {
        let sliding_from = |x: i16| {
            let mut world = WorldBuilder::new(8, 3)
                .iced(Coord::new(2, 1))
                .iced(Coord::new(3, 1))
                .block_with(Coord::new(2, 1), |b| {
                    b.pos = Position::from_pixel(Pixel::new(x, 16), 0);
                    b.motion.vel = Vec2::new(0.2, 0.0);
                    b.horizontal_move.state = MoveState::Coasting;
                })
                .build();
            assert!(slow_block_toward_gridlock(&mut world, 0, Axis::X));
            (world.blocks[0].center().x, world.blocks[0].motion.accel.x)
        };

        let (center, accel) = sliding_from(40);
        let expected = calc_decel_to_stop(center, 56.0 * PIXEL_SIZE, 0.2);
        assert!((accel - expected.accel).abs() < 1e-3);

        let (center, accel) = sliding_from(45);
        let expected = calc_decel_to_stop(center, 72.0 * PIXEL_SIZE, 0.2);
        assert!((accel - expected.accel).abs() < 1e-3);
    }

    #[test]
    fn test_other_players_are_soft() {
        let mut world = WorldBuilder::new(6, 3)
            .player_with(Coord::new(1, 1), |p| p.pos = Position::from_pixel(Pixel::new(24, 24), 0))
            .player_with(Coord::new(1, 1), |p| p.pos = Position::from_pixel(Pixel::new(30, 24), 0))
            .build();
        let result = move_player_through_world(&mut world, 0, Vec2::new(PIXEL_SIZE, 0.0));
        assert!(result.collided);
        assert!(result.pos_delta.length() < 1e-6);

        let result = move_player_through_world(&mut world, 0, Vec2::new(-PIXEL_SIZE, 0.0));
        assert!(!result.collided);
        assert_eq!(result.pos_delta, Vec2::new(-PIXEL_SIZE, 0.0));
    }
}
