//! Fixed timestep world step
//!
//! Advances the world deterministically, in a fixed order:
//! - players walk, push and teleport
//! - blocks integrate their motion, collide, teleport, fall
//! - popup and door lifts move
//! - pressure plates, lighting and detectors catch up with the new layout

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::arrow::{pick_up_bow, update_arrows, update_bow};
use super::block::{BlockMomentum, Element, blocks_at_collidable_height};
use super::coord::{Coord, Pixel, Rect};
use super::direction::{Direction, vec_rotate_quadrants_clockwise};
use super::electricity::update_pressure_plates;
use super::entangle::{Knocked, knocked_along, player_push_block, push_knocked_partners};
use super::event::SimEvent;
use super::interactive::InteractiveKind;
use super::light::{update_light_and_ice_detectors, update_lighting};
use super::momentum::{TransferMomentum, get_block_momentum};
use super::motion::{Axis, MoveState, update_motion_grid_aligned};
use super::movement::move_player_through_world;
use super::portal_exit::teleport_position_across_portal;
use super::position::Position;
use super::push::{PushOptions, block_push, set_coasting};
use super::query::{
    adjacent_strip, block_against_another_block, block_on_air, block_on_ice, coords_in_rect, shifted_rect,
};
use super::world::World;
use crate::closest_grid_center_pixel;
use crate::consts::HEIGHT_INTERVAL;

/// Input commands for a single player for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TickInput {
    /// Movement key held down, if any
    pub move_dir: Option<Direction>,
    /// Fire key held down
    #[serde(default)]
    pub draw_bow: bool,
}

/// What one step did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    pub events: Vec<SimEvent>,
    /// A player was squished and the level has to restart
    pub resetting: bool,
}

/// Advance the world by one fixed timestep
///
/// `inputs` holds one entry per player; players without an entry stand still.
pub fn tick(world: &mut World, inputs: &[TickInput], dt: f32) -> StepReport {
    let mut report = StepReport::default();

    for block in &mut world.blocks {
        block.clear_momentum();
    }
    for index in 0..world.players.len() {
        let input = inputs.get(index).copied().unwrap_or_default();
        update_player(world, index, input, dt, &mut report);
    }

    report.events.extend(world.update_blocks(dt));
    report.events.extend(update_arrows(world, dt));
    world.update_interactives(dt);
    report.events.extend(update_pressure_plates(world));
    update_lighting(world);
    report.events.extend(update_light_and_ice_detectors(world));
    report.events.extend(update_portal_occupancy(world));

    if report.resetting {
        log::info!("Player squished, level needs a reset");
    }
    report
}

impl World {
    /// Advance one fixed timestep; see [`tick`]
    pub fn step(&mut self, dt: f32, inputs: &[TickInput]) -> StepReport {
        tick(self, inputs, dt)
    }

    /// Move every block by its motion, resolving what it runs into
    pub fn update_blocks(&mut self, dt: f32) -> Vec<SimEvent> {
        let mut events = Vec::new();
        for index in 0..self.blocks.len() {
            update_block(self, index, dt, &mut events);
        }
        transition_elements(self);
        events
    }

    /// Move popup and door lifts, carrying whatever stands on a popup
    pub fn update_interactives(&mut self, dt: f32) {
        for index in 0..self.interactives.len() {
            let before = popup_top(&self.interactives[index].kind);
            self.interactives[index].update(dt);
            let after = popup_top(&self.interactives[index].kind);
            let (Some(before), Some(after)) = (before, after) else {
                continue;
            };
            if before == after {
                continue;
            }
            let coord = self.interactives[index].coord;
            for block in self.blocks.iter_mut().filter(|b| b.coord() == coord && b.pos.z == before) {
                block.pos.z = after;
            }
            for player in self.players.iter_mut().filter(|p| p.coord() == coord && p.pos.z == before) {
                player.pos.z = after;
            }
        }
    }
}

/// Height of the top of a popup
fn popup_top(kind: &InteractiveKind) -> Option<i8> {
    match kind {
        InteractiveKind::Popup { lift, .. } => Some(lift.ticks as i8 - 1),
        _ => None,
    }
}

fn update_player(world: &mut World, index: usize, input: TickInput, dt: f32, report: &mut StepReport) {
    report.events.extend(update_bow(world, index, input.draw_bow, dt));
    let speed = world.config.player_speed;
    let push_delay = world.config.player_push_delay;
    let Some(player) = world.players.get_mut(index) else {
        return;
    };

    player.stopping_block_from = None;
    for direction in Direction::ALL {
        if input.move_dir != Some(direction) {
            player.move_rotation[direction.index()] = 0;
        }
    }
    match input.move_dir {
        Some(held) => {
            // keys keep meaning what they meant before walking through a portal
            let facing = held.rotate_clockwise(player.rotation_for(held));
            player.face = facing;
            player.vel = facing.to_vec() * speed;
        }
        None => player.vel = Vec2::ZERO,
    }
    let delta = player.vel * dt;
    let premove = player.coord();

    let moved = move_player_through_world(world, index, delta);
    report.events.extend(moved.events.iter().copied());
    if moved.resetting {
        report.resetting = true;
    }

    let Some(player) = world.players.get_mut(index) else {
        return;
    };
    player.squished |= moved.resetting;
    player.pos_delta = moved.pos_delta;
    player.pos += moved.pos_delta;
    let (pos, pos_delta, postmove) = (player.pos, player.pos_delta, player.coord());

    let teleport = teleport_position_across_portal(world, pos, pos_delta, premove, postmove).into_iter().next();
    report.events.extend(pick_up_bow(world, index));
    let Some(player) = world.players.get_mut(index) else {
        return;
    };
    if let Some(teleport) = teleport {
        player.pos = teleport.pos;
        player.pos_delta = teleport.delta;
        player.face = player.face.rotate_clockwise(teleport.rotations);
        player.vel = vec_rotate_quadrants_clockwise(player.vel, teleport.rotations);
        if let Some(held) = input.move_dir {
            let rotation = &mut player.move_rotation[held.index()];
            *rotation = (*rotation + teleport.rotations) % 4;
        }
        log::debug!("Player {index} teleported from {:?} to {:?}", teleport.src_portal, teleport.dst_portal);
        report.events.push(SimEvent::PlayerTeleported {
            player: index,
            from: teleport.src_portal,
            to: teleport.dst_portal,
        });
    }

    let (Some(block), Some(direction)) = (moved.pushing_block, moved.pushing_block_dir) else {
        player.stop_pushing();
        return;
    };
    if player.pushing_block == Some(block) && player.pushing_block_dir == Some(direction) {
        player.push_time += dt;
    } else {
        player.pushing_block = Some(block);
        player.pushing_block_dir = Some(direction);
        player.pushing_block_rotation = moved.pushing_block_rotation;
        player.push_time = 0.0;
    }
    if player.push_time >= push_delay {
        player.push_time = 0.0;
        world.undo_commit();
        report.events.extend(player_push_block(world, block, direction));
    }
}

/// What a block ran into while stepping along an axis
#[derive(Debug, Clone, Copy, PartialEq)]
enum Obstacle {
    Wall,
    Block { index: usize, direction: Direction },
}

fn axis_direction(axis: Axis, amount: f32) -> Direction {
    match (axis, amount > 0.0) {
        (Axis::X, true) => Direction::Right,
        (Axis::X, false) => Direction::Left,
        (Axis::Y, true) => Direction::Up,
        (Axis::Y, false) => Direction::Down,
    }
}

/// Obstacle in the pixel strip past `rect` on side `direction`
///
/// On the first pixel the block's own footprint is still current, so blocks
/// waiting beyond a portal count as well.
fn obstacle_ahead(world: &World, index: usize, rect: &Rect, z: i8, direction: Direction, first_pixel: bool) -> Option<Obstacle> {
    let strip = adjacent_strip(rect, direction);
    let walled = coords_in_rect(&strip).into_iter().any(|c| {
        world.tilemap.is_solid(c) || world.interactive_at(c).is_some_and(|i| i.is_solid_at_height(z))
    });
    if walled {
        return Some(Obstacle::Wall);
    }

    if first_pixel {
        let against = block_against_another_block(world, index, direction)?;
        let against_dir = direction.rotate_clockwise(against.rotations_through_portal);
        let other = world.blocks.get(against.index)?;
        return (against.index != index && !other.moving_in_direction(against_dir))
            .then_some(Obstacle::Block { index: against.index, direction: against_dir });
    }
    world
        .blocks_in(&strip)
        .into_iter()
        .find(|&i| {
            i != index
                && blocks_at_collidable_height(world.blocks[i].pos.z, z)
                && !world.blocks[i].moving_in_direction(direction)
        })
        .map(|i| Obstacle::Block { index: i, direction })
}

fn update_block(world: &mut World, index: usize, dt: f32, events: &mut Vec<SimEvent>) {
    let coast = block_on_ice(world, index);
    let push_time = world.config.block_push_time;
    let Some(block) = world.blocks.get_mut(index) else {
        return;
    };
    let premove = block.coord();

    if block.is_moving() {
        let center = block.center();
        let grid = block.grid_width();
        let normal = block.cut.normal_pushed_velocity(1.0, push_time);
        block.motion.integrate(dt);

        let mut landed = [false; 2];
        for (slot, axis) in [Axis::X, Axis::Y].into_iter().enumerate() {
            let mut mv = *block.axis_move(axis);
            if mv.state == MoveState::Idling {
                continue;
            }
            let mut motion = block.motion.component(axis);
            update_motion_grid_aligned(grid, &mut mv, &mut motion, coast, dt, axis.get(center), normal);
            block.motion.set_component(axis, motion);
            *block.axis_move_mut(axis) = mv;
            landed[slot] = mv.state == MoveState::Idling;
        }

        step_block_axis(world, index, Axis::X, coast, landed[0], events);
        step_block_axis(world, index, Axis::Y, coast, landed[1], events);
        world.rebuild_block_index();
        teleport_block(world, index, premove, events);
    }

    drop_into_pit(world, index, events);
    if block_on_air(world, index) {
        if let Some(block) = world.blocks.get_mut(index) {
            block.pos.z -= 1;
        }
    }
}

/// Apply the block's delta along `axis` a pixel at a time, stopping at the first obstacle
fn step_block_axis(world: &mut World, index: usize, axis: Axis, coast: bool, landed: bool, events: &mut Vec<SimEvent>) {
    let Some(block) = world.blocks.get(index).copied() else {
        return;
    };
    let amount = axis.get(block.motion.pos_delta);
    if amount == 0.0 {
        return;
    }
    let direction = axis_direction(axis, amount);
    let mut offset = Vec2::ZERO;
    axis.set(&mut offset, amount);
    let mut target = block.pos + offset;

    let start = axis.get_pixel(block.pos.pixel);
    let pixels = (axis.get_pixel(target.pixel) - start).abs();
    let mut rect = block.rect();
    for k in 0..pixels {
        if let Some(obstacle) = obstacle_ahead(world, index, &rect, block.pos.z, direction, k == 0) {
            let mut flush = block;
            axis.set_pixel(&mut flush.pos.pixel, start + k * direction.sign() as i16);
            axis.set(&mut flush.pos.decimal, 0.0);
            world.blocks[index] = flush;
            collide_block(world, index, axis, direction, coast, obstacle, events);
            return;
        }
        rect = shifted_rect(&rect, direction, 1);
    }

    if landed {
        let half = match axis {
            Axis::X => block.width() / 2,
            Axis::Y => block.height() / 2,
        };
        axis.set_pixel(&mut target.pixel, axis.get_pixel(block.motion.stop_on_pixel) - half);
        axis.set(&mut target.decimal, 0.0);
    }
    world.blocks[index].pos = target;
}

/// Resolve a block running into `obstacle`
///
/// A block coasting on ice into another block hands its momentum over;
/// everything else just stops the block.
fn collide_block(
    world: &mut World,
    index: usize,
    axis: Axis,
    direction: Direction,
    coast: bool,
    obstacle: Obstacle,
    events: &mut Vec<SimEvent>,
) {
    if let Obstacle::Block { index: other, direction: other_dir } = obstacle {
        let coasting = world.blocks[index].axis_move(axis).state == MoveState::Coasting;
        if coast && coasting {
            let moving = get_block_momentum(world, index, direction);
            let momentum = TransferMomentum { vel: moving.vel.abs(), ..moving };
            let result = block_push(world, other, other_dir, PushOptions::by_ice(momentum));
            if result.pushed {
                let final_vel = result
                    .collisions
                    .iter()
                    .find(|c| c.pushee_index == other)
                    .map_or(0.0, |c| c.pusher_final_velocity);
                if let Some(block) = world.blocks.get_mut(index) {
                    if final_vel == 0.0 {
                        block.stop_axis(axis);
                    } else {
                        set_coasting(block, axis, final_vel * direction.sign());
                    }
                    block.add_kickback(axis, momentum.mass as f32 * final_vel * direction.sign());
                }
                log::debug!("Block {index} hands momentum to block {other} going {}", other_dir.as_str());
                let mut knocked = vec![Knocked { block: other, direction: other_dir, momentum }];
                knocked.extend(knocked_along(&result));
                events.extend(result.events);
                events.extend(push_knocked_partners(world, knocked, BTreeSet::from([index])));
                return;
            }
        }
    }

    if let Some(block) = world.blocks.get_mut(index) {
        block.stop_axis(axis);
        block.add_momentum(axis, BlockMomentum::Stop, 0.0);
    }
    events.push(SimEvent::BlockStopped { block: index, direction });
}

/// Send a block whose center just entered an active portal out of the linked portal
fn teleport_block(world: &mut World, index: usize, premove: Coord, events: &mut Vec<SimEvent>) {
    let Some(block) = world.blocks.get(index).copied() else {
        return;
    };
    let half = Pixel::new(block.width() / 2, block.height() / 2);
    let center = Position::new(block.pos.pixel + half, block.pos.z, block.pos.decimal);
    let teleports = teleport_position_across_portal(world, center, block.motion.pos_delta, premove, block.coord());
    let Some(teleport) = teleports.into_iter().next() else {
        return;
    };

    let rotations = teleport.rotations;
    let mut moved = block;
    moved.cut = block.cut.rotate_clockwise(rotations);
    moved.rotation = (block.rotation + rotations) % 4;
    let motion = &mut moved.motion;
    for v in [
        &mut motion.pos_delta,
        &mut motion.prev_vel,
        &mut motion.vel,
        &mut motion.accel,
        &mut motion.coast_vel,
        &mut motion.target_vel,
    ] {
        *v = vec_rotate_quadrants_clockwise(*v, rotations);
    }
    moved.rotate_moves_clockwise(rotations);
    let half = Pixel::new(moved.width() / 2, moved.height() / 2);
    moved.pos = Position::new(teleport.pos.pixel - half, block.pos.z, teleport.pos.decimal);
    world.blocks[index] = moved;
    world.rebuild_block_index();

    log::debug!("Block {index} teleported from {:?} to {:?}", teleport.src_portal, teleport.dst_portal);
    events.push(SimEvent::BlockTeleported {
        block: index,
        from: teleport.src_portal,
        to: teleport.dst_portal,
    });
}

/// Drop a floor-level block that sits over an unfilled pit
fn drop_into_pit(world: &mut World, index: usize, events: &mut Vec<SimEvent>) {
    let Some(block) = world.blocks.get(index).copied() else {
        return;
    };
    if block.pos.z != 0 {
        return;
    }
    let coord = block.coord();
    let Some(InteractiveKind::Pit { .. }) = world.interactive_at(coord).map(|i| i.kind) else {
        return;
    };
    let over = coord.pixel_rect().expand(1);
    let rect = block.rect();
    if !over.contains(rect.left, rect.bottom) || !over.contains(rect.right, rect.top) {
        return;
    }
    let filled = world.blocks_in(&rect).into_iter().any(|i| i != index && world.blocks[i].pos.z < 0);
    if filled {
        return;
    }

    let grid = block.grid_width();
    let center = block.center_pixel();
    let mut fallen = block;
    fallen.stop_horizontally();
    fallen.stop_vertically();
    fallen.pos = Position::from_pixel(
        Pixel::new(
            closest_grid_center_pixel(grid, center.x) - block.width() / 2,
            closest_grid_center_pixel(grid, center.y) - block.height() / 2,
        ),
        -HEIGHT_INTERVAL,
    );
    world.blocks[index] = fallen;
    world.rebuild_block_index();

    log::info!("Block {index} fell into the pit at ({}, {})", coord.x, coord.y);
    events.push(SimEvent::BlockFallsInPit { block: index, coord });
}

/// Fire and ice blocks touching each other cancel out
fn transition_elements(world: &mut World) {
    let mut changes = Vec::new();
    for (index, block) in world.blocks.iter().enumerate() {
        for direction in Direction::ALL {
            for other in world.blocks_in(&adjacent_strip(&block.rect(), direction)) {
                let touching = &world.blocks[other];
                if other == index || !blocks_at_collidable_height(block.pos.z, touching.pos.z) {
                    continue;
                }
                if matches!((block.element, touching.element), (Element::Fire, Element::Ice) | (Element::Ice, Element::Fire)) {
                    changes.push((index, block.element.transition(touching.element)));
                }
            }
        }
    }
    for (index, element) in changes {
        if let Some(block) = world.blocks.get_mut(index) {
            log::debug!("Block {index} element {:?} -> {:?}", block.element, element);
            block.element = element;
        }
    }
}

/// Track blocks inside portals and finish turning off portals that were waiting for them to leave
fn update_portal_occupancy(world: &mut World) -> Vec<SimEvent> {
    let occupied: Vec<bool> = world
        .interactives
        .iter()
        .map(|i| !world.blocks_in(&i.coord.pixel_rect()).is_empty())
        .collect();

    let mut events = Vec::new();
    for (interactive, inside) in world.interactives.iter_mut().zip(occupied) {
        let coord = interactive.coord;
        let InteractiveKind::Portal { on, has_block_inside, wants_to_turn_off, .. } = &mut interactive.kind else {
            continue;
        };
        *has_block_inside = inside;
        if *on && *wants_to_turn_off && !inside {
            *on = false;
            *wants_to_turn_off = false;
            log::info!("Portal at ({}, {}) turns off now that it is empty", coord.x, coord.y);
            events.push(SimEvent::PortalToggled { coord, on: false });
        }
    }
    events
}
