//! Mass, momentum and elastic transfer between blocks

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::direction::Direction;
use super::motion::Axis;
use super::query::{block_held_down_by_another_block, players_on_block};
use super::world::World;
use crate::consts::{HEIGHT_INTERVAL, PLAYER_MASS};
use crate::settings::SimConfig;

/// Momentum handed from one body to another in a single instant
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TransferMomentum {
    pub mass: i32,
    pub vel: f32,
}

impl TransferMomentum {
    pub fn momentum(&self) -> f32 {
        self.mass as f32 * self.vel
    }

    /// Same momentum with its velocity pointing toward `direction`
    pub fn toward(self, direction: Direction) -> Self {
        Self {
            mass: self.mass,
            vel: self.vel.abs() * direction.sign(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElasticCollisionResult {
    pub first_final_velocity: f32,
    pub second_final_velocity: f32,
}

/// One dimensional elastic collision between (m1, v1) and (m2, v2)
pub fn elastic_transfer_momentum(m1: i32, v1: f32, m2: i32, v2: f32) -> ElasticCollisionResult {
    let (m1, m2) = (m1 as f32, m2 as f32);
    let total = m1 + m2;
    if total == 0.0 {
        return ElasticCollisionResult { first_final_velocity: v1, second_final_velocity: v2 };
    }
    let second = (m1 * v1 + m2 * v2 - m1 * v2 + m1 * v1) / total;
    ElasticCollisionResult {
        first_final_velocity: v2 + second - v1,
        second_final_velocity: second,
    }
}

/// Whether a velocity change on `mass` beats static friction on ice
///
/// A body that is already moving has no static friction to overcome.
pub fn momentum_overcomes_friction(config: &SimConfig, mass: i32, initial_vel: f32, final_vel: f32) -> bool {
    if initial_vel != 0.0 {
        return true;
    }
    let impulse = (mass as f32 * (final_vel - initial_vel)).abs();
    impulse / config.dt > config.ice_static_friction_force(mass as f32)
}

/// Mass of a block plus everything resting on it
pub fn get_block_stack_mass(world: &World, index: usize) -> i32 {
    let mut visited = BTreeSet::new();
    let mut pending = vec![index];
    let mut mass = 0;
    while let Some(i) = pending.pop() {
        if !visited.insert(i) {
            continue;
        }
        let Some(block) = world.blocks.get(i) else {
            continue;
        };
        mass += block.mass();
        mass += players_on_block(world, i).len() as i32 * PLAYER_MASS;
        let top = block.pos.z as i16 + HEIGHT_INTERVAL as i16;
        pending.extend(
            world
                .blocks_in(&block.rect())
                .into_iter()
                .filter(|&above| world.blocks[above].pos.z as i16 == top),
        );
    }
    mass
}

/// Stack mass and velocity of a block along `direction`'s axis
pub fn get_block_momentum(world: &World, index: usize, direction: Direction) -> TransferMomentum {
    let vel = world
        .blocks
        .get(index)
        .map_or(0.0, |b| Axis::of(direction).get(b.motion.vel));
    TransferMomentum { mass: get_block_stack_mass(world, index), vel }
}

/// Result of checking whether something may push a block at all
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllowedToPushResult {
    pub push: bool,
    /// Share of the applied force the block feels
    pub mass_ratio: f32,
}

impl Default for AllowedToPushResult {
    fn default() -> Self {
        Self { push: true, mass_ratio: 1.0 }
    }
}

/// A block held down by a stack only moves when it is on ice; heavier stacks move slower
pub fn allowed_to_push(
    world: &World,
    index: usize,
    direction: Direction,
    instant_momentum: Option<TransferMomentum>,
) -> AllowedToPushResult {
    let Some(block) = world.blocks.get(index) else {
        return AllowedToPushResult { push: false, mass_ratio: 0.0 };
    };
    let held_down = block_held_down_by_another_block(world, index).is_some();
    let on_ice = super::query::block_on_ice(world, index);
    if held_down && !on_ice {
        log::debug!("Block {index} is held down, refusing push {}", direction.as_str());
        return AllowedToPushResult { push: false, mass_ratio: 0.0 };
    }

    let stack_mass = get_block_stack_mass(world, index);
    let mut result = AllowedToPushResult {
        push: true,
        mass_ratio: block.mass() as f32 / stack_mass.max(1) as f32,
    };

    if let Some(momentum) = instant_momentum {
        let vel = Axis::of(direction).get(block.motion.vel) * direction.sign();
        let elastic = elastic_transfer_momentum(momentum.mass, momentum.vel.abs(), stack_mass, vel);
        if on_ice && !momentum_overcomes_friction(&world.config, stack_mass, vel, elastic.second_final_velocity) {
            result.push = false;
        }
    }
    result
}
