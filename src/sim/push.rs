//! Block push resolution
//!
//! A push is resolved in two steps:
//! - [`block_would_push`] simulates the push against the current world and
//!   returns a [`PushPlan`]: the verdict, what happened along the way and
//!   the block states the push would leave behind
//! - [`block_do_push`] writes a successful plan's staged states back
//!
//! Simulation never touches the world. Blocks changed earlier in the same
//! simulation (a chain of iced blocks handing momentum along, say) live in
//! an overlay that later checks read through, so a plan is self-consistent
//! and plans can be stacked by passing one plan's overlay to the next.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::block::{Block, BlockMomentum, blocks_rotations_between};
use super::direction::Direction;
use super::event::{ElasticCollisionEvent, SimEvent};
use super::momentum::{TransferMomentum, elastic_transfer_momentum, get_block_stack_mass, momentum_overcomes_friction};
use super::motion::{Axis, MoveSign, MoveState};
use super::query::{
    block_against_another_block, block_against_diagonal, block_against_player, block_against_solid_interactive,
    block_against_solid_tile, block_on_ice, blocks_are_entangled,
};
use super::world::World;

/// Block states staged by a simulation, keyed by block index
pub type Overlay = BTreeMap<usize, Block>;

/// Motion an entangled partner copies from the block that set it moving
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PushFromEntangler {
    pub move_state: MoveState,
    /// Magnitude; the partner applies its own direction's sign
    pub accel: f32,
    pub coast_vel: f32,
    pub time_left: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PushOptions {
    /// Momentum arrived over ice rather than from a steady shove
    pub pushed_by_ice: bool,
    pub instant_momentum: Option<TransferMomentum>,
    pub from_entangler: Option<PushFromEntangler>,
    /// Multiplier on the normal push acceleration
    pub force: f32,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            pushed_by_ice: false,
            instant_momentum: None,
            from_entangler: None,
            force: 1.0,
        }
    }
}

impl PushOptions {
    pub fn with_force(force: f32) -> Self {
        Self { force, ..Default::default() }
    }

    pub fn by_ice(momentum: TransferMomentum) -> Self {
        Self {
            pushed_by_ice: true,
            instant_momentum: Some(momentum),
            ..Default::default()
        }
    }

    pub fn from_entangler(from_entangler: PushFromEntangler, force: f32) -> Self {
        Self {
            from_entangler: Some(from_entangler),
            force,
            ..Default::default()
        }
    }
}

/// A block that was set moving because something pushed into it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgainstPush {
    pub block: usize,
    pub direction: Direction,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushResult {
    pub pushed: bool,
    pub againsts_pushed: Vec<AgainstPush>,
    pub collisions: Vec<ElasticCollisionEvent>,
    pub events: Vec<SimEvent>,
}

/// Outcome of simulating a push, ready to commit
#[derive(Debug, Clone, PartialEq)]
pub struct PushPlan {
    pub block_index: usize,
    pub direction: Direction,
    pub result: PushResult,
    staged: Overlay,
}

impl PushPlan {
    pub fn succeeded(&self) -> bool {
        self.result.pushed
    }

    /// Block state this plan would leave behind
    pub fn staged_block(&self, index: usize) -> Option<&Block> {
        self.staged.get(&index)
    }

    pub fn staged(&self) -> &Overlay {
        &self.staged
    }
}

struct PushSim<'w> {
    world: &'w World,
    overlay: Overlay,
    changed: BTreeSet<usize>,
    visiting: BTreeSet<(usize, Direction)>,
    result: PushResult,
}

impl<'w> PushSim<'w> {
    fn new(world: &'w World, overlay: Overlay) -> Self {
        Self {
            world,
            overlay,
            changed: BTreeSet::new(),
            visiting: BTreeSet::new(),
            result: PushResult::default(),
        }
    }

    fn block(&self, index: usize) -> Option<Block> {
        self.overlay.get(&index).or_else(|| self.world.blocks.get(index)).copied()
    }

    fn stage(&mut self, index: usize, block: Block) {
        self.overlay.insert(index, block);
        self.changed.insert(index);
    }

    /// Run a nested simulation whose staging is thrown away
    fn probe(&self, index: usize, direction: Direction, opts: PushOptions) -> bool {
        let mut sub = PushSim::new(self.world, self.overlay.clone());
        sub.visiting = self.visiting.clone();
        sub.simulate(index, direction, opts)
    }

    fn simulate(&mut self, index: usize, direction: Direction, opts: PushOptions) -> bool {
        // pushing a block into itself through a portal loop moves it along with itself
        if !self.visiting.insert((index, direction)) {
            return true;
        }
        let Some(block) = self.block(index) else {
            return false;
        };
        let world = self.world;
        let config = &world.config;
        let axis = Axis::of(direction);
        let vel_along = axis.get(block.motion.vel) * direction.sign();
        let on_ice = block_on_ice(world, index);
        let stack_mass = get_block_stack_mass(world, index);
        let momentum_push = opts.pushed_by_ice || opts.instant_momentum.is_some();

        // velocity this push gives the block, positive toward `direction`
        let mut new_vel = block.cut.normal_pushed_velocity(opts.force, config.block_push_time);
        if let Some(momentum) = opts.instant_momentum {
            if !on_ice {
                log::debug!("Block {index} is not on ice, absorbing momentum");
                return false;
            }
            let elastic = elastic_transfer_momentum(momentum.mass, momentum.vel.abs(), stack_mass, vel_along);
            if !momentum_overcomes_friction(config, stack_mass, vel_along, elastic.second_final_velocity) {
                log::debug!("Block {index} holds still against {:?}", momentum);
                return false;
            }
            new_vel = elastic.second_final_velocity;
            let collision = ElasticCollisionEvent {
                pusher_mass: momentum.mass,
                pusher_initial_velocity: momentum.vel.abs(),
                pusher_final_velocity: elastic.first_final_velocity,
                pushee_index: index,
                pushee_mass: stack_mass,
                pushee_initial_velocity: vel_along,
                pushee_final_velocity: new_vel,
                direction,
            };
            self.result.collisions.push(collision);
            self.result.events.push(SimEvent::ElasticCollision(collision));
        }

        let mut bounce_vel = None;
        if let Some(against) = block_against_another_block(world, index, direction) {
            let against_dir = direction.rotate_clockwise(against.rotations_through_portal);
            let Some(other) = self.block(against.index) else {
                return false;
            };
            if against.index == index || moving_away(&other, against_dir) {
                // nothing in the way
            } else if blocks_are_entangled(&world.blocks, index, against.index) {
                let partner_dir = direction.rotate_clockwise(blocks_rotations_between(&other, &block));
                if partner_dir != against_dir || !self.probe(against.index, against_dir, PushOptions::default()) {
                    log::debug!("Block {index} blocked by entangled block {}", against.index);
                    return false;
                }
            } else if on_ice && block_on_ice(world, against.index) && (momentum_push || new_vel > 0.0) {
                let outgoing = TransferMomentum { mass: stack_mass, vel: new_vel };
                let chained = self.simulate(against.index, against_dir, PushOptions::by_ice(outgoing));
                if !chained {
                    log::debug!("Block {index} momentum absorbed down the chain");
                    return false;
                }
                let final_vel = self
                    .result
                    .collisions
                    .iter()
                    .rev()
                    .find(|c| c.pushee_index == against.index)
                    .map_or(0.0, |c| c.pusher_final_velocity);
                self.result.againsts_pushed.push(AgainstPush { block: against.index, direction: against_dir });
                bounce_vel = Some(final_vel);
            } else {
                log::debug!("Block {index} blocked by block {}", against.index);
                return false;
            }
        }

        if let Some(final_vel) = bounce_vel {
            let mut staged = block;
            if final_vel == 0.0 {
                staged.stop_axis(axis);
            } else {
                set_coasting(&mut staged, axis, final_vel * direction.sign());
            }
            staged.add_kickback(axis, stack_mass as f32 * final_vel * direction.sign());
            self.stage(index, staged);
            return true;
        }

        let other_axis = axis.other();
        let drift_vel = other_axis.get(block.motion.vel);
        if drift_vel != 0.0 {
            let drift = match (other_axis, drift_vel > 0.0) {
                (Axis::X, true) => Direction::Right,
                (Axis::X, false) => Direction::Left,
                (Axis::Y, true) => Direction::Up,
                (Axis::Y, false) => Direction::Down,
            };
            if let Some(diagonal) = block_against_diagonal(world, index, direction, drift) {
                let diagonal_moving = self.block(diagonal).is_some_and(|b| moving_away(&b, direction));
                if !diagonal_moving {
                    log::debug!("Block {index} blocked diagonally by block {diagonal}");
                    return false;
                }
            }
        }

        if let Some(coord) = block_against_solid_tile(world, index, direction) {
            log::debug!("Block {index} blocked by solid tile {:?}", coord);
            return false;
        }
        if let Some(interactive) = block_against_solid_interactive(world, index, direction) {
            log::debug!("Block {index} blocked by {}", world.interactives[interactive].name());
            return false;
        }

        if let Some(player) = block_against_player(world, index, direction) {
            let momentum = stack_mass as f32 * new_vel.abs();
            if momentum <= config.squish_momentum_threshold {
                log::debug!("Block {index} blocked by player {player}");
                return false;
            }
            self.result.events.push(SimEvent::BlockSquishesPlayer { block: index, player });
        }

        let mut staged = block;
        if on_ice && vel_along < 0.0 && !momentum_push {
            staged.stop_axis(axis);
            self.stage(index, staged);
            self.result.events.push(SimEvent::PlayerStopsCoastingBlock { block: index });
            return true;
        }

        if let Some(from) = opts.from_entangler {
            let mv = staged.axis_move_mut(axis);
            mv.state = from.move_state;
            mv.sign = MoveSign::from_direction(direction);
            mv.time_left = from.time_left;
            axis.set(&mut staged.motion.accel, from.accel * direction.sign());
            axis.set(&mut staged.motion.coast_vel, from.coast_vel * direction.sign());
            if from.move_state == MoveState::Coasting {
                axis.set(&mut staged.motion.vel, from.coast_vel * direction.sign());
            }
        } else if momentum_push {
            set_coasting(&mut staged, axis, new_vel * direction.sign());
            staged.add_momentum(axis, BlockMomentum::Sum, stack_mass as f32 * new_vel * direction.sign());
        } else {
            let start = build_push_from_entangler(&block, direction, opts.force, config.block_push_time);
            if start.time_left <= 0.0 {
                // already moving at push speed
                self.result.events.push(SimEvent::BlockPushed { block: index, direction });
                return true;
            }
            let mv = staged.axis_move_mut(axis);
            mv.state = MoveState::Starting;
            mv.sign = MoveSign::from_direction(direction);
            mv.time_left = start.time_left;
            axis.set(&mut staged.motion.accel, start.accel * direction.sign());
            axis.set(&mut staged.motion.coast_vel, start.coast_vel * direction.sign());
            let pixel = axis.get_pixel(block.pos.pixel);
            axis.set_pixel(&mut staged.motion.started_on_pixel, pixel);
        }

        staged.successfully_moved = true;
        self.stage(index, staged);
        self.result.events.push(SimEvent::BlockPushed { block: index, direction });
        true
    }
}

/// Move state on `direction`'s axis is carrying the block that way
fn moving_away(block: &Block, direction: Direction) -> bool {
    let mv = block.axis_move(Axis::of(direction));
    matches!(mv.state, MoveState::Starting | MoveState::Coasting) && mv.sign == MoveSign::from_direction(direction)
}

pub(crate) fn set_coasting(block: &mut Block, axis: Axis, vel: f32) {
    let mv = block.axis_move_mut(axis);
    mv.state = MoveState::Coasting;
    mv.sign = MoveSign::from_vel(vel);
    mv.time_left = 0.0;
    axis.set(&mut block.motion.vel, vel);
    axis.set(&mut block.motion.accel, 0.0);
    axis.set(&mut block.motion.coast_vel, vel);
}

/// Motion a normal push toward `direction` gives `block`
///
/// A block already moving that way needs proportionally less time to reach
/// push speed.
pub fn build_push_from_entangler(block: &Block, direction: Direction, force: f32, push_time: f32) -> PushFromEntangler {
    let axis = Axis::of(direction);
    let normal_vel = block.cut.normal_pushed_velocity(force, push_time);
    let vel_along = (axis.get(block.motion.vel) * direction.sign()).max(0.0);
    let time_left = if normal_vel > 0.0 {
        push_time * (1.0 - vel_along / normal_vel)
    } else {
        0.0
    };
    PushFromEntangler {
        move_state: MoveState::Starting,
        accel: block.cut.push_accel(force, push_time),
        coast_vel: normal_vel,
        time_left: time_left.max(0.0),
    }
}

/// Simulate a push without changing the world
pub fn block_would_push(world: &World, index: usize, direction: Direction, opts: PushOptions) -> PushPlan {
    block_would_push_over(world, &Overlay::new(), index, direction, opts)
}

/// Simulate a push on top of block states staged by earlier plans
pub fn block_would_push_over(world: &World, base: &Overlay, index: usize, direction: Direction, opts: PushOptions) -> PushPlan {
    let mut sim = PushSim::new(world, base.clone());
    let pushed = sim.simulate(index, direction, opts);
    let mut result = sim.result;
    result.pushed = pushed;
    let staged = if pushed {
        sim.changed
            .iter()
            .filter_map(|&i| sim.overlay.get(&i).map(|b| (i, *b)))
            .collect()
    } else {
        Overlay::new()
    };
    PushPlan { block_index: index, direction, result, staged }
}

/// Commit a plan; false when the plan was a failed push
pub fn block_do_push(world: &mut World, plan: &PushPlan) -> bool {
    if !plan.result.pushed {
        return false;
    }
    for (&index, staged) in &plan.staged {
        match world.blocks.get_mut(index) {
            Some(block) => *block = *staged,
            None => log::warn!("Push plan refers to missing block {index}"),
        }
    }
    log::debug!(
        "Block {} pushed {} ({} blocks changed)",
        plan.block_index,
        plan.direction.as_str(),
        plan.staged.len()
    );
    true
}

/// Simulate and, when it succeeds, commit a push
pub fn block_push(world: &mut World, index: usize, direction: Direction, opts: PushOptions) -> PushResult {
    let plan = block_would_push(world, index, direction, opts);
    block_do_push(world, &plan);
    plan.result
}
