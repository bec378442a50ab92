//! Player pushes and their entangled mirrors
//!
//! A push by the player turns into an ordered list of block pushes: the
//! block the player leans on, then each entangled partner with the push
//! direction turned into that partner's frame. Requests are simulated one
//! after another on a shared overlay so a partner that has to get out of
//! the way of another is moved first; only successful plans are committed.
//!
//! Blocks an ice chain knocks loose pass the momentum that reached them on
//! to their own partners, and so on down the line.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::block::blocks_rotations_between;
use super::direction::Direction;
use super::event::SimEvent;
use super::momentum::{AllowedToPushResult, TransferMomentum, allowed_to_push};
use super::push::{
    Overlay, PushFromEntangler, PushOptions, PushPlan, PushResult, block_do_push, block_would_push_over,
    build_push_from_entangler,
};
use super::query::{block_against_another_block, block_held_down_by_another_block, block_on_ice, entangled_partners};
use super::world::World;

/// One block push derived from a player action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerBlockPush {
    pub block_index: usize,
    pub direction: Direction,
    pub allowed: AllowedToPushResult,
    pub from_entangler: Option<PushFromEntangler>,
    /// Block whose push this one mirrors
    pub entangled_with: Option<usize>,
}

impl PlayerBlockPush {
    fn options(&self, instant_momentum: Option<TransferMomentum>) -> PushOptions {
        match (instant_momentum, self.from_entangler) {
            (Some(momentum), _) => PushOptions {
                instant_momentum: Some(momentum.toward(self.direction)),
                pushed_by_ice: true,
                force: self.allowed.mass_ratio,
                ..Default::default()
            },
            (None, Some(from)) => PushOptions::from_entangler(from, self.allowed.mass_ratio),
            (None, None) => PushOptions::with_force(self.allowed.mass_ratio),
        }
    }
}

/// Pushes a push of `index` toward `direction` sets off, origin first
///
/// Empty when the origin itself may not be pushed. Partners held down by a
/// stack stay put unless they are on ice.
pub fn build_player_block_pushes(
    world: &World,
    index: usize,
    direction: Direction,
    instant_momentum: Option<TransferMomentum>,
) -> Vec<PlayerBlockPush> {
    let Some(origin) = world.blocks.get(index) else {
        return Vec::new();
    };
    let allowed = allowed_to_push(world, index, direction, instant_momentum);
    if !allowed.push {
        return Vec::new();
    }
    let mut pushes = vec![PlayerBlockPush {
        block_index: index,
        direction,
        allowed,
        from_entangler: None,
        entangled_with: None,
    }];

    let push_time = world.config.block_push_time;
    for partner_index in entangled_partners(&world.blocks, index) {
        let Some(partner) = world.blocks.get(partner_index) else {
            continue;
        };
        let held_down = block_held_down_by_another_block(world, partner_index).is_some();
        if held_down && !block_on_ice(world, partner_index) {
            log::debug!("Entangled block {partner_index} is held down");
            continue;
        }
        let partner_dir = direction.rotate_clockwise(blocks_rotations_between(partner, origin));
        let partner_allowed = allowed_to_push(world, partner_index, partner_dir, instant_momentum);
        if !partner_allowed.push {
            continue;
        }
        let mass_ratio = origin.mass() as f32 / partner.mass().max(1) as f32 * partner_allowed.mass_ratio;
        pushes.push(PlayerBlockPush {
            block_index: partner_index,
            direction: partner_dir,
            allowed: AllowedToPushResult { push: true, mass_ratio },
            from_entangler: Some(build_push_from_entangler(origin, direction, mass_ratio, push_time)),
            entangled_with: Some(index),
        });
    }
    pushes
}

struct Orderer<'w> {
    world: &'w World,
    pushes: &'w [PlayerBlockPush],
    instant_momentum: Option<TransferMomentum>,
    overlay: Overlay,
    in_progress: BTreeSet<usize>,
    done: BTreeSet<usize>,
    plans: Vec<PushPlan>,
}

impl Orderer<'_> {
    /// Simulate request `i`, after whichever request moves its blocker
    fn add_ordered(&mut self, i: usize) {
        if self.done.contains(&i) || !self.in_progress.insert(i) {
            return;
        }
        let push = self.pushes[i];
        if let Some(against) = block_against_another_block(self.world, push.block_index, push.direction) {
            let against_dir = push.direction.rotate_clockwise(against.rotations_through_portal);
            let blocker_request = self
                .pushes
                .iter()
                .position(|p| p.block_index == against.index && p.direction == against_dir);
            if let Some(j) = blocker_request {
                self.add_ordered(j);
            }
        }

        let plan = block_would_push_over(
            self.world,
            &self.overlay,
            push.block_index,
            push.direction,
            push.options(self.instant_momentum),
        );
        if plan.succeeded() {
            self.overlay.extend(plan.staged().iter().map(|(&k, b)| (k, *b)));
            self.plans.push(plan);
        }
        self.in_progress.remove(&i);
        self.done.insert(i);
    }
}

/// Order and simulate a set of pushes; only the ones that succeed are returned
pub fn plan_player_block_pushes(
    world: &World,
    pushes: &[PlayerBlockPush],
    instant_momentum: Option<TransferMomentum>,
) -> Vec<PushPlan> {
    let mut orderer = Orderer {
        world,
        pushes,
        instant_momentum,
        overlay: Overlay::new(),
        in_progress: BTreeSet::new(),
        done: BTreeSet::new(),
        plans: Vec::new(),
    };
    for i in 0..pushes.len() {
        orderer.add_ordered(i);
    }
    orderer.plans
}

/// A block an ice chain set moving, with the momentum that reached it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Knocked {
    pub block: usize,
    pub direction: Direction,
    pub momentum: TransferMomentum,
}

/// Blocks a push knocked loose down an ice chain
pub fn knocked_along(result: &PushResult) -> Vec<Knocked> {
    result
        .againsts_pushed
        .iter()
        .filter_map(|against| {
            let collision = result.collisions.iter().rev().find(|c| c.pushee_index == against.block)?;
            Some(Knocked {
                block: against.block,
                direction: against.direction,
                momentum: TransferMomentum {
                    mass: collision.pusher_mass,
                    vel: collision.pusher_initial_velocity,
                },
            })
        })
        .collect()
}

/// Hand the momentum that reached each knocked block on to its partners
///
/// Partners that knock further blocks loose pass it on in turn. Blocks in
/// `visited` are never pushed again.
pub fn push_knocked_partners(world: &mut World, knocked: Vec<Knocked>, mut visited: BTreeSet<usize>) -> Vec<SimEvent> {
    let mut events = Vec::new();
    let mut pending = VecDeque::from(knocked);
    while let Some(knock) = pending.pop_front() {
        visited.insert(knock.block);
        let mut pushes = build_player_block_pushes(world, knock.block, knock.direction, Some(knock.momentum));
        pushes.retain(|p| p.entangled_with.is_some() && !visited.contains(&p.block_index));
        if pushes.is_empty() {
            continue;
        }
        visited.extend(pushes.iter().map(|p| p.block_index));
        let plans = plan_player_block_pushes(world, &pushes, Some(knock.momentum));
        for plan in &plans {
            if block_do_push(world, plan) {
                events.extend(plan.result.events.iter().copied());
                pending.extend(knocked_along(&plan.result));
            }
        }
        world.rebuild_block_index();
    }
    events
}

fn commit(world: &mut World, plans: &[PushPlan]) -> Vec<SimEvent> {
    let mut events = Vec::new();
    let mut knocked = Vec::new();
    for plan in plans {
        if block_do_push(world, plan) {
            events.extend(plan.result.events.iter().copied());
            knocked.extend(knocked_along(&plan.result));
        }
    }
    if !plans.is_empty() {
        world.rebuild_block_index();
    }
    let visited = plans.iter().map(|p| p.block_index).collect();
    events.extend(push_knocked_partners(world, knocked, visited));
    events
}

/// Push a block the way a player does, moving its entangled partners with it
pub fn player_push_block(world: &mut World, index: usize, direction: Direction) -> Vec<SimEvent> {
    let pushes = build_player_block_pushes(world, index, direction, None);
    let plans = plan_player_block_pushes(world, &pushes, None);
    log::debug!(
        "Player push of block {index} {}: {} of {} pushes succeed",
        direction.as_str(),
        plans.len(),
        pushes.len()
    );
    commit(world, &plans)
}

/// Hand ice momentum that reached `index` on to its entangled partners
///
/// The momentum is turned into each partner's frame. With `pushed_by_ice`
/// unset the momentum is treated as a steady push of the partners instead.
pub fn push_entangled_block(
    world: &mut World,
    index: usize,
    direction: Direction,
    pushed_by_ice: bool,
    instant_momentum: Option<TransferMomentum>,
) -> Vec<SimEvent> {
    if let (true, Some(momentum)) = (pushed_by_ice, instant_momentum) {
        let knocked = vec![Knocked { block: index, direction, momentum }];
        return push_knocked_partners(world, knocked, BTreeSet::new());
    }
    let pushes: Vec<PlayerBlockPush> = build_player_block_pushes(world, index, direction, None)
        .into_iter()
        .filter(|p| p.entangled_with.is_some())
        .collect();
    if pushes.is_empty() {
        return Vec::new();
    }
    let plans = plan_player_block_pushes(world, &pushes, None);
    commit(world, &plans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::HEIGHT_INTERVAL;
    use crate::sim::block::BlockCut;
    use crate::sim::coord::Coord;
    use crate::sim::motion::MoveSign;
    use crate::sim::push::{PushOptions, block_would_push};
    use crate::sim::test_support::WorldBuilder;

    /// A at (2,1) and B at (3,1), entangled, B turned half way round
    fn opposed_pair() -> World {
        WorldBuilder::new(7, 3)
            .block_with(Coord::new(2, 1), |b| b.entangle_index = Some(1))
            .block_with(Coord::new(3, 1), |b| {
                b.entangle_index = Some(0);
                b.rotation = 2;
            })
            .build()
    }

    #[test]
    fn test_partner_gets_rotated_direction() {
        let world = opposed_pair();
        let pushes = build_player_block_pushes(&world, 0, Direction::Left, None);
        assert_eq!(pushes.len(), 2);
        assert_eq!(pushes[1].block_index, 1);
        assert_eq!(pushes[1].direction, Direction::Right);
        assert_eq!(pushes[1].entangled_with, Some(0));
    }

    #[test]
    fn test_mirrored_pushes_both_move() {
        let mut world = opposed_pair();
        let events = player_push_block(&mut world, 0, Direction::Left);
        assert!(events.contains(&SimEvent::BlockPushed { block: 0, direction: Direction::Left }));
        assert!(events.contains(&SimEvent::BlockPushed { block: 1, direction: Direction::Right }));
        assert_eq!(world.blocks[0].horizontal_move.sign, MoveSign::Negative);
        assert_eq!(world.blocks[1].horizontal_move.sign, MoveSign::Positive);
        assert_eq!(blocks_rotations_between(&world.blocks[1], &world.blocks[0]), 2);
    }

    #[test]
    fn test_same_literal_direction_blocks_one() {
        let world = opposed_pair();
        assert!(!block_would_push(&world, 0, Direction::Right, PushOptions::default()).succeeded());
        assert!(block_would_push(&world, 1, Direction::Right, PushOptions::default()).succeeded());

        let mut world = world;
        let events = player_push_block(&mut world, 0, Direction::Right);
        assert!(events.is_empty());
        assert!(!world.blocks[0].is_moving());
        assert!(!world.blocks[1].is_moving());
    }

    #[test]
    fn test_partner_in_line_is_moved_first() {
        // B sits right of A with the same rotation: pushing A right needs B to go first
        let mut world = WorldBuilder::new(7, 3)
            .block_with(Coord::new(2, 1), |b| b.entangle_index = Some(1))
            .block_with(Coord::new(3, 1), |b| b.entangle_index = Some(0))
            .build();
        let pushes = build_player_block_pushes(&world, 0, Direction::Right, None);
        let plans = plan_player_block_pushes(&world, &pushes, None);
        let order: Vec<usize> = plans.iter().map(|p| p.block_index).collect();
        assert_eq!(order, vec![1, 0]);

        player_push_block(&mut world, 0, Direction::Right);
        assert!(world.blocks[0].is_moving());
        assert!(world.blocks[1].is_moving());
    }

    #[test]
    fn test_held_down_partner_stays() {
        let mut world = WorldBuilder::new(7, 3)
            .block_with(Coord::new(1, 1), |b| b.entangle_index = Some(1))
            .block_with(Coord::new(4, 1), |b| b.entangle_index = Some(0))
            .block_with(Coord::new(4, 1), |b| b.pos.z = HEIGHT_INTERVAL)
            .build();
        player_push_block(&mut world, 0, Direction::Right);
        assert!(world.blocks[0].is_moving());
        assert!(!world.blocks[1].is_moving());
    }

    #[test]
    fn test_smaller_partner_pushed_harder() {
        let world = WorldBuilder::new(7, 3)
            .block_with(Coord::new(1, 1), |b| b.entangle_index = Some(1))
            .block_with(Coord::new(4, 1), |b| {
                b.entangle_index = Some(0);
                b.cut = BlockCut::LeftHalf;
            })
            .build();
        let pushes = build_player_block_pushes(&world, 0, Direction::Up, None);
        assert!((pushes[1].allowed.mass_ratio - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_ice_momentum_reaches_partner_only_on_ice() {
        let mut world = WorldBuilder::new(7, 3)
            .block_with(Coord::new(1, 1), |b| b.entangle_index = Some(1))
            .block_with(Coord::new(4, 1), |b| {
                b.entangle_index = Some(0);
                b.rotation = 1;
            })
            .iced(Coord::new(4, 1))
            .build();
        let momentum = TransferMomentum { mass: 256, vel: 0.3 };
        let events = push_entangled_block(&mut world, 0, Direction::Right, true, Some(momentum));
        // Right turned one quarter clockwise is Down
        assert!(events.contains(&SimEvent::BlockPushed { block: 1, direction: Direction::Down }));
        assert!(world.blocks[1].motion.vel.y < 0.0);
        assert!(!world.blocks[0].is_moving());
    }

    #[test]
    fn test_partner_of_block_knocked_down_ice_chain_moves() {
        // A shoves B along the ice; B's partner C sits on its own patch of ice
        let mut world = WorldBuilder::new(8, 5)
            .block(Coord::new(2, 1))
            .block_with(Coord::new(3, 1), |b| b.entangle_index = Some(2))
            .block_with(Coord::new(3, 3), |b| b.entangle_index = Some(1))
            .iced(Coord::new(2, 1))
            .iced(Coord::new(3, 1))
            .iced(Coord::new(4, 1))
            .iced(Coord::new(3, 3))
            .iced(Coord::new(4, 3))
            .build();
        let events = player_push_block(&mut world, 0, Direction::Right);
        assert!(events.contains(&SimEvent::BlockPushed { block: 1, direction: Direction::Right }));
        assert!(events.contains(&SimEvent::BlockPushed { block: 2, direction: Direction::Right }));
        assert!(world.blocks[1].motion.vel.x > 0.0);
        assert!(world.blocks[2].motion.vel.x > 0.0);
    }

    #[test]
    fn test_knocked_block_carries_pusher_momentum() {
        let world = WorldBuilder::new(8, 3)
            .block(Coord::new(2, 1))
            .block(Coord::new(3, 1))
            .iced(Coord::new(2, 1))
            .iced(Coord::new(3, 1))
            .build();
        let plan = block_would_push(&world, 0, Direction::Right, PushOptions::default());
        let knocked = knocked_along(&plan.result);
        assert_eq!(knocked.len(), 1);
        assert_eq!(knocked[0].block, 1);
        assert_eq!(knocked[0].direction, Direction::Right);
        assert_eq!(knocked[0].momentum.mass, world.blocks[0].mass());
        assert!(knocked[0].momentum.vel > 0.0);
    }
}
