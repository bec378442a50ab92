//! Bows and the arrows they fire
//!
//! A bow lying on the map is picked up by the first player to step on it.
//! A player holding a bow draws it while the fire input is held and looses
//! an arrow on release once it has been drawn long enough.
//!
//! Arrows fly straight along their facing, sinking one height step every
//! fall delay. They stick in the first block, raised popup or closed door
//! in their path and crumble a while later; an arrow stuck in a block rides
//! along with it. Walls, other solid mechanisms and the map edge break them.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::coord::{Coord, Rect};
use super::direction::Direction;
use super::event::SimEvent;
use super::interactive::InteractiveKind;
use super::position::Position;
use super::world::World;
use crate::consts::*;

/// What an arrow is stuck in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Stuck {
    Block { index: usize, offset: Vec2 },
    Popup(Coord),
    Door(Coord),
    Floor,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arrow {
    pub pos: Position,
    pub face: Direction,
    pub vel: f32,
    /// Flight time since the arrow last sank
    pub fall_time: f32,
    pub stuck: Option<Stuck>,
    pub stuck_time: f32,
}

impl Arrow {
    pub fn new(pos: Position, face: Direction) -> Self {
        Self {
            pos,
            face,
            vel: ARROW_SPEED,
            fall_time: 0.0,
            stuck: None,
            stuck_time: 0.0,
        }
    }
}

/// Add an arrow to the world; None when too many are already flying
pub fn arrow_spawn(world: &mut World, pos: Position, face: Direction) -> Option<usize> {
    if world.arrows.len() >= ARROW_ARRAY_MAX {
        log::debug!("Arrow limit of {ARROW_ARRAY_MAX} reached");
        return None;
    }
    world.arrows.push(Arrow::new(pos, face));
    Some(world.arrows.len() - 1)
}

/// Hand the bow under player `index` to that player
pub fn pick_up_bow(world: &mut World, index: usize) -> Option<SimEvent> {
    let coord = world.players.get(index)?.coord();
    let bow = world.interactive_index_at(coord)?;
    if !matches!(world.interactives[bow].kind, InteractiveKind::Bow) {
        return None;
    }
    world.interactives.remove(bow);
    world.rebuild_indices();
    world.players[index].has_bow = true;
    log::info!("Player {index} picked up the bow at ({}, {})", coord.x, coord.y);
    Some(SimEvent::BowPickedUp { player: index, coord })
}

/// Draw player `index`'s bow while `drawing`, firing when it is let go fully drawn
pub fn update_bow(world: &mut World, index: usize, drawing: bool, dt: f32) -> Option<SimEvent> {
    let player = world.players.get_mut(index)?;
    if !player.has_bow {
        return None;
    }
    if drawing {
        player.bow_draw_time += dt;
        return None;
    }
    let drawn = player.bow_draw_time >= PLAYER_BOW_DRAW_DELAY;
    player.bow_draw_time = 0.0;
    if !drawn {
        return None;
    }

    let mut pos = player.pos;
    pos.z = player.pos.z.saturating_add(ARROW_SHOOT_HEIGHT);
    let face = player.face;
    let coord = player.coord();
    arrow_spawn(world, pos, face)?;
    log::debug!("Player {index} fires an arrow {}", face.as_str());
    Some(SimEvent::ArrowFired { player: index, coord })
}

enum Flight {
    Flying,
    Stick(Stuck),
    Break,
}

fn arrow_hits(world: &World, arrow: &Arrow) -> Flight {
    let pixel = arrow.pos.closest_pixel();
    let coord = pixel.to_coord();
    if world.tilemap.is_solid(coord) {
        return Flight::Break;
    }

    let z = arrow.pos.z as i16;
    let hit_block = world.blocks_in(&Rect::new(pixel.x, pixel.y, pixel.x, pixel.y)).into_iter().find(|&i| {
        let bottom = world.blocks[i].pos.z as i16;
        (bottom..bottom + HEIGHT_INTERVAL as i16).contains(&z)
    });
    if let Some(index) = hit_block {
        let offset = arrow.pos.to_vec() - world.blocks[index].pos.to_vec();
        return Flight::Stick(Stuck::Block { index, offset });
    }

    let Some(interactive) = world.interactive_at(coord) else {
        return Flight::Flying;
    };
    match interactive.kind {
        InteractiveKind::Popup { .. } if interactive.is_solid_at_height(arrow.pos.z) => Flight::Stick(Stuck::Popup(coord)),
        InteractiveKind::Popup { .. } => Flight::Flying,
        InteractiveKind::Door { .. } if interactive.is_solid() => Flight::Stick(Stuck::Door(coord)),
        _ if interactive.is_solid() => Flight::Break,
        _ => Flight::Flying,
    }
}

/// Fly, sink, stick and crumble every arrow
pub fn update_arrows(world: &mut World, dt: f32) -> Vec<SimEvent> {
    let mut events = Vec::new();
    let mut index = 0;
    while index < world.arrows.len() {
        let mut arrow = world.arrows[index];
        let keep = match arrow.stuck {
            Some(stuck) => {
                arrow.stuck_time += dt;
                if let Stuck::Block { index: block, offset } = stuck {
                    if let Some(block) = world.blocks.get(block) {
                        let z = arrow.pos.z;
                        arrow.pos = Position::from_vec(block.pos.to_vec() + offset, z);
                    }
                }
                arrow.stuck_time < ARROW_DISINTEGRATE_DELAY
            }
            None => {
                arrow.fall_time += dt;
                if arrow.fall_time >= ARROW_FALL_DELAY {
                    arrow.fall_time -= ARROW_FALL_DELAY;
                    arrow.pos.z -= 1;
                }
                arrow.pos += arrow.face.to_vec() * arrow.vel * dt;
                let coord = arrow.pos.closest_pixel().to_coord();
                if arrow.pos.z < 0 {
                    arrow.pos.z = 0;
                    arrow.stuck = Some(Stuck::Floor);
                    events.push(SimEvent::ArrowStuck { coord });
                    true
                } else if !world.tilemap.in_bounds(coord) {
                    events.push(SimEvent::ArrowBroke { coord });
                    false
                } else {
                    match arrow_hits(world, &arrow) {
                        Flight::Flying => true,
                        Flight::Stick(stuck) => {
                            log::debug!("Arrow {index} sticks in {:?}", stuck);
                            arrow.stuck = Some(stuck);
                            events.push(SimEvent::ArrowStuck { coord });
                            true
                        }
                        Flight::Break => {
                            events.push(SimEvent::ArrowBroke { coord });
                            false
                        }
                    }
                }
            }
        };
        if keep {
            world.arrows[index] = arrow;
            index += 1;
        } else {
            world.arrows.remove(index);
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::interactive::Interactive;
    use crate::sim::test_support::WorldBuilder;
    use crate::sim::tick::TickInput;

    const SIM_DT: f32 = 1.0 / 60.0;

    fn flying_right(world: &mut World, from: Coord) {
        let pos = Position::tile_center(from, ARROW_SHOOT_HEIGHT);
        assert!(arrow_spawn(world, pos, Direction::Right).is_some());
    }

    fn fly(world: &mut World, steps: usize) -> Vec<SimEvent> {
        (0..steps).flat_map(|_| update_arrows(world, SIM_DT)).collect()
    }

    #[test]
    fn test_arrow_breaks_on_wall() {
        let mut world = WorldBuilder::new(8, 3).solid(Coord::new(5, 1)).build();
        flying_right(&mut world, Coord::new(1, 1));
        let events = fly(&mut world, 60);
        assert!(events.contains(&SimEvent::ArrowBroke { coord: Coord::new(5, 1) }));
        assert!(world.arrows.is_empty());
    }

    #[test]
    fn test_arrow_sticks_in_block_and_rides_along() {
        let mut world = WorldBuilder::new(8, 3).block(Coord::new(4, 1)).build();
        flying_right(&mut world, Coord::new(1, 1));
        let events = fly(&mut world, 60);
        assert!(events.contains(&SimEvent::ArrowStuck { coord: Coord::new(4, 1) }));
        assert!(matches!(world.arrows[0].stuck, Some(Stuck::Block { index: 0, .. })));

        let before = world.arrows[0].pos.to_vec();
        world.blocks[0].pos += Vec2::new(TILE_SIZE, 0.0);
        fly(&mut world, 1);
        assert!((world.arrows[0].pos.to_vec().x - before.x - TILE_SIZE).abs() < 1e-4);
    }

    #[test]
    fn test_arrow_flies_over_short_block_and_hits_popup() {
        let mut world = WorldBuilder::new(8, 3)
            .block_with(Coord::new(3, 1), |b| b.pos.z = -HEIGHT_INTERVAL)
            .interactive(Interactive::popup(Coord::new(5, 1), true))
            .build();
        flying_right(&mut world, Coord::new(1, 1));
        let events = fly(&mut world, 60);
        assert!(events.contains(&SimEvent::ArrowStuck { coord: Coord::new(5, 1) }));
        assert_eq!(world.arrows[0].stuck, Some(Stuck::Popup(Coord::new(5, 1))));
    }

    #[test]
    fn test_stuck_arrow_crumbles() {
        let mut world = WorldBuilder::new(8, 3)
            .interactive(Interactive::door(Coord::new(3, 1), Direction::Left, false))
            .build();
        flying_right(&mut world, Coord::new(1, 1));
        fly(&mut world, 30);
        assert_eq!(world.arrows[0].stuck, Some(Stuck::Door(Coord::new(3, 1))));
        update_arrows(&mut world, ARROW_DISINTEGRATE_DELAY);
        assert!(world.arrows.is_empty());
    }

    #[test]
    fn test_arrow_limit() {
        let mut world = WorldBuilder::new(4, 3).build();
        for _ in 0..ARROW_ARRAY_MAX {
            assert!(arrow_spawn(&mut world, Position::tile_center(Coord::new(1, 1), 0), Direction::Up).is_some());
        }
        assert_eq!(arrow_spawn(&mut world, Position::tile_center(Coord::new(1, 1), 0), Direction::Up), None);
    }

    #[test]
    fn test_player_picks_up_bow_then_fires() {
        let mut world = WorldBuilder::new(8, 3)
            .interactive(Interactive::new(Coord::new(2, 1), InteractiveKind::Bow))
            .player_with(Coord::new(2, 1), |p| p.face = Direction::Right)
            .build();
        let idle = TickInput::default();
        let draw = TickInput { draw_bow: true, ..Default::default() };

        let report = world.step(SIM_DT, &[idle]);
        assert!(report.events.contains(&SimEvent::BowPickedUp { player: 0, coord: Coord::new(2, 1) }));
        assert!(world.players[0].has_bow);
        assert!(world.interactive_at(Coord::new(2, 1)).is_none());

        // let go too early: nothing
        world.step(SIM_DT, &[draw]);
        let report = world.step(SIM_DT, &[idle]);
        assert!(!report.events.iter().any(|e| matches!(e, SimEvent::ArrowFired { .. })));

        for _ in 0..30 {
            world.step(SIM_DT, &[draw]);
        }
        let report = world.step(SIM_DT, &[idle]);
        assert!(report.events.contains(&SimEvent::ArrowFired { player: 0, coord: Coord::new(2, 1) }));
        assert_eq!(world.arrows.len(), 1);
        assert_eq!(world.arrows[0].face, Direction::Right);
        assert_eq!(world.arrows[0].pos.z, ARROW_SHOOT_HEIGHT);
    }
}
