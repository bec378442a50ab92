//! Ice spreading and melting
//!
//! Both walk the square of tiles within a radius of the source. A block on a
//! tile takes the effect; otherwise the interactive or the bare floor does.
//! Reaching an active portal continues the effect on the far side of each
//! linked portal with whatever radius is left.

use std::collections::BTreeSet;

use super::block::Element;
use super::coord::Coord;
use super::event::SimEvent;
use super::interactive::InteractiveKind;
use super::portal_exit::find_portal_exits;
use super::world::World;
use crate::consts::MELT_SPREAD_HEIGHT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct IceFront {
    center: Coord,
    radius: i16,
    teleported: bool,
}

/// Ice over everything within `radius` tiles of `center`
///
/// `height` is where the ice comes from: blocks more than
/// `MELT_SPREAD_HEIGHT` above or below it are out of reach, and the floor
/// is only reached from that close to it.
pub fn spread_ice(world: &mut World, center: Coord, height: i8, radius: i16) -> Vec<SimEvent> {
    impact_ice(world, center, height, radius, true)
}

/// Remove ice within `radius` tiles of `center`; see [`spread_ice`]
pub fn melt_ice(world: &mut World, center: Coord, height: i8, radius: i16) -> Vec<SimEvent> {
    impact_ice(world, center, height, radius, false)
}

fn within_reach(a: i8, b: i8) -> bool {
    (a as i16 - b as i16).abs() <= MELT_SPREAD_HEIGHT as i16
}

fn impact_ice(world: &mut World, center: Coord, height: i8, radius: i16, spread: bool) -> Vec<SimEvent> {
    let mut events = Vec::new();
    let mut pending = vec![IceFront { center, radius, teleported: false }];
    let mut visited = BTreeSet::new();

    while let Some(front) = pending.pop() {
        if front.radius < 0 || !visited.insert(front) {
            continue;
        }
        for y in front.center.y - front.radius..=front.center.y + front.radius {
            for x in front.center.x - front.radius..=front.center.x + front.radius {
                let coord = Coord::new(x, y);
                if world.tilemap.get(coord).is_none_or(|t| t.is_solid()) {
                    continue;
                }
                if ice_coord(world, coord, height, spread) {
                    events.push(if spread { SimEvent::IceSpread { coord } } else { SimEvent::IceMelted { coord } });
                }

                if front.teleported || !world.interactive_at(coord).is_some_and(|i| i.is_active_portal()) {
                    continue;
                }
                let (dx, dy) = ((coord.x - front.center.x) as f32, (coord.y - front.center.y) as f32);
                let distance = (dx * dx + dy * dy).sqrt() as i16;
                for (face, exit) in find_portal_exits(world, coord).iter() {
                    if exit == coord {
                        continue;
                    }
                    pending.push(IceFront {
                        center: exit.step(face.opposite()),
                        radius: front.radius - distance,
                        teleported: true,
                    });
                }
            }
        }
    }
    events
}

/// Apply the effect to one tile; true when anything changed
fn ice_coord(world: &mut World, coord: Coord, height: i8, spread: bool) -> bool {
    let block = world
        .blocks_in(&coord.pixel_rect())
        .into_iter()
        .filter(|&i| world.blocks[i].coord() == coord && within_reach(world.blocks[i].pos.z, height))
        .max_by_key(|&i| world.blocks[i].pos.z);
    if let Some(i) = block {
        let element = &mut world.blocks[i].element;
        return match (spread, *element) {
            (true, Element::None) => {
                *element = Element::OnlyIced;
                true
            }
            (false, Element::OnlyIced) => {
                *element = Element::None;
                true
            }
            _ => false,
        };
    }

    if !within_reach(0, height) {
        return false;
    }
    let was_iced = world.tilemap.is_iced(coord);
    let mut changed = false;
    let mut tile_iced = spread;
    if let Some(interactive) = world.interactive_at_mut(coord) {
        match &mut interactive.kind {
            InteractiveKind::Popup { lift, iced } if lift.ticks > 1 => {
                // raised popups carry the ice on top instead of the floor
                changed = *iced != spread;
                *iced = spread;
                tile_iced = was_iced;
            }
            InteractiveKind::Popup { iced, .. } => {
                changed = *iced;
                *iced = false;
            }
            InteractiveKind::PressurePlate { iced_under, .. } => {
                if !spread {
                    changed = *iced_under;
                    *iced_under = false;
                }
            }
            InteractiveKind::Pit { iced, .. } => {
                changed = *iced != spread;
                *iced = spread;
            }
            _ => {}
        }
    }
    world.tilemap.set_iced(coord, tile_iced);
    changed || was_iced != tile_iced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::HEIGHT_INTERVAL;
    use crate::sim::direction::{Direction, DirectionMask};
    use crate::sim::interactive::Interactive;
    use crate::sim::test_support::WorldBuilder;

    #[test]
    fn test_spread_covers_square_and_skips_solids() {
        let mut world = WorldBuilder::new(7, 7).solid(Coord::new(3, 4)).build();
        let events = spread_ice(&mut world, Coord::new(3, 3), 0, 1);
        assert_eq!(events.len(), 8);
        assert!(world.tilemap.is_iced(Coord::new(2, 2)));
        assert!(world.tilemap.is_iced(Coord::new(4, 4)));
        assert!(!world.tilemap.is_iced(Coord::new(3, 4)));
        assert!(!world.tilemap.is_iced(Coord::new(1, 3)));

        let events = melt_ice(&mut world, Coord::new(3, 3), 0, 0);
        assert_eq!(events, vec![SimEvent::IceMelted { coord: Coord::new(3, 3) }]);
        assert!(!world.tilemap.is_iced(Coord::new(3, 3)));
    }

    #[test]
    fn test_block_shields_the_floor() {
        let mut world = WorldBuilder::new(5, 5).block(Coord::new(2, 2)).build();
        spread_ice(&mut world, Coord::new(2, 2), 0, 0);
        assert_eq!(world.blocks[0].element, Element::OnlyIced);
        assert!(!world.tilemap.is_iced(Coord::new(2, 2)));

        melt_ice(&mut world, Coord::new(2, 2), 0, 0);
        assert_eq!(world.blocks[0].element, Element::None);
    }

    #[test]
    fn test_high_source_misses_floor() {
        let mut world = WorldBuilder::new(5, 5)
            .block_with(Coord::new(1, 2), |b| b.pos.z = HEIGHT_INTERVAL * 2)
            .build();
        spread_ice(&mut world, Coord::new(2, 2), HEIGHT_INTERVAL * 2, 1);
        assert_eq!(world.blocks[0].element, Element::OnlyIced);
        assert!(!world.tilemap.is_iced(Coord::new(2, 2)));
    }

    #[test]
    fn test_fire_and_ice_blocks_are_left_alone() {
        let mut world = WorldBuilder::new(5, 5)
            .block_with(Coord::new(2, 2), |b| b.element = Element::Fire)
            .build();
        assert!(spread_ice(&mut world, Coord::new(2, 2), 0, 0).is_empty());
        assert_eq!(world.blocks[0].element, Element::Fire);
    }

    #[test]
    fn test_raised_popup_keeps_ice_on_top() {
        let mut world = WorldBuilder::new(5, 5)
            .interactive(Interactive::popup(Coord::new(2, 2), true))
            .build();
        spread_ice(&mut world, Coord::new(2, 2), 0, 0);
        assert!(matches!(world.interactives[0].kind, InteractiveKind::Popup { iced: true, .. }));
        assert!(!world.tilemap.is_iced(Coord::new(2, 2)));
    }

    #[test]
    fn test_ice_continues_through_portal() {
        let horizontal = DirectionMask::NONE.with(Direction::Left).with(Direction::Right);
        let mut builder = WorldBuilder::new(12, 5)
            .portal(Coord::new(2, 2), Direction::Right, true)
            .portal(Coord::new(9, 2), Direction::Left, true)
            .wire(Coord::new(2, 1), DirectionMask::NONE.with(Direction::Up).with(Direction::Right), true)
            .wire(Coord::new(9, 1), DirectionMask::NONE.with(Direction::Up).with(Direction::Left), true);
        for x in 3..9 {
            builder = builder.wire(Coord::new(x, 1), horizontal, true);
        }
        let mut world = builder.build();
        spread_ice(&mut world, Coord::new(1, 3), 0, 1);
        // one tile used up reaching the portal, exit lands right of the far portal
        assert!(world.tilemap.is_iced(Coord::new(10, 2)));
        assert!(!world.tilemap.is_iced(Coord::new(11, 2)));
    }
}
