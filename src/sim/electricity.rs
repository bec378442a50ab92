//! Wire propagation and the mechanisms it drives
//!
//! Power travels tile to tile. Each step looks at the tile one over in the
//! travel direction, toggles whatever mechanism sits there and carries on
//! along any wire that connects back to the side it came in from. Wire
//! loops are walked once per activation.

use std::collections::BTreeSet;

use super::coord::Coord;
use super::direction::Direction;
use super::event::SimEvent;
use super::interactive::InteractiveKind;
use super::portal_exit::find_portal_exits;
use super::world::World;

/// One pending hop of electricity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Signal {
    /// Tile the signal leaves from
    coord: Coord,
    direction: Direction,
    from_wire: bool,
    activated_by_door: bool,
}

/// Toggle whatever lies one tile from `coord` toward `direction`, and everything wired to it
pub fn toggle_electricity(
    world: &mut World,
    coord: Coord,
    direction: Direction,
    from_wire: bool,
    activated_by_door: bool,
) -> Vec<SimEvent> {
    let mut events = Vec::new();
    let mut pending = vec![Signal { coord, direction, from_wire, activated_by_door }];
    let mut visited: BTreeSet<(Coord, Direction)> = BTreeSet::new();

    while let Some(signal) = pending.pop() {
        let target = signal.coord.step(signal.direction);
        if !world.tilemap.in_bounds(target) || !visited.insert((target, signal.direction)) {
            continue;
        }

        // portal exits are looked up before anything at the target changes
        let exits = match world.interactive_at(target).map(|i| i.kind) {
            Some(InteractiveKind::Portal { on: true, .. }) if !signal.from_wire => Some(find_portal_exits(world, target)),
            _ => None,
        };

        let mut cross_mask = None;
        let mut clear_ice = false;
        if let Some(interactive) = world.interactive_at_mut(target) {
            match &mut interactive.kind {
                InteractiveKind::Popup { lift, .. } => {
                    lift.up = !lift.up;
                    events.push(SimEvent::PopupToggled { coord: target, up: lift.up });
                    clear_ice = true;
                }
                InteractiveKind::Door { lift, face } => {
                    lift.up = !lift.up;
                    events.push(SimEvent::DoorToggled { coord: target, up: lift.up });
                    if !signal.activated_by_door {
                        // the door facing this one across the gap
                        pending.push(Signal {
                            coord: target.moved(*face, 2),
                            direction: *face,
                            from_wire: signal.from_wire,
                            activated_by_door: true,
                        });
                    }
                }
                InteractiveKind::Portal { on, has_block_inside, wants_to_turn_off, .. } => {
                    if signal.from_wire {
                        if *on && *has_block_inside {
                            *wants_to_turn_off = !*wants_to_turn_off;
                            log::debug!("Portal at ({}, {}) waits for its block before switching", target.x, target.y);
                        } else {
                            *on = !*on;
                            *wants_to_turn_off = false;
                            events.push(SimEvent::PortalToggled { coord: target, on: *on });
                        }
                    }
                }
                InteractiveKind::WireCross { mask, .. } => cross_mask = Some(*mask),
                _ => {}
            }
        }
        if clear_ice {
            world.tilemap.set_iced(target, false);
        }

        if let Some(exits) = exits {
            for (exit_face, exit) in exits.iter().filter(|&(_, exit)| exit != target) {
                pending.push(Signal {
                    coord: exit,
                    direction: exit_face.opposite(),
                    from_wire: false,
                    activated_by_door: false,
                });
            }
        }

        let Some(flags) = world.tilemap.get(target).map(|t| t.flags) else {
            continue;
        };
        let entering = signal.direction.opposite();
        let crossing = cross_mask.is_some_and(|mask| !mask.is_empty());

        if !flags.wires.is_empty() || crossing {
            let onward = if flags.wires.contains(entering) {
                if let Some(tile) = world.tilemap.get_mut(target) {
                    tile.flags.toggle_wire();
                }
                flags.wires
            } else if let Some(mask) = cross_mask.filter(|mask| mask.contains(entering)) {
                if let Some(InteractiveKind::WireCross { on, .. }) = world.interactive_at_mut(target).map(|i| &mut i.kind) {
                    *on = !*on;
                }
                mask
            } else {
                continue;
            };
            for d in onward.iter().filter(|&d| d != entering) {
                pending.push(Signal { coord: target, direction: d, from_wire: true, activated_by_door: false });
            }
        } else if let Some(cluster) = world.tilemap.get_mut(target).and_then(|t| t.flags.cluster.as_mut()) {
            let all_on_before = cluster.all_on();
            if let Some(segment) = cluster.segment_for(signal.direction) {
                cluster.toggle(segment);
            }
            if cluster.all_on() != all_on_before {
                pending.push(Signal {
                    coord: target,
                    direction: cluster.facing,
                    from_wire: true,
                    activated_by_door: false,
                });
            }
        }
    }
    events
}

/// Trigger the lever, plate, detector or portal at `coord`
///
/// Empty when nothing there can be activated.
pub fn activate(world: &mut World, coord: Coord) -> Vec<SimEvent> {
    let Some(interactive) = world.interactive_at(coord) else {
        return Vec::new();
    };
    if !interactive.can_activate() {
        return Vec::new();
    }
    log::info!("Activated {} at ({}, {})", interactive.name(), coord.x, coord.y);

    let mut events = vec![SimEvent::Activated { coord }];
    for direction in Direction::ALL {
        events.extend(toggle_electricity(world, coord, direction, false, false));
    }
    events
}

/// Press or release plates under blocks and players, activating the ones that change
pub fn update_pressure_plates(world: &mut World) -> Vec<SimEvent> {
    let mut changed = Vec::new();
    for i in 0..world.interactives.len() {
        let coord = world.interactives[i].coord;
        let InteractiveKind::PressurePlate { down, .. } = world.interactives[i].kind else {
            continue;
        };
        let block_on = world.blocks.iter().any(|b| b.pos.z == 0 && b.coord() == coord);
        let player_on = world.players.iter().any(|p| p.pos.z == 0 && p.coord() == coord);
        let now_down = block_on || player_on;
        if now_down != down {
            if let InteractiveKind::PressurePlate { down, .. } = &mut world.interactives[i].kind {
                *down = now_down;
            }
            changed.push((coord, now_down));
        }
    }

    let mut events = Vec::new();
    for (coord, down) in changed {
        events.push(SimEvent::PressurePlateChanged { coord, down });
        events.extend(activate(world, coord));
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::direction::DirectionMask;
    use crate::sim::interactive::Interactive;
    use crate::sim::test_support::WorldBuilder;
    use crate::sim::tile::WireCluster;

    fn horizontal() -> DirectionMask {
        DirectionMask::NONE.with(Direction::Left).with(Direction::Right)
    }

    fn popup_up(world: &World, coord: Coord) -> bool {
        matches!(world.interactive_at(coord).map(|i| i.kind), Some(InteractiveKind::Popup { lift, .. }) if lift.up)
    }

    #[test]
    fn test_lever_toggles_wired_popup_each_activation() {
        let mut world = WorldBuilder::new(6, 3)
            .lever(Coord::new(1, 1))
            .wire(Coord::new(2, 1), horizontal(), false)
            .interactive(Interactive::popup(Coord::new(3, 1), false))
            .build();

        let events = activate(&mut world, Coord::new(1, 1));
        assert!(popup_up(&world, Coord::new(3, 1)));
        assert!(world.tilemap.get(Coord::new(2, 1)).is_some_and(|t| t.flags.wire_on));
        let toggles = events.iter().filter(|e| matches!(e, SimEvent::PopupToggled { .. })).count();
        assert_eq!(toggles, 1);

        activate(&mut world, Coord::new(1, 1));
        assert!(!popup_up(&world, Coord::new(3, 1)));
    }

    #[test]
    fn test_only_triggers_activate() {
        let mut world = WorldBuilder::new(4, 3)
            .interactive(Interactive::popup(Coord::new(1, 1), false))
            .interactive(Interactive::popup(Coord::new(2, 1), false))
            .build();
        assert!(activate(&mut world, Coord::new(1, 1)).is_empty());
        assert!(activate(&mut world, Coord::new(0, 0)).is_empty());
        assert!(!popup_up(&world, Coord::new(2, 1)));
    }

    #[test]
    fn test_wire_must_connect_back() {
        let mut world = WorldBuilder::new(6, 3)
            .lever(Coord::new(1, 1))
            .wire(Coord::new(2, 1), DirectionMask::NONE.with(Direction::Up).with(Direction::Right), false)
            .interactive(Interactive::popup(Coord::new(3, 1), false))
            .build();
        activate(&mut world, Coord::new(1, 1));
        assert!(!popup_up(&world, Coord::new(3, 1)));
    }

    #[test]
    fn test_door_opens_its_partner() {
        let mut world = WorldBuilder::new(8, 3)
            .lever(Coord::new(1, 1))
            .interactive(Interactive::door(Coord::new(2, 1), Direction::Right, false))
            .interactive(Interactive::door(Coord::new(5, 1), Direction::Left, false))
            .build();
        let events = activate(&mut world, Coord::new(1, 1));
        assert!(events.contains(&SimEvent::DoorToggled { coord: Coord::new(2, 1), up: true }));
        assert!(events.contains(&SimEvent::DoorToggled { coord: Coord::new(5, 1), up: true }));
    }

    #[test]
    fn test_wire_cross_passes_straight_through() {
        let vertical = DirectionMask::NONE.with(Direction::Up).with(Direction::Down);
        let mut world = WorldBuilder::new(7, 5)
            .lever(Coord::new(1, 2))
            .wire(Coord::new(2, 2), horizontal(), false)
            .wire(Coord::new(3, 2), vertical, false)
            .wire(Coord::new(3, 3), vertical, false)
            .wire_cross(Coord::new(3, 2), horizontal(), false)
            .wire(Coord::new(4, 2), horizontal(), false)
            .interactive(Interactive::popup(Coord::new(5, 2), false))
            .interactive(Interactive::popup(Coord::new(3, 4), false))
            .build();
        activate(&mut world, Coord::new(1, 2));
        assert!(popup_up(&world, Coord::new(5, 2)));
        assert!(!popup_up(&world, Coord::new(3, 4)));
        assert!(!world.tilemap.get(Coord::new(3, 2)).is_some_and(|t| t.flags.wire_on));
    }

    #[test]
    fn test_cluster_fires_when_all_segments_on() {
        let mut world = WorldBuilder::new(6, 5)
            .lever(Coord::new(1, 2))
            .tile_with(Coord::new(2, 2), |t| {
                t.flags.cluster = Some(WireCluster { facing: Direction::Right, left: None, mid: Some(false), right: None });
            })
            .interactive(Interactive::popup(Coord::new(3, 2), false))
            .build();
        activate(&mut world, Coord::new(1, 2));
        assert!(popup_up(&world, Coord::new(3, 2)));

        let mut world = WorldBuilder::new(6, 5)
            .lever(Coord::new(1, 2))
            .tile_with(Coord::new(2, 2), |t| t.flags.cluster = Some(WireCluster::new(Direction::Right)))
            .interactive(Interactive::popup(Coord::new(3, 2), false))
            .build();
        activate(&mut world, Coord::new(1, 2));
        assert!(!popup_up(&world, Coord::new(3, 2)), "two segments still off");
    }

    #[test]
    fn test_wire_loop_terminates() {
        let mut builder = WorldBuilder::new(6, 6).lever(Coord::new(0, 0));
        for x in 1..5 {
            for y in 1..5 {
                builder = builder.wire(Coord::new(x, y), DirectionMask::ALL, false);
            }
        }
        builder = builder.wire(Coord::new(1, 0), DirectionMask::ALL, false);
        let mut world = builder.build();
        activate(&mut world, Coord::new(0, 0));
    }

    #[test]
    fn test_portal_deferred_while_occupied() {
        let mut world = WorldBuilder::new(6, 3)
            .lever(Coord::new(1, 1))
            .wire(Coord::new(2, 1), horizontal(), false)
            .portal(Coord::new(3, 1), Direction::Up, true)
            .build();
        if let Some(InteractiveKind::Portal { has_block_inside, .. }) = world.interactive_at_mut(Coord::new(3, 1)).map(|i| &mut i.kind) {
            *has_block_inside = true;
        }
        activate(&mut world, Coord::new(1, 1));
        let Some(InteractiveKind::Portal { on, wants_to_turn_off, .. }) = world.interactive_at(Coord::new(3, 1)).map(|i| i.kind) else {
            panic!("portal missing");
        };
        assert!(on);
        assert!(wants_to_turn_off);
    }

    #[test]
    fn test_plate_follows_block_and_player() {
        let mut world = WorldBuilder::new(5, 3)
            .interactive(Interactive::new(Coord::new(1, 1), InteractiveKind::PressurePlate { down: false, iced_under: false }))
            .wire(Coord::new(2, 1), horizontal(), false)
            .interactive(Interactive::popup(Coord::new(3, 1), false))
            .player(Coord::new(1, 1))
            .build();
        let events = update_pressure_plates(&mut world);
        assert!(events.contains(&SimEvent::PressurePlateChanged { coord: Coord::new(1, 1), down: true }));
        assert!(popup_up(&world, Coord::new(3, 1)));

        world.players[0] = crate::sim::player::Player::at(Coord::new(3, 0));
        update_pressure_plates(&mut world);
        assert!(!popup_up(&world, Coord::new(3, 1)));
        assert!(update_pressure_plates(&mut world).is_empty());
    }
}
