//! Light propagation and the detectors that react to light and ice
//!
//! A source lights the box of tiles around it by casting symmetric
//! Bresenham rays from its tile to every tile on the box's edge. Light
//! decays with distance and stops at solid tiles, blocks and raised popups.
//! A ray entering an active portal starts a new source at each linked exit.

use std::collections::BTreeSet;

use super::block::Element;
use super::coord::Coord;
use super::electricity::activate;
use super::event::SimEvent;
use super::interactive::InteractiveKind;
use super::portal_exit::find_portal_exits;
use super::world::World;
use crate::consts::{BASE_LIGHT, FIRE_LIGHT, LIGHT_DECAY, LIGHT_DETECTOR_THRESHOLD, POPUP_MAX_LIFT_TICKS};

/// Tiles from `start` to `end` inclusive, stepping one tile at a time
pub fn light_line(start: Coord, end: Coord) -> Vec<Coord> {
    if start.x == end.x {
        let (lo, hi) = (start.y.min(end.y), start.y.max(end.y));
        let mut coords: Vec<Coord> = (lo..=hi).map(|y| Coord::new(start.x, y)).collect();
        if start.y > end.y {
            coords.reverse();
        }
        return coords;
    }

    let dx = end.x as f64 - start.x as f64;
    let dy = end.y as f64 - start.y as f64;
    let derror = (dy / dx).abs();
    let step_x = if start.x < end.x { 1 } else { -1 };
    let step_y = if end.y >= start.y { 1 } else { -1 };

    let mut coords = Vec::new();
    let mut error = 0.0;
    let (mut x, mut y) = (start.x, start.y);
    loop {
        coords.push(Coord::new(x, y));
        if x == end.x {
            break;
        }
        error += derror;
        while error >= 0.5 {
            y += step_y;
            error -= 1.0;
            // steep lines climb through the column before moving on
            if error >= 0.5 {
                coords.push(Coord::new(x, y));
            }
        }
        x += step_x;
    }
    coords
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct LightSource {
    coord: Coord,
    value: u8,
    from_portal: Option<Coord>,
}

/// Light the tiles around `coord` starting at `value`
pub fn illuminate(world: &mut World, coord: Coord, value: u8) {
    let mut pending = vec![LightSource { coord, value, from_portal: None }];
    let mut visited = BTreeSet::new();
    while let Some(source) = pending.pop() {
        if !world.tilemap.in_bounds(source.coord) || !visited.insert(source) {
            continue;
        }
        let radius = (source.value as i16 - BASE_LIGHT as i16) / LIGHT_DECAY as i16 + 1;
        if radius < 0 {
            continue;
        }
        let (min, max) = (
            Coord::new(source.coord.x - radius, source.coord.y - radius),
            Coord::new(source.coord.x + radius, source.coord.y + radius),
        );
        let mut ends = Vec::new();
        for y in min.y + 1..max.y {
            ends.push(Coord::new(min.x, y));
            ends.push(Coord::new(max.x, y));
        }
        for x in min.x + 1..max.x {
            ends.push(Coord::new(x, min.y));
            ends.push(Coord::new(x, max.y));
        }
        for end in ends {
            illuminate_line(world, source, end, &mut pending);
        }
    }
}

fn illuminate_line(world: &mut World, source: LightSource, end: Coord, pending: &mut Vec<LightSource>) {
    let start = source.coord;
    for coord in light_line(start, end) {
        let Some(tile) = world.tilemap.get(coord) else {
            continue;
        };
        let (dx, dy) = ((coord.x - start.x) as f32, (coord.y - start.y) as f32);
        let distance = (dx * dx + dy * dy).sqrt() as u16;
        let value = (source.value as u16).saturating_sub(distance * LIGHT_DECAY as u16) as u8;

        if Some(coord) != source.from_portal && world.interactive_at(coord).is_some_and(|i| i.is_active_portal()) {
            for (_, exit) in find_portal_exits(world, coord).iter() {
                if exit != coord {
                    pending.push(LightSource { coord: exit, value, from_portal: Some(exit) });
                }
            }
        }

        if coord != start && tile.is_solid() {
            break;
        }
        let block_here = coord != start && world.blocks.iter().any(|b| b.coord() == coord);
        if let Some(tile) = world.tilemap.get_mut(coord) {
            tile.light = tile.light.max(value);
        }
        if block_here {
            break;
        }
        let raised_popup = world.interactive_at(coord).is_some_and(|i| {
            matches!(i.kind, InteractiveKind::Popup { lift, .. } if lift.ticks >= POPUP_MAX_LIFT_TICKS / 2)
        });
        if raised_popup {
            break;
        }
    }
}

/// Reset light to ambient and relight from every fire block
pub fn update_lighting(world: &mut World) {
    world.tilemap.reset_light();
    let sources: Vec<Coord> = world
        .blocks
        .iter()
        .filter(|b| b.element == Element::Fire)
        .map(|b| b.coord())
        .collect();
    for coord in sources {
        illuminate(world, coord, FIRE_LIGHT);
    }
}

/// Switch light and ice detectors to match their tiles, activating the ones that change
pub fn update_light_and_ice_detectors(world: &mut World) -> Vec<SimEvent> {
    let mut changed = Vec::new();
    for i in 0..world.interactives.len() {
        let coord = world.interactives[i].coord;
        let (current, wanted) = match world.interactives[i].kind {
            InteractiveKind::LightDetector { on } => {
                let lit = world.tilemap.get(coord).is_some_and(|t| t.light >= LIGHT_DETECTOR_THRESHOLD);
                (on, lit)
            }
            InteractiveKind::IceDetector { on } => {
                let block_iced = world.blocks.iter().any(|b| b.coord() == coord && b.element.is_icy());
                (on, block_iced || world.tilemap.is_iced(coord))
            }
            _ => continue,
        };
        if current != wanted {
            if let InteractiveKind::LightDetector { on } | InteractiveKind::IceDetector { on } = &mut world.interactives[i].kind {
                *on = wanted;
            }
            changed.push((coord, wanted));
        }
    }

    let mut events = Vec::new();
    for (coord, on) in changed {
        events.push(SimEvent::DetectorChanged { coord, on });
        events.extend(activate(world, coord));
    }
    events
}
