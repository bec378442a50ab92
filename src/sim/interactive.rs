//! Interactive mechanisms keyed by tile coordinate

use serde::{Deserialize, Serialize};

use super::coord::{Coord, Rect};
use super::direction::{Direction, DirectionMask};
use super::quad_tree::Spatial;
use crate::consts::{DOOR_MAX_HEIGHT, POPUP_MAX_LIFT_TICKS, POPUP_TICK_DELAY};

/// Tick-based vertical lift shared by popups and doors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lift {
    pub ticks: u8,
    pub up: bool,
    #[serde(default)]
    pub timer: f32,
}

impl Lift {
    pub fn new(ticks: u8, up: bool) -> Self {
        Self { ticks, up, timer: 0.0 }
    }

    /// Step the lift one tick toward its target every `tick_delay` seconds
    pub fn update(&mut self, tick_delay: f32, dt: f32, min: u8, max: u8) {
        self.timer += dt;
        while self.timer > tick_delay {
            self.timer -= tick_delay;
            if self.up {
                if self.ticks < max {
                    self.ticks += 1;
                }
            } else if self.ticks > min {
                self.ticks -= 1;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InteractiveKind {
    Lever,
    PressurePlate { down: bool, iced_under: bool },
    LightDetector { on: bool },
    IceDetector { on: bool },
    Popup { lift: Lift, iced: bool },
    Door { lift: Lift, face: Direction },
    Portal {
        face: Direction,
        on: bool,
        #[serde(default)]
        has_block_inside: bool,
        #[serde(default)]
        wants_to_turn_off: bool,
    },
    Pit { id: u8, iced: bool },
    WireCross { mask: DirectionMask, on: bool },
    Stairs { face: Direction },
    Prompt,
    Bow,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interactive {
    pub coord: Coord,
    pub kind: InteractiveKind,
}

impl Spatial for Interactive {
    fn bounds(&self) -> Rect {
        self.coord.as_rect()
    }
}

impl Interactive {
    pub fn new(coord: Coord, kind: InteractiveKind) -> Self {
        Self { coord, kind }
    }

    pub fn popup(coord: Coord, up: bool) -> Self {
        let ticks = if up { POPUP_MAX_LIFT_TICKS } else { 1 };
        Self::new(coord, InteractiveKind::Popup { lift: Lift::new(ticks, up), iced: false })
    }

    pub fn door(coord: Coord, face: Direction, up: bool) -> Self {
        let ticks = if up { DOOR_MAX_HEIGHT } else { 0 };
        Self::new(coord, InteractiveKind::Door { lift: Lift::new(ticks, up), face })
    }

    pub fn portal(coord: Coord, face: Direction, on: bool) -> Self {
        Self::new(
            coord,
            InteractiveKind::Portal {
                face,
                on,
                has_block_inside: false,
                wants_to_turn_off: false,
            },
        )
    }

    /// Blocks players and blocks at every height it reaches
    pub fn is_solid(&self) -> bool {
        match self.kind {
            InteractiveKind::Lever => true,
            InteractiveKind::Popup { lift, .. } => lift.ticks > 1,
            InteractiveKind::Door { lift, .. } => lift.ticks < DOOR_MAX_HEIGHT,
            InteractiveKind::Portal { on, .. } => !on,
            _ => false,
        }
    }

    /// Solid for something standing at height `z`; popups only block below their top
    pub fn is_solid_at_height(&self, z: i8) -> bool {
        match self.kind {
            InteractiveKind::Popup { lift, .. } => lift.ticks > 1 && (lift.ticks as i16 - 1) > z as i16,
            _ => self.is_solid(),
        }
    }

    pub fn is_active_portal(&self) -> bool {
        matches!(self.kind, InteractiveKind::Portal { on: true, .. })
    }

    pub fn portal_face(&self) -> Option<Direction> {
        match self.kind {
            InteractiveKind::Portal { face, .. } => Some(face),
            _ => None,
        }
    }

    /// Only these mechanisms can be triggered directly
    pub fn can_activate(&self) -> bool {
        matches!(
            self.kind,
            InteractiveKind::Lever
                | InteractiveKind::PressurePlate { .. }
                | InteractiveKind::LightDetector { .. }
                | InteractiveKind::IceDetector { .. }
                | InteractiveKind::Portal { .. }
        )
    }

    /// Advance popup and door lifts
    pub fn update(&mut self, dt: f32) {
        match &mut self.kind {
            InteractiveKind::Popup { lift, .. } => lift.update(POPUP_TICK_DELAY, dt, 1, POPUP_MAX_LIFT_TICKS),
            InteractiveKind::Door { lift, .. } => lift.update(POPUP_TICK_DELAY, dt, 0, DOOR_MAX_HEIGHT),
            _ => {}
        }
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            InteractiveKind::Lever => "lever",
            InteractiveKind::PressurePlate { .. } => "pressure plate",
            InteractiveKind::LightDetector { .. } => "light detector",
            InteractiveKind::IceDetector { .. } => "ice detector",
            InteractiveKind::Popup { .. } => "popup",
            InteractiveKind::Door { .. } => "door",
            InteractiveKind::Portal { .. } => "portal",
            InteractiveKind::Pit { .. } => "pit",
            InteractiveKind::WireCross { .. } => "wire cross",
            InteractiveKind::Stairs { .. } => "stairs",
            InteractiveKind::Prompt => "prompt",
            InteractiveKind::Bow => "bow",
        }
    }
}
