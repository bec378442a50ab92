//! Gameplay events returned from simulation operations
//!
//! Operations hand back what happened instead of writing to shared state;
//! the caller decides whether to log, count or drop them.

use serde::{Deserialize, Serialize};

use super::coord::Coord;
use super::direction::Direction;

/// One link of an elastic momentum transfer between two masses
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElasticCollisionEvent {
    pub pusher_mass: i32,
    pub pusher_initial_velocity: f32,
    pub pusher_final_velocity: f32,
    pub pushee_index: usize,
    pub pushee_mass: i32,
    pub pushee_initial_velocity: f32,
    pub pushee_final_velocity: f32,
    /// Direction the pushee is pushed
    pub direction: Direction,
}

impl ElasticCollisionEvent {
    /// The pusher bounced back instead of stopping or following
    pub fn transferred_momentum_back(&self) -> bool {
        self.pusher_final_velocity * self.pusher_initial_velocity < 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    BlockPushed { block: usize, direction: Direction },
    ElasticCollision(ElasticCollisionEvent),
    PlayerStopsCoastingBlock { block: usize },
    BlockStopped { block: usize, direction: Direction },
    BlockSquishesPlayer { block: usize, player: usize },
    BlockFallsInPit { block: usize, coord: Coord },
    BlockTeleported { block: usize, from: Coord, to: Coord },
    PlayerTeleported { player: usize, from: Coord, to: Coord },
    Activated { coord: Coord },
    PopupToggled { coord: Coord, up: bool },
    DoorToggled { coord: Coord, up: bool },
    PortalToggled { coord: Coord, on: bool },
    PressurePlateChanged { coord: Coord, down: bool },
    DetectorChanged { coord: Coord, on: bool },
    IceSpread { coord: Coord },
    IceMelted { coord: Coord },
    BowPickedUp { player: usize, coord: Coord },
    ArrowFired { player: usize, coord: Coord },
    ArrowStuck { coord: Coord },
    ArrowBroke { coord: Coord },
}

impl SimEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SimEvent::BlockPushed { .. } => "BLOCK_PUSHED",
            SimEvent::ElasticCollision(_) => "BLOCK_MOMENTUM_COLLISION",
            SimEvent::PlayerStopsCoastingBlock { .. } => "PLAYER_STOPS_COASTING_BLOCK",
            SimEvent::BlockStopped { .. } => "BLOCK_STOPPED",
            SimEvent::BlockSquishesPlayer { .. } => "BLOCK_SQUISHES_PLAYER",
            SimEvent::BlockFallsInPit { .. } => "BLOCK_FALLS_IN_PIT",
            SimEvent::BlockTeleported { .. } => "BLOCK_TELEPORTED",
            SimEvent::PlayerTeleported { .. } => "PLAYER_TELEPORTED",
            SimEvent::Activated { .. } => "ACTIVATED",
            SimEvent::PopupToggled { .. } => "POPUP",
            SimEvent::DoorToggled { .. } => "DOOR",
            SimEvent::PortalToggled { .. } => "PORTAL",
            SimEvent::PressurePlateChanged { .. } => "PRESSURE_PLATE",
            SimEvent::DetectorChanged { .. } => "DETECTOR",
            SimEvent::IceSpread { .. } => "SPREAD_ICE",
            SimEvent::IceMelted { .. } => "MELT_ICE",
            SimEvent::BowPickedUp { .. } => "BOW_PICKED_UP",
            SimEvent::ArrowFired { .. } => "ARROW_FIRED",
            SimEvent::ArrowStuck { .. } => "ARROW_STUCK",
            SimEvent::ArrowBroke { .. } => "ARROW_BROKE",
        }
    }
}

/// Count events by name, sorted by name
pub fn tally_events(events: &[SimEvent]) -> Vec<(&'static str, usize)> {
    let mut counts: std::collections::BTreeMap<&'static str, usize> = std::collections::BTreeMap::new();
    for event in events {
        *counts.entry(event.name()).or_default() += 1;
    }
    counts.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_groups_by_name() {
        let events = [
            SimEvent::Activated { coord: Coord::new(0, 0) },
            SimEvent::BlockPushed { block: 1, direction: Direction::Up },
            SimEvent::Activated { coord: Coord::new(1, 0) },
        ];
        assert_eq!(tally_events(&events), vec![("ACTIVATED", 2), ("BLOCK_PUSHED", 1)]);
    }

    #[test]
    fn test_bounce_back_detection() {
        let mut event = ElasticCollisionEvent {
            pusher_mass: 10,
            pusher_initial_velocity: 5.0,
            pusher_final_velocity: -4.0,
            pushee_index: 0,
            pushee_mass: 256,
            pushee_initial_velocity: 0.0,
            pushee_final_velocity: 0.4,
            direction: Direction::Right,
        };
        assert!(event.transferred_momentum_back());
        event.pusher_final_velocity = 0.0;
        assert!(!event.transferred_momentum_back());
    }
}
