//! Simulation tunables
//!
//! Loaded from JSON next to the map; anything missing keeps its default.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Physics and timing knobs that maps or tools may override
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed simulation timestep in seconds
    pub dt: f32,
    /// Time a normal push takes to bring a block to its push velocity
    pub block_push_time: f32,
    /// Downward acceleration used for friction, world units/s²
    pub gravity: f32,
    /// Static friction coefficient of an iced surface
    pub ice_static_friction_coefficient: f32,
    /// Momentum (mass * units/s) a block needs to squish a player instead of stopping
    pub squish_momentum_threshold: f32,
    /// Player collision radius in world units
    pub player_radius: f32,
    /// Player walking speed in world units/s
    pub player_speed: f32,
    /// How long a player leans on a block before it moves
    pub player_push_delay: f32,
    /// Undo frames kept before the oldest is dropped
    pub undo_history_frames: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            block_push_time: 0.25,
            gravity: 9.8,
            ice_static_friction_coefficient: 0.1,
            squish_momentum_threshold: 100.0,
            player_radius: crate::consts::PLAYER_RADIUS,
            player_speed: 0.25,
            player_push_delay: 0.15,
            undo_history_frames: 256,
        }
    }
}

impl SimConfig {
    /// Parse a config from JSON text
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a config file, falling back to defaults when it is missing or malformed
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded sim config from {}", path.display());
                    config
                }
                Err(err) => {
                    log::warn!("Ignoring malformed sim config {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(err) => {
                log::info!("Using default sim config ({}: {err})", path.display());
                Self::default()
            }
        }
    }

    /// Static friction force an iced surface applies to `mass`
    pub fn ice_static_friction_force(&self, mass: f32) -> f32 {
        mass * self.gravity * self.ice_static_friction_coefficient
    }
}
