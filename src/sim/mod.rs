//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Stable iteration order (by block, interactive and player index)
//! - No rendering or platform dependencies
//! - Operations return the events they cause instead of recording them

pub mod arrow;
pub mod block;
pub mod collision;
pub mod coord;
pub mod direction;
pub mod electricity;
pub mod entangle;
pub mod event;
pub mod ice;
pub mod interactive;
pub mod light;
pub mod momentum;
pub mod motion;
pub mod movement;
pub mod player;
pub mod portal_exit;
pub mod position;
pub mod push;
pub mod quad_tree;
pub mod query;
pub mod tick;
pub mod tile;
pub mod undo;
pub mod world;

#[cfg(test)]
pub mod test_support;

pub use arrow::{Arrow, Stuck, arrow_spawn, update_arrows};
pub use block::{Block, BlockCut, Element};
pub use collision::CollisionResult;
pub use coord::{Coord, Pixel, Rect};
pub use direction::{Direction, DirectionMask};
pub use electricity::{activate, update_pressure_plates};
pub use entangle::{player_push_block, push_entangled_block};
pub use event::{ElasticCollisionEvent, SimEvent, tally_events};
pub use ice::{melt_ice, spread_ice};
pub use interactive::{Interactive, InteractiveKind, Lift};
pub use light::{illuminate, update_light_and_ice_detectors, update_lighting};
pub use momentum::{AllowedToPushResult, TransferMomentum, allowed_to_push};
pub use motion::{Axis, Move, MoveSign, MoveState};
pub use movement::{MovePlayerResult, move_player_through_world, slow_block_toward_gridlock};
pub use player::Player;
pub use portal_exit::{PortalExits, TeleportResult, find_portal_exits, teleport_position_across_portal};
pub use position::Position;
pub use push::{PushOptions, PushPlan, PushResult, block_do_push, block_push, block_would_push};
pub use tick::{StepReport, TickInput, tick};
pub use tile::{Tile, TileFlags, TileMap};
pub use undo::UndoHistory;
pub use world::{MapData, World};
