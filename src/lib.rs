//! Bryte core - block-pushing puzzle simulation
//!
//! Core modules:
//! - `sim`: Deterministic simulation (geometry, pushes, momentum, portals, wires, ice)
//! - `settings`: Data-driven simulation tunables

pub mod settings;
pub mod sim;

pub use settings::SimConfig;

/// Game configuration constants
pub mod consts {
    /// Size of one pixel in world units
    pub const PIXEL_SIZE: f32 = 0.003_676_47;
    /// Tile edge in world units (16 pixels of a 272 pixel room)
    pub const TILE_SIZE: f32 = 16.0 / 272.0;
    pub const HALF_TILE_SIZE: f32 = TILE_SIZE * 0.5;
    pub const TILE_SIZE_IN_PIXELS: i16 = 16;
    pub const HALF_TILE_SIZE_IN_PIXELS: i16 = 8;
    pub const DOUBLE_TILE_SIZE_IN_PIXELS: i16 = 32;
    /// Widest or tallest map, in tiles, whose pixels plus one tile of slack fit in an `i16`
    pub const MAX_MAP_DIM: i16 = i16::MAX / TILE_SIZE_IN_PIXELS - 1;

    /// Vertical distance between stacked blocks
    pub const HEIGHT_INTERVAL: i8 = 6;

    /// Ambient light level every tile resets to
    pub const BASE_LIGHT: u8 = 128;
    /// Light lost per tile travelled
    pub const LIGHT_DECAY: u8 = 32;
    /// Light level at which a light detector turns on
    pub const LIGHT_DETECTOR_THRESHOLD: u8 = 176;
    /// Light emitted by a burning block
    pub const FIRE_LIGHT: u8 = 255;

    /// Popups rise one tick per delay until fully raised
    pub const POPUP_TICK_DELAY: f32 = 0.1;
    pub const POPUP_MAX_LIFT_TICKS: u8 = HEIGHT_INTERVAL as u8 + 1;
    pub const DOOR_MAX_HEIGHT: u8 = 7;

    /// Entries per quad tree node before it subdivides
    pub const QUAD_TREE_NODE_ENTRY_COUNT: usize = 4;

    /// Highest source height whose ice still reaches the floor
    pub const MELT_SPREAD_HEIGHT: i8 = HEIGHT_INTERVAL;

    /// Mass a standing player adds to the block below
    pub const PLAYER_MASS: i32 = 128;
    pub const PLAYER_RADIUS: f32 = 3.5 / 272.0;

    /// How long a bow has to be drawn before letting go fires an arrow
    pub const PLAYER_BOW_DRAW_DELAY: f32 = 0.3;
    /// Arrows alive at once
    pub const ARROW_ARRAY_MAX: usize = 32;
    pub const ARROW_SPEED: f32 = 1.25;
    /// Height above the shooter's feet an arrow leaves the bow at, halfway up a block
    pub const ARROW_SHOOT_HEIGHT: i8 = HEIGHT_INTERVAL / 2;
    /// Seconds of flight per height step an arrow sinks
    pub const ARROW_FALL_DELAY: f32 = 6.0;
    /// Seconds a stuck arrow lasts
    pub const ARROW_DISINTEGRATE_DELAY: f32 = 12.0;

    /// Slack used when deciding whether two edges touch
    pub const DISTANCE_EPSILON: f32 = 0.000_01;
}

/// Convert a pixel count to world units
#[inline]
pub fn pixels_to_units(pixels: i16) -> f32 {
    pixels as f32 * consts::PIXEL_SIZE
}

/// Convert world units to whole pixels, rounding toward negative infinity
#[inline]
pub fn units_to_pixels(units: f32) -> i16 {
    (units / consts::PIXEL_SIZE).floor() as i16
}

/// Center pixel of the grid cell of width `grid_width` containing `pixel`
#[inline]
pub fn closest_grid_center_pixel(grid_width: i16, pixel: i16) -> i16 {
    pixel.div_euclid(grid_width) * grid_width + grid_width / 2
}
