//! Collision detection and response against axis aligned rectangles
//!
//! Players are circles, tiles/blocks/interactives are rectangles. Every
//! response only ever moves the mover along one axis per contact, so a
//! player walking diagonally into a wall keeps sliding along it.

use glam::Vec2;

use super::coord::{Coord, Rect};
use super::direction::Direction;
use super::position::Position;
use crate::consts::PIXEL_SIZE;

/// Gap below which a circle resting on an edge counts as touching, not overlapping
const TOUCH_EPSILON: f32 = PIXEL_SIZE * 0.01;

/// Result of a collision check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Proposed displacement after clipping
    pub delta: Vec2,
    /// Surface normal at the contact, pointing toward the mover
    pub normal: Vec2,
    /// How far the unclipped move would have penetrated
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss(delta: Vec2) -> Self {
        Self {
            hit: false,
            delta,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }

    /// Side of the obstacle the mover hit, if any
    pub fn hit_side(&self) -> Option<Direction> {
        if !self.hit {
            return None;
        }
        if self.normal.x < 0.0 {
            Some(Direction::Left)
        } else if self.normal.x > 0.0 {
            Some(Direction::Right)
        } else if self.normal.y < 0.0 {
            Some(Direction::Down)
        } else if self.normal.y > 0.0 {
            Some(Direction::Up)
        } else {
            None
        }
    }
}

/// Pixel rectangle converted to world units, `max` on the far edge of the last pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitRect {
    pub min: Vec2,
    pub max: Vec2,
}

impl UnitRect {
    pub fn from_pixels(rect: &Rect) -> Self {
        Self {
            min: Vec2::new(rect.left as f32, rect.bottom as f32) * PIXEL_SIZE,
            max: Vec2::new((rect.right + 1) as f32, (rect.top + 1) as f32) * PIXEL_SIZE,
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }
}

/// Whether a circle at `center` overlaps the rectangle
pub fn circle_overlaps_rect(center: Vec2, radius: f32, rect: &UnitRect) -> bool {
    center.distance_squared(rect.closest_point(center)) < radius * radius
}

/// Collide a moving circle with a rectangle, pushing it out along a single axis
///
/// When the circle ends up inside the rectangle it leaves through the side
/// it penetrates least. On a corner it leaves along the axis it is already
/// furthest out on.
pub fn position_collide_with_rect(pos: Position, rect: &Rect, radius: f32, delta: Vec2) -> CollisionResult {
    let unit = UnitRect::from_pixels(rect);
    let center = pos.to_vec() + delta;

    // quick reject when nowhere near
    let reach = unit.half_extents() + Vec2::splat(radius);
    let apart = (center - unit.center()).abs();
    if apart.x >= reach.x || apart.y >= reach.y {
        return CollisionResult::miss(delta);
    }

    let closest = unit.closest_point(center);
    let offset = center - closest;
    let dist = offset.length();

    if dist >= radius {
        return CollisionResult::miss(delta);
    }

    if dist <= f32::EPSILON {
        // center inside the rect
        let exits = [
            (center.x - unit.min.x + radius, Vec2::NEG_X),
            (unit.max.x - center.x + radius, Vec2::X),
            (center.y - unit.min.y + radius, Vec2::NEG_Y),
            (unit.max.y - center.y + radius, Vec2::Y),
        ];
        let (depth, normal) = exits
            .into_iter()
            .fold((f32::MAX, Vec2::ZERO), |best, e| if e.0 < best.0 { e } else { best });
        return CollisionResult {
            hit: true,
            delta: delta + normal * depth,
            normal,
            penetration: depth,
        };
    }

    let on_vertical_face = closest.y > unit.min.y && closest.y < unit.max.y;
    let on_horizontal_face = closest.x > unit.min.x && closest.x < unit.max.x;

    let (normal, push) = if on_vertical_face || (!on_horizontal_face && offset.x.abs() >= offset.y.abs()) {
        let normal = Vec2::new(offset.x.signum(), 0.0);
        let target = (radius * radius - offset.y * offset.y).max(0.0).sqrt();
        (normal, target - offset.x.abs())
    } else {
        let normal = Vec2::new(0.0, offset.y.signum());
        let target = (radius * radius - offset.x * offset.x).max(0.0).sqrt();
        (normal, target - offset.y.abs())
    };

    CollisionResult {
        hit: true,
        delta: delta + normal * push,
        normal,
        penetration: radius - dist,
    }
}

/// Clip a circle's move against a tile, one axis at a time
///
/// The horizontal component is resolved first, then the vertical component
/// with the clipped horizontal move applied. A component is only ever
/// shortened toward zero, never reversed.
pub fn position_slide_against_rect(pos: Position, coord: Coord, radius: f32, delta: Vec2) -> CollisionResult {
    slide_against_rect(pos, &coord.pixel_rect(), radius, delta)
}

pub fn slide_against_rect(pos: Position, rect: &Rect, radius: f32, delta: Vec2) -> CollisionResult {
    let unit = UnitRect::from_pixels(rect);
    let start = pos.to_vec();
    let mut result = CollisionResult::miss(delta);

    let clipped_x = clip_axis(start, delta.x, 0.0, radius, &unit, true);
    if clipped_x != delta.x {
        result.hit = true;
        result.normal = Vec2::new(-delta.x.signum(), 0.0);
        result.penetration = (delta.x - clipped_x).abs();
        result.delta.x = clipped_x;
    }

    let clipped_y = clip_axis(start, delta.y, result.delta.x, radius, &unit, false);
    if clipped_y != delta.y {
        result.hit = true;
        if result.normal == Vec2::ZERO {
            result.normal = Vec2::new(0.0, -delta.y.signum());
        }
        result.penetration = result.penetration.max((delta.y - clipped_y).abs());
        result.delta.y = clipped_y;
    }

    result
}

/// Largest part of `amount` along one axis that keeps the circle out of `rect`
fn clip_axis(start: Vec2, amount: f32, other_amount: f32, radius: f32, rect: &UnitRect, x_axis: bool) -> f32 {
    if amount == 0.0 {
        return 0.0;
    }

    let (moved, across, min, max, across_min, across_max) = if x_axis {
        (start.x + amount, start.y + other_amount, rect.min.x, rect.max.x, rect.min.y, rect.max.y)
    } else {
        (start.y + amount, start.x + other_amount, rect.min.y, rect.max.y, rect.min.x, rect.max.x)
    };
    let origin = if x_axis { start.x } else { start.y };

    let across_gap = across - across.clamp(across_min, across_max);
    if across_gap.abs() >= radius - TOUCH_EPSILON {
        return amount;
    }
    let reach = (radius * radius - across_gap * across_gap).sqrt();

    if moved + reach <= min + TOUCH_EPSILON || moved - reach >= max - TOUCH_EPSILON {
        return amount;
    }

    let allowed = if amount > 0.0 { min - reach - origin } else { max + reach - origin };
    if amount > 0.0 {
        allowed.clamp(0.0, amount)
    } else {
        allowed.clamp(amount, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{PLAYER_RADIUS, TILE_SIZE};
    use crate::sim::coord::Pixel;

    fn player_at(x: i16, y: i16) -> Position {
        Position::from_pixel(Pixel::new(x, y), 0)
    }

    #[test]
    fn test_slide_keeps_free_axis() {
        // player just left of tile (1, 0), moving right and up
        let pos = player_at(16 - 4, 8);
        let delta = Vec2::new(TILE_SIZE * 0.25, TILE_SIZE * 0.25);
        let result = position_slide_against_rect(pos, Coord::new(1, 0), PLAYER_RADIUS, delta);
        assert!(result.hit);
        assert!(result.delta.x < delta.x);
        assert!(result.delta.x >= 0.0);
        assert_eq!(result.delta.y, delta.y);
        assert_eq!(result.hit_side(), Some(Direction::Left));
    }

    #[test]
    fn test_slide_misses_far_tile() {
        let pos = player_at(8, 8);
        let delta = Vec2::new(PIXEL_SIZE, 0.0);
        let result = position_slide_against_rect(pos, Coord::new(3, 3), PLAYER_RADIUS, delta);
        assert!(!result.hit);
        assert_eq!(result.delta, delta);
    }

    #[test]
    fn test_collide_with_rect_pushes_out_one_axis() {
        let rect = Coord::new(1, 0).pixel_rect();
        let pos = player_at(14, 8);
        let result = position_collide_with_rect(pos, &rect, PLAYER_RADIUS, Vec2::ZERO);
        assert!(result.hit);
        assert!(result.delta.x < 0.0);
        assert_eq!(result.delta.y, 0.0);
        let after = pos.to_vec() + result.delta;
        assert!(!circle_overlaps_rect(after, PLAYER_RADIUS * 0.999, &UnitRect::from_pixels(&rect)));
    }
}
