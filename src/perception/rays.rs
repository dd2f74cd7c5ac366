//! Ray casting primitives
//!
//! Rays are cast against world edges, obstacle circles, and the bodies of
//! agents and food. Nearest hit wins; a small behind-origin epsilon rejects
//! self-intersections.

use serde::{Deserialize, Serialize};

use crate::core::types::Vec2;

/// Hits closer than this along the ray are treated as self-intersections
pub const BEHIND_ORIGIN_EPSILON: f32 = 0.05;

/// What a sensor ray hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RayHitKind {
    None,
    Food,
    SmallerAgent,
    LargerAgent,
    SameSizeAgent,
    ObstacleOrEdge,
}

/// One resolved sensor ray
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RayHit {
    pub kind: RayHitKind,
    /// World-unit distance to the hit; equals the ray range on a miss
    pub distance: f32,
    /// `1 - distance / max_range`, clamped to [0, 1]; 0 on a miss
    pub closeness: f32,
    /// Absolute world angle the ray was cast at
    pub angle: f32,
}

impl RayHit {
    pub fn miss(angle: f32, max_range: f32) -> Self {
        Self {
            kind: RayHitKind::None,
            distance: max_range,
            closeness: 0.0,
            angle,
        }
    }
}

/// Normalized closeness for a hit distance
pub fn closeness(distance: f32, max_range: f32) -> f32 {
    if max_range <= 0.0 {
        return 0.0;
    }
    (1.0 - distance / max_range).clamp(0.0, 1.0)
}

/// Distance along a unit-direction ray to a circle, if it hits in front of
/// the origin
pub fn ray_circle(origin: Vec2, dir: Vec2, center: Vec2, radius: f32) -> Option<f32> {
    if !origin.is_finite() || !center.is_finite() || radius <= 0.0 {
        return None;
    }
    let to_center = center - origin;
    let proj = to_center.dot(&dir);
    let closest_sq = to_center.length_sq() - proj * proj;
    let radius_sq = radius * radius;
    if closest_sq > radius_sq {
        return None;
    }
    let half_chord = (radius_sq - closest_sq).sqrt();
    let t = proj - half_chord;
    if t >= BEHIND_ORIGIN_EPSILON {
        Some(t)
    } else {
        // Origin inside or brushing the circle: take the far intersection if
        // it is still meaningfully in front
        let t_far = proj + half_chord;
        (t_far >= BEHIND_ORIGIN_EPSILON).then_some(t_far)
    }
}

/// Distance along a unit-direction ray to the nearest world edge
///
/// Returns `None` for an origin outside the bounds or a degenerate
/// direction; callers treat that as a missed ray.
pub fn ray_world_edge(origin: Vec2, dir: Vec2, width: f32, height: f32) -> Option<f32> {
    if !origin.is_finite()
        || origin.x < 0.0
        || origin.y < 0.0
        || origin.x > width
        || origin.y > height
    {
        return None;
    }

    let mut best = f32::INFINITY;
    if dir.x > 1e-6 {
        best = best.min((width - origin.x) / dir.x);
    } else if dir.x < -1e-6 {
        best = best.min(-origin.x / dir.x);
    }
    if dir.y > 1e-6 {
        best = best.min((height - origin.y) / dir.y);
    } else if dir.y < -1e-6 {
        best = best.min(-origin.y / dir.y);
    }

    best.is_finite().then_some(best.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_circle_direct_hit() {
        let t = ray_circle(
            Vec2::default(),
            Vec2::new(1.0, 0.0),
            Vec2::new(10.0, 0.0),
            2.0,
        )
        .unwrap();
        assert!((t - 8.0).abs() < 1e-4);
    }

    #[test]
    fn test_ray_circle_miss() {
        assert!(ray_circle(
            Vec2::default(),
            Vec2::new(1.0, 0.0),
            Vec2::new(10.0, 5.0),
            2.0,
        )
        .is_none());
    }

    #[test]
    fn test_ray_circle_behind_origin_rejected() {
        assert!(ray_circle(
            Vec2::default(),
            Vec2::new(1.0, 0.0),
            Vec2::new(-10.0, 0.0),
            2.0,
        )
        .is_none());
    }

    #[test]
    fn test_ray_circle_malformed_origin() {
        assert!(ray_circle(
            Vec2::new(f32::NAN, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(10.0, 0.0),
            2.0,
        )
        .is_none());
    }

    #[test]
    fn test_ray_world_edge_east() {
        let t = ray_world_edge(Vec2::new(90.0, 50.0), Vec2::new(1.0, 0.0), 100.0, 100.0).unwrap();
        assert!((t - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_ray_world_edge_diagonal_takes_nearest() {
        let dir = Vec2::new(1.0, 1.0).normalize();
        let t = ray_world_edge(Vec2::new(95.0, 50.0), dir, 100.0, 100.0).unwrap();
        // X edge at ~7.07 units, y edge much farther
        assert!((t - 5.0 * std::f32::consts::SQRT_2).abs() < 1e-3);
    }

    #[test]
    fn test_ray_world_edge_outside_bounds() {
        assert!(ray_world_edge(Vec2::new(-5.0, 50.0), Vec2::new(1.0, 0.0), 100.0, 100.0).is_none());
    }

    #[test]
    fn test_closeness_clamps() {
        assert_eq!(closeness(0.0, 100.0), 1.0);
        assert_eq!(closeness(100.0, 100.0), 0.0);
        assert_eq!(closeness(500.0, 100.0), 0.0);
    }
}
