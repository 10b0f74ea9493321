//! # Segment-obstacle geometry
//!
//! Decides whether the straight line between two points passes too close to a circular
//! obstacle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Point2;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the shortest distance from point `p` to the segment `a`-`b`.
///
/// `p` is projected onto the line through `a` and `b`, the projection parameter clamped to the
/// segment, and the distance to the clamped point returned. A zero-length segment is treated as
/// the single point `a`.
pub fn min_distance_to_segment(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let ap = p - a;

    let ab_len2 = ab.norm_squared();

    if ab_len2 == 0.0 {
        return ap.norm();
    }

    let t = (ap.dot(&ab) / ab_len2).clamp(0.0, 1.0);

    let nearest = a + ab * t;

    nalgebra::distance(p, &nearest)
}

/// Determine if the straight path from `curr` to `goal` passes within `safety_radius` of the
/// obstacle centre.
pub fn is_blocked(
    curr: &Point2<f64>,
    goal: &Point2<f64>,
    obstacle_centre: &Point2<f64>,
    safety_radius: f64,
) -> bool {
    min_distance_to_segment(obstacle_centre, curr, goal) < safety_radius
}
