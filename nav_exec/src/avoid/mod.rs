//! # Obstacle avoidance module
//!
//! Avoidance works on a single known circular obstacle. Three radii are drawn around the
//! obstacle, each being the obstacle's physical radius plus a margin:
//!
//! - The detect radius: if the straight path to the goal passes within this radius (and the
//!   cube is close enough to the obstacle) a detour is started.
//! - The waypoint radius: detour points are placed this far from the obstacle centre,
//!   perpendicular to the direction from the obstacle to the goal.
//! - The clear radius: once the straight path to the goal stays outside this radius the detour
//!   is abandoned and the cube heads straight for the goal again.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod geometry;
pub mod params;
pub mod planner;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use geometry::*;
pub use params::*;
pub use planner::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors in the avoidance configuration.
#[derive(Debug, thiserror::Error)]
pub enum AvoidError {
    #[error("Avoidance margin `{0}` must be positive, found {1}")]
    InvalidMargin(&'static str, f64),

    #[error("Obstacle radius must not be negative, found {0}")]
    InvalidObstacleRadius(f64),
}
