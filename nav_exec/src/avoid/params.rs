//! Obstacle avoidance parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::AvoidError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A circular obstacle on the mat.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub struct Obstacle {
    /// Centre of the obstacle along the mat X axis.
    ///
    /// Units: millimeters
    pub x_mm: i32,

    /// Centre of the obstacle along the mat Y axis.
    ///
    /// Units: millimeters
    pub y_mm: i32,

    /// Physical radius of the obstacle.
    ///
    /// Units: millimeters
    pub radius_mm: f64,
}

/// Parameters for obstacle avoidance.
///
/// All margins are added onto the obstacle's physical radius.
#[derive(Debug, Copy, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Params {
    /// Margin of the radius within which a blocked path triggers a detour.
    ///
    /// Units: millimeters
    pub detect_margin_mm: f64,

    /// Margin of the radius on which detour points are placed.
    ///
    /// Units: millimeters
    pub waypoint_margin_mm: f64,

    /// Margin of the radius outside of which the path is considered clear again.
    ///
    /// Units: millimeters
    pub clear_margin_mm: f64,

    /// Extra distance beyond the detect radius inside which the cube must be for a detour to be
    /// triggered. Stops the cube swerving early when the obstacle is still far away.
    ///
    /// Units: millimeters
    pub proximity_margin_mm: f64,

    /// Distance to the detour point below which the detour is complete.
    ///
    /// Units: millimeters
    pub detour_reached_mm: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            detect_margin_mm: 15.0,
            waypoint_margin_mm: 45.0,
            clear_margin_mm: 30.0,
            proximity_margin_mm: 100.0,
            detour_reached_mm: 30.0,
        }
    }
}

impl Params {
    /// Check that all margins are usable.
    pub fn validate(&self) -> Result<(), AvoidError> {
        let margins = [
            ("detect_margin_mm", self.detect_margin_mm),
            ("waypoint_margin_mm", self.waypoint_margin_mm),
            ("clear_margin_mm", self.clear_margin_mm),
            ("proximity_margin_mm", self.proximity_margin_mm),
            ("detour_reached_mm", self.detour_reached_mm),
        ];

        for (name, value) in margins.iter() {
            // Written this way round so NaN is rejected too
            if !(*value > 0.0) {
                return Err(AvoidError::InvalidMargin(*name, *value));
            }
        }

        Ok(())
    }
}

impl Obstacle {
    pub fn validate(&self) -> Result<(), AvoidError> {
        if !(self.radius_mm >= 0.0) {
            return Err(AvoidError::InvalidObstacleRadius(self.radius_mm));
        }

        Ok(())
    }
}
