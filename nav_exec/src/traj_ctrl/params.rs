//! Parameters structure for TrajCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use comms_if::eqpt::motor::MAX_ABS_WHEEL_DEM;
use crate::params::ParamsError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Trajectory control.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Params {

    // ---- DISTANCE CONTROLLER ----

    /// Proportional gain on the distance to the target.
    pub dist_k_p: f64,

    /// Integral gain on the distance to the target.
    pub dist_k_i: f64,

    /// Derivative gain on the distance to the target.
    pub dist_k_d: f64,

    // ---- HEADING CONTROLLER ----

    /// Proportional gain on the heading error.
    pub head_k_p: f64,

    /// Integral gain on the heading error.
    pub head_k_i: f64,

    /// Derivative gain on the heading error.
    pub head_k_d: f64,

    // ---- LIMITS ----

    /// Maximum absolute forward speed demand.
    ///
    /// Units: wheel demand, (0, 100]
    pub max_speed_dem: f64,

    /// Maximum absolute forward speed demand while avoiding an obstacle. Must not be larger than
    /// `max_speed_dem`.
    ///
    /// Units: wheel demand, (0, 100]
    pub max_speed_dem_avoiding: f64,

    /// Maximum absolute turn demand, added to the left wheel and taken from the right.
    ///
    /// Units: wheel demand, (0, 100]
    pub max_turn_dem: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            dist_k_p: 0.8,
            dist_k_i: 0.0,
            dist_k_d: 0.05,
            head_k_p: 0.5,
            head_k_i: 0.0,
            head_k_d: 0.01,
            max_speed_dem: 70.0,
            max_speed_dem_avoiding: 50.0,
            max_turn_dem: 50.0,
        }
    }
}

impl Params {
    /// Check the limits are within the range the motors accept.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let limits = [
            ("max_speed_dem", self.max_speed_dem),
            ("max_speed_dem_avoiding", self.max_speed_dem_avoiding),
            ("max_turn_dem", self.max_turn_dem),
        ];

        for (name, value) in limits.iter() {
            if !(*value > 0.0 && *value <= MAX_ABS_WHEEL_DEM as f64) {
                return Err(ParamsError::InvalidDemLimit(*name, *value));
            }
        }

        if self.max_speed_dem_avoiding >= self.max_speed_dem {
            return Err(ParamsError::AvoidingSpeedTooHigh {
                avoiding: self.max_speed_dem_avoiding,
                normal: self.max_speed_dem,
            });
        }

        Ok(())
    }
}
