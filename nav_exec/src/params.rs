//! # Navigation Executable Parameters
//!
//! This module provides the parameters for the navigation executable, normally loaded from
//! `params/nav.toml`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    avoid::{self, AvoidError, Obstacle},
    traj_ctrl::{self, Waypoint},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavParams {
    /// Target period of one control cycle.
    ///
    /// Units: seconds
    #[serde(default = "default_period_s")]
    pub period_s: f64,

    /// How long to wait for the first pose before giving up. If not set the loop waits until a
    /// pose arrives or it is cancelled.
    ///
    /// Units: seconds
    #[serde(default)]
    pub first_pose_timeout_s: Option<f64>,

    #[serde(default)]
    pub traj_ctrl: traj_ctrl::Params,

    /// The goals to drive to, in order.
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,

    #[serde(default)]
    pub avoid: avoid::Params,

    /// The obstacle to avoid, if there is one.
    #[serde(default)]
    pub obstacle: Option<Obstacle>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("The cycle period must be positive and finite, found {0} s")]
    InvalidPeriod(f64),

    #[error("The first pose timeout must be positive and finite, found {0} s")]
    InvalidTimeout(f64),

    #[error("Demand limit `{0}` must be in (0, 100], found {1}")]
    InvalidDemLimit(&'static str, f64),

    #[error(
        "The avoiding speed limit ({avoiding}) must be lower than the normal speed limit \
        ({normal})"
    )]
    AvoidingSpeedTooHigh { avoiding: f64, normal: f64 },

    #[error("No waypoints were given")]
    NoWaypoints,

    #[error("Waypoint {0} has a non-positive reach radius")]
    InvalidReachRadius(usize),

    #[error("Invalid avoidance parameters: {0}")]
    InvalidAvoid(#[from] AvoidError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for NavParams {
    fn default() -> Self {
        Self {
            period_s: default_period_s(),
            first_pose_timeout_s: None,
            traj_ctrl: traj_ctrl::Params::default(),
            waypoints: Vec::new(),
            avoid: avoid::Params::default(),
            obstacle: None,
        }
    }
}

impl NavParams {
    /// Check the parameters are usable before starting the loop.
    pub fn validate(&self) -> Result<(), ParamsError> {
        self.period()?;
        self.first_pose_timeout()?;

        self.traj_ctrl.validate()?;

        if self.waypoints.is_empty() {
            return Err(ParamsError::NoWaypoints);
        }

        if let Some(i) = self.waypoints.iter().position(|w| !(w.reach_radius_mm > 0.0)) {
            return Err(ParamsError::InvalidReachRadius(i));
        }

        self.avoid.validate()?;

        if let Some(ref o) = self.obstacle {
            o.validate()?;
        }

        Ok(())
    }

    /// The cycle period as a duration.
    pub fn period(&self) -> Result<Duration, ParamsError> {
        positive_duration(self.period_s).ok_or(ParamsError::InvalidPeriod(self.period_s))
    }

    /// The first pose timeout as a duration, if one is set.
    pub fn first_pose_timeout(&self) -> Result<Option<Duration>, ParamsError> {
        match self.first_pose_timeout_s {
            Some(t) => positive_duration(t).map(Some).ok_or(ParamsError::InvalidTimeout(t)),
            None => Ok(None),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_period_s() -> f64 {
    0.05
}

/// Convert seconds to a non-zero duration, `None` if the value is not positive or too large to
/// represent.
fn positive_duration(secs: f64) -> Option<Duration> {
    if !(secs > 0.0) {
        return None;
    }

    Duration::try_from_secs_f64(secs).ok().filter(|d| !d.is_zero())
}
