//! # Trajectory control module
//!
//! Trajectory control drives the cube through a sequence of waypoints. Each cycle it:
//!
//! 1. Advances the waypoint sequence past any waypoints the cube has reached, resetting the
//!    controllers and the avoidance planner at the start of each new leg.
//! 2. Asks the avoidance planner where to steer for the current waypoint.
//! 3. Composes wheel demands from the distance and heading controllers.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod compose;
pub mod controllers;
pub mod params;
pub mod sequencer;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use compose::*;
pub use controllers::*;
pub use params::*;
pub use sequencer::*;
pub use state::*;

use crate::{avoid::AvoidError, params::ParamsError};
use util::archive::ArchiveError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during TrajCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum TrajCtrlError {
    #[error("TrajCtrl has not been initialised")]
    NotInitialised,

    #[error("Invalid parameters: {0}")]
    InvalidParams(#[from] ParamsError),

    #[error("Could not load the waypoint sequence: {0}")]
    SequenceError(#[from] SequencerError),

    #[error("Could not setup obstacle avoidance: {0}")]
    AvoidError(#[from] AvoidError),

    #[error("Could not open the tick archive: {0}")]
    ArchiveError(#[from] ArchiveError),
}
