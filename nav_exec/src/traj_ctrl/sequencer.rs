//! Waypoint sequencing

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::info;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

// Internal
use super::NavControllers;
use crate::loc::Pose;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A goal point for the cube.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub struct Waypoint {
    /// Units: millimeters
    pub x_mm: i32,

    /// Units: millimeters
    pub y_mm: i32,

    /// The waypoint is reached once the cube is closer than this.
    ///
    /// Units: millimeters
    pub reach_radius_mm: f64,
}

/// Steps through an ordered list of waypoints.
#[derive(Debug, Clone, Default)]
pub struct WaypointSequencer {
    waypoints: Vec<Waypoint>,
    index: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors building a sequence.
#[derive(Debug, thiserror::Error)]
pub enum SequencerError {
    #[error("Attempted to load an empty waypoint sequence")]
    Empty,

    #[error("Waypoint {0} has a non-positive reach radius")]
    InvalidReachRadius(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Waypoint {
    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x_mm as f64, self.y_mm as f64)
    }
}

impl WaypointSequencer {
    /// Load a new sequence, starting at the first waypoint.
    pub fn new(waypoints: Vec<Waypoint>) -> Result<Self, SequencerError> {
        if waypoints.is_empty() {
            return Err(SequencerError::Empty);
        }

        if let Some(i) = waypoints.iter().position(|w| !(w.reach_radius_mm > 0.0)) {
            return Err(SequencerError::InvalidReachRadius(i));
        }

        Ok(Self { waypoints, index: 0 })
    }

    /// The waypoint currently being driven to, or `None` once the sequence is complete.
    pub fn current(&self) -> Option<&Waypoint> {
        self.waypoints.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_complete(&self) -> bool {
        self.index >= self.waypoints.len()
    }

    /// Move on to the next waypoint if the current one has been reached.
    ///
    /// The controllers are reset on advancing so that no integral or derivative history carries
    /// over into the next leg. Returns true if the sequence advanced.
    pub fn advance_if_reached(&mut self, pose: &Pose, controllers: &mut NavControllers) -> bool {
        let wp = match self.current() {
            Some(w) => *w,
            None => return false,
        };

        if pose.distance_to(&wp.position()) < wp.reach_radius_mm {
            info!(
                "Waypoint {} of {} reached: ({}, {})",
                self.index + 1,
                self.waypoints.len(),
                wp.x_mm,
                wp.y_mm
            );

            self.index += 1;
            controllers.reset();

            true
        }
        else {
            false
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::traj_ctrl::Params;
    use std::time::{Duration, Instant};

    fn wp(x_mm: i32, y_mm: i32, reach_radius_mm: f64) -> Waypoint {
        Waypoint { x_mm, y_mm, reach_radius_mm }
    }

    fn pose(x_mm: i32, y_mm: i32) -> Pose {
        Pose { x_mm, y_mm, heading_deg: 0 }
    }

    #[test]
    fn test_new_rejects_bad_sequences() {
        assert!(matches!(WaypointSequencer::new(vec![]), Err(SequencerError::Empty)));
        assert!(matches!(
            WaypointSequencer::new(vec![wp(0, 0, 10.0), wp(10, 10, 0.0)]),
            Err(SequencerError::InvalidReachRadius(1))
        ));
    }

    #[test]
    fn test_advance_resets_controllers() {
        let mut seq = WaypointSequencer::new(vec![wp(100, 0, 10.0), wp(200, 0, 10.0)]).unwrap();
        let mut ctrls = NavControllers::new(&Params { dist_k_i: 1.0, ..Default::default() });
        let t0 = Instant::now();

        ctrls.dist.update(50.0, t0);
        ctrls.dist.update(50.0, t0 + Duration::from_millis(50));
        assert!(ctrls.dist.integral() > 0.0);

        // Outside the reach radius
        assert!(!seq.advance_if_reached(&pose(85, 0), &mut ctrls));
        assert_eq!(seq.index(), 0);
        assert!(ctrls.dist.integral() > 0.0);

        assert!(seq.advance_if_reached(&pose(95, 0), &mut ctrls));
        assert_eq!(seq.index(), 1);
        assert_eq!(seq.current(), Some(&wp(200, 0, 10.0)));
        assert_eq!(ctrls.dist.integral(), 0.0);
        assert!(!ctrls.dist.is_initialised());
    }

    #[test]
    fn test_reach_radius_is_exclusive() {
        let mut seq = WaypointSequencer::new(vec![wp(100, 0, 10.0)]).unwrap();
        let mut ctrls = NavControllers::default();

        assert!(!seq.advance_if_reached(&pose(90, 0), &mut ctrls));
    }

    #[test]
    fn test_complete() {
        let mut seq = WaypointSequencer::new(vec![wp(0, 0, 5.0), wp(1, 0, 5.0)]).unwrap();
        let mut ctrls = NavControllers::default();

        // Both waypoints already within reach of the cube
        while seq.advance_if_reached(&pose(0, 0), &mut ctrls) {}

        assert!(seq.is_complete());
        assert_eq!(seq.current(), None);
        assert_eq!(seq.index(), 2);
        assert!(!seq.advance_if_reached(&pose(0, 0), &mut ctrls));
    }
}
