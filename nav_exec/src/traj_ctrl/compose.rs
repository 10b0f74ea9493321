//! Motion command composition
//!
//! Turns the cube pose and the current target into differential wheel demands. Forward speed
//! comes from the distance controller and turn from the heading controller, and the turn is
//! added to the left wheel and taken off the right.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Point2;
use serde::Serialize;
use std::time::Instant;

// Internal
use super::{NavControllers, Params};
use crate::loc::Pose;
use comms_if::eqpt::motor::MotorDems;
use util::maths::angle_diff_deg;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Demands and intermediate quantities from one composition.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct ComposeOutput {
    pub dems: MotorDems,

    /// Units: millimeters
    pub distance_mm: f64,

    /// Bearing from the cube to the target.
    ///
    /// Units: degrees, in the range (-180, 180]
    pub bearing_deg: f64,

    /// Units: degrees, in the range (-180, 180]
    pub heading_error_deg: f64,

    /// Clamped output of the distance controller.
    pub speed_dem: f64,

    /// Clamped output of the heading controller.
    pub turn_dem: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the wheel demands to drive from `pose` towards `target`.
///
/// While `avoiding` the forward speed is limited to `max_speed_dem_avoiding` rather than
/// `max_speed_dem`.
pub fn compose(
    pose: &Pose,
    target: &Point2<f64>,
    avoiding: bool,
    controllers: &mut NavControllers,
    params: &Params,
    now: Instant
) -> ComposeOutput {
    let delta = target - pose.position();

    let distance_mm = delta.norm();
    let bearing_deg = delta.y.atan2(delta.x).to_degrees();
    let heading_error_deg = angle_diff_deg(bearing_deg, pose.heading_deg as f64);

    let speed_out = controllers.dist.update(distance_mm, now);
    let turn_out = controllers.head.update(heading_error_deg, now);

    let max_speed = if avoiding {
        params.max_speed_dem_avoiding
    }
    else {
        params.max_speed_dem
    };

    let speed_dem = speed_out.max(-max_speed).min(max_speed);
    let turn_dem = turn_out.max(-params.max_turn_dem).min(params.max_turn_dem);

    // `as` truncates towards zero and saturates at the i32 limits
    let dems = MotorDems::saturated(
        (speed_dem + turn_dem) as i32,
        (speed_dem - turn_dem) as i32
    );

    ComposeOutput {
        dems,
        distance_mm,
        bearing_deg,
        heading_error_deg,
        speed_dem,
        turn_dem,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn p_only(dist_k_p: f64, head_k_p: f64) -> Params {
        Params {
            dist_k_p,
            dist_k_i: 0.0,
            dist_k_d: 0.0,
            head_k_p,
            head_k_i: 0.0,
            head_k_d: 0.0,
            ..Default::default()
        }
    }

    fn run(pose: Pose, target: Point2<f64>, avoiding: bool, params: &Params) -> ComposeOutput {
        let mut ctrls = NavControllers::new(params);
        compose(&pose, &target, avoiding, &mut ctrls, params, Instant::now())
    }

    #[test]
    fn test_straight_ahead_capped_at_max_speed() {
        let params = p_only(1.0, 1.0);
        let out = run(Pose::default(), Point2::new(100.0, 0.0), false, &params);

        assert_eq!(out.distance_mm, 100.0);
        assert_eq!(out.bearing_deg, 0.0);
        assert_eq!(out.heading_error_deg, 0.0);
        assert_eq!(out.dems, MotorDems { left: 70, right: 70 });
    }

    #[test]
    fn test_avoiding_speed_cap() {
        let params = p_only(1.0, 1.0);
        let out = run(Pose::default(), Point2::new(100.0, 0.0), true, &params);

        assert_eq!(out.dems, MotorDems { left: 50, right: 50 });
    }

    #[test]
    fn test_turn_towards_target() {
        let params = p_only(1.0, 0.5);

        // Target directly behind, a half turn gives +180 so the cube turns towards +heading
        let pose = Pose { x_mm: 100, y_mm: 100, heading_deg: 0 };
        let out = run(pose, Point2::new(0.0, 100.0), false, &params);

        assert!((out.heading_error_deg - 180.0).abs() < 1e-9);
        assert_eq!(out.turn_dem, 50.0);
        assert_eq!(out.dems, MotorDems { left: 100, right: 20 });

        // Target to the -heading side
        let pose = Pose { x_mm: 0, y_mm: 0, heading_deg: 90 };
        let out = run(pose, Point2::new(10.0, 0.0), false, &params);

        assert_eq!(out.heading_error_deg, -90.0);
        assert_eq!(out.dems, MotorDems { left: -35, right: 55 });
    }

    #[test]
    fn test_huge_gains_saturate() {
        let params = Params {
            max_speed_dem: 100.0,
            max_speed_dem_avoiding: 90.0,
            max_turn_dem: 100.0,
            ..p_only(1000.0, 1000.0)
        };

        let pose = Pose { x_mm: 0, y_mm: 0, heading_deg: 90 };
        let out = run(pose, Point2::new(500.0, 10.0), false, &params);

        assert_eq!(out.dems, MotorDems { left: 0, right: 100 });
        assert!(out.dems.validate().is_ok());

        let pose = Pose { x_mm: 0, y_mm: 0, heading_deg: 270 };
        let out = run(pose, Point2::new(500.0, 10.0), false, &params);

        assert_eq!(out.dems, MotorDems { left: 100, right: 0 });
    }

    #[test]
    fn test_truncates_towards_zero() {
        let params = p_only(-0.012, 1.0);
        let out = run(Pose::default(), Point2::new(100.0, 0.0), false, &params);

        assert!((out.speed_dem + 1.2).abs() < 1e-9);
        assert_eq!(out.dems, MotorDems { left: -1, right: -1 });
    }

    #[test]
    fn test_at_target() {
        let params = p_only(1.0, 1.0);
        let pose = Pose { x_mm: 10, y_mm: 20, heading_deg: 45 };
        let out = run(pose, Point2::new(10.0, 20.0), false, &params);

        // atan2(0, 0) is 0, so the cube just turns towards heading 0
        assert_eq!(out.distance_mm, 0.0);
        assert_eq!(out.heading_error_deg, -45.0);
        assert_eq!(out.dems, MotorDems { left: -45, right: 45 });
    }
}
