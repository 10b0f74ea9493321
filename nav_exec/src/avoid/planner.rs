//! # Avoidance planner
//!
//! The planner is queried once per cycle with the cube position and the current goal, and
//! returns the point the cube should actually steer towards. It has two states:
//!
//! - `Direct`: steer straight at the goal. If the straight path becomes blocked (at the detect
//!   radius) while the cube is near the obstacle, a detour point is chosen beside the obstacle
//!   and the planner switches to `Detour`.
//! - `Detour`: steer at the stored detour point until either the cube gets close to it, or the
//!   straight path to the goal is clear (at the clear radius), then switch back to `Direct`.
//!
//! The detour point is fixed when the detour starts, so repeated queries in the same situation
//! always give the same target and the cube doesn't flip between sides of the obstacle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use nalgebra::{Point2, Vector2};
use serde::Serialize;

// Internal
use super::{is_blocked, AvoidError, Obstacle, Params};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The planner's avoidance state.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub enum AvoidState {
    /// Heading straight for the goal.
    Direct,

    /// Heading for a detour point beside the obstacle.
    Detour {
        /// The detour point, on the waypoint radius of the obstacle.
        target: Point2<f64>,
    },
}

/// Effective target returned by the planner.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct PlannerOutput {
    /// The point to steer towards this cycle.
    pub target: Point2<f64>,

    /// True if the target is a detour point rather than the goal.
    pub avoiding: bool,
}

/// The obstacle with its radii resolved.
#[derive(Debug, Copy, Clone)]
struct Zone {
    centre: Point2<f64>,
    detect_radius_mm: f64,
    waypoint_radius_mm: f64,
    clear_radius_mm: f64,
}

/// Obstacle avoidance state machine.
#[derive(Debug, Clone, Default)]
pub struct AvoidPlanner {
    zone: Option<Zone>,
    proximity_margin_mm: f64,
    detour_reached_mm: f64,
    state: AvoidState,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for AvoidState {
    fn default() -> Self {
        AvoidState::Direct
    }
}

impl AvoidPlanner {
    /// Create a new planner for the given obstacle.
    ///
    /// With no obstacle the planner always passes the goal straight through.
    pub fn new(obstacle: Option<Obstacle>, params: &Params) -> Result<Self, AvoidError> {
        params.validate()?;

        let zone = match obstacle {
            Some(o) => {
                o.validate()?;

                let zone = Zone {
                    centre: Point2::new(o.x_mm as f64, o.y_mm as f64),
                    detect_radius_mm: o.radius_mm + params.detect_margin_mm,
                    waypoint_radius_mm: o.radius_mm + params.waypoint_margin_mm,
                    clear_radius_mm: o.radius_mm + params.clear_margin_mm,
                };

                if zone.clear_radius_mm < zone.detect_radius_mm {
                    warn!(
                        "Avoidance clear radius ({} mm) is inside the detect radius ({} mm), \
                        detours may retrigger as soon as they clear",
                        zone.clear_radius_mm,
                        zone.detect_radius_mm
                    );
                }

                Some(zone)
            }
            None => None,
        };

        Ok(Self {
            zone,
            proximity_margin_mm: params.proximity_margin_mm,
            detour_reached_mm: params.detour_reached_mm,
            state: AvoidState::Direct,
        })
    }

    /// Get the current avoidance state.
    pub fn state(&self) -> AvoidState {
        self.state
    }

    /// Return to the `Direct` state, forgetting any detour.
    pub fn reset(&mut self) {
        self.state = AvoidState::Direct;
    }

    /// Get the point to steer towards this cycle.
    pub fn query(&mut self, curr: &Point2<f64>, goal: &Point2<f64>) -> PlannerOutput {
        let zone = match self.zone {
            Some(z) => z,
            None => return PlannerOutput { target: *goal, avoiding: false },
        };

        match self.state {
            AvoidState::Direct => {
                let blocked = is_blocked(curr, goal, &zone.centre, zone.detect_radius_mm);
                let dist_to_obs = nalgebra::distance(curr, &zone.centre);

                if blocked && dist_to_obs < zone.detect_radius_mm + self.proximity_margin_mm {
                    let target = zone.detour_point(curr, goal);

                    info!(
                        "Path to ({:.0}, {:.0}) blocked, detouring via ({:.0}, {:.0})",
                        goal.x, goal.y, target.x, target.y
                    );

                    self.state = AvoidState::Detour { target };

                    PlannerOutput { target, avoiding: true }
                }
                else {
                    PlannerOutput { target: *goal, avoiding: false }
                }
            }
            AvoidState::Detour { target } => {
                let dist_to_detour = nalgebra::distance(curr, &target);
                let path_clear = !is_blocked(curr, goal, &zone.centre, zone.clear_radius_mm);

                if dist_to_detour < self.detour_reached_mm || path_clear {
                    info!(
                        "Detour complete ({}), heading for ({:.0}, {:.0})",
                        if path_clear { "path clear" } else { "detour point reached" },
                        goal.x,
                        goal.y
                    );

                    self.state = AvoidState::Direct;

                    PlannerOutput { target: *goal, avoiding: false }
                }
                else {
                    PlannerOutput { target, avoiding: true }
                }
            }
        }
    }
}

impl Zone {
    /// Choose the detour point for a path from `curr` to `goal`.
    ///
    /// The two candidates sit on the waypoint radius, either side of the line from the obstacle
    /// centre to the goal. The one nearest the cube is chosen, ties going to the right-hand one.
    fn detour_point(&self, curr: &Point2<f64>, goal: &Point2<f64>) -> Point2<f64> {
        let v = goal - self.centre;
        let mut v_len = v.norm();
        if v_len == 0.0 {
            v_len = 1.0;
        }
        let u = v / v_len;

        let perp = Vector2::new(-u.y, u.x) * self.waypoint_radius_mm;

        let left = self.centre + perp;
        let right = self.centre - perp;

        if (left - curr).norm_squared() < (right - curr).norm_squared() {
            left
        }
        else {
            right
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const EPS: f64 = 1e-9;

    fn planner() -> AvoidPlanner {
        AvoidPlanner::new(
            Some(Obstacle { x_mm: 250, y_mm: 250, radius_mm: 30.0 }),
            &Params::default(),
        )
        .unwrap()
    }

    fn assert_point_eq(a: &Point2<f64>, b: &Point2<f64>) {
        assert!(nalgebra::distance(a, b) < EPS, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_no_obstacle_passes_goal() {
        let mut p = AvoidPlanner::new(None, &Params::default()).unwrap();
        let goal = Point2::new(350.0, 350.0);

        let out = p.query(&Point2::new(100.0, 100.0), &goal);

        assert_eq!(out, PlannerOutput { target: goal, avoiding: false });
        assert_eq!(p.state(), AvoidState::Direct);
    }

    #[test]
    fn test_far_from_obstacle_stays_direct() {
        let mut p = planner();
        let goal = Point2::new(400.0, 250.0);

        // Blocked, but 150 mm from the obstacle centre which is outside detect + proximity
        let out = p.query(&Point2::new(100.0, 250.0), &goal);

        assert!(!out.avoiding);
        assert_eq!(p.state(), AvoidState::Direct);
    }

    #[test]
    fn test_unblocked_stays_direct() {
        let mut p = planner();
        let goal = Point2::new(400.0, 340.0);

        let out = p.query(&Point2::new(180.0, 340.0), &goal);

        assert_eq!(out, PlannerOutput { target: goal, avoiding: false });
    }

    #[test]
    fn test_trigger_chooses_nearest_side() {
        let goal = Point2::new(400.0, 250.0);

        // Slightly above the centre line, so the candidate at +Y is nearer
        let mut p = planner();
        let out = p.query(&Point2::new(120.0, 260.0), &goal);
        assert!(out.avoiding);
        assert_point_eq(&out.target, &Point2::new(250.0, 325.0));

        // Slightly below
        let mut p = planner();
        let out = p.query(&Point2::new(120.0, 240.0), &goal);
        assert!(out.avoiding);
        assert_point_eq(&out.target, &Point2::new(250.0, 175.0));

        // Exactly on the line it's a tie
        let mut p = planner();
        let out = p.query(&Point2::new(120.0, 250.0), &goal);
        assert!(out.avoiding);
        assert_point_eq(&out.target, &Point2::new(250.0, 175.0));
    }

    #[test]
    fn test_detour_is_stable() {
        let mut p = planner();
        let curr = Point2::new(120.0, 260.0);
        let goal = Point2::new(400.0, 250.0);

        let first = p.query(&curr, &goal);
        assert!(first.avoiding);

        for _ in 0..50 {
            assert_eq!(p.query(&curr, &goal), first);
        }

        assert_eq!(p.state(), AvoidState::Detour { target: first.target });
    }

    #[test]
    fn test_release_on_reaching_detour_point() {
        let mut p = planner();
        let goal = Point2::new(400.0, 250.0);

        p.query(&Point2::new(120.0, 260.0), &goal);

        let out = p.query(&Point2::new(245.0, 320.0), &goal);

        assert_eq!(out, PlannerOutput { target: goal, avoiding: false });
        assert_eq!(p.state(), AvoidState::Direct);
    }

    #[test]
    fn test_release_on_clear_path() {
        let mut p = planner();
        let goal = Point2::new(400.0, 250.0);

        p.query(&Point2::new(120.0, 260.0), &goal);

        // Still over 50 mm from the detour point, but the path to the goal passes about 100 mm
        // from the obstacle centre
        let curr = Point2::new(300.0, 340.0);
        assert!(nalgebra::distance(&curr, &Point2::new(250.0, 325.0)) > 30.0);

        let out = p.query(&curr, &goal);

        assert_eq!(out, PlannerOutput { target: goal, avoiding: false });
    }

    #[test]
    fn test_retrigger_after_clear() {
        let mut p = planner();
        let goal = Point2::new(400.0, 250.0);
        let curr = Point2::new(120.0, 260.0);

        let first = p.query(&curr, &goal);
        p.query(&Point2::new(300.0, 340.0), &goal);
        assert_eq!(p.state(), AvoidState::Direct);

        let again = p.query(&curr, &goal);
        assert_eq!(again, first);
    }

    #[test]
    fn test_reset() {
        let mut p = planner();
        let goal = Point2::new(400.0, 250.0);

        p.query(&Point2::new(120.0, 260.0), &goal);
        assert!(matches!(p.state(), AvoidState::Detour { .. }));

        p.reset();
        assert_eq!(p.state(), AvoidState::Direct);
    }

    #[test]
    fn test_invalid_params() {
        let params = Params { clear_margin_mm: 0.0, ..Default::default() };
        assert!(matches!(
            AvoidPlanner::new(None, &params),
            Err(AvoidError::InvalidMargin("clear_margin_mm", _))
        ));

        let obstacle = Obstacle { x_mm: 0, y_mm: 0, radius_mm: -1.0 };
        assert!(matches!(
            AvoidPlanner::new(Some(obstacle), &Params::default()),
            Err(AvoidError::InvalidObstacleRadius(_))
        ));
    }
}
