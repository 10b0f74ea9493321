//! PID controllers for distance and heading control

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;
use std::time::Instant;

// Internal
use super::Params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID feedback controller.
///
/// The controller is uninitialised until the first call to `update`, which only applies the
/// proportional term since there's no previous sample to integrate or differentiate against.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PidController {
    k_p: f64,
    k_i: f64,
    k_d: f64,

    integral: f64,
    prev_error: f64,

    #[serde(skip)]
    prev_time: Option<Instant>,
}

/// The pair of controllers used to drive towards a target.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NavControllers {
    /// Controls forward speed from the distance to the target.
    pub dist: PidController,

    /// Controls turn rate from the heading error to the target.
    pub head: PidController,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new uninitialised controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            ..Default::default()
        }
    }

    /// Calculate the controller output for the given error, sampled at `now`.
    ///
    /// If `now` is not after the previous sample the output is zero and the controller state is
    /// left untouched.
    pub fn update(&mut self, error: f64, now: Instant) -> f64 {
        let prev_time = match self.prev_time {
            Some(t) => t,
            None => {
                self.prev_time = Some(now);
                return self.k_p * error;
            }
        };

        let dt = match now.checked_duration_since(prev_time) {
            Some(d) => d.as_secs_f64(),
            None => return 0.0,
        };

        if dt <= 0.0 {
            return 0.0;
        }

        self.integral += error * dt;
        let derivative = (error - self.prev_error) / dt;

        self.prev_error = error;
        self.prev_time = Some(now);

        self.k_p * error + self.k_i * self.integral + self.k_d * derivative
    }

    /// Return to the uninitialised state, keeping the gains.
    pub fn reset(&mut self) {
        *self = Self::new(self.k_p, self.k_i, self.k_d);
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn prev_error(&self) -> f64 {
        self.prev_error
    }

    /// True once the first sample has been taken.
    pub fn is_initialised(&self) -> bool {
        self.prev_time.is_some()
    }
}

impl NavControllers {
    pub fn new(params: &Params) -> Self {
        Self {
            dist: PidController::new(params.dist_k_p, params.dist_k_i, params.dist_k_d),
            head: PidController::new(params.head_k_p, params.head_k_i, params.head_k_d),
        }
    }

    /// Reset both controllers, used when starting a new leg.
    pub fn reset(&mut self) {
        self.dist.reset();
        self.head.reset();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_first_update_proportional_only() {
        let mut pid = PidController::new(2.0, 10.0, 10.0);
        let t0 = Instant::now();

        assert!(!pid.is_initialised());
        assert!((pid.update(3.0, t0) - 6.0).abs() < EPS);
        assert!(pid.is_initialised());

        // Integral and derivative untouched by the first sample
        assert_eq!(pid.integral(), 0.0);
        assert_eq!(pid.prev_error(), 0.0);
    }

    #[test]
    fn test_update() {
        let mut pid = PidController::new(1.0, 0.5, 0.25);
        let t0 = Instant::now();

        pid.update(4.0, t0);

        // dt = 0.5 s, integral = 2 * 0.5 = 1, derivative = (2 - 0) / 0.5 = 4
        let out = pid.update(2.0, t0 + Duration::from_millis(500));
        assert!((out - (2.0 + 0.5 * 1.0 + 0.25 * 4.0)).abs() < EPS);
        assert!((pid.integral() - 1.0).abs() < EPS);
        assert_eq!(pid.prev_error(), 2.0);

        // dt = 0.5 s, integral = 1 + 1 * 0.5, derivative = (1 - 2) / 0.5
        let out = pid.update(1.0, t0 + Duration::from_secs(1));
        assert!((out - (1.0 + 0.5 * 1.5 + 0.25 * -2.0)).abs() < EPS);
    }

    #[test]
    fn test_proportional_only_ignores_dt() {
        let mut pid = PidController::new(2.0, 0.0, 0.0);
        let t0 = Instant::now();

        let samples = [(0, 5.0), (3, -1.5), (250, 40.0), (251, 0.25), (5000, -90.0)];

        for (ms, error) in samples.iter() {
            let out = pid.update(*error, t0 + Duration::from_millis(*ms));
            assert_eq!(out, 2.0 * error);
        }
    }

    #[test]
    fn test_zero_dt_gives_zero_without_mutation() {
        let mut pid = PidController::new(1.0, 1.0, 1.0);
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(100);

        pid.update(1.0, t0);
        pid.update(2.0, t1);
        let integral = pid.integral();

        // Same instant again
        assert_eq!(pid.update(50.0, t1), 0.0);
        // Going backwards in time
        assert_eq!(pid.update(50.0, t0), 0.0);

        assert_eq!(pid.integral(), integral);
        assert_eq!(pid.prev_error(), 2.0);

        // Next real sample still measures dt from t1
        let t2 = t1 + Duration::from_millis(100);
        pid.update(2.0, t2);
        assert!((pid.integral() - (integral + 0.2)).abs() < EPS);
    }

    #[test]
    fn test_reset() {
        let mut pid = PidController::new(1.0, 1.0, 0.0);
        let t0 = Instant::now();

        pid.update(1.0, t0);
        pid.update(1.0, t0 + Duration::from_secs(1));
        assert!(pid.integral() > 0.0);

        pid.reset();

        assert!(!pid.is_initialised());
        assert_eq!(pid.integral(), 0.0);
        assert_eq!(pid.prev_error(), 0.0);

        // Gains are kept
        assert!((pid.update(3.0, t0) - 3.0).abs() < EPS);
    }

    #[test]
    fn test_nav_controllers_reset() {
        let mut ctrls = NavControllers::new(&Params::default());
        let t0 = Instant::now();

        ctrls.dist.update(100.0, t0);
        ctrls.head.update(10.0, t0);
        ctrls.dist.update(100.0, t0 + Duration::from_millis(50));

        ctrls.reset();

        assert!(!ctrls.dist.is_initialised());
        assert!(!ctrls.head.is_initialised());
        assert_eq!(ctrls.dist.integral(), 0.0);
    }
}
