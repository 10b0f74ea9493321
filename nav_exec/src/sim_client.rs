//! # Simulation Client
//!
//! The SimCube is a kinematic model of a differential drive cube on a position mat, used for
//! development and testing without a real cube. It provides:
//!
//! - A localisation source (`SimLoc`) which pushes a fix after every simulation step, or a missed
//!   read while the cube is outside the mat bounds.
//! - A motor sink (`SimMotors`) whose latest demands drive the model.
//!
//! The model can be stepped explicitly with `step`, or by a background thread started with
//! `start`, which steps it at `sim_period_s` until the SimCube is dropped.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use comms_if::eqpt::{
    loc::{IdHandler, IdNotification, LocSource, LocSourceError, PoseFix},
    motor::{MotorDems, MotorSink, MotorSinkError},
};
use util::maths::wrap_deg_360;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulated cube, normally loaded from `params/sim.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Units: millimeters
    pub start_x_mm: f64,

    /// Units: millimeters
    pub start_y_mm: f64,

    /// Units: degrees
    pub start_heading_deg: f64,

    /// Wheel ground speed per unit of demand.
    ///
    /// Units: millimeters/second
    pub mm_s_per_dem: f64,

    /// Distance between the wheels.
    ///
    /// Units: millimeters
    pub track_width_mm: f64,

    /// Bounds of the readable mat area. Outside these the reader reports missed fixes.
    ///
    /// Units: millimeters
    pub mat_min_x_mm: f64,
    pub mat_min_y_mm: f64,
    pub mat_max_x_mm: f64,
    pub mat_max_y_mm: f64,

    /// Period of the background simulation thread.
    ///
    /// Units: seconds
    pub sim_period_s: f64,
}

/// True state of the simulated cube.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct SimPose {
    pub x_mm: f64,
    pub y_mm: f64,

    /// Units: degrees, in the range [0, 360)
    pub heading_deg: f64,
}

/// Simulated cube, owns the background simulation thread.
pub struct SimCube {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
    shared: Arc<SimShared>,
}

/// Localisation source handle onto a `SimCube`.
#[derive(Clone)]
pub struct SimLoc {
    shared: Arc<SimShared>,
}

/// Motor sink handle onto a `SimCube`.
#[derive(Clone)]
pub struct SimMotors {
    shared: Arc<SimShared>,
}

struct SimShared {
    params: SimParams,
    state: Mutex<SimState>,
    handler: Mutex<Option<IdHandler>>,
}

#[derive(Debug, Copy, Clone)]
struct SimState {
    pose: SimPose,
    dems: MotorDems,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SimCubeError {
    #[error("Simulation parameter `{0}` must be positive, found {1}")]
    InvalidParam(&'static str, f64),

    #[error("The mat minimum bounds must be below the maximum bounds")]
    InvalidMatBounds,

    #[error("The simulation thread is already running")]
    AlreadyStarted,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            start_x_mm: 100.0,
            start_y_mm: 250.0,
            start_heading_deg: 0.0,
            mm_s_per_dem: 2.0,
            track_width_mm: 26.0,
            mat_min_x_mm: 45.0,
            mat_min_y_mm: 45.0,
            mat_max_x_mm: 455.0,
            mat_max_y_mm: 455.0,
            sim_period_s: 0.01,
        }
    }
}

impl SimParams {
    pub fn validate(&self) -> Result<(), SimCubeError> {
        let positive = [
            ("mm_s_per_dem", self.mm_s_per_dem),
            ("track_width_mm", self.track_width_mm),
            ("sim_period_s", self.sim_period_s),
        ];

        for (name, value) in positive.iter() {
            if !(*value > 0.0) {
                return Err(SimCubeError::InvalidParam(*name, *value));
            }
        }

        if !(self.mat_min_x_mm < self.mat_max_x_mm && self.mat_min_y_mm < self.mat_max_y_mm) {
            return Err(SimCubeError::InvalidMatBounds);
        }

        Ok(())
    }
}

impl SimCube {
    /// Create a new stationary cube at the start pose. The simulation doesn't advance until
    /// `start` or `step` is called.
    pub fn new(params: SimParams) -> Result<Self, SimCubeError> {
        params.validate()?;

        let pose = SimPose {
            x_mm: params.start_x_mm,
            y_mm: params.start_y_mm,
            heading_deg: wrap_deg_360(params.start_heading_deg),
        };

        Ok(Self {
            bg_jh: None,
            bg_run: Arc::new(AtomicBool::new(false)),
            shared: Arc::new(SimShared {
                params,
                state: Mutex::new(SimState {
                    pose,
                    dems: MotorDems::STOP,
                }),
                handler: Mutex::new(None),
            }),
        })
    }

    /// Start the background simulation thread.
    pub fn start(&mut self) -> Result<(), SimCubeError> {
        if self.bg_jh.is_some() {
            return Err(SimCubeError::AlreadyStarted);
        }

        self.bg_run.store(true, Ordering::Relaxed);

        let bg_run_clone = self.bg_run.clone();
        let shared_clone = self.shared.clone();

        self.bg_jh = Some(thread::spawn(move || bg_thread(bg_run_clone, shared_clone)));

        info!("SimCube started");

        Ok(())
    }

    /// Advance the simulation by `dt_s` seconds and publish the resulting notification.
    pub fn step(&self, dt_s: f64) {
        self.shared.step(dt_s)
    }

    /// Get a localisation source handle.
    pub fn loc_source(&self) -> SimLoc {
        SimLoc { shared: self.shared.clone() }
    }

    /// Get a motor sink handle.
    pub fn motors(&self) -> SimMotors {
        SimMotors { shared: self.shared.clone() }
    }

    /// The true pose of the cube.
    pub fn pose(&self) -> SimPose {
        self.shared.lock_state().pose
    }

    /// The demands currently driving the cube.
    pub fn dems(&self) -> MotorDems {
        self.shared.lock_state().dems
    }
}

impl Drop for SimCube {
    fn drop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            jh.join().ok();
        }
    }
}

impl SimShared {
    fn lock_state(&self) -> std::sync::MutexGuard<SimState> {
        self.state.lock().expect("SimCube: state mutex poisoned")
    }

    fn step(&self, dt_s: f64) {
        let notif = {
            let mut state = self.lock_state();
            let p = &self.params;

            let v_left = state.dems.left as f64 * p.mm_s_per_dem;
            let v_right = state.dems.right as f64 * p.mm_s_per_dem;

            // Heading increases towards +Y, which is a left wheel faster than the right
            let speed = 0.5 * (v_left + v_right);
            let rate_rads = (v_left - v_right) / p.track_width_mm;

            let heading_rad = state.pose.heading_deg.to_radians();
            state.pose.x_mm += speed * heading_rad.cos() * dt_s;
            state.pose.y_mm += speed * heading_rad.sin() * dt_s;
            state.pose.heading_deg =
                wrap_deg_360(state.pose.heading_deg + (rate_rads * dt_s).to_degrees());

            let on_mat = (p.mat_min_x_mm..=p.mat_max_x_mm).contains(&state.pose.x_mm)
                && (p.mat_min_y_mm..=p.mat_max_y_mm).contains(&state.pose.y_mm);

            if on_mat {
                IdNotification::ValidFix(PoseFix {
                    x_mm: state.pose.x_mm.round() as i32,
                    y_mm: state.pose.y_mm.round() as i32,
                    heading_deg: (state.pose.heading_deg.round() as i32).rem_euclid(360),
                })
            }
            else {
                IdNotification::Missed
            }
        };

        // Deliver with the handler lock held, so unregistering waits for any delivery in
        // progress. The handler must not call back into the source.
        let handler = self.handler.lock().expect("SimCube: handler mutex poisoned");

        if let Some(ref h) = *handler {
            h(notif);
        }
    }
}

impl LocSource for SimLoc {
    fn register_handler(&mut self, handler: IdHandler) -> Result<(), LocSourceError> {
        let mut h = self.shared.handler.lock().expect("SimCube: handler mutex poisoned");

        if h.is_some() {
            return Err(LocSourceError::HandlerAlreadyRegistered);
        }

        *h = Some(handler);
        debug!("SimCube handler registered");

        Ok(())
    }

    fn unregister_handler(&mut self) -> Result<(), LocSourceError> {
        let mut h = self.shared.handler.lock().expect("SimCube: handler mutex poisoned");

        match h.take() {
            Some(_) => {
                debug!("SimCube handler unregistered");
                Ok(())
            }
            None => Err(LocSourceError::NoHandlerRegistered),
        }
    }
}

impl MotorSink for SimMotors {
    fn send_dems(&mut self, dems: &MotorDems) -> Result<(), MotorSinkError> {
        dems.validate()?;

        self.shared.lock_state().dems = *dems;

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Background thread, steps the simulation until instructed to stop.
fn bg_thread(run: Arc<AtomicBool>, shared: Arc<SimShared>) {
    let period = Duration::from_secs_f64(shared.params.sim_period_s);
    let mut last = Instant::now();

    while run.load(Ordering::Relaxed) {
        thread::sleep(period);

        let now = Instant::now();
        shared.step((now - last).as_secs_f64());
        last = now;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::mpsc;

    fn collect(sim: &SimCube) -> mpsc::Receiver<IdNotification> {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        sim.loc_source()
            .register_handler(Arc::new(move |n| {
                tx.lock().unwrap().send(n).ok();
            }))
            .unwrap();
        rx
    }

    #[test]
    fn test_straight_line() {
        let sim = SimCube::new(SimParams::default()).unwrap();
        let rx = collect(&sim);

        sim.motors().send_dems(&MotorDems { left: 50, right: 50 }).unwrap();
        sim.step(1.0);

        // 50 dem at 2 mm/s per dem for 1 s
        let p = sim.pose();
        assert!((p.x_mm - 200.0).abs() < 1e-9);
        assert!((p.y_mm - 250.0).abs() < 1e-9);
        assert_eq!(p.heading_deg, 0.0);

        assert_eq!(
            rx.try_recv().unwrap(),
            IdNotification::ValidFix(PoseFix { x_mm: 200, y_mm: 250, heading_deg: 0 })
        );
    }

    #[test]
    fn test_turn_on_the_spot() {
        let sim = SimCube::new(SimParams::default()).unwrap();

        // Left forwards, right backwards turns towards increasing heading
        sim.motors().send_dems(&MotorDems { left: 10, right: -10 }).unwrap();
        sim.step(0.1);

        let p = sim.pose();
        let expected_deg = (40.0f64 / 26.0 * 0.1).to_degrees();
        assert!((p.heading_deg - expected_deg).abs() < 1e-9);
        assert!((p.x_mm - 100.0).abs() < 1e-9);

        sim.motors().send_dems(&MotorDems { left: -10, right: 10 }).unwrap();
        sim.step(0.2);

        let p = sim.pose();
        assert!((p.heading_deg - (360.0 - expected_deg)).abs() < 1e-9);
    }

    #[test]
    fn test_missed_off_mat() {
        let params = SimParams { start_x_mm: 450.0, ..Default::default() };
        let sim = SimCube::new(params).unwrap();
        let rx = collect(&sim);

        sim.motors().send_dems(&MotorDems { left: 10, right: 10 }).unwrap();
        sim.step(1.0);

        assert_eq!(rx.try_recv().unwrap(), IdNotification::Missed);
    }

    #[test]
    fn test_invalid_dems_rejected() {
        let sim = SimCube::new(SimParams::default()).unwrap();

        assert!(sim.motors().send_dems(&MotorDems { left: 101, right: 0 }).is_err());
        assert_eq!(sim.dems(), MotorDems::STOP);
    }

    #[test]
    fn test_handler_registration() {
        let sim = SimCube::new(SimParams::default()).unwrap();
        let mut loc = sim.loc_source();

        assert!(matches!(
            loc.unregister_handler(),
            Err(LocSourceError::NoHandlerRegistered)
        ));

        loc.register_handler(Arc::new(|_| ())).unwrap();
        assert!(matches!(
            loc.register_handler(Arc::new(|_| ())),
            Err(LocSourceError::HandlerAlreadyRegistered)
        ));

        loc.unregister_handler().unwrap();
    }

    #[test]
    fn test_unregister_waits_for_delivery() {
        let sim = SimCube::new(SimParams::default()).unwrap();
        let mut loc = sim.loc_source();

        let entered = Arc::new(AtomicBool::new(false));
        let done = Arc::new(AtomicBool::new(false));

        let (e, d) = (entered.clone(), done.clone());
        loc.register_handler(Arc::new(move |_| {
            e.store(true, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            d.store(true, Ordering::SeqCst);
        }))
        .unwrap();

        let stepper = thread::spawn(move || sim.step(0.01));

        let start = Instant::now();
        while !entered.load(Ordering::SeqCst) {
            assert!(start.elapsed() < Duration::from_secs(5), "Handler never called");
            thread::yield_now();
        }

        // The delivery in progress has finished by the time unregister returns
        loc.unregister_handler().unwrap();
        assert!(done.load(Ordering::SeqCst));

        stepper.join().unwrap();
    }

    #[test]
    fn test_invalid_params() {
        let params = SimParams { track_width_mm: 0.0, ..Default::default() };
        assert!(matches!(
            SimCube::new(params),
            Err(SimCubeError::InvalidParam("track_width_mm", _))
        ));

        let params = SimParams { mat_max_x_mm: 0.0, ..Default::default() };
        assert!(matches!(SimCube::new(params), Err(SimCubeError::InvalidMatBounds)));
    }

    #[test]
    fn test_background_thread_publishes() {
        let mut sim = SimCube::new(SimParams::default()).unwrap();
        let rx = collect(&sim);

        sim.start().unwrap();
        assert!(matches!(sim.start(), Err(SimCubeError::AlreadyStarted)));

        let n = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(n, IdNotification::ValidFix(_)));

        drop(sim);
    }
}
