//! # Navigation control loop
//!
//! The loop ties the localisation source, trajectory control and the motors together. Once
//! started it:
//!
//! 1. Registers the pose handler with the localisation source.
//! 1. Waits for the first valid pose.
//! 1. Every `period_s` takes a snapshot of the pose, processes trajectory control and sends the
//!    resulting demands to the motors.
//!
//! However the loop ends (sequence complete, cancelled, error or panic) a single stop command is
//! sent to the motors, and only after that is the pose handler unregistered. This ordering is
//! held by the drop order of two guards, `HandlerRegistration` and `StopGuard`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};
use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

use crate::{
    loc::{LocClient, Pose, PoseSlot},
    params::NavParams,
    traj_ctrl::{self, StatusReport, TrajCtrl, TrajCtrlError},
};
use comms_if::eqpt::{
    loc::{IdHandler, LocSource, LocSourceError},
    motor::{MotorDems, MotorSink, MotorSinkError},
};
use util::{archive::Archived, module::State, session::Session};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Longest single wait for the first pose before checking for cancellation.
const FIRST_POSE_WAIT_SLICE: Duration = Duration::from_millis(100);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The navigation control loop.
pub struct NavLoop<L, S> {
    period: Duration,
    first_pose_timeout: Option<Duration>,

    loc_source: L,
    sink: S,

    loc_client: LocClient,
    traj_ctrl: TrajCtrl,

    num_cycles: u64,
    num_overruns: u64,
}

/// Sends a stop command when dropped.
struct StopGuard<'a, S: MotorSink> {
    sink: &'a mut S,
}

/// Unregisters the pose handler when dropped.
struct HandlerRegistration<'a, L: LocSource> {
    source: &'a mut L,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Result of a single tick.
#[derive(Debug, Copy, Clone)]
pub enum TickOutcome {
    /// Drive with these demands.
    Drive {
        dems: MotorDems,
        report: StatusReport,
    },

    /// The waypoint sequence is complete.
    Complete,
}

/// Reasons the loop can exit without error.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// Every waypoint was reached.
    SequenceComplete,

    /// The run flag was cleared.
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum NavLoopError {
    #[error("Could not setup trajectory control: {0}")]
    TrajCtrlError(#[from] TrajCtrlError),

    #[error("Localisation source error: {0}")]
    LocSourceError(#[from] LocSourceError),

    #[error("Could not send demands to the motors: {0}")]
    MotorSinkError(#[from] MotorSinkError),

    #[error("No pose was received within {0:.2} s")]
    FirstPoseTimeout(f64),

    #[error("The pose was not available after the first fix")]
    NoPose,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<L, S> NavLoop<L, S>
where
    L: LocSource,
    S: MotorSink,
{
    /// Create a new loop.
    ///
    /// If a session is given the tick archive is written into it.
    pub fn new(
        params: NavParams,
        loc_source: L,
        sink: S,
        session: Option<&Session>
    ) -> Result<Self, NavLoopError> {
        Self::with_loc_client(params, loc_source, sink, LocClient::new(), session)
    }

    /// Create a new loop using the given localisation client, for example one with an observer.
    pub fn with_loc_client(
        params: NavParams,
        loc_source: L,
        sink: S,
        loc_client: LocClient,
        session: Option<&Session>
    ) -> Result<Self, NavLoopError> {
        let period = params.period().map_err(TrajCtrlError::InvalidParams)?;
        let first_pose_timeout = params
            .first_pose_timeout()
            .map_err(TrajCtrlError::InvalidParams)?;

        let mut traj_ctrl = TrajCtrl::default();
        traj_ctrl.init(params, session)?;

        Ok(Self {
            period,
            first_pose_timeout,
            loc_source,
            sink,
            loc_client,
            traj_ctrl,
            num_cycles: 0,
            num_overruns: 0,
        })
    }

    pub fn loc_client(&self) -> &LocClient {
        &self.loc_client
    }

    pub fn traj_ctrl(&self) -> &TrajCtrl {
        &self.traj_ctrl
    }

    pub fn num_cycles(&self) -> u64 {
        self.num_cycles
    }

    /// Consume the loop, returning the localisation source and the motor sink.
    pub fn into_parts(self) -> (L, S) {
        (self.loc_source, self.sink)
    }

    /// Process a single cycle for the given pose without any I/O to the cube.
    pub fn tick(&mut self, pose: Pose, now: Instant) -> Result<TickOutcome, NavLoopError> {
        Self::tick_traj_ctrl(&mut self.traj_ctrl, pose, now)
    }

    /// Run the loop until the sequence is complete, `running` is cleared, or an error occurs.
    pub fn run(&mut self, running: &AtomicBool) -> Result<LoopExit, NavLoopError> {
        // ---- SETUP ----

        // Order matters: the stop guard must be dropped before the registration
        let _registration = match HandlerRegistration::new(
            &mut self.loc_source,
            self.loc_client.handler()
        ) {
            Ok(r) => r,
            Err(e) => {
                drop(StopGuard::new(&mut self.sink));
                return Err(e.into());
            }
        };
        let mut sink = StopGuard::new(&mut self.sink);

        // ---- WAIT FOR FIRST POSE ----

        info!("Waiting for the first pose");

        let first = wait_first_pose(self.loc_client.slot(), running, self.first_pose_timeout)?;

        match first {
            Some(p) => info!(
                "Starting from ({}, {}) heading {} deg",
                p.x_mm, p.y_mm, p.heading_deg
            ),
            None => {
                info!("Cancelled while waiting for the first pose");
                return Ok(LoopExit::Cancelled);
            }
        }

        // ---- MAIN LOOP ----

        info!("Beginning main loop");

        loop {
            let cycle_start = Instant::now();

            if !running.load(Ordering::SeqCst) {
                info!("Run flag cleared, stopping after {} cycles", self.num_cycles);
                return Ok(LoopExit::Cancelled);
            }

            let pose = self.loc_client.pose().ok_or(NavLoopError::NoPose)?;

            match Self::tick_traj_ctrl(&mut self.traj_ctrl, pose, cycle_start)? {
                TickOutcome::Drive { dems, .. } => sink.send(&dems)?,
                TickOutcome::Complete => {
                    info!(
                        "Waypoint sequence complete after {} cycles ({} overruns, {} missed fixes)",
                        self.num_cycles,
                        self.num_overruns,
                        self.loc_client.num_missed()
                    );
                    return Ok(LoopExit::SequenceComplete);
                }
            }

            self.num_cycles += 1;

            // ---- CYCLE MANAGEMENT ----

            let cycle_dur = Instant::now() - cycle_start;

            match self.period.checked_sub(cycle_dur) {
                Some(d) => thread::sleep(d),
                None => {
                    warn!(
                        "Cycle overran by {:.06} s",
                        cycle_dur.as_secs_f64() - self.period.as_secs_f64()
                    );
                    self.num_overruns += 1;
                }
            }
        }
    }

    fn tick_traj_ctrl(
        traj_ctrl: &mut TrajCtrl,
        pose: Pose,
        now: Instant
    ) -> Result<TickOutcome, NavLoopError> {
        let (output, report) = traj_ctrl.proc(&traj_ctrl::InputData { pose, now })?;

        if let Err(e) = traj_ctrl.write() {
            warn!("Could not write the tick archive: {}", e);
        }

        Ok(match output {
            traj_ctrl::OutputData::Drive(dems) => TickOutcome::Drive { dems, report },
            traj_ctrl::OutputData::SequenceComplete => TickOutcome::Complete,
        })
    }
}

impl<'a, S: MotorSink> StopGuard<'a, S> {
    fn new(sink: &'a mut S) -> Self {
        Self { sink }
    }

    fn send(&mut self, dems: &MotorDems) -> Result<(), MotorSinkError> {
        self.sink.send_dems(dems)
    }
}

impl<'a, S: MotorSink> Drop for StopGuard<'a, S> {
    fn drop(&mut self) {
        match self.sink.send_dems(&MotorDems::STOP) {
            Ok(()) => info!("Stop command sent"),
            Err(e) => warn!("Could not send the final stop command: {}", e),
        }
    }
}

impl<'a, L: LocSource> HandlerRegistration<'a, L> {
    fn new(source: &'a mut L, handler: IdHandler) -> Result<Self, LocSourceError> {
        source.register_handler(handler)?;
        debug!("Pose handler registered");

        Ok(Self { source })
    }
}

impl<'a, L: LocSource> Drop for HandlerRegistration<'a, L> {
    fn drop(&mut self) {
        match self.source.unregister_handler() {
            Ok(()) => debug!("Pose handler unregistered"),
            Err(e) => warn!("Could not unregister the pose handler: {}", e),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Block until the first pose is available.
///
/// Returns `None` if `running` is cleared first, or an error if the timeout elapses.
fn wait_first_pose(
    slot: &PoseSlot,
    running: &AtomicBool,
    timeout: Option<Duration>
) -> Result<Option<Pose>, NavLoopError> {
    let start = Instant::now();

    loop {
        if !running.load(Ordering::SeqCst) {
            return Ok(None);
        }

        let slice = match timeout {
            Some(t) => match t.checked_sub(start.elapsed()) {
                Some(remaining) if remaining > Duration::from_secs(0) => {
                    remaining.min(FIRST_POSE_WAIT_SLICE)
                }
                _ => return Err(NavLoopError::FirstPoseTimeout(t.as_secs_f64())),
            },
            None => FIRST_POSE_WAIT_SLICE,
        };

        if let Some(p) = slot.wait_first(slice) {
            return Ok(Some(p));
        }
    }
}
