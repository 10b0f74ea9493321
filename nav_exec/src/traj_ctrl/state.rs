//! Trajectory control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::Serialize;
use std::time::Instant;

// Internal
use super::*;
use crate::{avoid::AvoidPlanner, loc::Pose, params::NavParams};
use comms_if::eqpt::motor::MotorDems;
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Path of the tick archive relative to the session archive root.
pub const TICK_ARCHIVE_PATH: &str = "nav_loop/ticks.csv";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Trajectory control module state
#[derive(Default)]
pub struct TrajCtrl {
    params: Params,
    initialised: bool,

    sequencer: WaypointSequencer,
    planner: AvoidPlanner,

    /// Controller objects used to calculate wheel demands
    controllers: NavControllers,

    report: StatusReport,

    /// Record of the last driven cycle, `None` if the last cycle didn't drive.
    record: Option<TickRecord>,
    arch_ticks: Archiver,
}

/// Input data to the module
#[derive(Debug, Copy, Clone)]
pub struct InputData {
    /// Snapshot of the cube pose for this cycle.
    pub pose: Pose,

    /// Time the snapshot was taken.
    pub now: Instant,
}

/// Output of one cycle of trajectory control.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum OutputData {
    /// Drive the motors with these demands.
    Drive(MotorDems),

    /// Every waypoint has been reached.
    SequenceComplete,
}

/// The status report containing monitoring quantities.
#[derive(Debug, Copy, Clone, Default, Serialize)]
pub struct StatusReport {
    /// Index of the waypoint being driven to
    pub waypoint_index: usize,

    /// Number of waypoints reached during this cycle
    pub waypoints_reached: usize,

    /// The point steered towards this cycle, either the waypoint or a detour point
    pub target_x_mm: f64,
    pub target_y_mm: f64,

    /// True if steering for a detour point
    pub avoiding: bool,

    pub compose: ComposeOutput,
}

/// One row of the tick archive.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct TickRecord {
    pub time_s: f64,
    pub waypoint_index: usize,
    pub x_mm: i32,
    pub y_mm: i32,
    pub heading_deg: i32,
    pub target_x_mm: f64,
    pub target_y_mm: f64,
    pub distance_mm: f64,
    pub bearing_deg: f64,
    pub heading_error_deg: f64,
    pub left: i32,
    pub right: i32,
    pub avoiding: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for TrajCtrl {
    type InitData = NavParams;
    type InitError = TrajCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = TrajCtrlError;

    /// Initialise the TrajCtrl module.
    ///
    /// Loads the waypoint sequence and obstacle from the parameters. If a session is given the
    /// tick archive is opened in it.
    fn init(
        &mut self,
        init_data: Self::InitData,
        session: Option<&Session>
    ) -> Result<(), Self::InitError> {
        init_data.validate()?;

        self.sequencer = WaypointSequencer::new(init_data.waypoints)?;
        self.planner = AvoidPlanner::new(init_data.obstacle, &init_data.avoid)?;
        self.controllers = NavControllers::new(&init_data.traj_ctrl);
        self.params = init_data.traj_ctrl;

        if let Some(s) = session {
            self.arch_ticks = Archiver::from_path(s, TICK_ARCHIVE_PATH)?;
        }

        self.report = StatusReport::default();
        self.record = None;
        self.initialised = true;

        Ok(())
    }

    /// Process trajectory control.
    ///
    /// Processing involves:
    ///  1. Moving past any reached waypoints
    ///  1. Getting the target from the avoidance planner
    ///  1. Calculating the wheel demands to drive to the target
    fn proc(
        &mut self,
        input_data: &Self::InputData
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        if !self.initialised {
            return Err(TrajCtrlError::NotInitialised);
        }

        self.report = StatusReport::default();
        self.record = None;

        let pose = input_data.pose;

        // ---- TARGET MANAGEMENT ----

        // Loop so that several waypoints already within reach are all passed in one cycle
        while self.sequencer.advance_if_reached(&pose, &mut self.controllers) {
            self.planner.reset();
            self.report.waypoints_reached += 1;
        }

        self.report.waypoint_index = self.sequencer.index();

        let goal = match self.sequencer.current() {
            Some(w) => w.position(),
            None => return Ok((OutputData::SequenceComplete, self.report)),
        };

        // ---- COMMAND GENERATION ----

        let plan = self.planner.query(&pose.position(), &goal);

        let compose_out = compose(
            &pose,
            &plan.target,
            plan.avoiding,
            &mut self.controllers,
            &self.params,
            input_data.now
        );

        self.report.target_x_mm = plan.target.x;
        self.report.target_y_mm = plan.target.y;
        self.report.avoiding = plan.avoiding;
        self.report.compose = compose_out;

        debug!(
            "wp {} target ({:.0}, {:.0}){} dist {:.1} mm, head err {:.1} deg -> L {} R {}",
            self.report.waypoint_index,
            plan.target.x,
            plan.target.y,
            if plan.avoiding { " [avoiding]" } else { "" },
            compose_out.distance_mm,
            compose_out.heading_error_deg,
            compose_out.dems.left,
            compose_out.dems.right
        );

        self.record = Some(TickRecord {
            time_s: session::get_elapsed_seconds(),
            waypoint_index: self.report.waypoint_index,
            x_mm: pose.x_mm,
            y_mm: pose.y_mm,
            heading_deg: pose.heading_deg,
            target_x_mm: plan.target.x,
            target_y_mm: plan.target.y,
            distance_mm: compose_out.distance_mm,
            bearing_deg: compose_out.bearing_deg,
            heading_error_deg: compose_out.heading_error_deg,
            left: compose_out.dems.left,
            right: compose_out.dems.right,
            avoiding: plan.avoiding,
        });

        Ok((OutputData::Drive(compose_out.dems), self.report))
    }
}

impl Archived for TrajCtrl {
    /// Write the record of the last driven cycle, if there was one.
    fn write(&mut self) -> Result<(), ArchiveError> {
        match self.record.take() {
            Some(r) => self.arch_ticks.serialise(r),
            None => Ok(()),
        }
    }
}

impl TrajCtrl {
    pub fn sequencer(&self) -> &WaypointSequencer {
        &self.sequencer
    }

    pub fn planner(&self) -> &AvoidPlanner {
        &self.planner
    }

    pub fn controllers(&self) -> &NavControllers {
        &self.controllers
    }

    /// Record of the last cycle which produced demands.
    pub fn last_record(&self) -> Option<&TickRecord> {
        self.record.as_ref()
    }
}
