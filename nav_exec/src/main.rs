//! Main navigation executable entry point.
//!
//! # Architecture
//!
//! The executable drives a simulated cube through the waypoints given in the navigation
//! parameters:
//!
//!     - Early initialisation: session and logging
//!     - Load the navigation and simulation parameters
//!     - Start the simulated cube
//!     - Run the navigation loop until the sequence is complete or Ctrl-C is pressed
//!
//! A stop command is always sent to the cube before the executable exits.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::info;
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use structopt::StructOpt;

// Internal
use nav_lib::{
    nav_loop::{LoopExit, NavLoop},
    params::NavParams,
    sim_client::{SimCube, SimParams},
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Drive a simulated cube through a sequence of waypoints.
#[derive(Debug, StructOpt)]
#[structopt(name = "nav_exec")]
struct Opts {
    /// Navigation parameter file. Defaults to `params/nav.toml` in the software root.
    #[structopt(long, parse(from_os_str))]
    nav_params: Option<PathBuf>,

    /// Simulation parameter file. Defaults to `params/sim.toml` in the software root.
    #[structopt(long, parse(from_os_str))]
    sim_params: Option<PathBuf>,

    /// Minimum level of the log messages to display, one of `info`, `debug` or `trace`.
    #[structopt(long, default_value = "info")]
    log_level: LevelFilter,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Sessions go in the software root if it's set, otherwise the working directory
    let root = match host::get_sw_root() {
        Ok(r) => r,
        Err(_) => std::env::current_dir().wrap_err("Failed to get the working directory")?,
    };

    let session = Session::new_in(root, "nav_exec", "sessions")
        .wrap_err("Failed to create the session")?;

    logger_init(opts.log_level, &session).wrap_err("Failed to initialise logging")?;

    info!("Cube Navigation Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let nav_params: NavParams = match opts.nav_params {
        Some(ref p) => util::params::load_path(p),
        None => util::params::load("nav.toml"),
    }
    .wrap_err("Could not load nav params")?;

    let sim_params: SimParams = match opts.sim_params {
        Some(ref p) => util::params::load_path(p),
        None => util::params::load("sim.toml"),
    }
    .wrap_err("Could not load sim params")?;

    nav_params.validate().wrap_err("Invalid nav params")?;

    info!(
        "Parameters loaded: {} waypoints, {}",
        nav_params.waypoints.len(),
        match nav_params.obstacle {
            Some(ref o) => format!("obstacle at ({}, {}) r {} mm", o.x_mm, o.y_mm, o.radius_mm),
            None => "no obstacle".into(),
        }
    );

    // ---- INITIALISE CUBE ----

    let mut sim = SimCube::new(sim_params).wrap_err("Failed to create the SimCube")?;
    sim.start().wrap_err("Failed to start the SimCube")?;

    let mut nav_loop = NavLoop::new(nav_params, sim.loc_source(), sim.motors(), Some(&session))
        .wrap_err("Failed to initialise the navigation loop")?;

    // ---- SIGNAL HANDLING ----

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        info!("Ctrl-C received, stopping");
        r.store(false, Ordering::SeqCst);
    })
    .wrap_err("Failed to set the Ctrl-C handler")?;

    // ---- MAIN LOOP ----

    let exit = nav_loop.run(&running).wrap_err("Navigation loop failed")?;

    // ---- SHUTDOWN ----

    let final_pose = sim.pose();

    match exit {
        LoopExit::SequenceComplete => info!("All waypoints reached"),
        LoopExit::Cancelled => info!("Navigation cancelled"),
    }

    info!(
        "Final cube pose: ({:.1}, {:.1}) heading {:.1} deg",
        final_pose.x_mm, final_pose.y_mm, final_pose.heading_deg
    );
    info!("End of execution");

    Ok(())
}
