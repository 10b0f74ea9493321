//! # Navigation library.
//!
//! This library allows other crates in the workspace to access items defined inside the
//! navigation crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Obstacle avoidance - steers around a known circular obstacle
pub mod avoid;

/// Localisation module - turns the asynchronous fix stream into the latest pose
pub mod loc;

/// Navigation control loop - drives the cube through its waypoints at a fixed rate
pub mod nav_loop;

/// Parameters of the navigation executable
pub mod params;

/// Simulation client - a kinematic cube used in place of a real one
pub mod sim_client;

/// Trajectory control module - turns the pose and current waypoint into wheel demands
pub mod traj_ctrl;
