//! # Communications interface crate.
//!
//! Provides the common interfaces between the navigation software and the equipment it drives:
//! the localisation notification stream coming in and the motor demands going out.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Notification and demand definitions for equipment (localisation reader, motors)
pub mod eqpt;
