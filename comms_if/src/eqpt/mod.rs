//! # Equipment Interface
//!
//! This module defines the interface structures which are exchanged with the cube's equipment.
//! Device scanning, connection management and raw payload decoding live in whichever client
//! implements these traits.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod loc;
pub mod motor;
