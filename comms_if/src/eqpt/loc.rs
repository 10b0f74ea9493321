//! # Localisation Equipment Interface
//!
//! The position reader on the underside of the cube pushes an identification notification every
//! time it reads (or fails to read) the mat. Clients decode the raw payload into an
//! [`IdNotification`] and pass it to whichever handler has been registered.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single position fix read from the mat.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoseFix {
    /// Position of the cube centre along the mat X axis.
    ///
    /// Units: millimeters
    pub x_mm: i32,

    /// Position of the cube centre along the mat Y axis.
    ///
    /// Units: millimeters
    pub y_mm: i32,

    /// Heading of the cube, measured from the mat X axis towards the mat Y axis.
    ///
    /// Units: degrees, in the range [0, 360)
    pub heading_deg: i32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Notifications that can be pushed by the localisation reader.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdNotification {
    /// The reader successfully read its position on the mat.
    ValidFix(PoseFix),

    /// The reader could not read the mat (for example the cube has been lifted off it).
    Missed,

    /// Any other identification (standard ID cards and the like), which carries no pose.
    Other,
}

/// Errors raised by a localisation source when (un)registering handlers.
#[derive(Debug, thiserror::Error)]
pub enum LocSourceError {
    #[error("The localisation source is not connected")]
    NotConnected,

    #[error("A notification handler is already registered")]
    HandlerAlreadyRegistered,

    #[error("No notification handler is registered")]
    NoHandlerRegistered,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Callback invoked by a [`LocSource`] for every notification it receives.
///
/// The handler may be called from a background thread owned by the source, and must not call
/// back into the source.
pub type IdHandler = Arc<dyn Fn(IdNotification) + Send + Sync>;

/// A source of asynchronous localisation notifications.
pub trait LocSource {
    /// Register the handler which will receive all future notifications.
    fn register_handler(&mut self, handler: IdHandler) -> Result<(), LocSourceError>;

    /// Remove the currently registered handler. No notifications are delivered after this
    /// returns.
    fn unregister_handler(&mut self) -> Result<(), LocSourceError>;
}
