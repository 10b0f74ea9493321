//! # Motor Equipment Interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Largest wheel speed demand accepted by the motors, in either direction.
pub const MAX_ABS_WHEEL_DEM: i32 = 100;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Differential wheel speed demands sent to the motors.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotorDems {
    /// Left wheel speed demand, in the range [-100, 100].
    pub left: i32,

    /// Right wheel speed demand, in the range [-100, 100].
    pub right: i32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur while delivering demands to the motors.
#[derive(Debug, thiserror::Error)]
pub enum MotorSinkError {
    #[error("Demands are outside the accepted range: {0:?}")]
    DemsInvalid(MotorDems),

    #[error("Could not deliver demands to the motors: {0}")]
    SendError(String),
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Anything which can accept wheel speed demands.
///
/// Delivery is synchronous: when `send_dems` returns the demands have either been accepted or
/// have failed.
pub trait MotorSink {
    fn send_dems(&mut self, dems: &MotorDems) -> Result<(), MotorSinkError>;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MotorDems {
    /// The canonical stop command.
    pub const STOP: MotorDems = MotorDems { left: 0, right: 0 };

    /// Create demands from the given wheel speeds, saturating each to the accepted range.
    pub fn saturated(left: i32, right: i32) -> Self {
        Self {
            left: left.clamp(-MAX_ABS_WHEEL_DEM, MAX_ABS_WHEEL_DEM),
            right: right.clamp(-MAX_ABS_WHEEL_DEM, MAX_ABS_WHEEL_DEM),
        }
    }

    /// Check that both demands lie within the accepted range.
    pub fn validate(&self) -> Result<(), MotorSinkError> {
        let in_range = |d: i32| (-MAX_ABS_WHEEL_DEM..=MAX_ABS_WHEEL_DEM).contains(&d);

        if in_range(self.left) && in_range(self.right) {
            Ok(())
        } else {
            Err(MotorSinkError::DemsInvalid(*self))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_saturated() {
        assert_eq!(MotorDems::saturated(250, -250), MotorDems { left: 100, right: -100 });
        assert_eq!(MotorDems::saturated(42, -7), MotorDems { left: 42, right: -7 });
    }

    #[test]
    fn test_validate() {
        assert!(MotorDems::STOP.validate().is_ok());
        assert!(MotorDems { left: 100, right: -100 }.validate().is_ok());
        assert!(MotorDems { left: 101, right: 0 }.validate().is_err());
        assert!(MotorDems { left: 0, right: -101 }.validate().is_err());
    }
}
