//! # Pan-Tilt Unit Equipment Commands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Joint name of the pan axis, as used in both commands and joint state reports.
pub const PAN_JOINT: &str = "pan";

/// Joint name of the tilt axis.
pub const TILT_JOINT: &str = "tilt";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Demands sent to the pan-tilt unit.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PtuDems {
    /// Demanded pan angle in radians
    pub pan_rad: f64,

    /// Demanded tilt angle in radians
    pub tilt_rad: f64,

    /// Speed at which to move the pan axis
    pub pan_speed_rads: f64,

    /// Speed at which to move the tilt axis
    pub tilt_speed_rads: f64,
}

/// Joint state report published by the pan-tilt unit at its own rate.
///
/// The three vectors are parallel, entry `i` of each describes the joint named `name[i]`. The unit
/// may report more joints than the two it is commanded on.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PtuJointState {
    pub name: Vec<String>,
    pub position_rad: Vec<f64>,
    pub velocity_rads: Vec<f64>,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl PtuDems {
    /// Demands for the given pan and tilt with both axes moving at `speed_rads`.
    pub fn new(pan_rad: f64, tilt_rad: f64, speed_rads: f64) -> Self {
        Self {
            pan_rad,
            tilt_rad,
            pan_speed_rads: speed_rads,
            tilt_speed_rads: speed_rads,
        }
    }
}

impl PtuJointState {
    /// Position of the named joint, or `None` if the report doesn't contain it.
    pub fn position_of(&self, joint: &str) -> Option<f64> {
        self.name
            .iter()
            .zip(self.position_rad.iter())
            .find(|(n, _)| n.as_str() == joint)
            .map(|(_, p)| *p)
    }
}

/// The unit is commanded with the same joint state message it reports.
impl From<&PtuDems> for PtuJointState {
    fn from(dems: &PtuDems) -> Self {
        Self {
            name: vec![PAN_JOINT.into(), TILT_JOINT.into()],
            position_rad: vec![dems.pan_rad, dems.tilt_rad],
            velocity_rads: vec![dems.pan_speed_rads, dems.tilt_speed_rads],
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_position_of() {
        let state = PtuJointState {
            name: vec!["tilt".into(), "pan".into(), "zoom".into()],
            position_rad: vec![0.1, -1.2, 3.0],
            velocity_rads: vec![0.0, 0.0, 0.0],
        };

        assert_eq!(state.position_of(PAN_JOINT), Some(-1.2));
        assert_eq!(state.position_of(TILT_JOINT), Some(0.1));
        assert_eq!(state.position_of("roll"), None);

        // Truncated report, the name has no matching position
        let short = PtuJointState {
            name: vec!["tilt".into(), "pan".into()],
            position_rad: vec![0.1],
            velocity_rads: vec![],
        };
        assert_eq!(short.position_of(PAN_JOINT), None);
    }

    #[test]
    fn test_dems_to_joint_state() {
        let state = PtuJointState::from(&PtuDems::new(0.5, 0.0, 1.0));

        assert_eq!(state.position_of(PAN_JOINT), Some(0.5));
        assert_eq!(state.position_of(TILT_JOINT), Some(0.0));
        assert_eq!(state.velocity_rads, vec![1.0, 1.0]);
    }
}
