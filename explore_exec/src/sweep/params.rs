//! # Sweep Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::f64::consts::PI;

use comms_if::eqpt::map::{ColourRgba, VisualiseReq};
use serde::{Deserialize, Serialize};

use crate::ptu_mon::DEFAULT_SETTLE_TOL_RAD;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Default angle between two sweep steps, giving seven steps over a full turn.
pub const DEFAULT_STEP_RAD: f64 = 2.0 * PI / 7.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepParams {
    /// Pan increment between measurements
    pub step_rad: f64,

    /// Pan angle of the first measurement in each sweep
    pub start_angle_rad: f64,

    /// The sweep ends once the pan angle reaches this value
    pub range_rad: f64,

    /// Pan angle the head is returned to after the sweep
    pub centre_angle_rad: f64,

    /// Tilt held throughout the sweep
    pub tilt_rad: f64,

    /// Pan and tilt speed demanded with every command
    pub speed_rads: f64,

    /// Tolerance within which the head is considered settled
    pub settle_tol_rad: f64,

    /// Time to wait for settle feedback before re-sending the same command
    pub settle_wait_s: f64,

    /// Total time a single step may wait for settle feedback, waits forever if unset
    pub max_settle_wait_s: Option<f64>,

    /// Rendering of cells which are most likely occupied
    pub occupied_band: VisualiseBand,

    /// Rendering of cells which are most likely free
    pub free_band: VisualiseBand,
}

/// A probability band rendered by the map after each measurement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisualiseBand {
    pub name: String,
    pub min_prob: f64,
    pub max_prob: f64,
    pub colour: ColourRgba,

    #[serde(default)]
    pub render_type: u32,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SweepParams {
    fn default() -> Self {
        Self {
            step_rad: DEFAULT_STEP_RAD,
            start_angle_rad: -3.0 * DEFAULT_STEP_RAD,
            range_rad: PI,
            centre_angle_rad: 0.0,
            tilt_rad: 0.0,
            speed_rads: 1.0,
            settle_tol_rad: DEFAULT_SETTLE_TOL_RAD,
            settle_wait_s: 0.1,
            max_settle_wait_s: None,
            occupied_band: VisualiseBand {
                name: "occupied".into(),
                min_prob: 0.9,
                max_prob: 1.0,
                colour: ColourRgba::new(0.0, 0.0, 1.0, 1.0),
                render_type: 0,
            },
            free_band: VisualiseBand {
                name: "free".into(),
                min_prob: 0.0,
                max_prob: 0.1,
                colour: ColourRgba::new(1.0, 0.0, 0.0, 0.005),
                render_type: 0,
            },
        }
    }
}

impl VisualiseBand {
    pub fn to_req(&self) -> VisualiseReq {
        VisualiseReq {
            colour: self.colour,
            min_prob: self.min_prob,
            max_prob: self.max_prob,
            name: self.name.clone(),
            render_type: self.render_type,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_params() {
        // Unspecified fields take their defaults
        let params: SweepParams = toml::from_str("settle_wait_s = 0.5\nmax_settle_wait_s = 30.0")
            .unwrap();

        assert_eq!(params.settle_wait_s, 0.5);
        assert_eq!(params.max_settle_wait_s, Some(30.0));
        assert_eq!(params.step_rad, DEFAULT_STEP_RAD);
        assert_eq!(params.start_angle_rad, -3.0 * DEFAULT_STEP_RAD);
        assert_eq!(params.occupied_band.name, "occupied");
        assert_eq!(params.free_band.colour.a, 0.005);
    }
}
