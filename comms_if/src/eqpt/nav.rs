//! # Navigation Stack Communications Module

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A destination for the navigation stack.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NavGoal {
    /// Frame the goal is expressed in
    pub frame_id: String,

    /// Target position in the goal frame
    pub position_m: [f64; 3],

    /// Target attitude as an `[x, y, z, w]` quaternion
    pub orientation_q: [f64; 4],
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Terminal state of a navigation goal.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum NavStatus {
    Succeeded,
    Aborted,

    /// Any other terminal state (rejected, preempted, lost...), described by the stack
    Other(String),
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl NavGoal {
    /// A goal at `(x, y)` on the ground plane of `frame_id` with identity orientation.
    pub fn new(frame_id: &str, x_m: f64, y_m: f64) -> Self {
        Self {
            frame_id: frame_id.into(),
            position_m: [x_m, y_m, 0.0],
            orientation_q: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl NavStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, NavStatus::Succeeded)
    }
}
