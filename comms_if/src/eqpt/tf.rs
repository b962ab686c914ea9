//! # Pose Resolver Communications Module
//!
//! The pose resolver looks up the transform between two frames, the exploration executable only
//! uses it to find where the robot base is in the map.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Request for the current pose of `source_frame` expressed in `target_frame`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PoseRequest {
    pub source_frame: String,
    pub target_frame: String,

    /// Maximum time the resolver may wait for the transform to become available
    pub timeout_s: f64,
}

/// Planar position of the robot in the map.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct RobotPose {
    pub x_m: f64,
    pub y_m: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Replies from the pose resolver.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum PoseRep {
    Pose(RobotPose),

    /// The transform could not be resolved within the timeout
    Unavailable(String),
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl RobotPose {
    pub fn new(x_m: f64, y_m: f64) -> Self {
        Self { x_m, y_m }
    }
}
