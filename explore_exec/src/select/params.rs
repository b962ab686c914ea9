//! # Selection Parameters

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectParams {
    /// Radius of the ring of candidate viewpoints around the robot
    pub exploration_radius_m: f64,

    /// Number of candidates evenly spaced on the ring
    pub num_candidates: usize,

    /// Height at which the entropy is evaluated, approximately the sensor height
    pub sample_height_m: f64,

    /// Radius around each candidate over which the map accumulates entropy
    pub query_radius_m: f64,

    /// Time horizon of the entropy query, 0 being the current map
    pub time_horizon_s: f64,

    /// A candidate is only selected if its entropy is strictly greater than this
    pub minimum_entropy_threshold: f64,
}

impl Default for SelectParams {
    fn default() -> Self {
        Self {
            exploration_radius_m: 2.0,
            num_candidates: 12,
            sample_height_m: 1.69,
            query_radius_m: 4.0,
            time_horizon_s: 0.0,
            minimum_entropy_threshold: 0.0,
        }
    }
}
