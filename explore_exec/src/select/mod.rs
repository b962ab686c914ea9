//! # Viewpoint Sampler and Entropy Selector
//!
//! Candidate viewpoints are placed evenly on a ring around the robot. The map oracle is asked for
//! the entropy around each one in turn and the single most informative candidate is kept. The
//! comparison is strict, so of several equally informative candidates the first sampled wins, and
//! a candidate must beat `minimum_entropy_threshold` to be selected at all.
//!
//! Every evaluated candidate is written to the `select/candidates.csv` archive when a session is
//! available.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::f64::consts::PI;

use comms_if::eqpt::{map::EntropyQuery, tf::RobotPose};
use log::{debug, info, warn};
use nalgebra::Vector3;
use serde::Serialize;
use util::{
    archive::{ArchiveError, Archiver},
    session::Session,
};

pub use params::SelectParams;

use crate::clients::{MapClientError, MapOracle};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Path of the candidate archive relative to the session archive root.
pub const CANDIDATE_ARCHIVE_PATH: &str = "select/candidates.csv";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A candidate viewpoint and the entropy the map reported around it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candidate {
    pub position_m: Vector3<f64>,
    pub entropy: f64,
}

/// Viewpoint selector.
pub struct Selector {
    params: SelectParams,
    arch: Archiver,
}

/// One row of the candidate archive.
#[derive(Debug, Serialize)]
struct CandidateRecord {
    cycle: u64,
    index: usize,
    x_m: f64,
    y_m: f64,
    z_m: f64,
    entropy: f64,
    best: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    #[error("Could not evaluate the entropy at ({x_m:.2}, {y_m:.2}): {source}")]
    EntropyFailed {
        x_m: f64,
        y_m: f64,
        source: MapClientError,
    },

    #[error("Could not open the candidate archive: {0}")]
    ArchiveError(ArchiveError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Selector {
    /// Create a selector which does not archive its candidates.
    pub fn new(params: SelectParams) -> Self {
        Self {
            params,
            arch: Archiver::default(),
        }
    }

    /// Create a selector which archives every candidate into the session.
    pub fn with_archive(params: SelectParams, session: &Session) -> Result<Self, SelectError> {
        Ok(Self {
            params,
            arch: Archiver::from_path(session, CANDIDATE_ARCHIVE_PATH)
                .map_err(SelectError::ArchiveError)?,
        })
    }

    /// Sample the ring around `pose` and return the most informative candidate, or `None` if no
    /// candidate beats the minimum entropy threshold.
    ///
    /// Any failure of the entropy query aborts the selection.
    pub fn select(
        &mut self,
        pose: &RobotPose,
        map: &mut dyn MapOracle,
        cycle: u64,
    ) -> Result<Option<Candidate>, SelectError> {
        let points = sample_ring(
            pose,
            self.params.exploration_radius_m,
            self.params.num_candidates,
            self.params.sample_height_m,
        );

        let mut best_entropy = self.params.minimum_entropy_threshold;
        let mut best: Option<Candidate> = None;

        for (index, point) in points.iter().enumerate() {
            let query = EntropyQuery {
                x_m: point.x,
                y_m: point.y,
                z_m: point.z,
                radius_m: self.params.query_radius_m,
                time_horizon_s: self.params.time_horizon_s,
            };

            let entropy = map
                .entropy(&query)
                .map_err(|e| SelectError::EntropyFailed {
                    x_m: point.x,
                    y_m: point.y,
                    source: e,
                })?;

            debug!(
                "Candidate {} at ({:.2}, {:.2}) has entropy {:.4}",
                index, point.x, point.y, entropy
            );

            let is_best = entropy > best_entropy;
            if is_best {
                best_entropy = entropy;
                best = Some(Candidate {
                    position_m: *point,
                    entropy,
                });
            }

            self.archive(CandidateRecord {
                cycle,
                index,
                x_m: point.x,
                y_m: point.y,
                z_m: point.z,
                entropy,
                best: is_best,
            });
        }

        match best {
            Some(ref c) => info!(
                "Best candidate at ({:.2}, {:.2}) with entropy {:.4}",
                c.position_m.x, c.position_m.y, c.entropy
            ),
            None => info!(
                "No candidate exceeded the minimum entropy of {}",
                self.params.minimum_entropy_threshold
            ),
        }

        Ok(best)
    }

    fn archive(&mut self, record: CandidateRecord) {
        if let Err(e) = self.arch.serialise(record) {
            warn!("Could not archive candidate: {}", e);
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Place `num_points` points evenly on a circle of `radius_m` about the pose, starting on the
/// positive x axis and proceeding anticlockwise, all at `height_m`.
pub fn sample_ring(
    pose: &RobotPose,
    radius_m: f64,
    num_points: usize,
    height_m: f64,
) -> Vec<Vector3<f64>> {
    (0..num_points)
        .map(|k| {
            let angle = k as f64 * 2.0 * PI / num_points as f64;
            Vector3::new(
                pose.x_m + radius_m * angle.cos(),
                pose.y_m + radius_m * angle.sin(),
                height_m,
            )
        })
        .collect()
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
