//! # Collaborator Clients
//!
//! The exploration loop talks to four external services. Each one is abstracted behind a trait so
//! that the loop can be driven by the network clients in this module, by the in-process simulation,
//! or by scripted fakes in tests.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod map_client;
mod nav_client;
mod pose_client;
mod ptu_client;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use map_client::{MapClient, MapClientError};
pub use nav_client::{NavClient, NavClientError};
pub use pose_client::{PoseClient, PoseClientError};
pub use ptu_client::{PtuClient, PtuClientError};

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::{
    map::{EntropyQuery, VisualiseReq},
    nav::{NavGoal, NavStatus},
    ptu::PtuDems,
    tf::RobotPose,
};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// The spatio-temporal occupancy map service.
pub trait MapOracle {
    /// Ask the map to incorporate the sensor view at `stamp_s`, 0 meaning the latest view.
    fn measure(&mut self, stamp_s: f64) -> Result<(), MapClientError>;

    /// Evaluate the entropy of the map around a point.
    fn entropy(&mut self, query: &EntropyQuery) -> Result<f64, MapClientError>;

    /// Render a band of occupancy probabilities.
    fn visualise(&mut self, req: &VisualiseReq) -> Result<(), MapClientError>;
}

/// The pan-tilt unit. Feedback is not returned here, it is delivered asynchronously to a
/// [`PtuMonitor`](crate::ptu_mon::PtuMonitor).
pub trait PtuActuator {
    fn send_demands(&mut self, dems: &PtuDems) -> Result<(), PtuClientError>;
}

/// The navigation stack.
pub trait NavStack {
    /// Submit a goal and block until the stack reports a terminal status.
    fn send_goal_and_wait(&mut self, goal: &NavGoal) -> Result<NavStatus, NavClientError>;
}

/// The coordinate frame resolver.
pub trait PoseResolver {
    /// Position of `source_frame` in `target_frame`, waiting at most `timeout_s`.
    fn current_pose(
        &mut self,
        source_frame: &str,
        target_frame: &str,
        timeout_s: f64,
    ) -> Result<RobotPose, PoseClientError>;
}
