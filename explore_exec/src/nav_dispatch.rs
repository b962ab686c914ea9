//! # Navigation Dispatcher
//!
//! Turns a selected candidate into a navigation goal and blocks until the navigation stack reports
//! a terminal status. Failing to reach a goal is not an error for the exploration loop, the next
//! cycle simply sweeps from wherever the robot stopped.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::nav::{NavGoal, NavStatus};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{clients::NavStack, select::Candidate};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavDispatchParams {
    /// Frame in which goals are expressed
    pub goal_frame: String,
}

pub struct NavDispatcher {
    params: NavDispatchParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for NavDispatchParams {
    fn default() -> Self {
        Self {
            goal_frame: "/map".into(),
        }
    }
}

impl NavDispatcher {
    pub fn new(params: NavDispatchParams) -> Self {
        Self { params }
    }

    /// The goal which would be sent for this candidate.
    pub fn goal_for(&self, candidate: &Candidate) -> NavGoal {
        NavGoal::new(
            &self.params.goal_frame,
            candidate.position_m.x,
            candidate.position_m.y,
        )
    }

    /// Send the robot to the candidate, returning the terminal status of the goal.
    ///
    /// A transport failure is reported as [`NavStatus::Other`].
    pub fn dispatch(&self, candidate: &Candidate, nav: &mut dyn NavStack) -> NavStatus {
        let goal = self.goal_for(candidate);

        info!(
            "Moving to point ({:.2}, {:.2}) in {}",
            goal.position_m[0], goal.position_m[1], goal.frame_id
        );

        let status = match nav.send_goal_and_wait(&goal) {
            Ok(s) => s,
            Err(e) => NavStatus::Other(e.to_string()),
        };

        if status.is_success() {
            info!("Goal reached");
        } else {
            info!("Failed to reach the goal: {:?}", status);
        }

        status
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
