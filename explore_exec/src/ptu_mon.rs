//! # PTU Pose Feedback Monitor
//!
//! Tracks whether the pan-tilt unit has reached the last pan angle it was commanded to. Joint
//! state reports arrive asynchronously (on the [`PtuClient`](crate::clients::PtuClient)
//! subscriber thread in the executable) and are compared against the last command only, so
//! dropped or out-of-order reports can never settle a newer command.
//!
//! The settle flag is the only state shared between the feedback thread and the control thread,
//! it lives behind a mutex with a condition variable so that the sweep can block on it with a
//! bounded timeout instead of spinning.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{Arc, Condvar, Mutex, MutexGuard},
    time::Duration,
};

use comms_if::eqpt::ptu::{PtuJointState, PAN_JOINT};
use log::trace;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum difference between reported and commanded pan for the head to be settled.
pub const DEFAULT_SETTLE_TOL_RAD: f64 = 0.01;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Handle onto the shared settle state. Clones observe and update the same state.
#[derive(Debug, Clone)]
pub struct PtuMonitor {
    tol_rad: f64,
    shared: Arc<(Mutex<MonitorState>, Condvar)>,
}

#[derive(Debug, Default)]
struct MonitorState {
    /// Last pan angle commanded, `None` until the first command
    commanded_pan_rad: Option<f64>,

    settled: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PtuMonitor {
    pub fn new(tol_rad: f64) -> Self {
        Self {
            tol_rad,
            shared: Arc::new((Mutex::new(MonitorState::default()), Condvar::new())),
        }
    }

    /// Record that a new pan command is about to be sent, clearing the settle flag.
    ///
    /// Must be called before the command is published so that a fast reply is compared against
    /// the new command rather than the previous one.
    pub fn command_issued(&self, pan_rad: f64) {
        let mut state = self.lock();
        state.commanded_pan_rad = Some(pan_rad);
        state.settled = false;
    }

    /// Handle a joint state report from the unit.
    ///
    /// Reports without a `pan` joint, and reports received before any command, are ignored.
    pub fn on_feedback(&self, report: &PtuJointState) {
        let reported_pan_rad = match report.position_of(PAN_JOINT) {
            Some(p) => p,
            None => return,
        };

        let mut state = self.lock();

        let commanded_pan_rad = match state.commanded_pan_rad {
            Some(c) => c,
            None => return,
        };

        if (reported_pan_rad - commanded_pan_rad).abs() < self.tol_rad {
            if !state.settled {
                trace!(
                    "PTU settled at {:.4} rad (commanded {:.4} rad)",
                    reported_pan_rad,
                    commanded_pan_rad
                );
            }
            state.settled = true;
            self.shared.1.notify_all();
        }
    }

    /// Returns true if feedback matching the last command has been observed.
    pub fn is_settled(&self) -> bool {
        self.lock().settled
    }

    /// Block until the head settles or the timeout elapses, returning the settle flag.
    pub fn wait_settled(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = match self
            .shared
            .1
            .wait_timeout_while(guard, timeout, |s| !s.settled)
        {
            Ok(r) => r,
            Err(poisoned) => poisoned.into_inner(),
        };

        guard.settled
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        // The state is plain data that is always left consistent, so a poisoned lock is usable
        match self.shared.0.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for PtuMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_TOL_RAD)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
