//! # Exploration library.
//!
//! This library contains the exploration decision loop and the clients it uses, so that both the
//! networked executable and the simulation executable can drive it.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Clients for the map oracle, PTU, navigation stack and pose resolver
pub mod clients;

/// Exploration manager - the sweep, select, navigate state machine
pub mod explore_mgr;

/// Navigation dispatcher - sends the robot to a selected viewpoint
pub mod nav_dispatch;

/// PTU monitor - tracks whether the sensor head has reached its commanded angle
pub mod ptu_mon;

/// Viewpoint selection - scores candidate viewpoints by entropy
pub mod select;

/// Sweep controller - sweeps the sensor head through the measurement angles
pub mod sweep;

/// Simulated collaborators for running without hardware
#[cfg(feature = "sim")]
pub mod sim;

#[cfg(test)]
pub(crate) mod fakes;
