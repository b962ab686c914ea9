//! # Communications interface crate.
//!
//! Provides all common communications interfaces between the exploration executable and the
//! services it drives: the map oracle, the pan-tilt unit, the navigation stack, and the pose
//! resolver.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command and response definitions for equipment and services
pub mod eqpt;

/// Network module
pub mod net;
