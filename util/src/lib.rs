//! Utility library for the exploration software

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod archive;
pub mod host;
pub mod logger;
pub mod params;
pub mod session;
pub mod time;
