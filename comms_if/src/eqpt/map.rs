//! # Map Oracle Communications Module
//!
//! Requests and replies exchanged with the spatio-temporal occupancy map service. The service
//! owns the map; the exploration executable only asks it to ingest the current view, to score
//! points, and to render probability bands.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A point at which the map's entropy should be evaluated.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct EntropyQuery {
    pub x_m: f64,
    pub y_m: f64,
    pub z_m: f64,

    /// Radius around the point over which the entropy is accumulated
    pub radius_m: f64,

    /// How far into the future the temporal model is projected, 0 meaning now
    pub time_horizon_s: f64,
}

/// An RGBA colour, each channel in the range [0, 1].
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct ColourRgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Request to render all cells whose occupancy probability lies within a band.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VisualiseReq {
    pub colour: ColourRgba,

    /// Lower bound of the probability band
    pub min_prob: f64,

    /// Upper bound of the probability band
    pub max_prob: f64,

    /// Name of the rendered layer
    pub name: String,

    /// Renderer specific layer type, 0 renders cells as cubes
    pub render_type: u32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Commands that can be sent to the map oracle.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum MapCmd {
    /// Incorporate the current sensor view. A stamp of 0 means "the latest view".
    Measure { stamp_s: f64 },

    /// Evaluate the entropy at a point
    Entropy(EntropyQuery),

    /// Render a probability band
    Visualise(VisualiseReq),
}

/// Replies that can be sent by the map oracle.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum MapRep {
    /// The view was added to the map
    MeasureOk,

    /// Entropy at the queried point
    Entropy(f64),

    /// The band was rendered
    VisualiseOk,

    /// The oracle could not fulfil the request
    Error(MapServerError),
}

/// Errors reported by the map oracle itself.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, thiserror::Error)]
pub enum MapServerError {
    #[error("No sensor view is available to add to the map")]
    NoView,

    #[error("The queried point lies outside the map")]
    OutOfBounds,

    #[error("{0}")]
    Other(String),
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl ColourRgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_map_wire_format() {
        let cmd = MapCmd::Measure { stamp_s: 0.0 };
        assert_eq!(
            serde_json::to_string(&cmd).unwrap(),
            r#"{"Measure":{"stamp_s":0.0}}"#
        );

        let rep: MapRep = serde_json::from_str(r#"{"Entropy":12.75}"#).unwrap();
        assert_eq!(rep, MapRep::Entropy(12.75));

        let rep: MapRep = serde_json::from_str(r#"{"Error":"OutOfBounds"}"#).unwrap();
        assert_eq!(rep, MapRep::Error(MapServerError::OutOfBounds));
    }
}
