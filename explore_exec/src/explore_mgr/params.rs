//! # ExploreMgr Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{nav_dispatch::NavDispatchParams, select::SelectParams, sweep::SweepParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExploreParams {
    pub sweep: SweepParams,

    pub select: SelectParams,

    pub nav: NavDispatchParams,

    pub pose: PoseParams,

    /// What to do when the robot pose cannot be resolved
    pub pose_failure_policy: PoseFailurePolicy,

    /// If no candidate is informative enough, send the robot back to the last target
    pub reuse_previous_target: bool,

    /// Spacing of the entropy sampling grid
    pub interval_m: f64,

    /// Extent of the map the grid covers
    pub map_extent: MapExtent,

    /// Stop after this many cycles, runs forever if unset
    pub max_cycles: Option<u64>,
}

/// Frames used to look up the robot pose.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseParams {
    pub source_frame: String,
    pub target_frame: String,
    pub timeout_s: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MapExtent {
    pub dim_x_cells: usize,
    pub dim_y_cells: usize,
    pub resolution_m: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PoseFailurePolicy {
    /// Stop exploring and exit cleanly
    Terminate,

    /// Abandon this cycle and start the next with a fresh sweep
    SkipCycle,
}

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("Parameter {name} must be finite and positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("Parameter {name} must be finite and not negative, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("Parameter {name} must be finite, got {value}")]
    NotFinite { name: &'static str, value: f64 },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ExploreParams {
    /// Check the values the sweep and the clients depend on to terminate.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let positive = |name, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ParamsError::NotPositive { name, value })
            }
        };
        let not_negative = |name, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(ParamsError::Negative { name, value })
            }
        };
        let finite = |name, value: f64| {
            if value.is_finite() {
                Ok(())
            } else {
                Err(ParamsError::NotFinite { name, value })
            }
        };

        positive("sweep.step_rad", self.sweep.step_rad)?;
        finite("sweep.start_angle_rad", self.sweep.start_angle_rad)?;
        finite("sweep.range_rad", self.sweep.range_rad)?;
        finite("sweep.centre_angle_rad", self.sweep.centre_angle_rad)?;
        not_negative("sweep.settle_wait_s", self.sweep.settle_wait_s)?;
        if let Some(max_s) = self.sweep.max_settle_wait_s {
            not_negative("sweep.max_settle_wait_s", max_s)?;
        }
        not_negative("pose.timeout_s", self.pose.timeout_s)?;
        finite("select.exploration_radius_m", self.select.exploration_radius_m)?;

        Ok(())
    }

    /// Number of cells along x and y of the entropy sampling grid.
    pub fn entropy_grid_size(&self) -> (usize, usize) {
        let size = |dim_cells: usize| {
            let extent_m = dim_cells as f64 * self.map_extent.resolution_m;
            if self.interval_m <= 0.0 || extent_m <= self.interval_m {
                0
            } else {
                ((extent_m - self.interval_m) / self.interval_m) as usize
            }
        };

        (size(self.map_extent.dim_x_cells), size(self.map_extent.dim_y_cells))
    }
}

impl Default for ExploreParams {
    fn default() -> Self {
        Self {
            sweep: SweepParams::default(),
            select: SelectParams::default(),
            nav: NavDispatchParams::default(),
            pose: PoseParams::default(),
            pose_failure_policy: PoseFailurePolicy::default(),
            reuse_previous_target: true,
            interval_m: 1.0,
            map_extent: MapExtent::default(),
            max_cycles: None,
        }
    }
}

impl Default for PoseParams {
    fn default() -> Self {
        Self {
            source_frame: "/base_link".into(),
            target_frame: "/map".into(),
            timeout_s: 2.0,
        }
    }
}

impl Default for MapExtent {
    fn default() -> Self {
        Self {
            dim_x_cells: 250,
            dim_y_cells: 500,
            resolution_m: 0.05,
        }
    }
}

impl Default for PoseFailurePolicy {
    fn default() -> Self {
        PoseFailurePolicy::Terminate
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_load_params() {
        let params: ExploreParams = toml::from_str(
            r#"
            pose_failure_policy = "SkipCycle"
            max_cycles = 3

            [select]
            num_candidates = 8

            [nav]
            goal_frame = "odom"
            "#,
        )
        .unwrap();

        assert_eq!(params.pose_failure_policy, PoseFailurePolicy::SkipCycle);
        assert_eq!(params.max_cycles, Some(3));
        assert_eq!(params.select.num_candidates, 8);
        assert_eq!(params.select.exploration_radius_m, 2.0);
        assert_eq!(params.nav.goal_frame, "odom");
        assert_eq!(params.pose.target_frame, "/map");
        assert!(params.reuse_previous_target);
        assert_eq!(params.interval_m, 1.0);
    }

    #[test]
    fn test_shipped_params() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../params/explore_exec.toml");
        let params: ExploreParams = util::params::load_path(path).unwrap();
        let defaults = ExploreParams::default();

        assert!((params.sweep.step_rad - defaults.sweep.step_rad).abs() < 1e-12);
        assert!((params.sweep.start_angle_rad - defaults.sweep.start_angle_rad).abs() < 1e-12);
        assert_eq!(params.sweep.occupied_band, defaults.sweep.occupied_band);
        assert_eq!(params.sweep.free_band, defaults.sweep.free_band);
        assert_eq!(params.select.num_candidates, 12);
        assert_eq!(params.pose_failure_policy, PoseFailurePolicy::Terminate);
        assert_eq!(params.max_cycles, None);
    }

    #[test]
    fn test_validate() {
        assert!(ExploreParams::default().validate().is_ok());

        let mut params = ExploreParams::default();
        params.sweep.step_rad = 0.0;
        assert!(matches!(
            params.validate(),
            Err(ParamsError::NotPositive { name: "sweep.step_rad", .. })
        ));

        params.sweep.step_rad = -0.5;
        assert!(params.validate().is_err());

        params.sweep.step_rad = f64::NAN;
        assert!(params.validate().is_err());

        let mut params = ExploreParams::default();
        params.sweep.settle_wait_s = f64::INFINITY;
        assert!(matches!(
            params.validate(),
            Err(ParamsError::Negative { name: "sweep.settle_wait_s", .. })
        ));

        let mut params = ExploreParams::default();
        params.sweep.range_rad = f64::INFINITY;
        assert!(matches!(
            params.validate(),
            Err(ParamsError::NotFinite { name: "sweep.range_rad", .. })
        ));

        let mut params = ExploreParams::default();
        params.pose.timeout_s = f64::INFINITY;
        assert!(params.validate().is_err());

        // An infinite TOML value is rejected rather than reaching the sweep
        let params: ExploreParams = toml::from_str(
            r#"
            [sweep]
            settle_wait_s = inf
            "#,
        )
        .unwrap();
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_entropy_grid_size() {
        // 12.5 m by 25 m at 1 m spacing
        let mut params = ExploreParams::default();
        assert_eq!(params.entropy_grid_size(), (11, 24));

        params.interval_m = 0.0;
        assert_eq!(params.entropy_grid_size(), (0, 0));
    }
}
