//! # Sensor Head Sweep Controller
//!
//! Drives the pan-tilt unit through a fixed sequence of pan angles. At each angle the controller
//! waits for the head to settle, asks the map oracle to incorporate the current view, commands the
//! next angle and then asks the oracle to render the occupied and free bands. Once the pan angle
//! passes the end of the sweep range the head is returned to the centre.
//!
//! Only one command is ever unsettled at a time: a new angle is commanded only after the previous
//! one has settled and been measured.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use comms_if::eqpt::ptu::PtuDems;
use log::{debug, info, trace, warn};
use serde::Serialize;

pub use params::{SweepParams, VisualiseBand, DEFAULT_STEP_RAD};

use crate::{
    clients::{MapClientError, MapOracle, PtuActuator, PtuClientError},
    ptu_mon::PtuMonitor,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Progress of the current sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepState {
    /// Pan angle most recently commanded
    pub current_angle_rad: f64,

    pub step_rad: f64,

    /// True once the head has reported reaching `current_angle_rad`
    pub settled: bool,
}

/// Sweep controller.
pub struct SweepCtrl {
    params: SweepParams,
    state: SweepState,
}

/// Summary of a completed sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SweepReport {
    pub num_steps: usize,
    pub num_measurements: usize,
    pub num_visualise_failures: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("Could not command the PTU: {0}")]
    PtuError(PtuClientError),

    #[error("The map could not incorporate the measurement at {angle_rad:.3} rad: {source}")]
    MeasureFailed {
        angle_rad: f64,
        source: MapClientError,
    },

    #[error("The PTU did not settle at {angle_rad:.3} rad within {waited_s:.1} s")]
    SettleTimeout { angle_rad: f64, waited_s: f64 },

    #[error("Shutdown requested during the sweep")]
    Shutdown,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SweepCtrl {
    pub fn new(params: SweepParams) -> Self {
        let state = SweepState {
            current_angle_rad: params.start_angle_rad,
            step_rad: params.step_rad,
            settled: false,
        };

        Self { params, state }
    }

    pub fn state(&self) -> SweepState {
        self.state
    }

    /// Perform one full sweep, ending with the head commanded back to the centre.
    ///
    /// The shutdown flag is polled while waiting for the head to settle.
    pub fn run(
        &mut self,
        ptu: &mut dyn PtuActuator,
        monitor: &PtuMonitor,
        map: &mut dyn MapOracle,
        shutdown: &AtomicBool,
    ) -> Result<SweepReport, SweepError> {
        let mut report = SweepReport::default();

        self.state.current_angle_rad = self.params.start_angle_rad;
        self.command(ptu, monitor, self.params.start_angle_rad)?;

        while self.state.current_angle_rad < self.params.range_rad {
            self.await_settle(ptu, monitor, shutdown)?;

            let measured_angle_rad = self.state.current_angle_rad;
            map.measure(0.0).map_err(|e| SweepError::MeasureFailed {
                angle_rad: measured_angle_rad,
                source: e,
            })?;
            report.num_measurements += 1;
            report.num_steps += 1;
            debug!(
                "Sweep step {} measured at {:.3} rad",
                report.num_steps, measured_angle_rad
            );

            let next_angle_rad = measured_angle_rad + self.params.step_rad;
            if next_angle_rad < self.params.range_rad {
                self.command(ptu, monitor, next_angle_rad)?;
            }
            self.state.current_angle_rad = next_angle_rad;

            for band in [&self.params.occupied_band, &self.params.free_band].iter() {
                if let Err(e) = map.visualise(&band.to_req()) {
                    info!("Could not visualise the \"{}\" band: {}", band.name, e);
                    report.num_visualise_failures += 1;
                }
            }
        }

        self.centre(ptu, monitor)?;

        Ok(report)
    }

    /// Command the head back to the centre angle without waiting for it to settle.
    pub fn centre(
        &mut self,
        ptu: &mut dyn PtuActuator,
        monitor: &PtuMonitor,
    ) -> Result<(), SweepError> {
        self.command(ptu, monitor, self.params.centre_angle_rad)
    }

    fn demands(&self, pan_rad: f64) -> PtuDems {
        PtuDems::new(pan_rad, self.params.tilt_rad, self.params.speed_rads)
    }

    fn command(
        &mut self,
        ptu: &mut dyn PtuActuator,
        monitor: &PtuMonitor,
        pan_rad: f64,
    ) -> Result<(), SweepError> {
        trace!("Commanding PTU pan to {:.3} rad", pan_rad);

        self.state.current_angle_rad = pan_rad;
        self.state.settled = false;

        // The monitor must know about the command before any feedback for it can arrive
        monitor.command_issued(pan_rad);
        ptu.send_demands(&self.demands(pan_rad))
            .map_err(SweepError::PtuError)
    }

    fn await_settle(
        &mut self,
        ptu: &mut dyn PtuActuator,
        monitor: &PtuMonitor,
        shutdown: &AtomicBool,
    ) -> Result<(), SweepError> {
        let wait = Duration::from_secs_f64(self.params.settle_wait_s.max(0.0));
        let start = Instant::now();

        loop {
            if shutdown.load(Ordering::Relaxed) {
                return Err(SweepError::Shutdown);
            }

            if monitor.wait_settled(wait) {
                self.state.settled = true;
                return Ok(());
            }

            let waited_s = start.elapsed().as_secs_f64();
            if let Some(max_s) = self.params.max_settle_wait_s {
                if waited_s >= max_s {
                    return Err(SweepError::SettleTimeout {
                        angle_rad: self.state.current_angle_rad,
                        waited_s,
                    });
                }
            }

            // The demand may have been dropped, send it again
            warn!(
                "PTU not settled at {:.3} rad after {:.2} s, re-sending demands",
                self.state.current_angle_rad, waited_s
            );
            ptu.send_demands(&self.demands(self.state.current_angle_rad))
                .map_err(SweepError::PtuError)?;
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
