//! # ExploreMgr module
//!
//! This module implements the [`ExploreMgr`], the top level state machine of the exploration
//! executable. Each cycle passes through three states:
//!
//! - `Sweeping` - The sensor head is swept through the measurement angles, adding each view to the
//!   map.
//! - `Selecting` - The robot pose is resolved and the ring of candidate viewpoints around it is
//!   scored by entropy.
//! - `Navigating` - The robot is sent to the selected viewpoint.
//!
//! after which the next cycle begins with a new sweep. The manager owns every collaborator and all
//! state shared between the components, and decides which failures end the exploration.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    fmt::Display,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use comms_if::eqpt::{nav::NavStatus, tf::RobotPose};
use log::{error, info, warn};
use serde::Serialize;
use util::session::{self, Session};

pub use params::{ExploreParams, MapExtent, ParamsError, PoseFailurePolicy, PoseParams};

use crate::{
    clients::{MapOracle, NavStack, PoseResolver, PtuActuator},
    nav_dispatch::NavDispatcher,
    ptu_mon::PtuMonitor,
    select::{Candidate, SelectError, Selector},
    sweep::{SweepCtrl, SweepError, SweepReport},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The external services driven by the manager.
pub struct Collaborators {
    pub map: Box<dyn MapOracle>,
    pub ptu: Box<dyn PtuActuator>,
    pub nav: Box<dyn NavStack>,
    pub pose: Box<dyn PoseResolver>,

    /// Monitor fed with the PTU's joint states
    pub monitor: PtuMonitor,
}

/// Exploration Manager
pub struct ExploreMgr {
    params: ExploreParams,

    collab: Collaborators,

    sweep: SweepCtrl,
    selector: Selector,
    dispatcher: NavDispatcher,

    state: ExploreState,

    /// Number of cycles started
    cycle: u64,

    /// Last candidate the robot was sent to
    previous_target: Option<Candidate>,

    shutdown: Arc<AtomicBool>,

    session: Option<Session>,
}

/// Summary of one exploration cycle, saved into the session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub cycle: u64,

    /// Session time at the end of the cycle
    pub elapsed_s: f64,

    pub sweep: SweepReport,
    pub pose: Option<RobotPose>,

    /// Candidate selected this cycle, if any beat the threshold
    pub selected: Option<Candidate>,

    /// True if the previous target was navigated to again
    pub target_reused: bool,

    pub nav_status: Option<NavStatus>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExploreState {
    Sweeping,
    Selecting,
    Navigating(Candidate),
}

/// Result of a single cycle.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// The cycle ran to completion, whether or not the robot moved
    Completed(CycleReport),

    /// The pose could not be resolved and the cycle was abandoned
    Skipped(CycleReport),

    /// The pose could not be resolved and exploration must stop
    PoseUnavailable(String),

    /// A shutdown was requested
    Shutdown,
}

/// Reason for [`ExploreMgr::run`] returning.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitReason {
    PoseUnavailable(String),
    CycleLimit,
    Shutdown,
}

/// Errors that end the exploration.
#[derive(Debug, thiserror::Error)]
pub enum ExploreMgrError {
    #[error("Invalid exploration parameters: {0}")]
    InvalidParams(ParamsError),

    #[error("Error during the sweep: {0}")]
    SweepError(SweepError),

    #[error("Error during viewpoint selection: {0}")]
    SelectError(SelectError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ExploreMgr {
    /// Create the manager. If a session is given candidates are archived and cycle reports saved
    /// into it.
    pub fn init(
        params: ExploreParams,
        collab: Collaborators,
        session: Option<&Session>,
    ) -> Result<Self, ExploreMgrError> {
        params.validate().map_err(ExploreMgrError::InvalidParams)?;

        let selector = match session {
            Some(s) => Selector::with_archive(params.select.clone(), s)
                .map_err(ExploreMgrError::SelectError)?,
            None => Selector::new(params.select.clone()),
        };

        let (grid_x, grid_y) = params.entropy_grid_size();
        info!(
            "Entropy sampling grid is {} x {} at {} m intervals",
            grid_x, grid_y, params.interval_m
        );
        info!(
            "Sampling {} candidates at {} m, pose failure policy {:?}",
            params.select.num_candidates,
            params.select.exploration_radius_m,
            params.pose_failure_policy
        );

        Ok(Self {
            sweep: SweepCtrl::new(params.sweep.clone()),
            selector,
            dispatcher: NavDispatcher::new(params.nav.clone()),
            params,
            collab,
            state: ExploreState::Sweeping,
            cycle: 0,
            previous_target: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            session: session.cloned(),
        })
    }

    /// Flag which stops the manager at the next opportunity when set.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Set the shutdown flag on SIGINT/SIGTERM. Only one handler may be installed per process.
    pub fn stop_on_interrupt(&self) -> Result<(), ctrlc::Error> {
        let shutdown = self.shutdown_handle();
        ctrlc::set_handler(move || {
            warn!("Interrupt received, stopping exploration");
            shutdown.store(true, Ordering::SeqCst);
        })
    }

    pub fn state(&self) -> ExploreState {
        self.state
    }

    /// Number of cycles started so far.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Run cycles until the cycle limit, a shutdown request, or a pose failure under the
    /// `Terminate` policy.
    pub fn run(&mut self) -> Result<ExitReason, ExploreMgrError> {
        loop {
            if let Some(max_cycles) = self.params.max_cycles {
                if self.cycle >= max_cycles {
                    info!("Cycle limit of {} reached", max_cycles);
                    return Ok(ExitReason::CycleLimit);
                }
            }

            match self.run_cycle()? {
                CycleOutcome::Completed(_) | CycleOutcome::Skipped(_) => (),
                CycleOutcome::PoseUnavailable(reason) => {
                    return Ok(ExitReason::PoseUnavailable(reason))
                }
                CycleOutcome::Shutdown => return Ok(ExitReason::Shutdown),
            }
        }
    }

    /// Run a single sweep, select, navigate cycle.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome, ExploreMgrError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Ok(CycleOutcome::Shutdown);
        }

        self.cycle += 1;
        let mut report = CycleReport {
            cycle: self.cycle,
            ..Default::default()
        };
        info!("---- Exploration cycle {} ----", self.cycle);

        // ---- SWEEPING ----

        self.set_state(ExploreState::Sweeping);

        report.sweep = match self.sweep.run(
            self.collab.ptu.as_mut(),
            &self.collab.monitor,
            self.collab.map.as_mut(),
            &self.shutdown,
        ) {
            Ok(r) => r,
            Err(SweepError::Shutdown) => return Ok(CycleOutcome::Shutdown),
            Err(e) => {
                error!("Sweep failed: {}", e);
                return Err(ExploreMgrError::SweepError(e));
            }
        };

        // ---- SELECTING ----

        self.set_state(ExploreState::Selecting);

        let pose = match self.collab.pose.current_pose(
            &self.params.pose.source_frame,
            &self.params.pose.target_frame,
            self.params.pose.timeout_s,
        ) {
            Ok(p) => p,
            Err(e) => {
                error!("Could not resolve the robot pose: {}", e);
                error!("The map could not incorporate the latest measurements");

                return Ok(match self.params.pose_failure_policy {
                    PoseFailurePolicy::Terminate => CycleOutcome::PoseUnavailable(e.to_string()),
                    PoseFailurePolicy::SkipCycle => {
                        warn!("Skipping to the next cycle");
                        self.save_report(&mut report);
                        CycleOutcome::Skipped(report)
                    }
                });
            }
        };
        report.pose = Some(pose);

        report.selected = match self
            .selector
            .select(&pose, self.collab.map.as_mut(), self.cycle)
        {
            Ok(c) => c,
            Err(e) => {
                error!("Selection failed: {}", e);
                return Err(ExploreMgrError::SelectError(e));
            }
        };

        let target = match (report.selected, self.previous_target) {
            (Some(c), _) => Some(c),
            (None, Some(prev)) if self.params.reuse_previous_target => {
                info!("No new viewpoint, returning to the previous target");
                report.target_reused = true;
                Some(prev)
            }
            (None, _) => {
                warn!("No viewpoint to navigate to, skipping navigation this cycle");
                None
            }
        };

        // ---- NAVIGATING ----

        if let Some(target) = target {
            self.set_state(ExploreState::Navigating(target));

            let status = self
                .dispatcher
                .dispatch(&target, self.collab.nav.as_mut());

            self.previous_target = Some(target);
            report.nav_status = Some(status);
        }

        self.save_report(&mut report);

        Ok(CycleOutcome::Completed(report))
    }

    /// Stop exploring and return the sensor head to the centre.
    pub fn shutdown(&mut self) -> Result<(), ExploreMgrError> {
        self.shutdown.store(true, Ordering::Relaxed);

        info!("Centring the PTU");
        self.sweep
            .centre(self.collab.ptu.as_mut(), &self.collab.monitor)
            .map_err(ExploreMgrError::SweepError)
    }

    fn set_state(&mut self, state: ExploreState) {
        self.state = state;
        info!("ExploreMgr state change to: {}", self.state);
    }

    fn save_report(&self, report: &mut CycleReport) {
        report.elapsed_s = session::get_elapsed_seconds();

        if let Some(ref s) = self.session {
            s.save(format!("explore/cycle_{}.json", report.cycle), report.clone());
        }
    }
}

impl Display for ExploreState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExploreState::Sweeping => write!(f, "ExploreState::Sweeping"),
            ExploreState::Selecting => write!(f, "ExploreState::Selecting"),
            ExploreState::Navigating(c) => write!(
                f,
                "ExploreState::Navigating({:.2}, {:.2})",
                c.position_m.x, c.position_m.y
            ),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        fakes::{new_log, Call, CallLog, FakeMap, FakeNav, FakePose, FakePtu},
        select::SelectParams,
        sweep::SweepParams,
    };
    use comms_if::eqpt::nav::NavGoal;

    fn test_params() -> ExploreParams {
        ExploreParams {
            sweep: SweepParams {
                settle_wait_s: 0.001,
                max_settle_wait_s: Some(1.0),
                ..Default::default()
            },
            select: SelectParams {
                num_candidates: 4,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn collab(log: &CallLog, map: FakeMap, nav: FakeNav, pose: FakePose) -> Collaborators {
        let monitor = PtuMonitor::default();
        Collaborators {
            map: Box::new(map.watching(&monitor)),
            ptu: Box::new(FakePtu::new(log, &monitor)),
            nav: Box::new(nav),
            pose: Box::new(pose),
            monitor,
        }
    }

    fn nav_goals(log: &CallLog) -> Vec<NavGoal> {
        log.borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Nav(g) => Some(g.clone()),
                _ => None,
            })
            .collect()
    }

    fn count(log: &CallLog, pred: fn(&Call) -> bool) -> usize {
        log.borrow().iter().filter(|c| pred(c)).count()
    }

    #[test]
    fn test_full_cycle() {
        let log = new_log();
        let map = FakeMap::new(&log).with_entropies(vec![7.0, 2.0, 1.0, 3.0]);
        let mut mgr = ExploreMgr::init(
            test_params(),
            collab(&log, map, FakeNav::new(&log), FakePose::new(&log)),
            None,
        )
        .unwrap();

        let report = match mgr.run_cycle().unwrap() {
            CycleOutcome::Completed(r) => r,
            o => panic!("Expected completed cycle, got {:?}", o),
        };

        assert_eq!(report.cycle, 1);
        assert_eq!(report.sweep.num_measurements, 7);
        assert_eq!(report.selected.unwrap().entropy, 7.0);
        assert_eq!(report.nav_status, Some(NavStatus::Succeeded));
        assert!(matches!(mgr.state(), ExploreState::Navigating(_)));

        // The whole sweep happens before the pose lookup and any entropy query
        let calls = log.borrow();
        let pose_idx = calls.iter().position(|c| *c == Call::Pose).unwrap();
        let first_entropy = calls
            .iter()
            .position(|c| matches!(c, Call::Entropy(_)))
            .unwrap();
        assert!(pose_idx < first_entropy);
        let before = &calls[..pose_idx];
        assert_eq!(
            before
                .iter()
                .filter(|c| matches!(c, Call::Measure { settled: true }))
                .count(),
            7
        );
        assert_eq!(
            before
                .iter()
                .filter(|c| matches!(c, Call::Visualise(_)))
                .count(),
            14
        );
        drop(calls);

        assert_eq!(nav_goals(&log), vec![NavGoal::new("/map", 2.0, 0.0)]);
    }

    #[test]
    fn test_pose_failure_terminates() {
        let log = new_log();
        let map = FakeMap::new(&log).with_entropies(vec![5.0]);
        let mut mgr = ExploreMgr::init(
            test_params(),
            collab(&log, map, FakeNav::new(&log), FakePose::new(&log).unavailable()),
            None,
        )
        .unwrap();

        assert!(matches!(mgr.run().unwrap(), ExitReason::PoseUnavailable(_)));
        assert_eq!(mgr.cycle(), 1);
        assert_eq!(mgr.state(), ExploreState::Selecting);

        // Measurements were made but no candidate was scored and no goal sent
        assert_eq!(count(&log, |c| matches!(c, Call::Measure { .. })), 7);
        assert_eq!(count(&log, |c| matches!(c, Call::Entropy(_))), 0);
        assert!(nav_goals(&log).is_empty());
    }

    #[test]
    fn test_pose_failure_skips_cycle() {
        let log = new_log();
        let map = FakeMap::new(&log).with_entropies(vec![5.0]);
        let pose = FakePose::new(&log).with_responses(vec![None, Some(RobotPose::new(1.0, 1.0))]);
        let mut mgr = ExploreMgr::init(
            ExploreParams {
                pose_failure_policy: PoseFailurePolicy::SkipCycle,
                max_cycles: Some(2),
                ..test_params()
            },
            collab(&log, map, FakeNav::new(&log), pose),
            None,
        )
        .unwrap();

        assert_eq!(mgr.run().unwrap(), ExitReason::CycleLimit);

        // Both cycles swept, only the second navigated
        assert_eq!(count(&log, |c| matches!(c, Call::Measure { .. })), 14);
        assert_eq!(nav_goals(&log), vec![NavGoal::new("/map", 3.0, 1.0)]);
    }

    #[test]
    fn test_no_candidate() {
        // First cycle finds a candidate, the second finds nothing
        let entropies = vec![0.0, 4.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];

        let log = new_log();
        let map = FakeMap::new(&log).with_entropies(entropies.clone());
        let mut mgr = ExploreMgr::init(
            ExploreParams {
                max_cycles: Some(2),
                ..test_params()
            },
            collab(&log, map, FakeNav::new(&log), FakePose::new(&log)),
            None,
        )
        .unwrap();
        mgr.run().unwrap();

        // The previous target is revisited
        let goal = NavGoal::new("/map", 0.0, 2.0);
        let goals = nav_goals(&log);
        assert_eq!(goals.len(), 2);
        for g in goals {
            assert_eq!(g.frame_id, goal.frame_id);
            assert!((g.position_m[0] - goal.position_m[0]).abs() < 1e-9);
            assert!((g.position_m[1] - goal.position_m[1]).abs() < 1e-9);
        }

        // Without reuse no goal is invented
        let log = new_log();
        let map = FakeMap::new(&log).with_entropies(entropies);
        let mut mgr = ExploreMgr::init(
            ExploreParams {
                reuse_previous_target: false,
                max_cycles: Some(2),
                ..test_params()
            },
            collab(&log, map, FakeNav::new(&log), FakePose::new(&log)),
            None,
        )
        .unwrap();
        mgr.run().unwrap();
        assert_eq!(nav_goals(&log).len(), 1);

        // Nothing to reuse on the first cycle
        let log = new_log();
        let map = FakeMap::new(&log).with_entropies(vec![0.0]);
        let mut mgr = ExploreMgr::init(
            test_params(),
            collab(&log, map, FakeNav::new(&log), FakePose::new(&log)),
            None,
        )
        .unwrap();
        match mgr.run_cycle().unwrap() {
            CycleOutcome::Completed(r) => {
                assert!(r.selected.is_none());
                assert!(r.nav_status.is_none());
            }
            o => panic!("Expected completed cycle, got {:?}", o),
        }
        assert!(nav_goals(&log).is_empty());
    }

    #[test]
    fn test_nav_failure_continues() {
        let log = new_log();
        let map = FakeMap::new(&log).with_entropies(vec![2.0]);
        let nav = FakeNav::new(&log).with_statuses(vec![NavStatus::Aborted]);
        let mut mgr = ExploreMgr::init(
            ExploreParams {
                max_cycles: Some(2),
                ..test_params()
            },
            collab(&log, map, nav, FakePose::new(&log)),
            None,
        )
        .unwrap();

        assert_eq!(mgr.run().unwrap(), ExitReason::CycleLimit);
        assert_eq!(nav_goals(&log).len(), 2);
    }

    #[test]
    fn test_fatal_errors() {
        let log = new_log();
        let map = FakeMap::new(&log).failing_measure_at(0);
        let mut mgr = ExploreMgr::init(
            test_params(),
            collab(&log, map, FakeNav::new(&log), FakePose::new(&log)),
            None,
        )
        .unwrap();
        assert!(matches!(
            mgr.run(),
            Err(ExploreMgrError::SweepError(SweepError::MeasureFailed { .. }))
        ));
        assert_eq!(count(&log, |c| *c == Call::Pose), 0);

        let log = new_log();
        let map = FakeMap::new(&log).failing_entropy_at(1);
        let mut mgr = ExploreMgr::init(
            test_params(),
            collab(&log, map, FakeNav::new(&log), FakePose::new(&log)),
            None,
        )
        .unwrap();
        assert!(matches!(
            mgr.run(),
            Err(ExploreMgrError::SelectError(SelectError::EntropyFailed { .. }))
        ));
        assert!(nav_goals(&log).is_empty());
    }

    #[test]
    fn test_shutdown() {
        let log = new_log();
        let map = FakeMap::new(&log);
        let mut mgr = ExploreMgr::init(
            test_params(),
            collab(&log, map, FakeNav::new(&log), FakePose::new(&log)),
            None,
        )
        .unwrap();

        mgr.shutdown_handle().store(true, Ordering::Relaxed);
        assert_eq!(mgr.run().unwrap(), ExitReason::Shutdown);
        assert_eq!(mgr.cycle(), 0);
        assert!(log.borrow().is_empty());

        // Shutting down centres the head
        mgr.shutdown().unwrap();
        let centre = comms_if::eqpt::ptu::PtuDems::new(0.0, 0.0, 1.0);
        assert_eq!(*log.borrow(), vec![Call::Ptu(centre)]);
    }

    #[test]
    fn test_shutdown_during_sweep() {
        let log = new_log();
        let monitor = PtuMonitor::default();
        let collab = Collaborators {
            map: Box::new(FakeMap::new(&log).watching(&monitor)),
            ptu: Box::new(FakePtu::new(&log, &monitor).silent()),
            nav: Box::new(FakeNav::new(&log)),
            pose: Box::new(FakePose::new(&log)),
            monitor,
        };
        let mut mgr = ExploreMgr::init(
            ExploreParams {
                sweep: SweepParams {
                    settle_wait_s: 0.01,
                    max_settle_wait_s: None,
                    ..Default::default()
                },
                ..test_params()
            },
            collab,
            None,
        )
        .unwrap();
        mgr.stop_on_interrupt().unwrap();

        // The head never settles, so only the flag can end the run
        let shutdown = mgr.shutdown_handle();
        let setter = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(50));
            shutdown.store(true, Ordering::SeqCst);
        });

        assert_eq!(mgr.run().unwrap(), ExitReason::Shutdown);
        setter.join().unwrap();
        assert_eq!(mgr.cycle(), 1);
        assert_eq!(count(&log, |c| matches!(c, Call::Measure { .. })), 0);
        assert_eq!(count(&log, |c| *c == Call::Pose), 0);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let log = new_log();
        let mut params = test_params();
        params.sweep.step_rad = 0.0;

        let result = ExploreMgr::init(
            params,
            collab(&log, FakeMap::new(&log), FakeNav::new(&log), FakePose::new(&log)),
            None,
        );
        assert!(matches!(result, Err(ExploreMgrError::InvalidParams(_))));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_cycle_reports_saved() {
        let root = tempfile::tempdir().unwrap();
        let session = Session::new_in(root.path(), "explore_test", "sessions").unwrap();
        let session_root = session.session_root.clone();

        let log = new_log();
        let map = FakeMap::new(&log).with_entropies(vec![3.0]);
        let mut mgr = ExploreMgr::init(
            ExploreParams {
                max_cycles: Some(1),
                ..test_params()
            },
            collab(&log, map, FakeNav::new(&log), FakePose::new(&log)),
            Some(&session),
        )
        .unwrap();
        mgr.run().unwrap();
        drop(mgr);
        session.exit();

        let saved =
            std::fs::read_to_string(session_root.join("explore/cycle_1.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&saved).unwrap();
        assert_eq!(value["cycle"], 1);
        assert_eq!(value["sweep"]["num_measurements"], 7);
        assert_eq!(value["selected"]["entropy"], 3.0);
        assert_eq!(value["nav_status"], "Succeeded");

        let candidates = std::fs::read_to_string(
            session_root.join("arch").join(crate::select::CANDIDATE_ARCHIVE_PATH),
        )
        .unwrap();
        assert_eq!(candidates.lines().count(), 5);
    }
}
