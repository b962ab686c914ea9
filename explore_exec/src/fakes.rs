//! # Scripted Collaborators
//!
//! Deterministic implementations of the collaborator traits for tests. Every call made on a fake is
//! appended to a shared [`CallLog`] so that tests can check the order of interactions across all
//! collaborators.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use comms_if::{
    eqpt::{
        map::{EntropyQuery, MapServerError, VisualiseReq},
        nav::{NavGoal, NavStatus},
        ptu::{PtuDems, PtuJointState},
        tf::RobotPose,
    },
    net::RequestError,
};

use crate::{
    clients::{
        MapClientError, MapOracle, NavClientError, NavStack, PoseClientError, PoseResolver,
        PtuActuator, PtuClientError,
    },
    ptu_mon::PtuMonitor,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub type CallLog = Rc<RefCell<Vec<Call>>>;

/// PTU which reports reaching every demand immediately.
pub struct FakePtu {
    log: CallLog,
    monitor: PtuMonitor,
    drop_first: usize,
    silent: bool,
}

pub struct FakeMap {
    log: CallLog,
    monitor: Option<PtuMonitor>,
    entropies: Vec<f64>,
    num_measures: usize,
    num_entropies: usize,
    fail_measure_at: Option<usize>,
    fail_entropy_at: Option<usize>,
    fail_visualise: bool,
}

pub struct FakeNav {
    log: CallLog,
    statuses: VecDeque<NavStatus>,
    disconnected: bool,
}

pub struct FakePose {
    log: CallLog,
    responses: VecDeque<Option<RobotPose>>,
    fallback: Option<RobotPose>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Ptu(PtuDems),

    /// A measurement, recording whether the watched monitor was settled at the time
    Measure { settled: bool },

    Entropy(EntropyQuery),
    Visualise(String),
    Nav(NavGoal),
    Pose,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FakePtu {
    pub fn new(log: &CallLog, monitor: &PtuMonitor) -> Self {
        Self {
            log: log.clone(),
            monitor: monitor.clone(),
            drop_first: 0,
            silent: false,
        }
    }

    /// Give no feedback for the first `n` demands.
    pub fn dropping_first(mut self, n: usize) -> Self {
        self.drop_first = n;
        self
    }

    /// Never give feedback.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }
}

impl PtuActuator for FakePtu {
    fn send_demands(&mut self, dems: &PtuDems) -> Result<(), PtuClientError> {
        self.log.borrow_mut().push(Call::Ptu(*dems));

        if self.drop_first > 0 {
            self.drop_first -= 1;
        } else if !self.silent {
            self.monitor.on_feedback(&PtuJointState::from(dems));
        }

        Ok(())
    }
}

impl FakeMap {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            monitor: None,
            entropies: Vec::new(),
            num_measures: 0,
            num_entropies: 0,
            fail_measure_at: None,
            fail_entropy_at: None,
            fail_visualise: false,
        }
    }

    /// Record the monitor's settle flag with every measurement.
    pub fn watching(mut self, monitor: &PtuMonitor) -> Self {
        self.monitor = Some(monitor.clone());
        self
    }

    /// Entropies returned by successive queries, repeating once exhausted.
    pub fn with_entropies(mut self, entropies: Vec<f64>) -> Self {
        self.entropies = entropies;
        self
    }

    /// Fail the measurement with this zero-based index.
    pub fn failing_measure_at(mut self, index: usize) -> Self {
        self.fail_measure_at = Some(index);
        self
    }

    /// Fail the entropy query with this zero-based index.
    pub fn failing_entropy_at(mut self, index: usize) -> Self {
        self.fail_entropy_at = Some(index);
        self
    }

    pub fn failing_visualise(mut self) -> Self {
        self.fail_visualise = true;
        self
    }

    pub fn num_measures(&self) -> usize {
        self.num_measures
    }
}

impl MapOracle for FakeMap {
    fn measure(&mut self, _stamp_s: f64) -> Result<(), MapClientError> {
        let settled = self.monitor.as_ref().map_or(true, |m| m.is_settled());
        self.log.borrow_mut().push(Call::Measure { settled });

        let index = self.num_measures;
        self.num_measures += 1;

        if self.fail_measure_at == Some(index) {
            return Err(MapClientError::Server(MapServerError::NoView));
        }

        Ok(())
    }

    fn entropy(&mut self, query: &EntropyQuery) -> Result<f64, MapClientError> {
        self.log.borrow_mut().push(Call::Entropy(*query));

        let index = self.num_entropies;
        self.num_entropies += 1;

        if self.fail_entropy_at == Some(index) {
            return Err(MapClientError::Server(MapServerError::OutOfBounds));
        }

        if self.entropies.is_empty() {
            Ok(0.0)
        } else {
            Ok(self.entropies[index % self.entropies.len()])
        }
    }

    fn visualise(&mut self, req: &VisualiseReq) -> Result<(), MapClientError> {
        self.log.borrow_mut().push(Call::Visualise(req.name.clone()));

        if self.fail_visualise {
            return Err(MapClientError::Server(MapServerError::Other(
                "renderer offline".into(),
            )));
        }

        Ok(())
    }
}

impl FakeNav {
    /// A navigation stack reaching every goal.
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            statuses: VecDeque::new(),
            disconnected: false,
        }
    }

    /// Statuses returned for successive goals, succeeding once exhausted.
    pub fn with_statuses(mut self, statuses: Vec<NavStatus>) -> Self {
        self.statuses = statuses.into();
        self
    }

    pub fn disconnected(mut self) -> Self {
        self.disconnected = true;
        self
    }
}

impl NavStack for FakeNav {
    fn send_goal_and_wait(&mut self, goal: &NavGoal) -> Result<NavStatus, NavClientError> {
        self.log.borrow_mut().push(Call::Nav(goal.clone()));

        if self.disconnected {
            return Err(NavClientError::Request(RequestError::NotConnected));
        }

        Ok(self.statuses.pop_front().unwrap_or(NavStatus::Succeeded))
    }
}

impl FakePose {
    /// A resolver always placing the robot at the origin.
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            responses: VecDeque::new(),
            fallback: Some(RobotPose::default()),
        }
    }

    /// Responses for successive lookups, `None` being a failed lookup.
    pub fn with_responses(mut self, responses: Vec<Option<RobotPose>>) -> Self {
        self.responses = responses.into();
        self
    }

    /// Fail every lookup not otherwise scripted.
    pub fn unavailable(mut self) -> Self {
        self.fallback = None;
        self
    }
}

impl PoseResolver for FakePose {
    fn current_pose(
        &mut self,
        _source_frame: &str,
        _target_frame: &str,
        _timeout_s: f64,
    ) -> Result<RobotPose, PoseClientError> {
        self.log.borrow_mut().push(Call::Pose);

        self.responses
            .pop_front()
            .unwrap_or(self.fallback)
            .ok_or_else(|| PoseClientError::Unavailable("no transform to /map".into()))
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

pub fn new_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}
