//! # Simulated Collaborators
//!
//! In-process stand-ins for the external services, used by the `explore_sim` executable to run the
//! exploration loop without any hardware or mapping service.
//!
//! The entropy of the simulated world is a Perlin noise field over the ground plane. Every
//! measurement taken at a position suppresses the entropy around that position, so the robot is
//! drawn away from areas it has already observed. The PTU reaches every demand instantly and the
//! navigation stack teleports the robot to any goal within the world bounds.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{cell::RefCell, rc::Rc};

use comms_if::eqpt::{
    map::{EntropyQuery, VisualiseReq},
    nav::{NavGoal, NavStatus},
    ptu::{PtuDems, PtuJointState},
    tf::RobotPose,
};
use log::{debug, trace};
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::{
    clients::{
        MapClientError, MapOracle, NavClientError, NavStack, PoseClientError, PoseResolver,
        PtuActuator, PtuClientError,
    },
    explore_mgr::Collaborators,
    ptu_mon::PtuMonitor,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Spatial frequency of the entropy field
    pub noise_scale: f64,

    /// Offset into the noise field, changes the world without changing its character
    pub noise_offset: [f64; 2],

    /// Entropy of the most informative unobserved point
    pub peak_entropy: f64,

    /// Half width of the square world, goals outside it are aborted
    pub half_width_m: f64,

    /// Radius around a measurement within which entropy is suppressed
    pub observed_radius_m: f64,

    pub start_pose: RobotPose,
}

/// State shared by the simulated collaborators.
#[derive(Debug, Default)]
pub struct World {
    pub robot: RobotPose,

    /// Robot positions at which measurements were taken
    pub measured: Vec<RobotPose>,
}

pub struct SimMap {
    params: SimParams,
    world: Rc<RefCell<World>>,
    perlin: Perlin,
}

pub struct SimPtu {
    monitor: PtuMonitor,
}

pub struct SimNav {
    params: SimParams,
    world: Rc<RefCell<World>>,
}

pub struct SimPose {
    world: Rc<RefCell<World>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            noise_scale: 0.15,
            noise_offset: [0.0, 0.0],
            peak_entropy: 100.0,
            half_width_m: 10.0,
            observed_radius_m: 3.0,
            start_pose: RobotPose::default(),
        }
    }
}

impl SimParams {
    fn in_bounds(&self, x_m: f64, y_m: f64) -> bool {
        x_m.abs() <= self.half_width_m && y_m.abs() <= self.half_width_m
    }
}

impl SimMap {
    fn base_entropy(&self, x_m: f64, y_m: f64) -> f64 {
        let n = self.perlin.get([
            x_m * self.params.noise_scale + self.params.noise_offset[0],
            y_m * self.params.noise_scale + self.params.noise_offset[1],
        ]);

        // Perlin output is within [-1, 1]
        (n + 1.0) * 0.5 * self.params.peak_entropy
    }
}

impl MapOracle for SimMap {
    fn measure(&mut self, _stamp_s: f64) -> Result<(), MapClientError> {
        let mut world = self.world.borrow_mut();
        let robot = world.robot;

        if !world.measured.contains(&robot) {
            debug!("Sim: observed around ({:.2}, {:.2})", robot.x_m, robot.y_m);
            world.measured.push(robot);
        }

        Ok(())
    }

    fn entropy(&mut self, query: &EntropyQuery) -> Result<f64, MapClientError> {
        if !self.params.in_bounds(query.x_m, query.y_m) {
            return Ok(0.0);
        }

        let radius_m = self.params.observed_radius_m;
        let observed = self
            .world
            .borrow()
            .measured
            .iter()
            .map(|m| ((m.x_m - query.x_m).powi(2) + (m.y_m - query.y_m).powi(2)).sqrt())
            .fold(1.0, |f, d| f * (d / radius_m).min(1.0));

        Ok(self.base_entropy(query.x_m, query.y_m) * observed)
    }

    fn visualise(&mut self, req: &VisualiseReq) -> Result<(), MapClientError> {
        trace!(
            "Sim: visualise \"{}\" [{}, {}]",
            req.name,
            req.min_prob,
            req.max_prob
        );
        Ok(())
    }
}

impl PtuActuator for SimPtu {
    fn send_demands(&mut self, dems: &PtuDems) -> Result<(), PtuClientError> {
        self.monitor.on_feedback(&PtuJointState::from(dems));
        Ok(())
    }
}

impl NavStack for SimNav {
    fn send_goal_and_wait(&mut self, goal: &NavGoal) -> Result<NavStatus, NavClientError> {
        let (x_m, y_m) = (goal.position_m[0], goal.position_m[1]);

        if !self.params.in_bounds(x_m, y_m) {
            return Ok(NavStatus::Aborted);
        }

        self.world.borrow_mut().robot = RobotPose::new(x_m, y_m);
        Ok(NavStatus::Succeeded)
    }
}

impl PoseResolver for SimPose {
    fn current_pose(
        &mut self,
        _source_frame: &str,
        _target_frame: &str,
        _timeout_s: f64,
    ) -> Result<RobotPose, PoseClientError> {
        Ok(self.world.borrow().robot)
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build a full set of simulated collaborators sharing one world, which is also returned.
pub fn collaborators(
    params: &SimParams,
    monitor: PtuMonitor,
) -> (Collaborators, Rc<RefCell<World>>) {
    let world = Rc::new(RefCell::new(World {
        robot: params.start_pose,
        measured: Vec::new(),
    }));

    let collab = Collaborators {
        map: Box::new(SimMap {
            params: params.clone(),
            world: world.clone(),
            perlin: Perlin::new(),
        }),
        ptu: Box::new(SimPtu {
            monitor: monitor.clone(),
        }),
        nav: Box::new(SimNav {
            params: params.clone(),
            world: world.clone(),
        }),
        pose: Box::new(SimPose {
            world: world.clone(),
        }),
        monitor,
    };

    (collab, world)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::explore_mgr::{ExitReason, ExploreMgr, ExploreParams};

    fn query(x_m: f64, y_m: f64) -> EntropyQuery {
        EntropyQuery {
            x_m,
            y_m,
            z_m: 1.69,
            radius_m: 4.0,
            time_horizon_s: 0.0,
        }
    }

    #[test]
    fn test_observation_suppresses_entropy() {
        let params = SimParams::default();
        let (mut collab, world) = collaborators(&params, PtuMonitor::default());

        // Somewhere off the integer lattice where Perlin noise is zero
        let before = collab.map.entropy(&query(0.5, 0.3)).unwrap();
        assert!(before > 0.0);
        assert!(before <= params.peak_entropy);

        collab.map.measure(0.0).unwrap();
        collab.map.measure(0.0).unwrap();
        assert_eq!(world.borrow().measured.len(), 1);

        let after = collab.map.entropy(&query(0.5, 0.3)).unwrap();
        assert!(after < before);

        // Outside the world nothing is left to learn
        assert_eq!(collab.map.entropy(&query(50.0, 0.0)).unwrap(), 0.0);
    }

    #[test]
    fn test_nav_bounds() {
        let params = SimParams::default();
        let (mut collab, world) = collaborators(&params, PtuMonitor::default());

        assert_eq!(
            collab
                .nav
                .send_goal_and_wait(&NavGoal::new("/map", 2.0, -1.0))
                .unwrap(),
            NavStatus::Succeeded
        );
        assert_eq!(world.borrow().robot, RobotPose::new(2.0, -1.0));

        assert_eq!(
            collab
                .nav
                .send_goal_and_wait(&NavGoal::new("/map", 20.0, 0.0))
                .unwrap(),
            NavStatus::Aborted
        );
        assert_eq!(
            collab.pose.current_pose("/base_link", "/map", 1.0).unwrap(),
            RobotPose::new(2.0, -1.0)
        );
    }

    #[test]
    fn test_sim_exploration() {
        let monitor = PtuMonitor::default();
        let (collab, world) = collaborators(&SimParams::default(), monitor);

        let mut mgr = ExploreMgr::init(
            ExploreParams {
                max_cycles: Some(3),
                ..Default::default()
            },
            collab,
            None,
        )
        .unwrap();

        assert_eq!(mgr.run().unwrap(), ExitReason::CycleLimit);

        // Each cycle measured from a new position
        assert_eq!(world.borrow().measured.len(), 3);
    }
}
