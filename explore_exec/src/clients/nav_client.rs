//! # Navigation Stack Client
//!
//! Goals are submitted as a single request, the navigation server only replies once the goal has
//! reached a terminal state, so the socket waits without a receive timeout.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::nav::{NavGoal, NavStatus},
    net::{self, zmq, MonitoredSocket, MonitoredSocketError, NetParams, RequestError, SocketOptions},
};

use super::NavStack;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Receive timeout for goal replies, -1 blocks until the goal terminates.
const NAV_RECV_TIMEOUT_MS: i32 = -1;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct NavClient {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum NavClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Request to the navigation stack failed: {0}")]
    Request(RequestError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NavClient {
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, NavClientError> {
        let socket = MonitoredSocket::new(
            ctx,
            zmq::REQ,
            SocketOptions::req_client(NAV_RECV_TIMEOUT_MS),
            &params.nav_endpoint,
        )
        .map_err(NavClientError::SocketError)?;

        Ok(Self { socket })
    }
}

impl NavStack for NavClient {
    fn send_goal_and_wait(&mut self, goal: &NavGoal) -> Result<NavStatus, NavClientError> {
        net::request(&self.socket, goal).map_err(NavClientError::Request)
    }
}
