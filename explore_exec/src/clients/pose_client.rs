//! # Pose Resolver Client

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::tf::{PoseRep, PoseRequest, RobotPose},
    net::{self, zmq, MonitoredSocket, MonitoredSocketError, NetParams, RequestError, SocketOptions},
};

use super::PoseResolver;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Time allowed on top of the lookup timeout for the reply to arrive.
const REPLY_MARGIN_MS: i32 = 1000;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct PoseClient {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum PoseClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Request to the pose resolver failed: {0}")]
    Request(RequestError),

    #[error("The transform is unavailable: {0}")]
    Unavailable(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PoseClient {
    /// Create a new pose client. Replies are awaited for `lookup_timeout_s` plus a margin.
    pub fn new(
        ctx: &zmq::Context,
        params: &NetParams,
        lookup_timeout_s: f64,
    ) -> Result<Self, PoseClientError> {
        let recv_timeout_ms = reply_timeout_ms(lookup_timeout_s);

        let socket = MonitoredSocket::new(
            ctx,
            zmq::REQ,
            SocketOptions::req_client(recv_timeout_ms),
            &params.pose_endpoint,
        )
        .map_err(PoseClientError::SocketError)?;

        Ok(Self { socket })
    }
}

impl PoseResolver for PoseClient {
    fn current_pose(
        &mut self,
        source_frame: &str,
        target_frame: &str,
        timeout_s: f64,
    ) -> Result<RobotPose, PoseClientError> {
        let req = PoseRequest {
            source_frame: source_frame.into(),
            target_frame: target_frame.into(),
            timeout_s,
        };

        match net::request(&self.socket, &req).map_err(PoseClientError::Request)? {
            PoseRep::Pose(p) => Ok(p),
            PoseRep::Unavailable(reason) => Err(PoseClientError::Unavailable(reason)),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Time to wait for a reply to a lookup which may itself block for `lookup_timeout_s`.
fn reply_timeout_ms(lookup_timeout_s: f64) -> i32 {
    ((lookup_timeout_s * 1000.0).max(0.0) as i32).saturating_add(REPLY_MARGIN_MS)
}
