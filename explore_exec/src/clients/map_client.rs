//! # Map Oracle Client

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::map::{EntropyQuery, MapCmd, MapRep, MapServerError, VisualiseReq},
    net::{self, zmq, MonitoredSocket, MonitoredSocketError, NetParams, RequestError, SocketOptions},
};

use super::MapOracle;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct MapClient {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum MapClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Request to the map oracle failed: {0}")]
    Request(RequestError),

    #[error("The map oracle reported an error: {0}")]
    Server(MapServerError),

    #[error("Unexpected reply from the map oracle: {0:?}")]
    UnexpectedReply(MapRep),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MapClient {
    /// Create a new instance of the map oracle client.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, MapClientError> {
        let socket = MonitoredSocket::new(
            ctx,
            zmq::REQ,
            SocketOptions::req_client(params.map_timeout_ms),
            &params.map_endpoint,
        )
        .map_err(MapClientError::SocketError)?;

        Ok(Self { socket })
    }

    fn exchange(&mut self, cmd: &MapCmd) -> Result<MapRep, MapClientError> {
        let rep: MapRep = net::request(&self.socket, cmd).map_err(MapClientError::Request)?;

        match rep {
            MapRep::Error(e) => Err(MapClientError::Server(e)),
            r => Ok(r),
        }
    }
}

impl MapOracle for MapClient {
    fn measure(&mut self, stamp_s: f64) -> Result<(), MapClientError> {
        match self.exchange(&MapCmd::Measure { stamp_s })? {
            MapRep::MeasureOk => Ok(()),
            r => Err(MapClientError::UnexpectedReply(r)),
        }
    }

    fn entropy(&mut self, query: &EntropyQuery) -> Result<f64, MapClientError> {
        match self.exchange(&MapCmd::Entropy(*query))? {
            MapRep::Entropy(e) => Ok(e),
            r => Err(MapClientError::UnexpectedReply(r)),
        }
    }

    fn visualise(&mut self, req: &VisualiseReq) -> Result<(), MapClientError> {
        match self.exchange(&MapCmd::Visualise(req.clone()))? {
            MapRep::VisualiseOk => Ok(()),
            r => Err(MapClientError::UnexpectedReply(r)),
        }
    }
}
