//! # Pan-Tilt Unit Client
//!
//! Demands are published to the PTU driver, joint states are received on a subscriber socket
//! serviced by a background thread which feeds every report into the shared [`PtuMonitor`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use comms_if::{
    eqpt::ptu::{PtuDems, PtuJointState},
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};
use log::{debug, error, warn};

use super::PtuActuator;
use crate::ptu_mon::PtuMonitor;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct PtuClient {
    dems_socket: MonitoredSocket,

    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum PtuClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("The client is not connected to the PTU driver")]
    NotConnected,

    #[error("Could not send demands to the PTU driver: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialize the demands: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PtuClient {
    /// Create a new PTU client, starting the feedback thread which updates `monitor`.
    pub fn new(
        ctx: &zmq::Context,
        params: &NetParams,
        monitor: PtuMonitor,
    ) -> Result<Self, PtuClientError> {
        let dems_socket_options = SocketOptions {
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            send_timeout: 10,
            ..Default::default()
        };
        let state_socket_options = SocketOptions {
            connect_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            conflate: true,
            ..Default::default()
        };

        let dems_socket = MonitoredSocket::new(
            ctx,
            zmq::PUB,
            dems_socket_options,
            &params.ptu_dems_endpoint,
        )
        .map_err(PtuClientError::SocketError)?;
        let state_socket = MonitoredSocket::new(
            ctx,
            zmq::SUB,
            state_socket_options,
            &params.ptu_state_endpoint,
        )
        .map_err(PtuClientError::SocketError)?;

        let bg_run = Arc::new(AtomicBool::new(true));
        let bg_run_clone = bg_run.clone();

        let bg_jh = Some(thread::spawn(move || {
            bg_thread(state_socket, bg_run_clone, monitor)
        }));

        Ok(Self {
            dems_socket,
            bg_jh,
            bg_run,
        })
    }
}

impl PtuActuator for PtuClient {
    fn send_demands(&mut self, dems: &PtuDems) -> Result<(), PtuClientError> {
        if !self.dems_socket.connected() {
            return Err(PtuClientError::NotConnected);
        }

        let dems_str = serde_json::to_string(dems).map_err(PtuClientError::SerializationError)?;

        self.dems_socket
            .send(&dems_str, 0)
            .map_err(PtuClientError::SendError)
    }
}

impl Drop for PtuClient {
    fn drop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            jh.join().ok();
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Background thread, passes every joint state published by the driver to the monitor.
fn bg_thread(socket: MonitoredSocket, run: Arc<AtomicBool>, monitor: PtuMonitor) {
    while run.load(Ordering::Relaxed) {
        let msg = match socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => {
                warn!("Non UTF-8 message from the PTU driver");
                continue;
            }
            Err(zmq::Error::EAGAIN) => continue,
            Err(e) => {
                error!("Error receiving joint state from the PTU driver: {:?}", e);
                break;
            }
        };

        let state: PtuJointState = match serde_json::from_str(&msg) {
            Ok(s) => s,
            Err(e) => {
                warn!("Error deserialising joint state from the PTU driver: {:?}", e);
                continue;
            }
        };

        monitor.on_feedback(&state);
    }

    debug!("PTU feedback thread stopped");
}
