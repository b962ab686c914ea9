//! # Exploration executable entry point.
//!
//! # Architecture
//!
//! The executable connects to the four services the exploration loop relies on and then hands
//! control to the [`ExploreMgr`], which runs until:
//!
//!     - the robot pose cannot be resolved (clean exit),
//!     - the optional cycle limit is reached (clean exit),
//!     - an interrupt is received (clean exit, the PTU is centred),
//!     - a fatal map or PTU failure occurs (error exit).

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::PathBuf;

use color_eyre::{eyre::WrapErr, Result};
use comms_if::net::NetParams;
use log::{debug, error, info};
use structopt::StructOpt;

use explore_lib::{
    clients::{MapClient, NavClient, PoseClient, PtuClient},
    explore_mgr::{Collaborators, ExitReason, ExploreMgr, ExploreParams},
    ptu_mon::PtuMonitor,
};
use util::{
    host,
    logger::{logger_init, parse_level},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "explore_exec", about = "Autonomous exploration executable")]
struct Opt {
    /// Path to the exploration parameters, `params/explore_exec.toml` by default
    #[structopt(short, long, parse(from_os_str))]
    params: Option<PathBuf>,

    /// Stop after this many cycles
    #[structopt(short = "n", long)]
    max_cycles: Option<u64>,

    /// Minimum level of log messages
    #[structopt(short, long, default_value = "debug")]
    log_level: String,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let session =
        Session::new("explore_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(
        parse_level(&opt.log_level).wrap_err("Invalid log level")?,
        &session,
    )
    .wrap_err("Failed to initialise logging")?;

    info!("Exploration Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let mut params: ExploreParams = match opt.params {
        Some(ref p) => util::params::load_path(p),
        None => util::params::load("explore_exec.toml"),
    }
    .wrap_err("Could not load exploration params")?;

    if opt.max_cycles.is_some() {
        params.max_cycles = opt.max_cycles;
    }

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = comms_if::net::zmq::Context::new();
    let monitor = PtuMonitor::new(params.sweep.settle_tol_rad);

    let map = MapClient::new(&zmq_ctx, &net_params).wrap_err("Failed to initialise MapClient")?;
    info!("MapClient initialised");

    let ptu = PtuClient::new(&zmq_ctx, &net_params, monitor.clone())
        .wrap_err("Failed to initialise PtuClient")?;
    info!("PtuClient initialised");

    let nav = NavClient::new(&zmq_ctx, &net_params).wrap_err("Failed to initialise NavClient")?;
    info!("NavClient initialised");

    let pose = PoseClient::new(&zmq_ctx, &net_params, params.pose.timeout_s)
        .wrap_err("Failed to initialise PoseClient")?;
    info!("PoseClient initialised");

    info!("Network initialisation complete\n");

    // ---- EXPLORE ----

    let collab = Collaborators {
        map: Box::new(map),
        ptu: Box::new(ptu),
        nav: Box::new(nav),
        pose: Box::new(pose),
        monitor,
    };

    let mut mgr = ExploreMgr::init(params, collab, Some(&session))
        .wrap_err("Failed to initialise the ExploreMgr")?;
    mgr.stop_on_interrupt()
        .wrap_err("Failed to install the interrupt handler")?;

    let result = mgr.run();

    if let Err(e) = mgr.shutdown() {
        error!("Could not centre the PTU on shutdown: {}", e);
    }

    // ---- SHUTDOWN ----

    drop(mgr);
    session.exit();

    match result.wrap_err("Exploration failed")? {
        ExitReason::PoseUnavailable(reason) => {
            info!("Exploration stopped, robot pose unavailable: {}", reason)
        }
        ExitReason::CycleLimit => info!("Exploration complete"),
        ExitReason::Shutdown => info!("Exploration shut down"),
    }

    Ok(())
}
