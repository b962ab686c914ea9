//! # Exploration Simulation
//!
//! This binary runs the exploration loop against in-process simulated collaborators, without
//! requiring the map oracle, the PTU, or the navigation stack. It is designed to allow quick
//! development of the exploration behaviour itself.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::PathBuf;

use color_eyre::{eyre::WrapErr, Result};
use log::{debug, error, info};
use structopt::StructOpt;

use explore_lib::{
    explore_mgr::{ExploreMgr, ExploreParams},
    ptu_mon::PtuMonitor,
    sim::{self, SimParams},
};
use util::{
    logger::{logger_init, parse_level},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "explore_sim", about = "Exploration against a simulated world")]
struct Opt {
    /// Path to the exploration parameters, `params/explore_exec.toml` by default
    #[structopt(short, long, parse(from_os_str))]
    params: Option<PathBuf>,

    /// Number of cycles to run
    #[structopt(short = "n", long, default_value = "20")]
    num_cycles: u64,

    /// Offset into the noise field, generates a different world
    #[structopt(long)]
    offset: Option<f64>,

    /// Minimum level of log messages
    #[structopt(short, long, default_value = "info")]
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
        Session::new("explore_sim", "sessions").wrap_err("Failed to create the session")?;

    logger_init(
        parse_level(&opt.log_level).wrap_err("Invalid log level")?,
        &session,
    )
    .wrap_err("Failed to initialise logging")?;

    info!("Exploration Simulation\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let mut params: ExploreParams = match opt.params {
        Some(ref p) => util::params::load_path(p),
        None => util::params::load("explore_exec.toml"),
    }
    .wrap_err("Could not load exploration params")?;
    params.max_cycles = Some(opt.num_cycles);

    let mut sim_params: SimParams =
        util::params::load("explore_sim.toml").wrap_err("Could not load sim params")?;
    if let Some(offset) = opt.offset {
        sim_params.noise_offset = [offset, offset];
    }

    // ---- EXPLORE ----

    let monitor = PtuMonitor::new(params.sweep.settle_tol_rad);
    let (collab, world) = sim::collaborators(&sim_params, monitor);

    let mut mgr = ExploreMgr::init(params, collab, Some(&session))
        .wrap_err("Failed to initialise the ExploreMgr")?;
    mgr.stop_on_interrupt()
        .wrap_err("Failed to install the interrupt handler")?;

    let result = mgr.run();

    if let Err(e) = mgr.shutdown() {
        error!("Could not centre the PTU on shutdown: {}", e);
    }

    {
        let world = world.borrow();
        info!(
            "Robot finished at ({:.2}, {:.2}) after measuring from {} positions",
            world.robot.x_m,
            world.robot.y_m,
            world.measured.len()
        );
    }

    drop(mgr);
    session.exit();

    let reason = result.wrap_err("Exploration failed")?;
    info!("Exploration ended: {:?}", reason);

    Ok(())
}
