use anyhow::Result;
use clap::Parser;
use openvr_osc::bridge::Session;
use openvr_osc::config::Args;
use openvr_osc::error::{BridgeError, TrackingError};
use openvr_osc::tracking;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config = Args::parse().into_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    info!("OpenVR OSC v{} starting...", env!("CARGO_PKG_VERSION"));

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))?;
    }

    let system = match tracking::open_runtime() {
        Ok(system) => system,
        Err(error @ TrackingError::Unsupported) => {
            error!("{}", error);
            return Err(error.into());
        }
        Err(error) => return Err(error.into()),
    };
    let mut session = Session::new(system, config)?;

    if session.config().wait_for_controllers {
        match session.wait_for_controllers(&running) {
            Ok(_) => (),
            Err(BridgeError::Interrupted) => {
                info!("Control+C pressed, shutting down...");
                return Ok(());
            }
            Err(error) => return Err(error.into()),
        }
    }

    session.run(&running)?;
    info!("Control+C pressed, shutting down...");
    Ok(())
}
