use std::io;
use thiserror::Error;

/// Failures talking to the tracking runtime.
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("failed to initialise tracking runtime: {0}")]
    Init(String),
    #[error("built without OpenVR support, rebuild with `cargo build --features openvr`")]
    Unsupported,
}

/// A single tick could not be sampled, encoded or sent.
///
/// These never stop the bridge. Most drop the tick; a missing controller
/// state only zeroes that controller's extras.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("pose for {address} is not valid")]
    InvalidPose { address: String },
    #[error("no pose reported for slot {index}")]
    MissingPose { index: u32 },
    #[error("controller state unavailable for slot {index}")]
    ControllerState { index: u32 },
    #[error("failed to encode bundle: {0}")]
    Encode(#[from] rosc::OscError),
    #[error("failed to send bundle: {0}")]
    Send(#[source] io::Error),
}

/// Errors that end the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Tracking(#[from] TrackingError),
    #[error("failed to set up UDP socket: {0}")]
    Socket(#[source] io::Error),
    #[error("cannot send to destination: {0}")]
    Send(#[source] io::Error),
    #[error("interrupted")]
    Interrupted,
}

pub type Result<T> = std::result::Result<T, BridgeError>;
