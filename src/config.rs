use crate::error::{BridgeError, Result};
use crate::pose::PoseMode;
use crate::tracking::DeviceClass;
use clap::{Parser, ValueEnum};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

pub const DEFAULT_FREQUENCY_HZ: u32 = 250;

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Euler,
    Quaternion,
}

impl From<ModeArg> for PoseMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Euler => PoseMode::Euler,
            ModeArg::Quaternion => PoseMode::Quaternion,
        }
    }
}

/// Forward OpenVR tracking data as OSC bundles over UDP
#[derive(Parser, Debug)]
#[command(version, author = "David M. W. <dweis7@gmail.com>")]
pub struct Args {
    /// IP of the OSC server
    #[arg(long, default_value = "127.0.0.1")]
    pub ip: IpAddr,

    /// Port the OSC server is listening on
    #[arg(long, default_value_t = 7000)]
    pub port: u16,

    /// Devices to track (hmd, tracker, controller, "tracking reference")
    #[arg(long, num_args = 0.., default_values_t = [DeviceClass::HMD, DeviceClass::Tracker, DeviceClass::Controller])]
    pub track: Vec<DeviceClass>,

    /// Tracking frequency in Hz
    #[arg(long, default_value_t = DEFAULT_FREQUENCY_HZ)]
    pub freq: u32,

    /// Send orientation as euler angles or quaternions
    #[arg(long, value_enum, default_value_t = ModeArg::Euler)]
    pub mode: ModeArg,

    /// Start sending without waiting for both hand controllers
    #[arg(long)]
    pub no_wait_controllers: bool,

    /// Print every tick's samples as a JSON line
    #[arg(long)]
    pub echo: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    pub destination: SocketAddr,
    /// Classes to sample, in send order.
    pub track: Vec<DeviceClass>,
    pub interval: Duration,
    pub mode: PoseMode,
    pub wait_for_controllers: bool,
    pub echo: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            destination: SocketAddr::from(([127, 0, 0, 1], 7000)),
            track: vec![DeviceClass::HMD, DeviceClass::Tracker, DeviceClass::Controller],
            interval: interval_for(DEFAULT_FREQUENCY_HZ),
            mode: PoseMode::Euler,
            wait_for_controllers: true,
            echo: false,
        }
    }
}

pub fn interval_for(frequency_hz: u32) -> Duration {
    Duration::from_nanos(1_000_000_000 / u64::from(frequency_hz.max(1)))
}

impl Args {
    pub fn into_config(self) -> Result<BridgeConfig> {
        if self.freq == 0 {
            return Err(BridgeError::Config("--freq must be greater than 0".into()));
        }
        let mut track = Vec::with_capacity(self.track.len());
        for class in self.track {
            if !track.contains(&class) {
                track.push(class);
            }
        }
        Ok(BridgeConfig {
            destination: SocketAddr::new(self.ip, self.port),
            track,
            interval: interval_for(self.freq),
            mode: self.mode.into(),
            wait_for_controllers: !self.no_wait_controllers,
            echo: self.echo,
        })
    }
}
