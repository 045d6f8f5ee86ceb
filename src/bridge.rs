//! The tick loop.
//!
//! A [`Session`] owns everything acquired at startup: the tracking runtime,
//! the device inventory and the UDP socket. Each tick samples every tracked
//! device, packs the samples into one OSC bundle and sends it as a single
//! datagram. A tick that fails to sample or send is dropped and counted; the
//! loop only stops on interrupt or a send error that can't recover.
//!
//! Dropping the session releases the runtime, whichever way the bridge exits.

use crate::config::BridgeConfig;
use crate::controller::{ControllerState, RawControllerState};
use crate::error::{BridgeError, Result, SampleError};
use crate::pose::OpenVRPose;
use crate::sender::{is_fatal_send_error, MessageSender};
use crate::tracking::{
    resolve_controller_roles, ControllerRoles, DeviceClass, DeviceInventory, TrackingSystem,
};
use crate::tracking_messages::{DeviceSample, TrackedObjects};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::sleep;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

pub const CONTROLLER_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Ticks between status lines.
pub const STATUS_LOG_INTERVAL: u64 = 1000;

/// Consecutive skipped ticks between repeated warnings.
pub const FAILURE_LOG_INTERVAL: u64 = 250;

/// Longest single sleep while waiting, so an interrupt is noticed quickly.
const INTERRUPT_POLL: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub enum TickOutcome {
    /// `degraded` counts devices sent with fallback values.
    Sent {
        messages: usize,
        bytes: usize,
        degraded: usize,
    },
    /// Nothing was sent this tick.
    Skipped(SampleError),
}

impl TickOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, TickOutcome::Sent { .. })
    }
}

#[derive(Debug, Default, Eq, PartialEq, Copy, Clone)]
pub struct TickStats {
    pub ticks: u64,
    pub sent: u64,
    pub skipped: u64,
    pub consecutive_skipped: u64,
    /// Controllers sent without a fresh button state.
    pub degraded: u64,
}

/// Samples for one tick, plus the devices that had to fall back.
#[derive(Debug)]
pub struct TickSamples {
    pub objects: TrackedObjects,
    pub degraded: Vec<SampleError>,
}

/// Fixed interval pacing without catch-up.
#[derive(Debug, Copy, Clone)]
pub struct Pacer {
    interval: Duration,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time left to sleep for a tick that started at `started`, `None` once
    /// the tick has used up its interval.
    pub fn remaining(&self, started: Instant, now: Instant) -> Option<Duration> {
        self.interval
            .checked_sub(now.saturating_duration_since(started))
            .filter(|rest| !rest.is_zero())
    }
}

/// Sleep for `duration` unless `running` is cleared first.
fn interruptible_sleep(running: &AtomicBool, duration: Duration) {
    let deadline = Instant::now() + duration;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        sleep((deadline - now).min(INTERRUPT_POLL));
    }
}

pub struct Session<T: TrackingSystem> {
    system: T,
    inventory: DeviceInventory,
    sender: MessageSender,
    config: BridgeConfig,
    pacer: Pacer,
    stats: TickStats,
}

impl<T: TrackingSystem> Session<T> {
    /// Discovers devices once and opens the socket.
    pub fn new(system: T, config: BridgeConfig) -> Result<Self> {
        let inventory = DeviceInventory::discover(&system);
        info!("Discovered {} devices", inventory.len());
        for device in inventory.device_list() {
            info!("  {} (slot {})", device.address(), device.index());
        }
        let sender = MessageSender::new(config.destination).map_err(BridgeError::Socket)?;
        Ok(Self {
            system,
            inventory,
            sender,
            pacer: Pacer::new(config.interval),
            config,
            stats: TickStats::default(),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn stats(&self) -> TickStats {
        self.stats
    }

    /// Read every tracked device once.
    ///
    /// A missing or invalid pose drops the whole tick. A controller without a
    /// button state is still sent, with zeroed extras, and reported in
    /// `degraded`.
    pub fn sample(&self) -> std::result::Result<TickSamples, SampleError> {
        let poses = self.system.poses();
        let mut samples = Vec::new();
        let mut degraded = Vec::new();
        for class in &self.config.track {
            for device in self.inventory.of_class(*class) {
                let index = device.index();
                let tracked = poses
                    .get(index as usize)
                    .ok_or(SampleError::MissingPose { index })?;
                if !tracked.valid {
                    return Err(SampleError::InvalidPose {
                        address: device.address(),
                    });
                }
                let pose = tracked.matrix.to_pose(self.config.mode);
                let controller = if *class == DeviceClass::Controller {
                    let raw = self.system.controller_state(index).unwrap_or_else(|| {
                        degraded.push(SampleError::ControllerState { index });
                        RawControllerState::default()
                    });
                    Some(ControllerState::from(&raw))
                } else {
                    None
                };
                samples.push(DeviceSample::new(device.address(), pose, controller));
            }
        }
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|since| since.as_millis())
            .unwrap_or_default();
        Ok(TickSamples {
            objects: TrackedObjects::new(ts, samples),
            degraded,
        })
    }

    /// One sample, encode and send pass.
    ///
    /// Recoverable failures come back as [`TickOutcome::Skipped`]; `Err` means
    /// the destination can't be sent to at all.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        self.stats.ticks += 1;
        let TickSamples { objects, degraded } = match self.sample() {
            Ok(samples) => samples,
            Err(error) => return Ok(self.skip(error)),
        };
        let payload = match objects.encode() {
            Ok(payload) => payload,
            Err(error) => return Ok(self.skip(error.into())),
        };
        if self.config.echo {
            match serde_json::to_string(&objects) {
                Ok(json) => println!("{}", json),
                Err(error) => debug!("Failed to serialize samples: {}", error),
            }
        }
        match self.sender.send(&payload) {
            Ok(bytes) => {
                if self.stats.consecutive_skipped > 0 {
                    info!(
                        "Sending again after {} skipped ticks",
                        self.stats.consecutive_skipped
                    );
                }
                self.stats.sent += 1;
                self.stats.consecutive_skipped = 0;
                for error in &degraded {
                    self.stats.degraded += 1;
                    if self.stats.degraded == 1 || self.stats.degraded % FAILURE_LOG_INTERVAL == 0 {
                        warn!(
                            "Sent zeroed controller state ({} so far): {}",
                            self.stats.degraded, error
                        );
                    }
                }
                Ok(TickOutcome::Sent {
                    messages: objects.samples().len(),
                    bytes,
                    degraded: degraded.len(),
                })
            }
            Err(error) if is_fatal_send_error(&error) => Err(BridgeError::Send(error)),
            Err(error) => Ok(self.skip(SampleError::Send(error))),
        }
    }

    fn skip(&mut self, error: SampleError) -> TickOutcome {
        self.stats.skipped += 1;
        self.stats.consecutive_skipped += 1;
        let streak = self.stats.consecutive_skipped;
        if streak == 1 || streak % FAILURE_LOG_INTERVAL == 0 {
            warn!("Skipped tick ({} in a row): {}", streak, error);
        }
        TickOutcome::Skipped(error)
    }

    /// Poll controller roles until both hands are known.
    pub fn wait_for_controllers(&self, running: &AtomicBool) -> Result<ControllerRoles> {
        self.wait_for_controllers_every(running, CONTROLLER_RETRY_INTERVAL)
    }

    pub fn wait_for_controllers_every(
        &self,
        running: &AtomicBool,
        retry: Duration,
    ) -> Result<ControllerRoles> {
        loop {
            if !running.load(Ordering::SeqCst) {
                return Err(BridgeError::Interrupted);
            }
            let roles = resolve_controller_roles(&self.system.device_slots());
            if roles.complete() {
                info!(
                    "Controllers ready (left slot {:?}, right slot {:?})",
                    roles.left, roles.right
                );
                return Ok(roles);
            }
            info!("Waiting for controllers...");
            interruptible_sleep(running, retry);
        }
    }

    /// Tick until `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) -> Result<()> {
        self.run_ticks(running, None)
    }

    /// Tick until `running` is cleared or `limit` ticks have run.
    pub fn run_ticks(&mut self, running: &AtomicBool, limit: Option<u64>) -> Result<()> {
        info!(
            "Sending OSC tracking data on {} every {:?}",
            self.sender.destination(),
            self.pacer.interval()
        );
        let mut remaining = limit;
        while running.load(Ordering::SeqCst) && remaining != Some(0) {
            let started = Instant::now();
            self.tick()?;
            if self.stats.ticks % STATUS_LOG_INTERVAL == 0 {
                debug!(
                    "{} ticks, {} sent, {} skipped",
                    self.stats.ticks, self.stats.sent, self.stats.skipped
                );
            }
            remaining = remaining.map(|left| left - 1);
            if let Some(rest) = self.pacer.remaining(started, Instant::now()) {
                sleep(rest);
            }
        }
        Ok(())
    }
}

impl<T: TrackingSystem> Drop for Session<T> {
    fn drop(&mut self) {
        info!(
            "Shutting down after {} ticks ({} sent, {} skipped)",
            self.stats.ticks, self.stats.sent, self.stats.skipped
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleeps_out_the_rest_of_the_interval() {
        let pacer = Pacer::new(Duration::from_millis(4));
        let started = Instant::now();
        let rest = pacer.remaining(started, started + Duration::from_millis(1));
        assert_eq!(rest, Some(Duration::from_millis(3)));
    }

    #[test]
    fn overrun_starts_next_tick_immediately() {
        let pacer = Pacer::new(Duration::from_millis(4));
        let started = Instant::now();
        assert_eq!(pacer.remaining(started, started + Duration::from_millis(4)), None);
        assert_eq!(pacer.remaining(started, started + Duration::from_millis(9)), None);
    }

    #[test]
    fn clock_going_backwards_sleeps_full_interval() {
        let pacer = Pacer::new(Duration::from_millis(4));
        let now = Instant::now();
        let started = now + Duration::from_millis(2);
        assert_eq!(pacer.remaining(started, now), Some(Duration::from_millis(4)));
    }

    #[test]
    fn interruptible_sleep_returns_when_cleared() {
        let running = AtomicBool::new(false);
        let started = Instant::now();
        interruptible_sleep(&running, Duration::from_secs(5));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn outcome_reports_sent() {
        assert!(TickOutcome::Sent {
            messages: 0,
            bytes: 16,
            degraded: 0,
        }
        .is_sent());
        assert!(!TickOutcome::Skipped(SampleError::MissingPose { index: 3 }).is_sent());
    }
}
