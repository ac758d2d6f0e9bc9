// Fixed-rate actuation loop with command watchdog
//
// One reactor task: each tick drains pending drive commands and laser sweeps
// (non-blocking), gates the newest command through the watchdog, converts it
// to per-wheel commands, and publishes. Without the watchdog, a crashed
// teleop or controller would leave the vehicle driving its last command.

use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{info, warn};

use crate::config::{RuntimeConfig, TOPIC_CMD_DRIVE, TOPIC_HEALTH, TOPIC_SCAN};
use crate::control::WallFollowController;
use crate::messages::{ControllerHealth, DriveCommand, RangeScan};
use crate::vehicle::{self, ActuatorPublisher, StaticFrameTree, VehicleGeometry, WheelCommands};

/// Two-state freshness gate over the most recent drive command.
///
/// The stored command is never discarded on timeout; a stale cycle publishes
/// a stop, and motion resumes as soon as a fresh command arrives. A timeout
/// of `None` disables staleness entirely.
pub struct Watchdog {
    latest_cmd: Option<DriveCommand>,
    cmd_received_at: Instant,
    timeout: Option<Duration>,
    health: ControllerHealth,
}

impl Watchdog {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            latest_cmd: None,
            cmd_received_at: Instant::now(),
            timeout,
            health: ControllerHealth::CmdStale, // Start stale until first cmd
        }
    }

    /// Record an incoming command and its receipt time.
    pub fn on_command(&mut self, cmd: DriveCommand, now: Instant) {
        self.latest_cmd = Some(cmd);
        self.cmd_received_at = now;
    }

    /// The command the current cycle should actuate.
    pub fn effective_command(&mut self, now: Instant) -> DriveCommand {
        let Some(cmd) = self.latest_cmd else {
            // Nothing ever received
            self.health = ControllerHealth::CmdStale;
            return DriveCommand::stop();
        };

        let stale = self
            .timeout
            .is_some_and(|t| now.duration_since(self.cmd_received_at) > t);
        if stale {
            if self.health != ControllerHealth::CmdStale {
                warn!(
                    "Command stale ({:?} old), stopping vehicle",
                    now.duration_since(self.cmd_received_at)
                );
            }
            self.health = ControllerHealth::CmdStale;
            DriveCommand::stop()
        } else {
            self.health = ControllerHealth::Ok;
            cmd
        }
    }

    pub fn health(&self) -> ControllerHealth {
        self.health
    }
}

pub async fn run(config: RuntimeConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    // Geometry resolution is fatal when it exhausts its retries: the
    // converter cannot run without the vehicle's dimensions.
    let frames = StaticFrameTree::from_config(&config);
    let geometry = VehicleGeometry::resolve_with_retry(
        &frames,
        config.wheel_diameters,
        config.startup.geometry_attempts,
        Duration::from_secs_f64(config.startup.geometry_backoff),
    )
    .await?;
    info!(
        "Vehicle geometry: wheelbase {:.3} m, tracks {:.3}/{:.3} m",
        geometry.wheelbase, geometry.left_track, geometry.right_track
    );

    // Bounded wait for the downstream actuator controllers; blocks startup
    // only, never the steady-state cycle.
    let actuators = ActuatorPublisher::connect(session.clone(), &config).await?;

    info!("Setting up publishers and subscribers...");
    let cmd_sub = session.declare_subscriber(TOPIC_CMD_DRIVE).await?;
    let scan_sub = session.declare_subscriber(TOPIC_SCAN).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut watchdog = Watchdog::new(config.watchdog_timeout());
    let mut wall_follow = WallFollowController::new(config.wall_follow);
    let mut tick = interval(config.publish_period());

    info!(
        "Runtime started: {} Hz loop, watchdog timeout {:?}",
        config.publishing_frequency,
        config.watchdog_timeout()
    );
    info!("Subscribed to: {}, {}", TOPIC_CMD_DRIVE, TOPIC_SCAN);

    loop {
        tick.tick().await;
        let now = Instant::now();

        // 1. Drain pending drive commands (non-blocking), keep latest
        while let Ok(Some(sample)) = cmd_sub.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<DriveCommand>(&payload) {
                Ok(cmd) => watchdog.on_command(cmd, now),
                Err(e) => warn!("Failed to parse drive command: {}", e),
            }
        }

        // 2. Drain laser sweeps; the wall-follow controller sees the latest
        let mut latest_scan: Option<RangeScan> = None;
        while let Ok(Some(sample)) = scan_sub.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<RangeScan>(&payload) {
                Ok(scan) => latest_scan = Some(scan),
                Err(e) => warn!("Failed to parse range scan: {}", e),
            }
        }
        if let Some(scan) = latest_scan {
            // A skipped update (bad samples, clock anomaly) emits nothing;
            // the watchdog keeps gating the previous command.
            if let Some(cmd) = wall_follow.update(&scan) {
                watchdog.on_command(cmd, now);
            }
        }

        // 3. Freshness gate, then kinematic conversion
        let cmd = watchdog.effective_command(now);
        let wheels = match vehicle::convert(cmd, &geometry) {
            Ok(wheels) => wheels,
            Err(e) => {
                // A bad command poisons this cycle only
                warn!("{}; stopping for this cycle", e);
                WheelCommands::stop()
            }
        };

        // 4. Publish actuation + health
        actuators.publish(&wheels).await?;
        let health_json = serde_json::to_string(&watchdog.health())?;
        pub_health.put(health_json).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd() -> DriveCommand {
        DriveCommand::new(2.0, 0.1)
    }

    #[test]
    fn fresh_command_passes_through() {
        let mut wd = Watchdog::new(Some(Duration::from_millis(500)));
        let t0 = Instant::now();
        wd.on_command(cmd(), t0);
        let out = wd.effective_command(t0 + Duration::from_millis(400));
        assert_eq!(out, cmd());
        assert_eq!(wd.health(), ControllerHealth::Ok);
    }

    #[test]
    fn stale_command_stops_the_vehicle() {
        let mut wd = Watchdog::new(Some(Duration::from_millis(500)));
        let t0 = Instant::now();
        wd.on_command(cmd(), t0);
        let out = wd.effective_command(t0 + Duration::from_millis(600));
        assert_eq!(out, DriveCommand::stop());
        assert_eq!(wd.health(), ControllerHealth::CmdStale);
    }

    #[test]
    fn fresh_command_resumes_after_staleness() {
        let mut wd = Watchdog::new(Some(Duration::from_millis(500)));
        let t0 = Instant::now();
        wd.on_command(cmd(), t0);
        let t1 = t0 + Duration::from_secs(10);
        assert_eq!(wd.effective_command(t1), DriveCommand::stop());

        // The stored command was not discarded; a new one re-arms the gate.
        wd.on_command(cmd(), t1);
        assert_eq!(wd.effective_command(t1), cmd());
        assert_eq!(wd.health(), ControllerHealth::Ok);
    }

    #[test]
    fn disabled_watchdog_never_times_out() {
        let mut wd = Watchdog::new(None);
        let t0 = Instant::now();
        wd.on_command(cmd(), t0);
        let out = wd.effective_command(t0 + Duration::from_secs(3600));
        assert_eq!(out, cmd());
        assert_eq!(wd.health(), ControllerHealth::Ok);
    }

    #[test]
    fn no_command_yet_means_stop() {
        let mut wd = Watchdog::new(None);
        assert_eq!(wd.effective_command(Instant::now()), DriveCommand::stop());
        assert_eq!(wd.health(), ControllerHealth::CmdStale);
    }
}
