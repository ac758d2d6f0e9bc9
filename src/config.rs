// Topics, defaults, and validated runtime configuration
//
// Invalid or missing values never abort the process: each field falls back to
// its documented default and the substitution is reported as a warning.

use serde::Deserialize;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

// Zenoh topics
pub const TOPIC_CMD_DRIVE: &str = "ackermann/cmd/drive"; // drive commands
pub const TOPIC_SCAN: &str = "ackermann/sensor/scan"; // laser sweeps
pub const TOPIC_HEALTH: &str = "ackermann/state/health"; // health status

// Frame names understood by the geometry resolver
pub const FRAME_FRONT_LEFT_STEER: &str = "front_left_steer";
pub const FRAME_FRONT_RIGHT_STEER: &str = "front_right_steer";
pub const FRAME_REAR_LEFT_WHEEL: &str = "rear_left_wheel";
pub const FRAME_REAR_RIGHT_WHEEL: &str = "rear_right_wheel";

// Defaults
pub const DEFAULT_PUBLISHING_FREQUENCY: f64 = 30.0; // Hz
pub const DEFAULT_CMD_TIMEOUT: f64 = 0.5; // seconds, 0 disables the watchdog
pub const DEFAULT_WHEEL_DIAMETER: f64 = 0.1; // meters

/// Runtime configuration, deserialized from a JSON file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Actuator publish rate in Hz (> 0)
    pub publishing_frequency: f64,
    /// Watchdog timeout in seconds; 0 disables the watchdog (>= 0)
    pub cmd_timeout: f64,
    /// Per-wheel diameters in meters: [front_left, front_right, rear_left, rear_right]
    pub wheel_diameters: [f64; 4],
    pub controllers: ControllerNames,
    /// Static frame translations relative to the rear-right wheel frame
    pub frames: HashMap<String, [f64; 3]>,
    pub wall_follow: WallFollowConfig,
    pub startup: StartupConfig,
}

/// Actuator controller names. Each controller listens on `<name>/command`
/// and answers readiness queries on `<name>/state`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControllerNames {
    pub front_left_steer: String,
    pub front_right_steer: String,
    pub front_left_wheel: String,
    pub front_right_wheel: String,
    pub rear_left_wheel: String,
    pub rear_right_wheel: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WallFollowConfig {
    /// Proportional gain on the distance error
    pub kp: f64,
    /// Derivative gain on the distance error
    pub kd: f64,
    /// Desired lateral distance to the wall in meters (> 0)
    pub target_distance: f64,
    /// Direction of the wall-distance ray in radians (+PI/2 = left)
    pub side_angle: f64,
    /// Angular width of the extraction window around `side_angle` (> 0)
    pub window: f64,
    /// Steering command clamp in radians, within (0, PI/2)
    pub max_steering_angle: f64,
    /// Forward speed at zero steering (> 0)
    pub max_speed: f64,
    /// Forward speed at full steering lock (0 <= min_speed <= max_speed)
    pub min_speed: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    /// Readiness query attempts per controller before giving up (>= 1)
    pub ready_attempts: u32,
    /// Per-attempt readiness query timeout in seconds (> 0)
    pub ready_timeout: f64,
    /// Frame lookup attempts before aborting startup (>= 1)
    pub geometry_attempts: u32,
    /// Backoff between frame lookup attempts in seconds (>= 0)
    pub geometry_backoff: f64,
}

impl Default for ControllerNames {
    fn default() -> Self {
        Self {
            front_left_steer: "ackermann/ctrl/front_left_steer".into(),
            front_right_steer: "ackermann/ctrl/front_right_steer".into(),
            front_left_wheel: "ackermann/ctrl/front_left_wheel".into(),
            front_right_wheel: "ackermann/ctrl/front_right_wheel".into(),
            rear_left_wheel: "ackermann/ctrl/rear_left_wheel".into(),
            rear_right_wheel: "ackermann/ctrl/rear_right_wheel".into(),
        }
    }
}

impl Default for WallFollowConfig {
    fn default() -> Self {
        Self {
            kp: 5.0,
            kd: 0.25,
            target_distance: 1.0,
            side_angle: PI / 2.0,
            window: PI / 6.0,
            max_steering_angle: 30.0 * PI / 180.0,
            max_speed: 3.5,
            min_speed: 0.3,
        }
    }
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            ready_attempts: 10,
            ready_timeout: 1.0,
            geometry_attempts: 5,
            geometry_backoff: 0.5,
        }
    }
}

fn default_frames() -> HashMap<String, [f64; 3]> {
    HashMap::from([
        (FRAME_REAR_RIGHT_WHEEL.into(), [0.0, 0.0, 0.0]),
        (FRAME_REAR_LEFT_WHEEL.into(), [0.0, 0.2, 0.0]),
        (FRAME_FRONT_LEFT_STEER.into(), [0.26, 0.2, 0.0]),
        (FRAME_FRONT_RIGHT_STEER.into(), [0.26, 0.0, 0.0]),
    ])
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            publishing_frequency: DEFAULT_PUBLISHING_FREQUENCY,
            cmd_timeout: DEFAULT_CMD_TIMEOUT,
            wheel_diameters: [DEFAULT_WHEEL_DIAMETER; 4],
            controllers: ControllerNames::default(),
            frames: default_frames(),
            wall_follow: WallFollowConfig::default(),
            startup: StartupConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from `path`, falling back to defaults on any
    /// read/parse problem, then validate. All warnings are logged here.
    pub fn load(path: Option<&Path>) -> Self {
        let raw = match path {
            Some(p) => match std::fs::read_to_string(p) {
                Ok(text) => match serde_json::from_str::<RuntimeConfig>(&text) {
                    Ok(cfg) => cfg,
                    Err(e) => {
                        warn!("Failed to parse config {}: {}; using defaults", p.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    warn!("Failed to read config {}: {}; using defaults", p.display(), e);
                    Self::default()
                }
            },
            None => Self::default(),
        };

        let (cfg, warnings) = raw.validate();
        for w in &warnings {
            warn!("Config: {}", w);
        }
        cfg
    }

    /// Replace every out-of-range field with its default, collecting a
    /// warning per substitution. The returned configuration is always usable.
    pub fn validate(mut self) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();
        let defaults = Self::default();

        if !(self.publishing_frequency.is_finite() && self.publishing_frequency > 0.0) {
            warnings.push(format!(
                "publishing_frequency {} invalid, using {}",
                self.publishing_frequency, defaults.publishing_frequency
            ));
            self.publishing_frequency = defaults.publishing_frequency;
        }

        if !(self.cmd_timeout.is_finite() && self.cmd_timeout >= 0.0) {
            warnings.push(format!(
                "cmd_timeout {} invalid, using {}",
                self.cmd_timeout, defaults.cmd_timeout
            ));
            self.cmd_timeout = defaults.cmd_timeout;
        }

        for (i, d) in self.wheel_diameters.iter_mut().enumerate() {
            if !(d.is_finite() && *d > 0.0) {
                warnings.push(format!(
                    "wheel_diameters[{}] {} invalid, using {}",
                    i, d, DEFAULT_WHEEL_DIAMETER
                ));
                *d = DEFAULT_WHEEL_DIAMETER;
            }
        }

        for (name, value, default) in [
            ("front_left_steer", &mut self.controllers.front_left_steer, &defaults.controllers.front_left_steer),
            ("front_right_steer", &mut self.controllers.front_right_steer, &defaults.controllers.front_right_steer),
            ("front_left_wheel", &mut self.controllers.front_left_wheel, &defaults.controllers.front_left_wheel),
            ("front_right_wheel", &mut self.controllers.front_right_wheel, &defaults.controllers.front_right_wheel),
            ("rear_left_wheel", &mut self.controllers.rear_left_wheel, &defaults.controllers.rear_left_wheel),
            ("rear_right_wheel", &mut self.controllers.rear_right_wheel, &defaults.controllers.rear_right_wheel),
        ] {
            if value.is_empty() {
                warnings.push(format!("controllers.{} empty, using {}", name, default));
                *value = default.clone();
            }
        }

        for frame in [
            FRAME_FRONT_LEFT_STEER,
            FRAME_FRONT_RIGHT_STEER,
            FRAME_REAR_LEFT_WHEEL,
            FRAME_REAR_RIGHT_WHEEL,
        ] {
            if !self.frames.contains_key(frame) {
                let default = defaults.frames[frame];
                warnings.push(format!("frames.{} missing, using {:?}", frame, default));
                self.frames.insert(frame.into(), default);
            }
        }

        let wf = &mut self.wall_follow;
        let wd = defaults.wall_follow;
        if !wf.kp.is_finite() {
            warnings.push(format!("wall_follow.kp {} invalid, using {}", wf.kp, wd.kp));
            wf.kp = wd.kp;
        }
        if !wf.kd.is_finite() {
            warnings.push(format!("wall_follow.kd {} invalid, using {}", wf.kd, wd.kd));
            wf.kd = wd.kd;
        }
        if !(wf.target_distance.is_finite() && wf.target_distance > 0.0) {
            warnings.push(format!(
                "wall_follow.target_distance {} invalid, using {}",
                wf.target_distance, wd.target_distance
            ));
            wf.target_distance = wd.target_distance;
        }
        if !wf.side_angle.is_finite() || wf.side_angle.abs() > PI {
            warnings.push(format!(
                "wall_follow.side_angle {} invalid, using {}",
                wf.side_angle, wd.side_angle
            ));
            wf.side_angle = wd.side_angle;
        }
        if !(wf.window.is_finite() && wf.window > 0.0) {
            warnings.push(format!(
                "wall_follow.window {} invalid, using {}",
                wf.window, wd.window
            ));
            wf.window = wd.window;
        }
        if !(wf.max_steering_angle.is_finite()
            && wf.max_steering_angle > 0.0
            && wf.max_steering_angle < PI / 2.0)
        {
            warnings.push(format!(
                "wall_follow.max_steering_angle {} invalid, using {}",
                wf.max_steering_angle, wd.max_steering_angle
            ));
            wf.max_steering_angle = wd.max_steering_angle;
        }
        if !(wf.max_speed.is_finite() && wf.max_speed > 0.0) {
            warnings.push(format!(
                "wall_follow.max_speed {} invalid, using {}",
                wf.max_speed, wd.max_speed
            ));
            wf.max_speed = wd.max_speed;
        }
        if !(wf.min_speed.is_finite() && wf.min_speed >= 0.0 && wf.min_speed <= wf.max_speed) {
            warnings.push(format!(
                "wall_follow.min_speed {} invalid, using {}",
                wf.min_speed, wd.min_speed
            ));
            wf.min_speed = wd.min_speed.min(wf.max_speed);
        }

        let st = &mut self.startup;
        let sd = defaults.startup;
        if st.ready_attempts == 0 {
            warnings.push(format!("startup.ready_attempts 0, using {}", sd.ready_attempts));
            st.ready_attempts = sd.ready_attempts;
        }
        if !(st.ready_timeout.is_finite() && st.ready_timeout > 0.0) {
            warnings.push(format!(
                "startup.ready_timeout {} invalid, using {}",
                st.ready_timeout, sd.ready_timeout
            ));
            st.ready_timeout = sd.ready_timeout;
        }
        if st.geometry_attempts == 0 {
            warnings.push(format!(
                "startup.geometry_attempts 0, using {}",
                sd.geometry_attempts
            ));
            st.geometry_attempts = sd.geometry_attempts;
        }
        if !(st.geometry_backoff.is_finite() && st.geometry_backoff >= 0.0) {
            warnings.push(format!(
                "startup.geometry_backoff {} invalid, using {}",
                st.geometry_backoff, sd.geometry_backoff
            ));
            st.geometry_backoff = sd.geometry_backoff;
        }

        (self, warnings)
    }

    /// Publish cycle period derived from `publishing_frequency`.
    pub fn publish_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.publishing_frequency)
    }

    /// Watchdog timeout, `None` when the watchdog is disabled.
    pub fn watchdog_timeout(&self) -> Option<Duration> {
        if self.cmd_timeout > 0.0 {
            Some(Duration::from_secs_f64(self.cmd_timeout))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_clean() {
        let (_, warnings) = RuntimeConfig::default().validate();
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    }

    #[test]
    fn invalid_values_fall_back_with_warnings() {
        let mut cfg = RuntimeConfig::default();
        cfg.publishing_frequency = -5.0;
        cfg.cmd_timeout = f64::NAN;
        cfg.wheel_diameters[2] = 0.0;
        cfg.wall_follow.max_steering_angle = PI; // out of (0, PI/2)
        cfg.wall_follow.min_speed = 100.0; // above max_speed

        let (cfg, warnings) = cfg.validate();
        assert_eq!(warnings.len(), 5);
        assert_eq!(cfg.publishing_frequency, DEFAULT_PUBLISHING_FREQUENCY);
        assert_eq!(cfg.cmd_timeout, DEFAULT_CMD_TIMEOUT);
        assert_eq!(cfg.wheel_diameters[2], DEFAULT_WHEEL_DIAMETER);
        assert!(cfg.wall_follow.max_steering_angle < PI / 2.0);
        assert!(cfg.wall_follow.min_speed <= cfg.wall_follow.max_speed);
    }

    #[test]
    fn zero_timeout_disables_watchdog() {
        let mut cfg = RuntimeConfig::default();
        cfg.cmd_timeout = 0.0;
        let (cfg, warnings) = cfg.validate();
        assert!(warnings.is_empty());
        assert!(cfg.watchdog_timeout().is_none());
    }

    #[test]
    fn missing_frames_are_restored() {
        let mut cfg = RuntimeConfig::default();
        cfg.frames.remove(FRAME_FRONT_LEFT_STEER);
        let (cfg, warnings) = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert!(cfg.frames.contains_key(FRAME_FRONT_LEFT_STEER));
    }

    #[test]
    fn partial_json_uses_field_defaults() {
        let cfg: RuntimeConfig =
            serde_json::from_str(r#"{"publishing_frequency": 50.0}"#).unwrap();
        assert_eq!(cfg.publishing_frequency, 50.0);
        assert_eq!(cfg.cmd_timeout, DEFAULT_CMD_TIMEOUT);
        assert_eq!(cfg.wall_follow.kp, 5.0);
    }
}
