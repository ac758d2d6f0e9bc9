// Message types exchanged over Zenoh

use serde::{Deserialize, Serialize};

/// High-level drive command from teleop or the wall-follow controller.
///
/// `speed` is signed forward speed in m/s; `steering_angle` is the virtual
/// center-wheel angle in radians, valid in (-PI/2, PI/2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct DriveCommand {
    pub speed: f64,
    pub steering_angle: f64,
}

impl DriveCommand {
    pub fn new(speed: f64, steering_angle: f64) -> Self {
        Self {
            speed,
            steering_angle,
        }
    }

    /// Zero-speed, zero-angle command, substituted when commands go stale.
    pub fn stop() -> Self {
        Self::default()
    }
}

/// One (angle, distance) sample of a laser sweep. Angle is in the vehicle
/// frame (radians, 0 = forward, positive = counter-clockwise), distance in
/// meters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RangeSample {
    pub angle: f64,
    pub distance: f64,
}

/// A single laser sweep. `stamp` is the acquisition time in seconds; the
/// wall-follow controller differentiates its error signal between stamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeScan {
    pub stamp: f64,
    pub samples: Vec<RangeSample>,
}

/// Health status published by the runtime each cycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ControllerHealth {
    Ok,
    CmdStale,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drive_command_accepts_plain_json() {
        // Teleop scripts hand-write this payload; keep the field names stable.
        let cmd: DriveCommand =
            serde_json::from_str(r#"{"speed": 1.5, "steering_angle": -0.2}"#).unwrap();
        assert_eq!(cmd.speed, 1.5);
        assert_eq!(cmd.steering_angle, -0.2);
    }

    #[test]
    fn range_scan_round_trips() {
        let scan = RangeScan {
            stamp: 12.5,
            samples: vec![RangeSample {
                angle: 1.57,
                distance: 0.8,
            }],
        };
        let json = serde_json::to_string(&scan).unwrap();
        let back: RangeScan = serde_json::from_str(&json).unwrap();
        assert_eq!(back.stamp, 12.5);
        assert_eq!(back.samples.len(), 1);
    }

    #[test]
    fn stop_command_is_all_zero() {
        let stop = DriveCommand::stop();
        assert_eq!(stop.speed, 0.0);
        assert_eq!(stop.steering_angle, 0.0);
    }
}
