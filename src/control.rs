// Wall-follow PD controller
//
// Turns a laser sweep into a (speed, steering angle) drive command that
// holds a target lateral distance to the wall. Proportional plus derivative
// action on the distance error; forward speed tapers linearly with steering
// effort so the vehicle slows down through corrections.

use tracing::{debug, warn};

use crate::config::WallFollowConfig;
use crate::messages::{DriveCommand, RangeScan};

pub struct WallFollowController {
    config: WallFollowConfig,
    previous_error: f64,
    last_stamp: Option<f64>,
}

impl WallFollowController {
    pub fn new(config: WallFollowConfig) -> Self {
        Self {
            config,
            previous_error: 0.0,
            last_stamp: None,
        }
    }

    /// Process one sweep. Returns `None` without touching controller state
    /// when the sweep carries no usable sample or its stamp does not advance
    /// (clock anomaly); a skipped tick must not poison the derivative.
    pub fn update(&mut self, scan: &RangeScan) -> Option<DriveCommand> {
        let Some(distance) = self.wall_distance(scan) else {
            warn!("No valid range samples in window, skipping update");
            return None;
        };

        let error = self.config.target_distance - distance;

        let derivative = match self.last_stamp {
            Some(prev_stamp) => {
                let dt = scan.stamp - prev_stamp;
                if !(dt.is_finite() && dt > 0.0) {
                    warn!("Non-positive scan dt {}, skipping update", dt);
                    return None;
                }
                (error - self.previous_error) / dt
            }
            // First sweep: no history to differentiate against
            None => 0.0,
        };

        let max = self.config.max_steering_angle;
        let steering_angle =
            (self.config.kp * error + self.config.kd * derivative).clamp(-max, max);
        let speed = self.speed_for(steering_angle);

        self.previous_error = error;
        self.last_stamp = Some(scan.stamp);

        debug!(
            "Wall follow: d={:.3} e={:.3} de={:.3} -> angle={:.3} speed={:.2}",
            distance, error, derivative, steering_angle, speed
        );
        Some(DriveCommand::new(speed, steering_angle))
    }

    /// Representative lateral wall distance: the closest valid return within
    /// the configured angular window around the side ray.
    fn wall_distance(&self, scan: &RangeScan) -> Option<f64> {
        let half_window = self.config.window / 2.0;
        scan.samples
            .iter()
            .filter(|s| (s.angle - self.config.side_angle).abs() <= half_window)
            .filter(|s| s.distance.is_finite() && s.distance > 0.0)
            .map(|s| s.distance)
            .fold(None, |best, d| Some(best.map_or(d, |b: f64| b.min(d))))
    }

    /// Speed policy: full speed when driving straight, tapering linearly to
    /// `min_speed` at full steering lock.
    fn speed_for(&self, steering_angle: f64) -> f64 {
        let ratio = steering_angle.abs() / self.config.max_steering_angle;
        self.config.max_speed - (self.config.max_speed - self.config.min_speed) * ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::RangeSample;
    use std::f64::consts::PI;

    const EPSILON: f64 = 1e-9;

    fn config(kp: f64, kd: f64) -> WallFollowConfig {
        WallFollowConfig {
            kp,
            kd,
            target_distance: 1.0,
            side_angle: PI / 2.0,
            window: PI / 6.0,
            max_steering_angle: 1.5, // wide clamp so gains are observable
            max_speed: 3.5,
            min_speed: 0.3,
        }
    }

    fn side_scan(stamp: f64, distance: f64) -> RangeScan {
        RangeScan {
            stamp,
            samples: vec![RangeSample {
                angle: PI / 2.0,
                distance,
            }],
        }
    }

    #[test]
    fn proportional_only_tracking_sequence() {
        // target 1.0, kp 2.0, kd 0: distances [1.0, 0.5, 1.5] must steer
        // [0.0, +1.0, -1.0] (closer than target steers away).
        let mut ctrl = WallFollowController::new(config(2.0, 0.0));
        let expected = [0.0, 1.0, -1.0];
        for (i, d) in [1.0, 0.5, 1.5].into_iter().enumerate() {
            let cmd = ctrl.update(&side_scan(i as f64, d)).unwrap();
            assert!(
                (cmd.steering_angle - expected[i]).abs() < EPSILON,
                "step {}: got {}, want {}",
                i,
                cmd.steering_angle,
                expected[i]
            );
        }
    }

    #[test]
    fn derivative_uses_scan_stamps() {
        // kp 0, kd 1: steering equals the error slope between stamps.
        let mut ctrl = WallFollowController::new(config(0.0, 1.0));
        ctrl.update(&side_scan(0.0, 1.0)).unwrap(); // e = 0
        let cmd = ctrl.update(&side_scan(2.0, 0.5)).unwrap(); // e = 0.5 over 2 s
        assert!((cmd.steering_angle - 0.25).abs() < EPSILON);
    }

    #[test]
    fn non_advancing_stamp_skips_and_preserves_state() {
        let mut ctrl = WallFollowController::new(config(0.0, 1.0));
        ctrl.update(&side_scan(1.0, 1.0)).unwrap(); // e = 0
        assert!(ctrl.update(&side_scan(1.0, 0.0)).is_none()); // dt = 0
        assert!(ctrl.update(&side_scan(0.5, 0.0)).is_none()); // dt < 0
        // previous_error must still be the value from t=1.0
        let cmd = ctrl.update(&side_scan(2.0, 0.5)).unwrap(); // e 0 -> 0.5 over 1 s
        assert!((cmd.steering_angle - 0.5).abs() < EPSILON);
    }

    #[test]
    fn empty_or_garbage_scan_is_skipped() {
        let mut ctrl = WallFollowController::new(config(2.0, 0.0));
        let empty = RangeScan {
            stamp: 0.0,
            samples: vec![],
        };
        assert!(ctrl.update(&empty).is_none());

        let garbage = RangeScan {
            stamp: 1.0,
            samples: vec![
                RangeSample {
                    angle: PI / 2.0,
                    distance: f64::INFINITY,
                },
                RangeSample {
                    angle: PI / 2.0,
                    distance: -2.0,
                },
                // Valid reading but outside the side window
                RangeSample {
                    angle: 0.0,
                    distance: 0.4,
                },
            ],
        };
        assert!(ctrl.update(&garbage).is_none());
    }

    #[test]
    fn closest_sample_in_window_wins() {
        let mut ctrl = WallFollowController::new(config(1.0, 0.0));
        let scan = RangeScan {
            stamp: 0.0,
            samples: vec![
                RangeSample {
                    angle: PI / 2.0 - 0.1,
                    distance: 0.8,
                },
                RangeSample {
                    angle: PI / 2.0 + 0.1,
                    distance: 0.6,
                },
            ],
        };
        let cmd = ctrl.update(&scan).unwrap();
        // e = 1.0 - 0.6
        assert!((cmd.steering_angle - 0.4).abs() < EPSILON);
    }

    #[test]
    fn steering_is_clamped() {
        let mut ctrl = WallFollowController::new(config(100.0, 0.0));
        let cmd = ctrl.update(&side_scan(0.0, 0.1)).unwrap();
        assert_eq!(cmd.steering_angle, 1.5);
        let cmd = ctrl.update(&side_scan(1.0, 10.0)).unwrap();
        assert_eq!(cmd.steering_angle, -1.5);
    }

    #[test]
    fn speed_tapers_from_max_to_min_with_steering() {
        let mut ctrl = WallFollowController::new(config(100.0, 0.0));
        // Full lock -> min speed
        let cmd = ctrl.update(&side_scan(0.0, 0.1)).unwrap();
        assert!((cmd.speed - 0.3).abs() < EPSILON);

        // On target -> zero steering -> max speed
        let mut ctrl = WallFollowController::new(config(2.0, 0.0));
        let cmd = ctrl.update(&side_scan(0.0, 1.0)).unwrap();
        assert!((cmd.speed - 3.5).abs() < EPSILON);
    }
}
