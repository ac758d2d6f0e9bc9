// Ackermann inverse kinematics for the four-wheel base
//
// Converts a (speed, steering angle) drive command into per-wheel steering
// angles (front axle) and per-wheel rotation rates (all four). During a turn
// every wheel traces a circle concentric on the turn center, which lies on
// the rear axle line; wheel rates follow v = r * omega with each wheel's own
// distance to that center and its own diameter.

use std::f64::consts::PI;
use thiserror::Error;

use super::geometry::VehicleGeometry;
use crate::messages::DriveCommand;

#[derive(Debug, Error)]
pub enum KinematicsError {
    #[error("steering angle {0} outside (-PI/2, PI/2)")]
    InvalidSteeringAngle(f64),
}

/// Command for a single wheel. Rear wheels have no steering joint.
/// `angular_speed` is the wheel rotation rate in revolutions per second
/// (linear speed divided by PI * diameter).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelCommand {
    pub steering_angle: Option<f64>,
    pub angular_speed: f64,
}

/// One cycle's worth of actuator targets, recomputed every publish tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelCommands {
    pub front_left: WheelCommand,
    pub front_right: WheelCommand,
    pub rear_left: WheelCommand,
    pub rear_right: WheelCommand,
}

impl WheelCommands {
    /// Wheels stopped, steering centered.
    pub fn stop() -> Self {
        Self {
            front_left: WheelCommand {
                steering_angle: Some(0.0),
                angular_speed: 0.0,
            },
            front_right: WheelCommand {
                steering_angle: Some(0.0),
                angular_speed: 0.0,
            },
            rear_left: WheelCommand::default(),
            rear_right: WheelCommand::default(),
        }
    }
}

/// Map a geometric steering-axis angle to joint command space.
///
/// `phi` is the angle of the line from the turn center to the steering axis,
/// measured against the lateral axis; the joint's zero reference points
/// forward, so the command is `sign(phi) * PI/2 - phi`. This transform
/// encodes the physical joint's zero-reference convention and must not be
/// re-derived: changing it silently flips which direction is "centered".
fn steer_from_axis_angle(phi: f64) -> f64 {
    if phi >= 0.0 { PI / 2.0 - phi } else { -PI / 2.0 - phi }
}

/// Convert a drive command into per-wheel commands.
///
/// Straight driving (steering angle exactly zero) short-circuits to equal
/// per-diameter rates with centered steering. Otherwise the signed turning
/// radius is `wheelbase / tan(angle)` and each wheel's rate scales with its
/// distance to the turn center. Angles at or beyond +/-PI/2 (infinite
/// curvature) and non-finite inputs are rejected for this cycle.
pub fn convert(
    cmd: DriveCommand,
    geom: &VehicleGeometry,
) -> Result<WheelCommands, KinematicsError> {
    if !cmd.speed.is_finite()
        || !cmd.steering_angle.is_finite()
        || cmd.steering_angle.abs() >= PI / 2.0
    {
        return Err(KinematicsError::InvalidSteeringAngle(cmd.steering_angle));
    }

    let [d_fl, d_fr, d_rl, d_rr] = geom.wheel_diameters;

    if cmd.steering_angle == 0.0 {
        let rate = |diameter: f64| cmd.speed / (PI * diameter);
        return Ok(WheelCommands {
            front_left: WheelCommand {
                steering_angle: Some(0.0),
                angular_speed: rate(d_fl),
            },
            front_right: WheelCommand {
                steering_angle: Some(0.0),
                angular_speed: rate(d_fr),
            },
            rear_left: WheelCommand {
                steering_angle: None,
                angular_speed: rate(d_rl),
            },
            rear_right: WheelCommand {
                steering_angle: None,
                angular_speed: rate(d_rr),
            },
        });
    }

    // Signed turning radius; positive steering angle puts the turn center on
    // the left, so the left wheels become the inner wheels.
    let radius = geom.wheelbase / cmd.steering_angle.tan();

    // Signed lateral distance from the turn center to each side's wheel line
    let left_arm = radius - geom.left_track / 2.0;
    let right_arm = radius + geom.right_track / 2.0;

    let steer_left = steer_from_axis_angle((left_arm / geom.wheelbase).atan());
    let steer_right = steer_from_axis_angle((right_arm / geom.wheelbase).atan());

    // v = r * omega about the turn center: wheel linear speed scales with the
    // wheel's radius from the center relative to the commanded radius.
    let front_left_r = (left_arm.powi(2) + geom.wheelbase.powi(2)).sqrt();
    let front_right_r = (right_arm.powi(2) + geom.wheelbase.powi(2)).sqrt();
    let rear_left_r = left_arm.abs();
    let rear_right_r = right_arm.abs();

    let rate = |wheel_r: f64, diameter: f64| {
        cmd.speed * (wheel_r / radius.abs()) / (PI * diameter)
    };

    Ok(WheelCommands {
        front_left: WheelCommand {
            steering_angle: Some(steer_left),
            angular_speed: rate(front_left_r, d_fl),
        },
        front_right: WheelCommand {
            steering_angle: Some(steer_right),
            angular_speed: rate(front_right_r, d_fr),
        },
        rear_left: WheelCommand {
            steering_angle: None,
            angular_speed: rate(rear_left_r, d_rl),
        },
        rear_right: WheelCommand {
            steering_angle: None,
            angular_speed: rate(rear_right_r, d_rr),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn geom() -> VehicleGeometry {
        VehicleGeometry::new(1.0, 0.5, 0.5, [0.1; 4]).unwrap()
    }

    #[test]
    fn straight_drive_equal_rates_centered_steering() {
        let out = convert(DriveCommand::new(1.0, 0.0), &geom()).unwrap();
        let expected = 1.0 / (PI * 0.1);
        for wheel in [out.front_left, out.front_right, out.rear_left, out.rear_right] {
            assert!((wheel.angular_speed - expected).abs() < EPSILON);
        }
        assert_eq!(out.front_left.steering_angle, Some(0.0));
        assert_eq!(out.front_right.steering_angle, Some(0.0));
        assert_eq!(out.rear_left.steering_angle, None);
    }

    #[test]
    fn zero_command_is_all_zero_for_any_geometry() {
        let geometries = [
            geom(),
            VehicleGeometry::new(0.26, 0.2, 0.18, [0.07, 0.07, 0.12, 0.12]).unwrap(),
        ];
        for g in geometries {
            let out = convert(DriveCommand::stop(), &g).unwrap();
            for wheel in [out.front_left, out.front_right, out.rear_left, out.rear_right] {
                assert_eq!(wheel.angular_speed, 0.0);
                assert_eq!(wheel.steering_angle.unwrap_or(0.0), 0.0);
            }
        }
    }

    #[test]
    fn left_turn_inner_wheel_steers_sharper_and_spins_slower() {
        let out = convert(DriveCommand::new(1.0, 0.3), &geom()).unwrap();
        let left = out.front_left.steering_angle.unwrap();
        let right = out.front_right.steering_angle.unwrap();
        assert!(left > right, "inner (left) wheel must steer sharper");
        assert!(left > 0.0 && right > 0.0);
        assert!(out.front_left.angular_speed < out.front_right.angular_speed);
        assert!(out.rear_left.angular_speed < out.rear_right.angular_speed);
    }

    #[test]
    fn right_turn_mirrors_left_turn() {
        let left_turn = convert(DriveCommand::new(1.0, 0.3), &geom()).unwrap();
        let right_turn = convert(DriveCommand::new(1.0, -0.3), &geom()).unwrap();
        assert!(
            (left_turn.front_left.steering_angle.unwrap()
                + right_turn.front_right.steering_angle.unwrap())
            .abs()
                < EPSILON
        );
        assert!(
            (left_turn.front_left.angular_speed - right_turn.front_right.angular_speed).abs()
                < EPSILON
        );
    }

    #[test]
    fn known_turn_radius_checks_out() {
        // wheelbase 1, angle PI/4 -> R = 1; arms 0.75 and 1.25
        let out = convert(DriveCommand::new(1.0, PI / 4.0), &geom()).unwrap();
        let expected_left = (1.0f64 / 0.75).atan();
        let expected_right = (1.0f64 / 1.25).atan();
        assert!((out.front_left.steering_angle.unwrap() - expected_left).abs() < EPSILON);
        assert!((out.front_right.steering_angle.unwrap() - expected_right).abs() < EPSILON);

        let expected_rl = 1.0 * (0.75 / 1.0) / (PI * 0.1);
        let expected_fl = 1.0 * ((0.75f64.powi(2) + 1.0).sqrt() / 1.0) / (PI * 0.1);
        assert!((out.rear_left.angular_speed - expected_rl).abs() < EPSILON);
        assert!((out.front_left.angular_speed - expected_fl).abs() < EPSILON);
    }

    #[test]
    fn rates_are_continuous_through_zero_angle() {
        let straight = convert(DriveCommand::new(2.0, 0.0), &geom()).unwrap();
        let nearly = convert(DriveCommand::new(2.0, 1e-9), &geom()).unwrap();
        assert!(
            (straight.front_left.angular_speed - nearly.front_left.angular_speed).abs() < 1e-6
        );
        assert!(nearly.front_left.steering_angle.unwrap().abs() < 1e-6);
        assert!(
            (nearly.front_left.angular_speed - nearly.front_right.angular_speed).abs() < 1e-6
        );
    }

    #[test]
    fn rate_sign_follows_commanded_speed() {
        let out = convert(DriveCommand::new(-1.5, 0.4), &geom()).unwrap();
        for wheel in [out.front_left, out.front_right, out.rear_left, out.rear_right] {
            assert!(wheel.angular_speed < 0.0);
        }
    }

    #[test]
    fn larger_diameter_spins_slower() {
        let g = VehicleGeometry::new(1.0, 0.5, 0.5, [0.1, 0.2, 0.1, 0.2]).unwrap();
        let out = convert(DriveCommand::new(1.0, 0.0), &g).unwrap();
        assert!(
            (out.front_left.angular_speed - 2.0 * out.front_right.angular_speed).abs() < EPSILON
        );
    }

    #[test]
    fn rejects_infinite_curvature_and_garbage() {
        for angle in [PI / 2.0, -PI / 2.0, 2.0, f64::NAN] {
            let err = convert(DriveCommand::new(1.0, angle), &geom());
            assert!(matches!(err, Err(KinematicsError::InvalidSteeringAngle(_))));
        }
        assert!(convert(DriveCommand::new(f64::INFINITY, 0.0), &geom()).is_err());
    }
}
