// Vehicle model for the four-wheel Ackermann base
//
// Provides:
// - Geometry resolution from static frame transforms (wheelbase, tracks)
// - Ackermann inverse kinematics (drive command -> per-wheel commands)
// - Per-actuator Zenoh publishers with a bounded startup readiness wait

pub mod actuators;
pub mod geometry;
pub mod kinematics;

pub use actuators::{ActuatorError, ActuatorPublisher};
pub use geometry::{FrameLookup, GeometryError, StaticFrameTree, VehicleGeometry};
pub use kinematics::{convert, KinematicsError, WheelCommand, WheelCommands};
