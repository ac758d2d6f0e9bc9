// Ackermann steering runtime for a four-wheel corridor-following vehicle
//
// Pipeline: range scan -> wall-follow PD controller -> (speed, steering angle)
// command -> watchdog freshness gate -> Ackermann inverse kinematics ->
// per-wheel actuator commands published at a fixed rate over Zenoh.

pub mod config;
pub mod control;
pub mod messages;
pub mod runtime;
pub mod vehicle;
