// Per-actuator command publishing over Zenoh
//
// Each downstream controller listens on `<name>/command` and answers
// readiness queries on `<name>/state`. Startup blocks (bounded) until every
// controller answers; the steady-state publish path never waits.

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use zenoh::Session;

use super::kinematics::WheelCommands;
use crate::config::RuntimeConfig;

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("controller '{name}' unavailable after {attempts} readiness attempts")]
    ControllerUnavailable { name: String, attempts: u32 },

    #[error("zenoh error: {0}")]
    Zenoh(String),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn command_topic(controller: &str) -> String {
    format!("{}/command", controller)
}

fn state_topic(controller: &str) -> String {
    format!("{}/state", controller)
}

/// Publishes one scalar per actuator each cycle: two front steering angles
/// and four wheel rotation rates.
pub struct ActuatorPublisher {
    session: Session,
    front_left_steer: String,
    front_right_steer: String,
    front_left_wheel: String,
    front_right_wheel: String,
    rear_left_wheel: String,
    rear_right_wheel: String,
}

impl ActuatorPublisher {
    /// Wait for all six controllers to report ready, then build the
    /// command topics. Readiness exhaustion is fatal at startup.
    pub async fn connect(session: Session, config: &RuntimeConfig) -> Result<Self, ActuatorError> {
        let c = &config.controllers;
        let names = [
            &c.front_left_steer,
            &c.front_right_steer,
            &c.front_left_wheel,
            &c.front_right_wheel,
            &c.rear_left_wheel,
            &c.rear_right_wheel,
        ];

        let attempts = config.startup.ready_attempts;
        let timeout = Duration::from_secs_f64(config.startup.ready_timeout);
        for name in names {
            wait_ready(&session, name, attempts, timeout).await?;
        }
        info!("All {} actuator controllers ready", names.len());

        Ok(Self {
            front_left_steer: command_topic(&c.front_left_steer),
            front_right_steer: command_topic(&c.front_right_steer),
            front_left_wheel: command_topic(&c.front_left_wheel),
            front_right_wheel: command_topic(&c.front_right_wheel),
            rear_left_wheel: command_topic(&c.rear_left_wheel),
            rear_right_wheel: command_topic(&c.rear_right_wheel),
            session,
        })
    }

    /// Push one cycle's wheel commands, one scalar JSON payload per topic.
    pub async fn publish(&self, cmds: &WheelCommands) -> Result<(), ActuatorError> {
        debug!(
            "Publishing wheel commands: steer=({:?}, {:?}), rates=({:.3}, {:.3}, {:.3}, {:.3})",
            cmds.front_left.steering_angle,
            cmds.front_right.steering_angle,
            cmds.front_left.angular_speed,
            cmds.front_right.angular_speed,
            cmds.rear_left.angular_speed,
            cmds.rear_right.angular_speed,
        );

        let values = [
            (&self.front_left_steer, cmds.front_left.steering_angle.unwrap_or(0.0)),
            (&self.front_right_steer, cmds.front_right.steering_angle.unwrap_or(0.0)),
            (&self.front_left_wheel, cmds.front_left.angular_speed),
            (&self.front_right_wheel, cmds.front_right.angular_speed),
            (&self.rear_left_wheel, cmds.rear_left.angular_speed),
            (&self.rear_right_wheel, cmds.rear_right.angular_speed),
        ];

        for (topic, value) in values {
            let payload = serde_json::to_string(&value)?;
            self.session
                .put(topic.as_str(), payload)
                .await
                .map_err(|e| ActuatorError::Zenoh(e.to_string()))?;
        }
        Ok(())
    }
}

/// Query `<name>/state` until the controller answers, up to `attempts`
/// tries with a per-try timeout.
async fn wait_ready(
    session: &Session,
    name: &str,
    attempts: u32,
    timeout: Duration,
) -> Result<(), ActuatorError> {
    let topic = state_topic(name);
    for attempt in 1..=attempts {
        let replies = session
            .get(topic.as_str())
            .await
            .map_err(|e| ActuatorError::Zenoh(e.to_string()))?;

        match tokio::time::timeout(timeout, replies.recv_async()).await {
            Ok(Ok(reply)) => match reply.result() {
                Ok(_) => {
                    debug!("Controller '{}' ready (attempt {})", name, attempt);
                    return Ok(());
                }
                Err(e) => warn!("Controller '{}' replied with error: {}", name, e),
            },
            Ok(Err(_)) => warn!("Controller '{}' query closed without reply", name),
            Err(_) => warn!(
                "Controller '{}' readiness attempt {}/{} timed out",
                name, attempt, attempts
            ),
        }
    }
    Err(ActuatorError::ControllerUnavailable {
        name: name.to_owned(),
        attempts,
    })
}
