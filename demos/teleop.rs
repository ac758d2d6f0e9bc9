// Keyboard teleop: W/S speed, A/D steering, SPACE stop, Q quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use serde_json::json;
use std::f64::consts::PI;
use std::time::Duration;
use tracing::info;

use ackermann_zenoh_runtime::config::TOPIC_CMD_DRIVE;

const SPEED_STEP: f64 = 0.25; // m/s per keypress
const STEER_STEP: f64 = 2.0 * PI / 180.0; // rad per keypress
const MAX_SPEED: f64 = 3.5;
const MAX_STEER: f64 = 30.0 * PI / 180.0;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_DRIVE).await?;

    info!("Controls: W/S=speed, A/D=steer, SPACE=stop, Q=quit");

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut speed = 0.0f64;
    let mut steering_angle = 0.0f64;

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                match code {
                    KeyCode::Char('w') if pressed => {
                        speed = (speed + SPEED_STEP).min(MAX_SPEED);
                        info!("speed {:.2} m/s", speed);
                    }
                    KeyCode::Char('s') if pressed => {
                        speed = (speed - SPEED_STEP).max(-MAX_SPEED);
                        info!("speed {:.2} m/s", speed);
                    }
                    KeyCode::Char('a') if pressed => {
                        steering_angle = (steering_angle + STEER_STEP).min(MAX_STEER);
                        info!("steer {:.3} rad", steering_angle);
                    }
                    KeyCode::Char('d') if pressed => {
                        steering_angle = (steering_angle - STEER_STEP).max(-MAX_STEER);
                        info!("steer {:.3} rad", steering_angle);
                    }
                    KeyCode::Char(' ') if pressed => {
                        speed = 0.0;
                        steering_angle = 0.0;
                        info!("stop");
                    }
                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,
                    _ => {}
                }
            }
        }

        // Always publish at ~50Hz so the runtime's watchdog stays fed
        let cmd = json!({
            "speed": speed,
            "steering_angle": steering_angle
        });
        publisher.put(cmd.to_string()).await?;
    }

    Ok(())
}
