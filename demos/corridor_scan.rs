// Publishes synthetic corridor laser sweeps for bench-testing the
// wall-follow controller without hardware.
use clap::Parser;
use std::f64::consts::PI;
use std::time::Instant;
use tokio::time::{interval, Duration};
use tracing::info;

use ackermann_zenoh_runtime::config::TOPIC_SCAN;
use ackermann_zenoh_runtime::messages::{RangeSample, RangeScan};

#[derive(Parser)]
struct Args {
    /// Distance to the left wall in meters
    #[arg(long, default_value_t = 1.0)]
    wall_distance: f64,

    /// Peak of a slow sinusoidal drift added to the wall distance (m)
    #[arg(long, default_value_t = 0.2)]
    drift: f64,

    /// Sweep publish rate in Hz
    #[arg(long, default_value_t = 20.0)]
    rate: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_SCAN).await?;
    info!(
        "Publishing corridor sweeps on {} at {} Hz (wall at {} m)",
        TOPIC_SCAN, args.rate, args.wall_distance
    );

    let start = Instant::now();
    let mut tick = interval(Duration::from_secs_f64(1.0 / args.rate));

    loop {
        tick.tick().await;
        let t = start.elapsed().as_secs_f64();
        // Drift the wall slowly so the controller has something to correct
        let wall = args.wall_distance + args.drift * (0.2 * t).sin();

        // 180-degree sweep, 1-degree resolution; a flat wall on the left at
        // lateral distance `wall` returns wall / sin(angle).
        let samples: Vec<RangeSample> = (0..=180)
            .map(|deg| {
                let angle = deg as f64 * PI / 180.0;
                let distance = if angle.sin() > 0.05 {
                    (wall / angle.sin()).min(30.0)
                } else {
                    30.0 // out of range ahead/behind
                };
                RangeSample { angle, distance }
            })
            .collect();

        let scan = RangeScan { stamp: t, samples };
        publisher.put(serde_json::to_string(&scan)?).await?;
    }
}
