// Vehicle geometry resolved from frame transforms at startup
//
// The kinematic converter needs the wheelbase and the per-side track widths.
// Both are derived from the static positions of the two front steering frames
// and the rear-left wheel frame, all expressed relative to the rear-right
// wheel frame. Resolution happens once; the result is immutable.

use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::config::{
    FRAME_FRONT_LEFT_STEER, FRAME_FRONT_RIGHT_STEER, FRAME_REAR_LEFT_WHEEL,
    FRAME_REAR_RIGHT_WHEEL, RuntimeConfig,
};

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("no transform from '{source_frame}' to '{target}'")]
    MissingFrame { source_frame: String, target: String },

    #[error("geometry unavailable after {attempts} attempts: {last}")]
    Unavailable { attempts: u32, last: String },

    #[error("invalid geometry: {0}")]
    Invalid(&'static str),
}

/// Translation of a target frame expressed in a source frame, in meters.
/// x is longitudinal (forward), y lateral (left), z up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Translation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Frame-transform lookup interface. Implementations may be backed by a
/// live transform tree; the runtime ships a static one built from config.
pub trait FrameLookup {
    fn lookup(&self, source: &str, target: &str) -> Result<Translation, GeometryError>;
}

/// Frame tree built from static offsets, each relative to a common root
/// (the rear-right wheel frame). Pure translations, no rotation.
pub struct StaticFrameTree {
    offsets: HashMap<String, [f64; 3]>,
}

impl StaticFrameTree {
    pub fn new(offsets: HashMap<String, [f64; 3]>) -> Self {
        Self { offsets }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(config.frames.clone())
    }

    fn offset(&self, frame: &str, other: &str) -> Result<[f64; 3], GeometryError> {
        self.offsets
            .get(frame)
            .copied()
            .ok_or_else(|| GeometryError::MissingFrame {
                source_frame: frame.to_owned(),
                target: other.to_owned(),
            })
    }
}

impl FrameLookup for StaticFrameTree {
    fn lookup(&self, source: &str, target: &str) -> Result<Translation, GeometryError> {
        let s = self.offset(source, target)?;
        let t = self.offset(target, source)?;
        Ok(Translation {
            x: t[0] - s[0],
            y: t[1] - s[1],
            z: t[2] - s[2],
        })
    }
}

/// Static vehicle geometry. All lengths strictly positive; diameters are
/// used as divisors by the kinematic converter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleGeometry {
    /// Longitudinal distance between the front steering axes and the rear axle (m)
    pub wheelbase: f64,
    /// Lateral distance between the left wheels and the vehicle centerline, doubled (m)
    pub left_track: f64,
    /// Same, right side (m)
    pub right_track: f64,
    /// [front_left, front_right, rear_left, rear_right] wheel diameters (m)
    pub wheel_diameters: [f64; 4],
}

impl VehicleGeometry {
    pub fn new(
        wheelbase: f64,
        left_track: f64,
        right_track: f64,
        wheel_diameters: [f64; 4],
    ) -> Result<Self, GeometryError> {
        if !(wheelbase.is_finite() && wheelbase > 0.0) {
            return Err(GeometryError::Invalid("wheelbase must be positive"));
        }
        if !(left_track.is_finite() && left_track > 0.0)
            || !(right_track.is_finite() && right_track > 0.0)
        {
            return Err(GeometryError::Invalid("track widths must be positive"));
        }
        if wheel_diameters.iter().any(|d| !(d.is_finite() && *d > 0.0)) {
            return Err(GeometryError::Invalid("wheel diameters must be positive"));
        }
        Ok(Self {
            wheelbase,
            left_track,
            right_track,
            wheel_diameters,
        })
    }

    /// Resolve geometry from three frame transforms, all relative to the
    /// rear-right wheel frame. The wheelbase is the mean longitudinal
    /// distance of the two steering frames to the rear axle line; each
    /// side's track is twice that side's lateral offset from the rear-axle
    /// midpoint.
    pub fn resolve(
        lookup: &dyn FrameLookup,
        wheel_diameters: [f64; 4],
    ) -> Result<Self, GeometryError> {
        let fl = lookup.lookup(FRAME_REAR_RIGHT_WHEEL, FRAME_FRONT_LEFT_STEER)?;
        let fr = lookup.lookup(FRAME_REAR_RIGHT_WHEEL, FRAME_FRONT_RIGHT_STEER)?;
        let rl = lookup.lookup(FRAME_REAR_RIGHT_WHEEL, FRAME_REAR_LEFT_WHEEL)?;

        let wheelbase = (fl.x.abs() + fr.x.abs()) / 2.0;
        let axle_mid_y = rl.y / 2.0;
        let left_track = 2.0 * (fl.y - axle_mid_y).abs();
        let right_track = 2.0 * (fr.y - axle_mid_y).abs();

        Self::new(wheelbase, left_track, right_track, wheel_diameters)
    }

    /// Resolve with bounded retry and backoff. The transform source may not
    /// be populated immediately at startup; exhausting the attempts is fatal
    /// for the caller.
    pub async fn resolve_with_retry(
        lookup: &dyn FrameLookup,
        wheel_diameters: [f64; 4],
        attempts: u32,
        backoff: Duration,
    ) -> Result<Self, GeometryError> {
        let mut last = String::new();
        for attempt in 1..=attempts {
            match Self::resolve(lookup, wheel_diameters) {
                Ok(geom) => return Ok(geom),
                Err(e) => {
                    warn!("Geometry resolution attempt {}/{} failed: {}", attempt, attempts, e);
                    last = e.to_string();
                }
            }
            if attempt < attempts {
                tokio::time::sleep(backoff).await;
            }
        }
        Err(GeometryError::Unavailable { attempts, last })
    }
}
