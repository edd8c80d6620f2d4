use serde::{Deserialize, Serialize};

/// A WGS-84 position in decimal degrees.
///
/// Constructors do not validate: callers keep `lat` in [-90, 90] and `lon`
/// in (-180, 180]. Web-Mercator conversions are undefined beyond
/// ±85.0511287798° latitude.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Sub-tile pixel coordinate within a single 256x256 slippy tile.
///
/// Top-left is (0, 0); y grows downward (south).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pixel {
    pub x: f64,
    pub y: f64,
}

/// Horizontal velocity in the local north/east frame [m/s].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub vn_mps: f64,
    pub ve_mps: f64,
}

impl Velocity {
    pub fn magnitude(&self) -> f64 {
        (self.vn_mps * self.vn_mps + self.ve_mps * self.ve_mps).sqrt()
    }
}
