use serde::{Deserialize, Serialize};

use crate::geodesy::M_PER_DEG_LAT;
use crate::types::{GeoPoint, Velocity};

/// Constant-velocity fallback used when the filter has no estimate.
///
/// Holds a single anchor: the last good position, its velocity, uncertainty
/// and timestamp. Extrapolation degrades the reported hdop linearly with
/// elapsed time and refuses to run past `max_extrap_s`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeadReckoning {
    ref_pos: GeoPoint,
    vn_mps: f64,
    ve_mps: f64,
    ref_hdop: f64,
    ref_t: f64,
    hdop_growth_rate: f64,
    max_extrap_s: f64,
    has_reference: bool,
}

impl DeadReckoning {
    pub fn new(max_extrap_s: f64, hdop_growth_rate: f64) -> Self {
        Self {
            ref_pos: GeoPoint::default(),
            vn_mps: 0.0,
            ve_mps: 0.0,
            ref_hdop: 0.0,
            ref_t: 0.0,
            hdop_growth_rate,
            max_extrap_s,
            has_reference: false,
        }
    }

    /// Overwrite the anchor with a fresh position/velocity snapshot.
    pub fn update_ref(&mut self, pos: GeoPoint, vel: Velocity, hdop: f64, t: f64) {
        self.ref_pos = pos;
        self.vn_mps = vel.vn_mps;
        self.ve_mps = vel.ve_mps;
        self.ref_hdop = hdop;
        self.ref_t = t;
        self.has_reference = true;
    }

    /// Extrapolate the anchor to time `t`.
    ///
    /// None when there is no anchor, when `t` precedes it, or when the
    /// elapsed time exceeds the extrapolation cap. Otherwise returns the
    /// extrapolated position and its degraded hdop.
    pub fn extrapolate(&self, t: f64) -> Option<(GeoPoint, f64)> {
        if !self.has_reference {
            return None;
        }
        let dt = t - self.ref_t;
        if dt < 0.0 || dt > self.max_extrap_s {
            return None;
        }

        let lat = self.ref_pos.lat + self.vn_mps / M_PER_DEG_LAT * dt;
        let lon = self.ref_pos.lon
            + self.ve_mps / (M_PER_DEG_LAT * self.ref_pos.lat.to_radians().cos()) * dt;
        let hdop = self.ref_hdop + self.hdop_growth_rate * dt;
        Some((GeoPoint { lat, lon }, hdop))
    }

    pub fn has_reference(&self) -> bool {
        self.has_reference
    }

    /// Drop the anchor, keeping the configured cap and growth rate.
    pub fn clear(&mut self) {
        self.ref_pos = GeoPoint::default();
        self.vn_mps = 0.0;
        self.ve_mps = 0.0;
        self.ref_hdop = 0.0;
        self.ref_t = 0.0;
        self.has_reference = false;
    }
}
