// fusion.rs — source selection over the filter, dead reckoning and fence.
//
// One call per host tick (~3 Hz): feed the optional visual fix, get back a
// FusionOutput the wire encoders can serialize. Priority when no fix is
// present: filter prediction first, dead reckoning only once the filter has
// lost its state.

use serde::{Deserialize, Serialize};

use crate::dead_reckoning::DeadReckoning;
use crate::filters::position_ekf::{EkfConfig, PositionEkf};
use crate::geofence::Geofence;
use crate::types::GeoPoint;

/// hdop reported while coasting on the filter's own prediction.
const PREDICT_HDOP: f64 = 3.0;

/// hdop reported when no position is available at all.
const NO_FIX_HDOP: f64 = 99.0;

/// Below this ground speed the heading is reported as 0 instead of noise.
const HEADING_MIN_SPEED_MPS: f64 = 0.5;

/// Which component produced the position of a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixSource {
    None,
    Visual,
    EkfPredict,
    DeadReckoning,
}

/// Fix quality digit reported in the NMEA GGA sentence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixQuality {
    None = 0,
    Visual = 1,
    Ekf = 2,
    Dr = 3,
}

impl FixQuality {
    pub fn nmea_digit(self) -> u8 {
        self as u8
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FusionConfig {
    pub ekf: EkfConfig,
    /// Dead reckoning refuses to extrapolate past this many seconds.
    pub dr_max_extrap_s: f64,
    /// hdop added per second of dead-reckoned flight.
    pub dr_hdop_growth: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            ekf: EkfConfig::default(),
            dr_max_extrap_s: 10.0,
            dr_hdop_growth: 2.0,
        }
    }
}

/// Fused solution for one tick.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FusionOutput {
    pub position: GeoPoint,
    pub hdop: f64,
    pub speed_mps: f64,
    /// [0, 360), 0 when below the speed threshold.
    pub heading_deg: f64,
    pub fix_quality: FixQuality,
    pub source: FixSource,
    pub geofence_ok: bool,
    pub ekf_accepted: bool,
    pub has_position: bool,
}

impl FusionOutput {
    fn empty() -> Self {
        Self {
            position: GeoPoint::default(),
            hdop: NO_FIX_HDOP,
            speed_mps: 0.0,
            heading_deg: 0.0,
            fix_quality: FixQuality::None,
            source: FixSource::None,
            geofence_ok: true,
            ekf_accepted: false,
            has_position: false,
        }
    }
}

/// The positioning core: owns the filter and dead-reckoning state, reads an
/// optional geofence handed over at construction.
pub struct Fusion {
    ekf: PositionEkf,
    dr: DeadReckoning,
    fence: Option<Geofence>,
}

impl Fusion {
    pub fn new(config: FusionConfig, fence: Option<Geofence>) -> Self {
        Self {
            ekf: PositionEkf::new(config.ekf),
            dr: DeadReckoning::new(config.dr_max_extrap_s, config.dr_hdop_growth),
            fence,
        }
    }

    /// One tick. `visual` is the image-matcher's fix when one arrived this
    /// tick, `hdop` its uncertainty, `t` the host's monotonic timestamp in
    /// seconds.
    pub fn update(&mut self, visual: Option<GeoPoint>, hdop: f64, t: f64) -> FusionOutput {
        let mut out = FusionOutput::empty();

        if let Some(fix) = visual {
            let was_initialized = self.ekf.is_initialized();
            out.ekf_accepted = self.ekf.update(fix, hdop, t);

            if !out.ekf_accepted {
                log::debug!(
                    "visual fix gated out (mahalanobis {:.2})",
                    self.ekf.last_gate()
                );
            } else if !was_initialized {
                log::info!("filter initialized at ({:.6}, {:.6})", fix.lat, fix.lon);
            }

            if self.ekf.is_initialized() {
                out.position = self.ekf.position();
                out.hdop = hdop;
                out.source = FixSource::Visual;
                out.fix_quality = FixQuality::Visual;
                out.has_position = true;
                self.dr.update_ref(out.position, self.ekf.velocity_mps(), hdop, t);
            }
        } else if self.ekf.is_initialized() {
            if let Some(pred) = self.ekf.predict(t) {
                // (0,0) doubles as the legacy no-fix sentinel coming out of
                // the homography path; never report it as a position.
                if pred.lat != 0.0 || pred.lon != 0.0 {
                    out.position = pred;
                    out.hdop = PREDICT_HDOP;
                    out.source = FixSource::EkfPredict;
                    out.fix_quality = FixQuality::Ekf;
                    out.has_position = true;
                }
            }
        } else if let Some((pos, dr_hdop)) = self.dr.extrapolate(t) {
            out.position = pos;
            out.hdop = dr_hdop;
            out.source = FixSource::DeadReckoning;
            out.fix_quality = FixQuality::Dr;
            out.has_position = true;
            log::debug!("dead reckoning, hdop {:.1}", dr_hdop);
        }

        if out.has_position {
            if let Some(fence) = &self.fence {
                out.geofence_ok = fence.contains(out.position);
                if !out.geofence_ok {
                    log::warn!(
                        "geofence violation at ({:.6}, {:.6}), boundary {:.2} km away",
                        out.position.lat,
                        out.position.lon,
                        fence.distance_km(out.position)
                    );
                    out.has_position = false;
                    out.source = FixSource::None;
                    out.fix_quality = FixQuality::None;
                }
            }
        }

        if self.ekf.is_initialized() {
            out.speed_mps = self.ekf.speed_mps();
            if out.speed_mps > HEADING_MIN_SPEED_MPS {
                let v = self.ekf.velocity_mps();
                out.heading_deg = (v.ve_mps.atan2(v.vn_mps).to_degrees() + 360.0) % 360.0;
            }
        }

        out
    }

    /// Wipe the filter and the dead-reckoning anchor; the configured DR cap
    /// and growth rate survive.
    pub fn reset(&mut self) {
        self.ekf.reset();
        self.dr.clear();
    }

    pub fn ekf(&self) -> &PositionEkf {
        &self.ekf
    }

    pub fn geofence(&self) -> Option<&Geofence> {
        self.fence.as_ref()
    }
}
