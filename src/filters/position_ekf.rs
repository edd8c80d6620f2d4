use ndarray::{arr1, Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::geodesy::M_PER_DEG_LAT;
use crate::types::{GeoPoint, Velocity};

/// An innovation covariance with |det| below this cannot be inverted;
/// the correction is skipped and only the prediction is committed.
const DET_FLOOR: f64 = 1e-30;

/// Covariance assigned to every state on (re)initialization [deg²].
const INIT_VARIANCE: f64 = 1e-6;

/// Tuning for the constant-velocity position filter.
///
/// The state lives in degrees, so these are degree-based quantities:
/// `process_noise` is the kinematic spectral density in deg²-per-second
/// powers and `measurement_noise` the position variance [deg²] of a fix at
/// hdop = 1. Values tuned for a meters-frame filter must not be fed here.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EkfConfig {
    pub process_noise: f64,
    pub measurement_noise: f64,
    /// Mahalanobis gate on the position innovation [sigma].
    pub gate_threshold: f64,
    /// A measurement arriving more than this many seconds after the previous
    /// one re-initializes the filter instead of integrating the gap.
    pub max_gap_s: f64,
}

impl Default for EkfConfig {
    fn default() -> Self {
        Self {
            process_noise: 1e-10,
            measurement_noise: 1e-8,
            gate_threshold: 5.0,
            max_gap_s: 30.0,
        }
    }
}

/// 4-state constant-velocity filter over [lat, lon, vlat, vlon]
/// (degrees and deg/s).
///
/// The measurement model is the identity on the position components, so the
/// "extended" part is trivial: the model is already linear. Measurements are
/// gated on Mahalanobis distance before they are allowed to correct the
/// state; a gated-out measurement still advances the prediction.
pub struct PositionEkf {
    config: EkfConfig,
    state: Array1<f64>,
    covariance: Array2<f64>,
    last_t: f64,
    initialized: bool,
    last_gate: f64,
}

impl PositionEkf {
    pub fn new(config: EkfConfig) -> Self {
        Self {
            config,
            state: Array1::zeros(4),
            covariance: Array2::zeros((4, 4)),
            last_t: 0.0,
            initialized: false,
            last_gate: 0.0,
        }
    }

    /// Feed a position measurement `z` with uncertainty `hdop` at time `t`.
    ///
    /// Returns true when the measurement was accepted (including the
    /// initializing and re-initializing cases). Returns false when it was
    /// out of order, gated out as an outlier, or numerically degenerate; in
    /// the latter two cases the predicted state is still committed so the
    /// filter keeps tracking through its own model.
    pub fn update(&mut self, z: GeoPoint, hdop: f64, t: f64) -> bool {
        if !self.initialized {
            self.initialize(z, t);
            return true;
        }

        let dt = t - self.last_t;
        if dt < 0.0 {
            // out-of-order measurement, drop without touching the state
            return false;
        }
        if dt > self.config.max_gap_s {
            self.reset();
            self.initialize(z, t);
            return true;
        }

        let (x_pred, p_pred) = self.propagate(dt);

        // Innovation on the position components.
        let y = arr1(&[z.lat - x_pred[0], z.lon - x_pred[1]]);

        // Measurement noise scales with the square of the fix uncertainty.
        let r = self.config.measurement_noise * hdop * hdop;
        let mut s = Array2::<f64>::zeros((2, 2));
        s[[0, 0]] = p_pred[[0, 0]] + r;
        s[[0, 1]] = p_pred[[0, 1]];
        s[[1, 0]] = p_pred[[1, 0]];
        s[[1, 1]] = p_pred[[1, 1]] + r;

        let det = s[[0, 0]] * s[[1, 1]] - s[[0, 1]] * s[[1, 0]];
        if det.abs() < DET_FLOOR {
            self.commit_prediction(x_pred, p_pred, t);
            return false;
        }

        let mut s_inv = Array2::<f64>::zeros((2, 2));
        s_inv[[0, 0]] = s[[1, 1]] / det;
        s_inv[[0, 1]] = -s[[0, 1]] / det;
        s_inv[[1, 0]] = -s[[1, 0]] / det;
        s_inv[[1, 1]] = s[[0, 0]] / det;

        // Mahalanobis distance of the innovation.
        let sy = s_inv.dot(&y);
        self.last_gate = (y[0] * sy[0] + y[1] * sy[1]).max(0.0).sqrt();

        if self.last_gate > self.config.gate_threshold {
            self.commit_prediction(x_pred, p_pred, t);
            return false;
        }

        // Kalman gain K = P * H^T * S^-1; H selects the first two states,
        // so P * H^T is the left 4x2 block of P.
        let mut ph_t = Array2::<f64>::zeros((4, 2));
        for i in 0..4 {
            for j in 0..2 {
                ph_t[[i, j]] = p_pred[[i, j]];
            }
        }
        let k = ph_t.dot(&s_inv);

        let dx = k.dot(&y);
        let mut x = x_pred;
        for i in 0..4 {
            x[i] += dx[i];
        }

        // P = (I - K*H) * P_pred, re-symmetrized to absorb rounding.
        let mut kh = Array2::<f64>::zeros((4, 4));
        for i in 0..4 {
            for j in 0..2 {
                kh[[i, j]] = k[[i, j]];
            }
        }
        let i_kh = Array2::<f64>::eye(4) - &kh;
        let mut p = i_kh.dot(&p_pred);
        symmetrize(&mut p);

        self.state = x;
        self.covariance = p;
        self.last_t = t;
        true
    }

    /// Constant-velocity extrapolation of the position to time `t`.
    ///
    /// None until the filter has been initialized; the covariance is not
    /// advanced by prediction.
    pub fn predict(&self, t: f64) -> Option<GeoPoint> {
        if !self.initialized {
            return None;
        }
        let dt = t - self.last_t;
        Some(GeoPoint {
            lat: self.state[0] + self.state[2] * dt,
            lon: self.state[1] + self.state[3] * dt,
        })
    }

    /// Current position estimate [deg].
    pub fn position(&self) -> GeoPoint {
        GeoPoint {
            lat: self.state[0],
            lon: self.state[1],
        }
    }

    /// Velocity estimate in state units [deg/s]: (vlat, vlon).
    pub fn velocity_deg_s(&self) -> (f64, f64) {
        (self.state[2], self.state[3])
    }

    /// Velocity estimate converted to the local NE frame [m/s].
    pub fn velocity_mps(&self) -> Velocity {
        Velocity {
            vn_mps: self.state[2] * M_PER_DEG_LAT,
            ve_mps: self.state[3] * M_PER_DEG_LAT * self.state[0].to_radians().cos(),
        }
    }

    /// Ground speed [m/s].
    pub fn speed_mps(&self) -> f64 {
        self.velocity_mps().magnitude()
    }

    /// Mahalanobis distance of the most recent gated innovation.
    pub fn last_gate(&self) -> f64 {
        self.last_gate
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns the filter to the uninitialized state.
    pub fn reset(&mut self) {
        self.state.fill(0.0);
        self.covariance.fill(0.0);
        self.last_t = 0.0;
        self.initialized = false;
        self.last_gate = 0.0;
    }

    fn initialize(&mut self, z: GeoPoint, t: f64) {
        self.state = arr1(&[z.lat, z.lon, 0.0, 0.0]);
        self.covariance = Array2::eye(4) * INIT_VARIANCE;
        self.last_t = t;
        self.initialized = true;
        self.last_gate = 0.0;
    }

    fn commit_prediction(&mut self, x_pred: Array1<f64>, p_pred: Array2<f64>, t: f64) {
        self.state = x_pred;
        self.covariance = p_pred;
        self.last_t = t;
    }

    /// Propagate state and covariance by `dt` under the constant-velocity
    /// model: x' = F*x, P' = F*P*F^T + Q.
    fn propagate(&self, dt: f64) -> (Array1<f64>, Array2<f64>) {
        let mut f = Array2::<f64>::eye(4);
        f[[0, 2]] = dt;
        f[[1, 3]] = dt;

        // Kinematic process noise, block-diagonal over (lat, vlat) and
        // (lon, vlon).
        let q = self.config.process_noise;
        let dt2 = dt * dt;
        let q_pos = q * dt2 * dt2 / 4.0;
        let q_vel = q * dt2;
        let q_cross = q * dt2 * dt / 2.0;

        let mut qm = Array2::<f64>::zeros((4, 4));
        qm[[0, 0]] = q_pos;
        qm[[1, 1]] = q_pos;
        qm[[2, 2]] = q_vel;
        qm[[3, 3]] = q_vel;
        qm[[0, 2]] = q_cross;
        qm[[2, 0]] = q_cross;
        qm[[1, 3]] = q_cross;
        qm[[3, 1]] = q_cross;

        let x_pred = f.dot(&self.state);
        let p_pred = f.dot(&self.covariance).dot(&f.t()) + &qm;
        (x_pred, p_pred)
    }
}

fn symmetrize(p: &mut Array2<f64>) {
    for i in 0..4 {
        for j in (i + 1)..4 {
            let avg = 0.5 * (p[[i, j]] + p[[j, i]]);
            p[[i, j]] = avg;
            p[[j, i]] = avg;
        }
    }
}
