use serde::{Deserialize, Serialize};

use crate::geodesy::haversine_km;
use crate::types::GeoPoint;

/// Hard containment region for the fused solution.
///
/// Immutable once constructed; the fusion layer only reads it. `margin_km`
/// shrinks the usable interior so a solution is flagged before it reaches
/// the physical boundary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Geofence {
    Circle {
        center: GeoPoint,
        radius_km: f64,
        margin_km: f64,
    },
    Rect {
        center: GeoPoint,
        half_lat_km: f64,
        half_lon_km: f64,
        margin_km: f64,
    },
}

impl Geofence {
    pub fn contains(&self, p: GeoPoint) -> bool {
        match self {
            Geofence::Circle {
                center,
                radius_km,
                margin_km,
            } => haversine_km(*center, p) <= radius_km - margin_km,
            Geofence::Rect {
                center,
                half_lat_km,
                half_lon_km,
                margin_km,
            } => {
                let (dlat_km, dlon_km) = signed_offsets_km(*center, p);
                dlat_km.abs() <= half_lat_km - margin_km && dlon_km.abs() <= half_lon_km - margin_km
            }
        }
    }

    /// Signed distance to the fence boundary [km]; positive inside,
    /// negative outside. The margin is not applied here.
    pub fn distance_km(&self, p: GeoPoint) -> f64 {
        match self {
            Geofence::Circle {
                center, radius_km, ..
            } => radius_km - haversine_km(*center, p),
            Geofence::Rect {
                center,
                half_lat_km,
                half_lon_km,
                ..
            } => {
                let (dlat_km, dlon_km) = signed_offsets_km(*center, p);
                (half_lat_km - dlat_km.abs()).min(half_lon_km - dlon_km.abs())
            }
        }
    }
}

/// North/east offsets of `p` from `center` as signed great-circle
/// kilometers. Each axis is measured with Haversine along the meridian or
/// parallel and re-signed from the raw coordinate comparison, so the result
/// agrees with the circle test even at large extents.
fn signed_offsets_km(center: GeoPoint, p: GeoPoint) -> (f64, f64) {
    let dlat = haversine_km(center, GeoPoint::new(p.lat, center.lon)).copysign(p.lat - center.lat);
    let dlon = haversine_km(center, GeoPoint::new(center.lat, p.lon)).copysign(p.lon - center.lon);
    (dlat, dlon)
}
