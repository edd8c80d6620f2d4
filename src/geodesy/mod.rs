//! Web-Mercator slippy-tile math and spherical-Earth helpers.
//!
//! All conversions use the WGS-84 spherical approximation (radius 6371 km,
//! equatorial circumference 40,075,016.686 m). The estimator's numerical
//! contract (degrees vs. meters) is defined against these functions.

pub mod homography;
pub mod tile_coord;

pub use homography::homography_to_gps;
pub use tile_coord::TileCoord;

use crate::types::GeoPoint;

/// Mean Earth radius [km].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Equatorial circumference of the Web-Mercator sphere [m].
pub const EARTH_CIRCUMFERENCE_M: f64 = 40_075_016.686;

/// Meters per degree of latitude (and of longitude at the equator).
pub const M_PER_DEG_LAT: f64 = 111_320.0;

/// Kilometers per degree of latitude, used by the coarse bounding-box scan.
const KM_PER_DEG: f64 = 111.32;

/// Great-circle distance between two points [km].
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Ground resolution of one tile pixel at the given latitude and zoom [m].
pub fn meters_per_pixel(lat: f64, zoom: u8) -> f64 {
    EARTH_CIRCUMFERENCE_M * lat.to_radians().cos() / (tile_coord::TILE_SIZE * (1u64 << zoom) as f64)
}

/// Euclidean pixel offset converted to ground meters at the given latitude
/// and zoom.
pub fn pixel_distance_to_meters(dx: f64, dy: f64, lat: f64, zoom: u8) -> f64 {
    (dx * dx + dy * dy).sqrt() * meters_per_pixel(lat, zoom)
}

/// Enumerates the tiles covering a circle of `radius_km` around `center`,
/// row-major from the NW corner, truncated at `cap`.
///
/// The bounding box uses the coarse 111.32 km/degree approximation; callers
/// wanting exact coverage filter the result themselves.
pub fn tiles_in_radius(center: GeoPoint, radius_km: f64, zoom: u8, cap: usize) -> Vec<TileCoord> {
    let dlat = radius_km / KM_PER_DEG;
    let dlon = radius_km / (KM_PER_DEG * center.lat.to_radians().cos());

    let nw = TileCoord::from_gps(GeoPoint::new(center.lat + dlat, center.lon - dlon), zoom);
    let se = TileCoord::from_gps(GeoPoint::new(center.lat - dlat, center.lon + dlon), zoom);

    let mut tiles = Vec::new();
    for y in nw.y..=se.y {
        for x in nw.x..=se.x {
            if tiles.len() >= cap {
                return tiles;
            }
            tiles.push(TileCoord { x, y, zoom });
        }
    }
    tiles
}
