use nalgebra::{Matrix3, Vector3};

use super::tile_coord::TileCoord;
use crate::types::{GeoPoint, Pixel};

/// Below this the projective scale is treated as degenerate.
const MIN_PROJECTIVE_W: f64 = 1e-10;

/// Projects the image-center pixel (cx, cy) through a row-major 3x3
/// homography into the tile's pixel frame, then on to WGS-84.
///
/// A degenerate projection (|w| < 1e-10) returns (0, 0), which the filter
/// layer interprets as "no fix".
pub fn homography_to_gps(h: &[f64; 9], tile: TileCoord, cx: f64, cy: f64) -> GeoPoint {
    let m = Matrix3::from_row_slice(h);
    let projected = m * Vector3::new(cx, cy, 1.0);

    if projected.z.abs() < MIN_PROJECTIVE_W {
        return GeoPoint::default();
    }

    tile.pixel_to_gps(Pixel {
        x: projected.x / projected.z,
        y: projected.y / projected.z,
    })
}
