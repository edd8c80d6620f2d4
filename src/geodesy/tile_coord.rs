use std::f64::consts::PI;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::types::{GeoPoint, Pixel};

/// Edge length of a slippy tile in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// A tile coordinate in Web Mercator projection (slippy map tilenames).
///
/// x increases east, y increases south; (0, 0) is the NW corner of the
/// world at the given zoom.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

impl TileCoord {
    /// Converts WGS-84 lat/lon (degrees) to the containing tile at `zoom`.
    ///
    /// Formula:
    ///   n = 2^zoom
    ///   x = floor((lon + 180) / 360 * n)
    ///   y = floor((1 - ln(tan(lat_rad) + sec(lat_rad)) / π) / 2 * n)
    /// with x and y clamped into [0, n-1]. Latitudes beyond the Web-Mercator
    /// limit produce a clamped edge tile rather than a panic.
    pub fn from_gps(point: GeoPoint, zoom: u8) -> Self {
        Self::from_gps_with_pixel(point, zoom).0
    }

    /// Same conversion, additionally returning the position within the tile
    /// as a fractional [0, 256) pixel.
    pub fn from_gps_with_pixel(point: GeoPoint, zoom: u8) -> (Self, Pixel) {
        let n = (1u32 << zoom) as f64;
        let lat_rad = point.lat.to_radians();

        let xf = (point.lon + 180.0) / 360.0 * n;
        let yf = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n;

        let max = n - 1.0;
        let x = xf.floor().clamp(0.0, max);
        let y = yf.floor().clamp(0.0, max);

        // Fraction measured from the clamped tile so the lon = 180 edge
        // still round-trips through pixel_to_gps.
        let pixel = Pixel {
            x: (xf - x) * TILE_SIZE,
            y: (yf - y) * TILE_SIZE,
        };
        (
            TileCoord {
                x: x as u32,
                y: y as u32,
                zoom,
            },
            pixel,
        )
    }

    /// Geographic position of a pixel within this tile (inverse Web
    /// Mercator).
    pub fn pixel_to_gps(&self, pixel: Pixel) -> GeoPoint {
        let n = (1u32 << self.zoom) as f64;
        let xf = self.x as f64 + pixel.x / TILE_SIZE;
        let yf = self.y as f64 + pixel.y / TILE_SIZE;

        let lon = xf / n * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * yf / n)).sinh().atan().to_degrees();
        GeoPoint { lat, lon }
    }

    /// Geographic center of this tile.
    pub fn center(&self) -> GeoPoint {
        self.pixel_to_gps(Pixel {
            x: TILE_SIZE / 2.0,
            y: TILE_SIZE / 2.0,
        })
    }
}

impl Display for TileCoord {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "tile_{}_{}_z{}", self.x, self.y, self.zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_within_tolerance() {
        // Test point: San Francisco
        let p = GeoPoint::new(37.7749, -122.4194);
        for zoom in [0u8, 5, 10, 14, 18, 20] {
            let (tile, pixel) = TileCoord::from_gps_with_pixel(p, zoom);
            let back = tile.pixel_to_gps(pixel);
            assert!(
                (back.lat - p.lat).abs() < 1e-6 && (back.lon - p.lon).abs() < 1e-6,
                "z{zoom}: {back:?}"
            );
        }
    }

    #[test]
    fn test_roundtrip_southern_hemisphere() {
        let p = GeoPoint::new(-33.8688, 151.2093); // Sydney
        let (tile, pixel) = TileCoord::from_gps_with_pixel(p, 15);
        let back = tile.pixel_to_gps(pixel);
        assert!((back.lat - p.lat).abs() < 1e-6);
        assert!((back.lon - p.lon).abs() < 1e-6);
    }

    #[test]
    fn test_known_tile() {
        // z1 splits the world into 2x2; SF falls in the NW quadrant
        let tile = TileCoord::from_gps(GeoPoint::new(37.7749, -122.4194), 1);
        assert_eq!((tile.x, tile.y), (0, 0));

        let tile = TileCoord::from_gps(GeoPoint::new(-33.8688, 151.2093), 1);
        assert_eq!((tile.x, tile.y), (1, 1));
    }

    #[test]
    fn test_clamp_at_poles_and_antimeridian() {
        for zoom in [0u8, 4, 10] {
            let max = (1u32 << zoom) - 1;
            for lat in [90.0, 89.9, -89.9, -90.0] {
                for lon in [-180.0, 0.0, 180.0] {
                    let tile = TileCoord::from_gps(GeoPoint::new(lat, lon), zoom);
                    assert!(tile.x <= max && tile.y <= max, "({lat},{lon}) z{zoom}");
                }
            }
        }
    }

    #[test]
    fn test_pixel_in_range() {
        let (_, pixel) = TileCoord::from_gps_with_pixel(GeoPoint::new(48.8566, 2.3522), 14);
        assert!(pixel.x >= 0.0 && pixel.x < TILE_SIZE);
        assert!(pixel.y >= 0.0 && pixel.y < TILE_SIZE);
    }

    #[test]
    fn test_center_of_world_tile() {
        let center = TileCoord { x: 0, y: 0, zoom: 0 }.center();
        assert!((center.lat).abs() < 1e-9);
        assert!((center.lon).abs() < 1e-9);
    }

    #[test]
    fn test_center_matches_quarter_pixel() {
        let tile = TileCoord {
            x: 2620,
            y: 6332,
            zoom: 14,
        };
        let center = tile.center();
        let back = TileCoord::from_gps(center, 14);
        assert_eq!(back, tile);
    }

    #[test]
    fn test_display_format() {
        let tile = TileCoord {
            x: 123,
            y: 456,
            zoom: 14,
        };
        assert_eq!(format!("{}", tile), "tile_123_456_z14");
    }
}
