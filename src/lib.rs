// lib.rs — onboard positioning core for a drone visual positioning system
//
// Everything in this crate is independent of:
//   - the image-matching pipeline (we only see its lat/lon + hdop output)
//   - camera capture, serial I/O, tile storage, process supervision
//
// Visual fixes go in, a fused position estimate and flight-controller wire
// frames (NMEA 0183, MSP) come out. This means you can unit-test the whole
// chain with recorded data and replay .json.gz fix logs without touching
// any hardware frontend.

pub mod dead_reckoning;
pub mod filters;
pub mod fusion;
pub mod geodesy;
pub mod geofence;
pub mod protocol;
pub mod types;

pub use dead_reckoning::DeadReckoning;
pub use filters::position_ekf::{EkfConfig, PositionEkf};
pub use fusion::{FixQuality, FixSource, Fusion, FusionConfig, FusionOutput};
pub use geodesy::tile_coord::TileCoord;
pub use geofence::Geofence;
pub use types::{GeoPoint, Pixel, Velocity};
