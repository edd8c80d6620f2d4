pub mod position_ekf;

pub use position_ekf::{EkfConfig, PositionEkf};
