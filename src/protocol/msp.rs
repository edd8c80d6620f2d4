// MultiWii Serial Protocol: the MSP_SET_RAW_GPS frame understood by
// Cleanflight/Betaflight targets. 24 bytes total, little-endian fields,
// XOR checksum over length + command + payload.

use serde::{Deserialize, Serialize};

use super::ProtocolError;
use crate::fusion::FusionOutput;

/// Total size of an encoded MSP_SET_RAW_GPS frame.
pub const MSP_FRAME_LEN: usize = 24;

const MSP_HEADER: [u8; 3] = *b"$M<";
const MSP_SET_RAW_GPS: u8 = 201;
const PAYLOAD_LEN: u8 = 18;

/// Field set of an MSP_SET_RAW_GPS frame.
///
/// Quantized integers as the flight controller expects them; overflow is the
/// producer's responsibility, the fusion layer keeps values well inside
/// range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MspGps {
    /// 2 with a fix, 0 without.
    pub fix_type: u8,
    /// 12 with a fix, 0 without.
    pub num_sat: u8,
    pub lat_e7: i32,
    pub lon_e7: i32,
    pub altitude_m: i16,
    pub speed_cms: u16,
    pub heading_deg10: u16,
    pub hdop_x100: u16,
}

impl MspGps {
    /// Quantize a fused solution. All float-to-integer conversions truncate
    /// toward zero.
    pub fn from_output(output: &FusionOutput, altitude_m: f64) -> Self {
        let has_fix = output.has_position;
        Self {
            fix_type: if has_fix { 2 } else { 0 },
            num_sat: if has_fix { 12 } else { 0 },
            lat_e7: (output.position.lat * 1e7) as i32,
            lon_e7: (output.position.lon * 1e7) as i32,
            altitude_m: altitude_m as i16,
            speed_cms: (output.speed_mps * 100.0) as u16,
            heading_deg10: (output.heading_deg * 10.0) as u16,
            hdop_x100: (output.hdop * 100.0) as u16,
        }
    }
}

/// Encode `gps` as an MSP_SET_RAW_GPS frame. `out` must hold at least
/// [`MSP_FRAME_LEN`] bytes; exactly that many are written.
pub fn encode_msp_set_raw_gps(out: &mut [u8], gps: &MspGps) -> Result<usize, ProtocolError> {
    if out.len() < MSP_FRAME_LEN {
        return Err(ProtocolError::BufferTooSmall {
            needed: MSP_FRAME_LEN,
            got: out.len(),
        });
    }

    out[0..3].copy_from_slice(&MSP_HEADER);
    out[3] = PAYLOAD_LEN;
    out[4] = MSP_SET_RAW_GPS;
    out[5] = gps.fix_type;
    out[6] = gps.num_sat;
    out[7..11].copy_from_slice(&gps.lat_e7.to_le_bytes());
    out[11..15].copy_from_slice(&gps.lon_e7.to_le_bytes());
    out[15..17].copy_from_slice(&gps.altitude_m.to_le_bytes());
    out[17..19].copy_from_slice(&gps.speed_cms.to_le_bytes());
    out[19..21].copy_from_slice(&gps.heading_deg10.to_le_bytes());
    out[21..23].copy_from_slice(&gps.hdop_x100.to_le_bytes());

    // checksum spans len + cmd + payload
    out[23] = out[3..23].iter().fold(0u8, |acc, b| acc ^ b);
    Ok(MSP_FRAME_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::{FixQuality, FixSource};
    use crate::types::GeoPoint;

    fn sample_output() -> FusionOutput {
        FusionOutput {
            position: GeoPoint::new(37.5, -122.25),
            hdop: 1.2,
            speed_mps: 5.0,
            heading_deg: 90.0,
            fix_quality: FixQuality::Visual,
            source: FixSource::Visual,
            geofence_ok: true,
            ekf_accepted: true,
            has_position: true,
        }
    }

    #[test]
    fn test_frame_layout() {
        let gps = MspGps::from_output(&sample_output(), 100.0);
        let mut buf = [0u8; MSP_FRAME_LEN];
        let n = encode_msp_set_raw_gps(&mut buf, &gps).unwrap();
        assert_eq!(n, MSP_FRAME_LEN);

        // "$M<", len 18, cmd 201, fix 2, 12 sats
        assert_eq!(&buf[0..7], &[0x24, 0x4D, 0x3C, 0x12, 0xC9, 0x02, 0x0C]);
        assert_eq!(&buf[7..11], &375_000_000_i32.to_le_bytes());
        assert_eq!(&buf[11..15], &(-1_222_500_000_i32).to_le_bytes());
        assert_eq!(&buf[15..17], &100_i16.to_le_bytes());
        assert_eq!(&buf[17..19], &500_u16.to_le_bytes());
        assert_eq!(&buf[19..21], &900_u16.to_le_bytes());
        assert_eq!(&buf[21..23], &120_u16.to_le_bytes());
    }

    #[test]
    fn test_checksum_covers_len_cmd_payload() {
        let gps = MspGps::from_output(&sample_output(), 0.0);
        let mut buf = [0u8; MSP_FRAME_LEN];
        encode_msp_set_raw_gps(&mut buf, &gps).unwrap();

        let expected = buf[3..23].iter().fold(0u8, |acc, b| acc ^ b);
        assert_eq!(buf[23], expected);
    }

    #[test]
    fn test_no_fix_frame() {
        let mut output = sample_output();
        output.has_position = false;
        output.hdop = 99.0;
        let gps = MspGps::from_output(&output, 0.0);
        assert_eq!(gps.fix_type, 0);
        assert_eq!(gps.num_sat, 0);
        assert_eq!(gps.hdop_x100, 9900);
    }

    #[test]
    fn test_truncation_toward_zero() {
        let mut output = sample_output();
        output.position = GeoPoint::new(0.00000015, -0.00000015);
        output.speed_mps = 0.999;
        let gps = MspGps::from_output(&output, -0.9);
        assert_eq!(gps.lat_e7, 1);
        assert_eq!(gps.lon_e7, -1);
        assert_eq!(gps.speed_cms, 99);
        assert_eq!(gps.altitude_m, 0);
    }

    #[test]
    fn test_buffer_too_small() {
        let gps = MspGps::default();
        let mut buf = [0u8; 23];
        assert_eq!(
            encode_msp_set_raw_gps(&mut buf, &gps),
            Err(ProtocolError::BufferTooSmall { needed: 24, got: 23 })
        );
    }
}
