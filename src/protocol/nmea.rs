// NMEA 0183 sentence generation for the flight controller's GPS input.
//
// Reference shapes:
//   $GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,47.0,M,,*47
//   $GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A

use std::fmt::{self, Write};

use chrono::{DateTime, Datelike, Timelike, Utc};

use super::ProtocolError;
use crate::fusion::FixQuality;
use crate::types::GeoPoint;

/// Callers must hand the encoders at least this many bytes.
pub const MIN_SENTENCE_BUF: usize = 128;

const MPS_TO_KNOTS: f64 = 1.94384;

/// XOR of every character between the leading `$` (skipped if present) and
/// the terminating `*`.
pub fn nmea_checksum(body: &[u8]) -> u8 {
    let bytes = match body.split_first() {
        Some((b'$', rest)) => rest,
        _ => body,
    };
    bytes.iter().fold(0u8, |acc, b| acc ^ b)
}

/// Encode a `$GPGGA` fix sentence into `out`, returning the bytes written.
///
/// The satellite count is the fixed literal `08`; altitude is geoid-relative
/// meters. `utc` is injected by the caller so tests stay deterministic.
pub fn encode_gga(
    out: &mut [u8],
    position: GeoPoint,
    fix_quality: FixQuality,
    hdop: f64,
    altitude_m: f64,
    utc: DateTime<Utc>,
) -> Result<usize, ProtocolError> {
    frame(out, |w| {
        write!(
            w,
            "GPGGA,{:02}{:02}{:02}.00,",
            utc.hour(),
            utc.minute(),
            utc.second()
        )?;
        write_position(w, position)?;
        write!(
            w,
            ",{},08,{:.1},{:.1},M,0.0,M,,",
            fix_quality.nmea_digit(),
            hdop,
            altitude_m
        )
    })
}

/// Encode a `$GPRMC` recommended-minimum sentence into `out`, returning the
/// bytes written. `active` selects the A/V status flag; speed is converted
/// to knots, heading is true degrees.
pub fn encode_rmc(
    out: &mut [u8],
    position: GeoPoint,
    active: bool,
    speed_mps: f64,
    heading_deg: f64,
    utc: DateTime<Utc>,
) -> Result<usize, ProtocolError> {
    frame(out, |w| {
        write!(
            w,
            "GPRMC,{:02}{:02}{:02}.00,{},",
            utc.hour(),
            utc.minute(),
            utc.second(),
            if active { 'A' } else { 'V' }
        )?;
        write_position(w, position)?;
        write!(
            w,
            ",{:.1},{:.1},{:02}{:02}{:02},,,A",
            speed_mps * MPS_TO_KNOTS,
            heading_deg,
            utc.day(),
            utc.month(),
            utc.year().rem_euclid(100)
        )
    })
}

/// Writes `LAT,LATDIR,LON,LONDIR`.
fn write_position(w: &mut SliceWriter, position: GeoPoint) -> fmt::Result {
    let lat = position.lat.abs();
    let lat_deg = lat.trunc();
    write!(
        w,
        "{:02}{:08.5},{},",
        lat_deg as u32,
        (lat - lat_deg) * 60.0,
        if position.lat < 0.0 { 'S' } else { 'N' }
    )?;

    let lon = position.lon.abs();
    let lon_deg = lon.trunc();
    write!(
        w,
        "{:03}{:08.5},{}",
        lon_deg as u32,
        (lon - lon_deg) * 60.0,
        if position.lon < 0.0 { 'W' } else { 'E' }
    )
}

/// Frames `$<body>*HH\r\n` around a body writer, computing the checksum over
/// the bytes actually emitted.
fn frame<F>(out: &mut [u8], body: F) -> Result<usize, ProtocolError>
where
    F: FnOnce(&mut SliceWriter) -> fmt::Result,
{
    let got = out.len();
    let mut w = SliceWriter { buf: out, len: 0 };

    let result = (|| {
        w.write_char('$')?;
        body(&mut w)?;
        let ck = nmea_checksum(&w.buf[1..w.len]);
        write!(w, "*{:02X}\r\n", ck)
    })();

    match result {
        Ok(()) => Ok(w.len),
        Err(_) => Err(ProtocolError::BufferTooSmall {
            needed: MIN_SENTENCE_BUF,
            got,
        }),
    }
}

/// fmt::Write over a borrowed byte buffer; fails instead of allocating when
/// the sentence would overrun.
struct SliceWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl Write for SliceWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        if self.len + bytes.len() > self.buf.len() {
            return Err(fmt::Error);
        }
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 23, h, m, s).unwrap()
    }

    fn encode_gga_string(position: GeoPoint, hdop: f64, alt: f64) -> String {
        let mut buf = [0u8; MIN_SENTENCE_BUF];
        let n = encode_gga(&mut buf, position, FixQuality::Visual, hdop, alt, utc(12, 34, 56))
            .unwrap();
        String::from_utf8(buf[..n].to_vec()).unwrap()
    }

    #[test]
    fn test_checksum_reference_sentence() {
        // The canonical GGA example checksums to 0x47.
        let body = b"GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,47.0,M,,";
        assert_eq!(nmea_checksum(body), 0x47);
        // Leading '$' is skipped if present.
        let with_dollar = b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,47.0,M,,";
        assert_eq!(nmea_checksum(with_dollar), 0x47);
    }

    #[test]
    fn test_gga_exact_bytes() {
        let sentence = encode_gga_string(GeoPoint::new(37.5, -122.25), 1.2, 100.5);
        assert!(
            sentence.starts_with("$GPGGA,123456.00,3730.00000,N,12215.00000,W,1,08,1.2,100.5,M,0.0,M,,*"),
            "{sentence}"
        );
        assert!(sentence.ends_with("\r\n"));
        // two uppercase hex digits between '*' and CRLF
        let star = sentence.find('*').unwrap();
        let digits = &sentence[star + 1..sentence.len() - 2];
        assert_eq!(digits.len(), 2);
        assert!(digits.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_gga_checksum_self_consistent() {
        let sentence = encode_gga_string(GeoPoint::new(-33.8688, 151.2093), 0.9, 12.0);
        let star = sentence.find('*').unwrap();
        let expected = nmea_checksum(sentence[1..star].as_bytes());
        let parsed = u8::from_str_radix(&sentence[star + 1..star + 3], 16).unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_gga_hemispheres() {
        let south_east = encode_gga_string(GeoPoint::new(-33.8688, 151.2093), 1.0, 0.0);
        assert!(south_east.contains(",S,"), "{south_east}");
        assert!(south_east.contains(",E,"), "{south_east}");
    }

    #[test]
    fn test_rmc_fields() {
        let mut buf = [0u8; MIN_SENTENCE_BUF];
        let n = encode_rmc(
            &mut buf,
            GeoPoint::new(37.5, -122.25),
            true,
            5.0,
            84.4,
            utc(12, 34, 56),
        )
        .unwrap();
        let sentence = std::str::from_utf8(&buf[..n]).unwrap();

        // 5 m/s is 9.7 knots
        assert!(
            sentence.starts_with("$GPRMC,123456.00,A,3730.00000,N,12215.00000,W,9.7,84.4,230324,,,A*"),
            "{sentence}"
        );
        assert!(sentence.ends_with("\r\n"));

        let star = sentence.find('*').unwrap();
        let expected = nmea_checksum(sentence[1..star].as_bytes());
        let parsed = u8::from_str_radix(&sentence[star + 1..star + 3], 16).unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_rmc_void_status() {
        let mut buf = [0u8; MIN_SENTENCE_BUF];
        let n = encode_rmc(
            &mut buf,
            GeoPoint::default(),
            false,
            0.0,
            0.0,
            utc(0, 0, 0),
        )
        .unwrap();
        let sentence = std::str::from_utf8(&buf[..n]).unwrap();
        assert!(sentence.starts_with("$GPRMC,000000.00,V,"), "{sentence}");
    }

    #[test]
    fn test_buffer_too_small() {
        let mut buf = [0u8; 16];
        let err = encode_gga(
            &mut buf,
            GeoPoint::new(37.5, -122.25),
            FixQuality::Visual,
            1.0,
            0.0,
            utc(12, 0, 0),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ProtocolError::BufferTooSmall {
                needed: MIN_SENTENCE_BUF,
                got: 16
            }
        );
    }

    #[test]
    fn test_minute_zero_padding() {
        // 0.05° = 3 minutes; the minute field keeps its fixed 8-char width
        let sentence = encode_gga_string(GeoPoint::new(37.05, -122.05), 1.0, 0.0);
        assert!(sentence.contains("3703.00000,N"), "{sentence}");
        assert!(sentence.contains("12203.00000,W"), "{sentence}");
    }
}
