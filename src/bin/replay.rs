use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use chrono::Utc;
use clap::Parser;
use flate2::read::GzDecoder;
use serde::Deserialize;

use vps_core_rs::protocol::{encode_gga, encode_msp_set_raw_gps, encode_rmc, MspGps, MIN_SENTENCE_BUF, MSP_FRAME_LEN};
use vps_core_rs::{EkfConfig, FixSource, Fusion, FusionConfig, GeoPoint, Geofence};

#[derive(Parser, Debug)]
#[command(about = "Replay a recorded visual-fix log through the positioning core")]
struct Args {
    /// Path to fix log (.json or .json.gz)
    #[arg(long)]
    log: PathBuf,

    /// Process noise [deg²-based spectral density]
    #[arg(long, default_value = "1e-10")]
    process_noise: f64,

    /// Measurement noise at hdop = 1 [deg²]
    #[arg(long, default_value = "1e-8")]
    measurement_noise: f64,

    /// Innovation gate [sigma]
    #[arg(long, default_value = "5.0")]
    gate: f64,

    /// Re-initialize after a measurement gap longer than this [s]
    #[arg(long, default_value = "30.0")]
    max_gap: f64,

    /// Circular geofence center latitude (requires --fence-lon)
    #[arg(long)]
    fence_lat: Option<f64>,

    /// Circular geofence center longitude
    #[arg(long)]
    fence_lon: Option<f64>,

    /// Circular geofence radius [km]
    #[arg(long, default_value = "1.0")]
    fence_radius_km: f64,

    /// Altitude reported in the encoded frames [m]
    #[arg(long, default_value = "0.0")]
    altitude_m: f64,

    /// Print $GPGGA/$GPRMC per tick
    #[arg(long)]
    nmea: bool,

    /// Print MSP_SET_RAW_GPS frames as hex per tick
    #[arg(long)]
    msp: bool,
}

#[derive(Deserialize)]
struct FixRecord {
    t: f64,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default = "default_hdop")]
    hdop: f64,
}

fn default_hdop() -> f64 {
    1.0
}

#[derive(Deserialize)]
struct FixLog {
    fixes: Vec<FixRecord>,
}

fn load_log(path: &PathBuf) -> anyhow::Result<FixLog> {
    let file = File::open(path)?;
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        let gz = GzDecoder::new(file);
        let reader = BufReader::new(gz);
        Ok(serde_json::from_reader(reader)?)
    } else {
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let log = load_log(&args.log)?;

    let fence = match (args.fence_lat, args.fence_lon) {
        (Some(lat), Some(lon)) => Some(Geofence::Circle {
            center: GeoPoint::new(lat, lon),
            radius_km: args.fence_radius_km,
            margin_km: 0.0,
        }),
        _ => None,
    };

    let config = FusionConfig {
        ekf: EkfConfig {
            process_noise: args.process_noise,
            measurement_noise: args.measurement_noise,
            gate_threshold: args.gate,
            max_gap_s: args.max_gap,
        },
        ..FusionConfig::default()
    };
    let mut fusion = Fusion::new(config, fence);

    let mut ticks = 0usize;
    let mut accepted = 0usize;
    let mut gated = 0usize;
    let mut vetoed = 0usize;
    let mut by_source = [0usize; 4];

    for rec in &log.fixes {
        let visual = match (rec.lat, rec.lon) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        };
        let had_visual = visual.is_some();
        let out = fusion.update(visual, rec.hdop, rec.t);

        ticks += 1;
        if had_visual {
            if out.ekf_accepted {
                accepted += 1;
            } else {
                gated += 1;
            }
        }
        if !out.geofence_ok {
            vetoed += 1;
        }
        by_source[match out.source {
            FixSource::None => 0,
            FixSource::Visual => 1,
            FixSource::EkfPredict => 2,
            FixSource::DeadReckoning => 3,
        }] += 1;

        if args.nmea {
            let utc = Utc::now();
            let mut buf = [0u8; MIN_SENTENCE_BUF];
            let n = encode_gga(&mut buf, out.position, out.fix_quality, out.hdop, args.altitude_m, utc)?;
            print!("{}", std::str::from_utf8(&buf[..n])?);
            let n = encode_rmc(&mut buf, out.position, out.has_position, out.speed_mps, out.heading_deg, utc)?;
            print!("{}", std::str::from_utf8(&buf[..n])?);
        }
        if args.msp {
            let mut frame = [0u8; MSP_FRAME_LEN];
            encode_msp_set_raw_gps(&mut frame, &MspGps::from_output(&out, args.altitude_m))?;
            let hex: Vec<String> = frame.iter().map(|b| format!("{:02X}", b)).collect();
            println!("{}", hex.join(" "));
        }
        if !args.nmea && !args.msp {
            println!(
                "t={:8.2}  {:>13}  ({:>11.6}, {:>12.6})  hdop {:5.1}  {:5.1} m/s  {:5.1}°",
                rec.t,
                format!("{:?}", out.source),
                out.position.lat,
                out.position.lon,
                out.hdop,
                out.speed_mps,
                out.heading_deg,
            );
        }
    }

    println!("\n=== replay summary ===");
    println!("ticks:          {ticks}");
    println!("accepted fixes: {accepted}");
    println!("gated fixes:    {gated}");
    println!("fence vetoes:   {vetoed}");
    println!(
        "sources:        none {} / visual {} / predict {} / dr {}",
        by_source[0], by_source[1], by_source[2], by_source[3]
    );
    Ok(())
}
