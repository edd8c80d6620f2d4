/// Walkthrough: drive the positioning core through a short synthetic
/// flight and print what the source-selection machine does at each tick.
///
/// Covers a cold start, a straight northward run, an outlier fix, a fix
/// outage bridged by prediction, and a geofence veto.
use vps_core_rs::geodesy::M_PER_DEG_LAT;
use vps_core_rs::{Fusion, FusionConfig, FusionOutput, GeoPoint, Geofence};

fn show(label: &str, out: &FusionOutput) {
    println!(
        "{label:<26} {:>13}  pos ({:>11.6}, {:>12.6})  hdop {:5.1}  {:4.1} m/s  hdg {:5.1}°  accepted={} fence_ok={}",
        format!("{:?}", out.source),
        out.position.lat,
        out.position.lon,
        out.hdop,
        out.speed_mps,
        out.heading_deg,
        out.ekf_accepted,
        out.geofence_ok,
    );
}

fn main() {
    env_logger::init();
    println!("=== VPS fusion walkthrough ===\n");

    let home = GeoPoint::new(37.0, -122.0);
    let fence = Geofence::Circle {
        center: home,
        radius_km: 5.0,
        margin_km: 0.1,
    };
    let mut fusion = Fusion::new(FusionConfig::default(), Some(fence));

    // Cold start + 10 m/s northward track, one fix per second.
    let step = 10.0 / M_PER_DEG_LAT;
    for k in 0..5 {
        let t = k as f64;
        let fix = GeoPoint::new(home.lat + step * t, home.lon);
        let out = fusion.update(Some(fix), 1.0, t);
        show(if k == 0 { "cold start" } else { "northward fix" }, &out);
    }

    // The matcher glitches: a fix 10 degrees away. Gated out, the filter
    // keeps flying on its own prediction.
    let out = fusion.update(Some(GeoPoint::new(47.0, -122.0)), 1.0, 5.0);
    show("outlier fix", &out);

    // No fixes for a while: prediction carries the solution.
    for k in 0..3 {
        let t = 6.0 + k as f64;
        let out = fusion.update(None, 0.0, t);
        show("no fix (predict)", &out);
    }

    // After a reset the next fix re-initializes the filter wherever it
    // lands; a landing spot outside the 5 km fence is accepted by the
    // filter but masked from the output.
    fusion.reset();
    let out = fusion.update(Some(GeoPoint::new(38.0, -122.0)), 1.0, 9.0);
    show("fix outside fence", &out);

    println!("\ndone");
}
