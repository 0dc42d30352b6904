//! Synthetic track builders shared by the integration tests.
#![allow(dead_code)]

use chrono::{Duration, SecondsFormat, TimeZone, Utc};

/// Degrees of latitude per meter for the 6,371 km sphere.
pub const DEG_PER_M: f64 = 1.0 / 111_194.926_644_558_74;

/// (lat, lon, elevation, seconds from start)
pub type Fix = (f64, f64, Option<f64>, Option<i64>);

/// Builds a track that walks due north from a starting fix.
pub struct TrackBuilder {
    lat: f64,
    lon: f64,
    t: i64,
    pub fixes: Vec<Fix>,
}

impl TrackBuilder {
    pub fn start(lat: f64, lon: f64, ele: f64) -> Self {
        Self {
            lat,
            lon,
            t: 0,
            fixes: vec![(lat, lon, Some(ele), Some(0))],
        }
    }

    /// Append `n` fixes, each `step_m` meters north and `interval_s` later.
    /// `ele` receives the 0-based index within this leg.
    pub fn walk(mut self, n: usize, step_m: f64, interval_s: i64, ele: impl Fn(usize) -> f64) -> Self {
        for k in 0..n {
            self.lat += step_m * DEG_PER_M;
            self.t += interval_s;
            self.fixes.push((self.lat, self.lon, Some(ele(k)), Some(self.t)));
        }
        self
    }

    /// Append `n` fixes at the current position, `interval_s` apart.
    pub fn stay(self, n: usize, interval_s: i64, ele: f64) -> Self {
        self.walk(n, 0.0, interval_s, |_| ele)
    }

    pub fn gpx(&self) -> String {
        to_gpx(&self.fixes)
    }

    pub fn json(&self) -> String {
        to_json(&self.fixes)
    }
}

fn iso(secs: i64) -> String {
    let base = Utc.with_ymd_and_hms(2024, 7, 1, 8, 0, 0).unwrap();
    (base + Duration::seconds(secs)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn to_gpx(fixes: &[Fix]) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <gpx version=\"1.1\" creator=\"summit-detector-tests\" xmlns=\"http://www.topografix.com/GPX/1/1\">\n\
         <trk><name>test</name><trkseg>\n",
    );
    for &(lat, lon, ele, secs) in fixes {
        out.push_str(&format!("<trkpt lat=\"{:.9}\" lon=\"{:.9}\">", lat, lon));
        if let Some(e) = ele {
            out.push_str(&format!("<ele>{:.2}</ele>", e));
        }
        if let Some(s) = secs {
            out.push_str(&format!("<time>{}</time>", iso(s)));
        }
        out.push_str("</trkpt>\n");
    }
    out.push_str("</trkseg></trk>\n</gpx>\n");
    out
}

pub fn to_json(fixes: &[Fix]) -> String {
    let items: Vec<serde_json::Value> = fixes
        .iter()
        .map(|&(lat, lon, ele, secs)| {
            let mut obj = serde_json::json!({ "lat": lat, "lon": lon });
            if let Some(e) = ele {
                obj["ele"] = serde_json::json!(e);
            }
            if let Some(s) = secs {
                obj["time"] = serde_json::json!(iso(s));
            }
            obj
        })
        .collect();
    serde_json::Value::Array(items).to_string()
}

/// 100 fixes: 2 m/s walking at 400m, except fixes 40-60 which crawl at
/// 0.1 m/s for 4 minutes while climbing from 500m to 800m.
pub fn scenario_a() -> TrackBuilder {
    TrackBuilder::start(46.5, 7.9, 400.0)
        .walk(39, 12.0, 6, |_| 400.0)
        .walk(21, 1.2, 12, |k| 500.0 + 15.0 * k as f64)
        .walk(39, 12.0, 6, |_| 400.0)
}

/// Two 2-minute stops 30m apart with a ~20 minute out-and-back walk between.
pub fn scenario_b() -> TrackBuilder {
    TrackBuilder::start(46.5, 7.9, 1000.0)
        .stay(12, 10, 1000.0)
        .walk(20, 60.0, 30, |_| 950.0)
        .walk(1, -30.0, 30, |_| 950.0)
        .walk(19, -60.0, 30, |_| 950.0)
        .stay(1, 30, 1001.0)
        .stay(12, 10, 1001.0)
}

/// Steady 2 m/s walk that never stops.
pub fn steady_walk(n: usize) -> TrackBuilder {
    TrackBuilder::start(46.5, 7.9, 500.0).walk(n, 12.0, 6, |k| 500.0 + k as f64)
}
