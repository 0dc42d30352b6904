//! Track decoding.
//!
//! Turns raw track-file bytes into an ordered sequence of [`TrackPoint`]s with
//! cumulative distance and instantaneous speed. Two inputs are understood:
//! - GPX 1.0/1.1 (`<trkpt>`, falling back to `<rtept>` when there are no tracks)
//! - a JSON array of fixes `{ "lat", "lon", "ele"?, "time"? }`
//!
//! Any decode failure aborts the run; no partial track is returned.

use std::io::Cursor;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SummitError};
use crate::geo_utils::haversine_distance;
use crate::TrackPoint;

/// Input formats the parser can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackFormat {
    Gpx,
    Json,
}

impl TrackFormat {
    /// Guess the format from the first meaningful byte.
    ///
    /// Returns `None` when the input is empty or whitespace only.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let first = bytes.iter().find(|b| !b.is_ascii_whitespace())?;
        match first {
            b'[' | b'{' => Some(TrackFormat::Json),
            _ => Some(TrackFormat::Gpx),
        }
    }
}

/// A decoded fix before distance/speed derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFix {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lon", alias = "lng")]
    pub longitude: f64,
    #[serde(default, alias = "ele")]
    pub elevation: Option<f64>,
    #[serde(default, alias = "timestamp")]
    pub time: Option<DateTime<Utc>>,
}

/// JSON documents may be a bare array or wrap it in `{ "points": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonTrack {
    Bare(Vec<RawFix>),
    Wrapped { points: Vec<RawFix> },
}

/// Parse raw bytes into a track, sniffing the format.
pub fn parse_track(bytes: &[u8]) -> Result<Vec<TrackPoint>> {
    let format = TrackFormat::sniff(bytes).ok_or(SummitError::EmptyTrack)?;
    let fixes = match format {
        TrackFormat::Gpx => decode_gpx(bytes)?,
        TrackFormat::Json => decode_json(bytes)?,
    };

    info!("[Parser] Decoded {} fixes ({:?})", fixes.len(), format);
    build_track(fixes)
}

/// Decode GPX bytes into fixes.
pub fn decode_gpx(bytes: &[u8]) -> Result<Vec<RawFix>> {
    let gpx = gpx::read(Cursor::new(bytes)).map_err(|e| SummitError::parse(e.to_string()))?;

    let mut waypoints: Vec<&gpx::Waypoint> = gpx
        .tracks
        .iter()
        .flat_map(|t| t.segments.iter())
        .flat_map(|s| s.points.iter())
        .collect();

    if waypoints.is_empty() {
        debug!("[Parser] No track points, falling back to route points");
        waypoints = gpx.routes.iter().flat_map(|r| r.points.iter()).collect();
    }

    waypoints
        .into_iter()
        .map(|wpt| {
            let point = wpt.point();
            let time = match &wpt.time {
                Some(t) => {
                    let iso = t.format().map_err(|e| SummitError::parse(e.to_string()))?;
                    let utc = DateTime::parse_from_rfc3339(&iso)
                        .map_err(|e| SummitError::parse(e.to_string()))?
                        .with_timezone(&Utc);
                    Some(utc)
                }
                None => None,
            };
            Ok(RawFix {
                latitude: point.y(),
                longitude: point.x(),
                elevation: wpt.elevation,
                time,
            })
        })
        .collect()
}

/// Decode a JSON fix list.
pub fn decode_json(bytes: &[u8]) -> Result<Vec<RawFix>> {
    let track: JsonTrack =
        serde_json::from_slice(bytes).map_err(|e| SummitError::parse(e.to_string()))?;
    Ok(match track {
        JsonTrack::Bare(points) | JsonTrack::Wrapped { points } => points,
    })
}

/// Assign sequence indices and derive cumulative distance and speed.
///
/// Speed is distance over the time delta to the previous fix, and 0 when
/// either fix lacks a timestamp or the delta is not positive. The first point
/// has distance and speed 0.
///
/// A non-finite elevation (`NaN`, `inf`) is treated as missing; a non-finite
/// coordinate is a parse error.
pub fn build_track(fixes: Vec<RawFix>) -> Result<Vec<TrackPoint>> {
    if fixes.is_empty() {
        return Err(SummitError::EmptyTrack);
    }

    let mut points: Vec<TrackPoint> = Vec::with_capacity(fixes.len());
    let mut cumulative = 0.0;
    let mut dropped_elevations = 0usize;

    for (i, fix) in fixes.into_iter().enumerate() {
        if !fix.latitude.is_finite() || !fix.longitude.is_finite() {
            return Err(SummitError::parse(format!(
                "fix {} has a non-finite coordinate ({}, {})",
                i, fix.latitude, fix.longitude
            )));
        }
        let elevation = fix.elevation.filter(|e| e.is_finite());
        if elevation.is_none() && fix.elevation.is_some() {
            dropped_elevations += 1;
        }

        let mut speed = 0.0;

        if let Some(prev) = points.last() {
            let step = haversine_distance(
                prev.latitude,
                prev.longitude,
                fix.latitude,
                fix.longitude,
            );
            cumulative += step;

            if let (Some(t0), Some(t1)) = (prev.timestamp, fix.time) {
                let dt = (t1 - t0).num_milliseconds() as f64 / 1000.0;
                if dt > 0.0 {
                    speed = step / dt;
                }
            }
        }

        points.push(TrackPoint {
            sequence_index: i,
            latitude: fix.latitude,
            longitude: fix.longitude,
            elevation,
            timestamp: fix.time,
            cumulative_distance: cumulative,
            instantaneous_speed: speed,
        });
    }

    if dropped_elevations > 0 {
        debug!(
            "[Parser] Ignored {} non-finite elevations",
            dropped_elevations
        );
    }

    Ok(points)
}
