//! # Summit Detector
//!
//! Stop-based summit detection for recorded hiking tracks.
//!
//! A track is run once through a forward-only pipeline:
//! - **Parse** GPX (or a JSON fix list) into timestamped points with distance and speed
//! - **Segment** the points into contiguous low-speed stops
//! - **Cluster** stops that are close in space or time
//! - **Score** each cluster on duration, elevation percentile and prominence
//! - **Rank** clusters by composite score for the user to confirm
//!
//! ## Features
//!
//! - **`parallel`** - Batch detection across tracks with rayon
//! - **`async`** - Tokio-based file entry point
//! - **`cli`** - `summit-cli` debug binary
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use summit_detector::{detect_peaks, DetectionConfig};
//!
//! let gpx = r#"<?xml version="1.0" encoding="UTF-8"?>
//! <gpx version="1.1" creator="example" xmlns="http://www.topografix.com/GPX/1/1">
//!   <trk><trkseg>
//!     <trkpt lat="46.5000" lon="7.9000"><ele>2000</ele><time>2024-07-01T10:00:00Z</time></trkpt>
//!     <trkpt lat="46.5001" lon="7.9000"><ele>2010</ele><time>2024-07-01T10:00:10Z</time></trkpt>
//!   </trkseg></trk>
//! </gpx>"#;
//!
//! let result = detect_peaks(gpx.as_bytes(), &DetectionConfig::default()).unwrap();
//! for peak in &result.peaks {
//!     println!("#{} {:.5},{:.5} score {:.0}", peak.rank, peak.latitude, peak.longitude, peak.score);
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, SummitError};

// Detection configuration and presets
pub mod config;
pub use config::DetectionConfig;

// Geographic utilities (haversine distance, degree conversions)
pub mod geo_utils;

// Stage 1: track decoding
pub mod parser;
pub use parser::{build_track, parse_track, RawFix, TrackFormat};

// Stage 2: stop extraction
pub mod segmenter;
pub use segmenter::{segment_stops, StopSegment};

// Stage 3: stop clustering
pub mod clusterer;
pub use clusterer::{cluster_stops, ClusteringOutcome, StopCluster};

// Stage 4: candidate scoring
pub mod scorer;
pub use scorer::{elevation_threshold, score_clusters, PeakScores, ScoredCluster};

// Stage 5: ranking and output records
pub mod ranker;
pub use ranker::{rank_clusters, DetectedPeak};

// End-to-end entry points
pub mod pipeline;
pub use pipeline::{
    analyze_points, detect_peaks, detect_peaks_batch, detect_peaks_from_path,
    detect_peaks_with_progress, AtomicProgressTracker, DetectionPhase,
    DetectionProgressCallback, DetectionResult, DetectionStats, NoopProgress,
};
#[cfg(feature = "async")]
pub use pipeline::detect_peaks_from_path_async;

// ============================================================================
// Core Types
// ============================================================================

/// One recorded fix along a track, with derived distance and speed.
///
/// Points are created once by the parser and never modified afterwards.
/// `sequence_index` is the point's position in the parsed track and stays a
/// stable identifier for it through every later stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub sequence_index: usize,
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation in meters, if recorded
    pub elevation: Option<f64>,
    /// Fix time, if recorded
    pub timestamp: Option<DateTime<Utc>>,
    /// Meters from track start
    pub cumulative_distance: f64,
    /// Speed from the previous fix in m/s (0 when either timestamp is missing)
    pub instantaneous_speed: f64,
}

impl TrackPoint {
    /// Distance in meters to another point.
    pub fn distance_to(&self, other: &TrackPoint) -> f64 {
        geo_utils::haversine_distance(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }

    /// Distance in meters to an arbitrary coordinate.
    pub fn distance_to_coord(&self, latitude: f64, longitude: f64) -> f64 {
        geo_utils::haversine_distance(self.latitude, self.longitude, latitude, longitude)
    }
}

/// Signed difference `later - earlier` in fractional minutes.
pub(crate) fn minutes_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 60_000.0
}

/// Mean of the elevations that are present, and their maximum.
///
/// Points without elevation are skipped; with no elevations at all both
/// values are 0.
pub(crate) fn elevation_stats<'a, I>(points: I) -> (f64, f64)
where
    I: IntoIterator<Item = &'a TrackPoint>,
{
    let mut sum = 0.0;
    let mut count = 0usize;
    let mut max = f64::NEG_INFINITY;

    for ele in points.into_iter().filter_map(|p| p.elevation) {
        sum += ele;
        count += 1;
        max = max.max(ele);
    }

    if count == 0 {
        (0.0, 0.0)
    } else {
        (sum / count as f64, max)
    }
}

// ============================================================================
// Tests
// ============================================================================
