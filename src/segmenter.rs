//! Stop extraction.
//!
//! A single left-to-right scan over the track driven by a two-state machine:
//!
//! ```text
//!            slow point                     slow point
//!   Idle ─────────────────▶ InStop { start } ◀────────┐
//!    ▲                          │   └─────────────────┘
//!    └──────────────────────────┘
//!      fast point / end of track: flush (emit if ≥ 2 points)
//! ```
//!
//! A point is "slow" when its instantaneous speed is strictly below the
//! configured stop threshold.

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{elevation_stats, minutes_between, TrackPoint};

/// Minimum number of consecutive slow points that make a stop.
pub const MIN_STOP_POINTS: usize = 2;

/// A maximal run of consecutive slow points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopSegment {
    /// First point of the run (inclusive)
    pub start_index: usize,
    /// Last point of the run (inclusive)
    pub end_index: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub average_latitude: f64,
    pub average_longitude: f64,
    /// Mean over points that have elevation (0 if none do)
    pub average_elevation: f64,
    /// Highest recorded elevation (0 if no point has one)
    pub max_elevation: f64,
}

impl StopSegment {
    /// Aggregate a run of points. `start_index..=end_index` must be in bounds.
    pub(crate) fn from_run(points: &[TrackPoint], start_index: usize, end_index: usize) -> Self {
        let run = &points[start_index..=end_index];
        let n = run.len() as f64;

        let average_latitude = run.iter().map(|p| p.latitude).sum::<f64>() / n;
        let average_longitude = run.iter().map(|p| p.longitude).sum::<f64>() / n;
        // Fixes without elevation are left out of the mean rather than counted as 0
        let (average_elevation, max_elevation) = elevation_stats(run);

        Self {
            start_index,
            end_index,
            start_time: run[0].timestamp,
            end_time: run[run.len() - 1].timestamp,
            average_latitude,
            average_longitude,
            average_elevation,
            max_elevation,
        }
    }

    /// Number of points covered by this segment.
    pub fn point_count(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    /// Duration in minutes, 0 when either end has no timestamp.
    pub fn duration_minutes(&self) -> f64 {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => minutes_between(start, end).max(0.0),
            _ => 0.0,
        }
    }

    /// Point indices covered by this segment.
    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        self.start_index..=self.end_index
    }
}

/// Segmenter state between points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmenterState {
    Idle,
    InStop { start: usize },
}

/// Extract stop segments from a track.
///
/// Segments come out in index order and never overlap. Runs shorter than
/// [`MIN_STOP_POINTS`] are dropped.
pub fn segment_stops(points: &[TrackPoint], stop_speed_threshold: f64) -> Vec<StopSegment> {
    let mut segments = Vec::new();
    let mut state = SegmenterState::Idle;
    let mut dropped = 0usize;

    let mut flush = |start: usize, end: usize, segments: &mut Vec<StopSegment>| {
        if end + 1 - start >= MIN_STOP_POINTS {
            segments.push(StopSegment::from_run(points, start, end));
        } else {
            dropped += 1;
        }
    };

    for (i, point) in points.iter().enumerate() {
        let slow = point.instantaneous_speed < stop_speed_threshold;
        state = match (state, slow) {
            (SegmenterState::Idle, true) => SegmenterState::InStop { start: i },
            (SegmenterState::Idle, false) => SegmenterState::Idle,
            (SegmenterState::InStop { start }, true) => SegmenterState::InStop { start },
            (SegmenterState::InStop { start }, false) => {
                flush(start, i - 1, &mut segments);
                SegmenterState::Idle
            }
        };
    }

    if let SegmenterState::InStop { start } = state {
        flush(start, points.len() - 1, &mut segments);
    }

    debug!("[Segmenter] Dropped {} single-point runs", dropped);
    info!(
        "[Segmenter] Found {} stop segments in {} points (threshold {} m/s)",
        segments.len(),
        points.len(),
        stop_speed_threshold
    );

    segments
}
