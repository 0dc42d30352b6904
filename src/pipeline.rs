//! End-to-end detection.
//!
//! Parse → segment → cluster → score → rank, once per track. Every run owns
//! its own point, segment and cluster vectors; nothing is shared between runs,
//! so independent tracks can be processed concurrently.
//!
//! Cancellation is checked between stages only.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use log::info;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{Result, SummitError};
use crate::{
    cluster_stops, elevation_threshold, parse_track, rank_clusters, score_clusters,
    segment_stops, DetectedPeak, DetectionConfig, TrackPoint,
};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionPhase {
    Parsing,
    Segmenting,
    Clustering,
    Scoring,
    Ranking,
}

impl DetectionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionPhase::Parsing => "parsing",
            DetectionPhase::Segmenting => "segmenting",
            DetectionPhase::Clustering => "clustering",
            DetectionPhase::Scoring => "scoring",
            DetectionPhase::Ranking => "ranking",
        }
    }
}

/// Receives stage transitions and can stop a run between stages.
pub trait DetectionProgressCallback: Send + Sync {
    /// Called when a stage is about to start.
    fn on_phase(&self, phase: DetectionPhase);

    /// Polled before each stage; returning true aborts with `Cancelled`.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// No-op observer used by the plain entry points.
pub struct NoopProgress;

impl DetectionProgressCallback for NoopProgress {
    fn on_phase(&self, _phase: DetectionPhase) {}
}

/// Atomic progress tracker that can be polled (and cancelled) from another thread.
pub struct AtomicProgressTracker {
    pub phase: Mutex<String>,
    pub phases_started: AtomicU32,
    cancelled: AtomicBool,
}

impl Default for AtomicProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicProgressTracker {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(String::new()),
            phases_started: AtomicU32::new(0),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Request cancellation at the next stage boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Name of the most recently started stage.
    pub fn current_phase(&self) -> String {
        self.phase.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl DetectionProgressCallback for AtomicProgressTracker {
    fn on_phase(&self, phase: DetectionPhase) {
        if let Ok(mut current) = self.phase.lock() {
            *current = phase.as_str().to_string();
        }
        self.phases_started.fetch_add(1, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Counters describing one detection run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionStats {
    pub point_count: usize,
    pub segment_count: usize,
    /// Clusters that met the minimum duration
    pub cluster_count: usize,
    /// Clusters dropped for falling short of the minimum duration
    pub discarded_clusters: usize,
    /// Elevation at the configured percentile, if the track has elevation
    pub elevation_threshold: Option<f64>,
}

/// Ranked peaks plus run statistics.
///
/// An empty `peaks` list is the "no peaks detected" outcome, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub peaks: Vec<DetectedPeak>,
    pub stats: DetectionStats,
}

impl DetectionResult {
    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    /// Peaks at or above a score, keeping rank order.
    pub fn peaks_above(&self, min_score: f64) -> impl Iterator<Item = &DetectedPeak> {
        self.peaks.iter().filter(move |p| p.score >= min_score)
    }
}

fn enter(phase: DetectionPhase, progress: &dyn DetectionProgressCallback) -> Result<()> {
    if progress.is_cancelled() {
        info!("[Peaks] Cancelled before {}", phase.as_str());
        return Err(SummitError::Cancelled { phase });
    }
    progress.on_phase(phase);
    Ok(())
}

/// Run stages 2-5 over an already-parsed track.
fn run_stages(
    points: &[TrackPoint],
    config: &DetectionConfig,
    progress: &dyn DetectionProgressCallback,
    started: Instant,
) -> Result<DetectionResult> {
    enter(DetectionPhase::Segmenting, progress)?;
    let segments = segment_stops(points, config.stop_speed_threshold);

    enter(DetectionPhase::Clustering, progress)?;
    let outcome = cluster_stops(&segments, points, config);
    let cluster_count = outcome.clusters.len();

    enter(DetectionPhase::Scoring, progress)?;
    let scored = score_clusters(outcome.clusters, points, config);

    enter(DetectionPhase::Ranking, progress)?;
    let peaks = rank_clusters(scored);

    let stats = DetectionStats {
        point_count: points.len(),
        segment_count: segments.len(),
        cluster_count,
        discarded_clusters: outcome.discarded,
        elevation_threshold: elevation_threshold(points, config.elevation_percentile),
    };

    info!(
        "[Peaks] {} peaks from {} points ({} segments, {} clusters, {} discarded) in {}ms",
        peaks.len(),
        stats.point_count,
        stats.segment_count,
        stats.cluster_count,
        stats.discarded_clusters,
        started.elapsed().as_millis()
    );

    Ok(DetectionResult { peaks, stats })
}

/// Detect peaks in an already-parsed track.
pub fn analyze_points(points: &[TrackPoint], config: &DetectionConfig) -> Result<DetectionResult> {
    config.validate()?;
    if points.is_empty() {
        return Err(SummitError::EmptyTrack);
    }
    run_stages(points, config, &NoopProgress, Instant::now())
}

/// Detect peaks in raw track bytes (GPX or JSON fixes).
pub fn detect_peaks(bytes: &[u8], config: &DetectionConfig) -> Result<DetectionResult> {
    detect_peaks_with_progress(bytes, config, &NoopProgress)
}

/// Detect peaks, reporting each stage to `progress` and honoring cancellation.
pub fn detect_peaks_with_progress(
    bytes: &[u8],
    config: &DetectionConfig,
    progress: &dyn DetectionProgressCallback,
) -> Result<DetectionResult> {
    let started = Instant::now();
    config.validate()?;

    enter(DetectionPhase::Parsing, progress)?;
    let points = parse_track(bytes)?;

    run_stages(&points, config, progress, started)
}

/// Read a track file from disk and detect peaks.
pub fn detect_peaks_from_path(
    path: impl AsRef<Path>,
    config: &DetectionConfig,
) -> Result<DetectionResult> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| SummitError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    detect_peaks(&bytes, config)
}

/// Read a track file without blocking the runtime, then detect peaks.
///
/// The detection itself is synchronous and never blocks on I/O.
#[cfg(feature = "async")]
pub async fn detect_peaks_from_path_async(
    path: impl AsRef<Path>,
    config: &DetectionConfig,
) -> Result<DetectionResult> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|e| SummitError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    detect_peaks(&bytes, config)
}

/// Run independent detections over many tracks.
///
/// Results come back in input order, each with its own success or failure.
pub fn detect_peaks_batch(
    tracks: &[(String, Vec<u8>)],
    config: &DetectionConfig,
) -> Vec<(String, Result<DetectionResult>)> {
    info!("[Peaks] Batch detection over {} tracks", tracks.len());

    #[cfg(feature = "parallel")]
    let results: Vec<(String, Result<DetectionResult>)> = tracks
        .par_iter()
        .map(|(id, bytes)| (id.clone(), detect_peaks(bytes, config)))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let results: Vec<(String, Result<DetectionResult>)> = tracks
        .iter()
        .map(|(id, bytes)| (id.clone(), detect_peaks(bytes, config)))
        .collect();

    results
}
