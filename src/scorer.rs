//! Candidate scoring.
//!
//! Each cluster gets three sub-scores on a 0-100 scale and their mean as the
//! composite:
//! - **duration**: `min(total_minutes / 10, 1) × 100`
//! - **elevation**: 100 when the cluster's average elevation reaches the
//!   track's elevation percentile, otherwise 50
//! - **prominence**: `min(prominence / 50, 1) × 100`, floored at 0
//!
//! Prominence is the cluster's max elevation minus the mean elevation of its
//! neighbors: every track point within `prominence_radius` meters of the
//! cluster's average position or within `prominence_time_window` minutes of
//! its start, excluding the cluster's representative point.
//!
//! Scoring is a pure function of the cluster and the full track.

use log::{debug, info};
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::geo_utils::meters_to_degrees;
use crate::{minutes_between, DetectionConfig, StopCluster, TrackPoint};

/// Duration (minutes) that earns a full duration score.
pub const FULL_DURATION_MINUTES: f64 = 10.0;

/// Prominence (meters) that earns a full prominence score.
pub const FULL_PROMINENCE_METERS: f64 = 50.0;

/// Elevation score for clusters at or above the percentile bar.
pub const HIGH_ELEVATION_SCORE: f64 = 100.0;

/// Elevation score for clusters below the bar, or on tracks without elevation.
pub const LOW_ELEVATION_SCORE: f64 = 50.0;

/// Sub-scores and composite for one cluster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakScores {
    pub duration_score: f64,
    pub elevation_score: f64,
    pub prominence_score: f64,
    /// Mean of the three sub-scores
    pub score: f64,
}

impl PeakScores {
    fn new(duration_score: f64, elevation_score: f64, prominence_score: f64) -> Self {
        Self {
            duration_score,
            elevation_score,
            prominence_score,
            score: (duration_score + elevation_score + prominence_score) / 3.0,
        }
    }
}

/// A cluster with its prominence and scores attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCluster {
    pub cluster: StopCluster,
    /// Meters above the neighbor mean (0 with no neighbors)
    pub prominence: f64,
    pub scores: PeakScores,
}

/// A fix in the neighbor index, keyed by its sequence index
#[derive(Debug, Clone, Copy)]
struct IndexedFix {
    sequence_index: usize,
    latitude: f64,
    longitude: f64,
}

impl RTreeObject for IndexedFix {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.latitude, self.longitude])
    }
}

impl PointDistance for IndexedFix {
    /// Squared planar distance in degrees; only used as a coarse prefilter.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.latitude - point[0];
        let dlng = self.longitude - point[1];
        dlat * dlat + dlng * dlng
    }
}

fn build_fix_index(points: &[TrackPoint]) -> RTree<IndexedFix> {
    RTree::bulk_load(
        points
            .iter()
            .map(|p| IndexedFix {
                sequence_index: p.sequence_index,
                latitude: p.latitude,
                longitude: p.longitude,
            })
            .collect(),
    )
}

/// Query centers for a degree-space search around `longitude`.
///
/// A search circle that crosses the antimeridian is repeated at the
/// longitude shifted by 360° so fixes on the far side are found too.
fn wrapped_centers(latitude: f64, longitude: f64, radius_deg: f64) -> Vec<[f64; 2]> {
    let mut centers = vec![[latitude, longitude]];
    if longitude + radius_deg > 180.0 {
        centers.push([latitude, longitude - 360.0]);
    }
    if longitude - radius_deg < -180.0 {
        centers.push([latitude, longitude + 360.0]);
    }
    centers
}

/// Elevation at the given percentile of all points that have one.
///
/// Elevations are sorted ascending and the value at
/// `floor(N × percentile / 100)` is returned (clamped to the last element).
/// `None` when no point has elevation.
pub fn elevation_threshold(points: &[TrackPoint], percentile: f64) -> Option<f64> {
    let mut elevations: Vec<f64> = points.iter().filter_map(|p| p.elevation).collect();
    if elevations.is_empty() {
        return None;
    }
    elevations.sort_by(|a, b| a.total_cmp(b));

    let idx = ((elevations.len() as f64 * percentile / 100.0).floor() as usize)
        .min(elevations.len() - 1);
    Some(elevations[idx])
}

/// Indices of the cluster's prominence neighbors, in ascending order.
fn neighbor_indices(
    cluster: &StopCluster,
    points: &[TrackPoint],
    index: &RTree<IndexedFix>,
    config: &DetectionConfig,
) -> Vec<usize> {
    let mut is_neighbor = vec![false; points.len()];

    // Spatial: coarse degree-space query, then exact haversine
    let radius_deg = meters_to_degrees(config.prominence_radius, cluster.average_latitude);
    for center in wrapped_centers(cluster.average_latitude, cluster.average_longitude, radius_deg) {
        for candidate in index.locate_within_distance(center, radius_deg * radius_deg) {
            let p = &points[candidate.sequence_index];
            if p.distance_to_coord(cluster.average_latitude, cluster.average_longitude)
                <= config.prominence_radius
            {
                is_neighbor[candidate.sequence_index] = true;
            }
        }
    }

    // Temporal
    if let Some(start) = cluster.start_time {
        for (i, p) in points.iter().enumerate() {
            if let Some(t) = p.timestamp {
                if minutes_between(start, t).abs() <= config.prominence_time_window {
                    is_neighbor[i] = true;
                }
            }
        }
    }

    is_neighbor[cluster.representative_index] = false;

    is_neighbor
        .iter()
        .enumerate()
        .filter_map(|(i, &n)| n.then_some(i))
        .collect()
}

/// Max elevation minus the mean elevation of the neighbor set.
///
/// Neighbors without elevation are ignored; when none remain the prominence
/// is 0.
fn compute_prominence(cluster: &StopCluster, points: &[TrackPoint], neighbors: &[usize]) -> f64 {
    let elevations: Vec<f64> = neighbors
        .iter()
        .filter_map(|&i| points[i].elevation)
        .collect();
    if elevations.is_empty() {
        return 0.0;
    }
    let mean = elevations.iter().sum::<f64>() / elevations.len() as f64;
    cluster.max_elevation - mean
}

fn duration_score(total_minutes: f64) -> f64 {
    (total_minutes / FULL_DURATION_MINUTES).clamp(0.0, 1.0) * 100.0
}

fn elevation_score(average_elevation: f64, threshold: Option<f64>) -> f64 {
    match threshold {
        Some(t) if average_elevation >= t => HIGH_ELEVATION_SCORE,
        _ => LOW_ELEVATION_SCORE,
    }
}

fn prominence_score(prominence: f64) -> f64 {
    (prominence / FULL_PROMINENCE_METERS).clamp(0.0, 1.0) * 100.0
}

/// Score every cluster against the full track.
///
/// Output order matches input order; no cluster is added or removed.
pub fn score_clusters(
    clusters: Vec<StopCluster>,
    points: &[TrackPoint],
    config: &DetectionConfig,
) -> Vec<ScoredCluster> {
    if clusters.is_empty() {
        return vec![];
    }

    let threshold = elevation_threshold(points, config.elevation_percentile);
    let index = build_fix_index(points);

    let scored: Vec<ScoredCluster> = clusters
        .into_iter()
        .map(|cluster| {
            let neighbors = neighbor_indices(&cluster, points, &index, config);
            let prominence = compute_prominence(&cluster, points, &neighbors);
            let scores = PeakScores::new(
                duration_score(cluster.total_duration_minutes),
                elevation_score(cluster.average_elevation, threshold),
                prominence_score(prominence),
            );

            debug!(
                "[Scorer] Cluster at point {}: {} neighbors, prominence {:.1}m, scores d={:.0} e={:.0} p={:.0} -> {:.1}",
                cluster.seed_index(),
                neighbors.len(),
                prominence,
                scores.duration_score,
                scores.elevation_score,
                scores.prominence_score,
                scores.score
            );

            ScoredCluster {
                cluster,
                prominence,
                scores,
            }
        })
        .collect();

    info!(
        "[Scorer] Scored {} clusters (elevation threshold {})",
        scored.len(),
        threshold.map_or_else(|| "n/a".to_string(), |t| format!("{:.1}m", t))
    );

    scored
}
