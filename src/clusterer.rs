//! Stop clustering.
//!
//! Greedy single pass over the stop segments. Each unprocessed segment seeds a
//! cluster; every later unprocessed segment joins it if it is within
//! `cluster_distance` meters of the SEED's average position OR starts within
//! `cluster_time_gap` minutes of the SEED's end. Comparisons always anchor to
//! the seed, never to the latest member, so the relation is not transitive:
//! two members of one cluster can be far apart from each other.
//!
//! Clusters whose summed member duration is below `min_stop_duration` are
//! discarded; their segments stay consumed and are not reconsidered.

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::geo_utils::haversine_distance;
use crate::{elevation_stats, minutes_between, DetectionConfig, StopSegment, TrackPoint};

/// One or more stop segments representing a single physical stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopCluster {
    /// Member segments; the seed comes first, the rest in original order
    pub segments: Vec<StopSegment>,
    /// Mean over all member points
    pub average_latitude: f64,
    pub average_longitude: f64,
    pub average_elevation: f64,
    pub max_elevation: f64,
    /// Sum of member segment durations
    pub total_duration_minutes: f64,
    /// Start of the first member
    pub start_time: Option<DateTime<Utc>>,
    /// End of the last member
    pub end_time: Option<DateTime<Utc>>,
    /// Sequence index of the highest member point (the summit fix)
    pub representative_index: usize,
}

impl StopCluster {
    fn from_segments(segments: Vec<StopSegment>, points: &[TrackPoint]) -> Self {
        let member_points: Vec<&TrackPoint> = segments
            .iter()
            .flat_map(|s| &points[s.start_index..=s.end_index])
            .collect();
        let n = member_points.len() as f64;

        let average_latitude = member_points.iter().map(|p| p.latitude).sum::<f64>() / n;
        let average_longitude = member_points.iter().map(|p| p.longitude).sum::<f64>() / n;
        let (average_elevation, max_elevation) =
            elevation_stats(member_points.iter().copied());

        // Highest fix, first one wins ties; first member point without elevation data
        let representative_index = member_points
            .iter()
            .filter_map(|p| p.elevation.map(|e| (p.sequence_index, e)))
            .fold(None, |best: Option<(usize, f64)>, (idx, ele)| match best {
                Some((_, best_ele)) if best_ele >= ele => best,
                _ => Some((idx, ele)),
            })
            .map(|(idx, _)| idx)
            .unwrap_or(segments[0].start_index);

        let total_duration_minutes = segments.iter().map(|s| s.duration_minutes()).sum();
        let start_time = segments[0].start_time;
        let end_time = segments[segments.len() - 1].end_time;

        Self {
            segments,
            average_latitude,
            average_longitude,
            average_elevation,
            max_elevation,
            total_duration_minutes,
            start_time,
            end_time,
            representative_index,
        }
    }

    /// Index of the seed segment's first point, used as the stable tie-break key.
    pub fn seed_index(&self) -> usize {
        self.segments[0].start_index
    }

    /// Wall-clock span from first member start to last member end, in minutes.
    pub fn span_minutes(&self) -> f64 {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => minutes_between(start, end).max(0.0),
            _ => 0.0,
        }
    }
}

/// Clusters produced from one run, plus how many were dropped.
#[derive(Debug, Clone, Default)]
pub struct ClusteringOutcome {
    /// Qualifying clusters in seed order
    pub clusters: Vec<StopCluster>,
    /// Clusters discarded for falling short of `min_stop_duration`
    pub discarded: usize,
}

/// Whether `candidate` belongs with the cluster seeded by `seed`.
fn joins_seed(seed: &StopSegment, candidate: &StopSegment, config: &DetectionConfig) -> bool {
    let distance = haversine_distance(
        seed.average_latitude,
        seed.average_longitude,
        candidate.average_latitude,
        candidate.average_longitude,
    );
    if distance <= config.cluster_distance {
        return true;
    }

    match (seed.end_time, candidate.start_time) {
        (Some(end), Some(start)) => minutes_between(end, start) <= config.cluster_time_gap,
        _ => false,
    }
}

/// Merge stop segments into clusters.
///
/// `points` is the track the segments were extracted from; cluster aggregates
/// are computed over the member points themselves.
pub fn cluster_stops(
    segments: &[StopSegment],
    points: &[TrackPoint],
    config: &DetectionConfig,
) -> ClusteringOutcome {
    let mut outcome = ClusteringOutcome::default();
    let mut used = vec![false; segments.len()];

    for (i, seed) in segments.iter().enumerate() {
        if used[i] {
            continue;
        }
        used[i] = true;

        let mut members = vec![seed.clone()];
        for (j, candidate) in segments.iter().enumerate().skip(i + 1) {
            if !used[j] && joins_seed(seed, candidate, config) {
                members.push(candidate.clone());
                used[j] = true;
            }
        }

        let total: f64 = members.iter().map(|s| s.duration_minutes()).sum();
        if total < config.min_stop_duration {
            debug!(
                "[Clusterer] Discarding cluster seeded at point {} ({} segments, {:.2} min < {:.2} min)",
                seed.start_index,
                members.len(),
                total,
                config.min_stop_duration
            );
            outcome.discarded += 1;
            continue;
        }

        outcome.clusters.push(StopCluster::from_segments(members, points));
    }

    info!(
        "[Clusterer] {} segments -> {} clusters ({} below {:.1} min discarded)",
        segments.len(),
        outcome.clusters.len(),
        outcome.discarded,
        config.min_stop_duration
    );

    outcome
}
