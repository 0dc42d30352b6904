//! Ranking and the detected-peak output record.
//!
//! Clusters are ordered by composite score, highest first. The sort is stable
//! and clusters arrive in seed order, so equal scores keep their original
//! order. Nothing is filtered out here; quality cut-offs belong to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ScoredCluster;

/// A candidate summit, as handed to name lookup and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedPeak {
    /// 1-based position in the ranked list
    pub rank: u32,
    /// Cluster average position
    pub latitude: f64,
    pub longitude: f64,
    /// Highest elevation recorded at the stop (meters)
    pub elevation: f64,
    /// Mean elevation over the stop's points (meters)
    pub average_elevation: f64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Summed stop duration (minutes)
    pub duration_minutes: f64,
    /// Meters above the surrounding track
    pub prominence: f64,
    /// Composite score (0-100)
    pub score: f64,
    pub duration_score: f64,
    pub elevation_score: f64,
    pub prominence_score: f64,
    /// Number of stop segments merged into this peak
    pub segment_count: u32,
    /// Sequence index of the highest fix at the stop
    pub representative_index: u32,
}

impl DetectedPeak {
    fn from_scored(rank: u32, scored: &ScoredCluster) -> Self {
        let cluster = &scored.cluster;
        Self {
            rank,
            latitude: cluster.average_latitude,
            longitude: cluster.average_longitude,
            elevation: cluster.max_elevation,
            average_elevation: cluster.average_elevation,
            start_time: cluster.start_time,
            end_time: cluster.end_time,
            duration_minutes: cluster.total_duration_minutes,
            prominence: scored.prominence,
            score: scored.scores.score,
            duration_score: scored.scores.duration_score,
            elevation_score: scored.scores.elevation_score,
            prominence_score: scored.scores.prominence_score,
            segment_count: cluster.segments.len() as u32,
            representative_index: cluster.representative_index as u32,
        }
    }
}

/// Sort scored clusters by composite score, descending, and emit peaks.
pub fn rank_clusters(mut scored: Vec<ScoredCluster>) -> Vec<DetectedPeak> {
    scored.sort_by(|a, b| b.scores.score.total_cmp(&a.scores.score));

    scored
        .iter()
        .enumerate()
        .map(|(i, s)| DetectedPeak::from_scored(i as u32 + 1, s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PeakScores, StopCluster, StopSegment};

    fn scored(seed: usize, score: f64) -> ScoredCluster {
        let segment = StopSegment {
            start_index: seed,
            end_index: seed + 1,
            start_time: None,
            end_time: None,
            average_latitude: 46.0,
            average_longitude: 8.0,
            average_elevation: 1000.0,
            max_elevation: 1010.0,
        };
        ScoredCluster {
            cluster: StopCluster {
                segments: vec![segment],
                average_latitude: 46.0,
                average_longitude: 8.0,
                average_elevation: 1000.0,
                max_elevation: 1010.0,
                total_duration_minutes: 3.0,
                start_time: None,
                end_time: None,
                representative_index: seed + 1,
            },
            prominence: 10.0,
            scores: PeakScores {
                duration_score: score,
                elevation_score: score,
                prominence_score: score,
                score,
            },
        }
    }

    #[test]
    fn test_sorted_descending() {
        let peaks = rank_clusters(vec![scored(0, 40.0), scored(10, 90.0), scored(20, 60.0)]);
        let scores: Vec<f64> = peaks.iter().map(|p| p.score).collect();
        assert_eq!(scores, vec![90.0, 60.0, 40.0]);
        let ranks: Vec<u32> = peaks.iter().map(|p| p.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_ties_keep_seed_order() {
        let peaks = rank_clusters(vec![
            scored(0, 50.0),
            scored(10, 80.0),
            scored(20, 50.0),
            scored(30, 80.0),
        ]);
        let reps: Vec<u32> = peaks.iter().map(|p| p.representative_index).collect();
        assert_eq!(reps, vec![11, 31, 1, 21]);
    }

    #[test]
    fn test_nothing_filtered() {
        let peaks = rank_clusters(vec![scored(0, 0.0), scored(10, 1.0)]);
        assert_eq!(peaks.len(), 2);
        assert!(rank_clusters(vec![]).is_empty());
    }

    #[test]
    fn test_peak_fields() {
        let peak = &rank_clusters(vec![scored(4, 70.0)])[0];
        assert_eq!(peak.elevation, 1010.0);
        assert_eq!(peak.average_elevation, 1000.0);
        assert_eq!(peak.duration_minutes, 3.0);
        assert_eq!(peak.prominence, 10.0);
        assert_eq!(peak.segment_count, 1);
    }
}
