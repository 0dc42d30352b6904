//! Detection configuration.
//!
//! A [`DetectionConfig`] is an immutable value passed explicitly into every
//! pipeline stage. Partial JSON documents are accepted: any field left out
//! keeps its default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SummitError};

/// Configuration for stop-based summit detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Points slower than this count as stopped (m/s)
    pub stop_speed_threshold: f64,
    /// Spatial merge radius between a seed stop and later stops (meters)
    pub cluster_distance: f64,
    /// Temporal merge window between a seed stop's end and a later stop's start (minutes)
    pub cluster_time_gap: f64,
    /// Minimum total duration for a cluster to qualify (minutes)
    pub min_stop_duration: f64,
    /// Neighbor radius around a cluster for prominence (meters)
    pub prominence_radius: f64,
    /// Neighbor time window around a cluster's start for prominence (minutes)
    pub prominence_time_window: f64,
    /// Track elevation percentile a cluster must reach for full elevation score (0-100)
    pub elevation_percentile: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            stop_speed_threshold: 0.5,   // slow shuffle still counts as stopped
            cluster_distance: 50.0,      // GPS drift while standing on a summit
            cluster_time_gap: 5.0,
            min_stop_duration: 1.0,
            prominence_radius: 100.0,
            prominence_time_window: 10.0,
            elevation_percentile: 80.0,
        }
    }
}

impl DetectionConfig {
    /// Create a sensitive config (short breaks count, more candidates)
    pub fn sensitive() -> Self {
        Self::default()
    }

    /// Create a conservative config (longer breaks required, fewer candidates)
    pub fn conservative() -> Self {
        Self {
            cluster_time_gap: 15.0,
            min_stop_duration: 3.0,
            ..Default::default()
        }
    }

    /// Look up a preset by name ("sensitive"/"default" or "conservative").
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "default" | "sensitive" => Some(Self::sensitive()),
            "conservative" => Some(Self::conservative()),
            _ => None,
        }
    }

    /// Parse a (possibly partial) JSON config and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SummitError::invalid_config("<json>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| SummitError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&json)
    }

    /// Check every field is finite and in range.
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("stop_speed_threshold", self.stop_speed_threshold),
            ("cluster_distance", self.cluster_distance),
            ("cluster_time_gap", self.cluster_time_gap),
            ("min_stop_duration", self.min_stop_duration),
            ("prominence_radius", self.prominence_radius),
            ("prominence_time_window", self.prominence_time_window),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(SummitError::invalid_config(
                    field,
                    format!("must be a finite, non-negative number (got {})", value),
                ));
            }
        }

        if !self.elevation_percentile.is_finite()
            || !(0.0..=100.0).contains(&self.elevation_percentile)
        {
            return Err(SummitError::invalid_config(
                "elevation_percentile",
                format!("must be within 0-100 (got {})", self.elevation_percentile),
            ));
        }

        Ok(())
    }
}
