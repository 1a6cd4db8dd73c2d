//! # Route Metrics
//!
//! Route-similarity and monthly metrics aggregation for GPS-tracked
//! activities.
//!
//! This library provides:
//! - Encoded polyline decoding into GPS coordinates
//! - Grid-cell route signatures with Jaccard similarity
//! - Greedy unique-route clustering (the route diversity score)
//! - Per-athlete monthly leaderboard aggregation
//!
//! The engine is purely functional: it fetches nothing, persists nothing,
//! and holds no shared state. Activity records go in, leaderboard entries
//! come out, and the whole pipeline re-runs on every call.
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel batch aggregation with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use route_metrics::{aggregate_month, ActivityRecord};
//!
//! let activities = vec![ActivityRecord {
//!     activity_id: "morning-loop".into(),
//!     athlete_id: "ath-1".into(),
//!     start_date: "2024-06-01T08:15:00Z".into(),
//!     distance: 5000.0,
//!     moving_time: 1500,
//!     ..Default::default()
//! }];
//!
//! let entry = aggregate_month("ath-1", &activities, 6, 2024);
//! assert_eq!(entry.total_km, 5.0);
//! assert_eq!(entry.avg_pace, "5:00");
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{MetricsError, Result};

// Encoded polyline decoding
pub mod polyline;
pub use polyline::decode_polyline;

// Grid-cell route signatures
pub mod signature;
pub use signature::{GridCell, RouteSignature, DEFAULT_GRID_PRECISION};

// Jaccard similarity and unique-route clustering
pub mod similarity;
pub use similarity::{jaccard_index, routes_similar, ClusterSet, DEFAULT_JACCARD_THRESHOLD};

// Monthly leaderboard aggregation
pub mod aggregate;
#[cfg(feature = "parallel")]
pub use aggregate::aggregate_month_parallel;
pub use aggregate::{
    aggregate_month, aggregate_month_with_config, best_of, calendar_counts, diversity_score,
    filter_month, total_distance_km, ActivityRecord, ActivitySummary, BestActivity, BestOf,
    CumulativePoint, LeaderboardEntry, MedalCounts, MetricsConfig, SegmentEffort,
};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude in decimal degrees.
///
/// # Example
/// ```
/// use route_metrics::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(51.5074, -0.1278).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_decode_to_leaderboard_pipeline() {
        // The full flow a caller runs: decode, sign, cluster, aggregate.
        let route = decode_polyline("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
        let signature = RouteSignature::from_points(&route, DEFAULT_GRID_PRECISION);
        assert!(routes_similar(&signature, &signature, DEFAULT_JACCARD_THRESHOLD));

        let activities = vec![ActivityRecord {
            activity_id: "a1".into(),
            athlete_id: "ath-1".into(),
            start_date: "2024-06-01T08:15:00Z".into(),
            distance: 5000.0,
            moving_time: 1500,
            polyline: Some("_p~iF~ps|U_ulLnnqC_mqNvxq`@".into()),
            ..Default::default()
        }];

        let entry = aggregate_month("ath-1", &activities, 6, 2024);
        assert_eq!(entry.activity_count, 1);
        assert_eq!(entry.diversity, 1.0);
    }
}
