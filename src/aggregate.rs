//! Monthly leaderboard aggregation.
//!
//! This module folds one athlete's activities for a calendar month into a
//! single [`LeaderboardEntry`]: distance and time totals, pace and
//! grade-adjusted pace, medal counts from segment-effort PR ranks, fastest
//! split times, a sparse cumulative-distance timeline, and the route
//! diversity score driven by the similarity clusterer.
//!
//! Everything here is a pure function over in-memory records. Entries are
//! recomputed from scratch on every call; there is no cache to invalidate.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::signature::{RouteSignature, DEFAULT_GRID_PRECISION};
use crate::similarity::{ClusterSet, DEFAULT_JACCARD_THRESHOLD};

/// Split distances scored per month, as (split length, minimum activity
/// distance to qualify), both in meters.
const SPLITS: [(f64, f64); 3] = [(1000.0, 0.0), (5000.0, 5000.0), (10000.0, 10000.0)];

// ============================================================================
// Input Model
// ============================================================================

/// One segment effort inside an activity, with its personal-record rank
/// (1 = best ever, 2 = second, 3 = third) when the upstream source awarded
/// one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentEffort {
    pub name: Option<String>,
    pub pr_rank: Option<u8>,
}

/// A GPS-tracked activity as supplied by the collaborator fetch layer.
///
/// Missing optional fields are zero/absent, never an error: records are
/// deserialized with defaults throughout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityRecord {
    pub activity_id: String,
    pub athlete_id: String,
    pub name: String,
    /// Activity type, e.g. "Ride" or "Run"
    #[serde(rename = "type")]
    pub sport_type: String,
    /// Start timestamp, `YYYY-MM-DD...` string-formatted
    pub start_date: String,
    /// Distance in meters
    pub distance: f64,
    /// Moving time in seconds
    pub moving_time: u32,
    /// Total elevation gain in meters
    pub elevation_gain: f64,
    /// Encoded route polyline, absent for GPS-less activities
    pub polyline: Option<String>,
    pub segment_efforts: Vec<SegmentEffort>,
}

// ============================================================================
// Output Model
// ============================================================================

/// Medal tallies from segment-effort PR ranks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedalCounts {
    pub gold: u32,
    pub silver: u32,
    pub bronze: u32,
    /// Count of rank-1 efforts, tracked alongside gold
    pub route_records: u32,
}

/// One day on the cumulative-distance timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativePoint {
    pub date: String,
    pub cum_km: f64,
}

/// The slice of an activity handed onward for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub date: String,
    pub distance: f64,
    #[serde(rename = "type")]
    pub sport_type: String,
    pub moving_time: u32,
    pub elevation_gain: f64,
}

/// An athlete's longest and fastest activities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestOf {
    pub longest: BestActivity,
    pub fastest: BestActivity,
}

/// One "best of" pick with the fields the dashboard renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestActivity {
    pub activity_id: String,
    pub name: String,
    pub distance: f64,
    /// Average speed in m/s, 0 when moving time is 0
    pub speed: f64,
    pub polyline: Option<String>,
}

/// One athlete's leaderboard row for one calendar month.
///
/// Immutable once produced. Time-valued fields are pre-formatted as
/// `H:MM:SS` (or `M:SS` below an hour), truncating fractional seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub athlete_id: String,
    /// Sparse cumulative-distance timeline, ascending by day
    pub cum: Vec<CumulativePoint>,
    pub medals: MedalCounts,
    /// Average pace over the month, seconds per km, formatted
    pub avg_pace: String,
    pub total_elevation_gain: f64,
    /// Elevation gain per activity, 0 for an empty month
    pub avg_elevation_gain: f64,
    /// Grade-adjusted pace: pace scaled by (1 + elevation/distance)
    pub gap: String,
    pub total_moving_time: String,
    pub fastest_1km: String,
    pub fastest_5km: String,
    pub fastest_10km: String,
    /// Unique routes / activities, rounded to 2 decimals
    pub diversity: f64,
    pub total_km: f64,
    pub activity_count: u32,
    pub activities: Vec<ActivitySummary>,
}

/// Tuning knobs for the aggregation pipeline.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Decimal precision for grid-cell snapping. Default: 4 (~10 m cells)
    pub grid_precision: u8,
    /// Jaccard threshold for judging two routes the same. Default: 0.7
    pub jaccard_threshold: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            grid_precision: DEFAULT_GRID_PRECISION,
            jaccard_threshold: DEFAULT_JACCARD_THRESHOLD,
        }
    }
}

// ============================================================================
// Aggregation
// ============================================================================

/// Aggregate one athlete's activities for a calendar month with default
/// configuration.
///
/// # Arguments
/// * `athlete_id` - Athlete the entry is for
/// * `activities` - The athlete's activity records (any date range; the
///   month filter is applied here)
/// * `month` - Calendar month, 1-12
/// * `year` - Calendar year
///
/// # Example
/// ```
/// use route_metrics::{aggregate_month, ActivityRecord};
///
/// let activities = vec![ActivityRecord {
///     activity_id: "a1".into(),
///     athlete_id: "ath-1".into(),
///     start_date: "2024-06-01T08:15:00Z".into(),
///     distance: 5000.0,
///     moving_time: 1500,
///     ..Default::default()
/// }];
///
/// let entry = aggregate_month("ath-1", &activities, 6, 2024);
/// assert_eq!(entry.total_km, 5.0);
/// assert_eq!(entry.avg_pace, "5:00");
/// ```
pub fn aggregate_month(
    athlete_id: &str,
    activities: &[ActivityRecord],
    month: u32,
    year: i32,
) -> LeaderboardEntry {
    aggregate_month_with_config(athlete_id, activities, month, year, &MetricsConfig::default())
}

/// Aggregate one athlete's activities for a calendar month.
///
/// Bad records degrade, they never abort: activities with unparseable start
/// dates are excluded by the month filter, and activities whose polyline
/// fails to decode are excluded from route clustering (while still counting
/// toward the diversity denominator).
pub fn aggregate_month_with_config(
    athlete_id: &str,
    activities: &[ActivityRecord],
    month: u32,
    year: i32,
    config: &MetricsConfig,
) -> LeaderboardEntry {
    let mut monthly = filter_month(activities, month, year);
    monthly.sort_by(|a, b| a.start_date.cmp(&b.start_date));

    let activity_count = monthly.len();
    let total_distance: f64 = monthly.iter().map(|a| a.distance).sum();
    let total_moving: u64 = monthly.iter().map(|a| u64::from(a.moving_time)).sum();
    let total_elevation: f64 = monthly.iter().map(|a| a.elevation_gain).sum();

    let distance_km = total_distance / 1000.0;
    let avg_pace = if distance_km > 0.0 {
        total_moving as f64 / distance_km
    } else {
        0.0
    };
    let avg_elevation = if activity_count > 0 {
        total_elevation / activity_count as f64
    } else {
        0.0
    };
    let grade = if total_distance > 0.0 {
        total_elevation / total_distance
    } else {
        0.0
    };
    let gap = avg_pace * (1.0 + grade);

    let unique_routes = count_unique_routes(&monthly, config);
    let diversity = diversity_score(unique_routes, activity_count);

    debug!(
        "athlete {}: {} activities in {:04}-{:02}, {} unique routes",
        athlete_id, activity_count, year, month, unique_routes
    );

    LeaderboardEntry {
        athlete_id: athlete_id.to_string(),
        cum: cumulative_timeline(&monthly),
        medals: count_medals(&monthly),
        avg_pace: format_elapsed(avg_pace),
        total_elevation_gain: total_elevation,
        avg_elevation_gain: avg_elevation,
        gap: format_elapsed(gap),
        total_moving_time: format_elapsed(total_moving as f64),
        fastest_1km: format_elapsed(fastest_split(&monthly, SPLITS[0])),
        fastest_5km: format_elapsed(fastest_split(&monthly, SPLITS[1])),
        fastest_10km: format_elapsed(fastest_split(&monthly, SPLITS[2])),
        diversity,
        total_km: round2(distance_km),
        activity_count: activity_count as u32,
        activities: monthly
            .iter()
            .map(|a| ActivitySummary {
                date: day_key(a).unwrap_or_default().to_string(),
                distance: a.distance,
                sport_type: a.sport_type.clone(),
                moving_time: a.moving_time,
                elevation_gain: a.elevation_gain,
            })
            .collect(),
    }
}

/// Aggregate a batch of athletes in parallel.
///
/// Each athlete's month is independent, so the fan-out is embarrassingly
/// parallel. Recommended once the roster grows past a handful of athletes.
#[cfg(feature = "parallel")]
pub fn aggregate_month_parallel(
    athletes: &[(String, Vec<ActivityRecord>)],
    month: u32,
    year: i32,
    config: &MetricsConfig,
) -> Vec<LeaderboardEntry> {
    use rayon::prelude::*;

    athletes
        .par_iter()
        .map(|(athlete_id, activities)| {
            aggregate_month_with_config(athlete_id, activities, month, year, config)
        })
        .collect()
}

/// Filter activities to one calendar month.
///
/// The day portion of `start_date` (first 10 characters) is parsed as
/// `YYYY-MM-DD`; records that fail to parse are dropped here rather than
/// failing the batch.
pub fn filter_month(activities: &[ActivityRecord], month: u32, year: i32) -> Vec<&ActivityRecord> {
    activities
        .iter()
        .filter(|a| {
            day_key(a)
                .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
                .map(|date| date.month() == month && date.year() == year)
                .unwrap_or(false)
        })
        .collect()
}

/// Activity count per calendar day, across all supplied activities.
pub fn calendar_counts(activities: &[ActivityRecord]) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for activity in activities {
        if let Some(day) = day_key(activity) {
            *counts.entry(day.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

/// Pick an athlete's longest and fastest activities.
///
/// Returns `None` for an empty list. Speed is distance over moving time,
/// 0 for activities with no moving time.
pub fn best_of(activities: &[ActivityRecord]) -> Option<BestOf> {
    let longest = activities
        .iter()
        .max_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;

    let fastest = activities.iter().max_by(|a, b| {
        speed_of(a)
            .partial_cmp(&speed_of(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    })?;

    Some(BestOf {
        longest: best_activity(longest),
        fastest: best_activity(fastest),
    })
}

/// Total distance across all supplied activities, in km rounded to 2
/// decimals.
pub fn total_distance_km(activities: &[ActivityRecord]) -> f64 {
    round2(activities.iter().map(|a| a.distance).sum::<f64>() / 1000.0)
}

/// Fraction of a month's activities that were distinct routes.
///
/// 0 for a month with no activities.
pub fn diversity_score(unique_routes: usize, activity_count: usize) -> f64 {
    if activity_count == 0 {
        return 0.0;
    }
    round2(unique_routes as f64 / activity_count as f64)
}

// ============================================================================
// Helpers
// ============================================================================

/// Format a duration in seconds as `H:MM:SS`, or `M:SS` below an hour.
/// Fractional seconds are truncated, not rounded.
fn format_elapsed(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Run the month's polyline-bearing activities through the greedy clusterer
/// and count distinct routes.
fn count_unique_routes(monthly: &[&ActivityRecord], config: &MetricsConfig) -> usize {
    let mut clusters = ClusterSet::new(config.jaccard_threshold);

    for activity in monthly {
        let encoded = match activity.polyline.as_deref() {
            Some(p) if !p.is_empty() => p,
            _ => continue,
        };
        match RouteSignature::from_polyline(encoded, config.grid_precision) {
            Ok(signature) => {
                clusters.insert(signature);
            }
            Err(err) => {
                warn!(
                    "activity {}: no usable route ({}), excluded from clustering",
                    activity.activity_id, err
                );
            }
        }
    }

    clusters.unique_count()
}

/// Per-day distance sums folded into a sparse running total.
fn cumulative_timeline(monthly: &[&ActivityRecord]) -> Vec<CumulativePoint> {
    let mut daily: BTreeMap<&str, f64> = BTreeMap::new();
    for activity in monthly {
        if let Some(day) = day_key(activity) {
            *daily.entry(day).or_insert(0.0) += activity.distance;
        }
    }

    let mut total = 0.0;
    daily
        .into_iter()
        .map(|(day, distance)| {
            total += distance;
            CumulativePoint {
                date: day.to_string(),
                cum_km: round2(total / 1000.0),
            }
        })
        .collect()
}

fn count_medals(monthly: &[&ActivityRecord]) -> MedalCounts {
    let mut medals = MedalCounts::default();
    for effort in monthly.iter().flat_map(|a| &a.segment_efforts) {
        match effort.pr_rank {
            Some(1) => {
                medals.gold += 1;
                medals.route_records += 1;
            }
            Some(2) => medals.silver += 1,
            Some(3) => medals.bronze += 1,
            _ => {}
        }
    }
    medals
}

/// Minimum projected pace over `split` meters among qualifying activities,
/// or 0 when none qualify.
fn fastest_split(monthly: &[&ActivityRecord], (split, min_distance): (f64, f64)) -> f64 {
    let best = monthly
        .iter()
        .filter(|a| a.distance >= min_distance && a.distance > 0.0)
        .map(|a| f64::from(a.moving_time) / a.distance * split)
        .fold(f64::INFINITY, f64::min);

    if best.is_finite() {
        best
    } else {
        0.0
    }
}

fn best_activity(activity: &ActivityRecord) -> BestActivity {
    BestActivity {
        activity_id: activity.activity_id.clone(),
        name: activity.name.clone(),
        distance: activity.distance,
        speed: speed_of(activity),
        polyline: activity.polyline.clone(),
    }
}

fn speed_of(activity: &ActivityRecord) -> f64 {
    if activity.moving_time > 0 {
        activity.distance / f64::from(activity.moving_time)
    } else {
        0.0
    }
}

/// Calendar-day key: the first 10 characters of the start timestamp.
fn day_key(activity: &ActivityRecord) -> Option<&str> {
    activity.start_date.get(..10)
}

/// Round half away from zero to 2 decimals; the crate-wide rounding rule.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
