//! Grid signatures: a route reduced to a comparable shape.
//!
//! GPS traces of the same course never line up exactly, so routes are
//! compared by the set of fixed-precision grid cells they pass through
//! rather than by raw coordinates. Each coordinate is snapped to a grid
//! (precision 4 ≈ 10 m cells, precision 3 ≈ 100 m cells) and consecutive
//! visits to the same cell collapse to one entry, so dwelling at a
//! stoplight cannot inflate a route's footprint.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::polyline::decode_polyline;
use crate::GpsPoint;

/// Grid precision used throughout the system (~10 m cells).
pub const DEFAULT_GRID_PRECISION: u8 = 4;

/// A single cell of the comparison grid.
///
/// Stores latitude/longitude scaled by `10^precision` and rounded to the
/// nearest integer with `f64::round` (round-half-away-from-zero). Cell
/// identity decides signature equality, so cells are integers rather than
/// rounded floats: equality and hashing stay exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCell {
    pub lat: i64,
    pub lng: i64,
}

impl GridCell {
    /// Snap a GPS point onto the grid at the given decimal precision.
    pub fn snap(point: &GpsPoint, precision: u8) -> Self {
        let scale = 10f64.powi(i32::from(precision));
        Self {
            lat: (point.latitude * scale).round() as i64,
            lng: (point.longitude * scale).round() as i64,
        }
    }
}

/// A route's shape signature: the ordered, duplicate-free sequence of grid
/// cells it visits.
///
/// The ordered form is retained for path-shape uses; similarity comparison
/// treats the cells as an unordered set (see [`crate::similarity`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSignature {
    /// Grid cells in first-occurrence order
    pub cells: Vec<GridCell>,
    /// Decimal precision the cells were snapped at
    pub precision: u8,
}

impl RouteSignature {
    /// Build a signature from decoded GPS points.
    ///
    /// Points with non-finite or out-of-range coordinates are skipped. A
    /// cell already present in the signature is dropped, not re-appended,
    /// preserving the order cells were first visited in.
    ///
    /// # Example
    /// ```
    /// use route_metrics::{GpsPoint, RouteSignature, DEFAULT_GRID_PRECISION};
    ///
    /// let points = vec![
    ///     GpsPoint::new(51.50741, -0.12780),
    ///     GpsPoint::new(51.50742, -0.12781), // same 10 m cell
    ///     GpsPoint::new(51.50900, -0.13000),
    /// ];
    /// let sig = RouteSignature::from_points(&points, DEFAULT_GRID_PRECISION);
    /// assert_eq!(sig.len(), 2);
    /// ```
    pub fn from_points(points: &[GpsPoint], precision: u8) -> Self {
        let mut seen = HashSet::with_capacity(points.len());
        let mut cells = Vec::new();

        for point in points.iter().filter(|p| p.is_valid()) {
            let cell = GridCell::snap(point, precision);
            if seen.insert(cell) {
                cells.push(cell);
            }
        }

        Self { cells, precision }
    }

    /// Decode an encoded polyline and build its signature.
    pub fn from_polyline(encoded: &str, precision: u8) -> Result<Self> {
        let points = decode_polyline(encoded)?;
        Ok(Self::from_points(&points, precision))
    }

    /// Number of distinct cells in the signature.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when the source route contributed no distinct grid cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The signature's cells as an unordered set.
    pub fn cell_set(&self) -> HashSet<GridCell> {
        self.cells.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_rounds_each_axis() {
        let cell = GridCell::snap(&GpsPoint::new(51.507412, -0.127809), 4);
        assert_eq!(cell, GridCell { lat: 515074, lng: -1278 });

        // Coarser grid, fewer digits survive
        let cell = GridCell::snap(&GpsPoint::new(51.507412, -0.127809), 3);
        assert_eq!(cell, GridCell { lat: 51507, lng: -128 });
    }

    #[test]
    fn test_snap_rounds_half_away_from_zero() {
        let cell = GridCell::snap(&GpsPoint::new(0.00005, -0.00005), 4);
        assert_eq!(cell, GridCell { lat: 1, lng: -1 });
    }

    #[test]
    fn test_signature_dedup_preserves_first_occurrence_order() {
        let points = vec![
            GpsPoint::new(51.5074, -0.1278),
            GpsPoint::new(51.5080, -0.1290),
            GpsPoint::new(51.5074, -0.1278), // revisit of the first cell
            GpsPoint::new(51.5090, -0.1300),
        ];

        let sig = RouteSignature::from_points(&points, 4);

        assert_eq!(sig.len(), 3);
        assert_eq!(sig.cells[0], GridCell { lat: 515074, lng: -1278 });
        assert_eq!(sig.cells[1], GridCell { lat: 515080, lng: -1290 });
        assert_eq!(sig.cells[2], GridCell { lat: 515090, lng: -1300 });
    }

    #[test]
    fn test_signature_never_longer_than_input() {
        let points: Vec<GpsPoint> = (0..50)
            .map(|i| GpsPoint::new(51.5 + f64::from(i % 10) * 0.0001, -0.12))
            .collect();

        let sig = RouteSignature::from_points(&points, 4);
        assert!(sig.len() <= points.len());
        assert_eq!(sig.len(), 10);
    }

    #[test]
    fn test_signature_skips_invalid_points() {
        let points = vec![
            GpsPoint::new(f64::NAN, 0.0),
            GpsPoint::new(91.0, 0.0),
            GpsPoint::new(51.5074, -0.1278),
        ];

        let sig = RouteSignature::from_points(&points, 4);
        assert_eq!(sig.len(), 1);
    }

    #[test]
    fn test_signature_from_empty_input() {
        let sig = RouteSignature::from_points(&[], 4);
        assert!(sig.is_empty());
    }

    #[test]
    fn test_signature_from_polyline() {
        let sig = RouteSignature::from_polyline("_p~iF~ps|U_ulLnnqC_mqNvxq`@", 4).unwrap();
        assert_eq!(sig.len(), 3);
        assert_eq!(sig.cells[0], GridCell { lat: 385000, lng: -1202000 });
    }

    #[test]
    fn test_signature_from_polyline_propagates_decode_errors() {
        assert!(RouteSignature::from_polyline("_p~iF", 4).is_err());
    }
}
