//! Route similarity and unique-route counting.
//!
//! Two signatures are "the same route" when their grid-cell sets overlap
//! enough: the Jaccard index (intersection over union) absorbs GPS noise and
//! small detours that raw point comparison would not. On top of the pairwise
//! predicate, [`ClusterSet`] counts how many distinct routes a month of
//! activities actually contains.

use log::debug;

use crate::signature::RouteSignature;

/// Operating Jaccard threshold: cell sets overlapping by at least this
/// fraction are judged to be the same route.
pub const DEFAULT_JACCARD_THRESHOLD: f64 = 0.7;

/// Jaccard index of two signatures' cell sets.
///
/// Returns 0.0 when the union is empty (two empty signatures): there is
/// nothing to compare.
pub fn jaccard_index(a: &RouteSignature, b: &RouteSignature) -> f64 {
    let set_a = a.cell_set();
    let set_b = b.cell_set();

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.len() + set_b.len() - intersection;

    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Judge whether two signatures represent the same route.
///
/// Symmetric in its arguments. Two empty signatures are *not* similar at
/// any threshold: an absent route cannot be counted as a repeat of another
/// absent route.
///
/// # Example
/// ```
/// use route_metrics::{routes_similar, GpsPoint, RouteSignature, DEFAULT_GRID_PRECISION};
///
/// let points = vec![
///     GpsPoint::new(51.5074, -0.1278),
///     GpsPoint::new(51.5080, -0.1290),
/// ];
/// let sig = RouteSignature::from_points(&points, DEFAULT_GRID_PRECISION);
/// assert!(routes_similar(&sig, &sig, 0.7));
/// ```
pub fn routes_similar(a: &RouteSignature, b: &RouteSignature, threshold: f64) -> bool {
    if a.is_empty() && b.is_empty() {
        return false;
    }
    jaccard_index(a, b) >= threshold
}

/// The accumulating set of distinct routes seen in one athlete-month.
///
/// Clustering is greedy, incremental, and single-pass: each signature is
/// compared against every previously accepted member, in activity order. A
/// signature similar to *any* member is discarded as a repeat; otherwise it
/// becomes a new member. This is not a transitive equivalence-class
/// clustering: the final unique count can depend on processing order.
#[derive(Debug, Clone)]
pub struct ClusterSet {
    threshold: f64,
    members: Vec<RouteSignature>,
}

impl ClusterSet {
    /// Create an empty cluster set with the given similarity threshold.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            members: Vec::new(),
        }
    }

    /// Offer a signature in activity order.
    ///
    /// Returns `true` if the signature was accepted as a new distinct route,
    /// `false` if it matched an existing member and was discarded.
    pub fn insert(&mut self, signature: RouteSignature) -> bool {
        let is_repeat = self
            .members
            .iter()
            .any(|member| routes_similar(member, &signature, self.threshold));

        if is_repeat {
            debug!(
                "signature with {} cells matches an existing route, {} unique so far",
                signature.len(),
                self.members.len()
            );
            return false;
        }

        self.members.push(signature);
        true
    }

    /// Number of distinct routes accepted so far.
    pub fn unique_count(&self) -> usize {
        self.members.len()
    }

    /// The accepted signatures, in acceptance order.
    pub fn members(&self) -> &[RouteSignature] {
        &self.members
    }
}

impl Default for ClusterSet {
    fn default() -> Self {
        Self::new(DEFAULT_JACCARD_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GpsPoint;

    /// Build a signature whose cells are `count` points spaced one
    /// precision-4 cell apart, starting at `offset` cells north of a base.
    fn lattice_signature(offset: i64, count: usize) -> RouteSignature {
        let points: Vec<GpsPoint> = (0..count)
            .map(|i| GpsPoint::new(51.5 + (offset + i as i64) as f64 * 0.0001, -0.12))
            .collect();
        RouteSignature::from_points(&points, 4)
    }

    fn empty_signature() -> RouteSignature {
        RouteSignature::from_points(&[], 4)
    }

    #[test]
    fn test_jaccard_identical() {
        let sig = lattice_signature(0, 10);
        assert_eq!(jaccard_index(&sig, &sig), 1.0);
    }

    #[test]
    fn test_jaccard_partial_overlap() {
        // 10 cells each, sharing 5: |A ∩ B| = 5, |A ∪ B| = 15.
        let a = lattice_signature(0, 10);
        let b = lattice_signature(5, 10);
        let jaccard = jaccard_index(&a, &b);
        assert!((jaccard - 5.0 / 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_jaccard_empty_union_is_zero() {
        assert_eq!(jaccard_index(&empty_signature(), &empty_signature()), 0.0);
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let a = lattice_signature(0, 10);
        let b = lattice_signature(3, 10);

        for threshold in [0.0, 0.3, 0.5, 0.7, 1.0] {
            assert_eq!(
                routes_similar(&a, &b, threshold),
                routes_similar(&b, &a, threshold)
            );
        }
    }

    #[test]
    fn test_identical_signatures_similar_at_any_threshold_up_to_one() {
        let sig = lattice_signature(0, 8);
        for threshold in [0.0, 0.5, 0.7, 1.0] {
            assert!(routes_similar(&sig, &sig, threshold));
        }
    }

    #[test]
    fn test_disjoint_signatures_never_similar_above_zero() {
        let a = lattice_signature(0, 10);
        let b = lattice_signature(100, 10);

        assert!(!routes_similar(&a, &b, 0.01));
        assert!(!routes_similar(&a, &b, 0.7));
        // Jaccard 0.0 still meets a 0.0 threshold
        assert!(routes_similar(&a, &b, 0.0));
    }

    #[test]
    fn test_empty_signatures_not_similar_at_any_threshold() {
        for threshold in [0.0, 0.5, 0.7, 1.0] {
            assert!(!routes_similar(
                &empty_signature(),
                &empty_signature(),
                threshold
            ));
        }
        assert!(!routes_similar(
            &empty_signature(),
            &lattice_signature(0, 5),
            0.7
        ));
    }

    #[test]
    fn test_cluster_set_counts_unique_routes() {
        let mut clusters = ClusterSet::new(DEFAULT_JACCARD_THRESHOLD);

        // 9 of 11 cells shared with the first: Jaccard 9/11 ≈ 0.82, a repeat.
        assert!(clusters.insert(lattice_signature(0, 10)));
        assert!(!clusters.insert(lattice_signature(1, 10)));
        // Far away: a new route.
        assert!(clusters.insert(lattice_signature(100, 10)));

        assert_eq!(clusters.unique_count(), 2);
    }

    #[test]
    fn test_cluster_set_is_order_dependent() {
        // a–b overlap and b–c overlap, but a–c do not: greedy first-match
        // clustering keeps whichever arrives first as the anchor.
        let a = lattice_signature(0, 10);
        let b = lattice_signature(3, 10);
        let c = lattice_signature(6, 10);

        assert!(routes_similar(&a, &b, 0.5));
        assert!(routes_similar(&b, &c, 0.5));
        assert!(!routes_similar(&a, &c, 0.5));

        let mut forward = ClusterSet::new(0.5);
        forward.insert(a.clone());
        forward.insert(b.clone());
        forward.insert(c.clone());
        // b matched a; c matched nothing (a is the only member).
        assert_eq!(forward.unique_count(), 2);

        let mut via_middle = ClusterSet::new(0.5);
        via_middle.insert(b);
        via_middle.insert(a);
        via_middle.insert(c);
        // Both a and c match the anchor b.
        assert_eq!(via_middle.unique_count(), 1);
    }
}
