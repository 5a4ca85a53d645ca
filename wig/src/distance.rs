//! Distance metrics over [`FeatureVector`]s and the novelty score used by
//! alien-region search.

use itertools::izip;

use crate::feature_vector::{FeatureVector, FEATURE_DIM};
use crate::history::VectorHistory;

/// A metric for comparing two feature vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    Euclidean,
    Manhattan,
    Cosine,
    /// Euclidean distance with a per-dimension weight table. Default metric.
    #[default]
    WeightedL2,
}

/// Per-dimension weights for [`DistanceMetric::WeightedL2`]: opcode
/// frequencies and general bands default to 1.0, register usage is
/// down-weighted (high-frequency, low-signal), structural densities are
/// moderately weighted, and entropy dimensions are boosted.
pub static DIMENSION_WEIGHTS: [f64; FEATURE_DIM] = build_weights();

const fn build_weights() -> [f64; FEATURE_DIM] {
    let mut w = [1.0f64; FEATURE_DIM];
    let mut i = 0;
    while i < FEATURE_DIM {
        w[i] = match i {
            35..=42 => 0.4,
            43..=62 => 0.85,
            63..=72 => 1.2,
            _ => 1.0,
        };
        i += 1;
    }
    w
}

/// Computes the distance between `a` and `b` under `metric`.
pub fn distance(a: &FeatureVector, b: &FeatureVector, metric: DistanceMetric) -> f64 {
    match metric {
        DistanceMetric::Euclidean => euclidean(a, b),
        DistanceMetric::Manhattan => manhattan(a, b),
        DistanceMetric::Cosine => cosine(a, b),
        DistanceMetric::WeightedL2 => weighted_l2(a, b),
    }
}

fn euclidean(a: &FeatureVector, b: &FeatureVector) -> f64 {
    a.as_slice()
        .iter()
        .zip(b.as_slice())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn manhattan(a: &FeatureVector, b: &FeatureVector) -> f64 {
    a.as_slice().iter().zip(b.as_slice()).map(|(x, y)| (x - y).abs()).sum()
}

fn cosine(a: &FeatureVector, b: &FeatureVector) -> f64 {
    let dot: f64 = a.as_slice().iter().zip(b.as_slice()).map(|(x, y)| x * y).sum();
    let norm_a = a.as_slice().iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.as_slice().iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        1.0
    } else {
        1.0 - dot / (norm_a * norm_b)
    }
}

fn weighted_l2(a: &FeatureVector, b: &FeatureVector) -> f64 {
    izip!(a.as_slice(), b.as_slice(), DIMENSION_WEIGHTS.iter())
        .map(|(x, y, w)| w * (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Novelty of `candidate` against `history`: a blend of distance to the
/// running centroid and distance to the single closest prior vector,
/// normalized to roughly `[0, 1]` by dividing by `sqrt(FEATURE_DIM)`.
///
/// A vector measured against an empty history is maximally novel — callers
/// with no history should special-case generation rather than call this.
pub fn novelty(candidate: &FeatureVector, history: &VectorHistory) -> f64 {
    if history.is_empty() {
        return 1.0;
    }
    let centroid = history.centroid();
    let dist_centroid = distance(candidate, &centroid, DistanceMetric::WeightedL2);
    let min_dist = history
        .snapshot()
        .iter()
        .map(|prior| distance(candidate, prior, DistanceMetric::WeightedL2))
        .fold(f64::INFINITY, f64::min);
    let combined = 0.6 * dist_centroid + 0.4 * min_dist;
    (combined / (FEATURE_DIM as f64).sqrt()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_from_a_vector_to_itself_is_zero() {
        let mut v = FeatureVector::zeroed();
        v.set(0, 0.5);
        v.set(63, 0.9);
        assert_eq!(distance(&v, &v, DistanceMetric::Euclidean), 0.0);
        assert_eq!(distance(&v, &v, DistanceMetric::Manhattan), 0.0);
        assert_eq!(distance(&v, &v, DistanceMetric::WeightedL2), 0.0);
        assert_eq!(distance(&v, &v, DistanceMetric::Cosine), 0.0);
    }

    #[test]
    fn weighted_l2_differs_from_plain_euclidean_on_register_dims() {
        let mut a = FeatureVector::zeroed();
        let mut b = FeatureVector::zeroed();
        a.set(35, 0.0);
        b.set(35, 1.0);
        let plain = euclidean(&a, &b);
        let weighted = weighted_l2(&a, &b);
        assert!(weighted < plain);
    }

    #[test]
    fn cosine_of_zero_vectors_is_one() {
        let a = FeatureVector::zeroed();
        let b = FeatureVector::zeroed();
        assert_eq!(cosine(&a, &b), 1.0);
    }

    #[test]
    fn novelty_against_empty_history_is_maximal() {
        let history = VectorHistory::new(10);
        let v = FeatureVector::zeroed();
        assert_eq!(novelty(&v, &history), 1.0);
    }

    #[test]
    fn novelty_of_a_vector_already_in_history_is_low() {
        let history = VectorHistory::new(10);
        let mut v = FeatureVector::zeroed();
        v.set(0, 0.5);
        history.push(v.clone());
        assert!(novelty(&v, &history) < 0.1);
    }
}
