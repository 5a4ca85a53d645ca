//! Bounded search for a target feature vector that is both novel (per
//! [`crate::distance::novelty`]) and manifold-compliant.

use morpher::Xorshift128;
use tracing::{debug, warn};

use crate::chain_of_thought::{self, ChainOfThought};
use crate::distance::novelty;
use crate::feature_vector::{FeatureVector, FEATURE_DIM};
use crate::history::VectorHistory;
use crate::manifold::{project, ManifoldConstraints};

/// Attempts before falling back to the Monte-Carlo sampler.
pub const DEFAULT_MAX_ATTEMPTS: usize = 20;
/// Minimum novelty score an attempt must clear to be accepted outright.
pub const DEFAULT_NOVELTY_THRESHOLD: f64 = 0.3;

/// Searches for a target vector. Returns the chosen vector, the chain of
/// thought that produced it (empty for the empty-history and Monte-Carlo
/// paths), and whether the search succeeded within its attempt budget
/// (`false` means the Monte-Carlo fallback was used).
pub fn search(
    history: &VectorHistory,
    constraints: &ManifoldConstraints,
    rng: &mut Xorshift128,
    max_attempts: usize,
    threshold: f64,
) -> (FeatureVector, ChainOfThought, bool) {
    if history.is_empty() {
        debug!("empty history, sampling a uniform random target");
        let v = random_valid_vector(constraints, rng);
        return (v, ChainOfThought::default(), true);
    }

    let current = history.last().unwrap_or_else(FeatureVector::zeroed);

    for attempt in 0..max_attempts {
        let mut chain = chain_of_thought::build(&current, history, rng);
        let proposed = chain.apply(&current);
        let target = project(&proposed, constraints);
        chain.record_repairs(&proposed, &target);

        let score = novelty(&target, history);
        if score > threshold {
            debug!(attempt, score, "alien search converged");
            return (target, chain, true);
        }
    }

    warn!(
        max_attempts,
        threshold, "alien search exhausted its attempt budget, falling back to Monte-Carlo sampling"
    );
    let fallback = monte_carlo_far_from_centroid(&history.centroid(), rng);
    let projected = project(&fallback, constraints);
    (projected, ChainOfThought::default(), false)
}

/// Uniform-random vector, clamped onto the manifold. Used when there is no
/// history to reason against.
fn random_valid_vector(constraints: &ManifoldConstraints, rng: &mut Xorshift128) -> FeatureVector {
    let mut raw = [0.0f64; FEATURE_DIM];
    for slot in raw.iter_mut() {
        *slot = rng.next_f64();
    }
    project(&FeatureVector::from_array(raw), constraints)
}

/// For each dimension, picks a value on the opposite half of `[0, 1]` from
/// the centroid, biasing the result away from the historical mean.
fn monte_carlo_far_from_centroid(centroid: &FeatureVector, rng: &mut Xorshift128) -> FeatureVector {
    let mut raw = [0.0f64; FEATURE_DIM];
    for (i, slot) in raw.iter_mut().enumerate() {
        let c = centroid.get(i);
        *slot = if c < 0.5 {
            0.5 + rng.next_f64() * 0.5
        } else {
            rng.next_f64() * 0.5
        };
    }
    FeatureVector::from_array(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_yields_a_manifold_compliant_vector() {
        let history = VectorHistory::new(10);
        let constraints = ManifoldConstraints::default();
        let mut rng = Xorshift128::new(1);
        let (v, chain, found) = search(&history, &constraints, &mut rng, DEFAULT_MAX_ATTEMPTS, DEFAULT_NOVELTY_THRESHOLD);
        assert!(found);
        assert!(chain.thoughts.is_empty());
        assert_eq!(project(&v, &constraints).as_slice(), v.as_slice());
    }

    #[test]
    fn search_against_populated_history_returns_something_novel_or_falls_back() {
        let history = VectorHistory::new(10);
        let mut seed = FeatureVector::zeroed();
        seed.set(0, 0.5);
        history.push(seed);
        let constraints = ManifoldConstraints::default();
        let mut rng = Xorshift128::new(2);
        let (target, _chain, _found) = search(&history, &constraints, &mut rng, DEFAULT_MAX_ATTEMPTS, DEFAULT_NOVELTY_THRESHOLD);
        assert_eq!(project(&target, &constraints).as_slice(), target.as_slice());
    }

    #[test]
    fn monte_carlo_fallback_biases_away_from_centroid() {
        let mut centroid = FeatureVector::zeroed();
        centroid.set(0, 0.1);
        centroid.set(1, 0.9);
        let mut rng = Xorshift128::new(3);
        let v = monte_carlo_far_from_centroid(&centroid, &mut rng);
        assert!(v.get(0) >= 0.5);
        assert!(v.get(1) < 0.5);
    }
}
