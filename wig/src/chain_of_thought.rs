//! Chain-of-thought target synthesis: a handful of independent "thoughts"
//! about where the next rewrite's feature vector should move, merged in
//! priority order into a single target vector.

use morpher::Xorshift128;

use crate::feature_vector::{FeatureVector, BYTE_ENTROPY_DIM, FEATURE_DIM, OPCODE_ENTROPY_DIM};
use crate::history::VectorHistory;

/// High-signal dimensions that divergence/exploration thoughts prefer to
/// steer: opcode-frequency buckets and the entropy band.
const HIGH_PRIORITY_DIMS: [usize; 23] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 63, 64, 65, 66, 67, 68, 69, 70, 71, 72,
];

const EXPLORATION_SAMPLE_COUNT: usize = 5;

/// A category of reasoning step in a [`ChainOfThought`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThoughtCategory {
    /// Push away from the historical centroid.
    Divergence,
    /// Probe an arbitrary dimension at random.
    Exploration,
    /// Push a dimension toward a known-good value (e.g. higher entropy).
    Optimization,
    /// Records a correction `project` made to a prior thought's proposal.
    Repair,
}

/// One proposed change to a single dimension of the target feature vector.
#[derive(Debug, Clone)]
pub struct Thought {
    pub category: ThoughtCategory,
    pub dimension: usize,
    pub current_value: f64,
    pub proposed_value: f64,
    pub priority: f64,
    pub explanation: String,
}

/// An ordered bundle of [`Thought`]s, applied highest-priority first.
#[derive(Debug, Clone, Default)]
pub struct ChainOfThought {
    pub thoughts: Vec<Thought>,
}

impl ChainOfThought {
    pub fn push(&mut self, thought: Thought) {
        self.thoughts.push(thought);
    }

    pub fn extend(&mut self, thoughts: impl IntoIterator<Item = Thought>) {
        self.thoughts.extend(thoughts);
    }

    /// Applies every thought to `base`, highest priority last-writer-wins.
    pub fn apply(&self, base: &FeatureVector) -> FeatureVector {
        let mut ordered: Vec<&Thought> = self.thoughts.iter().collect();
        ordered.sort_by(|a, b| a.priority.partial_cmp(&b.priority).unwrap_or(std::cmp::Ordering::Equal));
        let mut out = base.clone();
        for thought in ordered {
            out.set(thought.dimension, thought.proposed_value);
        }
        out
    }

    /// Appends one [`ThoughtCategory::Repair`] entry per dimension that
    /// `project` moved away from `proposed`.
    pub fn record_repairs(&mut self, proposed: &FeatureVector, projected: &FeatureVector) {
        const EPSILON: f64 = 1e-6;
        for i in 0..FEATURE_DIM {
            let before = proposed.get(i);
            let after = projected.get(i);
            if (before - after).abs() > EPSILON {
                self.push(Thought {
                    category: ThoughtCategory::Repair,
                    dimension: i,
                    current_value: before,
                    proposed_value: after,
                    priority: f64::INFINITY,
                    explanation: format!("manifold projection adjusted dimension {i}"),
                });
            }
        }
    }
}

/// Builds a full chain of thought for `current`, reasoning against `history`.
pub fn build(current: &FeatureVector, history: &VectorHistory, rng: &mut Xorshift128) -> ChainOfThought {
    let mut chain = ChainOfThought::default();
    chain.extend(divergence_thoughts(current, &history.centroid()));
    chain.extend(exploration_thoughts(current, rng));
    chain.extend(optimization_thoughts(current));
    chain
}

fn divergence_thoughts(current: &FeatureVector, centroid: &FeatureVector) -> Vec<Thought> {
    HIGH_PRIORITY_DIMS
        .iter()
        .map(|&dim| {
            let centroid_value = centroid.get(dim);
            let proposed = if centroid_value < 0.5 { 0.8 } else { 0.2 };
            Thought {
                category: ThoughtCategory::Divergence,
                dimension: dim,
                current_value: current.get(dim),
                proposed_value: proposed,
                priority: 0.9,
                explanation: format!("dimension {dim} sits near the historical centroid, push away"),
            }
        })
        .collect()
}

fn exploration_thoughts(current: &FeatureVector, rng: &mut Xorshift128) -> Vec<Thought> {
    (0..EXPLORATION_SAMPLE_COUNT)
        .map(|_| {
            let dim = rng.range(FEATURE_DIM);
            let proposed = rng.next_f64();
            Thought {
                category: ThoughtCategory::Exploration,
                dimension: dim,
                current_value: current.get(dim),
                proposed_value: proposed,
                priority: 0.5,
                explanation: format!("probing dimension {dim}"),
            }
        })
        .collect()
}

fn optimization_thoughts(current: &FeatureVector) -> Vec<Thought> {
    let mut thoughts = Vec::new();
    let byte_entropy = current.get(BYTE_ENTROPY_DIM);
    if byte_entropy < 0.9 {
        thoughts.push(Thought {
            category: ThoughtCategory::Optimization,
            dimension: BYTE_ENTROPY_DIM,
            current_value: byte_entropy,
            proposed_value: 0.95,
            priority: 1.0,
            explanation: "byte-stream entropy below target, raise it".to_string(),
        });
    }
    let opcode_entropy = current.get(OPCODE_ENTROPY_DIM);
    if opcode_entropy < 0.8 {
        thoughts.push(Thought {
            category: ThoughtCategory::Optimization,
            dimension: OPCODE_ENTROPY_DIM,
            current_value: opcode_entropy,
            proposed_value: 0.95,
            priority: 1.0,
            explanation: "opcode-stream entropy below target, raise it".to_string(),
        });
    }
    thoughts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_is_priority_ordered_last_writer_wins() {
        let mut chain = ChainOfThought::default();
        chain.push(Thought {
            category: ThoughtCategory::Exploration,
            dimension: 0,
            current_value: 0.0,
            proposed_value: 0.1,
            priority: 0.5,
            explanation: String::new(),
        });
        chain.push(Thought {
            category: ThoughtCategory::Divergence,
            dimension: 0,
            current_value: 0.0,
            proposed_value: 0.9,
            priority: 0.9,
            explanation: String::new(),
        });
        let out = chain.apply(&FeatureVector::zeroed());
        assert_eq!(out.get(0), 0.9);
    }

    #[test]
    fn optimization_thoughts_fire_below_entropy_target() {
        let mut v = FeatureVector::zeroed();
        v.set(BYTE_ENTROPY_DIM, 0.1);
        let thoughts = optimization_thoughts(&v);
        assert!(thoughts.iter().any(|t| t.dimension == BYTE_ENTROPY_DIM));
    }

    #[test]
    fn optimization_thoughts_silent_when_entropy_already_high() {
        let mut v = FeatureVector::zeroed();
        v.set(BYTE_ENTROPY_DIM, 0.99);
        v.set(OPCODE_ENTROPY_DIM, 0.99);
        let thoughts = optimization_thoughts(&v);
        assert!(thoughts.is_empty());
    }

    #[test]
    fn record_repairs_tracks_changed_dimensions() {
        let mut chain = ChainOfThought::default();
        let mut proposed = FeatureVector::zeroed();
        proposed.set(5, 0.9);
        let mut projected = proposed.clone();
        projected.set(5, 0.5);
        chain.record_repairs(&proposed, &projected);
        assert_eq!(chain.thoughts.len(), 1);
        assert_eq!(chain.thoughts[0].dimension, 5);
        assert_eq!(chain.thoughts[0].category, ThoughtCategory::Repair);
    }
}
