//! Translates a target [`FeatureVector`] into a concrete [`MorphConfig`].

use morpher::config::MorphConfig;

use crate::feature_vector::{
    FeatureVector, AGGREGATE_COMPLEXITY_DIM, ARITH_DENSITY_DIM, CONTROL_FLOW_DENSITY_DIM, JCC_FREQ_DIM,
    MEAN_LENGTH_DIM, STACK_DENSITY_DIM,
};

/// Minimum expansion rate regardless of what the vector proposes: pass 1
/// always gets some chance to widen short branches.
const MIN_EXPANSION_RATE: f64 = 0.2;

/// Builds a [`MorphConfig`] whose policy knobs reflect `vector`, carrying
/// `seed` and `mode64` through from the caller.
pub fn translate(vector: &FeatureVector, seed: u64, mode64: bool) -> MorphConfig {
    let mut config = MorphConfig {
        seed,
        mode64,
        ..MorphConfig::default()
    };

    config.expansion_policy.rate = vector.get(JCC_FREQ_DIM).max(MIN_EXPANSION_RATE);
    config.expansion_policy.always_expand_control_flow = true;

    let cf_density = vector.get(CONTROL_FLOW_DENSITY_DIM);
    let stack_density = vector.get(STACK_DENSITY_DIM);
    let arith_density = vector.get(ARITH_DENSITY_DIM);
    config.dead_code_policy.insertion_rate = ((cf_density + stack_density + arith_density) / 3.0).clamp(0.0, 1.0);

    let aggregate_complexity = vector.get(AGGREGATE_COMPLEXITY_DIM);
    config.dead_code_policy.max_complexity = complexity_tier(aggregate_complexity);

    let (min_length, max_length) = length_band(vector.get(MEAN_LENGTH_DIM));
    config.dead_code_policy.min_length = min_length;
    config.dead_code_policy.max_length = max_length;

    config
}

fn complexity_tier(aggregate_complexity: f64) -> u8 {
    if aggregate_complexity < 0.33 {
        1
    } else if aggregate_complexity < 0.67 {
        2
    } else {
        3
    }
}

fn length_band(mean_length_normalized: f64) -> (u8, u8) {
    if mean_length_normalized < 0.33 {
        (1, 1)
    } else if mean_length_normalized < 0.67 {
        (1, 2)
    } else {
        (1, 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expansion_rate_never_drops_below_the_floor() {
        let v = FeatureVector::zeroed();
        let config = translate(&v, 7, true);
        assert_eq!(config.expansion_policy.rate, MIN_EXPANSION_RATE);
        assert!(config.expansion_policy.always_expand_control_flow);
    }

    #[test]
    fn high_jcc_frequency_drives_expansion_rate() {
        let mut v = FeatureVector::zeroed();
        v.set(JCC_FREQ_DIM, 0.8);
        let config = translate(&v, 7, true);
        assert_eq!(config.expansion_policy.rate, 0.8);
    }

    #[test]
    fn complexity_tiers_follow_thresholds() {
        assert_eq!(complexity_tier(0.0), 1);
        assert_eq!(complexity_tier(0.5), 2);
        assert_eq!(complexity_tier(0.9), 3);
    }

    #[test]
    fn seed_and_mode_pass_through_unchanged() {
        let v = FeatureVector::zeroed();
        let config = translate(&v, 42, false);
        assert_eq!(config.seed, 42);
        assert!(!config.mode64);
    }
}
