//! Summary statistics returned alongside a rewrite.

/// Aggregate facts about one [`crate::morph`] invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MorphStats {
    /// Size of the input buffer, in bytes.
    pub input_size: usize,
    /// Size of the rewritten buffer, in bytes.
    pub output_size: usize,
    /// Number of instructions decoded from the input.
    pub instruction_count: usize,
    /// Number of short branches expanded to near form.
    pub expanded_count: usize,
    /// Total bytes of dead-code filler injected.
    pub dead_code_bytes: usize,
    /// The RNG seed actually used — equal to the configured seed unless it
    /// was `0`, in which case this is the clock-derived seed.
    pub seed_used: u64,
}

impl MorphStats {
    /// `output_size as f64 / input_size as f64`, or `1.0` if `input_size` is
    /// zero (an empty input rewrites to an empty output).
    pub fn expansion_ratio(&self) -> f64 {
        if self.input_size == 0 {
            1.0
        } else {
            self.output_size as f64 / self.input_size as f64
        }
    }
}
