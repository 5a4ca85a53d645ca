//! Plain-data configuration records for a single `morph` invocation.

/// Policy governing short→long instruction expansion (pass 1 step 2).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpansionPolicy {
    /// Probability, in `[0, 1]`, that an expandable instruction is expanded.
    pub rate: f64,
    /// If set, every control-flow instruction that is expandable is always
    /// expanded, regardless of `rate`.
    pub always_expand_control_flow: bool,
    /// Hard cap on the number of expansions performed in one rewrite.
    pub max_expansions: Option<usize>,
}

impl Default for ExpansionPolicy {
    fn default() -> Self {
        Self {
            rate: 0.5,
            always_expand_control_flow: true,
            max_expansions: None,
        }
    }
}

/// Policy governing dead-code injection (pass 1 step 4).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeadCodePolicy {
    /// Probability, in `[0, 1]`, that filler is injected after an eligible
    /// instruction.
    pub insertion_rate: f64,
    /// Minimum catalog-entry length (bytes) eligible for selection.
    pub min_length: u8,
    /// Maximum catalog-entry length (bytes) eligible for selection.
    pub max_length: u8,
    /// Maximum complexity tier (1=trivial, 2=moderate, 3=complex) eligible.
    pub max_complexity: u8,
    /// DESIGN.md open question 2: additionally forbid a flag-clobbering
    /// catalog entry immediately before a conditional branch, even though
    /// the instruction it would follow is not itself control flow.
    pub forbid_before_conditional_branch: bool,
}

impl Default for DeadCodePolicy {
    fn default() -> Self {
        Self {
            insertion_rate: 0.3,
            min_length: 1,
            max_length: 3,
            max_complexity: 2,
            forbid_before_conditional_branch: true,
        }
    }
}

/// Top-level configuration for [`crate::morph`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MorphConfig {
    /// RNG seed. `0` means "derive a seed from a high-resolution clock".
    pub seed: u64,
    /// Whether the input targets 64-bit (REX-capable) mode.
    pub mode64: bool,
    /// Master switch for short→long expansion.
    pub enable_expansion: bool,
    /// Master switch for dead-code injection.
    pub enable_dead_code: bool,
    /// Expansion policy, consulted only if `enable_expansion`.
    pub expansion_policy: ExpansionPolicy,
    /// Dead-code policy, consulted only if `enable_dead_code`.
    pub dead_code_policy: DeadCodePolicy,
    /// Hard safety cap on the rewritten buffer's size, in bytes.
    pub max_output_size: usize,
    /// Whether pass 2 treats an unmapped relocation target as fatal
    /// ([`crate::MorphError::RelocationTargetMissing`]) rather than skipping
    /// it and leaving the displacement unchanged.
    pub strict_relocation: bool,
    /// Whether pass 2 re-decodes every relocated instruction and confirms
    /// its resolved target, an optional but recommended verification step.
    pub verify_relocations: bool,
}

impl Default for MorphConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            mode64: true,
            enable_expansion: true,
            enable_dead_code: true,
            expansion_policy: ExpansionPolicy::default(),
            dead_code_policy: DeadCodePolicy::default(),
            // 10 MiB default resource bound.
            max_output_size: 10 * 1024 * 1024,
            strict_relocation: false,
            verify_relocations: true,
        }
    }
}
