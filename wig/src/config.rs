//! Top-level configuration for a [`crate::engine::WigEngine`].

use crate::history::DEFAULT_WINDOW;
use crate::manifold::ManifoldConstraints;

/// Construction parameters for a [`crate::engine::WigEngine`], mirroring
/// the external `wig_new(seed, mode64, platform_tag)` entry point plus the
/// Rust-only history-window knob. Serializable so a caller can load an
/// override from a config file alongside `morpher::MorphConfig`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WigEngineConfig {
    /// Seed for the engine's own persistent RNG, which drives alien-search
    /// exploration across the engine's whole lifetime. `0` derives one from
    /// the system clock. Distinct from the per-call seed `rewrite` takes,
    /// which seeds only that call's `morph()` invocation.
    pub seed: u64,
    /// Whether input/output buffers are decoded/generated in 64-bit mode.
    pub mode64: bool,
    /// Opaque ABI tag influencing manifold defaults (callee-saved register
    /// set). Recognized values: `"sysv64"` (default), `"win64"`.
    pub platform_tag: String,
    /// Number of recent feature vectors retained for centroid/novelty
    /// computation.
    pub history_window: usize,
    /// Clamp intervals, dependency rules, and blacklists the engine
    /// projects every target vector onto. Defaults to
    /// [`ManifoldConstraints::for_platform`] applied to `platform_tag`;
    /// set explicitly to override the platform-derived defaults.
    pub manifold: ManifoldConstraints,
}

impl Default for WigEngineConfig {
    fn default() -> Self {
        let platform_tag = "sysv64".to_string();
        Self {
            seed: 0,
            mode64: true,
            manifold: ManifoldConstraints::for_platform(&platform_tag),
            platform_tag,
            history_window: DEFAULT_WINDOW,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_history_window_matches_history_module_default() {
        let config = WigEngineConfig::default();
        assert_eq!(config.history_window, DEFAULT_WINDOW);
        assert_eq!(config.platform_tag, "sysv64");
        assert!(config.mode64);
    }
}
