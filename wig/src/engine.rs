//! The guidance engine tying feature extraction, history, chain-of-thought
//! target synthesis, and the underlying rewrite together.

use morpher::Xorshift128;
use parking_lot::Mutex;
use tracing::instrument;

use crate::alien_search::{self, DEFAULT_MAX_ATTEMPTS, DEFAULT_NOVELTY_THRESHOLD};
use crate::chain_of_thought::ChainOfThought;
use crate::config::WigEngineConfig;
use crate::config_translation;
use crate::distance::novelty;
use crate::error::WigError;
use crate::feature_vector::{self, FeatureVector};
use crate::history::VectorHistory;
use crate::manifold::ManifoldConstraints;

/// The result of one guided rewrite.
pub struct WigRewriteOutput {
    /// The rewritten buffer.
    pub bytes: Vec<u8>,
    /// The feature vector of the rewritten buffer, as pushed into history.
    pub feature_vector: FeatureVector,
    /// Novelty of `feature_vector` against history as it stood *before*
    /// this rewrite.
    pub novelty: f64,
    /// The reasoning that produced the target this rewrite aimed for.
    pub chain_of_thought: ChainOfThought,
}

/// A single guided-rewrite session. Holds its own [`VectorHistory`] and its
/// own persistent RNG (seeded once at construction, consumed across every
/// subsequent `rewrite` call), so callers that want independent guidance
/// streams should keep one engine per concurrent rewrite rather than
/// sharing one across threads.
pub struct WigEngine {
    history: VectorHistory,
    manifold: ManifoldConstraints,
    mode64: bool,
    platform_tag: String,
    rng: Mutex<Xorshift128>,
}

impl WigEngine {
    /// Mirrors the external `wig_new(seed, mode64, platform_tag)` entry
    /// point, with the history window left at its default.
    pub fn new(seed: u64, mode64: bool, platform_tag: impl Into<String>) -> Self {
        let platform_tag = platform_tag.into();
        let manifold = ManifoldConstraints::for_platform(&platform_tag);
        Self::from_config(WigEngineConfig {
            seed,
            mode64,
            platform_tag,
            manifold,
            ..WigEngineConfig::default()
        })
    }

    /// Builds an engine from a (possibly file-loaded) [`WigEngineConfig`].
    pub fn from_config(config: WigEngineConfig) -> Self {
        Self {
            history: VectorHistory::new(config.history_window),
            manifold: config.manifold,
            mode64: config.mode64,
            platform_tag: config.platform_tag,
            rng: Mutex::new(Xorshift128::new(config.seed)),
        }
    }

    pub fn history(&self) -> &VectorHistory {
        &self.history
    }

    pub fn platform_tag(&self) -> &str {
        &self.platform_tag
    }

    /// Guides and performs one rewrite of `input`. `seed` seeds only this
    /// call's underlying `morph()` invocation; the engine's own RNG (seeded
    /// at construction) drives alien-search reasoning and persists across
    /// calls.
    #[instrument(skip(self, input))]
    pub fn rewrite(&self, input: &[u8], seed: u64) -> Result<WigRewriteOutput, WigError> {
        let (target_vector, chain_of_thought, found) = {
            let mut engine_rng = self.rng.lock();
            alien_search::search(
                &self.history,
                &self.manifold,
                &mut engine_rng,
                DEFAULT_MAX_ATTEMPTS,
                DEFAULT_NOVELTY_THRESHOLD,
            )
        };
        if !found {
            tracing::debug!("alien search fell back to Monte-Carlo sampling for this rewrite");
        }

        let config = config_translation::translate(&target_vector, seed, self.mode64);
        let (bytes, _table, _stats) = morpher::morph(input, &config)?;

        let (decoded, _decode_err) = lito::parse_all(&bytes, self.mode64);
        let result_vector = feature_vector::extract(&bytes, &decoded);
        let novelty_score = novelty(&result_vector, &self.history);

        self.history.push(result_vector.clone());

        Ok(WigRewriteOutput {
            bytes,
            feature_vector: result_vector,
            novelty: novelty_score,
            chain_of_thought,
        })
    }
}

impl Default for WigEngine {
    fn default() -> Self {
        Self::from_config(WigEngineConfig::default())
    }
}
