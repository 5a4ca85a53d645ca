//! Guidance-layer error variants.

use thiserror::Error;

/// Failures raised while guiding or performing a rewrite.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum WigError {
    /// Alien-region search exhausted its attempt budget without finding a
    /// candidate above the novelty threshold. Diagnostic only: a fallback
    /// Monte-Carlo sampler is always available and is used instead of
    /// surfacing this to the caller, unless the fallback is explicitly
    /// disabled.
    #[error("no candidate target exceeded the novelty threshold after the attempt budget was exhausted")]
    NoValidAlienFound,

    /// The underlying rewrite failed.
    #[error(transparent)]
    Morph(#[from] morpher::MorphError),
}
