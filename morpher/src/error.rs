//! Rewrite error variants.

use thiserror::Error;

/// Failures raised while rewriting a buffer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MorphError {
    /// Pass 1 could not decode the instruction at `offset`.
    #[error("failed to decode instruction at offset {offset}: {cause}")]
    DecodeFailed {
        /// Offset of the failing instruction in the input buffer.
        offset: usize,
        /// Underlying decode failure.
        #[source]
        cause: lito::DecodeError,
    },

    /// The output buffer grew past `max_output_size`.
    #[error("output size exceeded the configured cap of {cap} bytes (reached {reached})")]
    OutputSizeExceeded {
        /// Configured cap.
        cap: usize,
        /// Size reached when the cap was tripped.
        reached: usize,
    },

    /// The address-translation table built by pass 1 violates one of its
    /// ordering/contiguity invariants. This indicates a pass-1 bug, not a
    /// property of the input.
    #[error("address translation table invariant violated at entry {index}: {detail}")]
    TrackerInvariantViolated {
        /// Index of the offending entry.
        index: usize,
        /// Human-readable description of which invariant failed.
        detail: &'static str,
    },

    /// A relocated displacement does not fit in the encoding's signed range.
    #[error("relocated displacement {displacement} at offset {offset} does not fit in the required width")]
    RelocationOutOfRange {
        /// Offset (in the output buffer) of the instruction being relocated.
        offset: usize,
        /// The displacement value that failed to fit.
        displacement: i64,
    },

    /// Strict relocation mode only: the branch target does not map to any
    /// address-table entry (e.g. it targets a jump table or unreached byte
    /// mid-instruction of the original).
    #[error("relocation target for instruction at offset {offset} was not found in the address table")]
    RelocationTargetMissing {
        /// Offset (in the input buffer) of the branching instruction.
        offset: usize,
    },

    /// Post-relocation re-decode verification (optional) found that the
    /// rewritten instruction does not resolve to the expected target.
    #[error("post-relocation verification failed at offset {offset}: expected target {expected}, got {actual:?}")]
    VerificationFailed {
        /// Offset (in the output buffer) of the relocated instruction.
        offset: usize,
        /// Expected (mapped) target offset.
        expected: usize,
        /// Actual resolved target, if any.
        actual: Option<usize>,
    },
}
