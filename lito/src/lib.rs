//! Length-aware x86/x64 instruction decoder.
//!
//! `lito` recovers per-instruction byte boundaries and the operand metadata
//! a rewriter needs to relocate control flow. It is a pure, allocation-light
//! decoder: [`lito_decode`] never touches the network, the filesystem, or
//! any shared state, and a given `(bytes, offset, mode64)` triple always
//! produces the same [`DecodedInstruction`] or the same [`DecodeError`].
//!
//! The crate does not itself log anything — callers that want visibility
//! into decode failures across a stream should inspect the returned
//! [`DecodeError`] and log at the call site (see `morpher`'s `tracing`
//! instrumentation for an example).

#![warn(missing_docs)]

mod branch;
mod decoder;
mod error;
mod instruction;
mod opcode_tables;
mod stream;

pub use branch::resolve_branch_target;
pub use decoder::lito_decode;
pub use error::{DecodeError, DecodePhase};
pub use instruction::DecodedInstruction;
pub use opcode_tables::{ImmediateKind, OpcodeInfo, PRIMARY_OPCODE_TABLE, SECONDARY_OPCODE_TABLE};
pub use stream::{boundaries, parse_all, MAX_STREAM_INSTRUCTIONS};

/// Convenience re-exports for callers that want the whole public surface
/// with one `use`.
pub mod prelude {
    pub use crate::{
        boundaries, lito_decode, parse_all, resolve_branch_target, DecodeError, DecodePhase,
        DecodedInstruction, ImmediateKind, OpcodeInfo,
    };
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    /// For every decodable input, `length` is in `1..=min(15, |b|)`.
    #[quickcheck]
    fn decode_length_is_bounded(bytes: Vec<u8>) -> bool {
        if bytes.is_empty() {
            return true;
        }
        match lito_decode(&bytes, 0, true) {
            Ok(i) => i.length >= 1 && (i.length as usize) <= bytes.len().min(15),
            Err(_) => true,
        }
    }

    /// Invariant 2: `parse_all` lengths sum exactly to the buffer length, or
    /// it terminates with an explicit error.
    #[quickcheck]
    fn parse_all_covers_or_errors(bytes: Vec<u8>) -> bool {
        let (instructions, err) = parse_all(&bytes, true);
        let covered: usize = instructions.iter().map(|i| i.length as usize).sum();
        if err.is_some() {
            covered <= bytes.len()
        } else {
            covered == bytes.len()
        }
    }
}
