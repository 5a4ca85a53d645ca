//! Two-pass, instruction-preserving rewriter.
//!
//! [`morph`] decodes an input buffer with `lito`, then in pass 1 optionally
//! expands short branches and injects dead-code filler while recording an
//! [`AddressTranslationTable`], and in pass 2 relocates every relative
//! branch's displacement against the table pass 1 built. The whole pipeline
//! is deterministic: the same `(input, config)` pair, with the same
//! resolved seed, always produces the same output.

#![warn(missing_docs)]

mod address_table;
pub mod config;
mod deadcode;
mod error;
mod expansion;
mod pass1;
mod pass2;
mod rng;
mod stats;

pub use address_table::{AddressEntry, AddressTranslationTable};
pub use config::{DeadCodePolicy, ExpansionPolicy, MorphConfig};
pub use error::MorphError;
pub use rng::Xorshift128;
pub use stats::MorphStats;

use tracing::instrument;

/// Runs both passes of the rewriter over `input`.
///
/// Returns the rewritten buffer, the address-translation table pass 1
/// recorded (useful to callers that need to translate further addresses,
/// e.g. a symbol table), and summary statistics.
#[instrument(skip(input, config), fields(input_len = input.len()))]
pub fn morph(input: &[u8], config: &MorphConfig) -> Result<(Vec<u8>, AddressTranslationTable, MorphStats), MorphError> {
    let mut rng = rng::Xorshift128::new(config.seed);
    let seed_used = rng.seed_used();

    let pass1::Pass1Output {
        mut bytes,
        table,
        pending,
        expansions,
        dead_code_bytes,
    } = pass1::run(input, &mut rng, config)?;

    pass2::run(&mut bytes, &table, &pending, config)?;

    let stats = MorphStats {
        input_size: input.len(),
        output_size: bytes.len(),
        instruction_count: table.len(),
        expanded_count: expansions,
        dead_code_bytes,
        seed_used,
    };

    Ok((bytes, table, stats))
}

/// Convenience re-exports.
pub mod prelude {
    pub use crate::{
        config::{DeadCodePolicy, ExpansionPolicy, MorphConfig},
        morph, AddressEntry, AddressTranslationTable, MorphError, MorphStats,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn morph_is_deterministic_for_a_fixed_seed() {
        let input = [0x90, 0xEB, 0x02, 0x90, 0x90, 0xC3];
        let config = MorphConfig {
            seed: 777,
            ..MorphConfig::default()
        };
        let (out_a, _, stats_a) = morph(&input, &config).unwrap();
        let (out_b, _, stats_b) = morph(&input, &config).unwrap();
        assert_eq!(out_a, out_b);
        assert_eq!(stats_a, stats_b);
    }

    #[test]
    fn morph_preserves_instruction_count_as_table_entries() {
        let input = [0x90, 0x50, 0x58, 0xC3];
        let config = MorphConfig {
            seed: 1,
            enable_expansion: false,
            enable_dead_code: false,
            ..MorphConfig::default()
        };
        let (_, table, stats) = morph(&input, &config).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(stats.instruction_count, 4);
        assert_eq!(stats.expansion_ratio(), 1.0);
    }

    #[test]
    fn morph_on_empty_input_produces_empty_output() {
        let config = MorphConfig {
            seed: 1,
            ..MorphConfig::default()
        };
        let (out, table, stats) = morph(&[], &config).unwrap();
        assert!(out.is_empty());
        assert!(table.is_empty());
        assert_eq!(stats.instruction_count, 0);
    }

    #[test]
    fn decode_failure_propagates_as_morph_error() {
        // 0x0F alone: two-byte escape with no following opcode byte.
        let input = [0x0F];
        let config = MorphConfig::default();
        let result = morph(&input, &config);
        assert!(matches!(result, Err(MorphError::DecodeFailed { .. })));
    }
}
