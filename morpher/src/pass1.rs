//! Pass 1: decode the input once, optionally expand short branches and
//! inject dead-code filler, and record the address-translation table.
//!
//! Dead-code is never inserted after a control-flow instruction (the bytes
//! that would follow are unreachable from the instruction stream pass 1 is
//! walking, and inserting after a `RET`/`JMP`/`CALL` gives a rewriter no
//! signal about what, if anything, falls through). A flag-clobbering filler
//! entry is additionally skipped when the *next* original instruction is a
//! conditional branch, per [`crate::config::DeadCodePolicy::forbid_before_conditional_branch`].

use lito::{resolve_branch_target, DecodedInstruction};
use tracing::{debug, trace};

use crate::address_table::{AddressEntry, AddressTranslationTable};
use crate::config::MorphConfig;
use crate::deadcode;
use crate::error::MorphError;
use crate::expansion;
use crate::rng::Xorshift128;

/// A relative branch instruction whose displacement pass 2 must fix up once
/// every instruction's final address is known.
#[derive(Debug, Clone, Copy)]
pub struct PendingRelocation {
    /// Offset, in the original buffer, of the branching instruction — used
    /// only for error reporting.
    pub old_instr_offset: usize,
    /// Offset, in the rewritten buffer, of the branching instruction.
    pub new_instr_offset: usize,
    /// Offset, in the rewritten buffer, of the displacement's first byte.
    pub disp_offset: usize,
    /// Displacement width in bytes: 1 for an unexpanded short branch, 4 for
    /// a near branch (whether original or expanded).
    pub disp_width: u8,
    /// The target this branch resolved to, in the *original* buffer's
    /// address space.
    pub old_target: usize,
}

/// Output of pass 1: the rewritten buffer plus the old↔new address map.
pub struct Pass1Output {
    /// Rewritten instruction stream, including injected filler.
    pub bytes: Vec<u8>,
    /// Old↔new offset bookkeeping for every original instruction.
    pub table: AddressTranslationTable,
    /// Relative branches awaiting pass-2 relocation.
    pub pending: Vec<PendingRelocation>,
    /// Count of branches expanded.
    pub expansions: usize,
    /// Total bytes of dead-code filler injected.
    pub dead_code_bytes: usize,
}

/// Runs pass 1 over `input`, decoded in full up front via [`lito::parse_all`].
pub fn run(input: &[u8], rng: &mut Xorshift128, config: &MorphConfig) -> Result<Pass1Output, MorphError> {
    let (instructions, decode_err) = lito::parse_all(input, config.mode64);
    if let Some(cause) = decode_err {
        let offset: usize = instructions.iter().map(|i| i.length as usize).sum();
        return Err(MorphError::DecodeFailed { offset, cause });
    }

    let mut output = Vec::with_capacity(input.len() * 2);
    let mut table = AddressTranslationTable::new();
    let mut pending = Vec::new();
    let mut old_offset = 0usize;
    let mut expansions = 0usize;
    let mut dead_code_bytes = 0usize;

    for (index, instr) in instructions.iter().enumerate() {
        let old_length = instr.length as usize;
        let new_offset = output.len();

        let jump_target = if instr.is_relative_branch {
            resolve_branch_target(instr, old_offset)
        } else {
            None
        };

        let (bytes, did_expand) = select_encoding(instr, rng, config, &mut expansions);
        output.extend_from_slice(&bytes);
        check_cap(&output, config)?;

        if let Some(old_target) = jump_target {
            let disp_width = if did_expand { 4 } else { instr.immediate.len() as u8 };
            let disp_offset = new_offset + bytes.len() - disp_width as usize;
            pending.push(PendingRelocation {
                old_instr_offset: old_offset,
                new_instr_offset: new_offset,
                disp_offset,
                disp_width,
                old_target,
            });
            if did_expand {
                trace!(offset = old_offset, "expanded short branch to near form");
            }
        }

        let mut dead_code_after = 0usize;
        if config.enable_dead_code && !instr.is_control_flow && rng.next_f64() < config.dead_code_policy.insertion_rate
        {
            let next_is_conditional = instructions.get(index + 1).is_some_and(is_conditional_branch);
            let forbid_flags = config.dead_code_policy.forbid_before_conditional_branch && next_is_conditional;
            let candidates = deadcode::eligible(
                config.dead_code_policy.min_length,
                config.dead_code_policy.max_length,
                config.dead_code_policy.max_complexity,
                forbid_flags,
            );
            if candidates.is_empty() {
                output.push(0x90);
                dead_code_after = 1;
                dead_code_bytes += dead_code_after;
                check_cap(&output, config)?;
            } else {
                let choice = candidates[rng.range(candidates.len())];
                output.extend_from_slice(choice.bytes);
                dead_code_after = choice.bytes.len();
                dead_code_bytes += dead_code_after;
                check_cap(&output, config)?;
            }
        }

        table.push(AddressEntry {
            old_offset,
            old_length,
            new_offset,
            new_length: bytes.len(),
            dead_code_after,
            opcode: instr.opcode1,
            is_control_flow: instr.is_control_flow,
            was_expanded: did_expand,
            jump_target,
        });

        old_offset += old_length;
    }

    table.validate()?;
    debug!(
        input_len = input.len(),
        output_len = output.len(),
        expansions,
        dead_code_bytes,
        "pass 1 complete"
    );

    Ok(Pass1Output {
        bytes: output,
        table,
        pending,
        expansions,
        dead_code_bytes,
    })
}

fn select_encoding(
    instr: &DecodedInstruction,
    rng: &mut Xorshift128,
    config: &MorphConfig,
    expansions: &mut usize,
) -> (Vec<u8>, bool) {
    if config.enable_expansion && expansion::is_expandable(instr) {
        let under_cap = config
            .expansion_policy
            .max_expansions
            .map_or(true, |cap| *expansions < cap);
        let forced = instr.is_control_flow && config.expansion_policy.always_expand_control_flow;
        let chosen = under_cap && (forced || rng.next_f64() < config.expansion_policy.rate);
        if chosen {
            *expansions += 1;
            return (expansion::expand(instr), true);
        }
    }
    (original_bytes(instr), false)
}

fn original_bytes(instr: &DecodedInstruction) -> Vec<u8> {
    let mut bytes = instr.prefixes.clone();
    if let Some(rex) = instr.rex_prefix {
        bytes.push(rex);
    }
    bytes.push(instr.opcode1);
    if let Some(op2) = instr.opcode2 {
        bytes.push(op2);
    }
    if let Some(modrm) = instr.modrm {
        bytes.push(modrm);
    }
    if let Some(sib) = instr.sib {
        bytes.push(sib);
    }
    bytes.extend_from_slice(&instr.displacement);
    bytes.extend_from_slice(&instr.immediate);
    bytes
}

fn is_conditional_branch(instr: &DecodedInstruction) -> bool {
    if !instr.is_relative_branch {
        return false;
    }
    if instr.is_two_byte_opcode {
        instr.opcode2.is_some_and(|b| (0x80..=0x8F).contains(&b))
    } else {
        (0x70..=0x7F).contains(&instr.opcode1) || (0xE0..=0xE3).contains(&instr.opcode1)
    }
}

fn check_cap(output: &[u8], config: &MorphConfig) -> Result<(), MorphError> {
    if output.len() > config.max_output_size {
        Err(MorphError::OutputSizeExceeded {
            cap: config.max_output_size,
            reached: output.len(),
        })
    } else {
        Ok(())
    }
}
