//! Short→long branch expansion (pass 1 step 2).
//!
//! Only the two short-form relative branches that have a direct long-form
//! counterpart are expandable: short `Jcc rel8` (`0x70..=0x7F`) to near `Jcc
//! rel32` (`0x0F 0x80..=0x8F`), and short `JMP rel8` (`0xEB`) to near `JMP
//! rel32` (`0xE9`). `LOOP`/`LOOPcc`/`JCXZ` (`0xE0..=0xE3`) have no long-form
//! encoding on x86 and are never expanded.
//!
//! The displacement written here is always a zero placeholder: pass 1 does
//! not yet know final addresses, so every expanded branch is revisited and
//! its displacement fixed up by pass 2.

use lito::DecodedInstruction;

/// True if `instr` is a short branch this pass knows how to expand.
pub fn is_expandable(instr: &DecodedInstruction) -> bool {
    is_short_jcc(instr.opcode1) || is_short_jmp(instr)
}

fn is_short_jcc(opcode1: u8) -> bool {
    (0x70..=0x7F).contains(&opcode1)
}

fn is_short_jmp(instr: &DecodedInstruction) -> bool {
    instr.opcode1 == 0xEB && !instr.is_two_byte_opcode
}

/// Encodes the long-form equivalent of a short branch, with a zero
/// placeholder displacement. Preserves the original instruction's legacy
/// prefixes and REX byte verbatim ahead of the new opcode bytes.
///
/// Panics if `instr` is not [`is_expandable`] — callers are expected to have
/// already filtered with that predicate.
pub fn expand(instr: &DecodedInstruction) -> Vec<u8> {
    assert!(is_expandable(instr), "expand called on a non-expandable instruction");

    let mut out = Vec::with_capacity(instr.length as usize + 3);
    out.extend_from_slice(&instr.prefixes);
    if let Some(rex) = instr.rex_prefix {
        out.push(rex);
    }

    if is_short_jcc(instr.opcode1) {
        out.push(0x0F);
        out.push(0x80 + (instr.opcode1 - 0x70));
    } else {
        out.push(0xE9);
    }
    out.extend_from_slice(&0i32.to_le_bytes());
    out
}

/// Byte length the expansion in [`expand`] produces for `instr`, without
/// allocating — used by pass 1 to size the output buffer ahead of time.
pub fn expanded_length(instr: &DecodedInstruction) -> usize {
    let prefix_len = instr.prefixes.len() + usize::from(instr.rex_prefix.is_some());
    let opcode_len = if is_short_jcc(instr.opcode1) { 2 } else { 1 };
    prefix_len + opcode_len + 4
}

#[cfg(test)]
mod tests {
    use super::*;
    use lito::lito_decode;

    #[test]
    fn short_jmp_is_expandable() {
        let instr = lito_decode(&[0xEB, 0x10], 0, true).unwrap();
        assert!(is_expandable(&instr));
    }

    #[test]
    fn short_jcc_is_expandable() {
        let instr = lito_decode(&[0x74, 0x05], 0, true).unwrap();
        assert!(is_expandable(&instr));
    }

    #[test]
    fn loop_is_not_expandable() {
        let instr = lito_decode(&[0xE2, 0x05], 0, true).unwrap();
        assert!(!is_expandable(&instr));
    }

    #[test]
    fn nop_is_not_expandable() {
        let instr = lito_decode(&[0x90], 0, true).unwrap();
        assert!(!is_expandable(&instr));
    }

    #[test]
    fn expand_short_jmp_produces_e9_rel32() {
        let instr = lito_decode(&[0xEB, 0x10], 0, true).unwrap();
        let bytes = expand(&instr);
        assert_eq!(bytes, vec![0xE9, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(expanded_length(&instr), bytes.len());
    }

    #[test]
    fn expand_short_jcc_produces_0f_8x_rel32() {
        let instr = lito_decode(&[0x74, 0x05], 0, true).unwrap(); // JE
        let bytes = expand(&instr);
        assert_eq!(bytes, vec![0x0F, 0x84, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(expanded_length(&instr), bytes.len());
    }

    #[test]
    fn expand_preserves_prefixes() {
        // 0x66 operand-size prefix ahead of a short JE.
        let instr = lito_decode(&[0x66, 0x74, 0x05], 0, true).unwrap();
        let bytes = expand(&instr);
        assert_eq!(bytes, vec![0x66, 0x0F, 0x84, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    #[should_panic]
    fn expand_panics_on_non_expandable_instruction() {
        let instr = lito_decode(&[0x90], 0, true).unwrap();
        let _ = expand(&instr);
    }

    #[rstest::rstest]
    fn every_short_jcc_expands_to_its_0f_8x_long_form(
        #[values(0x70, 0x74, 0x75, 0x7C, 0x7D, 0x7E, 0x7F)] short_opcode: u8,
    ) {
        let instr = lito_decode(&[short_opcode, 0x05], 0, true).unwrap();
        assert!(is_expandable(&instr));
        let bytes = expand(&instr);
        assert_eq!(bytes[0], 0x0F);
        assert_eq!(bytes[1], 0x80 + (short_opcode - 0x70));
        assert_eq!(bytes.len(), 6);
        assert_eq!(expanded_length(&instr), bytes.len());
    }

    #[rstest::rstest]
    fn loop_family_has_no_long_form_and_is_never_expanded(#[values(0xE0, 0xE1, 0xE2, 0xE3)] opcode: u8) {
        let instr = lito_decode(&[opcode, 0x05], 0, true).unwrap();
        assert!(!is_expandable(&instr));
    }

    #[rstest::rstest]
    fn short_jmp_expands_regardless_of_leading_66_prefix(#[values(true, false)] with_operand_size_prefix: bool) {
        let bytes: &[u8] = if with_operand_size_prefix { &[0x66, 0xEB, 0x10] } else { &[0xEB, 0x10] };
        let instr = lito_decode(bytes, 0, true).unwrap();
        assert!(is_expandable(&instr));
        let expanded = expand(&instr);
        assert_eq!(&expanded[expanded.len() - 5..], &[0xE9, 0x00, 0x00, 0x00, 0x00]);
    }
}
