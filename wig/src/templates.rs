//! Template-guided code generation: a small catalog of stack-safe byte
//! sequences, combined under a bounded stack-delta budget and re-validated
//! through the decoder before being accepted.

use morpher::Xorshift128;

use crate::manifold::ManifoldConstraints;

/// One entry in the template catalog.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    pub bytes: &'static [u8],
    /// Net effect on ESP, in machine words: `+1` for a push, `-1` for a pop.
    pub stack_delta: i8,
    pub description: &'static str,
}

/// The fixed set of safe, whitelisted building blocks Wig assembles
/// sequences from.
pub const TEMPLATES: &[Template] = &[
    Template {
        bytes: &[0x90],
        stack_delta: 0,
        description: "NOP",
    },
    Template {
        bytes: &[0x89, 0xC0],
        stack_delta: 0,
        description: "MOV EAX, EAX",
    },
    Template {
        bytes: &[0x85, 0xC0],
        stack_delta: 0,
        description: "TEST EAX, EAX",
    },
    Template {
        bytes: &[0x39, 0xC0],
        stack_delta: 0,
        description: "CMP EAX, EAX",
    },
    Template {
        bytes: &[0x8D, 0x00],
        stack_delta: 0,
        description: "LEA EAX, [EAX]",
    },
    Template {
        bytes: &[0x50],
        stack_delta: 1,
        description: "PUSH EAX",
    },
    Template {
        bytes: &[0x58],
        stack_delta: -1,
        description: "POP EAX",
    },
    Template {
        bytes: &[0x50, 0x58],
        stack_delta: 0,
        description: "PUSH EAX; POP EAX (paired)",
    },
];

/// Bounds on the running stack-delta budget while assembling a sequence.
pub const STACK_DELTA_MIN: i8 = -5;
pub const STACK_DELTA_MAX: i8 = 5;

/// Maximum regeneration attempts before giving up and returning whatever
/// was last assembled, unvalidated. In practice the template catalog is
/// small and fully whitelisted, so this should never trigger.
const MAX_REGENERATIONS: usize = 50;

/// Assembles a byte sequence of at least `target_len_bytes`, keeping the
/// running stack delta inside `[STACK_DELTA_MIN, STACK_DELTA_MAX]`, forcing
/// it back to zero at the end, and rejecting the whole sequence (retrying)
/// if it turns out to contain a blacklisted gadget.
pub fn generate(
    rng: &mut Xorshift128,
    target_len_bytes: usize,
    mode64: bool,
    constraints: &ManifoldConstraints,
) -> Vec<u8> {
    let mut last_attempt = Vec::new();
    for _ in 0..MAX_REGENERATIONS {
        let mut out = Vec::new();
        let mut budget: i8 = 0;
        while out.len() < target_len_bytes {
            let template = &TEMPLATES[rng.range(TEMPLATES.len())];
            let next_budget = budget + template.stack_delta;
            if next_budget < STACK_DELTA_MIN || next_budget > STACK_DELTA_MAX {
                continue;
            }
            out.extend_from_slice(template.bytes);
            budget = next_budget;
        }
        force_balance(&mut out, &mut budget);

        last_attempt = out.clone();
        if is_valid(&out, mode64, constraints) {
            return out;
        }
    }
    last_attempt
}

fn force_balance(out: &mut Vec<u8>, budget: &mut i8) {
    while *budget > 0 {
        out.push(0x58); // POP EAX
        *budget -= 1;
    }
    while *budget < 0 {
        out.push(0x50); // PUSH EAX
        *budget += 1;
    }
}

fn is_valid(bytes: &[u8], mode64: bool, constraints: &ManifoldConstraints) -> bool {
    if constraints.contains_blacklisted(bytes) {
        return false;
    }
    let (decoded, err) = lito::parse_all(bytes, mode64);
    if err.is_some() || decoded.iter().map(|i| i.length as usize).sum::<usize>() != bytes.len() {
        return false;
    }
    constraints.all_opcodes_whitelisted(&decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_sequence_meets_minimum_length() {
        let mut rng = Xorshift128::new(9);
        let constraints = ManifoldConstraints::default();
        let out = generate(&mut rng, 8, true, &constraints);
        assert!(out.len() >= 8);
    }

    #[test]
    fn generated_sequence_decodes_cleanly() {
        let mut rng = Xorshift128::new(11);
        let constraints = ManifoldConstraints::default();
        let out = generate(&mut rng, 16, true, &constraints);
        let (decoded, err) = lito::parse_all(&out, true);
        assert!(err.is_none());
        assert_eq!(decoded.iter().map(|i| i.length as usize).sum::<usize>(), out.len());
    }

    #[test]
    fn generated_sequence_never_contains_a_blacklisted_gadget() {
        let mut rng = Xorshift128::new(13);
        let constraints = ManifoldConstraints::default();
        let out = generate(&mut rng, 32, true, &constraints);
        assert!(!constraints.contains_blacklisted(&out));
    }

    #[test]
    fn generated_sequence_is_whitelisted() {
        let mut rng = Xorshift128::new(17);
        let constraints = ManifoldConstraints::default();
        let out = generate(&mut rng, 32, true, &constraints);
        let (decoded, err) = lito::parse_all(&out, true);
        assert!(err.is_none());
        assert!(constraints.all_opcodes_whitelisted(&decoded));
    }

    #[rstest::rstest]
    fn every_catalog_entry_decodes_cleanly_and_is_whitelisted(
        #[values(
            "NOP",
            "MOV EAX, EAX",
            "TEST EAX, EAX",
            "CMP EAX, EAX",
            "LEA EAX, [EAX]",
            "PUSH EAX",
            "POP EAX",
            "PUSH EAX; POP EAX (paired)"
        )]
        description: &str,
    ) {
        let template = TEMPLATES.iter().find(|t| t.description == description).unwrap();
        let constraints = ManifoldConstraints::default();
        let (decoded, err) = lito::parse_all(template.bytes, true);
        assert!(err.is_none());
        assert_eq!(
            decoded.iter().map(|i| i.length as usize).sum::<usize>(),
            template.bytes.len()
        );
        assert!(constraints.all_opcodes_whitelisted(&decoded));
    }

    #[rstest::rstest]
    fn every_catalog_entry_keeps_stack_delta_within_a_single_word(
        #[values(
            "NOP",
            "MOV EAX, EAX",
            "TEST EAX, EAX",
            "CMP EAX, EAX",
            "LEA EAX, [EAX]",
            "PUSH EAX",
            "POP EAX",
            "PUSH EAX; POP EAX (paired)"
        )]
        description: &str,
    ) {
        let template = TEMPLATES.iter().find(|t| t.description == description).unwrap();
        assert!((-1..=1).contains(&template.stack_delta));
    }
}
