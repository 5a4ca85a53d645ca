//! The executable manifold: the subset of feature-vector space that can be
//! realized as valid, ABI-respecting x86/x64 code, plus the byte-level
//! gadget blacklist enforced on generated filler.

use lito::DecodedInstruction;

use crate::feature_vector::{
    FeatureVector, BLOCK_SIZE_PROXY_DIM, FEATURE_DIM, JUMP_DISTANCE_PROXY_DIM, POP_FREQ_DIM, PUSH_FREQ_DIM,
    REGISTER_USAGE_BASE_DIM,
};

/// Register-usage dimensions, counting from [`REGISTER_USAGE_BASE_DIM`]
/// (EAX..EDI in x86 register-number order).
const ESP_USAGE_DIM: usize = REGISTER_USAGE_BASE_DIM + 4;
const EBP_USAGE_DIM: usize = REGISTER_USAGE_BASE_DIM + 5;
const ESI_USAGE_DIM: usize = REGISTER_USAGE_BASE_DIM + 6;
const EDI_USAGE_DIM: usize = REGISTER_USAGE_BASE_DIM + 7;

/// Tolerance for the push/pop stack-balance dependency rule.
const STACK_BALANCE_TOLERANCE: f64 = 0.05;

/// Byte sequences known to behave as return-oriented-programming gadgets;
/// generated filler must never contain one of these as a contiguous
/// subsequence.
pub const GADGET_BLACKLIST: &[&[u8]] = &[
    &[0x5C, 0xC3], // POP ESP; RET
    &[0x58, 0xC3], // POP EAX; RET
    &[0xFF, 0xE0], // JMP EAX
    &[0xFF, 0xE4], // JMP ESP
    &[0xFF, 0xD0], // CALL EAX
    &[0xC3, 0x90, 0x90], // RET; NOP; NOP
];

/// Opcode bytes the manifold permits in synthesized filler. Anything
/// outside this set is rejected by [`project`]'s callers before it ever
/// reaches the output stream.
pub const DEFAULT_OPCODE_WHITELIST: &[u8] = &[
    0x90, // NOP
    0x89, 0x8B, // MOV r/m, r  and  MOV r, r/m
    0x8D, // LEA
    0x85, // TEST
    0x39, 0x3B, // CMP
    0x50, 0x51, 0x52, 0x53, 0x55, 0x56, 0x57, // PUSH (not ESP)
    0x58, 0x59, 0x5A, 0x5B, 0x5D, 0x5E, 0x5F, // POP (not ESP)
];

/// The clamp intervals and dependency rules that bound executable code.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ManifoldConstraints {
    /// Per-dimension `[lo, hi]` clamp interval.
    pub clamps: [(f64, f64); FEATURE_DIM],
    /// Opcode bytes synthesized filler may use.
    pub opcode_whitelist: Vec<u8>,
    /// Byte sequences forbidden from appearing anywhere in generated output.
    pub gadget_blacklist: Vec<Vec<u8>>,
}

impl Default for ManifoldConstraints {
    fn default() -> Self {
        let mut clamps = [(0.0, 1.0); FEATURE_DIM];
        // EBP is reserved as the frame pointer: templates never touch it.
        clamps[EBP_USAGE_DIM] = (0.0, 0.0);
        // ESP usage is tightly bounded: only balanced stack ops are allowed.
        clamps[ESP_USAGE_DIM] = (0.0, 0.1);

        Self {
            clamps,
            opcode_whitelist: DEFAULT_OPCODE_WHITELIST.to_vec(),
            gadget_blacklist: GADGET_BLACKLIST.iter().map(|p| p.to_vec()).collect(),
        }
    }
}

impl ManifoldConstraints {
    /// Manifold defaults adjusted for a target ABI's callee-saved register
    /// set. The System-V x86-64 ABI (the unrecognized-tag fallback) only
    /// reserves `EBP`; Windows x64 additionally preserves `ESI`/`EDI`
    /// across calls, so filler generated for that platform is held to the
    /// same tight usage band already applied to `ESP`.
    pub fn for_platform(platform_tag: &str) -> Self {
        let mut constraints = Self::default();
        if platform_tag == "win64" {
            constraints.clamps[ESI_USAGE_DIM] = (0.0, 0.1);
            constraints.clamps[EDI_USAGE_DIM] = (0.0, 0.1);
        }
        constraints
    }

    /// True if `bytes` contains any blacklisted gadget pattern as a
    /// contiguous subsequence.
    pub fn contains_blacklisted(&self, bytes: &[u8]) -> bool {
        self.gadget_blacklist
            .iter()
            .any(|pattern| bytes.windows(pattern.len()).any(|w| w == pattern.as_slice()))
    }

    /// True if every byte in `bytes` is in the opcode whitelist. This is a
    /// coarse per-byte check: it rejects sequences that merely contain a
    /// non-whitelisted *operand* byte (a MODRM or SIB byte, say) even when
    /// every instruction's actual opcode is whitelisted, so it is only
    /// suitable for single-byte, operand-free sequences like bare NOP runs.
    pub fn all_whitelisted(&self, bytes: &[u8]) -> bool {
        bytes.iter().all(|b| self.opcode_whitelist.contains(b))
    }

    /// True if every decoded instruction's opcode byte (`opcode1`, or
    /// `opcode2` for two-byte-escape opcodes) is in the opcode whitelist.
    /// Unlike [`Self::all_whitelisted`], this ignores MODRM/SIB/displacement/
    /// immediate bytes, so it correctly accepts multi-byte instructions such
    /// as `MOV EAX, EAX` (`89 C0`) whose opcode (`0x89`) is whitelisted even
    /// though its MODRM byte (`0xC0`) is not itself a whitelisted opcode.
    pub fn all_opcodes_whitelisted(&self, instructions: &[DecodedInstruction]) -> bool {
        instructions.iter().all(|instr| match instr.opcode2 {
            Some(op2) => self.opcode_whitelist.contains(&op2),
            None => self.opcode_whitelist.contains(&instr.opcode1),
        })
    }
}

/// Projects `vector` onto the executable manifold: clamps every dimension
/// to its allowed interval, enforces cross-dimension dependency rules, and
/// renormalizes the probability-distribution bands (instruction-length
/// distribution and complexity buckets) to sum to 1.
///
/// Idempotent: `project(project(v)) == project(v)`.
pub fn project(vector: &FeatureVector, constraints: &ManifoldConstraints) -> FeatureVector {
    let mut out = vector.clone();

    for i in 0..FEATURE_DIM {
        let (lo, hi) = constraints.clamps[i];
        out.set(i, out.get(i).clamp(lo, hi));
    }

    enforce_stack_balance(&mut out);
    enforce_jump_distance_proportionality(&mut out);

    renormalize_band(&mut out, 20, 24);
    renormalize_band(&mut out, 30, 32);

    out
}

fn enforce_stack_balance(v: &mut FeatureVector) {
    let push = v.get(PUSH_FREQ_DIM);
    let pop = v.get(POP_FREQ_DIM);
    if (push - pop).abs() > STACK_BALANCE_TOLERANCE {
        let target = if push > pop {
            push - STACK_BALANCE_TOLERANCE
        } else {
            push + STACK_BALANCE_TOLERANCE
        };
        v.set(POP_FREQ_DIM, target.clamp(0.0, 1.0));
    }
}

fn enforce_jump_distance_proportionality(v: &mut FeatureVector) {
    let block_size = v.get(BLOCK_SIZE_PROXY_DIM);
    let jump_distance = v.get(JUMP_DISTANCE_PROXY_DIM);
    if block_size < 0.5 * jump_distance {
        v.set(JUMP_DISTANCE_PROXY_DIM, (2.0 * block_size).clamp(0.0, 1.0));
    }
}

fn renormalize_band(v: &mut FeatureVector, start: usize, end_inclusive: usize) {
    let sum: f64 = (start..=end_inclusive).map(|i| v.get(i)).sum();
    if sum > 0.0 {
        for i in start..=end_inclusive {
            v.set(i, v.get(i) / sum);
        }
    }
}
