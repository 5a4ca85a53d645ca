//! The dead-code filler catalog consulted by pass 1 step 4.
//!
//! Every entry is exactly one semantically-null instruction — never a
//! multi-instruction sequence. DESIGN.md open question 1 resolves paired
//! `PUSH`/`POP` filler as forbidden for exactly this reason: keeping every
//! entry a single instruction means an inserted filler run can never be
//! split by a later insertion, so the tracker never needs an "atomic unit"
//! concept.

/// One candidate filler instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadCodeEntry {
    /// Raw bytes of the filler instruction.
    pub bytes: &'static [u8],
    /// Byte length, equal to `bytes.len()`.
    pub length: u8,
    /// Complexity tier: 1 = trivial (pure NOP-equivalent), 2 = moderate
    /// (touches a register without changing its value), 3 = complex
    /// (reserved; no catalog entry currently uses this tier).
    pub complexity: u8,
    /// Whether this entry modifies the flags register.
    pub clobbers_flags: bool,
    /// Human-readable description, for logging/debugging.
    pub description: &'static str,
}

/// The fixed catalog of filler instructions, ordered from least to most
/// intrusive. `TEST`/`CMP` self-comparisons clobber flags and are only
/// eligible when [`crate::config::DeadCodePolicy::forbid_before_conditional_branch`]
/// is honored by the caller.
pub const CATALOG: &[DeadCodeEntry] = &[
    DeadCodeEntry {
        bytes: &[0x90],
        length: 1,
        complexity: 1,
        clobbers_flags: false,
        description: "NOP",
    },
    DeadCodeEntry {
        bytes: &[0x89, 0xC0],
        length: 2,
        complexity: 1,
        clobbers_flags: false,
        description: "MOV EAX, EAX",
    },
    DeadCodeEntry {
        bytes: &[0x8D, 0x00],
        length: 2,
        complexity: 2,
        clobbers_flags: false,
        description: "LEA EAX, [EAX]",
    },
    DeadCodeEntry {
        bytes: &[0x85, 0xC0],
        length: 2,
        complexity: 2,
        clobbers_flags: true,
        description: "TEST EAX, EAX",
    },
    DeadCodeEntry {
        bytes: &[0x39, 0xC0],
        length: 2,
        complexity: 2,
        clobbers_flags: true,
        description: "CMP EAX, EAX",
    },
];

/// Entries from [`CATALOG`] whose length and complexity fall within the
/// given bounds. `forbid_flags` additionally excludes flag-clobbering
/// entries, used when the following instruction is a conditional branch.
pub fn eligible(min_length: u8, max_length: u8, max_complexity: u8, forbid_flags: bool) -> Vec<&'static DeadCodeEntry> {
    CATALOG
        .iter()
        .filter(|e| e.length >= min_length && e.length <= max_length)
        .filter(|e| e.complexity <= max_complexity)
        .filter(|e| !forbid_flags || !e.clobbers_flags)
        .collect()
}
