//! The canonical per-instruction decode record.

/// A fully decoded x86/x64 instruction: byte length plus the structured
/// operand metadata a rewriter needs to relocate control flow.
///
/// See the crate-level invariants: `length` always equals the sum of every
/// field's byte width, and `sib.is_some()` implies `modrm.is_some()` with
/// `rm == 4` and `mod != 3`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodedInstruction {
    /// Total byte count, `1..=15`.
    pub length: u8,
    /// Ordered legacy prefix bytes (segment, LOCK, REP/REPNE, 0x66, 0x67).
    pub prefixes: Vec<u8>,
    /// The REX prefix byte, only possible in 64-bit mode.
    pub rex_prefix: Option<u8>,
    /// Primary opcode byte.
    pub opcode1: u8,
    /// Secondary opcode byte, present iff `opcode1 == 0x0F`.
    pub opcode2: Option<u8>,
    /// MODRM byte, if the opcode requires one.
    pub modrm: Option<u8>,
    /// SIB byte, present iff `modrm` selects base+index addressing.
    pub sib: Option<u8>,
    /// Displacement bytes, 0/1/2/4 in length.
    pub displacement: Vec<u8>,
    /// Immediate bytes, 0/1/2/3/4/5/6 in length.
    pub immediate: Vec<u8>,
    /// `opcode2.is_some()`.
    pub is_two_byte_opcode: bool,
    /// Whether this instruction's immediate is a signed displacement relative
    /// to the address of the following instruction.
    pub is_relative_branch: bool,
    /// Whether this instruction is a branch, call, return, or other
    /// control-flow divert (superset of `is_relative_branch`: also covers
    /// indirect `CALL`/`JMP` and `RET`).
    pub is_control_flow: bool,
    /// Whether the 0x66 operand-size override prefix was present.
    pub has_operand_size_override: bool,
    /// Whether the 0x67 address-size override prefix was present.
    pub has_address_size_override: bool,
    /// Whether a REX prefix was present.
    pub has_rex: bool,
}

impl DecodedInstruction {
    /// `mod` field of the MODRM byte, if present.
    pub fn modrm_mod(&self) -> Option<u8> {
        self.modrm.map(|m| (m >> 6) & 0b11)
    }

    /// `reg` field of the MODRM byte, if present.
    pub fn modrm_reg(&self) -> Option<u8> {
        self.modrm.map(|m| (m >> 3) & 0b111)
    }

    /// `rm` field of the MODRM byte, if present.
    pub fn modrm_rm(&self) -> Option<u8> {
        self.modrm.map(|m| m & 0b111)
    }

    /// `REX.W`: promotes the default operand size to 64 bits.
    pub fn rex_w(&self) -> bool {
        self.rex_prefix.is_some_and(|r| r & 0x08 != 0)
    }

    /// `REX.R`: extends the MODRM `reg` field.
    pub fn rex_r(&self) -> bool {
        self.rex_prefix.is_some_and(|r| r & 0x04 != 0)
    }

    /// `REX.X`: extends the SIB `index` field.
    pub fn rex_x(&self) -> bool {
        self.rex_prefix.is_some_and(|r| r & 0x02 != 0)
    }

    /// `REX.B`: extends the MODRM `rm` / SIB `base` / opcode-embedded register.
    pub fn rex_b(&self) -> bool {
        self.rex_prefix.is_some_and(|r| r & 0x01 != 0)
    }

    /// Current operand size in bytes, per the general rule: 8 if `REX.W`, 2 if
    /// 0x66 is present, else 4.
    ///
    /// Branch immediate sizing must **not** call this helper — see
    /// [`crate::branch`] and DESIGN.md open question 4: the default operand
    /// size for near branches is always 32-bit, 0x66 notwithstanding.
    pub fn current_operand_size(&self) -> u8 {
        if self.rex_w() {
            8
        } else if self.has_operand_size_override {
            2
        } else {
            4
        }
    }

    /// Signed value of the displacement bytes, sign-extended to `i32`.
    pub fn displacement_value(&self) -> i32 {
        sign_extend(&self.displacement)
    }

    /// Signed value of the immediate bytes, sign-extended to `i32`.
    ///
    /// Only meaningful for immediates of width 1, 2, or 4 — the composite
    /// `ENTER` (3-byte) and far-pointer (6-byte) immediates are not simple
    /// signed scalars and must be interpreted field-by-field by the caller.
    pub fn immediate_value(&self) -> i32 {
        sign_extend(&self.immediate)
    }
}

pub(crate) fn sign_extend(bytes: &[u8]) -> i32 {
    match bytes.len() {
        0 => 0,
        1 => i32::from(bytes[0] as i8),
        2 => i32::from(i16::from_le_bytes([bytes[0], bytes[1]])),
        4 => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        n => {
            debug_assert!(false, "sign_extend called with unsupported width {n}");
            0
        }
    }
}
