//! Table-driven opcode classification.
//!
//! Two 256-entry const arrays back every decode decision after the opcode
//! byte has been read: [`PRIMARY_OPCODE_TABLE`] indexed by the primary
//! opcode byte, and [`SECONDARY_OPCODE_TABLE`] indexed by the byte that
//! follows a `0x0F` escape. Dispatch on an opcode byte is always an array
//! index, never a chain of `if`/virtual calls.
//!
//! Bytes the table does not explicitly classify fall back to
//! [`OpcodeInfo::DEFAULT`] (no MODRM, no immediate). Per spec this is a safe
//! default for length recovery: an instruction this decoder has no literal
//! knowledge of is assumed to be exactly the opcode byte(s) wide, which is
//! wrong for many unclassified SSE/AVX forms but never *under*-reports
//! length for anything this table does classify.
//!
//! VEX/EVEX (AVX, `0xC4`/`0xC5`/`0x62` in 64-bit mode) prefixes are not
//! decoded: SIMD semantics beyond length decoding are out of scope, and
//! AVX-encoded streams are not expected from the standard
//! compiler output this decoder targets; `0xC4`/`0xC5` are classified with
//! their legacy 32-bit-mode meaning (`LES`/`LDS`), which is wrong for a
//! VEX-prefixed instruction stream and is a known, documented gap rather
//! than a silent one.

/// How an opcode's immediate operand is sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmediateKind {
    /// No immediate.
    None,
    /// Always 1 byte.
    Imm8,
    /// Always 2 bytes.
    Imm16,
    /// Always 4 bytes, never affected by `REX.W` or 0x66 (near branch displacements).
    Imm32,
    /// 2 bytes if 0x66 is present, else 4. Never affected by `REX.W` — used by
    /// ALU-immediate and `group1`/`group11` forms, which sign-extend an
    /// `imm32` even in 64-bit operand size.
    Full,
    /// Like [`ImmediateKind::Full`], but affected by `REX.W`: 2 bytes if 0x66,
    /// 8 bytes if `REX.W`, else 4. Used only by `MOV r64, imm64` (`0xB8..0xBF`
    /// under `REX.W`).
    FullOrQuad,
    /// Group-3 `TEST`/`NOT`/`NEG`/`MUL`/`IMUL`/`DIV`/`IDIV` (`0xF6`/`0xF7`):
    /// an immediate (`Imm8` for `0xF6`, [`ImmediateKind::Full`] for `0xF7`)
    /// is present *only* if `modrm.reg == 0` (the `TEST` sub-opcode).
    Group3,
    /// `ENTER`'s 3-byte `imm16` + `imm8` composite.
    EnterComposite,
    /// Far `CALL`/`JMP` seg:off composite: 6 bytes, or 4 with 0x66.
    FarPointer,
    /// `MOV` moffs (`0xA0..0xA3`): carries an address-size-sized displacement
    /// in place of an immediate, handled specially by the decoder.
    MoffsAddress,
}

/// Static classification of a single opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    /// Whether a MODRM byte follows the opcode.
    pub has_modrm: bool,
    /// How to size the immediate, if any.
    pub immediate: ImmediateKind,
    /// Set for the relative-displacement branch family: short Jcc,
    /// `LOOP`/`JCXZ`, near `CALL`/`JMP`, short `JMP`, near Jcc.
    pub is_relative_branch: bool,
    /// Width of the relative displacement, 0 if not a relative branch.
    pub branch_disp_bytes: u8,
    /// Whether this opcode unconditionally diverts or ends control flow
    /// (branch, call, return). `0xFF`'s `CALL`/`JMP` group-5 forms are
    /// resolved at decode time from the MODRM `reg` field, not here — see
    /// [`OpcodeInfo::GROUP5_CONTROL_FLOW_REGS`].
    pub is_control_flow: bool,
}

impl OpcodeInfo {
    /// Safe fallback for unclassified opcode bytes.
    pub const DEFAULT: OpcodeInfo = OpcodeInfo {
        has_modrm: false,
        immediate: ImmediateKind::None,
        is_relative_branch: false,
        branch_disp_bytes: 0,
        is_control_flow: false,
    };

    const fn modrm_only() -> OpcodeInfo {
        OpcodeInfo {
            has_modrm: true,
            ..OpcodeInfo::DEFAULT
        }
    }

    const fn modrm_imm(immediate: ImmediateKind) -> OpcodeInfo {
        OpcodeInfo {
            has_modrm: true,
            immediate,
            ..OpcodeInfo::DEFAULT
        }
    }

    const fn imm_only(immediate: ImmediateKind) -> OpcodeInfo {
        OpcodeInfo {
            immediate,
            ..OpcodeInfo::DEFAULT
        }
    }

    const fn relative_branch(immediate: ImmediateKind, disp_bytes: u8) -> OpcodeInfo {
        OpcodeInfo {
            immediate,
            is_relative_branch: true,
            branch_disp_bytes: disp_bytes,
            is_control_flow: true,
            ..OpcodeInfo::DEFAULT
        }
    }

    const fn control_flow() -> OpcodeInfo {
        OpcodeInfo {
            is_control_flow: true,
            ..OpcodeInfo::DEFAULT
        }
    }

    const fn control_flow_imm(immediate: ImmediateKind) -> OpcodeInfo {
        OpcodeInfo {
            immediate,
            is_control_flow: true,
            ..OpcodeInfo::DEFAULT
        }
    }

    /// `modrm.reg` values of opcode `0xFF` (group 5) that divert control
    /// flow: `2` = `CALL r/m`, `3` = `CALL FAR r/m`, `4` = `JMP r/m`,
    /// `5` = `JMP FAR r/m`. `0` (`INC`), `1` (`DEC`), and `6` (`PUSH`) do not.
    pub const GROUP5_CONTROL_FLOW_REGS: [u8; 4] = [2, 3, 4, 5];
}

const fn classify_primary(byte: u8) -> OpcodeInfo {
    use ImmediateKind::*;
    match byte {
        // ADD/OR/ADC/SBB/AND/SUB/XOR/CMP r/m,r and r,r/m forms.
        0x00..=0x03
        | 0x08..=0x0B
        | 0x10..=0x13
        | 0x18..=0x1B
        | 0x20..=0x23
        | 0x28..=0x2B
        | 0x30..=0x33
        | 0x38..=0x3B => OpcodeInfo::modrm_only(),

        // Same ALU families against AL/eAX with an immediate.
        0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C | 0xA8 => OpcodeInfo::imm_only(Imm8),
        0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D | 0xA9 => OpcodeInfo::imm_only(Full),

        // One-byte segment-register push/pop and ASCII adjust, no operands.
        0x06 | 0x07 | 0x0E | 0x16 | 0x17 | 0x1E | 0x1F | 0x27 | 0x2F | 0x37 | 0x3F => OpcodeInfo::DEFAULT,

        // 0x0F two-byte escape: consumed by the opcode phase itself.
        0x0F => OpcodeInfo::DEFAULT,

        // 32-bit-mode INC/DEC r32 (only reachable when the prefix phase did
        // not consume this byte as REX, i.e. in 32-bit mode).
        0x40..=0x4F => OpcodeInfo::DEFAULT,

        // PUSH/POP r, no MODRM.
        0x50..=0x5F => OpcodeInfo::DEFAULT,

        // PUSHA(D)/POPA(D).
        0x60 | 0x61 => OpcodeInfo::DEFAULT,

        // BOUND / MOVSXD.
        0x62 | 0x63 => OpcodeInfo::modrm_only(),

        // PUSH imm32 (always a 4-byte immediate, not affected by REX.W).
        0x68 => OpcodeInfo::imm_only(Imm32),
        // IMUL r, r/m, imm32/imm16.
        0x69 => OpcodeInfo::modrm_imm(Full),
        // PUSH imm8.
        0x6A => OpcodeInfo::imm_only(Imm8),
        // IMUL r, r/m, imm8.
        0x6B => OpcodeInfo::modrm_imm(Imm8),

        // INS/OUTS, no operands.
        0x6C..=0x6F => OpcodeInfo::DEFAULT,

        // Short Jcc, rel8.
        0x70..=0x7F => OpcodeInfo::relative_branch(Imm8, 1),

        // group1 r/m8, imm8.
        0x80 | 0x82 => OpcodeInfo::modrm_imm(Imm8),
        // group1 r/m, imm32/imm16.
        0x81 => OpcodeInfo::modrm_imm(Full),
        // group1 r/m, imm8 (sign-extended).
        0x83 => OpcodeInfo::modrm_imm(Imm8),

        // TEST/XCHG/MOV r/m,r and r,r/m; MOV r/m,Sreg and Sreg,r/m; LEA.
        0x84..=0x8E => OpcodeInfo::modrm_only(),
        // POP r/m (group 1A).
        0x8F => OpcodeInfo::modrm_only(),

        // NOP / XCHG eAX,r; CBW/CWDE/CDQE; CWD/CDQ/CQO; FWAIT; PUSHF/POPF;
        // SAHF/LAHF: none take operands beyond the opcode byte.
        0x90..=0x9F => OpcodeInfo::DEFAULT,

        // MOV moffs: an address-size displacement stands in for an immediate.
        0xA0..=0xA3 => OpcodeInfo::imm_only(MoffsAddress),

        // MOVS/CMPS, no operands.
        0xA4..=0xA7 => OpcodeInfo::DEFAULT,
        // STOS/LODS/SCAS, no operands.
        0xAA..=0xAF => OpcodeInfo::DEFAULT,

        // MOV r8, imm8.
        0xB0..=0xB7 => OpcodeInfo::imm_only(Imm8),
        // MOV r32/r64, imm32/imm64.
        0xB8..=0xBF => OpcodeInfo::imm_only(FullOrQuad),

        // Shift group, r/m, imm8.
        0xC0 | 0xC1 => OpcodeInfo::modrm_imm(Imm8),
        // RET imm16 / RET.
        0xC2 => OpcodeInfo::control_flow_imm(Imm16),
        0xC3 => OpcodeInfo::control_flow(),

        // LES/LDS (32-bit mode); legacy classification reused for the
        // VEX two-byte/three-byte prefixes in 64-bit mode (see module docs).
        0xC4 | 0xC5 => OpcodeInfo::modrm_only(),

        // group11 MOV r/m8, imm8 / r/m, imm32.
        0xC6 => OpcodeInfo::modrm_imm(Imm8),
        0xC7 => OpcodeInfo::modrm_imm(Full),

        // ENTER imm16, imm8.
        0xC8 => OpcodeInfo::imm_only(EnterComposite),
        // LEAVE.
        0xC9 => OpcodeInfo::DEFAULT,
        // RETF imm16 / RETF.
        0xCA => OpcodeInfo::control_flow_imm(Imm16),
        0xCB => OpcodeInfo::control_flow(),

        // INT3 / INT imm8 / INTO / IRET.
        0xCC => OpcodeInfo::DEFAULT,
        0xCD => OpcodeInfo::imm_only(Imm8),
        0xCE | 0xCF => OpcodeInfo::DEFAULT,

        // Shift group r/m, 1 or CL.
        0xD0..=0xD3 => OpcodeInfo::modrm_only(),
        // AAM/AAD imm8.
        0xD4 | 0xD5 => OpcodeInfo::imm_only(Imm8),
        // Reserved (SALC) / XLAT.
        0xD6 | 0xD7 => OpcodeInfo::DEFAULT,

        // x87 FPU escapes: always one MODRM-shaped byte, no immediate.
        0xD8..=0xDF => OpcodeInfo::modrm_only(),

        // LOOPNE/LOOPE/LOOP/JCXZ rel8.
        0xE0..=0xE3 => OpcodeInfo::relative_branch(Imm8, 1),

        // IN/OUT with an imm8 port.
        0xE4..=0xE7 => OpcodeInfo::imm_only(Imm8),

        // Near CALL rel32 / near JMP rel32.
        0xE8 => OpcodeInfo::relative_branch(Imm32, 4),
        0xE9 => OpcodeInfo::relative_branch(Imm32, 4),

        // Far JMP ptr16:32 (not a relative branch: absolute seg:off).
        0xEA => OpcodeInfo::control_flow_imm(FarPointer),

        // Short JMP rel8.
        0xEB => OpcodeInfo::relative_branch(Imm8, 1),

        // IN/OUT with DX port.
        0xEC..=0xEF => OpcodeInfo::DEFAULT,

        // HLT / CMC.
        0xF4 | 0xF5 => OpcodeInfo::DEFAULT,
        // Reserved / ICEBP.
        0xF1 => OpcodeInfo::DEFAULT,

        // group3 TEST/NOT/NEG/MUL/IMUL/DIV/IDIV.
        0xF6 => OpcodeInfo::modrm_imm(Group3),
        0xF7 => OpcodeInfo::modrm_imm(Group3),

        // CLC/STC/CLI/STI/CLD/STD.
        0xF8..=0xFD => OpcodeInfo::DEFAULT,

        // group4 INC/DEC r/m8.
        0xFE => OpcodeInfo::modrm_only(),
        // group5 INC/DEC/CALL/CALLF/JMP/JMPF/PUSH r/m. Whether this
        // particular instance is control flow depends on MODRM.reg and is
        // resolved at decode time, not here.
        0xFF => OpcodeInfo::modrm_only(),

        _ => OpcodeInfo::DEFAULT,
    }
}

const fn classify_secondary(byte: u8) -> OpcodeInfo {
    use ImmediateKind::*;
    match byte {
        // group6/group7 system instructions, LAR/LSL.
        0x00..=0x03 => OpcodeInfo::modrm_only(),
        // SYSCALL / CLTS / SYSRET.
        0x05..=0x07 => OpcodeInfo::DEFAULT,
        // INVD / WBINVD.
        0x08 | 0x09 => OpcodeInfo::DEFAULT,
        // UD2.
        0x0B => OpcodeInfo::DEFAULT,
        // NOP/prefetch hints with a MODRM byte (multi-byte NOP family).
        0x0D | 0x18..=0x1F => OpcodeInfo::modrm_only(),

        // MOVUPS/MOVAPS/... SSE move family.
        0x10..=0x17 => OpcodeInfo::modrm_only(),
        // MOV to/from control/debug registers.
        0x20..=0x23 => OpcodeInfo::modrm_only(),
        // SSE compare/convert family.
        0x28..=0x2F => OpcodeInfo::modrm_only(),

        // WRMSR/RDTSC/RDMSR/RDPMC/SYSENTER/SYSEXIT.
        0x30..=0x35 => OpcodeInfo::DEFAULT,

        // CMOVcc r, r/m.
        0x40..=0x4F => OpcodeInfo::modrm_only(),

        // SSE/MMX arithmetic and shuffle family (default: no immediate).
        0x50..=0x6F | 0x74..=0x7F => OpcodeInfo::modrm_only(),
        // PSHUFW/PSHUFD/PSHUFHW/PSHUFLW imm8.
        0x70 => OpcodeInfo::modrm_imm(Imm8),
        // group12/13/14 MMX/SSE shift-by-immediate.
        0x71..=0x73 => OpcodeInfo::modrm_imm(Imm8),

        // Near Jcc, rel32. Operand size for branches is hard-coded to 32
        // bits regardless of 0x66 (DESIGN.md open question 4).
        0x80..=0x8F => OpcodeInfo::relative_branch(Imm32, 4),

        // SETcc r/m8.
        0x90..=0x9F => OpcodeInfo::modrm_only(),

        // PUSH/POP FS.
        0xA0 | 0xA1 => OpcodeInfo::DEFAULT,
        // CPUID.
        0xA2 => OpcodeInfo::DEFAULT,
        // BT r/m, r.
        0xA3 => OpcodeInfo::modrm_only(),
        // SHLD r/m, r, imm8.
        0xA4 => OpcodeInfo::modrm_imm(Imm8),
        // SHLD r/m, r, CL.
        0xA5 => OpcodeInfo::modrm_only(),
        // PUSH/POP GS.
        0xA8 | 0xA9 => OpcodeInfo::DEFAULT,
        // BTS r/m, r.
        0xAB => OpcodeInfo::modrm_only(),
        // SHRD r/m, r, imm8.
        0xAC => OpcodeInfo::modrm_imm(Imm8),
        // SHRD r/m, r, CL.
        0xAD => OpcodeInfo::modrm_only(),
        // group15 FXSAVE/FXRSTOR/LDMXCSR/...
        0xAE => OpcodeInfo::modrm_only(),
        // IMUL r, r/m.
        0xAF => OpcodeInfo::modrm_only(),

        // CMPXCHG.
        0xB0 | 0xB1 => OpcodeInfo::modrm_only(),
        // LSS.
        0xB2 => OpcodeInfo::modrm_only(),
        // BTR r/m, r.
        0xB3 => OpcodeInfo::modrm_only(),
        // LFS / LGS.
        0xB4 | 0xB5 => OpcodeInfo::modrm_only(),
        // MOVZX.
        0xB6 | 0xB7 => OpcodeInfo::modrm_only(),
        // group8 BT/BTS/BTR/BTC r/m, imm8.
        0xBA => OpcodeInfo::modrm_imm(Imm8),
        // BTC r/m, r.
        0xBB => OpcodeInfo::modrm_only(),
        // BSF / BSR.
        0xBC | 0xBD => OpcodeInfo::modrm_only(),
        // MOVSX.
        0xBE | 0xBF => OpcodeInfo::modrm_only(),

        // XADD.
        0xC0 | 0xC1 => OpcodeInfo::modrm_only(),
        // CMPPS/CMPSS/... imm8.
        0xC2 => OpcodeInfo::modrm_imm(Imm8),
        // MOVNTI.
        0xC3 => OpcodeInfo::modrm_only(),
        // PINSRW imm8.
        0xC4 => OpcodeInfo::modrm_imm(Imm8),
        // PEXTRW imm8.
        0xC5 => OpcodeInfo::modrm_imm(Imm8),
        // SHUFPS/SHUFPD imm8.
        0xC6 => OpcodeInfo::modrm_imm(Imm8),
        // group9 CMPXCHG8B/16B.
        0xC7 => OpcodeInfo::modrm_only(),
        // BSWAP r (opcode-embedded register, no MODRM).
        0xC8..=0xCF => OpcodeInfo::DEFAULT,

        // Remaining MMX/SSE arithmetic: default to MODRM, no immediate.
        0xD0..=0xFE => OpcodeInfo::modrm_only(),

        _ => OpcodeInfo::DEFAULT,
    }
}

const fn build_table(classify: fn(u8) -> OpcodeInfo) -> [OpcodeInfo; 256] {
    let mut table = [OpcodeInfo::DEFAULT; 256];
    let mut i = 0usize;
    while i < 256 {
        table[i] = classify(i as u8);
        i += 1;
    }
    table
}

/// Classification for every primary opcode byte `0x00..=0xFF`.
pub static PRIMARY_OPCODE_TABLE: [OpcodeInfo; 256] = build_table(classify_primary);

/// Classification for every secondary (post-`0x0F`) opcode byte.
pub static SECONDARY_OPCODE_TABLE: [OpcodeInfo; 256] = build_table(classify_secondary);

/// Looks up the static info for a decoded (opcode1, opcode2) pair.
pub fn lookup(opcode1: u8, opcode2: Option<u8>) -> OpcodeInfo {
    match opcode2 {
        Some(b) => SECONDARY_OPCODE_TABLE[b as usize],
        None => PRIMARY_OPCODE_TABLE[opcode1 as usize],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group3_test_immediate_only_when_reg_is_zero() {
        let info = PRIMARY_OPCODE_TABLE[0xF7];
        assert_eq!(info.immediate, ImmediateKind::Group3);
        assert!(info.has_modrm);
    }

    #[test]
    fn near_branches_use_fixed_imm32_unaffected_by_operand_size() {
        assert_eq!(PRIMARY_OPCODE_TABLE[0xE8].immediate, ImmediateKind::Imm32);
        assert_eq!(PRIMARY_OPCODE_TABLE[0xE9].immediate, ImmediateKind::Imm32);
        assert_eq!(SECONDARY_OPCODE_TABLE[0x84].immediate, ImmediateKind::Imm32);
    }

    #[test]
    fn relative_branch_opcodes_are_flagged() {
        assert!(PRIMARY_OPCODE_TABLE[0x74].is_relative_branch); // JE rel8
        assert!(PRIMARY_OPCODE_TABLE[0xEB].is_relative_branch); // JMP rel8
        assert!(SECONDARY_OPCODE_TABLE[0x84].is_relative_branch); // JE rel32
        assert!(!PRIMARY_OPCODE_TABLE[0x90].is_relative_branch); // NOP
    }

    #[test]
    fn mov_r64_imm64_is_the_only_full_or_quad_opcode() {
        assert_eq!(PRIMARY_OPCODE_TABLE[0xB8].immediate, ImmediateKind::FullOrQuad);
        assert_eq!(PRIMARY_OPCODE_TABLE[0x05].immediate, ImmediateKind::Full);
    }

    #[test]
    fn unknown_by_omission_is_safe_default() {
        // 0x0F38 three-byte-opcode escape lead byte is unclassified here.
        let info = SECONDARY_OPCODE_TABLE[0x38];
        assert!(!info.has_modrm);
        assert_eq!(info.immediate, ImmediateKind::None);
    }

    #[rstest::rstest]
    fn every_short_jcc_is_a_one_byte_relative_branch(
        #[values(0x70, 0x71, 0x72, 0x73, 0x78, 0x79, 0x7A, 0x7B, 0x7E, 0x7F)] opcode: u8,
    ) {
        let info = PRIMARY_OPCODE_TABLE[opcode as usize];
        assert!(info.is_relative_branch);
        assert!(info.is_control_flow);
        assert_eq!(info.branch_disp_bytes, 1);
        assert_eq!(info.immediate, ImmediateKind::Imm8);
    }

    #[rstest::rstest]
    fn every_near_jcc_is_a_four_byte_relative_branch(
        #[values(0x80, 0x81, 0x82, 0x83, 0x88, 0x89, 0x8A, 0x8B, 0x8E, 0x8F)] opcode: u8,
    ) {
        let info = SECONDARY_OPCODE_TABLE[opcode as usize];
        assert!(info.is_relative_branch);
        assert!(info.is_control_flow);
        assert_eq!(info.branch_disp_bytes, 4);
        assert_eq!(info.immediate, ImmediateKind::Imm32);
    }

    #[rstest::rstest]
    fn alu_rm_r_and_r_rm_forms_carry_only_a_modrm_byte(
        #[values(0x00, 0x08, 0x10, 0x18, 0x20, 0x28, 0x30, 0x38)] group_base: u8,
    ) {
        for opcode in group_base..group_base + 4 {
            let info = PRIMARY_OPCODE_TABLE[opcode as usize];
            assert!(info.has_modrm);
            assert_eq!(info.immediate, ImmediateKind::None);
            assert!(!info.is_control_flow);
        }
    }

    #[rstest::rstest]
    fn group5_control_flow_regs_match_call_and_jmp_forms(
        #[values(2, 3, 4, 5)] reg: u8,
    ) {
        assert!(OpcodeInfo::GROUP5_CONTROL_FLOW_REGS.contains(&reg));
    }

    #[rstest::rstest]
    fn group5_non_control_flow_regs_are_excluded(#[values(0, 1, 6)] reg: u8) {
        assert!(!OpcodeInfo::GROUP5_CONTROL_FLOW_REGS.contains(&reg));
    }
}
