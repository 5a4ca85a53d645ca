//! The five-phase decode algorithm.

use crate::error::{DecodeError, DecodePhase};
use crate::instruction::DecodedInstruction;
use crate::opcode_tables::{self, ImmediateKind};

/// Maximum number of legacy prefix bytes accumulated before an opcode byte
/// must appear.
const MAX_PREFIX_BYTES: usize = 15;

/// Architectural maximum length of a single x86/x64 instruction.
const MAX_INSTRUCTION_LENGTH: usize = 15;

const fn is_segment_override(b: u8) -> bool {
    matches!(b, 0x26 | 0x2E | 0x36 | 0x3E | 0x64 | 0x65)
}

const fn is_legacy_prefix(b: u8) -> bool {
    is_segment_override(b) || matches!(b, 0xF0 | 0xF2 | 0xF3 | 0x66 | 0x67)
}

/// Decodes a single instruction at `offset` in `bytes`.
///
/// `mode64` selects 64-bit (REX-capable) vs 32-bit decoding; the two modes
/// disagree only on how bytes `0x40..=0x4F` are interpreted before an
/// opcode (REX prefix vs. one-byte `INC`/`DEC r32`) and on the default
/// address size used by `MOV` moffs / SIB-less-`mod=0` absolute forms.
pub fn lito_decode(bytes: &[u8], offset: usize, mode64: bool) -> Result<DecodedInstruction, DecodeError> {
    if offset >= bytes.len() {
        return Err(DecodeError::OffsetOutOfRange {
            offset,
            len: bytes.len(),
        });
    }

    let mut pos = offset;

    // Phase 1: legacy prefixes, then an optional REX prefix in 64-bit mode.
    let mut prefixes = Vec::new();
    let mut rex_prefix = None;
    let mut has_operand_size_override = false;
    let mut has_address_size_override = false;

    loop {
        if pos >= bytes.len() {
            break;
        }
        let b = bytes[pos];
        if is_legacy_prefix(b) {
            if prefixes.len() >= MAX_PREFIX_BYTES {
                return Err(DecodeError::TruncatedPrefixStack);
            }
            if b == 0x66 {
                has_operand_size_override = true;
            }
            if b == 0x67 {
                has_address_size_override = true;
            }
            prefixes.push(b);
            pos += 1;
            continue;
        }
        if mode64 && (0x40..=0x4F).contains(&b) {
            rex_prefix = Some(b);
            pos += 1;
        }
        // Either a REX prefix was just consumed, or `b` is not a prefix byte
        // at all (including a 32-bit-mode `0x40..=0x4F` one-byte opcode) —
        // either way the prefix phase ends here.
        break;
    }
    let has_rex = rex_prefix.is_some();

    // Phase 2: opcode.
    if pos >= bytes.len() {
        return Err(DecodeError::MissingOpcode);
    }
    let opcode1 = bytes[pos];
    pos += 1;
    let opcode2 = if opcode1 == 0x0F {
        if pos >= bytes.len() {
            return Err(DecodeError::MissingOpcode);
        }
        let b = bytes[pos];
        pos += 1;
        Some(b)
    } else {
        None
    };
    let is_two_byte_opcode = opcode2.is_some();

    let info = opcode_tables::lookup(opcode1, opcode2);

    // Phase 3: MODRM / SIB.
    let mut modrm = None;
    let mut sib = None;
    let mut modrm_mod = 3u8; // behaves as register-direct (no displacement) when absent
    let mut modrm_rm = 0u8;

    if info.has_modrm {
        let byte = *bytes.get(pos).ok_or(DecodeError::TruncatedOperand {
            phase: DecodePhase::ModrmSib,
            offset: pos,
            needed: 1,
        })?;
        pos += 1;
        modrm = Some(byte);
        modrm_mod = (byte >> 6) & 0b11;
        modrm_rm = byte & 0b111;

        if modrm_mod != 3 && modrm_rm == 4 && !has_address_size_override {
            let sib_byte = *bytes.get(pos).ok_or(DecodeError::TruncatedOperand {
                phase: DecodePhase::ModrmSib,
                offset: pos,
                needed: 1,
            })?;
            pos += 1;
            sib = Some(sib_byte);
        }
    }

    // Phase 4: displacement.
    let disp_len = if !info.has_modrm {
        0
    } else {
        match modrm_mod {
            0 => {
                if modrm_rm == 5 && sib.is_none() {
                    4
                } else if modrm_rm == 4 && sib.is_some_and(|s| (s & 0b111) == 5) {
                    4
                } else {
                    0
                }
            }
            1 => 1,
            2 => {
                if has_address_size_override {
                    2
                } else {
                    4
                }
            }
            3 => 0,
            _ => unreachable!("mod is a 2-bit field"),
        }
    };
    let mut displacement = read_n(bytes, &mut pos, disp_len, DecodePhase::Displacement)?;

    // Phase 5: immediate (or, for MOV moffs, an address-size displacement).
    let operand_size = current_operand_size(has_rex, rex_prefix, has_operand_size_override);
    let mut immediate = Vec::new();
    match info.immediate {
        ImmediateKind::None => {}
        ImmediateKind::Imm8 => immediate = read_n(bytes, &mut pos, 1, DecodePhase::Immediate)?,
        ImmediateKind::Imm16 => immediate = read_n(bytes, &mut pos, 2, DecodePhase::Immediate)?,
        ImmediateKind::Imm32 => immediate = read_n(bytes, &mut pos, 4, DecodePhase::Immediate)?,
        ImmediateKind::Full => {
            let n = if has_operand_size_override { 2 } else { 4 };
            immediate = read_n(bytes, &mut pos, n, DecodePhase::Immediate)?;
        }
        ImmediateKind::FullOrQuad => {
            let n = if has_operand_size_override {
                2
            } else if operand_size == 8 {
                8
            } else {
                4
            };
            immediate = read_n(bytes, &mut pos, n, DecodePhase::Immediate)?;
        }
        ImmediateKind::Group3 => {
            let reg = modrm.map(|m| (m >> 3) & 0b111).unwrap_or(0);
            if reg == 0 {
                let n = if opcode1 == 0xF6 {
                    1
                } else if has_operand_size_override {
                    2
                } else {
                    4
                };
                immediate = read_n(bytes, &mut pos, n, DecodePhase::Immediate)?;
            }
        }
        ImmediateKind::EnterComposite => {
            immediate = read_n(bytes, &mut pos, 3, DecodePhase::Immediate)?;
        }
        ImmediateKind::FarPointer => {
            let n = if has_operand_size_override { 4 } else { 6 };
            immediate = read_n(bytes, &mut pos, n, DecodePhase::Immediate)?;
        }
        ImmediateKind::MoffsAddress => {
            let n = address_size(mode64, has_address_size_override);
            // Spec: "carries an address-size displacement rather than an
            // immediate" — stored in `displacement`, not `immediate`.
            displacement = read_n(bytes, &mut pos, n, DecodePhase::Immediate)?;
        }
    }

    let length = pos - offset;
    debug_assert!(
        length <= MAX_INSTRUCTION_LENGTH,
        "decoded length {length} exceeds the architectural maximum"
    );
    if length == 0 {
        // Impossible by construction (an opcode byte is always consumed),
        // but treated per spec as TruncatedOperand rather than panicking.
        return Err(DecodeError::TruncatedOperand {
            phase: DecodePhase::Opcode,
            offset,
            needed: 1,
        });
    }

    let is_control_flow = if opcode1 == 0xFF && opcode2.is_none() {
        modrm
            .map(|m| opcode_tables::OpcodeInfo::GROUP5_CONTROL_FLOW_REGS.contains(&((m >> 3) & 0b111)))
            .unwrap_or(false)
    } else {
        info.is_control_flow
    };

    Ok(DecodedInstruction {
        length: length as u8,
        prefixes,
        rex_prefix,
        opcode1,
        opcode2,
        modrm,
        sib,
        displacement,
        immediate,
        is_two_byte_opcode,
        is_relative_branch: info.is_relative_branch,
        is_control_flow,
        has_operand_size_override,
        has_address_size_override,
        has_rex,
    })
}

fn read_n(bytes: &[u8], pos: &mut usize, n: usize, phase: DecodePhase) -> Result<Vec<u8>, DecodeError> {
    if n == 0 {
        return Ok(Vec::new());
    }
    let end = *pos + n;
    if end > bytes.len() {
        return Err(DecodeError::TruncatedOperand {
            phase,
            offset: *pos,
            needed: end - bytes.len(),
        });
    }
    let out = bytes[*pos..end].to_vec();
    *pos = end;
    Ok(out)
}

/// General-purpose current operand size. Must **not** be used for branch
/// displacement sizing (see DESIGN.md open question 4).
fn current_operand_size(has_rex: bool, rex: Option<u8>, has_66: bool) -> u8 {
    if has_rex && rex.is_some_and(|r| r & 0x08 != 0) {
        8
    } else if has_66 {
        2
    } else {
        4
    }
}

fn address_size(mode64: bool, has_67: bool) -> usize {
    match (mode64, has_67) {
        (true, false) => 8,
        (true, true) => 4,
        (false, false) => 4,
        (false, true) => 2,
    }
}
