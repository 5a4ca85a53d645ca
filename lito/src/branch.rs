//! Relative branch target resolution.

use crate::instruction::DecodedInstruction;

/// Resolves the absolute target (within the same buffer) of a relative
/// branch instruction decoded at `addr`.
///
/// `addr + length + sign_extend(immediate)`. Returns `None` if the
/// instruction is not a relative branch, or if the resolved target would be
/// negative (malformed input, never allowed to panic or underflow).
pub fn resolve_branch_target(instruction: &DecodedInstruction, addr: usize) -> Option<usize> {
    if !instruction.is_relative_branch {
        return None;
    }
    let disp = sign_extended_displacement(instruction)?;
    let base = addr as i64 + i64::from(instruction.length);
    let target = base + i64::from(disp);
    usize::try_from(target).ok()
}

fn sign_extended_displacement(instruction: &DecodedInstruction) -> Option<i32> {
    match instruction.immediate.len() {
        1 => Some(i32::from(instruction.immediate[0] as i8)),
        2 => Some(i32::from(i16::from_le_bytes([
            instruction.immediate[0],
            instruction.immediate[1],
        ]))),
        4 => Some(i32::from_le_bytes([
            instruction.immediate[0],
            instruction.immediate[1],
            instruction.immediate[2],
            instruction.immediate[3],
        ])),
        _ => None,
    }
}
