//! Pass 2: relocate every relative branch's displacement now that the
//! rewritten buffer's addresses are final.
//!
//! Each [`crate::pass1::PendingRelocation`] carries the branch's target in
//! the *original* buffer's address space; this pass maps that target
//! through the address-translation table to the rewritten buffer and
//! recomputes the displacement relative to the branch's own new address.

use tracing::{instrument, warn};

use crate::address_table::AddressTranslationTable;
use crate::config::MorphConfig;
use crate::error::MorphError;
use crate::pass1::PendingRelocation;

/// Patches every pending relocation into `bytes` in place.
#[instrument(skip(bytes, table, pending, config))]
pub fn run(
    bytes: &mut [u8],
    table: &AddressTranslationTable,
    pending: &[PendingRelocation],
    config: &MorphConfig,
) -> Result<(), MorphError> {
    for reloc in pending {
        let new_target = match table.translate(reloc.old_target) {
            Some(t) => t,
            None if config.strict_relocation => {
                return Err(MorphError::RelocationTargetMissing {
                    offset: reloc.old_instr_offset,
                });
            }
            None => {
                warn!(
                    offset = reloc.old_instr_offset,
                    target = reloc.old_target,
                    "branch target not in address table, leaving displacement unchanged"
                );
                continue;
            }
        };

        let disp_end = reloc.disp_offset + reloc.disp_width as usize;
        let new_disp = new_target as i64 - disp_end as i64;
        patch_displacement(bytes, reloc, new_disp)?;

        if config.verify_relocations {
            verify(bytes, reloc, new_target, config.mode64)?;
        }
    }
    Ok(())
}

fn patch_displacement(bytes: &mut [u8], reloc: &PendingRelocation, new_disp: i64) -> Result<(), MorphError> {
    let range = reloc.disp_offset..reloc.disp_offset + reloc.disp_width as usize;
    match reloc.disp_width {
        1 => {
            let v = i8::try_from(new_disp).map_err(|_| MorphError::RelocationOutOfRange {
                offset: reloc.new_instr_offset,
                displacement: new_disp,
            })?;
            bytes[range][0] = v as u8;
        }
        4 => {
            let v = i32::try_from(new_disp).map_err(|_| MorphError::RelocationOutOfRange {
                offset: reloc.new_instr_offset,
                displacement: new_disp,
            })?;
            bytes[range].copy_from_slice(&v.to_le_bytes());
        }
        width => {
            return Err(MorphError::TrackerInvariantViolated {
                index: reloc.new_instr_offset,
                detail: match width {
                    0 => "relocation has zero displacement width",
                    _ => "relocation displacement width is not 1 or 4",
                },
            });
        }
    }
    Ok(())
}

fn verify(bytes: &[u8], reloc: &PendingRelocation, expected: usize, mode64: bool) -> Result<(), MorphError> {
    let tail = &bytes[reloc.new_instr_offset..];
    let actual = lito::lito_decode(tail, 0, mode64)
        .ok()
        .and_then(|instr| lito::resolve_branch_target(&instr, reloc.new_instr_offset));
    if actual == Some(expected) {
        Ok(())
    } else {
        Err(MorphError::VerificationFailed {
            offset: reloc.new_instr_offset,
            expected,
            actual,
        })
    }
}
