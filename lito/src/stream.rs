//! Stream-level helpers built on top of single-instruction decoding.

use crate::decoder::lito_decode;
use crate::error::DecodeError;
use crate::instruction::DecodedInstruction;

/// Bound on the number of instructions a single [`parse_all`] call will
/// produce: no input can cause unbounded computation.
pub const MAX_STREAM_INSTRUCTIONS: usize = 100_000;

/// Walks `bytes` from offset 0, decoding one instruction at a time.
///
/// On success, every byte of `bytes` is covered by exactly one decoded
/// instruction. On failure, returns the instructions successfully decoded
/// before the failing offset, plus the error that stopped the walk.
pub fn parse_all(bytes: &[u8], mode64: bool) -> (Vec<DecodedInstruction>, Option<DecodeError>) {
    let mut out = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        if out.len() >= MAX_STREAM_INSTRUCTIONS {
            break;
        }
        match lito_decode(bytes, offset, mode64) {
            Ok(instruction) => {
                offset += instruction.length as usize;
                out.push(instruction);
            }
            Err(e) => return (out, Some(e)),
        }
    }
    (out, None)
}

/// Returns the ordered list of instruction start offsets in `bytes`.
///
/// This is the source of truth for "is this offset an instruction
/// boundary?" queries; offsets not in this list (including offsets mid-way
/// through a multi-byte instruction) are not valid jump targets within the
/// decoded region.
pub fn boundaries(bytes: &[u8], mode64: bool) -> Vec<usize> {
    let (instructions, _) = parse_all(bytes, mode64);
    let mut offsets = Vec::with_capacity(instructions.len());
    let mut offset = 0;
    for instruction in &instructions {
        offsets.push(offset);
        offset += instruction.length as usize;
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_all_sums_lengths_to_buffer_length() {
        let bytes = [0x90, 0x50, 0x89, 0xC8, 0x05, 0x10, 0x00, 0x00, 0x00, 0x59, 0x58, 0xC3];
        let (instructions, err) = parse_all(&bytes, true);
        assert!(err.is_none());
        assert_eq!(instructions.len(), 7);
        assert_eq!(
            instructions.iter().map(|i| i.length as usize).collect::<Vec<_>>(),
            vec![1, 1, 2, 5, 1, 1, 1]
        );
        assert_eq!(
            instructions.iter().map(|i| i.length as usize).sum::<usize>(),
            bytes.len()
        );
    }

    #[test]
    fn parse_all_stops_at_decode_error() {
        let bytes = [0x90, 0x74]; // NOP then a truncated JE
        let (instructions, err) = parse_all(&bytes, true);
        assert_eq!(instructions.len(), 1);
        assert!(err.is_some());
    }

    #[test]
    fn boundaries_matches_cumulative_offsets() {
        let bytes = [0x90, 0x90, 0xEB, 0x00];
        let b = boundaries(&bytes, true);
        assert_eq!(b, vec![0, 1, 2]);
    }
}
