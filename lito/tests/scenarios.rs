//! End-to-end decode scenarios covering the named test-matrix cases.

use lito::parse_all;

#[test]
fn scenario_c_seven_instructions_of_known_lengths() {
    let bytes = [
        0x90, 0x50, 0x89, 0xC8, 0x05, 0x10, 0x00, 0x00, 0x00, 0x59, 0x58, 0xC3,
    ];
    let (instructions, err) = parse_all(&bytes, true);
    assert!(err.is_none());
    let lengths: Vec<usize> = instructions.iter().map(|i| i.length as usize).collect();
    assert_eq!(lengths, vec![1, 1, 2, 5, 1, 1, 1]);
    assert_eq!(lengths.iter().sum::<usize>(), 12);
}
