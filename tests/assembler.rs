//! End-to-end assembler tests: whole programs through `Vm::compile`,
//! covering the error paths and open-question resolutions that the
//! per-module unit tests in `src/assembler/` don't exercise end-to-end.

use litavm::{Vm, VmConfig, VmError};

fn compile(source: &str) -> Result<litavm_asm::Bytecode, VmError> {
    let mut vm = Vm::new(VmConfig::default()).unwrap();
    vm.compile(source)
}

#[test]
fn duplicate_labels_resolve_to_the_first_definition() {
    let bytecode = compile(":l\nprinti #1\n:l\nprinti #2\njmp :l\n").unwrap();
    // :l resolves to address 0 (the first printi), not address 1.
    assert_eq!(bytecode.instrs[2].jump_target(), 0);
}

#[test]
fn duplicate_constants_resolve_to_the_first_definition() {
    let bytecode = compile(".k 1\n.k 2\nldci $a .k\n").unwrap();
    assert_eq!(bytecode.constants.len(), 1);
}

#[test]
fn unknown_label_reference_is_a_parse_error() {
    let err = compile("jmp :nowhere\n").unwrap_err();
    assert!(matches!(err, VmError::Parse { .. }));
}

#[test]
fn unknown_constant_reference_is_a_parse_error() {
    let err = compile("ldci $a .nowhere\n").unwrap_err();
    assert!(matches!(err, VmError::Parse { .. }));
}

#[test]
fn wrong_operand_count_is_a_parse_error() {
    let err = compile("movi $a\n").unwrap_err();
    assert!(matches!(err, VmError::Parse { .. }));
}

#[test]
fn immediate_outside_encodable_range_is_an_encode_error() {
    let err = compile("printi #99999999\n").unwrap_err();
    assert!(matches!(err, VmError::Encode { .. }));
}

#[test]
fn immediate_up_to_the_19_bit_ceiling_is_accepted() {
    // 400000 is above 2^18-1 but still below the field's 0x7FFFF ceiling,
    // so it must assemble even though it no longer decodes to itself.
    compile("movi $a #400000\n").unwrap();
    compile("movi $a #524287\n").unwrap();
}

#[test]
fn hex_and_binary_immediates_parse_correctly() {
    let bytecode = compile("printi #0xFF\nprinti #0b101\n").unwrap();
    assert_eq!(bytecode.instrs[0].arg2(), litavm_asm::Arg2::Immediate(255));
    assert_eq!(bytecode.instrs[1].arg2(), litavm_asm::Arg2::Immediate(5));
}

#[test]
fn string_constant_pool_layout_is_contiguous_and_nul_terminated() {
    let mut vm = Vm::new(VmConfig::default()).unwrap();
    let bytecode = vm.compile(".a \"hi\"\n.b \"yo\"\n").unwrap();
    assert_eq!(bytecode.constants.len(), 2);
    // "hi\0" = 3 bytes, so .b starts right after at address 3.
    assert_eq!(bytecode.constants[0], 0);
    assert_eq!(bytecode.constants[1], 3);
}

#[test]
fn float_literal_with_a_dot_is_stored_as_float32() {
    let mut vm = Vm::new(VmConfig::default()).unwrap();
    let bytecode = vm.compile(".f 2.5\nldcf $a .f\n").unwrap();
    assert_eq!(vm.ram.read_float(bytecode.constants[0]).unwrap(), 2.5);
}

#[test]
fn max_constants_is_enforced() {
    let mut source = String::new();
    for i in 0..=litavm::consts::MAX_CONSTANTS {
        source.push_str(&format!(".k{i} {i}\n"));
    }
    let err = compile(&source).unwrap_err();
    assert!(matches!(err, VmError::Parse { .. }));
}
