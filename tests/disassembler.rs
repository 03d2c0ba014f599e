//! End-to-end disassembler tests: a whole program disassembled and the
//! rendered text checked line by line.

use litavm::disassembler;
use litavm::{Vm, VmConfig};

fn disassemble(source: &str) -> Vec<String> {
    let mut vm = Vm::new(VmConfig::default()).unwrap();
    let bytecode = vm.compile(source).unwrap();
    disassembler::disassemble(&bytecode)
        .iter()
        .map(|line| line.to_string())
        .collect()
}

#[test]
fn sentinel_never_appears_in_the_rendering() {
    let lines = disassemble("printi #1\nret\n");
    assert_eq!(lines.len(), 2);
    assert!(!lines.iter().any(|l| l.contains("NOOP")));
}

#[test]
fn indices_are_sequential_starting_at_zero() {
    let lines = disassemble("printi #1\nprinti #2\nprinti #3\n");
    assert_eq!(lines[0], "0\tPRINTI #1");
    assert_eq!(lines[1], "1\tPRINTI #2");
    assert_eq!(lines[2], "2\tPRINTI #3");
}

#[test]
fn jmp_and_call_render_the_raw_target_not_a_label_name() {
    let lines = disassemble(":here\njmp :here\ncall :here\n");
    assert_eq!(lines[0], "0\tJMP 0");
    assert_eq!(lines[1], "1\tCALL 0");
}

#[test]
fn ldca_prints_a_ram_address_for_both_register_and_immediate_forms() {
    let mut vm = Vm::new(VmConfig::default()).unwrap();
    let bytecode = vm.compile(".text \"hi\"\nldca $a .text\n").unwrap();
    let rendered = disassembler::disassemble_to_string(&bytecode);
    assert_eq!(rendered, format!("0\tLDCA $a #{}", bytecode.constants[0]));
}

#[test]
fn address_mode_prefix_round_trips_through_the_assembler() {
    let source = "addi &$a #1\n";
    let rendered = disassemble(source);
    assert_eq!(rendered[0], "0\tADDI &$a #1");
}
