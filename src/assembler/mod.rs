//! The two-pass assembler: tokenise, lay out constants, resolve labels,
//! then encode instructions.
//!
//! `compile` is the only entry point client code needs; the submodules
//! are kept public so tests and the disassembler can exercise each pass
//! independently.

pub mod constants;
pub mod encode;
pub mod labels;
pub mod lexer;

use std::collections::HashMap;

use litavm_asm::Bytecode;

use crate::cpu::Cpu;
use crate::error::VmResult;
use crate::ram::Ram;

/// Tokenises, lays out constants into `ram` (setting `$h` on `cpu` as a
/// side effect), resolves labels, and encodes every instruction into a
/// [`Bytecode`].
///
/// `ram` and `cpu` must already exist; the VM owns both, created at
/// `vmInit`. The assembler only ever writes the constant pool into RAM it
/// doesn't own, and a watermark register on a CPU it doesn't own.
pub fn compile(source: &str, ram: &mut Ram, cpu: &mut Cpu) -> VmResult<Bytecode> {
    let lines = lexer::tokenize(source);
    let label_table = labels::parse_labels(&lines);
    let (resolved_constants, constant_addresses) = constants::parse_constants(&lines, ram, cpu)?;

    let constant_table: HashMap<String, usize> = resolved_constants
        .iter()
        .enumerate()
        .map(|(index, constant)| (constant.name.clone(), index))
        .collect();

    let instrs = encode::parse_instructions(&lines, &label_table, &constant_table)?;

    Ok(Bytecode::new(constant_addresses, instrs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_tiny_program() {
        let mut ram = Ram::new(256);
        let mut cpu = Cpu::new(256);
        let bytecode = compile("printi #11\n", &mut ram, &mut cpu).unwrap();
        assert_eq!(bytecode.length, 1);
        assert_eq!(bytecode.instrs.len(), 2);
    }

    #[test]
    fn one_instruction_per_bytecode_def_line_plus_sentinel() {
        let mut ram = Ram::new(256);
        let mut cpu = Cpu::new(256);
        let bytecode = compile(
            ".k 1\n:start\nmovi $a #1\nmovi $b #2\nret\n",
            &mut ram,
            &mut cpu,
        )
        .unwrap();
        assert_eq!(bytecode.length, 3);
        assert_eq!(bytecode.instrs.len(), 4);
    }
}
