//! Reverses an assembled [`Bytecode`] back into readable text.
//!
//! One line per real instruction: `index   MNEMONIC operand...`, operands
//! rendered the way the assembler's own token grammar would have written
//! them (`&$reg`, `$reg`, `#imm`, `.const`-style addresses) so the output
//! reads like hand-written source, not a raw bit dump.

use std::fmt;

use litavm_asm::instruction::Arg2;
use litavm_asm::{register, Bytecode, Instruction, Opcode};

/// Formats arg1's register/address-mode slot, e.g. `$a` or `&$a`.
fn format_arg1(index: u8, address: bool) -> String {
    let name = register::register_name(index).unwrap_or("$?");
    if address {
        format!("&{name}")
    } else {
        name.to_string()
    }
}

/// Formats arg2 per its decoded mode. `bytecode` supplies the constant
/// pool's RAM addresses for the pool-index case.
fn format_arg2(arg2: Arg2, bytecode: &Bytecode) -> String {
    match arg2 {
        Arg2::Register { index, address } => format_arg1(index, address),
        Arg2::Immediate(value) => format!("#{value}"),
        Arg2::Pool(idx) => match bytecode.constants.get(idx as usize) {
            Some(addr) => format!("#{addr}"),
            None => format!("#<bad pool index {idx}>"),
        },
    }
}

/// `LDCI`/`LDCB`'s arg2 rendering: the immediate itself when the
/// immediate flag is set, otherwise the RAM address the pool index
/// resolves to.
fn format_ldc_int_or_byte(instr: Instruction, bytecode: &Bytecode) -> String {
    match instr.arg2() {
        Arg2::Immediate(value) => format!("#{value}"),
        other => format_arg2(other, bytecode),
    }
}

/// `LDCF`/`LDCA`'s arg2 rendering: always the constant's RAM address.
fn format_ldc_address_only(instr: Instruction, bytecode: &Bytecode) -> String {
    format_arg2(instr.arg2(), bytecode)
}

/// One disassembled instruction, ready to print.
#[derive(Debug, Clone)]
pub struct DisassembledLine {
    /// Instruction address (index into the instruction stream).
    pub index: usize,
    /// Upper-case mnemonic, or `"???"` for an opcode byte with no defined
    /// tag.
    pub mnemonic: String,
    /// Operand text, already formatted, space-joined.
    pub operands: String,
}

impl fmt::Display for DisassembledLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operands.is_empty() {
            write!(f, "{}\t{}", self.index, self.mnemonic)
        } else {
            write!(f, "{}\t{} {}", self.index, self.mnemonic, self.operands)
        }
    }
}

fn disassemble_one(index: usize, instr: Instruction, bytecode: &Bytecode) -> DisassembledLine {
    let Some(opcode) = instr.opcode() else {
        return DisassembledLine {
            index,
            mnemonic: "???".to_string(),
            operands: format!("{:#010x}", instr.raw()),
        };
    };

    if opcode.is_jump_class() {
        return DisassembledLine {
            index,
            mnemonic: opcode.to_string().to_uppercase(),
            operands: instr.jump_target().to_string(),
        };
    }

    let mnemonic = opcode.to_string().to_uppercase();
    let operands = match opcode {
        Opcode::Noop | Opcode::Ret => String::new(),
        Opcode::Pushi | Opcode::Pushf | Opcode::Pushb | Opcode::Popi | Opcode::Popf
        | Opcode::Popb | Opcode::Dupi | Opcode::Dupf | Opcode::Dupb | Opcode::Printi
        | Opcode::Printf | Opcode::Printb | Opcode::Printc => {
            format_arg2(instr.arg2(), bytecode)
        }
        Opcode::Ldci | Opcode::Ldcb => {
            let (reg, address) = instr.arg1();
            format!(
                "{} {}",
                format_arg1(reg, address),
                format_ldc_int_or_byte(instr, bytecode)
            )
        }
        Opcode::Ldcf | Opcode::Ldca => {
            let (reg, address) = instr.arg1();
            format!(
                "{} {}",
                format_arg1(reg, address),
                format_ldc_address_only(instr, bytecode)
            )
        }
        _ => {
            let (reg, address) = instr.arg1();
            format!(
                "{} {}",
                format_arg1(reg, address),
                format_arg2(instr.arg2(), bytecode)
            )
        }
    };

    DisassembledLine {
        index,
        mnemonic,
        operands,
    }
}

/// Disassembles every real (non-sentinel) instruction in `bytecode`.
pub fn disassemble(bytecode: &Bytecode) -> Vec<DisassembledLine> {
    bytecode
        .instructions()
        .iter()
        .enumerate()
        .map(|(index, &instr)| disassemble_one(index, instr, bytecode))
        .collect()
}

/// Convenience: renders [`disassemble`]'s output as a newline-joined
/// string, one line per instruction.
pub fn disassemble_to_string(bytecode: &Bytecode) -> String {
    disassemble(bytecode)
        .iter()
        .map(DisassembledLine::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler;
    use crate::cpu::Cpu;
    use crate::ram::Ram;

    fn compile(source: &str) -> Bytecode {
        let mut ram = Ram::new(256);
        let mut cpu = Cpu::new(256);
        assembler::compile(source, &mut ram, &mut cpu).unwrap()
    }

    #[test]
    fn renders_register_and_immediate_operands() {
        let bytecode = compile("movi $a #11\n");
        let lines = disassemble(&bytecode);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].mnemonic, "MOVI");
        assert_eq!(lines[0].operands, "$a #11");
    }

    #[test]
    fn address_mode_arg1_gets_ampersand_prefix() {
        let bytecode = compile("addi &$a #1\n");
        assert_eq!(disassemble(&bytecode)[0].operands, "&$a #1");
    }

    #[test]
    fn jmp_prints_raw_target() {
        let bytecode = compile(":here\njmp :here\n");
        let lines = disassemble(&bytecode);
        assert_eq!(lines[0].mnemonic, "JMP");
        assert_eq!(lines[0].operands, "0");
    }

    #[test]
    fn ldci_immediate_prints_the_immediate() {
        let bytecode = compile("ldci $a #5\n");
        assert_eq!(disassemble(&bytecode)[0].operands, "$a #5");
    }

    #[test]
    fn ldci_pool_index_prints_the_constant_address() {
        let bytecode = compile(".k 0xFF\nldci $a .k\n");
        let lines = disassemble(&bytecode);
        assert_eq!(lines[0].operands, format!("$a #{}", bytecode.constants[0]));
    }

    #[test]
    fn ldca_always_prints_the_constant_address() {
        let bytecode = compile(".text \"hi\"\nldca $a .text\n");
        let lines = disassemble(&bytecode);
        assert_eq!(lines[0].operands, format!("$a #{}", bytecode.constants[0]));
    }

    #[test]
    fn unknown_opcode_byte_prints_placeholder_mnemonic() {
        let mut ram = Ram::new(64);
        let mut cpu = Cpu::new(64);
        let mut bytecode = assembler::compile("noop\n", &mut ram, &mut cpu).unwrap();
        bytecode.instrs[0] = Instruction::from_raw(0xFC00_0000);
        assert_eq!(disassemble(&bytecode)[0].mnemonic, "???");
    }

    #[test]
    fn sentinel_is_not_included() {
        let bytecode = compile("ret\n");
        assert_eq!(disassemble(&bytecode).len(), 1);
    }
}
