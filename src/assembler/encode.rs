//! Turns tokenised `BytecodeDef` lines into encoded [`Instruction`]s,
//! resolving label and constant references along the way.

use std::collections::HashMap;
use std::str::FromStr;

use litavm_asm::instruction::{Arg2, MAX_IMMEDIATE_VALUE, MAX_JUMP_TARGET, MIN_IMMEDIATE_VALUE};
use litavm_asm::opcode::Arity;
use litavm_asm::register::register_index;
use litavm_asm::{Instruction, Opcode};

use super::labels::LabelTable;
use super::lexer::{LineKind, SourceLine};
use crate::error::{VmError, VmResult};

/// name -> pool index, built by the caller from [`super::constants::parse_constants`]'s output.
pub type ConstantTable = HashMap<String, usize>;

fn parse_error(line_no: usize, message: impl Into<String>) -> VmError {
    VmError::Parse {
        line: line_no,
        message: message.into(),
    }
}

fn parse_int_literal(token: &str) -> Option<i64> {
    if let Some(hex) = token.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = token.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()
    } else {
        token.parse::<i64>().ok()
    }
}

/// Parses a `#[0x|0b]digits` immediate token (the `#` already stripped),
/// enforcing the encodable range.
fn parse_immediate(token: &str, line_no: usize) -> VmResult<i32> {
    let value = parse_int_literal(token)
        .ok_or_else(|| parse_error(line_no, format!("bad immediate literal '{token}'")))?;
    if value > MAX_IMMEDIATE_VALUE as i64 || value < MIN_IMMEDIATE_VALUE as i64 {
        return Err(VmError::Encode {
            line: line_no,
            message: format!("immediate {value} exceeds the encodable 19-bit range"),
        });
    }
    Ok(value as i32)
}

/// Parses the sole operand of a `JMP`/`CALL`: either `:label` or `#imm`.
fn parse_jump_operand(
    token: &str,
    line_no: usize,
    labels: &LabelTable,
) -> VmResult<u32> {
    if let Some(name) = token.strip_prefix(':') {
        let target = *labels
            .get(name)
            .ok_or_else(|| parse_error(line_no, format!("unknown label '{name}'")))?;
        if target as u64 > MAX_JUMP_TARGET as u64 {
            return Err(VmError::Encode {
                line: line_no,
                message: format!("jump target {target} exceeds the encodable 24-bit range"),
            });
        }
        Ok(target as u32)
    } else if let Some(imm) = token.strip_prefix('#') {
        let value = parse_int_literal(imm)
            .ok_or_else(|| parse_error(line_no, format!("bad immediate literal '{imm}'")))?;
        if value < 0 || value as u64 > MAX_JUMP_TARGET as u64 {
            return Err(VmError::Encode {
                line: line_no,
                message: format!("jump target {value} exceeds the encodable 24-bit range"),
            });
        }
        Ok(value as u32)
    } else {
        Err(parse_error(
            line_no,
            format!("expected ':label' or '#imm' jump operand, got '{token}'"),
        ))
    }
}

/// Parses an arg1 slot: an optional `&` address-mode prefix followed by a
/// register name.
fn parse_arg1(token: &str, line_no: usize) -> VmResult<(u8, bool)> {
    let (address, reg_token) = match token.strip_prefix('&') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let index = register_index(reg_token)
        .ok_or_else(|| parse_error(line_no, format!("expected a register, got '{token}'")))?;
    Ok((index, address))
}

/// Parses an arg2 slot: `&reg`, bare `reg`, `:label`, `#imm` or `.const`.
fn parse_arg2(
    token: &str,
    line_no: usize,
    labels: &LabelTable,
    constants: &ConstantTable,
) -> VmResult<Arg2> {
    if let Some(rest) = token.strip_prefix('&') {
        if rest.starts_with(':') {
            return Err(parse_error(line_no, "'&:label' is not a valid operand"));
        }
        let index = register_index(rest)
            .ok_or_else(|| parse_error(line_no, format!("expected a register, got '{token}'")))?;
        return Ok(Arg2::Register {
            index,
            address: true,
        });
    }
    if let Some(name) = token.strip_prefix(':') {
        let target = *labels
            .get(name)
            .ok_or_else(|| parse_error(line_no, format!("unknown label '{name}'")))?;
        return Ok(Arg2::Immediate(target as i32));
    }
    if let Some(imm) = token.strip_prefix('#') {
        return Ok(Arg2::Immediate(parse_immediate(imm, line_no)?));
    }
    if let Some(name) = token.strip_prefix('.') {
        let index = *constants
            .get(name)
            .ok_or_else(|| parse_error(line_no, format!("unknown constant '{name}'")))?;
        return Ok(Arg2::Pool(index as u32));
    }
    if let Some(index) = register_index(token) {
        return Ok(Arg2::Register {
            index,
            address: false,
        });
    }
    Err(parse_error(
        line_no,
        format!("expected a register, label, immediate or constant, got '{token}'"),
    ))
}

/// Encodes every `BytecodeDef` line into an instruction, in source order,
/// then appends the terminating `NOOP` sentinel.
pub fn parse_instructions(
    lines: &[SourceLine],
    labels: &LabelTable,
    constants: &ConstantTable,
) -> VmResult<Vec<Instruction>> {
    let mut instrs = Vec::new();

    for line in lines {
        if line.kind != LineKind::BytecodeDef {
            continue;
        }
        let mnemonic = &line.tokens[0];
        let opcode = Opcode::from_str(mnemonic)
            .map_err(|_| parse_error(line.line_no, format!("unknown opcode '{mnemonic}'")))?;

        let operands = &line.tokens[1..];

        if opcode.is_jump_class() {
            if operands.len() != 1 {
                return Err(parse_error(
                    line.line_no,
                    format!("{mnemonic} expects exactly one operand, got {}", operands.len()),
                ));
            }
            let target = parse_jump_operand(&operands[0], line.line_no, labels)?;
            instrs.push(Instruction::jump(opcode, target));
            continue;
        }

        let expected = match opcode.arity() {
            Arity::Zero => 0,
            Arity::One => 1,
            Arity::Two => 2,
        };
        if operands.len() != expected {
            return Err(parse_error(
                line.line_no,
                format!(
                    "{mnemonic} expects {expected} operand(s), got {}",
                    operands.len()
                ),
            ));
        }

        let instr = match opcode.arity() {
            Arity::Zero => Instruction::nullary(opcode),
            Arity::One => {
                let arg2 = parse_arg2(&operands[0], line.line_no, labels, constants)?;
                Instruction::unary(opcode, arg2)
            }
            Arity::Two => {
                let (arg1_index, arg1_address) = parse_arg1(&operands[0], line.line_no)?;
                let arg2 = parse_arg2(&operands[1], line.line_no, labels, constants)?;
                Instruction::binary(opcode, arg1_index, arg1_address, arg2)
            }
        };
        instrs.push(instr);
    }

    instrs.push(Instruction::NOOP);
    Ok(instrs)
}
