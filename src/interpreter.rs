//! The decode/dispatch loop.
//!
//! `execute` fetches one [`Instruction`] at a time, decodes its mode bits
//! through [`Cpu`] + [`Ram`], performs the operation, and writes the
//! result back through the same mode semantics it read operands with.
//! `$pc.address` is updated once per fetch purely for observability. The
//! real instruction pointer is the `pc: usize` local variable that drives
//! dispatch; conflating the two would alias `$r`'s save/restore dance on
//! `CALL`/`RET`.

use std::io::Write;

use litavm_asm::instruction::Arg2;
use litavm_asm::{Bytecode, Instruction, Opcode};
use litavm_asm::register;

use crate::cpu::Cpu;
use crate::error::{VmError, VmResult};
use crate::ram::Ram;

fn access_address(cpu: &Cpu, reg: u8) -> usize {
    cpu.reg(reg).address()
}

fn get_arg1_i(cpu: &Cpu, ram: &Ram, instr: Instruction) -> VmResult<i32> {
    let (reg, address) = instr.arg1();
    if address {
        ram.read_int32(access_address(cpu, reg))
    } else {
        Ok(cpu.reg(reg).i_val())
    }
}

fn set_arg1_i(cpu: &mut Cpu, ram: &mut Ram, instr: Instruction, value: i32) -> VmResult<()> {
    let (reg, address) = instr.arg1();
    if address {
        ram.store_int32(access_address(cpu, reg), value)
    } else {
        cpu.reg_mut(reg).set_i_val(value);
        Ok(())
    }
}

fn get_arg1_f(cpu: &Cpu, ram: &Ram, instr: Instruction) -> VmResult<f32> {
    let (reg, address) = instr.arg1();
    if address {
        ram.read_float(access_address(cpu, reg))
    } else {
        Ok(cpu.reg(reg).f_val())
    }
}

fn set_arg1_f(cpu: &mut Cpu, ram: &mut Ram, instr: Instruction, value: f32) -> VmResult<()> {
    let (reg, address) = instr.arg1();
    if address {
        ram.store_float(access_address(cpu, reg), value)
    } else {
        cpu.reg_mut(reg).set_f_val(value);
        Ok(())
    }
}

fn get_arg1_b(cpu: &Cpu, ram: &Ram, instr: Instruction) -> VmResult<i8> {
    let (reg, address) = instr.arg1();
    if address {
        ram.read_int8(access_address(cpu, reg))
    } else {
        Ok(cpu.reg(reg).b_val())
    }
}

fn set_arg1_b(cpu: &mut Cpu, ram: &mut Ram, instr: Instruction, value: i8) -> VmResult<()> {
    let (reg, address) = instr.arg1();
    if address {
        ram.store_int8(access_address(cpu, reg), value)
    } else {
        cpu.reg_mut(reg).set_b_val(value);
        Ok(())
    }
}

fn get_arg2_i(cpu: &Cpu, ram: &Ram, bytecode: &Bytecode, instr: Instruction) -> VmResult<i32> {
    match instr.arg2() {
        Arg2::Register { index, address } => {
            if address {
                ram.read_int32(access_address(cpu, index))
            } else {
                Ok(cpu.reg(index).i_val())
            }
        }
        Arg2::Immediate(value) => Ok(value),
        Arg2::Pool(idx) => ram.read_int32(bytecode.constants[idx as usize]),
    }
}

fn get_arg2_f(cpu: &Cpu, ram: &Ram, bytecode: &Bytecode, instr: Instruction) -> VmResult<f32> {
    match instr.arg2() {
        Arg2::Register { index, address } => {
            if address {
                ram.read_float(access_address(cpu, index))
            } else {
                Ok(cpu.reg(index).f_val())
            }
        }
        Arg2::Immediate(value) => Ok(value as f32),
        Arg2::Pool(idx) => ram.read_float(bytecode.constants[idx as usize]),
    }
}

fn get_arg2_b(cpu: &Cpu, ram: &Ram, bytecode: &Bytecode, instr: Instruction) -> VmResult<i8> {
    match instr.arg2() {
        Arg2::Register { index, address } => {
            if address {
                ram.read_int8(access_address(cpu, index))
            } else {
                Ok(cpu.reg(index).b_val())
            }
        }
        Arg2::Immediate(value) => Ok(value as i8),
        Arg2::Pool(idx) => ram.read_int8(bytecode.constants[idx as usize]),
    }
}

/// Writes to the arg2 slot, used by `POP*` (destination operand). Only
/// the register form is a meaningful write target; immediate/pool modes
/// are accepted syntactically (the assembler doesn't special-case POP's
/// operand) but are no-ops at runtime.
fn set_arg2_i(cpu: &mut Cpu, ram: &mut Ram, instr: Instruction, value: i32) -> VmResult<()> {
    if let Arg2::Register { index, address } = instr.arg2() {
        if address {
            return ram.store_int32(access_address(cpu, index), value);
        }
        cpu.reg_mut(index).set_i_val(value);
    }
    Ok(())
}

fn set_arg2_f(cpu: &mut Cpu, ram: &mut Ram, instr: Instruction, value: f32) -> VmResult<()> {
    if let Arg2::Register { index, address } = instr.arg2() {
        if address {
            return ram.store_float(access_address(cpu, index), value);
        }
        cpu.reg_mut(index).set_f_val(value);
    }
    Ok(())
}

fn set_arg2_b(cpu: &mut Cpu, ram: &mut Ram, instr: Instruction, value: i8) -> VmResult<()> {
    if let Arg2::Register { index, address } = instr.arg2() {
        if address {
            return ram.store_int8(access_address(cpu, index), value);
        }
        cpu.reg_mut(index).set_b_val(value);
    }
    Ok(())
}

/// `LDC*`'s source read: pool index unless the immediate flag is set, in
/// which case the payload *is* the value (only meaningful for
/// `LDCI`/`LDCB`).
fn get_const_i(cpu: &Cpu, ram: &Ram, bytecode: &Bytecode, instr: Instruction) -> VmResult<i32> {
    get_arg2_i(cpu, ram, bytecode, instr)
}

fn get_const_b(cpu: &Cpu, ram: &Ram, bytecode: &Bytecode, instr: Instruction) -> VmResult<i8> {
    get_arg2_b(cpu, ram, bytecode, instr)
}

fn get_const_f(cpu: &Cpu, ram: &Ram, bytecode: &Bytecode, instr: Instruction) -> VmResult<f32> {
    get_arg2_f(cpu, ram, bytecode, instr)
}

/// `LDCA`'s source read: the RAM address the constant lives at, not its
/// value.
fn get_const_address(cpu: &Cpu, bytecode: &Bytecode, instr: Instruction) -> VmResult<usize> {
    match instr.arg2() {
        Arg2::Pool(idx) => Ok(bytecode.constants[idx as usize]),
        Arg2::Immediate(value) => Ok(value as usize),
        Arg2::Register { index, address } => {
            if address {
                Ok(access_address(cpu, index))
            } else {
                Ok(cpu.reg(index).address())
            }
        }
    }
}

/// One of the five arithmetic operations shared across the I/F/B widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

trait Arith: Copy {
    fn arith(self, rhs: Self, op: ArithOp, pc: usize) -> VmResult<Self>;
}

impl Arith for i32 {
    fn arith(self, rhs: Self, op: ArithOp, pc: usize) -> VmResult<Self> {
        Ok(match op {
            ArithOp::Add => self.wrapping_add(rhs),
            ArithOp::Sub => self.wrapping_sub(rhs),
            ArithOp::Mul => self.wrapping_mul(rhs),
            ArithOp::Div => {
                if rhs == 0 {
                    return Err(VmError::DivideByZero { pc });
                }
                self.wrapping_div(rhs)
            }
            ArithOp::Mod => {
                if rhs == 0 {
                    return Err(VmError::DivideByZero { pc });
                }
                self.wrapping_rem(rhs)
            }
        })
    }
}

impl Arith for i8 {
    fn arith(self, rhs: Self, op: ArithOp, pc: usize) -> VmResult<Self> {
        Ok(match op {
            ArithOp::Add => self.wrapping_add(rhs),
            ArithOp::Sub => self.wrapping_sub(rhs),
            ArithOp::Mul => self.wrapping_mul(rhs),
            ArithOp::Div => {
                if rhs == 0 {
                    return Err(VmError::DivideByZero { pc });
                }
                self.wrapping_div(rhs)
            }
            ArithOp::Mod => {
                if rhs == 0 {
                    return Err(VmError::DivideByZero { pc });
                }
                self.wrapping_rem(rhs)
            }
        })
    }
}

impl Arith for f32 {
    fn arith(self, rhs: Self, op: ArithOp, pc: usize) -> VmResult<Self> {
        Ok(match op {
            ArithOp::Add => self + rhs,
            ArithOp::Sub => self - rhs,
            ArithOp::Mul => self * rhs,
            ArithOp::Div => {
                if rhs == 0.0 {
                    return Err(VmError::DivideByZero { pc });
                }
                self / rhs
            }
            // MODF: truncate both operands to int32, modulo, cast back.
            ArithOp::Mod => {
                let lhs_i = self as i32;
                let rhs_i = rhs as i32;
                if rhs_i == 0 {
                    return Err(VmError::DivideByZero { pc });
                }
                (lhs_i % rhs_i) as f32
            }
        })
    }
}

/// Decrements `$sp` by `width` bytes for a `PUSH`/`DUP`, rejecting the
/// underflow that a plain `sp - width` would panic on once the stack has
/// grown past the bottom of RAM.
fn dec_sp(sp: usize, width: usize) -> VmResult<usize> {
    sp.checked_sub(width)
        .ok_or(VmError::AccessViolation { start: 0, end: width })
}

fn bit_shift_amount(value: i32) -> u32 {
    (value as u32) & 31
}

fn byte_shift_amount(value: i8) -> u32 {
    (value as u8 as u32) & 7
}

/// Drives the interpreter loop to completion, writing `PRINT*` output to
/// `out`.
pub fn execute(
    cpu: &mut Cpu,
    ram: &mut Ram,
    bytecode: &Bytecode,
    out: &mut dyn Write,
) -> VmResult<()> {
    let mut pc: usize = bytecode.pc;
    let end = bytecode.length;

    while pc < end {
        pc = step(cpu, ram, bytecode, out, pc)?;
    }

    Ok(())
}

/// Fetches, decodes and executes the instruction at `pc`, returning the
/// address of the next instruction to run.
#[tracing::instrument(name = "instruction", skip(cpu, ram, bytecode, out))]
fn step(
    cpu: &mut Cpu,
    ram: &mut Ram,
    bytecode: &Bytecode,
    out: &mut dyn Write,
    pc: usize,
) -> VmResult<usize> {
    let instr = bytecode.instrs[pc];
    cpu.reg_mut(register::PC).set_address(pc);
    let current_pc = pc;
    let mut pc = pc + 1;

    let opcode = instr
        .opcode()
        .ok_or_else(|| VmError::InvalidOpcode {
            pc: current_pc,
            byte: instr.raw_opcode(),
        })?;

    tracing::trace!(pc = current_pc, ?opcode, "instruction");

    match opcode {
            Opcode::Noop => {}
            Opcode::Jmp => {
                tracing::debug!(from = current_pc, target = instr.jump_target(), "jmp");
                pc = instr.jump_target() as usize;
            }
            Opcode::Call => {
                tracing::debug!(from = current_pc, target = instr.jump_target(), "call");
                cpu.reg_mut(register::R).set_address(pc);
                pc = instr.jump_target() as usize;
            }
            Opcode::Ret => {
                let target = cpu.reg(register::R).address();
                tracing::debug!(from = current_pc, target, "ret");
                pc = target;
            }

            Opcode::Movi => {
                let v = get_arg2_i(cpu, ram, bytecode, instr)?;
                set_arg1_i(cpu, ram, instr, v)?;
            }
            Opcode::Movf => {
                let v = get_arg2_f(cpu, ram, bytecode, instr)?;
                set_arg1_f(cpu, ram, instr, v)?;
            }
            Opcode::Movb => {
                let v = get_arg2_b(cpu, ram, bytecode, instr)?;
                set_arg1_b(cpu, ram, instr, v)?;
            }

            Opcode::Ldci => {
                let v = get_const_i(cpu, ram, bytecode, instr)?;
                set_arg1_i(cpu, ram, instr, v)?;
            }
            Opcode::Ldcf => {
                let v = get_const_f(cpu, ram, bytecode, instr)?;
                set_arg1_f(cpu, ram, instr, v)?;
            }
            Opcode::Ldcb => {
                let v = get_const_b(cpu, ram, bytecode, instr)?;
                set_arg1_b(cpu, ram, instr, v)?;
            }
            Opcode::Ldca => {
                let addr = get_const_address(cpu, bytecode, instr)?;
                set_arg1_i(cpu, ram, instr, addr as i32)?;
            }

            Opcode::Pushi => {
                let v = get_arg2_i(cpu, ram, bytecode, instr)?;
                let sp = dec_sp(cpu.reg(register::SP).address(), 4)?;
                ram.store_int32(sp, v)?;
                cpu.reg_mut(register::SP).set_address(sp);
            }
            Opcode::Pushf => {
                let v = get_arg2_f(cpu, ram, bytecode, instr)?;
                let sp = dec_sp(cpu.reg(register::SP).address(), 4)?;
                ram.store_float(sp, v)?;
                cpu.reg_mut(register::SP).set_address(sp);
            }
            Opcode::Pushb => {
                let v = get_arg2_b(cpu, ram, bytecode, instr)?;
                let sp = dec_sp(cpu.reg(register::SP).address(), 1)?;
                ram.store_int8(sp, v)?;
                cpu.reg_mut(register::SP).set_address(sp);
            }
            Opcode::Popi => {
                let sp = cpu.reg(register::SP).address();
                let v = ram.read_int32(sp)?;
                cpu.reg_mut(register::SP).set_address(sp + 4);
                set_arg2_i(cpu, ram, instr, v)?;
            }
            Opcode::Popf => {
                let sp = cpu.reg(register::SP).address();
                let v = ram.read_float(sp)?;
                cpu.reg_mut(register::SP).set_address(sp + 4);
                set_arg2_f(cpu, ram, instr, v)?;
            }
            Opcode::Popb => {
                let sp = cpu.reg(register::SP).address();
                let v = ram.read_int8(sp)?;
                cpu.reg_mut(register::SP).set_address(sp + 1);
                set_arg2_b(cpu, ram, instr, v)?;
            }
            Opcode::Dupi => {
                let sp = cpu.reg(register::SP).address();
                let v = ram.read_int32(sp)?;
                let new_sp = dec_sp(sp, 4)?;
                ram.store_int32(new_sp, v)?;
                cpu.reg_mut(register::SP).set_address(new_sp);
            }
            Opcode::Dupf => {
                let sp = cpu.reg(register::SP).address();
                let v = ram.read_float(sp)?;
                let new_sp = dec_sp(sp, 4)?;
                ram.store_float(new_sp, v)?;
                cpu.reg_mut(register::SP).set_address(new_sp);
            }
            Opcode::Dupb => {
                let sp = cpu.reg(register::SP).address();
                let v = ram.read_int8(sp)?;
                let new_sp = dec_sp(sp, 1)?;
                ram.store_int8(new_sp, v)?;
                cpu.reg_mut(register::SP).set_address(new_sp);
            }

            Opcode::Ifi => {
                let lhs = get_arg1_i(cpu, ram, instr)?;
                let rhs = get_arg2_i(cpu, ram, bytecode, instr)?;
                if lhs > rhs {
                    pc += 1;
                }
            }
            Opcode::Iff => {
                let lhs = get_arg1_f(cpu, ram, instr)?;
                let rhs = get_arg2_f(cpu, ram, bytecode, instr)?;
                if lhs > rhs {
                    pc += 1;
                }
            }
            Opcode::Ifb => {
                let lhs = get_arg1_b(cpu, ram, instr)?;
                let rhs = get_arg2_b(cpu, ram, bytecode, instr)?;
                if lhs > rhs {
                    pc += 1;
                }
            }
            Opcode::Ifei => {
                let lhs = get_arg1_i(cpu, ram, instr)?;
                let rhs = get_arg2_i(cpu, ram, bytecode, instr)?;
                if lhs >= rhs {
                    pc += 1;
                }
            }
            Opcode::Ifef => {
                let lhs = get_arg1_f(cpu, ram, instr)?;
                let rhs = get_arg2_f(cpu, ram, bytecode, instr)?;
                if lhs >= rhs {
                    pc += 1;
                }
            }
            Opcode::Ifeb => {
                let lhs = get_arg1_b(cpu, ram, instr)?;
                let rhs = get_arg2_b(cpu, ram, bytecode, instr)?;
                if lhs >= rhs {
                    pc += 1;
                }
            }

            Opcode::Printi => {
                let v = get_arg2_i(cpu, ram, bytecode, instr)?;
                let _ = write!(out, "{v}");
            }
            Opcode::Printf => {
                let v = get_arg2_f(cpu, ram, bytecode, instr)?;
                let _ = write!(out, "{v}");
            }
            Opcode::Printb => {
                let v = get_arg2_b(cpu, ram, bytecode, instr)?;
                let _ = write!(out, "{v}");
            }
            Opcode::Printc => {
                let v = get_arg2_b(cpu, ram, bytecode, instr)?;
                let _ = write!(out, "{}", v as u8 as char);
            }

            Opcode::Addi | Opcode::Subi | Opcode::Muli | Opcode::Divi | Opcode::Modi => {
                let op = arith_op_of(opcode);
                let lhs = get_arg1_i(cpu, ram, instr)?;
                let rhs = get_arg2_i(cpu, ram, bytecode, instr)?;
                let result = lhs.arith(rhs, op, current_pc)?;
                set_arg1_i(cpu, ram, instr, result)?;
            }
            Opcode::Addf | Opcode::Subf | Opcode::Mulf | Opcode::Divf | Opcode::Modf => {
                let op = arith_op_of(opcode);
                let lhs = get_arg1_f(cpu, ram, instr)?;
                let rhs = get_arg2_f(cpu, ram, bytecode, instr)?;
                let result = lhs.arith(rhs, op, current_pc)?;
                set_arg1_f(cpu, ram, instr, result)?;
            }
            Opcode::Addb | Opcode::Subb | Opcode::Mulb | Opcode::Divb | Opcode::Modb => {
                let op = arith_op_of(opcode);
                let lhs = get_arg1_b(cpu, ram, instr)?;
                let rhs = get_arg2_b(cpu, ram, bytecode, instr)?;
                let result = lhs.arith(rhs, op, current_pc)?;
                set_arg1_b(cpu, ram, instr, result)?;
            }

            Opcode::Ori => {
                let lhs = get_arg1_i(cpu, ram, instr)?;
                let rhs = get_arg2_i(cpu, ram, bytecode, instr)?;
                set_arg1_i(cpu, ram, instr, lhs | rhs)?;
            }
            Opcode::Orb => {
                let lhs = get_arg1_b(cpu, ram, instr)?;
                let rhs = get_arg2_b(cpu, ram, bytecode, instr)?;
                set_arg1_b(cpu, ram, instr, lhs | rhs)?;
            }
            Opcode::Andi => {
                let lhs = get_arg1_i(cpu, ram, instr)?;
                let rhs = get_arg2_i(cpu, ram, bytecode, instr)?;
                set_arg1_i(cpu, ram, instr, lhs & rhs)?;
            }
            Opcode::Andb => {
                let lhs = get_arg1_b(cpu, ram, instr)?;
                let rhs = get_arg2_b(cpu, ram, bytecode, instr)?;
                set_arg1_b(cpu, ram, instr, lhs & rhs)?;
            }
            Opcode::Xori => {
                let lhs = get_arg1_i(cpu, ram, instr)?;
                let rhs = get_arg2_i(cpu, ram, bytecode, instr)?;
                set_arg1_i(cpu, ram, instr, lhs ^ rhs)?;
            }
            Opcode::Xorb => {
                let lhs = get_arg1_b(cpu, ram, instr)?;
                let rhs = get_arg2_b(cpu, ram, bytecode, instr)?;
                set_arg1_b(cpu, ram, instr, lhs ^ rhs)?;
            }
            Opcode::Noti => {
                let rhs = get_arg2_i(cpu, ram, bytecode, instr)?;
                set_arg1_i(cpu, ram, instr, !rhs)?;
            }
            Opcode::Notb => {
                let rhs = get_arg2_b(cpu, ram, bytecode, instr)?;
                set_arg1_b(cpu, ram, instr, !rhs)?;
            }

            Opcode::Szrli => {
                let lhs = get_arg1_i(cpu, ram, instr)?;
                let shift = bit_shift_amount(get_arg2_i(cpu, ram, bytecode, instr)?);
                set_arg1_i(cpu, ram, instr, ((lhs as u32) >> shift) as i32)?;
            }
            Opcode::Szrlb => {
                let lhs = get_arg1_b(cpu, ram, instr)?;
                let shift = byte_shift_amount(get_arg2_b(cpu, ram, bytecode, instr)?);
                set_arg1_b(cpu, ram, instr, ((lhs as u8) >> shift) as i8)?;
            }
            Opcode::Srli => {
                let lhs = get_arg1_i(cpu, ram, instr)?;
                let shift = bit_shift_amount(get_arg2_i(cpu, ram, bytecode, instr)?);
                set_arg1_i(cpu, ram, instr, lhs >> shift)?;
            }
            Opcode::Srlb => {
                let lhs = get_arg1_b(cpu, ram, instr)?;
                let shift = byte_shift_amount(get_arg2_b(cpu, ram, bytecode, instr)?);
                set_arg1_b(cpu, ram, instr, lhs >> shift)?;
            }
            Opcode::Slli => {
                let lhs = get_arg1_i(cpu, ram, instr)?;
                let shift = bit_shift_amount(get_arg2_i(cpu, ram, bytecode, instr)?);
                set_arg1_i(cpu, ram, instr, lhs << shift)?;
            }
            Opcode::Sllb => {
                let lhs = get_arg1_b(cpu, ram, instr)?;
                let shift = byte_shift_amount(get_arg2_b(cpu, ram, bytecode, instr)?);
                set_arg1_b(cpu, ram, instr, lhs << shift)?;
            }
        }

    Ok(pc)
}

fn arith_op_of(opcode: Opcode) -> ArithOp {
    match opcode {
        Opcode::Addi | Opcode::Addf | Opcode::Addb => ArithOp::Add,
        Opcode::Subi | Opcode::Subf | Opcode::Subb => ArithOp::Sub,
        Opcode::Muli | Opcode::Mulf | Opcode::Mulb => ArithOp::Mul,
        Opcode::Divi | Opcode::Divf | Opcode::Divb => ArithOp::Div,
        Opcode::Modi | Opcode::Modf | Opcode::Modb => ArithOp::Mod,
        _ => unreachable!("arith_op_of called with a non-arithmetic opcode"),
    }
}
