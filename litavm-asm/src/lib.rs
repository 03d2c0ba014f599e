//! Instruction encoding and bytecode model for the `litavm` register
//! machine.
//!
//! This crate owns the bit-exact wire format (`Instruction`), the opcode
//! tag set (`Opcode`), the register naming table (`register`), and the
//! assembled-program container (`Bytecode`). It has no notion of RAM,
//! registers-as-storage, or execution: those live in the `litavm` crate,
//! which depends on this one the same way an interpreter depends on its
//! instruction set definition rather than the other way around.

#![warn(missing_docs)]

pub mod bytecode;
pub mod instruction;
pub mod opcode;
pub mod register;

pub use bytecode::Bytecode;
pub use instruction::{Arg2, Instruction, MAX_IMMEDIATE_VALUE, MAX_JUMP_TARGET, MAX_POOL_INDEX, MIN_IMMEDIATE_VALUE};
pub use opcode::{Arity, Opcode};
pub use register::{register_index, register_name, RegisterId, REGISTER_COUNT};
