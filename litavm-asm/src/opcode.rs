//! The opcode tag set and the arity table the assembler and interpreter both
//! consult.

use strum::{Display, EnumString};

/// Number of operands an instruction expects, excluding the jump-class
/// carve-out (`JMP`/`CALL`), which always encodes its single target directly
/// into the low 24 bits instead of through the arg1/arg2 slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// No operands, e.g. `NOOP`, `RET`.
    Zero,
    /// One operand, carried in the arg2 slot, e.g. `PUSHI`, `PRINTC`.
    One,
    /// Two operands: arg1 is the destination/lhs, arg2 the source/rhs.
    Two,
}

/// One of the 59 instruction tags the VM understands.
///
/// `#[repr(u8)]` discriminants are the 6-bit values packed into bits 31..26
/// of an encoded instruction (see [`crate::instruction::Instruction`]).
/// `EnumString`/`Display` (case-insensitive on the string side) give the
/// assembler and disassembler their mnemonic <-> tag mapping for free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
#[repr(u8)]
pub enum Opcode {
    Noop = 0,
    Jmp,
    Call,
    Ret,

    Movi,
    Movf,
    Movb,

    Ldci,
    Ldcf,
    Ldcb,
    Ldca,

    Pushi,
    Pushf,
    Pushb,
    Popi,
    Popf,
    Popb,
    Dupi,
    Dupf,
    Dupb,

    Ifi,
    Iff,
    Ifb,
    Ifei,
    Ifef,
    Ifeb,

    Printi,
    Printf,
    Printb,
    Printc,

    Addi,
    Addf,
    Addb,
    Subi,
    Subf,
    Subb,
    Muli,
    Mulf,
    Mulb,
    Divi,
    Divf,
    Divb,
    Modi,
    Modf,
    Modb,

    Ori,
    Orb,
    Andi,
    Andb,
    Xori,
    Xorb,
    Noti,
    Notb,

    Szrli,
    Szrlb,
    Srli,
    Srlb,
    Slli,
    Sllb,
}

impl Opcode {
    /// Highest discriminant currently assigned; the instruction format
    /// reserves 6 bits, so this must stay below 64.
    pub const MAX: u8 = Self::Sllb as u8;

    /// Decodes an opcode from the 6-bit field of an instruction word.
    ///
    /// Returns `None` when `byte` doesn't match any defined tag, which the
    /// interpreter surfaces as an invalid-opcode runtime error.
    pub fn from_u8(byte: u8) -> Option<Self> {
        use Opcode::*;
        const TABLE: &[Opcode] = &[
            Noop, Jmp, Call, Ret, Movi, Movf, Movb, Ldci, Ldcf, Ldcb, Ldca, Pushi, Pushf, Pushb,
            Popi, Popf, Popb, Dupi, Dupf, Dupb, Ifi, Iff, Ifb, Ifei, Ifef, Ifeb, Printi, Printf,
            Printb, Printc, Addi, Addf, Addb, Subi, Subf, Subb, Muli, Mulf, Mulb, Divi, Divf,
            Divb, Modi, Modf, Modb, Ori, Orb, Andi, Andb, Xori, Xorb, Noti, Notb, Szrli, Szrlb,
            Srli, Srlb, Slli, Sllb,
        ];
        TABLE.get(byte as usize).copied()
    }

    /// Whether this opcode is `JMP` or `CALL`, the two opcodes that bypass
    /// the arg1/arg2 slots entirely and pack their target into the low 24
    /// bits of the word.
    pub const fn is_jump_class(self) -> bool {
        matches!(self, Opcode::Jmp | Opcode::Call)
    }

    /// The number of source-level operands this mnemonic takes.
    ///
    /// `LDC{I,F,B,A}` take two tokens (destination register, source) even
    /// though only one value is transferred at runtime; they're arity-two
    /// like `MOV*` for parsing purposes.
    pub const fn arity(self) -> Arity {
        use Opcode::*;
        match self {
            Noop | Ret => Arity::Zero,
            Jmp | Call => Arity::One,
            Pushi | Pushf | Pushb | Popi | Popf | Popb | Dupi | Dupf | Dupb | Printi | Printf
            | Printb | Printc => Arity::One,
            Movi | Movf | Movb | Ldci | Ldcf | Ldcb | Ldca | Ifi | Iff | Ifb | Ifei | Ifef
            | Ifeb | Addi | Addf | Addb | Subi | Subf | Subb | Muli | Mulf | Mulb | Divi | Divf
            | Divb | Modi | Modf | Modb | Ori | Orb | Andi | Andb | Xori | Xorb | Noti | Notb
            | Szrli | Szrlb | Srli | Srlb | Slli | Sllb => Arity::Two,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    #[case("movi", Opcode::Movi)]
    #[case("MOVI", Opcode::Movi)]
    #[case("LdcA", Opcode::Ldca)]
    #[case("ret", Opcode::Ret)]
    fn parses_mnemonics_case_insensitively(#[case] text: &str, #[case] expected: Opcode) {
        assert_eq!(Opcode::from_str(text).unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_mnemonic() {
        assert!(Opcode::from_str("bogus").is_err());
    }

    #[test]
    fn every_discriminant_round_trips_through_from_u8() {
        for byte in 0..=Opcode::MAX {
            assert_eq!(Opcode::from_u8(byte).map(|op| op as u8), Some(byte));
        }
        assert_eq!(Opcode::from_u8(Opcode::MAX + 1), None);
    }

    #[test]
    fn max_discriminant_fits_in_six_bits() {
        assert!(Opcode::MAX < 64);
    }

    #[test]
    fn jump_class_is_exactly_jmp_and_call() {
        assert!(Opcode::Jmp.is_jump_class());
        assert!(Opcode::Call.is_jump_class());
        assert!(!Opcode::Ret.is_jump_class());
        assert!(!Opcode::Movi.is_jump_class());
    }
}
