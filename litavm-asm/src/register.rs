//! The register file's fixed naming table.
//!
//! Shared by the assembler (token -> index, for parsing `$a`, `&$sp`, ...)
//! and the interpreter (index -> cell, for `regs[reg]`), so both sides agree
//! on the same twelve slots without the table being duplicated.

/// Number of registers in the CPU's register file.
pub const REGISTER_COUNT: usize = 12;

/// Zero-based index of a register in the register file.
pub type RegisterId = u8;

macro_rules! registers {
    ($($index:literal => $konst:ident, $name:literal;)*) => {
        $(
            #[doc = concat!("Index of the `", $name, "` register.")]
            pub const $konst: RegisterId = $index;
        )*

        /// Looks up a register index by name, case-insensitively.
        ///
        /// Accepts the name with or without its leading `$` (the assembler
        /// always passes it with the sigil already stripped by the caller).
        /// Returns `None` when `name` does not name a register, which the
        /// assembler uses to tell a register token apart from a label or
        /// constant reference.
        pub fn register_index(name: &str) -> Option<RegisterId> {
            let name = name.strip_prefix('$').unwrap_or(name);
            match name.to_ascii_lowercase().as_str() {
                $($name => Some($index),)*
                _ => None,
            }
        }

        /// Returns the canonical `$name` for a register index, if any.
        pub fn register_name(index: RegisterId) -> Option<&'static str> {
            match index {
                $($index => Some(concat!("$", $name)),)*
                _ => None,
            }
        }
    };
}

registers! {
    0  => SP, "sp";
    1  => PC, "pc";
    2  => R,  "r";
    3  => H,  "h";
    4  => A,  "a";
    5  => B,  "b";
    6  => C,  "c";
    7  => D,  "d";
    8  => I,  "i";
    9  => J,  "j";
    10 => K,  "k";
    11 => U,  "u";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_known_registers_case_insensitively() {
        assert_eq!(register_index("$sp"), Some(SP));
        assert_eq!(register_index("SP"), Some(SP));
        assert_eq!(register_index("$U"), Some(U));
        assert_eq!(register_index("$a"), Some(A));
    }

    #[test]
    fn rejects_non_register_tokens() {
        assert_eq!(register_index("label"), None);
        assert_eq!(register_index(".const"), None);
        assert_eq!(register_index("$z"), None);
    }

    #[test]
    fn round_trips_name_and_index() {
        for idx in 0..REGISTER_COUNT as RegisterId {
            let name = register_name(idx).expect("every slot has a name");
            assert_eq!(register_index(name), Some(idx));
        }
    }
}
