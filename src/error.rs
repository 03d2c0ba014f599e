//! The VM's single error type.
//!
//! Every failure mode in the system (malformed source, an out-of-range
//! immediate, an out-of-bounds RAM access, a division by zero, a decoded
//! opcode with no defined tag, or a bad `VmConfig`) is a variant of
//! [`VmError`]. There is no recovery path: every error is fatal and the
//! caller (`litavm-cli`) turns it into a stderr message and a process exit
//! code via [`VmError::exit_code`].

use derive_more::Display;

/// Every way assembling or running a program can fail.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum VmError {
    /// A malformed line, unknown opcode/label/constant/register, wrong
    /// operand count, or bad number literal, caught while assembling.
    #[display(fmt = "line {line}: {message}")]
    Parse {
        /// 1-based source line number.
        line: usize,
        /// Human-readable description of what went wrong.
        message: String,
    },
    /// An immediate operand exceeded the encodable range.
    #[display(fmt = "line {line}: {message}")]
    Encode {
        /// 1-based source line number.
        line: usize,
        /// Human-readable description of what went wrong.
        message: String,
    },
    /// A RAM read or write fell outside `[0, ram_size)`.
    #[display(fmt = "Access violation: address range {start}..{end} is out of bounds")]
    AccessViolation {
        /// First byte of the attempted access.
        start: usize,
        /// One past the last byte of the attempted access.
        end: usize,
    },
    /// A `DIV*`/`MOD*` instruction's divisor was zero.
    #[display(fmt = "DivideByZero at instruction {pc}")]
    DivideByZero {
        /// Instruction index the division occurred at.
        pc: usize,
    },
    /// The opcode field decoded from an instruction word names no defined
    /// tag.
    #[display(fmt = "Invalid opcode {byte:#x} at instruction {pc}")]
    InvalidOpcode {
        /// Instruction index the bad opcode occurred at.
        pc: usize,
        /// The raw 6-bit opcode value.
        byte: u8,
    },
    /// `VmConfig::validate` rejected the configuration, e.g. a stack size
    /// larger than the RAM it would be carved out of.
    #[display(fmt = "Configuration error: {message}")]
    Config {
        /// Human-readable description of what is wrong with the config.
        message: String,
    },
}

impl std::error::Error for VmError {}

impl VmError {
    /// The process exit code `litavm-cli` should use for this error,
    /// per the CLI's documented exit-code table: `32` for assembly-time
    /// errors (bad source, bad immediate), `2` for everything that only
    /// surfaces once the program is actually running.
    pub const fn exit_code(&self) -> i32 {
        match self {
            VmError::Parse { .. } | VmError::Encode { .. } => 32,
            VmError::AccessViolation { .. }
            | VmError::DivideByZero { .. }
            | VmError::InvalidOpcode { .. }
            | VmError::Config { .. } => 2,
        }
    }
}

/// Shorthand used throughout the crate.
pub type VmResult<T> = Result<T, VmError>;
