//! Top-level wiring: configuration, and the `Vm` that owns CPU + RAM across
//! the assemble/execute lifecycle.

use std::io::Write;

use litavm_asm::Bytecode;

use crate::cpu::Cpu;
use crate::error::{VmError, VmResult};
use crate::ram::Ram;
use crate::{assembler, consts, interpreter};

/// Sizing knobs for a [`Vm`], mirroring the CLI's `-r`/`-s` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Total RAM size in bytes.
    pub ram_size: usize,
    /// Stack size in bytes; only used to validate against `ram_size` at
    /// construction. The stack itself is just the downward-growing region
    /// below the initial `$sp`.
    pub stack_size: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            ram_size: consts::DEFAULT_RAM_SIZE,
            stack_size: consts::DEFAULT_STACK_SIZE,
        }
    }
}

impl VmConfig {
    /// Rejects a configuration where the stack would not fit in RAM.
    pub fn validate(&self) -> VmResult<()> {
        if self.stack_size > self.ram_size {
            return Err(VmError::Config {
                message: format!(
                    "stack size {} exceeds ram size {}",
                    self.stack_size, self.ram_size
                ),
            });
        }
        Ok(())
    }
}

/// Owns the register file and RAM buffer across assembly and execution.
///
/// Both are created in [`Vm::new`] and live for as long as the `Vm` does,
/// mirroring the source's `vmInit`/`vmFree` pairing. There is no separate
/// "unload" step; the `Vm` is simply dropped.
pub struct Vm {
    /// The register file.
    pub cpu: Cpu,
    /// The RAM buffer.
    pub ram: Ram,
}

impl Vm {
    /// Validates `config` and allocates a fresh CPU + RAM pair.
    pub fn new(config: VmConfig) -> VmResult<Self> {
        config.validate()?;
        Ok(Self {
            cpu: Cpu::new(config.ram_size),
            ram: Ram::new(config.ram_size),
        })
    }

    /// Assembles `source`, laying constants into this VM's RAM and
    /// setting `$h` as a side effect, and returns the encoded program.
    pub fn compile(&mut self, source: &str) -> VmResult<Bytecode> {
        assembler::compile(source, &mut self.ram, &mut self.cpu)
    }

    /// Runs `bytecode` to completion, writing `PRINT*` output to `out`.
    pub fn execute(&mut self, bytecode: &Bytecode, out: &mut dyn Write) -> VmResult<()> {
        interpreter::execute(&mut self.cpu, &mut self.ram, bytecode, out)
    }

    /// Convenience: assembles and runs `source` in one call, writing
    /// `PRINT*` output to `out`.
    pub fn assemble_and_run(&mut self, source: &str, out: &mut dyn Write) -> VmResult<()> {
        let bytecode = self.compile(source)?;
        self.execute(&bytecode, out)
    }
}
