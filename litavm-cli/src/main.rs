//! Command-line front-end: `litavm [options] file`.
//!
//! Argument parsing is a hand-rolled scan over `std::env::args()`, not a
//! dedicated crate. Usage text and flag ergonomics are explicitly out of
//! scope, so there's nothing here a parsing crate would pull its weight
//! on.

use std::fmt::Write as _;
use std::process::ExitCode;

use litavm::{Vm, VmConfig};

const USAGE: &str = "usage: litavm [-d|--disassembly] [-s|--stack-size N] [-r|--ram N] <file>";

struct Args {
    disassembly: bool,
    ram_size: usize,
    stack_size: usize,
    file: Option<String>,
}

fn parse_args(argv: impl Iterator<Item = String>) -> Result<Args, String> {
    let defaults = VmConfig::default();
    let mut args = Args {
        disassembly: false,
        ram_size: defaults.ram_size,
        stack_size: defaults.stack_size,
        file: None,
    };

    let mut iter = argv.peekable();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-d" | "--disassembly" => args.disassembly = true,
            "-s" | "--stack-size" => {
                let value = iter.next().ok_or("missing value for --stack-size")?;
                args.stack_size = value
                    .parse()
                    .map_err(|_| format!("invalid --stack-size value '{value}'"))?;
            }
            "-r" | "--ram" => {
                let value = iter.next().ok_or("missing value for --ram")?;
                args.ram_size = value
                    .parse()
                    .map_err(|_| format!("invalid --ram value '{value}'"))?;
            }
            other if args.file.is_none() => args.file = Some(other.to_string()),
            other => return Err(format!("unexpected argument '{other}'")),
        }
    }

    Ok(args)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("{USAGE}");
            return ExitCode::from(32);
        }
    };

    let Some(path) = args.file else {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    };

    run(&path, args.disassembly, args.ram_size, args.stack_size)
}

fn run(path: &str, disassembly: bool, ram_size: usize, stack_size: usize) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("litavm: could not read '{path}': {err}");
            return ExitCode::from(2);
        }
    };

    let mut vm = match Vm::new(VmConfig {
        ram_size,
        stack_size,
    }) {
        Ok(vm) => vm,
        Err(err) => return fail(&err),
    };

    let bytecode = match vm.compile(&source) {
        Ok(bytecode) => bytecode,
        Err(err) => return fail(&err),
    };

    if disassembly {
        let mut rendered = String::new();
        for line in litavm::disassembler::disassemble(&bytecode) {
            let _ = writeln!(rendered, "{line}");
        }
        print!("{rendered}");
    }

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    match vm.execute(&bytecode, &mut handle) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => fail(&err),
    }
}

fn fail(err: &litavm::VmError) -> ExitCode {
    eprintln!("litavm: {err}");
    ExitCode::from(err.exit_code() as u8)
}
