use std::fs::File;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

use arm64_core::processor::{Cpu, ExitReason, PState};
use arm64_core::{Memory, ProcessorError};
use clap::Parser;

/// Runs a raw little-endian word-stream binary on the ARM64-subset emulator.
#[derive(Parser, Debug)]
#[command(name = "emulate", version, about)]
struct Cli {
    /// Binary produced by `assemble`.
    binary: PathBuf,

    /// Path to write the CPU/memory dump to. Defaults to stdout.
    output: Option<PathBuf>,

    /// Bounds the number of fetch-decode-execute iterations.
    #[arg(long, value_name = "N")]
    budget: Option<u64>,
}

#[derive(Debug)]
enum IoContext {
    ReadInput,
    WriteOutput,
}

#[derive(Debug)]
enum Error {
    Processor(ProcessorError),
    Io(std::io::Error, IoContext, PathBuf),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err, context, path) => write!(
                f,
                "{} file \"{}\" failed: {}",
                match context {
                    IoContext::ReadInput => "reading input",
                    IoContext::WriteOutput => "writing output",
                },
                path.display(),
                err
            ),
            Error::Processor(err) => write!(f, "emulation failed: {err}"),
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Error> {
    let words = read_words(&cli.binary)
        .map_err(|err| Error::Io(err, IoContext::ReadInput, cli.binary.clone()))?;
    let memory = Memory::load_words(&words).map_err(|err| Error::Processor(err.into()))?;
    let mut cpu = Cpu::new(memory);

    let reason = cpu.run(cli.budget).map_err(Error::Processor)?;
    log::info!(
        "stopped after {} instructions: {:?}",
        cpu.instructions_executed,
        reason
    );

    match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .map_err(|err| Error::Io(err, IoContext::WriteOutput, path.clone()))?;
            dump(&mut BufWriter::new(file), &cpu, reason)
                .map_err(|err| Error::Io(err, IoContext::WriteOutput, path.clone()))?;
        }
        None => {
            dump(&mut std::io::stdout().lock(), &cpu, reason)
                .map_err(|err| Error::Io(err, IoContext::WriteOutput, PathBuf::from("<stdout>")))?;
        }
    }
    Ok(())
}

fn read_words(path: &std::path::Path) -> std::io::Result<Vec<u32>> {
    use byteorder::ReadBytesExt;
    let mut reader = BufReader::new(File::open(path)?);
    let mut words = Vec::new();
    loop {
        match reader.read_u32::<util::Endian>() {
            Ok(w) => words.push(w),
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(err),
        }
    }
    Ok(words)
}

fn dump(w: &mut impl Write, cpu: &Cpu, reason: ExitReason) -> std::io::Result<()> {
    for n in 0..31u8 {
        writeln!(w, "X{n:02}: 0x{:016x}", cpu.gpr(n))?;
    }
    writeln!(w, "PC: 0x{:016x}", cpu.pc)?;
    writeln!(w, "PSTATE: {}", pstate_string(&cpu.pstate))?;
    let _ = reason;
    for (addr, word) in cpu.memory.nonzero_words() {
        writeln!(w, "0x{addr:08x} : 0x{word:08x}")?;
    }
    Ok(())
}

fn pstate_string(p: &PState) -> String {
    let bit = |set: bool, c: char| if set { c } else { '-' };
    format!(
        "{}{}{}{}",
        bit(p.n, 'N'),
        bit(p.z, 'Z'),
        bit(p.c, 'C'),
        bit(p.v, 'V')
    )
}
