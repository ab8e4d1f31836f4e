use std::fs::File;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use byteorder::WriteBytesExt;
use clap::Parser;
use util::Endian;

/// Assembles ARM64-subset source into a flat stream of little-endian words.
#[derive(Parser, Debug)]
#[command(name = "assemble", version, about)]
struct Cli {
    /// Assembly source file to read.
    source: PathBuf,

    /// Path to write the assembled word stream to.
    binary: PathBuf,

    /// Path to write an address/word/instruction listing to.
    listing: Option<PathBuf>,

    /// Raise the logger's effective level for this run.
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[derive(Debug)]
enum IoContext {
    ReadInput,
    WriteOutput,
}

#[derive(Debug)]
enum Error {
    Parse(arm64_asm::ParseError),
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
            Error::Parse(err) => write!(f, "assembly failed: {err}"),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

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
    let input_file = File::open(&cli.source)
        .map_err(|err| Error::Io(err, IoContext::ReadInput, cli.source.clone()))?;
    let mut source = String::new();
    BufReader::new(input_file)
        .read_to_string(&mut source)
        .map_err(|err| Error::Io(err, IoContext::ReadInput, cli.source.clone()))?;

    let assembled = arm64_asm::assemble(&source).map_err(Error::Parse)?;
    log::info!(
        "assembled {} words from {}",
        assembled.words.len(),
        cli.source.display()
    );

    write_words(&cli.binary, &assembled.words)
        .map_err(|err| Error::Io(err, IoContext::WriteOutput, cli.binary.clone()))?;

    if let Some(listing_path) = &cli.listing {
        write_listing(listing_path, &assembled.listing)
            .map_err(|err| Error::Io(err, IoContext::WriteOutput, listing_path.clone()))?;
    }

    Ok(())
}

fn write_words(path: &Path, words: &[u32]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for word in words {
        writer.write_u32::<Endian>(*word)?;
    }
    Ok(())
}

fn write_listing(path: &Path, listing: &[arm64_asm::Assembled]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "0000000000000000 <.data>:")?;
    for entry in listing {
        writeln!(
            writer,
            "{:4x}:\t{:08x} \t{}",
            entry.address, entry.word, entry.instruction
        )?;
    }
    Ok(())
}
