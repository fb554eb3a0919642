//! Zodiac - Instruction Stream Tool
//!
//! Main CLI entry point for assembling, disassembling and inspecting
//! instruction streams.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zodiac::config::ZodiacConfig;
use zodiac::ir::{
    Assembler, Disassembler, InstructionReader, InstructionSource, IoSource, MemorySource, Offset,
    ReadError, SeekMode, HEADER_SIZE, INVALID_OFFSET,
};
use zodiac::logger::{set_runtime_logger, LogLevel, Logger, StderrSink};
use zodiac::{rt_debug, rt_info};

#[derive(Parser)]
#[command(name = "zodiac")]
#[command(version)]
#[command(about = "Assemble, disassemble and inspect instruction streams", long_about = None)]
struct Cli {
    /// Configuration file (default: nearest zodiac.toml above the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a text source file to a binary stream
    Asm {
        /// Input file (use - for stdin)
        #[arg(default_value = "-")]
        input: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output as hex instead of binary
        #[arg(long)]
        hex: bool,
    },

    /// Disassemble a binary stream to text
    Dis {
        /// Input stream
        input: PathBuf,

        /// Show raw header bytes
        #[arg(long)]
        bytes: bool,

        /// Omit stream offsets
        #[arg(long)]
        no_offsets: bool,

        /// Start at this byte offset (negative values count from the end)
        #[arg(long, allow_hyphen_values = true)]
        from: Option<i64>,

        /// Input is hex text rather than binary
        #[arg(long)]
        hex_input: bool,

        /// Maximum instructions to print (overrides the config file)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Summarize a binary stream
    Stat {
        /// Input stream
        input: PathBuf,

        /// Input is hex text rather than binary
        #[arg(long)]
        hex_input: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ZodiacConfig::load(path).context("Failed to load config")?,
        None => ZodiacConfig::load_from_cwd().context("Failed to load config")?,
    };

    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        config.logging.level()?
    };
    set_runtime_logger(Logger::new(Arc::new(StderrSink)).with_min_level(level));

    match cli.command {
        Commands::Asm { input, output, hex } => cmd_asm(&input, output.as_deref(), hex),
        Commands::Dis {
            input,
            bytes,
            no_offsets,
            from,
            hex_input,
            limit,
        } => {
            let disasm = Disassembler::new()
                .with_bytes(bytes || config.disasm.show_bytes)
                .with_offsets(!no_offsets && config.disasm.show_offsets)
                .with_limit(limit.or(config.reader.limit()));
            if hex_input {
                let reader = InstructionReader::new(MemorySource::new(read_hex(&input)?));
                cmd_dis(reader, &disasm, from)
            } else {
                let source = IoSource::open(&input)
                    .with_context(|| format!("Failed to open {}", input.display()))?;
                cmd_dis(InstructionReader::new(source), &disasm, from)
            }
        }
        Commands::Stat { input, hex_input } => {
            let limit = config.reader.limit();
            if hex_input {
                let reader = InstructionReader::new(MemorySource::new(read_hex(&input)?));
                cmd_stat(reader, limit)
            } else {
                let source = IoSource::open(&input)
                    .with_context(|| format!("Failed to open {}", input.display()))?;
                cmd_stat(InstructionReader::new(source), limit)
            }
        }
    }
}

fn cmd_asm(input: &str, output: Option<&Path>, hex: bool) -> Result<()> {
    let source = if input == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(input).context("Failed to read input")?
    };

    let mut asm = Assembler::new();
    let bytes = asm.assemble_bytes(&source).context("Assembly failed")?;

    eprintln!(
        "Assembled {} instructions ({} bytes)",
        asm.instruction_count(),
        bytes.len()
    );

    if let Some(output) = output {
        if hex {
            fs::write(output, hex::encode(&bytes))?;
        } else {
            fs::write(output, &bytes)?;
        }
        eprintln!("Wrote {} bytes to {}", bytes.len(), output.display());
    } else if hex {
        println!("{}", hex::encode(&bytes));
    } else {
        io::stdout().write_all(&bytes)?;
    }

    Ok(())
}

fn cmd_dis<S: InstructionSource>(
    mut reader: InstructionReader<S>,
    disasm: &Disassembler,
    from: Option<i64>,
) -> Result<()> {
    if let Some(offset) = from {
        let mode = if offset < 0 {
            SeekMode::End
        } else {
            SeekMode::Start
        };
        let position = reader.seek(offset, mode).context("Seek failed")?;
        rt_debug!("Starting disassembly at offset {}", position);
    }

    let mut text = String::new();
    let result = disasm.disassemble_to(&mut reader, &mut text);
    print!("{}", text);
    io::stdout().flush()?;

    let count = match result {
        Ok(count) => count,
        Err(e) => {
            let at = damaged_record_offset(&mut reader, &e);
            return Err(anyhow::Error::new(e).context(format!("Stream damaged at offset {}", at)));
        }
    };
    rt_info!("Disassembled {} instructions", count);
    Ok(())
}

fn cmd_stat<S: InstructionSource>(mut reader: InstructionReader<S>, limit: Option<usize>) -> Result<()> {
    let mut count = 0usize;
    let mut operand_bytes = 0usize;
    let mut per_controller: BTreeMap<u8, usize> = BTreeMap::new();
    let mut damaged = None;

    while !limit.is_some_and(|limit| count >= limit) {
        match reader.located().next() {
            Some(Ok(located)) => {
                count += 1;
                operand_bytes += located.instruction.operand_count();
                *per_controller
                    .entry(located.instruction.controller_index())
                    .or_insert(0) += 1;
            }
            Some(Err(e)) => {
                damaged = Some(e);
                break;
            }
            None => break,
        }
    }
    if damaged.is_none() && limit == Some(count) {
        rt_info!("Stopped after {} instructions", count);
    }

    println!("Instructions:   {}", count);
    println!("Operand bytes:  {}", operand_bytes);
    println!("Stream bytes:   {}", count * HEADER_SIZE + operand_bytes);
    if !per_controller.is_empty() {
        println!("By controller:");
        for (controller, n) in &per_controller {
            println!("  {:>3}: {}", controller, n);
        }
    }

    if let Some(e) = damaged {
        let at = damaged_record_offset(&mut reader, &e);
        bail!("Record at offset {} is damaged: {}", at, e);
    }
    Ok(())
}

/// Start offset of the record a failed read was decoding
fn damaged_record_offset<S: InstructionSource>(
    reader: &mut InstructionReader<S>,
    e: &ReadError,
) -> Offset {
    let position = reader.tell();
    if position == INVALID_OFFSET {
        return position;
    }
    position - e.consumed() as Offset
}

/// Read a file of hex text (whitespace ignored) into bytes
fn read_hex(path: &Path) -> Result<Vec<u8>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let digits: String = text.split_whitespace().collect();
    hex::decode(digits).context("Invalid hex input")
}
