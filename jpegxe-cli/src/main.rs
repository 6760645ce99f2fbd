//! Block conversion CLI for JPEG XE canonical raw event streams.
//!
//! `pack` chunks a canonical `.xe` stream into fixed-size blocks of event
//! words (`.bxe`); `unpack` reassembles the canonical stream. Both are
//! thin loops over the codec's public operations.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use jpegxe_core::header::REFERENCE_HEADER_BYTES;
use jpegxe_core::{decoder, encoder, FieldLayout};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::time::Instant;

/// Block conversion tools for the JPEG XE canonical raw event format.
#[derive(Parser, Debug)]
#[command(name = "jpegxe")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chunk a canonical .xe event stream into fixed-size blocks (.bxe).
    ///
    /// The canonical header is validated and stripped; each block is a
    /// little-endian u16 event count followed by that many event words.
    Pack {
        /// Input canonical .xe file path
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output .bxe block file path
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Number of events to read (0 = all)
        #[arg(short = 'n', long, default_value_t = 0)]
        max_events: u64,

        /// Events per block
        #[arg(short, long, default_value_t = 1024, value_parser = clap::value_parser!(u16).range(1..))]
        block_size: u16,
    },
    /// Reassemble a .bxe block file into a canonical .xe event stream.
    Unpack {
        /// Input .bxe block file path
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output canonical .xe file path
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },
}

fn progress(quiet: bool) -> ProgressBar {
    if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap(),
        );
        pb
    }
}

fn pack(
    input: &PathBuf,
    output: &PathBuf,
    max_events: u64,
    block_size: u16,
    quiet: bool,
) -> Result<()> {
    let layout = FieldLayout::reference();
    let pb = progress(quiet);
    let start_time = Instant::now();

    let mut reader = BufReader::new(
        File::open(input).with_context(|| format!("Cannot open input file {input:?}"))?,
    );
    if !decoder::validate_header(&mut reader).context("Failed to read stream header")? {
        bail!("{input:?} is not a canonical JPEG XE raw event stream");
    }

    let mut writer = BufWriter::new(
        File::create(output).with_context(|| format!("Cannot create output file {output:?}"))?,
    );

    pb.set_message(format!("Packing {:?}...", input.file_name().unwrap_or_default()));

    let mut block: Vec<u64> = Vec::with_capacity(block_size as usize);
    let mut total_events = 0u64;
    let mut total_blocks = 0u64;

    while let Some(word) = decoder::read_word(&mut reader, &layout).context("Failed to read event word")? {
        block.push(word);
        total_events += 1;

        if block.len() == block_size as usize {
            write_block(&mut writer, &block, &layout)?;
            block.clear();
            total_blocks += 1;
            pb.set_message(format!("{total_events} events in {total_blocks} blocks"));
        }
        if max_events > 0 && total_events >= max_events {
            break;
        }
    }
    if !block.is_empty() {
        write_block(&mut writer, &block, &layout)?;
        total_blocks += 1;
    }
    writer.flush().context("Failed to flush output")?;

    pb.finish_with_message(format!(
        "Done! Packed {} events into {} blocks in {:.2}s",
        total_events,
        total_blocks,
        start_time.elapsed().as_secs_f64()
    ));

    if !quiet {
        eprintln!();
        eprintln!("Summary:");
        eprintln!("  Input:        {input:?}");
        eprintln!("  Output:       {output:?}");
        eprintln!("  Events:       {total_events}");
        eprintln!("  Blocks:       {total_blocks}");
        eprintln!("  Block size:   {block_size}");
        eprintln!("  Duration:     {:.3}s", start_time.elapsed().as_secs_f64());
    }

    Ok(())
}

fn write_block<W: Write>(writer: &mut W, block: &[u64], layout: &FieldLayout) -> Result<()> {
    writer
        .write_all(&(block.len() as u16).to_le_bytes())
        .context("Failed to write block header")?;
    for &word in block {
        encoder::write_word(writer, layout, word).context("Failed to write event word")?;
    }
    Ok(())
}

fn unpack(input: &PathBuf, output: &PathBuf, quiet: bool) -> Result<()> {
    let layout = FieldLayout::reference();
    let pb = progress(quiet);
    let start_time = Instant::now();

    let mut reader = BufReader::new(
        File::open(input).with_context(|| format!("Cannot open input file {input:?}"))?,
    );
    let mut writer = BufWriter::new(
        File::create(output).with_context(|| format!("Cannot create output file {output:?}"))?,
    );

    pb.set_message(format!(
        "Unpacking {:?}...",
        input.file_name().unwrap_or_default()
    ));

    writer
        .write_all(&REFERENCE_HEADER_BYTES)
        .context("Failed to write stream header")?;

    let mut total_events = 0u64;
    let mut total_blocks = 0u64;

    loop {
        let mut count_bytes = [0u8; 2];
        match reader.read_exact(&mut count_bytes) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(err).context("Failed to read block header"),
        }
        let count = u16::from_le_bytes(count_bytes);

        for _ in 0..count {
            let word = decoder::read_word(&mut reader, &layout)
                .context("Failed to read event word")?
                .with_context(|| format!("Unexpected end of stream inside block {total_blocks}"))?;
            encoder::write_word(&mut writer, &layout, word).context("Failed to write event word")?;
            total_events += 1;
        }
        total_blocks += 1;
        pb.set_message(format!("{total_events} events from {total_blocks} blocks"));
    }
    writer.flush().context("Failed to flush output")?;

    pb.finish_with_message(format!(
        "Done! Reconstructed {} events from {} blocks in {:.2}s",
        total_events,
        total_blocks,
        start_time.elapsed().as_secs_f64()
    ));

    if !quiet {
        eprintln!();
        eprintln!("Summary:");
        eprintln!("  Input:        {input:?}");
        eprintln!("  Output:       {output:?}");
        eprintln!("  Events:       {total_events}");
        eprintln!("  Blocks:       {total_blocks}");
        eprintln!("  Duration:     {:.3}s", start_time.elapsed().as_secs_f64());
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    match &args.command {
        Command::Pack {
            input,
            output,
            max_events,
            block_size,
        } => pack(input, output, *max_events, *block_size, args.quiet),
        Command::Unpack { input, output } => unpack(input, output, args.quiet),
    }
}
