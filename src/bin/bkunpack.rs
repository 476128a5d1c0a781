use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use bitknit2::decode;

#[derive(Parser, Debug)]
#[command(about = "Decompress a raw BitKnit2 payload", long_about = None)]
struct Args {
    /// Path to the compressed payload (little-endian 16-bit words).
    input: PathBuf,

    /// Where to write the decoded bytes.
    output: PathBuf,

    /// The uncompressed length in bytes, as carried by the enclosing
    /// container.
    #[arg(long)]
    raw_len: usize,
}

pub fn main() -> Result<()> {
    let args = Args::parse();

    stderrlog::new()
        .verbosity(2)
        .timestamp(stderrlog::Timestamp::Second)
        .init()
        .unwrap();

    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    if bytes.len() % 2 != 0 {
        bail!("compressed payload must be a whole number of 16-bit words");
    }
    let words: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    let payload = decode(&words, args.raw_len)
        .with_context(|| format!("decoding {}", args.input.display()))?;
    std::fs::write(&args.output, &payload)
        .with_context(|| format!("writing {}", args.output.display()))?;

    info!(
        "decompressed {} words into {} bytes",
        words.len(),
        payload.len()
    );
    Ok(())
}
