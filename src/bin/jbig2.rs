//! Command-line front end for jbig2-rs: decode a JBIG2 stream to PBM
//! (portable bitmap), encode a PBM back to JBIG2, or print page metadata.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use jbig2_rs::{Bitmap, Encoder};

#[derive(Parser)]
#[command(name = "jbig2", about = "Decode, encode, and inspect JBIG2 streams")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a JBIG2 stream, writing each page as a PBM file.
    Decode {
        input: PathBuf,
        /// Output path. For multi-page streams, `%d` is replaced by the
        /// page number (0-based).
        output: PathBuf,
    },
    /// Encode a single PBM bitmap as a standalone JBIG2 stream.
    Encode {
        input: PathBuf,
        output: PathBuf,
        /// Omit the file header, emitting a bare segment stream suitable
        /// for embedding in PDF/TIFF containers.
        #[arg(long)]
        embedded: bool,
        /// Disable the TPGD row-copy compression shortcut.
        #[arg(long)]
        no_duplicate_line_removal: bool,
    },
    /// Print page count and per-page dimensions without writing output.
    Info { input: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("jbig2: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Decode { input, output } => decode(&input, &output),
        Command::Encode {
            input,
            output,
            embedded,
            no_duplicate_line_removal,
        } => encode(&input, &output, embedded, !no_duplicate_line_removal),
        Command::Info { input } => info(&input),
    }
}

fn decode(input: &PathBuf, output: &PathBuf) -> Result<(), String> {
    let data = fs::read(input).map_err(|e| format!("reading {}: {e}", input.display()))?;
    let document = jbig2_rs::decode_document(&data).map_err(|e| format!("decode: {e}"))?;
    if document.pages.is_empty() {
        return Err("stream contains no pages".to_string());
    }

    let template = output.to_string_lossy().into_owned();
    for (index, page) in document.pages.iter().enumerate() {
        let path = if document.pages.len() == 1 {
            output.clone()
        } else {
            PathBuf::from(template.replace("%d", &index.to_string()))
        };
        let pbm = write_pbm(&page.bitmap);
        fs::write(&path, pbm).map_err(|e| format!("writing {}: {e}", path.display()))?;
    }
    Ok(())
}

fn encode(
    input: &PathBuf,
    output: &PathBuf,
    embedded: bool,
    duplicate_line_removal: bool,
) -> Result<(), String> {
    let data = fs::read(input).map_err(|e| format!("reading {}: {e}", input.display()))?;
    let bitmap = read_pbm(&data)?;

    let mut encoder = Encoder::new(!embedded);
    encoder.add_page(&bitmap, duplicate_line_removal);
    let bytes = encoder.finish();
    fs::write(output, bytes).map_err(|e| format!("writing {}: {e}", output.display()))?;
    Ok(())
}

fn info(input: &PathBuf) -> Result<(), String> {
    let data = fs::read(input).map_err(|e| format!("reading {}: {e}", input.display()))?;
    let document = jbig2_rs::decode_document(&data).map_err(|e| format!("decode: {e}"))?;
    println!("{} page(s)", document.pages.len());
    for (index, page) in document.pages.iter().enumerate() {
        println!(
            "  page {index}: {}x{} ({} x {} dpi)",
            page.bitmap.width(),
            page.bitmap.height(),
            page.x_resolution,
            page.y_resolution
        );
    }
    Ok(())
}

/// Writes a binary (P4) PBM: JBIG2's packed MSB-first 1bpp raster already
/// matches PBM's raw bit layout, so this is a direct header-prepend.
fn write_pbm(bitmap: &Bitmap) -> Vec<u8> {
    let mut out = format!("P4\n{} {}\n", bitmap.width(), bitmap.height()).into_bytes();
    out.extend_from_slice(bitmap.raw());
    out
}

fn read_pbm(data: &[u8]) -> Result<Bitmap, String> {
    if !data.starts_with(b"P4") {
        return Err("expected a binary (P4) PBM file".to_string());
    }
    let mut fields = Vec::new();
    let mut pos = 2;
    while fields.len() < 2 {
        while pos < data.len() && data[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos < data.len() && data[pos] == b'#' {
            while pos < data.len() && data[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }
        let start = pos;
        while pos < data.len() && !data[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if start == pos {
            return Err("truncated PBM header".to_string());
        }
        let token = std::str::from_utf8(&data[start..pos]).map_err(|_| "invalid PBM header")?;
        fields.push(token.parse::<u32>().map_err(|_| "invalid PBM dimension")?);
    }
    pos += 1; // the single whitespace byte separating the header from pixel data
    let width = fields[0];
    let height = fields[1];
    let raw = data.get(pos..).ok_or("truncated PBM pixel data")?.to_vec();
    Bitmap::from_raw(width, height, raw).map_err(|e| format!("{e}"))
}
