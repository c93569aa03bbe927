//! Command-line interface.
//!
//! One subcommand per tool; every operation takes exactly one input file
//! (the strip tool also accepts a directory, treated as a batch of
//! independent single-file operations).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "file_toolbox", version, about = "Local file utilities: image metadata inspection and stripping, PDF text extraction, public IP lookup")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show embedded metadata for an image file
    Inspect {
        /// Image file to analyze
        file: PathBuf,
        /// Emit the full record as JSON instead of the summary view
        #[arg(long)]
        json: bool,
    },
    /// Re-encode an image (or every image under a directory), discarding all
    /// embedded metadata
    Strip {
        /// Image file, or a directory to process recursively
        path: PathBuf,
        /// Target format (png, jpeg, webp); defaults to the input format
        #[arg(long)]
        format: Option<String>,
        /// Directory for cleaned files; defaults to next to each input
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Extract a PDF's text into a self-contained HTML document
    PdfToHtml {
        /// PDF file to convert
        file: PathBuf,
        /// Output file; defaults to the input name with an .html extension
        #[arg(long)]
        output: Option<PathBuf>,
        /// Page limit, 0 for all pages
        #[arg(long, default_value_t = 0)]
        max_pages: usize,
    },
    /// Look up the public IP address
    Ip,
    /// Run the HTTP service exposing the same tools
    Serve {
        /// Port override; defaults to the configured web_port
        #[arg(long)]
        port: Option<u16>,
    },
}
