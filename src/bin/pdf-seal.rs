//! PDF Seal CLI tool
//!
//! A command-line tool for stamping a seal image onto every PDF in a folder tree.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pdf_seal::config::{default_root, SealChoice, StampConfig};
use pdf_seal::pdf::{extract_metadata, Outcome, Stamper};
use pdf_seal::walk::process_tree_with;

/// PDF Seal - Stamp a translucent seal on every page of every PDF in a folder
#[derive(Parser)]
#[command(name = "pdf-seal")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Stamp every PDF under ./pdfs next to the executable, choosing the seal interactively
    pdf-seal stamp

    # Stamp a folder with the manufacturing seal, no final prompt
    pdf-seal stamp --root invoices --seal manufacturing --no-pause

    # Use a custom image, larger and more opaque
    pdf-seal stamp --image stamp.png --width 160 --height 160 --opacity 0.6

    # Show page sizes of a PDF
    pdf-seal info invoice.pdf")]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SealArg {
    Enterprise,
    Manufacturing,
}

impl From<SealArg> for SealChoice {
    fn from(arg: SealArg) -> Self {
        match arg {
            SealArg::Enterprise => SealChoice::Enterprise,
            SealArg::Manufacturing => SealChoice::Manufacturing,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Stamp every PDF under a folder, replacing each file in place
    Stamp {
        /// Folder to scan recursively (default: "pdfs" next to the executable)
        #[arg(long, env = "PDF_SEAL_ROOT")]
        root: Option<PathBuf>,

        /// Seal to apply; asked interactively when omitted
        #[arg(long, value_enum, env = "PDF_SEAL_SEAL")]
        seal: Option<SealArg>,

        /// Explicit seal image path (overrides --seal)
        #[arg(long, env = "PDF_SEAL_IMAGE")]
        image: Option<PathBuf>,

        /// Seal width in points
        #[arg(long, env = "PDF_SEAL_WIDTH", default_value_t = 120.0)]
        width: f32,

        /// Seal height in points
        #[arg(long, env = "PDF_SEAL_HEIGHT", default_value_t = 120.0)]
        height: f32,

        /// Horizontal offset from the page's left edge, in points
        #[arg(long, env = "PDF_SEAL_X", default_value_t = 450.0)]
        x: f32,

        /// Vertical offset from the page's bottom edge, in points
        #[arg(long, env = "PDF_SEAL_Y", default_value_t = 30.0)]
        y: f32,

        /// Seal opacity between 0 and 1
        #[arg(long, env = "PDF_SEAL_OPACITY", default_value_t = 0.40)]
        opacity: f32,

        /// Exit without waiting for Enter
        #[arg(long)]
        no_pause: bool,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (result, wait) = match cli.command {
        Commands::Stamp { root, seal, image, width, height, x, y, opacity, no_pause } => {
            (cmd_stamp(root, seal, image, width, height, x, y, opacity), !no_pause)
        }
        Commands::Info { input } => (cmd_info(&input), false),
    };

    // The error must be on screen before the console waits for Enter
    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }
    if wait {
        pause(exit_prompt(result.is_ok()));
    }
    if result.is_err() {
        process::exit(1);
    }
}

fn exit_prompt(succeeded: bool) -> &'static str {
    if succeeded {
        "\nProcessing complete. Press Enter to exit..."
    } else {
        "\nProcessing stopped. Press Enter to exit..."
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

/// Ask which seal to apply; anything unrecognised falls back to Enterprise
fn choose_seal() -> Result<SealChoice> {
    println!("\nSelect the seal you want to apply:");
    println!("Enter 1 for {} Seal", SealChoice::Enterprise.label());
    println!("Enter 2 for {} Seal", SealChoice::Manufacturing.label());
    print!("\nEnter 1 or 2: ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;

    Ok(match SealChoice::from_answer(&answer) {
        Some(choice) => {
            info!("{} seal selected.", choice.label());
            choice
        }
        None => {
            println!("Invalid choice. Defaulting to {} Seal.", SealChoice::Enterprise.label());
            warn!("Invalid seal selection. Defaulting to Enterprise seal.");
            SealChoice::Enterprise
        }
    })
}

fn pause(message: &str) {
    println!("{}", message);
    let mut line = String::new();
    let _ = io::stdin().lock().read_line(&mut line);
}

/// Stamp every PDF under the root folder
#[allow(clippy::too_many_arguments)]
fn cmd_stamp(
    root: Option<PathBuf>,
    seal: Option<SealArg>,
    image: Option<PathBuf>,
    width: f32,
    height: f32,
    x: f32,
    y: f32,
    opacity: f32,
) -> Result<()> {
    let image_path = match image {
        Some(path) => path,
        None => {
            let choice = match seal {
                Some(arg) => SealChoice::from(arg),
                None => choose_seal()?,
            };
            choice.resolve()?
        }
    };

    let config = StampConfig {
        image_path,
        width,
        height,
        offset_x: x,
        offset_y: y,
        opacity,
    };
    let root = root.unwrap_or_else(default_root);

    info!("PDF signing tool started.");
    info!("Using seal file: {}", config.image_path.display());
    info!("PDF scan folder: {}", root.display());

    let stamper = Stamper::new(config).context("Cannot start without a usable seal")?;

    let summary = process_tree_with(&root, &stamper, |path, outcome| match outcome {
        Outcome::Stamped { pages } => println!("==> Signed: {} ({} pages)", path.display(), pages),
        Outcome::Failed { kind, detail } => {
            println!("==> FAILED ({}): {}: {}", kind, path.display(), detail)
        }
    })
    .with_context(|| format!("Cannot scan folder {}", root.display()))?;

    if summary.is_empty() {
        println!("\nNo PDF files found under {}.", root.display());
    } else if summary.failed == 0 {
        println!("\nAll {} PDFs have been signed successfully.", summary.total);
    } else {
        println!(
            "\nSigned {} of {} PDFs; {} failed (see log above).",
            summary.succeeded, summary.total, summary.failed
        );
    }

    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: &Path) -> Result<()> {
    let metadata = extract_metadata(input)
        .with_context(|| format!("Cannot read {}", input.display()))?;

    println!("File: {}", input.display());
    println!("Version: {}", metadata.version);
    println!("Pages: {}", metadata.page_count);

    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(author) = metadata.author {
        println!("Author: {}", author);
    }

    for (i, page) in metadata.pages.iter().enumerate() {
        println!("  Page {}: {} x {} pt", i + 1, page.width, page.height);
    }

    Ok(())
}
