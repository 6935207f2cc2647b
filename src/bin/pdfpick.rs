use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use pdfpick_to_csv::{
    ColumnSchema, ExportOptions, ExportReport, FileStore, Session, read_page_fragments,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "pdfpick",
    version,
    about = "Inspect PDF text fragments and export picked tables to CSV"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List one page's text fragments in reading order with their indices.
    Fragments(FragmentsArgs),
    /// Resolve a click coordinate to the nearest fragment.
    Nearest(NearestArgs),
    /// Export a saved picking session to CSV.
    Export(ExportArgs),
}

#[derive(Debug, Args)]
struct FragmentsArgs {
    /// Input PDF path.
    #[arg(short, long)]
    input: PathBuf,

    /// Page number (1-based).
    #[arg(short, long, default_value_t = 1)]
    page: u32,

    /// Print at most this many fragments.
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Debug, Args)]
struct NearestArgs {
    /// Input PDF path.
    #[arg(short, long)]
    input: PathBuf,

    /// Page number (1-based).
    #[arg(short, long, default_value_t = 1)]
    page: u32,

    /// Click x in rendered pixels.
    #[arg(short, long)]
    x: f32,

    /// Click y in rendered pixels (downwards from the page top).
    #[arg(short, long)]
    y: f32,

    /// Render scale the click coordinates were measured at.
    #[arg(long, default_value_t = 1.0)]
    scale: f32,
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// Session storage directory (where the tool autosaves).
    #[arg(short, long)]
    store: PathBuf,

    /// Output CSV path.
    #[arg(short, long)]
    output: PathBuf,

    /// Override the column schema as a comma-separated list.
    #[arg(long)]
    columns: Option<String>,

    /// Output delimiter character.
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Enable verbose warning output.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_schema(columns: Option<&str>) -> Result<ColumnSchema> {
    match columns {
        Some(spec) => ColumnSchema::from_str(spec)
            .map_err(|error| anyhow!("invalid --columns: {error}")),
        None => Ok(ColumnSchema::default()),
    }
}

fn run_fragments(args: &FragmentsArgs) -> Result<usize> {
    let index = read_page_fragments(&args.input, args.page)
        .with_context(|| format!("failed to read '{}'", args.input.display()))?;

    let limit = args.limit.unwrap_or(usize::MAX);
    for fragment in index.fragments().iter().take(limit) {
        println!(
            "{}\t({:.1}, {:.1})\t{}",
            fragment.index, fragment.position_x, fragment.position_y, fragment.str
        );
    }
    Ok(index.len())
}

fn run_nearest(args: &NearestArgs) -> Result<bool> {
    let index = read_page_fragments(&args.input, args.page)
        .with_context(|| format!("failed to read '{}'", args.input.display()))?;

    match index.nearest_to_click(args.x, args.y, args.scale) {
        Some(fragment) => {
            println!(
                "{}\t({:.1}, {:.1})\t{}",
                fragment.index, fragment.position_x, fragment.position_y, fragment.str
            );
            Ok(true)
        }
        None => {
            eprintln!("click is outside the page box");
            Ok(false)
        }
    }
}

fn run_export(args: &ExportArgs) -> Result<ExportReport> {
    if !args.delimiter.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character");
    }
    let schema = parse_schema(args.columns.as_deref())?;

    let store = FileStore::open(&args.store)
        .with_context(|| format!("failed to open store '{}'", args.store.display()))?;
    let session = Session::restore_from(&store, schema)
        .context("failed to read the saved session")?
        .ok_or_else(|| anyhow!("no saved session in '{}'", args.store.display()))?;

    let options = ExportOptions {
        delimiter: args.delimiter as u8,
    };
    let (csv, report) = session
        .export_csv_string(options)
        .context("failed to render the session as CSV")?;
    std::fs::write(&args.output, csv)
        .with_context(|| format!("failed to write '{}'", args.output.display()))?;
    Ok(report)
}

fn log_report(report: &ExportReport, verbose: bool) {
    if report.warnings.is_empty() {
        return;
    }

    eprintln!("warning: {} issue(s) detected", report.warnings.len());
    if verbose {
        for warning in &report.warnings {
            eprintln!(
                "  - {:?} row={:?} column={:?} fragment={:?}: {}",
                warning.code, warning.row, warning.column, warning.fragment_index, warning.message
            );
        }
    }
}

fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pdfpick_to_csv=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Fragments(args) => match run_fragments(&args) {
            Ok(0) => {
                eprintln!("no text fragments on page {}", args.page);
                ExitCode::from(2)
            }
            Ok(_) => ExitCode::SUCCESS,
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::from(1)
            }
        },
        Commands::Nearest(args) => match run_nearest(&args) {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::from(2),
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::from(1)
            }
        },
        Commands::Export(args) => match run_export(&args) {
            Ok(report) => {
                log_report(&report, args.verbose);
                if report.row_count > 0 {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(2)
                }
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::from(1)
            }
        },
    }
}
