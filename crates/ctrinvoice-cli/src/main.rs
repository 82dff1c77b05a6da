mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "ctrinvoice",
    version,
    about = "Tag BMCD draft invoices by position and fill the Duke CTR template"
)]
struct Cli {
    /// Log pass details to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract positioned word tokens from an invoice PDF
    Extract {
        /// Path to the invoice PDF
        input_file: PathBuf,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Write tokens to a JSON file (usable as input to `tag` and `run`)
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Tag an invoice (PDF or token JSON) into a fresh tag store
    Tag {
        /// Path to invoice PDF or token JSON file
        input_file: PathBuf,

        /// Custom JSON layout file
        #[arg(short, long, value_name = "FILE", conflicts_with = "preset")]
        layout: Option<PathBuf>,

        /// Predefined layout (default: bmcd-invoice)
        #[arg(short, long, value_name = "NAME")]
        preset: Option<String>,

        /// Tag store path (default: data.db in the temp directory)
        #[arg(long, value_name = "PATH")]
        db: Option<PathBuf>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Write tagged fields from a tag store into a copy of the CTR template
    Project {
        /// Path to the CTR template (.xlsx)
        template: PathBuf,

        /// Tag store path (default: data.db in the temp directory)
        #[arg(long, value_name = "PATH")]
        db: Option<PathBuf>,

        /// Custom JSON projection file
        #[arg(long, value_name = "FILE", conflicts_with = "preset")]
        projection: Option<PathBuf>,

        /// Predefined projection (default: duke-ctr)
        #[arg(short, long, value_name = "NAME")]
        preset: Option<String>,

        /// Output workbook (default: updated_CTR.xlsx next to the template)
        #[arg(long = "out", value_name = "FILE")]
        out: Option<PathBuf>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Tag an invoice and fill the CTR template in one go, with built-in presets
    Run {
        /// Path to invoice PDF or token JSON file
        input_file: PathBuf,

        /// Path to the CTR template (.xlsx)
        template: PathBuf,

        /// Output workbook (default: updated_CTR.xlsx next to the template)
        #[arg(long = "out", value_name = "FILE")]
        out: Option<PathBuf>,

        /// Tag store path (default: data.db in the temp directory)
        #[arg(long, value_name = "PATH")]
        db: Option<PathBuf>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Manage and inspect layouts
    Layouts {
        #[command(subcommand)]
        action: LayoutsAction,
    },
    /// Show the projected cells of a filled CTR workbook
    Inspect {
        /// Path to the workbook (.xlsx)
        file: PathBuf,

        /// Projection whose cells to show (default: duke-ctr)
        #[arg(short, long, value_name = "NAME", default_value = "duke-ctr")]
        preset: String,
    },
}

#[derive(Subcommand)]
enum LayoutsAction {
    /// List predefined layouts and projections
    List,
    /// Explain a layout in plain language
    Explain {
        /// Preset name (e.g., "bmcd-invoice")
        preset: String,
    },
    /// Validate a custom layout file
    Validate {
        /// Path to JSON layout file
        file: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Extract {
            input_file,
            output,
            out,
        } => commands::extract::run(input_file, &output, out),
        Commands::Tag {
            input_file,
            layout,
            preset,
            db,
            output,
        } => commands::tag::run(input_file, layout, preset, db, &output),
        Commands::Project {
            template,
            db,
            projection,
            preset,
            out,
            output,
        } => commands::project::run(template, db, projection, preset, out, &output),
        Commands::Run {
            input_file,
            template,
            out,
            db,
            output,
        } => commands::run::run(input_file, template, out, db, &output),
        Commands::Layouts { action } => match action {
            LayoutsAction::List => commands::layouts::list(),
            LayoutsAction::Explain { preset } => commands::layouts::explain(&preset),
            LayoutsAction::Validate { file } => commands::layouts::validate(&file),
        },
        Commands::Inspect { file, preset } => commands::inspect::run(&file, &preset),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
