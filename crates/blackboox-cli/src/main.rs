#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use blackboox_core::Config;
use clap::Parser;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "blackboox")]
#[command(author, version, about = "Service codegen and auto-imports for Electron apps", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Reset the build directory and write every generated file
    Prepare,

    /// Write the package manifest and run both pipelines' build-start
    Build,

    /// Build, then rebuild whenever a source file changes
    Dev {
        /// Quiet period before a batch of changes triggers a rebuild
        #[arg(long, default_value_t = 100, value_name = "MS")]
        debounce_ms: u64,
    },

    /// Print the symbol registries
    Scan {
        /// Only the services registry
        #[arg(long, conflicts_with_all = ["host", "client"])]
        services: bool,

        /// Only the host auto-import registry
        #[arg(long, conflicts_with = "client")]
        host: bool,

        /// Only the UI auto-import registry
        #[arg(long)]
        client: bool,
    },

    /// Run the auto-import transform on one file and print the result
    Transform {
        /// File to transform
        file: PathBuf,

        /// Use the host pipeline's registry instead of the UI one
        #[arg(long)]
        host: bool,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::Prepare => "prepare",
            Self::Build => "build",
            Self::Dev { .. } => "dev",
            Self::Scan { .. } => "scan",
            Self::Transform { .. } => "transform",
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let cwd = dunce::canonicalize(&cwd).unwrap_or(cwd);

    let config = Config::new(cwd)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    logging::init(config.verbosity, config.json_logs);
    let span = tracing::info_span!("blackboox", cmd = cli.command.name(), cwd = %config.cwd.display());
    let _guard = span.enter();

    match cli.command {
        Commands::Version => commands::version::run(config.json_logs),
        Commands::Prepare => commands::prepare::run(&config),
        Commands::Build => commands::build::run(&config),
        Commands::Dev { debounce_ms } => commands::dev::run(&config, debounce_ms),
        Commands::Scan {
            services,
            host,
            client,
        } => commands::scan::run(&config, commands::scan::Selection::from_flags(services, host, client)),
        Commands::Transform { file, host } => commands::transform::run(&config, &file, host),
    }
}
