//! `invox`: extract structured invoice data from scanned images.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::{batch, config, parse, process};

/// Invoice OCR - Extract structured data from scanned invoices
#[derive(Parser)]
#[command(name = "invox")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract invoice data from a single image
    Process(process::ProcessArgs),

    /// Extract invoice data from many images concurrently
    Batch(batch::BatchArgs),

    /// Parse already recognized text without running OCR
    Parse(parse::ParseArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

impl Cli {
    fn log_filter(&self) -> EnvFilter {
        let level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs on stderr; stdout carries command output.
    tracing_subscriber::registry()
        .with(cli.log_filter())
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Process(args) => process::run(args, config_path).await,
        Commands::Batch(args) => batch::run(args, config_path).await,
        Commands::Parse(args) => parse::run(args).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
