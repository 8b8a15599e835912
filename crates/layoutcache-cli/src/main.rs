//! CLI for the invoice layout template cache.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, config, fingerprint, learn, process, stats};

/// Invoice layout cache - reuse learned layouts instead of calling the vision model
#[derive(Parser)]
#[command(name = "lcache")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Template store file (overrides the config)
    #[arg(short, long, global = true)]
    store: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the layout signature of a document
    Fingerprint(fingerprint::FingerprintArgs),

    /// Show which learned template (if any) a document matches
    Match(fingerprint::MatchArgs),

    /// Extract fields from a document with a learned template
    Process(process::ProcessArgs),

    /// Learn a template from a document and its expensive extraction
    Learn(learn::LearnArgs),

    /// Process multiple documents
    Batch(batch::BatchArgs),

    /// Show template usage statistics
    Stats(stats::StatsArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let options = commands::GlobalOptions {
        config: cli.config,
        store: cli.store,
    };

    match cli.command {
        Commands::Fingerprint(args) => fingerprint::run(args, &options),
        Commands::Match(args) => fingerprint::run_match(args, &options),
        Commands::Process(args) => process::run(args, &options),
        Commands::Learn(args) => learn::run(args, &options),
        Commands::Batch(args) => batch::run(args, &options),
        Commands::Stats(args) => stats::run(args, &options),
        Commands::Config(args) => config::run(args, &options),
    }
}
