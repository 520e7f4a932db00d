mod cmd;
mod help;
mod output;
mod settings;

use clap::{Parser, Subcommand};
use settings::ConfigArgs;

#[derive(Parser)]
#[command(
    name = "upwatch",
    about = "Watch a daemon's upgrade-info.json and report pending upgrades",
    version,
    propagate_version = true,
    after_long_help = help::help_text()
)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll until a pending upgrade is found (or Ctrl-C), then print it
    Watch {
        /// Name of the upgrade the running binary belongs to
        /// (default: read from cosmovisor/current/upgrade-info.json)
        #[arg(long)]
        current: Option<String>,
    },

    /// Run a single check and report whether an upgrade is pending
    Check {
        /// Name of the upgrade the running binary belongs to
        #[arg(long)]
        current: Option<String>,
    },

    /// Decode and print the upgrade plan file
    ShowPlan {
        /// Plan file (default: <home>/data/upgrade-info.json)
        #[arg(long)]
        file: Option<std::path::PathBuf>,
    },

    /// Extract release version and GitHub repo from download URLs
    ParseUrl {
        /// Download URLs, scanned in order; the first with a version wins
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Watch { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Watch { current } => cmd::watch::run(&cli.config, current.as_deref(), cli.json),
        Commands::Check { current } => cmd::check::run(&cli.config, current.as_deref(), cli.json),
        Commands::ShowPlan { file } => cmd::show_plan::run(&cli.config, file.as_deref(), cli.json),
        Commands::ParseUrl { urls } => cmd::parse_url::run(&urls, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
