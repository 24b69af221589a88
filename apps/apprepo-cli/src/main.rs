use anyhow::Result;
use apprepo_core::url_matches_domain;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

use commands::{ConfigCmd, ManifestCmd};

#[derive(Parser)]
#[command(name = "apprepo-cli", version, about = "Web application registry utilities")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect manifest files
    Manifest {
        #[command(subcommand)]
        cmd: ManifestCmd,
    },
    /// Check whether a URL belongs to an origin (prints true/false)
    Match(MatchArgs),
    /// Configuration schema and validation
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },
}

#[derive(Args)]
struct MatchArgs {
    /// URL to test
    url: String,
    /// Origin, as scheme://host[:port]
    domain: String,
}

fn main() {
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Manifest { cmd } => commands::manifest::execute(cmd),
        Commands::Match(args) => {
            println!("{}", url_matches_domain(&args.url, &args.domain));
            Ok(())
        }
        Commands::Config { cmd } => commands::config::execute(cmd),
    }
}
