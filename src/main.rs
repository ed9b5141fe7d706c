use clap::{Parser, Subcommand};
use logreplay::cli::run::RunArgs;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "logreplay")]
#[command(
    about = "Continuously generates visits from an access log so a Matomo site looks live",
    long_about = None
)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay the log against the tracker
    Run(RunArgs),
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a starter config file
    Init {
        #[arg(long)]
        stdout: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logreplay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let config_path = logreplay::config::resolve_config_path(cli.config.as_deref());
            logreplay::cli::run::run(config_path, args).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { stdout } => {
                logreplay::cli::config::init(stdout)?;
            }
        },
    }

    Ok(())
}
