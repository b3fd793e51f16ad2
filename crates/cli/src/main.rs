//! CodeRelay CLI: the main entry point.
//!
//! Commands:
//! - `serve`       Start the Slack events gateway
//! - `ask`         Send one question to the model and print the mrkdwn answer
//! - `transpile`   Convert Markdown on stdin to Slack mrkdwn on stdout
//! - `config`      Show the effective configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "coderelay",
    about = "CodeRelay: a Slack coding assistant backed by Hugging Face Inference",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.coderelay/config.toml)
    #[arg(short, long, global = true, env = "CODERELAY_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Slack events gateway
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask the model a single question
    Ask {
        /// The question
        #[arg(required = true)]
        question: Vec<String>,

        /// Print the model's Markdown instead of Slack mrkdwn
        #[arg(long)]
        raw: bool,
    },

    /// Convert Markdown from stdin to Slack mrkdwn
    Transpile,

    /// Show the effective configuration (secrets redacted)
    Config {
        /// Print the built-in default configuration instead
        #[arg(long)]
        default: bool,

        /// Print the config file path only
        #[arg(long, conflicts_with = "default")]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Ask { question, raw } => {
            commands::ask::run(config_path, &question.join(" "), raw).await?
        }
        Commands::Transpile => commands::transpile::run()?,
        Commands::Config { default, path } => commands::config_cmd::run(config_path, default, path)?,
    }

    Ok(())
}
