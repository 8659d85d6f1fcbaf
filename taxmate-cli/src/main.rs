use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod state;
mod statement_cmd;

use statement_cmd::StatementCommand;

#[derive(Parser, Debug)]
#[command(name = "taxmate", version, about = "Import bank statements into your hustle ledger")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage ~/.taxmate/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Statement import, review and confirm
    Statement {
        #[command(subcommand)]
        command: StatementCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config file if none exists
    Init,

    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => config::show_config(&cfg)?,
        },
        Command::Statement { command } => statement_cmd::run(command, &cfg).await?,
    }

    Ok(())
}
