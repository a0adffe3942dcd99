pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "oasis")]
#[command(about = "OASIS CLI - development tooling for the portal API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Mint a development access token")]
    Token(commands::token::TokenArgs),

    #[command(about = "Operate the mock CRM directory file")]
    Crm {
        #[command(subcommand)]
        cmd: commands::crm::CrmCommands,
    },

    #[command(about = "Show the gamification level for a point total")]
    Level {
        #[arg(help = "Total points")]
        points: i32,
    },

    #[command(about = "Check a running server's /health endpoint")]
    Health {
        #[arg(long, help = "Server base URL (defaults to http://localhost:<port>)")]
        url: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Token(args) => commands::token::handle(args, output_format),
        Commands::Crm { cmd } => commands::crm::handle(cmd, output_format).await,
        Commands::Level { points } => commands::level::handle(points, output_format),
        Commands::Health { url } => commands::health::handle(url, output_format).await,
    }
}
