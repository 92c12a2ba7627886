pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "aqua")]
#[command(about = "Aqua CLI - Command-line client for the Aquawatch monitoring backend")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Remote server registry management")]
    Server {
        #[command(subcommand)]
        cmd: commands::server::ServerCommands,
    },

    #[command(about = "Authentication and session management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Sensor readings and AI assessments")]
    Sensor {
        #[command(subcommand)]
        cmd: commands::sensor::SensorCommands,
    },

    #[command(about = "Run inference on a sensor sample from a JSON file")]
    Predict {
        #[arg(long, help = "Path to a JSON file with the sensor sample")]
        file: std::path::PathBuf,
    },

    #[command(about = "User administration (superadmin)")]
    Users {
        #[command(subcommand)]
        cmd: commands::users::UserCommands,
    },

    #[command(about = "Trigger the IoT device's manual override")]
    Override {
        #[arg(long, help = "Skip the confirmation prompt")]
        yes: bool,
    },

    #[command(about = "List notifications")]
    Notifications,

    #[command(about = "Watch the live session and push events until Ctrl-C")]
    Watch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
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
        Commands::Server { cmd } => commands::server::handle(cmd, output_format).await,
        Commands::Auth { cmd } => commands::auth::handle(cmd, output_format).await,
        Commands::Sensor { cmd } => commands::sensor::handle(cmd, output_format).await,
        Commands::Predict { file } => commands::sensor::handle_predict(file, output_format).await,
        Commands::Users { cmd } => commands::users::handle(cmd, output_format).await,
        Commands::Override { yes } => commands::sensor::handle_override(yes, output_format).await,
        Commands::Notifications => commands::sensor::handle_notifications(output_format).await,
        Commands::Watch => commands::watch::handle(output_format).await,
    }
}
